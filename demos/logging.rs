use plinth::{LogRegistry, Severity, Sink, emit, install_global};

fn main() {
    let registry = LogRegistry::new();
    let console = Sink::console();

    // Plain logger, default format.
    let basic = registry.get_or_create("basic", &console).unwrap();
    basic.warning("plain warning through the console sink");

    // Custom pattern: logger name and message text only.
    let shaped = registry.get_or_create("shaped", &console).unwrap();
    shaped.set_pattern("%s : %t");
    shaped.warning("pattern-formatted warning");

    // File logger, appending to /tmp.
    let file_sink = Sink::file("/tmp/plinth_demo.log").unwrap();
    let files = registry.get_or_create("files", &file_sink).unwrap();
    files.warning("this line goes to /tmp/plinth_demo.log");

    // Source locations: emit! attaches file and line, the pattern shows them.
    let located = registry.get_or_create("located", &console).unwrap();
    located.set_pattern("%s :%U:%u: %t");
    emit!(located, Severity::Warning, "warning number {}", 1);
    emit!(located, Severity::Warning, "warning {} of {}", 2, 2);

    // The log facade routes the log crate's macros through a logger.
    let bridged = registry.get_or_create("bridged", &console).unwrap();
    install_global(bridged).unwrap();
    log::warn!("over the log facade");

    registry.shutdown();

    let content = std::fs::read_to_string("/tmp/plinth_demo.log").unwrap();
    println!("--- tail of /tmp/plinth_demo.log ---");
    println!("{}", content.lines().last().unwrap());
}
