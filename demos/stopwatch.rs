use std::{thread, time::Duration};

use plinth::{LogRegistry, Sink, Stopwatch};

fn main() {
    let registry = LogRegistry::new();
    let logger = registry
        .get_or_create("stopwatch", &Sink::console())
        .unwrap();

    logger.information(format!(
        "stopwatch resolution: {:?}",
        Stopwatch::resolution()
    ));

    let mut watch = Stopwatch::new();
    for _ in 0..2 {
        logger.information("stopwatch start");
        watch.start();
        thread::sleep(Duration::from_millis(250));
        watch.stop();
        logger.information("stopwatch stop");
        logger.information(format!("elapsed: {} microseconds", watch.elapsed_micros()));
        logger.information(format!("elapsed: {} seconds", watch.elapsed_seconds()));
    }

    logger.information("stopwatch restart (reset and start)");
    watch.restart();
    thread::sleep(Duration::from_millis(250));
    watch.stop();
    logger.information(format!("elapsed: {} microseconds", watch.elapsed_micros()));

    watch.reset();
    logger.information(format!(
        "after reset: {} microseconds",
        watch.elapsed_micros()
    ));

    registry.shutdown();
}
