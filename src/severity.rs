use std::fmt;

/// Ordered severity of a log message, lowest to highest.
///
/// A logger emits a message when its severity is at or above the logger's
/// threshold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Severity {
    Trace = 0,
    Debug,
    Information,
    Notice,
    Warning,
    Error,
    Critical,
    Fatal,
}

impl Severity {
    pub const ALL: [Severity; 8] = [
        Severity::Trace,
        Severity::Debug,
        Severity::Information,
        Severity::Notice,
        Severity::Warning,
        Severity::Error,
        Severity::Critical,
        Severity::Fatal,
    ];

    /// Short uppercase label used by formatters.
    pub fn label(self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Debug => "DEBUG",
            Severity::Information => "INFO",
            Severity::Notice => "NOTICE",
            Severity::Warning => "WARN",
            Severity::Error => "ERROR",
            Severity::Critical => "CRIT",
            Severity::Fatal => "FATAL",
        }
    }

    /// Parses a severity from its name or label, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "trace" => Some(Severity::Trace),
            "debug" => Some(Severity::Debug),
            "info" | "information" => Some(Severity::Information),
            "notice" => Some(Severity::Notice),
            "warn" | "warning" => Some(Severity::Warning),
            "error" => Some(Severity::Error),
            "crit" | "critical" => Some(Severity::Critical),
            "fatal" => Some(Severity::Fatal),
            _ => None,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => Severity::Trace,
            1 => Severity::Debug,
            2 => Severity::Information,
            3 => Severity::Notice,
            4 => Severity::Warning,
            5 => Severity::Error,
            6 => Severity::Critical,
            _ => Severity::Fatal,
        }
    }

    pub(crate) fn from_log_level(level: log::Level) -> Self {
        match level {
            log::Level::Error => Severity::Error,
            log::Level::Warn => Severity::Warning,
            log::Level::Info => Severity::Information,
            log::Level::Debug => Severity::Debug,
            log::Level::Trace => Severity::Trace,
        }
    }

    pub(crate) fn to_level_filter(self) -> log::LevelFilter {
        match self {
            Severity::Trace => log::LevelFilter::Trace,
            Severity::Debug => log::LevelFilter::Debug,
            Severity::Information | Severity::Notice => log::LevelFilter::Info,
            Severity::Warning => log::LevelFilter::Warn,
            Severity::Error | Severity::Critical | Severity::Fatal => log::LevelFilter::Error,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_low_to_high() {
        for pair in Severity::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert!(Severity::Trace < Severity::Fatal);
    }

    #[test]
    fn test_from_name_accepts_labels_and_full_names() {
        assert_eq!(Severity::from_name("INFO"), Some(Severity::Information));
        assert_eq!(
            Severity::from_name("information"),
            Some(Severity::Information)
        );
        assert_eq!(Severity::from_name("Warning"), Some(Severity::Warning));
        assert_eq!(Severity::from_name("crit"), Some(Severity::Critical));
        assert_eq!(Severity::from_name("nope"), None);
    }

    #[test]
    fn test_u8_round_trip() {
        for severity in Severity::ALL {
            assert_eq!(Severity::from_u8(severity as u8), severity);
        }
    }
}
