//! Log level and syslog severity definitions

/// The four levels every router precomputes a label set for
///
/// The label value is the lowercase name (`"info"`), which is also what the
/// syslog and OpenTelemetry sinks compare against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LogLevel {
    Debug = 0,
    #[default]
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl LogLevel {
    pub const ALL: [LogLevel; 4] = [
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
    ];

    /// Label value carried in the `level` label
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Exact match on a label value; anything else is not one of the four
    pub fn from_label(value: &str) -> Option<Self> {
        match value {
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    #[cfg(feature = "console")]
    pub fn color_code(&self) -> colored::Color {
        use colored::Color::*;
        match self {
            LogLevel::Debug => Blue,
            LogLevel::Info => Green,
            LogLevel::Warn => Yellow,
            LogLevel::Error => Red,
        }
    }
}

impl AsRef<str> for LogLevel {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Syslog severity, 0 (most urgent) to 7
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Emergency = 0,
    Alert = 1,
    Critical = 2,
    Error = 3,
    Warning = 4,
    Notice = 5,
    Informational = 6,
    Debug = 7,
}

impl Severity {
    /// Map a textual level to a severity; unrecognized text is informational
    pub fn from_level(level: &str) -> Self {
        match level {
            "emerg" => Severity::Emergency,
            "alert" => Severity::Alert,
            "crit" => Severity::Critical,
            "error" => Severity::Error,
            "warn" => Severity::Warning,
            "notice" => Severity::Notice,
            "info" => Severity::Informational,
            "debug" => Severity::Debug,
            _ => Severity::Informational,
        }
    }

    pub fn code(&self) -> u8 {
        *self as u8
    }
}
