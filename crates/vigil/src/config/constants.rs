use crate::config::{LogFormat, LogSpanEvents};

/// The default value for `log-format`.
pub const DEFAULT_LOG_FORMAT: LogFormat = LogFormat::Pretty;

/// The default value for `log-span-events`.
pub const DEFAULT_LOG_SPAN_EVENTS: LogSpanEvents = LogSpanEvents::Off;

/// The default value for `log-filter`.
pub const DEFAULT_LOG_FILTER: &str = "vigil=debug";

/// The default config file name.
pub const DEFAULT_CONFIG_FILE: &str = "vigil.toml";

/// The default hidden config file name.
pub const DEFAULT_HIDDEN_CONFIG_FILE: &str = ".vigil.toml";
