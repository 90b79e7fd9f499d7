//! Log façade: levels, events and per-level hooks.
//!
//! Modules report through `Logger::log`; interested parties register hooks
//! for the levels they care about. Every accepted event is also forwarded
//! to `tracing`, so a subscriber sees the same stream the hooks do.
//!
//! Hooks get the logger back and may log again. Nesting is bounded by
//! `LOG_RECURSE_MAX`; events past the bound are dropped.

use crate::reentrancy::RecursionLimit;
use core::fmt;
use core::str::FromStr;
use hashbrown::HashMap;

/// Deepest hook-inside-hook nesting that still dispatches.
pub const LOG_RECURSE_MAX: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Notice,
    Warn,
    Error,
    Unknown,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Notice => "notice",
            Self::Warn => "warning",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn has_prefix_ignore_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len() && s.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

/// Never fails: unrecognised names map to `Unknown`.
impl FromStr for LogLevel {
    type Err = core::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(if s.eq_ignore_ascii_case("debug") {
            Self::Debug
        } else if s.eq_ignore_ascii_case("notice") {
            Self::Notice
        } else if has_prefix_ignore_case(s, "warn") {
            Self::Warn
        } else if has_prefix_ignore_case(s, "err") {
            Self::Error
        } else {
            Self::Unknown
        })
    }
}

/// Payload handed to hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogEvent<'a> {
    pub level: LogLevel,
    pub module: &'a str,
    pub message: &'a str,
}

pub type LogHook = Box<dyn Fn(&Logger, &LogEvent<'_>)>;

pub struct Logger {
    hooks: HashMap<LogLevel, Vec<LogHook>>,
    recursion: RecursionLimit,
    debug: bool,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hooks: usize = self.hooks.values().map(Vec::len).sum();
        f.debug_struct("Logger")
            .field("hooks", &hooks)
            .field("depth", &self.recursion.depth())
            .field("debug", &self.debug)
            .finish()
    }
}

impl Logger {
    pub fn new() -> Self {
        Self {
            hooks: HashMap::new(),
            recursion: RecursionLimit::new(LOG_RECURSE_MAX),
            debug: false,
        }
    }

    pub fn debug_enabled(&self) -> bool {
        self.debug
    }

    pub fn set_debug(&mut self, on: bool) {
        self.debug = on;
    }

    /// Register `hook` for `level`. Hooks for one level run in the order
    /// they were added.
    pub fn add_hook<F>(&mut self, level: LogLevel, hook: F)
    where
        F: Fn(&Logger, &LogEvent<'_>) + 'static,
    {
        self.hooks.entry(level).or_default().push(Box::new(hook));
    }

    pub fn hook_count(&self, level: LogLevel) -> usize {
        self.hooks.get(&level).map_or(0, Vec::len)
    }

    pub fn log(&self, level: LogLevel, module: &str, message: &str) {
        if level == LogLevel::Debug && !self.debug {
            return;
        }
        let Some(_depth) = self.recursion.enter() else {
            return;
        };

        match level {
            LogLevel::Debug => tracing::debug!(module, "{message}"),
            LogLevel::Notice => tracing::info!(module, "{message}"),
            LogLevel::Warn => tracing::warn!(module, "{message}"),
            LogLevel::Error => tracing::error!(module, "{message}"),
            LogLevel::Unknown => tracing::trace!(module, "{message}"),
        }

        let Some(hooks) = self.hooks.get(&level) else {
            return;
        };
        let event = LogEvent {
            level,
            module,
            message,
        };
        for hook in hooks {
            hook(self, &event);
        }
    }

    pub fn debug(&self, module: &str, message: &str) {
        self.log(LogLevel::Debug, module, message);
    }

    pub fn notice(&self, module: &str, message: &str) {
        self.log(LogLevel::Notice, module, message);
    }

    pub fn warn(&self, module: &str, message: &str) {
        self.log(LogLevel::Warn, module, message);
    }

    pub fn error(&self, module: &str, message: &str) {
        self.log(LogLevel::Error, module, message);
    }
}
