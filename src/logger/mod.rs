// Logger module
//
// Message loggers observe relayed traffic:
// - MessageLogger: the capability handed to the relay, one call per message
// - ApiLogger: emits through the `log` facade after applying text modifiers
// - Discard: accepts and drops everything
// - color: ANSI color modifiers used to tell sessions apart

pub mod color;

use log::info;
use std::sync::Arc;

pub use color::Color;

/// Receives one textual representation per relayed message.
///
/// Implementations are called concurrently from both directions of a
/// session and must not block for long.
pub trait MessageLogger: Send + Sync {
    fn print(&self, text: &str);
}

impl<T: MessageLogger + ?Sized> MessageLogger for Arc<T> {
    fn print(&self, text: &str) {
        (**self).print(text)
    }
}

type Modifier = Box<dyn Fn(String) -> String + Send + Sync>;

/// Logs API messages through `log::info!`, transforming each message with
/// the registered modifiers in order.
#[derive(Default)]
pub struct ApiLogger {
    modifiers: Vec<Modifier>,
}

impl ApiLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_modifier(mut self, modifier: impl Fn(String) -> String + Send + Sync + 'static) -> Self {
        self.modifiers.push(Box::new(modifier));
        self
    }

    /// Prepend `"<prefix>: "` to every message.
    pub fn with_prefix(self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.with_modifier(move |msg| format!("{prefix}: {msg}"))
    }

    /// Wrap every message in the given color. `None` leaves messages as is.
    pub fn with_color(self, color: Option<Color>) -> Self {
        match color {
            Some(color) => self.with_modifier(move |msg| color.paint(&msg)),
            None => self,
        }
    }

    pub fn format(&self, text: &str) -> String {
        self.modifiers.iter().fold(text.to_string(), |msg, modifier| modifier(msg))
    }
}

impl MessageLogger for ApiLogger {
    fn print(&self, text: &str) {
        info!("{}", self.format(text));
    }
}

/// A logger that drops every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct Discard;

impl MessageLogger for Discard {
    fn print(&self, _text: &str) {}
}

#[cfg(test)]
pub(crate) mod testing {
    use super::MessageLogger;
    use std::sync::Mutex;

    /// Stores every printed message for later assertions.
    #[derive(Default)]
    pub struct LogStorage {
        messages: Mutex<Vec<String>>,
    }

    impl LogStorage {
        pub fn messages(&self) -> Vec<String> {
            self.messages.lock().unwrap().clone()
        }
    }

    impl MessageLogger for LogStorage {
        fn print(&self, text: &str) {
            self.messages.lock().unwrap().push(text.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_without_modifiers() {
        assert_eq!(ApiLogger::new().format("hello"), "hello");
    }

    #[test]
    fn test_format_applies_modifiers_in_order() {
        let logger = ApiLogger::new().with_prefix("--> 1.2.3.4:443").with_modifier(|msg| msg.to_uppercase());
        assert_eq!(logger.format("{\"a\":1}"), "--> 1.2.3.4:443: {\"A\":1}");
    }

    #[test]
    fn test_format_prefix_then_color() {
        let logger = ApiLogger::new().with_prefix("<--").with_color(Some(Color::LightGreen));
        assert_eq!(logger.format("msg"), "\x1b[38;5;40m<--: msg\x1b[00m");
    }

    #[test]
    fn test_no_color_leaves_message() {
        let logger = ApiLogger::new().with_color(None);
        assert_eq!(logger.format("msg"), "msg");
    }

    #[test]
    fn test_storage_through_arc() {
        let storage = std::sync::Arc::new(testing::LogStorage::default());
        let logger: &dyn MessageLogger = &storage;
        logger.print("one");
        Discard.print("dropped");
        assert_eq!(storage.messages(), vec!["one".to_string()]);
    }
}
