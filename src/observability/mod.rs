//! Observability
//!
//! Structured JSON logging of compiler events. Observability is read-only:
//! nothing logged here changes what the compiler produces.
//!
//! ```ignore
//! use aerodomain::observability::{log_event, Event};
//!
//! log_event(Event::BinarySearchIgnored, &[("model", "res.partner"), ("field", "image")]);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};

/// Log an event at its own severity
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event_uses_event_severity() {
        let (_, lines) = Logger::capture(|| {
            log_event(Event::LegacyBooleanIn, &[("field", "active")]);
        });
        let parsed: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(parsed["event"], "LEGACY_BOOLEAN_IN");
        assert_eq!(parsed["severity"], "WARN");
        assert_eq!(parsed["field"], "active");
    }
}
