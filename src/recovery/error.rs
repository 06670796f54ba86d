//! Panic error type.

use std::any::Any;
use std::fmt::Display;
use thiserror::Error;

/// A panic intercepted by the recovery primitive.
///
/// Displays as `panic=<payload> trace=<trace>`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("panic={message} trace={trace}")]
pub struct PanicError {
    message: String,
    location: Option<String>,
    trace: String,
}

impl PanicError {
    pub(crate) fn new(message: String, location: Option<String>, trace: String) -> Self {
        Self {
            message,
            location,
            trace,
        }
    }

    /// Textual form of the panic payload.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// `file:line:column` of the panic, when the panic hook recorded it.
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// Multi-line description of the frames leading to the panic.
    pub fn trace(&self) -> &str {
        &self.trace
    }
}

fn shown<T: Display + 'static>(payload: &(dyn Any + Send)) -> Option<String> {
    payload.downcast_ref::<T>().map(ToString::to_string)
}

/// Textual form of a panic payload.
///
/// `panic!` payloads are strings; `panic_any` payloads of common primitive
/// types are formatted too. Anything else is reported as `Box<dyn Any>`.
pub(crate) fn payload_message(payload: &(dyn Any + Send)) -> String {
    shown::<&str>(payload)
        .or_else(|| shown::<String>(payload))
        .or_else(|| shown::<i32>(payload))
        .or_else(|| shown::<i64>(payload))
        .or_else(|| shown::<u32>(payload))
        .or_else(|| shown::<u64>(payload))
        .or_else(|| shown::<usize>(payload))
        .or_else(|| shown::<bool>(payload))
        .or_else(|| shown::<char>(payload))
        .or_else(|| shown::<f64>(payload))
        .unwrap_or_else(|| "Box<dyn Any>".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_message_and_trace() {
        let err = PanicError::new(
            "boom".to_string(),
            Some("src/lib.rs:3:5".to_string()),
            "src/lib.rs:3:5".to_string(),
        );
        assert_eq!(err.to_string(), "panic=boom trace=src/lib.rs:3:5");
        assert_eq!(err.message(), "boom");
        assert_eq!(err.location(), Some("src/lib.rs:3:5"));
    }

    #[test]
    fn payload_message_formats_strings() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(payload_message(payload.as_ref()), "static");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(payload_message(payload.as_ref()), "owned");
    }

    #[test]
    fn payload_message_formats_primitives() {
        let payload: Box<dyn Any + Send> = Box::new(1i32);
        assert_eq!(payload_message(payload.as_ref()), "1");

        let payload: Box<dyn Any + Send> = Box::new(true);
        assert_eq!(payload_message(payload.as_ref()), "true");
    }

    #[test]
    fn payload_message_falls_back_for_opaque_values() {
        struct Opaque;
        let payload: Box<dyn Any + Send> = Box::new(Opaque);
        assert_eq!(payload_message(payload.as_ref()), "Box<dyn Any>");
    }
}
