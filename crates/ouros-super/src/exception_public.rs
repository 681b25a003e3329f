use std::fmt;

use serde::{Deserialize, Serialize};

use crate::exception_private::ExcType;

/// A Python exception as seen by host code.
///
/// Returned by the internal-convention API (`Result<_, Exception>`), stored in an
/// [`ErrorSlot`](crate::ErrorSlot) by the boundary entry points, and returned by
/// host hooks to signal failure back into the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Exception {
    exc_type: ExcType,
    message: Option<String>,
}

impl Exception {
    #[must_use]
    pub fn new(exc_type: ExcType, message: Option<String>) -> Self {
        Self { exc_type, message }
    }

    /// Creates an exception of `exc_type` with a message.
    #[must_use]
    pub fn with_message(exc_type: ExcType, message: impl Into<String>) -> Self {
        Self::new(exc_type, Some(message.into()))
    }

    #[must_use]
    pub fn runtime_error(message: impl Into<String>) -> Self {
        Self::with_message(ExcType::RuntimeError, message)
    }

    #[must_use]
    pub fn exc_type(&self) -> ExcType {
        self.exc_type
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    #[must_use]
    pub fn into_message(self) -> Option<String> {
        self.message
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {message}", self.exc_type),
            None => write!(f, "{}", self.exc_type),
        }
    }
}

impl std::error::Error for Exception {}
