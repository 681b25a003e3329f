use std::{
    borrow::Cow,
    fmt::{self, Display},
};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::exception_public::Exception;

/// Result type alias for operations that can produce a runtime error.
pub type RunResult<T> = Result<T, RunError>;

/// Python exception types raised by the super-proxy core and its object model.
///
/// Uses strum derives for automatic `Display`, `FromStr`, and `Into<&'static str>` implementations.
/// The string representation matches the variant name exactly (e.g., `TypeError` -> "TypeError").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize)]
pub enum ExcType {
    /// primary exception class - matches any exception in isinstance checks.
    Exception,
    AttributeError,
    TypeError,
    ValueError,

    // --- RuntimeError hierarchy ---
    RuntimeError,
    /// Subclass of RuntimeError.
    RecursionError,

    MemoryError,
}

impl ExcType {
    /// Checks if this exception type is a subclass of another exception type.
    ///
    /// Returns true if `self` would be caught by `except handler_type:`.
    #[must_use]
    pub fn is_subclass_of(self, handler_type: Self) -> bool {
        if self == handler_type {
            return true;
        }
        match handler_type {
            Self::Exception => true,
            Self::RuntimeError => matches!(self, Self::RecursionError),
            _ => false,
        }
    }

    /// Creates an AttributeError for when an attribute is not found.
    #[must_use]
    pub(crate) fn attribute_error(type_name: impl Display, attr: &str) -> RunError {
        SimpleException::new_msg(
            Self::AttributeError,
            format!("'{type_name}' object has no attribute '{attr}'"),
        )
        .into()
    }

    /// Creates an AttributeError for a missing attribute on a class object.
    #[must_use]
    pub(crate) fn attribute_error_type(class_name: &str, attr: &str) -> RunError {
        SimpleException::new_msg(
            Self::AttributeError,
            format!("type object '{class_name}' has no attribute '{attr}'"),
        )
        .into()
    }

    /// Creates an AttributeError for assignment to a read-only member.
    #[must_use]
    pub(crate) fn attribute_error_readonly(attr: &str, type_name: &str) -> RunError {
        SimpleException::new_msg(
            Self::AttributeError,
            format!("readonly attribute '{attr}' of '{type_name}' objects is not writable"),
        )
        .into()
    }

    /// Creates a simple TypeError with a custom message.
    #[must_use]
    pub(crate) fn type_error(msg: impl fmt::Display) -> RunError {
        SimpleException::new_msg(Self::TypeError, msg).into()
    }

    /// Creates the TypeError raised when the first argument of `super()` is not a class.
    ///
    /// Format: `TypeError: must be type, not int`
    #[must_use]
    pub(crate) fn type_error_super_arg_not_type(type_name: &str) -> RunError {
        Self::type_error(format!("must be type, not {type_name}"))
    }

    /// Creates the TypeError raised when a super proxy cannot be bound to an object.
    #[must_use]
    pub(crate) fn type_error_super_obj() -> RunError {
        Self::type_error("super(type, obj): obj must be an instance or subtype of type")
    }

    /// Creates a TypeError for calling an object that is not callable.
    #[must_use]
    pub(crate) fn type_error_not_callable(type_name: &str) -> RunError {
        Self::type_error(format!("'{type_name}' object is not callable"))
    }

    /// Creates a TypeError for functions receiving more positional arguments than they accept.
    #[must_use]
    pub(crate) fn type_error_at_most(name: &str, max: usize, actual: usize) -> RunError {
        let s = if max == 1 { "" } else { "s" };
        Self::type_error(format!("{name}() takes at most {max} argument{s} ({actual} given)"))
    }

    /// Creates a TypeError for functions requiring at least `min` positional arguments.
    #[must_use]
    pub(crate) fn type_error_at_least(name: &str, min: usize, actual: usize) -> RunError {
        let s = if min == 1 { "" } else { "s" };
        Self::type_error(format!("{name}() takes at least {min} argument{s} ({actual} given)"))
    }

    /// Creates a RuntimeError with a custom message.
    #[must_use]
    pub(crate) fn runtime_error(msg: impl fmt::Display) -> RunError {
        SimpleException::new_msg(Self::RuntimeError, msg).into()
    }
}

/// Simple lightweight representation of an exception.
///
/// Carries only the type and the optional message: the super-proxy core has no
/// traceback machinery, frames belong to the surrounding interpreter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleException {
    exc_type: ExcType,
    arg: Option<String>,
}

impl SimpleException {
    /// Creates a new exception with the given type and optional argument message.
    #[must_use]
    pub fn new(exc_type: ExcType, arg: Option<String>) -> Self {
        Self { exc_type, arg }
    }

    /// Creates a new exception with the given type and argument message.
    #[must_use]
    pub fn new_msg(exc_type: ExcType, arg: impl fmt::Display) -> Self {
        Self {
            exc_type,
            arg: Some(arg.to_string()),
        }
    }

    #[must_use]
    pub fn exc_type(&self) -> ExcType {
        self.exc_type
    }
}

impl Display for SimpleException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.arg {
            Some(arg) => write!(f, "{}: {arg}", self.exc_type),
            None => write!(f, "{}", self.exc_type),
        }
    }
}

/// Runtime error types that can occur while resolving, binding or constructing.
///
/// Three variants:
/// - `Internal`: Bug in the runtime implementation (static message)
/// - `Exc`: Python exception that host code may catch
/// - `UncatchableExc`: Python exception from resource limits that CANNOT be caught
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunError {
    /// Internal runtime error - indicates a bug, not a user mistake.
    Internal(Cow<'static, str>),
    /// Catchable Python exception (e.g., AttributeError, TypeError).
    Exc(Box<SimpleException>),
    /// Uncatchable Python exception from resource limits (MemoryError).
    UncatchableExc(Box<SimpleException>),
}

impl From<SimpleException> for RunError {
    fn from(exc: SimpleException) -> Self {
        Self::Exc(Box::new(exc))
    }
}

impl From<Exception> for RunError {
    fn from(exc: Exception) -> Self {
        let exc_type = exc.exc_type();
        let simple = Box::new(SimpleException::new(exc_type, exc.into_message()));
        // memory exhaustion reported by host code is as final as our own
        if exc_type == ExcType::MemoryError {
            Self::UncatchableExc(simple)
        } else {
            Self::Exc(simple)
        }
    }
}

impl RunError {
    /// Converts this runtime error to an `Exception` for the public API.
    ///
    /// Internal errors are converted to `RuntimeError` exceptions.
    #[must_use]
    pub fn into_exception(self) -> Exception {
        match self {
            Self::Exc(exc) | Self::UncatchableExc(exc) => Exception::new(exc.exc_type, exc.arg),
            Self::Internal(err) => Exception::runtime_error(format!("Internal error in ouros-super: {err}")),
        }
    }

    pub fn internal(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns true if this error is a catchable exception of `exc_type`.
    #[must_use]
    pub fn is_exception_type(&self, exc_type: ExcType) -> bool {
        match self {
            Self::Exc(exc) => exc.exc_type() == exc_type,
            _ => false,
        }
    }
}
