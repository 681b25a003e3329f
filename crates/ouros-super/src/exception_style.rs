//! The two error conventions of the super proxy entry points.
//!
//! Inside the runtime failures propagate as `Err` through `?`. At the host
//! boundary they are recorded in an [`ErrorSlot`] and a sentinel (`None`) is
//! returned instead. The resolver, binder and validator are written once against
//! [`RunResult`]; an [`ExceptionStyle`] picked by the caller decides how the final
//! result is delivered.

use crate::{exception_private::RunResult, exception_public::Exception};

/// Out-of-band error storage for boundary entry points.
///
/// A boundary call sets the slot on failure and returns the sentinel; the caller
/// must [`take`](Self::take) (or [`clear`](Self::clear)) the error before the
/// next boundary call. A boundary call never clears a pending error on success.
/// On failure it replaces whatever is pending, the way a host interpreter
/// restores its current exception, so the slot always describes the latest failure.
#[derive(Debug, Default)]
pub struct ErrorSlot {
    current: Option<Exception>,
}

impl ErrorSlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `exception`, replacing any pending error.
    pub fn set(&mut self, exception: Exception) {
        self.current = Some(exception);
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        self.current.is_some()
    }

    #[must_use]
    pub fn peek(&self) -> Option<&Exception> {
        self.current.as_ref()
    }

    /// Consumes the pending error, leaving the slot clean.
    pub fn take(&mut self) -> Option<Exception> {
        self.current.take()
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}

/// Strategy deciding how an entry point hands its result to the caller.
pub trait ExceptionStyle {
    /// Whether failures are recorded in a slot rather than returned.
    const SETS_SLOT: bool;

    type Output<V>;

    /// Converts the internal result into the caller's convention.
    fn deliver<V>(&mut self, result: RunResult<V>) -> Self::Output<V>;
}

/// Internal convention: failures are returned as `Err(Exception)` and propagate.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cxx;

impl ExceptionStyle for Cxx {
    const SETS_SLOT: bool = false;

    type Output<V> = Result<V, Exception>;

    #[inline]
    fn deliver<V>(&mut self, result: RunResult<V>) -> Self::Output<V> {
        result.map_err(crate::exception_private::RunError::into_exception)
    }
}

/// Boundary convention: failures are stored in the slot and `None` is returned.
#[derive(Debug)]
pub struct Capi<'a> {
    slot: &'a mut ErrorSlot,
}

impl<'a> Capi<'a> {
    #[must_use]
    pub fn new(slot: &'a mut ErrorSlot) -> Self {
        Self { slot }
    }

    /// The pending error, if the last delivery failed.
    #[must_use]
    pub fn pending(&self) -> Option<&Exception> {
        self.slot.peek()
    }
}

impl ExceptionStyle for Capi<'_> {
    const SETS_SLOT: bool = true;

    type Output<V> = Option<V>;

    fn deliver<V>(&mut self, result: RunResult<V>) -> Self::Output<V> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.slot.set(err.into_exception());
                None
            }
        }
    }
}
