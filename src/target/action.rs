//! User actions and the changed/unchanged outcome they produce

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use super::Target;
use crate::error::Result;

/// Result of resolving a target
///
/// `Continued` means the target ran (or changed) and dependents must
/// treat it as changed. `Skipped` means nothing happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continued,
    Skipped,
}

impl Outcome {
    pub fn is_continued(self) -> bool {
        self == Outcome::Continued
    }

    /// `Continued` if either side is.
    pub fn or(self, other: Outcome) -> Outcome {
        if self.is_continued() || other.is_continued() {
            Outcome::Continued
        } else {
            Outcome::Skipped
        }
    }
}

impl From<()> for Outcome {
    fn from(_: ()) -> Self {
        Outcome::Continued
    }
}

impl From<bool> for Outcome {
    fn from(changed: bool) -> Self {
        if changed {
            Outcome::Continued
        } else {
            Outcome::Skipped
        }
    }
}

pub type ActionFuture = BoxFuture<'static, Result<Outcome>>;

type ActionFn = dyn Fn(Target) -> ActionFuture + Send + Sync;

/// Async callback bound to a task or rule
///
/// An action returning `()` or `true` reports a change; `false` or
/// [`Outcome::Skipped`] reports none.
#[derive(Clone)]
pub struct Action {
    f: Arc<ActionFn>,
}

impl Action {
    pub fn new<F, Fut, R>(f: F) -> Self
    where
        F: Fn(Target) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
        R: Into<Outcome> + 'static,
    {
        Self {
            f: Arc::new(move |target| {
                f(target)
                    .map(|r: Result<R>| -> Result<Outcome> { r.map(Into::into) })
                    .boxed()
            }),
        }
    }

    /// An action that does nothing and reports a change.
    pub fn noop() -> Self {
        Self::new(|_| async { Ok(()) })
    }

    pub fn call(&self, target: Target) -> ActionFuture {
        (self.f)(target)
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Action(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_conversions() {
        assert_eq!(Outcome::from(()), Outcome::Continued);
        assert_eq!(Outcome::from(true), Outcome::Continued);
        assert_eq!(Outcome::from(false), Outcome::Skipped);
    }

    #[test]
    fn test_outcome_or() {
        assert_eq!(Outcome::Skipped.or(Outcome::Skipped), Outcome::Skipped);
        assert_eq!(Outcome::Skipped.or(Outcome::Continued), Outcome::Continued);
        assert_eq!(Outcome::Continued.or(Outcome::Skipped), Outcome::Continued);
    }
}
