//! Multi-parent abort signals
//!
//! Every target owns one [`AbortSignal`]. A parent links each child it
//! traverses to, so aborting the parent aborts the child; a child reached
//! from several parents is aborted by whichever parent aborts first. The
//! first reason recorded wins.

use std::sync::{Arc, Mutex, OnceLock, Weak};

use tokio_util::sync::CancellationToken;

use crate::error::{MakeError, Result};
use crate::lock;

#[derive(Debug, Default)]
struct SignalInner {
    token: CancellationToken,
    reason: OnceLock<MakeError>,
    children: Mutex<Vec<Weak<SignalInner>>>,
}

#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    inner: Arc<SignalInner>,
}

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_aborted(&self) -> bool {
        self.inner.reason.get().is_some()
    }

    pub fn reason(&self) -> Option<MakeError> {
        self.inner.reason.get().cloned()
    }

    /// `Err(reason)` once aborted.
    pub fn check(&self) -> Result<()> {
        match self.inner.reason.get() {
            Some(reason) => Err(reason.clone()),
            None => Ok(()),
        }
    }

    /// Abort this signal and every linked child.
    ///
    /// Returns `false` if the signal was already aborted; the original
    /// reason is kept.
    pub fn abort(&self, reason: MakeError) -> bool {
        abort_inner(&self.inner, reason)
    }

    /// Make `child` abort whenever `self` does.
    ///
    /// Linking to an already aborted parent aborts the child immediately.
    pub fn link(&self, child: &AbortSignal) {
        if Arc::ptr_eq(&self.inner, &child.inner) {
            return;
        }

        let mut children = lock(&self.inner.children);
        if let Some(reason) = self.inner.reason.get() {
            drop(children);
            child.abort(reason.clone());
            return;
        }
        children.retain(|weak| weak.strong_count() > 0);
        children.push(Arc::downgrade(&child.inner));
    }

    /// Resolves with the abort reason once aborted.
    pub async fn aborted(&self) -> MakeError {
        self.inner.token.cancelled().await;
        self.reason()
            .unwrap_or_else(|| MakeError::Report("aborted".to_string()))
    }
}

fn abort_inner(inner: &Arc<SignalInner>, reason: MakeError) -> bool {
    if inner.reason.set(reason.clone()).is_err() {
        return false;
    }
    inner.token.cancel();

    // Taken under the lock so a concurrent `link` either lands in this list
    // or observes the reason and aborts the child itself.
    let children = std::mem::take(&mut *lock(&inner.children));
    for child in children.iter().filter_map(Weak::upgrade) {
        abort_inner(&child, reason.clone());
    }
    true
}
