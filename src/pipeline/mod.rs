//! Resolution pipeline
//!
//! A pipeline is an ordered list of [`Stage`]s. Each stage receives the
//! target and a [`Next`] continuation; it may short-circuit with
//! [`Outcome::Skipped`], fail, or hand the target on by running `next`.
//! Running past the last stage yields [`Outcome::Continued`].

pub mod stages;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::error::Result;
use crate::target::{Outcome, Target};

pub type StageFuture = BoxFuture<'static, Result<Outcome>>;

/// One step of target resolution
pub trait Stage: Send + Sync {
    fn call(&self, target: Target, next: Next) -> StageFuture;
}

impl<F, Fut> Stage for F
where
    F: Fn(Target, Next) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Outcome>> + Send + 'static,
{
    fn call(&self, target: Target, next: Next) -> StageFuture {
        self(target, next).boxed()
    }
}

/// Continuation into the remaining stages
#[derive(Clone)]
pub struct Next {
    stages: Arc<[Arc<dyn Stage>]>,
    index: usize,
}

impl Next {
    pub fn run(self, target: Target) -> StageFuture {
        match self.stages.get(self.index).cloned() {
            Some(stage) => stage.call(
                target,
                Next {
                    stages: self.stages,
                    index: self.index + 1,
                },
            ),
            None => async { Ok(Outcome::Continued) }.boxed(),
        }
    }
}

#[derive(Clone)]
pub struct Pipeline {
    stages: Arc<[Arc<dyn Stage>]>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::standard()
    }
}

impl Pipeline {
    /// A pipeline with no stages
    pub fn new() -> Self {
        Self {
            stages: Arc::from(Vec::<Arc<dyn Stage>>::new()),
        }
    }

    /// fan-out → resolve → expand deps → run deps → stopwatch → errors →
    /// execute → check file
    pub fn standard() -> Self {
        Self::new()
            .then(stages::fan_out)
            .then(stages::resolve_target)
            .then(stages::expand_deps)
            .then(stages::run_deps)
            .then(stages::stopwatch)
            .then(stages::errors)
            .then(stages::execute)
            .then(stages::check_file)
    }

    /// Append a stage.
    pub fn push(self, stage: impl Stage + 'static) -> Self {
        let mut stages: Vec<Arc<dyn Stage>> = self.stages.iter().cloned().collect();
        stages.push(Arc::new(stage));
        Self {
            stages: stages.into(),
        }
    }

    /// Append an async function or closure as a stage.
    pub fn then<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Target, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Outcome>> + Send + 'static,
    {
        self.push(f)
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Feed `target` through every stage.
    pub fn call(&self, target: Target) -> StageFuture {
        Next {
            stages: Arc::clone(&self.stages),
            index: 0,
        }
        .run(target)
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages.len())
            .finish()
    }
}
