//! The standard resolution stages, in pipeline order

use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;

use crate::error::{MakeError, Result};
use crate::expand::{expand_dependencies, is_glob, placeholder};
use crate::target::{Outcome, Target};

use super::Next;

/// Expand a requested glob name into its matches.
///
/// Names that are literally an existing file pass through untouched.
pub async fn fan_out(target: Target, next: Next) -> Result<Outcome> {
    let name = target.name();
    if !is_glob(&name) || target.session().mtime(&name).await?.is_some() {
        return next.run(target).await;
    }

    let paths = target.session().expander().expand(&name).await?;
    match paths.as_slice() {
        [] => {
            target.debug("no matches");
            Ok(Outcome::Skipped)
        }
        [only] => {
            target.rename(only);
            next.run(target).await
        }
        many => target.run(many.to_vec()).await,
    }
}

/// Bind the task or rule for the target's name, at most once per run.
///
/// Every later request for the same name awaits the first one's result.
pub async fn resolve_target(target: Target, next: Next) -> Result<Outcome> {
    let name = target.name();
    let session = Arc::clone(target.session());

    let shared = session.memoize(&name, || {
        let session = Arc::clone(&session);
        let name = name.clone();
        async move {
            if let Some(definition) = session.registry().lookup(&name).cloned() {
                target.bind(Arc::clone(&definition))?;
                target.push_deps(
                    definition
                        .deps
                        .iter()
                        .map(|dep| placeholder::format(dep, &name)),
                );
            }
            next.run(target).await
        }
        .boxed()
    });

    shared.await
}

pub async fn expand_deps(target: Target, next: Next) -> Result<Outcome> {
    let deps = target.deps();
    if !deps.is_empty() {
        let session = target.session();
        let expanded = expand_dependencies(&deps, session.registry(), session.expander()).await?;
        target.set_deps(expanded);
    }
    next.run(target).await
}

/// Run dependencies, then decide whether the target itself must run.
///
/// Tasks and missing files always proceed. A rule whose file exists is
/// skipped when no dependency changed and the cache still holds its mtime.
pub async fn run_deps(target: Target, next: Next) -> Result<Outcome> {
    let name = target.name();
    let session = Arc::clone(target.session());
    let is_task = target.binding().is_some_and(|definition| definition.is_task());

    let mtime = session.mtime(&name).await?;
    let force = is_task || mtime.is_none();

    let deps = target.deps();
    let changed = target.run(deps.iter().cloned()).await?;
    for dep in &deps {
        session.cache().update(dep).await?;
    }

    if changed.is_continued() || force {
        return next.run(target).await;
    }

    if let Some(mtime) = mtime {
        if session.cache().unchanged(&name, mtime) {
            target.debug("skip");
            return Ok(Outcome::Skipped);
        }
    }

    let outcome = next.run(target).await?;
    session.cache().update(&name).await?;
    Ok(outcome)
}

/// Log start, finish and failure of bound targets.
pub async fn stopwatch(target: Target, next: Next) -> Result<Outcome> {
    if target.binding().is_none() {
        return next.run(target).await;
    }

    target.info("started");
    let start = Instant::now();
    let result = next.run(target.clone()).await;
    let secs = start.elapsed().as_secs_f64();

    match &result {
        Ok(_) => target.info(format!("finished in {:.2}s", secs)),
        Err(_) => target.error(format!("failed in {:.2}s", secs)),
    }
    result
}

/// Tag untagged errors with the target name.
pub async fn errors(target: Target, next: Next) -> Result<Outcome> {
    let name = target.name();
    next.run(target).await.map_err(|e| e.within(&name))
}

pub async fn execute(target: Target, next: Next) -> Result<Outcome> {
    match target.binding() {
        Some(definition) => definition.action.call(target).await,
        None => next.run(target).await,
    }
}

/// Terminal stage for unbound names: they must exist on disk.
pub async fn check_file(target: Target, _next: Next) -> Result<Outcome> {
    let name = target.name();
    let session = target.session();

    match session.mtime(&name).await? {
        None => Err(MakeError::TargetNotFound(name)),
        Some(mtime) if session.cache().unchanged(&name, mtime) => Ok(Outcome::Skipped),
        Some(_) => {
            target.info("changed");
            Ok(Outcome::Continued)
        }
    }
}
