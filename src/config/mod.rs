//! Configuration module for remake
//!
//! Provides the runtime [`Config`] for a run and XDG-compliant layered
//! loading of persistent [`Settings`].

pub mod loader;
pub mod model;

pub use loader::load_settings;
pub use model::*;
