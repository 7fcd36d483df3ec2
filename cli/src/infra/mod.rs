//! Infrastructure layer: concrete implementations of application port traits.
//!
//! All process execution and most filesystem access lives here.
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod command_runner;
pub mod config;
pub mod fs;
pub mod history;
pub mod identity;
pub mod pipeline;
pub mod registry;
