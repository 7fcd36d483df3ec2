pub mod agent;
pub mod types;

pub use agent::{Agent, UnknownAgent};
pub use types::*;
