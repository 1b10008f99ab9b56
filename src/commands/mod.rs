//! CLI command implementations.

pub mod health;
pub mod jobs;
pub mod profiles;
pub mod providers;
pub mod route;
pub mod validate;
