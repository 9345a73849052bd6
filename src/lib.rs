pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod exec;
pub mod git;
pub mod github;
pub mod package_manager;
pub mod registry;
pub mod release_notes;
pub mod task;
pub mod ui;
pub mod version;
pub mod warning;

pub use error::{LionpError, Result};
