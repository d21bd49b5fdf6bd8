pub mod aggregate;
pub mod ai;
pub mod cli;
pub mod collect;
pub mod config;
pub mod error;
pub mod exec;
pub mod narrative;
pub mod platform;
pub mod prompt;
pub mod report;
pub mod snapshot;
pub mod util;

pub use error::{Error, Result};
