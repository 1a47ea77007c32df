pub mod batch;
pub mod cli;
pub mod error;
pub mod filter;
pub mod runner;
pub mod stanza;

pub use error::{Error, Result};
pub use filter::{Filter, FilterSpec};
pub use runner::{Launcher, RunConfig, SystemLauncher};
