pub mod config;
pub mod quest;

pub use config::*;
pub use quest::*;
