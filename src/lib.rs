pub mod config;
pub mod engine;
pub mod error;
pub mod matching;
pub mod merge;
pub mod models;
pub mod store;
pub mod utils;

pub use config::EngineConfig;
pub use engine::ResolutionEngine;
pub use error::{FailureKind, ResolutionError, Result};
