pub mod analytics;
pub mod config;
pub mod discretizer;
pub mod engine;
pub mod error;
pub mod qpolicy;
pub mod ranker;
pub mod retriever;
pub mod reward;
pub mod types;

pub use config::EngineConfig;
pub use engine::RecsEngine;
pub use error::EngineError;
#[allow(unused_imports)]
pub use types::*;
