pub mod logging;
pub mod recs;

pub use recs::config::EngineConfig;
pub use recs::engine::RecsEngine;
pub use recs::error::EngineError;
