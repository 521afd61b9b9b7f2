//! Glassify overlay pipeline runtime.
//!
//! This crate provides:
//! - The acquisition loop driving streaming detection cycles
//! - The mode coordinator owning capture and loop lifecycles
//! - Environment-driven application configuration
//! - Session-scoped structured logging

pub mod acquisition;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod logging;
pub mod state;

#[cfg(test)]
mod testing;

pub use acquisition::{
    stream_slot, AcquisitionController, CycleOutcome, SharedCompositor, StreamSlot,
};
pub use config::AppConfig;
pub use coordinator::ModeCoordinator;
pub use error::{WorkerError, WorkerResult};
pub use logging::SessionLogger;
pub use state::{PipelineState, SharedState};
