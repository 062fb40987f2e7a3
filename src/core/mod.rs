//! Core types shared across the pipeline.

mod phase;
mod state;

pub use phase::{Phase, PhaseTracker};
pub use state::{register_server, setup_shutdown_handler, wait_for_shutdown};
