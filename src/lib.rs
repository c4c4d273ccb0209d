//! MeiLin ambient host: spontaneous idle behaviors for the MeiLin VTuber.
//!
//! This crate wraps the synchronous [`meilin_ambient`] selector with what a
//! running companion needs around it:
//! - **Configuration**: TOML host settings (`~/.config/meilin/config.toml`)
//! - **Engine**: owns the clock and RNG, gates draws by a trigger probability
//! - **Runner**: a tokio idle loop that turns silence into sighs and hums,
//!   driven by commands and reporting events over channels
//! - **Diagnostics**: `tracing` subscriber with optional rotated log files

pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod meilin_dirs;
pub mod runner;

pub use config::{AmbientConfig, LoggingConfig, MeiLinConfig};
pub use engine::AmbientEngine;
pub use error::{MeiLinError, Result};
pub use runner::{
    AmbientCommand, AmbientEvent, AmbientHandle, AmbientLoop, AmbientLoopConfig, TokioClock,
    Trigger,
};
