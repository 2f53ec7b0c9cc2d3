//! The capability contract of the simulation engine.
//!
//! The engine owns every bit of simulation state; the control surface only
//! configures it, steps it and reads its series back. Setters may refuse a
//! value, which is reported as an [`EngineError`].

use crate::config::Dimensionality;
use thiserror::Error;

/// A setter of the engine refused its value.
#[derive(Clone, Debug, PartialEq, Error)]
#[error("engine rejected {setting}: {reason}")]
pub struct EngineError {
    pub setting: &'static str,
    pub reason: String,
}

impl EngineError {
    pub fn rejected(setting: &'static str, reason: impl Into<String>) -> Self {
        Self {
            setting,
            reason: reason.into(),
        }
    }
}

pub trait SimulationEngine {
    fn set_iter_per_sec(&mut self, value: f64) -> Result<(), EngineError>;
    fn set_speed(&mut self, value: f64) -> Result<(), EngineError>;
    /// Run duration in seconds.
    fn set_time(&mut self, seconds: f64) -> Result<(), EngineError>;
    fn set_bounded(&mut self, value: bool) -> Result<(), EngineError>;
    fn set_should_wait_until_end(&mut self, value: bool) -> Result<(), EngineError>;
    fn set_hungry(&mut self, value: bool) -> Result<(), EngineError>;
    fn set_neighbour_limit(&mut self, value: u32) -> Result<(), EngineError>;
    fn set_gen_size(&mut self, value: bool) -> Result<(), EngineError>;
    fn set_gen_active_count(&mut self, value: bool) -> Result<(), EngineError>;
    fn set_gen_lifetime(&mut self, value: bool) -> Result<(), EngineError>;
    fn set_dimensions(&mut self, value: Dimensionality) -> Result<(), EngineError>;
    fn set_use_z_alpha(&mut self, value: bool) -> Result<(), EngineError>;

    /// Performs one engine step.
    fn draw(&mut self);
    fn is_finished(&self) -> bool;
    /// Drops all simulation data.
    fn clear(&mut self);

    /// Total size per tick.
    fn data_size(&self) -> Vec<f64>;
    /// Number of active objects per tick.
    fn data_active_count(&self) -> Vec<f64>;
    /// Lifetime samples per tick.
    fn data_lifetime(&self) -> Vec<f64>;
    /// Final size of each object, indexed by object.
    fn data_size_distribution(&self) -> Vec<f64>;
}
