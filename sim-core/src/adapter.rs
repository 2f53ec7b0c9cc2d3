//! Pushes validated run parameters into a [`SimulationEngine`].
//!
//! The setters are independent of each other, so the order below carries no
//! meaning. The adapter is not transactional: when a setter fails, the
//! setters before it have already taken effect and stay that way.

use crate::config::RunParams;
use crate::engine::{EngineError, SimulationEngine};

pub const SECONDS_PER_MINUTE: f64 = 60.0;

/// Configures `engine` so that it reflects `params`.
///
/// Stops at the first setter that fails and returns its error.
pub fn apply_configuration(
    engine: &mut impl SimulationEngine,
    params: &RunParams,
) -> Result<(), EngineError> {
    engine.set_iter_per_sec(params.iterations_per_second)?;
    apply_speed(engine, params.speed)?;
    apply_duration_minutes(engine, params.duration_minutes)?;
    engine.set_bounded(params.bounded)?;
    engine.set_should_wait_until_end(params.wait_until_end)?;
    engine.set_hungry(params.hungry)?;
    engine.set_neighbour_limit(params.neighbour_limit)?;

    engine.set_gen_size(params.track_size)?;
    engine.set_gen_active_count(params.track_active_count)?;
    engine.set_gen_lifetime(params.track_lifetime)?;

    engine.set_dimensions(params.dimensionality)?;
    engine.set_use_z_alpha(params.use_z_alpha)?;
    Ok(())
}

#[inline]
pub fn apply_speed(engine: &mut impl SimulationEngine, speed: f64) -> Result<(), EngineError> {
    engine.set_speed(speed)
}

/// Sets the run duration; the engine counts in seconds.
#[inline]
pub fn apply_duration_minutes(
    engine: &mut impl SimulationEngine,
    minutes: f64,
) -> Result<(), EngineError> {
    engine.set_time(minutes * SECONDS_PER_MINUTE)
}
