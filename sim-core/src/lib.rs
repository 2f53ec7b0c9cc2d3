//! Control layer for a circle-growth simulation engine.
//!
//! Main components:
//! - [`config`] — configuration snapshot read from the surface controls.
//! - [`engine`] — the capability contract of the simulation engine.
//! - [`adapter`] — pushes a validated snapshot into the engine.
//! - [`scheduler`] — start/stop/tick state machine.
//! - [`timer`] — interval timers the scheduler runs on.
//! - [`export`] — CSV export of the collected series.
//! - [`sketch`] — stand-in engine used by the viewer.

pub mod adapter;
pub mod config;
pub mod engine;
pub mod export;
pub mod scheduler;
pub mod sketch;
pub mod timer;
