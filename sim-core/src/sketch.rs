//! A stand-in engine that scatters growing circles on the canvas.
//!
//! [`SketchEngine`] honours the whole [`SimulationEngine`] contract so the
//! control surface can be run and exported from without the real growth
//! engine. It does not detect collisions between circles: every circle
//! grows towards a random target radius and settles there (or earlier, at
//! the canvas border when the domain is bounded).

use glam::Vec3;
use rand::{Rng, rngs::ThreadRng};

use crate::config::{Dimensionality, INITIAL_DURATION_MINUTES, INITIAL_NEIGHBOUR_LIMIT, INITIAL_SPEED};
use crate::engine::{EngineError, SimulationEngine};

/// Edge length of the canvas, in mm.
pub const CANVAS_SIZE: f32 = 1000.0;
/// Radius growth per simulated second, in mm.
pub const GROWTH_RATE: f32 = 10.0;
/// Minimum opacity of a circle when depth fading is on.
pub const MIN_ALPHA: f32 = 0.8;

const TARGET_RADIUS: std::ops::Range<f32> = 5.0..60.0;

/// Everything the engine has been told through its setters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineSettings {
    pub iter_per_sec: f64,
    pub speed: f64,
    /// Run duration, in seconds.
    pub time: f64,
    pub bounded: bool,
    pub wait_until_end: bool,
    pub hungry: bool,
    pub neighbour_limit: u32,
    pub gen_size: bool,
    pub gen_active_count: bool,
    pub gen_lifetime: bool,
    pub dimensions: Dimensionality,
    pub use_z_alpha: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            iter_per_sec: 10.0,
            speed: INITIAL_SPEED,
            time: INITIAL_DURATION_MINUTES * 60.0,
            bounded: true,
            wait_until_end: false,
            hungry: false,
            neighbour_limit: INITIAL_NEIGHBOUR_LIMIT as u32,
            gen_size: false,
            gen_active_count: false,
            gen_lifetime: false,
            dimensions: Dimensionality::Two,
            use_z_alpha: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SketchCircle {
    /// Centre in canvas coordinates (mm). `z` is only used in 3D.
    pub pos: Vec3,
    pub radius: f32,
    pub target: f32,
    /// Simulated time at which the circle appeared.
    pub born: f64,
    pub color: [u8; 3],
    pub active: bool,
}

impl SketchCircle {
    /// Length, area or volume of the circle depending on `dims`.
    pub fn size(&self, dims: Dimensionality) -> f64 {
        let r = self.radius as f64;
        match dims {
            Dimensionality::One => 2.0 * r,
            Dimensionality::Two => std::f64::consts::PI * r * r,
            Dimensionality::Three => 4.0 / 3.0 * std::f64::consts::PI * r * r * r,
        }
    }

    /// Opacity used when drawing; deeper circles fade towards [`MIN_ALPHA`].
    pub fn alpha(&self, use_z_alpha: bool) -> f32 {
        if use_z_alpha {
            1.0 - (1.0 - MIN_ALPHA) * (self.pos.z / CANVAS_SIZE).clamp(0.0, 1.0)
        } else {
            1.0
        }
    }

    pub fn out_of_bounds(&self, dims: Dimensionality) -> bool {
        let touches = |c: f32| self.radius >= c || self.radius >= CANVAS_SIZE - c;
        match dims {
            Dimensionality::One => touches(self.pos.x),
            Dimensionality::Two => touches(self.pos.x) || touches(self.pos.y),
            Dimensionality::Three => {
                touches(self.pos.x) || touches(self.pos.y) || touches(self.pos.z)
            }
        }
    }
}

pub struct SketchEngine {
    settings: EngineSettings,
    circles: Vec<SketchCircle>,
    elapsed: f64,
    lifetimes: Vec<f64>,

    data_size: Vec<f64>,
    data_active_count: Vec<f64>,
    data_lifetime: Vec<f64>,

    rng: ThreadRng,
}

impl Default for SketchEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SketchEngine {
    pub fn new() -> Self {
        Self {
            settings: EngineSettings::default(),
            circles: Vec::new(),
            elapsed: 0.0,
            lifetimes: Vec::new(),
            data_size: Vec::new(),
            data_active_count: Vec::new(),
            data_lifetime: Vec::new(),
            rng: rand::rng(),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn circles(&self) -> &[SketchCircle] {
        &self.circles
    }

    /// Simulated seconds since the last clear.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn active_count(&self) -> usize {
        self.circles.iter().filter(|c| c.active).count()
    }

    fn spawn(&mut self) {
        let dims = self.settings.dimensions;
        let mid = CANVAS_SIZE * 0.5;
        let x = self.rng.random_range(0.0..CANVAS_SIZE);
        let y = match dims {
            Dimensionality::One => mid,
            _ => self.rng.random_range(0.0..CANVAS_SIZE),
        };
        let z = match dims {
            Dimensionality::Three => self.rng.random_range(0.0..CANVAS_SIZE),
            _ => 0.0,
        };

        self.circles.push(SketchCircle {
            pos: Vec3::new(x, y, z),
            radius: 0.0,
            target: self.rng.random_range(TARGET_RADIUS),
            born: self.elapsed,
            color: [self.rng.random(), self.rng.random(), self.rng.random()],
            active: true,
        });
    }

    fn record(&mut self) {
        let dims = self.settings.dimensions;
        if self.settings.gen_size {
            let total = self.circles.iter().map(|c| c.size(dims)).sum();
            self.data_size.push(total);
        }
        if self.settings.gen_active_count {
            self.data_active_count.push(self.active_count() as f64);
        }
        if self.settings.gen_lifetime {
            let mean = if self.lifetimes.is_empty() {
                0.0
            } else {
                self.lifetimes.iter().sum::<f64>() / self.lifetimes.len() as f64
            };
            self.data_lifetime.push(mean);
        }
    }
}

fn finite(setting: &'static str, value: f64, allow_zero: bool) -> Result<f64, EngineError> {
    if !value.is_finite() {
        return Err(EngineError::rejected(setting, format!("{value} is not finite")));
    }
    if value < 0.0 || (!allow_zero && value == 0.0) {
        return Err(EngineError::rejected(setting, format!("{value} is out of range")));
    }
    Ok(value)
}

impl SimulationEngine for SketchEngine {
    fn set_iter_per_sec(&mut self, value: f64) -> Result<(), EngineError> {
        self.settings.iter_per_sec = finite("iterations per second", value, false)?;
        Ok(())
    }

    fn set_speed(&mut self, value: f64) -> Result<(), EngineError> {
        self.settings.speed = finite("speed", value, true)?;
        Ok(())
    }

    fn set_time(&mut self, seconds: f64) -> Result<(), EngineError> {
        self.settings.time = finite("time", seconds, true)?;
        Ok(())
    }

    fn set_bounded(&mut self, value: bool) -> Result<(), EngineError> {
        self.settings.bounded = value;
        Ok(())
    }

    fn set_should_wait_until_end(&mut self, value: bool) -> Result<(), EngineError> {
        self.settings.wait_until_end = value;
        Ok(())
    }

    fn set_hungry(&mut self, value: bool) -> Result<(), EngineError> {
        self.settings.hungry = value;
        Ok(())
    }

    fn set_neighbour_limit(&mut self, value: u32) -> Result<(), EngineError> {
        self.settings.neighbour_limit = value;
        Ok(())
    }

    fn set_gen_size(&mut self, value: bool) -> Result<(), EngineError> {
        self.settings.gen_size = value;
        Ok(())
    }

    fn set_gen_active_count(&mut self, value: bool) -> Result<(), EngineError> {
        self.settings.gen_active_count = value;
        Ok(())
    }

    fn set_gen_lifetime(&mut self, value: bool) -> Result<(), EngineError> {
        self.settings.gen_lifetime = value;
        Ok(())
    }

    fn set_dimensions(&mut self, value: Dimensionality) -> Result<(), EngineError> {
        self.settings.dimensions = value;
        Ok(())
    }

    fn set_use_z_alpha(&mut self, value: bool) -> Result<(), EngineError> {
        self.settings.use_z_alpha = value;
        Ok(())
    }

    /// One step: maybe spawn a circle, grow the active ones, sample the series.
    fn draw(&mut self) {
        let dt = self.settings.speed / self.settings.iter_per_sec;

        // Speed 0 freezes the sketch: no time passes, so nothing new appears.
        if dt > 0.0 && self.elapsed < self.settings.time {
            self.spawn();
        }

        let dims = self.settings.dimensions;
        let bounded = self.settings.bounded;
        let now = self.elapsed + dt;
        let growth = GROWTH_RATE * dt as f32;
        for c in self.circles.iter_mut().filter(|c| c.active) {
            c.radius = (c.radius + growth).min(c.target);
            if c.radius >= c.target || (bounded && c.out_of_bounds(dims)) {
                c.active = false;
                self.lifetimes.push(now - c.born);
            }
        }

        self.elapsed = now;
        self.record();
    }

    fn is_finished(&self) -> bool {
        self.elapsed >= self.settings.time
            && (!self.settings.wait_until_end || self.active_count() == 0)
    }

    fn clear(&mut self) {
        self.circles.clear();
        self.lifetimes.clear();
        self.data_size.clear();
        self.data_active_count.clear();
        self.data_lifetime.clear();
        self.elapsed = 0.0;
    }

    fn data_size(&self) -> Vec<f64> {
        self.data_size.clone()
    }

    fn data_active_count(&self) -> Vec<f64> {
        self.data_active_count.clone()
    }

    fn data_lifetime(&self) -> Vec<f64> {
        self.data_lifetime.clone()
    }

    fn data_size_distribution(&self) -> Vec<f64> {
        let dims = self.settings.dimensions;
        self.circles.iter().map(|c| c.size(dims)).collect()
    }
}
