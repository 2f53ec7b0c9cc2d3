//! Configuration snapshot read from the control surface.
//!
//! The surface exposes every parameter as a control with a stable
//! identifier ([`ControlId`]). [`read_params`] walks all of them and
//! produces a fresh [`Snapshot`] value; nothing here validates or talks
//! to the engine. Validation happens once, at run start, through
//! [`Snapshot::validate`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Initial growth speed of the stand-in engine, in mm/s.
pub const INITIAL_SPEED: f64 = 1.0;
/// Initial run duration, in minutes.
pub const INITIAL_DURATION_MINUTES: f64 = 15.0;
pub const INITIAL_NEIGHBOUR_LIMIT: f64 = 5.0;

/// Stable identifiers of the controls the snapshot is read from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ControlId {
    TrackSize,
    TrackActiveCount,
    TrackLifetime,
    TrackSizeDistribution,
    IterationsPerSecond,
    Speed,
    DurationMinutes,
    Bounded,
    WaitUntilEnd,
    Hungry,
    NeighbourLimit,
    Frequency,
    Dimensionality,
    UseZAlpha,
}

impl ControlId {
    pub const ALL: [ControlId; 14] = [
        ControlId::TrackSize,
        ControlId::TrackActiveCount,
        ControlId::TrackLifetime,
        ControlId::TrackSizeDistribution,
        ControlId::IterationsPerSecond,
        ControlId::Speed,
        ControlId::DurationMinutes,
        ControlId::Bounded,
        ControlId::WaitUntilEnd,
        ControlId::Hungry,
        ControlId::NeighbourLimit,
        ControlId::Frequency,
        ControlId::Dimensionality,
        ControlId::UseZAlpha,
    ];

    /// The identifier string the control is registered under.
    pub fn as_str(self) -> &'static str {
        match self {
            ControlId::TrackSize => "param_gen_St",
            ControlId::TrackActiveCount => "param_gen_Nt",
            ControlId::TrackLifetime => "param_gen_Tt",
            ControlId::TrackSizeDistribution => "param_gen_size_distrib",
            ControlId::IterationsPerSecond => "param_iter_per_sec",
            ControlId::Speed => "speed",
            ControlId::DurationMinutes => "time",
            ControlId::Bounded => "param_bounded",
            ControlId::WaitUntilEnd => "param_wait",
            ControlId::Hungry => "param_hungry",
            ControlId::NeighbourLimit => "param_neighbour_limit",
            ControlId::Frequency => "param_freq",
            ControlId::Dimensionality => "param_dim",
            ControlId::UseZAlpha => "param_zalpha",
        }
    }

    pub fn from_name(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == id)
    }

    /// Whether the control is a checkbox (as opposed to a text field).
    pub fn is_flag(self) -> bool {
        matches!(
            self,
            ControlId::TrackSize
                | ControlId::TrackActiveCount
                | ControlId::TrackLifetime
                | ControlId::TrackSizeDistribution
                | ControlId::Bounded
                | ControlId::WaitUntilEnd
                | ControlId::Hungry
                | ControlId::UseZAlpha
        )
    }
}

/// Read access to the controls of the surface.
///
/// A checkbox that does not exist reads as unchecked; a text control that
/// does not exist reads as `None` and ends up as NaN in the snapshot.
pub trait ControlSource {
    fn is_checked(&self, id: ControlId) -> bool;
    fn text(&self, id: ControlId) -> Option<&str>;
}

/// Every configuration field captured at one point in time.
///
/// Numeric fields hold whatever the controls parsed to, NaN included.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub track_size: bool,
    pub track_active_count: bool,
    pub track_lifetime: bool,
    pub track_size_distribution: bool,
    pub bounded: bool,
    pub wait_until_end: bool,
    pub hungry: bool,
    pub use_z_alpha: bool,

    pub iterations_per_second: f64,
    pub frequency: f64,
    pub speed: f64,
    pub duration_minutes: f64,
    pub neighbour_limit: f64,
    pub dimensionality: f64,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            track_size: true,
            track_active_count: true,
            track_lifetime: true,
            track_size_distribution: true,
            bounded: true,
            wait_until_end: false,
            hungry: false,
            use_z_alpha: false,
            iterations_per_second: 10.0,
            frequency: 30.0,
            speed: INITIAL_SPEED,
            duration_minutes: INITIAL_DURATION_MINUTES,
            neighbour_limit: INITIAL_NEIGHBOUR_LIMIT,
            dimensionality: 2.0,
        }
    }
}

impl Snapshot {
    /// Copy of this snapshot with a live speed edit applied.
    pub fn with_speed(self, text: &str) -> Self {
        Self {
            speed: parse_number_strict(text),
            ..self
        }
    }

    /// Copy of this snapshot with a live duration edit applied.
    pub fn with_duration_minutes(self, text: &str) -> Self {
        Self {
            duration_minutes: parse_number_strict(text),
            ..self
        }
    }

    /// Checks the snapshot against the run-start gate.
    ///
    /// The zero checks come first so that the user sees the same message
    /// for `0` whether or not other fields are also broken.
    pub fn validate(&self) -> Result<RunParams, ValidationError> {
        if self.iterations_per_second == 0.0 {
            return Err(ValidationError::ZeroIterations);
        }
        if self.frequency == 0.0 {
            return Err(ValidationError::ZeroFrequency);
        }
        let dimensionality = Dimensionality::from_value(self.dimensionality)
            .ok_or(ValidationError::DimensionOutOfRange(self.dimensionality))?;

        let iterations_per_second = positive("iterations per second", self.iterations_per_second)?;
        let frequency = positive("sampling frequency", self.frequency)?;
        let speed = non_negative("speed", self.speed)?;
        let duration_minutes = non_negative("duration", self.duration_minutes)?;
        let neighbour_limit = non_negative("neighbour limit", self.neighbour_limit)?.round();
        if neighbour_limit > u32::MAX as f64 {
            return Err(ValidationError::TooLarge {
                field: "neighbour limit",
                value: self.neighbour_limit,
            });
        }
        let sample_period = Duration::try_from_secs_f64(1.0 / frequency)
            .map_err(|_| ValidationError::FrequencyTooLow(frequency))?;

        Ok(RunParams {
            iterations_per_second,
            frequency,
            sample_period,
            speed,
            duration_minutes,
            neighbour_limit: neighbour_limit as u32,
            dimensionality,
            bounded: self.bounded,
            wait_until_end: self.wait_until_end,
            hungry: self.hungry,
            use_z_alpha: self.use_z_alpha,
            track_size: self.track_size,
            track_active_count: self.track_active_count,
            track_lifetime: self.track_lifetime,
        })
    }
}

fn positive(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NotANumber { field });
    }
    if value <= 0.0 {
        return Err(ValidationError::NotPositive { field, value });
    }
    Ok(value)
}

fn non_negative(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NotANumber { field });
    }
    if value < 0.0 {
        return Err(ValidationError::Negative { field, value });
    }
    Ok(value)
}

/// Number of spatial dimensions the engine simulates in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimensionality {
    One,
    Two,
    Three,
}

impl Dimensionality {
    /// Accepts exactly 1, 2 or 3.
    pub fn from_value(value: f64) -> Option<Self> {
        if value == 1.0 {
            Some(Dimensionality::One)
        } else if value == 2.0 {
            Some(Dimensionality::Two)
        } else if value == 3.0 {
            Some(Dimensionality::Three)
        } else {
            None
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Dimensionality::One => 1,
            Dimensionality::Two => 2,
            Dimensionality::Three => 3,
        }
    }
}

/// A snapshot that passed the start gate, with typed fields.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunParams {
    pub iterations_per_second: f64,
    pub frequency: f64,
    /// Time between two samples, `1 / frequency`.
    pub sample_period: Duration,
    pub speed: f64,
    pub duration_minutes: f64,
    pub neighbour_limit: u32,
    pub dimensionality: Dimensionality,
    pub bounded: bool,
    pub wait_until_end: bool,
    pub hungry: bool,
    pub use_z_alpha: bool,
    pub track_size: bool,
    pub track_active_count: bool,
    pub track_lifetime: bool,
}

/// Why a snapshot was refused at run start. The message is shown to the user.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ValidationError {
    #[error("Iterations per second must not be 0!")]
    ZeroIterations,

    #[error("Sampling frequency must not be 0!")]
    ZeroFrequency,

    #[error("Number of dimensions must be 1, 2 or 3 (got {0})!")]
    DimensionOutOfRange(f64),

    #[error("The {field} field does not contain a number!")]
    NotANumber { field: &'static str },

    #[error("The {field} must be greater than 0 (got {value})!")]
    NotPositive { field: &'static str, value: f64 },

    #[error("The {field} must not be negative (got {value})!")]
    Negative { field: &'static str, value: f64 },

    #[error("The {field} is too large (got {value})!")]
    TooLarge { field: &'static str, value: f64 },

    #[error("Sampling frequency {0} is too low to schedule!")]
    FrequencyTooLow(f64),
}

/// Reads every control into a fresh snapshot. Never fails.
pub fn read_params(source: &impl ControlSource) -> Snapshot {
    let num = |id| source.text(id).map_or(f64::NAN, parse_float_prefix);

    let snapshot = Snapshot {
        track_size: source.is_checked(ControlId::TrackSize),
        track_active_count: source.is_checked(ControlId::TrackActiveCount),
        track_lifetime: source.is_checked(ControlId::TrackLifetime),
        track_size_distribution: source.is_checked(ControlId::TrackSizeDistribution),
        bounded: source.is_checked(ControlId::Bounded),
        wait_until_end: source.is_checked(ControlId::WaitUntilEnd),
        hungry: source.is_checked(ControlId::Hungry),
        use_z_alpha: source.is_checked(ControlId::UseZAlpha),
        iterations_per_second: num(ControlId::IterationsPerSecond),
        frequency: num(ControlId::Frequency),
        speed: num(ControlId::Speed),
        duration_minutes: num(ControlId::DurationMinutes),
        neighbour_limit: num(ControlId::NeighbourLimit),
        dimensionality: num(ControlId::Dimensionality),
    };

    debug!("Mode: {}D", snapshot.dimensionality);
    snapshot
}

/// Parses the longest numeric prefix of `text`, after leading whitespace.
///
/// `"12abc"` is 12, `"  -3.5e2x"` is -350, `"Infinity"` is infinite and
/// anything without a numeric prefix (including the empty string) is NaN.
pub fn parse_float_prefix(text: &str) -> f64 {
    let s = text.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    if s[end..].starts_with("Infinity") {
        return if s.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut mantissa_digits = end - digits_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        mantissa_digits += frac_end - frac_start;
        if mantissa_digits > 0 {
            end = frac_end;
        }
    }
    if mantissa_digits == 0 {
        return f64::NAN;
    }

    // Exponent only counts when at least one digit follows it.
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse().unwrap_or(f64::NAN)
}

/// Parses the whole of `text` as a number.
///
/// Surrounding whitespace is ignored and blank text is 0. Any trailing
/// garbage makes the result NaN.
pub fn parse_number_strict(text: &str) -> f64 {
    let s = text.trim();
    if s.is_empty() {
        return 0.0;
    }
    let unsigned = s.trim_start_matches(['+', '-']);
    if unsigned == "Infinity" {
        return if s.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }
    // Rust's parser also accepts "inf"/"nan" spellings that are not numbers here.
    if !unsigned.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return f64::NAN;
    }
    s.parse().unwrap_or(f64::NAN)
}
