//! Editable state behind the form controls.
//!
//! The widgets edit [`FormState`] in place; the snapshot is then read back
//! through [`ControlSource`], exactly as it would be from any other surface.

use circles_core::config::{ControlId, ControlSource, Snapshot};

#[derive(Clone, Debug, PartialEq)]
pub struct FormState {
    pub track_size: bool,
    pub track_active_count: bool,
    pub track_lifetime: bool,
    pub track_size_distribution: bool,
    pub bounded: bool,
    pub wait_until_end: bool,
    pub hungry: bool,
    pub use_z_alpha: bool,

    pub iterations_per_second: String,
    pub frequency: String,
    pub speed: String,
    pub duration_minutes: String,
    pub neighbour_limit: String,
    pub dimensionality: String,
}

impl FormState {
    /// Fills the controls with the values of `snapshot`.
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            track_size: snapshot.track_size,
            track_active_count: snapshot.track_active_count,
            track_lifetime: snapshot.track_lifetime,
            track_size_distribution: snapshot.track_size_distribution,
            bounded: snapshot.bounded,
            wait_until_end: snapshot.wait_until_end,
            hungry: snapshot.hungry,
            use_z_alpha: snapshot.use_z_alpha,
            iterations_per_second: snapshot.iterations_per_second.to_string(),
            frequency: snapshot.frequency.to_string(),
            speed: snapshot.speed.to_string(),
            duration_minutes: snapshot.duration_minutes.to_string(),
            neighbour_limit: snapshot.neighbour_limit.to_string(),
            dimensionality: snapshot.dimensionality.to_string(),
        }
    }

    /// The checkbox behind `id`, if it is one.
    pub fn flag_mut(&mut self, id: ControlId) -> Option<&mut bool> {
        Some(match id {
            ControlId::TrackSize => &mut self.track_size,
            ControlId::TrackActiveCount => &mut self.track_active_count,
            ControlId::TrackLifetime => &mut self.track_lifetime,
            ControlId::TrackSizeDistribution => &mut self.track_size_distribution,
            ControlId::Bounded => &mut self.bounded,
            ControlId::WaitUntilEnd => &mut self.wait_until_end,
            ControlId::Hungry => &mut self.hungry,
            ControlId::UseZAlpha => &mut self.use_z_alpha,
            _ => return None,
        })
    }

    /// The text field behind `id`, if it is one.
    pub fn text_mut(&mut self, id: ControlId) -> Option<&mut String> {
        Some(match id {
            ControlId::IterationsPerSecond => &mut self.iterations_per_second,
            ControlId::Frequency => &mut self.frequency,
            ControlId::Speed => &mut self.speed,
            ControlId::DurationMinutes => &mut self.duration_minutes,
            ControlId::NeighbourLimit => &mut self.neighbour_limit,
            ControlId::Dimensionality => &mut self.dimensionality,
            _ => return None,
        })
    }
}

impl Default for FormState {
    fn default() -> Self {
        Self::from_snapshot(&Snapshot::default())
    }
}

impl ControlSource for FormState {
    fn is_checked(&self, id: ControlId) -> bool {
        match id {
            ControlId::TrackSize => self.track_size,
            ControlId::TrackActiveCount => self.track_active_count,
            ControlId::TrackLifetime => self.track_lifetime,
            ControlId::TrackSizeDistribution => self.track_size_distribution,
            ControlId::Bounded => self.bounded,
            ControlId::WaitUntilEnd => self.wait_until_end,
            ControlId::Hungry => self.hungry,
            ControlId::UseZAlpha => self.use_z_alpha,
            _ => false,
        }
    }

    fn text(&self, id: ControlId) -> Option<&str> {
        let text = match id {
            ControlId::IterationsPerSecond => &self.iterations_per_second,
            ControlId::Frequency => &self.frequency,
            ControlId::Speed => &self.speed,
            ControlId::DurationMinutes => &self.duration_minutes,
            ControlId::NeighbourLimit => &self.neighbour_limit,
            ControlId::Dimensionality => &self.dimensionality,
            _ => return None,
        };
        Some(text.as_str())
    }
}
