// skyfuse_core/src/state.rs

use nalgebra::{UnitQuaternion, Vector3};
use std::fmt;

// =========================================================================
// == Field Tags ==
// =========================================================================

/// Every field of the [`StateEstimate`] that a filter can write.
/// A tag for a field is set in the `updated` set when the field was freshly
/// written during the current cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateField {
    /// Position in the local NED frame (meters).
    Position,
    /// Velocity in the local NED frame (meters/second).
    Velocity,
    /// Body -> NED rotation.
    Attitude,
    /// Bias-corrected angular rate in the body frame (rad/s).
    AngularRate,
    /// Height above the barometric ground reference (meters).
    Altitude,
}

impl StateField {
    pub const ALL: [StateField; 5] = [
        StateField::Position,
        StateField::Velocity,
        StateField::Attitude,
        StateField::AngularRate,
        StateField::Altitude,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StateField::Position => "position",
            StateField::Velocity => "velocity",
            StateField::Attitude => "attitude",
            StateField::AngularRate => "angular_rate",
            StateField::Altitude => "altitude",
        }
    }
}

impl fmt::Display for StateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of fields written during one cycle.
///
/// One boolean per field, so the meaning of every tag is checked by the
/// compiler. There is intentionally no public removal operation: a filter can
/// only add tags, never clear the ones set by a preceding filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct UpdatedFields {
    position: bool,
    velocity: bool,
    attitude: bool,
    angular_rate: bool,
    altitude: bool,
}

impl UpdatedFields {
    pub const EMPTY: UpdatedFields = UpdatedFields {
        position: false,
        velocity: false,
        attitude: false,
        angular_rate: false,
        altitude: false,
    };

    fn slot(&self, field: StateField) -> &bool {
        match field {
            StateField::Position => &self.position,
            StateField::Velocity => &self.velocity,
            StateField::Attitude => &self.attitude,
            StateField::AngularRate => &self.angular_rate,
            StateField::Altitude => &self.altitude,
        }
    }

    fn slot_mut(&mut self, field: StateField) -> &mut bool {
        match field {
            StateField::Position => &mut self.position,
            StateField::Velocity => &mut self.velocity,
            StateField::Attitude => &mut self.attitude,
            StateField::AngularRate => &mut self.angular_rate,
            StateField::Altitude => &mut self.altitude,
        }
    }

    pub fn contains(&self, field: StateField) -> bool {
        *self.slot(field)
    }

    pub fn insert(&mut self, field: StateField) {
        *self.slot_mut(field) = true;
    }

    /// Returns the union of both sets.
    pub fn union(self, other: UpdatedFields) -> UpdatedFields {
        UpdatedFields {
            position: self.position || other.position,
            velocity: self.velocity || other.velocity,
            attitude: self.attitude || other.attitude,
            angular_rate: self.angular_rate || other.angular_rate,
            altitude: self.altitude || other.altitude,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Iterates the tags in the set, in [`StateField::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = StateField> + '_ {
        StateField::ALL
            .into_iter()
            .filter(move |field| self.contains(*field))
    }

    /// Only the pipeline resets the set, at the start of a cycle.
    pub(crate) fn clear(&mut self) {
        *self = Self::EMPTY;
    }
}

impl FromIterator<StateField> for UpdatedFields {
    fn from_iter<I: IntoIterator<Item = StateField>>(iter: I) -> Self {
        let mut set = UpdatedFields::EMPTY;
        for field in iter {
            set.insert(field);
        }
        set
    }
}

impl fmt::Display for UpdatedFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, field) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(field.as_str())?;
        }
        f.write_str("}")
    }
}

// =========================================================================
// == State Estimate ==
// =========================================================================

/// The fused vehicle state, shared by every filter of the chain.
///
/// It is created once when the pipeline is constructed and mutated in place
/// every cycle. A value whose tag is not in [`StateEstimate::updated`] was not
/// refreshed this cycle and must not be trusted as current: it holds whatever
/// the last successful writer left there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateEstimate {
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
    pub attitude: UnitQuaternion<f64>,
    pub angular_rate: Vector3<f64>,
    pub altitude: f64,
    updated: UpdatedFields,
}

impl Default for StateEstimate {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            velocity: Vector3::zeros(),
            attitude: UnitQuaternion::identity(),
            angular_rate: Vector3::zeros(),
            altitude: 0.0,
            updated: UpdatedFields::EMPTY,
        }
    }
}

impl StateEstimate {
    /// Tags of the fields written during the last completed cycle.
    pub fn updated(&self) -> UpdatedFields {
        self.updated
    }

    /// True if `field` was freshly written during the last cycle.
    pub fn is_fresh(&self, field: StateField) -> bool {
        self.updated.contains(field)
    }

    pub(crate) fn begin_cycle(&mut self) {
        self.updated.clear();
    }

    /// Copies the fields tagged in `written` from `staged`, then merges the tags.
    pub(crate) fn commit(&mut self, staged: &StateEstimate, written: UpdatedFields) {
        for field in written.iter() {
            match field {
                StateField::Position => self.position = staged.position,
                StateField::Velocity => self.velocity = staged.velocity,
                StateField::Attitude => self.attitude = staged.attitude,
                StateField::AngularRate => self.angular_rate = staged.angular_rate,
                StateField::Altitude => self.altitude = staged.altitude,
            }
        }
        self.updated = self.updated.union(written);
    }
}

// =========================================================================
// == Filter Write View ==
// =========================================================================

/// The view a filter gets of the [`StateEstimate`] during its `step`.
///
/// Reads see the state as left by the filters that already ran this cycle.
/// Every setter writes the value and records the matching tag, so a filter
/// reports a field as fresh if and only if it wrote it.
pub struct StateUpdate<'a> {
    state: &'a mut StateEstimate,
    written: UpdatedFields,
}

impl<'a> StateUpdate<'a> {
    pub fn new(state: &'a mut StateEstimate) -> Self {
        Self {
            state,
            written: UpdatedFields::EMPTY,
        }
    }

    pub fn current(&self) -> &StateEstimate {
        self.state
    }

    pub fn set_position(&mut self, position: Vector3<f64>) {
        self.state.position = position;
        self.written.insert(StateField::Position);
    }

    pub fn set_velocity(&mut self, velocity: Vector3<f64>) {
        self.state.velocity = velocity;
        self.written.insert(StateField::Velocity);
    }

    pub fn set_attitude(&mut self, attitude: UnitQuaternion<f64>) {
        self.state.attitude = attitude;
        self.written.insert(StateField::Attitude);
    }

    pub fn set_angular_rate(&mut self, angular_rate: Vector3<f64>) {
        self.state.angular_rate = angular_rate;
        self.written.insert(StateField::AngularRate);
    }

    pub fn set_altitude(&mut self, altitude: f64) {
        self.state.altitude = altitude;
        self.written.insert(StateField::Altitude);
    }

    /// The tags this filter wrote through this view.
    pub fn written(&self) -> UpdatedFields {
        self.written
    }
}
