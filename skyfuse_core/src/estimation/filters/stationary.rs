// skyfuse_core/src/estimation/filters/stationary.rs

use nalgebra::Vector3;

use crate::estimation::{Filter, FilterContext, FilterInitError, FilterRuntimeError};
use crate::state::StateUpdate;

/// Provides "fake" stationary state data for indoor mode.
///
/// Used when the system assumes the vehicle does not move and no real
/// localization source is configured. Every cycle it reports the vehicle at the
/// origin, at rest.
#[derive(Debug, Default, Clone, Copy)]
pub struct StationaryFilter;

impl Filter for StationaryFilter {
    fn kind(&self) -> &'static str {
        "Stationary"
    }

    fn init(&mut self) -> Result<(), FilterInitError> {
        Ok(())
    }

    fn step(
        &mut self,
        _ctx: &FilterContext,
        state: &mut StateUpdate,
    ) -> Result<(), FilterRuntimeError> {
        state.set_position(Vector3::zeros());
        state.set_velocity(Vector3::zeros());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::SensorFrame;
    use crate::state::{StateEstimate, StateField, UpdatedFields};

    #[test]
    fn writes_zero_position_and_velocity() {
        let frame = SensorFrame::default();
        let ctx = FilterContext {
            sensors: &frame,
            dt: 0.01,
            cycle: 1,
        };
        let mut state = StateEstimate::default();
        state.position = Vector3::new(3.0, -1.0, 2.0);
        state.velocity = Vector3::new(0.2, 0.2, 0.0);

        let mut update = StateUpdate::new(&mut state);
        let mut filter = StationaryFilter;
        filter.init().unwrap();
        filter.step(&ctx, &mut update).unwrap();

        let expected: UpdatedFields = [StateField::Position, StateField::Velocity]
            .into_iter()
            .collect();
        assert_eq!(update.written(), expected);
        assert_eq!(state.position, Vector3::zeros());
        assert_eq!(state.velocity, Vector3::zeros());
    }
}
