// skyfuse_core/src/estimation/filters/gps.rs

use crate::estimation::{Filter, FilterContext, FilterInitError, FilterRuntimeError};
use crate::frames::GeoPoint;
use crate::messages::GpsFix;
use crate::state::StateUpdate;

/// Converts GPS solutions into position and velocity in the local NED frame
/// anchored at the home location.
#[derive(Debug, Clone)]
pub struct GpsFilter {
    home: GeoPoint,
    min_satellites: u8,
}

impl GpsFilter {
    pub fn new(home: GeoPoint, min_satellites: u8) -> Self {
        Self {
            home,
            min_satellites,
        }
    }

    pub fn home(&self) -> &GeoPoint {
        &self.home
    }
}

impl Filter for GpsFilter {
    fn kind(&self) -> &'static str {
        "Gps"
    }

    fn init(&mut self) -> Result<(), FilterInitError> {
        self.home
            .validate()
            .map_err(|reason| FilterInitError::InvalidParameter {
                name: "home",
                reason,
            })
    }

    fn step(
        &mut self,
        ctx: &FilterContext,
        state: &mut StateUpdate,
    ) -> Result<(), FilterRuntimeError> {
        let Some(gps) = ctx.sensors.gps else {
            return Ok(());
        };

        if gps.fix < GpsFix::Fix3D || gps.satellites < self.min_satellites {
            return Err(FilterRuntimeError::NoFix {
                satellites: gps.satellites,
            });
        }

        let point = GeoPoint::new(gps.latitude_deg, gps.longitude_deg, gps.altitude_m);
        let position = point.to_ned(&self.home);
        let finite = position.iter().chain(gps.velocity_ned.iter()).all(|v| v.is_finite());
        if !finite {
            return Err(FilterRuntimeError::InvalidInput {
                input: "gps",
                reason: "non-finite solution",
            });
        }

        state.set_position(position);
        state.set_velocity(gps.velocity_ned);
        Ok(())
    }
}
