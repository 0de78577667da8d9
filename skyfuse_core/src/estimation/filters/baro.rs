// skyfuse_core/src/estimation/filters/baro.rs

use tracing::info;

use crate::estimation::{Filter, FilterContext, FilterInitError, FilterRuntimeError};
use crate::state::StateUpdate;

/// Turns barometric pressure altitude into height above the take-off point.
///
/// The first `settle_samples` readings are averaged into a ground reference;
/// nothing is written until that reference exists. After that, every baro
/// sample produces `altitude = reading - ground_reference`.
#[derive(Debug, Clone)]
pub struct BaroFilter {
    settle_samples: u32,
    samples_seen: u32,
    accumulator: f64,
    ground_reference: Option<f64>,
}

impl BaroFilter {
    pub fn new(settle_samples: u32) -> Self {
        Self {
            settle_samples,
            samples_seen: 0,
            accumulator: 0.0,
            ground_reference: None,
        }
    }

    /// The pressure altitude of the ground, once settled.
    pub fn ground_reference(&self) -> Option<f64> {
        self.ground_reference
    }
}

impl Filter for BaroFilter {
    fn kind(&self) -> &'static str {
        "Barometric"
    }

    fn init(&mut self) -> Result<(), FilterInitError> {
        if self.settle_samples == 0 {
            return Err(FilterInitError::InvalidParameter {
                name: "settle_samples",
                reason: "at least one sample is needed for the ground reference".to_string(),
            });
        }
        self.samples_seen = 0;
        self.accumulator = 0.0;
        self.ground_reference = None;
        Ok(())
    }

    fn step(
        &mut self,
        ctx: &FilterContext,
        state: &mut StateUpdate,
    ) -> Result<(), FilterRuntimeError> {
        let Some(baro) = ctx.sensors.baro else {
            // No new reading this cycle; nothing to report.
            return Ok(());
        };

        if !baro.altitude.is_finite() {
            return Err(FilterRuntimeError::InvalidInput {
                input: "baro",
                reason: "non-finite altitude",
            });
        }

        let reference = match self.ground_reference {
            Some(reference) => reference,
            None => {
                self.accumulator += baro.altitude;
                self.samples_seen += 1;
                if self.samples_seen < self.settle_samples {
                    return Ok(());
                }
                let reference = self.accumulator / f64::from(self.samples_seen);
                info!(
                    "Barometric ground reference settled at {:.2} m after {} samples.",
                    reference, self.samples_seen
                );
                self.ground_reference = Some(reference);
                reference
            }
        };

        state.set_altitude(baro.altitude - reference);
        Ok(())
    }
}
