// skyfuse_core/src/estimation/filters/mod.rs

//! Concrete filters shipped with the crate. Each one implements
//! [`crate::estimation::Filter`] and owns a fixed subset of the state fields:
//!
//! | filter                  | writes                      |
//! |-------------------------|-----------------------------|
//! | [`StationaryFilter`]    | position, velocity          |
//! | [`BaroFilter`]          | altitude                    |
//! | [`GpsFilter`]           | position, velocity          |
//! | [`ComplementaryFilter`] | attitude, angular_rate      |
//! | [`ExternalPoseFilter`]  | position, attitude (if any) |

mod baro;
mod complementary;
mod external_pose;
mod gps;
mod stationary;

pub use baro::BaroFilter;
pub use complementary::ComplementaryFilter;
pub use external_pose::ExternalPoseFilter;
pub use gps::GpsFilter;
pub use stationary::StationaryFilter;
