// skyfuse_core/src/estimation/registry.rs

use std::collections::HashMap;

use crate::config::FilterKind;
use crate::estimation::filters::{
    BaroFilter, ComplementaryFilter, ExternalPoseFilter, GpsFilter, StationaryFilter,
};
use crate::estimation::{BuildContext, ChainError, Filter};

// A factory knows how to create one kind of filter from its configuration.
pub type FilterFactory =
    Box<dyn Fn(&FilterKind, &BuildContext) -> Result<Box<dyn Filter>, ChainError> + Send + Sync>;

/// Maps a configured filter kind (the `type` string of a chain entry) to the
/// factory that creates it. New filters are added by registering a factory;
/// the pipeline itself never changes.
#[derive(Default)]
pub struct FilterRegistry(pub HashMap<String, FilterFactory>);

impl FilterRegistry {
    /// A registry that knows every filter shipped with this crate.
    pub fn with_builtins() -> Self {
        let mut registry = Self::default();

        registry.register("Stationary", |_, _| Ok(Box::new(StationaryFilter)));
        registry.register("Barometric", |kind, _| match kind {
            FilterKind::Barometric { settle_samples } => {
                Ok(Box::new(BaroFilter::new(*settle_samples)))
            }
            other => Err(mismatch("Barometric", other)),
        });
        registry.register("Gps", |kind, _| match kind {
            FilterKind::Gps {
                home,
                min_satellites,
            } => Ok(Box::new(GpsFilter::new(*home, *min_satellites))),
            other => Err(mismatch("Gps", other)),
        });
        registry.register("Complementary", |kind, _| match kind {
            FilterKind::Complementary {
                accel_gain,
                bias_gain,
            } => Ok(Box::new(ComplementaryFilter::new(*accel_gain, *bias_gain))),
            other => Err(mismatch("Complementary", other)),
        });
        registry.register("ExternalPose", |kind, ctx| match kind {
            // A missing feed is not a build error: the filter reports it from `init`,
            // which excludes it without taking the rest of the chain down.
            FilterKind::ExternalPose { max_age_s } => Ok(Box::new(ExternalPoseFilter::new(
                ctx.pose_feed.clone(),
                *max_age_s,
            ))),
            other => Err(mismatch("ExternalPose", other)),
        });

        registry
    }

    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&FilterKind, &BuildContext) -> Result<Box<dyn Filter>, ChainError>
            + Send
            + Sync
            + 'static,
    {
        self.0.insert(kind.into(), Box::new(factory));
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.0.contains_key(kind)
    }

    pub fn create(
        &self,
        kind: &FilterKind,
        ctx: &BuildContext,
    ) -> Result<Box<dyn Filter>, ChainError> {
        let key = kind.kind_str();
        let factory = self
            .0
            .get(key)
            .ok_or_else(|| ChainError::UnknownKind(key.to_string()))?;
        factory(kind, ctx)
    }
}

fn mismatch(expected: &str, got: &FilterKind) -> ChainError {
    ChainError::InvalidParameter {
        filter: expected.to_string(),
        reason: format!("factory received a `{}` configuration", got.kind_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChainConfig, FilterEntry};
    use crate::estimation::{Chain, FilterContext, FilterInitError, FilterRuntimeError};
    use crate::state::StateUpdate;

    struct Scaled(f64);

    impl Filter for Scaled {
        fn kind(&self) -> &'static str {
            "Scaled"
        }

        fn init(&mut self) -> Result<(), FilterInitError> {
            Ok(())
        }

        fn step(
            &mut self,
            _ctx: &FilterContext,
            state: &mut StateUpdate,
        ) -> Result<(), FilterRuntimeError> {
            state.set_altitude(self.0);
            Ok(())
        }
    }

    #[test]
    fn builtins_are_registered() {
        let registry = FilterRegistry::with_builtins();
        for kind in ["Stationary", "Barometric", "Gps", "Complementary", "ExternalPose"] {
            assert!(registry.contains(kind), "missing {}", kind);
        }
    }

    #[test]
    fn unknown_kind_is_reported() {
        let registry = FilterRegistry::with_builtins();
        let config = ChainConfig {
            filters: vec![FilterEntry::new(FilterKind::Custom {
                kind: "Lidar".to_string(),
                params: Default::default(),
            })],
        };
        let err = Chain::from_config(&config, &registry, &BuildContext::default()).unwrap_err();
        assert_eq!(err, ChainError::UnknownKind("Lidar".to_string()));
    }

    #[test]
    fn custom_factory_extends_the_chain() {
        let mut registry = FilterRegistry::with_builtins();
        registry.register("Scaled", |kind, _| match kind {
            FilterKind::Custom { params, .. } => {
                Ok(Box::new(Scaled(params.get("value").copied().unwrap_or(1.0))))
            }
            _ => unreachable!(),
        });

        let mut params = std::collections::BTreeMap::new();
        params.insert("value".to_string(), 7.0);
        let config = ChainConfig {
            filters: vec![
                FilterEntry::new(FilterKind::Stationary),
                FilterEntry::new(FilterKind::Custom {
                    kind: "Scaled".to_string(),
                    params,
                })
                .named("scaled"),
            ],
        };

        let chain = Chain::from_config(&config, &registry, &BuildContext::default()).unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.descriptors()[0].name(), "stationary");
        assert_eq!(chain.descriptors()[1].kind(), "Scaled");
    }
}
