// skyfuse_core/src/estimation/chain.rs

use std::collections::HashSet;
use std::fmt;

use tracing::{debug, info, warn};

use crate::config::ChainConfig;
use crate::estimation::registry::FilterRegistry;
use crate::estimation::{BuildContext, ChainError, FatalPipelineError, Filter, FilterInitError};

// =========================================================================
// == Filter Descriptor ==
// =========================================================================

/// Runtime health of one filter in the chain.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterHealth {
    /// `init` has not run yet.
    Pending,
    /// `init` succeeded; the filter is stepped every cycle.
    Functional,
    /// `init` failed; the filter is skipped for the lifetime of the chain.
    Failed(FilterInitError),
}

/// One entry of the chain: a filter instance bound to its name, enabled flag
/// and position in the execution order.
pub struct FilterDescriptor {
    name: String,
    filter: Box<dyn Filter>,
    enabled: bool,
    order: usize,
    health: FilterHealth,
}

impl FilterDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &'static str {
        self.filter.kind()
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Zero-based position in the execution order.
    pub fn order(&self) -> usize {
        self.order
    }

    pub fn health(&self) -> &FilterHealth {
        &self.health
    }

    /// True if the filter takes part in cycles: enabled and initialised.
    pub fn is_active(&self) -> bool {
        self.enabled && self.health == FilterHealth::Functional
    }

    pub(crate) fn filter_mut(&mut self) -> &mut dyn Filter {
        self.filter.as_mut()
    }
}

impl fmt::Debug for FilterDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterDescriptor")
            .field("name", &self.name)
            .field("kind", &self.filter.kind())
            .field("enabled", &self.enabled)
            .field("order", &self.order)
            .field("health", &self.health)
            .finish()
    }
}

// =========================================================================
// == Init Report ==
// =========================================================================

/// Outcome of `init` for one enabled filter.
#[derive(Debug, Clone, PartialEq)]
pub struct InitOutcome {
    pub name: String,
    pub result: Result<(), FilterInitError>,
}

/// Outcomes of `init` for every enabled filter, in execution order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InitReport {
    pub outcomes: Vec<InitOutcome>,
}

impl InitReport {
    pub fn functional_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &FilterInitError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.name.as_str(), e)))
    }
}

// =========================================================================
// == Chain ==
// =========================================================================

/// The ordered, configured set of filters.
///
/// A chain is immutable once built: changing the set of filters means building
/// a new chain and handing it to [`crate::estimation::Pipeline::rebuild`].
#[derive(Debug)]
pub struct Chain {
    descriptors: Vec<FilterDescriptor>,
}

impl Chain {
    pub fn builder() -> ChainBuilder {
        ChainBuilder::default()
    }

    /// Builds the chain described by `config`, creating each filter through
    /// the factory registered for its kind.
    pub fn from_config(
        config: &ChainConfig,
        registry: &FilterRegistry,
        ctx: &BuildContext,
    ) -> Result<Chain, ChainError> {
        let mut builder = Chain::builder();
        for entry in &config.filters {
            let filter = registry.create(&entry.kind, ctx)?;
            let name = entry.resolved_name();
            debug!(
                "Chain entry #{}: '{}' ({}), enabled = {}",
                builder.descriptors.len(),
                name,
                entry.kind.kind_str(),
                entry.enabled
            );
            builder = builder.add(name, filter, entry.enabled);
        }
        builder.build()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn descriptors(&self) -> &[FilterDescriptor] {
        &self.descriptors
    }

    pub(crate) fn descriptors_mut(&mut self) -> &mut [FilterDescriptor] {
        &mut self.descriptors
    }

    pub fn get(&self, name: &str) -> Option<&FilterDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    pub fn enabled_count(&self) -> usize {
        self.descriptors.iter().filter(|d| d.enabled).count()
    }

    /// Number of filters that will be stepped each cycle.
    pub fn active_count(&self) -> usize {
        self.descriptors.iter().filter(|d| d.is_active()).count()
    }

    pub fn is_initialized(&self) -> bool {
        self.descriptors
            .iter()
            .filter(|d| d.enabled)
            .all(|d| d.health != FilterHealth::Pending)
    }

    /// Runs `init` once on every enabled filter, in order.
    ///
    /// A failing filter is marked [`FilterHealth::Failed`] and the remaining
    /// filters are still initialised. Fails only when no filter ends up
    /// functional.
    pub(crate) fn init(&mut self) -> Result<InitReport, FatalPipelineError> {
        let mut report = InitReport::default();

        for descriptor in self.descriptors.iter_mut().filter(|d| d.enabled) {
            let result = descriptor.filter.init();
            match &result {
                Ok(()) => {
                    debug!("Filter '{}' initialised.", descriptor.name);
                    descriptor.health = FilterHealth::Functional;
                }
                Err(e) => {
                    warn!(
                        "Filter '{}' ({}) failed to initialise and is excluded: {}",
                        descriptor.name,
                        descriptor.filter.kind(),
                        e
                    );
                    descriptor.health = FilterHealth::Failed(e.clone());
                }
            }
            report.outcomes.push(InitOutcome {
                name: descriptor.name.clone(),
                result,
            });
        }

        let functional = report.functional_count();
        if functional == 0 {
            return Err(FatalPipelineError::NoFunctionalFilters {
                attempted: report.outcomes.len(),
            });
        }

        info!(
            "Filter chain initialised: {}/{} enabled filters functional.",
            functional,
            report.outcomes.len()
        );
        Ok(report)
    }
}

// =========================================================================
// == Chain Builder ==
// =========================================================================

/// Assembles a [`Chain`] programmatically. The order of `add` calls is the
/// execution order.
#[derive(Default)]
pub struct ChainBuilder {
    descriptors: Vec<FilterDescriptor>,
}

impl ChainBuilder {
    pub fn add(
        mut self,
        name: impl Into<String>,
        filter: Box<dyn Filter>,
        enabled: bool,
    ) -> Self {
        let order = self.descriptors.len();
        self.descriptors.push(FilterDescriptor {
            name: name.into(),
            filter,
            enabled,
            order,
            health: FilterHealth::Pending,
        });
        self
    }

    /// Appends an enabled filter.
    pub fn filter(self, name: impl Into<String>, filter: Box<dyn Filter>) -> Self {
        self.add(name, filter, true)
    }

    pub fn build(self) -> Result<Chain, ChainError> {
        let mut seen = HashSet::new();
        for descriptor in &self.descriptors {
            if !seen.insert(descriptor.name.as_str()) {
                return Err(ChainError::DuplicateName(descriptor.name.clone()));
            }
        }

        if !self.descriptors.iter().any(|d| d.enabled) {
            return Err(FatalPipelineError::NoEnabledFilters.into());
        }

        Ok(Chain {
            descriptors: self.descriptors,
        })
    }
}
