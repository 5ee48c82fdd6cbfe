//! Simulation configuration
//!
//! The configuration is an immutable value handed to every component at
//! construction. It fixes the number of sites, the number of variables and
//! the replication rule.

use crate::ids::{SiteId, Value, VarId};
use thiserror::Error;

/// Default number of sites
pub const DEFAULT_NUM_SITES: u32 = 10;

/// Default number of distinct variables
pub const DEFAULT_NUM_VARIABLES: u32 = 20;

/// Configuration errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No sites configured
    #[error("site count must be at least 1")]
    NoSites,

    /// No variables configured
    #[error("variable count must be at least 1")]
    NoVariables,
}

/// Immutable simulation configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimConfig {
    /// Number of sites, numbered `1..=num_sites`
    #[cfg_attr(feature = "serde", serde(default = "default_num_sites"))]
    pub num_sites: u32,
    /// Number of variables, numbered `1..=num_variables`
    #[cfg_attr(feature = "serde", serde(default = "default_num_variables"))]
    pub num_variables: u32,
}

#[cfg(feature = "serde")]
fn default_num_sites() -> u32 {
    DEFAULT_NUM_SITES
}

#[cfg(feature = "serde")]
fn default_num_variables() -> u32 {
    DEFAULT_NUM_VARIABLES
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            num_sites: DEFAULT_NUM_SITES,
            num_variables: DEFAULT_NUM_VARIABLES,
        }
    }
}

impl SimConfig {
    /// Create a configuration with the given dimensions
    pub fn new(num_sites: u32, num_variables: u32) -> Self {
        Self {
            num_sites,
            num_variables,
        }
    }

    /// Check that the configuration describes a usable system
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_sites == 0 {
            return Err(ConfigError::NoSites);
        }
        if self.num_variables == 0 {
            return Err(ConfigError::NoVariables);
        }
        Ok(())
    }

    /// Even-numbered variables are replicated at every site
    pub fn is_replicated(&self, var: VarId) -> bool {
        var.as_u32() % 2 == 0
    }

    /// Home site of a non-replicated variable: `(i mod numSites) + 1`
    pub fn home_site(&self, var: VarId) -> SiteId {
        SiteId::new(var.as_u32() % self.num_sites + 1)
    }

    /// Initial committed value of a variable: `10 * i`
    pub fn initial_value(&self, var: VarId) -> Value {
        10 * Value::from(var.as_u32())
    }

    /// Whether `site` holds a copy of `var`
    pub fn hosts(&self, site: SiteId, var: VarId) -> bool {
        self.is_replicated(var) || self.home_site(var) == site
    }

    /// All sites holding a copy of `var`, in site order
    pub fn sites_for(&self, var: VarId) -> Vec<SiteId> {
        if self.is_replicated(var) {
            self.site_ids().collect()
        } else {
            vec![self.home_site(var)]
        }
    }

    /// All site IDs in order
    pub fn site_ids(&self) -> impl Iterator<Item = SiteId> {
        (1..=self.num_sites).map(SiteId::new)
    }

    /// All variable IDs in order
    pub fn var_ids(&self) -> impl Iterator<Item = VarId> {
        (1..=self.num_variables).map(VarId::new)
    }

    /// Whether `var` names a configured variable
    pub fn contains_var(&self, var: VarId) -> bool {
        (1..=self.num_variables).contains(&var.as_u32())
    }

    /// Whether `site` names a configured site
    pub fn contains_site(&self, site: SiteId) -> bool {
        (1..=self.num_sites).contains(&site.as_u32())
    }
}
