//! The application name table.

use tracing::debug;

use crate::{Error, common::strings};

use super::Config;

/// Length of every generated application name.
pub const NAME_LENGTH: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Random names for every (service-chain, service-point, application) triple.
///
/// The table is created once and never mutated, so the names for a given
/// triple are stable for as long as the owning generator lives.
pub struct AppNames {
    service_points: usize,
    applications: usize,
    names: Vec<String>,
}

impl AppNames {
    /// Generate one name per triple of the configured dimensions.
    ///
    /// # Errors
    ///
    /// Function will error if `config` is not valid.
    pub fn generate<R>(config: &Config, rng: &mut R) -> Result<Self, Error>
    where
        R: rand::Rng + ?Sized,
    {
        config.valid()?;
        let service_chains = config.service_chains.get() as usize;
        let service_points = config.service_points.get() as usize;
        let applications = config.applications.get() as usize;

        // A valid key space bounds this product, so it cannot overflow.
        let total = service_chains * service_points * applications;
        let mut names = Vec::with_capacity(total);
        for _ in 0..total {
            names.push(strings::distinct_alphanum(rng, NAME_LENGTH));
        }
        debug!("Generated {total} application names.");

        Ok(Self {
            service_points,
            applications,
            names,
        })
    }

    /// Look up the name for the 1-based indices. Returns `None` if any index
    /// falls outside the table.
    #[must_use]
    pub fn get(&self, service_chain: u32, service_point: u32, application: u32) -> Option<&str> {
        let sc = (service_chain as usize).checked_sub(1)?;
        let sp = (service_point as usize).checked_sub(1)?;
        let app = (application as usize).checked_sub(1)?;
        if sp >= self.service_points || app >= self.applications {
            return None;
        }
        let idx = (sc * self.service_points + sp) * self.applications + app;
        self.names.get(idx).map(String::as_str)
    }

    /// Total number of names in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the table holds no names. Never true for a table built from a
    /// valid configuration.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
