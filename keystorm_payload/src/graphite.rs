//! Graphite plaintext payload.
//!
//! The key space is the full cross-product of six dimensions: node,
//! service-chain, service-point, application, API and status code. Every
//! combination produces four lines per cycle:
//!
//! ```text
//! metrics.node-1.api.ac.sccSc1.sccSp1.sccApp1.api_v1_0.200.count 1 1700000000
//! metrics.node-1.api.ac.sccSc1.sccSp1.sccApp1.api_v1_0.200.t.avg 97 1700000000
//! metrics.node-1.api.ac.sccSc1.sccSp1.sccApp1.api_v1_0.200.t.min 12 1700000000
//! metrics.node-1.api.ac.sccSc1.sccSp1.sccApp1.api_v1_0.200.t.max 204 1700000000
//! ```
//!
//! Lines are emitted in nested iteration order, node outermost and status
//! innermost.

use std::{convert::Infallible, io::Write, num::NonZeroU32};

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::Error;

pub use app_names::AppNames;
pub use key::{Index, Kind};
pub use response_time::ResponseTime;

pub mod app_names;
pub mod key;
pub mod response_time;

use key::{App, Key, Line};

const LINES_PER_KEY: u64 = 4;

const DEFAULT_NODES: NonZeroU32 = NonZeroU32::MIN.saturating_add(7);
const DEFAULT_APPLICATIONS: NonZeroU32 = NonZeroU32::MIN.saturating_add(3_999);
const DEFAULT_APIS: NonZeroU32 = NonZeroU32::MIN.saturating_add(4);

fn default_statuses() -> Vec<u16> {
    vec![200]
}

/// How the application dimension is rendered in a key.
#[derive(Debug, Default, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppSegment {
    /// `sccApp<index>`, the 1-based application index
    #[default]
    Index,
    /// `sccApp<name>`, the random name from the application table
    Name,
}

/// Configure the graphite payload.
///
/// The defaults produce 8 * 1 * 1 * 4000 * 5 * 1 = 160,000 keys, or 640,000
/// lines per cycle.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    /// Number of nodes
    pub nodes: NonZeroU32,
    /// Number of service-chains
    pub service_chains: NonZeroU32,
    /// Number of service-points per service-chain
    pub service_points: NonZeroU32,
    /// Number of applications per service-point
    pub applications: NonZeroU32,
    /// Number of APIs per application
    pub apis: NonZeroU32,
    /// Status codes reported for every API
    pub statuses: Vec<u16>,
    /// Rendering of the application dimension
    pub app_segment: AppSegment,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            nodes: DEFAULT_NODES,
            service_chains: NonZeroU32::MIN,
            service_points: NonZeroU32::MIN,
            applications: DEFAULT_APPLICATIONS,
            apis: DEFAULT_APIS,
            statuses: default_statuses(),
            app_segment: AppSegment::Index,
        }
    }
}

impl Config {
    /// Determine whether the passed configuration obeys validation criteria.
    ///
    /// # Errors
    ///
    /// Function will error if the status list is empty or if the number of
    /// lines per cycle does not fit in memory addressable by this platform.
    pub fn valid(&self) -> Result<(), Error> {
        if self.statuses.is_empty() {
            return Err(Error::Validation(
                "statuses must contain at least one status code".to_string(),
            ));
        }
        let lines = self
            .checked_total_keys()
            .and_then(|keys| keys.checked_mul(LINES_PER_KEY))
            .ok_or_else(|| Error::Validation("key space overflows u64".to_string()))?;
        if usize::try_from(lines).is_err() {
            return Err(Error::Validation(format!(
                "key space of {lines} lines overflows usize"
            )));
        }
        Ok(())
    }

    fn checked_total_keys(&self) -> Option<u64> {
        [
            self.nodes,
            self.service_chains,
            self.service_points,
            self.applications,
            self.apis,
        ]
        .iter()
        .try_fold(self.statuses.len() as u64, |acc, n| {
            acc.checked_mul(u64::from(n.get()))
        })
    }

    /// Total number of distinct keys in the cross-product, saturating at
    /// `u64::MAX` for a configuration that [`Config::valid`] rejects.
    #[must_use]
    pub fn total_keys(&self) -> u64 {
        self.checked_total_keys().unwrap_or(u64::MAX)
    }

    /// Total number of lines produced per cycle, four per key.
    #[must_use]
    pub fn total_lines(&self) -> u64 {
        self.total_keys().saturating_mul(LINES_PER_KEY)
    }
}

#[derive(Debug, Clone)]
/// The graphite key-space generator.
///
/// Owns the application name table, generated once at construction.
pub struct Graphite {
    config: Config,
    app_names: AppNames,
}

impl Graphite {
    /// Create a new instance of `Graphite`, generating the application name
    /// table.
    ///
    /// # Errors
    ///
    /// Function will error if `config` is not valid.
    pub fn new<R>(config: Config, rng: &mut R) -> Result<Self, Error>
    where
        R: Rng + ?Sized,
    {
        let app_names = AppNames::generate(&config, rng)?;
        info!(
            "Key space holds {keys} keys, {lines} lines per cycle.",
            keys = config.total_keys(),
            lines = config.total_lines()
        );
        Ok(Self { config, app_names })
    }

    /// The configuration this generator was built from.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The application name table.
    #[must_use]
    pub fn app_names(&self) -> &AppNames {
        &self.app_names
    }

    /// Build every line of one cycle stamped with `now`.
    pub fn lines<R>(&self, now: u64, rng: &mut R) -> Vec<String>
    where
        R: Rng + ?Sized,
    {
        let capacity = usize::try_from(self.config.total_lines()).unwrap_or(0);
        let mut lines = Vec::with_capacity(capacity);
        let res = self.visit(now, rng, |line| {
            lines.push(line.to_string());
            Ok::<(), Infallible>(())
        });
        match res {
            Ok(()) => lines,
            Err(never) => match never {},
        }
    }

    /// Write every line of one cycle stamped with `now` into `writer`, each
    /// terminated by a newline. Returns the number of lines written.
    ///
    /// # Errors
    ///
    /// Function will error if `writer` does.
    pub fn to_bytes<W, R>(&self, now: u64, rng: &mut R, writer: &mut W) -> Result<u64, Error>
    where
        R: Rng + ?Sized,
        W: Write,
    {
        let mut written = 0;
        self.visit(now, rng, |line| {
            writeln!(writer, "{line}")?;
            written += 1;
            Ok::<(), Error>(())
        })?;
        Ok(written)
    }

    fn visit<R, F, E>(&self, now: u64, rng: &mut R, mut f: F) -> Result<(), E>
    where
        R: Rng + ?Sized,
        F: FnMut(Line<'_>) -> Result<(), E>,
    {
        let cfg = &self.config;
        for node in 1..=cfg.nodes.get() {
            for service_chain in 1..=cfg.service_chains.get() {
                for service_point in 1..=cfg.service_points.get() {
                    for application in 1..=cfg.applications.get() {
                        let app = self.app_segment(service_chain, service_point, application);
                        for api in 0..cfg.apis.get() {
                            for &status in &cfg.statuses {
                                let key = Key {
                                    index: Index {
                                        node,
                                        service_chain,
                                        service_point,
                                        application,
                                        api,
                                        status,
                                    },
                                    app,
                                };
                                let rt = ResponseTime::sample(api, rng);
                                for (kind, value) in [
                                    (Kind::Count, 1),
                                    (Kind::Avg, rt.avg),
                                    (Kind::Min, rt.min),
                                    (Kind::Max, rt.max),
                                ] {
                                    f(Line {
                                        key: &key,
                                        kind,
                                        value,
                                        timestamp: now,
                                    })?;
                                }
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn app_segment(&self, service_chain: u32, service_point: u32, application: u32) -> App<'_> {
        match self.config.app_segment {
            AppSegment::Index => App::Index(application),
            AppSegment::Name => self
                .app_names
                .get(service_chain, service_point, application)
                .map_or(App::Index(application), App::Name),
        }
    }
}
