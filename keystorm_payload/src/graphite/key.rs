//! Graphite metric keys and lines.

use std::fmt;

/// Position of a single key in the dimension cross-product.
///
/// Node, service-chain, service-point and application are 1-based. The API is
/// 0-based and rendered 1-based in the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Index {
    /// Node, 1-based
    pub node: u32,
    /// Service-chain, 1-based
    pub service_chain: u32,
    /// Service-point, 1-based
    pub service_point: u32,
    /// Application, 1-based
    pub application: u32,
    /// API, 0-based
    pub api: u32,
    /// HTTP status code
    pub status: u16,
}

/// The application segment of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum App<'a> {
    Index(u32),
    Name(&'a str),
}

impl fmt::Display for App<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            App::Index(idx) => write!(f, "{idx}"),
            App::Name(name) => f.write_str(name),
        }
    }
}

/// The dotted key common to the four lines of an [`Index`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct Key<'a> {
    pub(crate) index: Index,
    pub(crate) app: App<'a>,
}

impl fmt::Display for Key<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Index {
            node,
            service_chain,
            service_point,
            api,
            status,
            ..
        } = self.index;
        write!(
            f,
            "metrics.node-{node}.api.ac.sccSc{service_chain}.sccSp{service_point}.sccApp{app}.api_v{api}_0.{status}",
            app = self.app,
            api = u64::from(api) + 1,
        )
    }
}

/// The kind of metric a line reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Event count, always 1
    Count,
    /// Average response time
    Avg,
    /// Minimum response time
    Min,
    /// Maximum response time
    Max,
}

impl Kind {
    /// Suffix appended to the key for this kind.
    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            Kind::Count => ".count",
            Kind::Avg => ".t.avg",
            Kind::Min => ".t.min",
            Kind::Max => ".t.max",
        }
    }
}

/// One `<key> <value> <timestamp>` record, without the trailing newline.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Line<'a> {
    pub(crate) key: &'a Key<'a>,
    pub(crate) kind: Kind,
    pub(crate) value: u32,
    pub(crate) timestamp: u64,
}

impl fmt::Display for Line<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{key}{suffix} {value} {timestamp}",
            key = self.key,
            suffix = self.kind.suffix(),
            value = self.value,
            timestamp = self.timestamp
        )
    }
}
