//! Metrics for the podlink command module.
//!
//! Every metric the command module emits is declared here as a const
//! [`Metric`], so call sites never spell a metric name by hand. The `metrics`
//! crate is re-exported; install any recorder (the `prometheus` feature pulls
//! in an exporter) and call [`describe_metrics`] once at startup.
//!
//! ```rust
//! use podlink_metrics::metric_defs;
//!
//! metrics::counter!(metric_defs::FRAMES_RECEIVED.name).increment(1);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// The kind of metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Monotonically increasing counter.
    Counter,
    /// Value that can go up and down.
    Gauge,
    /// Distribution of observed values.
    Histogram,
}

impl MetricKind {
    /// Lowercase name of the kind.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metric declaration with its metadata.
///
/// ```rust
/// use podlink_metrics::{Metric, MetricKind};
/// use metrics::Unit;
///
/// const DROPS: Metric = Metric::counter("podlink.example.drops")
///     .with_description("Dropped frames")
///     .with_unit(Unit::Count)
///     .with_labels(&["reason"]);
///
/// assert_eq!(DROPS.kind, MetricKind::Counter);
/// ```
#[derive(Debug, Clone)]
pub struct Metric {
    /// Metric name, dot separated.
    pub name: &'static str,
    /// Counter, gauge or histogram.
    pub kind: MetricKind,
    /// Human-readable description.
    pub description: &'static str,
    /// Unit of measurement, if any.
    pub unit: Option<Unit>,
    /// Label keys attached at the call sites.
    pub labels: &'static [&'static str],
}

impl Metric {
    const fn new(name: &'static str, kind: MetricKind) -> Self {
        Self {
            name,
            kind,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Declare a counter.
    pub const fn counter(name: &'static str) -> Self {
        Self::new(name, MetricKind::Counter)
    }

    /// Declare a gauge.
    pub const fn gauge(name: &'static str) -> Self {
        Self::new(name, MetricKind::Gauge)
    }

    /// Declare a histogram.
    pub const fn histogram(name: &'static str) -> Self {
        Self::new(name, MetricKind::Histogram)
    }

    /// Set the description.
    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Set the unit.
    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Set the expected label keys.
    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Register this metric's description with the installed recorder.
    pub fn describe(&self) {
        match (self.kind, self.unit) {
            (MetricKind::Counter, Some(unit)) => {
                describe_counter!(self.name, unit, self.description);
            }
            (MetricKind::Counter, None) => {
                describe_counter!(self.name, self.description);
            }
            (MetricKind::Gauge, Some(unit)) => {
                describe_gauge!(self.name, unit, self.description);
            }
            (MetricKind::Gauge, None) => {
                describe_gauge!(self.name, self.description);
            }
            (MetricKind::Histogram, Some(unit)) => {
                describe_histogram!(self.name, unit, self.description);
            }
            (MetricKind::Histogram, None) => {
                describe_histogram!(self.name, self.description);
            }
        }
    }
}

/// All metric definitions for the command module.
pub mod metric_defs {
    use super::{Metric, Unit};

    // ========================================================================
    // Radio Traffic
    // ========================================================================

    /// Frames pulled from the transport by the listener.
    pub const FRAMES_RECEIVED: Metric = Metric::counter("podlink.radio.frames_received")
        .with_description("Frames pulled from the transport by the listener")
        .with_unit(Unit::Count);

    /// Frames that failed to decode or carried an unknown code.
    ///
    /// Labels: reason
    pub const FRAMES_UNEXPECTED: Metric = Metric::counter("podlink.radio.frames_unexpected")
        .with_description("Frames that failed to decode or carried an unknown code")
        .with_unit(Unit::Count)
        .with_labels(&["reason"]);

    /// Commands handed to the transport.
    ///
    /// Labels: command
    pub const COMMANDS_SENT: Metric = Metric::counter("podlink.radio.commands_sent")
        .with_description("Commands handed to the transport")
        .with_unit(Unit::Count)
        .with_labels(&["command"]);

    /// Commands the transport refused.
    ///
    /// Labels: command
    pub const COMMANDS_FAILED: Metric = Metric::counter("podlink.radio.commands_failed")
        .with_description("Commands the transport refused")
        .with_unit(Unit::Count)
        .with_labels(&["command"]);

    // ========================================================================
    // Directory / Registry
    // ========================================================================

    /// RSVPs processed, whether or not they were recorded.
    ///
    /// Labels: connect_type
    pub const RSVPS_RECEIVED: Metric = Metric::counter("podlink.directory.rsvps")
        .with_description("RSVP replies processed by the listener")
        .with_unit(Unit::Count)
        .with_labels(&["connect_type"]);

    /// RSVPs dropped because the directory was full.
    pub const RSVPS_DROPPED: Metric = Metric::counter("podlink.directory.rsvps_dropped")
        .with_description("RSVP replies dropped because the directory was full")
        .with_unit(Unit::Count);

    /// Clock test results applied to a known pod.
    ///
    /// Labels: result
    pub const CLOCK_RESULTS: Metric = Metric::counter("podlink.directory.clock_results")
        .with_description("Clock test results applied to a known pod")
        .with_unit(Unit::Count)
        .with_labels(&["result"]);

    /// Registry entries linked to a directory entry.
    pub const LINKS_ESTABLISHED: Metric = Metric::counter("podlink.registry.links")
        .with_description("Registry entries linked to a directory entry")
        .with_unit(Unit::Count);

    /// Pod data payloads stored in the registry.
    pub const POD_DATA_ACCEPTED: Metric = Metric::counter("podlink.registry.pod_data_accepted")
        .with_description("Pod data payloads stored in the registry")
        .with_unit(Unit::Count);

    /// Pod data payloads discarded.
    ///
    /// Labels: reason
    pub const POD_DATA_REJECTED: Metric = Metric::counter("podlink.registry.pod_data_rejected")
        .with_description("Pod data payloads discarded")
        .with_unit(Unit::Count)
        .with_labels(&["reason"]);

    /// Pod data payload size in bytes.
    pub const POD_DATA_SIZE: Metric = Metric::histogram("podlink.registry.pod_data_size_bytes")
        .with_description("Pod data payload size in bytes")
        .with_unit(Unit::Bytes);

    /// Number of linked pods reporting data.
    pub const LINKED_PODS: Metric = Metric::gauge("podlink.registry.linked_pods")
        .with_description("Registry entries linked to a clock+data pod")
        .with_unit(Unit::Count);

    // ========================================================================
    // Locking
    // ========================================================================

    /// Operations skipped because a lock timed out.
    ///
    /// Labels: lock
    pub const LOCK_CONTENTION: Metric = Metric::counter("podlink.lock.contention")
        .with_description("Operations skipped because a lock could not be acquired in time")
        .with_unit(Unit::Count)
        .with_labels(&["lock"]);

    /// Returns a slice of all defined metrics.
    pub const ALL: &[&Metric] = &[
        &FRAMES_RECEIVED,
        &FRAMES_UNEXPECTED,
        &COMMANDS_SENT,
        &COMMANDS_FAILED,
        &RSVPS_RECEIVED,
        &RSVPS_DROPPED,
        &CLOCK_RESULTS,
        &LINKS_ESTABLISHED,
        &POD_DATA_ACCEPTED,
        &POD_DATA_REJECTED,
        &POD_DATA_SIZE,
        &LINKED_PODS,
        &LOCK_CONTENTION,
    ];
}

/// Describe every metric with the installed recorder.
///
/// Call once after installing a recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}

/// Install the Prometheus exporter, serving scrapes on `addr`.
#[cfg(feature = "prometheus")]
pub fn install_prometheus(
    addr: std::net::SocketAddr,
) -> Result<(), metrics_exporter_prometheus::BuildError> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    describe_metrics();
    Ok(())
}
