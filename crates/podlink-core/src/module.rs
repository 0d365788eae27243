//! The command module facade.
//!
//! [`CommandModule`] owns the shared directory and registry, the listener
//! thread and the command issuer for one session. Every method takes its
//! locks with the configured timeout; when a lock is busy the method changes
//! nothing and returns `None`, `false` or zero.

use std::iter;
use std::sync::Arc;

use crossbeam_channel::Sender;
use podlink_metrics::metric_defs;
use tracing::{debug, info, warn};

use crate::clock::{SystemClock, WallClock};
use crate::config::{ModuleConfig, PodConfig};
use crate::directory::BoundedDirectory;
use crate::error::{ConfigError, ModuleError};
use crate::guard::SharedState;
use crate::issuer::CommandIssuer;
use crate::listener::{spawn_listener, Dispatcher, ListenerHandle, ListenerReport};
use crate::reconciler::{sync_registry, ReconcileSummary};
use crate::registry::{BoundedRegistry, RegistryEntry};
use crate::report::{DirectoryReport, PodDataReport, RegistryReport};
use crate::transport::RadioTransport;

/// A running command module session.
pub struct CommandModule<T: RadioTransport + ?Sized + 'static> {
    transport: Arc<T>,
    state: Arc<SharedState>,
    issuer: CommandIssuer<T>,
    resolve_attempts: u32,
    listener: ListenerHandle,
}

impl<T: RadioTransport + ?Sized + 'static> CommandModule<T> {
    /// Start a session on `transport` using the system clock.
    pub fn start(transport: Arc<T>, config: &ModuleConfig) -> Result<Self, ModuleError> {
        Self::launch(transport, config, Arc::new(SystemClock), None)
    }

    /// Start a session stamping clock commands from `clock`.
    pub fn start_with_clock(
        transport: Arc<T>,
        config: &ModuleConfig,
        clock: Arc<dyn WallClock>,
    ) -> Result<Self, ModuleError> {
        Self::launch(transport, config, clock, None)
    }

    /// Start a session whose listener reports every dispatched frame on `reports`.
    pub fn start_with_reports(
        transport: Arc<T>,
        config: &ModuleConfig,
        clock: Arc<dyn WallClock>,
        reports: Sender<ListenerReport>,
    ) -> Result<Self, ModuleError> {
        Self::launch(transport, config, clock, Some(reports))
    }

    fn launch(
        transport: Arc<T>,
        config: &ModuleConfig,
        clock: Arc<dyn WallClock>,
        reports: Option<Sender<ListenerReport>>,
    ) -> Result<Self, ModuleError> {
        config.validate()?;

        let mut registry = BoundedRegistry::new();
        for pod in &config.pods {
            registry
                .register(pod.pod_number, &pod.name, pod.expected_length)
                .map_err(ConfigError::from)?;
        }
        let state = Arc::new(SharedState::with_registry(config.lock_timeout(), registry));

        let issuer = CommandIssuer::new(Arc::clone(&transport), clock, Arc::clone(&state));
        let mut dispatcher = Dispatcher::new(Arc::clone(&transport), Arc::clone(&state), issuer.clone());
        if let Some(reports) = reports {
            dispatcher = dispatcher.with_reports(reports);
        }
        let listener = spawn_listener(dispatcher)?;

        info!(
            "Module: started with {} pod(s), lock timeout {:?}",
            config.pods.len(),
            config.lock_timeout()
        );
        metrics::gauge!(metric_defs::LINKED_PODS.name).set(0.0);

        Ok(CommandModule {
            transport,
            state,
            issuer,
            resolve_attempts: config.resolve_attempts,
            listener,
        })
    }

    // ------------------------------------------------------------------------
    // Registry management
    // ------------------------------------------------------------------------

    /// Register an expected pod. Returns false if refused or the registry is busy.
    pub fn add_registry_entry(&self, pod_number: u8, name: &str, expected_length: usize) -> bool {
        let Some(mut registry) = self.state.registry() else {
            return false;
        };
        match registry.register(pod_number, name, expected_length) {
            Ok(index) => {
                debug!("Module: registered pod {} '{}' in slot {}", pod_number, name, index);
                true
            }
            Err(e) => {
                warn!("Module: pod {} not registered: {}", pod_number, e);
                false
            }
        }
    }

    /// Register several pods. Returns how many were accepted.
    pub fn register_pods(&self, pods: &[PodConfig]) -> usize {
        pods.iter()
            .filter(|p| self.add_registry_entry(p.pod_number, &p.name, p.expected_length))
            .count()
    }

    /// Remove every registry entry. The directory is kept.
    pub fn reset_registry(&self) -> bool {
        let Some(mut registry) = self.state.registry() else {
            return false;
        };
        registry.clear();
        metrics::gauge!(metric_defs::LINKED_PODS.name).set(0.0);
        info!("Module: registry reset");
        true
    }

    /// Link registry entries to responding pods.
    pub fn sync_registry(&self) -> Option<ReconcileSummary> {
        let summary = sync_registry(&self.state, self.transport.as_ref(), self.resolve_attempts)?;
        if summary.linked > 0 {
            self.link_count();
        }
        Some(summary)
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    /// The command issuer for this session.
    pub fn commands(&self) -> &CommandIssuer<T> {
        &self.issuer
    }

    /// Request data from every linked clock+data pod.
    pub fn request_data_all(&self) -> usize {
        self.issuer.request_data_all()
    }

    /// Test the clock of every pod without a good clock.
    pub fn test_all_clocks(&self) -> usize {
        self.issuer.test_all_clocks()
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Number of pods that have replied.
    pub fn directory_len(&self) -> Option<usize> {
        self.state.directory().map(|d| d.len())
    }

    /// Number of registered pods.
    pub fn registry_len(&self) -> Option<usize> {
        self.state.registry().map(|r| r.len())
    }

    /// Clock flag of directory slot `index`.
    pub fn clock_status(&self, index: usize) -> Option<bool> {
        self.state.directory()?.get(index).map(|e| e.good_clock)
    }

    /// Clock flag of the device linked to `pod_number`.
    pub fn pod_clock_status(&self, pod_number: u8) -> Option<bool> {
        let (registry, directory) = self.state.both()?;
        let index = linked_slot(&registry, pod_number)?;
        directory.get(index).map(|e| e.good_clock)
    }

    /// Whether `pod_number` has data that has not been drained.
    pub fn is_pod_fresh(&self, pod_number: u8) -> Option<bool> {
        let registry = self.state.registry()?;
        entry_by_pod(&registry, pod_number).map(RegistryEntry::is_fresh)
    }

    /// Take the fresh data of `pod_number`, if any.
    pub fn drain_pod_data(&self, pod_number: u8) -> Option<Vec<u8>> {
        let mut registry = self.state.registry()?;
        let index = registry.find_by_pod_number(pod_number)?;
        registry.drain(index)
    }

    /// Buffers of every pod linked to a clock+data device, concatenated in
    /// registry order. Freshness is left alone.
    ///
    /// Each pod contributes exactly its expected length, zero-filled until its
    /// first report, so a pod's bytes always sit at the same offset.
    pub fn collect_pod_data(&self) -> Option<Vec<u8>> {
        let (registry, directory) = self.state.both()?;
        Some(
            registry
                .iter()
                .filter(|e| sends_data(e, &directory))
                .flat_map(|e| {
                    e.data()
                        .iter()
                        .copied()
                        .chain(iter::repeat(0))
                        .take(e.expected_length())
                })
                .collect(),
        )
    }

    /// Number of registry entries linked to a clock+data device.
    pub fn link_count(&self) -> Option<usize> {
        let (registry, directory) = self.state.both()?;
        let count = registry.iter().filter(|e| sends_data(e, &directory)).count();
        metrics::gauge!(metric_defs::LINKED_PODS.name).set(count as f64);
        Some(count)
    }

    // ------------------------------------------------------------------------
    // Reports
    // ------------------------------------------------------------------------

    /// Snapshot of the directory.
    pub fn directory_report(&self) -> Option<DirectoryReport> {
        let directory = self.state.directory()?;
        Some(DirectoryReport::capture(&directory))
    }

    /// Snapshot of the registry.
    pub fn registry_report(&self) -> Option<RegistryReport> {
        let (registry, directory) = self.state.both()?;
        Some(RegistryReport::capture(&registry, &directory))
    }

    /// Snapshot of the buffered telemetry.
    pub fn pod_data_report(&self) -> Option<PodDataReport> {
        let (registry, directory) = self.state.both()?;
        Some(PodDataReport::capture(&registry, &directory))
    }

    /// Stop the listener. Dropping the module does the same.
    pub fn shutdown(mut self) {
        self.listener.shutdown();
        info!("Module: stopped");
    }
}

fn entry_by_pod(registry: &BoundedRegistry, pod_number: u8) -> Option<&RegistryEntry> {
    registry.get(registry.find_by_pod_number(pod_number)?)
}

fn linked_slot(registry: &BoundedRegistry, pod_number: u8) -> Option<usize> {
    entry_by_pod(registry, pod_number)?.directory_index()
}

fn sends_data(entry: &RegistryEntry, directory: &BoundedDirectory) -> bool {
    entry
        .directory_index()
        .and_then(|n| directory.get(n))
        .is_some_and(|d| d.connect_type.sends_data())
}
