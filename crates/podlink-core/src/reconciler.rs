//! Linking registry entries to the directory slots of responding pods.

use std::thread;

use podlink_metrics::metric_defs;
use podlink_protocol::{RadioAddress, MAX_FC};
use tracing::{debug, info, trace};

use crate::guard::SharedState;
use crate::registry::PodName;
use crate::transport::RadioTransport;

/// What one reconciliation pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Entries linked during this pass.
    pub linked: usize,
    /// Unlinked entries still unlinked after this pass.
    pub unresolved: usize,
}

/// Resolve `name` to a device address, polling up to `attempts` times.
///
/// Waits one lock timeout between attempts. Address zero and the broadcast
/// address are never accepted as a result.
fn resolve_with_retry<T>(
    transport: &T,
    name: &str,
    attempts: u32,
    state: &SharedState,
) -> Option<RadioAddress>
where
    T: RadioTransport + ?Sized,
{
    for attempt in 0..attempts.max(1) {
        if attempt > 0 {
            thread::sleep(state.lock_timeout());
        }
        match transport.resolve_address(name) {
            Some(address) if address.is_device() => return Some(address),
            Some(address) => {
                trace!("Reconcile: '{}' resolved to unusable address {}", name, address);
            }
            None => trace!("Reconcile: '{}' not resolved (attempt {})", name, attempt + 1),
        }
    }
    None
}

/// Link every unlinked registry entry whose pod has answered an invite.
///
/// Holds the registry and directory locks for the whole pass. Returns `None`
/// without changing anything when either lock cannot be acquired. Entries that
/// don't resolve, or resolve to an address not in the directory, stay unlinked
/// for the next pass. Running it again with nothing new to link changes nothing.
pub fn sync_registry<T>(
    state: &SharedState,
    transport: &T,
    resolve_attempts: u32,
) -> Option<ReconcileSummary>
where
    T: RadioTransport + ?Sized,
{
    let Some((mut registry, directory)) = state.both() else {
        debug!("Reconcile: locks busy, skipping");
        return None;
    };

    let pending: heapless::Vec<(usize, PodName), MAX_FC> = registry
        .unlinked()
        .filter_map(|(index, entry)| {
            let mut name = PodName::new();
            name.push_str(entry.name()).ok()?;
            Some((index, name))
        })
        .collect();

    let mut summary = ReconcileSummary::default();
    for (index, name) in &pending {
        let Some(address) = resolve_with_retry(transport, name, resolve_attempts, state) else {
            summary.unresolved += 1;
            continue;
        };
        let Some(directory_index) = directory.find_by_address(address) else {
            debug!("Reconcile: '{}' is {} but has not answered an invite", name, address);
            summary.unresolved += 1;
            continue;
        };

        if registry.link(*index, &directory, directory_index) {
            info!("Reconcile: linked '{}' to {} (slot {})", name, address, directory_index);
            metrics::counter!(metric_defs::LINKS_ESTABLISHED.name).increment(1);
            summary.linked += 1;
        }
    }

    Some(summary)
}
