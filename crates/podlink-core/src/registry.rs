//! Pods the operator expects to hear from.
//!
//! Registry entries are created by explicit registration and hold the most
//! recent telemetry each pod delivered. The link to a [`BoundedDirectory`]
//! slot is filled in later by the reconciler, once the pod has answered an
//! invite and its name resolves to the answering address.

use heapless::{String, Vec};
use podlink_protocol::{RadioAddress, MAX_FC, MAX_NAME_LENGTH, MAX_POD_DATA_BYTES};

use crate::directory::BoundedDirectory;
use crate::error::RegistryError;

/// Node identifier of a pod.
pub type PodName = String<MAX_NAME_LENGTH>;

/// Telemetry buffer of a pod.
pub type PodData = Vec<u8, MAX_POD_DATA_BYTES>;

/// An expected pod.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pod_number: u8,
    name: PodName,
    directory_index: Option<usize>,
    expected_length: usize,
    data: PodData,
    data_updated: bool,
}

impl RegistryEntry {
    /// Operator-assigned pod number.
    pub fn pod_number(&self) -> u8 {
        self.pod_number
    }

    /// Node identifier used for address resolution.
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Linked directory slot, if the pod has been reconciled.
    pub fn directory_index(&self) -> Option<usize> {
        self.directory_index
    }

    /// Whether the entry has been linked to a directory slot.
    pub fn is_linked(&self) -> bool {
        self.directory_index.is_some()
    }

    /// Payload length, code byte excluded.
    pub fn expected_length(&self) -> usize {
        self.expected_length
    }

    /// Most recently stored payload. Empty until the first accepted write.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Whether data arrived since the last drain.
    pub fn is_fresh(&self) -> bool {
        self.data_updated
    }
}

/// Fixed-capacity list of expected pods.
#[derive(Debug, Default)]
pub struct BoundedRegistry {
    entries: Vec<RegistryEntry, MAX_FC>,
}

impl BoundedRegistry {
    /// Create an empty registry.
    pub const fn new() -> Self {
        BoundedRegistry {
            entries: Vec::new(),
        }
    }

    /// Register an expected pod, unlinked and without data.
    ///
    /// Returns the slot index of the new entry.
    pub fn register(
        &mut self,
        pod_number: u8,
        name: &str,
        expected_length: usize,
    ) -> Result<usize, RegistryError> {
        if self.entries.is_full() {
            return Err(RegistryError::Full { capacity: MAX_FC });
        }
        if self.find_by_pod_number(pod_number).is_some() {
            return Err(RegistryError::DuplicatePod(pod_number));
        }
        if expected_length > MAX_POD_DATA_BYTES {
            return Err(RegistryError::PayloadTooLarge {
                max: MAX_POD_DATA_BYTES,
                actual: expected_length,
            });
        }

        let mut pod_name = PodName::new();
        pod_name
            .push_str(name)
            .map_err(|_| RegistryError::NameTooLong {
                name: name.to_string(),
                max: MAX_NAME_LENGTH,
            })?;

        let entry = RegistryEntry {
            pod_number,
            name: pod_name,
            directory_index: None,
            expected_length,
            data: PodData::new(),
            data_updated: false,
        };
        self.entries
            .push(entry)
            .map_err(|_| RegistryError::Full { capacity: MAX_FC })?;
        Ok(self.entries.len() - 1)
    }

    /// Find the slot registered under `pod_number`.
    pub fn find_by_pod_number(&self, pod_number: u8) -> Option<usize> {
        self.entries.iter().position(|e| e.pod_number == pod_number)
    }

    /// Find the slot linked to the directory entry holding `address`.
    pub fn find_linked_to(&self, directory: &BoundedDirectory, address: RadioAddress) -> Option<usize> {
        self.entries.iter().position(|e| {
            e.directory_index
                .and_then(|n| directory.get(n))
                .is_some_and(|d| d.address == address)
        })
    }

    /// Link slot `index` to `directory_index`.
    ///
    /// Only an unlinked entry can be linked, and only to an occupied slot of
    /// `directory`; the first link wins for the rest of the session. Returns
    /// whether the link was recorded.
    pub fn link(&mut self, index: usize, directory: &BoundedDirectory, directory_index: usize) -> bool {
        if directory.get(directory_index).is_none() {
            return false;
        }
        match self.entries.get_mut(index) {
            Some(entry) if entry.directory_index.is_none() => {
                entry.directory_index = Some(directory_index);
                true
            }
            _ => false,
        }
    }

    /// Store a payload and mark the entry fresh.
    ///
    /// Fails without touching the entry unless `bytes.len()` equals the
    /// entry's expected length.
    pub fn write_payload(&mut self, index: usize, bytes: &[u8]) -> bool {
        let Some(entry) = self.entries.get_mut(index) else {
            return false;
        };
        if bytes.len() != entry.expected_length {
            return false;
        }
        let Ok(data) = PodData::from_slice(bytes) else {
            return false;
        };

        entry.data = data;
        entry.data_updated = true;
        true
    }

    /// Take the buffered payload if it is fresh, clearing the freshness flag.
    pub fn drain(&mut self, index: usize) -> Option<std::vec::Vec<u8>> {
        let entry = self.entries.get_mut(index)?;
        if !entry.data_updated {
            return None;
        }
        entry.data_updated = false;
        Some(entry.data.to_vec())
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Get the entry in slot `index`.
    pub fn get(&self, index: usize) -> Option<&RegistryEntry> {
        self.entries.get(index)
    }

    /// Iterate over all entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.iter()
    }

    /// Iterate over unlinked entries with their slot index.
    pub fn unlinked(&self) -> impl Iterator<Item = (usize, &RegistryEntry)> {
        self.entries.iter().enumerate().filter(|(_, e)| !e.is_linked())
    }

    /// Number of registered pods.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use podlink_protocol::ConnectType;

    fn registry_with_pod(expected_length: usize) -> BoundedRegistry {
        let mut registry = BoundedRegistry::new();
        registry.register(3, "POD3", expected_length).unwrap();
        registry
    }

    #[test]
    fn test_register_creates_unlinked_entry() {
        let registry = registry_with_pod(10);
        let entry = registry.get(0).unwrap();

        assert_eq!(entry.pod_number(), 3);
        assert_eq!(entry.name(), "POD3");
        assert_eq!(entry.expected_length(), 10);
        assert_eq!(entry.directory_index(), None);
        assert!(!entry.is_fresh());
        assert!(entry.data().is_empty());
    }

    #[test]
    fn test_register_beyond_capacity_is_refused() {
        let mut registry = BoundedRegistry::new();
        for n in 0..MAX_FC as u8 {
            registry.register(n * 10, "POD", 4).unwrap();
        }

        let result = registry.register(200, "LATE", 4);

        assert_eq!(result, Err(RegistryError::Full { capacity: MAX_FC }));
        assert_eq!(registry.len(), MAX_FC);
        assert_eq!(registry.find_by_pod_number(200), None);
    }

    #[test]
    fn test_register_rejects_invalid_definitions() {
        let mut registry = BoundedRegistry::new();
        registry.register(1, "POD1", 4).unwrap();

        assert_eq!(registry.register(1, "AGAIN", 4), Err(RegistryError::DuplicatePod(1)));
        assert!(matches!(
            registry.register(2, "A_NAME_THAT_IS_FAR_TOO_LONG", 4),
            Err(RegistryError::NameTooLong { .. })
        ));
        assert!(matches!(
            registry.register(3, "POD3", MAX_POD_DATA_BYTES + 1),
            Err(RegistryError::PayloadTooLarge { .. })
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_pod_numbers_need_not_match_slots() {
        let mut registry = BoundedRegistry::new();
        registry.register(42, "A", 1).unwrap();
        registry.register(7, "B", 1).unwrap();

        assert_eq!(registry.find_by_pod_number(7), Some(1));
        assert_eq!(registry.find_by_pod_number(42), Some(0));
        assert_eq!(registry.find_by_pod_number(0), None);
    }

    #[test]
    fn test_link_is_first_write_wins() {
        let mut directory = BoundedDirectory::new();
        for n in 0..3 {
            directory.upsert(RadioAddress(0xA0 + n), ConnectType::ClockAndData);
        }
        let mut registry = registry_with_pod(10);

        assert!(registry.link(0, &directory, 2));
        assert!(!registry.link(0, &directory, 1));
        assert_eq!(registry.get(0).unwrap().directory_index(), Some(2));
        assert!(!registry.link(5, &directory, 0));
    }

    #[test]
    fn test_link_refuses_empty_directory_slot() {
        let mut directory = BoundedDirectory::new();
        directory.upsert(RadioAddress(0xA0), ConnectType::ClockAndData);
        let mut registry = registry_with_pod(10);

        assert!(!registry.link(0, &directory, 1));
        assert!(!registry.link(0, &BoundedDirectory::new(), 0));
        assert_eq!(registry.get(0).unwrap().directory_index(), None);

        assert!(registry.link(0, &directory, 0));
    }

    #[test]
    fn test_write_payload_requires_exact_length() {
        let mut registry = registry_with_pod(4);

        assert!(!registry.write_payload(0, &[1, 2, 3]));
        assert!(!registry.write_payload(0, &[1, 2, 3, 4, 5]));
        assert!(!registry.get(0).unwrap().is_fresh());

        assert!(registry.write_payload(0, &[1, 2, 3, 4]));
        assert!(registry.get(0).unwrap().is_fresh());
        assert_eq!(registry.get(0).unwrap().data(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_rejected_payload_keeps_previous_data() {
        let mut registry = registry_with_pod(2);
        registry.write_payload(0, &[7, 7]);
        registry.drain(0);

        assert!(!registry.write_payload(0, &[9, 9, 9]));

        let entry = registry.get(0).unwrap();
        assert_eq!(entry.data(), &[7, 7]);
        assert!(!entry.is_fresh());
    }

    #[test]
    fn test_drain_clears_freshness_once() {
        let mut registry = registry_with_pod(3);
        assert_eq!(registry.drain(0), None);

        registry.write_payload(0, &[4, 5, 6]);

        assert_eq!(registry.drain(0), Some(vec![4, 5, 6]));
        assert_eq!(registry.drain(0), None);
        assert_eq!(registry.get(0).unwrap().data(), &[4, 5, 6]);
    }

    #[test]
    fn test_find_linked_to_follows_directory_address() {
        let mut directory = BoundedDirectory::new();
        directory.upsert(RadioAddress(0xAA), ConnectType::ClockOnly);
        directory.upsert(RadioAddress(0xBB), ConnectType::ClockAndData);

        let mut registry = BoundedRegistry::new();
        registry.register(1, "ONE", 1).unwrap();
        registry.register(2, "TWO", 1).unwrap();
        registry.link(1, &directory, 1);

        assert_eq!(registry.find_linked_to(&directory, RadioAddress(0xBB)), Some(1));
        assert_eq!(registry.find_linked_to(&directory, RadioAddress(0xAA)), None);
    }

    #[test]
    fn test_clear_empties_registry() {
        let mut registry = registry_with_pod(1);
        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.register(3, "POD3", 1).is_ok());
    }
}
