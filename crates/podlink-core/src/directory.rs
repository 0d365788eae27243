//! Devices that have answered an invite.
//!
//! The directory is filled exclusively by RSVP processing. Entries are never
//! removed during a session, so an index handed out by [`BoundedDirectory::upsert`]
//! stays valid for as long as the directory lives.

use heapless::Vec;
use podlink_protocol::{ConnectType, RadioAddress, MAX_FC};

/// A pod that has replied over the radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Radio address, unique within the directory.
    pub address: RadioAddress,
    /// Connection type from the pod's most recent RSVP.
    pub connect_type: ConnectType,
    /// Whether the pod's last clock test passed.
    pub good_clock: bool,
}

/// Fixed-capacity set of responding pods, keyed by radio address.
#[derive(Debug, Default)]
pub struct BoundedDirectory {
    entries: Vec<DirectoryEntry, MAX_FC>,
}

impl BoundedDirectory {
    /// Create an empty directory.
    pub const fn new() -> Self {
        BoundedDirectory {
            entries: Vec::new(),
        }
    }

    /// Record an RSVP.
    ///
    /// A known address has its connect type updated in place and keeps its
    /// clock flag. An unknown address is appended with `good_clock = false`.
    /// Returns `None` when the address is unknown and the directory is full.
    pub fn upsert(&mut self, address: RadioAddress, connect_type: ConnectType) -> Option<usize> {
        if let Some(index) = self.find_by_address(address) {
            self.entries[index].connect_type = connect_type;
            return Some(index);
        }

        let entry = DirectoryEntry {
            address,
            connect_type,
            good_clock: false,
        };
        self.entries.push(entry).ok()?;
        Some(self.entries.len() - 1)
    }

    /// Set the clock flag of an existing slot. Returns false for an invalid index.
    pub fn set_clock_quality(&mut self, index: usize, good: bool) -> bool {
        match self.entries.get_mut(index) {
            Some(entry) => {
                entry.good_clock = good;
                true
            }
            None => false,
        }
    }

    /// Find the slot holding `address`.
    pub fn find_by_address(&self, address: RadioAddress) -> Option<usize> {
        self.entries.iter().position(|e| e.address == address)
    }

    /// Get the entry in slot `index`.
    pub fn get(&self, index: usize) -> Option<&DirectoryEntry> {
        self.entries.get(index)
    }

    /// Iterate over all entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &DirectoryEntry> {
        self.entries.iter()
    }

    /// Number of recorded pods.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no pod has replied yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the directory has reached capacity.
    pub fn is_full(&self) -> bool {
        self.entries.is_full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_appends_new_address() {
        let mut directory = BoundedDirectory::new();
        let index = directory.upsert(RadioAddress(0xA1), ConnectType::ClockAndData);

        assert_eq!(index, Some(0));
        let entry = directory.get(0).unwrap();
        assert_eq!(entry.address, RadioAddress(0xA1));
        assert_eq!(entry.connect_type, ConnectType::ClockAndData);
        assert!(!entry.good_clock);
    }

    #[test]
    fn test_upsert_updates_known_address_in_place() {
        let mut directory = BoundedDirectory::new();
        directory.upsert(RadioAddress(0xA1), ConnectType::ClockOnly);
        directory.upsert(RadioAddress(0xB2), ConnectType::ClockOnly);
        directory.set_clock_quality(0, true);

        let index = directory.upsert(RadioAddress(0xA1), ConnectType::Decline);

        assert_eq!(index, Some(0));
        assert_eq!(directory.len(), 2);
        let entry = directory.get(0).unwrap();
        assert_eq!(entry.connect_type, ConnectType::Decline);
        assert!(entry.good_clock, "clock flag survives a repeated RSVP");
    }

    #[test]
    fn test_upsert_drops_when_full() {
        let mut directory = BoundedDirectory::new();
        for addr in 1..=MAX_FC as u64 {
            assert!(directory.upsert(RadioAddress(addr), ConnectType::ClockOnly).is_some());
        }
        assert!(directory.is_full());

        assert_eq!(directory.upsert(RadioAddress(99), ConnectType::ClockOnly), None);
        assert_eq!(directory.len(), MAX_FC);

        // Known addresses can still be updated at capacity.
        assert_eq!(
            directory.upsert(RadioAddress(3), ConnectType::ClockAndData),
            Some(2)
        );
    }

    #[test]
    fn test_addresses_stay_unique_under_repeated_rsvps() {
        let mut directory = BoundedDirectory::new();
        let addresses = [5u64, 7, 5, 9, 7, 7, 11, 13, 5, 15, 17, 19, 21];
        for (i, addr) in addresses.iter().enumerate() {
            let connect_type = ConnectType::try_from((i % 3) as u8).unwrap();
            directory.upsert(RadioAddress(*addr), connect_type);
        }

        assert!(directory.len() <= MAX_FC);
        let mut seen: std::vec::Vec<u64> = directory.iter().map(|e| e.address.0).collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), directory.len());
    }

    #[test]
    fn test_set_clock_quality_bounds_checked() {
        let mut directory = BoundedDirectory::new();
        directory.upsert(RadioAddress(1), ConnectType::ClockOnly);

        assert!(directory.set_clock_quality(0, true));
        assert!(directory.get(0).unwrap().good_clock);
        assert!(!directory.set_clock_quality(4, true));
    }

    #[test]
    fn test_find_by_address() {
        let mut directory = BoundedDirectory::new();
        directory.upsert(RadioAddress(10), ConnectType::ClockOnly);
        directory.upsert(RadioAddress(20), ConnectType::ClockOnly);

        assert_eq!(directory.find_by_address(RadioAddress(20)), Some(1));
        assert_eq!(directory.find_by_address(RadioAddress(30)), None);
    }
}
