//! Point-in-time snapshots of the directory and registry for display.

use std::fmt;

use podlink_protocol::{ConnectType, RadioAddress};

use crate::directory::BoundedDirectory;
use crate::registry::BoundedRegistry;

/// One directory slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryRow {
    pub index: usize,
    pub address: RadioAddress,
    pub connect_type: ConnectType,
    pub good_clock: bool,
}

/// Snapshot of the directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryReport {
    pub rows: Vec<DirectoryRow>,
}

impl DirectoryReport {
    /// Capture `directory`.
    pub fn capture(directory: &BoundedDirectory) -> Self {
        let rows = directory
            .iter()
            .enumerate()
            .map(|(index, entry)| DirectoryRow {
                index,
                address: entry.address,
                connect_type: entry.connect_type,
                good_clock: entry.good_clock,
            })
            .collect();
        DirectoryReport { rows }
    }
}

impl fmt::Display for DirectoryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Directory ({} entries)", self.rows.len())?;
        writeln!(f, "{:>4}  {:<16}  {:<10}  {}", "slot", "address", "type", "clock")?;
        for row in &self.rows {
            writeln!(
                f,
                "{:>4}  {}  {:<10}  {}",
                row.index,
                row.address,
                row.connect_type.to_string(),
                if row.good_clock { "good" } else { "bad" }
            )?;
        }
        Ok(())
    }
}

/// One registry slot, with the address it is linked to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryRow {
    pub pod_number: u8,
    pub name: String,
    pub directory_index: Option<usize>,
    pub address: Option<RadioAddress>,
    pub expected_length: usize,
    pub fresh: bool,
}

/// Snapshot of the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryReport {
    pub rows: Vec<RegistryRow>,
}

impl RegistryReport {
    /// Capture `registry`, resolving links through `directory`.
    pub fn capture(registry: &BoundedRegistry, directory: &BoundedDirectory) -> Self {
        let rows = registry
            .iter()
            .map(|entry| RegistryRow {
                pod_number: entry.pod_number(),
                name: entry.name().to_string(),
                directory_index: entry.directory_index(),
                address: entry
                    .directory_index()
                    .and_then(|n| directory.get(n))
                    .map(|d| d.address),
                expected_length: entry.expected_length(),
                fresh: entry.is_fresh(),
            })
            .collect();
        RegistryReport { rows }
    }
}

impl fmt::Display for RegistryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Registry ({} pods)", self.rows.len())?;
        writeln!(
            f,
            "{:>3}  {:<21}  {:<16}  {:>6}  {}",
            "pod", "name", "address", "length", "fresh"
        )?;
        for row in &self.rows {
            let address = row
                .address
                .map_or_else(|| "unlinked".to_string(), |a| a.to_string());
            writeln!(
                f,
                "{:>3}  {:<21}  {:<16}  {:>6}  {}",
                row.pod_number, row.name, address, row.expected_length, row.fresh
            )?;
        }
        Ok(())
    }
}

/// Buffered telemetry of one data-sending pod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodDataRow {
    pub pod_number: u8,
    pub name: String,
    pub data: Vec<u8>,
    pub fresh: bool,
}

/// Snapshot of the telemetry buffers of pods linked to a clock+data device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PodDataReport {
    pub rows: Vec<PodDataRow>,
}

impl PodDataReport {
    /// Capture the buffers of every entry linked to a clock+data device.
    pub fn capture(registry: &BoundedRegistry, directory: &BoundedDirectory) -> Self {
        let rows = registry
            .iter()
            .filter(|entry| {
                entry
                    .directory_index()
                    .and_then(|n| directory.get(n))
                    .is_some_and(|d| d.connect_type.sends_data())
            })
            .map(|entry| PodDataRow {
                pod_number: entry.pod_number(),
                name: entry.name().to_string(),
                data: entry.data().to_vec(),
                fresh: entry.is_fresh(),
            })
            .collect();
        PodDataReport { rows }
    }
}

impl fmt::Display for PodDataReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pod data ({} pods)", self.rows.len())?;
        for row in &self.rows {
            write!(f, "{:>3}  {:<21} ", row.pod_number, row.name)?;
            for byte in &row.data {
                write!(f, " {:02X}", byte)?;
            }
            writeln!(f, "{}", if row.fresh { "  *" } else { "" })?;
        }
        Ok(())
    }
}
