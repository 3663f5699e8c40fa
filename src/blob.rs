//! Building configuration blobs the way the loader lays them out.

use alloc::vec::Vec;
use core::fmt;

use crate::locate::Version;
use crate::serial::SerialPortInfo;
use crate::tables::SystemTableInfo;
use crate::v1::ConfigV1;
use crate::v2::MAX_CMDLINE_LEN;

/// Builds a V1 (binary) blob.
#[derive(Clone, Debug, Default)]
pub struct ConfigV1Builder {
    tables: SystemTableInfo,
    serial: SerialPortInfo,
    entries: Vec<(u64, u64, u32)>,
}

impl ConfigV1Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// ACPI and SMBIOS locations. V1 has no RAM disk fields.
    pub fn system_tables(&mut self, tables: SystemTableInfo) -> &mut Self {
        self.tables = tables;
        self
    }

    pub fn serial(&mut self, serial: SerialPortInfo) -> &mut Self {
        self.serial = serial;
        self
    }

    /// Appends a raw memory map entry. Entries are written in call order.
    pub fn memory_range(&mut self, start: u64, end: u64, mem_type: u32) -> &mut Self {
        self.entries.push((start, end, mem_type));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut blob = Vec::with_capacity(
            8 + ConfigV1::HEADER_SIZE + self.entries.len() * ConfigV1::ENTRY_SIZE,
        );

        let t = &self.tables;
        for field in [Version::V1 as u64, t.acpi_base, t.acpi_size, t.smbios_base, t.smbios_size] {
            blob.extend_from_slice(&field.to_le_bytes());
        }

        let s = &self.serial;
        for field in [
            s.port_type,
            s.base_addr,
            s.baud,
            s.reg_width,
            s.input_hertz,
            s.uart_pci_addr,
            self.entries.len() as u32,
        ] {
            blob.extend_from_slice(&field.to_le_bytes());
        }

        for &(start, end, mem_type) in &self.entries {
            blob.extend_from_slice(&start.to_le_bytes());
            blob.extend_from_slice(&end.to_le_bytes());
            blob.extend_from_slice(&mem_type.to_le_bytes());
        }

        blob
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EncodeError {
    /// The command line and its NUL do not fit in the config region.
    TooLong { len: usize, max: usize },
    /// A NUL inside the command line would cut it short.
    InteriorNul { offset: usize },
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            EncodeError::TooLong { len, max } => write!(
                f,
                "command line is {} bytes, at most {} fit",
                len, max
            ),
            EncodeError::InteriorNul { offset } => {
                write!(f, "command line has a NUL at offset {}", offset)
            }
        }
    }
}

/// Builds a V2 (command line) blob.
pub fn encode_cmdline(cmdline: &str) -> Result<Vec<u8>, EncodeError> {
    let max = MAX_CMDLINE_LEN - 1;
    if cmdline.len() > max {
        return Err(EncodeError::TooLong {
            len: cmdline.len(),
            max,
        });
    }
    if let Some(offset) = cmdline.bytes().position(|c| c == b'\0') {
        return Err(EncodeError::InteriorNul { offset });
    }

    let mut blob = Vec::with_capacity(8 + cmdline.len() + 1);
    blob.extend_from_slice(&(Version::V2 as u64).to_le_bytes());
    blob.extend_from_slice(cmdline.as_bytes());
    blob.push(b'\0');
    Ok(blob)
}
