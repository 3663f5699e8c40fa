//! The fixed binary layout of the blob.
//!
//! After the version tag comes a packed header followed immediately by
//! `num_memory_map_entries` packed memory map entries. All fields are little
//! endian.

use static_assertions::{assert_eq_size, const_assert};

use crate::memory::{normalize, MemoryType, RangeSink};
use crate::serial::SerialPortInfo;
use crate::tables::SystemTableInfo;
use crate::Decode;

const_assert!(cfg!(target_endian = "little"));

#[repr(C, packed)]
#[derive(Clone, Copy, Debug)]
pub struct RawSerialConfig {
    pub port_type: u32,
    pub base_addr: u32,
    pub baud: u32,
    pub reg_width: u32,
    pub input_hertz: u32,
    pub uart_pci_addr: u32,
}

#[repr(C, packed)]
#[derive(Clone, Copy, Debug)]
pub struct RawHeader {
    pub acpi_base: u64,
    pub acpi_size: u64,
    pub smbios_base: u64,
    pub smbios_size: u64,
    pub serial: RawSerialConfig,
    pub num_memory_map_entries: u32,
}

#[repr(C, packed)]
#[derive(Clone, Copy, Debug)]
pub struct RawMemoryMapEntry {
    pub start: u64,
    pub end: u64,
    pub mem_type: u32,
}

assert_eq_size!(RawSerialConfig, [u8; 24]);
assert_eq_size!(RawHeader, [u8; 60]);
assert_eq_size!(RawMemoryMapEntry, [u8; 20]);

/// Reads a `T` from the start of `bytes`.
///
/// # Safety
///
/// Every bit pattern must be a valid `T`.
unsafe fn read_packed<T: Copy>(bytes: &[u8]) -> Option<T> {
    if bytes.len() < core::mem::size_of::<T>() {
        return None;
    }
    // SAFETY: `bytes` holds at least `size_of::<T>()` initialized bytes, and
    // the caller guarantees they form a valid `T`. `read_unaligned` does not
    // need `bytes` to be aligned for `T`.
    Some(unsafe { core::ptr::read_unaligned(bytes.as_ptr() as *const T) })
}

/// A V1 blob: header plus as many whole memory map entries as the blob holds,
/// up to the count the header declares.
#[derive(Clone, Debug)]
pub struct ConfigV1<'a> {
    header: RawHeader,
    entries: &'a [u8],
}

impl<'a> ConfigV1<'a> {
    pub const HEADER_SIZE: usize = core::mem::size_of::<RawHeader>();
    pub const ENTRY_SIZE: usize = core::mem::size_of::<RawMemoryMapEntry>();

    /// Decodes the blob body following the version tag. Returns `None` if it
    /// cannot hold the header.
    pub fn parse(body: &'a [u8]) -> Option<Self> {
        // SAFETY: `RawHeader` is plain integers.
        let header: RawHeader = unsafe { read_packed(body)? };
        let rest = &body[Self::HEADER_SIZE..];

        let declared = header.num_memory_map_entries as usize;
        let available = rest.len() / Self::ENTRY_SIZE;
        let count = if declared > available {
            log::warn!(
                "memory map declares {} entries but only {} fit in the config",
                declared,
                available
            );
            available
        } else {
            declared
        };

        Some(ConfigV1 {
            header,
            entries: &rest[..count * Self::ENTRY_SIZE],
        })
    }

    pub fn header(&self) -> &RawHeader {
        &self.header
    }

    /// The memory map entries, in blob order.
    pub fn memory_map(&self) -> impl Iterator<Item = RawMemoryMapEntry> + 'a {
        self.entries
            .chunks_exact(Self::ENTRY_SIZE)
            // SAFETY: `RawMemoryMapEntry` is plain integers.
            .filter_map(|chunk| unsafe { read_packed(chunk) })
    }

    pub fn num_entries(&self) -> usize {
        self.entries.len() / Self::ENTRY_SIZE
    }
}

impl<'a> Decode for ConfigV1<'a> {
    fn memory_ranges(&self, sink: &mut dyn RangeSink) {
        let declared = self.header.num_memory_map_entries;
        log::info!("MemoryMap #entries: {}", declared);

        for entry in self.memory_map() {
            let (start, end, mem_type) = (entry.start, entry.end, entry.mem_type);
            log::debug!("Start: {:#x} End: {:#x} Type: {}", start, end, mem_type);
            sink.add_range(normalize(start, end, MemoryType::from_code(mem_type as u64)));
        }
    }

    fn system_tables(&self, info: &mut SystemTableInfo) {
        let header = self.header;
        info.acpi_base = header.acpi_base;
        info.acpi_size = header.acpi_size;
        info.smbios_base = header.smbios_base;
        info.smbios_size = header.smbios_size;
    }

    fn serial_port(&self, info: &mut SerialPortInfo) {
        let serial = self.header.serial;
        *info = SerialPortInfo {
            port_type: serial.port_type,
            base_addr: serial.base_addr,
            baud: serial.baud,
            reg_width: serial.reg_width,
            input_hertz: serial.input_hertz,
            uart_pci_addr: serial.uart_pci_addr,
        };
    }
}
