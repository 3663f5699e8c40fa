//! Locations of the platform's ACPI and SMBIOS tables, and of the RAM disk
//! the loader left behind.

/// Table locations handed over by the loader. Zero means absent.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SystemTableInfo {
    pub acpi_base: u64,
    pub acpi_size: u64,
    pub smbios_base: u64,
    pub smbios_size: u64,
    pub ramdisk_base: u64,
    pub ramdisk_size: u64,
}

/// Size of an SMBIOS 2.x (`_SM_`) entry point structure.
pub const SMBIOS2_ENTRY_POINT_SIZE: u64 = 0x1f;
/// Size of an SMBIOS 3.0 (`_SM3_`) entry point structure.
pub const SMBIOS3_ENTRY_POINT_SIZE: u64 = 0x18;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SmbiosEntryPoint {
    Smbios2 { base: u64 },
    Smbios3 { base: u64 },
}

impl SystemTableInfo {
    /// The ACPI table as `(base, size)`, if both are known.
    pub fn acpi(&self) -> Option<(u64, u64)> {
        if self.acpi_base == 0 || self.acpi_size == 0 {
            return None;
        }
        Some((self.acpi_base, self.acpi_size))
    }

    /// The SMBIOS entry point. The loader reports the entry point structure's
    /// size, which tells the two versions apart; any other size cannot be
    /// installed.
    pub fn smbios(&self) -> Option<SmbiosEntryPoint> {
        if self.smbios_base == 0 {
            return None;
        }

        match self.smbios_size {
            SMBIOS2_ENTRY_POINT_SIZE => Some(SmbiosEntryPoint::Smbios2 {
                base: self.smbios_base,
            }),
            SMBIOS3_ENTRY_POINT_SIZE => Some(SmbiosEntryPoint::Smbios3 {
                base: self.smbios_base,
            }),
            size => {
                log::warn!(
                    "SMBIOS entry point at {:#x} has unexpected size {:#x}",
                    self.smbios_base,
                    size
                );
                None
            }
        }
    }

    /// The RAM disk as `(base, size)`, if both are known.
    pub fn ramdisk(&self) -> Option<(u64, u64)> {
        if self.ramdisk_base == 0 || self.ramdisk_size == 0 {
            return None;
        }
        Some((self.ramdisk_base, self.ramdisk_size))
    }
}
