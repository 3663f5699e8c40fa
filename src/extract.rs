//! Entry points for firmware bring-up.
//!
//! Each extraction locates the blob afresh and fills in the caller's output.
//! A missing blob is not an error: the outputs keep their defaults and
//! bring-up carries on. A blob that is present but unrecognizable goes to the
//! [`Halt`] hook instead of returning.

use crate::halt::{DeadLoop, Halt};
use crate::locate::{self, locate, Config, Version};
use crate::memory::RangeSink;
use crate::serial::SerialPortInfo;
use crate::tables::SystemTableInfo;
use crate::Decode;

/// Where an extraction's results came from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Source {
    Config(Version),
    /// No blob was found; outputs hold their defaults.
    Defaults,
}

/// The loader's configuration blob, if it left one.
pub struct PayloadConfig<'a, H: Halt = DeadLoop> {
    blob: Option<&'a [u8]>,
    halt: H,
}

impl PayloadConfig<'static, DeadLoop> {
    /// Finds the blob below the payload firmware volume at `fd_mem_base`.
    ///
    /// # Safety
    ///
    /// See [`locate::config_region`].
    pub unsafe fn from_fd_mem_base(fd_mem_base: u32) -> Self {
        // SAFETY: forwarded to our caller.
        let blob = unsafe { locate::config_region(fd_mem_base) };
        PayloadConfig::new(blob, DeadLoop)
    }
}

impl<'a, H: Halt> PayloadConfig<'a, H> {
    pub fn new(blob: Option<&'a [u8]>, halt: H) -> Self {
        PayloadConfig { blob, halt }
    }

    fn config(&self, caller: &str) -> Option<Config<'a>> {
        let Some(blob) = self.blob else {
            log::error!("{}: could not find payload config", caller);
            return None;
        };

        match locate(blob) {
            Ok(config) => Some(config),
            Err(fatal) => self.halt.halt(&fatal),
        }
    }

    fn decode<T>(&self, caller: &str, f: impl FnOnce(&dyn Decode) -> T) -> Source {
        let Some(config) = self.config(caller) else {
            return Source::Defaults;
        };

        match &config {
            Config::V1(v1) => f(v1),
            Config::V2(v2) => f(v2),
        };
        Source::Config(config.version())
    }

    /// Reports every memory range the loader described, normalized to pages
    /// and in the loader's order.
    pub fn extract_memory_ranges<S: RangeSink>(&self, sink: &mut S) -> Source {
        self.decode("extract_memory_ranges", |d| d.memory_ranges(sink))
    }

    /// Fills in ACPI, SMBIOS and RAM disk locations. Fields the loader does
    /// not mention are left as they were.
    pub fn extract_system_table_info(&self, info: &mut SystemTableInfo) -> Source {
        self.decode("extract_system_table_info", |d| d.system_tables(info))
    }

    /// Resets `info` to the default console, then applies the loader's
    /// settings.
    pub fn extract_serial_port_info(&self, info: &mut SerialPortInfo) -> Source {
        *info = SerialPortInfo::default();
        self.decode("extract_serial_port_info", |d| d.serial_port(info))
    }
}
