//! Boot handoff from a LinuxBoot-style loader
//!
//! The loader leaves a configuration blob just below the payload's firmware
//! volume. This crate finds it, works out which of its two formats it uses,
//! and extracts the memory map, ACPI/SMBIOS table locations, and serial
//! console settings from it. See [`extract::PayloadConfig`] for the entry
//! points.
//!
#![deny(unsafe_op_in_unsafe_fn)]
#![cfg_attr(not(test), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(test)]
extern crate std;

#[cfg(feature = "alloc")]
pub mod blob;
pub mod cmdline;
pub mod extract;
pub mod halt;
pub mod lexer;
pub mod locate;
pub mod log;
pub mod memory;
pub mod serial;
pub mod tables;
pub mod v1;
pub mod v2;

pub use extract::{PayloadConfig, Source};
pub use locate::{Fatal, Version};
pub use memory::{MemoryRange, MemoryType, RangeSink};
pub use serial::SerialPortInfo;
pub use tables::SystemTableInfo;

/// Extraction from one blob format.
///
/// Outputs are updated in place: fields the blob does not describe keep the
/// values the caller passed in.
pub trait Decode {
    /// Normalizes each memory range in the blob and hands it to `sink`, in
    /// blob order.
    fn memory_ranges(&self, sink: &mut dyn RangeSink);

    fn system_tables(&self, info: &mut SystemTableInfo);

    fn serial_port(&self, info: &mut SerialPortInfo);
}
