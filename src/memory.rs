//! Memory ranges reported by the loader, and their normalization to whole
//! pages.

#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use arrayvec::ArrayVec;
use num_traits::FromPrimitive;

pub const PAGE_SIZE: u64 = 4096;

/// Memory type codes used by the loader.
#[derive(Clone, Copy, Debug, Eq, PartialEq, num_derive::FromPrimitive)]
#[repr(u32)]
pub enum MemoryType {
    /// Usable RAM
    Ram = 1,
    /// Usable, but not reported as plain RAM
    Default = 2,
    /// ACPI tables, reclaimable after they are read
    Acpi = 3,
    /// ACPI non-volatile storage
    Nvs = 4,
    /// Cannot be used
    Reserved = 5,
}

impl MemoryType {
    /// Decodes a loader type code. Unknown codes are treated as reserved
    /// memory, which is how anything other than RAM is handled downstream.
    pub fn from_code(code: u64) -> MemoryType {
        match MemoryType::from_u64(code) {
            Some(mem_type) => mem_type,
            None => {
                log::warn!("unknown memory type {}, treating as reserved", code);
                MemoryType::Reserved
            }
        }
    }
}

/// A page-aligned range of physical memory.
///
/// `base` and `base + size` are multiples of `PAGE_SIZE`, except for an empty
/// RAM range starting inside the last page of the address space, which keeps
/// its unaligned start.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MemoryRange {
    pub base: u64,
    pub size: u64,
    pub mem_type: MemoryType,
    /// Reserved; always 0.
    pub flag: u32,
}

impl MemoryRange {
    /// The first address past the range.
    pub fn end(&self) -> u64 {
        self.base + self.size
    }
}

const LAST_PAGE: u64 = u64::MAX & !(PAGE_SIZE - 1);

/// Rounds `address` up to a page boundary, or `None` past the last page.
fn page_align_up(address: u64) -> Option<u64> {
    address
        .checked_add(PAGE_SIZE - 1)
        .map(|a| a & !(PAGE_SIZE - 1))
}

/// Aligns the loader's `[start, end)` range to pages.
///
/// Both ends are rounded up. Rounding must never hand out a partial page of
/// RAM as whole RAM, nor leave a partial page of anything else unreported:
/// a non-RAM range whose start moved keeps the page it started in, and a RAM
/// range whose end moved past `end + 1` loses its last partial page.
///
/// A range that becomes inverted is reported empty at its aligned base.
/// Addresses inside the last page cannot round up; they round down to it
/// instead, except a RAM start, which would then grow the range.
pub fn normalize(start: u64, end: u64, mem_type: MemoryType) -> MemoryRange {
    let ram = mem_type == MemoryType::Ram;

    let mut aligned_start = match page_align_up(start) {
        Some(aligned) => aligned,
        None if ram => {
            return MemoryRange {
                base: start,
                size: 0,
                mem_type,
                flag: 0,
            }
        }
        None => LAST_PAGE,
    };
    let mut aligned_end = page_align_up(end).unwrap_or(LAST_PAGE);

    if aligned_start > start && !ram {
        aligned_start -= PAGE_SIZE;
    }
    if aligned_end > end.saturating_add(1) && ram {
        aligned_end -= PAGE_SIZE;
    }

    MemoryRange {
        base: aligned_start,
        size: aligned_end.saturating_sub(aligned_start),
        mem_type,
        flag: 0,
    }
}

/// Receives normalized ranges in the order the loader listed them.
pub trait RangeSink {
    fn add_range(&mut self, range: MemoryRange);
}

impl<F: FnMut(MemoryRange)> RangeSink for F {
    fn add_range(&mut self, range: MemoryRange) {
        self(range)
    }
}

#[cfg(feature = "alloc")]
impl RangeSink for Vec<MemoryRange> {
    fn add_range(&mut self, range: MemoryRange) {
        self.push(range);
    }
}

/// Fixed-capacity sink for use before a heap exists. Ranges past the
/// capacity are dropped with an error.
impl<const N: usize> RangeSink for ArrayVec<MemoryRange, N> {
    fn add_range(&mut self, range: MemoryRange) {
        if self.try_push(range).is_err() {
            log::error!("memory range table full, dropping {:x?}", range);
        }
    }
}
