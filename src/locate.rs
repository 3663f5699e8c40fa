//! Finding the loader's configuration blob and telling its versions apart.

use core::fmt;

use num_traits::FromPrimitive;
use static_assertions::const_assert_eq;

use crate::v1::ConfigV1;
use crate::v2::CommandLine;

/// The blob occupies the 64 KiB directly below the payload's firmware volume.
pub const CONFIG_REGION_SIZE: usize = 64 * 1024;

/// Size of the version tag at the start of the blob.
pub const VERSION_SIZE: usize = 8;

/// Blob format, identified by the first 8 bytes of the blob.
#[derive(Clone, Copy, Debug, Eq, PartialEq, num_derive::FromPrimitive)]
#[repr(u64)]
pub enum Version {
    /// Fixed binary layout.
    V1 = 1,
    /// Text command line, tagged with the ASCII bytes `LnxBoot1`.
    V2 = 0x3174_6f6f_4278_6e4c,
}

const_assert_eq!(Version::V2 as u64, u64::from_le_bytes(*b"LnxBoot1"));

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::V1 => write!(f, "v1 (binary)"),
            Version::V2 => write!(f, "v2 (command line)"),
        }
    }
}

/// The blob is present but cannot be decoded. Decoding it anyway would report
/// garbage as the machine's memory map, so these are never recovered from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Fatal {
    BadVersion(u64),
    Truncated { len: usize, needed: usize },
}

impl fmt::Display for Fatal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Fatal::BadVersion(tag) => write!(
                f,
                "expected payload config version {:016x} or {:016x}, but got {:016x}",
                Version::V1 as u64,
                Version::V2 as u64,
                tag
            ),
            Fatal::Truncated { len, needed } => write!(
                f,
                "payload config is {} bytes, at least {} needed",
                len, needed
            ),
        }
    }
}

/// A decoded view of the blob.
#[derive(Clone, Debug)]
pub enum Config<'a> {
    V1(ConfigV1<'a>),
    V2(CommandLine<'a>),
}

impl<'a> Config<'a> {
    pub fn version(&self) -> Version {
        match self {
            Config::V1(_) => Version::V1,
            Config::V2(_) => Version::V2,
        }
    }
}

/// Address of the blob given the payload firmware volume's base in memory, or
/// `None` if the base leaves no room for it.
pub fn config_address(fd_mem_base: u32) -> Option<u64> {
    (fd_mem_base as u64).checked_sub(CONFIG_REGION_SIZE as u64)
}

/// The memory region holding the blob.
///
/// # Safety
///
/// The `CONFIG_REGION_SIZE` bytes below `fd_mem_base` must be identity mapped,
/// readable, and left unmodified for the rest of the program.
pub unsafe fn config_region(fd_mem_base: u32) -> Option<&'static [u8]> {
    let address = config_address(fd_mem_base)?;
    // SAFETY: the caller guarantees the region is mapped and immutable.
    Some(unsafe { core::slice::from_raw_parts(address as usize as *const u8, CONFIG_REGION_SIZE) })
}

/// Identifies the blob's version and checks it is big enough for that
/// version's fixed fields.
pub fn locate(blob: &[u8]) -> Result<Config<'_>, Fatal> {
    if blob.len() < VERSION_SIZE {
        return Err(Fatal::Truncated {
            len: blob.len(),
            needed: VERSION_SIZE,
        });
    }

    let (tag, body) = blob.split_at(VERSION_SIZE);
    let mut tag_bytes = [0; VERSION_SIZE];
    tag_bytes.copy_from_slice(tag);
    let tag = u64::from_le_bytes(tag_bytes);

    let config = match Version::from_u64(tag) {
        Some(Version::V1) => match ConfigV1::parse(body) {
            Some(config) => Config::V1(config),
            None => {
                return Err(Fatal::Truncated {
                    len: blob.len(),
                    needed: VERSION_SIZE + ConfigV1::HEADER_SIZE,
                })
            }
        },
        Some(Version::V2) => Config::V2(CommandLine::from_body(body)),
        None => return Err(Fatal::BadVersion(tag)),
    };

    log::info!("found payload config {}", config.version());
    Ok(config)
}
