//! The text layout of the blob: one NUL-terminated command line of
//! whitespace-separated `key=v1,v2,...` options.
//!
//! Options may repeat. Each occurrence overrides only the fields it supplies,
//! so later options win field by field. A malformed option is logged and
//! skipped; it never stops the scan.

use core::fmt;

use crate::cmdline::{option_values, tokens, Tokens};
use crate::locate::{CONFIG_REGION_SIZE, VERSION_SIZE};
use crate::memory::{normalize, MemoryType, RangeSink};
use crate::serial::SerialPortInfo;
use crate::tables::SystemTableInfo;
use crate::Decode;

/// Longest command line that fits in the config region after the tag.
pub const MAX_CMDLINE_LEN: usize = CONFIG_REGION_SIZE - VERSION_SIZE;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum OptionKey {
    /// `mem=start,end,type`
    Mem,
    /// `ramdisk=base,size[,type]`
    RamDisk,
    /// `ACPI20=base[,size]`
    Acpi20,
    /// `SMBIOS=base[,size]`
    Smbios,
    /// `serial=baud[,base[,regwidth[,type[,inputhertz[,uartpciaddr]]]]]`
    Serial,
}

impl OptionKey {
    const PREFIXES: [(&'static [u8], OptionKey); 5] = [
        (b"mem=", OptionKey::Mem),
        (b"ramdisk=", OptionKey::RamDisk),
        (b"ACPI20=", OptionKey::Acpi20),
        (b"SMBIOS=", OptionKey::Smbios),
        (b"serial=", OptionKey::Serial),
    ];

    fn of(token: &[u8]) -> Option<OptionKey> {
        Self::PREFIXES
            .iter()
            .find(|(prefix, _)| token.starts_with(prefix))
            .map(|&(_, key)| key)
    }
}

/// Displays a raw token for log messages.
struct Token<'a>(&'a [u8]);

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0
            .iter()
            .try_for_each(|&c| write!(f, "{}", core::ascii::escape_default(c)))
    }
}

/// The command line of a V2 blob, without its terminating NUL.
#[derive(Clone, Copy, Debug)]
pub struct CommandLine<'a> {
    text: &'a [u8],
}

impl<'a> CommandLine<'a> {
    /// Takes the command line from the blob body following the version tag.
    pub fn from_body(body: &'a [u8]) -> Self {
        let body = &body[..body.len().min(MAX_CMDLINE_LEN)];
        let text = match body.iter().position(|&c| c == b'\0') {
            Some(nul) => &body[..nul],
            None => {
                log::warn!("payload command line is not NUL terminated");
                body
            }
        };
        CommandLine { text }
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.text
    }

    pub fn tokens(&self) -> Tokens<'a> {
        tokens(self.text)
    }

    /// Recognized options, in command line order.
    fn options(&self) -> impl Iterator<Item = (OptionKey, &'a [u8])> + 'a {
        self.tokens()
            .filter_map(|token| OptionKey::of(token).map(|key| (key, token)))
    }
}

/// Reads up to `N` values from `token`, logging and returning `None` if the
/// list is malformed.
fn values_or_log<const N: usize>(token: &[u8]) -> Option<arrayvec::ArrayVec<u64, N>> {
    match option_values::<N>(token) {
        Ok(values) => Some(values),
        Err(e) => {
            log::error!("Parse error: '{}': {}", Token(token), e);
            None
        }
    }
}

impl<'a> Decode for CommandLine<'a> {
    fn memory_ranges(&self, sink: &mut dyn RangeSink) {
        for (key, token) in self.options() {
            if key != OptionKey::Mem && key != OptionKey::RamDisk {
                continue;
            }

            let Some(values) = values_or_log::<3>(token) else {
                continue;
            };
            let [start, end, mem_type] = match values.as_slice() {
                &[start, end, mem_type] => [start, end, mem_type],
                _ => {
                    log::error!("Parse error: '{}': expected start,end,type", Token(token));
                    continue;
                }
            };

            log::debug!("Start: {:#x} End: {:#x} Type: {}", start, end, mem_type);
            sink.add_range(normalize(start, end, MemoryType::from_code(mem_type)));
        }
    }

    fn system_tables(&self, info: &mut SystemTableInfo) {
        for (key, token) in self.options() {
            let (base, size) = match key {
                OptionKey::Acpi20 => (&mut info.acpi_base, &mut info.acpi_size),
                OptionKey::Smbios => (&mut info.smbios_base, &mut info.smbios_size),
                OptionKey::RamDisk => (&mut info.ramdisk_base, &mut info.ramdisk_size),
                OptionKey::Mem | OptionKey::Serial => continue,
            };

            // `ramdisk=` may carry a memory type as well; it is not a table
            // field.
            let values = if key == OptionKey::RamDisk {
                values_or_log::<3>(token)
            } else {
                values_or_log::<2>(token).map(|v| v.into_iter().collect())
            };
            let Some(values) = values else {
                continue;
            };

            for (field, value) in [base, size].into_iter().zip(values) {
                *field = value;
            }
            log::debug!("{}: {:#x?}", Token(token), info);
        }
    }

    fn serial_port(&self, info: &mut SerialPortInfo) {
        for (key, token) in self.options() {
            if key != OptionKey::Serial {
                continue;
            }

            let Some(values) = values_or_log::<6>(token) else {
                continue;
            };

            // Fields are listed in the order the loader writes them.
            let fields = [
                &mut info.baud,
                &mut info.base_addr,
                &mut info.reg_width,
                &mut info.port_type,
                &mut info.input_hertz,
                &mut info.uart_pci_addr,
            ];
            for (field, value) in fields.into_iter().zip(values) {
                *field = value as u32;
            }
            log::debug!("{}: {:x?}", Token(token), info);
        }
    }
}

#[cfg(all(test, feature = "alloc"))]
mod tests {
    use super::*;

    use std::vec::Vec;

    use pretty_assertions::assert_eq;

    use crate::log::capture::capture;
    use crate::memory::MemoryRange;

    fn cmdline(text: &[u8]) -> CommandLine<'_> {
        CommandLine::from_body(text)
    }

    fn ranges(text: &[u8]) -> Vec<MemoryRange> {
        let mut ranges = Vec::new();
        cmdline(text).memory_ranges(&mut ranges);
        ranges
    }

    fn tables(text: &[u8]) -> SystemTableInfo {
        let mut info = SystemTableInfo::default();
        cmdline(text).system_tables(&mut info);
        info
    }

    fn serial(text: &[u8]) -> SerialPortInfo {
        let mut info = SerialPortInfo::default();
        cmdline(text).serial_port(&mut info);
        info
    }

    #[test]
    fn stops_at_nul() {
        let line = cmdline(b"console=ttyS0 mem=0,0x1000,1\0mem=0,0x2000,1");
        assert_eq!(line.as_bytes(), b"console=ttyS0 mem=0,0x1000,1");
        assert_eq!(line.tokens().count(), 2);
    }

    #[test]
    fn limited_to_config_region() {
        let mut body = std::vec![b'a'; MAX_CMDLINE_LEN + 100];
        body[MAX_CMDLINE_LEN - 1] = b' ';
        let line = cmdline(&body);
        assert_eq!(line.as_bytes().len(), MAX_CMDLINE_LEN);
        assert_eq!(line.tokens().count(), 1);
    }

    #[test]
    fn mem_options_in_order() {
        assert_eq!(
            ranges(b"quiet mem=0,0x9fc00,1 mem=0x9fc00,0xa0000,2\n mem=0x100000,0x7fee0000,1"),
            [
                normalize(0, 0x9fc00, MemoryType::Ram),
                normalize(0x9fc00, 0xa0000, MemoryType::Default),
                normalize(0x100000, 0x7fee0000, MemoryType::Ram),
            ]
        );
    }

    #[test]
    fn bad_mem_options_are_skipped() {
        assert_eq!(
            ranges(b"mem=0,0x1000 mem=0;0x1000,1 mem=0,0x1000,1,2 mem=x mem=0x1000,0x2000,5"),
            [normalize(0x1000, 0x2000, MemoryType::Reserved)]
        );
    }

    #[test]
    fn oversized_mem_value_is_skipped() {
        let (found, logged) = capture(|| ranges(b"mem=0,99999999999999999999999,1"));
        assert!(found.is_empty(), "{:x?}", found);
        assert!(
            logged.contains(
                "ERROR lbparse::v2: Parse error: 'mem=0,99999999999999999999999,1': \
                 value 1 does not fit in 64 bits"
            ),
            "{}",
            logged
        );
    }

    #[test]
    fn malformed_options_are_logged() {
        let text: &[u8] = b"mem=0;4096,1 ACPI20=1,2,3 serial=1,2,3,4,5,6,7 mem=0x1000,0x2000,1";

        let (found, logged) = capture(|| ranges(text));
        assert_eq!(found, [normalize(0x1000, 0x2000, MemoryType::Ram)]);
        assert!(
            logged.contains("ERROR lbparse::v2: Parse error: 'mem=0;4096,1': unexpected ';' after value 0"),
            "{}",
            logged
        );

        let (found, logged) = capture(|| tables(text));
        assert_eq!(found, SystemTableInfo::default());
        assert!(
            logged.contains("ERROR lbparse::v2: Parse error: 'ACPI20=1,2,3': more than 2 values"),
            "{}",
            logged
        );

        let (found, logged) = capture(|| serial(text));
        assert_eq!(found, SerialPortInfo::default());
        assert!(
            logged.contains(
                "ERROR lbparse::v2: Parse error: 'serial=1,2,3,4,5,6,7': more than 6 values"
            ),
            "{}",
            logged
        );
    }

    #[test]
    fn ramdisk_is_reserved_like_mem() {
        assert_eq!(
            ranges(b"ramdisk=0x2000000,0x3000000,5 ramdisk=0x2000000,0x1000000"),
            [normalize(0x2000000, 0x3000000, MemoryType::Reserved)]
        );
    }

    #[test]
    fn keys_are_case_sensitive_prefixes() {
        assert!(ranges(b"MEM=0,0x1000,1 xmem=0,0x1000,1 memory=0,0x1000,1").is_empty());
        assert_eq!(tables(b"acpi20=1,2 smbios=3,4"), SystemTableInfo::default());
    }

    #[test]
    fn acpi_and_smbios() {
        assert_eq!(
            tables(b"ACPI20=0xE0000,0x20000 SMBIOS=0xF0000,0x1F"),
            SystemTableInfo {
                acpi_base: 0xe0000,
                acpi_size: 0x20000,
                smbios_base: 0xf0000,
                smbios_size: 0x1f,
                ..Default::default()
            }
        );
    }

    #[test]
    fn single_value_overrides_base_only() {
        let mut info = SystemTableInfo {
            acpi_base: 1,
            acpi_size: 2,
            ..Default::default()
        };
        cmdline(b"ACPI20=0xE0000").system_tables(&mut info);
        assert_eq!(info.acpi_base, 0xe0000);
        assert_eq!(info.acpi_size, 2);
    }

    #[test]
    fn later_tokens_win_per_field() {
        assert_eq!(
            tables(b"SMBIOS=0xF0000,0x1F SMBIOS=0xF1000"),
            SystemTableInfo {
                smbios_base: 0xf1000,
                smbios_size: 0x1f,
                ..Default::default()
            }
        );
        assert_eq!(
            tables(b"SMBIOS=0xF0000,0x1F SMBIOS=0xF1000,0x18"),
            SystemTableInfo {
                smbios_base: 0xf1000,
                smbios_size: 0x18,
                ..Default::default()
            }
        );
    }

    #[test]
    fn malformed_table_option_is_skipped() {
        assert_eq!(
            tables(b"ACPI20=0xE0000,0x20000 ACPI20=1,2,3 ACPI20=5;6 SMBIOS=quiet"),
            SystemTableInfo {
                acpi_base: 0xe0000,
                acpi_size: 0x20000,
                ..Default::default()
            }
        );
    }

    #[test]
    fn ramdisk_table_fields() {
        assert_eq!(
            tables(b"ramdisk=0x2000000,0x800000,5"),
            SystemTableInfo {
                ramdisk_base: 0x2000000,
                ramdisk_size: 0x800000,
                ..Default::default()
            }
        );
    }

    #[test]
    fn serial_defaults_without_option() {
        assert_eq!(
            serial(b"mem=0,0x1000,1 ACPI20=0xE0000,0x20000"),
            SerialPortInfo::default()
        );
    }

    #[test]
    fn serial_partial_override() {
        assert_eq!(
            serial(b"serial=9600,0x2f8"),
            SerialPortInfo {
                baud: 9600,
                base_addr: 0x2f8,
                ..Default::default()
            }
        );
    }

    #[test]
    fn serial_full_override() {
        assert_eq!(
            serial(b"serial=921600,0xfe032000,4,2,48000000,0x1f00"),
            SerialPortInfo {
                port_type: 2,
                base_addr: 0xfe03_2000,
                baud: 921600,
                reg_width: 4,
                input_hertz: 48_000_000,
                uart_pci_addr: 0x1f00,
            }
        );
    }

    #[test]
    fn serial_later_tokens_win_per_field() {
        assert_eq!(
            serial(b"serial=9600,0x2f8,4 serial=57600 serial=1,2,3,4,5,6,7"),
            SerialPortInfo {
                baud: 57600,
                base_addr: 0x2f8,
                reg_width: 4,
                ..Default::default()
            }
        );
    }

    #[test]
    fn serial_values_truncate_to_32_bits() {
        assert_eq!(serial(b"serial=0x100002580").baud, 0x2580);
    }
}
