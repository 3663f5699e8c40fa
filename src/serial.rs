//! Serial console parameters.

use num_traits::FromPrimitive;

/// How the UART's registers are reached.
#[derive(Clone, Copy, Debug, Eq, PartialEq, num_derive::FromPrimitive)]
#[repr(u32)]
pub enum SerialPortType {
    Io = 1,
    Mmio = 2,
}

/// Serial port the firmware console should use.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SerialPortInfo {
    pub port_type: u32,
    pub base_addr: u32,
    pub baud: u32,
    /// Byte stride between UART registers.
    pub reg_width: u32,
    /// UART reference clock.
    pub input_hertz: u32,
    /// PCI address of the UART, or 0 if it is not a PCI device.
    pub uart_pci_addr: u32,
}

pub const COM1_IO_BASE: u32 = 0x3f8;
pub const DEFAULT_BAUD: u32 = 115200;
pub const DEFAULT_INPUT_HERTZ: u32 = 1843200;

impl Default for SerialPortInfo {
    /// COM1 on the legacy I/O port, 8250-compatible.
    fn default() -> SerialPortInfo {
        SerialPortInfo {
            port_type: SerialPortType::Io as u32,
            base_addr: COM1_IO_BASE,
            baud: DEFAULT_BAUD,
            reg_width: 1,
            input_hertz: DEFAULT_INPUT_HERTZ,
            uart_pci_addr: 0,
        }
    }
}

impl SerialPortInfo {
    pub fn port_type(&self) -> Option<SerialPortType> {
        SerialPortType::from_u32(self.port_type)
    }
}
