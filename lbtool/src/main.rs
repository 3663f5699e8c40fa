//! Host tool for payload configuration blobs: writes them the way the loader
//! does, and dumps what the firmware would extract from one.

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use eyre::{bail, eyre, WrapErr};

use lbparse::blob::{encode_cmdline, ConfigV1Builder};
use lbparse::cmdline::option_values;
use lbparse::halt::Halt;
use lbparse::lexer::parse_int;
use lbparse::locate::locate;
use lbparse::tables::SmbiosEntryPoint;
use lbparse::{Fatal, MemoryRange, PayloadConfig, SerialPortInfo, SystemTableInfo};

#[derive(Parser, Debug)]
struct Args {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Write a V1 (binary) blob.
    BuildV1 {
        #[arg(short, long)]
        output: PathBuf,
        /// ACPI RSDP as `base,size`.
        #[arg(long, value_parser = pair)]
        acpi: Option<(u64, u64)>,
        /// SMBIOS entry point as `base,size`.
        #[arg(long, value_parser = pair)]
        smbios: Option<(u64, u64)>,
        /// `baud[,base[,regwidth[,type[,inputhertz[,uartpciaddr]]]]]`,
        /// applied over the COM1 defaults.
        #[arg(long, value_parser = serial)]
        serial: Option<SerialPortInfo>,
        /// Memory map entry as `start,end,type`. May repeat.
        #[arg(long = "mem", value_parser = mem_entry)]
        mem: Vec<(u64, u64, u32)>,
    },
    /// Write a V2 (command line) blob.
    BuildV2 {
        #[arg(short, long)]
        output: PathBuf,
        /// Options, joined with spaces.
        #[arg(required = true)]
        cmdline: Vec<String>,
    },
    /// Decode a blob and print everything the firmware would extract.
    Dump {
        blob: PathBuf,
        /// Byte offset of the blob within the file.
        #[arg(long, value_parser = int, default_value = "0")]
        offset: u64,
    },
}

/// Parses one integer with the same lexer the firmware uses.
fn int(text: &str) -> Result<u64, String> {
    match parse_int(text.as_bytes()) {
        Ok((value, len)) if len == text.len() => Ok(value),
        Ok((_, len)) => Err(format!("unexpected {:?} after integer", &text[len..])),
        Err(e) => Err(e.to_string()),
    }
}

fn values<const N: usize>(text: &str) -> Result<Vec<u64>, String> {
    let values = option_values::<N>(text.as_bytes()).map_err(|e| e.to_string())?;
    if values.is_empty() {
        return Err(format!("{:?} is not an integer list", text));
    }
    Ok(values.to_vec())
}

fn pair(text: &str) -> Result<(u64, u64), String> {
    match values::<2>(text)?[..] {
        [base, size] => Ok((base, size)),
        _ => Err("expected base,size".into()),
    }
}

fn mem_entry(text: &str) -> Result<(u64, u64, u32), String> {
    match values::<3>(text)?[..] {
        [start, end, mem_type] => {
            let mem_type =
                u32::try_from(mem_type).map_err(|_| format!("type {} too large", mem_type))?;
            Ok((start, end, mem_type))
        }
        _ => Err("expected start,end,type".into()),
    }
}

fn serial(text: &str) -> Result<SerialPortInfo, String> {
    let mut info = SerialPortInfo::default();
    let fields = [
        &mut info.baud,
        &mut info.base_addr,
        &mut info.reg_width,
        &mut info.port_type,
        &mut info.input_hertz,
        &mut info.uart_pci_addr,
    ];
    for (field, value) in fields.into_iter().zip(values::<6>(text)?) {
        *field = u32::try_from(value).map_err(|_| format!("{:#x} does not fit in 32 bits", value))?;
    }
    Ok(info)
}

/// A blob that fails to decode ends the dump instead of parking the CPU.
struct ExitOnFatal;

impl Halt for ExitOnFatal {
    fn halt(&self, fatal: &Fatal) -> ! {
        log::error!("{}", fatal);
        std::process::exit(1)
    }
}

fn build_v1(
    output: PathBuf,
    acpi: Option<(u64, u64)>,
    smbios: Option<(u64, u64)>,
    serial: Option<SerialPortInfo>,
    mem: Vec<(u64, u64, u32)>,
) -> eyre::Result<()> {
    let mut tables = SystemTableInfo::default();
    if let Some((base, size)) = acpi {
        tables.acpi_base = base;
        tables.acpi_size = size;
    }
    if let Some((base, size)) = smbios {
        tables.smbios_base = base;
        tables.smbios_size = size;
    }

    let mut builder = ConfigV1Builder::new();
    builder
        .system_tables(tables)
        .serial(serial.unwrap_or_default());
    for (start, end, mem_type) in mem {
        builder.memory_range(start, end, mem_type);
    }

    let blob = builder.build();
    fs::write(&output, &blob).wrap_err_with(|| format!("writing {}", output.display()))?;
    println!("Wrote {} byte v1 config to {}", blob.len(), output.display());
    Ok(())
}

fn build_v2(output: PathBuf, cmdline: Vec<String>) -> eyre::Result<()> {
    let cmdline = cmdline.join(" ");
    let blob = encode_cmdline(&cmdline).map_err(|e| eyre!("{}", e))?;
    fs::write(&output, &blob).wrap_err_with(|| format!("writing {}", output.display()))?;
    println!("Wrote {} byte v2 config to {}", blob.len(), output.display());
    Ok(())
}

fn dump(path: PathBuf, offset: u64) -> eyre::Result<()> {
    let data = fs::read(&path).wrap_err_with(|| format!("reading {}", path.display()))?;
    let Some(blob) = usize::try_from(offset).ok().and_then(|o| data.get(o..)) else {
        bail!("offset {:#x} is past the end of {}", offset, path.display());
    };

    // Report a bad blob as an error here rather than through the halt hook.
    let version = locate(blob).map_err(|e| eyre!("{}", e))?.version();
    println!("Version: {}", version);

    let config = PayloadConfig::new(Some(blob), ExitOnFatal);

    let mut ranges: Vec<MemoryRange> = Vec::new();
    config.extract_memory_ranges(&mut ranges);
    println!("Memory ranges: {}", ranges.len());
    for range in &ranges {
        println!(
            "  {:#018x}-{:#018x} {:?}",
            range.base,
            range.end(),
            range.mem_type
        );
    }

    let mut tables = SystemTableInfo::default();
    config.extract_system_table_info(&mut tables);
    match tables.acpi() {
        Some((base, size)) => println!("ACPI: {:#x} ({:#x} bytes)", base, size),
        None => println!("ACPI: not installed"),
    }
    match tables.smbios() {
        Some(SmbiosEntryPoint::Smbios2 { base }) => println!("SMBIOS: 2.x at {:#x}", base),
        Some(SmbiosEntryPoint::Smbios3 { base }) => println!("SMBIOS: 3.0 at {:#x}", base),
        None => println!("SMBIOS: not installed"),
    }
    if let Some((base, size)) = tables.ramdisk() {
        println!("RAM disk: {:#x} ({:#x} bytes)", base, size);
    }

    let mut serial = SerialPortInfo::default();
    config.extract_serial_port_info(&mut serial);
    println!(
        "Serial: {:?} {:#x} baud={} regwidth={} inputhertz={} uartpci={:#x}",
        serial.port_type(),
        serial.base_addr,
        serial.baud,
        serial.reg_width,
        serial.input_hertz,
        serial.uart_pci_addr
    );

    Ok(())
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Args::parse().command {
        Cmd::BuildV1 {
            output,
            acpi,
            smbios,
            serial,
            mem,
        } => build_v1(output, acpi, smbios, serial, mem),
        Cmd::BuildV2 { output, cmdline } => build_v2(output, cmdline),
        Cmd::Dump { blob, offset } => dump(blob, offset),
    }
}
