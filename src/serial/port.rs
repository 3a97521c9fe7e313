//! Serial port configuration and connection management
//!
//! The controller talks 9600 baud 8N1 with no flow control. Reads block until
//! a full `\n`-terminated line has arrived; commands go out in wire form.

use anyhow::Context;
use colored::Colorize;
use serialport::{
    DataBits, FlowControl, Parity, SerialPort, SerialPortInfo, SerialPortType, StopBits,
};
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use crate::error::HarnessError;
use crate::protocol::Command;

/// Device the controller board enumerates as on the bench Mac
pub const DEFAULT_PORT_PATH: &str = "/dev/tty.usbmodemfd121";

/// Controller baud rate
pub const DEFAULT_BAUD: u32 = 9600;

/// Configuration for serial port connection
#[derive(Debug, Clone)]
pub struct PortConfig {
    /// Serial port path (e.g., /dev/ttyACM0)
    pub port_path: String,
    /// Baud rate (default: 9600)
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub flow_control: FlowControl,
    /// How long a single read waits before polling again. Never surfaced as an error.
    pub poll_timeout: Duration,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            port_path: String::from(DEFAULT_PORT_PATH),
            baud_rate: DEFAULT_BAUD,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
            poll_timeout: Duration::from_millis(500),
        }
    }
}

impl PortConfig {
    pub fn new(port_path: &str) -> Self {
        Self {
            port_path: port_path.to_string(),
            ..Default::default()
        }
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }
}

/// An open link to the controller
pub struct SerialConnection {
    port: Box<dyn SerialPort>,
    config: PortConfig,
}

impl SerialConnection {
    /// Open the port. Failure is a `Connection` error and is not retried.
    pub fn open(config: PortConfig) -> Result<Self, HarnessError> {
        let port = serialport::new(&config.port_path, config.baud_rate)
            .data_bits(config.data_bits)
            .parity(config.parity)
            .stop_bits(config.stop_bits)
            .flow_control(config.flow_control)
            .timeout(config.poll_timeout)
            .open()
            .map_err(|source| HarnessError::Connection {
                path: config.port_path.clone(),
                source,
            })?;

        Ok(Self { port, config })
    }

    pub fn config(&self) -> &PortConfig {
        &self.config
    }

    /// Second handle on the same device, used by the reader thread
    pub fn try_clone(&self) -> Result<Self, HarnessError> {
        let port = self
            .port
            .try_clone()
            .map_err(|source| HarnessError::Connection {
                path: self.config.port_path.clone(),
                source,
            })?;

        Ok(Self {
            port,
            config: self.config.clone(),
        })
    }

    /// Read one line, blocking until `\n` arrives
    ///
    /// The terminator and a preceding `\r` are stripped.
    pub fn read_line(&mut self) -> Result<String, HarnessError> {
        let mut buffer = Vec::new();
        let mut byte = [0u8; 1];

        loop {
            match self.port.read(&mut byte) {
                Ok(1) => {
                    if byte[0] == b'\n' {
                        break;
                    }
                    buffer.push(byte[0]);
                }
                Ok(_) => return Err(HarnessError::LinkClosed),
                Err(ref e) if e.kind() == ErrorKind::TimedOut => continue,
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        // Handle carriage returns
        if buffer.last() == Some(&b'\r') {
            buffer.pop();
        }

        Ok(String::from_utf8_lossy(&buffer).to_string())
    }

    /// Write one command in wire form
    pub fn send_command(&mut self, command: &Command) -> Result<(), HarnessError> {
        write_command(&mut self.port, command)
    }
}

/// Frame `command` with its terminator onto `out` and flush
pub fn write_command<W: Write + ?Sized>(out: &mut W, command: &Command) -> Result<(), HarnessError> {
    out.write_all(command.to_wire().as_bytes())?;
    out.flush()?;
    Ok(())
}

/// USB CDC boards show up as `usbmodem*` on macOS and `ttyACM*` on Linux
pub fn is_controller_candidate(info: &SerialPortInfo) -> bool {
    info.port_name.contains("usbmodem")
        || info.port_name.contains("ttyACM")
        || matches!(info.port_type, SerialPortType::UsbPort(_))
}

pub fn list_ports() -> anyhow::Result<Vec<SerialPortInfo>> {
    serialport::available_ports().context("Failed to enumerate serial ports")
}

/// Print the ports, marking the ones a controller board could be on
pub fn print_ports() -> anyhow::Result<()> {
    let ports = list_ports()?;

    if ports.is_empty() {
        println!("{}", "No serial ports found".yellow());
        println!("Plug in the controller board over USB and try again.");
        return Ok(());
    }

    for port in &ports {
        let marker = if is_controller_candidate(port) {
            "[controller?]".green().bold()
        } else {
            "".normal()
        };
        println!("{} {}", port.port_name.white().bold(), marker);

        if let SerialPortType::UsbPort(ref usb) = port.port_type {
            println!(
                "  {:04x}:{:04x} {}",
                usb.vid,
                usb.pid,
                usb.product.as_deref().unwrap_or("")
            );
        }
    }

    if let Some(first) = ports.iter().find(|p| is_controller_candidate(p)) {
        println!(
            "\n{}",
            format!("Use: elevator-harness run -p {}", first.port_name).yellow()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Direction;
    use crate::sim::testing::SharedBuffer;

    #[test]
    fn test_default_config() {
        let config = PortConfig::default();
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.port_path, DEFAULT_PORT_PATH);
        assert_eq!(config.data_bits, DataBits::Eight);
        assert_eq!(config.stop_bits, StopBits::One);
        assert_eq!(config.parity, Parity::None);
    }

    #[test]
    fn test_config_builder() {
        let config = PortConfig::new("/dev/ttyACM0").with_baud_rate(19200);

        assert_eq!(config.port_path, "/dev/ttyACM0");
        assert_eq!(config.baud_rate, 19200);
        assert_eq!(config.flow_control, FlowControl::None);
    }

    #[test]
    fn test_open_missing_device_is_connection_error() {
        let config = PortConfig::new("/dev/does-not-exist-elevator");
        match SerialConnection::open(config) {
            Err(HarnessError::Connection { path, .. }) => {
                assert_eq!(path, "/dev/does-not-exist-elevator")
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("opened a device that does not exist"),
        }
    }

    #[test]
    fn test_write_command_bytes() {
        let mut buffer = SharedBuffer::default();

        write_command(
            &mut buffer,
            &Command::Service {
                direction: Direction::Up,
                floor: 10,
            },
        )
        .unwrap();
        write_command(&mut buffer, &Command::Arrive(5)).unwrap();
        write_command(&mut buffer, &Command::Request(3)).unwrap();
        write_command(&mut buffer, &Command::Close).unwrap();

        assert_eq!(buffer.contents(), b"u10\ra5\rr3\rc\r".to_vec());
    }

    #[test]
    fn test_controller_candidates() {
        let port = |name: &str, port_type| SerialPortInfo {
            port_name: name.to_string(),
            port_type,
        };

        assert!(is_controller_candidate(&port(
            "/dev/tty.usbmodemfd121",
            SerialPortType::Unknown
        )));
        assert!(is_controller_candidate(&port("/dev/ttyACM0", SerialPortType::Unknown)));
        assert!(!is_controller_candidate(&port("/dev/ttyS0", SerialPortType::PciPort)));
    }
}
