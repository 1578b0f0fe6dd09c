//! Connection and controller configuration
//!
//! Connection targets are plain values built with `with_*` methods. Nothing here
//! touches the network; [`ConnectionTarget::validate`] only checks parameters.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::device_limits::DeviceLimits;
use crate::error::{ModbusError, ModbusResult};
use crate::protocol::{SlaveId, DEFAULT_SLAVE_ID};

/// Default inactivity timeout for connect and for each transaction (10 seconds)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// URL scheme of TCP targets
pub const TCP_SCHEME: &str = "tcp://";

/// URL scheme of RTU targets
pub const RTU_SCHEME: &str = "rtu://";

/// Default serial baud rate
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Normalize a TCP address to the `tcp://host:port` form.
///
/// ```rust
/// use modbus_connector::config::normalize_tcp_address;
///
/// assert_eq!(normalize_tcp_address("127.0.0.1:502"), "tcp://127.0.0.1:502");
/// assert_eq!(normalize_tcp_address("tcp://plc:502"), "tcp://plc:502");
/// ```
pub fn normalize_tcp_address(address: &str) -> String {
    if address.starts_with(TCP_SCHEME) {
        address.to_string()
    } else {
        format!("{TCP_SCHEME}{address}")
    }
}

/// Transport variant of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    Tcp,
    Rtu,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => f.write_str("TCP"),
            Self::Rtu => f.write_str("RTU"),
        }
    }
}

/// Serial parity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Parity {
    #[default]
    None,
    Even,
    Odd,
}

impl Parity {
    /// Single-letter form (`N`, `E`, `O`)
    pub fn as_letter(&self) -> char {
        match self {
            Self::None => 'N',
            Self::Even => 'E',
            Self::Odd => 'O',
        }
    }
}

impl FromStr for Parity {
    type Err = ModbusError;

    /// Accepts `N`/`None`, `E`/`Even`, `O`/`Odd` in any case. Anything else is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "N" | "NONE" => Ok(Self::None),
            "E" | "EVEN" => Ok(Self::Even),
            "O" | "ODD" => Ok(Self::Odd),
            _ => Err(ModbusError::configuration(format!(
                "invalid parity {s:?} (expected N, E or O)"
            ))),
        }
    }
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Even => f.write_str("Even"),
            Self::Odd => f.write_str("Odd"),
        }
    }
}

/// How `write_single_coil` treats values other than `0xFF00` / `0x0000`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoilValueMode {
    /// Reject with a validation error
    #[default]
    Strict,
    /// Anything other than `0xFF00` writes OFF
    Tolerant,
}

/// Modbus TCP target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpConfig {
    /// Address as given by the caller (`host:port` or `tcp://host:port`)
    pub address: String,
    /// Connect and per-transaction timeout
    pub timeout: Duration,
    /// Unit identifier sent with every request
    pub unit_id: SlaveId,
}

impl TcpConfig {
    /// TCP target with the default timeout and unit id
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            timeout: DEFAULT_TIMEOUT,
            unit_id: DEFAULT_SLAVE_ID,
        }
    }

    /// Set the timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the unit identifier
    pub fn with_unit_id(mut self, unit_id: SlaveId) -> Self {
        self.unit_id = unit_id;
        self
    }

    /// Scheme-qualified address
    pub fn url(&self) -> String {
        normalize_tcp_address(&self.address)
    }

    /// `host:port` without the scheme
    pub fn host_port(&self) -> &str {
        self.address
            .strip_prefix(TCP_SCHEME)
            .unwrap_or(&self.address)
    }

    /// Check the address shape (`host:port` with a numeric port)
    pub fn validate(&self) -> ModbusResult<()> {
        let host_port = self.host_port();
        let (host, port) = host_port.rsplit_once(':').ok_or_else(|| {
            ModbusError::configuration(format!("address {host_port:?} is missing a port"))
        })?;
        if host.is_empty() {
            return Err(ModbusError::configuration(format!(
                "address {host_port:?} is missing a host"
            )));
        }
        port.parse::<u16>().map_err(|e| {
            ModbusError::configuration(format!("invalid port in {host_port:?}: {e}"))
        })?;
        Ok(())
    }
}

/// Modbus RTU (serial) target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtuConfig {
    /// Serial device path (`/dev/ttyUSB0`, `COM3`)
    pub device: String,
    pub baud_rate: u32,
    /// 5-8
    pub data_bits: u8,
    /// 1-2
    pub stop_bits: u8,
    pub parity: Parity,
    /// Per-transaction timeout
    pub timeout: Duration,
    /// Unit identifier sent with every request
    pub unit_id: SlaveId,
}

impl RtuConfig {
    /// 8N1 serial target at `baud_rate`
    pub fn new(device: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            device: device.into(),
            baud_rate,
            data_bits: 8,
            stop_bits: 1,
            parity: Parity::None,
            timeout: DEFAULT_TIMEOUT,
            unit_id: DEFAULT_SLAVE_ID,
        }
    }

    /// Set the frame format
    pub fn with_framing(mut self, data_bits: u8, stop_bits: u8, parity: Parity) -> Self {
        self.data_bits = data_bits;
        self.stop_bits = stop_bits;
        self.parity = parity;
        self
    }

    /// Set the timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the unit identifier
    pub fn with_unit_id(mut self, unit_id: SlaveId) -> Self {
        self.unit_id = unit_id;
        self
    }

    /// Scheme-qualified device path
    pub fn url(&self) -> String {
        if self.device.starts_with(RTU_SCHEME) {
            self.device.clone()
        } else {
            format!("{RTU_SCHEME}{}", self.device)
        }
    }

    /// Device path without the scheme
    pub fn device_path(&self) -> &str {
        self.device.strip_prefix(RTU_SCHEME).unwrap_or(&self.device)
    }

    /// Check serial parameters
    pub fn validate(&self) -> ModbusResult<()> {
        if self.device_path().is_empty() {
            return Err(ModbusError::configuration("serial device path is empty"));
        }
        if self.baud_rate == 0 {
            return Err(ModbusError::configuration("baud rate must be greater than 0"));
        }
        if !(5..=8).contains(&self.data_bits) {
            return Err(ModbusError::configuration(format!(
                "invalid data bits {} (expected 5-8)",
                self.data_bits
            )));
        }
        if !(1..=2).contains(&self.stop_bits) {
            return Err(ModbusError::configuration(format!(
                "invalid stop bits {} (expected 1 or 2)",
                self.stop_bits
            )));
        }
        Ok(())
    }
}

/// Where a controller connects to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionTarget {
    Tcp(TcpConfig),
    Rtu(RtuConfig),
}

impl ConnectionTarget {
    /// Transport variant
    pub fn kind(&self) -> TransportKind {
        match self {
            Self::Tcp(_) => TransportKind::Tcp,
            Self::Rtu(_) => TransportKind::Rtu,
        }
    }

    /// Scheme-qualified target (`tcp://host:port`, `rtu:///dev/ttyUSB0`)
    pub fn url(&self) -> String {
        match self {
            Self::Tcp(cfg) => cfg.url(),
            Self::Rtu(cfg) => cfg.url(),
        }
    }

    /// Target as the caller named it (TCP address or serial device)
    pub fn label(&self) -> &str {
        match self {
            Self::Tcp(cfg) => &cfg.address,
            Self::Rtu(cfg) => &cfg.device,
        }
    }

    /// Per-transaction timeout
    pub fn timeout(&self) -> Duration {
        match self {
            Self::Tcp(cfg) => cfg.timeout,
            Self::Rtu(cfg) => cfg.timeout,
        }
    }

    /// Unit identifier
    pub fn unit_id(&self) -> SlaveId {
        match self {
            Self::Tcp(cfg) => cfg.unit_id,
            Self::Rtu(cfg) => cfg.unit_id,
        }
    }

    /// Check parameters without opening anything
    pub fn validate(&self) -> ModbusResult<()> {
        match self {
            Self::Tcp(cfg) => cfg.validate(),
            Self::Rtu(cfg) => cfg.validate(),
        }
    }
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp(cfg) => write!(f, "{}", cfg.url()),
            Self::Rtu(cfg) => write!(
                f,
                "{} @ {} {}{}{}",
                cfg.url(),
                cfg.baud_rate,
                cfg.data_bits,
                cfg.parity.as_letter(),
                cfg.stop_bits
            ),
        }
    }
}

impl From<TcpConfig> for ConnectionTarget {
    fn from(cfg: TcpConfig) -> Self {
        Self::Tcp(cfg)
    }
}

impl From<RtuConfig> for ConnectionTarget {
    fn from(cfg: RtuConfig) -> Self {
        Self::Rtu(cfg)
    }
}

/// Controller-wide settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Timeout applied by `connect_tcp` / `connect_rtu`
    pub timeout: Duration,
    /// Unit identifier applied by `connect_tcp` / `connect_rtu`
    pub unit_id: SlaveId,
    /// Quantity limits checked before dispatch
    pub limits: DeviceLimits,
    /// Single-coil value handling
    pub coil_mode: CoilValueMode,
}

impl ControllerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the unit identifier
    pub fn with_unit_id(mut self, unit_id: SlaveId) -> Self {
        self.unit_id = unit_id;
        self
    }

    /// Set device limits
    pub fn with_limits(mut self, limits: DeviceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Set single-coil value handling
    pub fn with_coil_mode(mut self, coil_mode: CoilValueMode) -> Self {
        self.coil_mode = coil_mode;
        self
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            unit_id: DEFAULT_SLAVE_ID,
            limits: DeviceLimits::default(),
            coil_mode: CoilValueMode::Strict,
        }
    }
}
