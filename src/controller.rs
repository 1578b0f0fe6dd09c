//! Modbus master controller
//!
//! [`ModbusController`] owns at most one open session and exposes every supported Modbus
//! function as a byte-oriented operation:
//!
//! - reads return packed coil bytes or big-endian register bytes
//! - writes take the same layouts as payloads
//! - unsupported functions fail with [`ModbusError::Unsupported`]
//!
//! The controller is `Send + Sync` and every method takes `&self`. The session sits
//! behind a `tokio::sync::Mutex` that is held from the connection check until the
//! response is decoded, so concurrent callers never interleave wire traffic.
//!
//! ```rust,no_run
//! use modbus_connector::{ModbusController, ModbusResult};
//!
//! # async fn example() -> ModbusResult<()> {
//! let controller = ModbusController::new();
//! controller.connect_tcp("127.0.0.1:502").await?;
//!
//! let registers = controller.read_holding_registers(0, 5).await?;
//! assert_eq!(registers.len(), 10);
//!
//! controller.write_single_coil(10, 0xFF00).await?;
//! println!("{}", controller.disconnect().await);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::bytes::{
    bytes_to_registers, coil_from_u16, coil_to_u16, pack_bits, registers_to_bytes, unpack_bits,
};
use crate::config::{
    CoilValueMode, ConnectionTarget, ControllerConfig, Parity, RtuConfig, TcpConfig,
};
use crate::constants::WRITE_OK;
use crate::error::{ModbusError, ModbusResult};
use crate::logging::{CallbackLogger, LogLevel};
use crate::protocol::ModbusFunction;
use crate::transport::{Connector, ModbusTransport, TokioModbusConnector, TransportStats};

/// Result of a successful connect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connected {
    target: ConnectionTarget,
}

impl Connected {
    /// Target that was opened
    pub fn target(&self) -> &ConnectionTarget {
        &self.target
    }

    /// Scheme-qualified target (`tcp://...`, `rtu://...`)
    pub fn url(&self) -> String {
        self.target.url()
    }
}

impl fmt::Display for Connected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Connected to {}", self.target.label())
    }
}

/// Result of [`ModbusController::disconnect`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectOutcome {
    /// Session closed cleanly
    Disconnected,
    /// Session dropped, but closing the transport reported an error
    CloseFailed(ModbusError),
    /// There was nothing to close
    NotConnected,
}

impl DisconnectOutcome {
    /// Whether a session was open before the call
    pub fn was_connected(&self) -> bool {
        !matches!(self, Self::NotConnected)
    }
}

impl fmt::Display for DisconnectOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => f.write_str("Disconnected"),
            Self::CloseFailed(err) => write!(f, "Error disconnecting: {}", err),
            Self::NotConnected => f.write_str("No active connection"),
        }
    }
}

/// Open connection owned by the controller
struct Session<T> {
    transport: T,
    target: ConnectionTarget,
    stats: TransportStats,
    opened_at: Instant,
}

/// Modbus master bound to at most one slave connection
pub struct ModbusController<C: Connector = TokioModbusConnector> {
    connector: C,
    config: ControllerConfig,
    logger: CallbackLogger,
    session: Mutex<Option<Session<C::Transport>>>,
}

impl ModbusController<TokioModbusConnector> {
    /// Controller with default settings over `tokio-modbus`
    pub fn new() -> Self {
        Self::with_config(ControllerConfig::default())
    }

    /// Controller with custom settings over `tokio-modbus`
    pub fn with_config(config: ControllerConfig) -> Self {
        Self::with_connector(TokioModbusConnector::new(), config)
    }
}

impl Default for ModbusController<TokioModbusConnector> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connector> ModbusController<C> {
    /// Controller over a custom connector
    pub fn with_connector(connector: C, config: ControllerConfig) -> Self {
        Self {
            connector,
            config,
            logger: CallbackLogger::default(),
            session: Mutex::new(None),
        }
    }

    /// Replace the transaction logger
    pub fn with_logger(mut self, logger: CallbackLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Controller settings
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    // ===== Lifecycle =====

    /// Connect over Modbus TCP.
    ///
    /// `address` is `host:port` or `tcp://host:port`. Uses the configured timeout and
    /// unit id.
    pub async fn connect_tcp(&self, address: &str) -> ModbusResult<Connected> {
        let target = TcpConfig::new(address)
            .with_timeout(self.config.timeout)
            .with_unit_id(self.config.unit_id);
        self.connect(target.into()).await
    }

    /// Connect over Modbus RTU.
    ///
    /// `parity` is `N`/`E`/`O` (or `None`/`Even`/`Odd`), case-insensitive.
    pub async fn connect_rtu(
        &self,
        device: &str,
        baud_rate: u32,
        data_bits: u8,
        stop_bits: u8,
        parity: &str,
    ) -> ModbusResult<Connected> {
        let parity: Parity = parity.parse()?;
        let target = RtuConfig::new(device, baud_rate)
            .with_framing(data_bits, stop_bits, parity)
            .with_timeout(self.config.timeout)
            .with_unit_id(self.config.unit_id);
        self.connect(target.into()).await
    }

    /// Connect to a prebuilt target.
    ///
    /// An open session is closed before the new one is opened. On failure no session
    /// remains.
    pub async fn connect(&self, target: ConnectionTarget) -> ModbusResult<Connected> {
        target.validate()?;

        let mut guard = self.session.lock().await;
        if let Some(mut previous) = guard.take() {
            debug!("Closing {} before connecting to {}", previous.target, target);
            if let Err(e) = self.close_transport(&mut previous).await {
                warn!("Closing previous connection to {} failed: {}", previous.target, e);
            }
        }

        let transport = match self.connector.open(&target).await {
            Ok(transport) => transport,
            Err(e) => {
                self.logger
                    .log(LogLevel::Error, &format!("Connect to {target} failed: {e}"));
                return Err(match e {
                    ModbusError::Connection { .. } | ModbusError::Configuration { .. } => e,
                    other => ModbusError::connection(other.to_string()),
                });
            }
        };

        info!("Connected to {} ({})", target, target.kind());
        *guard = Some(Session {
            transport,
            target: target.clone(),
            stats: TransportStats::default(),
            opened_at: Instant::now(),
        });
        Ok(Connected { target })
    }

    /// Close the session, if any. Never fails; close errors are reported in the outcome
    /// and the session is released regardless.
    pub async fn disconnect(&self) -> DisconnectOutcome {
        let mut guard = self.session.lock().await;
        let Some(mut session) = guard.take() else {
            return DisconnectOutcome::NotConnected;
        };

        match self.close_transport(&mut session).await {
            Ok(()) => {
                info!(
                    "Disconnected from {} after {:?}",
                    session.target,
                    session.opened_at.elapsed()
                );
                DisconnectOutcome::Disconnected
            }
            Err(e) => {
                warn!("Error disconnecting from {}: {}", session.target, e);
                DisconnectOutcome::CloseFailed(e)
            }
        }
    }

    /// Whether a session is open
    pub async fn is_connected(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Target of the open session
    pub async fn connection(&self) -> Option<ConnectionTarget> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|session| session.target.clone())
    }

    /// Counters of the open session
    pub async fn stats(&self) -> Option<TransportStats> {
        self.session.lock().await.as_ref().map(|session| session.stats)
    }

    /// How long the open session has been up
    pub async fn uptime(&self) -> Option<Duration> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|session| session.opened_at.elapsed())
    }

    // ===== Reads =====

    /// FC01: `ceil(quantity / 8)` packed bytes, LSB first
    pub async fn read_coils(&self, address: u16, quantity: u16) -> ModbusResult<Vec<u8>> {
        self.read_bits(ModbusFunction::ReadCoils, address, quantity)
            .await
    }

    /// FC02: `ceil(quantity / 8)` packed bytes, LSB first
    pub async fn read_discrete_inputs(&self, address: u16, quantity: u16) -> ModbusResult<Vec<u8>> {
        self.read_bits(ModbusFunction::ReadDiscreteInputs, address, quantity)
            .await
    }

    /// FC03: `quantity * 2` big-endian bytes
    pub async fn read_holding_registers(
        &self,
        address: u16,
        quantity: u16,
    ) -> ModbusResult<Vec<u8>> {
        self.read_words(ModbusFunction::ReadHoldingRegisters, address, quantity)
            .await
    }

    /// FC04: `quantity * 2` big-endian bytes
    pub async fn read_input_registers(&self, address: u16, quantity: u16) -> ModbusResult<Vec<u8>> {
        self.read_words(ModbusFunction::ReadInputRegisters, address, quantity)
            .await
    }

    async fn read_bits(
        &self,
        function: ModbusFunction,
        address: u16,
        quantity: u16,
    ) -> ModbusResult<Vec<u8>> {
        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or(ModbusError::NotConnected)?;
        self.config.limits.validate(function, address, quantity)?;

        self.logger.log_request(function, address, quantity, &[]);
        let timeout = session.target.timeout();
        let result = if function == ModbusFunction::ReadDiscreteInputs {
            let call = session.transport.read_discrete_inputs(address, quantity);
            self.transact(function, &mut session.stats, timeout, call).await
        } else {
            let call = session.transport.read_coils(address, quantity);
            self.transact(function, &mut session.stats, timeout, call).await
        };
        let mut bits = self.settle(session, result).await?;

        if bits.len() < usize::from(quantity) {
            return Err(self.short_response(function, quantity, bits.len()));
        }
        // Transports may pad to a whole byte
        bits.truncate(usize::from(quantity));

        let data = pack_bits(&bits);
        self.logger.log_response(function, &data);
        Ok(data)
    }

    async fn read_words(
        &self,
        function: ModbusFunction,
        address: u16,
        quantity: u16,
    ) -> ModbusResult<Vec<u8>> {
        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or(ModbusError::NotConnected)?;
        self.config.limits.validate(function, address, quantity)?;

        self.logger.log_request(function, address, quantity, &[]);
        let timeout = session.target.timeout();
        let result = if function == ModbusFunction::ReadInputRegisters {
            let call = session.transport.read_input_registers(address, quantity);
            self.transact(function, &mut session.stats, timeout, call).await
        } else {
            let call = session.transport.read_holding_registers(address, quantity);
            self.transact(function, &mut session.stats, timeout, call).await
        };
        let mut words = self.settle(session, result).await?;

        if words.len() < usize::from(quantity) {
            return Err(self.short_response(function, quantity, words.len()));
        }
        words.truncate(usize::from(quantity));

        let data = registers_to_bytes(&words);
        self.logger.log_response(function, &data);
        Ok(data)
    }

    // ===== Writes =====

    /// FC05: `value` is `0xFF00` (ON) or `0x0000` (OFF).
    ///
    /// Returns the big-endian wire value that was written. With
    /// [`CoilValueMode::Tolerant`] any other value writes OFF.
    pub async fn write_single_coil(&self, address: u16, value: u16) -> ModbusResult<Vec<u8>> {
        let function = ModbusFunction::WriteSingleCoil;
        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or(ModbusError::NotConnected)?;

        let on = match (coil_from_u16(value), self.config.coil_mode) {
            (Some(on), _) => on,
            (None, CoilValueMode::Tolerant) => false,
            (None, CoilValueMode::Strict) => {
                return Err(ModbusError::invalid_data(format!(
                    "coil value 0x{value:04X} is neither 0xFF00 nor 0x0000"
                )))
            }
        };
        self.config.limits.validate(function, address, 1)?;

        let echo = coil_to_u16(on).to_be_bytes().to_vec();
        self.logger.log_request(function, address, 1, &echo);
        let call = session.transport.write_single_coil(address, on);
        let result = self
            .transact(function, &mut session.stats, session.target.timeout(), call)
            .await;
        self.settle(session, result).await?;

        self.logger.log_response(function, &echo);
        Ok(echo)
    }

    /// FC06: returns the big-endian value that was written
    pub async fn write_single_register(&self, address: u16, value: u16) -> ModbusResult<Vec<u8>> {
        let function = ModbusFunction::WriteSingleRegister;
        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or(ModbusError::NotConnected)?;
        self.config.limits.validate(function, address, 1)?;

        let echo = value.to_be_bytes().to_vec();
        self.logger.log_request(function, address, 1, &echo);
        let call = session.transport.write_single_register(address, value);
        let result = self
            .transact(function, &mut session.stats, session.target.timeout(), call)
            .await;
        self.settle(session, result).await?;

        self.logger.log_response(function, &echo);
        Ok(echo)
    }

    /// FC15: writes `quantity` coils unpacked LSB-first from `payload`.
    ///
    /// Bits missing from `payload` are written OFF. Returns `b"OK"`.
    pub async fn write_multiple_coils(
        &self,
        address: u16,
        quantity: u16,
        payload: &[u8],
    ) -> ModbusResult<Vec<u8>> {
        let function = ModbusFunction::WriteMultipleCoils;
        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or(ModbusError::NotConnected)?;
        self.config.limits.validate(function, address, quantity)?;

        let coils = unpack_bits(payload, usize::from(quantity));
        self.logger.log_request(function, address, quantity, payload);
        let call = session.transport.write_multiple_coils(address, &coils);
        let result = self
            .transact(function, &mut session.stats, session.target.timeout(), call)
            .await;
        self.settle(session, result).await?;

        self.logger.log_response(function, WRITE_OK);
        Ok(WRITE_OK.to_vec())
    }

    /// FC16: writes `quantity` registers rebuilt big-endian from `payload`.
    ///
    /// A register whose two bytes are not both present is written as `0`. Returns `b"OK"`.
    pub async fn write_multiple_registers(
        &self,
        address: u16,
        quantity: u16,
        payload: &[u8],
    ) -> ModbusResult<Vec<u8>> {
        let function = ModbusFunction::WriteMultipleRegisters;
        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or(ModbusError::NotConnected)?;
        self.config.limits.validate(function, address, quantity)?;

        let registers = bytes_to_registers(payload, usize::from(quantity));
        self.logger.log_request(function, address, quantity, payload);
        let call = session.transport.write_multiple_registers(address, &registers);
        let result = self
            .transact(function, &mut session.stats, session.target.timeout(), call)
            .await;
        self.settle(session, result).await?;

        self.logger.log_response(function, WRITE_OK);
        Ok(WRITE_OK.to_vec())
    }

    // ===== Not implemented =====

    /// FC22: not supported
    pub async fn mask_write_register(
        &self,
        _address: u16,
        _and_mask: u16,
        _or_mask: u16,
    ) -> ModbusResult<Vec<u8>> {
        Err(self.unsupported(ModbusFunction::MaskWriteRegister))
    }

    /// FC23: not supported
    pub async fn read_write_multiple_registers(
        &self,
        _read_address: u16,
        _read_quantity: u16,
        _write_address: u16,
        _write_quantity: u16,
        _payload: &[u8],
    ) -> ModbusResult<Vec<u8>> {
        Err(self.unsupported(ModbusFunction::ReadWriteMultipleRegisters))
    }

    /// FC24: not supported
    pub async fn read_fifo_queue(&self, _address: u16) -> ModbusResult<Vec<u8>> {
        Err(self.unsupported(ModbusFunction::ReadFifoQueue))
    }

    // ===== Helpers =====

    /// Run one transaction under the session timeout and account for it
    async fn transact<T>(
        &self,
        function: ModbusFunction,
        stats: &mut TransportStats,
        timeout: Duration,
        call: impl Future<Output = ModbusResult<T>>,
    ) -> ModbusResult<T> {
        let result = match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ModbusError::timeout(
                function.name(),
                timeout.as_millis() as u64,
            )),
        };

        stats.record(&result);
        if let Err(ref e) = result {
            self.logger.log_error(function, e);
        }
        result
    }

    /// A timed-out transaction may still be answered later; the stale reply must not be
    /// read as the answer to the next request. Replace the transport, keep the session.
    async fn settle<T>(
        &self,
        session: &mut Session<C::Transport>,
        result: ModbusResult<T>,
    ) -> ModbusResult<T> {
        if result.as_ref().is_err_and(ModbusError::is_timeout) {
            self.reopen(session).await;
        }
        result
    }

    async fn reopen(&self, session: &mut Session<C::Transport>) {
        debug!("Reopening {} after timeout", session.target);
        match self.connector.open(&session.target).await {
            Ok(transport) => {
                let mut stale = std::mem::replace(&mut session.transport, transport);
                let timeout = session.target.timeout();
                if let Ok(Err(e)) = tokio::time::timeout(timeout, stale.close()).await {
                    debug!("Closing stale transport to {} failed: {}", session.target, e);
                }
                info!("Reopened {} after timeout", session.target);
            }
            Err(e) => warn!(
                "Reopening {} after timeout failed, keeping the old transport: {}",
                session.target, e
            ),
        }
    }

    /// `close()` bounded by the session timeout
    async fn close_transport(&self, session: &mut Session<C::Transport>) -> ModbusResult<()> {
        let timeout = session.target.timeout();
        match tokio::time::timeout(timeout, session.transport.close()).await {
            Ok(result) => result,
            Err(_) => Err(ModbusError::timeout("close", timeout.as_millis() as u64)),
        }
    }

    fn short_response(&self, function: ModbusFunction, expected: u16, got: usize) -> ModbusError {
        let err = ModbusError::protocol(format!(
            "{function}: expected {expected} values, slave returned {got}"
        ));
        self.logger.log_error(function, &err);
        err
    }

    fn unsupported(&self, function: ModbusFunction) -> ModbusError {
        debug_assert!(!function.is_supported());
        let err = ModbusError::unsupported(function);
        self.logger.log_error(function, &err);
        err
    }
}
