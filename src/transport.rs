//! Transport layer
//!
//! The controller talks to a slave through two traits:
//!
//! - [`Connector`] opens a session for a [`ConnectionTarget`]
//! - [`ModbusTransport`] executes one Modbus transaction per call on an open session
//!
//! Framing, CRC and socket/serial I/O are delegated to `tokio-modbus`
//! ([`TokioModbusConnector`] / [`TokioModbusTransport`]). Tests substitute in-memory
//! implementations of both traits.

use std::future::Future;
use std::net::SocketAddr;

use tokio_modbus::client::Context;
use tokio_modbus::prelude::*;
use tracing::{debug, info};

use crate::config::{ConnectionTarget, TcpConfig};
#[cfg(feature = "rtu")]
use crate::config::{Parity, RtuConfig};
use crate::error::{ModbusError, ModbusResult};
use crate::protocol::ModbusFunction;

/// Counters kept for an open session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportStats {
    pub requests_sent: u64,
    pub responses_received: u64,
    pub errors: u64,
    pub timeouts: u64,
    pub exceptions: u64,
}

impl TransportStats {
    /// Account for the outcome of one transaction
    pub fn record<T>(&mut self, result: &ModbusResult<T>) {
        self.requests_sent += 1;
        match result {
            Ok(_) => self.responses_received += 1,
            Err(err) => {
                self.errors += 1;
                if err.is_timeout() {
                    self.timeouts += 1;
                }
                if matches!(err, ModbusError::Exception { .. }) {
                    // The slave did answer, just not with data
                    self.responses_received += 1;
                    self.exceptions += 1;
                }
            }
        }
    }
}

/// One open Modbus session.
///
/// Each method is a single request/response transaction. Implementations return the
/// values as the slave reported them; quantity checks and byte packing belong to the
/// controller.
pub trait ModbusTransport: Send {
    /// FC01
    fn read_coils(
        &mut self,
        address: u16,
        quantity: u16,
    ) -> impl Future<Output = ModbusResult<Vec<bool>>> + Send;

    /// FC02
    fn read_discrete_inputs(
        &mut self,
        address: u16,
        quantity: u16,
    ) -> impl Future<Output = ModbusResult<Vec<bool>>> + Send;

    /// FC03
    fn read_holding_registers(
        &mut self,
        address: u16,
        quantity: u16,
    ) -> impl Future<Output = ModbusResult<Vec<u16>>> + Send;

    /// FC04
    fn read_input_registers(
        &mut self,
        address: u16,
        quantity: u16,
    ) -> impl Future<Output = ModbusResult<Vec<u16>>> + Send;

    /// FC05
    fn write_single_coil(
        &mut self,
        address: u16,
        value: bool,
    ) -> impl Future<Output = ModbusResult<()>> + Send;

    /// FC06
    fn write_single_register(
        &mut self,
        address: u16,
        value: u16,
    ) -> impl Future<Output = ModbusResult<()>> + Send;

    /// FC15
    fn write_multiple_coils(
        &mut self,
        address: u16,
        values: &[bool],
    ) -> impl Future<Output = ModbusResult<()>> + Send;

    /// FC16
    fn write_multiple_registers(
        &mut self,
        address: u16,
        values: &[u16],
    ) -> impl Future<Output = ModbusResult<()>> + Send;

    /// Release the underlying socket or serial port
    fn close(&mut self) -> impl Future<Output = ModbusResult<()>> + Send;
}

/// Opens sessions for connection targets
pub trait Connector: Send + Sync {
    type Transport: ModbusTransport;

    /// Open a session; fails with a connection or configuration error
    fn open(
        &self,
        target: &ConnectionTarget,
    ) -> impl Future<Output = ModbusResult<Self::Transport>> + Send;
}

/// [`Connector`] backed by `tokio-modbus`
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioModbusConnector;

impl TokioModbusConnector {
    pub fn new() -> Self {
        Self
    }

    async fn open_tcp(config: &TcpConfig) -> ModbusResult<TokioModbusTransport> {
        let addr = resolve(config.host_port()).await?;
        let slave = Slave(config.unit_id);

        debug!("Opening Modbus TCP connection to {}", addr);
        let ctx = match tokio::time::timeout(config.timeout, tcp::connect_slave(addr, slave)).await
        {
            Ok(Ok(ctx)) => ctx,
            Ok(Err(e)) => {
                return Err(ModbusError::connection(format!(
                    "Failed to connect to {}: {}",
                    addr, e
                )))
            }
            Err(_) => {
                return Err(ModbusError::connection(format!(
                    "Connection to {} timed out after {}ms",
                    addr,
                    config.timeout.as_millis()
                )))
            }
        };

        info!("Connected to {}", config.url());
        Ok(TokioModbusTransport::new(ctx))
    }

    #[cfg(feature = "rtu")]
    async fn open_rtu(config: &RtuConfig) -> ModbusResult<TokioModbusTransport> {
        use tokio_serial::{DataBits, SerialStream, StopBits};

        let data_bits = match config.data_bits {
            5 => DataBits::Five,
            6 => DataBits::Six,
            7 => DataBits::Seven,
            _ => DataBits::Eight,
        };
        let stop_bits = match config.stop_bits {
            2 => StopBits::Two,
            _ => StopBits::One,
        };
        let parity = match config.parity {
            Parity::None => tokio_serial::Parity::None,
            Parity::Even => tokio_serial::Parity::Even,
            Parity::Odd => tokio_serial::Parity::Odd,
        };

        let builder = tokio_serial::new(config.device_path(), config.baud_rate)
            .data_bits(data_bits)
            .stop_bits(stop_bits)
            .parity(parity)
            .timeout(config.timeout);

        debug!(
            "Opening serial port {} @ {} baud",
            config.device_path(),
            config.baud_rate
        );
        let port = SerialStream::open(&builder).map_err(|e| {
            ModbusError::connection(format!(
                "Failed to open serial port {}: {}",
                config.device_path(),
                e
            ))
        })?;

        let ctx = rtu::attach_slave(port, Slave(config.unit_id));
        info!("Connected to {}", config.url());
        Ok(TokioModbusTransport::new(ctx))
    }
}

impl Connector for TokioModbusConnector {
    type Transport = TokioModbusTransport;

    async fn open(&self, target: &ConnectionTarget) -> ModbusResult<TokioModbusTransport> {
        target.validate()?;
        match target {
            ConnectionTarget::Tcp(config) => Self::open_tcp(config).await,
            #[cfg(feature = "rtu")]
            ConnectionTarget::Rtu(config) => Self::open_rtu(config).await,
            #[cfg(not(feature = "rtu"))]
            ConnectionTarget::Rtu(_) => Err(ModbusError::configuration(
                "RTU support is not compiled in (enable the `rtu` feature)",
            )),
        }
    }
}

/// Resolve `host:port`, taking the first address
async fn resolve(host_port: &str) -> ModbusResult<SocketAddr> {
    if let Ok(addr) = host_port.parse::<SocketAddr>() {
        return Ok(addr);
    }
    tokio::net::lookup_host(host_port)
        .await
        .map_err(|e| ModbusError::connection(format!("Failed to resolve {}: {}", host_port, e)))?
        .next()
        .ok_or_else(|| ModbusError::connection(format!("No address found for {}", host_port)))
}

/// Open `tokio-modbus` client context
pub struct TokioModbusTransport {
    ctx: Context,
}

impl TokioModbusTransport {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }
}

impl std::fmt::Debug for TokioModbusTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioModbusTransport").finish_non_exhaustive()
    }
}

/// Map a `tokio-modbus` result (transport error / exception response / value) onto
/// [`ModbusResult`].
fn flatten<T>(function: ModbusFunction, result: tokio_modbus::Result<T>) -> ModbusResult<T> {
    match result {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(exception)) => Err(ModbusError::exception(function, u8::from(exception))),
        Err(tokio_modbus::Error::Transport(e)) => Err(ModbusError::from(e)),
        Err(e) => Err(ModbusError::protocol(format!("{}: {}", function, e))),
    }
}

impl ModbusTransport for TokioModbusTransport {
    async fn read_coils(&mut self, address: u16, quantity: u16) -> ModbusResult<Vec<bool>> {
        flatten(
            ModbusFunction::ReadCoils,
            self.ctx.read_coils(address, quantity).await,
        )
    }

    async fn read_discrete_inputs(
        &mut self,
        address: u16,
        quantity: u16,
    ) -> ModbusResult<Vec<bool>> {
        flatten(
            ModbusFunction::ReadDiscreteInputs,
            self.ctx.read_discrete_inputs(address, quantity).await,
        )
    }

    async fn read_holding_registers(
        &mut self,
        address: u16,
        quantity: u16,
    ) -> ModbusResult<Vec<u16>> {
        flatten(
            ModbusFunction::ReadHoldingRegisters,
            self.ctx.read_holding_registers(address, quantity).await,
        )
    }

    async fn read_input_registers(
        &mut self,
        address: u16,
        quantity: u16,
    ) -> ModbusResult<Vec<u16>> {
        flatten(
            ModbusFunction::ReadInputRegisters,
            self.ctx.read_input_registers(address, quantity).await,
        )
    }

    async fn write_single_coil(&mut self, address: u16, value: bool) -> ModbusResult<()> {
        flatten(
            ModbusFunction::WriteSingleCoil,
            self.ctx.write_single_coil(address, value).await,
        )
    }

    async fn write_single_register(&mut self, address: u16, value: u16) -> ModbusResult<()> {
        flatten(
            ModbusFunction::WriteSingleRegister,
            self.ctx.write_single_register(address, value).await,
        )
    }

    async fn write_multiple_coils(&mut self, address: u16, values: &[bool]) -> ModbusResult<()> {
        flatten(
            ModbusFunction::WriteMultipleCoils,
            self.ctx.write_multiple_coils(address, values).await,
        )
    }

    async fn write_multiple_registers(
        &mut self,
        address: u16,
        values: &[u16],
    ) -> ModbusResult<()> {
        flatten(
            ModbusFunction::WriteMultipleRegisters,
            self.ctx.write_multiple_registers(address, values).await,
        )
    }

    async fn close(&mut self) -> ModbusResult<()> {
        self.ctx
            .disconnect()
            .await
            .map_err(|e| ModbusError::io(e.to_string()))
    }
}
