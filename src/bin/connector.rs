//! Modbus Connector command line
//!
//! One Modbus operation per invocation against a TCP or RTU slave, printing the result
//! per address.
//!
//! Usage:
//!   connector --tcp 127.0.0.1:5020 read-holding 0 5
//!   connector --tcp 127.0.0.1:5020 write-coils 5 "1, 0, 1"
//!   connector --rtu /dev/ttyUSB0 --baud 19200 --parity E read-coils 0 16
//!   connector --tcp 127.0.0.1:5020 self-test --step-delay-ms 500

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use modbus_connector::report::{
    bit_rows, coil_payload, quantity_of, register_payload, register_rows,
};
use modbus_connector::{
    parse_value_list, CallbackLogger, ConnectionTarget, ControllerConfig, LogLevel,
    ModbusController, Parity, PointRow, RtuConfig, SelfTest, TcpConfig, TestStep,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Modbus TCP slave (host:port or tcp://host:port)
    #[arg(long, value_name = "ADDR", conflicts_with = "rtu")]
    tcp: Option<String>,

    /// Serial device of a Modbus RTU slave
    #[arg(long, value_name = "DEVICE")]
    rtu: Option<String>,

    /// Serial baud rate
    #[arg(long, default_value_t = 9600)]
    baud: u32,

    /// Serial data bits (5-8)
    #[arg(long, default_value_t = 8)]
    data_bits: u8,

    /// Serial stop bits (1-2)
    #[arg(long, default_value_t = 1)]
    stop_bits: u8,

    /// Serial parity (N, E, O)
    #[arg(long, default_value = "N")]
    parity: String,

    /// Connect and per-transaction timeout in milliseconds
    #[arg(long, default_value_t = 10_000)]
    timeout_ms: u64,

    /// Unit identifier
    #[arg(long, default_value_t = 1)]
    unit_id: u8,

    /// Print REQ/RES/ERR transaction records to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Log filter when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(flatten)]
    Operation(Operation),

    /// Run the connect/read/write/verify sequence
    SelfTest {
        /// Pause before each step
        #[arg(long, default_value_t = 500)]
        step_delay_ms: u64,
    },
}

#[derive(Debug, Subcommand)]
enum Operation {
    /// Read coils (FC01)
    ReadCoils { address: u16, quantity: u16 },

    /// Read discrete inputs (FC02)
    ReadDiscreteInputs { address: u16, quantity: u16 },

    /// Read holding registers (FC03)
    ReadHolding { address: u16, quantity: u16 },

    /// Read input registers (FC04)
    ReadInput { address: u16, quantity: u16 },

    /// Write a single coil (FC05); value is on, off, 0xFF00 or 0x0000
    WriteCoil { address: u16, value: String },

    /// Write a single register (FC06)
    WriteRegister { address: u16, value: u16 },

    /// Write coils from a comma-separated list, e.g. "1, 0, 1" (FC15)
    WriteCoils { address: u16, values: String },

    /// Write registers from a comma-separated list, e.g. "100, 200" (FC16)
    WriteRegisters { address: u16, values: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether the command succeeded
async fn run(args: Args) -> Result<bool, Box<dyn std::error::Error>> {
    debug!("{}", modbus_connector::info());
    let target = build_target(&args)?;
    debug!("Target: {}", target);

    let mut controller = ModbusController::with_config(
        ControllerConfig::new()
            .with_timeout(target.timeout())
            .with_unit_id(target.unit_id()),
    );
    if args.verbose {
        controller = controller.with_logger(CallbackLogger::new(
            Arc::new(|level: LogLevel, message: &str| eprintln!("[{}] {}", level, message)),
            LogLevel::Debug,
        ));
    }

    let operation = match args.command {
        Commands::Operation(operation) => operation,
        Commands::SelfTest { step_delay_ms } => {
            let report = SelfTest::new(target)
                .with_step_delay(Duration::from_millis(step_delay_ms))
                .with_observer(Arc::new(|index: usize, step: &TestStep| {
                    debug!("step {} {}: {}", index + 1, step.name, step.status)
                }))
                .run(&controller)
                .await;
            print!("{}", report);
            return Ok(report.passed());
        }
    };

    println!("{}", controller.connect(target).await?);
    let result = execute(&controller, operation).await;
    println!("{}", controller.disconnect().await);
    result?;
    Ok(true)
}

async fn execute(
    controller: &ModbusController,
    operation: Operation,
) -> Result<(), Box<dyn std::error::Error>> {
    match operation {
        Operation::ReadCoils { address, quantity } => {
            let data = controller.read_coils(address, quantity).await?;
            print_rows(&bit_rows(address, quantity, &data));
        }
        Operation::ReadDiscreteInputs { address, quantity } => {
            let data = controller.read_discrete_inputs(address, quantity).await?;
            print_rows(&bit_rows(address, quantity, &data));
        }
        Operation::ReadHolding { address, quantity } => {
            let data = controller.read_holding_registers(address, quantity).await?;
            print_rows(&register_rows(address, &data));
        }
        Operation::ReadInput { address, quantity } => {
            let data = controller.read_input_registers(address, quantity).await?;
            print_rows(&register_rows(address, &data));
        }
        Operation::WriteCoil { address, value } => {
            let echo = controller
                .write_single_coil(address, parse_coil_value(&value)?)
                .await?;
            println!("OK. {:02X?}", echo);
        }
        Operation::WriteRegister { address, value } => {
            let echo = controller.write_single_register(address, value).await?;
            println!("OK. {:02X?}", echo);
        }
        Operation::WriteCoils { address, values } => {
            let values = parse_value_list(&values)?;
            let result = controller
                .write_multiple_coils(address, quantity_of(&values)?, &coil_payload(&values))
                .await?;
            println!("{}", String::from_utf8_lossy(&result));
        }
        Operation::WriteRegisters { address, values } => {
            let values = parse_value_list(&values)?;
            let result = controller
                .write_multiple_registers(
                    address,
                    quantity_of(&values)?,
                    &register_payload(&values),
                )
                .await?;
            println!("{}", String::from_utf8_lossy(&result));
        }
    }
    Ok(())
}

fn build_target(args: &Args) -> Result<ConnectionTarget, Box<dyn std::error::Error>> {
    let timeout = Duration::from_millis(args.timeout_ms);
    let target: ConnectionTarget = match (&args.tcp, &args.rtu) {
        (Some(address), _) => TcpConfig::new(address.as_str())
            .with_timeout(timeout)
            .with_unit_id(args.unit_id)
            .into(),
        (None, Some(device)) => {
            let parity: Parity = args.parity.parse()?;
            RtuConfig::new(device.as_str(), args.baud)
                .with_framing(args.data_bits, args.stop_bits, parity)
                .with_timeout(timeout)
                .with_unit_id(args.unit_id)
                .into()
        }
        (None, None) => return Err("one of --tcp or --rtu is required".into()),
    };
    target.validate()?;
    Ok(target)
}

fn parse_coil_value(value: &str) -> Result<u16, Box<dyn std::error::Error>> {
    let value = value.trim();
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" => Ok(0xFF00),
        "off" | "false" => Ok(0x0000),
        lower => match lower.strip_prefix("0x") {
            Some(hex) => Ok(u16::from_str_radix(hex, 16)?),
            None => Ok(lower.parse::<u16>()?),
        },
    }
}

fn print_rows(rows: &[PointRow]) {
    println!("{:>5}  {:>5}  {:>6}  Binary", "Addr", "Value", "Hex");
    for row in rows {
        println!("{}", row);
    }
}
