//! End-to-end tests against an in-process Modbus TCP simulator
//!
//! The simulator is a `tokio-modbus` server seeded with:
//! - holding registers 0..100 = 0..100
//! - input registers 0..100 = 1000..1100
//! - coils alternating 1, 0, 1, 0, ...
//! - discrete inputs 50 x 1 followed by 50 x 0

use std::future::{self, Future};
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_test::{assert_err, assert_ok};
use tokio_modbus::{
    prelude::*,
    server::tcp::{accept_tcp_connection, Server},
};

use modbus_connector::{
    CallbackLogger, ControllerConfig, DisconnectOutcome, ErrorKind, LogLevel, ModbusController,
    ModbusError, SelfTest, StepStatus, TcpConfig,
};

const TABLE_SIZE: usize = 100;

struct Tables {
    coils: Vec<bool>,
    discrete_inputs: Vec<bool>,
    holding: Vec<u16>,
    input: Vec<u16>,
}

impl Tables {
    fn seeded() -> Self {
        Self {
            coils: (0..TABLE_SIZE).map(|i| i % 2 == 0).collect(),
            discrete_inputs: (0..TABLE_SIZE).map(|i| i < 50).collect(),
            holding: (0..TABLE_SIZE as u16).collect(),
            input: (1000..1000 + TABLE_SIZE as u16).collect(),
        }
    }
}

/// Holding-register reads at `address` are answered only after `delay`
#[derive(Clone, Copy)]
struct SlowRead {
    address: u16,
    delay: Duration,
}

struct Simulator {
    tables: Arc<Mutex<Tables>>,
    slow: Option<SlowRead>,
}

fn range(addr: u16, cnt: usize) -> Result<std::ops::Range<usize>, ExceptionCode> {
    let start = usize::from(addr);
    let end = start + cnt;
    if end > TABLE_SIZE {
        return Err(ExceptionCode::IllegalDataAddress);
    }
    Ok(start..end)
}

impl tokio_modbus::server::Service for Simulator {
    type Request = Request<'static>;
    type Response = Response;
    type Exception = ExceptionCode;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Exception>> + Send>>;

    fn call(&self, req: Self::Request) -> Self::Future {
        let delay = match (&req, self.slow) {
            (Request::ReadHoldingRegisters(addr, _), Some(slow)) if *addr == slow.address => {
                Some(slow.delay)
            }
            _ => None,
        };
        let mut tables = self.tables.lock().unwrap();
        let res = match req {
            Request::ReadCoils(addr, cnt) => range(addr, cnt.into())
                .map(|r| Response::ReadCoils(tables.coils[r].to_vec())),
            Request::ReadDiscreteInputs(addr, cnt) => range(addr, cnt.into())
                .map(|r| Response::ReadDiscreteInputs(tables.discrete_inputs[r].to_vec())),
            Request::ReadHoldingRegisters(addr, cnt) => range(addr, cnt.into())
                .map(|r| Response::ReadHoldingRegisters(tables.holding[r].to_vec())),
            Request::ReadInputRegisters(addr, cnt) => range(addr, cnt.into())
                .map(|r| Response::ReadInputRegisters(tables.input[r].to_vec())),
            Request::WriteSingleCoil(addr, value) => range(addr, 1).map(|r| {
                tables.coils[r.start] = value;
                Response::WriteSingleCoil(addr, value)
            }),
            Request::WriteSingleRegister(addr, value) => range(addr, 1).map(|r| {
                tables.holding[r.start] = value;
                Response::WriteSingleRegister(addr, value)
            }),
            Request::WriteMultipleCoils(addr, values) => range(addr, values.len()).map(|r| {
                tables.coils[r].copy_from_slice(&values);
                Response::WriteMultipleCoils(addr, values.len() as u16)
            }),
            Request::WriteMultipleRegisters(addr, values) => {
                range(addr, values.len()).map(|r| {
                    tables.holding[r].copy_from_slice(&values);
                    Response::WriteMultipleRegisters(addr, values.len() as u16)
                })
            }
            _ => Err(ExceptionCode::IllegalFunction),
        };
        drop(tables);
        match delay {
            Some(delay) => Box::pin(async move {
                tokio::time::sleep(delay).await;
                res
            }),
            None => Box::pin(future::ready(res)),
        }
    }
}

/// Start the simulator on an OS-assigned port
async fn start_simulator() -> (SocketAddr, Arc<Mutex<Tables>>, JoinHandle<()>) {
    start_simulator_with(None).await
}

async fn start_simulator_with(
    slow: Option<SlowRead>,
) -> (SocketAddr, Arc<Mutex<Tables>>, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let socket_addr = listener.local_addr().unwrap();
    let tables = Arc::new(Mutex::new(Tables::seeded()));

    let server = Server::new(listener);
    let shared = Arc::clone(&tables);
    let on_connected = move |stream, socket_addr| {
        let tables = Arc::clone(&shared);
        async move {
            accept_tcp_connection(stream, socket_addr, move |_socket_addr| {
                Ok(Some(Simulator {
                    tables: Arc::clone(&tables),
                    slow,
                }))
            })
        }
    };
    let on_process_error = |err| {
        eprintln!("Simulator error: {}", err);
    };

    let handle = tokio::spawn(async move {
        if let Err(e) = server.serve(&on_connected, on_process_error).await {
            eprintln!("Simulator stopped: {}", e);
        }
    });

    (socket_addr, tables, handle)
}

fn controller() -> ModbusController {
    ModbusController::with_config(ControllerConfig::new().with_timeout(Duration::from_secs(2)))
}

#[tokio::test]
async fn test_end_to_end_scenario() {
    let (addr, _tables, _server) = start_simulator().await;
    let controller = controller();

    let connected = controller.connect_tcp(&addr.to_string()).await.unwrap();
    assert_eq!(connected.to_string(), format!("Connected to {addr}"));
    assert_eq!(connected.url(), format!("tcp://{addr}"));

    let coils = controller.read_coils(0, 8).await.unwrap();
    assert_eq!(coils, vec![0b0101_0101]);

    let registers = controller.read_holding_registers(0, 5).await.unwrap();
    assert_eq!(registers, vec![0, 0, 0, 1, 0, 2, 0, 3, 0, 4]);

    controller.write_single_coil(10, 0x0000).await.unwrap();
    assert_eq!(controller.read_coils(10, 1).await.unwrap()[0] & 1, 0);
    let echo = controller.write_single_coil(10, 0xFF00).await.unwrap();
    assert_eq!(echo, vec![0xFF, 0x00]);
    assert_eq!(controller.read_coils(10, 1).await.unwrap()[0] & 1, 1);

    controller.write_single_register(10, 12345).await.unwrap();
    let data = controller.read_holding_registers(10, 1).await.unwrap();
    assert_eq!(u16::from_be_bytes([data[0], data[1]]), 12345);

    assert_eq!(controller.disconnect().await, DisconnectOutcome::Disconnected);
    assert_eq!(controller.disconnect().await, DisconnectOutcome::NotConnected);
}

#[tokio::test]
async fn test_input_tables() {
    let (addr, _tables, _server) = start_simulator().await;
    let controller = controller();
    controller.connect_tcp(&format!("tcp://{addr}")).await.unwrap();

    assert_eq!(
        controller.read_input_registers(0, 2).await.unwrap(),
        vec![0x03, 0xE8, 0x03, 0xE9]
    );
    // Inputs 48, 49 are ON; 50, 51 are OFF
    assert_eq!(
        controller.read_discrete_inputs(48, 4).await.unwrap(),
        vec![0b0011]
    );
    // 10 bits -> 2 bytes, padding bits clear
    assert_eq!(
        controller.read_discrete_inputs(0, 10).await.unwrap(),
        vec![0xFF, 0b11]
    );

    controller.disconnect().await;
}

#[tokio::test]
async fn test_multi_writes_reach_the_slave() {
    let (addr, tables, _server) = start_simulator().await;
    let controller = controller();
    controller.connect_tcp(&addr.to_string()).await.unwrap();

    // 1,0,1 then a short payload for coils 8..10 (written OFF)
    let ok = controller
        .write_multiple_coils(30, 10, &[0b0000_0101])
        .await
        .unwrap();
    assert_eq!(ok, b"OK".to_vec());

    let ok = controller
        .write_multiple_registers(20, 3, &[0x00, 0x64, 0x00, 0xC8, 0x01, 0x2C])
        .await
        .unwrap();
    assert_eq!(ok, b"OK".to_vec());

    {
        let tables = tables.lock().unwrap();
        assert_eq!(
            tables.coils[30..40],
            [true, false, true, false, false, false, false, false, false, false]
        );
        assert_eq!(tables.holding[20..23], [100, 200, 300]);
    }

    assert_eq!(
        controller.read_coils(30, 3).await.unwrap()[0] & 0x07,
        0b101
    );
    controller.disconnect().await;
}

#[tokio::test]
async fn test_exception_response_keeps_session() {
    let (addr, _tables, _server) = start_simulator().await;
    let controller = controller();
    controller.connect_tcp(&addr.to_string()).await.unwrap();

    // Registers 90..110 run past the simulator's table
    let err = controller.read_holding_registers(90, 20).await.unwrap_err();
    assert!(matches!(err, ModbusError::Exception { code: 0x02, .. }));
    assert_eq!(err.kind(), ErrorKind::TransactionFailure);
    assert!(err.to_string().contains("Illegal Data Address"));

    assert!(controller.is_connected().await);
    assert_eq!(controller.read_holding_registers(90, 1).await.unwrap(), vec![0, 90]);

    let stats = controller.stats().await.unwrap();
    assert_eq!(stats.requests_sent, 2);
    assert_eq!(stats.exceptions, 1);
    controller.disconnect().await;
}

#[tokio::test]
async fn test_timeout_discards_late_reply() {
    let slow = SlowRead {
        address: 0,
        delay: Duration::from_millis(300),
    };
    let (addr, _tables, _server) = start_simulator_with(Some(slow)).await;
    let controller = ModbusController::with_config(
        ControllerConfig::new().with_timeout(Duration::from_millis(100)),
    );
    controller.connect_tcp(&addr.to_string()).await.unwrap();

    let err = assert_err!(controller.read_holding_registers(0, 1).await);
    assert!(err.is_timeout());
    assert!(controller.is_connected().await);

    // Let the slave answer the abandoned request
    tokio::time::sleep(Duration::from_millis(400)).await;

    for address in 6..9u16 {
        let data = assert_ok!(controller.read_holding_registers(address, 1).await);
        assert_eq!(data, address.to_be_bytes().to_vec(), "address {address}");
    }

    let stats = controller.stats().await.unwrap();
    assert_eq!(stats.requests_sent, 4);
    assert_eq!(stats.timeouts, 1);
    assert_eq!(stats.errors, 1);
    controller.disconnect().await;
}

#[tokio::test]
async fn test_unsupported_and_not_connected() {
    let (addr, _tables, _server) = start_simulator().await;
    let controller = controller();

    assert_eq!(
        assert_err!(controller.read_coils(0, 1).await),
        ModbusError::NotConnected
    );

    assert_ok!(controller.connect_tcp(&addr.to_string()).await);
    let err = assert_err!(controller.read_fifo_queue(0).await);
    assert_eq!(err.kind(), ErrorKind::Unsupported);
    assert!(controller.is_connected().await);
    controller.disconnect().await;
}

#[tokio::test]
async fn test_connect_refused() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let controller = controller();
    let err = assert_err!(controller.connect_tcp(&addr.to_string()).await);
    assert_eq!(err.kind(), ErrorKind::ConnectFailure);
    assert!(!controller.is_connected().await);
}

#[tokio::test]
async fn test_reconnect_replaces_session() {
    let (first, _t1, _s1) = start_simulator().await;
    let (second, tables, _s2) = start_simulator().await;
    let controller = controller();

    controller.connect_tcp(&first.to_string()).await.unwrap();
    controller.connect_tcp(&second.to_string()).await.unwrap();
    assert_eq!(
        controller.connection().await.unwrap().url(),
        format!("tcp://{second}")
    );

    controller.write_single_register(0, 4242).await.unwrap();
    assert_eq!(tables.lock().unwrap().holding[0], 4242);
    controller.disconnect().await;
}

#[tokio::test]
async fn test_concurrent_callers() {
    let (addr, _tables, _server) = start_simulator().await;
    let controller = Arc::new(controller());
    controller.connect_tcp(&addr.to_string()).await.unwrap();

    let handles: Vec<_> = (0..10u16)
        .map(|i| {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move {
                controller.write_single_register(40 + i, 500 + i).await.unwrap();
                controller.read_holding_registers(40 + i, 1).await.unwrap()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let data = handle.await.unwrap();
        assert_eq!(u16::from_be_bytes([data[0], data[1]]), 500 + i as u16);
    }
    controller.disconnect().await;
}

#[tokio::test]
async fn test_transaction_log_callback() {
    let (addr, _tables, _server) = start_simulator().await;
    let records = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&records);
    let controller = controller().with_logger(CallbackLogger::new(
        Arc::new(move |_level: LogLevel, message: &str| {
            sink.lock().unwrap().push(message.to_string())
        }),
        LogLevel::Debug,
    ));

    controller.connect_tcp(&addr.to_string()).await.unwrap();
    controller.read_holding_registers(1, 1).await.unwrap();
    controller.disconnect().await;

    let records = records.lock().unwrap();
    assert_eq!(
        *records,
        vec![
            "REQ Read Holding Registers addr=1 qty=1".to_string(),
            "RES Read Holding Registers data=00 01".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_self_test_passes_against_simulator() {
    let (addr, tables, _server) = start_simulator().await;
    let controller = controller();

    let target = TcpConfig::new(addr.to_string())
        .with_timeout(Duration::from_secs(2))
        .into();
    let report = SelfTest::new(target)
        .with_step_delay(Duration::ZERO)
        .run(&controller).await;

    assert!(report.passed(), "{report}");
    assert!(report
        .steps
        .iter()
        .all(|step| step.status == StepStatus::Pass && step.elapsed.is_some()));
    assert_eq!(report.steps[7].message, "Disconnected");
    assert!(!controller.is_connected().await);

    let tables = tables.lock().unwrap();
    assert_eq!(tables.holding[20..23], [100, 200, 300]);
    assert_eq!(tables.coils[5..8], [true, false, true]);
}

#[tokio::test]
async fn test_self_test_disconnects_after_failure() {
    let (addr, _tables, _server) = start_simulator().await;
    // A device limit of 2 coils per write rejects the three-coil step
    let controller = ModbusController::with_config(ControllerConfig::new().with_limits(
        modbus_connector::DeviceLimits::new().with_max_write_coils(2),
    ));

    let target = TcpConfig::new(addr.to_string()).into();
    let report = SelfTest::new(target)
        .with_step_delay(Duration::ZERO)
        .run(&controller).await;

    assert!(!report.passed());
    let failed = report.failed_step().unwrap();
    assert_eq!(failed.name, "Write Multi Coils (Addr 5: 1, 0, 1)");
    assert!(report.steps[..3].iter().all(|s| s.status == StepStatus::Pass));
    assert!(report.steps[4..].iter().all(|s| s.status == StepStatus::Pending));
    assert!(!controller.is_connected().await);
}
