use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::ChannelConfig;
use crate::logger;
use crate::sleep;
use crate::types::ActuationCommand;

use super::{encode, ActuationChannel, ChannelError};

// Pending commands beyond this are refused, not silently queued
const QUEUE_CAP: usize = 64;

/// Line transport to the device. A trait so tests can script one.
pub trait DeviceTransport: Send {
    fn write_line(&mut self, line: &str) -> io::Result<()>;
    fn read_line(&mut self) -> io::Result<String>;
}

pub type TransportOpener = Box<dyn Fn() -> anyhow::Result<Box<dyn DeviceTransport>> + Send>;

/// Newline-terminated ASCII lines over a serial port, with the port's
/// timeout bounding every acknowledgment read.
pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialTransport {
    pub fn open(port: &str, baud: u32, timeout_ms: u64) -> anyhow::Result<Self> {
        let port = serialport::new(port, baud)
            .timeout(Duration::from_millis(timeout_ms))
            .open()?;
        Ok(Self { port })
    }
}

impl DeviceTransport for SerialTransport {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.port.write_all(line.as_bytes())?;
        self.port.write_all(b"\n")?;
        self.port.flush()
    }

    fn read_line(&mut self) -> io::Result<String> {
        let mut out = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            let n = self.port.read(&mut byte)?;
            if n == 0 {
                break;
            }
            match byte[0] {
                b'\n' => break,
                b'\r' => {}
                b => out.push(b),
            }
            if out.len() > 64 {
                break;
            }
        }
        Ok(String::from_utf8_lossy(&out).into_owned())
    }
}

/// Names of serial ports visible on the host.
pub fn list_ports() -> Vec<String> {
    serialport::available_ports()
        .map(|ports| ports.into_iter().map(|p| p.port_name).collect())
        .unwrap_or_default()
}

/// Queued channel to an external device. Commands buffer behind a lock;
/// a drain thread owns the transport exclusively, sends one line per
/// acknowledgment and spaces consecutive sends. A failed handshake or
/// acknowledgment marks the channel down and pending commands are
/// dropped; `reconnect` asks the drain thread to reopen.
pub struct DeviceChannel {
    queue: Arc<Mutex<VecDeque<ActuationCommand>>>,
    connected: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    reconnect_requested: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl DeviceChannel {
    /// Spawn the drain thread. The opener runs on that thread, at
    /// startup and again on every reconnect request.
    pub fn spawn(opener: TransportOpener, settle_ms: u64, send_delay_ms: u64) -> Self {
        logger::register_prefix("device", logger::COLOR_YELLOW);
        let queue = Arc::new(Mutex::new(VecDeque::new()));
        let connected = Arc::new(AtomicBool::new(false));
        let running = Arc::new(AtomicBool::new(true));
        let reconnect_requested = Arc::new(AtomicBool::new(false));

        let worker = {
            let queue = Arc::clone(&queue);
            let connected = Arc::clone(&connected);
            let running = Arc::clone(&running);
            let reconnect_requested = Arc::clone(&reconnect_requested);
            thread::spawn(move || {
                drain_loop(
                    opener,
                    settle_ms,
                    send_delay_ms,
                    queue,
                    connected,
                    running,
                    reconnect_requested,
                );
            })
        };

        Self {
            queue,
            connected,
            running,
            reconnect_requested,
            worker: Some(worker),
        }
    }

    pub fn open_serial(cfg: &ChannelConfig) -> Self {
        let port = cfg.port.clone();
        let baud = cfg.baud;
        let timeout_ms = cfg.ack_timeout_ms;
        let opener: TransportOpener = Box::new(move || {
            let t = SerialTransport::open(&port, baud, timeout_ms)?;
            Ok(Box::new(t) as Box<dyn DeviceTransport>)
        });
        Self::spawn(opener, cfg.settle_ms, cfg.send_delay_ms)
    }
}

impl ActuationChannel for DeviceChannel {
    fn name(&self) -> &'static str {
        "device"
    }

    fn connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn send(&mut self, cmd: ActuationCommand) -> Result<(), ChannelError> {
        if !self.connected() {
            return Err(ChannelError::Disconnected);
        }
        let mut q = self.queue.lock().unwrap();
        if q.len() >= QUEUE_CAP {
            return Err(ChannelError::Send("queue full".to_string()));
        }
        q.push_back(cmd);
        Ok(())
    }

    fn reconnect(&mut self) -> Result<(), ChannelError> {
        self.reconnect_requested.store(true, Ordering::Release);
        Ok(())
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(h) = self.worker.take() {
            h.join().ok();
        }
    }
}

impl Drop for DeviceChannel {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn drain_loop(
    opener: TransportOpener,
    settle_ms: u64,
    send_delay_ms: u64,
    queue: Arc<Mutex<VecDeque<ActuationCommand>>>,
    connected: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    reconnect_requested: Arc<AtomicBool>,
) {
    let mut transport = connect(&opener, settle_ms, &connected);

    while running.load(Ordering::Acquire) {
        if reconnect_requested.swap(false, Ordering::AcqRel) {
            logger::info_p("device", "reconnecting");
            transport = connect(&opener, settle_ms, &connected);
        }

        if transport.is_none() {
            sleep::sleep_ms(50);
            continue;
        }

        let cmd = { queue.lock().unwrap().pop_front() };
        let Some(cmd) = cmd else {
            sleep::sleep_ms(5);
            continue;
        };

        let result = match transport.as_deref_mut() {
            Some(t) => send_one(t, cmd),
            None => Err(io::Error::new(io::ErrorKind::NotConnected, "no transport")),
        };

        match result {
            Ok(()) => {
                if send_delay_ms > 0 {
                    sleep::sleep_ms(send_delay_ms);
                }
            }
            Err(e) => {
                logger::error_p("device", &format!("send failed: {}", e));
                connected.store(false, Ordering::Release);
                transport = None;
                queue.lock().unwrap().clear();
            }
        }
    }
}

fn connect(
    opener: &TransportOpener,
    settle_ms: u64,
    connected: &AtomicBool,
) -> Option<Box<dyn DeviceTransport>> {
    connected.store(false, Ordering::Release);

    let mut transport = match opener() {
        Ok(t) => t,
        Err(e) => {
            logger::error_p("device", &format!("open failed: {e:#}"));
            return None;
        }
    };

    // The device resets when the port opens; give it time to boot
    if settle_ms > 0 {
        sleep::sleep_ms(settle_ms);
    }

    match handshake(transport.as_mut()) {
        Ok(()) => {
            connected.store(true, Ordering::Release);
            logger::info_p("device", "handshake ok");
            Some(transport)
        }
        Err(e) => {
            logger::error_p("device", &format!("handshake failed: {}", e));
            None
        }
    }
}

fn handshake(t: &mut dyn DeviceTransport) -> io::Result<()> {
    t.write_line(&encode(ActuationCommand::Ping))?;
    let reply = t.read_line()?;
    if reply == "PONG" {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("expected PONG, got {:?}", reply),
        ))
    }
}

fn send_one(t: &mut dyn DeviceTransport, cmd: ActuationCommand) -> io::Result<()> {
    let want = match cmd {
        ActuationCommand::Ping => "PONG",
        _ => "OK",
    };
    t.write_line(&encode(cmd))?;
    let reply = t.read_line()?;
    if reply == want {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("expected {}, got {:?}", want, reply),
        ))
    }
}
