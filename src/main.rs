use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::Result;

use seeker_core::channel::device::{self, DeviceChannel};
use seeker_core::channel::local::LocalChannel;
use seeker_core::channel::ActuationChannel;
use seeker_core::config::{ChannelMode, Config};
use seeker_core::engine::{Engine, SharedState};
use seeker_core::platform::{create_frame_source, create_injector, create_key_poller};
use seeker_core::{listener, logger};

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let force_stub = args.iter().any(|a| a == "--stub");

    let config_path = flag_value(&args, "--config")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("seeker.json"));

    if args.iter().any(|a| a == "--init-config") {
        Config::default().save(&config_path);
        println!("wrote default config to {}", config_path.display());
        return Ok(());
    }

    if args.iter().any(|a| a == "--list-ports") {
        let ports = device::list_ports();
        if ports.is_empty() {
            println!("no serial ports found");
        }
        for port in ports {
            println!("{}", port);
        }
        return Ok(());
    }

    let mut cfg = Config::load(&config_path);

    // CLI overrides for the actuation channel
    if args.iter().any(|a| a == "--local") {
        cfg.channel.mode = ChannelMode::Local;
    }
    if let Some(port) = flag_value(&args, "--device") {
        cfg.channel.mode = ChannelMode::Device;
        cfg.channel.port = port;
    }

    logger::init(&cfg.log_dir);
    logger::info("seeker started");

    // Shared flags plus the key listener; spawned before the channel
    // so the exit key works during a slow device open.
    let state = SharedState::new(true);
    let keys = create_key_poller(force_stub);
    let listener_handle = listener::spawn(Arc::clone(&keys), cfg.keys, Arc::clone(&state));

    let channel: Box<dyn ActuationChannel> = match cfg.channel.mode {
        ChannelMode::Local => Box::new(LocalChannel::new(create_injector(force_stub)?)),
        ChannelMode::Device => Box::new(DeviceChannel::open_serial(&cfg.channel)),
    };

    let frames = create_frame_source(&cfg.screen, force_stub)?;
    let pointer = create_injector(force_stub)?;

    // Scan loop runs on the main thread until the exit key or a fatal
    // capture error.
    let mut engine = Engine::new(cfg, frames, pointer, keys, channel, Arc::clone(&state));
    let result = engine.run();

    state.running.store(false, Ordering::Release);
    listener_handle.join().ok();

    result
}

fn flag_value(args: &[String], name: &str) -> Option<String> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
