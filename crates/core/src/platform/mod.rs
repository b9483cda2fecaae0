pub mod capture;
pub mod input;
pub mod stub;

#[cfg(target_os = "windows")]
pub mod keys;

use std::sync::Arc;

use anyhow::Result;

use crate::config::{Key, ScreenConfig};
use crate::logger;
use crate::types::{Frame, RegionRect};

/// Supplies pixel buffers for requested screen regions.
pub trait FrameSource: Send {
    /// Full size of the display being sampled.
    fn screen_size(&self) -> (u32, u32);
    fn grab(&mut self, rect: &RegionRect) -> Result<Frame>;
}

/// Injects pointer movement and button presses into the host.
pub trait Injector: Send {
    fn move_rel(&mut self, dx: i32, dy: i32) -> Result<()>;
    fn press_left(&mut self) -> Result<()>;
    fn release_left(&mut self) -> Result<()>;
    fn click_right(&mut self) -> Result<()>;
    fn position(&mut self) -> Result<(i32, i32)>;
}

/// Live key state, polled from both the engine and the listener.
pub trait KeyPoller: Send + Sync {
    fn is_down(&self, key: Key) -> bool;
}

/// Screen capture for the current host. The stub takes its dimensions
/// from the configured capture resolution.
pub fn create_frame_source(screen: &ScreenConfig, force_stub: bool) -> Result<Box<dyn FrameSource>> {
    if force_stub {
        logger::register_prefix("stub", logger::COLOR_GRAY);
        return Ok(Box::new(stub::StubFrameSource::new(screen.width, screen.height)));
    }
    Ok(Box::new(capture::ScreenSource::primary()?))
}

/// Input injection for the current host, or the stub.
pub fn create_injector(force_stub: bool) -> Result<Box<dyn Injector>> {
    if force_stub {
        logger::register_prefix("stub", logger::COLOR_GRAY);
        return Ok(Box::new(stub::StubInjector));
    }
    Ok(Box::new(input::EnigoInjector::new()?))
}

/// Key polling for the current host. Only Windows reads real key
/// state; elsewhere (and under --stub) keys read as released.
pub fn create_key_poller(force_stub: bool) -> Arc<dyn KeyPoller> {
    if force_stub {
        logger::register_prefix("stub", logger::COLOR_GRAY);
        return Arc::new(stub::StubKeyPoller::new());
    }
    #[cfg(target_os = "windows")]
    {
        return Arc::new(keys::WinKeyPoller);
    }
    #[cfg(not(target_os = "windows"))]
    {
        logger::warn("no key poller on this host, bindings are inert");
        return Arc::new(stub::StubKeyPoller::new());
    }
}
