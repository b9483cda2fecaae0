use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::KeyConfig;
use crate::engine::SharedState;
use crate::logger;
use crate::platform::KeyPoller;
use crate::sleep::sleep_ms;

const POLL_MS: u64 = 10;
const DEBOUNCE_MS: u64 = 300;

/// Minimum spacing between accepted events. Rejected attempts do not
/// reset the window.
pub struct Debounce {
    min_gap: Duration,
    last: Option<Instant>,
}

impl Debounce {
    pub fn new(min_gap_ms: u64) -> Self {
        Self {
            min_gap: Duration::from_millis(min_gap_ms),
            last: None,
        }
    }

    pub fn ready(&mut self, now: Instant) -> bool {
        match self.last {
            Some(t) if now.duration_since(t) < self.min_gap => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

/// Poll the bound keys until the running flag drops. The exit key
/// stops the run; toggle and debug flip their flags on the key-down
/// edge, debounced against switch chatter.
pub fn spawn(keys: Arc<dyn KeyPoller>, cfg: KeyConfig, state: Arc<SharedState>) -> JoinHandle<()> {
    logger::register_prefix("keys", logger::COLOR_GRAY);
    thread::spawn(move || {
        let mut toggle_db = Debounce::new(DEBOUNCE_MS);
        let mut debug_db = Debounce::new(DEBOUNCE_MS);
        let mut toggle_was = false;
        let mut debug_was = false;

        while state.running.load(Ordering::Acquire) {
            if keys.is_down(cfg.exit) {
                logger::info_p("keys", "exit key pressed");
                state.running.store(false, Ordering::Release);
                break;
            }

            let toggle_down = keys.is_down(cfg.toggle);
            if toggle_down && !toggle_was && toggle_db.ready(Instant::now()) {
                let enabled = !state.enabled.load(Ordering::Acquire);
                state.enabled.store(enabled, Ordering::Release);
                logger::info_p("keys", if enabled { "assist enabled" } else { "assist disabled" });
            }
            toggle_was = toggle_down;

            let debug_down = keys.is_down(cfg.debug);
            if debug_down && !debug_was && debug_db.ready(Instant::now()) {
                let debug = !state.debug.load(Ordering::Acquire);
                state.debug.store(debug, Ordering::Release);
                logger::info_p("keys", if debug { "debug on" } else { "debug off" });
            }
            debug_was = debug_down;

            sleep_ms(POLL_MS);
        }
    })
}
