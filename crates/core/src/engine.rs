use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use rand::Rng;

use crate::aim::{self, Corrector};
use crate::channel::{ActuationChannel, ChannelError};
use crate::config::{AnchorMode, ColorConfig, Config};
use crate::extract;
use crate::logger;
use crate::platform::{FrameSource, Injector, KeyPoller};
use crate::roi;
use crate::segment;
use crate::sleep::sleep_ms;
use crate::trigger::Trigger;
use crate::types::{ActuationCommand, Offset};

/// Abort when this many captures fail back to back.
const MAX_CAPTURE_FAILURES: u32 = 30;

/// Flags shared between the engine, the key listener, and main.
/// Stored with Release, read with Acquire.
pub struct SharedState {
    pub running: AtomicBool,
    pub enabled: AtomicBool,
    pub debug: AtomicBool,
}

impl SharedState {
    pub fn new(enabled: bool) -> Arc<Self> {
        Arc::new(Self {
            running: AtomicBool::new(true),
            enabled: AtomicBool::new(enabled),
            debug: AtomicBool::new(false),
        })
    }
}

/// Counts completed cycles, reporting once per rolled second.
struct FpsCounter {
    window_start: Instant,
    frames: u32,
}

impl FpsCounter {
    fn new(now: Instant) -> Self {
        Self { window_start: now, frames: 0 }
    }

    fn tick(&mut self, now: Instant) -> Option<u32> {
        self.frames += 1;
        if now.duration_since(self.window_start) >= Duration::from_secs(1) {
            let rate = self.frames;
            self.frames = 0;
            self.window_start = now;
            return Some(rate);
        }
        None
    }
}

/// The scan/decide/act loop. Owns the capture source, the pointer (for
/// anchor queries), the actuation channel, and the per-run state of the
/// corrector and trigger.
pub struct Engine {
    cfg: Config,
    frames: Box<dyn FrameSource>,
    pointer: Box<dyn Injector>,
    keys: Arc<dyn KeyPoller>,
    channel: Box<dyn ActuationChannel>,
    state: Arc<SharedState>,
    corrector: Corrector,
    trigger: Trigger,
    channel_down: bool,
}

impl Engine {
    pub fn new(
        cfg: Config,
        frames: Box<dyn FrameSource>,
        pointer: Box<dyn Injector>,
        keys: Arc<dyn KeyPoller>,
        channel: Box<dyn ActuationChannel>,
        state: Arc<SharedState>,
    ) -> Self {
        logger::register_prefix("engine", logger::COLOR_BLUE);
        let corrector = Corrector::new(cfg.aim.clone());
        let trigger = Trigger::new(cfg.trigger);
        Self {
            cfg,
            frames,
            pointer,
            keys,
            channel,
            state,
            corrector,
            trigger,
            channel_down: false,
        }
    }

    /// Run cycles until the running flag drops. Err only on an
    /// unrecoverable capture failure; a lost device is not fatal.
    pub fn run(&mut self) -> Result<()> {
        let profile = match self.cfg.color.active_profile() {
            Some(p) => p,
            None => {
                logger::warn(&format!(
                    "unknown color profile \"{}\", using red",
                    self.cfg.color.profile
                ));
                ColorConfig::default().red
            }
        };

        let interval = Duration::from_millis(1000 / self.cfg.scan.rate.max(1) as u64);
        let (screen_w, screen_h) = self.frames.screen_size();
        let center = roi::screen_center(screen_w, screen_h);
        logger::info_p(
            "engine",
            &format!(
                "scanning {}x{} region on {}x{} via {}",
                self.cfg.scan.region_size, self.cfg.scan.region_size, screen_w, screen_h,
                self.channel.name()
            ),
        );

        let mut rng = rand::thread_rng();
        let mut fps = FpsCounter::new(Instant::now());
        let mut seconds = 0u64;
        let mut capture_failures = 0u32;
        let mut had_target = false;
        let mut next_cycle = Instant::now();
        #[cfg(feature = "debug-capture")]
        let mut last_dump: Option<Instant> = None;

        while self.state.running.load(Ordering::Acquire) {
            let now = Instant::now();
            if now < next_cycle {
                sleep_ms(1);
                continue;
            }
            next_cycle = now + interval;

            if !self.state.enabled.load(Ordering::Acquire) {
                self.corrector.reset();
                self.trigger.observe(false, now, &mut rng);
                had_target = false;
                sleep_ms(50);
                continue;
            }

            let anchor = match self.cfg.scan.anchor {
                AnchorMode::Center => center,
                AnchorMode::Pointer => self.pointer.position().unwrap_or(center),
            };
            let rect = roi::capture_rect(anchor, self.cfg.scan.region_size, screen_w, screen_h);

            let frame = match self.frames.grab(&rect) {
                Ok(f) => {
                    capture_failures = 0;
                    f
                }
                Err(e) => {
                    capture_failures += 1;
                    logger::warn(&format!("capture failed ({}): {e:#}", capture_failures));
                    if capture_failures >= MAX_CAPTURE_FAILURES {
                        return Err(anyhow!(
                            "capture failed {} times in a row",
                            MAX_CAPTURE_FAILURES
                        ));
                    }
                    continue;
                }
            };

            let mask = segment::segment(&frame, &profile);
            let target = extract::find_target(
                &mask,
                self.cfg.scan.min_area,
                &frame.rect,
                self.cfg.aim.vertical_offset,
            );

            match (&target, had_target) {
                (Some(t), false) => logger::info_p(
                    "engine",
                    &format!("target acquired at ({}, {}), area {}", t.x, t.y, t.area),
                ),
                (None, true) => logger::info_p("engine", "target lost"),
                _ => {}
            }
            had_target = target.is_some();

            if let Some(t) = target {
                if self.keys.is_down(self.cfg.keys.assist) {
                    let skip = self.cfg.humanize.intermittent
                        && rng.gen_range(1..=100u32) > self.cfg.humanize.assist_percentage;
                    if !skip {
                        let offset = self.corrector.correct(anchor, (t.x, t.y), &mut rng);
                        if !offset.is_zero() {
                            self.dispatch_move(offset, &mut rng);
                        }
                    }
                } else {
                    self.corrector.reset();
                }

                if let Some(plan) = self.trigger.observe(true, Instant::now(), &mut rng) {
                    sleep_ms(plan.delay_ms);
                    self.dispatch(ActuationCommand::Click(plan.hold_ms as u32));
                    if self.state.debug.load(Ordering::Acquire) {
                        logger::info_p(
                            "engine",
                            &format!("fired after {}ms, hold {}ms", plan.delay_ms, plan.hold_ms),
                        );
                    }
                }
            } else {
                self.corrector.reset();
                self.trigger.observe(false, Instant::now(), &mut rng);
            }

            #[cfg(feature = "debug-capture")]
            if self.state.debug.load(Ordering::Acquire)
                && last_dump.map_or(true, |t| t.elapsed() >= Duration::from_secs(1))
            {
                let dir = self.cfg.log_dir.join("captures");
                if let Err(e) = crate::diag::dump(&dir, &frame, &mask) {
                    logger::warn(&format!("capture dump failed: {e:#}"));
                }
                last_dump = Some(Instant::now());
            }

            if let Some(rate) = fps.tick(Instant::now()) {
                seconds += 1;
                if self.state.debug.load(Ordering::Acquire) || seconds % 30 == 0 {
                    logger::info_p("engine", &format!("{} fps", rate));
                }
            }
        }

        self.channel.shutdown();
        logger::info_p("engine", "stopped");
        Ok(())
    }

    fn dispatch_move<R: Rng>(&mut self, offset: Offset, rng: &mut R) {
        if self.cfg.humanize.stagger {
            for step in aim::stagger_steps(offset, &self.cfg.humanize, rng) {
                if step.dx != 0 || step.dy != 0 {
                    self.dispatch(ActuationCommand::Move(step.dx, step.dy));
                }
                if step.delay_ms > 0 {
                    sleep_ms(step.delay_ms);
                }
            }
        } else {
            self.dispatch(ActuationCommand::Move(offset.dx, offset.dy));
        }
    }

    /// Send one command, logging channel transitions instead of every
    /// failure. A down channel drops commands until it comes back.
    fn dispatch(&mut self, cmd: ActuationCommand) {
        match self.channel.send(cmd) {
            Ok(()) => {
                if self.channel_down {
                    self.channel_down = false;
                    logger::info_p("engine", "actuation channel restored");
                }
            }
            Err(ChannelError::Disconnected) => {
                if !self.channel_down {
                    self.channel_down = true;
                    logger::error_p("engine", "actuation channel down, dropping commands");
                }
            }
            Err(e) => logger::warn_p("engine", &format!("send failed: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::thread;

    use crate::channel::encode;
    use crate::config::Key;
    use crate::platform::stub::{StubFrameSource, StubInjector, StubKeyPoller};
    use crate::types::{Frame, RegionRect};

    #[test]
    fn fps_counter_reports_once_per_second() {
        let t0 = Instant::now();
        let mut fps = FpsCounter::new(t0);

        for i in 1..=59 {
            assert_eq!(fps.tick(t0 + Duration::from_millis(i * 16)), None);
        }
        assert_eq!(fps.tick(t0 + Duration::from_millis(1000)), Some(60));
        // Window restarts from the rollover tick.
        assert_eq!(fps.tick(t0 + Duration::from_millis(1016)), None);
        assert_eq!(fps.tick(t0 + Duration::from_millis(2000)), Some(2));
    }

    /// Frame source that paints a red square in the middle of every
    /// requested region.
    struct PaintedSource {
        width: u32,
        height: u32,
    }

    impl FrameSource for PaintedSource {
        fn screen_size(&self) -> (u32, u32) {
            (self.width, self.height)
        }

        fn grab(&mut self, rect: &RegionRect) -> Result<Frame> {
            let mut data = vec![0u8; (rect.width * rect.height * 4) as usize];
            let cx = rect.width / 2;
            let cy = rect.height / 2;
            for y in cy.saturating_sub(10)..(cy + 10).min(rect.height) {
                for x in cx.saturating_sub(10)..(cx + 10).min(rect.width) {
                    let idx = ((y * rect.width + x) * 4) as usize;
                    data[idx] = 255;
                    data[idx + 3] = 255;
                }
            }
            Ok(Frame { data, width: rect.width, height: rect.height, rect: *rect })
        }
    }

    struct RecordingChannel {
        sent: Arc<Mutex<Vec<String>>>,
    }

    impl ActuationChannel for RecordingChannel {
        fn name(&self) -> &'static str {
            "recording"
        }
        fn connected(&self) -> bool {
            true
        }
        fn send(&mut self, cmd: ActuationCommand) -> std::result::Result<(), ChannelError> {
            self.sent.lock().unwrap().push(encode(cmd));
            Ok(())
        }
        fn reconnect(&mut self) -> std::result::Result<(), ChannelError> {
            Ok(())
        }
        fn shutdown(&mut self) {}
    }

    fn wait_for<F: Fn() -> bool>(cond: F) -> bool {
        for _ in 0..400 {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    fn test_config() -> Config {
        let mut cfg = Config::default();
        cfg.scan.rate = 250;
        cfg.humanize.intermittent = false;
        cfg.trigger.reaction_ms = [0, 0];
        cfg.trigger.hold_ms = [10, 10];
        cfg.trigger.min_gap_ms = 0;
        cfg
    }

    fn run_engine(
        cfg: Config,
        frames: Box<dyn FrameSource>,
        keys: Arc<dyn KeyPoller>,
    ) -> (Arc<SharedState>, Arc<Mutex<Vec<String>>>, thread::JoinHandle<Result<()>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let channel = RecordingChannel { sent: Arc::clone(&sent) };
        let state = SharedState::new(true);
        let mut engine = Engine::new(
            cfg,
            frames,
            Box::new(StubInjector),
            keys,
            Box::new(channel),
            Arc::clone(&state),
        );
        let handle = thread::spawn(move || engine.run());
        (state, sent, handle)
    }

    #[test]
    fn empty_frames_produce_no_commands() {
        let frames = Box::new(StubFrameSource::new(640, 480));
        let keys: Arc<dyn KeyPoller> = Arc::new(StubKeyPoller::new());
        let (state, sent, handle) = run_engine(test_config(), frames, keys);

        thread::sleep(Duration::from_millis(100));
        state.running.store(false, Ordering::Release);
        handle.join().unwrap().unwrap();
        assert!(sent.lock().unwrap().is_empty());
    }

    #[test]
    fn persistent_target_fires_clicks() {
        let frames = Box::new(PaintedSource { width: 640, height: 480 });
        let keys: Arc<dyn KeyPoller> = Arc::new(StubKeyPoller::new());
        let (state, sent, handle) = run_engine(test_config(), frames, keys);

        let clicked = wait_for(|| sent.lock().unwrap().iter().any(|s| s == "C,10"));
        state.running.store(false, Ordering::Release);
        handle.join().unwrap().unwrap();
        assert!(clicked, "no click dispatched");
        // No correction without the assist key held.
        assert!(!sent.lock().unwrap().iter().any(|s| s.starts_with("M,")));
    }

    #[test]
    fn assist_key_enables_correction() {
        let frames = Box::new(PaintedSource { width: 640, height: 480 });
        let poller = Arc::new(StubKeyPoller::new());
        poller.set_down(Key::Shift, true);
        let keys: Arc<dyn KeyPoller> = poller;
        let (state, sent, handle) = run_engine(test_config(), frames, keys);

        let moved = wait_for(|| sent.lock().unwrap().iter().any(|s| s.starts_with("M,")));
        state.running.store(false, Ordering::Release);
        handle.join().unwrap().unwrap();
        assert!(moved, "no movement dispatched");
    }

    #[test]
    fn disabled_state_idles() {
        let frames = Box::new(PaintedSource { width: 640, height: 480 });
        let poller = Arc::new(StubKeyPoller::new());
        poller.set_down(Key::Shift, true);
        let keys: Arc<dyn KeyPoller> = poller;

        let (state, sent, handle) = run_engine(test_config(), frames, keys);
        state.enabled.store(false, Ordering::Release);
        thread::sleep(Duration::from_millis(150));
        let count = sent.lock().unwrap().len();
        thread::sleep(Duration::from_millis(150));
        // A few commands may land before the flag is seen; none after.
        assert_eq!(sent.lock().unwrap().len(), count);

        state.running.store(false, Ordering::Release);
        handle.join().unwrap().unwrap();
    }
}
