use std::collections::HashSet;
use std::sync::Mutex;

use anyhow::Result;

use crate::config::Key;
use crate::logger;
use crate::types::{Frame, RegionRect};

use super::{FrameSource, Injector, KeyPoller};

pub struct StubFrameSource {
    width: u32,
    height: u32,
    grabs: u64,
}

impl StubFrameSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, grabs: 0 }
    }
}

impl FrameSource for StubFrameSource {
    fn screen_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn grab(&mut self, rect: &RegionRect) -> Result<Frame> {
        // Logged once; the scan loop calls this at frame rate.
        if self.grabs == 0 {
            logger::info_p(
                "stub",
                &format!("grab({},{} {}x{})", rect.left, rect.top, rect.width, rect.height),
            );
        }
        self.grabs += 1;
        Ok(Frame {
            data: vec![0; (rect.width * rect.height * 4) as usize],
            width: rect.width,
            height: rect.height,
            rect: *rect,
        })
    }
}

pub struct StubInjector;

impl Injector for StubInjector {
    fn move_rel(&mut self, dx: i32, dy: i32) -> Result<()> {
        logger::info_p("stub", &format!("move_rel({}, {})", dx, dy));
        Ok(())
    }

    fn press_left(&mut self) -> Result<()> {
        logger::info_p("stub", "press_left()");
        Ok(())
    }

    fn release_left(&mut self) -> Result<()> {
        logger::info_p("stub", "release_left()");
        Ok(())
    }

    fn click_right(&mut self) -> Result<()> {
        logger::info_p("stub", "click_right()");
        Ok(())
    }

    fn position(&mut self) -> Result<(i32, i32)> {
        Ok((960, 540))
    }
}

pub struct StubKeyPoller {
    down: Mutex<HashSet<Key>>,
}

impl StubKeyPoller {
    pub fn new() -> Self {
        Self { down: Mutex::new(HashSet::new()) }
    }

    pub fn set_down(&self, key: Key, down: bool) {
        let mut set = self.down.lock().unwrap();
        if down {
            set.insert(key);
        } else {
            set.remove(&key);
        }
    }
}

impl KeyPoller for StubKeyPoller {
    fn is_down(&self, key: Key) -> bool {
        self.down.lock().unwrap().contains(&key)
    }
}
