use anyhow::{anyhow, Result};
use screenshots::Screen;

use crate::types::{Frame, RegionRect};

use super::FrameSource;

/// Grabs regions of the primary display.
pub struct ScreenSource {
    screen: Screen,
}

impl ScreenSource {
    pub fn primary() -> Result<Self> {
        let screens = Screen::all().map_err(|e| anyhow!("screen enumeration failed: {e}"))?;
        let screen = screens
            .iter()
            .find(|s| s.display_info.is_primary)
            .or_else(|| screens.first())
            .copied()
            .ok_or_else(|| anyhow!("no screens found"))?;
        Ok(Self { screen })
    }
}

impl FrameSource for ScreenSource {
    fn screen_size(&self) -> (u32, u32) {
        (self.screen.display_info.width, self.screen.display_info.height)
    }

    fn grab(&mut self, rect: &RegionRect) -> Result<Frame> {
        let img = self
            .screen
            .capture_area(rect.left, rect.top, rect.width, rect.height)
            .map_err(|e| anyhow!("capture failed: {e}"))?;
        let width = img.width();
        let height = img.height();
        // The backend may hand back fewer pixels than asked near the
        // display edge. The frame keeps the real dimensions so the
        // centroid math stays consistent with the buffer.
        Ok(Frame {
            data: img.into_raw(),
            width,
            height,
            rect: RegionRect {
                left: rect.left,
                top: rect.top,
                width,
                height,
            },
        })
    }
}
