use anyhow::{anyhow, Result};
use enigo::{Button, Coordinate, Direction, Enigo, Mouse, Settings};

use super::Injector;

/// Pointer injection through the OS input stack.
pub struct EnigoInjector {
    enigo: Enigo,
}

impl EnigoInjector {
    pub fn new() -> Result<Self> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| anyhow!("input backend init failed: {e}"))?;
        Ok(Self { enigo })
    }
}

impl Injector for EnigoInjector {
    fn move_rel(&mut self, dx: i32, dy: i32) -> Result<()> {
        self.enigo
            .move_mouse(dx, dy, Coordinate::Rel)
            .map_err(|e| anyhow!("pointer move failed: {e}"))
    }

    fn press_left(&mut self) -> Result<()> {
        self.enigo
            .button(Button::Left, Direction::Press)
            .map_err(|e| anyhow!("button press failed: {e}"))
    }

    fn release_left(&mut self) -> Result<()> {
        self.enigo
            .button(Button::Left, Direction::Release)
            .map_err(|e| anyhow!("button release failed: {e}"))
    }

    fn click_right(&mut self) -> Result<()> {
        self.enigo
            .button(Button::Right, Direction::Click)
            .map_err(|e| anyhow!("right click failed: {e}"))
    }

    fn position(&mut self) -> Result<(i32, i32)> {
        self.enigo
            .location()
            .map_err(|e| anyhow!("pointer query failed: {e}"))
    }
}
