use serde::{Deserialize, Serialize};

/// Screen-coordinate rectangle captured for one cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegionRect {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

/// Raw capture pixel data (RGBA, tightly packed) plus its screen rectangle
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub rect: RegionRect,
}

impl Frame {
    /// RGBA bytes of the pixel at (x, y).
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = ((y * self.width + x) * 4) as usize;
        [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ]
    }
}

/// Inclusive lower/upper bounds in HSV (hue 0-180, sat/val 0-255)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColorRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

/// A primary range plus an optional wraparound range near the hue seam.
/// Masks of the two are unioned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColorProfile {
    pub primary: ColorRange,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrap: Option<ColorRange>,
}

/// Binary image derived from a frame; 1 = target-colored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Mask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            data: vec![0; (width * height) as usize],
            width,
            height,
        }
    }

    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.data[(y * self.width + x) as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, v: u8) {
        self.data[(y * self.width + x) as usize] = v;
    }

    /// Number of foreground pixels.
    pub fn count(&self) -> u32 {
        self.data.iter().filter(|&&v| v != 0).count() as u32
    }
}

/// Connected foreground region of a mask, buffer-local coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blob {
    pub area: u32,
    pub cx: f64,
    pub cy: f64,
}

/// The selected blob promoted to screen coordinates, aim offset applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub x: i32,
    pub y: i32,
    pub area: u32,
}

/// Signed correction in device-movement units, clamped per axis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Offset {
    pub dx: i32,
    pub dy: i32,
}

impl Offset {
    pub fn is_zero(&self) -> bool {
        self.dx == 0 && self.dy == 0
    }
}

/// Unit of work handed to an actuation channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuationCommand {
    Move(i32, i32),
    Click(u32),
    RightClick,
    Ping,
}
