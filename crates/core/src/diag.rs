use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;

use crate::types::{Frame, Mask};

/// Writes the frame and its mask as PNGs for offline tuning.
/// Files are named by wall-clock time so consecutive dumps sort.
pub fn dump(dir: &Path, frame: &Frame, mask: &Mask) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let stamp = Local::now().format("%Y%m%d_%H%M%S%.3f");

    let frame_path = dir.join(format!("{stamp}_frame.png"));
    image::save_buffer(
        &frame_path,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
    )
    .with_context(|| format!("write {}", frame_path.display()))?;

    // Mask bytes are 0/1; stretch to full range so the PNG is readable.
    let visible: Vec<u8> = mask.data.iter().map(|&v| if v != 0 { 255 } else { 0 }).collect();
    let mask_path = dir.join(format!("{stamp}_mask.png"));
    image::save_buffer(
        &mask_path,
        &visible,
        mask.width,
        mask.height,
        image::ColorType::L8,
    )
    .with_context(|| format!("write {}", mask_path.display()))?;

    Ok(())
}
