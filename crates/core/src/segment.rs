use crate::hsv;
use crate::types::{ColorProfile, Frame, Mask};

// 5x5 box structuring element
const KERNEL_RADIUS: i32 = 2;

/// Build the binary target mask for a frame: threshold against the
/// profile's ranges, then open (speckle removal) and close (gap fill).
/// The result always has the frame's dimensions.
pub fn segment(frame: &Frame, profile: &ColorProfile) -> Mask {
    let raw = threshold(frame, profile);
    close(&open(&raw))
}

fn threshold(frame: &Frame, profile: &ColorProfile) -> Mask {
    let mut mask = Mask::new(frame.width, frame.height);
    for y in 0..frame.height {
        for x in 0..frame.width {
            let [r, g, b, _] = frame.pixel(x, y);
            if hsv::matches_profile(hsv::rgb_to_hsv(r, g, b), profile) {
                mask.set(x, y, 1);
            }
        }
    }
    mask
}

/// Erosion then dilation. Removes regions thinner than the kernel.
fn open(mask: &Mask) -> Mask {
    dilate(&erode(mask))
}

/// Dilation then erosion. Fills holes smaller than the kernel.
fn close(mask: &Mask) -> Mask {
    erode(&dilate(mask))
}

fn erode(mask: &Mask) -> Mask {
    let w = mask.width as i32;
    let h = mask.height as i32;
    let mut out = Mask::new(mask.width, mask.height);

    for y in 0..h {
        for x in 0..w {
            let mut keep = true;
            'window: for dy in -KERNEL_RADIUS..=KERNEL_RADIUS {
                for dx in -KERNEL_RADIUS..=KERNEL_RADIUS {
                    let nx = x + dx;
                    let ny = y + dy;
                    // Pixels past the border do not veto
                    if nx < 0 || ny < 0 || nx >= w || ny >= h {
                        continue;
                    }
                    if mask.get(nx as u32, ny as u32) == 0 {
                        keep = false;
                        break 'window;
                    }
                }
            }
            if keep {
                out.set(x as u32, y as u32, 1);
            }
        }
    }
    out
}

fn dilate(mask: &Mask) -> Mask {
    let w = mask.width as i32;
    let h = mask.height as i32;
    let mut out = Mask::new(mask.width, mask.height);

    for y in 0..h {
        for x in 0..w {
            'window: for dy in -KERNEL_RADIUS..=KERNEL_RADIUS {
                for dx in -KERNEL_RADIUS..=KERNEL_RADIUS {
                    let nx = x + dx;
                    let ny = y + dy;
                    if nx < 0 || ny < 0 || nx >= w || ny >= h {
                        continue;
                    }
                    if mask.get(nx as u32, ny as u32) != 0 {
                        out.set(x as u32, y as u32, 1);
                        break 'window;
                    }
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ColorRange, RegionRect};

    fn red_profile() -> ColorProfile {
        ColorProfile {
            primary: ColorRange { lower: [0, 100, 150], upper: [10, 255, 255] },
            wrap: Some(ColorRange { lower: [170, 100, 150], upper: [180, 255, 255] }),
        }
    }

    fn blank_frame(w: u32, h: u32) -> Frame {
        Frame {
            data: vec![0; (w * h * 4) as usize],
            width: w,
            height: h,
            rect: RegionRect { left: 0, top: 0, width: w, height: h },
        }
    }

    fn paint(frame: &mut Frame, x0: u32, y0: u32, x1: u32, y1: u32, rgb: [u8; 3]) {
        for y in y0..=y1 {
            for x in x0..=x1 {
                let idx = ((y * frame.width + x) * 4) as usize;
                frame.data[idx] = rgb[0];
                frame.data[idx + 1] = rgb[1];
                frame.data[idx + 2] = rgb[2];
                frame.data[idx + 3] = 255;
            }
        }
    }

    #[test]
    fn mask_keeps_frame_dimensions() {
        let frame = blank_frame(7, 5);
        let mask = segment(&frame, &red_profile());
        assert_eq!((mask.width, mask.height), (7, 5));
    }

    #[test]
    fn empty_frame_yields_empty_mask() {
        let frame = blank_frame(0, 0);
        let mask = segment(&frame, &red_profile());
        assert_eq!(mask.data.len(), 0);
    }

    #[test]
    fn threshold_unions_both_ranges() {
        let mut frame = blank_frame(3, 1);
        paint(&mut frame, 0, 0, 0, 0, [255, 0, 0]); // hue 0, primary
        paint(&mut frame, 1, 0, 1, 0, [255, 0, 20]); // hue ~178, wrap
        paint(&mut frame, 2, 0, 2, 0, [0, 255, 0]); // green, neither

        let mask = threshold(&frame, &red_profile());
        assert_eq!(mask.get(0, 0), 1);
        assert_eq!(mask.get(1, 0), 1);
        assert_eq!(mask.get(2, 0), 0);
    }

    #[test]
    fn open_removes_isolated_speckle() {
        let mut mask = Mask::new(11, 11);
        mask.set(5, 5, 1);
        let cleaned = open(&mask);
        assert_eq!(cleaned.count(), 0);
    }

    #[test]
    fn close_fills_small_hole() {
        let mut mask = Mask::new(9, 9);
        for y in 0..9 {
            for x in 0..9 {
                mask.set(x, y, 1);
            }
        }
        mask.set(4, 4, 0);
        let filled = close(&mask);
        assert_eq!(filled.get(4, 4), 1);
    }

    #[test]
    fn solid_block_survives_cleanup() {
        let mut frame = blank_frame(16, 16);
        paint(&mut frame, 4, 4, 11, 11, [255, 0, 0]);

        let mask = segment(&frame, &red_profile());
        assert_eq!(mask.get(7, 7), 1);
        assert_eq!(mask.get(0, 0), 0);
    }
}
