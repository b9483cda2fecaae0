use crate::types::{ColorProfile, ColorRange};

/// Convert an RGB pixel to HSV on the byte scale the color ranges use:
/// hue 0-180 (degrees halved), saturation and value 0-255.
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> [u8; 3] {
    let rf = r as f32 / 255.0;
    let gf = g as f32 / 255.0;
    let bf = b as f32 / 255.0;

    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let mut h_deg = if delta == 0.0 {
        0.0
    } else if max == rf {
        60.0 * ((gf - bf) / delta)
    } else if max == gf {
        60.0 * ((bf - rf) / delta + 2.0)
    } else {
        60.0 * ((rf - gf) / delta + 4.0)
    };
    if h_deg < 0.0 {
        h_deg += 360.0;
    }

    let h = ((h_deg / 2.0).round() as u16 % 180) as u8;
    let s = if max == 0.0 {
        0
    } else {
        ((delta / max) * 255.0).round() as u8
    };
    let v = (max * 255.0).round() as u8;

    [h, s, v]
}

/// Inclusive bounds check on all three components.
pub fn in_range(hsv: [u8; 3], range: &ColorRange) -> bool {
    (0..3).all(|i| range.lower[i] <= hsv[i] && hsv[i] <= range.upper[i])
}

/// True if the pixel falls inside the primary range or the wrap range.
pub fn matches_profile(hsv: [u8; 3], profile: &ColorProfile) -> bool {
    in_range(hsv, &profile.primary)
        || profile.wrap.as_ref().map_or(false, |r| in_range(hsv, r))
}
