use crate::types::RegionRect;

/// Center of the screen, the default anchor.
pub fn screen_center(width: u32, height: u32) -> (i32, i32) {
    ((width / 2) as i32, (height / 2) as i32)
}

/// Square capture rectangle of side `size` around the anchor, clamped
/// to the screen. Near an edge the rectangle shrinks rather than
/// wrapping; the anchor itself is clamped on-screen first.
pub fn capture_rect(anchor: (i32, i32), size: u32, screen_w: u32, screen_h: u32) -> RegionRect {
    let half = (size / 2) as i32;
    let ax = anchor.0.clamp(0, screen_w.saturating_sub(1) as i32);
    let ay = anchor.1.clamp(0, screen_h.saturating_sub(1) as i32);

    let left = (ax - half).max(0);
    let top = (ay - half).max(0);
    let width = size.min(screen_w.saturating_sub(left as u32));
    let height = size.min(screen_h.saturating_sub(top as u32));

    RegionRect { left, top, width, height }
}
