use std::collections::BTreeMap;

use crate::types::{Blob, Mask, RegionRect, Target};

struct DisjointSet {
    parent: Vec<u32>,
}

impl DisjointSet {
    fn new() -> Self {
        Self { parent: Vec::new() }
    }

    fn make(&mut self) -> u32 {
        let id = self.parent.len() as u32;
        self.parent.push(id);
        id
    }

    fn find(&mut self, mut x: u32) -> u32 {
        while self.parent[x as usize] != x {
            let p = self.parent[x as usize];
            self.parent[x as usize] = self.parent[p as usize];
            x = self.parent[x as usize];
        }
        x
    }

    // Union toward the lower id, so root order stays first-encounter order
    fn union(&mut self, a: u32, b: u32) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[hi as usize] = lo;
        }
    }
}

#[derive(Default)]
struct BlobStats {
    area: u32,
    sum_x: u64,
    sum_y: u64,
}

/// Connected foreground regions (4-connectivity), ordered by first pixel
/// in row-major scan order. Centroids are exact area moments.
pub fn blobs(mask: &Mask) -> Vec<Blob> {
    let w = mask.width as usize;
    let h = mask.height as usize;
    if w == 0 || h == 0 {
        return Vec::new();
    }

    // First pass: provisional labels, merging left/up neighbors
    let mut labels = vec![0u32; w * h]; // 0 = background, else id + 1
    let mut set = DisjointSet::new();

    for y in 0..h {
        for x in 0..w {
            if mask.data[y * w + x] == 0 {
                continue;
            }
            let left = if x > 0 { labels[y * w + x - 1] } else { 0 };
            let up = if y > 0 { labels[(y - 1) * w + x] } else { 0 };

            let label = match (left, up) {
                (0, 0) => set.make() + 1,
                (l, 0) => l,
                (0, u) => u,
                (l, u) => {
                    set.union(l - 1, u - 1);
                    l.min(u)
                }
            };
            labels[y * w + x] = label;
        }
    }

    // Second pass: accumulate per-root area and coordinate sums
    let mut stats: BTreeMap<u32, BlobStats> = BTreeMap::new();
    for y in 0..h {
        for x in 0..w {
            let label = labels[y * w + x];
            if label == 0 {
                continue;
            }
            let root = set.find(label - 1);
            let s = stats.entry(root).or_default();
            s.area += 1;
            s.sum_x += x as u64;
            s.sum_y += y as u64;
        }
    }

    stats
        .into_values()
        .map(|s| Blob {
            area: s.area,
            cx: s.sum_x as f64 / s.area as f64,
            cy: s.sum_y as f64 / s.area as f64,
        })
        .collect()
}

/// Pick the largest blob strictly above `min_area` and promote it to a
/// screen-coordinate target. Ties on area keep the earlier blob in scan
/// order (topmost, then leftmost first pixel). None when nothing
/// qualifies; that is a normal cycle outcome, not an error.
pub fn find_target(
    mask: &Mask,
    min_area: u32,
    rect: &RegionRect,
    vertical_offset: i32,
) -> Option<Target> {
    let mut best: Option<Blob> = None;
    for blob in blobs(mask) {
        if blob.area <= min_area {
            continue;
        }
        if best.map_or(true, |b| blob.area > b.area) {
            best = Some(blob);
        }
    }

    best.map(|b| Target {
        x: rect.left + b.cx.round() as i32,
        y: rect.top + b.cy.round() as i32 + vertical_offset,
        area: b.area,
    })
}
