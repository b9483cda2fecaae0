use rand::Rng;

use crate::config::{AimConfig, HumanizeConfig};
use crate::types::Offset;

/// One movement sub-step and the pause that follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaggerStep {
    pub dx: i32,
    pub dy: i32,
    pub delay_ms: u64,
}

/// Turns an anchor/target pair into a bounded correction. Carries the
/// previous cycle's vector for the inertia blend and the active gain
/// pattern row between cycles.
pub struct Corrector {
    cfg: AimConfig,
    prev: Option<(f64, f64)>,
    pattern_idx: usize,
}

impl Corrector {
    pub fn new(cfg: AimConfig) -> Self {
        Self { cfg, prev: None, pattern_idx: 0 }
    }

    /// Forget motion history (target lost, assist released, disabled).
    pub fn reset(&mut self) {
        self.prev = None;
    }

    pub fn correct<R: Rng>(
        &mut self,
        anchor: (i32, i32),
        target: (i32, i32),
        rng: &mut R,
    ) -> Offset {
        let dx = (target.0 - anchor.0) as f64;
        let dy = (target.1 - anchor.1) as f64;
        let distance = (dx * dx + dy * dy).sqrt();

        if distance <= self.cfg.deadzone {
            return Offset::default();
        }

        let progress = (distance / self.cfg.reference_distance).min(1.0);
        let mut strength = self.cfg.smoothing + (1.0 - self.cfg.smoothing) * progress;

        if !self.cfg.patterns.is_empty() {
            if self.cfg.pattern_switch_chance > 0.0
                && rng.gen_bool(self.cfg.pattern_switch_chance.min(1.0))
            {
                self.pattern_idx = rng.gen_range(0..self.cfg.patterns.len());
            }
            let phase = ((progress * 3.0) as usize).min(2);
            let row = &self.cfg.patterns[self.pattern_idx % self.cfg.patterns.len()];
            strength *= row[phase];
        }

        let mut ax = dx * self.cfg.speed * strength;
        let mut ay = dy * self.cfg.speed * strength;

        if let Some((px, py)) = self.prev {
            let w = self.cfg.inertia;
            ax = ax * (1.0 - w) + px * w;
            ay = ay * (1.0 - w) + py * w;
        }

        if self.cfg.jitter > 0.0 {
            ax += rng.gen_range(-self.cfg.jitter..=self.cfg.jitter);
            ay += rng.gen_range(-self.cfg.jitter..=self.cfg.jitter);
        }

        self.prev = Some((ax, ay));

        let cap = self.cfg.max_adjustment;
        Offset {
            dx: (ax.round() as i32).clamp(-cap, cap),
            dy: (ay.round() as i32).clamp(-cap, cap),
        }
    }
}

/// Split an offset into randomized sub-steps that sum exactly to the
/// offset. Rounding remainders land on the last step.
pub fn stagger_steps<R: Rng>(
    offset: Offset,
    cfg: &HumanizeConfig,
    rng: &mut R,
) -> Vec<StaggerStep> {
    let lo = cfg.stagger_steps[0].max(1);
    let hi = cfg.stagger_steps[1].max(lo);
    let n = rng.gen_range(lo..=hi) as usize;

    let weights: Vec<f64> = (0..n).map(|_| rng.gen_range(0.5..1.5)).collect();
    let total: f64 = weights.iter().sum();

    let delay_lo = cfg.stagger_delay_ms[0];
    let delay_hi = cfg.stagger_delay_ms[1].max(delay_lo);

    let mut steps = Vec::with_capacity(n);
    let mut cum = 0.0;
    let mut acc_x = 0i32;
    let mut acc_y = 0i32;
    for (i, w) in weights.iter().enumerate() {
        cum += w / total;
        let (tx, ty) = if i + 1 == n {
            (offset.dx, offset.dy)
        } else {
            (
                (offset.dx as f64 * cum).round() as i32,
                (offset.dy as f64 * cum).round() as i32,
            )
        };
        let delay_ms = if i + 1 < n {
            rng.gen_range(delay_lo..=delay_hi)
        } else {
            0
        };
        steps.push(StaggerStep { dx: tx - acc_x, dy: ty - acc_y, delay_ms });
        acc_x = tx;
        acc_y = ty;
    }
    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn plain_cfg() -> AimConfig {
        AimConfig {
            speed: 1.0,
            smoothing: 0.5,
            max_adjustment: 1000,
            vertical_offset: 0,
            deadzone: 4.0,
            reference_distance: 300.0,
            inertia: 0.0,
            jitter: 0.0,
            patterns: Vec::new(),
            pattern_switch_chance: 0.0,
        }
    }

    #[test]
    fn inside_deadzone_returns_zero() {
        let mut c = Corrector::new(plain_cfg());
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(c.correct((100, 100), (100, 100), &mut rng), Offset::default());
        assert_eq!(c.correct((100, 100), (103, 100), &mut rng), Offset::default());
    }

    #[test]
    fn offsets_never_exceed_max_adjustment() {
        let mut cfg = AimConfig::default();
        cfg.max_adjustment = 100;
        let mut c = Corrector::new(cfg);
        let mut rng = StdRng::seed_from_u64(2);

        for target in [(5000, -5000), (300, 80), (-2000, 12), (15, -900)] {
            let off = c.correct((0, 0), target, &mut rng);
            assert!(off.dx.abs() <= 100, "dx {} out of range", off.dx);
            assert!(off.dy.abs() <= 100, "dy {} out of range", off.dy);
        }
    }

    #[test]
    fn farther_targets_pull_proportionally_harder() {
        let mut c = Corrector::new(plain_cfg());
        let mut rng = StdRng::seed_from_u64(3);

        let near = c.correct((0, 0), (50, 0), &mut rng);
        c.reset();
        let far = c.correct((0, 0), (200, 0), &mut rng);

        let near_gain = near.dx as f64 / 50.0;
        let far_gain = far.dx as f64 / 200.0;
        assert!(far_gain > near_gain);
    }

    #[test]
    fn inertia_blends_with_previous_cycle() {
        let mut cfg = plain_cfg();
        cfg.inertia = 0.5;
        let mut c = Corrector::new(cfg);
        let mut rng = StdRng::seed_from_u64(4);

        // strength 2/3 at distance 100 -> 66.67 stored
        let first = c.correct((0, 0), (100, 0), &mut rng);
        assert_eq!(first.dx, 67);
        // raw 300 at full strength, blended with 66.67
        let second = c.correct((0, 0), (300, 0), &mut rng);
        assert_eq!(second.dx, 183);
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let run = |seed: u64| {
            let mut c = Corrector::new(AimConfig::default());
            let mut rng = StdRng::seed_from_u64(seed);
            (0..20)
                .map(|i| c.correct((0, 0), (40 + i * 13, -25 + i * 7), &mut rng))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(9), run(9));
    }

    #[test]
    fn stagger_steps_sum_exactly() {
        let cfg = HumanizeConfig::default();
        for seed in 0..25 {
            let mut rng = StdRng::seed_from_u64(seed);
            let offset = Offset { dx: 37, dy: -13 };
            let steps = stagger_steps(offset, &cfg, &mut rng);

            assert!(steps.len() >= 2 && steps.len() <= 4);
            let sx: i32 = steps.iter().map(|s| s.dx).sum();
            let sy: i32 = steps.iter().map(|s| s.dy).sum();
            assert_eq!((sx, sy), (37, -13));
            assert_eq!(steps.last().unwrap().delay_ms, 0);
            for s in &steps[..steps.len() - 1] {
                assert!(s.delay_ms >= 1 && s.delay_ms <= 4);
            }
        }
    }
}
