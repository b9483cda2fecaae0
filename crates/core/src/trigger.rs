use std::time::{Duration, Instant};

use rand::Rng;

use crate::config::TriggerConfig;

/// Where the machine sits after the latest observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Confirming,
    Fired,
    Cooldown,
}

/// Timing for one emitted click: wait `delay_ms`, then click with
/// `hold_ms` between press and release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirePlan {
    pub delay_ms: u64,
    pub hold_ms: u64,
}

/// Decides when a detection becomes a click. Requires the target to
/// persist for a number of cycles, spaces fires by a minimum gap, and
/// forces a longer pause after a burst of consecutive fires. The clock
/// is passed in, never read here.
pub struct Trigger {
    cfg: TriggerConfig,
    phase: Phase,
    confirmed: u32,
    consecutive: u32,
    last_fire: Option<Instant>,
    pause_until: Option<Instant>,
}

impl Trigger {
    pub fn new(cfg: TriggerConfig) -> Self {
        Self {
            cfg,
            phase: Phase::Idle,
            confirmed: 0,
            consecutive: 0,
            last_fire: None,
            pause_until: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Feed one cycle's detection outcome. Returns Some exactly when a
    /// click should go out this cycle.
    pub fn observe<R: Rng>(
        &mut self,
        target_present: bool,
        now: Instant,
        rng: &mut R,
    ) -> Option<FirePlan> {
        if !target_present {
            self.phase = Phase::Idle;
            self.confirmed = 0;
            self.consecutive = 0;
            return None;
        }

        self.confirmed = self.confirmed.saturating_add(1);

        if let Some(until) = self.pause_until {
            if now < until {
                self.phase = Phase::Cooldown;
                return None;
            }
            self.pause_until = None;
        }

        if self.confirmed < self.cfg.confirmations {
            self.phase = Phase::Confirming;
            return None;
        }

        if let Some(last) = self.last_fire {
            if now.duration_since(last) < Duration::from_millis(self.cfg.min_gap_ms) {
                self.phase = Phase::Cooldown;
                return None;
            }
        }

        self.phase = Phase::Fired;
        self.last_fire = Some(now);
        self.consecutive += 1;

        if self.consecutive >= self.cfg.max_consecutive {
            let lo = self.cfg.pause_ms[0];
            let hi = self.cfg.pause_ms[1].max(lo);
            let pause = rng.gen_range(lo..=hi);
            self.pause_until = Some(now + Duration::from_millis(pause));
            self.consecutive = 0;
        }

        let r_hi = self.cfg.reaction_ms[1].max(self.cfg.reaction_ms[0]);
        let h_hi = self.cfg.hold_ms[1].max(self.cfg.hold_ms[0]);
        Some(FirePlan {
            delay_ms: rng.gen_range(self.cfg.reaction_ms[0]..=r_hi),
            hold_ms: rng.gen_range(self.cfg.hold_ms[0]..=h_hi),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn cfg() -> TriggerConfig {
        TriggerConfig {
            confirmations: 2,
            min_gap_ms: 50,
            max_consecutive: 3,
            pause_ms: [500, 500],
            reaction_ms: [0, 0],
            hold_ms: [10, 10],
        }
    }

    fn clock() -> impl Fn(u64) -> Instant {
        let t0 = Instant::now();
        move |ms| t0 + Duration::from_millis(ms)
    }

    #[test]
    fn single_detection_does_not_fire() {
        let at = clock();
        let mut t = Trigger::new(cfg());
        let mut rng = StdRng::seed_from_u64(1);

        assert!(t.observe(true, at(0), &mut rng).is_none());
        assert_eq!(t.phase(), Phase::Confirming);
    }

    #[test]
    fn two_consecutive_detections_fire_exactly_once() {
        let at = clock();
        let mut t = Trigger::new(cfg());
        let mut rng = StdRng::seed_from_u64(2);

        assert!(t.observe(true, at(0), &mut rng).is_none());
        let plan = t.observe(true, at(16), &mut rng);
        assert!(plan.is_some());
        assert_eq!(t.phase(), Phase::Fired);

        // Within the minimum gap: suppressed
        assert!(t.observe(true, at(32), &mut rng).is_none());
        assert_eq!(t.phase(), Phase::Cooldown);
    }

    #[test]
    fn absence_discards_confirmation_progress() {
        let at = clock();
        let mut t = Trigger::new(cfg());
        let mut rng = StdRng::seed_from_u64(3);

        assert!(t.observe(true, at(0), &mut rng).is_none());
        assert!(t.observe(false, at(16), &mut rng).is_none());
        assert_eq!(t.phase(), Phase::Idle);
        // Counter restarted: one more detection is not enough
        assert!(t.observe(true, at(32), &mut rng).is_none());
        assert_eq!(t.phase(), Phase::Confirming);
    }

    #[test]
    fn fires_again_once_the_gap_elapses() {
        let at = clock();
        let mut t = Trigger::new(cfg());
        let mut rng = StdRng::seed_from_u64(4);

        t.observe(true, at(0), &mut rng);
        assert!(t.observe(true, at(16), &mut rng).is_some());
        assert!(t.observe(true, at(40), &mut rng).is_none());
        assert!(t.observe(true, at(66), &mut rng).is_some());
    }

    #[test]
    fn burst_forces_extended_pause() {
        let at = clock();
        let mut c = cfg();
        c.min_gap_ms = 0;
        let mut t = Trigger::new(c);
        let mut rng = StdRng::seed_from_u64(5);

        assert!(t.observe(true, at(0), &mut rng).is_none());
        assert!(t.observe(true, at(10), &mut rng).is_some());
        assert!(t.observe(true, at(20), &mut rng).is_some());
        assert!(t.observe(true, at(30), &mut rng).is_some());

        // Third fire tripped the burst limit: paused for 500ms
        assert!(t.observe(true, at(40), &mut rng).is_none());
        assert_eq!(t.phase(), Phase::Cooldown);
        assert!(t.observe(true, at(529), &mut rng).is_none());
        assert!(t.observe(true, at(531), &mut rng).is_some());
    }

    #[test]
    fn plans_stay_within_configured_ranges() {
        let at = clock();
        let mut c = cfg();
        c.reaction_ms = [100, 200];
        c.hold_ms = [20, 60];
        let mut t = Trigger::new(c);
        let mut rng = StdRng::seed_from_u64(6);

        t.observe(true, at(0), &mut rng);
        let plan = t.observe(true, at(16), &mut rng).unwrap();
        assert!(plan.delay_ms >= 100 && plan.delay_ms <= 200);
        assert!(plan.hold_ms >= 20 && plan.hold_ms <= 60);
    }
}
