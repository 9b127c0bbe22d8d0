//! Time-driven slide phases, easing curves and the foreground pan drift.

use rand::Rng;

use crate::config::{Configuration, Easing};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    TransitionIn,
    Show,
    TransitionOut,
    /// The slide has run its course; the caller should swap images.
    Done,
}

/// Phase of a slide at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub phase: Phase,
    /// Visibility of the current slide, `0.0..=1.0`.
    pub opacity: f32,
    /// Fraction of the active fade window already elapsed; 1 while showing.
    pub progress: f32,
}

/// Classify `elapsed` seconds into a slide phase.
///
/// Windows are checked in order: past the slide end, inside the fade-in
/// window, inside the fade-out window, otherwise steady.
pub fn phase(elapsed: f32, slide: f32, transition: f32) -> Transition {
    if elapsed > slide {
        return Transition {
            phase: Phase::Done,
            opacity: 0.0,
            progress: 1.0,
        };
    }
    if elapsed < transition {
        let t = unit(elapsed / transition);
        return Transition {
            phase: Phase::TransitionIn,
            opacity: t,
            progress: t,
        };
    }
    let out_start = slide - transition;
    if elapsed > out_start {
        let progress = unit((elapsed - out_start) / transition);
        return Transition {
            phase: Phase::TransitionOut,
            opacity: unit((transition - (elapsed - out_start)) / transition),
            progress,
        };
    }
    Transition {
        phase: Phase::Show,
        opacity: 1.0,
        progress: 1.0,
    }
}

fn unit(v: f32) -> f32 {
    if v.is_finite() { v.clamp(0.0, 1.0) } else { 1.0 }
}

impl Easing {
    /// Map linear progress `t` in `0..=1` onto the curve.
    pub fn apply(self, t: f32) -> f32 {
        let t = unit(t);
        match self {
            Easing::Linear => t,
            Easing::Parabolic => 1.0 - (1.0 - t) * (1.0 - t),
        }
    }
}

/// Elapsed-time state for one slide. Only time advance and an explicit
/// reset (on image swap) change it.
#[derive(Debug, Clone)]
pub struct TransitionController {
    elapsed: f32,
    slide: f32,
    transition: f32,
}

impl TransitionController {
    pub fn new(slide_secs: f32, transition_secs: f32) -> Self {
        Self {
            elapsed: 0.0,
            slide: slide_secs,
            transition: transition_secs,
        }
    }

    pub fn from_config(cfg: &Configuration) -> Self {
        Self::new(cfg.slide_secs(), cfg.transition_secs())
    }

    pub fn advance(&mut self, dt: f32) -> Transition {
        self.elapsed += dt.max(0.0);
        self.current()
    }

    pub fn current(&self) -> Transition {
        phase(self.elapsed, self.slide, self.transition)
    }

    pub fn reset(&mut self) {
        self.elapsed = 0.0;
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }
}

/// Straight-line drift of a foreground image from a random point on a circle
/// around the screen center back toward the center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanMotion {
    offset: [f32; 2],
    speed: f32,
}

impl PanMotion {
    pub const fn still() -> Self {
        Self {
            offset: [0.0, 0.0],
            speed: 0.0,
        }
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R, radius: f32, speed: f32) -> Self {
        if radius <= 0.0 {
            return Self::still();
        }
        let angle = rng.random_range(0.0..std::f32::consts::TAU);
        Self {
            offset: [radius * angle.cos(), radius * angle.sin()],
            speed,
        }
    }

    /// Move `speed * dt` pixels toward the center, stopping there.
    pub fn advance(&mut self, dt: f32) {
        let [x, y] = self.offset;
        let dist = x.hypot(y);
        let step = self.speed * dt.max(0.0);
        if dist <= step || dist == 0.0 {
            self.offset = [0.0, 0.0];
        } else {
            let k = (dist - step) / dist;
            self.offset = [x * k, y * k];
        }
    }

    /// Current displacement from the centered position, in pixels.
    pub fn offset(&self) -> [f32; 2] {
        self.offset
    }
}

impl Default for PanMotion {
    fn default() -> Self {
        Self::still()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn phases_for_ten_second_slide() {
        let t = phase(0.0, 10.0, 2.0);
        assert_eq!(t.phase, Phase::TransitionIn);
        assert!(close(t.opacity, 0.0));

        let t = phase(1.0, 10.0, 2.0);
        assert_eq!(t.phase, Phase::TransitionIn);
        assert!(close(t.opacity, 0.5));

        let t = phase(5.0, 10.0, 2.0);
        assert_eq!(t.phase, Phase::Show);
        assert!(close(t.opacity, 1.0));

        let t = phase(8.5, 10.0, 2.0);
        assert_eq!(t.phase, Phase::TransitionOut);
        assert!(close(t.progress, 0.25));
        assert!(close(t.opacity, 0.75));

        assert_eq!(phase(11.0, 10.0, 2.0).phase, Phase::Done);
    }

    #[test]
    fn boundaries_fall_into_show() {
        assert_eq!(phase(2.0, 10.0, 2.0).phase, Phase::Show);
        assert_eq!(phase(8.0, 10.0, 2.0).phase, Phase::Show);
        let t = phase(10.0, 10.0, 2.0);
        assert_eq!(t.phase, Phase::TransitionOut);
        assert!(close(t.opacity, 0.0));
    }

    #[test]
    fn controller_accumulates_and_resets() {
        let mut c = TransitionController::new(10.0, 2.0);
        c.advance(1.0);
        assert!(close(c.current().opacity, 0.5));
        c.advance(-3.0);
        assert!(close(c.elapsed(), 1.0));
        c.advance(10.5);
        assert_eq!(c.current().phase, Phase::Done);
        c.reset();
        assert_eq!(c.current().phase, Phase::TransitionIn);
    }

    #[test]
    fn easing_curves() {
        for e in [Easing::Linear, Easing::Parabolic] {
            assert!(close(e.apply(0.0), 0.0));
            assert!(close(e.apply(1.0), 1.0));
            assert!(close(e.apply(7.0), 1.0));
        }
        assert!(close(Easing::Linear.apply(0.5), 0.5));
        assert!(close(Easing::Parabolic.apply(0.5), 0.75));
    }

    #[test]
    fn pan_starts_on_circle_and_settles_at_center() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut pan = PanMotion::random(&mut rng, 100.0, 50.0);
        let [x, y] = pan.offset();
        assert!((x.hypot(y) - 100.0).abs() < 1e-3);

        pan.advance(1.0);
        let [x, y] = pan.offset();
        assert!((x.hypot(y) - 50.0).abs() < 1e-3);

        pan.advance(5.0);
        assert_eq!(pan.offset(), [0.0, 0.0]);
    }

    #[test]
    fn zero_radius_pan_is_still() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(PanMotion::random(&mut rng, 0.0, 50.0), PanMotion::still());
    }
}
