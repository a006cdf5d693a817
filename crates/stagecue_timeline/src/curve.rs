// SPDX-License-Identifier: MIT OR Apache-2.0
//! Curve evaluation: channel value of a track at a point in time.

use crate::keyframe::{ControlPoint, CurveKind, Keyframe};
use crate::track::ChannelTrack;

/// Fraction of the segment span used for default bezier handles
pub const DEFAULT_HANDLE_FRACTION: f64 = 0.33;

/// Bezier time solve tolerance, as a fraction of the segment span
pub const BEZIER_TOLERANCE: f64 = 1e-4;

/// Upper bound on bisection steps for the bezier time solve
pub const BEZIER_MAX_ITERATIONS: u32 = 64;

/// Interpolation utilities
pub struct Interpolation;

impl Interpolation {
    /// Linear interpolation between two values
    pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
        a + (b - a) * t
    }

    /// Cubic bezier interpolation of one coordinate
    pub fn bezier(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
        let t2 = t * t;
        let t3 = t2 * t;
        let mt = 1.0 - t;
        let mt2 = mt * mt;
        let mt3 = mt2 * mt;

        p0 * mt3 + 3.0 * p1 * mt2 * t + 3.0 * p2 * mt * t2 + p3 * t3
    }

    /// `3u² - 2u³`
    pub fn smoothstep(u: f64) -> f64 {
        u * u * (3.0 - 2.0 * u)
    }

    /// Quadratic ease-in
    pub fn ease_in(u: f64) -> f64 {
        u * u
    }

    /// Quadratic ease-out
    pub fn ease_out(u: f64) -> f64 {
        1.0 - (1.0 - u) * (1.0 - u)
    }

    /// Piecewise quadratic ease-in-out
    pub fn ease_in_out(u: f64) -> f64 {
        if u < 0.5 {
            2.0 * u * u
        } else {
            let k = -2.0 * u + 2.0;
            1.0 - k * k / 2.0
        }
    }

    /// Step: hold until the end of the segment
    pub fn step(u: f64) -> f64 {
        if u < 1.0 {
            0.0
        } else {
            1.0
        }
    }
}

/// Curve evaluation failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CurveError {
    /// Segment uses a curve this build cannot evaluate
    #[error("Unknown curve kind: {0}")]
    UnknownCurveKind(String),

    /// Track has no keyframes to evaluate
    #[error("Track has no keyframes")]
    EmptyTrack,
}

/// The bracketing keyframes of a query time
#[derive(Debug, Clone, Copy)]
pub struct Segment<'a> {
    /// Index of the leading keyframe
    pub index: usize,
    /// Leading keyframe (owns the curve)
    pub from: &'a Keyframe,
    /// Trailing keyframe
    pub to: &'a Keyframe,
}

/// Where a query time falls on a track
#[derive(Debug, Clone, Copy)]
enum Lookup<'a> {
    Hold(f64),
    Within(Segment<'a>),
}

/// Evaluates channel tracks.
///
/// Evaluation is a pure function of the track and the query time.
pub struct CurveEvaluator;

impl CurveEvaluator {
    /// Value of `track` at time `t`.
    ///
    /// Fails with [`CurveError::UnknownCurveKind`] when `t` falls in a
    /// segment whose curve cannot be evaluated.
    pub fn evaluate(track: &ChannelTrack, t: f64) -> Result<f64, CurveError> {
        match Self::lookup(track, t)? {
            Lookup::Hold(value) => Ok(value),
            Lookup::Within(segment) => Self::sample(&segment, t),
        }
    }

    /// Value of `track` at time `t`, evaluating unknown curves as linear.
    ///
    /// Returns `None` for an empty track. The second element carries the
    /// error that caused a linear fallback, if any.
    pub fn evaluate_or_linear(track: &ChannelTrack, t: f64) -> (Option<f64>, Option<CurveError>) {
        let segment = match Self::lookup(track, t) {
            Ok(Lookup::Hold(value)) => return (Some(value), None),
            Ok(Lookup::Within(segment)) => segment,
            Err(_) => return (None, None),
        };

        match Self::sample(&segment, t) {
            Ok(value) => (Some(value), None),
            Err(err) => {
                let u = Self::progress(&segment, t);
                (Some(Interpolation::lerp(segment.from.value, segment.to.value, u)), Some(err))
            }
        }
    }

    /// Find the segment containing `t`, if `t` is strictly inside the track
    pub fn segment_at(track: &ChannelTrack, t: f64) -> Option<Segment<'_>> {
        match Self::lookup(track, t) {
            Ok(Lookup::Within(segment)) => Some(segment),
            _ => None,
        }
    }

    fn lookup(track: &ChannelTrack, t: f64) -> Result<Lookup<'_>, CurveError> {
        let keyframes = &track.keyframes;
        let (first, last) = match (keyframes.first(), keyframes.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(CurveError::EmptyTrack),
        };

        if t <= first.time {
            return Ok(Lookup::Hold(first.value));
        }
        if t >= last.time {
            return Ok(Lookup::Hold(last.value));
        }

        // First keyframe strictly after t; the one before it is the latest at or before t
        let next = keyframes
            .partition_point(|k| k.time <= t)
            .clamp(1, keyframes.len() - 1);
        Ok(Lookup::Within(Segment {
            index: next - 1,
            from: &keyframes[next - 1],
            to: &keyframes[next],
        }))
    }

    fn progress(segment: &Segment<'_>, t: f64) -> f64 {
        let span = segment.to.time - segment.from.time;
        if span > 0.0 {
            ((t - segment.from.time) / span).clamp(0.0, 1.0)
        } else {
            1.0
        }
    }

    fn sample(segment: &Segment<'_>, t: f64) -> Result<f64, CurveError> {
        let (a, b) = (segment.from, segment.to);
        let span = b.time - a.time;
        // Zero-length (or out-of-order) segment: the later keyframe wins
        if span <= 0.0 {
            return Ok(b.value);
        }

        let u = Self::progress(segment, t);
        let eased = match &a.curve {
            CurveKind::Linear => u,
            CurveKind::Step => Interpolation::step(u),
            CurveKind::Smooth => Interpolation::smoothstep(u),
            CurveKind::EaseIn => Interpolation::ease_in(u),
            CurveKind::EaseOut => Interpolation::ease_out(u),
            CurveKind::EaseInOut => Interpolation::ease_in_out(u),
            CurveKind::Bezier => return Ok(Self::bezier(a, b, t)),
            CurveKind::Unknown(name) => return Err(CurveError::UnknownCurveKind(name.clone())),
        };

        Ok(Interpolation::lerp(a.value, b.value, eased))
    }

    /// Solve the bezier for the parameter whose time equals `t`, then
    /// return the value at that parameter.
    fn bezier(a: &Keyframe, b: &Keyframe, t: f64) -> f64 {
        let span = b.time - a.time;
        let cp1 = a
            .control_point_1
            .unwrap_or(ControlPoint::new(span * DEFAULT_HANDLE_FRACTION, 0.0));
        let cp2 = a
            .control_point_2
            .unwrap_or(ControlPoint::new(-span * DEFAULT_HANDLE_FRACTION, 0.0));

        // Keep handle times inside the segment so time is monotonic in the parameter
        let x0 = a.time;
        let x1 = (a.time + cp1.x).clamp(a.time, b.time);
        let x2 = (b.time + cp2.x).clamp(a.time, b.time);
        let x3 = b.time;

        let tolerance = span * BEZIER_TOLERANCE;
        let (mut lo, mut hi) = (0.0_f64, 1.0_f64);
        let mut s = (t - a.time) / span;
        for _ in 0..BEZIER_MAX_ITERATIONS {
            let x = Interpolation::bezier(x0, x1, x2, x3, s);
            if (x - t).abs() <= tolerance {
                break;
            }
            if x < t {
                lo = s;
            } else {
                hi = s;
            }
            s = 0.5 * (lo + hi);
        }

        Interpolation::bezier(a.value, a.value + cp1.y, b.value + cp2.y, b.value, s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(curve: CurveKind) -> ChannelTrack {
        ChannelTrack::with_keyframes(
            1,
            [
                Keyframe::new(0.0, 0.0).with_curve(curve),
                Keyframe::new(1000.0, 200.0),
            ],
        )
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_endpoint_holds() {
        let t = ChannelTrack::with_keyframes(
            1,
            [Keyframe::new(100.0, 40.0), Keyframe::new(900.0, 80.0)],
        );
        assert_eq!(CurveEvaluator::evaluate(&t, 0.0), Ok(40.0));
        assert_eq!(CurveEvaluator::evaluate(&t, 100.0), Ok(40.0));
        assert_eq!(CurveEvaluator::evaluate(&t, 900.0), Ok(80.0));
        assert_eq!(CurveEvaluator::evaluate(&t, 5000.0), Ok(80.0));
    }

    #[test]
    fn test_first_and_last_at_sequence_bounds() {
        let t = ChannelTrack::with_keyframes(
            2,
            [
                Keyframe::new(0.0, 127.0).with_curve(CurveKind::Smooth),
                Keyframe::new(2500.0, 255.0).with_curve(CurveKind::EaseOut),
                Keyframe::new(10000.0, 3.0),
            ],
        );
        assert_eq!(CurveEvaluator::evaluate(&t, 0.0), Ok(127.0));
        assert_eq!(CurveEvaluator::evaluate(&t, 10000.0), Ok(3.0));
    }

    #[test]
    fn test_empty_track() {
        let empty = ChannelTrack::new(9);
        assert_eq!(CurveEvaluator::evaluate(&empty, 10.0), Err(CurveError::EmptyTrack));
        assert_eq!(CurveEvaluator::evaluate_or_linear(&empty, 10.0), (None, None));
    }

    #[test]
    fn test_single_keyframe() {
        let t = ChannelTrack::with_keyframes(1, [Keyframe::new(300.0, 17.0)]);
        assert_eq!(CurveEvaluator::evaluate(&t, 0.0), Ok(17.0));
        assert_eq!(CurveEvaluator::evaluate(&t, 1000.0), Ok(17.0));
    }

    #[test]
    fn test_easing_midpoints() {
        let mid = |curve| CurveEvaluator::evaluate(&track(curve), 500.0).unwrap();
        assert!(approx(mid(CurveKind::Linear), 100.0));
        assert!(approx(mid(CurveKind::Smooth), 100.0));
        assert!(approx(mid(CurveKind::EaseIn), 50.0));
        assert!(approx(mid(CurveKind::EaseOut), 150.0));
        assert!(approx(mid(CurveKind::EaseInOut), 100.0));
        assert!(approx(mid(CurveKind::Step), 0.0));

        let quarter = |curve| CurveEvaluator::evaluate(&track(curve), 250.0).unwrap();
        assert!(approx(quarter(CurveKind::Smooth), 200.0 * 0.15625));
        assert!(approx(quarter(CurveKind::EaseInOut), 200.0 * 0.125));
    }

    #[test]
    fn test_step_holds_until_next_keyframe() {
        let t = track(CurveKind::Step);
        assert_eq!(CurveEvaluator::evaluate(&t, 999.999), Ok(0.0));
        assert_eq!(CurveEvaluator::evaluate(&t, 1000.0), Ok(200.0));
    }

    #[test]
    fn test_curve_taken_from_leading_keyframe() {
        let t = ChannelTrack::with_keyframes(
            1,
            [
                Keyframe::new(0.0, 0.0).with_curve(CurveKind::Step),
                Keyframe::new(100.0, 100.0).with_curve(CurveKind::Linear),
                Keyframe::new(200.0, 0.0),
            ],
        );
        assert_eq!(CurveEvaluator::evaluate(&t, 50.0), Ok(0.0));
        assert!(approx(CurveEvaluator::evaluate(&t, 150.0).unwrap(), 50.0));
    }

    #[test]
    fn test_equal_time_keyframes_take_the_later() {
        let t = ChannelTrack::with_keyframes(
            1,
            [
                Keyframe::new(0.0, 0.0),
                Keyframe::new(100.0, 10.0),
                Keyframe::new(100.0, 90.0),
                Keyframe::new(200.0, 190.0),
            ],
        );
        assert_eq!(CurveEvaluator::evaluate(&t, 100.0), Ok(90.0));
        assert!(approx(CurveEvaluator::evaluate(&t, 150.0).unwrap(), 140.0));
        assert!(approx(CurveEvaluator::evaluate(&t, 50.0).unwrap(), 5.0));
    }

    #[test]
    fn test_out_of_order_segment_does_not_divide_by_zero() {
        let t = ChannelTrack {
            channel: 1,
            keyframes: vec![Keyframe::new(0.0, 0.0), Keyframe::new(50.0, 7.0), Keyframe::new(10.0, 3.0), Keyframe::new(100.0, 1.0)],
        };
        let value = CurveEvaluator::evaluate(&t, 30.0).unwrap();
        assert!(value.is_finite());
    }

    #[test]
    fn test_bezier_default_handles_are_monotonic() {
        let t = track(CurveKind::Bezier);
        let mut prev = 0.0;
        for i in 0..=100 {
            let v = CurveEvaluator::evaluate(&t, i as f64 * 10.0).unwrap();
            assert!(v >= prev - 1e-6, "value went down at step {i}");
            prev = v;
        }
        assert!(approx(CurveEvaluator::evaluate(&t, 500.0).unwrap(), 100.0));
    }

    #[test]
    fn test_bezier_linear_handles_match_linear() {
        let t = ChannelTrack::with_keyframes(
            1,
            [
                Keyframe::bezier(
                    0.0,
                    0.0,
                    ControlPoint::new(1000.0 / 3.0, 200.0 / 3.0),
                    ControlPoint::new(-1000.0 / 3.0, -200.0 / 3.0),
                ),
                Keyframe::new(1000.0, 200.0),
            ],
        );
        for time in [100.0, 333.0, 720.0] {
            let v = CurveEvaluator::evaluate(&t, time).unwrap();
            // Time solve tolerance of 0.1 ms maps to at most 0.02 value units here
            assert!((v - time * 0.2).abs() < 0.05, "{v} at {time}");
        }
    }

    #[test]
    fn test_bezier_overshooting_handles_are_clamped_in_time() {
        let t = ChannelTrack::with_keyframes(
            1,
            [
                Keyframe::bezier(0.0, 0.0, ControlPoint::new(5000.0, 0.0), ControlPoint::new(-5000.0, 0.0)),
                Keyframe::new(1000.0, 100.0),
            ],
        );
        let v = CurveEvaluator::evaluate(&t, 500.0).unwrap();
        assert!(approx(v, 50.0));
    }

    #[test]
    fn test_unknown_curve_falls_back_to_linear() {
        let t = track(CurveKind::from("elastic"));
        assert_eq!(
            CurveEvaluator::evaluate(&t, 500.0),
            Err(CurveError::UnknownCurveKind("elastic".to_string()))
        );
        let (value, err) = CurveEvaluator::evaluate_or_linear(&t, 500.0);
        assert_eq!(value, Some(100.0));
        assert_eq!(err, Some(CurveError::UnknownCurveKind("elastic".to_string())));

        // Holds never touch the unknown segment
        assert_eq!(CurveEvaluator::evaluate(&t, 1000.0), Ok(200.0));
    }

    #[test]
    fn test_deterministic() {
        let t = track(CurveKind::Bezier);
        for time in [0.0, 12.5, 333.3, 999.0] {
            assert_eq!(
                CurveEvaluator::evaluate(&t, time),
                CurveEvaluator::evaluate(&t, time)
            );
        }
    }

    #[test]
    fn test_segment_at() {
        let t = track(CurveKind::Linear);
        assert!(CurveEvaluator::segment_at(&t, 0.0).is_none());
        let segment = CurveEvaluator::segment_at(&t, 10.0).unwrap();
        assert_eq!(segment.index, 0);
        assert_eq!(segment.to.value, 200.0);
    }
}
