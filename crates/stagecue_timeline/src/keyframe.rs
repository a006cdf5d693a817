// SPDX-License-Identifier: MIT OR Apache-2.0
//! Keyframe definitions for channel tracks.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Interpolation curve applied to the segment leaving a keyframe.
///
/// Curves are persisted as kebab-case names (`"ease-in-out"`). A name this
/// build does not recognise is kept as [`CurveKind::Unknown`] so that a
/// sequence authored by a newer editor still loads; evaluation degrades to
/// linear for such segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CurveKind {
    /// Straight line between the two values
    #[default]
    Linear,
    /// Smoothstep (`3u² - 2u³`)
    Smooth,
    /// Hold the value until the next keyframe
    Step,
    /// Quadratic acceleration
    EaseIn,
    /// Quadratic deceleration
    EaseOut,
    /// Quadratic acceleration then deceleration
    EaseInOut,
    /// Cubic bezier shaped by the keyframe's control points
    Bezier,
    /// Curve name not understood by this build
    Unknown(String),
}

impl CurveKind {
    /// Every curve kind the evaluator understands
    pub const KNOWN: [CurveKind; 7] = [
        CurveKind::Linear,
        CurveKind::Smooth,
        CurveKind::Step,
        CurveKind::EaseIn,
        CurveKind::EaseOut,
        CurveKind::EaseInOut,
        CurveKind::Bezier,
    ];

    /// Persisted name of the curve
    pub fn name(&self) -> &str {
        match self {
            Self::Linear => "linear",
            Self::Smooth => "smooth",
            Self::Step => "step",
            Self::EaseIn => "ease-in",
            Self::EaseOut => "ease-out",
            Self::EaseInOut => "ease-in-out",
            Self::Bezier => "bezier",
            Self::Unknown(name) => name,
        }
    }

    /// Whether the curve uses control points
    pub fn is_bezier(&self) -> bool {
        matches!(self, Self::Bezier)
    }
}

impl From<&str> for CurveKind {
    fn from(value: &str) -> Self {
        match value {
            "linear" => Self::Linear,
            "smooth" => Self::Smooth,
            "step" => Self::Step,
            "ease-in" => Self::EaseIn,
            "ease-out" => Self::EaseOut,
            "ease-in-out" => Self::EaseInOut,
            "bezier" => Self::Bezier,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl From<String> for CurveKind {
    fn from(value: String) -> Self {
        match Self::from(value.as_str()) {
            Self::Unknown(_) => Self::Unknown(value),
            known => known,
        }
    }
}

impl From<CurveKind> for String {
    fn from(value: CurveKind) -> Self {
        match value {
            CurveKind::Unknown(name) => name,
            known => known.name().to_string(),
        }
    }
}

impl fmt::Display for CurveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Bezier handle, as an offset from its anchor keyframe.
///
/// `x` is in milliseconds, `y` in channel value units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ControlPoint {
    /// Time offset
    pub x: f64,
    /// Value offset
    pub y: f64,
}

impl ControlPoint {
    /// Create a control point offset
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A keyframe in a channel track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Time in milliseconds from the start of the sequence
    pub time: f64,
    /// Channel value at this keyframe
    pub value: f64,
    /// Curve of the segment leading to the next keyframe
    #[serde(default)]
    pub curve: CurveKind,
    /// Outgoing handle, relative to this keyframe
    #[serde(rename = "controlPoint1", default, skip_serializing_if = "Option::is_none")]
    pub control_point_1: Option<ControlPoint>,
    /// Incoming handle of the next keyframe, relative to that keyframe
    #[serde(rename = "controlPoint2", default, skip_serializing_if = "Option::is_none")]
    pub control_point_2: Option<ControlPoint>,
}

impl Keyframe {
    /// Create a new linear keyframe
    pub fn new(time: f64, value: f64) -> Self {
        Self {
            time,
            value,
            curve: CurveKind::Linear,
            control_point_1: None,
            control_point_2: None,
        }
    }

    /// Create a bezier keyframe with both handles
    pub fn bezier(time: f64, value: f64, cp1: ControlPoint, cp2: ControlPoint) -> Self {
        Self {
            time,
            value,
            curve: CurveKind::Bezier,
            control_point_1: Some(cp1),
            control_point_2: Some(cp2),
        }
    }

    /// Set the outgoing curve.
    ///
    /// Control points only survive on bezier keyframes.
    pub fn with_curve(mut self, curve: impl Into<CurveKind>) -> Self {
        self.curve = curve.into();
        if !self.curve.is_bezier() {
            self.control_point_1 = None;
            self.control_point_2 = None;
        }
        self
    }

    /// Set bezier handles, switching the curve to bezier
    pub fn with_control_points(mut self, cp1: ControlPoint, cp2: ControlPoint) -> Self {
        self.curve = CurveKind::Bezier;
        self.control_point_1 = Some(cp1);
        self.control_point_2 = Some(cp2);
        self
    }
}
