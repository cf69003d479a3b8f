//! Gauge reading for the AI visibility score.

use serde::Serialize;
use std::fmt;

/// Upper bound of the visibility gauge.
pub const DEFAULT_GAUGE_MAX: f64 = 400.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GaugeZone {
    Negative,
    Warning,
    Positive,
}

impl fmt::Display for GaugeZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GaugeZone::Negative => write!(f, "Negative"),
            GaugeZone::Warning => write!(f, "Warning"),
            GaugeZone::Positive => write!(f, "Positive"),
        }
    }
}

/// A score placed on a half-circle gauge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Gauge {
    /// Score clamped to `0..=max`.
    pub value: f64,
    pub max: f64,
    /// Needle angle from -90 (empty) to 90 (full).
    pub rotation_degrees: f64,
    pub zone: GaugeZone,
}

impl Gauge {
    pub fn new(value: f64, max: f64) -> Self {
        let max = if max > 0.0 { max } else { DEFAULT_GAUGE_MAX };
        let value = if value.is_nan() { 0.0 } else { value.clamp(0.0, max) };
        let quarter = max / 4.0;

        let zone = if value < quarter {
            GaugeZone::Negative
        } else if value < quarter * 2.0 {
            GaugeZone::Warning
        } else {
            GaugeZone::Positive
        };

        Self {
            value,
            max,
            rotation_degrees: -90.0 + (value / max) * 180.0,
            zone,
        }
    }

    /// Fraction of the gauge that is filled.
    pub fn fill(&self) -> f64 {
        self.value / self.max
    }

    /// Text bar `width` cells wide.
    pub fn bar(&self, width: usize) -> String {
        let filled = (self.fill() * width as f64).round() as usize;
        let filled = filled.min(width);
        format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zones_by_quarter() {
        assert_eq!(Gauge::new(0.0, 400.0).zone, GaugeZone::Negative);
        assert_eq!(Gauge::new(99.9, 400.0).zone, GaugeZone::Negative);
        assert_eq!(Gauge::new(100.0, 400.0).zone, GaugeZone::Warning);
        assert_eq!(Gauge::new(199.0, 400.0).zone, GaugeZone::Warning);
        assert_eq!(Gauge::new(200.0, 400.0).zone, GaugeZone::Positive);
    }

    #[test]
    fn test_value_is_clamped() {
        let over = Gauge::new(900.0, 400.0);
        assert_eq!(over.value, 400.0);
        assert_eq!(over.rotation_degrees, 90.0);

        let under = Gauge::new(-5.0, 400.0);
        assert_eq!(under.value, 0.0);
        assert_eq!(under.rotation_degrees, -90.0);
    }

    #[test]
    fn test_bar_rendering() {
        assert_eq!(Gauge::new(200.0, 400.0).bar(10), "█████░░░░░");
        assert_eq!(Gauge::new(400.0, 400.0).bar(4), "████");
        assert_eq!(Gauge::new(0.0, 400.0).bar(3), "░░░");
    }

    #[test]
    fn test_invalid_max_falls_back_to_default() {
        let gauge = Gauge::new(100.0, 0.0);
        assert_eq!(gauge.max, DEFAULT_GAUGE_MAX);
        assert_eq!(gauge.zone, GaugeZone::Warning);
    }
}
