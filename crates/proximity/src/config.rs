//! Proximity engine configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::alert::AlertConfig;
use crate::risk::{RiskThresholds, Threshold, ThresholdTable};
use crate::ProximityError;

/// Prefix for environment overrides, e.g. `PROXIMITY__MIN_CONFIDENCE=0.4`
pub const ENV_PREFIX: &str = "PROXIMITY";

/// Proximity engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProximityConfig {
    /// IoU a detection must exceed to continue a previous track
    pub iou_match_threshold: f32,

    /// Weight of the pinhole projection in the blended distance (0-1).
    /// The ground-plane estimate takes the remainder.
    pub projection_weight: f32,

    /// Distance floor (meters)
    pub min_distance_m: f32,

    /// Ground-plane saturation distance (meters)
    pub max_distance_m: f32,

    /// Horizon row as an image fraction, unless calibration provides one
    pub horizon_fraction: f32,

    /// Detections below this confidence are ignored
    pub min_confidence: f32,

    /// Minimum spacing between processed frames (milliseconds, 0 = every frame)
    pub processing_interval_ms: u64,

    /// Risk threshold tables
    pub risk: RiskThresholds,

    /// Scene alert gating
    pub alerts: AlertConfig,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            iou_match_threshold: 0.5,
            projection_weight: 0.7,
            min_distance_m: 1.0,
            max_distance_m: 100.0,
            horizon_fraction: 0.5,
            min_confidence: 0.0,
            processing_interval_ms: 0,
            risk: RiskThresholds::default(),
            alerts: AlertConfig::default(),
        }
    }
}

impl ProximityConfig {
    /// Earlier warnings: every threshold widened by 25%, faint detections dropped
    pub fn cautious() -> Self {
        let widen = |t: ThresholdTable| ThresholdTable {
            low: scale(t.low, 1.25),
            medium: scale(t.medium, 1.25),
            high: scale(t.high, 1.25),
            imminent: scale(t.imminent, 1.25),
        };

        let mut risk = RiskThresholds::default();
        risk.default = widen(risk.default);
        for table in risk.categories.values_mut() {
            *table = widen(*table);
        }

        Self {
            risk,
            min_confidence: 0.3,
            ..Default::default()
        }
    }

    /// Fewer warnings: tighter thresholds, stricter detections, 10 Hz processing
    pub fn relaxed() -> Self {
        let narrow = |t: ThresholdTable| ThresholdTable {
            low: scale(t.low, 0.8),
            medium: scale(t.medium, 0.8),
            high: scale(t.high, 0.8),
            imminent: scale(t.imminent, 0.8),
        };

        let mut risk = RiskThresholds::default();
        risk.default = narrow(risk.default);
        for table in risk.categories.values_mut() {
            *table = narrow(*table);
        }

        Self {
            risk,
            min_confidence: 0.5,
            processing_interval_ms: 100,
            ..Default::default()
        }
    }

    /// Load from a file (format by extension) with `PROXIMITY__*` environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ProximityError> {
        let path = path.as_ref();
        let loaded: Self = ::config::Config::builder()
            .add_source(::config::File::from(path))
            .add_source(::config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()?;

        loaded.validate()?;
        info!("Loaded proximity config from {}", path.display());
        Ok(loaded)
    }

    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(source: &str) -> Result<Self, ProximityError> {
        let loaded: Self = ::config::Config::builder()
            .add_source(::config::File::from_str(source, ::config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        loaded.validate()?;
        Ok(loaded)
    }

    /// Check value ranges and threshold nesting
    pub fn validate(&self) -> Result<(), ProximityError> {
        if !(self.iou_match_threshold > 0.0 && self.iou_match_threshold < 1.0) {
            return Err(ProximityError::InvalidConfig(format!(
                "iou_match_threshold must be in (0, 1), got {}",
                self.iou_match_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.projection_weight) {
            return Err(ProximityError::InvalidConfig(format!(
                "projection_weight must be in [0, 1], got {}",
                self.projection_weight
            )));
        }
        if !(self.min_distance_m > 0.0 && self.max_distance_m > self.min_distance_m) {
            return Err(ProximityError::InvalidConfig(format!(
                "distance range [{}, {}] is empty",
                self.min_distance_m, self.max_distance_m
            )));
        }
        if !(self.horizon_fraction > 0.0 && self.horizon_fraction < 1.0) {
            return Err(ProximityError::InvalidConfig(format!(
                "horizon_fraction must be in (0, 1), got {}",
                self.horizon_fraction
            )));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(ProximityError::InvalidConfig(format!(
                "min_confidence must be in [0, 1], got {}",
                self.min_confidence
            )));
        }

        self.risk.validate()
    }
}

fn scale(t: Threshold, factor: f32) -> Threshold {
    Threshold::new(t.distance_m * factor, t.ttc_s * factor)
}
