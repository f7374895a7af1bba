//! Collision risk levels and per-category threshold tables

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use crate::object::ObjectCategory;
use crate::ProximityError;

/// Collision risk tier.
///
/// Ordering follows [`CollisionRisk::rank`], never the declaration order or
/// the label text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionRisk {
    #[default]
    None,
    Low,
    Medium,
    High,
    Imminent,
}

impl CollisionRisk {
    /// Tiers from most to least severe
    pub const DESCENDING: [CollisionRisk; 4] = [
        CollisionRisk::Imminent,
        CollisionRisk::High,
        CollisionRisk::Medium,
        CollisionRisk::Low,
    ];

    /// Severity rank, 0 (none) to 4 (imminent)
    pub const fn rank(self) -> u8 {
        match self {
            CollisionRisk::None => 0,
            CollisionRisk::Low => 1,
            CollisionRisk::Medium => 2,
            CollisionRisk::High => 3,
            CollisionRisk::Imminent => 4,
        }
    }

    /// Lowercase display name
    pub fn label(self) -> &'static str {
        match self {
            CollisionRisk::None => "none",
            CollisionRisk::Low => "low",
            CollisionRisk::Medium => "medium",
            CollisionRisk::High => "high",
            CollisionRisk::Imminent => "imminent",
        }
    }
}

impl Ord for CollisionRisk {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl PartialOrd for CollisionRisk {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for CollisionRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Distance / time-to-collision pair; either one being met triggers the tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub distance_m: f32,
    pub ttc_s: f32,
}

impl Threshold {
    pub const fn new(distance_m: f32, ttc_s: f32) -> Self {
        Self { distance_m, ttc_s }
    }

    fn is_met(&self, distance_m: f32, ttc_s: f32) -> bool {
        distance_m <= self.distance_m || ttc_s <= self.ttc_s
    }
}

/// Thresholds for each risk tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdTable {
    pub low: Threshold,
    pub medium: Threshold,
    pub high: Threshold,
    pub imminent: Threshold,
}

impl Default for ThresholdTable {
    fn default() -> Self {
        Self {
            low: Threshold::new(60.0, 6.0),
            medium: Threshold::new(40.0, 4.0),
            high: Threshold::new(20.0, 2.5),
            imminent: Threshold::new(10.0, 1.5),
        }
    }
}

impl ThresholdTable {
    /// More cautious table for pedestrians and riders
    pub fn vulnerable_road_user() -> Self {
        Self {
            low: Threshold::new(70.0, 7.0),
            medium: Threshold::new(50.0, 5.0),
            high: Threshold::new(30.0, 3.0),
            imminent: Threshold::new(15.0, 2.0),
        }
    }

    /// Threshold for a tier; `None` has no threshold
    pub fn get(&self, risk: CollisionRisk) -> Option<&Threshold> {
        match risk {
            CollisionRisk::None => None,
            CollisionRisk::Low => Some(&self.low),
            CollisionRisk::Medium => Some(&self.medium),
            CollisionRisk::High => Some(&self.high),
            CollisionRisk::Imminent => Some(&self.imminent),
        }
    }

    /// Evaluate tiers from most severe down; the first one met wins
    pub fn evaluate(&self, distance_m: f32, ttc_s: f32) -> CollisionRisk {
        CollisionRisk::DESCENDING
            .into_iter()
            .find(|&risk| self.get(risk).is_some_and(|t| t.is_met(distance_m, ttc_s)))
            .unwrap_or(CollisionRisk::None)
    }

    /// Thresholds must be positive and tighten as severity rises
    pub fn validate(&self) -> Result<(), ProximityError> {
        let tiers = [self.low, self.medium, self.high, self.imminent];

        for t in &tiers {
            if !(t.distance_m > 0.0 && t.ttc_s > 0.0) {
                return Err(ProximityError::InvalidConfig(format!(
                    "threshold values must be positive, got {t:?}"
                )));
            }
        }

        for pair in tiers.windows(2) {
            if pair[1].distance_m > pair[0].distance_m || pair[1].ttc_s > pair[0].ttc_s {
                return Err(ProximityError::InvalidConfig(format!(
                    "thresholds must not loosen with severity: {:?} then {:?}",
                    pair[0], pair[1]
                )));
            }
        }

        Ok(())
    }
}

/// Default table plus per-category overrides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    /// Table for categories without an override
    pub default: ThresholdTable,

    /// Category-specific tables
    pub categories: HashMap<ObjectCategory, ThresholdTable>,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        let categories = ObjectCategory::ALL
            .into_iter()
            .filter(|c| c.is_vulnerable())
            .map(|c| (c, ThresholdTable::vulnerable_road_user()))
            .collect();

        Self {
            default: ThresholdTable::default(),
            categories,
        }
    }
}

impl RiskThresholds {
    /// Table for a category, falling back to the default
    pub fn resolve(&self, category: ObjectCategory) -> &ThresholdTable {
        self.categories.get(&category).unwrap_or(&self.default)
    }

    /// Validate the default table and every category override
    pub fn validate(&self) -> Result<(), ProximityError> {
        self.default.validate()?;
        for table in self.categories.values() {
            table.validate()?;
        }
        Ok(())
    }
}

/// Maps distance, closing speed and category to a risk tier
#[derive(Debug, Clone, Default)]
pub struct RiskClassifier {
    thresholds: RiskThresholds,
}

impl RiskClassifier {
    /// Create a classifier over the given threshold tables
    pub fn new(thresholds: RiskThresholds) -> Self {
        Self { thresholds }
    }

    /// Threshold tables in use
    pub fn thresholds(&self) -> &RiskThresholds {
        &self.thresholds
    }

    /// Classify one object.
    ///
    /// Objects that are not approaching (host stopped, or closing speed not
    /// positive) carry no risk. Otherwise distance and time-to-collision are
    /// checked independently and the more severe signal wins.
    pub fn classify(
        &self,
        distance_m: f32,
        closing_speed_mps: f32,
        vehicle_speed_mps: f32,
        category: ObjectCategory,
    ) -> CollisionRisk {
        if !(vehicle_speed_mps > 0.0) || !(closing_speed_mps > 0.0) || !distance_m.is_finite() {
            return CollisionRisk::None;
        }

        let ttc_s = distance_m / closing_speed_mps;
        self.thresholds.resolve(category).evaluate(distance_m, ttc_s)
    }
}
