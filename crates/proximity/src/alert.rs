//! Scene alert gating
//!
//! Turns per-frame scene summaries into driver-facing alerts with per-level
//! cooldown, so a sustained hazard does not re-alert on every frame. A level
//! stays quiet while it or any more severe level is cooling down; only an
//! escalation alerts immediately.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::analysis::SceneSummary;
use crate::object::ObjectCategory;
use crate::risk::CollisionRisk;
use crate::track::{TrackId, TrackedObject};

/// Alert configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Lowest scene risk that raises an alert (default: medium)
    pub min_risk: CollisionRisk,
    /// Quiet period before the same or a lower level alerts again (milliseconds)
    pub cooldown_ms: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            min_risk: CollisionRisk::Medium,
            cooldown_ms: 3000,
        }
    }
}

/// Driver-facing proximity alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProximityAlert {
    /// Vehicle or other obstacle closing in
    CollisionWarning {
        risk: CollisionRisk,
        distance_m: Option<f32>,
        category: ObjectCategory,
        track: TrackId,
    },

    /// Pedestrian, cyclist or motorcyclist closing in
    VulnerableRoadUser {
        risk: CollisionRisk,
        distance_m: Option<f32>,
        category: ObjectCategory,
        track: TrackId,
    },
}

impl ProximityAlert {
    /// Risk level the alert was raised at
    pub fn risk(&self) -> CollisionRisk {
        match self {
            ProximityAlert::CollisionWarning { risk, .. }
            | ProximityAlert::VulnerableRoadUser { risk, .. } => *risk,
        }
    }

    fn for_track(risk: CollisionRisk, track: &TrackedObject) -> Self {
        if track.category.is_vulnerable() {
            ProximityAlert::VulnerableRoadUser {
                risk,
                distance_m: track.distance_m,
                category: track.category,
                track: track.id,
            }
        } else {
            ProximityAlert::CollisionWarning {
                risk,
                distance_m: track.distance_m,
                category: track.category,
                track: track.id,
            }
        }
    }
}

/// Cooldown gate between scene summaries and alerts
#[derive(Debug, Clone)]
pub struct WarningGate {
    config: AlertConfig,
    /// Last fire time per risk level (frame timestamps, ns)
    last_fired: HashMap<CollisionRisk, u64>,
    fire_count: usize,
}

impl WarningGate {
    /// Create a gate with no alert history
    pub fn new(config: AlertConfig) -> Self {
        Self {
            config,
            last_fired: HashMap::new(),
            fire_count: 0,
        }
    }

    /// Check whether a scene at `risk` should alert at `timestamp_ns`
    pub fn should_fire(&self, risk: CollisionRisk, timestamp_ns: u64) -> bool {
        if risk == CollisionRisk::None || risk < self.config.min_risk {
            return false;
        }

        let cooldown_ns = self.config.cooldown_ms.saturating_mul(1_000_000);
        // Timestamps running backwards count as still cooling down
        let cooling = self
            .last_fired
            .iter()
            .filter(|(level, _)| **level >= risk)
            .find(|(_, last)| timestamp_ns.saturating_sub(**last) < cooldown_ns);

        if let Some((level, _)) = cooling {
            debug!("Alert suppressed: {} while {} in cooldown", risk, level);
            return false;
        }

        true
    }

    /// Evaluate a processed frame; returns the alert to raise, if any
    pub fn evaluate(
        &mut self,
        summary: &SceneSummary,
        tracks: &[TrackedObject],
        timestamp_ns: u64,
    ) -> Option<ProximityAlert> {
        let risk = summary.highest_risk;
        if !self.should_fire(risk, timestamp_ns) {
            return None;
        }

        let track = summary
            .most_critical
            .and_then(|id| tracks.iter().find(|t| t.id == id))?;

        self.last_fired.insert(risk, timestamp_ns);
        self.fire_count += 1;

        let alert = ProximityAlert::for_track(risk, track);
        info!(
            "Proximity alert: {} {:?} at {:?} m (count: {})",
            risk, track.category, track.distance_m, self.fire_count
        );
        Some(alert)
    }

    /// Total alerts raised
    pub fn fire_count(&self) -> usize {
        self.fire_count
    }

    /// Forget cooldown state
    pub fn clear(&mut self) {
        self.last_fired.clear();
        self.fire_count = 0;
    }
}

impl Default for WarningGate {
    fn default() -> Self {
        Self::new(AlertConfig::default())
    }
}
