//! Scene-level aggregation and per-frame results

use serde::{Deserialize, Serialize};

use crate::alert::ProximityAlert;
use crate::risk::CollisionRisk;
use crate::track::{TrackId, TrackedObject};

/// Scene-wide reduction of all current tracks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSummary {
    /// Closest estimated distance (meters, infinite with nothing tracked)
    pub closest_distance_m: f32,

    /// Highest risk across all tracks, by severity rank
    pub highest_risk: CollisionRisk,

    /// Number of tracked objects
    pub object_count: usize,

    /// Track carrying the highest risk (closest one on ties)
    pub most_critical: Option<TrackId>,
}

impl Default for SceneSummary {
    fn default() -> Self {
        Self {
            closest_distance_m: f32::INFINITY,
            highest_risk: CollisionRisk::None,
            object_count: 0,
            most_critical: None,
        }
    }
}

impl SceneSummary {
    /// Reduce a working set to its closest distance and highest risk
    pub fn from_tracks(tracks: &[TrackedObject]) -> Self {
        let closest_distance_m = tracks
            .iter()
            .filter_map(|t| t.distance_m)
            .fold(f32::INFINITY, f32::min);

        let critical = tracks.iter().max_by(|a, b| {
            a.risk.cmp(&b.risk).then_with(|| {
                // Nearer wins a tie, so compare distances reversed
                let da = a.distance_m.unwrap_or(f32::INFINITY);
                let db = b.distance_m.unwrap_or(f32::INFINITY);
                db.total_cmp(&da)
            })
        });

        Self {
            closest_distance_m,
            highest_risk: critical.map_or(CollisionRisk::None, |t| t.risk),
            object_count: tracks.len(),
            most_critical: critical.map(|t| t.id),
        }
    }

    /// Nothing at or above `Low`
    pub fn is_clear(&self) -> bool {
        self.highest_risk == CollisionRisk::None
    }
}

/// Result of processing one frame
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProximityAnalysis {
    /// Frame timestamp (ns)
    pub timestamp_ns: u64,

    /// Current tracks
    pub tracks: Vec<TrackedObject>,

    /// Scene reduction
    pub summary: SceneSummary,

    /// Alerts raised by this frame
    pub alerts: Vec<ProximityAlert>,
}

impl ProximityAnalysis {
    /// Check if any alert is high or imminent
    pub fn has_critical_alerts(&self) -> bool {
        self.alerts.iter().any(|a| a.risk() >= CollisionRisk::High)
    }

    /// Look up a track by id
    pub fn track(&self, id: TrackId) -> Option<&TrackedObject> {
        self.tracks.iter().find(|t| t.id == id)
    }
}
