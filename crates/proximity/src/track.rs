//! Tracked objects and frame-to-frame state updates

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::object::{BoundingBox, DetectedObject, ObjectCategory};
use crate::risk::{CollisionRisk, RiskClassifier};

/// Track identity, stable while the object keeps matching frame to frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackId(Uuid);

impl TrackId {
    /// Mint a fresh id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TrackId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Previous frame's observation, kept for velocity estimation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackHistory {
    pub bbox: BoundingBox,
    pub distance_m: Option<f32>,
    pub timestamp_ns: u64,
}

/// Object tracked across consecutive frames
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedObject {
    /// Stable identity
    pub id: TrackId,

    /// Current detection
    pub object: DetectedObject,

    /// Category resolved from the detection label
    pub category: ObjectCategory,

    /// Estimated distance (meters); absent when estimation failed
    pub distance_m: Option<f32>,

    /// Closing speed (m/s, positive = approaching)
    pub closing_speed_mps: f32,

    /// Current collision risk
    pub risk: CollisionRisk,

    /// First frame this track appeared in (ns)
    pub first_seen_ns: u64,

    /// Frame this track was last updated in (ns)
    pub last_updated_ns: u64,

    /// Previous frame's observation; `None` on a track's first frame
    pub previous: Option<TrackHistory>,
}

impl TrackedObject {
    /// Fresh track with no history and no risk yet
    pub fn new(
        object: DetectedObject,
        distance_m: Option<f32>,
        closing_speed_mps: f32,
        timestamp_ns: u64,
    ) -> Self {
        Self {
            id: TrackId::new(),
            category: object.category(),
            object,
            distance_m,
            closing_speed_mps,
            risk: CollisionRisk::None,
            first_seen_ns: timestamp_ns,
            last_updated_ns: timestamp_ns,
            previous: None,
        }
    }

    /// Latest bounding box
    pub fn bbox(&self) -> &BoundingBox {
        &self.object.bbox
    }

    /// Positive closing speed
    pub fn is_approaching(&self) -> bool {
        self.closing_speed_mps > 0.0
    }

    /// Time to collision (seconds), when approaching at a known distance
    pub fn time_to_collision(&self) -> Option<f32> {
        let distance = self.distance_m?;
        self.is_approaching().then(|| distance / self.closing_speed_mps)
    }

    /// Seconds since the track first appeared
    pub fn age_s(&self) -> f32 {
        self.last_updated_ns.saturating_sub(self.first_seen_ns) as f32 / 1e9
    }
}

/// Builds the next state of a track from the current frame
#[derive(Debug, Clone, Default)]
pub struct TrackUpdater {
    classifier: RiskClassifier,
}

impl TrackUpdater {
    /// Create an updater classifying with `classifier`
    pub fn new(classifier: RiskClassifier) -> Self {
        Self { classifier }
    }

    /// Risk classifier applied to continued tracks
    pub fn classifier(&self) -> &RiskClassifier {
        &self.classifier
    }

    /// Start a track for an unmatched detection.
    ///
    /// Closing speed starts at the host speed; risk stays `None` until the
    /// track has a second frame to measure against.
    pub fn start(
        &self,
        object: DetectedObject,
        distance_m: Option<f32>,
        timestamp_ns: u64,
        vehicle_speed_mps: f32,
    ) -> TrackedObject {
        let track = TrackedObject::new(object, distance_m, vehicle_speed_mps, timestamp_ns);
        debug!("New track {} ({:?}) at {:?} m", track.id, track.category, distance_m);
        track
    }

    /// Continue `previous` with a matched detection
    pub fn advance(
        &self,
        previous: &TrackedObject,
        object: DetectedObject,
        distance_m: Option<f32>,
        timestamp_ns: u64,
        vehicle_speed_mps: f32,
    ) -> TrackedObject {
        let elapsed_s = (timestamp_ns as f64 - previous.last_updated_ns as f64) / 1e9;

        let closing_speed_mps = match (previous.distance_m, distance_m) {
            (Some(before), Some(now)) if elapsed_s > 0.0 => {
                let speed = ((before - now) as f64 / elapsed_s) as f32;
                if speed.is_finite() {
                    speed
                } else {
                    vehicle_speed_mps
                }
            }
            (Some(_), Some(_)) => {
                warn!(
                    "Track {}: non-positive elapsed time ({:.3} s), using host speed",
                    previous.id, elapsed_s
                );
                vehicle_speed_mps
            }
            _ => vehicle_speed_mps,
        };

        let risk = match distance_m {
            Some(d) => self
                .classifier
                .classify(d, closing_speed_mps, vehicle_speed_mps, previous.category),
            None => CollisionRisk::None,
        };

        TrackedObject {
            id: previous.id,
            category: previous.category,
            object,
            distance_m,
            closing_speed_mps,
            risk,
            first_seen_ns: previous.first_seen_ns,
            last_updated_ns: timestamp_ns,
            previous: Some(TrackHistory {
                bbox: previous.object.bbox,
                distance_m: previous.distance_m,
                timestamp_ns: previous.last_updated_ns,
            }),
        }
    }
}
