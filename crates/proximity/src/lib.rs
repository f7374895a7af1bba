//! Proximity Tracking Engine
//!
//! Collision-risk estimation from monocular object detections:
//! - Distance from known object widths and ground-plane geometry
//! - Frame-to-frame tracking by bounding-box overlap
//! - Closing speed from consecutive distance estimates
//! - Per-category collision risk tiers
//! - Scene-level closest distance, highest risk, and alerts
//!
//! The engine is a synchronous per-frame pipeline. Calls must be serialized
//! by the host (one frame at a time); tracks live only while visible.

pub mod alert;
pub mod analysis;
pub mod calibration;
pub mod config;
pub mod distance;
pub mod matcher;
pub mod object;
pub mod risk;
pub mod telemetry;
pub mod track;

pub use alert::{AlertConfig, ProximityAlert, WarningGate};
pub use analysis::{ProximityAnalysis, SceneSummary};
pub use calibration::CameraCalibration;
pub use config::ProximityConfig;
pub use distance::DistanceEstimator;
pub use matcher::ObjectMatcher;
pub use object::{BoundingBox, DetectedObject, DetectionFrame, ObjectCategory};
pub use risk::{CollisionRisk, RiskClassifier, RiskThresholds, Threshold, ThresholdTable};
pub use track::{TrackHistory, TrackId, TrackUpdater, TrackedObject};

use thiserror::Error;
use tracing::{debug, info, trace, warn};

/// Proximity engine error types
#[derive(Error, Debug)]
pub enum ProximityError {
    #[error("Invalid calibration: {0}")]
    InvalidCalibration(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

impl From<::config::ConfigError> for ProximityError {
    fn from(err: ::config::ConfigError) -> Self {
        ProximityError::Config(err.to_string())
    }
}

/// Proximity tracking engine
pub struct ProximityEngine {
    config: ProximityConfig,
    calibration: Option<CameraCalibration>,
    estimator: DistanceEstimator,
    matcher: ObjectMatcher,
    updater: TrackUpdater,
    warning_gate: WarningGate,
    /// Tracks from the last processed frame
    tracks: Vec<TrackedObject>,
    last_processed_ns: Option<u64>,
    warned_uncalibrated: bool,
}

impl ProximityEngine {
    /// Create a new engine; calibration can be supplied later
    pub fn new(config: ProximityConfig) -> Result<Self, ProximityError> {
        config.validate()?;
        info!(
            "Creating proximity engine (IoU {:.2}, projection weight {:.2}, interval {} ms)",
            config.iou_match_threshold, config.projection_weight, config.processing_interval_ms
        );

        Ok(Self {
            estimator: DistanceEstimator::new(&config),
            matcher: ObjectMatcher::new(config.iou_match_threshold),
            updater: TrackUpdater::new(RiskClassifier::new(config.risk.clone())),
            warning_gate: WarningGate::new(config.alerts.clone()),
            calibration: None,
            tracks: Vec::new(),
            last_processed_ns: None,
            warned_uncalibrated: false,
            config,
        })
    }

    /// Create an engine with calibration already known
    pub fn with_calibration(
        config: ProximityConfig,
        calibration: CameraCalibration,
    ) -> Result<Self, ProximityError> {
        let mut engine = Self::new(config)?;
        engine.calibrate(calibration);
        Ok(engine)
    }

    /// Set or replace the camera calibration
    pub fn calibrate(&mut self, calibration: CameraCalibration) {
        info!(
            "Camera calibrated: focal length {:.1} px",
            calibration.focal_length_px
        );
        self.calibration = Some(calibration);
    }

    /// Current camera calibration, if any
    pub fn calibration(&self) -> Option<&CameraCalibration> {
        self.calibration.as_ref()
    }

    /// Active engine configuration
    pub fn config(&self) -> &ProximityConfig {
        &self.config
    }

    /// Tracks from the last processed frame
    pub fn tracks(&self) -> &[TrackedObject] {
        &self.tracks
    }

    /// Scene summary of the last processed frame
    pub fn summary(&self) -> SceneSummary {
        SceneSummary::from_tracks(&self.tracks)
    }

    /// Process one frame.
    ///
    /// Returns `None` when the frame falls inside the processing interval;
    /// the previous working set is kept untouched in that case. Malformed
    /// detections never fail the frame, they degrade to conservative values.
    pub fn process(&mut self, frame: &DetectionFrame) -> Option<ProximityAnalysis> {
        let timestamp_ns = frame.timestamp_ns;

        if self.is_throttled(timestamp_ns) {
            trace!("Frame at {} ns skipped by processing interval", timestamp_ns);
            return None;
        }
        self.last_processed_ns = Some(timestamp_ns);

        if self.calibration.is_none() && !self.warned_uncalibrated {
            warn!("Engine not calibrated, using ground-plane distance only");
            self.warned_uncalibrated = true;
        }

        let vehicle_speed_mps = if frame.vehicle_speed_mps.is_finite() {
            frame.vehicle_speed_mps
        } else {
            warn!("Non-finite vehicle speed {}, treating as stationary", frame.vehicle_speed_mps);
            0.0
        };

        let detections: Vec<DetectedObject> = frame
            .detections
            .iter()
            .filter_map(|d| {
                let mut d = d.clone();
                if d.confidence.is_nan() {
                    warn!("NaN confidence for {}, treating as 0", d.label);
                    d.confidence = 0.0;
                }
                (d.confidence >= self.config.min_confidence).then_some(d)
            })
            .collect();

        let assignments = self.matcher.associate(&detections, &self.tracks);
        let matched = assignments.iter().flatten().count();

        let next: Vec<TrackedObject> = detections
            .into_iter()
            .zip(assignments)
            .map(|(object, assigned)| {
                let distance_m =
                    self.estimator
                        .estimate(&object, frame.image_width, self.calibration.as_ref());

                match assigned {
                    Some(index) => self.updater.advance(
                        &self.tracks[index],
                        object,
                        distance_m,
                        timestamp_ns,
                        vehicle_speed_mps,
                    ),
                    None => self
                        .updater
                        .start(object, distance_m, timestamp_ns, vehicle_speed_mps),
                }
            })
            .collect();

        debug!(
            "Frame {} ns: {} tracks ({} continued, {} new, {} dropped)",
            timestamp_ns,
            next.len(),
            matched,
            next.len() - matched,
            self.tracks.len() - matched
        );
        self.tracks = next;

        let summary = SceneSummary::from_tracks(&self.tracks);
        let alerts = self
            .warning_gate
            .evaluate(&summary, &self.tracks, timestamp_ns)
            .into_iter()
            .collect();

        Some(ProximityAnalysis {
            timestamp_ns,
            tracks: self.tracks.clone(),
            summary,
            alerts,
        })
    }

    /// Drop all tracks, throttle and alert state (e.g. on camera restart)
    pub fn reset(&mut self) {
        self.tracks.clear();
        self.last_processed_ns = None;
        self.warning_gate.clear();
    }

    fn is_throttled(&self, timestamp_ns: u64) -> bool {
        let interval_ns = self.config.processing_interval_ms.saturating_mul(1_000_000);
        match self.last_processed_ns {
            // Timestamps running backwards are processed rather than stalling
            Some(last) if interval_ns > 0 && timestamp_ns >= last => {
                timestamp_ns - last < interval_ns
            }
            _ => false,
        }
    }
}
