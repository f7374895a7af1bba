//! Monocular distance estimation
//!
//! Two estimates are blended:
//! - pinhole projection of the object's known real-world width
//! - ground-plane position of the box's bottom edge relative to the horizon
//!
//! The projection term is dropped whenever it cannot be computed (no
//! calibration, zero-width box, zero image width).

use tracing::{trace, warn};

use crate::calibration::CameraCalibration;
use crate::config::ProximityConfig;
use crate::object::{BoundingBox, DetectedObject};

/// Geometric distance estimator
#[derive(Debug, Clone)]
pub struct DistanceEstimator {
    projection_weight: f32,
    min_distance_m: f32,
    max_distance_m: f32,
    horizon_fraction: f32,
}

impl DistanceEstimator {
    /// Build an estimator from the engine configuration
    pub fn new(config: &ProximityConfig) -> Self {
        Self {
            projection_weight: config.projection_weight,
            min_distance_m: config.min_distance_m,
            max_distance_m: config.max_distance_m,
            horizon_fraction: config.horizon_fraction,
        }
    }

    /// Estimate the distance (meters) to a detected object.
    ///
    /// Returns `None` only for boxes with non-finite coordinates.
    pub fn estimate(
        &self,
        object: &DetectedObject,
        image_width_px: u32,
        calibration: Option<&CameraCalibration>,
    ) -> Option<f32> {
        if !object.bbox.is_finite() {
            warn!("Non-finite bounding box for {}: {:?}", object.label, object.bbox);
            return None;
        }

        let horizon = calibration
            .and_then(|c| c.horizon_fraction)
            .unwrap_or(self.horizon_fraction);
        let ground = self.ground_plane_distance(&object.bbox, horizon);

        let projected = calibration.and_then(|c| {
            projection_distance(
                object.category().known_width_m(),
                object.bbox.width,
                image_width_px,
                c.focal_length_for_width(image_width_px),
            )
        });

        let distance = match projected {
            Some(p) => self.projection_weight * p + (1.0 - self.projection_weight) * ground,
            None => {
                trace!("No projection term for {}, ground plane only", object.label);
                ground
            }
        };

        Some(distance.max(self.min_distance_m))
    }

    /// Flat-ground distance from the box's bottom edge.
    ///
    /// A bottom edge on the last image row maps to `min_distance_m`; the
    /// distance grows inversely with the gap to the horizon and saturates at
    /// `max_distance_m` at or above it.
    pub fn ground_plane_distance(&self, bbox: &BoundingBox, horizon_fraction: f32) -> f32 {
        let bottom = bbox.bottom().clamp(0.0, 1.0);
        if bottom <= horizon_fraction {
            return self.max_distance_m;
        }

        let below_horizon = (bottom - horizon_fraction) / (1.0 - horizon_fraction);
        (self.min_distance_m / below_horizon).clamp(self.min_distance_m, self.max_distance_m)
    }
}

impl Default for DistanceEstimator {
    fn default() -> Self {
        Self::new(&ProximityConfig::default())
    }
}

/// Pinhole projection: `distance = known_width * focal / pixel_width`.
/// `None` when the box has no usable width in pixels.
pub fn projection_distance(
    known_width_m: f32,
    bbox_width_fraction: f32,
    image_width_px: u32,
    focal_length_px: f32,
) -> Option<f32> {
    let pixel_width = bbox_width_fraction * image_width_px as f32;
    if !(pixel_width > 0.0) || !pixel_width.is_finite() {
        return None;
    }

    let distance = known_width_m * focal_length_px / pixel_width;
    distance.is_finite().then_some(distance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn calibration() -> CameraCalibration {
        CameraCalibration::new(1000.0).unwrap()
    }

    #[test]
    fn test_projection_scenario() {
        // Person, 10% of a 1000 px frame, f = 1000 px: 0.5 * 1000 / 100 = 5 m
        let d = projection_distance(0.5, 0.1, 1000, 1000.0).unwrap();
        assert!((d - 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_blended_estimate() {
        let estimator = DistanceEstimator::default();
        // Bottom edge at 0.9: 0.8 of the way below the horizon -> 1.25 m
        let person = DetectedObject::new("person", 0.9, BoundingBox::new(0.45, 0.5, 0.1, 0.4));

        let ground = estimator.ground_plane_distance(&person.bbox, 0.5);
        assert!((ground - 1.25).abs() < 1e-4);

        let d = estimator.estimate(&person, 1000, Some(&calibration())).unwrap();
        // 0.7 * 5.0 + 0.3 * 1.25
        assert!((d - 3.875).abs() < 1e-3);
    }

    #[test]
    fn test_ground_plane_extremes() {
        let estimator = DistanceEstimator::default();

        let at_bottom = BoundingBox::new(0.4, 0.6, 0.2, 0.4);
        assert!((estimator.ground_plane_distance(&at_bottom, 0.5) - 1.0).abs() < 1e-4);

        let at_horizon = BoundingBox::new(0.4, 0.25, 0.2, 0.25);
        assert_eq!(estimator.ground_plane_distance(&at_horizon, 0.5), 100.0);

        let above_horizon = BoundingBox::new(0.4, 0.0, 0.1, 0.1);
        assert_eq!(estimator.ground_plane_distance(&above_horizon, 0.5), 100.0);

        // Just below the horizon saturates rather than exceeding the cap
        let near_horizon = BoundingBox::new(0.4, 0.4, 0.1, 0.1001);
        assert_eq!(estimator.ground_plane_distance(&near_horizon, 0.5), 100.0);
    }

    #[test]
    fn test_ground_plane_monotonic_in_bottom_edge() {
        let estimator = DistanceEstimator::default();
        let mut last = f32::INFINITY;
        for step in 0..=10 {
            let bottom = 0.5 + step as f32 * 0.05;
            let bbox = BoundingBox::new(0.4, bottom - 0.1, 0.1, 0.1);
            let d = estimator.ground_plane_distance(&bbox, 0.5);
            assert!(d <= last);
            last = d;
        }
    }

    #[test]
    fn test_uncalibrated_uses_ground_plane() {
        let estimator = DistanceEstimator::default();
        let car = DetectedObject::new("car", 0.9, BoundingBox::new(0.3, 0.5, 0.3, 0.25));

        let d = estimator.estimate(&car, 1920, None).unwrap();
        assert!((d - estimator.ground_plane_distance(&car.bbox, 0.5)).abs() < 1e-6);
    }

    #[test]
    fn test_calibrated_horizon_overrides_config() {
        let estimator = DistanceEstimator::default();
        let k = [[1000.0, 0.0, 500.0], [0.0, 1000.0, 400.0], [0.0, 0.0, 1.0]];
        let calibration = CameraCalibration::from_intrinsics(k, 1000, 1000).unwrap();
        // Bottom edge at 0.45: above a 0.5 horizon, below a 0.4 one
        let sign = DetectedObject::new("stop sign", 0.9, BoundingBox::new(0.7, 0.35, 0.0, 0.1));

        let d = estimator.estimate(&sign, 1000, Some(&calibration)).unwrap();
        let expected = estimator.ground_plane_distance(&sign.bbox, 0.4);
        assert!((d - expected).abs() < 1e-4);
        assert!(d < 100.0);
    }

    #[test]
    fn test_unknown_label_uses_fallback_width() {
        let estimator = DistanceEstimator {
            projection_weight: 1.0,
            ..Default::default()
        };
        let thing = DetectedObject::new("mailbox", 0.6, BoundingBox::new(0.4, 0.5, 0.05, 0.1));
        let d = estimator.estimate(&thing, 1000, Some(&calibration())).unwrap();
        // 0.5 m fallback width over 50 px at f = 1000
        assert!((d - 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_distance_floor() {
        let estimator = DistanceEstimator::default();
        // Box four frames wide projects to 0.625 m, blended 0.74 m
        let truck = DetectedObject::new("truck", 0.9, BoundingBox::new(-1.5, 0.2, 4.0, 0.8));
        let d = estimator.estimate(&truck, 1000, Some(&calibration())).unwrap();
        assert_eq!(d, 1.0);
    }

    #[test]
    fn test_non_finite_box_has_no_distance() {
        let estimator = DistanceEstimator::default();
        let broken = DetectedObject::new("car", 0.9, BoundingBox::new(0.1, f32::NAN, 0.2, 0.2));
        assert!(estimator.estimate(&broken, 1000, Some(&calibration())).is_none());
    }

    #[test]
    fn test_zero_image_width_skips_projection() {
        assert!(projection_distance(1.8, 0.2, 0, 1000.0).is_none());
        assert!(projection_distance(1.8, -0.2, 1000, 1000.0).is_none());
    }

    proptest! {
        #[test]
        fn prop_zero_width_is_ground_plane_only(
            x in 0.0f32..1.0,
            y in 0.0f32..1.0,
            h in 0.0f32..1.0,
            image_width in 1u32..4000,
            focal in 100.0f32..3000.0,
        ) {
            let estimator = DistanceEstimator::default();
            let calibration = CameraCalibration::new(focal).unwrap();
            let object = DetectedObject::new("person", 0.7, BoundingBox::new(x, y, 0.0, h));

            let d = estimator.estimate(&object, image_width, Some(&calibration)).unwrap();
            let ground = estimator.ground_plane_distance(&object.bbox, 0.5);
            prop_assert!(d.is_finite());
            prop_assert!((d - ground.max(1.0)).abs() < 1e-6);
        }
    }
}
