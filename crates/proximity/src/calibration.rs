//! Camera calibration supplied once, ahead of per-frame processing

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::ProximityError;

/// Pinhole camera parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraCalibration {
    /// Horizontal focal length (pixels)
    pub focal_length_px: f32,

    /// Image width the focal length was measured at
    pub reference_width: Option<u32>,

    /// Horizon row as an image fraction, from the principal point
    pub horizon_fraction: Option<f32>,
}

impl CameraCalibration {
    /// Calibration from a known focal length
    pub fn new(focal_length_px: f32) -> Result<Self, ProximityError> {
        if !focal_length_px.is_finite() || focal_length_px <= 0.0 {
            return Err(ProximityError::InvalidCalibration(format!(
                "focal length must be positive, got {focal_length_px}"
            )));
        }

        Ok(Self {
            focal_length_px,
            reference_width: None,
            horizon_fraction: None,
        })
    }

    /// Derive the focal length from the horizontal field of view:
    /// `f = (w / 2) / tan(fov / 2)`
    pub fn from_horizontal_fov(fov_deg: f32, image_width_px: u32) -> Result<Self, ProximityError> {
        if !(fov_deg > 0.0 && fov_deg < 180.0) {
            return Err(ProximityError::InvalidCalibration(format!(
                "field of view must be in (0, 180) degrees, got {fov_deg}"
            )));
        }
        if image_width_px == 0 {
            return Err(ProximityError::InvalidCalibration(
                "image width must be non-zero".into(),
            ));
        }

        let half_fov = (fov_deg / 2.0).to_radians();
        let focal = (image_width_px as f32 / 2.0) / half_fov.tan();
        info!(
            "Calibrated from {:.1} deg FOV at {} px: focal length {:.1} px",
            fov_deg, image_width_px, focal
        );

        Ok(Self {
            reference_width: Some(image_width_px),
            ..Self::new(focal)?
        })
    }

    /// Read fx and the principal point from a 3x3 intrinsic matrix
    /// `[[fx, s, cx], [0, fy, cy], [0, 0, 1]]` measured at the given image size.
    pub fn from_intrinsics(
        matrix: [[f32; 3]; 3],
        image_width_px: u32,
        image_height_px: u32,
    ) -> Result<Self, ProximityError> {
        if image_width_px == 0 || image_height_px == 0 {
            return Err(ProximityError::InvalidCalibration(format!(
                "image size must be non-zero, got {image_width_px}x{image_height_px}"
            )));
        }

        let fx = matrix[0][0];
        let cy = matrix[1][2];

        // Zero camera pitch puts the horizon on the principal point row
        let fraction = cy / image_height_px as f32;
        let horizon_fraction = (fraction > 0.0 && fraction < 1.0).then_some(fraction);

        let calibration = Self {
            reference_width: Some(image_width_px),
            horizon_fraction,
            ..Self::new(fx)?
        };
        info!(
            "Calibrated from intrinsics: fx={:.1} px, horizon at {:?}",
            fx, calibration.horizon_fraction
        );

        Ok(calibration)
    }

    /// Focal length scaled to the width of the frame being processed.
    /// Frames at the reference width (or with no reference) use it as-is.
    pub fn focal_length_for_width(&self, image_width_px: u32) -> f32 {
        match self.reference_width {
            Some(ref_width) if ref_width > 0 && image_width_px > 0 => {
                self.focal_length_px * image_width_px as f32 / ref_width as f32
            }
            _ => self.focal_length_px,
        }
    }
}
