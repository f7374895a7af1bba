//! Detector output: bounding boxes, labels, and object categories

use serde::{Deserialize, Serialize};

/// Normalized bounding box (image fractions, top-left origin, y grows downward)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    /// Create a box from normalized top-left corner and size
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Right edge
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Bottom edge (closest to the vehicle for road objects)
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Area, treating negative extents as empty
    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// All four components are finite numbers
    pub fn is_finite(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
    }

    /// Overlapping area with another box
    pub fn intersection_area(&self, other: &BoundingBox) -> f32 {
        let iw = (self.right().min(other.right()) - self.x.max(other.x)).max(0.0);
        let ih = (self.bottom().min(other.bottom()) - self.y.max(other.y)).max(0.0);
        iw * ih
    }

    /// Intersection over union, 0.0 for empty or non-finite boxes
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        if !self.is_finite() || !other.is_finite() {
            return 0.0;
        }

        let intersection = self.intersection_area(other);
        let union = self.area() + other.area() - intersection;

        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }
}

/// Base category an object label resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectCategory {
    Person,
    Bicycle,
    Motorcycle,
    Car,
    Bus,
    Truck,
    TrafficLight,
    StopSign,
    /// Fallback for labels outside the known set
    Other,
}

/// Label substrings in match order. Longer/more specific names come first so
/// that e.g. "motorbike" never resolves through a shorter pattern.
const LABEL_PATTERNS: &[(&str, ObjectCategory)] = &[
    ("motorcycl", ObjectCategory::Motorcycle),
    ("motorbike", ObjectCategory::Motorcycle),
    ("scooter", ObjectCategory::Motorcycle),
    ("bicycle", ObjectCategory::Bicycle),
    ("cyclist", ObjectCategory::Bicycle),
    ("person", ObjectCategory::Person),
    ("pedestrian", ObjectCategory::Person),
    ("traffic light", ObjectCategory::TrafficLight),
    ("stop sign", ObjectCategory::StopSign),
    ("truck", ObjectCategory::Truck),
    ("bus", ObjectCategory::Bus),
    ("car", ObjectCategory::Car),
    ("vehicle", ObjectCategory::Car),
];

impl ObjectCategory {
    pub const ALL: [ObjectCategory; 9] = [
        ObjectCategory::Person,
        ObjectCategory::Bicycle,
        ObjectCategory::Motorcycle,
        ObjectCategory::Car,
        ObjectCategory::Bus,
        ObjectCategory::Truck,
        ObjectCategory::TrafficLight,
        ObjectCategory::StopSign,
        ObjectCategory::Other,
    ];

    /// Resolve a detector label by case-insensitive substring match.
    /// Separators `_` and `-` are treated as spaces ("traffic_light").
    pub fn from_label(label: &str) -> Self {
        let normalized: String = label
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == '_' || c == '-' { ' ' } else { c })
            .collect();

        LABEL_PATTERNS
            .iter()
            .find(|(pattern, _)| normalized.contains(pattern))
            .map(|&(_, category)| category)
            .unwrap_or(ObjectCategory::Other)
    }

    /// Typical real-world width in meters, used by the pinhole projection
    pub fn known_width_m(self) -> f32 {
        match self {
            ObjectCategory::Person => 0.5,
            ObjectCategory::Bicycle => 0.6,
            ObjectCategory::Motorcycle => 0.8,
            ObjectCategory::Car => 1.8,
            ObjectCategory::Bus => 2.5,
            ObjectCategory::Truck => 2.5,
            ObjectCategory::TrafficLight => 0.3,
            ObjectCategory::StopSign => 0.6,
            // Narrow width keeps the estimate on the near side
            ObjectCategory::Other => 0.5,
        }
    }

    /// Pedestrians and riders
    pub fn is_vulnerable(self) -> bool {
        matches!(
            self,
            ObjectCategory::Person | ObjectCategory::Bicycle | ObjectCategory::Motorcycle
        )
    }
}

/// Single detector result for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedObject {
    /// Detector class label
    pub label: String,

    /// Detection confidence (0-1)
    pub confidence: f32,

    /// Normalized bounding box
    pub bbox: BoundingBox,
}

impl DetectedObject {
    /// Create a detection as reported by the detector
    pub fn new(label: impl Into<String>, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            label: label.into(),
            confidence,
            bbox,
        }
    }

    /// Category looked up from the label
    pub fn category(&self) -> ObjectCategory {
        ObjectCategory::from_label(&self.label)
    }
}

/// Everything the engine needs for one processing cycle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionFrame {
    /// Detections for this frame
    pub detections: Vec<DetectedObject>,

    /// Capture timestamp (nanoseconds, monotonic or wall clock)
    pub timestamp_ns: u64,

    /// Image width in pixels
    pub image_width: u32,

    /// Image height in pixels
    pub image_height: u32,

    /// Host vehicle speed (m/s)
    pub vehicle_speed_mps: f32,
}

impl DetectionFrame {
    /// Create a frame of detections
    pub fn new(
        detections: Vec<DetectedObject>,
        timestamp_ns: u64,
        image_width: u32,
        image_height: u32,
        vehicle_speed_mps: f32,
    ) -> Self {
        Self {
            detections,
            timestamp_ns,
            image_width,
            image_height,
            vehicle_speed_mps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_resolution() {
        assert_eq!(ObjectCategory::from_label("person"), ObjectCategory::Person);
        assert_eq!(ObjectCategory::from_label("Pedestrian"), ObjectCategory::Person);
        assert_eq!(ObjectCategory::from_label("motorcycle"), ObjectCategory::Motorcycle);
        assert_eq!(ObjectCategory::from_label("motorbike"), ObjectCategory::Motorcycle);
        assert_eq!(ObjectCategory::from_label("motorcyclist"), ObjectCategory::Motorcycle);
        assert_eq!(ObjectCategory::from_label("cyclist"), ObjectCategory::Bicycle);
        assert_eq!(ObjectCategory::from_label("bicycle"), ObjectCategory::Bicycle);
        assert_eq!(ObjectCategory::from_label("traffic_light"), ObjectCategory::TrafficLight);
        assert_eq!(ObjectCategory::from_label("Stop Sign"), ObjectCategory::StopSign);
        assert_eq!(ObjectCategory::from_label("pickup truck"), ObjectCategory::Truck);
        assert_eq!(ObjectCategory::from_label("school bus"), ObjectCategory::Bus);
        assert_eq!(ObjectCategory::from_label("car"), ObjectCategory::Car);
    }

    #[test]
    fn test_unknown_label_falls_back() {
        assert_eq!(ObjectCategory::from_label("giraffe"), ObjectCategory::Other);
        assert_eq!(ObjectCategory::from_label(""), ObjectCategory::Other);
        assert_eq!(ObjectCategory::Other.known_width_m(), 0.5);
    }

    #[test]
    fn test_known_widths() {
        assert_eq!(ObjectCategory::Person.known_width_m(), 0.5);
        assert_eq!(ObjectCategory::Car.known_width_m(), 1.8);
        assert_eq!(ObjectCategory::Bus.known_width_m(), 2.5);
        assert_eq!(ObjectCategory::Truck.known_width_m(), 2.5);
        assert_eq!(ObjectCategory::Bicycle.known_width_m(), 0.6);
        assert_eq!(ObjectCategory::TrafficLight.known_width_m(), 0.3);
        assert_eq!(ObjectCategory::StopSign.known_width_m(), 0.6);
    }

    #[test]
    fn test_iou() {
        let a = BoundingBox::new(0.0, 0.0, 0.2, 0.2);
        let b = BoundingBox::new(0.1, 0.0, 0.2, 0.2);
        let c = BoundingBox::new(0.5, 0.5, 0.2, 0.2);

        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
        // Overlap 0.1 x 0.2 = 0.02, union 0.04 + 0.04 - 0.02 = 0.06
        assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-4);
        assert_eq!(a.iou(&c), 0.0);
    }

    #[test]
    fn test_iou_degenerate_boxes() {
        let empty = BoundingBox::new(0.3, 0.3, 0.0, 0.0);
        let nan = BoundingBox::new(f32::NAN, 0.0, 0.1, 0.1);
        let normal = BoundingBox::new(0.3, 0.3, 0.1, 0.1);

        assert_eq!(empty.iou(&empty), 0.0);
        assert_eq!(nan.iou(&normal), 0.0);
    }
}
