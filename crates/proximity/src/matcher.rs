//! Frame-to-frame association by bounding-box overlap

use tracing::debug;

use crate::object::DetectedObject;
use crate::track::TrackedObject;

/// Greedy IoU matcher between current detections and previous tracks
#[derive(Debug, Clone)]
pub struct ObjectMatcher {
    iou_threshold: f32,
}

impl ObjectMatcher {
    /// Create a matcher requiring IoU above `iou_threshold`
    pub fn new(iou_threshold: f32) -> Self {
        Self { iou_threshold }
    }

    /// IoU a detection must exceed to continue a track
    pub fn iou_threshold(&self) -> f32 {
        self.iou_threshold
    }

    /// For each detection (in order), the index of the previous track it
    /// continues, if any.
    ///
    /// Only tracks of the same category are candidates; the best-overlapping
    /// unclaimed track above the threshold wins, and each track is claimed by
    /// at most one detection.
    pub fn associate(
        &self,
        detections: &[DetectedObject],
        previous: &[TrackedObject],
    ) -> Vec<Option<usize>> {
        let mut claimed = vec![false; previous.len()];

        detections
            .iter()
            .map(|detection| {
                let category = detection.category();
                let best = previous
                    .iter()
                    .enumerate()
                    .filter(|(i, track)| !claimed[*i] && track.category == category)
                    .map(|(i, track)| (i, detection.bbox.iou(track.bbox())))
                    .filter(|&(_, iou)| iou > self.iou_threshold)
                    .max_by(|a, b| a.1.total_cmp(&b.1));

                if let Some((index, iou)) = best {
                    claimed[index] = true;
                    debug!(
                        "Matched {} to track {} (IoU {:.2})",
                        detection.label, previous[index].id, iou
                    );
                    Some(index)
                } else {
                    None
                }
            })
            .collect()
    }
}

impl Default for ObjectMatcher {
    fn default() -> Self {
        Self::new(0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::BoundingBox;
    use proptest::prelude::*;

    fn detection(label: &str, x: f32, y: f32, w: f32, h: f32) -> DetectedObject {
        DetectedObject::new(label, 0.9, BoundingBox::new(x, y, w, h))
    }

    fn tracked(label: &str, x: f32, y: f32, w: f32, h: f32) -> TrackedObject {
        TrackedObject::new(detection(label, x, y, w, h), Some(20.0), 0.0, 0)
    }

    #[test]
    fn test_identical_box_matches() {
        let matcher = ObjectMatcher::default();
        let previous = vec![tracked("car", 0.4, 0.5, 0.2, 0.2)];
        let current = vec![detection("car", 0.4, 0.5, 0.2, 0.2)];

        assert_eq!(matcher.associate(&current, &previous), vec![Some(0)]);
    }

    #[test]
    fn test_small_shift_matches() {
        let matcher = ObjectMatcher::default();
        let previous = vec![tracked("car", 0.40, 0.50, 0.20, 0.20)];
        // IoU = (0.18 * 0.2) / (0.04 + 0.04 - 0.036) = 0.818
        let current = vec![detection("car", 0.42, 0.50, 0.20, 0.20)];

        assert_eq!(matcher.associate(&current, &previous), vec![Some(0)]);
    }

    #[test]
    fn test_disjoint_box_does_not_match() {
        let matcher = ObjectMatcher::default();
        let previous = vec![tracked("car", 0.0, 0.0, 0.2, 0.2)];
        let current = vec![detection("car", 0.6, 0.6, 0.2, 0.2)];

        assert_eq!(matcher.associate(&current, &previous), vec![None]);
    }

    #[test]
    fn test_low_overlap_does_not_match() {
        let matcher = ObjectMatcher::default();
        let previous = vec![tracked("car", 0.0, 0.0, 0.2, 0.2)];
        // IoU = 1/3
        let current = vec![detection("car", 0.1, 0.0, 0.2, 0.2)];

        assert_eq!(matcher.associate(&current, &previous), vec![None]);
    }

    #[test]
    fn test_cross_category_never_matches() {
        let matcher = ObjectMatcher::default();
        let previous = vec![tracked("person", 0.4, 0.4, 0.1, 0.3)];
        let current = vec![detection("bicycle", 0.4, 0.4, 0.1, 0.3)];

        assert_eq!(matcher.associate(&current, &previous), vec![None]);
    }

    #[test]
    fn test_best_overlap_wins() {
        let matcher = ObjectMatcher::default();
        let previous = vec![
            tracked("car", 0.30, 0.5, 0.2, 0.2),
            tracked("car", 0.41, 0.5, 0.2, 0.2),
        ];
        let current = vec![detection("car", 0.40, 0.5, 0.2, 0.2)];

        assert_eq!(matcher.associate(&current, &previous), vec![Some(1)]);
    }

    #[test]
    fn test_track_claimed_once() {
        let matcher = ObjectMatcher::default();
        let previous = vec![tracked("person", 0.4, 0.4, 0.1, 0.3)];
        let current = vec![
            detection("person", 0.4, 0.4, 0.1, 0.3),
            detection("person", 0.4, 0.4, 0.1, 0.3),
        ];

        assert_eq!(matcher.associate(&current, &previous), vec![Some(0), None]);
    }

    #[test]
    fn test_empty_inputs() {
        let matcher = ObjectMatcher::default();
        assert!(matcher.associate(&[], &[]).is_empty());
        assert_eq!(
            matcher.associate(&[detection("car", 0.1, 0.1, 0.1, 0.1)], &[]),
            vec![None]
        );
    }

    proptest! {
        #[test]
        fn prop_identical_boxes_always_match(
            x in 0.0f32..0.8,
            y in 0.0f32..0.8,
            w in 0.01f32..0.2,
            h in 0.01f32..0.2,
        ) {
            let matcher = ObjectMatcher::default();
            let previous = vec![tracked("truck", x, y, w, h)];
            let current = vec![detection("truck", x, y, w, h)];
            prop_assert_eq!(matcher.associate(&current, &previous), vec![Some(0)]);
        }

        #[test]
        fn prop_disjoint_boxes_never_match(
            x in 0.0f32..0.3,
            y in 0.0f32..0.9,
            w in 0.01f32..0.2,
            h in 0.01f32..0.1,
            gap in 0.01f32..0.3,
        ) {
            let matcher = ObjectMatcher::default();
            let previous = vec![tracked("car", x, y, w, h)];
            let current = vec![detection("car", x + w + gap, y, w, h)];
            prop_assert_eq!(matcher.associate(&current, &previous), vec![None]);
        }
    }
}
