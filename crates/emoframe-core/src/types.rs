use serde::{Deserialize, Serialize};

/// Bounding box for a detected face, with optional facial landmarks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    /// Five-point facial landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
    pub landmarks: Option<[(f32, f32); 5]>,
}

impl BoundingBox {
    pub fn left_eye(&self) -> Option<(f32, f32)> {
        self.landmarks.map(|l| l[0])
    }

    pub fn right_eye(&self) -> Option<(f32, f32)> {
        self.landmarks.map(|l| l[1])
    }
}

/// Policy for picking one face out of the detector's candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FaceSelection {
    /// Take the first candidate in detector order.
    #[default]
    First,
    /// Take the highest-confidence candidate; ties keep detector order.
    MostConfident,
}

impl FaceSelection {
    /// Pick a candidate, ignoring any below `min_confidence` when set.
    pub fn select<'a>(
        &self,
        candidates: &'a [BoundingBox],
        min_confidence: Option<f32>,
    ) -> Option<&'a BoundingBox> {
        let mut eligible = candidates
            .iter()
            .filter(|c| min_confidence.map_or(true, |min| c.confidence >= min));

        match self {
            FaceSelection::First => eligible.next(),
            FaceSelection::MostConfident => {
                eligible.reduce(|best, c| if c.confidence > best.confidence { c } else { best })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face(x: f32, conf: f32) -> BoundingBox {
        BoundingBox { x, y: 0.0, width: 10.0, height: 10.0, confidence: conf, landmarks: None }
    }

    #[test]
    fn test_first_trusts_detector_order() {
        let faces = vec![face(1.0, 0.6), face(2.0, 0.9)];
        let picked = FaceSelection::First.select(&faces, None).unwrap();
        assert_eq!(picked.x, 1.0);
    }

    #[test]
    fn test_most_confident_tie_keeps_order() {
        let faces = vec![face(1.0, 0.6), face(2.0, 0.9), face(3.0, 0.9)];
        let picked = FaceSelection::MostConfident.select(&faces, None).unwrap();
        assert_eq!(picked.x, 2.0);
    }

    #[test]
    fn test_min_confidence_filters() {
        let faces = vec![face(1.0, 0.3), face(2.0, 0.7)];
        let picked = FaceSelection::First.select(&faces, Some(0.5)).unwrap();
        assert_eq!(picked.x, 2.0);
        assert!(FaceSelection::First.select(&faces, Some(0.8)).is_none());
    }

    #[test]
    fn test_empty_candidates() {
        assert!(FaceSelection::First.select(&[], None).is_none());
        assert!(FaceSelection::MostConfident.select(&[], None).is_none());
    }
}
