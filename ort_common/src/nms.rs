//! Box proposals and per-class non-maximum suppression.

/// One decoded anchor, in model input coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Proposal {
    pub class_id: usize,
    pub confidence: f32,
    /// `[x1, y1, x2, y2]`
    pub bbox: [f32; 4],
    /// Prototype weights, empty for box-only models.
    pub mask_coeffs: Vec<f32>,
}

pub fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
    let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
    let union = area_a + area_b - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

/// Greedy NMS, only suppressing overlaps within the same class.
/// The result is sorted by descending confidence.
pub fn non_max_suppression(mut proposals: Vec<Proposal>, iou_threshold: f32) -> Vec<Proposal> {
    proposals.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<Proposal> = Vec::new();
    for proposal in proposals {
        let suppressed = kept.iter().any(|k| {
            k.class_id == proposal.class_id && iou(&k.bbox, &proposal.bbox) >= iou_threshold
        });
        if !suppressed {
            kept.push(proposal);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposal(class_id: usize, confidence: f32, bbox: [f32; 4]) -> Proposal {
        Proposal {
            class_id,
            confidence,
            bbox,
            mask_coeffs: Vec::new(),
        }
    }

    #[test]
    fn iou_of_identical_and_disjoint_boxes() {
        let a = [0.0, 0.0, 10.0, 10.0];
        assert_eq!(iou(&a, &a), 1.0);
        assert_eq!(iou(&a, &[20.0, 20.0, 30.0, 30.0]), 0.0);
        // Half overlap: 50 / 150.
        assert!((iou(&a, &[5.0, 0.0, 15.0, 10.0]) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn suppresses_overlaps_of_the_same_class_only() {
        let kept = non_max_suppression(
            vec![
                proposal(0, 0.6, [1.0, 1.0, 11.0, 11.0]),
                proposal(0, 0.9, [0.0, 0.0, 10.0, 10.0]),
                proposal(1, 0.5, [0.0, 0.0, 10.0, 10.0]),
                proposal(0, 0.4, [50.0, 50.0, 60.0, 60.0]),
            ],
            0.5,
        );

        let summary: Vec<(usize, f32)> = kept.iter().map(|p| (p.class_id, p.confidence)).collect();
        assert_eq!(summary, vec![(0, 0.9), (1, 0.5), (0, 0.4)]);
    }
}
