//! The docking target: which marker to lock onto, and where to stop.

use nalgebra::Point2;

use crate::detection::ObservedMarker;
use crate::error::{VisionError, VisionResult};

/// Desired tracking target.
///
/// A cleared target (`marker_type == None`) means "track nothing". Staged
/// copies are swapped into the active copy once per cycle by the vision
/// system, so a change request never partially applies mid-cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerToTrack {
    /// Marker type to lock onto; `None` when unspecified.
    pub marker_type: Option<u16>,
    /// Physical marker width (mm); must be positive for a specified target.
    pub width_mm: f64,
    /// Optional image-space gate: only markers whose centroid falls within
    /// `search_radius` px of this point match.
    pub image_center: Option<Point2<f64>>,
    pub search_radius: f64,
    /// Whether the roll (X-angle) check participates in success
    /// classification.
    pub check_angle_x: bool,
    /// Post-dock offset, expressed in the marker's own frame.
    pub post_offset_x_mm: f64,
    pub post_offset_y_mm: f64,
    pub post_offset_angle_rad: f64,
}

impl MarkerToTrack {
    pub fn cleared() -> Self {
        Self {
            marker_type: None,
            width_mm: 0.0,
            image_center: None,
            search_radius: 0.0,
            check_angle_x: true,
            post_offset_x_mm: 0.0,
            post_offset_y_mm: 0.0,
            post_offset_angle_rad: 0.0,
        }
    }

    pub fn new(marker_type: u16, width_mm: f64) -> Self {
        Self {
            marker_type: Some(marker_type),
            width_mm,
            ..Self::cleared()
        }
    }

    pub fn is_specified(&self) -> bool {
        self.marker_type.is_some()
    }

    pub fn clear(&mut self) {
        *self = Self::cleared();
    }

    /// Validation applied at swap-in time, not at staging time.
    pub fn validate(&self) -> VisionResult<()> {
        if self.is_specified() && self.width_mm <= 0.0 {
            return Err(VisionError::InvalidParameter("non-positive marker width"));
        }
        Ok(())
    }

    /// Whether an observed marker is the one we want to start tracking.
    pub fn matches(&self, observed: &ObservedMarker) -> bool {
        let wanted = match self.marker_type {
            Some(t) => t,
            None => return false,
        };
        if !observed.is_valid || observed.marker_type != wanted {
            return false;
        }
        if self.search_radius > 0.0 {
            if let Some(center) = self.image_center {
                let d = observed.quad.centroid() - center;
                return d.norm() <= self.search_radius;
            }
        }
        true
    }
}

impl Default for MarkerToTrack {
    fn default() -> Self {
        Self::cleared()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::quad::Quad;
    use nalgebra::Matrix3;

    fn marker_at(marker_type: u16, cx: f64, cy: f64) -> ObservedMarker {
        let h = 10.0;
        ObservedMarker {
            marker_type,
            quad: Quad::new([
                Point2::new(cx - h, cy - h),
                Point2::new(cx - h, cy + h),
                Point2::new(cx + h, cy - h),
                Point2::new(cx + h, cy + h),
            ]),
            homography: Matrix3::identity(),
            timestamp: 0.0,
            is_valid: true,
        }
    }

    #[test]
    fn test_cleared_target_matches_nothing() {
        let target = MarkerToTrack::cleared();
        assert!(!target.is_specified());
        assert!(!target.matches(&marker_at(3, 100.0, 100.0)));
    }

    #[test]
    fn test_type_must_match() {
        let target = MarkerToTrack::new(3, 25.0);
        assert!(target.matches(&marker_at(3, 100.0, 100.0)));
        assert!(!target.matches(&marker_at(4, 100.0, 100.0)));
    }

    #[test]
    fn test_search_radius_gates_centroid() {
        let mut target = MarkerToTrack::new(3, 25.0);
        target.image_center = Some(Point2::new(160.0, 120.0));
        target.search_radius = 30.0;

        assert!(target.matches(&marker_at(3, 170.0, 125.0)));
        assert!(!target.matches(&marker_at(3, 300.0, 120.0)));
    }

    #[test]
    fn test_invalid_observation_never_matches() {
        let target = MarkerToTrack::new(3, 25.0);
        let mut observed = marker_at(3, 100.0, 100.0);
        observed.is_valid = false;
        assert!(!target.matches(&observed));
    }

    #[test]
    fn test_width_validated_at_swap_in() {
        assert!(MarkerToTrack::new(3, 25.0).validate().is_ok());
        assert_eq!(
            MarkerToTrack::new(3, 0.0).validate(),
            Err(VisionError::InvalidParameter("non-positive marker width"))
        );
        assert!(MarkerToTrack::cleared().validate().is_ok());
    }
}
