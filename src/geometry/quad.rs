//! Image-plane quadrilaterals for detected markers and tracker output.

use nalgebra::{Point2, Vector3};

/// Corner order used for marker quads throughout the pipeline.
///
/// Indices are [top-left, bottom-left, top-right, bottom-right], matching the
/// canonical 3D corner pattern produced by [`canonical_corners`]. Image Y
/// grows downward.
#[derive(Debug, Clone, PartialEq)]
pub struct Quad {
    pub corners: [Point2<f64>; 4],
}

impl Quad {
    pub fn new(corners: [Point2<f64>; 4]) -> Self {
        Self { corners }
    }

    pub fn top_left(&self) -> Point2<f64> {
        self.corners[0]
    }

    pub fn bottom_left(&self) -> Point2<f64> {
        self.corners[1]
    }

    pub fn top_right(&self) -> Point2<f64> {
        self.corners[2]
    }

    pub fn bottom_right(&self) -> Point2<f64> {
        self.corners[3]
    }

    pub fn centroid(&self) -> Point2<f64> {
        let mut x = 0.0;
        let mut y = 0.0;
        for c in &self.corners {
            x += c.x;
            y += c.y;
        }
        Point2::new(x / 4.0, y / 4.0)
    }

    /// Signed area via the shoelace formula over the perimeter order
    /// TL -> TR -> BR -> BL.
    pub fn area(&self) -> f64 {
        let p = [
            self.top_left(),
            self.top_right(),
            self.bottom_right(),
            self.bottom_left(),
        ];
        let mut sum = 0.0;
        for i in 0..4 {
            let a = p[i];
            let b = p[(i + 1) % 4];
            sum += a.x * b.y - b.x * a.y;
        }
        0.5 * sum.abs()
    }

    /// A quad is degenerate when its corners are (near) collinear or
    /// coincident; such quads cannot anchor a pose.
    pub fn is_degenerate(&self) -> bool {
        const MIN_AREA: f64 = 1.0;
        if !self.corners.iter().all(|c| c.x.is_finite() && c.y.is_finite()) {
            return true;
        }
        self.area() < MIN_AREA
    }

    /// Corners re-sorted clockwise about the centroid, starting from the
    /// corner closest to the top-left direction. Used when the marker's
    /// in-plane orientation is irrelevant to the caller.
    pub fn sorted_clockwise(&self) -> Quad {
        let c = self.centroid();
        let mut indexed: Vec<(f64, Point2<f64>)> = self
            .corners
            .iter()
            .map(|p| ((p.y - c.y).atan2(p.x - c.x), *p))
            .collect();
        // Image Y grows downward, so ascending atan2 angle is clockwise on
        // screen. Start from the corner in the upper-left quadrant (angle
        // closest to -3*pi/4).
        indexed.sort_by(|a, b| {
            let start = -3.0 * std::f64::consts::FRAC_PI_4;
            let da = (a.0 - start).rem_euclid(2.0 * std::f64::consts::PI);
            let db = (b.0 - start).rem_euclid(2.0 * std::f64::consts::PI);
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        });
        // Perimeter order TL, TR, BR, BL back into index order TL, BL, TR, BR.
        Quad::new([indexed[0].1, indexed[3].1, indexed[1].1, indexed[2].1])
    }
}

/// Canonical 3D marker corners for a square marker of the given physical
/// width, centered at the origin with z = 0, in the same index order as
/// [`Quad`]: [(-h,-h), (-h,+h), (+h,-h), (+h,+h)].
pub fn canonical_corners(width_mm: f64) -> [Vector3<f64>; 4] {
    let h = width_mm / 2.0;
    [
        Vector3::new(-h, -h, 0.0),
        Vector3::new(-h, h, 0.0),
        Vector3::new(h, -h, 0.0),
        Vector3::new(h, h, 0.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_square() -> Quad {
        Quad::new([
            Point2::new(0.0, 0.0),
            Point2::new(0.0, 10.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 10.0),
        ])
    }

    #[test]
    fn test_centroid_and_area() {
        let q = unit_square();
        assert_relative_eq!(q.centroid().x, 5.0, epsilon = 1e-12);
        assert_relative_eq!(q.centroid().y, 5.0, epsilon = 1e-12);
        assert_relative_eq!(q.area(), 100.0, epsilon = 1e-12);
    }

    #[test]
    fn test_collinear_quad_is_degenerate() {
        let q = Quad::new([
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(2.0, 2.0),
            Point2::new(3.0, 3.0),
        ]);
        assert!(q.is_degenerate());
        assert!(!unit_square().is_degenerate());
    }

    #[test]
    fn test_sorted_clockwise_recovers_corner_roles() {
        // Same square with the corner array scrambled.
        let scrambled = Quad::new([
            Point2::new(10.0, 10.0),
            Point2::new(10.0, 0.0),
            Point2::new(0.0, 0.0),
            Point2::new(0.0, 10.0),
        ]);
        let sorted = scrambled.sorted_clockwise();
        assert_relative_eq!(sorted.top_left().x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(sorted.top_left().y, 0.0, epsilon = 1e-12);
        assert_relative_eq!(sorted.bottom_right().x, 10.0, epsilon = 1e-12);
        assert_relative_eq!(sorted.bottom_right().y, 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_canonical_corner_pattern() {
        let corners = canonical_corners(40.0);
        assert_relative_eq!(corners[0], Vector3::new(-20.0, -20.0, 0.0));
        assert_relative_eq!(corners[1], Vector3::new(-20.0, 20.0, 0.0));
        assert_relative_eq!(corners[2], Vector3::new(20.0, -20.0, 0.0));
        assert_relative_eq!(corners[3], Vector3::new(20.0, 20.0, 0.0));
    }
}
