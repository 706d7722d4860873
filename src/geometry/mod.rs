//! Geometry primitives: rigid transforms, marker quads, P3P pose recovery.

pub mod p3p;
pub mod pose;
pub mod quad;

pub use p3p::{marker_pose_from_quad, solve_p3p};
pub use pose::Pose;
pub use quad::{canonical_corners, Quad};
