//! Tunable parameters for detection, tracking, faces, and the imaging pipeline.
//!
//! Defaults mirror the values the pipeline shipped with on the embedded
//! hardware; all structs are plain data and cheap to clone.

/// Parameters handed to the fiducial marker decoder.
#[derive(Debug, Clone)]
pub struct DetectionParams {
    /// Number of image pyramid levels the decoder searches.
    pub pyramid_levels: u32,
    /// Smallest connected-component area (px^2) considered a candidate.
    pub min_component_area: usize,
    /// Largest connected-component area (px^2) considered a candidate.
    pub max_component_area: usize,
    /// Maximum asymmetry ratio allowed for an extracted quad.
    pub max_quad_asymmetry: f64,
    /// Minimum bright/dark contrast ratio for a decodable pattern.
    pub min_contrast_ratio: f64,
    /// Hard cap on markers returned per frame; arenas are sized to this.
    pub max_markers: usize,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            pyramid_levels: 3,
            min_component_area: 16,
            max_component_area: 64_000,
            max_quad_asymmetry: 2.0,
            min_contrast_ratio: 1.25,
            max_markers: 100,
        }
    }
}

/// Parameters for the 6-DOF planar template tracker.
#[derive(Debug, Clone)]
pub struct TrackerParams {
    /// Samples per side of the template grid.
    pub template_grid_size: usize,
    /// Iteration cap for one refinement call.
    pub max_iterations: u32,
    /// Refinement stops when every angle step falls below this (rad).
    pub convergence_tolerance_angle: f64,
    /// Refinement stops when the translation step falls below this (mm).
    pub convergence_tolerance_distance: f64,
    /// Per-axis angle change (rad) beyond which an update is a failure.
    pub success_tolerance_angle: f64,
    /// Translation change (mm) beyond which an update is a failure.
    pub success_tolerance_distance: f64,
    /// Minimum fraction of in-bounds template pixels that must verify.
    pub success_tolerance_matching_fraction: f64,
    /// Grayvalue difference under which a verified pixel counts as similar.
    pub verify_max_pixel_difference: u8,
    /// Negative selects the cheap mean-of-quad brightness normalization.
    pub normalization_filter_width_fraction: f64,
}

impl Default for TrackerParams {
    fn default() -> Self {
        Self {
            template_grid_size: 11,
            max_iterations: 25,
            convergence_tolerance_angle: 0.002,
            convergence_tolerance_distance: 0.05,
            success_tolerance_angle: 0.35,
            success_tolerance_distance: 30.0,
            success_tolerance_matching_fraction: 0.5,
            verify_max_pixel_difference: 30,
            normalization_filter_width_fraction: -1.0,
        }
    }
}

/// Parameters forwarded to the face-detector collaborator.
#[derive(Debug, Clone)]
pub struct FaceDetectParams {
    /// Pyramid scale step between detection passes.
    pub scale_factor: f64,
    /// Minimum neighboring hits to accept a detection.
    pub min_neighbors: u32,
    /// Smallest accepted face side (px).
    pub min_object_size: usize,
    /// Largest accepted face side (px).
    pub max_object_size: usize,
}

impl Default for FaceDetectParams {
    fn default() -> Self {
        Self {
            scale_factor: 1.1,
            min_neighbors: 3,
            min_object_size: 20,
            max_object_size: 240,
        }
    }
}

/// Auto-exposure controller parameters.
#[derive(Debug, Clone)]
pub struct ExposureParams {
    /// Exposure nudge per evaluation, in integer sensor counts.
    pub increment_counts: i32,
    /// Lower clamp on exposure time (s).
    pub min_exposure_s: f64,
    /// Upper clamp on exposure time (s).
    pub max_exposure_s: f64,
    /// Intensity the target percentile is steered toward.
    pub target_high_value: u8,
    /// Percentile of the intensity histogram that is evaluated.
    pub target_percentile: f64,
    /// Evaluate at most once every this many frames.
    pub eval_period_frames: u32,
}

impl Default for ExposureParams {
    fn default() -> Self {
        Self {
            increment_counts: 3,
            min_exposure_s: 0.02,
            max_exposure_s: 0.50,
            target_high_value: 250,
            target_percentile: 0.95,
            eval_period_frames: 2,
        }
    }
}

/// Radial vignetting correction polynomial.
///
/// The per-pixel gain is `c[0] + c[1] r + c[2] r^2 + c[3] r^3 + c[4] r^4`
/// with `r` the distance from the image center normalized to [0, 1].
#[derive(Debug, Clone)]
pub struct VignettingParams {
    pub enabled: bool,
    pub coeffs: [f64; 5],
}

impl Default for VignettingParams {
    fn default() -> Self {
        Self {
            enabled: false,
            coeffs: [1.0, 0.0, 0.0, 0.0, 0.0],
        }
    }
}
