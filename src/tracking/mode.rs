//! Vision mode state.
//!
//! Modes other than Tracking are independent flags that can run in the same
//! cycle. Tracking is exclusive: entering it suspends every other mode and
//! the variant owns the live tracker, so "Tracking implies a valid tracker
//! exists" holds by construction. The suspended flags are restored when
//! tracking stops.

use crate::tracking::template::TemplateTracker;

/// The independently schedulable (non-exclusive) concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PassiveModes {
    pub detecting_markers: bool,
    pub detecting_faces: bool,
    pub taking_snapshot: bool,
    pub looking_for_saliency: bool,
}

impl PassiveModes {
    pub fn any(&self) -> bool {
        self.detecting_markers
            || self.detecting_faces
            || self.taking_snapshot
            || self.looking_for_saliency
    }
}

/// Current vision mode.
#[derive(Debug, Default)]
pub enum VisionMode {
    #[default]
    Idle,
    Passive(PassiveModes),
    Tracking {
        tracker: TemplateTracker,
        /// Flags suspended when tracking started, restored on exit.
        resume: PassiveModes,
    },
}

impl VisionMode {
    pub fn is_idle(&self) -> bool {
        matches!(self, VisionMode::Idle)
    }

    pub fn is_tracking(&self) -> bool {
        matches!(self, VisionMode::Tracking { .. })
    }

    /// The active passive flags; none while tracking (tracking is exclusive).
    pub fn active_flags(&self) -> PassiveModes {
        match self {
            VisionMode::Passive(flags) => *flags,
            VisionMode::Idle | VisionMode::Tracking { .. } => PassiveModes::default(),
        }
    }

    /// Edits the passive flags. While tracking this edits the suspended set,
    /// taking effect when tracking stops. An edit that clears every flag
    /// drops a Passive state back to Idle.
    pub fn set_flag(&mut self, edit: impl FnOnce(&mut PassiveModes)) {
        match self {
            VisionMode::Idle => {
                let mut flags = PassiveModes::default();
                edit(&mut flags);
                if flags.any() {
                    *self = VisionMode::Passive(flags);
                }
            }
            VisionMode::Passive(flags) => {
                edit(flags);
                if !flags.any() {
                    *self = VisionMode::Idle;
                }
            }
            VisionMode::Tracking { resume, .. } => edit(resume),
        }
    }

    /// Enters exclusive Tracking, suspending the current passive flags.
    pub fn enter_tracking(&mut self, tracker: TemplateTracker) {
        let resume = match std::mem::take(self) {
            VisionMode::Idle => PassiveModes::default(),
            VisionMode::Passive(flags) => flags,
            VisionMode::Tracking { resume, .. } => resume,
        };
        *self = VisionMode::Tracking { tracker, resume };
    }

    /// Leaves Tracking, restoring the suspended flags; the tracker is
    /// dropped. No-op outside Tracking.
    pub fn stop_tracking(&mut self) {
        if let VisionMode::Tracking { resume, .. } = std::mem::take(self) {
            *self = if resume.any() {
                VisionMode::Passive(resume)
            } else {
                VisionMode::Idle
            };
        }
    }

    /// Clears everything, including any live tracker.
    pub fn set_idle(&mut self) {
        *self = VisionMode::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{CameraCalibration, Frame};
    use crate::config::TrackerParams;
    use crate::geometry::quad::Quad;
    use nalgebra::Point2;

    fn make_tracker() -> TemplateTracker {
        let mut frame = Frame::zeroed(240, 320, 0.0);
        for r in 0..240 {
            for c in 0..320 {
                frame.set(r, c, (((r * 3 + c * 7) % 251) + 1) as u8);
            }
        }
        let quad = Quad::new([
            Point2::new(120.0, 80.0),
            Point2::new(120.0, 160.0),
            Point2::new(200.0, 80.0),
            Point2::new(200.0, 160.0),
        ]);
        let calib = CameraCalibration::new(300.0, 300.0, 160.0, 120.0, 240, 320);
        TemplateTracker::init(&frame, &quad, 25.0, &calib, &TrackerParams::default()).unwrap()
    }

    #[test]
    fn test_all_flags_cleared_is_idle() {
        let mut mode = VisionMode::Idle;
        mode.set_flag(|f| f.detecting_markers = true);
        assert!(!mode.is_idle());
        mode.set_flag(|f| f.detecting_markers = false);
        assert!(mode.is_idle());
    }

    #[test]
    fn test_tracking_is_exclusive() {
        let mut mode = VisionMode::Idle;
        mode.set_flag(|f| {
            f.detecting_markers = true;
            f.detecting_faces = true;
        });
        mode.enter_tracking(make_tracker());

        assert!(mode.is_tracking());
        // No passive work runs while tracking.
        assert!(!mode.active_flags().any());
    }

    #[test]
    fn test_stop_tracking_restores_flags() {
        let mut mode = VisionMode::Idle;
        mode.set_flag(|f| f.detecting_faces = true);
        mode.enter_tracking(make_tracker());
        mode.stop_tracking();

        assert!(!mode.is_tracking());
        assert!(mode.active_flags().detecting_faces);
        assert!(!mode.active_flags().detecting_markers);
    }

    #[test]
    fn test_stop_tracking_from_idle_history_is_idle() {
        let mut mode = VisionMode::Idle;
        mode.enter_tracking(make_tracker());
        mode.stop_tracking();
        assert!(mode.is_idle());
    }

    #[test]
    fn test_flag_edits_while_tracking_apply_on_exit() {
        let mut mode = VisionMode::Idle;
        mode.set_flag(|f| f.detecting_markers = true);
        mode.enter_tracking(make_tracker());
        mode.set_flag(|f| f.detecting_faces = true);

        assert!(!mode.active_flags().detecting_faces);
        mode.stop_tracking();
        assert!(mode.active_flags().detecting_faces);
        assert!(mode.active_flags().detecting_markers);
    }
}
