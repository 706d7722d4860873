use std::thread;
use std::time::Duration;

use anyhow::Result;
use nalgebra::{Matrix3, Point2};
use tracing::info;
use tracing_subscriber::EnvFilter;

use dockvision::camera::{CameraCalibration, Frame};
use dockvision::config::{DetectionParams, FaceDetectParams};
use dockvision::detection::{
    DetectedQuad, Face, FaceDetector, MarkerDecoder, MarkerToTrack,
};
use dockvision::error::VisionResult;
use dockvision::geometry::Quad;
use dockvision::memory::VisionMemory;
use dockvision::system::{VisionMailboxes, VisionRunner, VisionSystem};
use dockvision::tracking::{observed_marker_pose, RobotState};

/// Decoder standing in for the real fiducial library: reports one marker of
/// type 3 sitting in the middle of the frame.
struct SimulatedDecoder;

impl MarkerDecoder for SimulatedDecoder {
    fn detect_markers(
        &mut self,
        frame: &Frame,
        _params: &DetectionParams,
        _scratch: &mut VisionMemory,
    ) -> VisionResult<Vec<DetectedQuad>> {
        let cx = frame.ncols() as f64 / 2.0;
        let cy = frame.nrows() as f64 / 2.0;
        let h = 40.0;
        Ok(vec![DetectedQuad {
            marker_type: 3,
            quad: Quad::new([
                Point2::new(cx - h, cy - h),
                Point2::new(cx - h, cy + h),
                Point2::new(cx + h, cy - h),
                Point2::new(cx + h, cy + h),
            ]),
            homography: Matrix3::identity(),
        }])
    }
}

struct NoFaces;

impl FaceDetector for NoFaces {
    fn update(&mut self, _frame: &Frame, _params: &FaceDetectParams) -> VisionResult<()> {
        Ok(())
    }
    fn faces(&self) -> Vec<Face> {
        Vec::new()
    }
}

fn textured_frame(timestamp: f64) -> Frame {
    let mut frame = Frame::zeroed(480, 640, timestamp);
    for r in 0..480 {
        for c in 0..640 {
            let v = 128.0 + 60.0 * ((r as f64) * 0.11).sin() + 50.0 * ((c as f64) * 0.07).cos();
            frame.set(r, c, v.clamp(0.0, 255.0) as u8);
        }
    }
    frame
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let calib = CameraCalibration::new(500.0, 500.0, 320.0, 240.0, 480, 640);
    let marker_width_mm = 25.0;

    let mut system = VisionSystem::new(
        Box::new(SimulatedDecoder),
        Box::new(NoFaces),
        VisionMailboxes::new(),
    );
    system.init(calib.clone())?;
    system.set_marker_to_track(MarkerToTrack::new(3, marker_width_mm));

    let mut runner = VisionRunner::spawn(system);

    let robot = RobotState {
        x_mm: 0.0,
        y_mm: 0.0,
        heading_rad: 0.0,
        head_angle_rad: 0.0,
        timestamp: 0.0,
    };

    let mut marker_reports = 0usize;
    let mut docking_poses = 0usize;
    for i in 0..30 {
        let timestamp = i as f64 / 30.0;
        runner.submit_frame(
            RobotState {
                timestamp,
                ..robot
            },
            textured_frame(timestamp),
        );
        thread::sleep(Duration::from_millis(15));

        if let Some(markers) = runner.mailboxes().markers.take() {
            marker_reports += 1;
            info!(frame = i, count = markers.len(), "markers");
            // One-shot pose for whatever was seen, independent of tracking.
            if let Some(marker) = markers.first() {
                if let Ok(pose) = observed_marker_pose(&marker.quad, marker_width_mm, &calib, false)
                {
                    info!(
                        frame = i,
                        marker_type = marker.marker_type,
                        distance_mm = format!("{:.1}", pose.translation.norm()),
                        "observed marker pose"
                    );
                }
            }
        }
        if let Some(docking) = runner.mailboxes().docking_pose.take() {
            docking_poses += 1;
            info!(
                frame = i,
                x = format!("{:.1}", docking.pose.translation.x),
                y = format!("{:.1}", docking.pose.translation.y),
                z = format!("{:.1}", docking.pose.translation.z),
                "docking pose"
            );
        }
    }

    info!(marker_reports, docking_poses, "demo finished");
    runner.shutdown();
    Ok(())
}
