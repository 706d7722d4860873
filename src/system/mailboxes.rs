//! The fixed set of result mailboxes the vision thread publishes into.

use std::sync::Arc;

use crate::detection::{Face, ObservedMarker, PanTiltCorrection};
use crate::geometry::quad::Quad;
use crate::mailbox::Mailbox;
use crate::tracking::docking::DockingPose;

/// One mailbox per result kind, shared between the vision thread and the
/// consumer.
///
/// The marker mailbox carries the whole per-cycle list (possibly empty), so
/// "detection ran and found nothing" is observable as an empty list, distinct
/// from "no detection cycle since the last take".
#[derive(Default)]
pub struct VisionMailboxes {
    pub markers: Mailbox<Vec<ObservedMarker>>,
    pub tracker_quad: Mailbox<Quad>,
    pub docking_pose: Mailbox<DockingPose>,
    pub faces: Mailbox<Vec<Face>>,
    pub pan_tilt: Mailbox<PanTiltCorrection>,
}

impl VisionMailboxes {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_marker_list_is_distinguishable() {
        let mailboxes = VisionMailboxes::new();
        assert_eq!(mailboxes.markers.take(), None);
        mailboxes.markers.put(Vec::new());
        assert_eq!(mailboxes.markers.take(), Some(Vec::new()));
    }
}
