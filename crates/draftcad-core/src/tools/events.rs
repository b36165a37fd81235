//! Events emitted by draw tools for the UI layer.

use super::{DrawMode, DrawToolState, InputType, ToolOptions};
use crate::constraints::{DrawConstraints, LockMode};
use crate::geometry::{ObjectId, ObjectKind};
use crate::snap::{SnapFeature, SnapResult, SnapType};
use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Plain-data notification from a draw tool. Carries no references into the
/// scene or the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ToolEvent {
    Activated {
        mode: DrawMode,
    },
    Deactivated {
        mode: DrawMode,
    },
    Suspended {
        /// State to return to on resume.
        from: DrawToolState,
    },
    Resumed {
        state: DrawToolState,
    },
    Snap {
        point: DVec3,
        snap_type: SnapType,
        feature: Option<SnapFeature>,
        target: Option<ObjectId>,
        distance: f64,
    },
    MouseMove {
        position: DVec3,
        snapped: bool,
    },
    PointAdded {
        index: usize,
        position: DVec3,
        snap_type: Option<SnapType>,
        input_type: InputType,
    },
    Completed {
        object_id: ObjectId,
        kind: ObjectKind,
        point_count: usize,
        elapsed_ms: u64,
    },
    Cancelled {
        mode: DrawMode,
        point_count: usize,
    },
    StatusUpdate {
        state: DrawToolState,
        message: String,
    },
    OptionsUpdated {
        options: ToolOptions,
    },
    ConstraintsUpdated {
        constraints: DrawConstraints,
        lock: LockMode,
    },
}

impl ToolEvent {
    /// Snap event for a snapped result; `None` when nothing snapped.
    pub fn snap(result: &SnapResult) -> Option<Self> {
        if !result.snapped {
            return None;
        }
        Some(ToolEvent::Snap {
            point: result.point,
            snap_type: result.snap_type?,
            feature: result.feature,
            target: result.target,
            distance: result.distance.unwrap_or_default(),
        })
    }

    /// Short event name, as used in the serialized `event` tag.
    pub fn name(&self) -> &'static str {
        match self {
            ToolEvent::Activated { .. } => "activated",
            ToolEvent::Deactivated { .. } => "deactivated",
            ToolEvent::Suspended { .. } => "suspended",
            ToolEvent::Resumed { .. } => "resumed",
            ToolEvent::Snap { .. } => "snap",
            ToolEvent::MouseMove { .. } => "mouse_move",
            ToolEvent::PointAdded { .. } => "point_added",
            ToolEvent::Completed { .. } => "completed",
            ToolEvent::Cancelled { .. } => "cancelled",
            ToolEvent::StatusUpdate { .. } => "status_update",
            ToolEvent::OptionsUpdated { .. } => "options_updated",
            ToolEvent::ConstraintsUpdated { .. } => "constraints_updated",
        }
    }
}
