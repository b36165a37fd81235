//! Draw tools: the per-mode state machine that turns pointer input into
//! finished objects.

mod events;
mod modes;

pub use events::ToolEvent;
pub use modes::{
    ArcFromCenterStrategy, Circle3PointStrategy, CircleCenterRadiusStrategy, PointCount,
    PointStrategy, PolylineStrategy, RectangleStrategy, RegularPolygonStrategy, SegmentStrategy,
    ToolStrategy,
};

use crate::constraints::{ConstraintEngine, DrawConstraints, LockMode};
use crate::document::{AddObjectCommand, CommandError, CommandExecutor};
use crate::geometry::{DrawingPlane, GeometryError, ObjectId, PlacedObject, SceneObject};
use crate::kernel::{GeometryKernel, KernelError, construct, release_all};
use crate::snap::{SnapQuery, SnapResolver, SnapResult};
use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// Use web-time on WASM, std::time otherwise
#[cfg(target_arch = "wasm32")]
use web_time::Instant;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

/// Default minimum segment length.
pub const DEFAULT_MIN_SEGMENT_LENGTH: f64 = 0.001;
/// Points closer than this count as duplicates.
pub const DEFAULT_POINT_TOLERANCE: f64 = 1e-6;
/// Allowed difference between arc start and end radius.
pub const DEFAULT_RADIUS_TOLERANCE: f64 = 0.01;
/// Smallest circle, arc or polygon radius.
pub const DEFAULT_MIN_RADIUS: f64 = 0.001;
/// Distance to the first vertex that closes a polyline.
pub const DEFAULT_CLOSE_TOLERANCE: f64 = 0.5;
pub const DEFAULT_POLYGON_SIDES: u32 = 6;
pub const MIN_POLYGON_SIDES: u32 = 3;
pub const MAX_POLYGON_SIDES: u32 = 1024;

/// Available drawing modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawMode {
    Point,
    #[default]
    Segment,
    CircleCenterRadius,
    Circle3Point,
    Rectangle,
    RegularPolygon,
    ArcFromCenter,
    Polyline,
}

impl DrawMode {
    /// Strategy implementing this mode.
    pub fn strategy(self) -> Box<dyn ToolStrategy> {
        match self {
            DrawMode::Point => Box::new(PointStrategy),
            DrawMode::Segment => Box::new(SegmentStrategy),
            DrawMode::CircleCenterRadius => Box::new(CircleCenterRadiusStrategy),
            DrawMode::Circle3Point => Box::new(Circle3PointStrategy),
            DrawMode::Rectangle => Box::new(RectangleStrategy),
            DrawMode::RegularPolygon => Box::new(RegularPolygonStrategy),
            DrawMode::ArcFromCenter => Box::new(ArcFromCenterStrategy),
            DrawMode::Polyline => Box::new(PolylineStrategy),
        }
    }

    /// Get the display name.
    pub fn label(self) -> &'static str {
        match self {
            DrawMode::Point => "Point",
            DrawMode::Segment => "Segment",
            DrawMode::CircleCenterRadius => "Circle",
            DrawMode::Circle3Point => "Circle (3 points)",
            DrawMode::Rectangle => "Rectangle",
            DrawMode::RegularPolygon => "Polygon",
            DrawMode::ArcFromCenter => "Arc",
            DrawMode::Polyline => "Polyline",
        }
    }
}

/// What happens after a shape completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionMode {
    /// Back to `Active` with no points.
    #[default]
    Single,
    /// Start the next shape from the last point.
    Chain,
    /// Back to `Active`, keeping the last point as angle reference.
    Continuous,
}

/// Per-tool drawing options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolOptions {
    pub completion: CompletionMode,
    pub min_segment_length: f64,
    pub point_tolerance: f64,
    pub radius_tolerance: f64,
    pub min_radius: f64,
    pub polygon_sides: u32,
    pub close_tolerance: f64,
    /// Work plane for circle frames, rectangles and polygons.
    pub plane: DrawingPlane,
}

impl Default for ToolOptions {
    fn default() -> Self {
        Self {
            completion: CompletionMode::default(),
            min_segment_length: DEFAULT_MIN_SEGMENT_LENGTH,
            point_tolerance: DEFAULT_POINT_TOLERANCE,
            radius_tolerance: DEFAULT_RADIUS_TOLERANCE,
            min_radius: DEFAULT_MIN_RADIUS,
            polygon_sides: DEFAULT_POLYGON_SIDES,
            close_tolerance: DEFAULT_CLOSE_TOLERANCE,
            plane: DrawingPlane::xy(),
        }
    }
}

impl ToolOptions {
    /// Polygon side count, clamped to the supported range.
    pub fn sides(&self) -> u32 {
        self.polygon_sides.clamp(MIN_POLYGON_SIDES, MAX_POLYGON_SIDES)
    }
}

/// Where an input point came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputType {
    #[default]
    Pointer,
    /// Typed coordinates; bypasses snapping.
    Keyboard,
    Programmatic,
}

/// An accepted point, owned by the tool until it resets.
#[derive(Debug, Clone)]
pub struct InputPoint {
    pub position: DVec3,
    pub snap: Option<SnapResult>,
    pub timestamp: Instant,
    pub input_type: InputType,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl InputPoint {
    /// Create an input point stamped with the current time.
    pub fn new(position: DVec3, snap: Option<SnapResult>, input_type: InputType) -> Self {
        Self {
            position,
            snap,
            timestamp: Instant::now(),
            input_type,
            metadata: BTreeMap::new(),
        }
    }
}

/// State of a draw tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawToolState {
    #[default]
    Idle,
    Active,
    Drawing,
    Completed,
    Cancelled,
    Suspended,
    /// Terminal until `activate()`.
    Error,
}

impl DrawToolState {
    /// Whether points are accepted in this state.
    pub fn accepts_input(self) -> bool {
        matches!(self, DrawToolState::Active | DrawToolState::Drawing)
    }
}

impl fmt::Display for DrawToolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DrawToolState::Idle => "idle",
            DrawToolState::Active => "active",
            DrawToolState::Drawing => "drawing",
            DrawToolState::Completed => "completed",
            DrawToolState::Cancelled => "cancelled",
            DrawToolState::Suspended => "suspended",
            DrawToolState::Error => "error",
        };
        f.write_str(name)
    }
}

/// Error type for draw tool operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ToolError {
    #[error("Tool is {0}, not accepting input")]
    NotAccepting(DrawToolState),

    /// The points do not describe valid geometry; the tool keeps drawing.
    #[error("Invalid input: {0}")]
    Validation(#[from] GeometryError),

    /// The kernel rejected a valid point set; the tool resets.
    #[error("Construction failed: {0}")]
    Construction(#[from] KernelError),

    /// Unexpected failure; the tool is now in the error state.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for draw tool operations
pub type ToolResult<T> = Result<T, ToolError>;

/// Collaborators a tool needs to finish a shape.
pub struct ToolContext<'a> {
    pub kernel: &'a mut dyn GeometryKernel,
    pub commands: &'a mut dyn CommandExecutor,
}

/// Result of feeding a point to a tool.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    /// Point recorded; more are needed.
    PointAccepted { count: usize },
    /// A shape was constructed and added through the command executor.
    Completed { object_id: ObjectId },
}

/// Drives one drawing mode through its states.
#[derive(Debug)]
pub struct DrawTool {
    strategy: Box<dyn ToolStrategy>,
    state: DrawToolState,
    /// State to return to from `Suspended`.
    suspended_from: Option<DrawToolState>,
    points: Vec<InputPoint>,
    options: ToolOptions,
    constraints: ConstraintEngine,
    /// Angle reference kept across shapes in continuous mode.
    reference: Option<DVec3>,
    cursor: Option<SnapResult>,
    preview: Option<SceneObject>,
    started_at: Option<Instant>,
    events: Vec<ToolEvent>,
}

impl DrawTool {
    /// Create an idle tool.
    pub fn new(mode: DrawMode, options: ToolOptions) -> Self {
        Self::with_strategy(mode.strategy(), options)
    }

    /// Create an idle tool around a custom strategy.
    pub fn with_strategy(strategy: Box<dyn ToolStrategy>, options: ToolOptions) -> Self {
        Self {
            strategy,
            state: DrawToolState::Idle,
            suspended_from: None,
            points: Vec::new(),
            options,
            constraints: ConstraintEngine::default(),
            reference: None,
            cursor: None,
            preview: None,
            started_at: None,
            events: Vec::new(),
        }
    }

    /// Get the drawing mode.
    pub fn mode(&self) -> DrawMode {
        self.strategy.mode()
    }

    /// Get the current state.
    pub fn state(&self) -> DrawToolState {
        self.state
    }

    /// Get the drawing options.
    pub fn options(&self) -> &ToolOptions {
        &self.options
    }

    /// Get the constraint engine.
    pub fn constraints(&self) -> &ConstraintEngine {
        &self.constraints
    }

    /// Accepted points, oldest first.
    pub fn points(&self) -> &[InputPoint] {
        &self.points
    }

    /// Get the number of accepted points.
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Rubber-band shape for the last pointer move.
    pub fn preview(&self) -> Option<&SceneObject> {
        self.preview.as_ref()
    }

    /// Last located cursor.
    pub fn cursor(&self) -> Option<&SnapResult> {
        self.cursor.as_ref()
    }

    /// Point that angle, perpendicular and distance rules measure from.
    pub fn reference_point(&self) -> Option<DVec3> {
        self.points.last().map(|p| p.position).or(self.reference)
    }

    /// Drain pending events.
    pub fn take_events(&mut self) -> Vec<ToolEvent> {
        std::mem::take(&mut self.events)
    }

    fn emit(&mut self, event: ToolEvent) {
        self.events.push(event);
    }

    fn status(&mut self) {
        let message = match self.state {
            DrawToolState::Active | DrawToolState::Drawing => self.strategy.prompt(self.points.len()),
            state => format!("{} {}", self.mode().label(), state),
        };
        self.emit(ToolEvent::StatusUpdate {
            state: self.state,
            message,
        });
    }

    fn clear_points(&mut self) {
        self.points.clear();
        self.preview = None;
        self.started_at = None;
    }

    /// Enter `Active`, discarding any previous input. Also the only way out
    /// of `Error`.
    pub fn activate(&mut self) {
        self.clear_points();
        self.reference = None;
        self.suspended_from = None;
        self.state = DrawToolState::Active;
        log::debug!("{} tool activated", self.mode().label());
        self.emit(ToolEvent::Activated { mode: self.mode() });
        self.status();
    }

    /// Return to `Idle`, discarding input.
    pub fn deactivate(&mut self) {
        if self.state == DrawToolState::Idle {
            return;
        }
        self.clear_points();
        self.reference = None;
        self.suspended_from = None;
        self.cursor = None;
        self.state = DrawToolState::Idle;
        self.emit(ToolEvent::Deactivated { mode: self.mode() });
    }

    /// Freeze input without clearing points. Returns false if not active.
    pub fn suspend(&mut self) -> bool {
        if !self.state.accepts_input() {
            return false;
        }
        self.suspended_from = Some(self.state);
        self.emit(ToolEvent::Suspended { from: self.state });
        self.state = DrawToolState::Suspended;
        true
    }

    /// Leave `Suspended`. Returns false if not suspended.
    pub fn resume(&mut self) -> bool {
        let Some(previous) = self.suspended_from.take() else {
            return false;
        };
        self.state = previous;
        self.emit(ToolEvent::Resumed { state: previous });
        true
    }

    /// Abandon the current shape and return to `Active`.
    ///
    /// Emits exactly one `Cancelled` event. Returns false if there was
    /// nothing to cancel (idle or error).
    pub fn cancel(&mut self) -> bool {
        if !matches!(
            self.state,
            DrawToolState::Active | DrawToolState::Drawing | DrawToolState::Suspended
        ) {
            return false;
        }
        let point_count = self.points.len();
        self.state = DrawToolState::Cancelled;
        self.emit(ToolEvent::Cancelled {
            mode: self.mode(),
            point_count,
        });
        log::debug!("{} cancelled with {} points", self.mode().label(), point_count);
        self.clear_points();
        self.reference = None;
        self.suspended_from = None;
        self.state = DrawToolState::Active;
        self.status();
        true
    }

    /// Switch drawing mode. Input in progress is discarded; an active tool
    /// stays active.
    pub fn set_mode(&mut self, mode: DrawMode) {
        if mode == self.mode() {
            return;
        }
        self.strategy = mode.strategy();
        self.clear_points();
        self.reference = None;
        if self.state != DrawToolState::Idle {
            self.activate();
        }
    }

    /// Replace the drawing options.
    pub fn set_options(&mut self, options: ToolOptions) {
        self.options = options.clone();
        self.emit(ToolEvent::OptionsUpdated { options });
    }

    /// Replace the constraints.
    pub fn set_constraints(&mut self, constraints: DrawConstraints) {
        self.constraints.set_constraints(constraints);
        self.constraints_updated();
    }

    /// Set the directional lock.
    pub fn set_lock(&mut self, lock: LockMode) {
        self.constraints.set_lock(lock);
        self.constraints_updated();
    }

    fn constraints_updated(&mut self) {
        self.emit(ToolEvent::ConstraintsUpdated {
            constraints: self.constraints.constraints().clone(),
            lock: self.constraints.lock(),
        });
    }

    /// Constrain and snap a raw position without changing tool state.
    pub fn locate(
        &self,
        raw: DVec3,
        objects: &[&dyn PlacedObject],
        resolver: &mut SnapResolver,
    ) -> SnapResult {
        let reference = self.reference_point();
        let constrained = self.constraints.apply(raw, reference);
        let query = SnapQuery {
            reference,
            active: None,
            angle_snap: self.constraints.angle_snap_allowed(),
            grid_only: self.constraints.constraints().grid_only,
        };
        resolver.resolve_query(constrained, objects, &query)
    }

    /// Track the cursor: locate it and refresh the preview.
    pub fn pointer_move(
        &mut self,
        raw: DVec3,
        objects: &[&dyn PlacedObject],
        resolver: &mut SnapResolver,
    ) -> SnapResult {
        if !self.state.accepts_input() {
            return SnapResult::none(raw);
        }
        let result = self.locate(raw, objects, resolver);
        let positions = self.positions();
        self.preview = self.strategy.preview(&positions, result.point, &self.options);
        if let Some(event) = ToolEvent::snap(&result) {
            self.emit(event);
        }
        self.emit(ToolEvent::MouseMove {
            position: result.point,
            snapped: result.snapped,
        });
        self.cursor = Some(result.clone());
        result
    }

    /// Record a located point. Completes the shape when the mode's point
    /// count is reached or the click closes it.
    pub fn add_point(
        &mut self,
        located: SnapResult,
        input_type: InputType,
        ctx: &mut ToolContext<'_>,
    ) -> ToolResult<ToolOutcome> {
        if !self.state.accepts_input() {
            return Err(ToolError::NotAccepting(self.state));
        }

        let positions = self.positions();
        let closing = self.strategy.close_target(&positions, located.point, &self.options);
        let position = closing.unwrap_or(located.point);
        self.points.push(InputPoint::new(position, Some(located), input_type));

        if let Err(e) = self.strategy.validate(&self.positions(), &self.options) {
            self.points.pop();
            return Err(self.reject(e));
        }

        if self.state == DrawToolState::Active {
            self.state = DrawToolState::Drawing;
            self.started_at = Some(Instant::now());
        }
        let index = self.points.len() - 1;
        let snap_type = self.points[index].snap.as_ref().and_then(|s| s.snap_type);
        self.emit(ToolEvent::PointAdded {
            index,
            position,
            snap_type,
            input_type,
        });

        let count = self.points.len();
        if closing.is_some() || self.strategy.required_points().is_reached(count) {
            return self.complete(ctx, true);
        }
        self.status();
        Ok(ToolOutcome::PointAccepted { count })
    }

    /// Complete an open-ended shape (polyline) with the points so far.
    pub fn finish(&mut self, ctx: &mut ToolContext<'_>) -> ToolResult<ToolOutcome> {
        if self.state != DrawToolState::Drawing {
            return Err(ToolError::NotAccepting(self.state));
        }
        let positions = self.positions();
        if !self.strategy.can_complete(&positions) {
            let e = GeometryError::NotEnoughPoints {
                required: self.strategy.required_points().min(),
                got: positions.len(),
            };
            return Err(self.reject(e));
        }
        self.complete(ctx, false)
    }

    fn positions(&self) -> Vec<DVec3> {
        self.points.iter().map(|p| p.position).collect()
    }

    /// Report a validation failure; state and accepted points stay as they are.
    fn reject(&mut self, error: GeometryError) -> ToolError {
        log::warn!("{} input rejected: {}", self.mode().label(), error);
        let message = format!("{}: {}", self.strategy.prompt(self.points.len()), error);
        self.emit(ToolEvent::StatusUpdate {
            state: self.state,
            message,
        });
        ToolError::Validation(error)
    }

    /// Enter the terminal error state.
    fn fail(&mut self, message: String) -> ToolError {
        log::error!("{} tool failed: {}", self.mode().label(), message);
        self.clear_points();
        self.suspended_from = None;
        self.state = DrawToolState::Error;
        self.emit(ToolEvent::StatusUpdate {
            state: self.state,
            message: message.clone(),
        });
        ToolError::Internal(message)
    }

    /// Validate, construct and commit the current points.
    ///
    /// `rollback_last` drops the newest point again if it turns out invalid
    /// (it was added by the call that triggered completion).
    fn complete(&mut self, ctx: &mut ToolContext<'_>, rollback_last: bool) -> ToolResult<ToolOutcome> {
        let positions = self.positions();
        let built = self
            .strategy
            .validate(&positions, &self.options)
            .and_then(|_| self.strategy.build_geometry(&positions, &self.options));
        let object = match built {
            Ok(object) => object,
            Err(e) => {
                if rollback_last {
                    self.points.pop();
                    if self.points.is_empty() {
                        self.state = DrawToolState::Active;
                        self.started_at = None;
                    }
                }
                return Err(self.reject(e));
            }
        };

        let handles = match construct(ctx.kernel, &object) {
            Ok(handles) => handles,
            Err(e) => {
                log::warn!("{} construction failed: {}", self.mode().label(), e);
                self.clear_points();
                self.state = DrawToolState::Active;
                self.emit(ToolEvent::StatusUpdate {
                    state: self.state,
                    message: format!("Construction failed: {e}"),
                });
                return Err(ToolError::Construction(e));
            }
        };
        if handles.is_empty() {
            return Err(self.fail(format!("kernel returned no shapes for {}", object.type_name())));
        }

        let object_id = object.id();
        let kind = object.kind();
        let command = AddObjectCommand::new(object, handles.clone());
        if let Err(e) = ctx.commands.execute(Box::new(command)) {
            release_all(ctx.kernel, &handles);
            return Err(self.fail(command_failure(e)));
        }

        let point_count = positions.len();
        let elapsed_ms = self
            .started_at
            .map(|t| Instant::now().duration_since(t).as_millis() as u64)
            .unwrap_or_default();
        log::info!(
            "{} completed ({} points, {} ms)",
            self.mode().label(),
            point_count,
            elapsed_ms
        );
        self.state = DrawToolState::Completed;
        self.emit(ToolEvent::Completed {
            object_id,
            kind,
            point_count,
            elapsed_ms,
        });
        self.restart(positions.last().copied());
        Ok(ToolOutcome::Completed { object_id })
    }

    /// Set up for the next shape according to the completion mode.
    fn restart(&mut self, last: Option<DVec3>) {
        let last_input = self.points.pop();
        self.clear_points();
        self.reference = None;
        let chainable = self.strategy.required_points().min() > 1;
        match (self.options.completion, last_input) {
            (CompletionMode::Chain, Some(seed)) if chainable => {
                self.points.push(InputPoint::new(seed.position, None, seed.input_type));
                self.started_at = Some(Instant::now());
                self.state = DrawToolState::Drawing;
            }
            (CompletionMode::Chain | CompletionMode::Continuous, _) => {
                self.reference = last;
                self.state = DrawToolState::Active;
            }
            (CompletionMode::Single, _) => {
                self.state = DrawToolState::Active;
            }
        }
        self.status();
    }
}

fn command_failure(error: CommandError) -> String {
    format!("command rejected: {error}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Command, CommandResult, Document};
    use crate::kernel::InMemoryKernel;
    use crate::snap::SnapSettings;

    fn p(x: f64, y: f64) -> DVec3 {
        DVec3::new(x, y, 0.0)
    }

    fn raw(point: DVec3) -> SnapResult {
        SnapResult::none(point)
    }

    struct Harness {
        kernel: InMemoryKernel,
        doc: Document,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                kernel: InMemoryKernel::new(),
                doc: Document::new(),
            }
        }

        fn add(&mut self, tool: &mut DrawTool, point: DVec3) -> ToolResult<ToolOutcome> {
            let mut ctx = ToolContext {
                kernel: &mut self.kernel,
                commands: &mut self.doc,
            };
            tool.add_point(raw(point), InputType::Programmatic, &mut ctx)
        }
    }

    fn active(mode: DrawMode) -> DrawTool {
        let mut tool = DrawTool::new(mode, ToolOptions::default());
        tool.activate();
        tool.take_events();
        tool
    }

    #[test]
    fn test_idle_rejects_points() {
        let mut h = Harness::new();
        let mut tool = DrawTool::new(DrawMode::Segment, ToolOptions::default());
        assert_eq!(
            h.add(&mut tool, p(0.0, 0.0)),
            Err(ToolError::NotAccepting(DrawToolState::Idle))
        );
    }

    #[test]
    fn test_segment_single_completion() {
        let mut h = Harness::new();
        let mut tool = active(DrawMode::Segment);
        assert_eq!(h.add(&mut tool, p(0.0, 0.0)), Ok(ToolOutcome::PointAccepted { count: 1 }));
        assert_eq!(tool.state(), DrawToolState::Drawing);
        let outcome = h.add(&mut tool, p(3.0, 0.0)).unwrap();
        assert!(matches!(outcome, ToolOutcome::Completed { .. }));
        assert_eq!(tool.state(), DrawToolState::Active);
        assert_eq!(tool.point_count(), 0);
        assert_eq!(h.doc.scene().len(), 1);
        assert_eq!(h.kernel.live_count(), 1);
        let events = tool.take_events();
        assert!(events.iter().any(|e| matches!(e, ToolEvent::Completed { point_count: 2, .. })));
    }

    #[test]
    fn test_validation_keeps_points_and_state() {
        let mut h = Harness::new();
        let mut tool = DrawTool::new(
            DrawMode::Segment,
            ToolOptions {
                min_segment_length: 0.1,
                ..ToolOptions::default()
            },
        );
        tool.activate();
        h.add(&mut tool, p(0.0, 0.0)).unwrap();
        let err = h.add(&mut tool, p(0.05, 0.0)).unwrap_err();
        assert!(matches!(err, ToolError::Validation(GeometryError::TooShort { .. })));
        assert_eq!(tool.state(), DrawToolState::Drawing);
        assert_eq!(tool.point_count(), 1);
        assert!(h.doc.scene().is_empty());

        // Retry succeeds
        assert!(matches!(h.add(&mut tool, p(1.0, 0.0)), Ok(ToolOutcome::Completed { .. })));
    }

    #[test]
    fn test_chain_mode_reseeds() {
        let mut h = Harness::new();
        let mut tool = DrawTool::new(
            DrawMode::Segment,
            ToolOptions {
                completion: CompletionMode::Chain,
                ..ToolOptions::default()
            },
        );
        tool.activate();
        h.add(&mut tool, p(0.0, 0.0)).unwrap();
        h.add(&mut tool, p(2.0, 0.0)).unwrap();
        assert_eq!(tool.state(), DrawToolState::Drawing);
        assert_eq!(tool.point_count(), 1);
        assert_eq!(tool.points()[0].position, p(2.0, 0.0));
        h.add(&mut tool, p(2.0, 2.0)).unwrap();
        assert_eq!(h.doc.scene().len(), 2);
    }

    #[test]
    fn test_continuous_mode_keeps_reference() {
        let mut h = Harness::new();
        let mut tool = DrawTool::new(
            DrawMode::Segment,
            ToolOptions {
                completion: CompletionMode::Continuous,
                ..ToolOptions::default()
            },
        );
        tool.activate();
        h.add(&mut tool, p(0.0, 0.0)).unwrap();
        h.add(&mut tool, p(2.0, 0.0)).unwrap();
        assert_eq!(tool.state(), DrawToolState::Active);
        assert_eq!(tool.point_count(), 0);
        assert_eq!(tool.reference_point(), Some(p(2.0, 0.0)));
    }

    #[test]
    fn test_point_mode_completes_on_first_point() {
        let mut h = Harness::new();
        let mut tool = active(DrawMode::Point);
        assert!(matches!(h.add(&mut tool, p(1.0, 1.0)), Ok(ToolOutcome::Completed { .. })));
        assert_eq!(tool.state(), DrawToolState::Active);
    }

    #[test]
    fn test_cancel_emits_once() {
        let mut h = Harness::new();
        let mut tool = active(DrawMode::Polyline);
        for pt in [p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0)] {
            h.add(&mut tool, pt).unwrap();
        }
        tool.take_events();
        assert!(tool.cancel());
        assert_eq!(tool.state(), DrawToolState::Active);
        assert_eq!(tool.point_count(), 0);
        let cancelled = tool
            .take_events()
            .into_iter()
            .filter(|e| matches!(e, ToolEvent::Cancelled { point_count: 3, .. }))
            .count();
        assert_eq!(cancelled, 1);
    }

    #[test]
    fn test_polyline_finish_and_close() {
        let mut h = Harness::new();
        let mut tool = active(DrawMode::Polyline);
        h.add(&mut tool, p(0.0, 0.0)).unwrap();
        {
            let mut ctx = ToolContext {
                kernel: &mut h.kernel,
                commands: &mut h.doc,
            };
            assert!(matches!(tool.finish(&mut ctx), Err(ToolError::Validation(_))));
        }
        for pt in [p(4.0, 0.0), p(4.0, 4.0)] {
            h.add(&mut tool, pt).unwrap();
        }
        // Click near the first vertex closes the loop.
        assert!(matches!(h.add(&mut tool, p(0.2, 0.1)), Ok(ToolOutcome::Completed { .. })));
        let obj = h.doc.scene().objects().next().unwrap();
        assert!(obj.is_closed());
        assert_eq!(obj.vertices().len(), 3);
        assert_eq!(h.kernel.live_count(), 3);
    }

    #[test]
    fn test_kernel_failure_resets_to_active() {
        let mut h = Harness::new();
        h.kernel.fail_after(0);
        let mut tool = active(DrawMode::Segment);
        h.add(&mut tool, p(0.0, 0.0)).unwrap();
        let err = h.add(&mut tool, p(1.0, 0.0)).unwrap_err();
        assert!(matches!(err, ToolError::Construction(_)));
        assert_eq!(tool.state(), DrawToolState::Active);
        assert_eq!(tool.point_count(), 0);
        assert!(h.doc.scene().is_empty());
    }

    #[derive(Debug, Default)]
    struct RejectingExecutor;

    impl CommandExecutor for RejectingExecutor {
        fn execute(&mut self, command: Box<dyn Command>) -> CommandResult<()> {
            Err(CommandError::Rejected(command.description()))
        }
    }

    #[test]
    fn test_executor_failure_is_terminal() {
        let mut kernel = InMemoryKernel::new();
        let mut commands = RejectingExecutor;
        let mut tool = active(DrawMode::Segment);
        let mut ctx = ToolContext {
            kernel: &mut kernel,
            commands: &mut commands,
        };
        tool.add_point(raw(p(0.0, 0.0)), InputType::Pointer, &mut ctx).unwrap();
        let err = tool.add_point(raw(p(1.0, 0.0)), InputType::Pointer, &mut ctx).unwrap_err();
        assert!(matches!(err, ToolError::Internal(_)));
        assert_eq!(tool.state(), DrawToolState::Error);
        assert_eq!(kernel.live_count(), 0);

        let mut ctx = ToolContext {
            kernel: &mut kernel,
            commands: &mut commands,
        };
        assert_eq!(
            tool.add_point(raw(p(0.0, 0.0)), InputType::Pointer, &mut ctx),
            Err(ToolError::NotAccepting(DrawToolState::Error))
        );
        assert!(!tool.cancel());
        tool.activate();
        assert_eq!(tool.state(), DrawToolState::Active);
    }

    #[test]
    fn test_suspend_resume_keeps_points() {
        let mut h = Harness::new();
        let mut tool = active(DrawMode::Circle3Point);
        h.add(&mut tool, p(0.0, 0.0)).unwrap();
        assert!(tool.suspend());
        assert_eq!(tool.state(), DrawToolState::Suspended);
        assert!(h.add(&mut tool, p(1.0, 0.0)).is_err());
        assert!(tool.resume());
        assert_eq!(tool.state(), DrawToolState::Drawing);
        assert_eq!(tool.point_count(), 1);
        assert!(!tool.resume());
    }

    #[test]
    fn test_pointer_move_updates_preview() {
        let mut tool = active(DrawMode::Segment);
        let mut h = Harness::new();
        let mut resolver = SnapResolver::new(SnapSettings::default());
        h.add(&mut tool, p(0.0, 0.0)).unwrap();
        let result = tool.pointer_move(p(3.2, 0.1), &[], &mut resolver);
        assert!(result.snapped);
        assert!(tool.preview().is_some());
        let events = tool.take_events();
        assert!(events.iter().any(|e| matches!(e, ToolEvent::MouseMove { .. })));
        assert!(events.iter().any(|e| matches!(e, ToolEvent::Snap { .. })));
    }

    #[test]
    fn test_ortho_lock_applies_before_snap() {
        let mut tool = active(DrawMode::Segment);
        let mut h = Harness::new();
        let mut settings = SnapSettings::default();
        settings.enabled = false;
        let mut resolver = SnapResolver::new(settings);
        h.add(&mut tool, p(1.0, 1.0)).unwrap();
        tool.set_lock(LockMode::Ortho);
        let located = tool.locate(p(5.0, 1.7), &[], &mut resolver);
        assert_eq!(located.point, p(5.0, 1.0));
        assert!(!located.snapped);
    }

    #[test]
    fn test_set_mode_resets_input() {
        let mut h = Harness::new();
        let mut tool = active(DrawMode::Segment);
        h.add(&mut tool, p(0.0, 0.0)).unwrap();
        tool.set_mode(DrawMode::Rectangle);
        assert_eq!(tool.mode(), DrawMode::Rectangle);
        assert_eq!(tool.state(), DrawToolState::Active);
        assert_eq!(tool.point_count(), 0);
    }
}
