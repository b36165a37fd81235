//! A drawing session: document, kernel, snap resolver and the active tool.

use crate::config::EditorConfig;
use crate::constraints::{DrawConstraints, LockMode};
use crate::document::{CommandResult, Document};
use crate::kernel::{GeometryKernel, InMemoryKernel, release_all};
use crate::snap::{SnapResolver, SnapResult, SnapSettings};
use crate::tools::{
    DrawMode, DrawTool, DrawToolState, InputType, ToolContext, ToolEvent, ToolOptions, ToolOutcome,
    ToolResult,
};
use glam::DVec3;

/// Owns everything one editor view needs to turn pointer input into placed
/// objects.
#[derive(Debug)]
pub struct DrawingSession<K: GeometryKernel = InMemoryKernel> {
    document: Document,
    kernel: K,
    resolver: SnapResolver,
    tool: DrawTool,
}

impl DrawingSession<InMemoryKernel> {
    /// Session backed by the in-memory kernel.
    pub fn new(config: EditorConfig) -> Self {
        Self::with_kernel(config, InMemoryKernel::new())
    }
}

impl<K: GeometryKernel> DrawingSession<K> {
    /// Create a session; the tool starts out active.
    pub fn with_kernel(config: EditorConfig, kernel: K) -> Self {
        let mut tool = DrawTool::new(config.mode, config.tool);
        tool.set_constraints(config.constraints);
        tool.set_lock(config.lock);
        tool.activate();
        log::debug!("Session started with {} kernel", kernel.name());
        Self {
            document: Document::new(),
            kernel,
            resolver: SnapResolver::new(config.snap),
            tool,
        }
    }

    /// Get the document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Get the geometry kernel.
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Get the geometry kernel mutably.
    pub fn kernel_mut(&mut self) -> &mut K {
        &mut self.kernel
    }

    /// Get the active draw tool.
    pub fn tool(&self) -> &DrawTool {
        &self.tool
    }

    /// Get the tool state.
    pub fn state(&self) -> DrawToolState {
        self.tool.state()
    }

    /// Get the snap settings.
    pub fn snap_settings(&self) -> &SnapSettings {
        self.resolver.settings()
    }

    /// Cursor moved: constrain, snap and refresh the preview.
    pub fn pointer_move(&mut self, raw: DVec3) -> SnapResult {
        let objects = self.document.scene().placed();
        self.tool.pointer_move(raw, &objects, &mut self.resolver)
    }

    /// Click: constrain, snap and feed the point to the tool.
    pub fn pointer_down(&mut self, raw: DVec3) -> ToolResult<ToolOutcome> {
        let located = {
            let objects = self.document.scene().placed();
            self.tool.locate(raw, &objects, &mut self.resolver)
        };
        self.submit(located, InputType::Pointer)
    }

    /// Typed coordinates. Used as given, without constraints or snapping.
    pub fn enter_point(&mut self, position: DVec3) -> ToolResult<ToolOutcome> {
        self.submit(SnapResult::none(position), InputType::Keyboard)
    }

    fn submit(&mut self, located: SnapResult, input_type: InputType) -> ToolResult<ToolOutcome> {
        let mut ctx = ToolContext {
            kernel: &mut self.kernel,
            commands: &mut self.document,
        };
        let outcome = self.tool.add_point(located, input_type, &mut ctx)?;
        if matches!(outcome, ToolOutcome::Completed { .. }) {
            self.committed();
        }
        Ok(outcome)
    }

    /// A command went through: drop shapes of discarded redo entries and
    /// stale snap results.
    fn committed(&mut self) {
        let discarded = self.document.take_discarded_handles();
        if !discarded.is_empty() {
            log::debug!("Releasing {} discarded kernel shapes", discarded.len());
            release_all(&mut self.kernel, &discarded);
        }
        self.resolver.invalidate();
    }

    /// Complete an open-ended shape.
    pub fn finish(&mut self) -> ToolResult<ToolOutcome> {
        let mut ctx = ToolContext {
            kernel: &mut self.kernel,
            commands: &mut self.document,
        };
        let outcome = self.tool.finish(&mut ctx)?;
        self.committed();
        Ok(outcome)
    }

    /// Abandon the current shape. Returns false if there was nothing to cancel.
    pub fn cancel(&mut self) -> bool {
        self.tool.cancel()
    }

    /// Restart the tool; also clears the error state.
    pub fn activate(&mut self) {
        self.tool.activate();
    }

    /// Freeze input, keeping accepted points.
    pub fn suspend(&mut self) -> bool {
        self.tool.suspend()
    }

    /// Resume after `suspend`.
    pub fn resume(&mut self) -> bool {
        self.tool.resume()
    }

    /// Undo the last command. Returns false if there was nothing to undo.
    pub fn undo(&mut self) -> CommandResult<bool> {
        let undone = self.document.undo()?;
        if undone {
            self.resolver.invalidate();
        }
        Ok(undone)
    }

    /// Redo the last undone command. Returns false if there was nothing to redo.
    pub fn redo(&mut self) -> CommandResult<bool> {
        let redone = self.document.redo()?;
        if redone {
            self.resolver.invalidate();
        }
        Ok(redone)
    }

    /// Switch drawing mode, discarding input in progress.
    pub fn set_mode(&mut self, mode: DrawMode) {
        self.tool.set_mode(mode);
    }

    /// Replace the drawing options.
    pub fn set_options(&mut self, options: ToolOptions) {
        self.tool.set_options(options);
    }

    /// Replace the constraints.
    pub fn set_constraints(&mut self, constraints: DrawConstraints) {
        self.tool.set_constraints(constraints);
    }

    /// Set the directional lock.
    pub fn set_lock(&mut self, lock: LockMode) {
        self.tool.set_lock(lock);
    }

    /// Cycle none → ortho → polar.
    pub fn cycle_lock(&mut self) -> LockMode {
        let next = self.tool.constraints().lock().next();
        self.tool.set_lock(next);
        next
    }

    /// Replace the snap settings; clears cached results.
    pub fn set_snap_settings(&mut self, settings: SnapSettings) {
        self.resolver.set_settings(settings);
    }

    /// Drain pending tool events.
    pub fn take_events(&mut self) -> Vec<ToolEvent> {
        self.tool.take_events()
    }
}
