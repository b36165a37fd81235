//! DraftCAD core: the drafting input pipeline.
//!
//! Pointer input flows through the [`constraints`] engine, then the
//! [`snap`] resolver, into a [`tools::DrawTool`]. Finished shapes are built by
//! a [`kernel::GeometryKernel`] and added to the [`document`] through an
//! undoable command.

pub mod config;
pub mod constraints;
pub mod document;
pub mod geometry;
pub mod kernel;
pub mod session;
pub mod snap;
pub mod tools;

pub use config::{ConfigError, EditorConfig};
pub use constraints::{ConstraintEngine, DrawConstraints, LockMode};
pub use document::{AddObjectCommand, Command, CommandError, CommandExecutor, Document, Scene};
pub use geometry::{DrawingPlane, GeometryError, ObjectId, ObjectKind, PlacedObject, SceneObject};
pub use kernel::{GeometryKernel, InMemoryKernel, KernelError, KernelHandle, TessellatedMesh};
pub use session::DrawingSession;
pub use snap::{SnapMask, SnapResolver, SnapResult, SnapSettings, SnapType};
pub use tools::{
    CompletionMode, DrawMode, DrawTool, DrawToolState, InputType, ToolError, ToolEvent, ToolOptions,
    ToolOutcome,
};
