//! Placed-object storage and undoable commands.

use crate::geometry::{ObjectId, PlacedObject, SceneObject};
use crate::kernel::KernelHandle;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Maximum number of undo steps to keep.
pub const MAX_UNDO_HISTORY: usize = 50;

/// Error type for command execution
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("Object not found: {0}")]
    NotFound(ObjectId),

    #[error("Object already exists: {0}")]
    AlreadyExists(ObjectId),

    #[error("Command rejected: {0}")]
    Rejected(String),
}

/// Result type for command execution
pub type CommandResult<T> = Result<T, CommandError>;

/// A placed object and the kernel shapes built for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneEntry {
    pub object: SceneObject,
    pub handles: Vec<KernelHandle>,
}

/// Placed objects in insertion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scene {
    entries: HashMap<ObjectId, SceneEntry>,
    order: Vec<ObjectId>,
}

impl Scene {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry. Fails if an object with the same id exists.
    pub fn insert(&mut self, entry: SceneEntry) -> CommandResult<ObjectId> {
        let id = entry.object.id();
        if self.entries.contains_key(&id) {
            return Err(CommandError::AlreadyExists(id));
        }
        self.entries.insert(id, entry);
        self.order.push(id);
        Ok(id)
    }

    /// Remove an entry, returning it if it existed.
    pub fn remove(&mut self, id: ObjectId) -> Option<SceneEntry> {
        let entry = self.entries.remove(&id)?;
        self.order.retain(|&o| o != id);
        Some(entry)
    }

    /// Get an entry by object id.
    pub fn get(&self, id: ObjectId) -> Option<&SceneEntry> {
        self.entries.get(&id)
    }

    /// Check if an object is placed.
    pub fn contains(&self, id: ObjectId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Objects in insertion order.
    pub fn objects(&self) -> impl Iterator<Item = &SceneObject> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id))
            .map(|e| &e.object)
    }

    /// Objects as snap targets.
    pub fn placed(&self) -> Vec<&dyn PlacedObject> {
        self.objects().map(SceneObject::as_placed).collect()
    }

    /// Get the number of placed objects.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if the scene is empty.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Serialize the scene to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize a scene from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// An undoable change to the scene.
pub trait Command: fmt::Debug {
    fn execute(&mut self, scene: &mut Scene) -> CommandResult<()>;

    fn undo(&mut self, scene: &mut Scene) -> CommandResult<()>;

    /// Human-readable label for history display.
    fn description(&self) -> String;

    /// Kernel shapes owned by the command's change. Released when the
    /// command is discarded while undone.
    fn handles(&self) -> &[KernelHandle] {
        &[]
    }
}

/// Runs commands on behalf of draw tools.
pub trait CommandExecutor {
    fn execute(&mut self, command: Box<dyn Command>) -> CommandResult<()>;
}

/// Add one finished object to the scene.
#[derive(Debug)]
pub struct AddObjectCommand {
    entry: SceneEntry,
}

impl AddObjectCommand {
    /// Create a command adding `object`, built as `handles`.
    pub fn new(object: SceneObject, handles: Vec<KernelHandle>) -> Self {
        Self {
            entry: SceneEntry { object, handles },
        }
    }

    /// Get the id of the object this command adds.
    pub fn object_id(&self) -> ObjectId {
        self.entry.object.id()
    }
}

impl Command for AddObjectCommand {
    fn execute(&mut self, scene: &mut Scene) -> CommandResult<()> {
        scene.insert(self.entry.clone()).map(|_| ())
    }

    fn undo(&mut self, scene: &mut Scene) -> CommandResult<()> {
        let id = self.object_id();
        scene.remove(id).map(|_| ()).ok_or(CommandError::NotFound(id))
    }

    fn description(&self) -> String {
        format!("Add {}", self.entry.object.type_name())
    }

    fn handles(&self) -> &[KernelHandle] {
        &self.entry.handles
    }
}

/// A scene plus its command history.
#[derive(Debug, Default)]
pub struct Document {
    scene: Scene,
    /// Undo stack (previously executed commands)
    undo_stack: Vec<Box<dyn Command>>,
    /// Redo stack (undone commands)
    redo_stack: Vec<Box<dyn Command>>,
    /// Handles of undone commands dropped from the redo stack, waiting to be
    /// released by the kernel owner.
    discarded: Vec<KernelHandle>,
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the placed objects.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Drain the kernel handles of discarded undone commands.
    ///
    /// Commands trimmed off the bottom of the undo stack keep their objects
    /// in the scene and contribute nothing here.
    pub fn take_discarded_handles(&mut self) -> Vec<KernelHandle> {
        std::mem::take(&mut self.discarded)
    }

    /// Undo the last command.
    /// Returns false if there was nothing to undo.
    pub fn undo(&mut self) -> CommandResult<bool> {
        let Some(mut command) = self.undo_stack.pop() else {
            return Ok(false);
        };
        if let Err(e) = command.undo(&mut self.scene) {
            self.undo_stack.push(command);
            return Err(e);
        }
        log::debug!("Undo: {}", command.description());
        self.redo_stack.push(command);
        Ok(true)
    }

    /// Redo the last undone command.
    /// Returns false if there was nothing to redo.
    pub fn redo(&mut self) -> CommandResult<bool> {
        let Some(mut command) = self.redo_stack.pop() else {
            return Ok(false);
        };
        if let Err(e) = command.execute(&mut self.scene) {
            self.redo_stack.push(command);
            return Err(e);
        }
        log::debug!("Redo: {}", command.description());
        self.undo_stack.push(command);
        Ok(true)
    }

    /// Check if undo is available.
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available.
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Descriptions of undoable commands, oldest first.
    pub fn history(&self) -> Vec<String> {
        self.undo_stack.iter().map(|c| c.description()).collect()
    }
}

impl CommandExecutor for Document {
    fn execute(&mut self, mut command: Box<dyn Command>) -> CommandResult<()> {
        command.execute(&mut self.scene)?;
        log::debug!("Executed: {}", command.description());
        self.undo_stack.push(command);
        // New changes invalidate redo
        for undone in self.redo_stack.drain(..) {
            self.discarded.extend_from_slice(undone.handles());
        }
        if self.undo_stack.len() > MAX_UNDO_HISTORY {
            self.undo_stack.remove(0);
        }
        Ok(())
    }
}
