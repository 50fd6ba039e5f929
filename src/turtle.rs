//! Turtle state and the branch stack used while executing a sentence.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::GrammarError;

/// Cursor that string-grammar actions read, draw at, and advance.
///
/// `orientation` is the forward direction. It is not kept normalized:
/// actions that nudge it (e.g. adding an upward bias) must renormalize.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Turtle {
    /// Current world-space position of the cursor.
    pub position: Vec3,

    /// Forward direction.
    pub orientation: Vec3,

    /// Radius factor of the next prism's base. Tapers as branches thin out.
    pub scale_top: f32,

    /// Number of branch points between this turtle and the root.
    pub depth: u32,
}

impl Default for Turtle {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Vec3::Y,
            scale_top: 1.0,
            depth: 0,
        }
    }
}

impl Turtle {
    /// Unit forward direction. Falls back to `+Y` for a zero orientation.
    pub fn forward(&self) -> Vec3 {
        self.orientation.try_normalize().unwrap_or(Vec3::Y)
    }

    /// Advances `position` by `distance` along the normalized orientation.
    pub fn move_forward(&mut self, distance: f32) {
        self.position += self.forward() * distance;
    }

    /// Rotates the orientation about the world X axis by `angle` radians.
    pub fn rotate_x(&mut self, angle: f32) {
        self.orientation = Quat::from_rotation_x(angle) * self.orientation;
    }

    /// Rotates the orientation about the world Y axis by `angle` radians.
    pub fn rotate_y(&mut self, angle: f32) {
        self.orientation = Quat::from_rotation_y(angle) * self.orientation;
    }

    /// Rotates the orientation about the world Z axis by `angle` radians.
    pub fn rotate_z(&mut self, angle: f32) {
        self.orientation = Quat::from_rotation_z(angle) * self.orientation;
    }

    /// Adds `bias` to the orientation and renormalizes.
    pub fn nudge(&mut self, bias: Vec3) {
        self.orientation = (self.orientation + bias).try_normalize().unwrap_or(Vec3::Y);
    }

    /// Rotation taking `+Y` onto the forward direction.
    pub fn rotation(&self) -> Quat {
        Quat::from_rotation_arc(Vec3::Y, self.forward())
    }
}

/// Branch stack. The active turtle is always present; `pop` on the root fails.
#[derive(Clone, Debug)]
pub struct TurtleStack {
    current: Turtle,
    saved: Vec<Turtle>,
    limit: usize,
}

impl TurtleStack {
    pub fn new(root: Turtle, limit: usize) -> Self {
        Self {
            current: root,
            saved: Vec::new(),
            limit,
        }
    }

    /// The turtle the executing symbol owns for its turn.
    pub fn top(&self) -> &Turtle {
        &self.current
    }

    pub fn top_mut(&mut self) -> &mut Turtle {
        &mut self.current
    }

    /// Saves the active turtle and continues on a copy one level deeper.
    pub fn push(&mut self) -> Result<(), GrammarError> {
        if self.saved.len() >= self.limit {
            return Err(GrammarError::StackOverflow { limit: self.limit });
        }
        self.saved.push(self.current.clone());
        self.current.depth += 1;
        Ok(())
    }

    /// Discards the active turtle and returns to the last branch point.
    pub fn pop(&mut self) -> Result<(), GrammarError> {
        self.current = self.saved.pop().ok_or(GrammarError::StackUnderflow)?;
        Ok(())
    }

    /// Saved states below the active turtle.
    pub fn depth(&self) -> usize {
        self.saved.len()
    }
}
