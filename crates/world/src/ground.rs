//! Downward surface casts used to rest drops on the ground.

use glam::Vec3;

/// Resolves where a point dropped straight down first touches a surface.
pub trait GroundQuery {
    /// First solid surface below `from`, or `None` when the ray hits nothing.
    fn project_down(&self, from: Vec3) -> Option<Vec3>;
}

impl<F> GroundQuery for F
where
    F: Fn(Vec3) -> Option<Vec3>,
{
    fn project_down(&self, from: Vec3) -> Option<Vec3> {
        self(from)
    }
}

/// An infinite horizontal plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatGround {
    /// Height of the plane.
    pub height: f32,
}

impl FlatGround {
    /// Plane at `height`.
    pub fn new(height: f32) -> Self {
        Self { height }
    }
}

impl GroundQuery for FlatGround {
    fn project_down(&self, from: Vec3) -> Option<Vec3> {
        (from.y >= self.height).then(|| Vec3::new(from.x, self.height, from.z))
    }
}

/// Void: every cast misses.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGround;

impl GroundQuery for NoGround {
    fn project_down(&self, _from: Vec3) -> Option<Vec3> {
        None
    }
}
