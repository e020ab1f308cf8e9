//! Axis-aligned overlap tests
//!
//! Every collider in the game is a rectangle, so one strict overlap test
//! covers player/obstacle, player/pickup and projectile/obstacle pairs.

use super::state::Rect;

/// Strict AABB overlap; touching edges do not collide
#[inline]
pub fn collides(a: &Rect, b: &Rect) -> bool {
    a.x < b.right() && a.right() > b.x && a.y < b.bottom() && a.bottom() > b.y
}
