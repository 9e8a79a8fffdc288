/// Collision layer: axis-separated sliding movement against a blocking set.
///
/// ## Movement
///
/// The blocking set is a flat slice of rects (walls + closed gates),
/// derived fresh by the caller each phase. Movement resolves each axis
/// independently:
///
///   1. Already overlapping a blocker at the start → the move is rejected.
///   2. Apply the x displacement. If that creates an overlap, back off one
///      pixel at a time toward the start until clear; x is marked blocked.
///   3. Same for y, starting from wherever x ended up.
///
/// A diagonal push into a wall therefore slides along the open axis; both
/// axes block only when each collides on its own.
///
/// Displacement per axis is `trunc(direction * speed)` whole pixels.

use super::geometry::{collides_any, Rect, Vec2};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MoveOutcome {
    /// No directional input this frame.
    Idle,
    /// Started the frame inside a blocker; nothing moved.
    Rejected,
    Moved { x_blocked: bool, y_blocked: bool },
}

/// Move `rect` along `dir` at `speed`, resolving collisions per axis.
pub fn move_and_collide(rect: Rect, dir: Vec2, speed: f32, blocking: &[Rect]) -> (Rect, MoveOutcome) {
    if collides_any(&rect, blocking) {
        return (rect, MoveOutcome::Rejected);
    }
    if dir.is_zero() {
        return (rect, MoveOutcome::Idle);
    }

    let dx = (dir.x * speed) as i32;
    let dy = (dir.y * speed) as i32;

    let (rect, x_blocked) = slide_axis(rect, dx, 0, blocking);
    let (rect, y_blocked) = slide_axis(rect, 0, dy, blocking);

    (rect, MoveOutcome::Moved { x_blocked, y_blocked })
}

/// Translate by (dx, dy), exactly one of them non-zero, and back off
/// pixel by pixel while overlapping. Returns the new rect and whether
/// the axis was blocked.
fn slide_axis(rect: Rect, dx: i32, dy: i32, blocking: &[Rect]) -> (Rect, bool) {
    let distance = dx.abs() + dy.abs();
    if distance == 0 {
        return (rect, false);
    }

    let mut moved = rect.translated(dx, dy);
    if !collides_any(&moved, blocking) {
        return (moved, false);
    }

    let (bx, by) = (-dx.signum(), -dy.signum());
    // The start position was clear, so `distance` steps always suffice.
    for _ in 0..distance {
        if !collides_any(&moved, blocking) {
            break;
        }
        moved = moved.translated(bx, by);
    }
    (moved, true)
}

/// Does `rect` overlap any rect in `others`, skipping index `skip`?
pub fn overlaps_other(rect: &Rect, others: &[Rect], skip: usize) -> bool {
    others
        .iter()
        .enumerate()
        .any(|(i, o)| i != skip && o.intersects(rect))
}
