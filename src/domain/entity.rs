/// Entities: the player actor and its movement parameters.
///
/// Pure data + pure queries. Applying movement against the world
/// (stage transitions) happens in `sim::step`.

use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};

use super::rect::{Rect, Viewport};
use super::stage::Direction;
use super::stats::Character;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Facing {
    Left,
    Right,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MovementType {
    Walk,
    Sprint,
}

/// Pixel speeds normalised to the walking reference rate.
///
/// Base speeds are "pixels per reference frame". The loop runs faster than
/// the reference, so each tick moves `base / (tick_rate / walking_target_fps)`.
/// Example: walk 4 at 60 ticks/s against a 30 fps reference = 2 px/tick,
/// i.e. 120 px/s regardless of how fast the loop runs.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct SpeedModel {
    pub walk: f32,
    pub sprint: f32,
    pub fps_ratio: f32,
}

impl SpeedModel {
    pub fn new(walk: f32, sprint: f32, tick_rate: u32, walking_target_fps: u32) -> Self {
        let fps_ratio = if tick_rate == 0 || walking_target_fps == 0 {
            1.0
        } else {
            tick_rate as f32 / walking_target_fps as f32
        };
        SpeedModel { walk, sprint, fps_ratio }
    }

    /// Pixels moved per tick.
    pub fn speed(&self, movement: MovementType) -> f32 {
        match movement {
            MovementType::Walk => self.walk / self.fps_ratio,
            MovementType::Sprint => self.sprint / self.fps_ratio,
        }
    }
}

impl Default for SpeedModel {
    fn default() -> Self {
        SpeedModel::new(4.0, 6.0, 60, 30)
    }
}

/// Diagnostic identity counter; never used for gameplay.
static NEXT_ACTOR_ID: AtomicU32 = AtomicU32::new(1);

#[derive(Debug)]
pub struct Actor {
    pub id: u32,
    pub rect: Rect,
    pub movement: MovementType,
    pub facing: Facing,
    /// Read-only stats owned by the data store.
    pub character: Option<Rc<Character>>,
}

impl Actor {
    pub fn new(rect: Rect) -> Self {
        Actor {
            id: NEXT_ACTOR_ID.fetch_add(1, Ordering::Relaxed),
            rect,
            movement: MovementType::Walk,
            facing: Facing::Right,
            character: None,
        }
    }

    /// Turn towards a horizontal direction.
    /// Returns true only when the facing actually changed (sprite mirror edge).
    pub fn face(&mut self, direction: Direction) -> bool {
        let facing = match direction {
            Direction::Left => Facing::Left,
            Direction::Right => Facing::Right,
            Direction::Top | Direction::Bottom => return false,
        };
        if self.facing == facing {
            return false;
        }
        self.facing = facing;
        true
    }

    pub fn shift(&mut self, direction: Direction, amount: f32) {
        match direction {
            Direction::Top => self.rect.y -= amount,
            Direction::Bottom => self.rect.y += amount,
            Direction::Left => self.rect.x -= amount,
            Direction::Right => self.rect.x += amount,
        }
    }
}

/// Would moving `rect` by `speed` towards `direction` leave the viewport?
pub fn crosses_boundary(rect: &Rect, direction: Direction, speed: f32, viewport: Viewport) -> bool {
    match direction {
        Direction::Right => rect.right() + speed > viewport.width,
        Direction::Bottom => rect.bottom() + speed > viewport.height,
        Direction::Left => rect.x - speed < 0.0,
        Direction::Top => rect.y - speed < 0.0,
    }
}

/// Place `rect` on the edge a stage is entered from after leaving the
/// previous one towards `direction` (leave right → enter at the left edge).
pub fn enter_from_opposite_edge(rect: &mut Rect, direction: Direction, viewport: Viewport) {
    match direction {
        Direction::Right => rect.x = 0.0,
        Direction::Left => rect.x = viewport.width - rect.w,
        Direction::Bottom => rect.y = 0.0,
        Direction::Top => rect.y = viewport.height - rect.h,
    }
}
