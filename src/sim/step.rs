/// The step function: advances the player actor by one tick.
///
/// Processing order, once per held direction (fixed order: Left, Right,
/// Top, Bottom; axes are resolved independently):
///   1. Facing update (horizontal directions only)
///   2. Boundary test: would moving by `speed` leave the viewport?
///   3. Leaving + neighbour  → switch stage, re-enter at the opposite edge
///   4. Leaving, no neighbour → blocked
///   5. Otherwise            → move by `speed`
///
/// A boundary crossing never moves the actor by `speed`; it either remaps
/// the actor or does nothing. At most one stage transition per tick: once
/// the actor changed stage, further crossings in the same tick are blocked.

use crate::domain::entity::{crosses_boundary, enter_from_opposite_edge, Actor, MovementType, SpeedModel};
use crate::domain::rect::Viewport;
use crate::domain::stage::Direction;
use super::event::GameEvent;
use super::world::World;

/// Held movement state sampled once per tick.
#[derive(Clone, Debug, Default)]
pub struct FrameInput {
    pub held: Vec<Direction>,
    pub sprint: bool,
}

pub fn step(
    world: &mut World,
    actor: &mut Actor,
    speeds: &SpeedModel,
    viewport: Viewport,
    input: &FrameInput,
) -> Vec<GameEvent> {
    let mut events = Vec::new();

    actor.movement = if input.sprint { MovementType::Sprint } else { MovementType::Walk };
    let speed = speeds.speed(actor.movement);
    let mut transitioned = false;

    for direction in Direction::ALL {
        if !input.held.contains(&direction) {
            continue;
        }

        if actor.face(direction) {
            events.push(GameEvent::FacingChanged);
        }

        if !crosses_boundary(&actor.rect, direction, speed, viewport) {
            actor.shift(direction, speed);
            continue;
        }

        match world.neighbor(direction) {
            Some(next) if !transitioned => {
                world.transition_to(next);
                enter_from_opposite_edge(&mut actor.rect, direction, viewport);
                transitioned = true;
                events.push(GameEvent::StageEntered { stage: next, via: direction });
            }
            _ => events.push(GameEvent::EdgeBlocked { direction }),
        }
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::Facing;
    use crate::domain::rect::Rect;
    use crate::domain::stage::StageGraph;

    const VP: Viewport = Viewport { width: 1300.0, height: 900.0 };

    fn held(dirs: &[Direction]) -> FrameInput {
        FrameInput { held: dirs.to_vec(), sprint: false }
    }

    fn actor_at(x: f32, y: f32) -> Actor {
        Actor::new(Rect::new(x, y, 40.0, 60.0))
    }

    fn lone_stage() -> World {
        let mut g = StageGraph::new();
        g.add("Alone").unwrap();
        World::new(g).unwrap()
    }

    #[test]
    fn walks_inside_the_stage() {
        let mut w = World::reference().unwrap();
        let mut a = actor_at(100.0, 200.0);
        let ev = step(&mut w, &mut a, &SpeedModel::default(), VP, &held(&[Direction::Right]));
        assert!(ev.is_empty());
        assert_eq!(a.rect.x, 102.0);
        assert_eq!(a.rect.y, 200.0);
    }

    #[test]
    fn sprint_is_faster() {
        let mut w = World::reference().unwrap();
        let mut a = actor_at(100.0, 200.0);
        let input = FrameInput { held: vec![Direction::Bottom], sprint: true };
        step(&mut w, &mut a, &SpeedModel::default(), VP, &input);
        assert_eq!(a.rect.y, 203.0);
        assert_eq!(a.movement, MovementType::Sprint);
    }

    #[test]
    fn diagonal_moves_both_axes() {
        let mut w = World::reference().unwrap();
        let mut a = actor_at(100.0, 200.0);
        step(&mut w, &mut a, &SpeedModel::default(), VP, &held(&[Direction::Top, Direction::Left]));
        assert_eq!((a.rect.x, a.rect.y), (98.0, 198.0));
    }

    #[test]
    fn crossing_right_edge_enters_east_stage_at_left_edge() {
        let mut w = World::reference().unwrap();
        let east = w.neighbor(Direction::Right).unwrap();
        // right edge half a pixel inside the boundary
        let mut a = actor_at(1300.0 - 40.0 - 0.5, 300.0);
        let ev = step(&mut w, &mut a, &SpeedModel::default(), VP, &held(&[Direction::Right]));
        assert_eq!(w.current(), east);
        assert_eq!(a.rect.x, 0.0);
        assert_eq!(a.rect.y, 300.0);
        assert_eq!(ev, vec![GameEvent::StageEntered { stage: east, via: Direction::Right }]);
    }

    #[test]
    fn crossing_without_neighbour_changes_nothing() {
        let mut w = lone_stage();
        let before = w.current();
        let mut a = actor_at(1300.0 - 40.0 - 0.5, 300.0);
        let ev = step(&mut w, &mut a, &SpeedModel::default(), VP, &held(&[Direction::Right]));
        assert_eq!(w.current(), before);
        assert_eq!(a.rect.x, 1259.5);
        assert_eq!(a.rect.y, 300.0);
        assert_eq!(ev, vec![GameEvent::EdgeBlocked { direction: Direction::Right }]);
    }

    #[test]
    fn every_edge_remaps_to_its_opposite() {
        let cases = [
            (Direction::Top, actor_at(500.0, 1.0), (500.0, 840.0)),
            (Direction::Bottom, actor_at(500.0, 839.0), (500.0, 0.0)),
            (Direction::Left, actor_at(1.0, 300.0), (1260.0, 300.0)),
        ];
        for (d, mut a, expected) in cases {
            let mut w = World::reference().unwrap();
            let target = w.neighbor(d).unwrap();
            step(&mut w, &mut a, &SpeedModel::default(), VP, &held(&[d]));
            assert_eq!(w.current(), target, "{d:?}");
            assert_eq!((a.rect.x, a.rect.y), expected, "{d:?}");
        }
    }

    #[test]
    fn walking_back_returns_to_start() {
        let mut w = World::reference().unwrap();
        let start = w.current();
        let mut a = actor_at(1259.0, 300.0);
        step(&mut w, &mut a, &SpeedModel::default(), VP, &held(&[Direction::Right]));
        assert_ne!(w.current(), start);
        // now at x = 0 in East; stepping left crosses back
        step(&mut w, &mut a, &SpeedModel::default(), VP, &held(&[Direction::Left]));
        assert_eq!(w.current(), start);
        assert_eq!(a.rect.x, 1260.0);
    }

    #[test]
    fn one_transition_per_tick() {
        // corner of the start stage: both Top and Left lead somewhere
        let mut w = World::reference().unwrap();
        let west = w.neighbor(Direction::Left).unwrap();
        let mut a = actor_at(1.0, 1.0);
        let ev = step(&mut w, &mut a, &SpeedModel::default(), VP, &held(&[Direction::Top, Direction::Left]));
        assert_eq!(w.current(), west);
        assert_eq!(a.rect.x, 1260.0);
        assert_eq!(a.rect.y, 1.0);
        assert!(ev.contains(&GameEvent::EdgeBlocked { direction: Direction::Top }));
    }

    #[test]
    fn facing_changes_once_per_direction_change() {
        let mut w = World::reference().unwrap();
        let mut a = actor_at(500.0, 300.0);
        let left = held(&[Direction::Left]);
        let ev = step(&mut w, &mut a, &SpeedModel::default(), VP, &left);
        assert_eq!(ev, vec![GameEvent::FacingChanged]);
        let ev = step(&mut w, &mut a, &SpeedModel::default(), VP, &left);
        assert!(ev.is_empty());
        assert_eq!(a.facing, Facing::Left);
        // vertical movement keeps facing
        step(&mut w, &mut a, &SpeedModel::default(), VP, &held(&[Direction::Top]));
        assert_eq!(a.facing, Facing::Left);
    }

    #[test]
    fn actor_stays_inside_viewport() {
        let mut w = lone_stage();
        let mut a = actor_at(5.0, 5.0);
        for d in Direction::ALL {
            for _ in 0..1000 {
                step(&mut w, &mut a, &SpeedModel::default(), VP, &held(&[d]));
                assert!(VP.encloses(&a.rect), "{:?}", a.rect);
            }
        }
    }
}
