/// Stage graph: named map cells joined by four-way neighbour links.
///
/// ## Symmetry
///
/// Links are only ever created through `StageGraph::link`, which writes
/// both sides in one step:
///   - `a.neighbor(d) = b`
///   - `b.neighbor(d.opposite()) = a`   (only if `b` has no reciprocal yet)
///
/// The reciprocal guard makes a repeated link a no-op, so there is no
/// setter ping-pong between the two stages.
///
/// ## Coordinates
///
/// Grid coordinates are derived from links, never set by hand:
///   - the first stage added is the origin `(0, 0)`
///   - linking a coordinated stage to an uncoordinated one places the
///     latter one unit away along the link axis
///   - linking two uncoordinated stages defers the assignment;
///     `settle_coordinates()` resolves those later
///
/// Axis convention (screen space): Right = x + 1, Left = x - 1,
/// Bottom = y + 1, Top = y - 1.

use std::ops::Index;

use thiserror::Error;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Direction {
    Top,
    Bottom,
    Left,
    Right,
}

impl Direction {
    /// Fixed resolution order for held movement keys.
    pub const ALL: [Direction; 4] = [
        Direction::Left,
        Direction::Right,
        Direction::Top,
        Direction::Bottom,
    ];

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Top => Direction::Bottom,
            Direction::Bottom => Direction::Top,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Unit grid offset for this direction.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Top => (0, -1),
            Direction::Bottom => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    fn slot(self) -> usize {
        match self {
            Direction::Top => 0,
            Direction::Bottom => 1,
            Direction::Left => 2,
            Direction::Right => 3,
        }
    }
}

/// Index of a stage inside its `StageGraph`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct StageId(usize);

#[derive(Clone, Debug)]
pub struct Stage {
    name: String,
    coord: Option<(i32, i32)>,
    neighbors: [Option<StageId>; 4],
}

impl Stage {
    fn new(name: String) -> Self {
        Stage { name, coord: None, neighbors: [None; 4] }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Grid coordinate, or `None` while still deferred.
    pub fn coord(&self) -> Option<(i32, i32)> {
        self.coord
    }

    pub fn neighbor(&self, direction: Direction) -> Option<StageId> {
        self.neighbors[direction.slot()]
    }
}

/// One cell of the overview map.
#[derive(Clone, Debug, PartialEq)]
pub struct MapCell {
    pub x: i32,
    pub y: i32,
    pub name: String,
    pub current: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("a stage named [{0}] already exists")]
    DuplicateName(String),
    #[error("stage id {0:?} does not belong to this graph")]
    UnknownStage(StageId),
    #[error("stage [{0}] cannot be linked to itself")]
    SelfLink(String),
    #[error("stage [{stage}] already has a {direction:?} neighbour [{existing}]")]
    Occupied {
        stage: String,
        direction: Direction,
        existing: String,
    },
    #[error("[{from}] -> [{to}] ({direction:?}) disagrees with their grid coordinates")]
    CoordinateMismatch {
        from: String,
        to: String,
        direction: Direction,
    },
    #[error("grid cell {coord:?} is already taken by [{existing}]")]
    CoordinateTaken { coord: (i32, i32), existing: String },
}

#[derive(Clone, Debug, Default)]
pub struct StageGraph {
    stages: Vec<Stage>,
}

impl StageGraph {
    pub fn new() -> Self {
        StageGraph { stages: vec![] }
    }

    /// Add a stage. The first stage becomes the grid origin.
    pub fn add(&mut self, name: impl Into<String>) -> Result<StageId, GraphError> {
        let name = name.into();
        if self.find(&name).is_some() {
            return Err(GraphError::DuplicateName(name));
        }
        let mut stage = Stage::new(name);
        if self.stages.is_empty() {
            stage.coord = Some((0, 0));
        }
        self.stages.push(stage);
        Ok(StageId(self.stages.len() - 1))
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn contains(&self, id: StageId) -> bool {
        id.0 < self.stages.len()
    }

    pub fn get(&self, id: StageId) -> Option<&Stage> {
        self.stages.get(id.0)
    }

    pub fn find(&self, name: &str) -> Option<StageId> {
        self.stages.iter().position(|s| s.name == name).map(StageId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (StageId, &Stage)> {
        self.stages.iter().enumerate().map(|(i, s)| (StageId(i), s))
    }

    /// Neighbour of `id` in `direction`. Unknown ids have no neighbours.
    pub fn neighbor(&self, id: StageId, direction: Direction) -> Option<StageId> {
        self.get(id).and_then(|s| s.neighbor(direction))
    }

    /// Make `b` the `direction` neighbour of `a`, and `a` the opposite
    /// neighbour of `b`. Validates everything before writing anything.
    pub fn link(&mut self, direction: Direction, a: StageId, b: StageId) -> Result<(), GraphError> {
        if !self.contains(a) {
            return Err(GraphError::UnknownStage(a));
        }
        if !self.contains(b) {
            return Err(GraphError::UnknownStage(b));
        }
        if a == b {
            return Err(GraphError::SelfLink(self.stages[a.0].name.clone()));
        }

        let back = direction.opposite();
        if let Some(existing) = self.stages[a.0].neighbor(direction) {
            if existing != b {
                return Err(self.occupied(a, direction, existing));
            }
        }
        let reciprocal = self.stages[b.0].neighbor(back);
        if let Some(existing) = reciprocal {
            if existing != a {
                return Err(self.occupied(b, back, existing));
            }
        }

        let (dx, dy) = direction.delta();
        let (coord_a, coord_b) = match (self.stages[a.0].coord, self.stages[b.0].coord) {
            (Some(pa), Some(pb)) => {
                if (pa.0 + dx, pa.1 + dy) != pb {
                    return Err(GraphError::CoordinateMismatch {
                        from: self.stages[a.0].name.clone(),
                        to: self.stages[b.0].name.clone(),
                        direction,
                    });
                }
                (Some(pa), Some(pb))
            }
            (Some(pa), None) => {
                let pb = (pa.0 + dx, pa.1 + dy);
                self.ensure_free(pb)?;
                (Some(pa), Some(pb))
            }
            (None, Some(pb)) => {
                let pa = (pb.0 - dx, pb.1 - dy);
                self.ensure_free(pa)?;
                (Some(pa), Some(pb))
            }
            (None, None) => (None, None),
        };

        self.stages[a.0].neighbors[direction.slot()] = Some(b);
        if reciprocal.is_none() {
            self.stages[b.0].neighbors[back.slot()] = Some(a);
            self.stages[a.0].coord = coord_a;
            self.stages[b.0].coord = coord_b;
            log::trace!(
                "linked [{}] -{:?}-> [{}]",
                self.stages[a.0].name, direction, self.stages[b.0].name
            );
        }
        Ok(())
    }

    /// Propagate coordinates across links whose assignment was deferred.
    /// Returns how many stages remain without a coordinate (unreachable
    /// from any coordinated stage). A conflict leaves every coordinate
    /// as it was.
    pub fn settle_coordinates(&mut self) -> Result<usize, GraphError> {
        let mut coords: Vec<Option<(i32, i32)>> = self.stages.iter().map(|s| s.coord).collect();
        loop {
            let mut assigned = false;
            for i in 0..self.stages.len() {
                let Some((x, y)) = coords[i] else { continue };
                for direction in Direction::ALL {
                    let Some(n) = self.stages[i].neighbor(direction) else { continue };
                    if coords[n.0].is_some() {
                        continue;
                    }
                    let (dx, dy) = direction.delta();
                    let cell = (x + dx, y + dy);
                    if let Some(taken) = coords.iter().position(|c| *c == Some(cell)) {
                        return Err(GraphError::CoordinateTaken {
                            coord: cell,
                            existing: self.stages[taken].name.clone(),
                        });
                    }
                    coords[n.0] = Some(cell);
                    assigned = true;
                }
            }
            if !assigned {
                break;
            }
        }

        // a deferred cycle can place both ends of a link before the link is seen
        for (i, stage) in self.stages.iter().enumerate() {
            let Some((x, y)) = coords[i] else { continue };
            for direction in Direction::ALL {
                let Some(n) = stage.neighbor(direction) else { continue };
                let (dx, dy) = direction.delta();
                if coords[n.0].is_some_and(|c| c != (x + dx, y + dy)) {
                    return Err(GraphError::CoordinateMismatch {
                        from: stage.name.clone(),
                        to: self.stages[n.0].name.clone(),
                        direction,
                    });
                }
            }
        }

        for (stage, coord) in self.stages.iter_mut().zip(&coords) {
            stage.coord = *coord;
        }
        Ok(coords.iter().filter(|c| c.is_none()).count())
    }

    /// Overview map: every coordinated stage, flagging `current`.
    pub fn map_cells(&self, current: StageId) -> Vec<MapCell> {
        self.iter()
            .filter_map(|(id, s)| {
                s.coord().map(|(x, y)| MapCell {
                    x,
                    y,
                    name: s.name.clone(),
                    current: id == current,
                })
            })
            .collect()
    }

    // ── Internal ──

    fn occupied(&self, stage: StageId, direction: Direction, existing: StageId) -> GraphError {
        GraphError::Occupied {
            stage: self.stages[stage.0].name.clone(),
            direction,
            existing: self.stages[existing.0].name.clone(),
        }
    }

    fn ensure_free(&self, coord: (i32, i32)) -> Result<(), GraphError> {
        match self.stages.iter().find(|s| s.coord == Some(coord)) {
            Some(s) => Err(GraphError::CoordinateTaken { coord, existing: s.name.clone() }),
            None => Ok(()),
        }
    }
}

impl Index<StageId> for StageGraph {
    type Output = Stage;

    /// Panics on an id from another graph, like slice indexing.
    fn index(&self, id: StageId) -> &Stage {
        &self.stages[id.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> (StageGraph, StageId, StageId) {
        let mut g = StageGraph::new();
        let a = g.add("A").unwrap();
        let b = g.add("B").unwrap();
        (g, a, b)
    }

    #[test]
    fn opposite_is_an_involution() {
        for d in Direction::ALL {
            assert_ne!(d, d.opposite());
            assert_eq!(d, d.opposite().opposite());
            let (dx, dy) = d.delta();
            let (ox, oy) = d.opposite().delta();
            assert_eq!((dx + ox, dy + oy), (0, 0));
        }
    }

    #[test]
    fn first_stage_is_origin() {
        let (g, a, b) = pair();
        assert_eq!(g.get(a).unwrap().coord(), Some((0, 0)));
        assert_eq!(g.get(b).unwrap().coord(), None);
    }

    #[test]
    fn link_is_symmetric_in_every_direction() {
        for d in Direction::ALL {
            let (mut g, a, b) = pair();
            g.link(d, a, b).unwrap();
            assert_eq!(g.neighbor(a, d), Some(b));
            assert_eq!(g.neighbor(b, d.opposite()), Some(a));
        }
    }

    #[test]
    fn link_derives_neighbour_coordinate() {
        let cases = [
            (Direction::Right, (1, 0)),
            (Direction::Left, (-1, 0)),
            (Direction::Top, (0, -1)),
            (Direction::Bottom, (0, 1)),
        ];
        for (d, expected) in cases {
            let (mut g, a, b) = pair();
            g.link(d, a, b).unwrap();
            assert_eq!(g.get(b).unwrap().coord(), Some(expected), "{d:?}");
        }
    }

    #[test]
    fn coordinate_derived_from_the_side_that_has_one() {
        let (mut g, a, b) = pair();
        // b has no coordinate; link from b's side towards the origin.
        g.link(Direction::Left, b, a).unwrap();
        assert_eq!(g.get(b).unwrap().coord(), Some((1, 0)));
        assert_eq!(g.neighbor(a, Direction::Right), Some(b));
    }

    #[test]
    fn repeated_link_is_a_no_op() {
        let (mut g, a, b) = pair();
        g.link(Direction::Bottom, a, b).unwrap();
        g.link(Direction::Bottom, a, b).unwrap();
        g.link(Direction::Top, b, a).unwrap();
        assert_eq!(g.neighbor(a, Direction::Bottom), Some(b));
        assert_eq!(g.neighbor(b, Direction::Top), Some(a));
        assert_eq!(g.get(b).unwrap().coord(), Some((0, 1)));
    }

    #[test]
    fn missing_neighbour_is_none() {
        let (g, a, _) = pair();
        for d in Direction::ALL {
            assert_eq!(g.neighbor(a, d), None);
        }
    }

    #[test]
    fn self_link_rejected() {
        let (mut g, a, _) = pair();
        assert!(matches!(g.link(Direction::Right, a, a), Err(GraphError::SelfLink(_))));
        assert_eq!(g.neighbor(a, Direction::Right), None);
    }

    #[test]
    fn occupied_slot_rejected_without_side_effects() {
        let mut g = StageGraph::new();
        let a = g.add("A").unwrap();
        let b = g.add("B").unwrap();
        let c = g.add("C").unwrap();
        g.link(Direction::Right, a, b).unwrap();
        let err = g.link(Direction::Right, a, c).unwrap_err();
        assert!(matches!(err, GraphError::Occupied { .. }));
        assert_eq!(g.neighbor(a, Direction::Right), Some(b));
        assert_eq!(g.neighbor(c, Direction::Left), None);
        assert_eq!(g.get(c).unwrap().coord(), None);
    }

    #[test]
    fn coordinate_mismatch_rejected() {
        let mut g = StageGraph::new();
        let a = g.add("A").unwrap();
        let b = g.add("B").unwrap();
        let c = g.add("C").unwrap();
        let e = g.add("E").unwrap();
        let f = g.add("F").unwrap();
        g.link(Direction::Right, a, b).unwrap(); // (1, 0)
        g.link(Direction::Right, b, e).unwrap(); // (2, 0)
        g.link(Direction::Bottom, e, f).unwrap(); // (2, 1)
        g.link(Direction::Bottom, a, c).unwrap(); // (0, 1)
        // both sides free, but f is two cells right of c
        let err = g.link(Direction::Right, c, f).unwrap_err();
        assert!(matches!(err, GraphError::CoordinateMismatch { .. }));
        assert_eq!(g.neighbor(c, Direction::Right), None);
        assert_eq!(g.neighbor(f, Direction::Left), None);
    }

    #[test]
    fn taken_cell_rejected() {
        let mut g = StageGraph::new();
        let a = g.add("A").unwrap();
        let b = g.add("B").unwrap();
        let c = g.add("C").unwrap();
        let d = g.add("D").unwrap();
        g.link(Direction::Right, a, b).unwrap(); // (1, 0)
        g.link(Direction::Bottom, b, c).unwrap(); // (1, 1)
        g.link(Direction::Left, c, d).unwrap(); // (0, 1)
        // a's bottom side is free, but the cell below it belongs to d
        let e = g.add("E").unwrap();
        let err = g.link(Direction::Bottom, a, e).unwrap_err();
        assert!(matches!(err, GraphError::CoordinateTaken { coord: (0, 1), .. }));
        assert_eq!(g.neighbor(a, Direction::Bottom), None);
        assert_eq!(g.get(e).unwrap().coord(), None);
    }

    #[test]
    fn duplicate_name_rejected() {
        let (mut g, _, _) = pair();
        assert_eq!(g.add("A"), Err(GraphError::DuplicateName("A".into())));
    }

    #[test]
    fn deferred_coordinates_settle() {
        let mut g = StageGraph::new();
        let origin = g.add("Origin").unwrap();
        let b = g.add("B").unwrap();
        let c = g.add("C").unwrap();
        // neither b nor c has a coordinate yet
        g.link(Direction::Right, b, c).unwrap();
        assert_eq!(g.get(b).unwrap().coord(), None);
        assert_eq!(g.get(c).unwrap().coord(), None);
        assert_eq!(g.settle_coordinates(), Ok(2));

        g.link(Direction::Bottom, origin, b).unwrap();
        assert_eq!(g.get(b).unwrap().coord(), Some((0, 1)));
        assert_eq!(g.settle_coordinates(), Ok(0));
        assert_eq!(g.get(c).unwrap().coord(), Some((1, 1)));
    }

    #[test]
    fn deferred_ring_fails_to_settle() {
        let mut g = StageGraph::new();
        let origin = g.add("Origin").unwrap();
        let b = g.add("B").unwrap();
        let c = g.add("C").unwrap();
        let d = g.add("D").unwrap();
        // three stages in a row that wrap around: no grid can hold them
        g.link(Direction::Right, b, c).unwrap();
        g.link(Direction::Right, c, d).unwrap();
        g.link(Direction::Right, d, b).unwrap();
        g.link(Direction::Bottom, origin, b).unwrap();

        let err = g.settle_coordinates().unwrap_err();
        assert!(matches!(
            err,
            GraphError::CoordinateMismatch { .. } | GraphError::CoordinateTaken { .. }
        ));
        // nothing was written
        assert_eq!(g.get(b).unwrap().coord(), Some((0, 1)));
        assert_eq!(g.get(c).unwrap().coord(), None);
        assert_eq!(g.get(d).unwrap().coord(), None);
    }

    #[test]
    fn deferred_collision_fails_to_settle() {
        let mut g = StageGraph::new();
        let origin = g.add("Origin").unwrap();
        let b = g.add("B").unwrap();
        let x = g.add("X").unwrap();
        let y = g.add("Y").unwrap();
        let z = g.add("Z").unwrap();
        // y above x, z left of y: both deferred
        g.link(Direction::Top, x, y).unwrap();
        g.link(Direction::Left, y, z).unwrap();
        g.link(Direction::Bottom, origin, b).unwrap(); // (0, 1)
        g.link(Direction::Right, b, x).unwrap(); // (1, 1), so z would be (0, 0)
        assert_eq!(
            g.settle_coordinates(),
            Err(GraphError::CoordinateTaken { coord: (0, 0), existing: "Origin".into() })
        );
        assert_eq!(g.get(y).unwrap().coord(), None);
        assert_eq!(g.get(z).unwrap().coord(), None);
    }

    #[test]
    fn every_link_is_coordinate_consistent() {
        let mut g = StageGraph::new();
        let centre = g.add("centre").unwrap();
        for (name, d) in [("n", Direction::Top), ("s", Direction::Bottom), ("e", Direction::Right), ("w", Direction::Left)] {
            let id = g.add(name).unwrap();
            g.link(d, centre, id).unwrap();
        }
        for (id, stage) in g.iter() {
            for d in Direction::ALL {
                if let Some(n) = stage.neighbor(d) {
                    assert_eq!(g.neighbor(n, d.opposite()), Some(id));
                    let (x, y) = stage.coord().unwrap();
                    let (dx, dy) = d.delta();
                    assert_eq!(g.get(n).unwrap().coord(), Some((x + dx, y + dy)));
                }
            }
        }
    }

    #[test]
    fn map_cells_flag_current() {
        let (mut g, a, b) = pair();
        g.link(Direction::Right, a, b).unwrap();
        let cells = g.map_cells(b);
        assert_eq!(cells.len(), 2);
        assert!(!cells[0].current);
        assert!(cells[1].current);
        assert_eq!((cells[1].x, cells[1].y), (1, 0));
    }
}
