/// World: the stage graph plus the one stage the player is in.
///
/// `current` is always a member of `graph`. It only changes through
/// `transition_to`, which the step function calls with a looked-up
/// neighbour; anything else is a programming error.

use thiserror::Error;

use crate::domain::stage::{Direction, GraphError, MapCell, Stage, StageGraph, StageId};

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("a world needs at least one stage")]
    Empty,
    #[error("building the stage graph failed: {0}")]
    Graph(#[from] GraphError),
}

pub struct World {
    graph: StageGraph,
    current: StageId,
}

impl World {
    /// The first stage of the graph becomes the current stage.
    pub fn new(graph: StageGraph) -> Result<Self, WorldError> {
        let (first, _) = graph.iter().next().ok_or(WorldError::Empty)?;
        Ok(World { graph, current: first })
    }

    /// Plus-shaped reference layout: a centre stage with one neighbour
    /// in each direction.
    pub fn reference() -> Result<Self, WorldError> {
        let mut graph = StageGraph::new();
        let start = graph.add("Start Level")?;
        for (name, direction) in [
            ("North", Direction::Top),
            ("South", Direction::Bottom),
            ("East", Direction::Right),
            ("West", Direction::Left),
        ] {
            let id = graph.add(name)?;
            graph.link(direction, start, id)?;
        }
        let unresolved = graph.settle_coordinates()?;
        if unresolved > 0 {
            log::warn!("{unresolved} stage(s) have no grid coordinate");
        }
        World::new(graph)
    }

    #[cfg(test)]
    pub fn graph(&self) -> &StageGraph {
        &self.graph
    }

    #[cfg(test)]
    pub fn current(&self) -> StageId {
        self.current
    }

    pub fn current_stage(&self) -> &Stage {
        &self.graph[self.current]
    }

    pub fn neighbor(&self, direction: Direction) -> Option<StageId> {
        self.graph.neighbor(self.current, direction)
    }

    pub fn transition_to(&mut self, stage: StageId) {
        debug_assert!(self.graph.contains(stage), "transition to a stage outside this world");
        if !self.graph.contains(stage) {
            log::error!("ignoring transition to unknown stage {:?}", stage);
            return;
        }
        self.current = stage;
        log::info!("entered stage [{}]", self.current_stage().name());
    }

    pub fn map_cells(&self) -> Vec<MapCell> {
        self.graph.map_cells(self.current)
    }
}
