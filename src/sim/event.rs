/// Events emitted during a tick.
/// The frame loop consumes these for sound and logging.

use crate::domain::mode::GameMode;
use crate::domain::stage::{Direction, StageId};
use crate::ui::menu::ButtonAction;

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    StageEntered { stage: StageId, via: Direction },
    EdgeBlocked { direction: Direction },
    FacingChanged,
    ModeChanged { from: GameMode, to: GameMode },
    MenuAction(ButtonAction),
}
