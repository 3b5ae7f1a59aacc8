/// Game mode state machine.
///
/// ## Modes
///
/// Playing is the base mode. Menu, Map and Inventory are overlays, and
/// every overlay is a toggle relative to Playing, never a stack:
///
/// ┌──────────────┬────────────────────┬──────────────┐
/// │ Current      │ Requested          │ Result       │
/// ├──────────────┼────────────────────┼──────────────┤
/// │ X            │ X                  │ Playing      │
/// │ X            │ Y (Y != X)         │ Y            │
/// │ Playing      │ Playing            │ Playing      │
/// └──────────────┴────────────────────┴──────────────┘
///
/// ## Handler table
///
/// Each mode owns an ordered handler list, fixed at construction. Every
/// non-close event is offered to each handler of the mode that was active
/// when the event arrived, in order.
///
/// ┌────────────┬────────────────────────────────┐
/// │ Mode       │ Handlers                       │
/// ├────────────┼────────────────────────────────┤
/// │ Playing    │ Pause, Map, Inventory          │
/// │ Map        │ Pause, Map, Inventory          │
/// │ Inventory  │ Pause, Map, Inventory          │
/// │ Menu       │ MenuPointer, Pause             │
/// └────────────┴────────────────────────────────┘
///
/// Close requests are not part of the table: `is_close_event` is checked
/// separately for every event, whatever the mode.

use std::collections::HashMap;

use serde::Deserialize;

use super::stage::Direction;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    Menu,
    Playing,
    Map,
    Inventory,
}

/// Logical keys, already mapped from the physical device.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    Sprint,
    Pause,
    Map,
    Inventory,
    Quit,
}

impl Key {
    /// Movement direction for the four walking keys.
    pub fn direction(self) -> Option<Direction> {
        match self {
            Key::Up => Some(Direction::Top),
            Key::Down => Some(Direction::Bottom),
            Key::Left => Some(Direction::Left),
            Key::Right => Some(Direction::Right),
            _ => None,
        }
    }
}

/// Discrete input events. Pointer positions are logical viewport pixels.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum InputEvent {
    KeyDown(Key),
    KeyUp(Key),
    MouseDown { x: f32, y: f32 },
    MouseUp { x: f32, y: f32 },
    Close,
}

/// What a dispatch produced, for the frame loop to act on.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum ModeSignal {
    Changed { from: GameMode, to: GameMode },
    PointerDown { x: f32, y: f32 },
    PointerUp { x: f32, y: f32 },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Handler {
    Pause,
    Map,
    Inventory,
    MenuPointer,
}

impl Handler {
    fn apply(self, event: &InputEvent, game: &mut Game, out: &mut Vec<ModeSignal>) {
        let requested = match (self, *event) {
            (Handler::Pause, InputEvent::KeyDown(Key::Pause)) => GameMode::Menu,
            (Handler::Map, InputEvent::KeyDown(Key::Map)) => GameMode::Map,
            (Handler::Inventory, InputEvent::KeyDown(Key::Inventory)) => GameMode::Inventory,
            (Handler::MenuPointer, InputEvent::MouseDown { x, y }) => {
                out.push(ModeSignal::PointerDown { x, y });
                return;
            }
            (Handler::MenuPointer, InputEvent::MouseUp { x, y }) => {
                out.push(ModeSignal::PointerUp { x, y });
                return;
            }
            _ => return,
        };
        if let Some((from, to)) = game.toggle(requested) {
            out.push(ModeSignal::Changed { from, to });
        }
    }
}

pub struct Game {
    mode: GameMode,
    handlers: HashMap<GameMode, Vec<Handler>>,
}

impl Game {
    pub fn new(initial: GameMode) -> Self {
        let overlay = vec![Handler::Pause, Handler::Map, Handler::Inventory];
        let mut handlers = HashMap::with_capacity(4);
        handlers.insert(GameMode::Playing, overlay.clone());
        handlers.insert(GameMode::Map, overlay.clone());
        handlers.insert(GameMode::Inventory, overlay);
        handlers.insert(GameMode::Menu, vec![Handler::MenuPointer, Handler::Pause]);
        Game { mode: initial, handlers }
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn handlers(&self, mode: GameMode) -> &[Handler] {
        self.handlers.get(&mode).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Route one event through the current mode's handlers.
    /// The handler list is captured before the first handler runs, so a
    /// mode change mid-dispatch does not re-route the same event.
    pub fn dispatch(&mut self, event: &InputEvent) -> Vec<ModeSignal> {
        let mut out = Vec::new();
        let handlers = self.handlers(self.mode).to_vec();
        for handler in handlers {
            handler.apply(event, self, &mut out);
        }
        out
    }

    /// Toggle rule. Returns `(from, to)` when the mode changed.
    pub fn toggle(&mut self, requested: GameMode) -> Option<(GameMode, GameMode)> {
        let from = self.mode;
        let to = if from == requested { GameMode::Playing } else { requested };
        if to == from {
            return None;
        }
        self.mode = to;
        log::debug!("mode {:?} -> {:?}", from, to);
        Some((from, to))
    }
}

impl Default for Game {
    fn default() -> Self {
        Game::new(GameMode::Playing)
    }
}

/// Window close or the quit key. Honoured in every mode.
pub fn is_close_event(event: &InputEvent) -> bool {
    matches!(event, InputEvent::Close | InputEvent::KeyDown(Key::Quit))
}
