/// Collaborator contracts for the frame loop.
///
/// The terminal front end (`ui`) implements these; the tests use fakes.
/// Regions are read-only view data: the renderer never reaches back into
/// game state.

use std::io;

use crate::domain::entity::Facing;
use crate::domain::mode::{InputEvent, Key};
use crate::domain::rect::Rect;
use crate::domain::stage::MapCell;
use crate::ui::menu::Page;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Effect {
    MenuClick,
    StageEnter,
    OverlayOpen,
    OverlayClose,
}

#[derive(Clone, Debug)]
pub enum Region {
    StageName(String),
    Actor { rect: Rect, facing: Facing },
    MapGrid(Vec<MapCell>),
    InventoryPanel { items: Vec<String>, current_item: String },
    /// `volume` is the music volume in [0, 1], shown by the page's bar.
    MenuPage { page: Page, focused: Option<usize>, volume: f32 },
    Debug(Vec<String>),
}

pub trait InputSource {
    /// Everything that happened since the last poll, in arrival order.
    fn poll_events(&mut self) -> Vec<InputEvent>;
    /// Keys currently held down.
    fn held_keys(&self) -> Vec<Key>;
}

pub trait Renderer {
    fn begin_frame(&mut self);
    fn draw_region(&mut self, region: &Region);
    fn present(&mut self) -> io::Result<()>;
}

pub trait SoundSystem {
    fn play(&mut self, effect: Effect);
    /// Adjust the music volume by `delta`, clamped to [0, 1].
    fn set_music_volume(&mut self, delta: f32);
    fn music_volume(&self) -> f32;
}
