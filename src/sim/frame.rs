/// Frame loop driver.
///
/// ## One tick
///
///   1. Poll input once.
///   2. Per event: run the current mode's handlers, then the close check.
///      A close request ends the session immediately (nothing is drawn).
///   3. Playing only: sample held keys and step the actor.
///   4. Sounds for everything that happened this tick.
///   5. Clear, draw the regions of the active mode, present.
///
/// Pacing (sleep until the next tick boundary) is the caller's job, see
/// `Pacer`, so a tick can be driven synchronously in tests.
///
/// ## Regions per mode
///
/// ┌────────────┬──────────────────────────┐
/// │ Playing    │ StageName, Actor         │
/// │ Map        │ MapGrid                  │
/// │ Inventory  │ InventoryPanel           │
/// │ Menu       │ MenuPage                 │
/// └────────────┴──────────────────────────┘
/// plus Debug in every mode when the overlay is enabled.

use std::io;
use std::thread;
use std::time::{Duration, Instant};

use crate::domain::entity::{Actor, SpeedModel};
use crate::domain::mode::{is_close_event, Game, GameMode, Key, ModeSignal};
use crate::domain::rect::Viewport;
use crate::domain::stats::Item;
use crate::ui::menu::{ButtonAction, Menu};
use super::data::DataStore;
use super::event::GameEvent;
use super::ports::{Effect, InputSource, Region, Renderer, SoundSystem};
use super::step::{step, FrameInput};
use super::world::World;

/// Music volume change per menu click.
pub const VOLUME_STEP: f32 = 0.1;

/// The collaborators a tick talks to, built once at startup.
pub struct FrameContext<'a> {
    pub input: &'a mut dyn InputSource,
    pub renderer: &'a mut dyn Renderer,
    pub sound: &'a mut dyn SoundSystem,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TickOutcome {
    Continue,
    Quit,
}

#[derive(Clone, Copy, Debug)]
pub struct SessionSettings {
    pub speeds: SpeedModel,
    pub viewport: Viewport,
    pub debug_overlay: bool,
}

/// All mutable game state, touched only from `tick`.
pub struct Session {
    world: World,
    actor: Actor,
    game: Game,
    menu: Menu,
    items: Vec<Item>,
    settings: SessionSettings,
    fps: f32,
}

impl Session {
    pub fn new(world: World, mut actor: Actor, data: DataStore, initial: GameMode, settings: SessionSettings) -> Self {
        actor.character = Some(data.character);
        Session {
            world,
            actor,
            game: Game::new(initial),
            menu: Menu::standard(settings.viewport),
            items: data.items,
            settings,
            fps: 0.0,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn mode(&self) -> GameMode {
        self.game.mode()
    }

    #[cfg(test)]
    pub fn menu(&self) -> &Menu {
        &self.menu
    }

    /// Measured loop rate, shown by the debug overlay.
    pub fn set_fps(&mut self, fps: f32) {
        self.fps = fps;
    }

    pub fn tick(&mut self, ctx: &mut FrameContext) -> io::Result<TickOutcome> {
        let mut events = Vec::new();

        for event in ctx.input.poll_events() {
            log::trace!("input {:?}", event);
            for signal in self.game.dispatch(&event) {
                self.apply_signal(signal, ctx.sound, &mut events);
            }
            if is_close_event(&event) {
                log::info!("close requested in {:?}", self.game.mode());
                return Ok(TickOutcome::Quit);
            }
        }

        if self.game.mode() == GameMode::Playing {
            let input = frame_input(&ctx.input.held_keys());
            events.extend(step(&mut self.world, &mut self.actor, &self.settings.speeds, self.settings.viewport, &input));
        }

        process_sound_events(ctx.sound, &events);

        ctx.renderer.begin_frame();
        for region in self.regions(ctx.sound.music_volume()) {
            ctx.renderer.draw_region(&region);
        }
        ctx.renderer.present()?;

        Ok(TickOutcome::Continue)
    }

    /// What the renderer gets for the active mode.
    pub fn regions(&self, music_volume: f32) -> Vec<Region> {
        let mut regions = match self.game.mode() {
            GameMode::Playing => vec![
                Region::StageName(self.world.current_stage().name().to_string()),
                Region::Actor { rect: self.actor.rect, facing: self.actor.facing },
            ],
            GameMode::Map => vec![Region::MapGrid(self.world.map_cells())],
            GameMode::Inventory => {
                let current_item = self
                    .actor
                    .character
                    .as_ref()
                    .map(|c| c.current_item.name.clone())
                    .unwrap_or_else(|| Item::bare_hands().name);
                vec![Region::InventoryPanel {
                    items: self.items.iter().map(|i| i.name.clone()).collect(),
                    current_item,
                }]
            }
            GameMode::Menu => match self.menu.page() {
                Some(page) => vec![Region::MenuPage {
                    page: page.clone(),
                    focused: self.menu.focused(),
                    volume: music_volume,
                }],
                None => Vec::new(),
            },
        };
        if self.settings.debug_overlay {
            regions.push(Region::Debug(self.debug_lines()));
        }
        regions
    }

    // ── Internal ──

    fn apply_signal(&mut self, signal: ModeSignal, sound: &mut dyn SoundSystem, events: &mut Vec<GameEvent>) {
        match signal {
            ModeSignal::Changed { from, to } => {
                if from == GameMode::Menu {
                    self.menu.reset_focus();
                }
                events.push(GameEvent::ModeChanged { from, to });
            }
            ModeSignal::PointerDown { x, y } => self.menu.pointer_down(x, y),
            ModeSignal::PointerUp { x, y } => {
                if let Some(action) = self.menu.pointer_up(x, y) {
                    match action {
                        ButtonAction::VolumeUp => sound.set_music_volume(VOLUME_STEP),
                        ButtonAction::VolumeDown => sound.set_music_volume(-VOLUME_STEP),
                        ButtonAction::SwitchPage(_) | ButtonAction::Nothing => {}
                    }
                    events.push(GameEvent::MenuAction(action));
                }
            }
        }
    }

    fn debug_lines(&self) -> Vec<String> {
        let r = self.actor.rect;
        let mut lines = vec![
            format!("FPS: {:.1}", self.fps),
            format!("Viewport: {}x{}", self.settings.viewport.width, self.settings.viewport.height),
            format!("Mode: {:?}", self.game.mode()),
            format!("Stage: {}", self.world.current_stage().name()),
            format!("Actor #{} at ({:.0}, {:.0}) {:?} {:?}", self.actor.id, r.x, r.y, self.actor.movement, self.actor.facing),
        ];
        if let Some(c) = &self.actor.character {
            lines.push(c.summary());
        }
        lines
    }
}

/// Held logical keys → movement intent.
pub fn frame_input(keys: &[Key]) -> FrameInput {
    FrameInput {
        held: keys.iter().filter_map(|k| k.direction()).collect(),
        sprint: keys.contains(&Key::Sprint),
    }
}

fn process_sound_events(sound: &mut dyn SoundSystem, events: &[GameEvent]) {
    for event in events {
        match event {
            GameEvent::StageEntered { .. } => sound.play(Effect::StageEnter),
            GameEvent::ModeChanged { to: GameMode::Playing, .. } => sound.play(Effect::OverlayClose),
            GameEvent::ModeChanged { .. } => sound.play(Effect::OverlayOpen),
            GameEvent::MenuAction(_) => sound.play(Effect::MenuClick),
            GameEvent::EdgeBlocked { .. } | GameEvent::FacingChanged => {}
        }
    }
}

// ── Pacing ──

/// Fixed-rate tick pacer with a once-per-second FPS measurement.
pub struct Pacer {
    period: Duration,
    next: Instant,
    window_start: Instant,
    frames: u32,
    fps: f32,
}

impl Pacer {
    pub fn new(tick_rate: u32) -> Self {
        let period = Duration::from_secs(1) / tick_rate.max(1);
        let now = Instant::now();
        Pacer { period, next: now + period, window_start: now, frames: 0, fps: 0.0 }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Block until the next tick boundary.
    pub fn wait(&mut self) {
        let now = Instant::now();
        if self.next > now {
            thread::sleep(self.next - now);
            self.next += self.period;
        } else {
            // Fell behind: restart the schedule instead of bursting to catch up.
            self.next = now + self.period;
        }

        self.frames += 1;
        let elapsed = self.window_start.elapsed();
        if elapsed >= Duration::from_secs(1) {
            self.fps = self.frames as f32 / elapsed.as_secs_f32();
            self.frames = 0;
            self.window_start = Instant::now();
        }
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }
}
