/// Terminal input source: keyboard, mouse and (optionally) gamepad.
///
/// Tracks which logical keys are currently held down, enabling:
///   - Continuous walking while a key is held
///   - Edge-triggered mode keys (P / M / I fire once per press)
///   - Walking and sprinting in the same tick
///
/// Uses crossterm's keyboard enhancement for Release events when available.
/// Falls back to timeout-based release detection on terminals that don't
/// support it.
///
/// Key map:
///   W A S D / arrows   walk (uppercase W A S D = walk + sprint)
///   Shift (held)       sprint, where the terminal reports it
///   P  pause menu      M  map      I  inventory
///   Esc                quit        Ctrl+C  close

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use crossterm::event::{
    self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};

use crate::domain::mode::{InputEvent, Key};
use crate::sim::ports::InputSource;
use super::gamepad::GamepadState;
use super::renderer::Scale;

/// After this duration without a Press/Repeat event, consider the key released.
/// Only used when the terminal doesn't report Release events.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

pub struct TerminalInput {
    /// Timestamp of last Press/Repeat event for each logical key.
    last_active: HashMap<Key, Instant>,

    /// Held keys whose press also pressed Sprint. Sprint is released
    /// together with the last of them, since a Shift release that comes
    /// before the letter release is not reported.
    sprint_by: HashSet<Key>,

    /// Whether to honor Release events. Only true when keyboard
    /// enhancement is confirmed working.
    pub honor_release: bool,

    /// Mouse cell → logical pixel mapping, follows terminal resizes.
    scale: Scale,

    gamepad: GamepadState,
}

impl TerminalInput {
    pub fn new(scale: Scale, gamepad: GamepadState) -> Self {
        TerminalInput {
            last_active: HashMap::with_capacity(16),
            sprint_by: HashSet::new(),
            honor_release: false,
            scale,
            gamepad,
        }
    }

    /// Feed one terminal event; discrete results are appended to `out`.
    fn handle(&mut self, ev: Event, now: Instant, out: &mut Vec<InputEvent>) {
        match ev {
            Event::Key(key) => self.handle_key(key, now, out),
            Event::Mouse(mouse) => {
                if let Some(e) = self.map_mouse(mouse) {
                    out.push(e);
                }
            }
            Event::Resize(w, h) => {
                self.scale = Scale::fit(w, h, self.scale.viewport);
            }
            _ => {}
        }
    }

    fn handle_key(&mut self, key: KeyEvent, now: Instant, out: &mut Vec<InputEvent>) {
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
        {
            out.push(InputEvent::Close);
            return;
        }

        let keys = map_key(&key);
        // Sprint riding on a walking key is tracked through that key
        let sprinting = keys.contains(&Key::Sprint);
        let rides = |k: Key| k == Key::Sprint && keys.len() > 1;
        for &k in &keys {
            match key.kind {
                KeyEventKind::Release if self.honor_release && rides(k) => {}
                KeyEventKind::Release if self.honor_release => {
                    // Explicit release: remove from active set
                    self.sprint_by.remove(&k);
                    if self.last_active.remove(&k).is_some() {
                        out.push(InputEvent::KeyUp(k));
                    }
                }
                KeyEventKind::Release => {
                    // Ignore release when enhancement not confirmed;
                    // rely on timeout-based expiry instead
                }
                _ => {
                    if sprinting && !rides(k) {
                        self.sprint_by.insert(k);
                    }
                    let was_held = self.is_held_at(k, now);
                    self.last_active.insert(k, now);
                    if !was_held {
                        out.push(InputEvent::KeyDown(k));
                    }
                }
            }
        }

        if key.kind == KeyEventKind::Release
            && self.honor_release
            && self.sprint_by.is_empty()
            && self.last_active.remove(&Key::Sprint).is_some()
        {
            out.push(InputEvent::KeyUp(Key::Sprint));
        }
    }

    fn map_mouse(&self, mouse: MouseEvent) -> Option<InputEvent> {
        let (x, y) = self.scale.to_logical(mouse.column, mouse.row)?;
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => Some(InputEvent::MouseDown { x, y }),
            MouseEventKind::Up(MouseButton::Left) => Some(InputEvent::MouseUp { x, y }),
            _ => None,
        }
    }

    /// Expire keys that have timed out (fallback for terminals without Release).
    fn expire(&mut self, now: Instant, out: &mut Vec<InputEvent>) {
        if self.honor_release {
            return;
        }
        let expired: Vec<Key> = self
            .last_active
            .iter()
            .filter(|(_, t)| now.duration_since(**t) >= HOLD_TIMEOUT)
            .map(|(k, _)| *k)
            .collect();
        for k in expired {
            self.last_active.remove(&k);
            self.sprint_by.remove(&k);
            out.push(InputEvent::KeyUp(k));
        }
    }

    fn is_held_at(&self, key: Key, now: Instant) -> bool {
        self.last_active
            .get(&key)
            .map(|t| self.honor_release || now.duration_since(*t) < HOLD_TIMEOUT)
            .unwrap_or(false)
    }
}

impl InputSource for TerminalInput {
    /// Drain all pending terminal events without blocking, then the pad.
    fn poll_events(&mut self) -> Vec<InputEvent> {
        let mut out = Vec::with_capacity(8);

        while poll(Duration::ZERO).unwrap_or(false) {
            match event::read() {
                Ok(ev) => {
                    log::trace!("terminal event {:?}", ev);
                    self.handle(ev, Instant::now(), &mut out);
                }
                Err(e) => {
                    log::warn!("terminal read failed: {e}");
                    break;
                }
            }
        }

        let now = Instant::now();
        self.expire(now, &mut out);
        out.extend(self.gamepad.update());
        out
    }

    fn held_keys(&self) -> Vec<Key> {
        let now = Instant::now();
        let mut keys: Vec<Key> = self
            .last_active
            .keys()
            .copied()
            .filter(|k| self.is_held_at(*k, now))
            .collect();
        for k in self.gamepad.held_keys() {
            if !keys.contains(&k) {
                keys.push(k);
            }
        }
        keys
    }
}

/// Physical key → logical keys. Uppercase walking letters (Shift held)
/// also press Sprint.
fn map_key(key: &KeyEvent) -> Vec<Key> {
    let shift = key.modifiers.contains(KeyModifiers::SHIFT);
    let walk = |k: Key, upper: bool| if upper || shift { vec![k, Key::Sprint] } else { vec![k] };
    match key.code {
        KeyCode::Up => walk(Key::Up, false),
        KeyCode::Down => walk(Key::Down, false),
        KeyCode::Left => walk(Key::Left, false),
        KeyCode::Right => walk(Key::Right, false),
        KeyCode::Char(c @ ('w' | 'W')) => walk(Key::Up, c.is_uppercase()),
        KeyCode::Char(c @ ('s' | 'S')) => walk(Key::Down, c.is_uppercase()),
        KeyCode::Char(c @ ('a' | 'A')) => walk(Key::Left, c.is_uppercase()),
        KeyCode::Char(c @ ('d' | 'D')) => walk(Key::Right, c.is_uppercase()),
        KeyCode::Char('p' | 'P') => vec![Key::Pause],
        KeyCode::Char('m' | 'M') => vec![Key::Map],
        KeyCode::Char('i' | 'I') => vec![Key::Inventory],
        KeyCode::Esc => vec![Key::Quit],
        KeyCode::Modifier(m) if is_shift(m) => vec![Key::Sprint],
        _ => Vec::new(),
    }
}

fn is_shift(m: event::ModifierKeyCode) -> bool {
    matches!(m, event::ModifierKeyCode::LeftShift | event::ModifierKeyCode::RightShift)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    use crate::domain::rect::Viewport;

    fn input() -> TerminalInput {
        TerminalInput::new(Scale::fit(130, 91, Viewport::new(1300.0, 900.0)), GamepadState::new())
    }

    fn key(code: KeyCode, kind: KeyEventKind) -> Event {
        Event::Key(KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind,
            state: KeyEventState::NONE,
        })
    }

    fn feed(inp: &mut TerminalInput, ev: Event, now: Instant) -> Vec<InputEvent> {
        let mut out = Vec::new();
        inp.handle(ev, now, &mut out);
        out
    }

    #[test]
    fn key_map() {
        let k = |c| map_key(&KeyEvent::new(c, KeyModifiers::NONE));
        assert_eq!(k(KeyCode::Char('w')), vec![Key::Up]);
        assert_eq!(k(KeyCode::Char('D')), vec![Key::Right, Key::Sprint]);
        assert_eq!(k(KeyCode::Left), vec![Key::Left]);
        assert_eq!(k(KeyCode::Char('p')), vec![Key::Pause]);
        assert_eq!(k(KeyCode::Char('M')), vec![Key::Map]);
        assert_eq!(k(KeyCode::Char('i')), vec![Key::Inventory]);
        assert_eq!(k(KeyCode::Esc), vec![Key::Quit]);
        assert!(k(KeyCode::Char('z')).is_empty());
        let shifted = map_key(&KeyEvent::new(KeyCode::Up, KeyModifiers::SHIFT));
        assert_eq!(shifted, vec![Key::Up, Key::Sprint]);
    }

    #[test]
    fn repeats_fire_key_down_once() {
        let mut inp = input();
        let t0 = Instant::now();
        let out = feed(&mut inp, key(KeyCode::Char('m'), KeyEventKind::Press), t0);
        assert_eq!(out, vec![InputEvent::KeyDown(Key::Map)]);
        let out = feed(&mut inp, key(KeyCode::Char('m'), KeyEventKind::Repeat), t0 + Duration::from_millis(30));
        assert!(out.is_empty());
    }

    #[test]
    fn held_keys_expire_without_release_support() {
        let mut inp = input();
        let t0 = Instant::now();
        feed(&mut inp, key(KeyCode::Char('d'), KeyEventKind::Press), t0);
        assert!(inp.is_held_at(Key::Right, t0 + Duration::from_millis(100)));

        let mut out = Vec::new();
        inp.expire(t0 + HOLD_TIMEOUT, &mut out);
        assert_eq!(out, vec![InputEvent::KeyUp(Key::Right)]);
        assert!(!inp.is_held_at(Key::Right, t0 + HOLD_TIMEOUT));
    }

    #[test]
    fn release_honoured_when_enhanced() {
        let mut inp = input();
        inp.honor_release = true;
        let t0 = Instant::now();
        feed(&mut inp, key(KeyCode::Char('a'), KeyEventKind::Press), t0);
        // no expiry while the terminal reports releases
        let mut out = Vec::new();
        inp.expire(t0 + Duration::from_secs(5), &mut out);
        assert!(out.is_empty());
        assert!(inp.is_held_at(Key::Left, t0 + Duration::from_secs(5)));

        let out = feed(&mut inp, key(KeyCode::Char('a'), KeyEventKind::Release), t0);
        assert_eq!(out, vec![InputEvent::KeyUp(Key::Left)]);
    }

    #[test]
    fn shift_released_before_letter_stops_sprint() {
        let mut inp = input();
        inp.honor_release = true;
        let t0 = Instant::now();
        let press = Event::Key(KeyEvent::new_with_kind(
            KeyCode::Char('D'),
            KeyModifiers::SHIFT,
            KeyEventKind::Press,
        ));
        let out = feed(&mut inp, press, t0);
        assert_eq!(out, vec![InputEvent::KeyDown(Key::Right), InputEvent::KeyDown(Key::Sprint)]);

        // Shift went up first, so the letter comes back lowercase
        let out = feed(&mut inp, key(KeyCode::Char('d'), KeyEventKind::Release), t0);
        assert_eq!(out, vec![InputEvent::KeyUp(Key::Right), InputEvent::KeyUp(Key::Sprint)]);
        assert!(!inp.is_held_at(Key::Sprint, t0));
        assert!(!inp.is_held_at(Key::Right, t0));
    }

    #[test]
    fn sprint_stays_while_another_shifted_key_is_held() {
        let mut inp = input();
        inp.honor_release = true;
        let t0 = Instant::now();
        feed(&mut inp, key(KeyCode::Char('D'), KeyEventKind::Press), t0);
        feed(&mut inp, key(KeyCode::Char('W'), KeyEventKind::Press), t0);
        let out = feed(&mut inp, key(KeyCode::Char('d'), KeyEventKind::Release), t0);
        assert_eq!(out, vec![InputEvent::KeyUp(Key::Right)]);
        assert!(inp.is_held_at(Key::Sprint, t0));

        let out = feed(&mut inp, key(KeyCode::Char('w'), KeyEventKind::Release), t0);
        assert_eq!(out, vec![InputEvent::KeyUp(Key::Up), InputEvent::KeyUp(Key::Sprint)]);
    }

    #[test]
    fn release_ignored_without_enhancement() {
        let mut inp = input();
        let t0 = Instant::now();
        feed(&mut inp, key(KeyCode::Char('a'), KeyEventKind::Press), t0);
        let out = feed(&mut inp, key(KeyCode::Char('a'), KeyEventKind::Release), t0);
        assert!(out.is_empty());
        assert!(inp.is_held_at(Key::Left, t0));
    }

    #[test]
    fn ctrl_c_is_close() {
        let mut inp = input();
        let ev = Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(feed(&mut inp, ev, Instant::now()), vec![InputEvent::Close]);
    }

    #[test]
    fn mouse_maps_to_logical_pixels() {
        let mut inp = input();
        let ev = Event::Mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 60,
            row: 25,
            modifiers: KeyModifiers::NONE,
        });
        // 10 logical pixels per cell, row 25 is play-area row 24
        assert_eq!(feed(&mut inp, ev, Instant::now()), vec![InputEvent::MouseDown { x: 605.0, y: 245.0 }]);

        let hud = Event::Mouse(MouseEvent {
            kind: MouseEventKind::Up(MouseButton::Left),
            column: 60,
            row: 0,
            modifiers: KeyModifiers::NONE,
        });
        assert!(feed(&mut inp, hud, Instant::now()).is_empty());
    }

    #[test]
    fn resize_updates_mouse_mapping() {
        let mut inp = input();
        feed(&mut inp, Event::Resize(65, 46), Instant::now());
        let ev = Event::Mouse(MouseEvent {
            kind: MouseEventKind::Up(MouseButton::Left),
            column: 0,
            row: 1,
            modifiers: KeyModifiers::NONE,
        });
        assert_eq!(feed(&mut inp, ev, Instant::now()), vec![InputEvent::MouseUp { x: 10.0, y: 10.0 }]);
    }
}
