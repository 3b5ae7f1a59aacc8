/// Gamepad input tracker using gilrs.
///
/// Button mapping is loaded from config.toml via `load_button_config()`.
/// Default mapping:
///   D-pad / Left Stick    →  Walk
///   B / R1 (held)         →  Sprint
///   Start                 →  Pause menu
///   Y                     →  Map
///   X                     →  Inventory
///   Select                →  Quit
///
/// Menu buttons are mouse-only; the pad has no pointer.

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};

use crate::config::GamepadConfig;
use crate::domain::mode::{InputEvent, Key};

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
const STICK_DEADZONE: f32 = 0.25;

/// Logical button identifiers (one per physical button).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,       // South
    B,       // East
    X,       // West
    Y,       // North
    L1,
    R1,
    L2,
    R2,
    Start,
    Select,
    DPadUp,
    DPadDown,
    DPadLeft,
    DPadRight,
}

const BTN_COUNT: usize = 14;

impl Btn {
    fn from_name(s: &str) -> Option<Btn> {
        match s.to_uppercase().as_str() {
            "A" | "SOUTH"  => Some(Btn::A),
            "B" | "EAST"   => Some(Btn::B),
            "X" | "WEST"   => Some(Btn::X),
            "Y" | "NORTH"  => Some(Btn::Y),
            "L1" | "LB" | "LEFTTRIGGER"  => Some(Btn::L1),
            "R1" | "RB" | "RIGHTTRIGGER" => Some(Btn::R1),
            "L2" | "LT" | "LEFTTRIGGER2"  => Some(Btn::L2),
            "R2" | "RT" | "RIGHTTRIGGER2" => Some(Btn::R2),
            "START" => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            _ => None,
        }
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        match btn {
            Button::South => Some(Btn::A),
            Button::East => Some(Btn::B),
            Button::West => Some(Btn::X),
            Button::North => Some(Btn::Y),
            Button::LeftTrigger => Some(Btn::L1),
            Button::RightTrigger => Some(Btn::R1),
            Button::LeftTrigger2 => Some(Btn::L2),
            Button::RightTrigger2 => Some(Btn::R2),
            Button::Start => Some(Btn::Start),
            Button::Select => Some(Btn::Select),
            Button::DPadUp => Some(Btn::DPadUp),
            Button::DPadDown => Some(Btn::DPadDown),
            Button::DPadLeft => Some(Btn::DPadLeft),
            Button::DPadRight => Some(Btn::DPadRight),
            _ => None,
        }
    }
}

/// Per-button state: held (continuous) and just_pressed (edge).
#[derive(Clone, Copy, Debug, Default)]
struct BtnState {
    held: bool,
    just_pressed: bool,
}

/// Key-to-button bindings (loaded from config). Sprint is a held key,
/// the rest fire once per press.
struct ActionMap {
    bindings: Vec<(Key, Vec<Btn>)>,
}

impl Default for ActionMap {
    fn default() -> Self {
        ActionMap {
            bindings: vec![
                (Key::Pause, vec![Btn::Start]),
                (Key::Map, vec![Btn::Y]),
                (Key::Inventory, vec![Btn::X]),
                (Key::Sprint, vec![Btn::B, Btn::R1]),
                (Key::Quit, vec![Btn::Select]),
            ],
        }
    }
}

impl ActionMap {
    fn rebind(&mut self, key: Key, names: &[String]) {
        let btns: Vec<Btn> = names.iter().filter_map(|s| Btn::from_name(s)).collect();
        if btns.is_empty() {
            if !names.is_empty() {
                log::warn!("no known gamepad buttons in {:?} for {:?}, keeping defaults", names, key);
            }
            return;
        }
        match self.bindings.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = btns,
            None => self.bindings.push((key, btns)),
        }
    }
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    buttons: [BtnState; BTN_COUNT],

    // Left stick, digitised against the deadzone
    stick_x: f32,
    stick_y: f32,

    action_map: ActionMap,

    pub connected: bool,
}

impl GamepadState {
    pub fn new() -> Self {
        #[cfg(feature = "gamepad")]
        let (gilrs_opt, connected) = match Gilrs::new() {
            Ok(g) => {
                let has_pad = g.gamepads().next().is_some();
                (Some(g), has_pad)
            }
            Err(e) => {
                log::warn!("gamepad support unavailable: {e}");
                (None, false)
            }
        };
        #[cfg(not(feature = "gamepad"))]
        let connected = false;

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: gilrs_opt,
            buttons: [BtnState::default(); BTN_COUNT],
            stick_x: 0.0,
            stick_y: 0.0,
            action_map: ActionMap::default(),
            connected,
        }
    }

    pub fn load_button_config(&mut self, cfg: &GamepadConfig) {
        let map = &mut self.action_map;
        map.rebind(Key::Pause, &cfg.pause);
        map.rebind(Key::Map, &cfg.map);
        map.rebind(Key::Inventory, &cfg.inventory);
        map.rebind(Key::Sprint, &cfg.sprint);
        map.rebind(Key::Quit, &cfg.quit);
    }

    /// Poll the pad and return the one-shot key presses of this frame.
    pub fn update(&mut self) -> Vec<InputEvent> {
        self.clear_just_pressed();

        #[cfg(feature = "gamepad")]
        self.poll_gilrs();

        self.pressed_events()
    }

    /// Keys held on the pad: walking directions and sprint.
    pub fn held_keys(&self) -> Vec<Key> {
        let mut keys = Vec::with_capacity(5);
        if self.is_held(Btn::DPadUp) || self.stick_y > STICK_DEADZONE {
            keys.push(Key::Up);
        }
        if self.is_held(Btn::DPadDown) || self.stick_y < -STICK_DEADZONE {
            keys.push(Key::Down);
        }
        if self.is_held(Btn::DPadLeft) || self.stick_x < -STICK_DEADZONE {
            keys.push(Key::Left);
        }
        if self.is_held(Btn::DPadRight) || self.stick_x > STICK_DEADZONE {
            keys.push(Key::Right);
        }
        if self.bound(Key::Sprint).iter().any(|&b| self.is_held(b)) {
            keys.push(Key::Sprint);
        }
        keys
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) {
        let gilrs = match &mut self.gilrs {
            Some(g) => g,
            None => return,
        };

        let events: Vec<_> = std::iter::from_fn(|| gilrs.next_event()).collect();

        for event in events {
            match event.event {
                EventType::ButtonPressed(btn, _) => {
                    self.connected = true;
                    if let Some(b) = Btn::from_gilrs(btn) {
                        self.set_button(b, true);
                    }
                }
                EventType::ButtonReleased(btn, _) => {
                    if let Some(b) = Btn::from_gilrs(btn) {
                        self.set_button(b, false);
                    }
                }
                EventType::AxisChanged(axis, value, _) => {
                    self.connected = true;
                    match axis {
                        Axis::LeftStickX => self.stick_x = value,
                        Axis::LeftStickY => self.stick_y = value,
                        _ => {}
                    }
                }
                EventType::Connected => {
                    log::info!("gamepad connected");
                    self.connected = true;
                }
                EventType::Disconnected => {
                    log::info!("gamepad disconnected");
                    self.connected = false;
                    self.release_all();
                }
                _ => {}
            }
        }
    }

    // ── Internal ──

    fn set_button(&mut self, btn: Btn, held: bool) {
        let state = &mut self.buttons[btn as usize];
        if held && !state.held {
            state.just_pressed = true;
        }
        state.held = held;
    }

    fn is_held(&self, btn: Btn) -> bool {
        self.buttons[btn as usize].held
    }

    fn bound(&self, key: Key) -> &[Btn] {
        self.action_map
            .bindings
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, b)| b.as_slice())
            .unwrap_or(&[])
    }

    fn pressed_events(&self) -> Vec<InputEvent> {
        self.action_map
            .bindings
            .iter()
            .filter(|(key, _)| *key != Key::Sprint)
            .filter(|(_, btns)| btns.iter().any(|&b| self.buttons[b as usize].just_pressed))
            .map(|(key, _)| InputEvent::KeyDown(*key))
            .collect()
    }

    fn clear_just_pressed(&mut self) {
        for b in &mut self.buttons {
            b.just_pressed = false;
        }
    }

    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn release_all(&mut self) {
        self.buttons = [BtnState::default(); BTN_COUNT];
        self.stick_x = 0.0;
        self.stick_y = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pad() -> GamepadState {
        let mut gp = GamepadState::new();
        gp.release_all();
        gp
    }

    #[test]
    fn button_names() {
        assert_eq!(Btn::from_name("start"), Some(Btn::Start));
        assert_eq!(Btn::from_name("RB"), Some(Btn::R1));
        assert_eq!(Btn::from_name("north"), Some(Btn::Y));
        assert_eq!(Btn::from_name("Turbo"), None);
    }

    #[test]
    fn press_fires_once() {
        let mut gp = pad();
        gp.set_button(Btn::Start, true);
        assert_eq!(gp.pressed_events(), vec![InputEvent::KeyDown(Key::Pause)]);
        gp.clear_just_pressed();
        gp.set_button(Btn::Start, true);
        assert!(gp.pressed_events().is_empty());
    }

    #[test]
    fn sprint_is_held_not_pressed() {
        let mut gp = pad();
        gp.set_button(Btn::R1, true);
        assert!(gp.pressed_events().is_empty());
        assert_eq!(gp.held_keys(), vec![Key::Sprint]);
        gp.set_button(Btn::R1, false);
        assert!(gp.held_keys().is_empty());
    }

    #[test]
    fn dpad_and_stick_walk() {
        let mut gp = pad();
        gp.set_button(Btn::DPadLeft, true);
        gp.stick_y = 0.8;
        assert_eq!(gp.held_keys(), vec![Key::Up, Key::Left]);
        gp.stick_y = 0.1;
        assert_eq!(gp.held_keys(), vec![Key::Left]);
    }

    #[test]
    fn config_rebinds_actions() {
        let mut gp = pad();
        let cfg = GamepadConfig {
            pause: vec!["A".into()],
            map: vec!["bogus".into()],
            inventory: vec![],
            sprint: vec!["L2".into()],
            quit: vec!["Select".into()],
        };
        gp.load_button_config(&cfg);
        assert_eq!(gp.bound(Key::Pause), &[Btn::A]);
        // unknown names keep the default binding
        assert_eq!(gp.bound(Key::Map), &[Btn::Y]);
        assert_eq!(gp.bound(Key::Inventory), &[Btn::X]);
        assert_eq!(gp.bound(Key::Sprint), &[Btn::L2]);
    }
}
