/// Pause menu: pages of buttons laid out in logical viewport pixels.
///
/// ## Layout (x centred, 200×80 buttons)
///
///   Seite1                     Seite2
///   y=200  [ + ]               y=200  [ Foobar2 ]
///   y=300  [=== volume ===]    y=400  [ Link → Seite1 ]
///   y=400  [ - ]
///   y=600  [ Link → Seite2 ]
///
/// ## Clicks
///
/// A press on a button focuses it. The release activates it only when the
/// pointer is still over the focused button; any release clears focus.
/// Page switches are applied here, every other action is handed back to
/// the caller (volume belongs to the sound system).

use crate::domain::rect::{Rect, Viewport};

pub const BUTTON_SIZE: (f32, f32) = (200.0, 80.0);
pub const BAR_SIZE: (f32, f32) = (200.0, 30.0);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ButtonAction {
    VolumeUp,
    VolumeDown,
    SwitchPage(usize),
    Nothing,
}

#[derive(Clone, Debug)]
pub struct Button {
    pub label: String,
    pub rect: Rect,
    pub action: ButtonAction,
}

#[derive(Clone, Debug)]
pub struct Page {
    pub name: String,
    pub buttons: Vec<Button>,
    /// Music volume bar, if the page shows one.
    pub volume_bar: Option<Rect>,
}

pub struct Menu {
    pages: Vec<Page>,
    current: usize,
    focused: Option<usize>,
}

impl Menu {
    pub fn new(pages: Vec<Page>) -> Self {
        Menu { pages, current: 0, focused: None }
    }

    /// The two-page pause menu.
    pub fn standard(viewport: Viewport) -> Self {
        let x = viewport.width / 2.0 - BUTTON_SIZE.0 / 2.0;
        let button = |label: &str, y: f32, action| Button {
            label: label.to_string(),
            rect: Rect::new(x, y, BUTTON_SIZE.0, BUTTON_SIZE.1),
            action,
        };

        let first = Page {
            name: "Seite1".into(),
            buttons: vec![
                button("+", 200.0, ButtonAction::VolumeUp),
                button("-", 400.0, ButtonAction::VolumeDown),
                button("Link", 600.0, ButtonAction::SwitchPage(1)),
            ],
            volume_bar: Some(Rect::new(x, 300.0, BAR_SIZE.0, BAR_SIZE.1)),
        };
        let second = Page {
            name: "Seite2".into(),
            buttons: vec![
                button("Foobar2", 200.0, ButtonAction::Nothing),
                button("Link", 400.0, ButtonAction::SwitchPage(0)),
            ],
            volume_bar: None,
        };
        Menu::new(vec![first, second])
    }

    pub fn page(&self) -> Option<&Page> {
        self.pages.get(self.current)
    }

    /// Index of the focused button on the current page.
    pub fn focused(&self) -> Option<usize> {
        self.focused
    }

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        self.focused = self.button_at(x, y);
    }

    /// Returns the activated action, if the click completed on a button.
    pub fn pointer_up(&mut self, x: f32, y: f32) -> Option<ButtonAction> {
        let focused = self.focused.take()?;
        if self.button_at(x, y) != Some(focused) {
            return None;
        }
        let action = self.page()?.buttons.get(focused)?.action;
        if let ButtonAction::SwitchPage(target) = action {
            if target < self.pages.len() {
                self.current = target;
            } else {
                log::warn!("menu link to missing page {target}");
            }
        }
        log::debug!("menu action {:?}", action);
        Some(action)
    }

    /// Forget a press that never got its release.
    pub fn reset_focus(&mut self) {
        self.focused = None;
    }

    fn button_at(&self, x: f32, y: f32) -> Option<usize> {
        self.page()?.buttons.iter().position(|b| b.rect.contains(x, y))
    }
}
