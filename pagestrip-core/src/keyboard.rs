use tracing::debug;

use crate::target::Role;

/// Opaque handle to a host control the reader can activate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControlId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowLeft,
    ArrowRight,
    Space,
    PageDown,
    Char(char),
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub key: Key,
    /// Role of the focused element, if any.
    pub focus: Option<Role>,
}

impl KeyPress {
    pub fn new(key: Key) -> Self {
        Self { key, focus: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavDirection {
    Prev,
    Next,
}

impl NavDirection {
    fn vocabulary(self) -> &'static [&'static str] {
        match self {
            NavDirection::Prev => &["prev", "⟵", "←"],
            NavDirection::Next => &["next", "⟶", "→"],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavLink {
    pub id: ControlId,
    pub text: String,
}

/// Navigation controls the host exposes, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavCatalog {
    pub prev_fab: Option<ControlId>,
    pub next_fab: Option<ControlId>,
    pub links: Vec<NavLink>,
}

impl NavCatalog {
    /// Dedicated buttons win; then link text; then, with exactly two links,
    /// their position.
    pub fn find(&self, direction: NavDirection) -> Option<ControlId> {
        let fab = match direction {
            NavDirection::Prev => self.prev_fab,
            NavDirection::Next => self.next_fab,
        };
        if fab.is_some() {
            return fab;
        }

        if let Some(link) = self
            .links
            .iter()
            .find(|link| text_has(link.text.trim(), direction.vocabulary()))
        {
            return Some(link.id);
        }

        if self.links.len() == 2 {
            return match direction {
                NavDirection::Prev => Some(self.links[0].id),
                NavDirection::Next => Some(self.links[1].id),
            };
        }
        None
    }
}

fn text_has(haystack: &str, needles: &[&str]) -> bool {
    let haystack = haystack.to_lowercase();
    needles.iter().any(|needle| haystack.contains(needle))
}

/// What the router needs to know about the page at the time of a key press.
#[derive(Debug, Clone, Copy)]
pub struct KeyboardView<'a> {
    /// Top edge of each page relative to the viewport top, in document order.
    pub page_tops: &'a [f32],
    pub nav: &'a NavCatalog,
    pub theme_toggle: Option<ControlId>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyIntent {
    Activate(ControlId),
    /// Smooth-scroll so the page's top edge meets the viewport top.
    ScrollToPage { index: usize, top: f32 },
    ToggleHeader,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct KeyOutcome {
    pub intent: Option<KeyIntent>,
    pub prevent_default: bool,
}

impl KeyOutcome {
    fn ignored() -> Self {
        Self::default()
    }

    fn handled(intent: KeyIntent) -> Self {
        Self {
            intent: Some(intent),
            prevent_default: true,
        }
    }

    fn passive(intent: Option<KeyIntent>) -> Self {
        Self {
            intent,
            prevent_default: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct KeyboardRouter {
    next_page_margin: f32,
}

impl KeyboardRouter {
    pub fn new(next_page_margin: f32) -> Self {
        Self { next_page_margin }
    }

    pub fn route(&self, press: &KeyPress, view: &KeyboardView<'_>) -> KeyOutcome {
        if press.focus.is_some_and(Role::is_text_entry) {
            return KeyOutcome::ignored();
        }

        let outcome = match press.key {
            Key::ArrowLeft => match view.nav.find(NavDirection::Prev) {
                Some(id) => KeyOutcome::handled(KeyIntent::Activate(id)),
                None => KeyOutcome::ignored(),
            },
            Key::ArrowRight => match view.nav.find(NavDirection::Next) {
                Some(id) => KeyOutcome::handled(KeyIntent::Activate(id)),
                None => KeyOutcome::ignored(),
            },
            Key::Space | Key::PageDown => {
                let intent = self
                    .next_page(view.page_tops)
                    .or_else(|| view.nav.find(NavDirection::Next).map(KeyIntent::Activate));
                KeyOutcome {
                    intent,
                    prevent_default: true,
                }
            }
            Key::Char(c) if c.eq_ignore_ascii_case(&'t') => {
                KeyOutcome::passive(view.theme_toggle.map(KeyIntent::Activate))
            }
            Key::Char(c) if c.eq_ignore_ascii_case(&'h') => {
                KeyOutcome::passive(Some(KeyIntent::ToggleHeader))
            }
            _ => KeyOutcome::ignored(),
        };
        debug!(key = ?press.key, ?outcome, "routed key press");
        outcome
    }

    fn next_page(&self, page_tops: &[f32]) -> Option<KeyIntent> {
        page_tops
            .iter()
            .position(|&top| top > self.next_page_margin)
            .map(|index| KeyIntent::ScrollToPage {
                index,
                top: page_tops[index],
            })
    }
}
