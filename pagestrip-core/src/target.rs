/// What an element in the host's tree is, as far as the reader cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    PageList,
    Page,
    Link,
    Button,
    Input,
    TextArea,
    Select,
    Label,
    ReaderHeader,
    SiteHeader,
    StickyBar,
    FabButton,
    Nav,
    PageNumber,
    EndCard,
    ScrollTools,
    ScrollButton,
    Other,
}

impl Role {
    /// Roles whose subtree swallows taps: real controls and UI chrome.
    pub fn is_interactive(self) -> bool {
        matches!(
            self,
            Role::Link
                | Role::Button
                | Role::Input
                | Role::TextArea
                | Role::Select
                | Role::Label
                | Role::ReaderHeader
                | Role::SiteHeader
                | Role::StickyBar
                | Role::FabButton
                | Role::Nav
                | Role::PageNumber
                | Role::EndCard
                | Role::ScrollTools
                | Role::ScrollButton
        )
    }

    pub fn is_text_entry(self) -> bool {
        matches!(self, Role::Input | Role::TextArea | Role::Select)
    }
}

/// Element path of an event target, innermost element first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Target {
    path: Vec<Role>,
}

impl Target {
    pub fn new(path: impl Into<Vec<Role>>) -> Self {
        Self { path: path.into() }
    }

    pub fn page() -> Self {
        Self::new([Role::Page, Role::PageList])
    }

    pub fn closest(&self, pred: impl Fn(Role) -> bool) -> Option<Role> {
        self.path.iter().copied().find(|role| pred(*role))
    }

    pub fn is_interactive(&self) -> bool {
        self.closest(Role::is_interactive).is_some()
    }

    pub fn is_on_reading_surface(&self) -> bool {
        self.closest(|role| matches!(role, Role::Page | Role::PageList))
            .is_some()
    }

    /// A target a tap may start or end on.
    pub fn accepts_tap(&self) -> bool {
        self.is_on_reading_surface() && !self.is_interactive()
    }
}
