#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    Instant,
    Smooth,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollRequest {
    pub top: f32,
    pub behavior: ScrollBehavior,
}

/// The floating to-top / to-bottom buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollShortcut {
    ToTop,
    ToBottom,
}

impl ScrollShortcut {
    pub fn request(self, document_height: f32) -> ScrollRequest {
        let top = match self {
            ScrollShortcut::ToTop => 0.0,
            ScrollShortcut::ToBottom => document_height.max(0.0),
        };
        ScrollRequest {
            top,
            behavior: ScrollBehavior::Smooth,
        }
    }
}
