use tracing::debug;

/// The host's header element plus the document-root styling hooks that
/// mirror it.
///
/// The hidden marker may also be flipped by code outside the reader (a
/// scroll-driven auto-hide); the controller reads it back rather than
/// assuming it is the only writer.
pub trait HeaderSurface {
    fn rendered_height(&self) -> f32;
    fn is_marked_hidden(&self) -> bool;
    /// Sets the hidden marker on the header and on the document root.
    fn mark_hidden(&mut self, hidden: bool);
    /// Publishes the layout offset sticky UI is positioned against.
    fn set_layout_offset(&mut self, offset: f32);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Hidden,
    Shown,
    SuppressedNearTop,
    NoHeader,
}

#[derive(Debug, Clone)]
pub struct HeaderController {
    near_top: f32,
    hidden: bool,
    layout_offset: f32,
}

impl HeaderController {
    pub fn new(near_top: f32) -> Self {
        Self {
            near_top,
            hidden: false,
            layout_offset: 0.0,
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn layout_offset(&self) -> f32 {
        self.layout_offset
    }

    fn near_top(&self, scroll_y: f32) -> bool {
        scroll_y < self.near_top
    }

    /// Flips visibility, except that a visible header is never hidden while
    /// the viewport is near the top. Showing is always allowed.
    pub fn toggle(
        &mut self,
        header: Option<&mut dyn HeaderSurface>,
        scroll_y: f32,
    ) -> ToggleOutcome {
        let Some(header) = header else {
            return ToggleOutcome::NoHeader;
        };
        let hidden = header.is_marked_hidden();
        self.hidden = hidden;

        if !hidden && self.near_top(scroll_y) {
            debug!(scroll_y, "header toggle suppressed near top");
            return ToggleOutcome::SuppressedNearTop;
        }

        self.apply(header, !hidden);
        if hidden {
            ToggleOutcome::Shown
        } else {
            ToggleOutcome::Hidden
        }
    }

    pub fn set_hidden(&mut self, header: Option<&mut dyn HeaderSurface>, hidden: bool) {
        if let Some(header) = header {
            self.apply(header, hidden);
        }
    }

    pub fn recompute_offset(&mut self, header: Option<&mut dyn HeaderSurface>) {
        if let Some(header) = header {
            self.write_offset(header);
        }
    }

    /// Adopts whatever hidden marker the header currently carries and
    /// re-derives the root marker and layout offset from it.
    pub fn sync_from_header(&mut self, header: Option<&mut dyn HeaderSurface>) {
        if let Some(header) = header {
            let hidden = header.is_marked_hidden();
            self.apply(header, hidden);
        }
    }

    fn apply(&mut self, header: &mut dyn HeaderSurface, hidden: bool) {
        self.hidden = hidden;
        header.mark_hidden(hidden);
        self.write_offset(header);
    }

    fn write_offset(&mut self, header: &mut dyn HeaderSurface) {
        let offset = if header.is_marked_hidden() {
            0.0
        } else {
            header.rendered_height().max(0.0)
        };
        self.layout_offset = offset;
        header.set_layout_offset(offset);
    }
}
