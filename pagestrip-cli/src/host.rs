use std::path::{Path, PathBuf};

use pagestrip_core::{
    Capabilities, ChapterInfo, ControlId, HeaderSurface, Host, ImageFetcher, IntersectionEntry,
    NavCatalog, NavLink, Role, ScrollRequest, ScrollShortcut, Target,
};
use pagestrip_pages::PageLoader;
use pagestrip_tty::LineStyle;
use tracing::{debug, info};

pub const CELL_WIDTH: f32 = 8.0;
pub const CELL_HEIGHT: f32 = 16.0;

const HEADER_ROWS: u16 = 2;
const END_CARD_ROWS: u16 = 4;
/// Height-to-width ratio assumed until a page's image header is decoded.
const PLACEHOLDER_ASPECT: f32 = 1.5;
const THEME_LABEL: &str = "[ theme ]";

const THEME_TOGGLE: ControlId = ControlId(1);
const PREV_LINK: ControlId = ControlId(2);
const NEXT_LINK: ControlId = ControlId(3);
const TO_TOP: ControlId = ControlId(4);
const TO_BOTTOM: ControlId = ControlId(5);
const END_CARD_NEXT: ControlId = ControlId(6);

/// Work the event loop has to carry out on the host's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostAction {
    Open(PathBuf),
    Shortcut(ScrollShortcut),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameLine {
    pub text: String,
    pub style: LineStyle,
}

impl FrameLine {
    fn new(text: impl Into<String>, style: LineStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    fn blank() -> Self {
        Self::new(String::new(), LineStyle::Plain)
    }
}

#[derive(Debug, Default)]
struct TerminalHeader {
    hidden: bool,
    root_hidden: bool,
}

impl HeaderSurface for TerminalHeader {
    fn rendered_height(&self) -> f32 {
        f32::from(HEADER_ROWS) * CELL_HEIGHT
    }

    fn is_marked_hidden(&self) -> bool {
        self.hidden
    }

    fn mark_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
        self.root_hidden = hidden;
    }

    // The sticky bar sits on the bottom row and the strip never moves with
    // the header, so the published offset has no consumer here.
    fn set_layout_offset(&mut self, _offset: f32) {}
}

struct Segment {
    start: u16,
    label: &'static str,
    control: ControlId,
    target: Target,
}

impl Segment {
    fn contains(&self, column: u16) -> bool {
        let width = self.label.chars().count() as u16;
        column >= self.start && column < self.start.saturating_add(width)
    }
}

/// A page strip laid out on a character grid. One cell is 8x16 layout px;
/// the document scrolls underneath a two-row site header and a one-row
/// sticky bar.
pub struct TerminalHost {
    chapter: ChapterInfo,
    loader: PageLoader,
    columns: u16,
    rows: u16,
    scroll_y: f32,
    near_top: f32,
    header: TerminalHeader,
    dark: bool,
    end_card_shown: bool,
    scrolled: bool,
    requested: Vec<bool>,
    last_ratio: Option<f32>,
    actions: Vec<HostAction>,
}

impl TerminalHost {
    pub fn new(
        chapter: ChapterInfo,
        loader: PageLoader,
        columns: u16,
        rows: u16,
        near_top: f32,
    ) -> Self {
        let requested = vec![false; chapter.pages.len()];
        Self {
            chapter,
            loader,
            columns: columns.max(1),
            rows: rows.max(1),
            scroll_y: 0.0,
            near_top,
            header: TerminalHeader::default(),
            dark: false,
            end_card_shown: false,
            scrolled: false,
            requested,
            last_ratio: None,
            actions: Vec::new(),
        }
    }

    pub fn columns(&self) -> u16 {
        self.columns
    }

    pub fn resize(&mut self, columns: u16, rows: u16) {
        self.columns = columns.max(1);
        self.rows = rows.max(1);
        let clamped = self.scroll_y.min(self.max_scroll());
        self.set_scroll(clamped);
    }

    fn viewport_height(&self) -> f32 {
        f32::from(self.rows) * CELL_HEIGHT
    }

    fn strip_width(&self) -> f32 {
        f32::from(self.columns) * CELL_WIDTH
    }

    fn page_height(&self, src: &str) -> f32 {
        let width = self.strip_width();
        let height = match self.loader.dimensions(src) {
            Some(dims) if dims.width > 0 => dims.height as f32 * width / dims.width as f32,
            _ => width * PLACEHOLDER_ASPECT,
        };
        height.max(CELL_HEIGHT)
    }

    /// Absolute top and bottom of every page. The strip starts below the
    /// header rows whether or not the header is currently shown.
    fn page_bounds(&self) -> Vec<(f32, f32)> {
        let mut top = strip_top();
        self.chapter
            .pages
            .iter()
            .map(|page| {
                let bottom = top + self.page_height(&page.src);
                let bounds = (top, bottom);
                top = bottom;
                bounds
            })
            .collect()
    }

    fn pages_end(&self) -> f32 {
        self.page_bounds()
            .last()
            .map_or(strip_top(), |&(_, bottom)| bottom)
    }

    fn max_scroll(&self) -> f32 {
        (self.document_height() - self.viewport_height()).max(0.0)
    }

    pub fn scroll_by(&mut self, delta: f32) {
        self.set_scroll(self.scroll_y + delta);
    }

    fn set_scroll(&mut self, top: f32) {
        let top = top.clamp(0.0, self.max_scroll());
        if top == self.scroll_y {
            return;
        }
        let previous = self.scroll_y;
        self.scroll_y = top;
        self.scrolled = true;
        self.auto_hide(previous, top);
    }

    /// The site's own scroll-driven header behavior: it only flips the
    /// header marker and leaves the root for the reader to mirror.
    fn auto_hide(&mut self, previous: f32, current: f32) {
        if current > previous && current >= self.near_top {
            self.header.hidden = true;
        } else if current < previous {
            self.header.hidden = false;
        }
    }

    pub fn take_scrolled(&mut self) -> bool {
        std::mem::take(&mut self.scrolled)
    }

    pub fn take_actions(&mut self) -> Vec<HostAction> {
        std::mem::take(&mut self.actions)
    }

    /// Starts loading every page within one viewport of the visible area.
    pub fn request_visible_pages(&mut self) {
        let margin = self.viewport_height();
        let view_top = self.scroll_y - margin;
        let view_bottom = self.scroll_y + self.viewport_height() + margin;
        for (index, (top, bottom)) in self.page_bounds().into_iter().enumerate() {
            if bottom < view_top || top > view_bottom || self.requested[index] {
                continue;
            }
            self.requested[index] = true;
            self.loader.load_page(index, &self.chapter.pages[index].src);
        }
    }

    /// Visibility of the last page, reported only when it changed.
    pub fn last_page_intersection(&mut self) -> Option<IntersectionEntry> {
        let (top, bottom) = *self.page_bounds().last()?;
        let view_top = self.scroll_y;
        let view_bottom = self.scroll_y + self.viewport_height();
        let visible = (bottom.min(view_bottom) - top.max(view_top)).max(0.0);
        let height = bottom - top;
        let ratio = if height > 0.0 {
            (visible / height).clamp(0.0, 1.0)
        } else {
            0.0
        };
        if self.last_ratio == Some(ratio) {
            return None;
        }
        self.last_ratio = Some(ratio);
        Some(IntersectionEntry {
            is_intersecting: visible > 0.0,
            ratio,
        })
    }

    fn header_visible(&self) -> bool {
        !self.header.hidden
    }

    fn sticky_segments(&self) -> Vec<Segment> {
        let mut segments = Vec::new();
        if self.chapter.prev.is_some() {
            segments.push(Segment {
                start: 1,
                label: "⟵ Prev",
                control: PREV_LINK,
                target: Target::new([Role::Link, Role::Nav, Role::StickyBar]),
            });
        }
        let middle = self.columns / 2;
        segments.push(Segment {
            start: middle.saturating_sub(8),
            label: "▲ Top",
            control: TO_TOP,
            target: Target::new([Role::ScrollButton, Role::ScrollTools, Role::StickyBar]),
        });
        segments.push(Segment {
            start: middle.saturating_add(1),
            label: "▼ Bottom",
            control: TO_BOTTOM,
            target: Target::new([Role::ScrollButton, Role::ScrollTools, Role::StickyBar]),
        });
        if self.chapter.next.is_some() {
            let label = "Next ⟶";
            let width = label.chars().count() as u16;
            segments.push(Segment {
                start: self.columns.saturating_sub(width + 1),
                label,
                control: NEXT_LINK,
                target: Target::new([Role::Link, Role::Nav, Role::StickyBar]),
            });
        }
        segments
    }

    fn theme_toggle_start(&self) -> u16 {
        self.columns
            .saturating_sub(THEME_LABEL.chars().count() as u16)
    }

    /// Element under a screen cell, and the control it belongs to.
    pub fn hit_test(&self, column: u16, row: u16) -> (Target, Option<ControlId>) {
        if row + 1 >= self.rows {
            return self
                .sticky_segments()
                .into_iter()
                .find(|segment| segment.contains(column))
                .map_or((Target::new([Role::StickyBar]), None), |segment| {
                    (segment.target, Some(segment.control))
                });
        }

        if row < HEADER_ROWS && self.header_visible() {
            if row == 0 && column >= self.theme_toggle_start() {
                return (
                    Target::new([Role::Button, Role::SiteHeader]),
                    Some(THEME_TOGGLE),
                );
            }
            return (Target::new([Role::SiteHeader]), None);
        }

        let y = self.scroll_y + f32::from(row) * CELL_HEIGHT + CELL_HEIGHT / 2.0;
        if y < strip_top() {
            return (Target::new([Role::PageList]), None);
        }
        if self
            .page_bounds()
            .iter()
            .any(|&(top, bottom)| y >= top && y < bottom)
        {
            return (Target::page(), None);
        }

        let card_top = self.pages_end();
        if y < card_top + f32::from(END_CARD_ROWS) * CELL_HEIGHT {
            if !self.end_card_shown {
                return (Target::new([Role::PageList]), None);
            }
            let card_row = ((y - card_top) / CELL_HEIGHT) as u16;
            if card_row == 2 && self.chapter.next.is_some() {
                return (
                    Target::new([Role::Link, Role::EndCard, Role::PageList]),
                    Some(END_CARD_NEXT),
                );
            }
            return (Target::new([Role::EndCard, Role::PageList]), None);
        }
        (Target::new([Role::Other]), None)
    }

    /// One line per terminal row, top to bottom.
    pub fn render(&self) -> Vec<FrameLine> {
        let bounds = self.page_bounds();
        let card_top = self.pages_end();
        let mut lines = Vec::with_capacity(usize::from(self.rows));
        for row in 0..self.rows {
            let line = if row + 1 == self.rows {
                self.render_sticky_bar()
            } else if row < HEADER_ROWS && self.header_visible() {
                self.render_header(row)
            } else {
                let y = self.scroll_y + f32::from(row) * CELL_HEIGHT;
                self.render_document_row(y, &bounds, card_top)
            };
            lines.push(line);
        }
        lines
    }

    fn render_header(&self, row: u16) -> FrameLine {
        if row > 0 {
            return FrameLine::new("─".repeat(usize::from(self.columns)), LineStyle::Dim);
        }
        let context = &self.chapter.context;
        let title = format!(" {} · chapter {}", context.slug, context.chapter);
        let title_width = usize::from(self.theme_toggle_start());
        let mut text = pagestrip_tty::fit_to_width(&title, title_width);
        text.push_str(THEME_LABEL);
        FrameLine::new(text, LineStyle::Inverted)
    }

    fn render_sticky_bar(&self) -> FrameLine {
        let mut cells = vec![' '; usize::from(self.columns)];
        for segment in self.sticky_segments() {
            for (offset, ch) in segment.label.chars().enumerate() {
                if let Some(cell) = cells.get_mut(usize::from(segment.start) + offset) {
                    *cell = ch;
                }
            }
        }
        FrameLine::new(cells.into_iter().collect::<String>(), LineStyle::Inverted)
    }

    fn render_document_row(&self, y: f32, bounds: &[(f32, f32)], card_top: f32) -> FrameLine {
        let inner = usize::from(self.columns.saturating_sub(2));
        let mid = y + CELL_HEIGHT / 2.0;
        if let Some(index) = bounds
            .iter()
            .position(|&(top, bottom)| mid >= top && mid < bottom)
        {
            let page = &self.chapter.pages[index];
            let (top, _) = bounds[index];
            let dimensions = self.loader.dimensions(&page.src);
            if mid - top < CELL_HEIGHT {
                let size = match dimensions {
                    Some(dims) => format!("{}x{}", dims.width, dims.height),
                    None if self.loader.has_failed(&page.src) => "unreadable".to_string(),
                    None => "loading".to_string(),
                };
                let label = format!(
                    "┌ {}/{} {} ({})",
                    index + 1,
                    self.chapter.pages.len(),
                    file_label(&page.src),
                    size
                );
                return FrameLine::new(label, LineStyle::Dim);
            }
            let fill = match (dimensions.is_some(), self.dark) {
                (false, _) => "·",
                (true, false) => "░",
                (true, true) => "▓",
            };
            let style = if self.dark {
                LineStyle::Inverted
            } else {
                LineStyle::Plain
            };
            return FrameLine::new(format!("│{}│", fill.repeat(inner)), style);
        }

        let card_row = ((mid - card_top) / CELL_HEIGHT).floor();
        if self.end_card_shown && (0.0..f32::from(END_CARD_ROWS)).contains(&card_row) {
            let text = match card_row as u16 {
                1 => format!("End of chapter {}", self.chapter.context.chapter),
                2 if self.chapter.next.is_some() => "Next chapter ⟶".to_string(),
                2 => "No further chapters".to_string(),
                _ => return FrameLine::blank(),
            };
            return FrameLine::new(centered(&text, usize::from(self.columns)), LineStyle::Inverted);
        }
        FrameLine::blank()
    }
}

fn strip_top() -> f32 {
    f32::from(HEADER_ROWS) * CELL_HEIGHT
}

fn file_label(src: &str) -> &str {
    Path::new(src)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(src)
}

fn centered(text: &str, width: usize) -> String {
    let pad = width.saturating_sub(text.chars().count()) / 2;
    format!("{}{}", " ".repeat(pad), text)
}

impl Host for TerminalHost {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            pointer_events: true,
            intersection_observer: true,
        }
    }

    fn scroll_y(&self) -> f32 {
        self.scroll_y
    }

    fn scroll_to(&mut self, request: ScrollRequest) {
        debug!(top = request.top, behavior = ?request.behavior, "scroll");
        self.set_scroll(request.top);
    }

    fn document_height(&self) -> f32 {
        self.pages_end() + f32::from(END_CARD_ROWS) * CELL_HEIGHT
    }

    fn header(&mut self) -> Option<&mut dyn HeaderSurface> {
        Some(&mut self.header as &mut dyn HeaderSurface)
    }

    fn page_tops(&self) -> Vec<f32> {
        self.page_bounds()
            .into_iter()
            .map(|(top, _)| top - self.scroll_y)
            .collect()
    }

    fn nav_catalog(&self) -> NavCatalog {
        let links = self
            .sticky_segments()
            .into_iter()
            .filter(|segment| matches!(segment.control, PREV_LINK | NEXT_LINK))
            .map(|segment| NavLink {
                id: segment.control,
                text: segment.label.to_string(),
            })
            .collect();
        NavCatalog {
            prev_fab: None,
            next_fab: None,
            links,
        }
    }

    fn theme_toggle(&self) -> Option<ControlId> {
        Some(THEME_TOGGLE)
    }

    fn activate(&mut self, control: ControlId) {
        match control {
            THEME_TOGGLE => {
                self.dark = !self.dark;
                info!(dark = self.dark, "theme toggled");
            }
            PREV_LINK => {
                if let Some(prev) = self.chapter.prev.clone() {
                    self.actions.push(HostAction::Open(prev));
                }
            }
            NEXT_LINK | END_CARD_NEXT => {
                if let Some(next) = self.chapter.next.clone() {
                    self.actions.push(HostAction::Open(next));
                }
            }
            TO_TOP => self.actions.push(HostAction::Shortcut(ScrollShortcut::ToTop)),
            TO_BOTTOM => self
                .actions
                .push(HostAction::Shortcut(ScrollShortcut::ToBottom)),
            other => debug!(?other, "unknown control"),
        }
    }

    fn has_end_card(&self) -> bool {
        true
    }

    fn reveal_end_card(&mut self) {
        self.end_card_shown = true;
    }

    fn image_fetcher(&self) -> &dyn ImageFetcher {
        &self.loader
    }
}
