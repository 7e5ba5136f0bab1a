use crate::gesture::Capabilities;
use crate::header::HeaderSurface;
use crate::keyboard::{ControlId, NavCatalog};
use crate::preload::ImageFetcher;
use crate::shortcuts::ScrollRequest;

/// Everything the reader needs from the runtime that renders the page.
///
/// Optional pieces (`header`, the end card, capability flags) may be absent;
/// the reader degrades to a no-op for whatever is missing.
pub trait Host {
    fn capabilities(&self) -> Capabilities;

    /// Current vertical scroll offset of the viewport, in layout px.
    fn scroll_y(&self) -> f32;
    fn scroll_to(&mut self, request: ScrollRequest);
    fn document_height(&self) -> f32;

    fn header(&mut self) -> Option<&mut dyn HeaderSurface>;

    /// Top edge of every page relative to the viewport top.
    fn page_tops(&self) -> Vec<f32>;
    fn nav_catalog(&self) -> NavCatalog;
    fn theme_toggle(&self) -> Option<ControlId>;
    fn activate(&mut self, control: ControlId);

    fn has_end_card(&self) -> bool;
    fn reveal_end_card(&mut self);

    fn image_fetcher(&self) -> &dyn ImageFetcher;
}
