use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument};

use crate::config::ReaderConfig;
use crate::end_card::{EndOfContentNotifier, IntersectionEntry};
use crate::frame::{FrameScheduler, FrameTask, TimerTask};
use crate::gesture::{Classification, GestureClassifier, InputStrategy, RawInput};
use crate::header::{HeaderController, ToggleOutcome};
use crate::host::Host;
use crate::keyboard::{KeyIntent, KeyOutcome, KeyPress, KeyboardRouter, KeyboardView};
use crate::position::{PositionStore, SessionStorage};
use crate::preload::Preloader;
use crate::shortcuts::{ScrollBehavior, ScrollRequest, ScrollShortcut};
use crate::ChapterInfo;

/// Owns all mutable reader state for one page view and routes host events
/// to the component that owns each piece of it.
pub struct Reader {
    strategy: InputStrategy,
    header: HeaderController,
    gestures: GestureClassifier,
    positions: PositionStore,
    keyboard: KeyboardRouter,
    preloader: Preloader,
    end_card: Option<EndOfContentNotifier>,
    scheduler: FrameScheduler,
}

impl Reader {
    #[instrument(skip_all, fields(slug = %chapter.context.slug, chapter = %chapter.context.chapter))]
    pub fn attach<H: Host + ?Sized>(
        host: &mut H,
        chapter: &ChapterInfo,
        storage: Arc<dyn SessionStorage>,
        config: &ReaderConfig,
        now: Instant,
    ) -> Self {
        let capabilities = host.capabilities();
        let strategy = InputStrategy::select(&capabilities);

        let mut header = HeaderController::new(config.near_top);
        header.recompute_offset(host.header());

        let positions = PositionStore::new(
            &config.storage_namespace,
            &chapter.context,
            storage,
            config.restore_delay,
        );
        let mut scheduler = FrameScheduler::new();
        if let Some(plan) = positions.restore() {
            info!(offset = plan.offset, key = %positions.key(), "restoring saved position");
            scheduler.set_timeout(now + plan.delay, TimerTask::RestoreScroll(plan.offset));
        }

        let end_card = EndOfContentNotifier::new(
            config.end_card_threshold,
            host.has_end_card(),
            !chapter.pages.is_empty(),
            capabilities.intersection_observer,
        );
        if end_card.is_none() {
            debug!("end card notifier disabled");
        }

        Self {
            strategy,
            header,
            gestures: GestureClassifier::new(config.tap_max_move, config.tap_max_time),
            positions,
            keyboard: KeyboardRouter::new(config.next_page_margin),
            preloader: Preloader::new(chapter.sources(), config.preload_ahead),
            end_card,
            scheduler,
        }
    }

    pub fn strategy(&self) -> InputStrategy {
        self.strategy
    }

    pub fn header_hidden(&self) -> bool {
        self.header.is_hidden()
    }

    pub fn layout_offset(&self) -> f32 {
        self.header.layout_offset()
    }

    pub fn end_card_revealed(&self) -> bool {
        self.end_card
            .as_ref()
            .is_some_and(EndOfContentNotifier::is_revealed)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    /// Feeds one pointer/touch/click event to the tap classifier. Returns the
    /// classification when the event completed a sequence.
    pub fn handle_input<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        raw: RawInput,
    ) -> Option<Classification> {
        let signal = self.strategy.translate(raw)?;
        let classification = self.gestures.feed(signal)?;
        match classification {
            Classification::Tap => {
                let outcome = self.toggle_header(host);
                debug!(?outcome, "tap on reading surface");
            }
            Classification::NotTap(reason) => debug!(?reason, "press was not a tap"),
        }
        Some(classification)
    }

    /// The same guarded toggle a tap performs.
    pub fn toggle_header<H: Host + ?Sized>(&mut self, host: &mut H) -> ToggleOutcome {
        let scroll_y = host.scroll_y();
        self.header.toggle(host.header(), scroll_y)
    }

    pub fn handle_scroll<H: Host + ?Sized>(&mut self, host: &mut H) {
        if self.positions.request_save() {
            self.scheduler.request_frame(FrameTask::FlushPosition);
        }
        if host.header().is_some() {
            self.scheduler.request_frame(FrameTask::SyncHeader);
        }
    }

    pub fn handle_resize<H: Host + ?Sized>(&mut self, host: &mut H) {
        self.header.recompute_offset(host.header());
    }

    pub fn handle_key<H: Host + ?Sized>(&mut self, host: &mut H, press: &KeyPress) -> KeyOutcome {
        let page_tops = host.page_tops();
        let nav = host.nav_catalog();
        let view = KeyboardView {
            page_tops: &page_tops,
            nav: &nav,
            theme_toggle: host.theme_toggle(),
        };
        let outcome = self.keyboard.route(press, &view);
        match outcome.intent {
            Some(KeyIntent::Activate(control)) => host.activate(control),
            Some(KeyIntent::ScrollToPage { top, .. }) => {
                let target = host.scroll_y() + top;
                host.scroll_to(ScrollRequest {
                    top: target,
                    behavior: ScrollBehavior::Smooth,
                });
            }
            Some(KeyIntent::ToggleHeader) => {
                self.toggle_header(host);
            }
            None => {}
        }
        outcome
    }

    /// Page `index` finished loading for the first time. Returns the number
    /// of look-ahead requests issued.
    pub fn handle_image_loaded<H: Host + ?Sized>(&mut self, host: &H, index: usize) -> usize {
        self.preloader.preload(index, host.image_fetcher())
    }

    pub fn handle_intersection<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        entry: IntersectionEntry,
    ) {
        if let Some(notifier) = self.end_card.as_mut() {
            if notifier.observe(entry) {
                host.reveal_end_card();
            }
        }
    }

    pub fn handle_shortcut<H: Host + ?Sized>(&mut self, host: &mut H, shortcut: ScrollShortcut) {
        let request = shortcut.request(host.document_height());
        host.scroll_to(request);
    }

    /// Runs the work queued for this frame, then every timer due at `now`.
    pub fn run_frame<H: Host + ?Sized>(&mut self, host: &mut H, now: Instant) {
        for task in self.scheduler.take_frame() {
            match task {
                FrameTask::FlushPosition => match self.positions.flush(host.scroll_y()) {
                    Ok(offset) => debug!(offset, "saved scroll position"),
                    Err(err) => debug!("skipping position save: {err}"),
                },
                FrameTask::SyncHeader => self.header.sync_from_header(host.header()),
            }
        }
        for task in self.scheduler.take_due(now) {
            match task {
                TimerTask::RestoreScroll(offset) => host.scroll_to(ScrollRequest {
                    top: offset as f32,
                    behavior: ScrollBehavior::Instant,
                }),
            }
        }
    }
}
