//! Behavior layer for a vertical page-strip reader: tap vs. drag
//! disambiguation, the header visibility state machine, per-chapter scroll
//! persistence, look-ahead image loading and the end-of-chapter card.
//!
//! Nothing here talks to a UI toolkit directly; a runtime plugs in through
//! [`Host`] and feeds events to a [`Reader`].

use std::path::{Path, PathBuf};

use anyhow::Result;

mod config;
mod end_card;
mod frame;
mod gesture;
mod header;
mod host;
mod keyboard;
mod position;
mod preload;
mod reader;
mod shortcuts;
mod target;

pub use config::ReaderConfig;
pub use end_card::{EndOfContentNotifier, IntersectionEntry};
pub use frame::{FrameScheduler, FrameTask, TimerTask};
pub use gesture::{
    Capabilities, Classification, GestureClassifier, InputSample, InputStrategy, Point,
    PressSignal, RawInput, Rejection,
};
pub use header::{HeaderController, HeaderSurface, ToggleOutcome};
pub use host::Host;
pub use keyboard::{
    ControlId, Key, KeyIntent, KeyOutcome, KeyPress, KeyboardRouter, KeyboardView, NavCatalog,
    NavDirection, NavLink,
};
pub use position::{
    parse_offset, FileStorage, MemoryStorage, PositionKey, PositionStore, RestorePlan,
    SessionStorage, StorageError,
};
pub use preload::{ImageFetcher, Preloader};
pub use reader::Reader;
pub use shortcuts::{ScrollBehavior, ScrollRequest, ScrollShortcut};
pub use target::{Role, Target};

/// Which document and sub-section is on screen. Fixed for a page view.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ReadingContext {
    pub slug: String,
    pub chapter: String,
}

impl ReadingContext {
    pub fn new(slug: impl Into<String>, chapter: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            chapter: chapter.into(),
        }
    }

    /// Builds the context from markup attributes; a missing attribute reads
    /// as the empty string.
    pub fn from_attributes(slug: Option<&str>, chapter: Option<&str>) -> Self {
        Self::new(slug.unwrap_or_default(), chapter.unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
    pub index: usize,
    pub src: String,
}

#[derive(Debug, Clone)]
pub struct ChapterInfo {
    pub context: ReadingContext,
    pub pages: Vec<PageInfo>,
    pub prev: Option<PathBuf>,
    pub next: Option<PathBuf>,
}

impl ChapterInfo {
    pub fn sources(&self) -> Vec<String> {
        self.pages.iter().map(|page| page.src.clone()).collect()
    }
}

#[async_trait::async_trait]
pub trait ChapterProvider: Send + Sync {
    async fn open(&self, path: &Path) -> Result<ChapterInfo>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_attributes_read_as_empty() {
        let context = ReadingContext::from_attributes(Some("demo"), None);
        assert_eq!(context, ReadingContext::new("demo", ""));
    }

    #[test]
    fn sources_follow_page_order() {
        let chapter = ChapterInfo {
            context: ReadingContext::new("demo", "1"),
            pages: vec![
                PageInfo {
                    index: 0,
                    src: "a.png".into(),
                },
                PageInfo {
                    index: 1,
                    src: "b.png".into(),
                },
            ],
            prev: None,
            next: None,
        };
        assert_eq!(chapter.sources(), vec!["a.png", "b.png"]);
    }

    struct PathProvider;

    #[async_trait::async_trait]
    impl ChapterProvider for PathProvider {
        async fn open(&self, path: &Path) -> Result<ChapterInfo> {
            let name = |p: &Path| p.file_name().and_then(|n| n.to_str()).map(str::to_string);
            let slug = path.parent().and_then(name);
            let chapter = name(path);
            Ok(ChapterInfo {
                context: ReadingContext::from_attributes(slug.as_deref(), chapter.as_deref()),
                pages: Vec::new(),
                prev: None,
                next: None,
            })
        }
    }

    #[tokio::test]
    async fn provider_works_behind_trait_object() {
        let provider: Box<dyn ChapterProvider> = Box::new(PathProvider);
        let chapter = provider.open(Path::new("/library/demo/5")).await.unwrap();
        assert_eq!(chapter.context, ReadingContext::new("demo", "5"));
        assert!(chapter.sources().is_empty());
    }
}
