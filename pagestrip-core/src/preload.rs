use tracing::debug;

/// Starts loading an image by source URL. Fire-and-forget: the outcome is
/// never reported back.
pub trait ImageFetcher {
    fn fetch(&self, src: &str);
}

/// Look-ahead loading of page images. Each page's load hook is armed once
/// and disarms itself when it fires.
#[derive(Debug, Clone)]
pub struct Preloader {
    sources: Vec<String>,
    armed: Vec<bool>,
    window: usize,
}

impl Preloader {
    pub fn new(sources: Vec<String>, window: usize) -> Self {
        let armed = vec![true; sources.len()];
        Self {
            sources,
            armed,
            window,
        }
    }

    /// Indices to request after page `index` loaded. Empty when the hook
    /// for `index` already fired or `index` is out of range.
    pub fn on_loaded(&mut self, index: usize) -> Vec<usize> {
        match self.armed.get_mut(index) {
            Some(armed) if *armed => *armed = false,
            _ => return Vec::new(),
        }
        let end = index
            .saturating_add(self.window)
            .min(self.sources.len().saturating_sub(1));
        (index + 1..=end).collect()
    }

    /// Runs the load hook for `index`, handing the look-ahead sources to
    /// `fetcher`. Returns how many requests were issued.
    pub fn preload(&mut self, index: usize, fetcher: &dyn ImageFetcher) -> usize {
        let upcoming = self.on_loaded(index);
        for &next in &upcoming {
            fetcher.fetch(&self.sources[next]);
        }
        if !upcoming.is_empty() {
            debug!(index, ahead = upcoming.len(), "preloading upcoming pages");
        }
        upcoming.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingFetcher {
        requested: RefCell<Vec<String>>,
    }

    impl ImageFetcher for RecordingFetcher {
        fn fetch(&self, src: &str) {
            self.requested.borrow_mut().push(src.to_string());
        }
    }

    fn sources(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{i:03}.png")).collect()
    }

    #[test]
    fn loads_next_three_pages() {
        let mut preloader = Preloader::new(sources(10), 3);
        assert_eq!(preloader.on_loaded(2), vec![3, 4, 5]);
    }

    #[test]
    fn window_is_clipped_at_the_end() {
        let mut preloader = Preloader::new(sources(5), 3);
        assert_eq!(preloader.on_loaded(3), vec![4]);
        assert!(preloader.on_loaded(4).is_empty());
    }

    #[test]
    fn hook_fires_once_per_page() {
        let mut preloader = Preloader::new(sources(10), 3);
        let fetcher = RecordingFetcher::default();
        assert_eq!(preloader.preload(0, &fetcher), 3);
        assert_eq!(preloader.preload(0, &fetcher), 0);
        assert_eq!(
            *fetcher.requested.borrow(),
            vec!["001.png", "002.png", "003.png"]
        );
    }

    #[test]
    fn overlapping_windows_are_not_deduplicated() {
        let mut preloader = Preloader::new(sources(10), 3);
        let fetcher = RecordingFetcher::default();
        preloader.preload(0, &fetcher);
        preloader.preload(1, &fetcher);
        assert_eq!(
            *fetcher.requested.borrow(),
            vec!["001.png", "002.png", "003.png", "002.png", "003.png", "004.png"]
        );
    }

    #[test]
    fn out_of_range_index_is_ignored() {
        let mut preloader = Preloader::new(sources(2), 3);
        assert!(preloader.on_loaded(7).is_empty());
        assert!(Preloader::new(Vec::new(), 3).on_loaded(0).is_empty());
    }
}
