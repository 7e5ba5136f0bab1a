use tracing::debug;

/// One intersection observation of the last page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionEntry {
    pub is_intersecting: bool,
    /// Visible fraction of the element, 0.0 to 1.0.
    pub ratio: f32,
}

/// Reveals the end-of-chapter card once enough of the last page is on
/// screen. The reveal is one-way.
#[derive(Debug, Clone)]
pub struct EndOfContentNotifier {
    threshold: f32,
    revealed: bool,
}

impl EndOfContentNotifier {
    /// `None` when there is no card to reveal, no last page to watch, or the
    /// host cannot observe intersections.
    pub fn new(
        threshold: f32,
        has_end_card: bool,
        has_last_page: bool,
        can_observe: bool,
    ) -> Option<Self> {
        if has_end_card && has_last_page && can_observe {
            Some(Self {
                threshold,
                revealed: false,
            })
        } else {
            None
        }
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    /// Returns true exactly once: on the observation that reveals the card.
    pub fn observe(&mut self, entry: IntersectionEntry) -> bool {
        if self.revealed || !entry.is_intersecting || entry.ratio < self.threshold {
            return false;
        }
        debug!(ratio = entry.ratio, "last page visible; revealing end card");
        self.revealed = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(ratio: f32) -> IntersectionEntry {
        IntersectionEntry {
            is_intersecting: ratio > 0.0,
            ratio,
        }
    }

    #[test]
    fn missing_pieces_disable_the_notifier() {
        assert!(EndOfContentNotifier::new(0.35, false, true, true).is_none());
        assert!(EndOfContentNotifier::new(0.35, true, false, true).is_none());
        assert!(EndOfContentNotifier::new(0.35, true, true, false).is_none());
    }

    #[test]
    fn reveals_once_threshold_is_crossed_and_stays() {
        let mut notifier = EndOfContentNotifier::new(0.35, true, true, true).unwrap();
        assert!(!notifier.observe(entry(0.2)));
        assert!(!notifier.is_revealed());
        assert!(notifier.observe(entry(0.4)));
        assert!(notifier.is_revealed());
        assert!(!notifier.observe(entry(0.1)));
        assert!(!notifier.observe(entry(0.0)));
        assert!(notifier.is_revealed());
    }

    #[test]
    fn non_intersecting_entry_never_reveals() {
        let mut notifier = EndOfContentNotifier::new(0.35, true, true, true).unwrap();
        let stale = IntersectionEntry {
            is_intersecting: false,
            ratio: 0.9,
        };
        assert!(!notifier.observe(stale));
    }
}
