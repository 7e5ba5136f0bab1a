use std::time::Instant;

/// Work deferred to the next animation frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameTask {
    FlushPosition,
    SyncHeader,
}

/// Work deferred until a deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTask {
    RestoreScroll(u32),
}

/// Stand-in for the runtime's frame callback and timer queues. The host
/// pumps it once per frame.
#[derive(Debug, Default)]
pub struct FrameScheduler {
    frame: Vec<FrameTask>,
    timers: Vec<(Instant, TimerTask)>,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `task` for the next frame. A task already queued is not
    /// queued twice.
    pub fn request_frame(&mut self, task: FrameTask) -> bool {
        if self.frame.contains(&task) {
            return false;
        }
        self.frame.push(task);
        true
    }

    pub fn set_timeout(&mut self, deadline: Instant, task: TimerTask) {
        self.timers.push((deadline, task));
    }

    pub fn take_frame(&mut self) -> Vec<FrameTask> {
        std::mem::take(&mut self.frame)
    }

    /// Removes and returns the timers due at `now`, earliest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<TimerTask> {
        let mut due: Vec<(Instant, TimerTask)> = Vec::new();
        self.timers.retain(|&(deadline, task)| {
            if deadline <= now {
                due.push((deadline, task));
                false
            } else {
                true
            }
        });
        due.sort_by_key(|(deadline, _)| *deadline);
        due.into_iter().map(|(_, task)| task).collect()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.iter().map(|(deadline, _)| *deadline).min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn frame_tasks_are_queued_once() {
        let mut scheduler = FrameScheduler::new();
        assert!(scheduler.request_frame(FrameTask::FlushPosition));
        assert!(!scheduler.request_frame(FrameTask::FlushPosition));
        assert!(scheduler.request_frame(FrameTask::SyncHeader));
        assert_eq!(
            scheduler.take_frame(),
            vec![FrameTask::FlushPosition, FrameTask::SyncHeader]
        );
        assert!(scheduler.take_frame().is_empty());
    }

    #[test]
    fn timers_fire_only_once_due() {
        let mut scheduler = FrameScheduler::new();
        let start = Instant::now();
        scheduler.set_timeout(start + Duration::from_millis(50), TimerTask::RestoreScroll(7));

        assert!(scheduler.take_due(start).is_empty());
        assert_eq!(
            scheduler.next_deadline(),
            Some(start + Duration::from_millis(50))
        );
        assert_eq!(
            scheduler.take_due(start + Duration::from_millis(50)),
            vec![TimerTask::RestoreScroll(7)]
        );
        assert!(scheduler.next_deadline().is_none());
    }
}
