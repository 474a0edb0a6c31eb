//! Explicit state machine for periodic refresh. Teardown on any change
//! of account, window, or interval is a first-class transition rather
//! than a side effect of something else going out of scope; the
//! generation counter lets cycle results be discarded once a newer
//! arming supersedes them.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Scheduled,
    Running,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Start a cycle; commit its result only while this generation is
    /// still current.
    Run { generation: u64 },
    /// Fired while a cycle was already running (or while not armed);
    /// dropped, never queued.
    Dropped,
}

#[derive(Debug)]
pub struct RefreshScheduler {
    state: SchedulerState,
    generation: u64,
}

impl RefreshScheduler {
    pub fn new() -> Self {
        Self {
            state: SchedulerState::Idle,
            generation: 0,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Enables auto-refresh. Arming always opens a new generation, so any
    /// still-running cycle from a previous arming can no longer commit.
    pub fn arm(&mut self) -> u64 {
        self.generation += 1;
        self.state = SchedulerState::Scheduled;
        self.generation
    }

    /// The interval elapsed. At most one cycle runs at a time.
    pub fn tick(&mut self) -> Tick {
        match self.state {
            SchedulerState::Scheduled => {
                self.state = SchedulerState::Running;
                Tick::Run {
                    generation: self.generation,
                }
            }
            SchedulerState::Running | SchedulerState::Idle | SchedulerState::Cancelled => {
                Tick::Dropped
            }
        }
    }

    /// Whether a cycle started under `generation` may still publish its
    /// result.
    pub fn can_commit(&self, generation: u64) -> bool {
        self.state == SchedulerState::Running && generation == self.generation
    }

    /// A cycle finished (success or failure). Re-schedules unless the
    /// scheduler was cancelled mid-cycle.
    pub fn complete(&mut self, generation: u64) {
        if self.can_commit(generation) {
            self.state = SchedulerState::Scheduled;
        }
    }

    /// Disables auto-refresh, or tears the timer down ahead of a change
    /// of account, window, or interval. Invalidates in-flight cycles.
    pub fn cancel(&mut self) {
        self.generation += 1;
        self.state = SchedulerState::Cancelled;
    }
}

impl Default for RefreshScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle_and_drops_ticks_until_armed() {
        let mut scheduler = RefreshScheduler::new();
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert_eq!(scheduler.tick(), Tick::Dropped);
    }

    #[test]
    fn armed_scheduler_runs_one_cycle_per_tick() {
        let mut scheduler = RefreshScheduler::new();
        let generation = scheduler.arm();
        assert_eq!(scheduler.state(), SchedulerState::Scheduled);

        assert_eq!(scheduler.tick(), Tick::Run { generation });
        assert_eq!(scheduler.state(), SchedulerState::Running);

        scheduler.complete(generation);
        assert_eq!(scheduler.state(), SchedulerState::Scheduled);
    }

    #[test]
    fn tick_while_running_is_dropped_not_queued() {
        let mut scheduler = RefreshScheduler::new();
        let generation = scheduler.arm();
        assert_eq!(scheduler.tick(), Tick::Run { generation });
        assert_eq!(scheduler.tick(), Tick::Dropped);
        assert_eq!(scheduler.state(), SchedulerState::Running);
    }

    #[test]
    fn cancel_mid_cycle_blocks_the_commit() {
        let mut scheduler = RefreshScheduler::new();
        let generation = scheduler.arm();
        assert_eq!(scheduler.tick(), Tick::Run { generation });

        scheduler.cancel();
        assert!(!scheduler.can_commit(generation));

        scheduler.complete(generation);
        assert_eq!(scheduler.state(), SchedulerState::Cancelled);
    }

    #[test]
    fn rearming_opens_a_new_generation() {
        let mut scheduler = RefreshScheduler::new();
        let first = scheduler.arm();
        scheduler.cancel();
        let second = scheduler.arm();
        assert!(second > first);

        assert_eq!(
            scheduler.tick(),
            Tick::Run { generation: second }
        );
        assert!(!scheduler.can_commit(first));
        assert!(scheduler.can_commit(second));
    }

    #[test]
    fn cancelled_scheduler_stays_cancelled_until_rearmed() {
        let mut scheduler = RefreshScheduler::new();
        scheduler.arm();
        scheduler.cancel();
        assert_eq!(scheduler.tick(), Tick::Dropped);
        assert_eq!(scheduler.state(), SchedulerState::Cancelled);
    }
}
