use std::time::{Duration, Instant};

/// Debounce timer for the draft autosave. Every change pushes the deadline
/// back; the save fires once the document has been quiet for `delay`.
#[derive(Clone, Debug)]
pub struct AutosaveTimer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl AutosaveTimer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, deadline: None }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Restart the quiet period from `at`.
    pub fn schedule(&mut self, at: Instant) {
        self.deadline = Some(at + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// True once per schedule, when `now` has reached the deadline.
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
