use std::time::{Duration, Instant};

/// The shortest time the hub will ever block for.
/// Waiting any less would spin on a deadline that has just passed.
pub const MIN_WAIT: Duration = Duration::from_millis(1);

/// Stand-in for "wait forever", handed to the selector when no
/// active transfer has a deadline.
pub const NEVER_WAIT: Duration = Duration::from_secs(i32::MAX as u64);

/// Absolute point in time after which an idle transfer is timed out.
///
/// `Never` sorts after every `At`, so the minimum over a set of
/// deadlines is the one that expires first.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Deadline {
    At(Instant),
    #[default]
    Never,
}

impl Deadline {
    /// deadline `timeout` from `now`, or never if there is no timeout
    pub fn after(now: Instant, timeout: Option<Duration>) -> Deadline {
        match timeout {
            Some(timeout) => now
                .checked_add(timeout)
                .map_or(Deadline::Never, Deadline::At),
            None => Deadline::Never,
        }
    }

    /// true if `now` is strictly past this deadline
    pub fn has_passed(&self, now: Instant) -> bool {
        match self {
            Deadline::At(instant) => now > *instant,
            Deadline::Never => false,
        }
    }

    /// How long a selector may block before this deadline needs attention.
    ///
    /// Floored at [`MIN_WAIT`]; [`NEVER_WAIT`] if the deadline never expires.
    pub fn wait_from(&self, now: Instant) -> Duration {
        match self {
            Deadline::At(instant) => instant.saturating_duration_since(now).max(MIN_WAIT),
            Deadline::Never => NEVER_WAIT,
        }
    }
}
