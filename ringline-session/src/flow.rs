/// Why reads are paused. Reads resume only when no reason remains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseReason {
    /// Too many client requests in flight.
    Throttled,
    /// The transport has not finished a previous write.
    WriteBackpressure,
}

impl PauseReason {
    fn bit(self) -> u8 {
        match self {
            PauseReason::Throttled => 1 << 0,
            PauseReason::WriteBackpressure => 1 << 1,
        }
    }
}

/// Set of active [`PauseReason`]s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PauseSet(u8);

impl PauseSet {
    /// Add `reason`. Returns true if it was not already present.
    pub fn insert(&mut self, reason: PauseReason) -> bool {
        let added = !self.contains(reason);
        self.0 |= reason.bit();
        added
    }

    /// Remove `reason`. Returns true if it was present.
    pub fn remove(&mut self, reason: PauseReason) -> bool {
        let present = self.contains(reason);
        self.0 &= !reason.bit();
        present
    }

    pub fn contains(&self, reason: PauseReason) -> bool {
        self.0 & reason.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}
