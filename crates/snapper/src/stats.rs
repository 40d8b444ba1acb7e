//! Session counters

use snapper_types::ClassifiedEvent;

/// Cumulative per-session counters, logged periodically
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub messages: u64,
    pub control: u64,
    pub snapshots: u64,
    pub diffs: u64,
    pub level_changes: u64,
    pub unknown: u64,
    pub malformed: u64,
    /// Checksum mismatches that cleared a book
    pub desyncs: u64,
    /// Diffs that arrived before their pair's first snapshot
    pub dropped_diffs: u64,
}

impl SessionStats {
    /// Count one classified message
    pub fn record(&mut self, event: &ClassifiedEvent) {
        self.messages += 1;
        match event {
            ClassifiedEvent::Control(_) => self.control += 1,
            ClassifiedEvent::Snapshot(_) => self.snapshots += 1,
            ClassifiedEvent::Diff(_) => self.diffs += 1,
            ClassifiedEvent::LevelChanges(_) => self.level_changes += 1,
            ClassifiedEvent::Unknown { .. } => self.unknown += 1,
            ClassifiedEvent::Malformed { .. } => self.malformed += 1,
        }
    }

    /// Move a diff whose checksum could not be read over to the malformed count
    pub fn diff_was_malformed(&mut self) {
        self.diffs = self.diffs.saturating_sub(1);
        self.malformed += 1;
    }

    /// True for the first message and every `every`-th after it
    pub fn should_log(&self, every: u64) -> bool {
        every > 0 && self.messages > 0 && (self.messages - 1) % every == 0
    }
}
