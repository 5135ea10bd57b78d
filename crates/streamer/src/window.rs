//! Generation windows.

use clickstream_types::{Timestamp, WindowIndex};
use std::fmt;
use std::time::Duration;

/// A half-open interval `[start, end)` of wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub index: WindowIndex,
    pub start: Timestamp,
    pub end: Timestamp,
}

impl Window {
    /// Window `index` of `length` starting at `start`.
    pub fn new(index: WindowIndex, start: Timestamp, length: Duration) -> Self {
        Self {
            index,
            start,
            end: start.saturating_add(length),
        }
    }

    /// Whether `ts` falls inside the window.
    pub fn contains(&self, ts: Timestamp) -> bool {
        self.start <= ts && ts < self.end
    }

    /// Window length.
    pub fn length(&self) -> Duration {
        self.end.saturating_duration_since(self.start)
    }

    /// The window that follows this one.
    ///
    /// Windows are contiguous while the caller keeps up. If `now` is more than
    /// one window length past this window's end, the next window restarts at
    /// `now` instead of replaying the gap.
    pub fn successor(&self, now: Timestamp) -> (Self, bool) {
        let length = self.length();
        let behind = now.saturating_duration_since(self.end);
        if behind > length {
            (Self::new(self.index.next(), now, length), true)
        } else {
            (Self::new(self.index.next(), self.end, length), false)
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}, {})", self.index, self.start, self.end)
    }
}
