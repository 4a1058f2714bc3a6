//! Frame-stamped automation queue.

/// A value scheduled for a frame on the output clock.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Timed<T> {
    pub frame: u64,
    pub value: T,
}

/// A queue of values sorted by frame.
///
/// The render path consumes entries by advancing a cursor, without
/// removing or allocating. Consumed entries are compacted away on the next
/// `push`, which happens on the scheduling side.
#[derive(Clone, Debug)]
pub struct Timeline<T> {
    entries: Vec<Timed<T>>,
    /// Next entry to apply.
    cursor: usize,
}

impl<T> Default for Timeline<T> {
    fn default() -> Self {
        Self { entries: Vec::new(), cursor: 0 }
    }
}

impl<T: Copy> Timeline<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `value` at `frame`. Entries at the same frame keep their
    /// push order.
    pub fn push(&mut self, frame: u64, value: T) {
        if self.cursor > 0 {
            self.entries.drain(..self.cursor);
            self.cursor = 0;
        }
        let pos = self.entries.partition_point(|e| e.frame <= frame);
        self.entries.insert(pos, Timed { frame, value });
    }

    /// Consume the next entry if it is due at or before `frame`.
    pub fn pop_due(&mut self, frame: u64) -> Option<T> {
        let entry = self.entries.get(self.cursor)?;
        if entry.frame > frame {
            return None;
        }
        self.cursor += 1;
        Some(entry.value)
    }

    /// Drop every unconsumed entry at or after `frame`.
    pub fn cancel_from(&mut self, frame: u64) {
        let keep = self.cursor + self.entries[self.cursor..].partition_point(|e| e.frame < frame);
        self.entries.truncate(keep);
    }

    /// Number of entries not yet consumed.
    pub fn pending(&self) -> usize {
        self.entries.len() - self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.pending() == 0
    }
}
