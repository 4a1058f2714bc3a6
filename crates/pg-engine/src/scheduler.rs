//! Playback cursor and row advancement.
//!
//! The engine schedules rows ahead of the output clock; this module holds
//! the transport state and decides which row comes next.

use pg_ir::{PatternId, ROWS_PER_BEAT, ROWS_PER_PATTERN};

/// Last row index of a pattern.
pub const LAST_ROW: usize = ROWS_PER_PATTERN - 1;

/// Transport state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// What playback walks through.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlayMode {
    /// One pattern, optionally looping its row range.
    #[default]
    Pattern,
    /// The pattern order, starting at `order_index`.
    Song { order_index: usize },
}

/// Arguments to [`Engine::play`](crate::Engine::play).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlayOptions {
    /// Pattern to play; defaults to the current pattern.
    pub pattern: Option<PatternId>,
    pub start_row: Option<usize>,
    pub end_row: Option<usize>,
    /// Overrides the engine's looping flag when set.
    pub looping: Option<bool>,
    pub mode: PlayMode,
}

impl PlayOptions {
    /// Play the current pattern from the top.
    pub fn new() -> Self {
        Self::default()
    }

    /// Play the pattern order from its first entry.
    pub fn song() -> Self {
        Self { mode: PlayMode::Song { order_index: 0 }, ..Self::default() }
    }

    pub fn pattern(mut self, pattern: PatternId) -> Self {
        self.pattern = Some(pattern);
        self
    }

    pub fn rows(mut self, start: usize, end: usize) -> Self {
        self.start_row = Some(start);
        self.end_row = Some(end);
        self
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = Some(looping);
        self
    }

    /// Start and end row clamped into the pattern, in order.
    pub fn row_range(&self) -> (usize, usize) {
        let start = self.start_row.unwrap_or(0).min(LAST_ROW);
        let end = self.end_row.unwrap_or(LAST_ROW).min(LAST_ROW);
        if start <= end {
            (start, end)
        } else {
            (end, start)
        }
    }
}

/// Duration of one row in seconds.
pub fn row_duration(bpm: f64) -> f64 {
    60.0 / bpm / ROWS_PER_BEAT as f64
}

/// A place in the song.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Position {
    pub pattern: PatternId,
    pub row: usize,
    /// Index into the pattern order in song mode.
    pub order_index: Option<usize>,
}

/// The next row to schedule and the range it moves through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cursor {
    pub position: Position,
    pub start_row: usize,
    pub end_row: usize,
    /// Order entry played after this one in song mode.
    next_entry: usize,
}

impl Cursor {
    pub fn new(
        pattern: PatternId,
        start_row: usize,
        end_row: usize,
        order_index: Option<usize>,
    ) -> Self {
        Self {
            position: Position { pattern, row: start_row, order_index },
            start_row,
            end_row,
            next_entry: order_index.map_or(0, |index| index + 1),
        }
    }

    /// Follow the removal of order entry `removed`.
    ///
    /// Removing the entry being played keeps its remaining rows; the
    /// entry that moved into its place plays next.
    pub fn order_entry_removed(&mut self, removed: usize) {
        let Some(index) = self.position.order_index else {
            return;
        };
        if removed < index {
            self.position.order_index = Some(index - 1);
        }
        if removed < self.next_entry {
            self.next_entry -= 1;
        }
    }

    /// Follow a replaced order: resume from the occurrence of the playing
    /// pattern nearest its old index, or from whatever now sits at that
    /// index if the pattern is no longer in the order.
    pub fn order_replaced(&mut self, order: &[PatternId]) {
        let Some(index) = self.position.order_index else {
            return;
        };
        let nearest = order
            .iter()
            .enumerate()
            .filter(|(_, id)| **id == self.position.pattern)
            .map(|(i, _)| i)
            .min_by_key(|i| i.abs_diff(index));
        match nearest {
            Some(found) => {
                self.position.order_index = Some(found);
                self.next_entry = found + 1;
            }
            None => self.next_entry = index,
        }
    }

    /// The row after this one, or `None` when playback runs out.
    ///
    /// Pattern mode wraps to `start_row` when looping. Song mode moves to
    /// the top of the next order entry, wrapping the order when looping.
    pub fn advance(&self, order: &[PatternId], looping: bool) -> Option<Cursor> {
        let pos = self.position;
        if pos.row < self.end_row {
            return Some(Cursor {
                position: Position { row: pos.row + 1, ..pos },
                ..*self
            });
        }
        match pos.order_index {
            None => looping.then(|| Cursor {
                position: Position { row: self.start_row, ..pos },
                ..*self
            }),
            Some(_) => {
                let next = if self.next_entry < order.len() {
                    self.next_entry
                } else if looping && !order.is_empty() {
                    0
                } else {
                    return None;
                };
                Some(Cursor::new(order[next], 0, LAST_ROW, Some(next)))
            }
        }
    }
}

/// A scheduled row waiting for the output clock to reach it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PendingRow {
    pub time: f64,
    pub position: Position,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pg_ir::PatternTable;

    fn ids(n: usize) -> Vec<PatternId> {
        let mut table = PatternTable::new();
        (0..n).map(|_| table.insert(None).unwrap()).collect()
    }

    fn walk(
        mut cursor: Cursor,
        order: &[PatternId],
        looping: bool,
        steps: usize,
    ) -> Vec<(usize, usize)> {
        let mut seen = Vec::new();
        for _ in 0..steps {
            let index = order.iter().position(|id| *id == cursor.position.pattern).unwrap_or(0);
            seen.push((index, cursor.position.row));
            match cursor.advance(order, looping) {
                Some(next) => cursor = next,
                None => break,
            }
        }
        seen
    }

    #[test]
    fn row_range_is_clamped_and_ordered() {
        assert_eq!(PlayOptions::new().row_range(), (0, LAST_ROW));
        assert_eq!(PlayOptions::new().rows(10, 200).row_range(), (10, LAST_ROW));
        assert_eq!(PlayOptions::new().rows(12, 4).row_range(), (4, 12));
    }

    #[test]
    fn row_duration_at_120_bpm() {
        assert_eq!(row_duration(120.0), 0.125);
    }

    #[test]
    fn looping_range_cycles() {
        let order = ids(1);
        let cursor = Cursor::new(order[0], 0, 3, None);
        let rows: Vec<usize> = walk(cursor, &order, true, 10).into_iter().map(|(_, r)| r).collect();
        assert_eq!(rows, [0, 1, 2, 3, 0, 1, 2, 3, 0, 1]);
    }

    #[test]
    fn range_ends_without_looping() {
        let order = ids(1);
        let cursor = Cursor::new(order[0], 2, 4, None);
        assert_eq!(walk(cursor, &order, false, 10), [(0, 2), (0, 3), (0, 4)]);
    }

    #[test]
    fn song_mode_walks_the_order() {
        let order = ids(2);
        let cursor = Cursor::new(order[0], LAST_ROW - 1, LAST_ROW, Some(0));
        let seen = walk(cursor, &order, false, 200);
        assert_eq!(seen[..3], [(0, LAST_ROW - 1), (0, LAST_ROW), (1, 0)]);
        assert_eq!(seen.len(), 2 + ROWS_PER_PATTERN);
        assert_eq!(*seen.last().unwrap(), (1, LAST_ROW));
    }

    #[test]
    fn song_mode_wraps_when_looping() {
        let order = ids(2);
        let cursor = Cursor::new(order[1], LAST_ROW, LAST_ROW, Some(1));
        let next = cursor.advance(&order, true).unwrap();
        assert_eq!(next.position, Position { pattern: order[0], row: 0, order_index: Some(0) });
    }

    #[test]
    fn song_mode_survives_shrunk_order() {
        let order = ids(3);
        let cursor = Cursor::new(order[2], LAST_ROW, LAST_ROW, Some(2));
        assert_eq!(cursor.advance(&order[..1], false), None);
        let wrapped = cursor.advance(&order[..1], true).unwrap();
        assert_eq!(wrapped.position.order_index, Some(0));
    }

    fn finish_pattern(cursor: Cursor, order: &[PatternId]) -> Option<Position> {
        let last = Cursor { position: Position { row: LAST_ROW, ..cursor.position }, ..cursor };
        last.advance(order, false).map(|next| next.position)
    }

    #[test]
    fn removing_earlier_entry_keeps_next_entry() {
        let order = ids(3);
        let mut cursor = Cursor::new(order[1], 10, LAST_ROW, Some(1));
        cursor.order_entry_removed(0);
        assert_eq!(cursor.position.order_index, Some(0));

        let next = finish_pattern(cursor, &order[1..]).unwrap();
        assert_eq!((next.pattern, next.order_index), (order[2], Some(1)));
    }

    #[test]
    fn removing_playing_entry_moves_on_to_its_successor() {
        let order = ids(3);
        let mut cursor = Cursor::new(order[0], 10, LAST_ROW, Some(0));
        cursor.order_entry_removed(0);
        assert_eq!(cursor.position.pattern, order[0]);

        let next = finish_pattern(cursor, &order[1..]).unwrap();
        assert_eq!((next.pattern, next.order_index), (order[1], Some(0)));
    }

    #[test]
    fn removing_later_entry_is_ignored_until_reached() {
        let order = ids(3);
        let mut cursor = Cursor::new(order[0], 10, LAST_ROW, Some(0));
        cursor.order_entry_removed(1);
        let shrunk = [order[0], order[2]];
        let next = finish_pattern(cursor, &shrunk).unwrap();
        assert_eq!(next.pattern, order[2]);
    }

    #[test]
    fn replaced_order_resumes_after_nearest_occurrence() {
        let order = ids(3);
        let (a, b, c) = (order[0], order[1], order[2]);
        let mut cursor = Cursor::new(a, 0, LAST_ROW, Some(2));
        cursor.order_replaced(&[a, c, b, a, c]);
        assert_eq!(cursor.position.order_index, Some(3));
        assert_eq!(finish_pattern(cursor, &[a, c, b, a, c]).map(|p| p.pattern), Some(c));

        let mut gone = Cursor::new(a, 0, LAST_ROW, Some(1));
        gone.order_replaced(&[c, b]);
        assert_eq!(finish_pattern(gone, &[c, b]).map(|p| p.pattern), Some(b));
    }
}
