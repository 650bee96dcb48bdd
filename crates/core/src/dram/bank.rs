//! Bank: the leaf timing and row-buffer state machine.

use crate::config::BankTiming;

use super::command::CommandType;

/// A bank's row buffer: the open row, or `None` if precharged, plus the
/// number of column accesses served since the last activation.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowBuffer {
    pub tag: Option<u32>,
    pub hits: u32,
}

/// Per-bank timing and row-buffer state.
///
/// Invariant: exactly one of `{act_ready, pre_ready}` is `Some` at all
/// times, matching `row.tag.is_none()` vs `is_some()`; `read_ready`/
/// `write_ready` are `Some` iff the row is open.
#[derive(Debug, Clone, Copy)]
pub struct BankState {
    pub row: RowBuffer,
    act_ready: Option<u64>,
    pre_ready: Option<u64>,
    read_ready: Option<u64>,
    write_ready: Option<u64>,
    /// Transactions queued targeting this bank.
    pub demand_count: u32,
    /// Transactions queued matching the currently open row.
    pub supply_count: u32,
}

impl BankState {
    pub fn new() -> Self {
        Self {
            row: RowBuffer::default(),
            act_ready: Some(0),
            pre_ready: None,
            read_ready: None,
            write_ready: None,
            demand_count: 0,
            supply_count: 0,
        }
    }

    fn assert_row_invariant(&self) {
        debug_assert_eq!(
            self.row.tag.is_none(),
            self.act_ready.is_some(),
            "exactly one of act_ready/pre_ready must be set"
        );
        debug_assert_eq!(
            self.row.tag.is_some(),
            self.pre_ready.is_some(),
            "pre_ready must track an open row"
        );
    }

    /// Earliest cycle `kind` is legal from this bank alone. `None` means
    /// the command is not currently legal regardless of clock.
    pub fn ready_time(&self, kind: CommandType, row: u32) -> Option<u64> {
        self.assert_row_invariant();
        match kind {
            CommandType::Activate => {
                debug_assert!(self.row.tag.is_none(), "ACTIVATE requires a precharged bank");
                self.act_ready
            }
            CommandType::Precharge => {
                debug_assert!(self.row.tag.is_some(), "PRECHARGE requires an open bank");
                self.pre_ready
            }
            CommandType::Read | CommandType::ReadPrecharge => {
                debug_assert_eq!(self.row.tag, Some(row), "READ must target the open row");
                self.read_ready
            }
            CommandType::Write | CommandType::WritePrecharge => {
                debug_assert_eq!(self.row.tag, Some(row), "WRITE must target the open row");
                self.write_ready
            }
            CommandType::Refresh => {
                unreachable!("REFRESH is issued and completed at the rank level, never against a single bank")
            }
            CommandType::Powerdown | CommandType::Powerup => None,
        }
    }

    /// Applies `kind` at `clock`, mutating bank state, and returns the
    /// data-beat completion cycle (equal to `clock` for non-data commands).
    pub fn finish(&mut self, clock: u64, kind: CommandType, row: u32, timing: &BankTiming) -> u64 {
        match kind {
            CommandType::Activate => {
                self.act_ready = None;
                self.pre_ready = Some(clock + u64::from(timing.act_to_pre));
                self.read_ready = Some(clock + u64::from(timing.act_to_read));
                self.write_ready = Some(clock + u64::from(timing.act_to_write));
                self.row = RowBuffer { tag: Some(row), hits: 0 };
                clock
            }
            CommandType::Precharge => {
                self.act_ready = Some(clock + u64::from(timing.pre_to_act));
                self.pre_ready = None;
                self.read_ready = None;
                self.write_ready = None;
                self.row = RowBuffer::default();
                clock
            }
            CommandType::Read => {
                self.pre_ready = Some(clock + u64::from(timing.read_to_pre));
                self.row.hits += 1;
                clock + u64::from(timing.read_to_data)
            }
            CommandType::ReadPrecharge => {
                self.act_ready =
                    Some(clock + u64::from(timing.read_to_pre) + u64::from(timing.pre_to_act));
                self.pre_ready = None;
                self.read_ready = None;
                self.write_ready = None;
                self.row = RowBuffer::default();
                clock + u64::from(timing.read_to_data)
            }
            CommandType::Write => {
                self.pre_ready = Some(clock + u64::from(timing.write_to_pre));
                self.row.hits += 1;
                clock + u64::from(timing.write_to_data)
            }
            CommandType::WritePrecharge => {
                self.act_ready =
                    Some(clock + u64::from(timing.write_to_pre) + u64::from(timing.pre_to_act));
                self.pre_ready = None;
                self.read_ready = None;
                self.write_ready = None;
                self.row = RowBuffer::default();
                clock + u64::from(timing.write_to_data)
            }
            CommandType::Refresh => {
                unreachable!("REFRESH is issued and completed at the rank level, never against a single bank")
            }
            CommandType::Powerdown | CommandType::Powerup => clock,
        }
    }

    /// Sets `act_ready` after the rank-level refresh latency has elapsed.
    /// Called by the rank once per bank on `REFRESH` completion.
    pub fn set_act_ready_after_refresh(&mut self, clock: u64) {
        self.act_ready = Some(clock);
    }

    /// The cycle this bank's own row-buffer state allows a PRECHARGE,
    /// regardless of bus occupancy. Used by the lazy-precharge policy,
    /// which back-dates its nominal issue cycle.
    pub fn precharge_ready(&self) -> Option<u64> {
        self.pre_ready
    }

    pub fn is_open(&self) -> bool {
        self.row.tag.is_some()
    }
}

impl Default for BankState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timing() -> BankTiming {
        BankTiming {
            act_to_read: 5,
            act_to_write: 5,
            act_to_pre: 15,
            read_to_pre: 4,
            write_to_pre: 10,
            pre_to_act: 5,
            read_to_data: 5,
            write_to_data: 4,
        }
    }

    #[test]
    fn activate_opens_row_and_clears_act_ready() {
        let mut bank = BankState::new();
        let t = timing();
        let _ = bank.finish(0, CommandType::Activate, 7, &t);
        assert_eq!(bank.row.tag, Some(7));
        assert!(bank.ready_time(CommandType::Activate, 7).is_none());
        assert_eq!(bank.ready_time(CommandType::Read, 7), Some(5));
    }

    #[test]
    fn precharge_closes_row_and_resets_to_precharged_state() {
        let mut bank = BankState::new();
        let t = timing();
        let _ = bank.finish(0, CommandType::Activate, 7, &t);
        let _ = bank.finish(20, CommandType::Precharge, 7, &t);
        assert_eq!(bank.row.tag, None);
        assert_eq!(bank.ready_time(CommandType::Activate, 0), Some(25));
    }

    #[test]
    fn read_increments_hits_and_returns_completion_cycle() {
        let mut bank = BankState::new();
        let t = timing();
        let _ = bank.finish(0, CommandType::Activate, 1, &t);
        let finish = bank.finish(5, CommandType::Read, 1, &t);
        assert_eq!(finish, 10);
        assert_eq!(bank.row.hits, 1);
        assert_eq!(bank.ready_time(CommandType::Precharge, 1), Some(9));
    }
}
