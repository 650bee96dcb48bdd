//! Rank: combines its banks' readiness with rank-wide bus, refresh, and
//! power-state constraints.

use crate::config::{BankTiming, RankTiming};

use super::bank::BankState;
use super::command::CommandType;

/// Per-rank bus, refresh, and power-state tracking.
///
/// Invariant: `active_count == banks.iter().filter(|b| b.is_open()).count()`;
/// `is_sleeping` implies `active_count == 0`.
#[derive(Debug, Clone)]
pub struct RankState {
    pub banks: Vec<BankState>,
    pub demand_count: u32,
    pub active_count: u32,
    pub refresh_time: u64,
    pub is_sleeping: bool,
    act_ready: Option<u64>,
    /// Rolling 4-slot FIFO enforcing tFAW: `faw_ready[0]` is the oldest
    /// (next-expiring) entry.
    faw_ready: [u64; 4],
    read_ready: u64,
    write_ready: u64,
    powerup_ready: Option<u64>,
}

impl RankState {
    pub fn new(n_bank: usize, first_refresh: u64) -> Self {
        Self {
            banks: (0..n_bank).map(|_| BankState::new()).collect(),
            demand_count: 0,
            active_count: 0,
            refresh_time: first_refresh,
            is_sleeping: false,
            act_ready: Some(0),
            faw_ready: [0; 4],
            read_ready: 0,
            write_ready: 0,
            powerup_ready: None,
        }
    }

    /// Earliest cycle `kind` is legal, combining bank and rank-wide
    /// constraints. `None` means not currently legal.
    pub fn ready_time(&self, kind: CommandType, bank: usize, row: u32) -> Option<u64> {
        match kind {
            CommandType::Activate => {
                let bank_ready = self.banks[bank].ready_time(kind, row)?;
                let rank_ready = self.act_ready?;
                Some(bank_ready.max(rank_ready).max(self.faw_ready[0]))
            }
            CommandType::Precharge => self.banks[bank].ready_time(kind, row),
            CommandType::Read | CommandType::ReadPrecharge => {
                let bank_ready = self.banks[bank].ready_time(kind, row)?;
                Some(bank_ready.max(self.read_ready))
            }
            CommandType::Write | CommandType::WritePrecharge => {
                let bank_ready = self.banks[bank].ready_time(kind, row)?;
                Some(bank_ready.max(self.write_ready))
            }
            CommandType::Refresh => self
                .banks
                .iter()
                .try_fold(0u64, |acc, bank| {
                    bank.ready_time(CommandType::Activate, 0).map(|r| acc.max(r))
                }),
            CommandType::Powerup => Some(self.powerup_ready.unwrap_or(0)),
            CommandType::Powerdown => (self.active_count == 0).then_some(0),
        }
    }

    /// Applies `kind` at `clock`, cascading into the target bank, and
    /// returns the data-beat completion cycle.
    pub fn finish(
        &mut self,
        clock: u64,
        kind: CommandType,
        bank: usize,
        row: u32,
        timing: &RankTiming,
        bank_timing: &BankTiming,
    ) -> u64 {
        match kind {
            CommandType::Activate => {
                let finish = self.banks[bank].finish(clock, kind, row, bank_timing);
                self.act_ready = Some(clock + u64::from(timing.act_to_act));
                self.faw_ready.rotate_left(1);
                self.faw_ready[3] = clock + u64::from(timing.act_to_faw);
                self.active_count += 1;
                finish
            }
            CommandType::Precharge => {
                let finish = self.banks[bank].finish(clock, kind, row, bank_timing);
                self.active_count -= 1;
                finish
            }
            CommandType::Read | CommandType::ReadPrecharge => {
                let finish = self.banks[bank].finish(clock, kind, row, bank_timing);
                self.read_ready = clock + u64::from(timing.read_to_read);
                self.write_ready = clock + u64::from(timing.read_to_write);
                if kind == CommandType::ReadPrecharge {
                    self.active_count -= 1;
                }
                finish
            }
            CommandType::Write | CommandType::WritePrecharge => {
                let finish = self.banks[bank].finish(clock, kind, row, bank_timing);
                self.read_ready = clock + u64::from(timing.write_to_read);
                self.write_ready = clock + u64::from(timing.write_to_write);
                if kind == CommandType::WritePrecharge {
                    self.active_count -= 1;
                }
                finish
            }
            CommandType::Refresh => {
                for b in &mut self.banks {
                    b.set_act_ready_after_refresh(clock + u64::from(timing.refresh_latency));
                }
                self.act_ready = Some(clock + u64::from(timing.refresh_latency));
                self.faw_ready = [clock + u64::from(timing.refresh_latency); 4];
                self.refresh_time += u64::from(timing.refresh_interval);
                clock
            }
            CommandType::Powerdown => {
                self.act_ready = None;
                self.faw_ready = [u64::MAX; 4];
                self.powerup_ready = Some(clock + u64::from(timing.powerdown_latency));
                self.is_sleeping = true;
                clock
            }
            CommandType::Powerup => {
                let ready = clock + u64::from(timing.powerup_latency);
                self.act_ready = Some(ready);
                self.faw_ready = [ready; 4];
                self.powerup_ready = None;
                self.is_sleeping = false;
                clock
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rank_timing() -> RankTiming {
        RankTiming {
            act_to_act: 4,
            act_to_faw: 16,
            read_to_read: 4,
            read_to_write: 6,
            write_to_read: 9,
            write_to_write: 4,
            refresh_latency: 64,
            refresh_interval: 3120,
            powerdown_latency: 3,
            powerup_latency: 3,
        }
    }

    fn bank_timing() -> BankTiming {
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
    fn faw_window_gates_the_fifth_activation() {
        let mut rank = RankState::new(4, 3120);
        let rt = rank_timing();
        let bt = bank_timing();
        for bank in 0..4 {
            let ready = rank.ready_time(CommandType::Activate, bank, 0).unwrap();
            let _ = rank.finish(ready, CommandType::Activate, bank, 0, &rt, &bt);
        }
        // A fifth activation on a distinct (already-precharged) bank would
        // need a fifth bank; reuse bank 0 after precharging it and confirm
        // the FAW floor from the first activation still applies.
        let _ = rank.finish(100, CommandType::Precharge, 0, 0, &rt, &bt);
        let ready = rank.ready_time(CommandType::Activate, 0, 1).unwrap();
        assert!(ready >= 16, "fifth activation must respect tFAW: got {ready}");
    }

    #[test]
    fn powerdown_blocks_activate_until_powerup() {
        let mut rank = RankState::new(2, 3120);
        let rt = rank_timing();
        let bt = bank_timing();
        assert_eq!(rank.ready_time(CommandType::Powerdown, 0, 0), Some(0));
        let _ = rank.finish(0, CommandType::Powerdown, 0, 0, &rt, &bt);
        assert!(rank.ready_time(CommandType::Activate, 0, 0).is_none());
        let powerup_ready = rank.ready_time(CommandType::Powerup, 0, 0).unwrap();
        let _ = rank.finish(powerup_ready, CommandType::Powerup, 0, 0, &rt, &bt);
        assert!(rank.ready_time(CommandType::Activate, 0, 0).is_some());
    }
}
