//! Channel: command-bus occupancy and cross-rank data-bus turnaround.

use crate::config::{BankTiming, ChannelTiming, RankTiming};

use super::command::CommandType;
use super::coords::Coordinates;
use super::rank::RankState;

/// Per-channel command-bus and cross-rank bus-turnaround tracking.
#[derive(Debug, Clone)]
pub struct ChannelState {
    pub ranks: Vec<RankState>,
    /// Rank that last drove the data bus, if any.
    rank_select: Option<u32>,
    any_ready: u64,
    read_ready: u64,
    write_ready: u64,
}

impl ChannelState {
    pub fn new(n_rank: usize, n_bank: usize, tref: u32) -> Self {
        let ranks = (0..n_rank)
            .map(|r| RankState::new(n_bank, u64::from(tref) * u64::from(r as u32 + 1) / n_rank as u64))
            .collect();
        Self {
            ranks,
            rank_select: None,
            any_ready: 0,
            read_ready: 0,
            write_ready: 0,
        }
    }

    /// The cycle the command bus itself is next free, ignoring rank/bank
    /// readiness. Used by the lazy-precharge policy's bus-occupancy check,
    /// which is evaluated against the real clock even when the precharge's
    /// own bookkeeping is back-dated.
    pub fn bus_ready(&self) -> u64 {
        self.any_ready
    }

    /// Earliest cycle `kind` may be placed on the command bus, combining
    /// the rank/bank answer with bus-serialization and cross-rank
    /// turnaround constraints already folded into `any_ready`/`read_ready`/
    /// `write_ready` by the most recent `finish` call.
    pub fn ready_time(&self, kind: CommandType, coords: Coordinates) -> Option<u64> {
        let rank = &self.ranks[coords.rank as usize];
        let rank_ready = rank.ready_time(kind, coords.bank as usize, coords.row)?;
        let bus_ready = match kind {
            CommandType::Read | CommandType::ReadPrecharge => {
                if self.rank_select == Some(coords.rank) {
                    self.any_ready
                } else {
                    self.any_ready.max(self.read_ready)
                }
            }
            CommandType::Write | CommandType::WritePrecharge => {
                if self.rank_select == Some(coords.rank) {
                    self.any_ready
                } else {
                    self.any_ready.max(self.write_ready)
                }
            }
            _ => self.any_ready,
        };
        Some(rank_ready.max(bus_ready))
    }

    /// Applies `kind` at `clock` against `coords`, cascading into the
    /// target rank/bank, and returns the data-beat completion cycle.
    pub fn finish(
        &mut self,
        clock: u64,
        kind: CommandType,
        coords: Coordinates,
        channel_timing: &ChannelTiming,
        rank_timing: &RankTiming,
        bank_timing: &BankTiming,
    ) -> u64 {
        let finish = self.ranks[coords.rank as usize].finish(
            clock,
            kind,
            coords.bank as usize,
            coords.row,
            rank_timing,
            bank_timing,
        );

        self.any_ready = clock + u64::from(channel_timing.any_to_any);
        if kind == CommandType::Activate {
            self.any_ready = self.any_ready.max(clock + u64::from(channel_timing.act_to_any));
        }
        if kind.is_read() {
            self.read_ready = clock + u64::from(channel_timing.read_to_read);
            self.write_ready = clock + u64::from(channel_timing.read_to_write);
            self.rank_select = Some(coords.rank);
        } else if kind.is_write() {
            self.read_ready = clock + u64::from(channel_timing.write_to_read);
            self.write_ready = clock + u64::from(channel_timing.write_to_write);
            self.rank_select = Some(coords.rank);
        }

        finish
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dram::coords::Coordinates;

    fn channel_timing() -> ChannelTiming {
        ChannelTiming {
            any_to_any: 1,
            act_to_any: 1,
            read_to_read: 6,
            read_to_write: 8,
            write_to_read: 9,
            write_to_write: 6,
        }
    }

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

    fn coords(rank: u32, bank: u32, row: u32) -> Coordinates {
        Coordinates { channel: 0, rank, bank, row, column: 0 }
    }

    #[test]
    fn cross_rank_reads_pay_read_to_read_turnaround() {
        let mut channel = ChannelState::new(2, 1, 3120);
        let ct = channel_timing();
        let rt = rank_timing();
        let bt = bank_timing();

        let _ = channel.finish(0, CommandType::Activate, coords(0, 0, 1), &ct, &rt, &bt);
        let _ = channel.finish(5, CommandType::Read, coords(0, 0, 1), &ct, &rt, &bt);

        let _ = channel.finish(6, CommandType::Activate, coords(1, 0, 1), &ct, &rt, &bt);
        let ready = channel
            .ready_time(CommandType::Read, coords(1, 0, 1))
            .unwrap();
        assert!(ready >= 11, "cross-rank read must wait out read_to_read: got {ready}");
    }
}
