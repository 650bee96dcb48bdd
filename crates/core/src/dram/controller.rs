//! Per-channel scheduler: transforms admitted Requests into a legal stream
//! of DRAM commands under FR-FCFS, row-first scheduling, with refresh and
//! power-down woven in.

use crate::common::queue::SlabQueue;
use crate::config::DerivedConfig;
use crate::stats::Stats;

use super::channel::ChannelState;
use super::command::{Command, CommandType};
use super::coords::Coordinates;
use super::request::{Request, RequestArena, RequestId, Transaction};

/// One channel's worth of scheduling state: its three queues and its
/// Channel/Rank/Bank hierarchy.
pub struct Controller {
    pub id: u32,
    channel: ChannelState,
    request_queue: SlabQueue<RequestId>,
    transaction_queue: SlabQueue<Transaction>,
    command_queue: SlabQueue<Command>,
    requests: RequestArena,
    config: DerivedConfig,
    pub stats: Stats,
}

impl Controller {
    pub fn new(id: u32, config: DerivedConfig) -> Self {
        let channel = ChannelState::new(
            config.n_rank as usize,
            config.n_bank as usize,
            config.rank_timing.refresh_interval,
        );
        let arena_capacity = config.queues.request + config.queues.transaction + config.queues.command;
        Self {
            id,
            channel,
            request_queue: SlabQueue::new(config.queues.request),
            transaction_queue: SlabQueue::new(config.queues.transaction),
            command_queue: SlabQueue::new(config.queues.command),
            requests: RequestArena::new(arena_capacity),
            config,
            stats: Stats::default(),
        }
    }

    /// Enqueues a Request for this channel. Returns `false` if the request
    /// queue is full.
    pub fn submit(&mut self, clock: u64, address: u64, is_write: bool) -> bool {
        if self.request_queue.is_full() {
            return false;
        }
        let Some(id) = self.requests.insert(Request {
            address,
            is_write,
            allocate_time: clock,
            release_time: None,
        }) else {
            return false;
        };
        let _ = self.request_queue.push_back(id);
        true
    }

    pub fn request(&self, id: RequestId) -> Option<&Request> {
        self.requests.get(id)
    }

    /// Advances this channel by one cycle, running phases (a) through (g).
    pub fn tick(&mut self, clock: u64) {
        self.admit(clock);
        self.refresh_cadence(clock);
        self.schedule_transactions(clock);
        self.lazy_precharge(clock);
        self.power_down(clock);
        self.retire_commands(clock);
        self.retire_requests(clock);
        for rank in &self.channel.ranks {
            self.stats.record_background_cycle(rank.is_sleeping, &self.config.energy);
        }
    }

    /// (a) Admit: requestQueue → transactionQueue, gated by
    /// `transaction_delay` and transactionQueue room. Stops at the first
    /// stall (in-order admit).
    fn admit(&mut self, clock: u64) {
        loop {
            if self.transaction_queue.is_full() {
                break;
            }
            let Some(&id) = self.request_queue.front() else {
                break;
            };
            let Some(request) = self.requests.get(id) else {
                break;
            };
            if clock < request.allocate_time + u64::from(self.config.transaction_delay) {
                break;
            }
            let is_write = request.is_write;
            let coords = self.config.mapping.decode(request.address);
            let _ = self.request_queue.pop_front();
            let _ = self.transaction_queue.push_back(Transaction {
                request_id: id,
                coords,
                is_write,
            });
            let rank = &mut self.channel.ranks[coords.rank as usize];
            rank.demand_count += 1;
            let bank = &mut rank.banks[coords.bank as usize];
            bank.demand_count += 1;
            if bank.row.tag == Some(coords.row) {
                bank.supply_count += 1;
            }
        }
    }

    /// (b) Refresh cadence: wake, precharge, and refresh each due rank, one
    /// guarded step per tick so a stall just leaves it mid-sequence.
    fn refresh_cadence(&mut self, clock: u64) {
        for rank_idx in 0..self.channel.ranks.len() {
            let rank = &self.channel.ranks[rank_idx];
            if rank.refresh_time > clock {
                continue;
            }
            if rank.is_sleeping {
                let coords = Coordinates { channel: self.id, rank: rank_idx as u32, bank: 0, row: 0, column: 0 };
                let _ = self.try_issue(clock, CommandType::Powerup, coords, None);
                continue;
            }
            if let Some(bank_idx) = rank.banks.iter().position(|b| b.is_open()) {
                let row = rank.banks[bank_idx].row.tag.expect("position() found an open bank");
                let coords = Coordinates { channel: self.id, rank: rank_idx as u32, bank: bank_idx as u32, row, column: 0 };
                let _ = self.try_issue(clock, CommandType::Precharge, coords, None);
                continue;
            }
            let coords = Coordinates { channel: self.id, rank: rank_idx as u32, bank: 0, row: 0, column: 0 };
            let _ = self.try_issue(clock, CommandType::Refresh, coords, None);
        }
    }

    /// (c) Transaction → Command: FR-FCFS, row-first. Each Transaction
    /// falls through PRE → ACT → terminal READ/WRITE in a single call,
    /// advancing as far as `try_issue`'s FR-FCFS ready-time gate allows
    /// this tick and stalling at whichever step isn't yet ready, mirroring
    /// the upstream controller's per-cycle fall-through.
    fn schedule_transactions(&mut self, clock: u64) {
        let snapshot: Vec<Transaction> = self.transaction_queue.iter().copied().collect();
        for t in snapshot {
            let rank_idx = t.coords.rank as usize;
            let bank_idx = t.coords.bank as usize;

            if clock >= self.channel.ranks[rank_idx].refresh_time {
                continue;
            }
            if self.channel.ranks[rank_idx].is_sleeping {
                let _ = self.try_issue(clock, CommandType::Powerup, t.coords, None);
                continue;
            }

            let mut row = self.channel.ranks[rank_idx].banks[bank_idx].row.tag;
            let hits = self.channel.ranks[rank_idx].banks[bank_idx].row.hits;

            if let Some(open_row) = row {
                if open_row != t.coords.row || hits >= self.config.policy.max_row_hits {
                    let supply = self.channel.ranks[rank_idx].banks[bank_idx].supply_count;
                    if open_row != t.coords.row && supply > 0 {
                        continue;
                    }
                    let pre_coords = Coordinates { row: open_row, ..t.coords };
                    if self.try_issue(clock, CommandType::Precharge, pre_coords, None).is_some() {
                        row = None;
                    } else {
                        continue;
                    }
                }
            }

            if row.is_none() {
                if self.try_issue(clock, CommandType::Activate, t.coords, None).is_some() {
                    row = Some(t.coords.row);
                    self.recompute_supply_count(rank_idx, bank_idx, t.coords.row);
                } else {
                    continue;
                }
            }

            if row == Some(t.coords.row) {
                let kind = if t.is_write { CommandType::Write } else { CommandType::Read };
                if self.try_issue(clock, kind, t.coords, Some(t.request_id)).is_some() {
                    let rank = &mut self.channel.ranks[rank_idx];
                    rank.demand_count = rank.demand_count.saturating_sub(1);
                    let bank = &mut rank.banks[bank_idx];
                    bank.demand_count = bank.demand_count.saturating_sub(1);
                    bank.supply_count = bank.supply_count.saturating_sub(1);
                    let _ = self.transaction_queue
                        .remove_first(|x| x.request_id == t.request_id);
                }
            }
        }
    }

    /// Rescans the transaction queue for Transactions matching the just-
    /// opened `(rank, bank, row)`, the resolved approach to `supplyCount`
    /// bookkeeping (self-correcting, no decrement path needed at removal).
    fn recompute_supply_count(&mut self, rank_idx: usize, bank_idx: usize, row: u32) {
        let count = self
            .transaction_queue
            .iter()
            .filter(|t| t.coords.rank as usize == rank_idx && t.coords.bank as usize == bank_idx && t.coords.row == row)
            .count() as u32;
        self.channel.ranks[rank_idx].banks[bank_idx].supply_count = count;
    }

    /// (d) Lazy precharge: close banks idle for `max_row_idle` cycles with
    /// no pending demand, back-dating the nominal issue cycle but checking
    /// bus occupancy against the real clock.
    fn lazy_precharge(&mut self, clock: u64) {
        let max_row_idle = u64::from(self.config.policy.max_row_idle);
        let backdated = clock.saturating_sub(max_row_idle);

        for rank_idx in 0..self.channel.ranks.len() {
            for bank_idx in 0..self.channel.ranks[rank_idx].banks.len() {
                let bank = &self.channel.ranks[rank_idx].banks[bank_idx];
                if bank.demand_count != 0 {
                    continue;
                }
                let Some(row) = bank.row.tag else { continue };
                let Some(pre_ready) = bank.precharge_ready() else { continue };
                if pre_ready > backdated {
                    continue;
                }
                if self.channel.bus_ready() > clock {
                    continue;
                }
                if self.command_queue.is_full() {
                    continue;
                }
                let coords = Coordinates { channel: self.id, rank: rank_idx as u32, bank: bank_idx as u32, row, column: 0 };
                let finish_time = self.channel.finish(
                    backdated,
                    CommandType::Precharge,
                    coords,
                    &self.config.channel_timing,
                    &self.config.rank_timing,
                    &self.config.bank_timing,
                );
                self.stats.record_command(CommandType::Precharge, &self.config.energy);
                let _ = self.command_queue.push_back(Command {
                    kind: CommandType::Precharge,
                    coords,
                    issue_time: backdated,
                    finish_time,
                    request_id: None,
                });
            }
        }
    }

    /// (e) Power-down: idle, non-refreshing ranks enter the low-power
    /// state opportunistically.
    fn power_down(&mut self, clock: u64) {
        for rank_idx in 0..self.channel.ranks.len() {
            let rank = &self.channel.ranks[rank_idx];
            if rank.is_sleeping || rank.demand_count != 0 || rank.active_count != 0 {
                continue;
            }
            if clock >= rank.refresh_time {
                continue;
            }
            let coords = Coordinates { channel: self.id, rank: rank_idx as u32, bank: 0, row: 0, column: 0 };
            let _ = self.try_issue(clock, CommandType::Powerdown, coords, None);
        }
    }

    /// (f) Command retirement: drain the command queue head while its
    /// issue time has elapsed, stamping each data command's Request with
    /// its already-known completion cycle.
    fn retire_commands(&mut self, clock: u64) {
        while let Some(front) = self.command_queue.front() {
            if front.issue_time > clock {
                break;
            }
            let command = self.command_queue.pop_front().expect("front() just confirmed a head entry");
            if let Some(request_id) = command.request_id
                && let Some(request) = self.requests.get_mut(request_id)
            {
                request.release_time = Some(command.finish_time);
            }
        }
    }

    /// (g) Request retirement: drop Requests whose data beat has
    /// completed.
    fn retire_requests(&mut self, clock: u64) {
        for id in self.requests.retirable(clock) {
            if let Some(request) = self.requests.remove(id) {
                let release_time = request.release_time.expect("retirable() only returns requests with a release time");
                self.stats.record_retirement(request.allocate_time, release_time);
            }
        }
    }

    /// addCommand: the issue guard shared by every phase that wants to
    /// place a command on the bus. Rejects on queue-full or on an
    /// unmet FR-FCFS ready time; otherwise mutates channel/rank/bank state
    /// and appends the command.
    fn try_issue(
        &mut self,
        clock: u64,
        kind: CommandType,
        coords: Coordinates,
        request_id: Option<RequestId>,
    ) -> Option<u64> {
        if self.command_queue.is_full() {
            return None;
        }
        let ready_time = self.channel.ready_time(kind, coords)?;
        let issue_time = clock + u64::from(self.config.command_delay);
        if ready_time > issue_time {
            return None;
        }
        let finish_time = self.channel.finish(
            issue_time,
            kind,
            coords,
            &self.config.channel_timing,
            &self.config.rank_timing,
            &self.config.bank_timing,
        );
        #[cfg(feature = "trace-commands")]
        tracing::trace!(channel = self.id, ?kind, ?coords, issue_time, finish_time, "issued command");
        self.stats.record_command(kind, &self.config.energy);
        let _ = self.command_queue.push_back(Command { kind, coords, issue_time, finish_time, request_id });
        Some(finish_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn controller() -> Controller {
        let derived = Config::default().derive().unwrap();
        Controller::new(0, derived)
    }

    #[test]
    fn submit_rejects_once_the_request_queue_is_full() {
        let mut config = Config::default();
        config.queues.request = 1;
        let mut controller = Controller::new(0, config.derive().unwrap());

        assert!(controller.submit(0, 0x40, false));
        assert!(!controller.submit(0, 0x80, false), "second submit must be rejected while the first is still queued");
    }

    #[test]
    fn admit_stalls_until_transaction_delay_has_elapsed() {
        let mut config = Config::default();
        config.timing.transaction_delay = 10;
        let mut controller = Controller::new(0, config.derive().unwrap());

        assert!(controller.submit(0, 0x40, false));
        for clock in 0..9 {
            controller.tick(clock);
            assert_eq!(controller.transaction_queue.len(), 0, "admit must not run before transaction_delay at clock {clock}");
        }
        controller.tick(10);
        assert_eq!(controller.transaction_queue.len(), 1);
    }

    #[test]
    fn a_single_read_retires_with_a_recorded_latency() {
        let mut controller = controller();
        assert!(controller.submit(0, 0x40, false));
        for clock in 0..40 {
            controller.tick(clock);
        }
        assert_eq!(controller.stats.retired_requests, 1);
        assert!(controller.stats.latency_sum > 0);
    }

    #[test]
    fn try_issue_refuses_a_command_queue_that_is_already_full() {
        let mut config = Config::default();
        config.queues.command = 0;
        let mut controller = Controller::new(0, config.derive().unwrap());
        let coords = Coordinates { channel: 0, rank: 0, bank: 0, row: 0, column: 0 };
        assert_eq!(controller.try_issue(0, CommandType::Activate, coords, None), None);
    }
}
