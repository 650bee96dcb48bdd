//! ControllerHub: demultiplexes Requests to per-channel controllers and
//! advances them in lock-step.

use crate::common::error::ConfigError;
use crate::config::Config;
use crate::stats::Stats;

use super::controller::Controller;
use super::coords::BitField;

/// Owns one [`Controller`] per channel and dispatches on the address's
/// decoded channel field. Controllers are advanced sequentially in id
/// order each tick; there is no cross-channel shared mutable state, so
/// this is equivalent to (and simpler than) parallelizing across channels.
pub struct ControllerHub {
    channel_field: BitField,
    controllers: Vec<Controller>,
}

impl ControllerHub {
    /// Builds a hub, precomputing all derived timings and staggering each
    /// rank's first refresh so rank `r` of channel `c` first refreshes at
    /// `tREFI*(r+1)/nRank`.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let derived = config.derive()?;
        let channel_field = derived.mapping.channel;
        let n_channel = derived.n_channel;
        let controllers = (0..n_channel)
            .map(|id| Controller::new(id, derived.clone()))
            .collect();
        Ok(Self { channel_field, controllers })
    }

    /// Enqueues a Request on the channel decoded from `address`. Returns
    /// `false` if that channel's request queue is full.
    pub fn submit(&mut self, clock: u64, address: u64, is_write: bool) -> bool {
        let channel = self.channel_field.value(address) as usize;
        self.controllers[channel].submit(clock, address, is_write)
    }

    /// Advances every controller by one cycle.
    pub fn tick(&mut self, clock: u64) {
        for controller in &mut self.controllers {
            controller.tick(clock);
        }
    }

    /// Combines every controller's counters into one report.
    pub fn stats(&self) -> Stats {
        let mut merged = Stats::default();
        for controller in &self.controllers {
            merged.merge(&controller.stats);
        }
        merged
    }
}
