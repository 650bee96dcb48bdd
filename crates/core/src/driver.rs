//! Top-level runner: owns a [`ControllerHub`] and a trace, and pumps them
//! in lockstep until the trace is exhausted or a caller-supplied cycle
//! budget is reached.

use std::io::BufRead;

use crate::common::error::{ConfigError, TraceError};
use crate::config::Config;
use crate::dram::ControllerHub;
use crate::stats::Stats;
use crate::trace::{TraceEntry, TraceReader};

/// Drives a [`ControllerHub`] cycle-by-cycle against a trace; the thing the
/// `dramsim` binary and integration tests actually run. Contains no DRAM
/// timing logic of its own.
pub struct Driver {
    hub: ControllerHub,
    max_clock: Option<u64>,
    clock: u64,
}

impl Driver {
    pub fn new(config: &Config, max_clock: Option<u64>) -> Result<Self, ConfigError> {
        Ok(Self {
            hub: ControllerHub::new(config)?,
            max_clock,
            clock: 0,
        })
    }

    /// Runs the trace to completion: each cycle admits entries whose
    /// arrival cycle has come due, then ticks the hub once. Stops when the
    /// trace is exhausted or `max_clock` is reached.
    pub fn run<R: BufRead>(&mut self, trace: R) -> Result<Stats, TraceError> {
        let mut reader = TraceReader::new(trace);
        let mut pending: Option<TraceEntry> = None;
        let mut exhausted = false;

        loop {
            if let Some(limit) = self.max_clock
                && self.clock >= limit
            {
                break;
            }

            if pending.is_none() && !exhausted {
                pending = match reader.next() {
                    Some(Ok(entry)) => Some(entry),
                    Some(Err(err)) => return Err(err),
                    None => {
                        exhausted = true;
                        None
                    }
                };
            }

            while let Some(entry) = pending {
                if entry.arrival_cycle > self.clock {
                    break;
                }
                if !self.hub.submit(self.clock, entry.address, entry.is_write) {
                    break;
                }
                pending = match reader.next() {
                    Some(Ok(next)) => Some(next),
                    Some(Err(err)) => return Err(err),
                    None => {
                        exhausted = true;
                        None
                    }
                };
            }

            self.hub.tick(self.clock);
            self.clock += 1;

            if exhausted && pending.is_none() {
                break;
            }
        }

        let mut stats = self.hub.stats();
        stats.cycles = self.clock;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn retires_a_single_read_and_reports_nonzero_latency() {
        let config = Config::default();
        let mut driver = Driver::new(&config, Some(200)).unwrap();
        let trace = Cursor::new("0x0 READ 0\n");
        let stats = driver.run(trace).unwrap();
        assert_eq!(stats.retired_requests, 1);
        assert!(stats.read_count >= 1);
    }

    #[test]
    fn stops_at_max_clock_even_with_trace_remaining() {
        let config = Config::default();
        let mut driver = Driver::new(&config, Some(5)).unwrap();
        let trace = Cursor::new("0x0 READ 0\n0x1000 READ 1000\n");
        let stats = driver.run(trace).unwrap();
        assert_eq!(stats.cycles, 5);
    }

    #[test]
    fn surfaces_a_trace_parse_error() {
        let config = Config::default();
        let mut driver = Driver::new(&config, Some(200)).unwrap();
        let trace = Cursor::new("garbage\n");
        assert!(driver.run(trace).is_err());
    }
}
