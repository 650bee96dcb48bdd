//! Recoverable error types.
//!
//! Everything else in the core is a guarded assertion: state/timing
//! invariants that legal external input can never violate, and whose
//! violation signals an implementation bug rather than something a caller
//! can recover from. The two error types here cover the actual recoverable
//! boundaries: a pathological configuration, and a malformed trace line.

/// A configuration value (or combination of values) that would make the
/// timing engine produce nonsensical ready-times.
///
/// Returned by [`crate::config::Config::derive`] rather than discovered
/// later as a silently-wrong simulation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// `tRCD` must be at least `tAL`, since `act_to_read = tRCD - tAL`.
    #[error("tRCD ({t_rcd}) must be >= tAL ({t_al})")]
    RasToColumnBelowAdditiveLatency {
        /// Configured `tRCD`.
        t_rcd: u32,
        /// Configured `tAL`.
        t_al: u32,
    },

    /// `tRAS` must be at least `tRCD`, since a row must stay open at least
    /// long enough to complete its own activation-to-read window.
    #[error("tRAS ({t_ras}) must be >= tRCD ({t_rcd})")]
    RowActiveBelowRasToColumn {
        /// Configured `tRAS`.
        t_ras: u32,
        /// Configured `tRCD`.
        t_rcd: u32,
    },

    /// `tRC` (the full activate-to-activate row cycle) must be at least
    /// `tRAS + tRP`, otherwise the engine would allow overlapping row
    /// lifetimes on the same bank.
    #[error("tRC ({t_rc}) must be >= tRAS + tRP ({sum})")]
    RowCycleBelowRasPlusPrecharge {
        /// Configured `tRC`.
        t_rc: u32,
        /// `tRAS + tRP`.
        sum: u32,
    },

    /// Geometry widths (channel/rank/bank/row/column/line) must sum to no
    /// more than 64 bits, since addresses are decoded from a `u64`.
    #[error("address field widths sum to {total} bits, which exceeds 64")]
    AddressFieldsOverflow {
        /// Sum of all configured field widths.
        total: u32,
    },

    /// A queue capacity of zero can never hold anything, which makes the
    /// controller permanently stalled.
    #[error("{queue} queue capacity must be > 0")]
    ZeroQueueCapacity {
        /// Name of the queue (`"transaction"`, `"command"`, or `"request"`).
        queue: &'static str,
    },
}

/// A malformed line in a memory reference trace.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TraceError {
    /// The line did not match `0x<hex address> <command> <arrival cycle>`.
    #[error("line {line_no}: does not match '0x<addr> <CMD> <cycle>': {text:?}")]
    Malformed {
        /// 1-based line number in the trace file.
        line_no: usize,
        /// The offending line, verbatim.
        text: String,
    },

    /// The address field was not valid hex.
    #[error("line {line_no}: invalid hex address {text:?}")]
    InvalidAddress {
        /// 1-based line number in the trace file.
        line_no: usize,
        /// The offending address token.
        text: String,
    },

    /// The arrival-cycle field was not a valid non-negative integer.
    #[error("line {line_no}: invalid arrival cycle {text:?}")]
    InvalidCycle {
        /// 1-based line number in the trace file.
        line_no: usize,
        /// The offending cycle token.
        text: String,
    },

    /// An I/O error occurred while reading the trace.
    #[error("I/O error reading trace: {0}")]
    Io(String),
}
