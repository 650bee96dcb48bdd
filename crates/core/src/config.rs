//! Configuration for the DRAM timing engine and scheduler.
//!
//! A `Config` is the user-facing, `serde`-deserializable set of primary
//! timing/geometry/policy keys. [`Config::derive`] runs once at
//! construction and folds those primary keys into the frozen per-scope
//! timing tables ([`ChannelTiming`], [`RankTiming`], [`BankTiming`]) and
//! [`EnergyCoefficients`] the engine consumes directly, plus a sanity pass
//! that rejects pathological combinations.

use serde::Deserialize;

use crate::common::error::ConfigError;
use crate::dram::coords::{AddressMapping, BitField};

/// Default configuration constants, a small DDR3-class profile.
///
/// These mirror the reference settings of the controller this simulator is
/// modeled on: 2 ranks, 8 banks, a 128-byte row buffer line, and an
/// `(max_row_idle=0, max_row_hits=5)` row-buffer policy.
mod defaults {
    pub const TRANSACTION_QUEUE: usize = 64;
    pub const COMMAND_QUEUE: usize = 64;
    pub const REQUEST_QUEUE: usize = 64;

    pub const CHANNEL_BITS: u32 = 0;
    pub const RANK_BITS: u32 = 1;
    pub const BANK_BITS: u32 = 3;
    pub const ROW_BITS: u32 = 16;
    pub const COLUMN_BITS: u32 = 7;
    pub const LINE_BITS: u32 = 6;

    pub const MAX_ROW_IDLE: u32 = 0;
    pub const MAX_ROW_HITS: u32 = 5;

    pub const TRANSACTION_DELAY: u32 = 1;
    pub const COMMAND_DELAY: u32 = 0;
    pub const T_CMD: u32 = 1;
    pub const T_RCMD: u32 = 1;

    pub const T_CL: u32 = 5;
    pub const T_CWL: u32 = 4;
    pub const T_AL: u32 = 0;
    pub const T_BL: u32 = 4;
    pub const T_RAS: u32 = 15;
    pub const T_RCD: u32 = 5;
    pub const T_RRD: u32 = 4;
    pub const T_RC: u32 = 20;
    pub const T_RP: u32 = 5;
    pub const T_CCD: u32 = 4;
    pub const T_RTP: u32 = 4;
    pub const T_WTR: u32 = 4;
    pub const T_WR: u32 = 6;
    pub const T_RTRS: u32 = 1;
    pub const T_RFC: u32 = 64;
    pub const T_REFI: u32 = 3120;
    pub const T_FAW: u32 = 16;
    pub const T_CKE: u32 = 3;
    pub const T_XP: u32 = 3;

    pub const DEVICES: u32 = 8;

    pub const IDD0: u32 = 100;
    pub const IDD2N: u32 = 50;
    pub const IDD2P: u32 = 10;
    pub const IDD2Q: u32 = 50;
    pub const IDD3N: u32 = 65;
    pub const IDD4R: u32 = 195;
    pub const IDD4W: u32 = 230;
    pub const IDD5: u32 = 275;
    pub const IDD6: u32 = 9;
}

/// Address-field widths, expressed as `log2(count)`, matching the order
/// `line, channel, column, bank, rank, row` (low bits to high bits).
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct GeometryConfig {
    #[serde(default = "GeometryConfig::default_channel")]
    pub channel: u32,
    #[serde(default = "GeometryConfig::default_rank")]
    pub rank: u32,
    #[serde(default = "GeometryConfig::default_bank")]
    pub bank: u32,
    #[serde(default = "GeometryConfig::default_row")]
    pub row: u32,
    #[serde(default = "GeometryConfig::default_column")]
    pub column: u32,
    #[serde(default = "GeometryConfig::default_line")]
    pub line: u32,
}

impl GeometryConfig {
    fn default_channel() -> u32 {
        defaults::CHANNEL_BITS
    }
    fn default_rank() -> u32 {
        defaults::RANK_BITS
    }
    fn default_bank() -> u32 {
        defaults::BANK_BITS
    }
    fn default_row() -> u32 {
        defaults::ROW_BITS
    }
    fn default_column() -> u32 {
        defaults::COLUMN_BITS
    }
    fn default_line() -> u32 {
        defaults::LINE_BITS
    }
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            channel: defaults::CHANNEL_BITS,
            rank: defaults::RANK_BITS,
            bank: defaults::BANK_BITS,
            row: defaults::ROW_BITS,
            column: defaults::COLUMN_BITS,
            line: defaults::LINE_BITS,
        }
    }
}

/// Queue capacities for the three per-controller queues.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct QueueConfig {
    #[serde(default = "QueueConfig::default_transaction")]
    pub transaction: usize,
    #[serde(default = "QueueConfig::default_command")]
    pub command: usize,
    #[serde(default = "QueueConfig::default_request")]
    pub request: usize,
}

impl QueueConfig {
    fn default_transaction() -> usize {
        defaults::TRANSACTION_QUEUE
    }
    fn default_command() -> usize {
        defaults::COMMAND_QUEUE
    }
    fn default_request() -> usize {
        defaults::REQUEST_QUEUE
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            transaction: defaults::TRANSACTION_QUEUE,
            command: defaults::COMMAND_QUEUE,
            request: defaults::REQUEST_QUEUE,
        }
    }
}

/// Row-buffer scheduling policy knobs.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PolicyConfig {
    /// Idle cycles a bank may sit open with no demand before lazy precharge
    /// closes it. `0` behaves as a closed-page policy.
    #[serde(default = "PolicyConfig::default_max_row_idle")]
    pub max_row_idle: u32,
    /// Row-hit cap before the scheduler forces a precharge even if the next
    /// Transaction targets the same row.
    #[serde(default = "PolicyConfig::default_max_row_hits")]
    pub max_row_hits: u32,
}

impl PolicyConfig {
    fn default_max_row_idle() -> u32 {
        defaults::MAX_ROW_IDLE
    }
    fn default_max_row_hits() -> u32 {
        defaults::MAX_ROW_HITS
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            max_row_idle: defaults::MAX_ROW_IDLE,
            max_row_hits: defaults::MAX_ROW_HITS,
        }
    }
}

/// Primary JEDEC timing parameters and the two gate delays, all in clock
/// cycles. These are the raw knobs; [`Config::derive`] folds them into the
/// per-scope tables the engine actually consumes.
#[derive(Debug, Clone, Copy, Deserialize)]
#[allow(non_snake_case)]
pub struct TimingConfig {
    #[serde(default = "TimingConfig::default_transaction_delay")]
    pub transaction_delay: u32,
    #[serde(default = "TimingConfig::default_command_delay")]
    pub command_delay: u32,
    #[serde(default = "TimingConfig::default_t_cmd")]
    pub tCMD: u32,
    #[serde(default = "TimingConfig::default_t_rcmd")]
    pub tRCMD: u32,
    #[serde(default = "TimingConfig::default_t_cl")]
    pub tCL: u32,
    #[serde(default = "TimingConfig::default_t_cwl")]
    pub tCWL: u32,
    #[serde(default = "TimingConfig::default_t_al")]
    pub tAL: u32,
    #[serde(default = "TimingConfig::default_t_bl")]
    pub tBL: u32,
    #[serde(default = "TimingConfig::default_t_ras")]
    pub tRAS: u32,
    #[serde(default = "TimingConfig::default_t_rcd")]
    pub tRCD: u32,
    #[serde(default = "TimingConfig::default_t_rrd")]
    pub tRRD: u32,
    #[serde(default = "TimingConfig::default_t_rc")]
    pub tRC: u32,
    #[serde(default = "TimingConfig::default_t_rp")]
    pub tRP: u32,
    #[serde(default = "TimingConfig::default_t_ccd")]
    pub tCCD: u32,
    #[serde(default = "TimingConfig::default_t_rtp")]
    pub tRTP: u32,
    #[serde(default = "TimingConfig::default_t_wtr")]
    pub tWTR: u32,
    #[serde(default = "TimingConfig::default_t_wr")]
    pub tWR: u32,
    #[serde(default = "TimingConfig::default_t_rtrs")]
    pub tRTRS: u32,
    #[serde(default = "TimingConfig::default_t_rfc")]
    pub tRFC: u32,
    #[serde(default = "TimingConfig::default_t_refi")]
    pub tREFI: u32,
    #[serde(default = "TimingConfig::default_t_faw")]
    pub tFAW: u32,
    #[serde(default = "TimingConfig::default_t_cke")]
    pub tCKE: u32,
    #[serde(default = "TimingConfig::default_t_xp")]
    pub tXP: u32,
}

impl TimingConfig {
    fn default_transaction_delay() -> u32 {
        defaults::TRANSACTION_DELAY
    }
    fn default_command_delay() -> u32 {
        defaults::COMMAND_DELAY
    }
    fn default_t_cmd() -> u32 {
        defaults::T_CMD
    }
    fn default_t_rcmd() -> u32 {
        defaults::T_RCMD
    }
    fn default_t_cl() -> u32 {
        defaults::T_CL
    }
    fn default_t_cwl() -> u32 {
        defaults::T_CWL
    }
    fn default_t_al() -> u32 {
        defaults::T_AL
    }
    fn default_t_bl() -> u32 {
        defaults::T_BL
    }
    fn default_t_ras() -> u32 {
        defaults::T_RAS
    }
    fn default_t_rcd() -> u32 {
        defaults::T_RCD
    }
    fn default_t_rrd() -> u32 {
        defaults::T_RRD
    }
    fn default_t_rc() -> u32 {
        defaults::T_RC
    }
    fn default_t_rp() -> u32 {
        defaults::T_RP
    }
    fn default_t_ccd() -> u32 {
        defaults::T_CCD
    }
    fn default_t_rtp() -> u32 {
        defaults::T_RTP
    }
    fn default_t_wtr() -> u32 {
        defaults::T_WTR
    }
    fn default_t_wr() -> u32 {
        defaults::T_WR
    }
    fn default_t_rtrs() -> u32 {
        defaults::T_RTRS
    }
    fn default_t_rfc() -> u32 {
        defaults::T_RFC
    }
    fn default_t_refi() -> u32 {
        defaults::T_REFI
    }
    fn default_t_faw() -> u32 {
        defaults::T_FAW
    }
    fn default_t_cke() -> u32 {
        defaults::T_CKE
    }
    fn default_t_xp() -> u32 {
        defaults::T_XP
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            transaction_delay: defaults::TRANSACTION_DELAY,
            command_delay: defaults::COMMAND_DELAY,
            tCMD: defaults::T_CMD,
            tRCMD: defaults::T_RCMD,
            tCL: defaults::T_CL,
            tCWL: defaults::T_CWL,
            tAL: defaults::T_AL,
            tBL: defaults::T_BL,
            tRAS: defaults::T_RAS,
            tRCD: defaults::T_RCD,
            tRRD: defaults::T_RRD,
            tRC: defaults::T_RC,
            tRP: defaults::T_RP,
            tCCD: defaults::T_CCD,
            tRTP: defaults::T_RTP,
            tWTR: defaults::T_WTR,
            tWR: defaults::T_WR,
            tRTRS: defaults::T_RTRS,
            tRFC: defaults::T_RFC,
            tREFI: defaults::T_REFI,
            tFAW: defaults::T_FAW,
            tCKE: defaults::T_CKE,
            tXP: defaults::T_XP,
        }
    }
}

/// Per-device current draws (mA) and device count, used to derive
/// [`EnergyCoefficients`].
#[derive(Debug, Clone, Copy, Deserialize)]
#[allow(non_snake_case)]
pub struct EnergyConfig {
    #[serde(default = "EnergyConfig::default_idd0")]
    pub IDD0: u32,
    #[serde(default = "EnergyConfig::default_idd2n")]
    pub IDD2N: u32,
    #[serde(default = "EnergyConfig::default_idd2p")]
    pub IDD2P: u32,
    #[serde(default = "EnergyConfig::default_idd2q")]
    pub IDD2Q: u32,
    #[serde(default = "EnergyConfig::default_idd3n")]
    pub IDD3N: u32,
    #[serde(default = "EnergyConfig::default_idd4r")]
    pub IDD4R: u32,
    #[serde(default = "EnergyConfig::default_idd4w")]
    pub IDD4W: u32,
    #[serde(default = "EnergyConfig::default_idd5")]
    pub IDD5: u32,
    #[serde(default = "EnergyConfig::default_idd6")]
    pub IDD6: u32,
    #[serde(default = "EnergyConfig::default_devices")]
    pub devices: u32,
}

impl EnergyConfig {
    fn default_idd0() -> u32 {
        defaults::IDD0
    }
    fn default_idd2n() -> u32 {
        defaults::IDD2N
    }
    fn default_idd2p() -> u32 {
        defaults::IDD2P
    }
    fn default_idd2q() -> u32 {
        defaults::IDD2Q
    }
    fn default_idd3n() -> u32 {
        defaults::IDD3N
    }
    fn default_idd4r() -> u32 {
        defaults::IDD4R
    }
    fn default_idd4w() -> u32 {
        defaults::IDD4W
    }
    fn default_idd5() -> u32 {
        defaults::IDD5
    }
    fn default_idd6() -> u32 {
        defaults::IDD6
    }
    fn default_devices() -> u32 {
        defaults::DEVICES
    }
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            IDD0: defaults::IDD0,
            IDD2N: defaults::IDD2N,
            IDD2P: defaults::IDD2P,
            IDD2Q: defaults::IDD2Q,
            IDD3N: defaults::IDD3N,
            IDD4R: defaults::IDD4R,
            IDD4W: defaults::IDD4W,
            IDD5: defaults::IDD5,
            IDD6: defaults::IDD6,
            devices: defaults::DEVICES,
        }
    }
}

/// Root configuration, deserializable from JSON or built via
/// [`Config::default`] for the CLI.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub geometry: GeometryConfig,
    #[serde(default)]
    pub queues: QueueConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub energy: EnergyConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            geometry: GeometryConfig::default(),
            queues: QueueConfig::default(),
            policy: PolicyConfig::default(),
            timing: TimingConfig::default(),
            energy: EnergyConfig::default(),
        }
    }
}

/// Command-bus and cross-rank turnaround timings, frozen per channel.
#[derive(Debug, Clone, Copy)]
pub struct ChannelTiming {
    pub any_to_any: u32,
    pub act_to_any: u32,
    pub read_to_read: u32,
    pub read_to_write: u32,
    pub write_to_read: u32,
    pub write_to_write: u32,
}

/// Rank-wide bus and refresh/power timings, frozen per rank.
#[derive(Debug, Clone, Copy)]
pub struct RankTiming {
    pub act_to_act: u32,
    pub act_to_faw: u32,
    pub read_to_read: u32,
    pub read_to_write: u32,
    pub write_to_read: u32,
    pub write_to_write: u32,
    pub refresh_latency: u32,
    pub refresh_interval: u32,
    pub powerdown_latency: u32,
    pub powerup_latency: u32,
}

/// Leaf bank timings, frozen per bank.
#[derive(Debug, Clone, Copy)]
pub struct BankTiming {
    pub act_to_read: u32,
    pub act_to_write: u32,
    pub act_to_pre: u32,
    pub read_to_pre: u32,
    pub write_to_pre: u32,
    pub pre_to_act: u32,
    pub read_to_data: u32,
    pub write_to_data: u32,
}

/// Per-event energy coefficients plus background currents, all already
/// scaled by device count.
#[derive(Debug, Clone, Copy)]
pub struct EnergyCoefficients {
    pub activate: f64,
    pub read: f64,
    pub write: f64,
    pub refresh: f64,
    pub background_active: f64,
    pub background_powerdown: f64,
}

/// Everything the engine needs after construction: derived timing tables,
/// the frozen address mapping, geometry, policy, and queue capacities.
#[derive(Debug, Clone)]
pub struct DerivedConfig {
    pub mapping: AddressMapping,
    pub channel_timing: ChannelTiming,
    pub rank_timing: RankTiming,
    pub bank_timing: BankTiming,
    pub energy: EnergyCoefficients,
    pub policy: PolicyConfig,
    pub queues: QueueConfig,
    pub transaction_delay: u32,
    pub command_delay: u32,
    pub n_channel: u32,
    pub n_rank: u32,
    pub n_bank: u32,
}

impl Config {
    /// Validates and folds the primary timing parameters into the frozen
    /// tables the engine consumes, performing the sanity pass described for
    /// configuration construction.
    pub fn derive(&self) -> Result<DerivedConfig, ConfigError> {
        let t = &self.timing;

        if t.tRCD < t.tAL {
            return Err(ConfigError::RasToColumnBelowAdditiveLatency {
                t_rcd: t.tRCD,
                t_al: t.tAL,
            });
        }
        if t.tRAS < t.tRCD {
            return Err(ConfigError::RowActiveBelowRasToColumn {
                t_ras: t.tRAS,
                t_rcd: t.tRCD,
            });
        }
        let ras_plus_pre = t.tRAS + t.tRP;
        if t.tRC < ras_plus_pre {
            return Err(ConfigError::RowCycleBelowRasPlusPrecharge {
                t_rc: t.tRC,
                sum: ras_plus_pre,
            });
        }
        let total_bits = self.geometry.line
            + self.geometry.channel
            + self.geometry.column
            + self.geometry.bank
            + self.geometry.rank
            + self.geometry.row;
        if total_bits > 64 {
            return Err(ConfigError::AddressFieldsOverflow { total: total_bits });
        }
        if self.queues.transaction == 0 {
            return Err(ConfigError::ZeroQueueCapacity { queue: "transaction" });
        }
        if self.queues.command == 0 {
            return Err(ConfigError::ZeroQueueCapacity { queue: "command" });
        }
        if self.queues.request == 0 {
            return Err(ConfigError::ZeroQueueCapacity { queue: "request" });
        }

        let mut offset = self.geometry.line;
        let channel_field = BitField { width: self.geometry.channel, offset };
        offset += self.geometry.channel;
        let column_field = BitField { width: self.geometry.column, offset };
        offset += self.geometry.column;
        let bank_field = BitField { width: self.geometry.bank, offset };
        offset += self.geometry.bank;
        let rank_field = BitField { width: self.geometry.rank, offset };
        offset += self.geometry.rank;
        let row_field = BitField { width: self.geometry.row, offset };

        let mapping = AddressMapping {
            channel: channel_field,
            rank: rank_field,
            bank: bank_field,
            row: row_field,
            column: column_field,
        };

        let channel_timing = ChannelTiming {
            any_to_any: t.tCMD,
            act_to_any: t.tRCMD,
            read_to_read: t.tBL + t.tRTRS,
            read_to_write: t.tCL + t.tBL + t.tRTRS - t.tCWL,
            write_to_read: t.tCWL + t.tBL + t.tRTRS - t.tCL,
            write_to_write: t.tBL + t.tRTRS,
        };

        let rank_timing = RankTiming {
            act_to_act: t.tRRD,
            act_to_faw: t.tFAW,
            read_to_read: t.tBL.max(t.tCCD),
            read_to_write: t.tCL + t.tBL + t.tRTRS - t.tCWL,
            write_to_read: t.tCWL + t.tBL + t.tWTR,
            write_to_write: t.tBL.max(t.tCCD),
            refresh_latency: t.tRFC,
            refresh_interval: t.tREFI,
            powerdown_latency: t.tCKE,
            powerup_latency: t.tXP,
        };

        let rcmd_extra = t.tRCMD.saturating_sub(t.tCMD);
        let bank_timing = BankTiming {
            act_to_read: t.tRCD - t.tAL + rcmd_extra,
            act_to_write: t.tRCD - t.tAL + rcmd_extra,
            act_to_pre: t.tRAS + rcmd_extra,
            read_to_pre: t.tAL + t.tBL + t.tRTP.max(t.tCCD) - t.tCCD,
            write_to_pre: t.tAL + t.tCWL + t.tBL + t.tWR,
            pre_to_act: t.tRP,
            read_to_data: t.tAL + t.tCL,
            write_to_data: t.tAL + t.tCWL,
        };

        let e = &self.energy;
        let devices = f64::from(e.devices);
        let energy = EnergyCoefficients {
            activate: (f64::from(e.IDD0.saturating_sub(e.IDD3N)) * f64::from(t.tRAS)
                + f64::from(e.IDD0.saturating_sub(e.IDD2N)) * f64::from(t.tRP))
                * devices,
            read: f64::from(e.IDD4R.saturating_sub(e.IDD3N)) * f64::from(t.tBL) * devices,
            write: f64::from(e.IDD4W.saturating_sub(e.IDD3N)) * f64::from(t.tBL) * devices,
            refresh: f64::from(e.IDD5.saturating_sub(e.IDD3N)) * f64::from(t.tRFC) * devices,
            background_active: f64::from(e.IDD3N) * devices,
            background_powerdown: f64::from(e.IDD2Q) * devices,
        };

        Ok(DerivedConfig {
            mapping,
            channel_timing,
            rank_timing,
            bank_timing,
            energy,
            policy: self.policy,
            queues: self.queues,
            transaction_delay: t.transaction_delay,
            command_delay: t.command_delay,
            n_channel: 1 << self.geometry.channel,
            n_rank: 1 << self.geometry.rank,
            n_bank: 1 << self.geometry.bank,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_derives_cleanly() {
        let config = Config::default();
        let derived = config.derive().expect("default config must be valid");
        assert_eq!(derived.n_rank, 2);
        assert_eq!(derived.n_bank, 8);
        assert_eq!(derived.bank_timing.act_to_pre, defaults::T_RAS);
    }

    #[test]
    fn rejects_rcd_below_al() {
        let mut config = Config::default();
        config.timing.tAL = config.timing.tRCD + 1;
        let err = config.derive().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::RasToColumnBelowAdditiveLatency { .. }
        ));
    }

    #[test]
    fn rejects_ras_below_rcd() {
        let mut config = Config::default();
        config.timing.tRAS = config.timing.tRCD - 1;
        let err = config.derive().unwrap_err();
        assert!(matches!(err, ConfigError::RowActiveBelowRasToColumn { .. }));
    }

    #[test]
    fn rejects_zero_queue_capacity() {
        let mut config = Config::default();
        config.queues.command = 0;
        let err = config.derive().unwrap_err();
        assert!(matches!(err, ConfigError::ZeroQueueCapacity { queue: "command" }));
    }

    #[test]
    fn boundary_scenario_one_timings_match_hand_derivation() {
        // Scenario 1 in the testable-properties section: tCMD=1, tRCD=5,
        // tAL=0, tCL=5, tBL=4, tRP=5, transaction_delay=0, command_delay=0.
        let mut config = Config::default();
        config.timing.transaction_delay = 0;
        config.timing.command_delay = 0;
        let derived = config.derive().unwrap();
        assert_eq!(derived.bank_timing.act_to_read, 5);
        assert_eq!(derived.bank_timing.read_to_data, 5);
        assert_eq!(derived.bank_timing.pre_to_act, 5);
    }
}
