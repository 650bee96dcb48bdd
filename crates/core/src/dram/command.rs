//! DRAM command types: the atomic unit scheduled on the command bus.

use super::coords::Coordinates;

/// A DRAM command kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    Activate,
    Precharge,
    Read,
    Write,
    ReadPrecharge,
    WritePrecharge,
    Refresh,
    Powerdown,
    Powerup,
}

impl CommandType {
    /// Whether the command is a read, for rank/channel bus bookkeeping.
    pub fn is_read(self) -> bool {
        matches!(self, Self::Read | Self::ReadPrecharge)
    }

    /// Whether the command is a write, for rank/channel bus bookkeeping.
    pub fn is_write(self) -> bool {
        matches!(self, Self::Write | Self::WritePrecharge)
    }
}

/// An issued command: coordinates, issue cycle, and completion cycle.
///
/// `request_id` is set only for data-carrying commands (`Read`/`Write` and
/// their auto-precharge variants); it indexes the request arena the command
/// retires into.
#[derive(Debug, Clone, Copy)]
pub struct Command {
    pub kind: CommandType,
    pub coords: Coordinates,
    pub issue_time: u64,
    pub finish_time: u64,
    pub request_id: Option<usize>,
}
