//! Line-oriented memory reference trace reader.
//!
//! Format: `0x<hex address> <READ|WRITE|P_MEM_WR|P_LOCK_WR|...> <arrival_cycle>`.
//! One line produces one [`TraceEntry`]; writes are recognized by the
//! `WRITE`/`P_MEM_WR`/`P_LOCK_WR` markers, anything else is a read.

use std::io::BufRead;

use crate::common::error::TraceError;

/// One parsed trace line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceEntry {
    pub address: u64,
    pub is_write: bool,
    pub arrival_cycle: u64,
}

fn is_write_marker(token: &str) -> bool {
    matches!(token, "WRITE" | "P_MEM_WR" | "P_LOCK_WR")
}

/// Parses one trace line, stripped of its trailing newline, into a
/// [`TraceEntry`]. `line_no` is the 1-based line number, used only for
/// diagnostics.
fn parse_line(line_no: usize, line: &str) -> Result<TraceEntry, TraceError> {
    let mut fields = line.split_whitespace();
    let addr_token = fields.next().ok_or_else(|| TraceError::Malformed {
        line_no,
        text: line.to_string(),
    })?;
    let cmd_token = fields.next().ok_or_else(|| TraceError::Malformed {
        line_no,
        text: line.to_string(),
    })?;
    let cycle_token = fields.next().ok_or_else(|| TraceError::Malformed {
        line_no,
        text: line.to_string(),
    })?;

    let hex = addr_token.strip_prefix("0x").unwrap_or(addr_token);
    let address = u64::from_str_radix(hex, 16).map_err(|_| TraceError::InvalidAddress {
        line_no,
        text: addr_token.to_string(),
    })?;
    let arrival_cycle = cycle_token.parse::<u64>().map_err(|_| TraceError::InvalidCycle {
        line_no,
        text: cycle_token.to_string(),
    })?;

    Ok(TraceEntry {
        address,
        is_write: is_write_marker(cmd_token),
        arrival_cycle,
    })
}

/// Streams [`TraceEntry`] values out of any `BufRead`, one line at a time,
/// without buffering the whole file in memory.
pub struct TraceReader<R> {
    lines: std::io::Lines<R>,
    line_no: usize,
}

impl<R: BufRead> TraceReader<R> {
    pub fn new(reader: R) -> Self {
        Self { lines: reader.lines(), line_no: 0 }
    }
}

impl<R: BufRead> Iterator for TraceReader<R> {
    type Item = Result<TraceEntry, TraceError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let raw = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(TraceError::Io(e.to_string()))),
            };
            self.line_no += 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }
            return Some(parse_line(self.line_no, trimmed));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_reads_and_every_write_marker() {
        let text = "0x10 READ 0\n0x20 WRITE 1\n0x30 P_MEM_WR 2\n0x40 P_LOCK_WR 3\n";
        let entries: Vec<_> = TraceReader::new(Cursor::new(text))
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(entries[0], TraceEntry { address: 0x10, is_write: false, arrival_cycle: 0 });
        assert!(entries[1].is_write);
        assert!(entries[2].is_write);
        assert!(entries[3].is_write);
    }

    #[test]
    fn skips_blank_lines() {
        let text = "0x10 READ 0\n\n0x20 READ 1\n";
        let entries: Vec<_> = TraceReader::new(Cursor::new(text))
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn reports_malformed_line_with_line_number() {
        let text = "0x10 READ 0\nnot a trace line\n";
        let mut reader = TraceReader::new(Cursor::new(text));
        let _ = reader.next().unwrap().unwrap();
        let err = reader.next().unwrap().unwrap_err();
        assert!(matches!(err, TraceError::Malformed { line_no: 2, .. }));
    }

    #[test]
    fn rejects_invalid_hex_address() {
        let text = "0xZZ READ 0\n";
        let mut reader = TraceReader::new(Cursor::new(text));
        let err = reader.next().unwrap().unwrap_err();
        assert!(matches!(err, TraceError::InvalidAddress { line_no: 1, .. }));
    }
}
