// Mount table reader: streams a snapshot through the line parser
use std::collections::HashSet;
use std::io::BufRead;
use tracing::warn;

use crate::domain::{parse_mount_line, MountEntry};

/// Lazy, finite sequence of entries from one mount table snapshot
///
/// Lines are read as raw bytes. Empty lines are skipped. Malformed lines,
/// including lines that are not valid UTF-8, are logged and skipped; they
/// never stop the scan. A read error ends the sequence early and marks the
/// reader as truncated. Not restartable: scan again with a fresh reader over
/// a rewound source.
pub struct MountTableReader<R> {
    reader: R,
    buf: Vec<u8>,
    line_no: usize,
    finished: bool,
    truncated: bool,
}

impl<R: BufRead> MountTableReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            line_no: 0,
            finished: false,
            truncated: false,
        }
    }

    /// True if a read error cut the snapshot short
    pub fn truncated(&self) -> bool {
        self.truncated
    }
}

impl<R: BufRead> Iterator for MountTableReader<R> {
    type Item = MountEntry;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    self.finished = true;
                    return None;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(line_no = self.line_no + 1, error = %e, "Failed to read mount table, ending scan");
                    self.finished = true;
                    self.truncated = true;
                    return None;
                }
            }
            self.line_no += 1;

            let raw = self.buf.strip_suffix(b"\n").unwrap_or(&self.buf[..]);
            let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
            if raw.is_empty() {
                continue;
            }

            let line = match std::str::from_utf8(raw) {
                Ok(line) => line,
                Err(e) => {
                    warn!(
                        line_no = self.line_no,
                        line = %String::from_utf8_lossy(raw),
                        error = %e,
                        "Skipping mount table line that is not valid UTF-8"
                    );
                    continue;
                }
            };

            match parse_mount_line(line) {
                Ok(entry) => return Some(entry),
                Err(e) => {
                    warn!(line_no = self.line_no, error = %e, "Skipping malformed mount table line");
                }
            }
        }
    }
}

/// Read a whole snapshot into a list, in file order
pub fn read_mount_table<R: BufRead>(reader: R) -> Vec<MountEntry> {
    MountTableReader::new(reader).collect()
}

/// Mount paths of one snapshot, as the watchdog diffs against them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableScan {
    pub present: HashSet<String>,
    /// Parsed entries, duplicates included
    pub entries: usize,
    /// A read error cut the snapshot short; `present` is incomplete
    pub truncated: bool,
}

/// Scan a snapshot into the set of present mount paths
pub fn scan_mount_table<R: BufRead>(reader: R) -> TableScan {
    let mut scan = TableScan::default();
    let mut entries = MountTableReader::new(reader);
    for entry in entries.by_ref() {
        scan.entries += 1;
        scan.present.insert(entry.mount_path);
    }
    scan.truncated = entries.truncated();
    scan
}
