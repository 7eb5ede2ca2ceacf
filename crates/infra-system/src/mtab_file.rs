// File-backed mount table (/etc/mtab, /proc/self/mounts, ...)
use std::fs::File;
use std::io::{self, BufRead, BufReader, Seek, SeekFrom};
use std::path::PathBuf;
use tracing::debug;

use mountmond_core::application::constants::DEFAULT_MTAB_PATH;
use mountmond_core::port::{MountTableSource, OpenMountTable};

/// Mount table read from a file
#[derive(Debug, Clone)]
pub struct FileMountTable {
    path: PathBuf,
}

impl FileMountTable {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for FileMountTable {
    fn default() -> Self {
        Self::new(DEFAULT_MTAB_PATH)
    }
}

impl MountTableSource for FileMountTable {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn open(&self) -> io::Result<Box<dyn OpenMountTable>> {
        let file = File::open(&self.path)?;
        debug!(path = %self.path.display(), "Mount table opened");
        Ok(Box::new(OpenFileMountTable { file }))
    }
}

/// Open mount table file, rewound before every snapshot
struct OpenFileMountTable {
    file: File,
}

impl OpenMountTable for OpenFileMountTable {
    fn snapshot(&mut self) -> io::Result<Box<dyn BufRead + '_>> {
        self.file.seek(SeekFrom::Start(0))?;
        Ok(Box::new(BufReader::new(&mut self.file)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mountmond_core::application::read_mount_table;

    fn temp_table(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "mountmond_test_{}_{}.mtab",
            name,
            std::process::id()
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_snapshot_rewinds_and_sees_updates() {
        let path = temp_table("rewind", "a /one c d\n");
        let source = FileMountTable::new(&path);
        let mut table = source.open().unwrap();

        let first = read_mount_table(table.snapshot().unwrap());
        assert_eq!(first.len(), 1);

        // Same open file, rewritten in place
        std::fs::write(&path, "a /one c d\na /two c d\n").unwrap();
        let second = read_mount_table(table.snapshot().unwrap());
        assert_eq!(second.len(), 2);
        assert_eq!(second[1].mount_path, "/two");

        // Re-reading without changes yields the same entries
        let third = read_mount_table(table.snapshot().unwrap());
        assert_eq!(second, third);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_open_missing_file_fails() {
        let source = FileMountTable::new("/nonexistent/mountmond/mtab");
        let result = source.open();
        assert_eq!(result.err().unwrap().kind(), io::ErrorKind::NotFound);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_reads_live_proc_mounts() {
        let source = FileMountTable::new("/proc/self/mounts");
        let mut table = source.open().unwrap();

        let entries = read_mount_table(table.snapshot().unwrap());
        assert!(!entries.is_empty());
    }
}
