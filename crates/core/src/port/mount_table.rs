// Mount Table Source Port
// Where the live mount table comes from (/etc/mtab in production)

use std::io::{self, BufRead};

/// Opens the mount table
pub trait MountTableSource: Send + Sync {
    /// Human readable location, for logs
    fn describe(&self) -> String;

    /// Open the table for repeated snapshots
    ///
    /// # Errors
    /// - io::Error if the table cannot be opened
    fn open(&self) -> io::Result<Box<dyn OpenMountTable>>;
}

/// An opened mount table. Dropping it closes the underlying source.
pub trait OpenMountTable: Send {
    /// Rewind to the beginning and read the current table
    fn snapshot(&mut self) -> io::Result<Box<dyn BufRead + '_>>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::io::{BufReader, Cursor, Read};
    use std::sync::{Arc, Mutex};

    #[derive(Debug)]
    struct TableState {
        contents: Vec<u8>,
        readable: bool,
        fail_after: Option<usize>,
        open_count: usize,
    }

    /// In-memory mount table whose contents tests can swap between ticks
    #[derive(Clone)]
    pub struct InMemoryMountTable {
        state: Arc<Mutex<TableState>>,
        openable: bool,
    }

    impl InMemoryMountTable {
        pub fn new(contents: impl Into<Vec<u8>>) -> Self {
            Self {
                state: Arc::new(Mutex::new(TableState {
                    contents: contents.into(),
                    readable: true,
                    fail_after: None,
                    open_count: 0,
                })),
                openable: true,
            }
        }

        /// A table that cannot be opened at all
        pub fn unavailable() -> Self {
            Self {
                openable: false,
                ..Self::new("")
            }
        }

        pub fn set_contents(&self, contents: impl Into<Vec<u8>>) {
            self.state.lock().unwrap().contents = contents.into();
        }

        /// Toggle whether snapshots succeed
        pub fn set_readable(&self, readable: bool) {
            self.state.lock().unwrap().readable = readable;
        }

        /// Make snapshots fail with an I/O error after `bytes` bytes; `None` heals
        pub fn set_fail_after(&self, bytes: Option<usize>) {
            self.state.lock().unwrap().fail_after = bytes;
        }

        pub fn open_count(&self) -> usize {
            self.state.lock().unwrap().open_count
        }
    }

    struct OpenInMemoryMountTable {
        state: Arc<Mutex<TableState>>,
    }

    impl MountTableSource for InMemoryMountTable {
        fn describe(&self) -> String {
            "in-memory mount table".to_string()
        }

        fn open(&self) -> io::Result<Box<dyn OpenMountTable>> {
            if !self.openable {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    "mock mount table unavailable",
                ));
            }
            self.state.lock().unwrap().open_count += 1;
            Ok(Box::new(OpenInMemoryMountTable {
                state: Arc::clone(&self.state),
            }))
        }
    }

    impl OpenMountTable for OpenInMemoryMountTable {
        fn snapshot(&mut self) -> io::Result<Box<dyn BufRead + '_>> {
            let state = self.state.lock().unwrap();
            if !state.readable {
                return Err(io::Error::new(
                    io::ErrorKind::Other,
                    "mock mount table unreadable",
                ));
            }
            let contents = Cursor::new(state.contents.clone());
            match state.fail_after {
                None => Ok(Box::new(contents)),
                Some(limit) => Ok(Box::new(BufReader::new(FailingRead {
                    inner: contents,
                    remaining: limit,
                }))),
            }
        }
    }

    /// Serves `remaining` bytes, then errors
    struct FailingRead {
        inner: Cursor<Vec<u8>>,
        remaining: usize,
    }

    impl Read for FailingRead {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.remaining == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::Other,
                    "mock mount table read failed",
                ));
            }
            let len = buf.len().min(self.remaining);
            let n = self.inner.read(&mut buf[..len])?;
            self.remaining -= n;
            Ok(n)
        }
    }
}
