//! Slot stream
//!
//! The random-access byte stream a `FileStore` runs on.
//!
//! Implemented for `std::fs::File` (the real backend) and
//! `std::io::Cursor<Vec<u8>>` (in-memory files for tests and tooling).

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, Write};

/// Random-access byte stream that can also report, change and persist its
/// length
pub trait SlotStream: Read + Write + Seek {
    /// Current length in bytes
    fn byte_len(&mut self) -> io::Result<u64>;

    /// Truncate or extend (with zeros) to exactly `len` bytes
    fn resize(&mut self, len: u64) -> io::Result<()>;

    /// Push buffered data to durable storage
    fn sync(&mut self) -> io::Result<()>;
}

impl SlotStream for File {
    fn byte_len(&mut self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn resize(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.flush()?;
        self.sync_data()
    }
}

impl SlotStream for Cursor<Vec<u8>> {
    fn byte_len(&mut self) -> io::Result<u64> {
        Ok(self.get_ref().len() as u64)
    }

    fn resize(&mut self, len: u64) -> io::Result<()> {
        let len = usize::try_from(len)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "length overflows usize"))?;
        self.get_mut().resize(len, 0);
        Ok(())
    }

    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }
}
