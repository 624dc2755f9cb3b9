//! Blob Sink - linear append with backward patches
//!
//! Records are appended at a linear cursor. Reference patches seek back
//! into already written records, overwrite one word and seek back to the
//! linear cursor, so a patch never truncates or shifts later appends.

use crate::error::{FrzError, Result};
use crate::util::POINTER_SIZE;
use std::io::{Seek, SeekFrom, Write};

const ZEROS: [u8; 64] = [0; 64];

pub struct BlobSink<W: Write + Seek> {
    out: W,
    position: usize,
    patches: u64,
}

impl<W: Write + Seek> BlobSink<W> {
    /// Wrap an output positioned at the start of the blob
    pub fn new(out: W) -> Self {
        Self {
            out,
            position: 0,
            patches: 0,
        }
    }

    /// Linear write cursor
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Backward patches performed so far
    pub fn patches(&self) -> u64 {
        self.patches
    }

    /// Fail unless the linear cursor is at `expected`
    pub fn expect_position(&self, expected: usize) -> Result<()> {
        crate::ensure!(
            self.position == expected,
            FrzError::Internal(format!(
                "record reserved at {} but write cursor is at {}",
                expected, self.position
            ))
        );
        Ok(())
    }

    pub fn append(&mut self, bytes: &[u8]) -> Result<()> {
        self.out
            .write_all(bytes)
            .map_err(|err| FrzError::io(format!("writing at offset {}", self.position), err))?;
        self.position += bytes.len();
        Ok(())
    }

    /// Append a native-endian word
    pub fn append_word(&mut self, value: usize) -> Result<()> {
        self.append(&value.to_ne_bytes())
    }

    pub fn append_zeros(&mut self, mut len: usize) -> Result<()> {
        while len > 0 {
            let chunk = len.min(ZEROS.len());
            self.append(&ZEROS[..chunk])?;
            len -= chunk;
        }
        Ok(())
    }

    /// Overwrite one already written word at `at` with `value`
    pub fn patch_word(&mut self, at: usize, value: usize) -> Result<()> {
        crate::ensure!(
            at + POINTER_SIZE <= self.position,
            FrzError::Internal(format!(
                "patch at {} lies past the write cursor {}",
                at, self.position
            ))
        );

        self.seek_to(at)?;
        self.out
            .write_all(&value.to_ne_bytes())
            .map_err(|err| FrzError::io(format!("patching offset {}", at), err))?;
        self.seek_to(self.position)?;
        self.patches += 1;
        Ok(())
    }

    fn seek_to(&mut self, offset: usize) -> Result<()> {
        self.out
            .seek(SeekFrom::Start(offset as u64))
            .map_err(|err| FrzError::io(format!("seeking to offset {}", offset), err))?;
        Ok(())
    }

    /// Flush and hand back the output
    pub fn finish(mut self) -> Result<W> {
        self.out
            .flush()
            .map_err(|err| FrzError::io("flushing blob", err))?;
        Ok(self.out)
    }
}
