// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Length-prefixed frame transport.
//!
//! Each frame is a 4-byte big-endian length followed by that many
//! payload bytes. The writer buffers a whole frame in memory so the
//! prefix and payload hit the underlying stream together; the reader
//! never yields bytes past the current frame boundary.

use std::io::{Read, Write};

use crate::ser::SerializeError;

/// Upper bound on a single frame unless overridden.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16_384_000;

/// Buffers one frame and emits it atomically on [`FrameWriter::complete_frame`].
pub struct FrameWriter<W: Write> {
    inner: W,
    buffer: Vec<u8>,
    max_frame_size: usize,
}

impl<W: Write> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self::with_max_frame_size(inner, DEFAULT_MAX_FRAME_SIZE)
    }

    pub fn with_max_frame_size(inner: W, max_frame_size: usize) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
            max_frame_size,
        }
    }

    /// Bytes buffered for the frame under construction.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Write the buffered frame as `len:u32` plus payload and flush the
    /// underlying stream. Completing an empty frame writes nothing.
    pub fn complete_frame(&mut self) -> Result<(), SerializeError> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        log::debug!(
            "[FrameWriter::complete_frame] emitting frame of {} bytes",
            self.buffer.len()
        );
        self.inner.write_all(&(self.buffer.len() as u32).to_be_bytes())?;
        self.inner.write_all(&self.buffer)?;
        self.inner.flush()?;
        self.buffer.clear();
        Ok(())
    }

    /// Drop the buffered frame without emitting it.
    pub fn discard_frame(&mut self) {
        self.buffer.clear();
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for FrameWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let remaining = self.max_frame_size - self.buffer.len();
        if buf.len() > remaining {
            return Err(std::io::Error::other(SerializeError::FrameSizeExceeded {
                needed: buf.len(),
                remaining,
                total: self.max_frame_size,
            }));
        }
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    /// Frame boundaries are explicit; flushing mid-frame is a no-op so
    /// no partial frame can leak out.
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Reads one frame at a time; [`Read`] calls never cross the current
/// frame's end.
pub struct FrameReader<R: Read> {
    inner: R,
    remaining: usize,
}

impl<R: Read> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            remaining: 0,
        }
    }

    /// Advance to the next frame, discarding whatever is left of the
    /// current one. Returns the new frame's payload length, or
    /// `Ok(None)` at a clean end of stream.
    pub fn next_frame(&mut self) -> Result<Option<usize>, SerializeError> {
        self.skip_rest()?;
        let mut prefix = [0u8; 4];
        let mut filled = 0;
        while filled < prefix.len() {
            let n = self.inner.read(&mut prefix[filled..])?;
            if n == 0 {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(SerializeError::UnexpectedEnd);
            }
            filled += n;
        }
        self.remaining = u32::from_be_bytes(prefix) as usize;
        Ok(Some(self.remaining))
    }

    /// Unread bytes in the current frame.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    fn skip_rest(&mut self) -> Result<(), SerializeError> {
        while self.remaining > 0 {
            let take = self.remaining as u64;
            let copied = std::io::copy(&mut (&mut self.inner).take(take), &mut std::io::sink())?;
            if copied == 0 {
                return Err(SerializeError::UnexpectedEnd);
            }
            self.remaining -= copied as usize;
        }
        Ok(())
    }
}

impl<R: Read> Read for FrameReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.remaining == 0 {
            return Ok(0);
        }
        let limit = buf.len().min(self.remaining);
        let n = self.inner.read(&mut buf[..limit])?;
        if n == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        self.remaining -= n;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn frames_are_length_prefixed() {
        let mut writer = FrameWriter::new(Vec::new());
        writer.write_all(b"hello").unwrap();
        writer.complete_frame().unwrap();
        writer.write_all(b"worlds!").unwrap();
        writer.complete_frame().unwrap();
        let bytes = writer.into_inner();
        assert_eq!(&bytes[..4], &5u32.to_be_bytes());
        assert_eq!(&bytes[4..9], b"hello");
        assert_eq!(&bytes[9..13], &7u32.to_be_bytes());
        assert_eq!(&bytes[13..], b"worlds!");

        let mut reader = FrameReader::new(Cursor::new(bytes));
        assert_eq!(reader.next_frame().unwrap(), Some(5));
        let mut payload = String::new();
        reader.read_to_string(&mut payload).unwrap();
        assert_eq!(payload, "hello");
        assert_eq!(reader.next_frame().unwrap(), Some(7));
        let mut payload = String::new();
        reader.read_to_string(&mut payload).unwrap();
        assert_eq!(payload, "worlds!");
        assert_eq!(reader.next_frame().unwrap(), None);
    }

    #[test]
    fn read_stops_at_frame_boundary() {
        let mut writer = FrameWriter::new(Vec::new());
        writer.write_all(b"abc").unwrap();
        writer.complete_frame().unwrap();
        writer.write_all(b"def").unwrap();
        writer.complete_frame().unwrap();

        let mut reader = FrameReader::new(Cursor::new(writer.into_inner()));
        reader.next_frame().unwrap();
        let mut buf = [0u8; 16];
        let n = reader.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"abc");
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn next_frame_skips_unread_payload() {
        let mut writer = FrameWriter::new(Vec::new());
        writer.write_all(b"skipped").unwrap();
        writer.complete_frame().unwrap();
        writer.write_all(b"kept").unwrap();
        writer.complete_frame().unwrap();

        let mut reader = FrameReader::new(Cursor::new(writer.into_inner()));
        assert_eq!(reader.next_frame().unwrap(), Some(7));
        assert_eq!(reader.next_frame().unwrap(), Some(4));
        let mut payload = String::new();
        reader.read_to_string(&mut payload).unwrap();
        assert_eq!(payload, "kept");
    }

    #[test]
    fn oversized_write_is_rejected_before_buffering() {
        let mut writer = FrameWriter::with_max_frame_size(Vec::new(), 8);
        writer.write_all(b"12345").unwrap();
        let err = writer.write(b"67890").unwrap_err();
        let inner = err
            .get_ref()
            .and_then(|e| e.downcast_ref::<SerializeError>())
            .unwrap();
        assert!(matches!(
            inner,
            SerializeError::FrameSizeExceeded {
                needed: 5,
                remaining: 3,
                total: 8,
            }
        ));
        // The rejected write must not corrupt the pending frame.
        assert_eq!(writer.pending(), 5);
    }

    #[test]
    fn truncated_prefix_is_an_error() {
        let mut reader = FrameReader::new(Cursor::new(vec![0u8, 0]));
        assert!(matches!(
            reader.next_frame(),
            Err(SerializeError::UnexpectedEnd)
        ));
    }
}
