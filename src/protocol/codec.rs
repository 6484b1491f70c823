//! Count/length-prefixed framing over blocking byte streams.
//!
//! Every count on the wire is an 8-byte signed integer in host byte order.
//! Reads block until the full frame is available; a short stream is reported
//! as [`MikrError::ChannelClosed`] and never yields a truncated value.

use crate::error::{MikrError, Result};
use std::io::{Read, Write};

/// Width of a count on the wire
pub const COUNT_WIDTH: usize = std::mem::size_of::<i64>();

/// Decoding half of the codec
#[derive(Debug)]
pub struct FrameReader<R> {
    inner: R,
    max_block_bytes: usize,
}

impl<R: Read> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            max_block_bytes: usize::MAX,
        }
    }

    /// Reject declared block lengths above `limit` as protocol violations
    pub fn with_block_limit(mut self, limit: usize) -> Self {
        self.max_block_bytes = limit;
        self
    }

    /// Read one count; negative values are protocol violations
    pub fn read_count(&mut self) -> Result<i64> {
        let mut raw = [0u8; COUNT_WIDTH];
        self.inner
            .read_exact(&mut raw)
            .map_err(|e| MikrError::from_stream(e, "reading count"))?;

        let value = i64::from_ne_bytes(raw);
        if value < 0 {
            return Err(MikrError::Protocol(format!("negative count {}", value)));
        }
        Ok(value)
    }

    /// Read one count and convert it to a length
    pub fn read_len(&mut self) -> Result<usize> {
        let value = self.read_count()?;
        usize::try_from(value)
            .map_err(|_| MikrError::Protocol(format!("count {} does not fit in memory", value)))
    }

    /// Read exactly `n` bytes.
    ///
    /// The buffer is allocated at exactly the requested size and filled from
    /// the stream without zero-initialising it first.
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        if n > self.max_block_bytes {
            return Err(MikrError::Protocol(format!(
                "block of {} bytes exceeds limit of {} bytes",
                n, self.max_block_bytes
            )));
        }

        let mut buf = Vec::new();
        buf.try_reserve_exact(n).map_err(|_| {
            MikrError::Protocol(format!("cannot allocate block of {} bytes", n))
        })?;

        let read = (&mut self.inner)
            .take(n as u64)
            .read_to_end(&mut buf)
            .map_err(|e| MikrError::from_stream(e, "reading block"))?;

        if read != n {
            return Err(MikrError::ChannelClosed(format!(
                "stream ended after {} of {} bytes",
                read, n
            )));
        }
        Ok(buf)
    }

    /// Read a `(len, len bytes)` record
    pub fn read_block(&mut self) -> Result<Vec<u8>> {
        let len = self.read_len()?;
        self.read_bytes(len)
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Encoding half of the codec
#[derive(Debug)]
pub struct FrameWriter<W> {
    inner: W,
}

impl<W: Write> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Append one count to the outbound stream
    pub fn write_count(&mut self, n: i64) -> Result<()> {
        self.inner
            .write_all(&n.to_ne_bytes())
            .map_err(|e| MikrError::from_stream(e, "writing count"))
    }

    /// Append a `(len, bytes)` record
    pub fn write_block(&mut self, bytes: &[u8]) -> Result<()> {
        let len = i64::try_from(bytes.len())
            .map_err(|_| MikrError::Protocol(format!("block of {} bytes", bytes.len())))?;
        self.write_count(len)?;
        self.inner
            .write_all(bytes)
            .map_err(|e| MikrError::from_stream(e, "writing block"))
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner
            .flush()
            .map_err(|e| MikrError::from_stream(e, "flushing request"))
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn counts(values: &[i64]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_ne_bytes()).collect()
    }

    #[test]
    fn test_read_count() {
        let mut reader = FrameReader::new(Cursor::new(counts(&[0, 42])));
        assert_eq!(reader.read_count().unwrap(), 0);
        assert_eq!(reader.read_count().unwrap(), 42);
    }

    #[test]
    fn test_negative_count_is_protocol_error() {
        let mut reader = FrameReader::new(Cursor::new(counts(&[-1])));
        assert!(matches!(reader.read_count(), Err(MikrError::Protocol(_))));
    }

    #[test]
    fn test_truncated_count_is_channel_closed() {
        // Four of the eight prefix bytes arrive, then the stream ends
        let bytes = 7i64.to_ne_bytes()[..4].to_vec();
        let mut reader = FrameReader::new(Cursor::new(bytes));
        assert!(matches!(
            reader.read_count(),
            Err(MikrError::ChannelClosed(_))
        ));
    }

    #[test]
    fn test_truncated_block_is_channel_closed() {
        let mut bytes = counts(&[6]);
        bytes.extend_from_slice(b"abc");
        let mut reader = FrameReader::new(Cursor::new(bytes));
        assert!(matches!(
            reader.read_block(),
            Err(MikrError::ChannelClosed(_))
        ));
    }

    #[test]
    fn test_read_bytes_exact_allocation() {
        let mut bytes = counts(&[3]);
        bytes.extend_from_slice(b"t00extra");
        let mut reader = FrameReader::new(Cursor::new(bytes));
        let block = reader.read_block().unwrap();
        assert_eq!(block, b"t00");
        assert_eq!(block.capacity(), 3);
    }

    #[test]
    fn test_block_limit() {
        let mut bytes = counts(&[1024]);
        bytes.resize(bytes.len() + 1024, 0);
        let mut reader = FrameReader::new(Cursor::new(bytes)).with_block_limit(512);
        assert!(matches!(reader.read_block(), Err(MikrError::Protocol(_))));
    }

    #[test]
    fn test_writer_layout() {
        let mut writer = FrameWriter::new(Vec::new());
        writer.write_count(5).unwrap();
        writer.write_block(b"ab").unwrap();
        let mut expected = counts(&[5, 2]);
        expected.extend_from_slice(b"ab");
        assert_eq!(writer.into_inner(), expected);
    }
}
