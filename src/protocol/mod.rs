//! Wire protocol spoken with the data-producing co-process
//!
//! The producer reads requests from its stdin and answers on its stdout. All
//! framing is count/length prefixed; see [`codec`] for the primitives.
//!
//! # Exchanges
//!
//! - [`Request::Catalog`] (count `0`): answered by a count `N` followed by `N`
//!   length-prefixed names.
//! - [`Request::Payload`] (count `k`): answered by a [`RawPayload`] frame.
//! - [`Request::Shutdown`] (count `-1`): no answer; the producer exits.

pub mod codec;
pub mod payload;
pub mod request;

pub use codec::{FrameReader, FrameWriter, COUNT_WIDTH};
pub use payload::{RawPayload, BLOCK_NAMES};
pub use request::{Request, CATALOG_SENTINEL, SHUTDOWN_SENTINEL};

use crate::error::{MikrError, Result};
use std::io::{Read, Write};

/// Decode a catalog response into timestep names
pub fn read_catalog<R: Read>(reader: &mut FrameReader<R>) -> Result<Vec<String>> {
    read_catalog_with(reader, |_, _| Ok(()))
}

/// Decode a catalog response, reporting `(fetched, total)` after each name.
///
/// An error returned by `on_name` stops decoding mid-catalog.
pub fn read_catalog_with<R, F>(reader: &mut FrameReader<R>, mut on_name: F) -> Result<Vec<String>>
where
    R: Read,
    F: FnMut(usize, usize) -> Result<()>,
{
    let total = reader.read_len()?;
    let mut names = Vec::new();
    names
        .try_reserve_exact(total)
        .map_err(|_| MikrError::Protocol(format!("catalog of {} entries", total)))?;

    for i in 0..total {
        let bytes = reader.read_block()?;
        let name = String::from_utf8(bytes).map_err(|e| {
            MikrError::Protocol(format!("timestep name #{} is not UTF-8: {}", i, e))
        })?;
        names.push(name);
        on_name(i + 1, total)?;
    }

    Ok(names)
}

/// Encode a catalog response the way a producer sends it
pub fn write_catalog<W: Write, S: AsRef<str>>(writer: &mut FrameWriter<W>, names: &[S]) -> Result<()> {
    writer.write_count(names.len() as i64)?;
    for name in names {
        writer.write_block(name.as_ref().as_bytes())?;
    }
    Ok(())
}
