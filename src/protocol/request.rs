//! Tagged requests sent to the producer.
//!
//! The wire itself carries no message tag: the producer interprets each count
//! by position. The tag lives on our side so ordering can be checked before
//! anything is written.

use super::codec::FrameWriter;
use crate::error::Result;
use std::fmt;
use std::io::Write;

/// Sentinel count that asks for the catalog
pub const CATALOG_SENTINEL: i64 = 0;

/// Count that tells the producer to leave its transfer loop
pub const SHUTDOWN_SENTINEL: i64 = -1;

/// A request to the producer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// List all timestep names
    Catalog,
    /// Fetch the buffers of one timestep
    Payload(usize),
    /// Leave the request loop
    Shutdown,
}

impl Request {
    /// The count this request puts on the wire
    pub fn wire_value(&self) -> i64 {
        match self {
            Request::Catalog => CATALOG_SENTINEL,
            Request::Payload(index) => *index as i64,
            Request::Shutdown => SHUTDOWN_SENTINEL,
        }
    }

    /// Write and flush the request
    pub fn encode<W: Write>(&self, writer: &mut FrameWriter<W>) -> Result<()> {
        writer.write_count(self.wire_value())?;
        writer.flush()
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Request::Catalog => write!(f, "catalog"),
            Request::Payload(index) => write!(f, "payload #{}", index),
            Request::Shutdown => write!(f, "shutdown"),
        }
    }
}
