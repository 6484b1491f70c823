//! Protocol state over a reader/writer pair

use super::Producer;
use crate::error::{MikrError, Result};
use crate::protocol::{self, FrameReader, FrameWriter, RawPayload, Request};
use std::io::{Read, Write};

/// One producer conversation.
///
/// Tracks whether the catalog has been fetched so that payload requests can
/// be checked before anything is written. Any codec error drops both streams.
#[derive(Debug)]
pub struct Connection<R, W> {
    reader: Option<FrameReader<R>>,
    writer: Option<FrameWriter<W>>,
    catalog_len: Option<usize>,
}

impl<R: Read, W: Write> Connection<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_block_limit(reader, writer, usize::MAX)
    }

    /// Connection rejecting declared blocks longer than `max_block_bytes`
    pub fn with_block_limit(reader: R, writer: W, max_block_bytes: usize) -> Self {
        Self {
            reader: Some(FrameReader::new(reader).with_block_limit(max_block_bytes)),
            writer: Some(FrameWriter::new(writer)),
            catalog_len: None,
        }
    }

    /// Timestep count of the fetched catalog
    pub fn catalog_len(&self) -> Option<usize> {
        self.catalog_len
    }

    fn close(&mut self) {
        self.reader = None;
        self.writer = None;
    }

    /// Run one exchange, closing the connection if it fails
    fn exchange<T>(
        &mut self,
        request: Request,
        respond: impl FnOnce(&mut FrameReader<R>) -> Result<T>,
    ) -> Result<T> {
        let (Some(reader), Some(writer)) = (self.reader.as_mut(), self.writer.as_mut()) else {
            return Err(MikrError::ChannelClosed(format!(
                "producer connection closed before {}",
                request
            )));
        };

        let result = request
            .encode(writer)
            .and_then(|()| respond(reader));
        if let Err(ref e) = result {
            tracing::debug!("closing producer connection after {}: {}", request, e);
            self.close();
        }
        result
    }
}

impl<R, W> Producer for Connection<R, W>
where
    R: Read + Send,
    W: Write + Send,
{
    fn request_catalog_with(
        &mut self,
        on_name: &mut dyn FnMut(usize, usize) -> Result<()>,
    ) -> Result<Vec<String>> {
        // The producer reads every later request as a payload index
        if let (Some(len), true) = (self.catalog_len, self.is_open()) {
            return Err(MikrError::Protocol(format!(
                "catalog of {} timesteps already fetched",
                len
            )));
        }
        let names = self.exchange(Request::Catalog, |reader| {
            protocol::read_catalog_with(reader, |done, total| on_name(done, total))
        })?;
        self.catalog_len = Some(names.len());
        tracing::debug!(count = names.len(), "catalog received");
        Ok(names)
    }

    fn request_timestep_payload(&mut self, index: usize) -> Result<RawPayload> {
        match self.catalog_len {
            None => {
                return Err(MikrError::Protocol(format!(
                    "payload #{} requested before the catalog",
                    index
                )))
            }
            Some(len) if index >= len => {
                return Err(MikrError::Protocol(format!(
                    "payload #{} requested from a catalog of {}",
                    index, len
                )))
            }
            Some(_) => {}
        }

        self.exchange(Request::Payload(index), RawPayload::read_from)
    }

    fn stop(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = Request::Shutdown.encode(&mut writer) {
                tracing::debug!("shutdown request not delivered: {}", e);
            }
        }
        self.reader = None;
    }

    fn is_open(&self) -> bool {
        self.reader.is_some() && self.writer.is_some()
    }
}
