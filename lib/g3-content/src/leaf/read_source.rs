/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io::{self, Read};

use bytes::BytesMut;

use crate::{ChunkProducer, ChunkSink, ContentError, ReadSourceConfig};

type ReadCloser<R> = Box<dyn FnOnce(R) -> io::Result<()> + Send>;

/// Reads chunks from a blocking reader.
///
/// The read buffer is reused for the next chunk only if the consumer has
/// dropped the previous one.
pub struct ReadProducer<R> {
    reader: Option<R>,
    closer: Option<ReadCloser<R>>,
    buf: BytesMut,
    buffer_size: usize,
}

impl<R: Read + Send> ReadProducer<R> {
    pub fn new(reader: R, config: &ReadSourceConfig) -> Self {
        ReadProducer {
            reader: Some(reader),
            closer: None,
            buf: BytesMut::with_capacity(config.buffer_size()),
            buffer_size: config.buffer_size(),
        }
    }

    /// Use `closer` to release the reader instead of dropping it.
    pub fn with_closer<F>(reader: R, config: &ReadSourceConfig, closer: F) -> Self
    where
        F: FnOnce(R) -> io::Result<()> + Send + 'static,
    {
        let mut producer = ReadProducer::new(reader, config);
        producer.closer = Some(Box::new(closer));
        producer
    }

    fn read_chunk(&mut self, reader: &mut R) -> io::Result<usize> {
        self.buf.clear();
        self.buf.reserve(self.buffer_size);
        self.buf.resize(self.buffer_size, 0);
        loop {
            match reader.read(&mut self.buf) {
                Ok(nr) => {
                    self.buf.truncate(nr);
                    return Ok(nr);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.buf.clear();
                    return Err(e);
                }
            }
        }
    }
}

impl<R: Read + Send> ChunkProducer for ReadProducer<R> {
    fn produce(&mut self, sink: ChunkSink) -> Result<(), ContentError> {
        let Some(mut reader) = self.reader.take() else {
            return sink.fail(ContentError::AlreadyClosed);
        };
        let r = self.read_chunk(&mut reader);
        self.reader = Some(reader);

        match r {
            Ok(0) => sink.finish(),
            Ok(_) => sink.deliver(self.buf.split().freeze()),
            Err(e) => sink.fail(ContentError::read_failed(e)),
        }
    }

    fn release(&mut self) -> Result<(), ContentError> {
        let Some(reader) = self.reader.take() else {
            return Ok(());
        };
        match self.closer.take() {
            Some(closer) => closer(reader).map_err(ContentError::close_failed),
            None => Ok(()),
        }
    }
}
