/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use bytes::Bytes;

use crate::{ChunkProducer, ChunkSink, ContentError};

pub struct BytesProducer {
    content: Option<Bytes>,
}

impl BytesProducer {
    pub fn new(content: Bytes) -> Self {
        BytesProducer {
            content: Some(content),
        }
    }
}

impl ChunkProducer for BytesProducer {
    fn produce(&mut self, sink: ChunkSink) -> Result<(), ContentError> {
        match self.content.take() {
            Some(content) => sink.deliver(content),
            None => sink.finish(),
        }
    }

    fn release(&mut self) -> Result<(), ContentError> {
        Ok(())
    }
}
