/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io::Read;

use bytes::Bytes;
use mime::Mime;
use tokio::io::AsyncRead;
use tokio::runtime::Handle;

use crate::{BaseProvider, ReadSourceConfig};

mod bytes_source;
pub use bytes_source::BytesProducer;

mod read_source;
pub use read_source::ReadProducer;

mod async_read_source;
pub use async_read_source::AsyncReadProducer;

impl BaseProvider {
    /// Provide `content` as a single chunk.
    pub fn from_bytes<B>(content: B, content_type: Option<Mime>) -> Self
    where
        B: Into<Bytes>,
    {
        let content = content.into();
        let content_length = content.len() as u64;
        BaseProvider::new(
            BytesProducer::new(content),
            Some(content_length),
            content_type,
        )
    }

    pub fn from_static(content: &'static [u8], content_type: Option<Mime>) -> Self {
        BaseProvider::from_bytes(Bytes::from_static(content), content_type)
    }

    /// Provide the data of a blocking reader, reading at most
    /// `config.buffer_size()` bytes per chunk.
    pub fn from_reader<R>(
        reader: R,
        content_length: Option<u64>,
        content_type: Option<Mime>,
        config: &ReadSourceConfig,
    ) -> Self
    where
        R: Read + Send + 'static,
    {
        BaseProvider::new(
            ReadProducer::new(reader, config),
            content_length,
            content_type,
        )
    }

    /// Provide the data of an async reader, each read is done by a task
    /// spawned on `handle`.
    pub fn from_async_reader<R>(
        reader: R,
        handle: Handle,
        content_length: Option<u64>,
        content_type: Option<Mime>,
        config: &ReadSourceConfig,
    ) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        BaseProvider::new(
            AsyncReadProducer::new(reader, handle, config),
            content_length,
            content_type,
        )
    }
}
