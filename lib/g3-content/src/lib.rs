/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

//! Asynchronous content providers with explicit backpressure.
//!
//! A [`ContentProvider`] delivers its data as a sequence of chunks to a single
//! consumer, and won't produce the next chunk before the current one has been
//! acknowledged through its [`ContentCallback`].

mod error;
pub use error::{ContentError, ErrorCollector};

mod provider;
pub use provider::{ContentListener, ContentProvider, ErrorAction, SuccessAction};

mod base;
pub use base::{BaseProvider, ChunkProducer, ChunkSink, ContentCallback, ProviderPhase};

mod leaf;
pub use leaf::{AsyncReadProducer, BytesProducer, ReadProducer};

mod concat;
pub use concat::ConcatenatedProvider;

mod auto_close;
pub use auto_close::{AutoCloseProvider, Release};

mod config;
pub use config::ReadSourceConfig;

pub mod drain;
pub use drain::{Charset, discard, read_all_bytes, read_to_string};

pub mod leak;
