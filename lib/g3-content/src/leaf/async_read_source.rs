/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;

use bytes::{BufMut, BytesMut};
use log::debug;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::runtime::Handle;
use tokio::sync::Mutex;

use crate::{ChunkProducer, ChunkSink, ContentError, ReadSourceConfig};

struct ReadState<R> {
    reader: Option<R>,
    buf: BytesMut,
}

/// Reads chunks from an async reader on a tokio runtime.
///
/// Chunks are delivered from the runtime worker threads, not from the thread
/// that asked for them.
pub struct AsyncReadProducer<R> {
    handle: Handle,
    state: Arc<Mutex<ReadState<R>>>,
    buffer_size: usize,
}

impl<R> AsyncReadProducer<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    pub fn new(reader: R, handle: Handle, config: &ReadSourceConfig) -> Self {
        AsyncReadProducer {
            handle,
            state: Arc::new(Mutex::new(ReadState {
                reader: Some(reader),
                buf: BytesMut::with_capacity(config.buffer_size()),
            })),
            buffer_size: config.buffer_size(),
        }
    }
}

impl<R> ChunkProducer for AsyncReadProducer<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    fn produce(&mut self, sink: ChunkSink) -> Result<(), ContentError> {
        let state = Arc::clone(&self.state);
        let buffer_size = self.buffer_size;
        self.handle.spawn(async move {
            let mut guard = state.lock().await;
            let ReadState { reader, buf } = &mut *guard;
            let Some(reader) = reader.as_mut() else {
                // released while waiting for the lock
                return;
            };

            buf.clear();
            buf.reserve(buffer_size);
            let mut limited = (&mut *buf).limit(buffer_size);
            let r = reader.read_buf(&mut limited).await;
            let chunk = buf.split().freeze();
            drop(guard);

            let r = match r {
                Ok(0) => sink.finish(),
                Ok(_) => sink.deliver(chunk),
                Err(e) => sink.fail(ContentError::read_failed(e)),
            };
            if let Err(e) = r {
                debug!("content listener failed after async read: {e}");
            }
        });
        Ok(())
    }

    fn release(&mut self) -> Result<(), ContentError> {
        match self.state.try_lock() {
            Ok(mut guard) => {
                guard.reader.take();
            }
            Err(_) => {
                // a read is in progress, drop the reader after it
                let state = Arc::clone(&self.state);
                self.handle.spawn(async move {
                    state.lock().await.reader.take();
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BaseProvider, ContentProvider, ProviderPhase};
    use std::io::Cursor;
    use std::thread::ThreadId;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn chunks_from_workers() {
        let mut config = ReadSourceConfig::default();
        config.set_buffer_size(3);
        let provider = Arc::new(BaseProvider::from_async_reader(
            Cursor::new(b"abcdefgh".to_vec()),
            Handle::current(),
            None,
            None,
            &config,
        ));

        let (sender, receiver) = tokio::sync::oneshot::channel();
        let chunks = Arc::new(std::sync::Mutex::new(Vec::<(Vec<u8>, ThreadId)>::new()));
        let c = Arc::clone(&chunks);
        provider
            .on_success(Box::new(move || {
                let _ = sender.send(());
                Ok(())
            }))
            .unwrap();
        provider
            .on_content(Box::new(move |chunk, callback| {
                c.lock()
                    .unwrap()
                    .push((chunk.to_vec(), std::thread::current().id()));
                callback.processed()
            }))
            .unwrap();

        receiver.await.unwrap();
        assert_eq!(provider.phase(), ProviderPhase::Finished);
        let chunks = chunks.lock().unwrap();
        let data: Vec<u8> = chunks.iter().flat_map(|(d, _)| d.clone()).collect();
        assert_eq!(data, b"abcdefgh");
        assert!(chunks.iter().all(|(d, _)| d.len() <= 3));
        let test_thread = std::thread::current().id();
        assert!(chunks.iter().all(|(_, id)| *id != test_thread));
        provider.close().unwrap();
    }

    #[test]
    fn runtime_shutdown_fails_pending_read() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let provider = BaseProvider::from_async_reader(
            Cursor::new(b"abc".to_vec()),
            rt.handle().clone(),
            None,
            None,
            &ReadSourceConfig::default(),
        );
        provider.on_content(Box::new(|_, c| c.processed())).unwrap();
        assert_eq!(provider.phase(), ProviderPhase::Streaming);

        // the read task is dropped before it ever runs
        drop(rt);
        assert_eq!(provider.phase(), ProviderPhase::Errored);
        assert!(matches!(provider.failure(), Some(ContentError::Incomplete)));
        provider.close().unwrap();
    }
}
