/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

use g3_content::{
    BaseProvider, ChunkProducer, ChunkSink, ConcatenatedProvider, ContentError, ContentProvider,
};

pub fn leaf(s: &'static str) -> Box<dyn ContentProvider> {
    Box::new(BaseProvider::from_static(s.as_bytes(), None))
}

struct FailingProducer {
    error: Option<ContentError>,
}

impl ChunkProducer for FailingProducer {
    fn produce(&mut self, sink: ChunkSink) -> Result<(), ContentError> {
        let e = self.error.take().unwrap_or(ContentError::Incomplete);
        sink.fail(e)
    }

    fn release(&mut self) -> Result<(), ContentError> {
        Ok(())
    }
}

/// Transport like source: each chunk is a separate buffer, optionally
/// followed by a failure instead of the end of data.
pub fn chunked(chunks: &[&'static str], error: Option<ContentError>) -> ConcatenatedProvider {
    let mut components: Vec<Box<dyn ContentProvider>> =
        chunks.iter().copied().map(leaf).collect();
    if let Some(e) = error {
        components.push(Box::new(BaseProvider::new(
            FailingProducer { error: Some(e) },
            None,
            None,
        )));
    }
    ConcatenatedProvider::new(None, components)
}

/// Produces `count` one byte chunks, each delivered from a spawned task.
pub struct TickingProducer {
    remaining: usize,
    handle: Handle,
    stats: Arc<FlowStats>,
}

impl TickingProducer {
    pub fn provider(count: usize, stats: &Arc<FlowStats>) -> BaseProvider {
        let producer = TickingProducer {
            remaining: count,
            handle: Handle::current(),
            stats: Arc::clone(stats),
        };
        BaseProvider::new(producer, Some(count as u64), None)
    }
}

impl ChunkProducer for TickingProducer {
    fn produce(&mut self, sink: ChunkSink) -> Result<(), ContentError> {
        let chunk = if self.remaining > 0 {
            self.remaining -= 1;
            self.stats.on_produce();
            Some(Bytes::from_static(b"x"))
        } else {
            None
        };
        self.handle.spawn(async move {
            tokio::task::yield_now().await;
            let _ = match chunk {
                Some(chunk) => sink.deliver(chunk),
                None => sink.finish(),
            };
        });
        Ok(())
    }

    fn release(&mut self) -> Result<(), ContentError> {
        Ok(())
    }
}

/// Counts the chunks between production and acknowledgment.
#[derive(Default)]
pub struct FlowStats {
    produced: AtomicUsize,
    acked: AtomicUsize,
    max_ahead: AtomicUsize,
    outstanding: AtomicUsize,
    max_outstanding: AtomicUsize,
}

impl FlowStats {
    fn on_produce(&self) {
        let produced = self.produced.fetch_add(1, Ordering::SeqCst) + 1;
        let acked = self.acked.load(Ordering::SeqCst);
        self.max_ahead
            .fetch_max(produced.saturating_sub(acked), Ordering::SeqCst);
    }

    pub fn on_receive(&self) {
        let n = self.outstanding.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_outstanding.fetch_max(n, Ordering::SeqCst);
    }

    pub fn on_ack(&self) {
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
        self.acked.fetch_add(1, Ordering::SeqCst);
    }

    pub fn max_outstanding(&self) -> usize {
        self.max_outstanding.load(Ordering::SeqCst)
    }

    /// Max number of produce calls not covered by an acknowledgment.
    pub fn max_ahead(&self) -> usize {
        self.max_ahead.load(Ordering::SeqCst)
    }
}

/// Consume `provider` acknowledging each chunk later from another task.
pub async fn consume_slowly(
    provider: &dyn ContentProvider,
    stats: &Arc<FlowStats>,
) -> Result<Vec<u8>, ContentError> {
    let (sender, receiver) = oneshot::channel();
    let sender = Arc::new(Mutex::new(Some(sender)));
    let data = Arc::new(Mutex::new(Vec::new()));

    let s = Arc::clone(&sender);
    let d = Arc::clone(&data);
    provider.on_success(Box::new(move || {
        if let Some(s) = s.lock().unwrap().take() {
            let _ = s.send(Ok(std::mem::take(&mut *d.lock().unwrap())));
        }
        Ok(())
    }))?;
    let s = Arc::clone(&sender);
    provider.on_error(Box::new(move |e| {
        if let Some(s) = s.lock().unwrap().take() {
            let _ = s.send(Err(e));
        }
        Ok(())
    }))?;

    let stats = Arc::clone(stats);
    let handle = Handle::current();
    provider.on_content(Box::new(move |chunk, callback| {
        stats.on_receive();
        data.lock().unwrap().extend_from_slice(&chunk);
        let stats = Arc::clone(&stats);
        handle.spawn(async move {
            tokio::time::sleep(Duration::from_millis(1)).await;
            stats.on_ack();
            let _ = callback.processed();
        });
        Ok(())
    }))?;

    receiver.await.unwrap_or(Err(ContentError::Incomplete))
}
