/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::{Arc, Mutex, Weak};

use bytes::Bytes;
use log::debug;
use mime::Mime;

use crate::base::lock;
use crate::{
    BaseProvider, ChunkProducer, ChunkSink, ContentCallback, ContentError, ContentListener,
    ContentProvider, ErrorAction, ErrorCollector, ProviderPhase, SuccessAction,
};

/// Something a component reported while no pull was waiting for it.
enum Pending {
    Chunk(Bytes, ContentCallback),
    End,
    Failed(ContentError),
}

enum Completion {
    Chunk(Bytes),
    End,
    Failed(ContentError),
}

impl Completion {
    fn send(self, sink: ChunkSink) -> Result<(), ContentError> {
        match self {
            Completion::Chunk(chunk) => sink.deliver(chunk),
            Completion::End => sink.finish(),
            Completion::Failed(e) => sink.fail(e),
        }
    }
}

#[derive(Default)]
struct Handoff {
    pending: Option<Pending>,
    pull: Option<ChunkSink>,
    inflight: Option<ContentCallback>,
    released: bool,
}

impl Handoff {
    /// Pair `event` with a waiting pull, keeping the acknowledgment of a
    /// component chunk until our own consumer asks for more.
    fn pair(&mut self, event: Pending) -> Completion {
        match event {
            Pending::Chunk(chunk, callback) => {
                self.inflight = Some(callback);
                Completion::Chunk(chunk)
            }
            Pending::End => Completion::End,
            Pending::Failed(e) => Completion::Failed(e),
        }
    }
}

#[derive(Default)]
struct Cursor {
    next: usize,
    requested: bool,
    running: bool,
}

struct ConcatShared {
    components: Box<[Box<dyn ContentProvider>]>,
    handoff: Mutex<Handoff>,
    cursor: Mutex<Cursor>,
}

impl ConcatShared {
    fn emit(&self, event: Pending) -> Result<(), ContentError> {
        let (completion, sink) = {
            let mut handoff = lock(&self.handoff);
            if handoff.released {
                return Ok(());
            }
            match handoff.pull.take() {
                Some(sink) => (handoff.pair(event), sink),
                None => {
                    if handoff.pending.replace(event).is_some() {
                        debug!("component event replaced before being pulled");
                    }
                    return Ok(());
                }
            }
        };
        completion.send(sink)
    }

    /// Subscribe to the next component, or report the end of all of them.
    ///
    /// Components that finish during the subscription only queue another
    /// round, so a run of empty components won't grow the stack.
    fn advance(self: &Arc<Self>) -> Result<(), ContentError> {
        {
            let mut cursor = lock(&self.cursor);
            cursor.requested = true;
            if cursor.running {
                return Ok(());
            }
            cursor.running = true;
        }

        let mut r = Ok(());
        loop {
            let index = {
                let mut cursor = lock(&self.cursor);
                if !cursor.requested || r.is_err() {
                    cursor.requested = false;
                    cursor.running = false;
                    return r;
                }
                cursor.requested = false;
                let index = cursor.next;
                cursor.next += 1;
                index
            };
            r = self.subscribe(index);
        }
    }

    fn subscribe(self: &Arc<Self>, index: usize) -> Result<(), ContentError> {
        let Some(component) = self.components.get(index) else {
            return self.emit(Pending::End);
        };
        if component.is_closed() {
            return self.emit(Pending::Failed(ContentError::AlreadyClosed));
        }

        let weak = Arc::downgrade(self);
        if let Err(e) = component.on_success(success_action(weak.clone())) {
            return self.emit(Pending::Failed(e));
        }
        if let Err(e) = component.on_error(error_action(weak.clone())) {
            return self.emit(Pending::Failed(e));
        }
        if let Err(e) = component.on_content(content_listener(weak)) {
            return self.emit(Pending::Failed(e));
        }
        Ok(())
    }
}

fn success_action(shared: Weak<ConcatShared>) -> SuccessAction {
    Box::new(move || match shared.upgrade() {
        Some(shared) => shared.advance(),
        None => Ok(()),
    })
}

fn error_action(shared: Weak<ConcatShared>) -> ErrorAction {
    Box::new(move |e| match shared.upgrade() {
        Some(shared) => shared.emit(Pending::Failed(e)),
        None => Ok(()),
    })
}

fn content_listener(shared: Weak<ConcatShared>) -> ContentListener {
    Box::new(move |chunk, callback| match shared.upgrade() {
        Some(shared) => shared.emit(Pending::Chunk(chunk, callback)),
        None => callback.failed(ContentError::AlreadyClosed),
    })
}

struct ConcatSource {
    shared: Arc<ConcatShared>,
    started: bool,
}

impl ChunkProducer for ConcatSource {
    fn produce(&mut self, sink: ChunkSink) -> Result<(), ContentError> {
        let (ack, ready) = {
            let mut handoff = lock(&self.shared.handoff);
            let ack = handoff.inflight.take();
            match handoff.pending.take() {
                Some(event) => (ack, Some((handoff.pair(event), sink))),
                None => {
                    handoff.pull = Some(sink);
                    (ack, None)
                }
            }
        };
        if let Some((completion, sink)) = ready {
            completion.send(sink)?;
        }

        if !self.started {
            self.started = true;
            return self.shared.advance();
        }
        match ack {
            Some(callback) => callback.processed(),
            None => Ok(()),
        }
    }

    fn release(&mut self) -> Result<(), ContentError> {
        let (pending, pull, inflight) = {
            let mut handoff = lock(&self.shared.handoff);
            handoff.released = true;
            (
                handoff.pending.take(),
                handoff.pull.take(),
                handoff.inflight.take(),
            )
        };
        drop((pending, pull, inflight));

        let mut errors = ErrorCollector::default();
        for component in self.shared.components.iter() {
            errors.check(component.close());
        }
        errors.into_result()
    }
}

/// Presents an ordered list of providers as one stream.
///
/// Components are subscribed one after the other once the content listener is
/// registered. A component chunk is acknowledged only when the next chunk is
/// pulled from the concatenation. The first component failure ends the stream
/// and the remaining components are never subscribed. Closing closes every
/// component.
pub struct ConcatenatedProvider {
    base: BaseProvider,
}

impl ConcatenatedProvider {
    pub fn new(content_type: Option<Mime>, components: Vec<Box<dyn ContentProvider>>) -> Self {
        let content_length = components
            .iter()
            .try_fold(0u64, |sum, c| c.content_length().and_then(|l| sum.checked_add(l)));
        let source = ConcatSource {
            shared: Arc::new(ConcatShared {
                components: components.into_boxed_slice(),
                handoff: Mutex::new(Handoff::default()),
                cursor: Mutex::new(Cursor::default()),
            }),
            started: false,
        };
        ConcatenatedProvider {
            base: BaseProvider::new(source, content_length, content_type),
        }
    }

    pub fn phase(&self) -> ProviderPhase {
        self.base.phase()
    }
}

impl ContentProvider for ConcatenatedProvider {
    fn close(&self) -> Result<(), ContentError> {
        self.base.close()
    }

    fn content_length(&self) -> Option<u64> {
        self.base.content_length()
    }

    fn content_type(&self) -> Option<Mime> {
        self.base.content_type()
    }

    fn failure(&self) -> Option<ContentError> {
        self.base.failure()
    }

    fn is_closed(&self) -> bool {
        self.base.is_closed()
    }

    fn on_content(&self, listener: ContentListener) -> Result<(), ContentError> {
        self.base.on_content(listener)
    }

    fn on_error(&self, action: ErrorAction) -> Result<(), ContentError> {
        self.base.on_error(action)
    }

    fn on_success(&self, action: SuccessAction) -> Result<(), ContentError> {
        self.base.on_success(action)
    }
}
