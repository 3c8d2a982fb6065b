/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use bytes::Bytes;
use log::debug;
use mime::Mime;

use crate::{ContentError, ContentListener, ContentProvider, ErrorAction, SuccessAction};

/// The data source behind a [`BaseProvider`].
pub trait ChunkProducer: Send {
    /// Produce the next chunk, or report the end of data, through `sink`.
    ///
    /// The sink may be completed before returning or later from any thread.
    /// This won't be called again before the delivered chunk is acknowledged.
    fn produce(&mut self, sink: ChunkSink) -> Result<(), ContentError>;

    fn release(&mut self) -> Result<(), ContentError>;
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProviderPhase {
    Idle,
    Streaming,
    Finished,
    Errored,
}

enum Event {
    Chunk(Bytes),
    End,
    Failed(ContentError),
}

enum Step {
    Dispatch(Event),
    Produce,
}

struct State {
    phase: ProviderPhase,
    failure: Option<ContentError>,
    closed: bool,
    error_action: Option<ErrorAction>,
    success_action: Option<SuccessAction>,
    pull_requested: bool,
    event: Option<Event>,
    driving: bool,
}

impl State {
    fn new() -> Self {
        State {
            phase: ProviderPhase::Idle,
            failure: None,
            closed: false,
            error_action: None,
            success_action: None,
            pull_requested: false,
            event: None,
            driving: false,
        }
    }

    fn is_streaming(&self) -> bool {
        self.phase == ProviderPhase::Streaming && !self.closed
    }
}

pub(crate) fn lock<T: ?Sized>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // a panicking listener should not wedge the provider
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Shared {
    content_length: Option<u64>,
    content_type: Option<Mime>,
    producer: Mutex<Box<dyn ChunkProducer>>,
    listener: Mutex<Option<ContentListener>>,
    state: Mutex<State>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, State> {
        lock(&self.state)
    }

    fn request_pull(self: &Arc<Self>) -> Result<(), ContentError> {
        {
            let mut state = self.state();
            if !state.is_streaming() {
                return Ok(());
            }
            state.pull_requested = true;
            if state.driving {
                return Ok(());
            }
            state.driving = true;
        }
        self.drive()
    }

    fn complete(self: &Arc<Self>, event: Event) -> Result<(), ContentError> {
        {
            let mut state = self.state();
            if state.event.is_some() {
                debug!("content event dropped as the previous one is not dispatched yet");
                return Ok(());
            }
            state.event = Some(event);
            if state.driving {
                return Ok(());
            }
            state.driving = true;
        }
        self.drive()
    }

    /// Run queued pull requests and events until none is left.
    ///
    /// Only one caller drives at a time, others just queue their work, which
    /// keeps the stack flat for synchronous acknowledgment chains.
    fn drive(self: &Arc<Self>) -> Result<(), ContentError> {
        loop {
            let step = {
                let mut state = self.state();
                if let Some(event) = state.event.take() {
                    Step::Dispatch(event)
                } else if state.pull_requested && state.is_streaming() {
                    state.pull_requested = false;
                    Step::Produce
                } else {
                    state.pull_requested = false;
                    state.driving = false;
                    return Ok(());
                }
            };

            let r = match step {
                Step::Dispatch(event) => self.dispatch(event),
                Step::Produce => {
                    self.produce();
                    Ok(())
                }
            };
            if let Err(e) = r {
                let mut state = self.state();
                state.event = None;
                state.driving = false;
                return Err(e);
            }
        }
    }

    fn produce(self: &Arc<Self>) {
        let sink = ChunkSink {
            shared: Arc::downgrade(self),
        };
        let r = lock(&self.producer).produce(sink);
        if let Err(e) = r {
            let mut state = self.state();
            if state.event.replace(Event::Failed(e)).is_some() {
                debug!("completed content event replaced by the producer failure");
            }
        }
    }

    fn dispatch(self: &Arc<Self>, event: Event) -> Result<(), ContentError> {
        match event {
            Event::Chunk(chunk) => self.deliver(chunk),
            Event::End => self.finish(),
            Event::Failed(e) => self.fail(e),
        }
    }

    fn deliver(self: &Arc<Self>, chunk: Bytes) -> Result<(), ContentError> {
        if !self.state().is_streaming() {
            debug!("chunk of {} bytes dropped after the stream ended", chunk.len());
            return Ok(());
        }

        let callback = ContentCallback {
            shared: Arc::clone(self),
        };
        let r = match lock(&self.listener).as_mut() {
            Some(listener) => listener(chunk, callback),
            None => Ok(()),
        };
        match r {
            Ok(_) => Ok(()),
            Err(e) => self.fail(e),
        }
    }

    fn finish(&self) -> Result<(), ContentError> {
        let action = {
            let mut state = self.state();
            if !state.is_streaming() {
                debug!("end of content dropped after the stream ended");
                return Ok(());
            }
            state.phase = ProviderPhase::Finished;
            state.success_action.take()
        };
        match action {
            Some(action) => self.run_success(action),
            None => Ok(()),
        }
    }

    fn fail(&self, e: ContentError) -> Result<(), ContentError> {
        let action = {
            let mut state = self.state();
            if !state.is_streaming() {
                debug!("content failure dropped after the stream ended: {e}");
                return Ok(());
            }
            state.phase = ProviderPhase::Errored;
            state.failure = Some(e.clone());
            state.error_action.take()
        };
        match action {
            Some(action) => action(e),
            None => Ok(()),
        }
    }

    fn run_success(&self, action: SuccessAction) -> Result<(), ContentError> {
        let Err(e) = action() else {
            return Ok(());
        };

        // reroute into the error channel, this is the only way out of Finished
        let action = {
            let mut state = self.state();
            state.phase = ProviderPhase::Errored;
            state.failure = Some(e.clone());
            state.error_action.take()
        };
        match action {
            Some(action) => action(e),
            None => Ok(()),
        }
    }
}

/// One-shot completion handle passed to [`ChunkProducer::produce`].
///
/// Dropping it without completion fails the stream with
/// [`ContentError::Incomplete`].
#[must_use = "the pull request is stalled until the sink is completed"]
pub struct ChunkSink {
    shared: Weak<Shared>,
}

impl ChunkSink {
    pub fn deliver(self, chunk: Bytes) -> Result<(), ContentError> {
        self.complete(Event::Chunk(chunk))
    }

    pub fn finish(self) -> Result<(), ContentError> {
        self.complete(Event::End)
    }

    pub fn fail(self, e: ContentError) -> Result<(), ContentError> {
        self.complete(Event::Failed(e))
    }

    fn complete(mut self, event: Event) -> Result<(), ContentError> {
        match std::mem::take(&mut self.shared).upgrade() {
            Some(shared) => shared.complete(event),
            None => Ok(()),
        }
    }
}

impl Drop for ChunkSink {
    fn drop(&mut self) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        debug!("chunk sink dropped without being completed");
        if let Err(e) = shared.complete(Event::Failed(ContentError::Incomplete)) {
            debug!("error action failed after a dropped chunk sink: {e}");
        }
    }
}

/// Acknowledgment of one delivered chunk.
#[must_use = "the stream is stalled until the chunk is acknowledged"]
pub struct ContentCallback {
    shared: Arc<Shared>,
}

impl ContentCallback {
    /// The chunk is consumed, pull the next one.
    pub fn processed(self) -> Result<(), ContentError> {
        self.shared.request_pull()
    }

    /// Abort the stream with `cause`.
    pub fn failed(self, cause: ContentError) -> Result<(), ContentError> {
        self.shared.complete(Event::Failed(cause))
    }
}

/// Provider skeleton implementing the state machine and the pull loop on
/// top of a [`ChunkProducer`].
pub struct BaseProvider {
    shared: Arc<Shared>,
}

impl BaseProvider {
    pub fn new<P>(producer: P, content_length: Option<u64>, content_type: Option<Mime>) -> Self
    where
        P: ChunkProducer + 'static,
    {
        crate::leak::add_open();
        BaseProvider {
            shared: Arc::new(Shared {
                content_length,
                content_type,
                producer: Mutex::new(Box::new(producer)),
                listener: Mutex::new(None),
                state: Mutex::new(State::new()),
            }),
        }
    }

    pub fn phase(&self) -> ProviderPhase {
        self.shared.state().phase
    }
}

impl ContentProvider for BaseProvider {
    fn close(&self) -> Result<(), ContentError> {
        {
            let mut state = self.shared.state();
            if state.closed {
                return Ok(());
            }
            state.closed = true;
            state.pull_requested = false;
            state.event = None;
        }
        crate::leak::del_open();
        lock(&self.shared.producer).release()
    }

    fn content_length(&self) -> Option<u64> {
        self.shared.content_length
    }

    fn content_type(&self) -> Option<Mime> {
        self.shared.content_type.clone()
    }

    fn failure(&self) -> Option<ContentError> {
        self.shared.state().failure.clone()
    }

    fn is_closed(&self) -> bool {
        self.shared.state().closed
    }

    fn on_content(&self, listener: ContentListener) -> Result<(), ContentError> {
        {
            let mut state = self.shared.state();
            if state.closed {
                return Err(ContentError::AlreadyClosed);
            }
            if state.phase != ProviderPhase::Idle {
                return Err(ContentError::ListenerAlreadyRegistered);
            }
            state.phase = ProviderPhase::Streaming;
        }
        *lock(&self.shared.listener) = Some(listener);
        self.shared.request_pull()
    }

    fn on_error(&self, action: ErrorAction) -> Result<(), ContentError> {
        let failure = {
            let mut state = self.shared.state();
            let failure = match state.phase {
                ProviderPhase::Errored => state.failure.clone(),
                _ => None,
            };
            match failure {
                Some(e) => e,
                None => {
                    state.error_action = Some(action);
                    return Ok(());
                }
            }
        };
        action(failure)
    }

    fn on_success(&self, action: SuccessAction) -> Result<(), ContentError> {
        {
            let mut state = self.shared.state();
            if state.phase != ProviderPhase::Finished {
                state.success_action = Some(action);
                return Ok(());
            }
        }
        self.shared.run_success(action)
    }
}

impl Drop for BaseProvider {
    fn drop(&mut self) {
        if !self.shared.state().closed {
            debug!("content provider dropped without being closed");
        }
    }
}
