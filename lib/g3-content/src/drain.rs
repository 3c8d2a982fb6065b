/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

//! Consume a whole provider into memory.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, ready};

use bytes::{Bytes, BytesMut};
use mime::Mime;
use tokio::sync::oneshot;

use crate::base::lock;
use crate::{AutoCloseProvider, ContentError, ContentProvider};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Charset {
    Utf8,
    Iso8859_1,
    UsAscii,
}

impl Charset {
    /// Get the charset from the `charset` parameter of a media type.
    pub fn from_mime(content_type: &Mime) -> Option<Self> {
        let charset = content_type.get_param(mime::CHARSET)?;
        match charset.as_str().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Some(Charset::Utf8),
            "iso-8859-1" | "latin1" | "iso_8859-1" => Some(Charset::Iso8859_1),
            "us-ascii" | "ascii" => Some(Charset::UsAscii),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Charset::Utf8 => "UTF-8",
            Charset::Iso8859_1 => "ISO-8859-1",
            Charset::UsAscii => "US-ASCII",
        }
    }

    pub fn decode(&self, data: &[u8]) -> Result<String, ContentError> {
        match self {
            Charset::Utf8 => match std::str::from_utf8(data) {
                Ok(s) => Ok(s.to_string()),
                Err(e) => Err(ContentError::Decode {
                    charset: self.name(),
                    position: e.valid_up_to(),
                }),
            },
            Charset::Iso8859_1 => Ok(data.iter().map(|b| char::from(*b)).collect()),
            Charset::UsAscii => match data.iter().position(|b| !b.is_ascii()) {
                Some(position) => Err(ContentError::Decode {
                    charset: self.name(),
                    position,
                }),
                None => Ok(data.iter().map(|b| char::from(*b)).collect()),
            },
        }
    }
}

type DrainResult<T> = Result<T, ContentError>;

struct Completion<T> {
    sender: Arc<Mutex<Option<oneshot::Sender<DrainResult<T>>>>>,
}

impl<T> Clone for Completion<T> {
    fn clone(&self) -> Self {
        Completion {
            sender: Arc::clone(&self.sender),
        }
    }
}

impl<T> Completion<T> {
    fn new() -> (Self, oneshot::Receiver<DrainResult<T>>) {
        let (sender, receiver) = oneshot::channel();
        let completion = Completion {
            sender: Arc::new(Mutex::new(Some(sender))),
        };
        (completion, receiver)
    }

    fn send(&self, r: DrainResult<T>) {
        if let Some(sender) = lock(&self.sender).take() {
            // the receiver may be gone, nobody is waiting then
            let _ = sender.send(r);
        }
    }
}

fn recv<T>(
    receiver: &mut oneshot::Receiver<DrainResult<T>>,
    cx: &mut Context<'_>,
) -> Poll<DrainResult<T>> {
    match ready!(Pin::new(receiver).poll(cx)) {
        Ok(r) => Poll::Ready(r),
        Err(_) => Poll::Ready(Err(ContentError::Incomplete)),
    }
}

fn subscribe<P>(provider: &P, completion: Completion<Bytes>)
where
    P: ContentProvider + ?Sized,
{
    let buf = Arc::new(Mutex::new(BytesMut::new()));

    let b = Arc::clone(&buf);
    let c = completion.clone();
    let r = provider.on_success(Box::new(move || {
        let data = std::mem::take(&mut *lock(&b));
        c.send(Ok(data.freeze()));
        Ok(())
    }));
    if let Err(e) = r {
        return completion.send(Err(e));
    }

    let c = completion.clone();
    let r = provider.on_error(Box::new(move |e| {
        c.send(Err(e));
        Ok(())
    }));
    if let Err(e) = r {
        return completion.send(Err(e));
    }

    let r = provider.on_content(Box::new(move |chunk, callback| {
        lock(&buf).extend_from_slice(&chunk);
        callback.processed()
    }));
    if let Err(e) = r {
        completion.send(Err(e));
    }
}

/// Future returned by [`read_all_bytes`].
pub struct ReadAllBytes {
    receiver: oneshot::Receiver<DrainResult<Bytes>>,
}

impl Future for ReadAllBytes {
    type Output = Result<Bytes, ContentError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        recv(&mut self.receiver, cx)
    }
}

/// Collect every chunk of `provider` into one buffer.
///
/// The provider is subscribed at once, the returned future resolves on the
/// terminal state. The provider is not closed, and it must stay alive until
/// the future resolves.
pub fn read_all_bytes<P>(provider: &P) -> ReadAllBytes
where
    P: ContentProvider + ?Sized,
{
    let (completion, receiver) = Completion::new();
    subscribe(provider, completion);
    ReadAllBytes { receiver }
}

/// Future returned by [`read_to_string`].
pub struct ReadToString {
    inner: ReadAllBytes,
    charset: Charset,
}

impl Future for ReadToString {
    type Output = Result<String, ContentError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let data = ready!(Pin::new(&mut self.inner).poll(cx))?;
        Poll::Ready(self.charset.decode(&data))
    }
}

/// Collect `provider` and decode it with `charset`.
pub fn read_to_string<P>(provider: &P, charset: Charset) -> ReadToString
where
    P: ContentProvider + ?Sized,
{
    ReadToString {
        inner: read_all_bytes(provider),
        charset,
    }
}

/// Future returned by [`discard`].
pub struct Discard {
    _provider: AutoCloseProvider,
    receiver: oneshot::Receiver<DrainResult<()>>,
}

impl Future for Discard {
    type Output = Result<(), ContentError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        recv(&mut self.receiver, cx)
    }
}

/// Consume and drop all the content of `provider`, closing it at the end.
pub fn discard<P>(provider: P) -> Discard
where
    P: ContentProvider + 'static,
{
    let provider = AutoCloseProvider::new(Box::new(provider));
    let (completion, receiver) = Completion::new();

    let c = completion.clone();
    let r = provider.on_success(Box::new(move || {
        c.send(Ok(()));
        Ok(())
    }));
    if let Err(e) = r {
        completion.send(Err(e));
    }

    let c = completion.clone();
    let r = provider.on_error(Box::new(move |e| {
        c.send(Err(e));
        Ok(())
    }));
    if let Err(e) = r {
        completion.send(Err(e));
    }

    let r = provider.on_content(Box::new(|_chunk, callback| callback.processed()));
    if let Err(e) = r {
        completion.send(Err(e));
    }

    Discard {
        _provider: provider,
        receiver,
    }
}
