/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;

use bytes::Bytes;
use mime::Mime;

use crate::{ContentCallback, ContentError};

/// Receives the chunks of a provider, one at a time.
///
/// The chunk must be acknowledged through the callback before the provider
/// produces the next one. Returning an error has the same effect as calling
/// [`ContentCallback::failed`].
pub type ContentListener = Box<dyn FnMut(Bytes, ContentCallback) -> Result<(), ContentError> + Send>;

/// Called once with the failure of the provider.
///
/// An error returned here is not handled by the provider, it is returned from
/// the call that triggered the error dispatch.
pub type ErrorAction = Box<dyn FnOnce(ContentError) -> Result<(), ContentError> + Send>;

/// Called once when all chunks are delivered and acknowledged.
///
/// An error returned here becomes the failure of the provider and is
/// reported to the error action.
pub type SuccessAction = Box<dyn FnOnce() -> Result<(), ContentError> + Send>;

/// Asynchronous byte source with explicit backpressure.
///
/// A provider is driven by a single consumer. Production starts when the
/// content listener is registered, and at most one chunk is in flight until
/// it is acknowledged. Error and success actions registered after the
/// matching terminal state are invoked during the registration.
pub trait ContentProvider: Send + Sync {
    /// Release the resources of the provider. Only the first call does the
    /// release, and only that call may return the release failure.
    fn close(&self) -> Result<(), ContentError>;

    /// The declared length, if known in advance.
    fn content_length(&self) -> Option<u64>;

    fn content_type(&self) -> Option<Mime>;

    /// The failure that terminated the stream, if any.
    fn failure(&self) -> Option<ContentError>;

    fn is_closed(&self) -> bool;

    /// Register the content listener and start pulling chunks.
    fn on_content(&self, listener: ContentListener) -> Result<(), ContentError>;

    fn on_error(&self, action: ErrorAction) -> Result<(), ContentError>;

    fn on_success(&self, action: SuccessAction) -> Result<(), ContentError>;
}

macro_rules! impl_for_pointer {
    ($ptr:ident) => {
        impl<T: ContentProvider + ?Sized> ContentProvider for $ptr<T> {
            fn close(&self) -> Result<(), ContentError> {
                (**self).close()
            }

            fn content_length(&self) -> Option<u64> {
                (**self).content_length()
            }

            fn content_type(&self) -> Option<Mime> {
                (**self).content_type()
            }

            fn failure(&self) -> Option<ContentError> {
                (**self).failure()
            }

            fn is_closed(&self) -> bool {
                (**self).is_closed()
            }

            fn on_content(&self, listener: ContentListener) -> Result<(), ContentError> {
                (**self).on_content(listener)
            }

            fn on_error(&self, action: ErrorAction) -> Result<(), ContentError> {
                (**self).on_error(action)
            }

            fn on_success(&self, action: SuccessAction) -> Result<(), ContentError> {
                (**self).on_success(action)
            }
        }
    };
}

impl_for_pointer!(Box);
impl_for_pointer!(Arc);
