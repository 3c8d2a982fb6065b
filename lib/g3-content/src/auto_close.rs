/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::{Arc, Mutex, Weak};

use log::warn;
use mime::Mime;

use crate::base::lock;
use crate::{
    ContentError, ContentListener, ContentProvider, ErrorAction, ErrorCollector, SuccessAction,
};

/// A resource closed together with an [`AutoCloseProvider`].
pub trait Release: Send {
    fn release(self: Box<Self>) -> Result<(), ContentError>;
}

impl<F> Release for F
where
    F: FnOnce() -> Result<(), ContentError> + Send,
{
    fn release(self: Box<Self>) -> Result<(), ContentError> {
        (*self)()
    }
}

struct Resources {
    wrapped: Box<dyn ContentProvider>,
    extras: Mutex<Vec<Box<dyn Release>>>,
}

impl Resources {
    /// Close the wrapped provider then the extra resources, each one once.
    fn close_all(&self) -> Result<(), ContentError> {
        let mut errors = ErrorCollector::default();
        errors.check(self.wrapped.close());
        let extras = std::mem::take(&mut *lock(&self.extras));
        for extra in extras {
            errors.check(extra.release());
        }
        errors.into_result()
    }
}

/// Closes the wrapped provider and the extra resources as soon as the stream
/// reaches a terminal state, whether or not terminal actions are registered.
///
/// Actions registered on the wrapper replace the default ones installed on
/// the wrapped provider, with the close composed on top of them. On success the user action runs first, then everything is closed and a
/// close failure is reported through the error channel tagged as
/// [`ContentError::ClosedAfterSuccess`]. On error everything is closed after
/// the user action, unless the error is that tag. Failures of the user action
/// and of the close are merged into one aggregated error.
pub struct AutoCloseProvider {
    resources: Arc<Resources>,
}

impl AutoCloseProvider {
    pub fn new(wrapped: Box<dyn ContentProvider>) -> Self {
        AutoCloseProvider::with_resources(wrapped, Vec::new())
    }

    pub fn with_resources(
        wrapped: Box<dyn ContentProvider>,
        extras: Vec<Box<dyn Release>>,
    ) -> Self {
        let resources = Arc::new(Resources {
            wrapped,
            extras: Mutex::new(extras),
        });

        // the consumer may never register terminal actions, close anyway
        let weak = Arc::downgrade(&resources);
        let r = resources
            .wrapped
            .on_success(close_on_success(weak.clone(), Box::new(|| Ok(()))));
        if let Err(e) = r {
            warn!("failed to install close on success action: {e}");
        }
        let r = resources
            .wrapped
            .on_error(close_on_error(weak, Box::new(|_| Ok(()))));
        if let Err(e) = r {
            warn!("failed to install close on error action: {e}");
        }

        AutoCloseProvider { resources }
    }

    /// Add one more resource to close with the provider.
    ///
    /// The resource is released at once if everything is closed already.
    pub fn push_resource(&self, extra: Box<dyn Release>) -> Result<(), ContentError> {
        if self.resources.wrapped.is_closed() {
            return extra.release();
        }
        lock(&self.resources.extras).push(extra);
        Ok(())
    }
}

fn close_on_success(resources: Weak<Resources>, action: SuccessAction) -> SuccessAction {
    Box::new(move || {
        action()?;
        match resources.upgrade() {
            Some(resources) => resources
                .close_all()
                .map_err(ContentError::closed_after_success),
            None => Ok(()),
        }
    })
}

fn close_on_error(resources: Weak<Resources>, action: ErrorAction) -> ErrorAction {
    Box::new(move |e| {
        let skip_close = e.is_closed_after_success();
        let mut errors = ErrorCollector::default();
        errors.check(action(e));
        if !skip_close && let Some(resources) = resources.upgrade() {
            errors.check(resources.close_all());
        }
        errors.into_result().inspect_err(|e| {
            warn!("failed to close content provider after error: {e}");
        })
    })
}

impl ContentProvider for AutoCloseProvider {
    fn close(&self) -> Result<(), ContentError> {
        self.resources.close_all()
    }

    fn content_length(&self) -> Option<u64> {
        self.resources.wrapped.content_length()
    }

    fn content_type(&self) -> Option<Mime> {
        self.resources.wrapped.content_type()
    }

    fn failure(&self) -> Option<ContentError> {
        self.resources.wrapped.failure()
    }

    fn is_closed(&self) -> bool {
        self.resources.wrapped.is_closed()
    }

    fn on_content(&self, listener: ContentListener) -> Result<(), ContentError> {
        self.resources.wrapped.on_content(listener)
    }

    fn on_error(&self, action: ErrorAction) -> Result<(), ContentError> {
        let action = close_on_error(Arc::downgrade(&self.resources), action);
        self.resources.wrapped.on_error(action)
    }

    fn on_success(&self, action: SuccessAction) -> Result<(), ContentError> {
        let action = close_on_success(Arc::downgrade(&self.resources), action);
        self.resources.wrapped.on_success(action)
    }
}
