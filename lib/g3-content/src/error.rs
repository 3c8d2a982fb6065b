/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::sync::Arc;

use thiserror::Error;

/// Failure recorded by a content provider.
///
/// The value is cheap to clone as it is stored by the provider, replayed to
/// late error listeners and returned from `failure()`.
#[derive(Clone, Debug, Error)]
pub enum ContentError {
    #[error("content provider is already closed")]
    AlreadyClosed,
    #[error("content listener is already registered")]
    ListenerAlreadyRegistered,
    #[error("read failed: {0:?}")]
    ReadFailed(Arc<io::Error>),
    #[error("close failed: {0:?}")]
    CloseFailed(Arc<io::Error>),
    #[error("aborted: {0}")]
    Aborted(Arc<anyhow::Error>),
    #[error("invalid media type: {0}")]
    InvalidMediaType(String),
    #[error("{charset} decode failed at byte {position}")]
    Decode {
        charset: &'static str,
        position: usize,
    },
    #[error("content provider dropped before completion")]
    Incomplete,
    #[error("automatic close after success failed: {0}")]
    ClosedAfterSuccess(Box<ContentError>),
    #[error("{primary} (with {} suppressed)", .suppressed.len())]
    Aggregate {
        primary: Box<ContentError>,
        suppressed: Vec<ContentError>,
    },
}

impl ContentError {
    pub fn read_failed(e: io::Error) -> Self {
        ContentError::ReadFailed(Arc::new(e))
    }

    pub fn close_failed(e: io::Error) -> Self {
        ContentError::CloseFailed(Arc::new(e))
    }

    pub fn aborted<E>(e: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        ContentError::Aborted(Arc::new(e.into()))
    }

    /// Tag a release failure that happened right after a successful stream,
    /// so error paths know the resources have already been closed.
    pub fn closed_after_success(self) -> Self {
        ContentError::ClosedAfterSuccess(Box::new(self))
    }

    pub fn is_closed_after_success(&self) -> bool {
        matches!(self, ContentError::ClosedAfterSuccess(_))
    }

    /// Attach `other` as secondary information, keeping `self` as primary.
    pub fn with_suppressed(self, other: ContentError) -> Self {
        match self {
            ContentError::Aggregate {
                primary,
                mut suppressed,
            } => {
                suppressed.push(other);
                ContentError::Aggregate {
                    primary,
                    suppressed,
                }
            }
            e => ContentError::Aggregate {
                primary: Box::new(e),
                suppressed: vec![other],
            },
        }
    }

    pub fn primary(&self) -> &ContentError {
        match self {
            ContentError::Aggregate { primary, .. } => primary,
            e => e,
        }
    }

    pub fn suppressed(&self) -> &[ContentError] {
        match self {
            ContentError::Aggregate { suppressed, .. } => suppressed,
            _ => &[],
        }
    }
}

/// Folds the failures of a multi-resource release into one error.
///
/// The first pushed error becomes the primary one, every later one is
/// attached to it as suppressed.
#[derive(Debug, Default)]
pub struct ErrorCollector {
    error: Option<ContentError>,
}

impl ErrorCollector {
    pub fn push(&mut self, e: ContentError) {
        self.error = match self.error.take() {
            Some(primary) => Some(primary.with_suppressed(e)),
            None => Some(e),
        };
    }

    pub fn check(&mut self, r: Result<(), ContentError>) {
        if let Err(e) = r {
            self.push(e);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<(), ContentError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
