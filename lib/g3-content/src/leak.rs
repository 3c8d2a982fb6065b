/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

//! Debug counter of providers that were created but never closed.
//!
//! This is only a diagnostic. Resources are never reclaimed through it.

use std::sync::atomic::{AtomicUsize, Ordering};

static OPEN_PROVIDERS: AtomicUsize = AtomicUsize::new(0);

pub(crate) fn add_open() {
    OPEN_PROVIDERS.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn del_open() {
    OPEN_PROVIDERS.fetch_sub(1, Ordering::Relaxed);
}

/// Number of base providers created and not closed yet in this process.
pub fn unclosed_count() -> usize {
    OPEN_PROVIDERS.load(Ordering::Relaxed)
}
