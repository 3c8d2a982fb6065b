/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

#[cfg(feature = "yaml")]
mod yaml;

const DEFAULT_READ_BUFFER_SIZE: usize = 16 * 1024; // 16KB
const MINIMAL_READ_BUFFER_SIZE: usize = 1;

/// Settings of the reader backed leaf producers.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ReadSourceConfig {
    buffer_size: usize,
}

impl Default for ReadSourceConfig {
    fn default() -> Self {
        ReadSourceConfig {
            buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }
}

impl ReadSourceConfig {
    /// Set the max size of each produced chunk.
    pub fn set_buffer_size(&mut self, buffer_size: usize) {
        self.buffer_size = buffer_size.max(MINIMAL_READ_BUFFER_SIZE);
    }

    #[inline]
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }
}
