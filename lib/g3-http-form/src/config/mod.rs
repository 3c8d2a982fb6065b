/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

#[cfg(feature = "yaml")]
mod yaml;

const DEFAULT_BOUNDARY_PREFIX: &str = "G3ContentBoundary";
const DEFAULT_BOUNDARY_RANDOM_LEN: usize = 16;
const MINIMAL_BOUNDARY_RANDOM_LEN: usize = 8;
// RFC 2046 limits the boundary to 70 characters
const MAXIMAL_BOUNDARY_LEN: usize = 70;

/// Settings used to generate multipart boundaries.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MultipartConfig {
    prefix: String,
    random_len: usize,
}

impl Default for MultipartConfig {
    fn default() -> Self {
        MultipartConfig {
            prefix: DEFAULT_BOUNDARY_PREFIX.to_string(),
            random_len: DEFAULT_BOUNDARY_RANDOM_LEN,
        }
    }
}

impl MultipartConfig {
    pub fn set_prefix(&mut self, prefix: String) {
        self.prefix = prefix;
    }

    #[inline]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn set_random_len(&mut self, len: usize) {
        self.random_len = len.max(MINIMAL_BOUNDARY_RANDOM_LEN);
    }

    #[inline]
    pub fn random_len(&self) -> usize {
        self.random_len
    }

    /// Get a new boundary made of the prefix and random alphanumeric chars.
    ///
    /// The prefix is truncated if the boundary would be too long.
    pub fn generate_boundary(&self) -> String {
        let random_len = self.random_len.min(MAXIMAL_BOUNDARY_LEN);
        let prefix_len = self
            .prefix
            .char_indices()
            .map(|(i, c)| i + c.len_utf8())
            .take_while(|end| *end + random_len <= MAXIMAL_BOUNDARY_LEN)
            .last()
            .unwrap_or(0);

        let mut boundary = String::with_capacity(prefix_len + random_len);
        boundary.push_str(&self.prefix[..prefix_len]);
        boundary.extend(std::iter::repeat_with(fastrand::alphanumeric).take(random_len));
        boundary
    }
}
