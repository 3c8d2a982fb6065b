/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use bytes::Bytes;
use log::debug;
use mime::Mime;

use g3_content::{BaseProvider, ConcatenatedProvider, ContentError, ContentProvider};

use crate::MultipartConfig;

mod part;
pub use part::Part;

/// A `multipart/form-data` body under construction.
pub struct MultipartForm {
    boundary: String,
    parts: Vec<Part>,
}

impl MultipartForm {
    /// Use a boundary generated from `config`.
    pub fn new(config: &MultipartConfig) -> Self {
        MultipartForm::with_boundary(config.generate_boundary())
    }

    /// Use `boundary` verbatim.
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        MultipartForm {
            boundary: boundary.into(),
            parts: Vec::new(),
        }
    }

    pub fn add_part(&mut self, part: Part) {
        self.parts.push(part);
    }

    #[inline]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn content_type(&self) -> Result<Mime, ContentError> {
        let s = format!("multipart/form-data; boundary={}", self.boundary);
        s.parse::<Mime>()
            .map_err(|e| ContentError::InvalidMediaType(format!("{s}: {e}")))
    }

    /// Build the body provider. The part bodies are owned by the returned
    /// provider and closed with it.
    pub fn into_provider(self) -> Result<ConcatenatedProvider, ContentError> {
        let content_type = match self.content_type() {
            Ok(v) => v,
            Err(e) => {
                for part in self.parts {
                    if let Err(e) = part.into_body().close() {
                        debug!("failed to close multipart body: {e}");
                    }
                }
                return Err(e);
            }
        };

        let boundary = self.boundary;
        if self.parts.is_empty() {
            return Ok(ConcatenatedProvider::new(
                Some(content_type),
                vec![text(format!("--{boundary}--\r\n"))],
            ));
        }

        let mut components = Vec::with_capacity(self.parts.len() * 3 + 1);
        components.push(text(format!("--{boundary}\r\n")));
        let count = self.parts.len();
        for (i, part) in self.parts.into_iter().enumerate() {
            components.push(text(part.header_block()));
            components.push(part.into_body());
            if i + 1 < count {
                components.push(text(format!("\r\n--{boundary}\r\n")));
            }
        }
        components.push(text(format!("\r\n--{boundary}--\r\n")));

        Ok(ConcatenatedProvider::new(Some(content_type), components))
    }
}

fn text(s: String) -> Box<dyn ContentProvider> {
    Box::new(BaseProvider::from_bytes(Bytes::from(s), None))
}
