/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use indexmap::IndexMap;

use g3_content::{BaseProvider, ContentProvider};

const HEADER_CONTENT_TYPE: &str = "Content-Type";
const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// One field or file of a multipart form.
pub struct Part {
    name: String,
    filename: Option<String>,
    content_type: Option<String>,
    body: Box<dyn ContentProvider>,
    fields: IndexMap<String, String>,
}

impl Part {
    pub fn new(name: impl Into<String>, body: Box<dyn ContentProvider>) -> Self {
        Part {
            name: name.into(),
            filename: None,
            content_type: None,
            body,
            fields: IndexMap::new(),
        }
    }

    /// A plain text field.
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        let value: String = value.into();
        Part::new(name, Box::new(BaseProvider::from_bytes(value, None)))
    }

    pub fn set_filename(&mut self, filename: impl Into<String>) {
        self.filename = Some(filename.into());
    }

    /// Set the content type, which takes precedence over any other source.
    pub fn set_content_type(&mut self, content_type: impl Into<String>) {
        self.content_type = Some(content_type.into());
    }

    /// Add an extra header line to the part.
    pub fn add_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// The content type written to the part headers.
    pub fn resolved_content_type(&self) -> String {
        if let Some(v) = &self.content_type {
            return v.clone();
        }
        if let Some((_, v)) = self
            .fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(HEADER_CONTENT_TYPE))
        {
            return v.clone();
        }
        match self.body.content_type() {
            Some(mime) => mime.to_string(),
            None => DEFAULT_CONTENT_TYPE.to_string(),
        }
    }

    /// The header block, including the empty line before the body.
    pub(super) fn header_block(&self) -> String {
        let mut headers = format!("Content-Disposition: form-data; name=\"{}\"", self.name);
        if let Some(filename) = &self.filename {
            headers.push_str("; filename=\"");
            headers.push_str(filename);
            headers.push('"');
        }
        headers.push_str("\r\n");

        headers.push_str(HEADER_CONTENT_TYPE);
        headers.push_str(": ");
        headers.push_str(&self.resolved_content_type());
        headers.push_str("\r\n");

        for (k, v) in &self.fields {
            if k.eq_ignore_ascii_case(HEADER_CONTENT_TYPE) {
                continue;
            }
            headers.push_str(k);
            headers.push_str(": ");
            headers.push_str(v);
            headers.push_str("\r\n");
        }
        headers.push_str("\r\n");
        headers
    }

    pub(super) fn into_body(self) -> Box<dyn ContentProvider> {
        self.body
    }
}
