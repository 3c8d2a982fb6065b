/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use bytes::{BufMut, Bytes, BytesMut};
use indexmap::IndexMap;
use mime::Mime;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};

use g3_content::{BaseProvider, ContentError};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=UTF-8";

/// Everything but alphanumerics and `.-*_` is encoded, and space is then
/// written as `+`.
const FORM_PCT_ENCODING_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'.')
    .remove(b'-')
    .remove(b'*')
    .remove(b'_');

fn encode_component(buf: &mut BytesMut, s: &str) {
    for part in percent_encoding::utf8_percent_encode(s, FORM_PCT_ENCODING_SET) {
        if part == "%20" {
            buf.put_u8(b'+');
        } else {
            buf.put_slice(part.as_bytes());
        }
    }
}

/// An `application/x-www-form-urlencoded` body.
///
/// Every name and value pair is written as `name=value`, and the pairs are
/// written back to back with no separator between them. A field with no
/// value is written as `name=`.
#[derive(Clone, Debug, Default)]
pub struct FormUrlencoded {
    fields: IndexMap<String, Vec<String>>,
}

impl FormUrlencoded {
    pub fn new() -> Self {
        FormUrlencoded::default()
    }

    /// Append one value to the field `name`.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields
            .entry(name.into())
            .or_default()
            .push(value.into());
    }

    /// Declare the field `name`, without adding any value.
    pub fn add_empty(&mut self, name: impl Into<String>) {
        self.fields.entry(name.into()).or_default();
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();
        for (name, values) in &self.fields {
            if values.is_empty() {
                encode_component(&mut buf, name);
                buf.put_u8(b'=');
                continue;
            }
            for value in values {
                encode_component(&mut buf, name);
                buf.put_u8(b'=');
                encode_component(&mut buf, value);
            }
        }
        buf.freeze()
    }

    pub fn content_type() -> Result<Mime, ContentError> {
        FORM_CONTENT_TYPE
            .parse::<Mime>()
            .map_err(|e| ContentError::InvalidMediaType(format!("{FORM_CONTENT_TYPE}: {e}")))
    }

    pub fn into_provider(self) -> Result<BaseProvider, ContentError> {
        let content_type = FormUrlencoded::content_type()?;
        Ok(BaseProvider::from_bytes(self.encode(), Some(content_type)))
    }
}

impl<K, V> FromIterator<(K, V)> for FormUrlencoded
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut form = FormUrlencoded::new();
        for (k, v) in iter {
            form.add(k, v);
        }
        form
    }
}
