/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;

use memchr::memmem;

use g3_content::{BaseProvider, ContentError, ContentProvider, ProviderPhase, read_all_bytes};
use g3_http_form::{MultipartConfig, MultipartForm, Part};

fn file_part(name: &str, filename: &str, content_type: &str, body: &'static str) -> Part {
    let mut part = Part::new(name, Box::new(BaseProvider::from_static(body.as_bytes(), None)));
    part.set_filename(filename);
    part.set_content_type(content_type);
    part
}

struct ParsedPart {
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl ParsedPart {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

fn parse(data: &[u8], boundary: &str) -> Vec<ParsedPart> {
    let first = format!("--{boundary}\r\n");
    let delimiter = format!("\r\n--{boundary}");
    assert!(data.starts_with(first.as_bytes()));
    assert!(data.ends_with(format!("\r\n--{boundary}--\r\n").as_bytes()));

    let mut parts = Vec::new();
    let mut rest = &data[first.len()..];
    loop {
        let end = memmem::find(rest, delimiter.as_bytes()).unwrap();
        let raw = &rest[..end];
        let header_end = memmem::find(raw, b"\r\n\r\n").unwrap();
        let headers = std::str::from_utf8(&raw[..header_end])
            .unwrap()
            .split("\r\n")
            .map(|line| {
                let (k, v) = line.split_once(": ").unwrap();
                (k.to_string(), v.to_string())
            })
            .collect();
        parts.push(ParsedPart {
            headers,
            body: raw[header_end + 4..].to_vec(),
        });

        rest = &rest[end + delimiter.len()..];
        if rest == b"--\r\n" {
            return parts;
        }
        rest = rest.strip_prefix(b"\r\n").unwrap();
    }
}

#[tokio::test]
async fn two_files() {
    let mut form = MultipartForm::with_boundary("B");
    form.add_part(file_part("a1", "x.txt", "text/plain", "1"));
    form.add_part(file_part("a2", "x.json", "application/json", "2"));
    let provider = form.into_provider().unwrap();
    assert_eq!(
        provider.content_type().unwrap().to_string(),
        "multipart/form-data; boundary=B"
    );

    let data = read_all_bytes(&provider).await.unwrap();
    let expected = "--B\r\n\
        Content-Disposition: form-data; name=\"a1\"; filename=\"x.txt\"\r\n\
        Content-Type: text/plain\r\n\
        \r\n\
        1\r\n\
        --B\r\n\
        Content-Disposition: form-data; name=\"a2\"; filename=\"x.json\"\r\n\
        Content-Type: application/json\r\n\
        \r\n\
        2\r\n\
        --B--\r\n";
    assert_eq!(std::str::from_utf8(&data).unwrap(), expected);
    assert_eq!(provider.content_length(), Some(data.len() as u64));

    let parts = parse(&data, "B");
    assert_eq!(parts.len(), 2);
    assert_eq!(
        parts[0].header("content-disposition"),
        Some("form-data; name=\"a1\"; filename=\"x.txt\"")
    );
    assert_eq!(parts[0].header("content-type"), Some("text/plain"));
    assert_eq!(parts[0].body, b"1");
    assert_eq!(parts[1].header("content-type"), Some("application/json"));
    assert_eq!(parts[1].body, b"2");
    provider.close().unwrap();
}

#[tokio::test]
async fn generated_boundary() {
    let mut form = MultipartForm::new(&MultipartConfig::default());
    form.add_part(Part::text("user", "alice"));
    let mut file = Part::new(
        "doc",
        Box::new(BaseProvider::from_static(
            b"--not a boundary\r\n\r\nbinary\x00data",
            Some(mime::APPLICATION_OCTET_STREAM),
        )),
    );
    file.set_filename("doc.bin");
    file.add_field("X-Checksum", "abc");
    form.add_part(file);
    let boundary = form.boundary().to_string();

    let provider = form.into_provider().unwrap();
    let data = read_all_bytes(&provider).await.unwrap();
    let parts = parse(&data, &boundary);
    assert_eq!(parts.len(), 2);

    assert_eq!(parts[0].header("Content-Type"), Some("text/plain"));
    assert_eq!(parts[0].body, b"alice");

    assert_eq!(
        parts[1].header("Content-Type"),
        Some("application/octet-stream")
    );
    assert_eq!(parts[1].header("X-Checksum"), Some("abc"));
    assert_eq!(parts[1].body, b"--not a boundary\r\n\r\nbinary\x00data");
    provider.close().unwrap();
}

#[tokio::test]
async fn closing_form_closes_bodies() {
    let body = Arc::new(BaseProvider::from_static(b"never read", None));
    let mut form = MultipartForm::with_boundary("B");
    form.add_part(Part::new("f", Box::new(Arc::clone(&body))));
    let provider = form.into_provider().unwrap();

    provider.close().unwrap();
    assert!(body.is_closed());
    assert_eq!(body.phase(), ProviderPhase::Idle);
    let e = read_all_bytes(&provider).await.unwrap_err();
    assert!(matches!(e, ContentError::AlreadyClosed));
}
