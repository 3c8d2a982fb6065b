/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io::{self, Cursor};
use std::sync::Arc;

use tokio::runtime::Handle;

use g3_content::{
    BaseProvider, ConcatenatedProvider, ContentError, ContentProvider, ProviderPhase,
    ReadSourceConfig, read_all_bytes,
};

mod common;
use common::{FlowStats, TickingProducer, chunked, consume_slowly, leaf};

#[tokio::test]
async fn concatenation_order() {
    let provider = ConcatenatedProvider::new(
        Some(mime::TEXT_PLAIN),
        vec![leaf("abc"), leaf("def"), leaf("ghi")],
    );
    assert_eq!(provider.content_type(), Some(mime::TEXT_PLAIN));
    assert_eq!(provider.content_length(), Some(9));

    let data = read_all_bytes(&provider).await.unwrap();
    assert_eq!(data.as_ref(), b"abcdefghi");
    assert_eq!(data.len() as u64, provider.content_length().unwrap());
    provider.close().unwrap();
}

#[tokio::test]
async fn empty_concatenation() {
    let provider = ConcatenatedProvider::new(None, Vec::new());
    assert_eq!(provider.content_length(), Some(0));

    let data = read_all_bytes(&provider).await.unwrap();
    assert!(data.is_empty());
    assert_eq!(provider.phase(), ProviderPhase::Finished);
    provider.close().unwrap();
}

#[tokio::test]
async fn nested_concatenation() {
    let inner = ConcatenatedProvider::new(None, vec![leaf("b"), leaf(""), leaf("cd")]);
    let provider = ConcatenatedProvider::new(
        None,
        vec![leaf("a"), Box::new(inner), Box::new(chunked(&["e", "f"], None))],
    );
    assert_eq!(provider.content_length(), Some(6));

    let data = read_all_bytes(&provider).await.unwrap();
    assert_eq!(data.as_ref(), b"abcdef");
    provider.close().unwrap();
}

#[tokio::test]
async fn failure_short_circuits() {
    let observed = Arc::new(BaseProvider::from_static(b"zzz", None));
    let provider = ConcatenatedProvider::new(
        None,
        vec![
            leaf("abc"),
            Box::new(chunked(
                &["d", "e"],
                Some(ContentError::read_failed(io::Error::other("reset"))),
            )),
            Box::new(Arc::clone(&observed)),
        ],
    );

    let e = read_all_bytes(&provider).await.unwrap_err();
    assert!(matches!(e, ContentError::ReadFailed(_)));
    assert_eq!(provider.phase(), ProviderPhase::Errored);
    assert!(matches!(provider.failure(), Some(ContentError::ReadFailed(_))));
    assert_eq!(observed.phase(), ProviderPhase::Idle);

    provider.close().unwrap();
    assert!(observed.is_closed());
}

#[tokio::test]
async fn reader_components() {
    let mut config = ReadSourceConfig::default();
    config.set_buffer_size(2);
    let provider = ConcatenatedProvider::new(
        None,
        vec![
            Box::new(BaseProvider::from_reader(
                Cursor::new(b"12345".to_vec()),
                Some(5),
                None,
                &config,
            )),
            Box::new(BaseProvider::from_async_reader(
                Cursor::new(b"6789".to_vec()),
                Handle::current(),
                Some(4),
                None,
                &config,
            )),
        ],
    );
    assert_eq!(provider.content_length(), Some(9));

    let data = read_all_bytes(&provider).await.unwrap();
    assert_eq!(data.as_ref(), b"123456789");
    provider.close().unwrap();
}

async fn check_backpressure() {
    let stats = Arc::new(FlowStats::default());
    let provider = ConcatenatedProvider::new(
        None,
        vec![
            Box::new(TickingProducer::provider(5, &stats)),
            Box::new(TickingProducer::provider(0, &stats)),
            Box::new(TickingProducer::provider(7, &stats)),
        ],
    );

    let data = consume_slowly(&provider, &stats).await.unwrap();
    assert_eq!(data.len(), 12);
    assert_eq!(stats.max_outstanding(), 1);
    assert_eq!(stats.max_ahead(), 1);
    provider.close().unwrap();
}

#[tokio::test]
async fn backpressure_current_thread() {
    check_backpressure().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn backpressure_multi_thread() {
    check_backpressure().await;
}
