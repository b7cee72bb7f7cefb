//! Integration tests for body streaming through the proxy.

mod common;

use std::time::Duration;

use bytes::Bytes;
use common::{client, config, Proxy, StubOrigin};
use edge_proxy::config::model::{Policy, ORIGIN_URL};
use futures_util::StreamExt;
use sha2::{Digest, Sha256};

const CHUNK: usize = 64 * 1024;
const TOTAL: usize = 50 * 1024 * 1024;

fn chunk(index: usize) -> Bytes {
    (0..CHUNK)
        .map(|j| u8::try_from((index * 31 + j) % 251).unwrap())
        .collect::<Vec<u8>>()
        .into()
}

#[tokio::test]
async fn large_body_round_trips_intact() {
    let origin = StubOrigin::start().await;
    let proxy = Proxy::start(config(Policy::default(), &[(ORIGIN_URL, &origin.url())])).await;

    let mut expected = Sha256::new();
    for i in 0..TOTAL / CHUNK {
        expected.update(chunk(i));
    }
    let expected = expected.finalize();

    let upload =
        futures_util::stream::iter((0..TOTAL / CHUNK).map(|i| Ok::<_, std::io::Error>(chunk(i))));
    let resp = client()
        .post(proxy.url("/upload"))
        .body(reqwest::Body::wrap_stream(upload))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let mut received = 0usize;
    let mut actual = Sha256::new();
    let mut body = resp.bytes_stream();
    while let Some(piece) = body.next().await {
        let piece = piece.unwrap();
        received += piece.len();
        actual.update(&piece);
    }

    assert_eq!(received, TOTAL);
    assert_eq!(actual.finalize(), expected);
}

#[tokio::test]
async fn response_starts_before_upload_finishes() {
    let origin = StubOrigin::start().await;
    let proxy = Proxy::start(config(Policy::default(), &[(ORIGIN_URL, &origin.url())])).await;

    let (tx, rx) = tokio::sync::mpsc::channel::<Bytes>(1);
    let upload = futures_util::stream::unfold(rx, |mut rx| async move {
        rx.recv()
            .await
            .map(|bytes| (Ok::<_, std::io::Error>(bytes), rx))
    });

    let pending = client()
        .post(proxy.url("/echo"))
        .body(reqwest::Body::wrap_stream(upload))
        .send();
    let request = tokio::spawn(pending);

    tx.send(Bytes::from_static(b"first")).await.unwrap();

    let resp = tokio::time::timeout(Duration::from_secs(10), request)
        .await
        .expect("response head should arrive while the upload is still open")
        .unwrap()
        .unwrap();
    assert_eq!(resp.status(), 200);

    let mut body = resp.bytes_stream();
    let first = tokio::time::timeout(Duration::from_secs(10), body.next())
        .await
        .expect("first chunk should be echoed before the upload ends")
        .unwrap()
        .unwrap();
    assert_eq!(&first[..], b"first");

    tx.send(Bytes::from_static(b"second")).await.unwrap();
    drop(tx);

    let mut rest = Vec::new();
    while let Some(piece) = body.next().await {
        rest.extend_from_slice(&piece.unwrap());
    }
    assert_eq!(rest, b"second");
}
