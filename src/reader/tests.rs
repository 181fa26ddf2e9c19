//! Tests for event framing

use super::*;
use crate::StreamError;
use bytes::Bytes;
use futures_util::StreamExt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

async fn read_all(input: &[u8]) -> (Vec<String>, EventReader<&[u8]>) {
    let cancel = CancellationToken::new();
    let mut reader = EventReader::new(input);
    let mut payloads = Vec::new();
    while let Some(payload) = reader.next_payload(&cancel).await.unwrap() {
        payloads.push(payload);
    }
    (payloads, reader)
}

#[tokio::test]
async fn test_data_lines_and_sentinel() {
    let (payloads, reader) = read_all(b"data: {\"a\":1}\n\ndata: {\"b\":2}\n\ndata: [DONE]\n\n").await;

    assert_eq!(payloads, vec!["{\"a\":1}", "{\"b\":2}"]);
    assert!(reader.finished_with_sentinel());
    assert!(reader.is_finished());
}

#[tokio::test]
async fn test_other_fields_are_ignored() {
    let input = b": keep-alive\nevent: message\nid: 7\nretry: 1000\ndata: {\"x\":1}\n\n";
    let (payloads, _) = read_all(input).await;

    assert_eq!(payloads, vec!["{\"x\":1}"]);
}

#[tokio::test]
async fn test_prefix_requires_space() {
    let (payloads, _) = read_all(b"data:{\"x\":1}\n\ndata: {\"y\":2}\n\n").await;

    assert_eq!(payloads, vec!["{\"y\":2}"]);
}

#[tokio::test]
async fn test_payload_is_trimmed() {
    let (payloads, reader) = read_all(b"data:    {\"x\":1}  \r\n\r\ndata:  [DONE] \r\n").await;

    assert_eq!(payloads, vec!["{\"x\":1}"]);
    assert!(reader.finished_with_sentinel());
}

#[tokio::test]
async fn test_no_json_validation() {
    let (payloads, _) = read_all(b"data: not json at all\n\n").await;

    assert_eq!(payloads, vec!["not json at all"]);
}

#[tokio::test]
async fn test_sentinel_ignores_remaining_bytes() {
    let cancel = CancellationToken::new();
    let mut reader = EventReader::new(&b"data: [DONE]\n\ndata: {\"late\":true}\n\n"[..]);

    assert_eq!(reader.next_payload(&cancel).await.unwrap(), None);
    assert_eq!(reader.next_payload(&cancel).await.unwrap(), None);
    assert!(reader.finished_with_sentinel());
}

#[tokio::test]
async fn test_eof_without_sentinel() {
    let (payloads, reader) = read_all(b"data: {\"a\":1}\n\ndata: {\"tail\":true}").await;

    assert_eq!(payloads, vec!["{\"a\":1}", "{\"tail\":true}"]);
    assert!(!reader.finished_with_sentinel());
    assert!(reader.is_finished());
}

#[tokio::test]
async fn test_cancelled_before_read() {
    let cancel = CancellationToken::new();
    cancel.cancel();

    let mut reader = EventReader::new(&b"data: {\"a\":1}\n\n"[..]);
    let err = reader.next_payload(&cancel).await.unwrap_err();

    assert!(err.is_cancelled());
}

#[tokio::test]
async fn test_cancel_interrupts_pending_read() {
    let (mut writer, transport) = tokio::io::duplex(1024);
    tokio::io::AsyncWriteExt::write_all(&mut writer, b"data: {\"a\":1}\n\n")
        .await
        .unwrap();

    let cancel = CancellationToken::new();
    let mut reader = EventReader::new(tokio::io::BufReader::new(transport));
    assert_eq!(
        reader.next_payload(&cancel).await.unwrap().as_deref(),
        Some("{\"a\":1}")
    );

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    // The writer stays open, so only cancellation can end this read.
    let err = reader.next_payload(&cancel).await.unwrap_err();
    assert!(err.is_cancelled());
    drop(writer);
}

#[tokio::test]
async fn test_invalid_utf8_is_transport_error() {
    let cancel = CancellationToken::new();
    let mut reader = EventReader::new(&b"data: \xff\xfe\n\n"[..]);

    let err = reader.next_payload(&cancel).await.unwrap_err();
    match err {
        StreamError::Transport(e) => assert_eq!(e.kind(), std::io::ErrorKind::InvalidData),
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_into_stream() {
    let reader = EventReader::new(&b"data: one\n\ndata: two\n\ndata: [DONE]\n\ndata: three\n\n"[..]);
    let payloads: Vec<_> = reader
        .into_stream(CancellationToken::new())
        .map(|p| p.unwrap())
        .collect()
        .await;

    assert_eq!(payloads, vec!["one", "two"]);
}

#[tokio::test]
async fn test_into_stream_ends_after_error() {
    let cancel = CancellationToken::new();
    cancel.cancel();

    let items: Vec<_> = EventReader::new(&b"data: one\n\n"[..])
        .into_stream(cancel)
        .collect()
        .await;

    assert_eq!(items.len(), 1);
    assert!(items[0].as_ref().unwrap_err().is_cancelled());
}

#[tokio::test]
async fn test_byte_stream_split_mid_line() {
    let chunks: Vec<std::io::Result<Bytes>> = vec![
        Ok(Bytes::from_static(b"data: {\"choi")),
        Ok(Bytes::from_static(b"ces\":[]}\n")),
        Ok(Bytes::from_static(b"\ndata: [DO")),
        Ok(Bytes::from_static(b"NE]\n\n")),
    ];
    let cancel = CancellationToken::new();
    let mut reader = EventReader::new(byte_stream_reader(futures_util::stream::iter(chunks)));

    assert_eq!(
        reader.next_payload(&cancel).await.unwrap().as_deref(),
        Some("{\"choices\":[]}")
    );
    assert_eq!(reader.next_payload(&cancel).await.unwrap(), None);
    assert!(reader.finished_with_sentinel());
}

#[tokio::test]
async fn test_byte_stream_error_propagates() {
    let chunks: Vec<std::io::Result<Bytes>> = vec![
        Ok(Bytes::from_static(b"data: {}\n\n")),
        Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
    ];
    let cancel = CancellationToken::new();
    let mut reader = EventReader::new(byte_stream_reader(futures_util::stream::iter(chunks)));

    assert_eq!(reader.next_payload(&cancel).await.unwrap().as_deref(), Some("{}"));
    let err = reader.next_payload(&cancel).await.unwrap_err();
    assert!(err.is_transport());
}

#[tokio::test]
async fn test_bare_carriage_return_framing() {
    let (payloads, reader) = read_all(b"data: {\"a\":1}\r\rdata: {\"b\":2}\rdata: [DONE]\r").await;

    assert_eq!(payloads, vec!["{\"a\":1}", "{\"b\":2}"]);
    assert!(reader.finished_with_sentinel());
}

#[tokio::test]
async fn test_crlf_split_across_chunks() {
    let chunks: Vec<std::io::Result<Bytes>> = vec![
        Ok(Bytes::from_static(b"data: {\"a\":1}\r")),
        Ok(Bytes::from_static(b"\n\r")),
        Ok(Bytes::from_static(b"\ndata: {\"b\":2}\r")),
        Ok(Bytes::from_static(b"data: [DONE]\n")),
    ];
    let cancel = CancellationToken::new();
    let mut reader = EventReader::new(byte_stream_reader(futures_util::stream::iter(chunks)));

    let mut payloads = Vec::new();
    while let Some(payload) = reader.next_payload(&cancel).await.unwrap() {
        payloads.push(payload);
    }

    assert_eq!(payloads, vec!["{\"a\":1}", "{\"b\":2}"]);
    assert!(reader.finished_with_sentinel());
}

#[tokio::test]
async fn test_cancellation_is_terminal() {
    let (mut writer, transport) = tokio::io::duplex(1024);
    // Half a line, so the read is interrupted mid-record.
    tokio::io::AsyncWriteExt::write_all(&mut writer, b"data: {\"a\"")
        .await
        .unwrap();

    let cancel = CancellationToken::new();
    let mut reader = EventReader::new(tokio::io::BufReader::new(transport));

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    assert!(reader.next_payload(&cancel).await.unwrap_err().is_cancelled());
    assert!(reader.is_finished());
    assert!(!reader.finished_with_sentinel());

    tokio::io::AsyncWriteExt::write_all(&mut writer, b":1}\n\ndata: {\"b\":2}\n\n")
        .await
        .unwrap();
    let err = reader
        .next_payload(&CancellationToken::new())
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
}

#[tokio::test]
async fn test_precancelled_reader_stays_cancelled() {
    let cancel = CancellationToken::new();
    cancel.cancel();

    let mut reader = EventReader::new(&b"data: {\"a\":1}\n\n"[..]);
    assert!(reader.next_payload(&cancel).await.unwrap_err().is_cancelled());
    assert!(reader.is_finished());
    assert!(reader
        .next_payload(&CancellationToken::new())
        .await
        .unwrap_err()
        .is_cancelled());
}
