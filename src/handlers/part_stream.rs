//! Bidirectional part-ingestion stream.
//!
//! `POST /v1/upload/part` accepts newline-delimited JSON part messages
//! and answers with one newline-delimited JSON response per inbound
//! message.  Responses are not paired with requests by the protocol;
//! parts are uploaded concurrently and each response is emitted when
//! its upload finishes, in whatever order that happens.
//!
//! [`run_part_stream`] holds the protocol logic and is independent of
//! the HTTP framing, so tests can drive it with plain in-memory
//! streams.  The invariants it maintains:
//!
//! - every inbound message produces exactly one outbound response;
//! - a receive failure produces a synthetic error response and does
//!   NOT terminate the stream;
//! - the outbound side closes only after every spawned part upload has
//!   finished.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::BytesMut;
use futures::{Stream, StreamExt};
use metrics::counter;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use crate::handlers::{UploadPartMessage, UploadPartResponse};
use crate::metrics::PARTS_TOTAL;
use crate::service::UploadService;
use crate::AppState;

/// Failure to receive one inbound message.  The stream itself stays up.
#[derive(Debug, Error)]
pub enum PartRecvError {
    #[error("connection error: {0}")]
    Transport(String),

    #[error("malformed part message: {0}")]
    Decode(#[from] serde_json::Error),
}

impl UploadPartResponse {
    fn uploaded(etag: &str) -> Self {
        Self {
            code: 200,
            message: format!("successfully uploaded part {etag}"),
        }
    }

    fn failed(err: impl std::fmt::Display) -> Self {
        Self {
            code: 500,
            message: format!("failed uploading part: {err}"),
        }
    }

    fn recv_failed(err: impl std::fmt::Display) -> Self {
        Self {
            code: 500,
            message: format!("failed receiving part: {err}"),
        }
    }
}

/// Drive the part-ingestion protocol over abstract streams.
///
/// Each successfully received message is handed to its own task so
/// slow parts do not block reception of later ones.  Returns once the
/// inbound stream is exhausted and every in-flight upload has sent its
/// response; dropping `outbound`'s last sender is what closes the
/// response stream.
pub async fn run_part_stream<S, E>(
    service: Arc<UploadService>,
    mut inbound: S,
    outbound: mpsc::Sender<UploadPartResponse>,
) where
    S: Stream<Item = Result<UploadPartMessage, E>> + Unpin,
    E: std::fmt::Display,
{
    let mut uploads = JoinSet::new();

    while let Some(item) = inbound.next().await {
        match item {
            Ok(msg) => {
                let service = service.clone();
                let outbound = outbound.clone();
                uploads.spawn(async move {
                    let response = match service
                        .upload_part(&msg.upload_id, &msg.key, &msg.bucket, msg.part_number, msg.part)
                        .await
                    {
                        Ok(etag) => {
                            counter!(PARTS_TOTAL, "status" => "ok").increment(1);
                            UploadPartResponse::uploaded(&etag)
                        }
                        Err(err) => {
                            counter!(PARTS_TOTAL, "status" => "error").increment(1);
                            warn!("part {} of upload {}: {}", msg.part_number, msg.upload_id, err);
                            UploadPartResponse::failed(err)
                        }
                    };
                    // A closed receiver means the client hung up; the
                    // upload itself already happened.
                    let _ = outbound.send(response).await;
                });
            }
            Err(err) => {
                debug!("part receive failed: {}", err);
                counter!(PARTS_TOTAL, "status" => "recv_error").increment(1);
                let _ = outbound.send(UploadPartResponse::recv_failed(err)).await;
            }
        }
    }

    // Inbound side is done; wait for every part upload to respond
    // before letting the response stream close.
    while let Some(joined) = uploads.join_next().await {
        if let Err(err) = joined {
            warn!("part upload task failed: {}", err);
            let _ = outbound.send(UploadPartResponse::failed(err)).await;
        }
    }
}

/// `POST /v1/upload/part` -- NDJSON part-ingestion stream.
pub async fn upload_part_stream(State(state): State<Arc<AppState>>, body: Body) -> Response {
    let inbound = NdjsonMessages::new(body.into_data_stream());
    let (tx, rx) = mpsc::channel::<UploadPartResponse>(16);

    let service = state.service.clone();
    tokio::spawn(async move {
        run_part_stream(service, inbound, tx).await;
    });

    let lines = ReceiverStream::new(rx).map(|response| {
        serde_json::to_string(&response).map(|mut line| {
            line.push('\n');
            Bytes::from(line)
        })
    });

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        Body::from_stream(lines),
    )
        .into_response()
}

/// Splits a byte stream into newline-delimited JSON part messages.
///
/// Blank lines are skipped.  A line that fails to parse, or a chunk
/// the transport could not deliver, yields an `Err` item; the stream
/// keeps going either way.
struct NdjsonMessages<B> {
    body: B,
    buffer: BytesMut,
    done: bool,
}

impl<B> NdjsonMessages<B> {
    fn new(body: B) -> Self {
        Self {
            body,
            buffer: BytesMut::new(),
            done: false,
        }
    }
}

impl<B, E> Stream for NdjsonMessages<B>
where
    B: Stream<Item = Result<Bytes, E>> + Unpin,
    E: std::fmt::Display,
{
    type Item = Result<UploadPartMessage, PartRecvError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            // Drain complete lines before polling for more bytes.
            if let Some(pos) = this.buffer.iter().position(|&b| b == b'\n') {
                let line = this.buffer.split_to(pos + 1);
                let line = &line[..line.len() - 1];
                if line.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }
                return Poll::Ready(Some(
                    serde_json::from_slice(line).map_err(PartRecvError::from),
                ));
            }

            if this.done {
                if this.buffer.is_empty() {
                    return Poll::Ready(None);
                }
                // Final line without a trailing newline.
                let line = this.buffer.split();
                if line.iter().all(u8::is_ascii_whitespace) {
                    return Poll::Ready(None);
                }
                return Poll::Ready(Some(
                    serde_json::from_slice(&line).map_err(PartRecvError::from),
                ));
            }

            match Pin::new(&mut this.body).poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => this.buffer.extend_from_slice(&chunk),
                Poll::Ready(Some(Err(err))) => {
                    return Poll::Ready(Some(Err(PartRecvError::Transport(err.to_string()))));
                }
                Poll::Ready(None) => this.done = true,
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::backend::{
        DeleteOutcome, Metadata, ObjectHead, ObjectStore, PartSummary,
    };
    use crate::store::memory::MemoryStore;
    use std::convert::Infallible;
    use std::future::Future;
    use std::time::Duration;

    /// Store wrapper that delays part uploads, so early parts finish
    /// after later ones.
    struct DelayStore {
        inner: MemoryStore,
    }

    impl ObjectStore for DelayStore {
        fn head_bucket(
            &self,
            bucket: &str,
        ) -> Pin<Box<dyn Future<Output = anyhow::Result<bool>> + Send + '_>> {
            self.inner.head_bucket(bucket)
        }
        fn create_bucket(
            &self,
            bucket: &str,
        ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
            self.inner.create_bucket(bucket)
        }
        fn put_object(
            &self,
            bucket: &str,
            key: &str,
            body: Bytes,
            content_type: Option<String>,
            metadata: Option<Metadata>,
        ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + '_>> {
            self.inner.put_object(bucket, key, body, content_type, metadata)
        }
        fn create_multipart_upload(
            &self,
            bucket: &str,
            key: &str,
            content_type: Option<String>,
            metadata: Option<Metadata>,
        ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + '_>> {
            self.inner
                .create_multipart_upload(bucket, key, content_type, metadata)
        }
        fn upload_part(
            &self,
            bucket: &str,
            key: &str,
            upload_id: &str,
            part_number: i32,
            body: Bytes,
        ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + '_>> {
            // Earlier part numbers sleep longer.
            let delay = Duration::from_millis(50u64.saturating_sub(10 * part_number as u64));
            let fut = self.inner.upload_part(bucket, key, upload_id, part_number, body);
            Box::pin(async move {
                tokio::time::sleep(delay).await;
                fut.await
            })
        }
        fn list_parts(
            &self,
            bucket: &str,
            key: &str,
            upload_id: &str,
            max_parts: i32,
        ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<PartSummary>>> + Send + '_>> {
            self.inner.list_parts(bucket, key, upload_id, max_parts)
        }
        fn complete_multipart_upload(
            &self,
            bucket: &str,
            key: &str,
            upload_id: &str,
            parts: Vec<PartSummary>,
        ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + '_>> {
            self.inner
                .complete_multipart_upload(bucket, key, upload_id, parts)
        }
        fn abort_multipart_upload(
            &self,
            bucket: &str,
            key: &str,
            upload_id: &str,
        ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
            self.inner.abort_multipart_upload(bucket, key, upload_id)
        }
        fn head_object(
            &self,
            bucket: &str,
            key: &str,
        ) -> Pin<Box<dyn Future<Output = anyhow::Result<ObjectHead>> + Send + '_>> {
            self.inner.head_object(bucket, key)
        }
        fn delete_objects(
            &self,
            bucket: &str,
            keys: &[String],
        ) -> Pin<Box<dyn Future<Output = anyhow::Result<DeleteOutcome>> + Send + '_>> {
            self.inner.delete_objects(bucket, keys)
        }
        fn list_buckets(
            &self,
        ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<String>>> + Send + '_>> {
            self.inner.list_buckets()
        }
    }

    fn message(upload_id: &str, part_number: i64, data: &'static [u8]) -> UploadPartMessage {
        UploadPartMessage {
            upload_id: upload_id.to_string(),
            key: "k".to_string(),
            bucket: "b".to_string(),
            part_number,
            part: Some(Bytes::from_static(data)),
        }
    }

    async fn collect(mut rx: mpsc::Receiver<UploadPartResponse>) -> Vec<UploadPartResponse> {
        let mut responses = Vec::new();
        while let Some(resp) = rx.recv().await {
            responses.push(resp);
        }
        responses
    }

    #[tokio::test]
    async fn test_every_message_gets_a_response() {
        let service = Arc::new(UploadService::new(Arc::new(MemoryStore::new())));
        let init = service.upload_init("k", "b", None, None).await.unwrap();

        let messages: Vec<Result<UploadPartMessage, Infallible>> = (1..=5)
            .map(|n| Ok(message(&init.upload_id, n, b"data")))
            .collect();
        let (tx, rx) = mpsc::channel(16);

        run_part_stream(service.clone(), futures::stream::iter(messages), tx).await;

        let responses = collect(rx).await;
        assert_eq!(responses.len(), 5);
        assert!(responses.iter().all(|r| r.code == 200));

        let parts = service
            .list_upload_parts(&init.upload_id, "k", "b")
            .await
            .unwrap();
        assert_eq!(parts.len(), 5);
    }

    #[tokio::test]
    async fn test_empty_stream_closes_cleanly() {
        let service = Arc::new(UploadService::new(Arc::new(MemoryStore::new())));
        let (tx, rx) = mpsc::channel(16);

        let empty = futures::stream::iter(Vec::<Result<UploadPartMessage, Infallible>>::new());
        run_part_stream(service, empty, tx).await;

        assert!(collect(rx).await.is_empty());
    }

    #[tokio::test]
    async fn test_receive_error_yields_synthetic_response_and_continues() {
        let service = Arc::new(UploadService::new(Arc::new(MemoryStore::new())));
        let init = service.upload_init("k", "b", None, None).await.unwrap();

        let items: Vec<Result<UploadPartMessage, PartRecvError>> = vec![
            Ok(message(&init.upload_id, 1, b"aa")),
            Err(PartRecvError::Transport("broken chunk".to_string())),
            Ok(message(&init.upload_id, 2, b"bb")),
        ];
        let (tx, rx) = mpsc::channel(16);

        run_part_stream(service.clone(), futures::stream::iter(items), tx).await;

        let responses = collect(rx).await;
        assert_eq!(responses.len(), 3);
        assert_eq!(responses.iter().filter(|r| r.code == 200).count(), 2);
        let failure = responses.iter().find(|r| r.code == 500).unwrap();
        assert!(failure.message.contains("failed receiving part"));

        // The message after the failure still made it to the backend.
        let parts = service
            .list_upload_parts(&init.upload_id, "k", "b")
            .await
            .unwrap();
        assert_eq!(parts.len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_part_reports_upload_failure() {
        let service = Arc::new(UploadService::new(Arc::new(MemoryStore::new())));
        let init = service.upload_init("k", "b", None, None).await.unwrap();

        let items: Vec<Result<UploadPartMessage, Infallible>> =
            vec![Ok(message(&init.upload_id, 0, b"data"))];
        let (tx, rx) = mpsc::channel(16);

        run_part_stream(service, futures::stream::iter(items), tx).await;

        let responses = collect(rx).await;
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].code, 500);
        assert!(responses[0].message.contains("failed uploading part"));
    }

    #[tokio::test]
    async fn test_slow_parts_all_respond_before_close() {
        let service = Arc::new(UploadService::new(Arc::new(DelayStore {
            inner: MemoryStore::new(),
        })));
        let init = service.upload_init("k", "b", None, None).await.unwrap();

        // Part 1 is the slowest; the stream must stay open until its
        // response is out.
        let messages: Vec<Result<UploadPartMessage, Infallible>> = (1..=3)
            .map(|n| Ok(message(&init.upload_id, n, b"data")))
            .collect();
        let (tx, rx) = mpsc::channel(16);

        run_part_stream(service.clone(), futures::stream::iter(messages), tx).await;

        let responses = collect(rx).await;
        assert_eq!(responses.len(), 3);
        assert!(responses.iter().all(|r| r.code == 200));
    }

    #[tokio::test]
    async fn test_ndjson_reassembles_split_chunks() {
        let msg = message("u1", 1, b"hello");
        let mut line = serde_json::to_vec(&msg).unwrap();
        line.push(b'\n');
        let (a, b) = line.split_at(10);

        let chunks: Vec<Result<Bytes, Infallible>> = vec![
            Ok(Bytes::copy_from_slice(a)),
            Ok(Bytes::copy_from_slice(b)),
        ];
        let mut stream = NdjsonMessages::new(futures::stream::iter(chunks));

        let parsed = stream.next().await.unwrap().unwrap();
        assert_eq!(parsed.upload_id, "u1");
        assert_eq!(parsed.part, Some(Bytes::from_static(b"hello")));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_ndjson_handles_missing_trailing_newline_and_blanks() {
        let first = serde_json::to_vec(&message("u1", 1, b"a")).unwrap();
        let last = serde_json::to_vec(&message("u1", 2, b"b")).unwrap();
        let mut payload = first;
        payload.extend_from_slice(b"\n\n  \n");
        payload.extend_from_slice(&last);

        let chunks: Vec<Result<Bytes, Infallible>> = vec![Ok(Bytes::from(payload))];
        let mut stream = NdjsonMessages::new(futures::stream::iter(chunks));

        assert_eq!(stream.next().await.unwrap().unwrap().part_number, 1);
        assert_eq!(stream.next().await.unwrap().unwrap().part_number, 2);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_ndjson_malformed_line_is_an_error_item_not_the_end() {
        let good = serde_json::to_vec(&message("u1", 1, b"a")).unwrap();
        let mut payload = b"this is not json\n".to_vec();
        payload.extend_from_slice(&good);
        payload.push(b'\n');

        let chunks: Vec<Result<Bytes, Infallible>> = vec![Ok(Bytes::from(payload))];
        let mut stream = NdjsonMessages::new(futures::stream::iter(chunks));

        assert!(stream.next().await.unwrap().is_err());
        assert_eq!(stream.next().await.unwrap().unwrap().part_number, 1);
        assert!(stream.next().await.is_none());
    }
}
