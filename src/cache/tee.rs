//! Splitting one response body into a client copy and a cached copy.
//!
//! A background task drives the source body: every chunk is forwarded to
//! the client over a bounded channel and appended to the copy that is
//! stored once the body ends. A slow client holds back the upstream read.
//! A client that disconnects early does not stop the stored copy; a failing
//! body stops both.

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    http::Response,
};
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::cache::{CacheKey, CachedResponse, ResponseStore};
use crate::lifecycle::BackgroundTask;
use crate::observability::metrics;

/// Chunks buffered for the client before the upstream read waits.
pub(crate) const CLIENT_BUFFER_CHUNKS: usize = 16;

pub(crate) fn tee_into_store(
    store: Arc<dyn ResponseStore>,
    key: CacheKey,
    response: Response<Body>,
) -> (Response<Body>, BackgroundTask) {
    let (parts, body) = response.into_parts();
    let status = parts.status;
    let headers = parts.headers.clone();
    let (tx, rx) = mpsc::channel::<Result<Bytes, axum::Error>>(CLIENT_BUFFER_CHUNKS);

    let task = BackgroundTask::spawn(async move {
        let mut source = body.into_data_stream();
        let mut persisted = Vec::new();
        let mut client_attached = true;

        while let Some(chunk) = source.next().await {
            match chunk {
                Ok(bytes) => {
                    persisted.extend_from_slice(&bytes);
                    if client_attached && tx.send(Ok(bytes)).await.is_err() {
                        client_attached = false;
                        tracing::debug!(cache_key = %key, "Client went away, finishing cached copy");
                    }
                }
                Err(e) => {
                    tracing::warn!(cache_key = %key, error = %e, "Response body failed, not caching");
                    metrics::record_cache_store("aborted");
                    let _ = tx.send(Err(e)).await;
                    return;
                }
            }
        }
        drop(tx);

        let size = persisted.len();
        let entry = CachedResponse::new(status, headers, Bytes::from(persisted));
        match store.store(key.clone(), entry).await {
            Ok(()) => {
                tracing::debug!(cache_key = %key, size, "Response cached");
                metrics::record_cache_store("ok");
            }
            Err(e) => {
                tracing::warn!(cache_key = %key, error = %e, "Cache store refused response");
                metrics::record_cache_store("rejected");
            }
        }
    });

    let body = Body::from_stream(ReceiverStream::new(rx));
    (Response::from_parts(parts, body), task)
}
