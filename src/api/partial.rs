//! Partial-content responses for artifact downloads.
//!
//! Only the first range of a multi-range header is honored; the response is
//! always a single-part body, never `multipart/byteranges`.

use std::io::SeekFrom;

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use futures::TryStreamExt;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use crate::api::response::ApiError;
use crate::range::{parse_range, ByteRange};

/// Respond with `resource`, honoring an optional `Range` header.
///
/// `total_len` is the resource length the range is validated against. The
/// resource is moved into the response body and released when the body is
/// finished or dropped.
pub async fn serve<R>(
    mut resource: R,
    total_len: u64,
    range_header: Option<&HeaderValue>,
    content_type: &str,
) -> Response
where
    R: AsyncRead + AsyncSeek + Send + Unpin + 'static,
{
    let range = match range_header.map(|value| requested_range(value, total_len)) {
        None => None,
        Some(Ok(range)) => Some(range),
        Some(Err(e)) => return e.into_response(),
    };

    let Some(range) = range else {
        return framed(
            StatusCode::OK,
            bounded_body(resource, total_len),
            total_len,
            content_type,
        );
    };

    if let Err(e) = resource.seek(SeekFrom::Start(range.start)).await {
        tracing::error!(error = %e, start = range.start, "Failed to seek artifact");
        return ApiError::internal("Failed to read artifact").into_response();
    }

    let mut response = framed(
        StatusCode::PARTIAL_CONTENT,
        bounded_body(resource, range.len()),
        range.len(),
        content_type,
    );
    if let Ok(value) = HeaderValue::from_str(&range.content_range(total_len)) {
        response.headers_mut().insert(header::CONTENT_RANGE, value);
    }
    response
}

fn requested_range(value: &HeaderValue, total_len: u64) -> Result<ByteRange, ApiError> {
    let value = value
        .to_str()
        .map_err(|_| ApiError::bad_request("Malformed Range header: not visible ASCII"))?;

    parse_range(value, total_len)?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::bad_request("Malformed Range header: no ranges"))
}

/// Stream at most `len` bytes of `reader` from its current position.
///
/// Headers are already committed when a read fails, so the error is logged and
/// the body ends in an error, which aborts the connection.
fn bounded_body<R>(reader: R, len: u64) -> Body
where
    R: AsyncRead + Send + Unpin + 'static,
{
    let stream = ReaderStream::new(reader.take(len)).inspect_err(|e| {
        tracing::error!(error = %e, "Artifact stream failed mid-transfer");
    });
    Body::from_stream(stream)
}

fn framed(status: StatusCode, body: Body, content_length: u64, content_type: &str) -> Response {
    let mut response = (status, body).into_response();
    let headers = response.headers_mut();

    headers.insert(
        header::CONTENT_TYPE,
        content_type
            .parse()
            .unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(content_length));
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));

    response
}
