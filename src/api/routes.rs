use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.max_upload_size as usize;

    Router::new()
        // Versions
        .route("/app/versions", get(handlers::list_versions))
        .route("/app/:name", get(handlers::get_channel_latest))
        .route("/app/:name/latest", patch(handlers::set_latest))
        .route(
            "/app/:name/:code",
            post(handlers::upload_version).layer(DefaultBodyLimit::max(upload_limit)),
        )
        // Artifact download (version name or channel)
        .route("/app/download/:name", get(handlers::download))
        // Internal
        .route("/_internal/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, HeaderMap, Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::testutil::test_state;

    fn artifact(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 253) as u8).collect()
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec();
        (status, headers, body)
    }

    async fn json(router: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = send(router, request).await;
        let value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, value)
    }

    async fn upload(
        router: &Router,
        version_name: &str,
        version_code: &str,
        data: Vec<u8>,
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(format!("/app/{version_name}/{version_code}"))
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(Body::from(data))
            .unwrap();
        let (status, _, body) = send(router, request).await;
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    async fn download(
        router: &Router,
        target: &str,
        range: Option<&str>,
    ) -> (StatusCode, HeaderMap, Vec<u8>) {
        let mut builder = Request::builder()
            .method("GET")
            .uri(format!("/app/download/{target}"));
        if let Some(range) = range {
            builder = builder.header(header::RANGE, range);
        }
        send(router, builder.body(Body::empty()).unwrap()).await
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let router = create_router(test_state(&dir));

        let (status, body) = json(&router, "GET", "/_internal/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "ok");
    }

    #[tokio::test]
    async fn test_upload_records_version() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        let router = create_router(state.clone());

        let (status, body) = upload(&router, "1.0.0", "10", artifact(64)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "success");
        assert_eq!(body["data"]["version_name"], "1.0.0");
        assert_eq!(body["data"]["version_code"], 10);
        assert_eq!(body["data"]["channel"], "release");
        assert_eq!(body["data"]["latest"], false);
        assert_eq!(body["data"]["download_link"], "/app/download/1.0.0");

        assert!(dir.path().join("artifacts").join("1.0.0.apk").exists());
        assert!(state.db.get_version("1.0.0").unwrap().is_some());
    }

    fn multipart_upload(uri: &str, payload: &[u8]) -> Request<Body> {
        let boundary = "X-APP-DIST-BOUNDARY";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"app.apk\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(payload);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_upload_multipart_file_field() {
        let dir = tempfile::tempdir().unwrap();
        let router = create_router(test_state(&dir));

        let request = multipart_upload("/app/2.0.0-beta/7", b"multipart-payload");
        let (status, _, _) = send(&router, request).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _, bytes) = download(&router, "2.0.0-beta", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(bytes, b"multipart-payload");
    }

    #[tokio::test]
    async fn test_upload_multipart_over_limit() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        let router = create_router(state.clone());

        let too_big = artifact(state.config.max_upload_size as usize + 10);
        let (status, _, body) = send(&router, multipart_upload("/app/1.0.0/1", &too_big)).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["status"], "fail");
        assert!(state.db.list_versions(None).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_rejects_bad_input() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        let router = create_router(state.clone());

        let (status, _) = upload(&router, "1.0.0", "abc", artifact(8)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = upload(&router, "..hidden", "1", artifact(8)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // Names end up quoted in Content-Disposition
        let (status, _) = upload(&router, "1.0%22x", "1", artifact(8)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = upload(&router, "1.0%0Ax", "1", artifact(8)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = upload(&router, "1.0.0", "1", Vec::new()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let too_big = artifact(state.config.max_upload_size as usize + 1);
        let (status, _) = upload(&router, "1.0.0", "1", too_big).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

        assert!(state.db.list_versions(None).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reupload_replaces_binary_and_code() {
        let dir = tempfile::tempdir().unwrap();
        let router = create_router(test_state(&dir));

        upload(&router, "1.2.3", "5", b"first".to_vec()).await;
        let (status, body) = upload(&router, "1.2.3", "6", b"second".to_vec()).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["version_code"], 6);

        let (_, list) = json(&router, "GET", "/app/versions").await;
        assert_eq!(list["data"]["pagination"]["total"], 1);

        let (_, _, bytes) = download(&router, "1.2.3", None).await;
        assert_eq!(bytes, b"second");
    }

    #[tokio::test]
    async fn test_channel_latest_flow() {
        let dir = tempfile::tempdir().unwrap();
        let router = create_router(test_state(&dir));

        let (status, _) = json(&router, "GET", "/app/release").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        upload(&router, "1.0.0", "1", artifact(10)).await;
        upload(&router, "1.0.1", "2", artifact(20)).await;
        upload(&router, "1.1.0-beta", "3", artifact(30)).await;

        let (status, _) = json(&router, "PATCH", "/app/1.0.0/latest").await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = json(&router, "PATCH", "/app/1.0.1/latest").await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["latest"], true);

        let (status, body) = json(&router, "GET", "/app/release").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["version_name"], "1.0.1");
        assert_eq!(body["data"]["version_code"], 2);
        assert_eq!(body["data"]["latest"], true);

        let (status, _) = json(&router, "GET", "/app/preview").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = json(&router, "PATCH", "/app/1.1.0-beta/latest").await;
        assert_eq!(status, StatusCode::CREATED);
        let (_, body) = json(&router, "GET", "/app/preview").await;
        assert_eq!(body["data"]["version_name"], "1.1.0-beta");

        let (_, body) = json(&router, "GET", "/app/release").await;
        assert_eq!(body["data"]["version_name"], "1.0.1");
    }

    #[tokio::test]
    async fn test_set_latest_unknown_version() {
        let dir = tempfile::tempdir().unwrap();
        let router = create_router(test_state(&dir));

        let (status, body) = json(&router, "PATCH", "/app/9.9.9/latest").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], "fail");
    }

    #[tokio::test]
    async fn test_unknown_channel_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let router = create_router(test_state(&dir));

        let (status, _) = json(&router, "GET", "/app/official").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_versions_by_channel() {
        let dir = tempfile::tempdir().unwrap();
        let router = create_router(test_state(&dir));

        upload(&router, "1.0.0", "1", artifact(4)).await;
        upload(&router, "1.1.0", "2", artifact(4)).await;
        upload(&router, "1.2.0-rc1", "3", artifact(4)).await;

        let (status, body) = json(&router, "GET", "/app/versions?channel=release").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["pagination"]["total"], 2);

        let (_, body) = json(&router, "GET", "/app/versions?limit=1&offset=2").await;
        let items = body["data"]["items"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["version_name"], "1.2.0-rc1");

        let (status, _) = json(&router, "GET", "/app/versions?channel=nightly").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = json(&router, "GET", "/app/versions?limit=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_download_full_and_ranged() {
        let dir = tempfile::tempdir().unwrap();
        let router = create_router(test_state(&dir));
        let data = artifact(1000);
        upload(&router, "1.0.0", "1", data.clone()).await;

        let (status, headers, bytes) = download(&router, "1.0.0", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_LENGTH], "1000");
        assert_eq!(
            headers[header::CONTENT_TYPE],
            "application/vnd.android.package-archive"
        );
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"1.0.0.apk\""
        );
        assert_eq!(bytes, data);

        let (status, headers, bytes) = download(&router, "1.0.0", Some("bytes=0-99")).await;
        assert_eq!(status, StatusCode::PARTIAL_CONTENT);
        assert_eq!(headers[header::CONTENT_RANGE], "bytes 0-99/1000");
        assert_eq!(bytes.len(), 100);
        assert_eq!(bytes, &data[..100]);

        let (status, headers, bytes) = download(&router, "1.0.0", Some("bytes=990-")).await;
        assert_eq!(status, StatusCode::PARTIAL_CONTENT);
        assert_eq!(headers[header::CONTENT_RANGE], "bytes 990-999/1000");
        assert_eq!(bytes, &data[990..]);
    }

    #[tokio::test]
    async fn test_download_bad_range() {
        let dir = tempfile::tempdir().unwrap();
        let router = create_router(test_state(&dir));
        upload(&router, "1.0.0", "1", artifact(100)).await;

        for range in ["bytes=5-2", "5-10", "bytes=0-999"] {
            let (status, _, _) = download(&router, "1.0.0", Some(range)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{range}");
        }
    }

    #[tokio::test]
    async fn test_download_by_channel() {
        let dir = tempfile::tempdir().unwrap();
        let router = create_router(test_state(&dir));

        let (status, _, _) = download(&router, "release", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        upload(&router, "1.0.0", "1", b"one".to_vec()).await;
        upload(&router, "1.0.1", "2", b"two".to_vec()).await;
        json(&router, "PATCH", "/app/1.0.1/latest").await;

        let (status, headers, bytes) = download(&router, "release", Some("bytes=1-")).await;
        assert_eq!(status, StatusCode::PARTIAL_CONTENT);
        assert_eq!(headers[header::CONTENT_RANGE], "bytes 1-2/3");
        assert_eq!(bytes, b"wo");

        let (status, _, _) = download(&router, "preview", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_download_unknown_version() {
        let dir = tempfile::tempdir().unwrap();
        let router = create_router(test_state(&dir));

        let (status, _, _) = download(&router, "4.0.0", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_download_missing_binary() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        let router = create_router(state.clone());

        state.db.upsert_version("5.0.0", 1).unwrap();
        let (status, _, body) = download(&router, "5.0.0", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let text = String::from_utf8(body).unwrap();
        assert!(!text.contains(&dir.path().to_string_lossy().to_string()));
    }
}
