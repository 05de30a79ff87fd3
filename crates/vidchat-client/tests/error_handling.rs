//! Error classification and tolerant decoding over a live HTTP server

mod common;

use common::client_for;
use mockito::Server;
use vidchat_client::api::{NewTag, VideoPatch};
use vidchat_client::{ApiError, RequestDescriptor};

#[tokio::test]
async fn field_error_message_is_surfaced() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/api/videos/tags/")
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(r#"{"name": ["Ensure this field has no more than 50 characters."]}"#)
        .create_async()
        .await;

    let test = client_for(&server.url());
    let err = test
        .client
        .create_tag(&NewTag {
            name: "x".repeat(60),
            color: None,
        })
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(400));
    assert_eq!(
        err.to_string(),
        "Ensure this field has no more than 50 characters."
    );
}

#[tokio::test]
async fn non_json_error_body_gets_generic_message() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/videos/9/")
        .with_status(502)
        .with_header("content-type", "text/html")
        .with_body("<html><body>Bad Gateway</body></html>")
        .create_async()
        .await;

    let test = client_for(&server.url());
    let err = test.client.get_video(9).await.unwrap_err();

    assert_eq!(err.status(), Some(502));
    assert_eq!(err.to_string(), "HTTP error! status: 502");
}

#[tokio::test]
async fn no_content_decodes_to_empty_object() {
    let mut server = Server::new_async().await;
    server
        .mock("DELETE", "/api/videos/4/")
        .with_status(204)
        .create_async()
        .await;
    server
        .mock("PATCH", "/api/videos/4/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": 4, "title": "Renamed"}"#)
        .create_async()
        .await;

    let test = client_for(&server.url());

    let payload = test
        .client
        .request_value(RequestDescriptor::delete("/videos/4/"))
        .await
        .unwrap();
    assert_eq!(payload, serde_json::json!({}));

    let video = test
        .client
        .update_video(
            4,
            &VideoPatch {
                title: Some("Renamed".to_string()),
                description: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(video.title, "Renamed");
}

#[tokio::test]
async fn unreachable_server_is_network_error() {
    // Nothing listens on the discard port
    let test = client_for("http://127.0.0.1:9");

    let err = test.client.list_tags().await.unwrap_err();

    assert!(matches!(err, ApiError::Network(_)), "got {err:?}");
    assert!(!err.to_string().is_empty());
    assert!(test.redirects.routes().is_empty());
}
