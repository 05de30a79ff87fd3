use super::types::{ListPayload, Video, VideoPatch, VideoQuery, VideoUpload};
use crate::client::ApiClient;
use crate::error::ApiError;
use crate::http::HttpTransport;
use crate::request::{with_query, RequestBody, RequestDescriptor};

const VIDEOS_ENDPOINT: &str = "/videos/";

fn video_endpoint(id: i64) -> String {
    format!("{VIDEOS_ENDPOINT}{id}/")
}

impl<T: HttpTransport> ApiClient<T> {
    pub async fn list_videos(&self, query: &VideoQuery) -> Result<Vec<Video>, ApiError> {
        let endpoint = with_query(VIDEOS_ENDPOINT, &query.to_pairs());
        let videos: ListPayload<Video> = self.request_json(RequestDescriptor::get(endpoint)).await?;
        Ok(videos.into_vec())
    }

    pub async fn get_video(&self, id: i64) -> Result<Video, ApiError> {
        self.request_json(RequestDescriptor::get(video_endpoint(id)))
            .await
    }

    /// Uploads a video file as multipart form data
    pub async fn upload_video(&self, upload: &VideoUpload) -> Result<Video, ApiError> {
        tracing::info!(
            title = %upload.title,
            bytes = upload.data.len(),
            "Uploading video"
        );
        let request =
            RequestDescriptor::post(VIDEOS_ENDPOINT).body(RequestBody::Multipart(upload.to_form()));
        self.request_json(request).await
    }

    pub async fn update_video(&self, id: i64, patch: &VideoPatch) -> Result<Video, ApiError> {
        self.request_json(RequestDescriptor::patch(video_endpoint(id)).json(patch)?)
            .await
    }

    pub async fn delete_video(&self, id: i64) -> Result<(), ApiError> {
        self.request_empty(RequestDescriptor::delete(video_endpoint(id)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use crate::api::{VideoPatch, VideoQuery, VideoUpload};
    use crate::request::{EncodedBody, FormPart};
    use crate::testutil::*;
    use bytes::Bytes;
    use reqwest::Method;
    use serde_json::json;

    #[tokio::test]
    async fn list_applies_filters() {
        let transport = MockTransport::new().on_json(
            Method::GET,
            "http://api.test/videos/?q=lifetimes&tags=2",
            200,
            &json!({"count": 1, "results": [sample_video_json(4)]}),
        );
        let harness = Harness::new(transport);

        let videos = harness
            .client
            .list_videos(&VideoQuery {
                q: Some("lifetimes".to_string()),
                tag: Some(2),
                status: None,
            })
            .await
            .unwrap();

        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].id, 4);
        assert_eq!(videos[0].tags[0].name, "rust");
    }

    #[tokio::test]
    async fn upload_sends_multipart_without_json_content_type() {
        let transport = MockTransport::new().on_json(
            Method::POST,
            "http://api.test/videos/",
            201,
            &sample_video_json(9),
        );
        let harness = Harness::new(transport);

        let video = harness
            .client
            .upload_video(&VideoUpload {
                title: "Intro".to_string(),
                description: String::new(),
                file_name: "intro.mp4".to_string(),
                mime: Some("video/mp4".to_string()),
                data: Bytes::from_static(b"\x00\x00\x00\x18ftypmp42"),
            })
            .await
            .unwrap();

        assert_eq!(video.id, 9);
        let sent = &harness.transport.get_requests()[0];
        assert!(sent.headers.get("content-type").is_none());
        let EncodedBody::Multipart(form) = &sent.body else {
            panic!("expected multipart body, got {:?}", sent.body);
        };
        assert!(form
            .parts()
            .iter()
            .any(|(name, part)| name == "file"
                && matches!(part, FormPart::File { file_name, .. } if file_name == "intro.mp4")));
    }

    #[tokio::test]
    async fn update_sends_only_changed_fields() {
        let transport = MockTransport::new().on_json(
            Method::PATCH,
            "http://api.test/videos/4/",
            200,
            &sample_video_json(4),
        );
        let harness = Harness::new(transport);

        harness
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

        let sent = &harness.transport.get_requests()[0];
        assert_eq!(sent.body.as_json(), Some(r#"{"title":"Renamed"}"#));
    }

    #[tokio::test]
    async fn delete_tolerates_no_content() {
        let transport = MockTransport::new().on(
            Method::DELETE,
            "http://api.test/videos/4/",
            MockResponse::new(204),
        );
        let harness = Harness::new(transport);

        harness.client.delete_video(4).await.unwrap();
    }
}
