use serde_json::json;

use super::types::{ListPayload, NewTag, Tag, TagPatch};
use crate::client::ApiClient;
use crate::error::ApiError;
use crate::http::HttpTransport;
use crate::request::RequestDescriptor;

const TAGS_ENDPOINT: &str = "/videos/tags/";

fn tag_endpoint(id: i64) -> String {
    format!("{TAGS_ENDPOINT}{id}/")
}

fn video_tags_endpoint(video_id: i64) -> String {
    format!("/videos/{video_id}/tags/")
}

impl<T: HttpTransport> ApiClient<T> {
    pub async fn list_tags(&self) -> Result<Vec<Tag>, ApiError> {
        let tags: ListPayload<Tag> = self.request_json(RequestDescriptor::get(TAGS_ENDPOINT)).await?;
        Ok(tags.into_vec())
    }

    pub async fn create_tag(&self, tag: &NewTag) -> Result<Tag, ApiError> {
        self.request_json(RequestDescriptor::post(TAGS_ENDPOINT).json(tag)?)
            .await
    }

    pub async fn update_tag(&self, id: i64, patch: &TagPatch) -> Result<Tag, ApiError> {
        self.request_json(RequestDescriptor::patch(tag_endpoint(id)).json(patch)?)
            .await
    }

    pub async fn delete_tag(&self, id: i64) -> Result<(), ApiError> {
        self.request_empty(RequestDescriptor::delete(tag_endpoint(id)))
            .await
    }

    pub async fn add_tags_to_video(&self, video_id: i64, tag_ids: &[i64]) -> Result<(), ApiError> {
        let request = RequestDescriptor::post(video_tags_endpoint(video_id))
            .json(&json!({ "tag_ids": tag_ids }))?;
        self.request_empty(request).await
    }

    pub async fn remove_tag_from_video(&self, video_id: i64, tag_id: i64) -> Result<(), ApiError> {
        let endpoint = format!("{}{tag_id}/", video_tags_endpoint(video_id));
        self.request_empty(RequestDescriptor::delete(endpoint)).await
    }
}
