use serde_json::json;

use super::types::{GroupPatch, ListPayload, NewGroup, ShareLink, VideoGroup};
use crate::client::ApiClient;
use crate::error::ApiError;
use crate::http::HttpTransport;
use crate::request::RequestDescriptor;

const GROUPS_ENDPOINT: &str = "/videos/groups/";

fn group_endpoint(id: i64, action: &str) -> String {
    format!("{GROUPS_ENDPOINT}{id}/{action}")
}

impl<T: HttpTransport> ApiClient<T> {
    pub async fn list_groups(&self) -> Result<Vec<VideoGroup>, ApiError> {
        let groups: ListPayload<VideoGroup> =
            self.request_json(RequestDescriptor::get(GROUPS_ENDPOINT)).await?;
        Ok(groups.into_vec())
    }

    pub async fn get_group(&self, id: i64) -> Result<VideoGroup, ApiError> {
        self.request_json(RequestDescriptor::get(group_endpoint(id, "")))
            .await
    }

    pub async fn create_group(&self, group: &NewGroup) -> Result<VideoGroup, ApiError> {
        self.request_json(RequestDescriptor::post(GROUPS_ENDPOINT).json(group)?)
            .await
    }

    pub async fn update_group(&self, id: i64, patch: &GroupPatch) -> Result<VideoGroup, ApiError> {
        self.request_json(RequestDescriptor::patch(group_endpoint(id, "")).json(patch)?)
            .await
    }

    pub async fn delete_group(&self, id: i64) -> Result<(), ApiError> {
        self.request_empty(RequestDescriptor::delete(group_endpoint(id, "")))
            .await
    }

    /// Appends videos to the end of a group
    pub async fn add_videos_to_group(&self, id: i64, video_ids: &[i64]) -> Result<(), ApiError> {
        let request = RequestDescriptor::post(group_endpoint(id, "videos/"))
            .json(&json!({ "video_ids": video_ids }))?;
        self.request_empty(request).await
    }

    pub async fn remove_video_from_group(&self, id: i64, video_id: i64) -> Result<(), ApiError> {
        let endpoint = group_endpoint(id, &format!("videos/{video_id}/"));
        self.request_empty(RequestDescriptor::delete(endpoint)).await
    }

    /// Sets the group's video order; `video_ids` lists every member in its new position
    pub async fn reorder_group_videos(&self, id: i64, video_ids: &[i64]) -> Result<(), ApiError> {
        let request = RequestDescriptor::patch(group_endpoint(id, "reorder/"))
            .json(&json!({ "video_ids": video_ids }))?;
        self.request_empty(request).await
    }

    /// Creates (or returns the existing) share link for a group
    pub async fn create_share_link(&self, id: i64) -> Result<ShareLink, ApiError> {
        self.request_json(RequestDescriptor::post(group_endpoint(id, "share/")))
            .await
    }

    pub async fn delete_share_link(&self, id: i64) -> Result<(), ApiError> {
        self.request_empty(RequestDescriptor::delete(group_endpoint(id, "share/")))
            .await
    }

    /// A group opened through its share link; no session needed
    pub async fn get_shared_group(&self, share_token: &str) -> Result<VideoGroup, ApiError> {
        let endpoint = format!(
            "{GROUPS_ENDPOINT}shared/{}/",
            urlencoding::encode(share_token)
        );
        self.request_json(RequestDescriptor::get(endpoint)).await
    }
}
