//! API response DTOs.

use fedipress_db::entities::post::{self, PostAudience, PostType};
use serde::Serialize;

/// A post as returned by action and webhook endpoints.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub id: String,
    pub uuid: String,
    #[serde(rename = "type")]
    pub post_type: &'static str,
    pub audience: &'static str,
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub url: Option<String>,
    pub image_url: Option<String>,
    pub published_at: String,
    pub like_count: i32,
    pub repost_count: i32,
    pub reply_count: i32,
    pub reading_time_minutes: i32,
    pub ap_id: String,
}

impl From<post::Model> for PostResponse {
    fn from(model: post::Model) -> Self {
        Self {
            id: model.id,
            uuid: model.uuid,
            post_type: match model.post_type {
                PostType::Article => "article",
                PostType::Note => "note",
            },
            audience: match model.audience {
                PostAudience::Public => "public",
                PostAudience::FollowersOnly => "followers-only",
                PostAudience::Direct => "direct",
            },
            title: model.title,
            excerpt: model.excerpt,
            content: model.content,
            url: model.url,
            image_url: model.image_url,
            published_at: model.published_at.to_rfc3339(),
            like_count: model.like_count,
            repost_count: model.repost_count,
            reply_count: model.reply_count,
            reading_time_minutes: model.reading_time_minutes,
            ap_id: model.ap_id,
        }
    }
}
