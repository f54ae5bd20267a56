//! Points d'entrée TikTok de l'API TikHub et nettoyage des payloads.
//!
//! Même découpage que le module Douyin; seules diffèrent les routes et la
//! structure des albums photo (`image_post_info`).
use serde_json::Value;

use crate::api::douyin::{clean_detail, detail_of};
use crate::api::error::ApiError;
use crate::api::types::{first_url_at, str_at, MediaKind, Post};
use crate::api::{ApiClient, CONTENT_TIMEOUT};

pub const PLATFORM: &str = "tiktok";

/// Récupère une publication par lien de partage (endpoint app v3).
pub async fn fetch_one_video_by_share_url(
    client: &ApiClient,
    share_url: &str,
) -> Result<Value, ApiError> {
    client
        .get_json(
            "/api/v1/tiktok/app/v3/fetch_one_video_by_share_url",
            &[("share_url", share_url)],
            CONTENT_TIMEOUT,
        )
        .await
}

/// Récupère le profil d'un utilisateur.
pub async fn user_profile(client: &ApiClient, sec_user_id: &str) -> Result<Value, ApiError> {
    client
        .get_json(
            "/api/v1/tiktok/app/v3/handler_user_profile",
            &[("sec_user_id", sec_user_id)],
            CONTENT_TIMEOUT,
        )
        .await
}

/// Récupère une page des publications d'un utilisateur.
pub async fn user_post_videos(
    client: &ApiClient,
    sec_user_id: &str,
    max_cursor: i64,
    count: usize,
) -> Result<Value, ApiError> {
    client
        .get_json(
            "/api/v1/tiktok/app/v3/fetch_user_post_videos",
            &[
                ("sec_user_id", sec_user_id),
                ("max_cursor", &max_cursor.to_string()),
                ("count", &count.to_string()),
            ],
            CONTENT_TIMEOUT,
        )
        .await
}

/// Résout le `sec_user_id` à partir d'une URL de profil.
pub async fn get_sec_user_id(client: &ApiClient, user_url: &str) -> Result<String, ApiError> {
    let payload = client
        .get_json(
            "/api/v1/tiktok/web/get_sec_user_id",
            &[("url", user_url)],
            CONTENT_TIMEOUT,
        )
        .await?;
    match payload.get("data").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(ApiError::UnexpectedPayload(
            "sec_user_id absent de la réponse".to_string(),
        )),
    }
}

/// Nettoie une réponse brute en `Post`.
pub fn clean_post(payload: &Value) -> Result<Post, ApiError> {
    let raw_url = str_at(payload, &["params", "share_url"]);
    let detail = detail_of(payload)?;
    clean_tiktok_detail(detail, raw_url)
}

/// Nettoie un détail de publication TikTok.
pub fn clean_tiktok_detail(detail: &Value, raw_url: String) -> Result<Post, ApiError> {
    // Le gros du nettoyage est commun avec Douyin
    let mut post = clean_detail(detail, raw_url)?;
    post.platform = PLATFORM.to_string();

    // Les albums TikTok rangent leurs images sous image_post_info
    if let Some(images) = detail
        .get("image_post_info")
        .and_then(|v| v.get("images"))
        .and_then(Value::as_array)
    {
        post.image_urls = images
            .iter()
            .filter_map(|image| first_url_at(image, &["display_image"]))
            .collect();
        if !post.image_urls.is_empty() && post.video_urls.is_empty() {
            post.media_kind = MediaKind::Image;
        }
    }

    Ok(post)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clean_tiktok_video() {
        let payload = json!({
            "params": {"share_url": "https://www.tiktok.com/@user/video/7158"},
            "data": {
                "aweme_detail": {
                    "aweme_id": "7158",
                    "aweme_type": 0,
                    "desc": "dance #fyp",
                    "caption": "dance #fyp",
                    "author": {"nickname": "user", "sec_uid": "sec123"},
                    "video": {
                        "play_addr": {
                            "url_list": ["https://cdn/tiktok.mp4"],
                            "width": 720,
                            "height": 1280
                        }
                    },
                    "statistics": {"digg_count": 9}
                }
            }
        });
        let post = clean_post(&payload).unwrap();
        assert_eq!(post.platform, "tiktok");
        assert_eq!(post.video_urls, vec!["https://cdn/tiktok.mp4".to_string()]);
        assert_eq!(post.tags, vec!["fyp"]);
    }

    #[test]
    fn test_clean_tiktok_photo_post() {
        let payload = json!({
            "data": {
                "aweme_detail": {
                    "aweme_id": "7159",
                    "aweme_type": 150,
                    "image_post_info": {
                        "images": [
                            {"display_image": {"url_list": ["https://cdn/p1.webp"]}},
                            {"display_image": {"url_list": ["https://cdn/p2.webp"]}}
                        ]
                    }
                }
            }
        });
        let post = clean_post(&payload).unwrap();
        assert_eq!(post.media_kind, MediaKind::Image);
        assert_eq!(
            post.image_urls,
            vec!["https://cdn/p1.webp".to_string(), "https://cdn/p2.webp".to_string()]
        );
    }
}
