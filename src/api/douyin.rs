//! Points d'entrée Douyin de l'API TikHub et nettoyage des payloads.
//!
//! Les réponses brutes sont des `serde_json::Value`; seule `clean_post`
//! produit un type stable. Préférence des adresses vidéo, dans l'ordre:
//! `play_addr_265`, `play_addr`, `play_addr_h264`, `download_addr`,
//! `play_addr_lowbr`.
use serde_json::Value;
use tracing::info;

use crate::api::error::ApiError;
use crate::api::types::{
    extract_tags, first_url_at, format_data_size, i64_at, str_at, value_at, MediaKind, Post,
};
use crate::api::{ApiClient, CONTENT_TIMEOUT};
use crate::utils::iso_timestamp;

pub const PLATFORM: &str = "douyin";

/// Récupère une publication par lien de partage (endpoint app v3).
pub async fn fetch_one_video_by_share_url(
    client: &ApiClient,
    share_url: &str,
) -> Result<Value, ApiError> {
    let payload = client
        .get_json(
            "/api/v1/douyin/app/v3/fetch_one_video_by_share_url",
            &[("share_url", share_url)],
            CONTENT_TIMEOUT,
        )
        .await?;
    info!("douyin fetch_one_video_by_share_url: réponse reçue");
    Ok(payload)
}

/// Récupère le profil d'un utilisateur.
pub async fn user_profile(client: &ApiClient, sec_user_id: &str) -> Result<Value, ApiError> {
    client
        .get_json(
            "/api/v1/douyin/app/v3/handler_user_profile",
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
            "/api/v1/douyin/app/v3/fetch_user_post_videos",
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
            "/api/v1/douyin/web/get_sec_user_id",
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

/// Meilleure adresse de lecture disponible pour un détail de publication.
pub(crate) fn video_play_address(detail: &Value) -> Option<String> {
    const PREFERENCE: &[&str] = &[
        "play_addr_265",
        "play_addr",
        "play_addr_h264",
        "download_addr",
        "play_addr_lowbr",
    ];
    let video = detail.get("video")?;
    PREFERENCE
        .iter()
        .find_map(|key| first_url_at(video, &[key]))
}

/// Extrait le détail d'une réponse (`aweme_detail` ou `aweme_details[0]`).
pub(crate) fn detail_of(payload: &Value) -> Result<&Value, ApiError> {
    if let Some(detail) = value_at(payload, &["data", "aweme_detail"]) {
        if !detail.is_null() {
            return Ok(detail);
        }
    }
    if let Some(detail) = value_at(payload, &["data", "aweme_details"]).and_then(|d| d.get(0)) {
        return Ok(detail);
    }
    Err(ApiError::UnexpectedPayload(
        "aucun détail de publication dans la réponse (contenu privé ou lien expiré?)".to_string(),
    ))
}

/// Nettoie une réponse brute en `Post`.
pub fn clean_post(payload: &Value) -> Result<Post, ApiError> {
    let raw_url = str_at(payload, &["params", "share_url"]);
    let detail = detail_of(payload)?;
    clean_detail(detail, raw_url)
}

/// Nettoie un détail de publication (réponse unitaire ou élément de flux).
pub fn clean_detail(detail: &Value, raw_url: String) -> Result<Post, ApiError> {
    let video_urls: Vec<String> = video_play_address(detail).into_iter().collect();

    // Images d'album; une live photo ajoute aussi son URL vidéo
    let mut image_urls = Vec::new();
    if let Some(images) = detail.get("images").and_then(Value::as_array) {
        for image in images {
            if let Some(url) = first_url_at(image, &[]) {
                image_urls.push(url);
            }
            if let Some(live) = first_url_at(image, &["video", "play_addr"]) {
                image_urls.push(live);
            }
        }
    }

    let media_kind = match detail.get("aweme_type").and_then(Value::as_i64) {
        Some(code) => MediaKind::from_aweme_type(code),
        None => MediaKind::infer(!video_urls.is_empty(), !image_urls.is_empty(), false)
            .unwrap_or(MediaKind::Video),
    };

    let width = i64_at(detail, &["video", "play_addr", "width"]);
    let height = i64_at(detail, &["video", "play_addr", "height"]);
    let data_size = format_data_size(i64_at(detail, &["video", "play_addr", "data_size"]));

    let caption = str_at(detail, &["caption"]);

    Ok(Post {
        id: str_at(detail, &["aweme_id"]),
        platform: PLATFORM.to_string(),
        media_kind,
        desc: str_at(detail, &["desc"]),
        raw_url,
        create_time: iso_timestamp(i64_at(detail, &["create_time"])),
        author_name: str_at(detail, &["author", "nickname"]),
        author_id: str_at(detail, &["author", "sec_uid"]),
        author_avatar: first_url_at(detail, &["author", "avatar_larger"]).unwrap_or_default(),
        video_urls,
        image_urls,
        music_id: str_at(detail, &["music", "id_str"]),
        music_title: str_at(detail, &["music", "title"]),
        music_author: str_at(detail, &["music", "owner_nickname"]),
        music_urls: first_url_at(detail, &["music", "play_url"]).into_iter().collect(),
        like_count: i64_at(detail, &["statistics", "digg_count"]),
        comment_count: i64_at(detail, &["statistics", "comment_count"]),
        share_count: i64_at(detail, &["statistics", "share_count"]),
        duration: i64_at(detail, &["duration"]),
        data_size,
        resolution: format!("{width}x{height}"),
        tags: extract_tags(&caption),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_video_payload() -> Value {
        json!({
            "params": {"share_url": "https://v.douyin.com/abc"},
            "data": {
                "aweme_detail": {
                    "aweme_id": "7301",
                    "aweme_type": 0,
                    "desc": "une journée à Shanghai",
                    "caption": "une journée à Shanghai #voyage #vlog",
                    "create_time": 1700000000,
                    "duration": 15000,
                    "author": {
                        "nickname": "douyin_user",
                        "sec_uid": "MS4wLjABAAAA",
                        "avatar_larger": {"url_list": ["https://cdn/avatar.jpg"]}
                    },
                    "video": {
                        "play_addr": {
                            "url_list": ["https://cdn/h264.mp4"],
                            "width": 1080,
                            "height": 1920,
                            "data_size": 2097152
                        },
                        "play_addr_265": {"url_list": ["https://cdn/h265.mp4"]}
                    },
                    "music": {
                        "id_str": "m1",
                        "title": "original sound",
                        "owner_nickname": "douyin_user",
                        "play_url": {"url_list": ["https://cdn/music.mp3"]}
                    },
                    "statistics": {"digg_count": 1200, "comment_count": 34, "share_count": 5}
                }
            }
        })
    }

    #[test]
    fn test_clean_video_post() {
        let post = clean_post(&sample_video_payload()).unwrap();
        assert_eq!(post.id, "7301");
        assert_eq!(post.platform, "douyin");
        assert_eq!(post.media_kind, MediaKind::Video);
        // h265 préféré à h264
        assert_eq!(post.video_urls, vec!["https://cdn/h265.mp4".to_string()]);
        assert_eq!(post.resolution, "1080x1920");
        assert_eq!(post.data_size, "2.00 MB");
        assert_eq!(post.like_count, 1200);
        assert_eq!(post.tags, vec!["voyage", "vlog"]);
        assert_eq!(post.raw_url, "https://v.douyin.com/abc");
        assert_eq!(post.create_time, "2023-11-14T22:13:20Z");
    }

    #[test]
    fn test_play_address_fallback_chain() {
        let detail = json!({
            "video": {
                "download_addr": {"url_list": ["https://cdn/dl.mp4"]},
                "play_addr_lowbr": {"url_list": ["https://cdn/low.mp4"]}
            }
        });
        assert_eq!(video_play_address(&detail), Some("https://cdn/dl.mp4".to_string()));
    }

    #[test]
    fn test_clean_image_album_with_live_photo() {
        let payload = json!({
            "data": {
                "aweme_detail": {
                    "aweme_id": "7302",
                    "aweme_type": 68,
                    "desc": "album",
                    "images": [
                        {"url_list": ["https://cdn/1.webp"]},
                        {
                            "url_list": ["https://cdn/2.webp"],
                            "video": {"play_addr": {"url_list": ["https://cdn/2_live.mp4"]}}
                        }
                    ]
                }
            }
        });
        let post = clean_post(&payload).unwrap();
        assert_eq!(post.media_kind, MediaKind::Image);
        assert_eq!(
            post.image_urls,
            vec![
                "https://cdn/1.webp".to_string(),
                "https://cdn/2.webp".to_string(),
                "https://cdn/2_live.mp4".to_string()
            ]
        );
    }

    #[test]
    fn test_detail_from_aweme_details_array() {
        let payload = json!({
            "data": {"aweme_details": [{"aweme_id": "7303", "aweme_type": 4}]}
        });
        let post = clean_post(&payload).unwrap();
        assert_eq!(post.id, "7303");
    }

    #[test]
    fn test_missing_detail_is_an_error() {
        let payload = json!({"data": {}});
        assert!(matches!(
            clean_post(&payload),
            Err(ApiError::UnexpectedPayload(_))
        ));
    }
}
