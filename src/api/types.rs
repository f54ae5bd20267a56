//! Types nettoyés produits par le client API.
//!
//! L'API amont renvoie un JSON irrégulier et non documenté; seuls les types
//! de ce module sont garantis stables pour le reste de l'application.
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Nature du média d'une publication.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Video,
    Image,
    Audio,
    Mixed,
}

impl MediaKind {
    /// Table des codes `aweme_type` observés sur Douyin/TikTok.
    pub fn from_aweme_type(code: i64) -> MediaKind {
        match code {
            2 | 68 | 150 => MediaKind::Image,
            _ => MediaKind::Video,
        }
    }

    /// Déduit la nature du média des URLs disponibles quand le code manque.
    pub fn infer(has_video: bool, has_image: bool, has_audio: bool) -> Option<MediaKind> {
        match (has_video, has_image, has_audio) {
            (true, false, false) => Some(MediaKind::Video),
            (false, true, false) => Some(MediaKind::Image),
            (false, false, true) => Some(MediaKind::Audio),
            (false, false, false) => None,
            _ => Some(MediaKind::Mixed),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Image => "image",
            MediaKind::Audio => "audio",
            MediaKind::Mixed => "mixed",
        }
    }
}

/// Publication nettoyée, indépendante de la plateforme d'origine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub platform: String,
    pub media_kind: MediaKind,
    pub desc: String,
    pub raw_url: String,
    /// Date de création ISO-8601 UTC.
    pub create_time: String,
    pub author_name: String,
    pub author_id: String,
    pub author_avatar: String,
    pub video_urls: Vec<String>,
    pub image_urls: Vec<String>,
    pub music_id: String,
    pub music_title: String,
    pub music_author: String,
    pub music_urls: Vec<String>,
    pub like_count: i64,
    pub comment_count: i64,
    pub share_count: i64,
    /// Durée en millisecondes.
    pub duration: i64,
    /// Taille annoncée, déjà formatée ("12.34 MB").
    pub data_size: String,
    /// "largeurxhauteur".
    pub resolution: String,
    pub tags: Vec<String>,
}

/// Profil d'auteur tel qu'affiché dans l'onglet utilisateur.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorProfile {
    pub nickname: String,
    pub sec_uid: String,
    pub signature: String,
    pub avatar_url: String,
    pub follower_count: i64,
    pub total_favorited: i64,
    pub aweme_count: i64,
}

/// Informations de compte TikHub (vérification de clé).
#[derive(Debug, Clone, Default)]
pub struct AccountInfo {
    pub email: String,
    pub balance: f64,
    pub free_credit: f64,
}

/// Consommation journalière du compte.
#[derive(Debug, Clone, Default)]
pub struct DailyUsage {
    pub daily_limit: i64,
    pub used_today: i64,
    pub remaining: i64,
}

// ---- Navigation dans les payloads `serde_json::Value` ----

/// Descend le long d'un chemin de clés et retourne la valeur atteinte.
pub(crate) fn value_at<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = root;
    for key in path {
        current = current.get(key)?;
    }
    Some(current)
}

/// Chaîne au bout d'un chemin, ou chaîne vide.
pub(crate) fn str_at(root: &Value, path: &[&str]) -> String {
    value_at(root, path)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Entier au bout d'un chemin, ou zéro.
pub(crate) fn i64_at(root: &Value, path: &[&str]) -> i64 {
    value_at(root, path).and_then(Value::as_i64).unwrap_or(0)
}

/// Première URL d'un champ `url_list` au bout d'un chemin.
pub(crate) fn first_url_at(root: &Value, path: &[&str]) -> Option<String> {
    let holder = value_at(root, path)?;
    let url = holder.get("url_list")?.get(0)?.as_str()?;
    if url.is_empty() {
        None
    } else {
        Some(url.to_string())
    }
}

/// Extrait les tags `#mot` d'une légende.
pub(crate) fn extract_tags(caption: &str) -> Vec<String> {
    let mut tags = Vec::new();
    for chunk in caption.split('#').skip(1) {
        let tag: String = chunk
            .chars()
            .take_while(|c| !c.is_whitespace() && *c != '#')
            .collect();
        if !tag.is_empty() {
            tags.push(tag);
        }
    }
    tags
}

/// Formate une taille en octets comme l'affiche l'application ("x.xx MB").
pub(crate) fn format_data_size(bytes: i64) -> String {
    format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_media_kind_from_aweme_type() {
        assert_eq!(MediaKind::from_aweme_type(0), MediaKind::Video);
        assert_eq!(MediaKind::from_aweme_type(4), MediaKind::Video);
        assert_eq!(MediaKind::from_aweme_type(2), MediaKind::Image);
        assert_eq!(MediaKind::from_aweme_type(68), MediaKind::Image);
        assert_eq!(MediaKind::from_aweme_type(150), MediaKind::Image);
    }

    #[test]
    fn test_media_kind_inference() {
        assert_eq!(MediaKind::infer(true, false, false), Some(MediaKind::Video));
        assert_eq!(MediaKind::infer(true, true, false), Some(MediaKind::Mixed));
        assert_eq!(MediaKind::infer(false, false, false), None);
    }

    #[test]
    fn test_value_navigation() {
        let v = json!({"a": {"b": {"c": "deep", "n": 7}}});
        assert_eq!(str_at(&v, &["a", "b", "c"]), "deep");
        assert_eq!(i64_at(&v, &["a", "b", "n"]), 7);
        assert_eq!(str_at(&v, &["a", "missing"]), "");
        assert_eq!(i64_at(&v, &["nope"]), 0);
    }

    #[test]
    fn test_first_url_at() {
        let v = json!({"video": {"play_addr": {"url_list": ["https://cdn/x.mp4", "https://cdn/y.mp4"]}}});
        assert_eq!(
            first_url_at(&v, &["video", "play_addr"]),
            Some("https://cdn/x.mp4".to_string())
        );
        let empty = json!({"video": {"play_addr": {"url_list": [""]}}});
        assert_eq!(first_url_at(&empty, &["video", "play_addr"]), None);
    }

    #[test]
    fn test_extract_tags() {
        assert_eq!(
            extract_tags("check this out #dance #fyp 日常 #生活vlog"),
            vec!["dance", "fyp", "生活vlog"]
        );
        assert!(extract_tags("no tags here").is_empty());
    }

    #[test]
    fn test_format_data_size() {
        assert_eq!(format_data_size(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(format_data_size(0), "0.00 MB");
    }
}
