//! Client de l'API TikHub.io.
//!
//! Découpage:
//! - **error**: erreurs typées remontées jusqu'à l'interface.
//! - **types**: types nettoyés (`Post`, profils, compte) et navigation JSON.
//! - **tikhub**: endpoints compte (clé, quota journalier).
//! - **douyin** / **tiktok**: endpoints contenu par plateforme.
//!
//! Le client détecte la plateforme depuis le lien de partage et route vers
//! le module correspondant; la pagination du flux utilisateur suit
//! `max_cursor` tant que `has_more`, bornée par `max_videos`.
pub mod douyin;
pub mod error;
pub mod tikhub;
pub mod tiktok;
pub mod types;

pub use error::ApiError;
pub use types::{AccountInfo, AuthorProfile, DailyUsage, MediaKind, Post};

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde_json::Value;
use tracing::{info, warn};

use crate::api::types::{first_url_at, i64_at, str_at, value_at};
use crate::utils::clean_share_url;

/// User-Agent des requêtes vers l'API (distinct de celui des médias).
pub const CLIENT_USER_AGENT: &str = concat!("TikHub Downloader App/", env!("CARGO_PKG_VERSION"));

/// Timeout des endpoints compte, rapides.
pub(crate) const ACCOUNT_TIMEOUT: Duration = Duration::from_secs(10);
/// Timeout des endpoints contenu, qui interrogent la plateforme amont.
pub(crate) const CONTENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Garde-fou de pagination si l'amont ne fait jamais retomber `has_more`.
const MAX_FEED_PAGES: usize = 50;

/// Plateformes prises en charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Douyin,
    TikTok,
}

impl Platform {
    /// Détecte la plateforme d'un lien de partage.
    pub fn detect(url: &str) -> Option<Platform> {
        if url.contains("douyin") {
            Some(Platform::Douyin)
        } else if url.contains("tiktok") {
            Some(Platform::TikTok)
        } else {
            None
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Platform::Douyin => douyin::PLATFORM,
            Platform::TikTok => tiktok::PLATFORM,
        }
    }
}

/// Client HTTP authentifié vers l'API TikHub.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Construit un client avec la clé `Bearer` et le proxy éventuel.
    pub fn new(base_url: &str, api_key: &str, proxy: Option<&str>) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        if let Ok(auth) = HeaderValue::from_str(&format!("Bearer {}", api_key.trim())) {
            headers.insert(AUTHORIZATION, auth);
        }
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));

        let mut builder = reqwest::Client::builder()
            .user_agent(CLIENT_USER_AGENT)
            .default_headers(headers);

        if let Some(proxy) = proxy.filter(|p| !p.trim().is_empty()) {
            builder = builder.proxy(reqwest::Proxy::all(proxy.trim())?);
        }

        Ok(Self {
            http: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// GET générique: statut vérifié, corps décodé en `Value`.
    pub(crate) async fn get_json(
        &self,
        path: &str,
        params: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .query(params)
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("{path}: HTTP {status}");
            return Err(ApiError::from_status(status));
        }

        Ok(response.json::<Value>().await?)
    }

    /// Vérifie la clé en interrogeant les informations du compte.
    pub async fn verify_key(&self) -> Result<AccountInfo, ApiError> {
        tikhub::get_user_info(self).await
    }

    /// Consommation journalière du compte.
    pub async fn daily_usage(&self) -> Result<DailyUsage, ApiError> {
        tikhub::get_user_daily_usage(self).await
    }

    /// Résout un lien de partage en publication nettoyée.
    pub async fn fetch_post(&self, share_url: &str) -> Result<Post, ApiError> {
        let clean_url = clean_share_url(share_url);
        let platform = Platform::detect(&clean_url)
            .ok_or_else(|| ApiError::UnsupportedPlatform(clean_url.clone()))?;
        info!("récupération de la publication ({}) {clean_url}", platform.label());

        match platform {
            Platform::Douyin => {
                let payload = douyin::fetch_one_video_by_share_url(self, &clean_url).await?;
                douyin::clean_post(&payload)
            }
            Platform::TikTok => {
                let payload = tiktok::fetch_one_video_by_share_url(self, &clean_url).await?;
                tiktok::clean_post(&payload)
            }
        }
    }

    /// Résout une URL de profil en profil + publications (paginé).
    pub async fn fetch_user(
        &self,
        user_url: &str,
        max_videos: usize,
    ) -> Result<(AuthorProfile, Vec<Post>), ApiError> {
        let clean_url = clean_share_url(user_url);
        let platform = Platform::detect(&clean_url)
            .ok_or_else(|| ApiError::UnsupportedPlatform(clean_url.clone()))?;

        let sec_user_id = match platform {
            Platform::Douyin => douyin::get_sec_user_id(self, &clean_url).await?,
            Platform::TikTok => tiktok::get_sec_user_id(self, &clean_url).await?,
        };

        let profile_payload = match platform {
            Platform::Douyin => douyin::user_profile(self, &sec_user_id).await?,
            Platform::TikTok => tiktok::user_profile(self, &sec_user_id).await?,
        };
        let profile = parse_author_profile(&profile_payload)?;

        let posts = self.fetch_user_feed(platform, &sec_user_id, max_videos).await?;
        Ok((profile, posts))
    }

    /// Accumule les pages du flux d'un utilisateur jusqu'à `max_videos`.
    async fn fetch_user_feed(
        &self,
        platform: Platform,
        sec_user_id: &str,
        max_videos: usize,
    ) -> Result<Vec<Post>, ApiError> {
        let mut posts: Vec<Post> = Vec::new();
        let mut max_cursor: i64 = 0;
        let mut pages = 0;

        loop {
            let page = match platform {
                Platform::Douyin => {
                    douyin::user_post_videos(self, sec_user_id, max_cursor, 20).await
                }
                Platform::TikTok => {
                    tiktok::user_post_videos(self, sec_user_id, max_cursor, 20).await
                }
            };

            let page = match page {
                Ok(page) => page,
                // Une page en échec n'invalide pas celles déjà reçues
                Err(e) if !posts.is_empty() => {
                    warn!("pagination interrompue après {} publications: {e}", posts.len());
                    break;
                }
                Err(e) => return Err(e),
            };

            let Some(items) = value_at(&page, &["data", "aweme_list"]).and_then(Value::as_array)
            else {
                break;
            };
            if items.is_empty() {
                break;
            }

            for item in items {
                if posts.len() >= max_videos {
                    break;
                }
                let cleaned = match platform {
                    Platform::Douyin => douyin::clean_detail(item, String::new()),
                    Platform::TikTok => tiktok::clean_tiktok_detail(item, String::new()),
                };
                match cleaned {
                    Ok(post) => posts.push(post),
                    Err(e) => warn!("publication ignorée dans le flux: {e}"),
                }
            }

            let has_more = value_at(&page, &["data", "has_more"])
                .map(|v| v.as_bool().unwrap_or(v.as_i64().unwrap_or(0) != 0))
                .unwrap_or(false);
            let next_cursor = i64_at(&page, &["data", "max_cursor"]);

            pages += 1;
            // Arrêt: assez de vidéos, fin du flux, curseur figé ou garde-fou
            if posts.len() >= max_videos
                || !has_more
                || next_cursor == max_cursor
                || pages >= MAX_FEED_PAGES
            {
                break;
            }
            max_cursor = next_cursor;
        }

        info!("{} publications récupérées pour {sec_user_id}", posts.len());
        Ok(posts)
    }
}

/// Extrait le profil auteur d'une réponse `handler_user_profile`.
fn parse_author_profile(payload: &Value) -> Result<AuthorProfile, ApiError> {
    let user = value_at(payload, &["data", "user"]).ok_or_else(|| {
        ApiError::UnexpectedPayload("user profile missing from response".to_string())
    })?;

    Ok(AuthorProfile {
        nickname: str_at(user, &["nickname"]),
        sec_uid: str_at(user, &["sec_uid"]),
        signature: str_at(user, &["signature"]),
        avatar_url: first_url_at(user, &["avatar_larger"]).unwrap_or_default(),
        follower_count: i64_at(user, &["follower_count"]),
        total_favorited: i64_at(user, &["total_favorited"]),
        aweme_count: i64_at(user, &["aweme_count"]),
    })
}
