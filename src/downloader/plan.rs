//! Transformation d'une publication résolue en travaux de téléchargement.
//!
//! Règles de nommage:
//! - Base: description nettoyée si l'option est active, sinon
//!   `plateforme_auteur_id`.
//! - Vidéo simple: un fichier `base.mp4` dans le dossier de destination.
//! - Album: un sous-dossier `base/` avec les images numérotées `_NNN`
//!   et une page `preview.html`; les live photos y ajoutent leur `.mp4`.
use std::path::Path;

use crate::api::{MediaKind, Post};
use crate::downloader::preview::preview_page;
use crate::downloader::types::{DownloadJob, PostPlan};
use crate::utils::sanitize_filename;

/// Longueur maximale de la base de nom de fichier.
const MAX_BASENAME_CHARS: usize = 80;

/// Options de planification, dérivées de la configuration.
#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    /// Nommer les fichiers d'après la description plutôt que l'identifiant.
    pub use_description: bool,
}

/// Base de nom de fichier d'une publication.
pub fn post_basename(post: &Post, use_description: bool) -> String {
    if use_description {
        let base = sanitize_filename(&post.desc, MAX_BASENAME_CHARS);
        if !base.is_empty() {
            return base;
        }
    }
    let base = sanitize_filename(
        &format!("{}_{}_{}", post.platform, post.author_name, post.id),
        MAX_BASENAME_CHARS,
    );
    if base.is_empty() {
        post.id.clone()
    } else {
        base
    }
}

/// Extension probable d'une URL de média d'album.
fn album_extension(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    if path.to_ascii_lowercase().ends_with(".mp4") {
        "mp4"
    } else {
        "jpeg"
    }
}

/// Construit le plan de téléchargement d'une publication.
pub fn plan_post(post: &Post, download_dir: &Path, options: &PlanOptions) -> PostPlan {
    let base = post_basename(post, options.use_description);
    let mut jobs = Vec::new();
    let mut pages = Vec::new();

    let has_album = !post.image_urls.is_empty();
    if has_album {
        // Album (ou contenu mixte): sous-dossier dédié avec aperçu HTML
        let album_dir = download_dir.join(&base);
        let mut files = Vec::new();
        for (i, url) in post.image_urls.iter().enumerate() {
            let name = format!("{base}_{:03}.{}", i + 1, album_extension(url));
            files.push(name.clone());
            jobs.push(DownloadJob {
                post_id: post.id.clone(),
                url: url.clone(),
                dest: album_dir.join(name),
            });
        }
        if post.media_kind == MediaKind::Mixed {
            if let Some(url) = post.video_urls.first() {
                let name = format!("{base}.mp4");
                files.push(name.clone());
                jobs.push(DownloadJob {
                    post_id: post.id.clone(),
                    url: url.clone(),
                    dest: album_dir.join(name),
                });
            }
        }
        pages.push((album_dir.join("preview.html"), preview_page(post, &files)));
    } else if let Some(url) = post.video_urls.first() {
        jobs.push(DownloadJob {
            post_id: post.id.clone(),
            url: url.clone(),
            dest: download_dir.join(format!("{base}.mp4")),
        });
    }

    PostPlan {
        post: post.clone(),
        jobs,
        pages,
    }
}
