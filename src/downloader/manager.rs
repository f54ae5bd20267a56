//! Orchestration d'un lot de téléchargements.
//!
//! Les publications du lot sont traitées en parallèle, bornées par la
//! limite de téléchargements simultanés; les fichiers d'une même
//! publication restent séquentiels pour ménager les CDN. Chaque étape
//! émet un événement de progression vers l'interface.
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use futures::{stream, StreamExt};
use tokio::fs;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use crate::api::{ApiClient, Post};
use crate::config::Config;
use crate::downloader::fetch::{build_media_client, download_file};
use crate::downloader::plan::{plan_post, PlanOptions};
use crate::downloader::types::{
    BatchEvent, BatchReport, DownloadOutcome, FetchOptions, PostPlan,
};

/// Exécute des lots de téléchargements avec une limite de parallélisme.
pub struct BatchRunner {
    api: Arc<ApiClient>,
    media: reqwest::Client,
    download_dir: PathBuf,
    plan_options: PlanOptions,
    fetch_options: FetchOptions,
    concurrency: usize,
    cancel: Arc<AtomicBool>,
}

impl BatchRunner {
    /// Construit un exécuteur à partir de la configuration courante.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api = ApiClient::new(
            &config.api_base_url,
            &config.api_key,
            Some(config.proxy.as_str()),
        )?;
        Ok(Self {
            api: Arc::new(api),
            media: build_media_client(Some(config.proxy.as_str()))?,
            download_dir: config.download_path.clone(),
            plan_options: PlanOptions {
                use_description: config.use_description,
            },
            fetch_options: FetchOptions {
                skip_existing: config.skip_existing,
                ..FetchOptions::default()
            },
            concurrency: config.concurrent_downloads.max(1),
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Partage le drapeau d'annulation avec l'interface.
    ///
    /// Les publications déjà démarrées se terminent; les suivantes sont
    /// comptées en échec.
    pub fn set_cancel_flag(&mut self, flag: Arc<AtomicBool>) {
        self.cancel = flag;
    }

    /// Résout puis télécharge une liste de liens de partage.
    ///
    /// La clé d'événement de chaque élément est le lien d'entrée, stable
    /// pour l'interface même quand la résolution échoue.
    pub async fn run_urls(
        &self,
        urls: Vec<String>,
        events: UnboundedSender<BatchEvent>,
    ) -> BatchReport {
        let results = stream::iter(urls)
            .map(|url| {
                let events = events.clone();
                async move {
                    if self.cancel.load(Ordering::Relaxed) {
                        let _ = events.send(BatchEvent::Failed {
                            id: url.clone(),
                            message: "cancelled".to_string(),
                        });
                        return ItemResult::failed();
                    }
                    let _ = events.send(BatchEvent::Resolving { id: url.clone() });
                    match self.api.fetch_post(&url).await {
                        Ok(post) => self.download_post(&url, &post, &events).await,
                        Err(e) => {
                            let _ = events.send(BatchEvent::Failed {
                                id: url.clone(),
                                message: e.to_string(),
                            });
                            ItemResult::failed()
                        }
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .collect::<Vec<_>>()
            .await;

        self.finish(results, events)
    }

    /// Télécharge des publications déjà résolues (flux utilisateur).
    ///
    /// La clé d'événement est l'identifiant de la publication.
    pub async fn run_posts(
        &self,
        posts: Vec<Post>,
        events: UnboundedSender<BatchEvent>,
    ) -> BatchReport {
        let results = stream::iter(posts)
            .map(|post| {
                let events = events.clone();
                let key = post.id.clone();
                async move {
                    if self.cancel.load(Ordering::Relaxed) {
                        let _ = events.send(BatchEvent::Failed {
                            id: key.clone(),
                            message: "cancelled".to_string(),
                        });
                        return ItemResult::failed();
                    }
                    self.download_post(&key, &post, &events).await
                }
            })
            .buffer_unordered(self.concurrency)
            .collect::<Vec<_>>()
            .await;

        self.finish(results, events)
    }

    /// Télécharge tous les fichiers d'une publication, séquentiellement.
    async fn download_post(
        &self,
        key: &str,
        post: &Post,
        events: &UnboundedSender<BatchEvent>,
    ) -> ItemResult {
        let _ = events.send(BatchEvent::Fetching {
            id: key.to_string(),
            title: post.desc.clone(),
        });

        let plan = plan_post(post, &self.download_dir, &self.plan_options);
        if plan.jobs.is_empty() {
            warn!("aucune URL téléchargeable pour la publication {}", post.id);
            let _ = events.send(BatchEvent::Failed {
                id: key.to_string(),
                message: "no downloadable media URL".to_string(),
            });
            return ItemResult::failed();
        }

        match self.execute_plan(&plan).await {
            Ok(mut item) => {
                let _ = events.send(BatchEvent::Done {
                    id: key.to_string(),
                    files: item.files.len(),
                });
                item.ok = 1;
                item
            }
            Err(e) => {
                warn!("publication {} en échec: {e}", post.id);
                let _ = events.send(BatchEvent::Failed {
                    id: key.to_string(),
                    message: e.to_string(),
                });
                ItemResult::failed()
            }
        }
    }

    /// Exécute les travaux d'un plan puis écrit ses pages annexes.
    async fn execute_plan(&self, plan: &PostPlan) -> Result<ItemResult> {
        let mut item = ItemResult::default();
        for job in &plan.jobs {
            match download_file(&self.media, job, &self.fetch_options).await? {
                DownloadOutcome::Downloaded(path) => item.files.push(path),
                DownloadOutcome::Skipped(path) => {
                    item.skipped += 1;
                    item.files.push(path);
                }
            }
        }
        for (path, content) in &plan.pages {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::write(path, content).await?;
        }
        Ok(item)
    }

    /// Agrège les résultats et émet l'événement de fin.
    fn finish(
        &self,
        results: Vec<ItemResult>,
        events: UnboundedSender<BatchEvent>,
    ) -> BatchReport {
        let mut report = BatchReport::default();
        for item in results {
            report.ok += item.ok;
            report.failed += item.failed;
            report.skipped += item.skipped;
            report.files.extend(item.files);
        }
        info!(
            "lot terminé: {} réussites, {} échecs, {} ignorés",
            report.ok, report.failed, report.skipped
        );
        let _ = events.send(BatchEvent::Finished {
            report: report.clone(),
        });
        report
    }
}

/// Résultat d'un élément du lot.
#[derive(Debug, Default)]
struct ItemResult {
    ok: usize,
    failed: usize,
    skipped: usize,
    files: Vec<PathBuf>,
}

impl ItemResult {
    fn failed() -> Self {
        Self {
            failed: 1,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::service::{make_service_fn, service_fn};
    use hyper::{Body, Request, Response, Server};
    use std::convert::Infallible;
    use std::net::SocketAddr;
    use tempfile::tempdir;
    use tokio::sync::mpsc;

    /// Serveur qui joue à la fois l'API (JSON) et le CDN (octets).
    fn spawn_combined_server() -> SocketAddr {
        let make_svc = make_service_fn(|_| async {
            Ok::<_, Infallible>(service_fn(|req: Request<Body>| async move {
                let path = req.uri().path().to_string();
                let resp = if path.contains("fetch_one_video_by_share_url") {
                    let query = req.uri().query().unwrap_or("");
                    // L'identifiant de la vidéo est encodé dans le lien demandé
                    let id = if query.contains("first") { "v1" } else { "v2" };
                    let host = req
                        .headers()
                        .get("host")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("127.0.0.1")
                        .to_string();
                    Response::builder()
                        .header("content-type", "application/json")
                        .body(Body::from(
                            serde_json::json!({
                                "data": {"aweme_detail": {
                                    "aweme_id": id,
                                    "aweme_type": 0,
                                    "author": {"nickname": "u"},
                                    "video": {"play_addr": {
                                        "url_list": [format!("http://{host}/media/{id}.mp4")]
                                    }}
                                }}
                            })
                            .to_string(),
                        ))
                        .unwrap()
                } else if path.starts_with("/media/") {
                    Response::builder()
                        .header("content-type", "video/mp4")
                        .body(Body::from(format!("bytes of {path}")))
                        .unwrap()
                } else {
                    Response::builder().status(404).body(Body::empty()).unwrap()
                };
                Ok::<_, Infallible>(resp)
            }))
        });
        let server = Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0))).serve(make_svc);
        let addr = server.local_addr();
        tokio::spawn(server);
        addr
    }

    fn runner_for(addr: SocketAddr, dir: &std::path::Path, concurrency: usize) -> BatchRunner {
        let mut config = Config::default();
        config.api_base_url = format!("http://{addr}");
        config.api_key = "k".to_string();
        config.download_path = dir.to_path_buf();
        config.concurrent_downloads = concurrency;
        BatchRunner::from_config(&config).unwrap()
    }

    #[tokio::test]
    async fn test_batch_downloads_all_links() {
        let addr = spawn_combined_server();
        let dir = tempdir().unwrap();
        let runner = runner_for(addr, dir.path(), 2);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let urls = vec![
            "https://v.douyin.com/first".to_string(),
            "https://v.douyin.com/second".to_string(),
        ];
        let report = runner.run_urls(urls, tx).await;

        assert_eq!(report.ok, 2);
        assert_eq!(report.failed, 0);
        assert!(dir.path().join("douyin_u_v1.mp4").exists());
        assert!(dir.path().join("douyin_u_v2.mp4").exists());

        let mut finished = false;
        while let Ok(event) = rx.try_recv() {
            if let BatchEvent::Finished { report } = event {
                assert_eq!(report.ok, 2);
                finished = true;
            }
        }
        assert!(finished);
    }

    #[tokio::test]
    async fn test_batch_counts_failures() {
        let addr = spawn_combined_server();
        let dir = tempdir().unwrap();
        let runner = runner_for(addr, dir.path(), 3);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let urls = vec![
            "https://v.douyin.com/first".to_string(),
            "https://example.com/not-supported".to_string(),
        ];
        let report = runner.run_urls(urls, tx).await;

        assert_eq!(report.ok, 1);
        assert_eq!(report.failed, 1);

        let mut failed_key = None;
        while let Ok(event) = rx.try_recv() {
            if let BatchEvent::Failed { id, .. } = event {
                failed_key = Some(id);
            }
        }
        assert_eq!(
            failed_key.as_deref(),
            Some("https://example.com/not-supported")
        );
    }

    #[tokio::test]
    async fn test_cancel_flag_fails_remaining_items() {
        let addr = spawn_combined_server();
        let dir = tempdir().unwrap();
        let mut runner = runner_for(addr, dir.path(), 1);

        let cancel = Arc::new(AtomicBool::new(true));
        runner.set_cancel_flag(cancel);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let urls = vec![
            "https://v.douyin.com/first".to_string(),
            "https://v.douyin.com/second".to_string(),
        ];
        let report = runner.run_urls(urls, tx).await;

        assert_eq!(report.ok, 0);
        assert_eq!(report.failed, 2);
        assert!(!dir.path().join("douyin_u_v1.mp4").exists());

        let mut messages = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let BatchEvent::Failed { message, .. } = event {
                messages.push(message);
            }
        }
        assert_eq!(messages, vec!["cancelled", "cancelled"]);
    }

    #[tokio::test]
    async fn test_run_posts_skips_existing() {
        let addr = spawn_combined_server();
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("douyin_u_v1.mp4"), b"old bytes").unwrap();
        let runner = runner_for(addr, dir.path(), 1);

        let post = Post {
            id: "v1".to_string(),
            platform: "douyin".to_string(),
            author_name: "u".to_string(),
            video_urls: vec![format!("http://{addr}/media/v1.mp4")],
            ..Post::default()
        };

        let (tx, _rx) = mpsc::unbounded_channel();
        let report = runner.run_posts(vec![post], tx).await;

        assert_eq!(report.ok, 1);
        assert_eq!(report.skipped, 1);
        // Le fichier existant n'a pas été réécrit
        assert_eq!(
            std::fs::read(dir.path().join("douyin_u_v1.mp4")).unwrap(),
            b"old bytes"
        );
    }
}
