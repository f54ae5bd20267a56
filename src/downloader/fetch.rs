//! Téléchargement d'un fichier média vers le disque.
//!
//! Déroulement:
//! - Les octets arrivent en flux dans un fichier temporaire `.part`,
//!   repris via `Range` s'il existe déjà une portion.
//! - L'extension est corrigée d'après le `Content-Type` reçu avant le
//!   renommage final.
//! - Les erreurs passagères (timeout, 429, 5xx) déclenchent de nouvelles
//!   tentatives espacées exponentiellement avec une part d'aléa.
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, bail, Context, Result};
use futures::StreamExt;
use reqwest::header::{CONTENT_TYPE, RANGE};
use reqwest::StatusCode;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::downloader::types::{DownloadJob, DownloadOutcome, FetchOptions};

/// User-Agent navigateur pour les CDN de médias, qui refusent les clients inconnus.
pub const MEDIA_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

/// Délai de base entre deux tentatives, doublé à chaque échec.
const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

/// Construit le client HTTP utilisé pour les médias (UA navigateur, proxy éventuel).
pub fn build_media_client(proxy: Option<&str>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .user_agent(MEDIA_USER_AGENT)
        .timeout(Duration::from_secs(120));
    if let Some(proxy) = proxy.filter(|p| !p.trim().is_empty()) {
        builder = builder.proxy(reqwest::Proxy::all(proxy.trim())?);
    }
    Ok(builder.build()?)
}

/// Télécharge un fichier avec reprise et retentatives.
pub async fn download_file(
    client: &reqwest::Client,
    job: &DownloadJob,
    options: &FetchOptions,
) -> Result<DownloadOutcome> {
    if options.skip_existing && file_present(&job.dest).await {
        debug!("déjà présent, ignoré: {}", job.dest.display());
        return Ok(DownloadOutcome::Skipped(job.dest.clone()));
    }

    if let Some(parent) = job.dest.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("création du dossier {}", parent.display()))?;
    }

    let mut attempt = 0u32;
    loop {
        match try_download(client, job, options).await {
            Ok(outcome) => return Ok(outcome),
            Err(e) if attempt < options.max_retries && is_transient(&e) => {
                attempt += 1;
                let delay = retry_delay(attempt);
                warn!(
                    "tentative {attempt}/{} pour {} dans {:.1}s: {e}",
                    options.max_retries,
                    job.url,
                    delay.as_secs_f32()
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                // Échec définitif: le fragment ne sera jamais complété
                if !is_transient(&e) {
                    let part_path = job.dest.with_extension(part_extension(&job.dest));
                    let _ = fs::remove_file(&part_path).await;
                }
                return Err(e);
            }
        }
    }
}

/// Une tentative de téléchargement complète vers le `.part` puis renommage.
async fn try_download(
    client: &reqwest::Client,
    job: &DownloadJob,
    options: &FetchOptions,
) -> Result<DownloadOutcome> {
    let part_path = job.dest.with_extension(part_extension(&job.dest));
    let resume_from = match fs::metadata(&part_path).await {
        Ok(meta) => meta.len(),
        Err(_) => 0,
    };

    let mut request = client.get(&job.url);
    if resume_from > 0 {
        request = request.header(RANGE, format!("bytes={resume_from}-"));
    }

    let response = request.send().await.context("envoi de la requête")?;
    let status = response.status();

    let resumed = status == StatusCode::PARTIAL_CONTENT && resume_from > 0;
    if !status.is_success() {
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            bail!(TransientError(format!("HTTP {status}")));
        }
        bail!("HTTP {status} for {}", job.url);
    }

    // Extension corrigée d'après le type réel avant d'écrire quoi que ce soit
    let dest = corrected_destination(&job.dest, response.headers().get(CONTENT_TYPE));
    if options.skip_existing && dest != job.dest && file_present(&dest).await {
        return Ok(DownloadOutcome::Skipped(dest));
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(resumed)
        .truncate(!resumed)
        .write(true)
        .open(&part_path)
        .await
        .with_context(|| format!("ouverture de {}", part_path.display()))?;

    let mut stream = response.bytes_stream();
    // Un 200 sur une demande de reprise repart de zéro
    let mut written = if resumed { resume_from } else { 0 };
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| {
            if e.is_timeout() {
                anyhow!(TransientError(format!("flux interrompu: {e}")))
            } else {
                anyhow!("flux interrompu: {e}")
            }
        })?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    drop(file);

    if written == 0 {
        let _ = fs::remove_file(&part_path).await;
        bail!(TransientError("réponse vide".to_string()));
    }

    fs::rename(&part_path, &dest)
        .await
        .with_context(|| format!("renommage vers {}", dest.display()))?;
    info!("écrit {} ({written} octets)", dest.display());
    Ok(DownloadOutcome::Downloaded(dest))
}

/// Erreur passagère qui justifie une nouvelle tentative.
#[derive(Debug)]
struct TransientError(String);

impl std::fmt::Display for TransientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for TransientError {}

fn is_transient(e: &anyhow::Error) -> bool {
    if e.downcast_ref::<TransientError>().is_some() {
        return true;
    }
    match e.downcast_ref::<reqwest::Error>() {
        Some(re) => re.is_timeout() || re.is_connect(),
        None => false,
    }
}

/// Délai exponentiel avec une part d'aléa tirée de l'horloge.
fn retry_delay(attempt: u32) -> Duration {
    let base = RETRY_BASE_DELAY * 2u32.saturating_pow(attempt.saturating_sub(1));
    let jitter_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_millis() % 500)
        .unwrap_or(0);
    base + Duration::from_millis(u64::from(jitter_ms))
}

async fn file_present(path: &Path) -> bool {
    matches!(fs::metadata(path).await, Ok(meta) if meta.len() > 0)
}

/// Nom du fichier temporaire: extension d'origine suffixée de `.part`.
fn part_extension(dest: &Path) -> String {
    match dest.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{ext}.part"),
        None => "part".to_string(),
    }
}

/// Corrige l'extension de destination d'après le `Content-Type` de la réponse.
fn corrected_destination(
    dest: &Path,
    content_type: Option<&reqwest::header::HeaderValue>,
) -> PathBuf {
    let Some(mime) = content_type.and_then(|v| v.to_str().ok()) else {
        return dest.to_path_buf();
    };
    let mime = mime.split(';').next().unwrap_or("").trim();
    let expected = match mime {
        "video/mp4" => Some("mp4"),
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "audio/mpeg" => Some("mp3"),
        "audio/mp4" => Some("m4a"),
        _ => None,
    };
    match expected {
        Some(ext) if dest.extension().and_then(|e| e.to_str()) != Some(ext) => {
            dest.with_extension(ext)
        }
        _ => dest.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::service::{make_service_fn, service_fn};
    use hyper::{Body, Response, Server};
    use std::convert::Infallible;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn serve_bytes(body: &'static [u8], content_type: &'static str) -> SocketAddr {
        let make_svc = make_service_fn(move |_| async move {
            Ok::<_, Infallible>(service_fn(move |_req| async move {
                Ok::<_, Infallible>(
                    Response::builder()
                        .header("content-type", content_type)
                        .body(Body::from(body))
                        .unwrap(),
                )
            }))
        });
        let server = Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0))).serve(make_svc);
        let addr = server.local_addr();
        tokio::spawn(server);
        addr
    }

    fn job(url: String, dest: PathBuf) -> DownloadJob {
        DownloadJob {
            post_id: "p1".to_string(),
            url,
            dest,
        }
    }

    #[tokio::test]
    async fn test_downloads_to_destination() {
        let addr = serve_bytes(b"hello media", "video/mp4");
        let dir = tempdir().unwrap();
        let dest = dir.path().join("clip.mp4");

        let client = build_media_client(None).unwrap();
        let outcome = download_file(
            &client,
            &job(format!("http://{addr}/v.mp4"), dest.clone()),
            &FetchOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(outcome, DownloadOutcome::Downloaded(dest.clone()));
        assert_eq!(std::fs::read(&dest).unwrap(), b"hello media");
        assert!(!dest.with_extension("mp4.part").exists());
    }

    #[tokio::test]
    async fn test_skips_existing_file() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("clip.mp4");
        std::fs::write(&dest, b"already here").unwrap();

        let client = build_media_client(None).unwrap();
        let outcome = download_file(
            &client,
            &job("http://127.0.0.1:1/v.mp4".to_string(), dest.clone()),
            &FetchOptions::default(),
        )
        .await
        .unwrap();

        // Jamais de requête: le serveur n'existe pas
        assert_eq!(outcome, DownloadOutcome::Skipped(dest));
    }

    #[tokio::test]
    async fn test_corrects_extension_from_content_type() {
        let addr = serve_bytes(b"\x89PNG", "image/png");
        let dir = tempdir().unwrap();
        let dest = dir.path().join("photo.jpg");

        let client = build_media_client(None).unwrap();
        let outcome = download_file(
            &client,
            &job(format!("http://{addr}/p"), dest.clone()),
            &FetchOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.path(), &dir.path().join("photo.png"));
        assert!(dir.path().join("photo.png").exists());
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_retries_on_server_error() {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_svc = hits.clone();
        let make_svc = make_service_fn(move |_| {
            let hits = hits_svc.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |_req| {
                    let hits = hits.clone();
                    async move {
                        let n = hits.fetch_add(1, Ordering::SeqCst);
                        let resp = if n == 0 {
                            Response::builder()
                                .status(503)
                                .body(Body::empty())
                                .unwrap()
                        } else {
                            Response::builder()
                                .header("content-type", "video/mp4")
                                .body(Body::from("ok after retry"))
                                .unwrap()
                        };
                        Ok::<_, Infallible>(resp)
                    }
                }))
            }
        });
        let server = Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0))).serve(make_svc);
        let addr = server.local_addr();
        tokio::spawn(server);

        let dir = tempdir().unwrap();
        let dest = dir.path().join("clip.mp4");
        let client = build_media_client(None).unwrap();
        let outcome = download_file(
            &client,
            &job(format!("http://{addr}/v.mp4"), dest.clone()),
            &FetchOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(outcome, DownloadOutcome::Downloaded(dest.clone()));
        assert!(hits.load(Ordering::SeqCst) >= 2);
        assert_eq!(std::fs::read(&dest).unwrap(), b"ok after retry");
    }

    #[tokio::test]
    async fn test_client_error_fails_without_retry() {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_svc = hits.clone();
        let make_svc = make_service_fn(move |_| {
            let hits = hits_svc.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |_req| {
                    let hits = hits.clone();
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, Infallible>(
                            Response::builder()
                                .status(404)
                                .body(Body::empty())
                                .unwrap(),
                        )
                    }
                }))
            }
        });
        let server = Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0))).serve(make_svc);
        let addr = server.local_addr();
        tokio::spawn(server);

        let dir = tempdir().unwrap();
        let client = build_media_client(None).unwrap();
        let err = download_file(
            &client,
            &job(format!("http://{addr}/gone"), dir.path().join("x.mp4")),
            &FetchOptions::default(),
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("404"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_resumes_from_existing_part_file() {
        let make_svc = make_service_fn(|_| async {
            Ok::<_, Infallible>(service_fn(|req: hyper::Request<Body>| async move {
                let range = req
                    .headers()
                    .get("range")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                // La reprise demande la suite du fragment déjà écrit
                assert_eq!(range.as_deref(), Some("bytes=6-"));
                Ok::<_, Infallible>(
                    Response::builder()
                        .status(206)
                        .header("content-type", "video/mp4")
                        .body(Body::from(" world"))
                        .unwrap(),
                )
            }))
        });
        let server = Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0))).serve(make_svc);
        let addr = server.local_addr();
        tokio::spawn(server);

        let dir = tempdir().unwrap();
        let dest = dir.path().join("clip.mp4");
        std::fs::write(dest.with_extension("mp4.part"), b"hello,").unwrap();

        let client = build_media_client(None).unwrap();
        let outcome = download_file(
            &client,
            &job(format!("http://{addr}/v.mp4"), dest.clone()),
            &FetchOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(outcome, DownloadOutcome::Downloaded(dest.clone()));
        assert_eq!(std::fs::read(&dest).unwrap(), b"hello, world");
    }

    #[test]
    fn test_part_extension() {
        assert_eq!(part_extension(Path::new("a/b.mp4")), "mp4.part");
        assert_eq!(part_extension(Path::new("a/b")), "part");
    }
}
