//! Composant UI pour la récupération d'une vidéo unique.
//!
//! Permet de:
//! - Coller un lien de partage Douyin ou TikTok
//! - Afficher les métadonnées nettoyées (auteur, statistiques, musique)
//! - Télécharger la vidéo ou l'album sans filigrane

use egui::{Color32, Context, Frame, RichText, Rounding, ScrollArea, Stroke, Ui};
use tokio::sync::mpsc;
use tracing::error;

use crate::api::Post;
use crate::config::Config;
use crate::downloader::{BatchEvent, BatchRunner};
use crate::locales::Translator;
use crate::utils::format_count;

/// Messages envoyés par les tâches de fond vers l'onglet.
enum VideoEvent {
    Resolved(Box<Post>),
    Downloaded(Vec<std::path::PathBuf>),
    Failed(String),
}

/// État d'avancement affiché sous le formulaire.
#[derive(Clone, PartialEq)]
enum VideoStatus {
    Idle,
    Fetching,
    Downloading,
    Done(String),
    Error(String),
}

/// Onglet vidéo unique
pub struct VideoTab {
    input_url: String,
    post: Option<Post>,
    status: VideoStatus,
    events_rx: mpsc::UnboundedReceiver<VideoEvent>,
    events_tx: mpsc::UnboundedSender<VideoEvent>,
    ctx: Option<Context>,
}

impl Default for VideoTab {
    fn default() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            input_url: String::new(),
            post: None,
            status: VideoStatus::Idle,
            events_rx: rx,
            events_tx: tx,
            ctx: None,
        }
    }
}

impl VideoTab {
    pub fn set_context(&mut self, ctx: Context) {
        self.ctx = Some(ctx);
    }

    /// Dépile les messages des tâches de fond.
    fn process_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                VideoEvent::Resolved(post) => {
                    self.post = Some(*post);
                    self.status = VideoStatus::Idle;
                }
                VideoEvent::Downloaded(files) => {
                    let shown = files
                        .first()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default();
                    self.status = VideoStatus::Done(shown);
                }
                VideoEvent::Failed(message) => {
                    self.status = VideoStatus::Error(message);
                }
            }
        }
    }

    pub fn show(&mut self, ui: &mut Ui, config: &Config, tr: &Translator) {
        self.process_events();

        ui.vertical(|ui| {
            ui.heading(format!("🎬 {}", tr.t("tab.video")));
            ui.separator();

            Frame::group(ui.style())
                .rounding(Rounding::same(8.0))
                .stroke(Stroke::new(1.0, Color32::from_rgb(60, 60, 70)))
                .show(ui, |ui| {
                    ui.set_min_width(ui.available_width());
                    ui.horizontal(|ui| {
                        ui.label(RichText::new(tr.t("video.input_label")).strong());
                        ui.add(
                            egui::TextEdit::singleline(&mut self.input_url)
                                .hint_text(tr.t("video.input_hint"))
                                .desired_width(f32::INFINITY),
                        );
                    });

                    ui.add_space(8.0);

                    ui.horizontal(|ui| {
                        let busy = matches!(
                            self.status,
                            VideoStatus::Fetching | VideoStatus::Downloading
                        );
                        let can_fetch = !self.input_url.trim().is_empty() && !busy;
                        if ui
                            .add_enabled(can_fetch, egui::Button::new(tr.t("video.fetch")))
                            .clicked()
                        {
                            self.start_fetch(config);
                        }
                        let can_download = self.post.is_some() && !busy;
                        if ui
                            .add_enabled(can_download, egui::Button::new(tr.t("video.download")))
                            .clicked()
                        {
                            self.start_download(config);
                        }
                        if self.post.is_some() && ui.button(tr.t("video.open_link")).clicked() {
                            if let Some(post) = &self.post {
                                if let Err(e) = webbrowser::open(&post.raw_url) {
                                    error!("ouverture du navigateur impossible: {e}");
                                }
                            }
                        }
                        match &self.status {
                            VideoStatus::Fetching => {
                                ui.spinner();
                                ui.label(
                                    RichText::new(tr.t("video.fetching")).color(Color32::YELLOW),
                                );
                            }
                            VideoStatus::Downloading => {
                                ui.spinner();
                                ui.label(
                                    RichText::new(tr.t("video.downloading"))
                                        .color(Color32::YELLOW),
                                );
                            }
                            VideoStatus::Done(path) => {
                                ui.label(
                                    RichText::new(tr.t("video.done").replace("{path}", path))
                                        .color(Color32::from_rgb(100, 255, 100)),
                                );
                            }
                            VideoStatus::Error(message) => {
                                ui.label(
                                    RichText::new(format!("{}: {message}", tr.t("common.error")))
                                        .color(Color32::from_rgb(255, 100, 100)),
                                );
                            }
                            VideoStatus::Idle => {}
                        }
                    });
                });

            if !config.has_plausible_key() {
                ui.add_space(8.0);
                ui.label(
                    RichText::new(tr.t("common.missing_key_hint"))
                        .color(Color32::from_rgb(255, 200, 100)),
                );
            }

            ui.add_space(12.0);

            if let Some(post) = self.post.clone() {
                ScrollArea::vertical()
                    .auto_shrink([false; 2])
                    .show(ui, |ui| {
                        self.render_post_card(ui, &post, tr);
                    });
            }
        });
    }

    /// Carte des métadonnées d'une publication résolue.
    fn render_post_card(&self, ui: &mut Ui, post: &Post, tr: &Translator) {
        Frame::group(ui.style())
            .rounding(Rounding::same(6.0))
            .stroke(Stroke::new(1.0, Color32::from_rgb(50, 50, 60)))
            .inner_margin(egui::Margin::same(12.0))
            .show(ui, |ui| {
                let title = if post.desc.is_empty() {
                    post.id.clone()
                } else {
                    post.desc.clone()
                };
                ui.label(RichText::new(title).strong().size(16.0));
                ui.add_space(4.0);

                egui::Grid::new("video_meta")
                    .num_columns(2)
                    .spacing([16.0, 4.0])
                    .show(ui, |ui| {
                        ui.label(RichText::new(tr.t("video.author")).color(Color32::GRAY));
                        ui.label(&post.author_name);
                        ui.end_row();

                        ui.label(RichText::new(tr.t("video.kind")).color(Color32::GRAY));
                        ui.label(post.media_kind.label());
                        ui.end_row();

                        ui.label(RichText::new(tr.t("video.created")).color(Color32::GRAY));
                        ui.label(&post.create_time);
                        ui.end_row();

                        if post.duration > 0 {
                            ui.label(RichText::new(tr.t("video.duration")).color(Color32::GRAY));
                            ui.label(format!("{:.1}s", post.duration as f64 / 1000.0));
                            ui.end_row();
                        }

                        if !post.resolution.is_empty() && post.resolution != "0x0" {
                            ui.label(RichText::new(tr.t("video.resolution")).color(Color32::GRAY));
                            ui.label(&post.resolution);
                            ui.end_row();
                        }

                        if !post.data_size.is_empty() {
                            ui.label(RichText::new(tr.t("video.size")).color(Color32::GRAY));
                            ui.label(&post.data_size);
                            ui.end_row();
                        }

                        ui.label(RichText::new(tr.t("video.likes")).color(Color32::GRAY));
                        ui.label(format_count(post.like_count));
                        ui.end_row();

                        ui.label(RichText::new(tr.t("video.comments")).color(Color32::GRAY));
                        ui.label(format_count(post.comment_count));
                        ui.end_row();

                        ui.label(RichText::new(tr.t("video.shares")).color(Color32::GRAY));
                        ui.label(format_count(post.share_count));
                        ui.end_row();

                        if !post.music_title.is_empty() {
                            ui.label(RichText::new(tr.t("video.music")).color(Color32::GRAY));
                            ui.label(format!("{} - {}", post.music_title, post.music_author));
                            ui.end_row();
                        }

                        if !post.tags.is_empty() {
                            ui.label(RichText::new(tr.t("video.tags")).color(Color32::GRAY));
                            ui.label(post.tags.join(", "));
                            ui.end_row();
                        }
                    });
            });
    }

    /// Résout le lien en tâche de fond.
    fn start_fetch(&mut self, config: &Config) {
        self.status = VideoStatus::Fetching;
        self.post = None;

        let url = self.input_url.trim().to_string();
        let config = config.clone();
        let tx = self.events_tx.clone();
        let ctx = self.ctx.clone();

        std::thread::spawn(move || {
            let rt = tokio::runtime::Runtime::new().expect("Failed to create runtime");
            rt.block_on(async move {
                let result = async {
                    let runner = BatchRunner::from_config(&config)?;
                    let post = runner.api().fetch_post(&url).await?;
                    Ok::<_, anyhow::Error>(post)
                }
                .await;
                match result {
                    Ok(post) => {
                        let _ = tx.send(VideoEvent::Resolved(Box::new(post)));
                    }
                    Err(e) => {
                        error!("résolution échouée: {e:#}");
                        let _ = tx.send(VideoEvent::Failed(e.to_string()));
                    }
                }
                if let Some(ctx) = ctx {
                    ctx.request_repaint();
                }
            });
        });
    }

    /// Télécharge la publication résolue en tâche de fond.
    fn start_download(&mut self, config: &Config) {
        let Some(post) = self.post.clone() else {
            return;
        };
        self.status = VideoStatus::Downloading;

        let config = config.clone();
        let tx = self.events_tx.clone();
        let ctx = self.ctx.clone();

        std::thread::spawn(move || {
            let rt = tokio::runtime::Runtime::new().expect("Failed to create runtime");
            rt.block_on(async move {
                match BatchRunner::from_config(&config) {
                    Ok(runner) => {
                        let (events_tx, _events_rx) = mpsc::unbounded_channel::<BatchEvent>();
                        let report = runner.run_posts(vec![post], events_tx).await;
                        if report.failed == 0 {
                            let _ = tx.send(VideoEvent::Downloaded(report.files));
                        } else {
                            let _ = tx.send(VideoEvent::Failed(
                                "download failed, see app.log".to_string(),
                            ));
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(VideoEvent::Failed(e.to_string()));
                    }
                }
                if let Some(ctx) = ctx {
                    ctx.request_repaint();
                }
            });
        });
    }
}
