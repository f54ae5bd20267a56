//! Composant UI pour les publications d'un utilisateur.
//!
//! Permet de:
//! - Résoudre un lien de profil vers son flux de publications
//! - Sélectionner des lignes dans un tableau triable visuellement
//! - Lancer le téléchargement des publications retenues

use std::collections::HashMap;

use egui::{Color32, Context, Frame, RichText, Rounding, Stroke, Ui};
use egui_extras::{Column, TableBuilder};
use tokio::sync::mpsc;
use tracing::error;

use crate::api::{AuthorProfile, Post};
use crate::config::Config;
use crate::downloader::{BatchEvent, BatchRunner};
use crate::locales::Translator;
use crate::utils::format_count;

/// Messages des tâches de fond vers l'onglet.
enum UserEvent {
    Loaded {
        profile: AuthorProfile,
        posts: Vec<Post>,
    },
    Failed(String),
    Progress(BatchEvent),
}

/// Statut d'une ligne pendant un téléchargement.
#[derive(Clone, PartialEq)]
enum RowStatus {
    Downloading,
    Done,
    Failed(String),
}

/// Onglet utilisateur
pub struct UserTab {
    input_url: String,
    max_videos: usize,
    profile: Option<AuthorProfile>,
    posts: Vec<Post>,
    selected: Vec<bool>,
    row_status: HashMap<String, RowStatus>,
    is_fetching: bool,
    is_downloading: bool,
    summary: Option<String>,
    error: Option<String>,
    events_rx: mpsc::UnboundedReceiver<UserEvent>,
    events_tx: mpsc::UnboundedSender<UserEvent>,
    ctx: Option<Context>,
}

impl Default for UserTab {
    fn default() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            input_url: String::new(),
            max_videos: 20,
            profile: None,
            posts: Vec::new(),
            selected: Vec::new(),
            row_status: HashMap::new(),
            is_fetching: false,
            is_downloading: false,
            summary: None,
            error: None,
            events_rx: rx,
            events_tx: tx,
            ctx: None,
        }
    }
}

impl UserTab {
    pub fn set_context(&mut self, ctx: Context) {
        self.ctx = Some(ctx);
    }

    fn process_events(&mut self, tr: &Translator) {
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                UserEvent::Loaded { profile, posts } => {
                    self.selected = vec![true; posts.len()];
                    self.profile = Some(profile);
                    self.posts = posts;
                    self.row_status.clear();
                    self.is_fetching = false;
                    self.error = None;
                }
                UserEvent::Failed(message) => {
                    self.is_fetching = false;
                    self.is_downloading = false;
                    self.error = Some(message);
                }
                UserEvent::Progress(event) => match event {
                    BatchEvent::Resolving { id } | BatchEvent::Fetching { id, .. } => {
                        self.row_status.insert(id, RowStatus::Downloading);
                    }
                    BatchEvent::Done { id, .. } => {
                        self.row_status.insert(id, RowStatus::Done);
                    }
                    BatchEvent::Failed { id, message } => {
                        self.row_status.insert(id, RowStatus::Failed(message));
                    }
                    BatchEvent::Finished { report } => {
                        self.is_downloading = false;
                        self.summary = Some(
                            tr.t("batch.summary")
                                .replace("{ok}", &report.ok.to_string())
                                .replace("{failed}", &report.failed.to_string()),
                        );
                    }
                },
            }
        }
    }

    pub fn show(&mut self, ui: &mut Ui, config: &Config, tr: &Translator) {
        self.process_events(tr);

        ui.vertical(|ui| {
            ui.heading(format!("👤 {}", tr.t("tab.user")));
            ui.separator();

            Frame::group(ui.style())
                .rounding(Rounding::same(8.0))
                .stroke(Stroke::new(1.0, Color32::from_rgb(60, 60, 70)))
                .show(ui, |ui| {
                    ui.set_min_width(ui.available_width());
                    ui.horizontal(|ui| {
                        ui.label(RichText::new(tr.t("user.input_label")).strong());
                        ui.add(
                            egui::TextEdit::singleline(&mut self.input_url)
                                .hint_text(tr.t("user.input_hint"))
                                .desired_width(f32::INFINITY),
                        );
                    });

                    ui.add_space(4.0);

                    ui.horizontal(|ui| {
                        ui.label(tr.t("user.max_videos"));
                        ui.add(egui::Slider::new(&mut self.max_videos, 1..=200));

                        let can_fetch = !self.input_url.trim().is_empty()
                            && !self.is_fetching
                            && !self.is_downloading;
                        if ui
                            .add_enabled(can_fetch, egui::Button::new(tr.t("user.fetch")))
                            .clicked()
                        {
                            self.start_fetch(config);
                        }
                        if self.is_fetching {
                            ui.spinner();
                            ui.label(RichText::new(tr.t("user.fetching")).color(Color32::YELLOW));
                        }
                    });
                });

            if let Some(message) = &self.error {
                ui.add_space(4.0);
                ui.label(
                    RichText::new(format!("{}: {message}", tr.t("common.error")))
                        .color(Color32::from_rgb(255, 100, 100)),
                );
            }

            if let Some(profile) = self.profile.clone() {
                ui.add_space(8.0);
                self.render_profile_card(ui, &profile, tr);
            }

            if !self.posts.is_empty() {
                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    if ui.button(tr.t("user.select_all")).clicked() {
                        self.selected.iter_mut().for_each(|s| *s = true);
                    }
                    if ui.button(tr.t("user.select_none")).clicked() {
                        self.selected.iter_mut().for_each(|s| *s = false);
                    }

                    let selected_count = self.selected.iter().filter(|s| **s).count();
                    let can_download = selected_count > 0 && !self.is_downloading;
                    if ui
                        .add_enabled(
                            can_download,
                            egui::Button::new(format!(
                                "{} ({selected_count})",
                                tr.t("user.download_selected")
                            )),
                        )
                        .clicked()
                    {
                        self.start_download(config);
                    }
                    if self.is_downloading {
                        ui.spinner();
                    }
                    if let Some(summary) = &self.summary {
                        ui.label(RichText::new(summary).color(Color32::from_rgb(100, 255, 100)));
                    }
                });

                ui.add_space(4.0);
                self.render_table(ui, tr);
            }
        });
    }

    fn render_profile_card(&self, ui: &mut Ui, profile: &AuthorProfile, tr: &Translator) {
        Frame::group(ui.style())
            .rounding(Rounding::same(6.0))
            .stroke(Stroke::new(1.0, Color32::from_rgb(50, 50, 60)))
            .inner_margin(egui::Margin::same(12.0))
            .show(ui, |ui| {
                ui.label(RichText::new(&profile.nickname).strong().size(16.0));
                if !profile.signature.is_empty() {
                    ui.label(RichText::new(&profile.signature).small().color(Color32::GRAY));
                }
                ui.horizontal(|ui| {
                    ui.label(format!(
                        "{}: {}",
                        tr.t("user.followers"),
                        format_count(profile.follower_count)
                    ));
                    ui.separator();
                    ui.label(format!(
                        "{}: {}",
                        tr.t("user.posts"),
                        format_count(profile.aweme_count)
                    ));
                    ui.separator();
                    ui.label(format!(
                        "{}: {}",
                        tr.t("user.favorited"),
                        format_count(profile.total_favorited)
                    ));
                });
            });
    }

    fn render_table(&mut self, ui: &mut Ui, tr: &Translator) {
        TableBuilder::new(ui)
            .striped(true)
            .column(Column::exact(24.0))
            .column(Column::remainder().at_least(200.0))
            .column(Column::auto())
            .column(Column::auto())
            .column(Column::auto())
            .column(Column::auto())
            .header(20.0, |mut header| {
                header.col(|_| {});
                header.col(|ui| {
                    ui.strong(tr.t("user.column_desc"));
                });
                header.col(|ui| {
                    ui.strong(tr.t("user.column_kind"));
                });
                header.col(|ui| {
                    ui.strong(tr.t("user.column_date"));
                });
                header.col(|ui| {
                    ui.strong(tr.t("user.column_likes"));
                });
                header.col(|_| {});
            })
            .body(|mut body| {
                for (i, post) in self.posts.iter().enumerate() {
                    body.row(22.0, |mut row| {
                        row.col(|ui| {
                            if let Some(selected) = self.selected.get_mut(i) {
                                ui.checkbox(selected, "");
                            }
                        });
                        row.col(|ui| {
                            let desc = if post.desc.is_empty() {
                                post.id.as_str()
                            } else {
                                post.desc.as_str()
                            };
                            ui.label(desc);
                        });
                        row.col(|ui| {
                            ui.label(post.media_kind.label());
                        });
                        row.col(|ui| {
                            // Date seule, l'heure n'apporte rien ici
                            let date = post.create_time.split('T').next().unwrap_or("");
                            ui.label(date);
                        });
                        row.col(|ui| {
                            ui.label(format_count(post.like_count));
                        });
                        row.col(|ui| match self.row_status.get(&post.id) {
                            Some(RowStatus::Downloading) => {
                                ui.label(
                                    RichText::new(tr.t("batch.downloading"))
                                        .color(Color32::YELLOW),
                                );
                            }
                            Some(RowStatus::Done) => {
                                ui.label(
                                    RichText::new(tr.t("batch.done"))
                                        .color(Color32::from_rgb(100, 255, 100)),
                                );
                            }
                            Some(RowStatus::Failed(message)) => {
                                ui.label(
                                    RichText::new(tr.t("batch.failed"))
                                        .color(Color32::from_rgb(255, 100, 100)),
                                )
                                .on_hover_text(message);
                            }
                            None => {}
                        });
                    });
                }
            });
    }

    /// Résout le profil et son flux en tâche de fond.
    fn start_fetch(&mut self, config: &Config) {
        self.is_fetching = true;
        self.summary = None;
        self.error = None;

        let url = self.input_url.trim().to_string();
        let max_videos = self.max_videos;
        let config = config.clone();
        let tx = self.events_tx.clone();
        let ctx = self.ctx.clone();

        std::thread::spawn(move || {
            let rt = tokio::runtime::Runtime::new().expect("Failed to create runtime");
            rt.block_on(async move {
                let result = async {
                    let runner = BatchRunner::from_config(&config)?;
                    let (profile, posts) = runner.api().fetch_user(&url, max_videos).await?;
                    Ok::<_, anyhow::Error>((profile, posts))
                }
                .await;
                match result {
                    Ok((profile, posts)) => {
                        let _ = tx.send(UserEvent::Loaded { profile, posts });
                    }
                    Err(e) => {
                        error!("résolution du profil échouée: {e:#}");
                        let _ = tx.send(UserEvent::Failed(e.to_string()));
                    }
                }
                if let Some(ctx) = ctx {
                    ctx.request_repaint();
                }
            });
        });
    }

    /// Télécharge les publications cochées en tâche de fond.
    fn start_download(&mut self, config: &Config) {
        let posts: Vec<Post> = self
            .posts
            .iter()
            .zip(&self.selected)
            .filter(|(_, selected)| **selected)
            .map(|(post, _)| post.clone())
            .collect();
        if posts.is_empty() {
            return;
        }

        self.is_downloading = true;
        self.summary = None;
        self.row_status.clear();

        let config = config.clone();
        let tx = self.events_tx.clone();
        let ctx = self.ctx.clone();

        std::thread::spawn(move || {
            let rt = tokio::runtime::Runtime::new().expect("Failed to create runtime");
            rt.block_on(async move {
                match BatchRunner::from_config(&config) {
                    Ok(runner) => {
                        let (batch_tx, mut batch_rx) = mpsc::unbounded_channel();
                        let forward = {
                            let tx = tx.clone();
                            let ctx = ctx.clone();
                            tokio::spawn(async move {
                                while let Some(event) = batch_rx.recv().await {
                                    let _ = tx.send(UserEvent::Progress(event));
                                    if let Some(ctx) = &ctx {
                                        ctx.request_repaint();
                                    }
                                }
                            })
                        };
                        let _ = runner.run_posts(posts, batch_tx).await;
                        let _ = forward.await;
                    }
                    Err(e) => {
                        let _ = tx.send(UserEvent::Failed(e.to_string()));
                    }
                }
                if let Some(ctx) = ctx {
                    ctx.request_repaint();
                }
            });
        });
    }
}
