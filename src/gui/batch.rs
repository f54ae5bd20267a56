//! Composant UI pour le téléchargement par lots.
//!
//! Permet de:
//! - Coller un texte libre contenant des liens de partage
//! - Voir le nombre de liens détectés avant de lancer
//! - Suivre l'état de chaque lien et le bilan final

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use egui::{Color32, Context, Frame, RichText, Rounding, ScrollArea, Stroke, Ui};
use tokio::sync::mpsc;

use crate::config::{Config, MAX_CONCURRENT_DOWNLOADS, MIN_CONCURRENT_DOWNLOADS};
use crate::downloader::{BatchEvent, BatchRunner};
use crate::locales::Translator;
use crate::utils::extract_urls;

/// Statut d'un lien du lot.
#[derive(Clone, PartialEq)]
enum LinkStatus {
    Pending,
    Resolving,
    Downloading,
    Done,
    Failed(String),
}

impl LinkStatus {
    fn color(&self) -> Color32 {
        match self {
            LinkStatus::Pending => Color32::from_gray(150),
            LinkStatus::Resolving | LinkStatus::Downloading => Color32::YELLOW,
            LinkStatus::Done => Color32::from_rgb(100, 255, 100),
            LinkStatus::Failed(_) => Color32::from_rgb(255, 100, 100),
        }
    }
}

/// Onglet de téléchargement par lots
pub struct BatchTab {
    input_text: String,
    links: Vec<String>,
    statuses: HashMap<String, LinkStatus>,
    is_running: bool,
    cancel: Option<Arc<AtomicBool>>,
    summary: Option<String>,
    events_rx: mpsc::UnboundedReceiver<BatchEvent>,
    events_tx: mpsc::UnboundedSender<BatchEvent>,
    ctx: Option<Context>,
}

impl Default for BatchTab {
    fn default() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            input_text: String::new(),
            links: Vec::new(),
            statuses: HashMap::new(),
            is_running: false,
            cancel: None,
            summary: None,
            events_rx: rx,
            events_tx: tx,
            ctx: None,
        }
    }
}

impl BatchTab {
    pub fn set_context(&mut self, ctx: Context) {
        self.ctx = Some(ctx);
    }

    fn process_events(&mut self, tr: &Translator) {
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                BatchEvent::Resolving { id } => {
                    self.statuses.insert(id, LinkStatus::Resolving);
                }
                BatchEvent::Fetching { id, .. } => {
                    self.statuses.insert(id, LinkStatus::Downloading);
                }
                BatchEvent::Done { id, .. } => {
                    self.statuses.insert(id, LinkStatus::Done);
                }
                BatchEvent::Failed { id, message } => {
                    self.statuses.insert(id, LinkStatus::Failed(message));
                }
                BatchEvent::Finished { report } => {
                    self.is_running = false;
                    self.cancel = None;
                    self.summary = Some(
                        tr.t("batch.summary")
                            .replace("{ok}", &report.ok.to_string())
                            .replace("{failed}", &report.failed.to_string()),
                    );
                }
            }
        }
    }

    pub fn show(&mut self, ui: &mut Ui, config: &mut Config, tr: &Translator) {
        self.process_events(tr);

        // Les liens affichés suivent le texte en continu, hors exécution
        if !self.is_running {
            self.links = extract_urls(&self.input_text);
        }

        ui.vertical(|ui| {
            ui.heading(format!("📦 {}", tr.t("tab.batch")));
            ui.separator();

            Frame::group(ui.style())
                .rounding(Rounding::same(8.0))
                .stroke(Stroke::new(1.0, Color32::from_rgb(60, 60, 70)))
                .show(ui, |ui| {
                    ui.set_min_width(ui.available_width());
                    ui.label(RichText::new(tr.t("batch.input_label")).strong());
                    ui.add(
                        egui::TextEdit::multiline(&mut self.input_text)
                            .desired_rows(6)
                            .desired_width(f32::INFINITY),
                    );

                    ui.add_space(4.0);

                    ui.horizontal(|ui| {
                        ui.label(
                            RichText::new(
                                tr.t("batch.links_detected")
                                    .replace("{count}", &self.links.len().to_string()),
                            )
                            .color(Color32::GRAY),
                        );
                        ui.separator();
                        ui.label(tr.t("batch.concurrency"));
                        ui.add(egui::Slider::new(
                            &mut config.concurrent_downloads,
                            MIN_CONCURRENT_DOWNLOADS..=MAX_CONCURRENT_DOWNLOADS,
                        ));

                        let can_start = !self.links.is_empty() && !self.is_running;
                        if ui
                            .add_enabled(can_start, egui::Button::new(tr.t("batch.start")))
                            .clicked()
                        {
                            self.start_batch(config);
                        }
                        if self.is_running {
                            ui.spinner();
                            ui.label(RichText::new(tr.t("batch.running")).color(Color32::YELLOW));
                            if let Some(cancel) = &self.cancel {
                                if !cancel.load(Ordering::Relaxed)
                                    && ui.button(tr.t("batch.cancel")).clicked()
                                {
                                    cancel.store(true, Ordering::Relaxed);
                                }
                            }
                        }
                        if let Some(summary) = &self.summary {
                            ui.label(
                                RichText::new(summary).color(Color32::from_rgb(100, 255, 100)),
                            );
                        }
                    });
                });

            ui.add_space(8.0);

            ScrollArea::vertical()
                .auto_shrink([false; 2])
                .show(ui, |ui| {
                    for link in &self.links {
                        let status = self
                            .statuses
                            .get(link)
                            .cloned()
                            .unwrap_or(LinkStatus::Pending);
                        Frame::group(ui.style())
                            .rounding(Rounding::same(6.0))
                            .stroke(Stroke::new(1.0, Color32::from_rgb(50, 50, 60)))
                            .inner_margin(egui::Margin::same(8.0))
                            .show(ui, |ui| {
                                ui.horizontal(|ui| {
                                    let text = match &status {
                                        LinkStatus::Pending => tr.t("batch.pending"),
                                        LinkStatus::Resolving => tr.t("batch.resolving"),
                                        LinkStatus::Downloading => tr.t("batch.downloading"),
                                        LinkStatus::Done => tr.t("batch.done"),
                                        LinkStatus::Failed(_) => tr.t("batch.failed"),
                                    };
                                    let label =
                                        ui.label(RichText::new(text).color(status.color()));
                                    if let LinkStatus::Failed(message) = &status {
                                        label.on_hover_text(message);
                                    }
                                    ui.label(
                                        RichText::new(link).small().color(Color32::GRAY),
                                    );
                                });
                            });
                        ui.add_space(4.0);
                    }
                });
        });
    }

    /// Lance le lot en tâche de fond.
    fn start_batch(&mut self, config: &Config) {
        if self.links.is_empty() {
            return;
        }
        self.is_running = true;
        self.summary = None;
        self.statuses = self
            .links
            .iter()
            .map(|link| (link.clone(), LinkStatus::Pending))
            .collect();

        let links = self.links.clone();
        let config = config.clone();
        let tx = self.events_tx.clone();
        let ctx = self.ctx.clone();
        let cancel = Arc::new(AtomicBool::new(false));
        self.cancel = Some(cancel.clone());

        std::thread::spawn(move || {
            let rt = tokio::runtime::Runtime::new().expect("Failed to create runtime");
            rt.block_on(async move {
                match BatchRunner::from_config(&config) {
                    Ok(mut runner) => {
                        runner.set_cancel_flag(cancel);
                        let (batch_tx, mut batch_rx) = mpsc::unbounded_channel();
                        let forward = {
                            let tx = tx.clone();
                            let ctx = ctx.clone();
                            tokio::spawn(async move {
                                while let Some(event) = batch_rx.recv().await {
                                    let _ = tx.send(event);
                                    if let Some(ctx) = &ctx {
                                        ctx.request_repaint();
                                    }
                                }
                            })
                        };
                        let _ = runner.run_urls(links, batch_tx).await;
                        let _ = forward.await;
                    }
                    Err(e) => {
                        // Le lot n'a jamais démarré, chaque lien est en échec
                        for link in &links {
                            let _ = tx.send(BatchEvent::Failed {
                                id: link.clone(),
                                message: e.to_string(),
                            });
                        }
                        let _ = tx.send(BatchEvent::Finished {
                            report: crate::downloader::BatchReport {
                                failed: links.len(),
                                ..Default::default()
                            },
                        });
                    }
                }
                if let Some(ctx) = ctx {
                    ctx.request_repaint();
                }
            });
        });
    }
}
