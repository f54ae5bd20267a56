//! Composant UI des paramètres.
//!
//! Regroupe:
//! - La clé API TikHub avec un test en direct (compte + quota journalier)
//! - Le dossier de téléchargement et les options de nommage
//! - Le thème et la langue de l'interface

use egui::{Color32, Context, Frame, RichText, Rounding, ScrollArea, Stroke, Ui};
use tokio::sync::mpsc;
use tracing::error;

use crate::api::{AccountInfo, ApiClient, DailyUsage};
use crate::config::{Config, ThemeSetting, MAX_CONCURRENT_DOWNLOADS, MIN_CONCURRENT_DOWNLOADS};
use crate::locales::Translator;

const GET_KEY_URL: &str = "https://user.tikhub.io/users/api_keys";
const TIKHUB_SITE_URL: &str = "https://tikhub.io";

/// Messages du test de clé en tâche de fond.
enum SettingsEvent {
    KeyOk {
        info: AccountInfo,
        usage: Option<DailyUsage>,
    },
    KeyError(String),
}

/// État du test de clé.
#[derive(Clone, PartialEq)]
enum KeyCheck {
    Idle,
    Checking,
    Valid {
        email: String,
        balance: f64,
        quota: Option<(i64, i64, i64)>,
    },
    Invalid(String),
}

/// Onglet des paramètres
pub struct SettingsTab {
    show_key: bool,
    key_check: KeyCheck,
    saved_flash: bool,
    events_rx: mpsc::UnboundedReceiver<SettingsEvent>,
    events_tx: mpsc::UnboundedSender<SettingsEvent>,
    ctx: Option<Context>,
}

impl Default for SettingsTab {
    fn default() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            show_key: false,
            key_check: KeyCheck::Idle,
            saved_flash: false,
            events_rx: rx,
            events_tx: tx,
            ctx: None,
        }
    }
}

impl SettingsTab {
    pub fn set_context(&mut self, ctx: Context) {
        self.ctx = Some(ctx);
    }

    fn process_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                SettingsEvent::KeyOk { info, usage } => {
                    self.key_check = KeyCheck::Valid {
                        email: info.email,
                        balance: info.balance,
                        quota: usage.map(|u| (u.used_today, u.daily_limit, u.remaining)),
                    };
                }
                SettingsEvent::KeyError(message) => {
                    self.key_check = KeyCheck::Invalid(message);
                }
            }
        }
    }

    pub fn show(&mut self, ui: &mut Ui, config: &mut Config, tr: &mut Translator) {
        self.process_events();

        ScrollArea::vertical()
            .auto_shrink([false; 2])
            .show(ui, |ui| {
                ui.heading(format!("⚙️ {}", tr.t("tab.settings")));
                ui.separator();

                self.api_section(ui, config, tr);
                ui.add_space(12.0);
                self.download_section(ui, config, tr);
                ui.add_space(12.0);
                self.interface_section(ui, config, tr);
                ui.add_space(12.0);
                self.about_section(ui, tr);

                ui.add_space(16.0);
                ui.horizontal(|ui| {
                    if ui.button(RichText::new(tr.t("settings.save")).size(14.0)).clicked() {
                        config.save();
                        tr.set_language(&config.language);
                        self.saved_flash = true;
                    }
                    if self.saved_flash {
                        ui.label(
                            RichText::new(tr.t("settings.saved"))
                                .color(Color32::from_rgb(100, 255, 100)),
                        );
                    }
                });
            });
    }

    fn api_section(&mut self, ui: &mut Ui, config: &mut Config, tr: &Translator) {
        Frame::group(ui.style())
            .rounding(Rounding::same(8.0))
            .stroke(Stroke::new(1.0, Color32::from_rgb(60, 60, 70)))
            .show(ui, |ui| {
                ui.set_min_width(ui.available_width());
                ui.heading(tr.t("settings.api_section"));
                ui.add_space(8.0);

                ui.horizontal(|ui| {
                    ui.label(RichText::new(tr.t("settings.api_key")).strong());
                    ui.add(
                        egui::TextEdit::singleline(&mut config.api_key)
                            .password(!self.show_key)
                            .desired_width(320.0),
                    );
                    if ui
                        .selectable_label(self.show_key, "👁")
                        .clicked()
                    {
                        self.show_key = !self.show_key;
                    }
                    if ui.button(tr.t("settings.test_key")).clicked() {
                        self.start_key_check(config);
                    }
                });

                match &self.key_check {
                    KeyCheck::Idle => {}
                    KeyCheck::Checking => {
                        ui.horizontal(|ui| {
                            ui.spinner();
                            ui.label(
                                RichText::new(tr.t("settings.testing_key"))
                                    .color(Color32::YELLOW),
                            );
                        });
                    }
                    KeyCheck::Valid {
                        email,
                        balance,
                        quota,
                    } => {
                        ui.label(
                            RichText::new(
                                tr.t("settings.key_valid")
                                    .replace("{email}", email)
                                    .replace("{balance}", &format!("{balance:.2}")),
                            )
                            .color(Color32::from_rgb(100, 255, 100)),
                        );
                        if let Some((used, limit, remaining)) = quota {
                            ui.label(
                                RichText::new(
                                    tr.t("settings.quota")
                                        .replace("{used}", &used.to_string())
                                        .replace("{limit}", &limit.to_string())
                                        .replace("{remaining}", &remaining.to_string()),
                                )
                                .color(Color32::GRAY),
                            );
                        }
                    }
                    KeyCheck::Invalid(message) => {
                        ui.label(
                            RichText::new(format!(
                                "{}: {message}",
                                tr.t("settings.key_invalid")
                            ))
                            .color(Color32::from_rgb(255, 100, 100)),
                        );
                    }
                }

                ui.add_space(4.0);

                ui.horizontal(|ui| {
                    ui.label(tr.t("settings.api_base"));
                    ui.add(
                        egui::TextEdit::singleline(&mut config.api_base_url)
                            .desired_width(320.0),
                    );
                });
                ui.horizontal(|ui| {
                    ui.label(tr.t("settings.proxy"));
                    ui.add(
                        egui::TextEdit::singleline(&mut config.proxy).desired_width(320.0),
                    );
                });

                if ui.link(tr.t("settings.get_key")).clicked() {
                    if let Err(e) = webbrowser::open(GET_KEY_URL) {
                        error!("ouverture du navigateur impossible: {e}");
                    }
                }
            });
    }

    fn download_section(&mut self, ui: &mut Ui, config: &mut Config, tr: &Translator) {
        Frame::group(ui.style())
            .rounding(Rounding::same(8.0))
            .stroke(Stroke::new(1.0, Color32::from_rgb(60, 60, 70)))
            .show(ui, |ui| {
                ui.set_min_width(ui.available_width());
                ui.heading(tr.t("settings.download_section"));
                ui.add_space(8.0);

                ui.horizontal(|ui| {
                    ui.label(RichText::new(tr.t("settings.download_path")).strong());
                    ui.label(
                        RichText::new(config.download_path.display().to_string())
                            .color(Color32::GRAY),
                    );
                    if ui.button(tr.t("settings.browse")).clicked() {
                        if let Some(folder) = rfd::FileDialog::new()
                            .set_directory(&config.download_path)
                            .pick_folder()
                        {
                            config.download_path = folder;
                        }
                    }
                });

                ui.checkbox(&mut config.skip_existing, tr.t("settings.skip_existing"));
                ui.checkbox(&mut config.use_description, tr.t("settings.use_description"));

                ui.horizontal(|ui| {
                    ui.label(tr.t("settings.concurrent"));
                    ui.add(egui::Slider::new(
                        &mut config.concurrent_downloads,
                        MIN_CONCURRENT_DOWNLOADS..=MAX_CONCURRENT_DOWNLOADS,
                    ));
                });
            });
    }

    fn interface_section(&mut self, ui: &mut Ui, config: &mut Config, tr: &Translator) {
        Frame::group(ui.style())
            .rounding(Rounding::same(8.0))
            .stroke(Stroke::new(1.0, Color32::from_rgb(60, 60, 70)))
            .show(ui, |ui| {
                ui.set_min_width(ui.available_width());
                ui.heading(tr.t("settings.interface_section"));
                ui.add_space(8.0);

                ui.horizontal(|ui| {
                    ui.label(tr.t("settings.theme"));
                    for theme in [ThemeSetting::Light, ThemeSetting::Dark, ThemeSetting::System] {
                        let label = tr.t(match theme {
                            ThemeSetting::Light => "theme.light",
                            ThemeSetting::Dark => "theme.dark",
                            ThemeSetting::System => "theme.system",
                        });
                        ui.selectable_value(&mut config.theme, theme, label);
                    }
                });

                ui.horizontal(|ui| {
                    ui.label(tr.t("settings.language"));
                    for (code, name) in tr.available_languages() {
                        ui.selectable_value(&mut config.language, code, name);
                    }
                });
            });
    }

    fn about_section(&mut self, ui: &mut Ui, tr: &Translator) {
        Frame::group(ui.style())
            .rounding(Rounding::same(8.0))
            .stroke(Stroke::new(1.0, Color32::from_rgb(60, 60, 70)))
            .show(ui, |ui| {
                ui.set_min_width(ui.available_width());
                ui.heading(tr.t("settings.about_section"));
                ui.add_space(8.0);

                ui.label(
                    tr.t("settings.version")
                        .replace("{version}", env!("CARGO_PKG_VERSION")),
                );
                if ui.link(tr.t("settings.tikhub_site")).clicked() {
                    if let Err(e) = webbrowser::open(TIKHUB_SITE_URL) {
                        error!("ouverture du navigateur impossible: {e}");
                    }
                }
            });
    }

    /// Vérifie la clé saisie contre l'API en tâche de fond.
    fn start_key_check(&mut self, config: &Config) {
        self.key_check = KeyCheck::Checking;

        let base_url = config.api_base_url.clone();
        let api_key = config.api_key.clone();
        let proxy = config.proxy.clone();
        let tx = self.events_tx.clone();
        let ctx = self.ctx.clone();

        std::thread::spawn(move || {
            let rt = tokio::runtime::Runtime::new().expect("Failed to create runtime");
            rt.block_on(async move {
                let result = async {
                    let client = ApiClient::new(&base_url, &api_key, Some(proxy.as_str()))?;
                    let info = client.verify_key().await?;
                    // Le quota est un bonus, son échec n'invalide pas la clé
                    let usage = client.daily_usage().await.ok();
                    Ok::<_, anyhow::Error>((info, usage))
                }
                .await;
                match result {
                    Ok((info, usage)) => {
                        let _ = tx.send(SettingsEvent::KeyOk { info, usage });
                    }
                    Err(e) => {
                        error!("vérification de la clé échouée: {e:#}");
                        let _ = tx.send(SettingsEvent::KeyError(e.to_string()));
                    }
                }
                if let Some(ctx) = ctx {
                    ctx.request_repaint();
                }
            });
        });
    }
}
