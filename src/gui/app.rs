//! État principal de l'application et gestion de la boucle principale egui.
//!
//! Ce module gère:
//! - L'état global (configuration, traducteur, onglet courant)
//! - La navigation entre les onglets
//! - L'application du thème choisi dans les paramètres

use egui::{CentralPanel, Color32, Context, TopBottomPanel, Visuals};

use crate::config::{Config, ThemeSetting};
use crate::gui::batch::BatchTab;
use crate::gui::settings::SettingsTab;
use crate::gui::user::UserTab;
use crate::gui::video::VideoTab;
use crate::locales::Translator;

/// État principal de l'application
pub struct DownloaderApp {
    config: Config,
    translator: Translator,
    current_tab: Tab,
    video_tab: VideoTab,
    user_tab: UserTab,
    batch_tab: BatchTab,
    settings_tab: SettingsTab,
}

/// Onglets disponibles dans l'interface
#[derive(Clone, Copy, PartialEq, Eq)]
enum Tab {
    Video,
    User,
    Batch,
    Settings,
}

impl Tab {
    fn title(&self, tr: &Translator) -> String {
        match self {
            Tab::Video => format!("🎬 {}", tr.t("tab.video")),
            Tab::User => format!("👤 {}", tr.t("tab.user")),
            Tab::Batch => format!("📦 {}", tr.t("tab.batch")),
            Tab::Settings => format!("⚙️ {}", tr.t("tab.settings")),
        }
    }
}

impl DownloaderApp {
    pub fn new(config: Config) -> Self {
        let mut translator = Translator::new(&config.language);
        // Un dossier locales/ à côté du binaire complète les langues embarquées
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                translator.load_overrides(&dir.join("locales"));
            }
        }
        // La clé manquante oriente directement vers les paramètres
        let current_tab = if config.has_plausible_key() {
            Tab::Video
        } else {
            Tab::Settings
        };
        Self {
            config,
            translator,
            current_tab,
            video_tab: VideoTab::default(),
            user_tab: UserTab::default(),
            batch_tab: BatchTab::default(),
            settings_tab: SettingsTab::default(),
        }
    }
}

impl eframe::App for DownloaderApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        self.configure_style(ctx);

        // Contexte partagé pour les repaints depuis les tâches de fond
        self.video_tab.set_context(ctx.clone());
        self.user_tab.set_context(ctx.clone());
        self.batch_tab.set_context(ctx.clone());
        self.settings_tab.set_context(ctx.clone());

        TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading(self.translator.t("app.title"));
                ui.separator();

                for tab in [Tab::Video, Tab::User, Tab::Batch, Tab::Settings] {
                    ui.selectable_value(
                        &mut self.current_tab,
                        tab,
                        tab.title(&self.translator),
                    );
                }
            });
        });

        CentralPanel::default().show(ctx, |ui| match self.current_tab {
            Tab::Video => self.video_tab.show(ui, &self.config, &self.translator),
            Tab::User => self.user_tab.show(ui, &self.config, &self.translator),
            Tab::Batch => self.batch_tab.show(ui, &mut self.config, &self.translator),
            Tab::Settings => {
                self.settings_tab
                    .show(ui, &mut self.config, &mut self.translator)
            }
        });
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.config.save();
    }
}

impl DownloaderApp {
    /// Applique le thème configuré et quelques ajustements de style.
    fn configure_style(&self, ctx: &Context) {
        let mut style = (*ctx.style()).clone();

        match self.config.theme {
            ThemeSetting::Light => style.visuals = Visuals::light(),
            ThemeSetting::Dark | ThemeSetting::System => {
                style.visuals = Visuals::dark();
                style.visuals.override_text_color = Some(Color32::from_gray(240));
                style.visuals.window_fill = Color32::from_rgb(20, 20, 25);
                style.visuals.panel_fill = Color32::from_rgb(25, 25, 30);
                style.visuals.faint_bg_color = Color32::from_rgb(30, 30, 35);
                style.visuals.extreme_bg_color = Color32::from_rgb(15, 15, 20);
                style.visuals.selection.bg_fill = Color32::from_rgb(100, 150, 255);
                style.visuals.hyperlink_color = Color32::from_rgb(100, 200, 255);
            }
        }

        style.spacing.item_spacing = egui::vec2(8.0, 6.0);
        style.spacing.window_margin = egui::Margin::same(10.0);
        style.spacing.button_padding = egui::vec2(12.0, 6.0);

        style.text_styles.insert(
            egui::TextStyle::Heading,
            egui::FontId::new(22.0, egui::FontFamily::Proportional),
        );
        style.text_styles.insert(
            egui::TextStyle::Body,
            egui::FontId::new(14.0, egui::FontFamily::Proportional),
        );

        ctx.set_style(style);
    }
}
