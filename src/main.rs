//! Point d'entrée de l'application.
//!
//! Étapes:
//! 1. Initialiser le journal (console + fichier `app.log`).
//! 2. Charger la configuration `config.json` (créée au premier lancement).
//! 3. Démarrer la boucle egui avec l'état de l'application.
mod api;
mod config;
mod downloader;
mod gui;
mod locales;
mod utils;

use std::sync::Mutex;

use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::gui::DownloaderApp;

const LOG_FILE: &str = "app.log";

/// Journal vers la console et, si possible, vers `app.log`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console = tracing_subscriber::fmt::layer();

    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(LOG_FILE)
    {
        Ok(file) => {
            let file_layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .with(file_layer)
                .init();
        }
        Err(e) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .init();
            tracing::warn!("fichier journal {LOG_FILE} indisponible: {e}");
        }
    }
}

fn main() -> eframe::Result<()> {
    init_tracing();

    let config = Config::load();
    info!(
        "démarrage, dossier de téléchargement: {}",
        config.download_path.display()
    );

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([980.0, 700.0])
            .with_min_inner_size([720.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "TikHub Downloader",
        options,
        Box::new(move |_cc| Ok(Box::new(DownloaderApp::new(config)))),
    )
}
