//! Module d'interface graphique utilisateur avec egui.
//!
//! Ce module fournit une interface en quatre onglets pour:
//! - Récupérer et télécharger une vidéo unique sans filigrane
//! - Parcourir et télécharger les publications d'un utilisateur
//! - Lancer un lot de liens avec suivi individuel
//! - Gérer la clé API, le dossier de destination, le thème et la langue
//!
//! Architecture:
//! - `app.rs`: état principal, navigation et thème
//! - `video.rs`: onglet vidéo unique
//! - `user.rs`: onglet publications d'un utilisateur
//! - `batch.rs`: onglet téléchargement par lots
//! - `settings.rs`: onglet paramètres

mod app;
mod batch;
mod settings;
mod user;
mod video;

pub use app::DownloaderApp;
