//! Configuration persistée de l'application (`config.json`).
//!
//! Comportement:
//! - Chargement: les valeurs du fichier sont fusionnées sur les défauts;
//!   un fichier absent est créé, un fichier corrompu retombe sur les défauts.
//! - Sauvegarde: JSON indenté, écrit en entier à chaque modification.
//! - Premier lancement: la langue système est détectée (`zh*` → chinois,
//!   sinon anglais) et persistée.
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// URL de base par défaut de l'API TikHub.
pub const DEFAULT_API_BASE_URL: &str = "https://api.tikhub.io";

/// Bornes du nombre de téléchargements simultanés.
pub const MIN_CONCURRENT_DOWNLOADS: usize = 1;
pub const MAX_CONCURRENT_DOWNLOADS: usize = 8;

/// Réglage de thème de l'interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThemeSetting {
    Light,
    Dark,
    #[default]
    System,
}

/// Configuration utilisateur, miroir de `config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub api_key: String,
    pub proxy: String,
    pub theme: ThemeSetting,
    /// Code ISO de langue (`en`, `zh`). Vide tant que non détectée.
    pub language: String,
    pub download_path: PathBuf,
    pub skip_existing: bool,
    pub use_description: bool,
    pub concurrent_downloads: usize,

    #[serde(skip)]
    config_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_key: String::new(),
            proxy: String::new(),
            theme: ThemeSetting::System,
            language: String::new(),
            download_path: default_download_path(),
            skip_existing: true,
            use_description: false,
            concurrent_downloads: 4,
            config_file: PathBuf::from("config.json"),
        }
    }
}

fn default_download_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("downloads")
}

impl Config {
    /// Charge la configuration depuis `config.json` dans le répertoire courant.
    pub fn load() -> Self {
        Self::load_from(Path::new("config.json"))
    }

    /// Charge la configuration depuis un chemin explicite.
    pub fn load_from(path: &Path) -> Self {
        let mut config = match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<Config>(&content) {
                Ok(parsed) => parsed,
                Err(e) => {
                    error!("configuration corrompue ({}), retour aux défauts: {e}", path.display());
                    Config::default()
                }
            },
            Err(_) => {
                // Fichier absent: créer le fichier avec les défauts
                info!("création de la configuration par défaut: {}", path.display());
                Config::default()
            }
        };

        config.config_file = path.to_path_buf();

        // Premier lancement: détecter la langue système
        if config.language.is_empty() {
            config.language = detect_system_language();
            config.save();
        }

        config.concurrent_downloads = config
            .concurrent_downloads
            .clamp(MIN_CONCURRENT_DOWNLOADS, MAX_CONCURRENT_DOWNLOADS);

        config
    }

    /// Écrit la configuration sur disque. Les erreurs sont journalisées,
    /// jamais propagées: perdre un réglage ne doit pas faire tomber l'app.
    pub fn save(&self) {
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&self.config_file, json) {
                    error!("échec de l'écriture de la configuration: {e}");
                }
            }
            Err(e) => error!("échec de la sérialisation de la configuration: {e}"),
        }
    }

    /// L'API key a-t-elle une valeur exploitable (non vide, pas un placeholder)?
    pub fn has_plausible_key(&self) -> bool {
        !matches!(
            self.api_key.trim(),
            "" | "your_private_api_key" | "YOUR_API_KEY" | "API_KEY_HERE" | "API_KEY"
        )
    }
}

/// Détecte la langue système à partir des variables d'environnement POSIX.
fn detect_system_language() -> String {
    let locale = std::env::var("LC_ALL")
        .or_else(|_| std::env::var("LC_MESSAGES"))
        .or_else(|_| std::env::var("LANG"))
        .unwrap_or_default();

    if locale.starts_with("zh") {
        "zh".to_string()
    } else {
        "en".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = Config::load_from(&path);
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert!(config.api_key.is_empty());
        assert!(config.skip_existing);
        assert_eq!(config.concurrent_downloads, 4);
        // la détection de langue a été persistée
        assert!(!config.language.is_empty());
        assert!(path.exists());
    }

    #[test]
    fn test_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::load_from(&path);
        config.api_key = "th_test_key".to_string();
        config.theme = ThemeSetting::Dark;
        config.concurrent_downloads = 6;
        config.save();

        let reloaded = Config::load_from(&path);
        assert_eq!(reloaded.api_key, "th_test_key");
        assert_eq!(reloaded.theme, ThemeSetting::Dark);
        assert_eq!(reloaded.concurrent_downloads, 6);
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json at all").unwrap();

        let config = Config::load_from(&path);
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn test_partial_file_merges_over_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"api_key": "abc", "language": "zh"}"#).unwrap();

        let config = Config::load_from(&path);
        assert_eq!(config.api_key, "abc");
        assert_eq!(config.language, "zh");
        // champ absent du fichier: valeur par défaut
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn test_concurrency_is_clamped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"language": "en", "concurrent_downloads": 99}"#).unwrap();

        let config = Config::load_from(&path);
        assert_eq!(config.concurrent_downloads, MAX_CONCURRENT_DOWNLOADS);
    }

    #[test]
    fn test_placeholder_keys_rejected() {
        let mut config = Config::default();
        assert!(!config.has_plausible_key());
        config.api_key = "YOUR_API_KEY".to_string();
        assert!(!config.has_plausible_key());
        config.api_key = "th_live_0123".to_string();
        assert!(config.has_plausible_key());
    }
}
