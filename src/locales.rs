//! Tables de traduction de l'interface.
//!
//! Chaque langue est une table JSON plate `clé -> texte`, embarquée dans
//! le binaire. Un dossier `locales/` placé à côté de l'exécutable permet
//! d'ajouter ou de remplacer des langues sans recompiler. Une clé absente
//! retombe sur l'anglais, puis sur la clé elle-même.
use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

/// Langue par défaut et langue de repli.
pub const FALLBACK_LANGUAGE: &str = "en";

const EMBEDDED: &[(&str, &str)] = &[
    ("en", include_str!("../locales/en.json")),
    ("zh", include_str!("../locales/zh.json")),
];

/// Traducteur de l'interface, table courante + repli anglais.
pub struct Translator {
    language: String,
    tables: HashMap<String, HashMap<String, String>>,
}

impl Translator {
    /// Charge les tables embarquées et sélectionne `language`.
    pub fn new(language: &str) -> Self {
        let mut tables = HashMap::new();
        for (code, raw) in EMBEDDED {
            match parse_table(raw) {
                Some(table) => {
                    tables.insert((*code).to_string(), table);
                }
                None => warn!("table de langue embarquée invalide: {code}"),
            }
        }
        let mut translator = Self {
            language: FALLBACK_LANGUAGE.to_string(),
            tables,
        };
        translator.set_language(language);
        translator
    }

    /// Ajoute ou remplace des langues depuis un dossier de fichiers `XX.json`.
    pub fn load_overrides(&mut self, dir: &Path) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(code) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match std::fs::read_to_string(&path).ok().and_then(|raw| parse_table(&raw)) {
                Some(table) => {
                    debug!("table de langue chargée depuis {}", path.display());
                    self.tables.insert(code.to_string(), table);
                }
                None => warn!("fichier de langue ignoré: {}", path.display()),
            }
        }
    }

    /// Change la langue courante; une langue inconnue retombe sur l'anglais.
    pub fn set_language(&mut self, language: &str) {
        if self.tables.contains_key(language) {
            self.language = language.to_string();
        } else {
            warn!("langue inconnue {language}, repli sur {FALLBACK_LANGUAGE}");
            self.language = FALLBACK_LANGUAGE.to_string();
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Traduit une clé: langue courante, puis anglais, puis la clé.
    pub fn t(&self, key: &str) -> String {
        if let Some(text) = self.tables.get(&self.language).and_then(|t| t.get(key)) {
            return text.clone();
        }
        if let Some(text) = self.tables.get(FALLBACK_LANGUAGE).and_then(|t| t.get(key)) {
            return text.clone();
        }
        key.to_string()
    }

    /// Langues disponibles: code et nom natif (clé `language.name`).
    pub fn available_languages(&self) -> Vec<(String, String)> {
        let mut languages: Vec<(String, String)> = self
            .tables
            .iter()
            .map(|(code, table)| {
                let name = table
                    .get("language.name")
                    .cloned()
                    .unwrap_or_else(|| code.clone());
                (code.clone(), name)
            })
            .collect();
        languages.sort();
        languages
    }
}

/// Décode une table plate `clé -> texte`, en ignorant les valeurs non textuelles.
fn parse_table(raw: &str) -> Option<HashMap<String, String>> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    Some(
        object
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_embedded_languages_present() {
        let translator = Translator::new("en");
        let codes: Vec<String> = translator
            .available_languages()
            .into_iter()
            .map(|(code, _)| code)
            .collect();
        assert!(codes.contains(&"en".to_string()));
        assert!(codes.contains(&"zh".to_string()));
    }

    #[test]
    fn test_translation_and_fallback() {
        let translator = Translator::new("zh");
        assert_eq!(translator.language(), "zh");
        // Clé existante dans les deux langues
        assert_ne!(translator.t("tab.settings"), "tab.settings");
        // Clé inexistante: la clé elle-même
        assert_eq!(translator.t("does.not.exist"), "does.not.exist");
    }

    #[test]
    fn test_unknown_language_falls_back_to_english() {
        let translator = Translator::new("xx");
        assert_eq!(translator.language(), "en");
    }

    #[test]
    fn test_overrides_add_new_language() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("fr.json"),
            r#"{"language.name": "Français", "tab.settings": "Paramètres"}"#,
        )
        .unwrap();

        let mut translator = Translator::new("en");
        translator.load_overrides(dir.path());
        translator.set_language("fr");
        assert_eq!(translator.t("tab.settings"), "Paramètres");
        // Clé absente du français: repli anglais
        assert_ne!(translator.t("tab.video"), "tab.video");
    }

    #[test]
    fn test_invalid_override_is_ignored() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("bad.json"), "not json at all").unwrap();

        let mut translator = Translator::new("en");
        translator.load_overrides(dir.path());
        assert_eq!(translator.language(), "en");
    }
}
