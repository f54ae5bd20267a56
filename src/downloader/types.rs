//! Types partagés du téléchargeur: travaux, options, rapports et événements.
use std::path::PathBuf;

use crate::api::Post;

/// Un fichier à télécharger vers une destination précise.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    /// Identifiant de la publication d'origine.
    pub post_id: String,
    /// URL du média.
    pub url: String,
    /// Chemin de destination (extension corrigeable après réponse HTTP).
    pub dest: PathBuf,
}

/// Options communes à tous les téléchargements d'un lot.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Ne pas retélécharger un fichier déjà présent et non vide.
    pub skip_existing: bool,
    /// Nombre maximal de tentatives par fichier.
    pub max_retries: u32,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            skip_existing: true,
            max_retries: 3,
        }
    }
}

/// Issue d'un téléchargement individuel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Fichier écrit sur disque.
    Downloaded(PathBuf),
    /// Fichier déjà présent, rien à faire.
    Skipped(PathBuf),
}

impl DownloadOutcome {
    pub fn path(&self) -> &PathBuf {
        match self {
            DownloadOutcome::Downloaded(p) | DownloadOutcome::Skipped(p) => p,
        }
    }
}

/// Bilan d'un lot: décomptes et chemins écrits.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub ok: usize,
    pub failed: usize,
    pub skipped: usize,
    pub files: Vec<PathBuf>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.ok + self.failed + self.skipped
    }
}

/// Événements de progression émis pendant un lot.
///
/// Chaque événement porte l'identifiant de la publication concernée pour
/// que l'interface mette à jour la bonne ligne.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    /// Résolution du lien en cours.
    Resolving { id: String },
    /// Publication résolue, téléchargement des fichiers.
    Fetching { id: String, title: String },
    /// Tous les fichiers de la publication sont écrits (ou déjà présents).
    Done { id: String, files: usize },
    /// La publication a échoué.
    Failed { id: String, message: String },
    /// Fin du lot avec le bilan global.
    Finished { report: BatchReport },
}

impl BatchEvent {
    /// Identifiant de la publication concernée, vide pour la fin de lot.
    pub fn id(&self) -> &str {
        match self {
            BatchEvent::Resolving { id }
            | BatchEvent::Fetching { id, .. }
            | BatchEvent::Done { id, .. }
            | BatchEvent::Failed { id, .. } => id,
            BatchEvent::Finished { .. } => "",
        }
    }
}

/// Une publication résolue accompagnée de ses travaux de téléchargement.
#[derive(Debug, Clone)]
pub struct PostPlan {
    pub post: Post,
    pub jobs: Vec<DownloadJob>,
    /// Pages HTML annexes à écrire (aperçus d'albums).
    pub pages: Vec<(PathBuf, String)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_id_accessor() {
        let e = BatchEvent::Done {
            id: "123".to_string(),
            files: 2,
        };
        assert_eq!(e.id(), "123");

        let f = BatchEvent::Finished {
            report: BatchReport::default(),
        };
        assert_eq!(f.id(), "");
    }

    #[test]
    fn test_report_total() {
        let report = BatchReport {
            ok: 2,
            failed: 1,
            skipped: 3,
            files: vec![],
        };
        assert_eq!(report.total(), 6);
    }
}
