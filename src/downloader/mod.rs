//! Téléchargement des médias vers le disque.
//!
//! Ce module regroupe:
//! - **types**: travaux, options, rapports et événements de progression.
//! - **plan**: transformation d'une publication en travaux et pages d'aperçu.
//! - **fetch**: écriture en flux d'un fichier avec reprise et retentatives.
//! - **preview**: pages HTML locales pour les albums d'images.
//! - **manager**: exécution parallèle bornée d'un lot complet.
//!
//! Conception:
//! - Le parallélisme s'applique entre publications; les fichiers d'une même
//!   publication restent séquentiels.
//! - Un fichier en cours s'écrit dans un `.part` repris via `Range`, puis
//!   est renommé une fois complet; un fichier déjà présent et non vide est
//!   ignoré quand l'option correspondante est active.
mod fetch;
mod manager;
mod plan;
mod preview;
mod types;

pub use manager::BatchRunner;
pub use types::{BatchEvent, BatchReport};
