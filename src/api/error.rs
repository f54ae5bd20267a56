//! Erreurs typées du client API TikHub.
//!
//! Les causes documentées sont toutes externes (clé invalide, quota épuisé,
//! réseau, contenu privé); elles remontent telles quelles jusqu'à
//! l'interface pour affichage, sans reprise locale.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid or expired API key")]
    InvalidApiKey,
    #[error("daily API quota exhausted, check in on tikhub.io to refill")]
    QuotaExhausted,
    #[error("unsupported platform for link: {0}")]
    UnsupportedPlatform(String),
    #[error("unexpected API response: {0}")]
    UnexpectedPayload(String),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl ApiError {
    /// Classe un statut HTTP d'échec vers l'erreur correspondante.
    pub fn from_status(status: reqwest::StatusCode) -> Self {
        match status.as_u16() {
            401 | 403 => ApiError::InvalidApiKey,
            429 => ApiError::QuotaExhausted,
            code => ApiError::UnexpectedPayload(format!("HTTP {code}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            ApiError::from_status(StatusCode::UNAUTHORIZED),
            ApiError::InvalidApiKey
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::FORBIDDEN),
            ApiError::InvalidApiKey
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::TOO_MANY_REQUESTS),
            ApiError::QuotaExhausted
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_GATEWAY),
            ApiError::UnexpectedPayload(_)
        ));
    }
}
