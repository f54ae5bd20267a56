//! Points d'entrée compte TikHub: informations utilisateur et quota
//! journalier. Le quota et le check-in sont entièrement pilotés côté
//! service; le client se contente de les afficher.
use serde_json::Value;
use tracing::info;

use crate::api::error::ApiError;
use crate::api::types::{i64_at, str_at, value_at, AccountInfo, DailyUsage};
use crate::api::{ApiClient, ACCOUNT_TIMEOUT};

/// Récupère les informations du compte associé à la clé.
pub async fn get_user_info(client: &ApiClient) -> Result<AccountInfo, ApiError> {
    let payload = client
        .get_json("/api/v1/tikhub/user/get_user_info", &[], ACCOUNT_TIMEOUT)
        .await?;
    info!(
        "get_tikhub_user_info: code {}",
        payload.get("code").and_then(serde_json::Value::as_i64).unwrap_or(0)
    );
    parse_account_info(&payload)
}

/// Récupère la consommation journalière du compte.
pub async fn get_user_daily_usage(client: &ApiClient) -> Result<DailyUsage, ApiError> {
    let payload = client
        .get_json("/api/v1/tikhub/user/get_user_daily_usage", &[], ACCOUNT_TIMEOUT)
        .await?;
    parse_daily_usage(&payload)
}

/// Valide l'enveloppe `code == 200` commune aux endpoints compte.
fn check_envelope(payload: &Value) -> Result<(), ApiError> {
    match payload.get("code").and_then(Value::as_i64) {
        Some(200) => Ok(()),
        Some(401) | Some(403) => Err(ApiError::InvalidApiKey),
        Some(code) => Err(ApiError::UnexpectedPayload(format!("code {code}"))),
        None => Err(ApiError::UnexpectedPayload("envelope without code field".to_string())),
    }
}

pub(crate) fn parse_account_info(payload: &Value) -> Result<AccountInfo, ApiError> {
    check_envelope(payload)?;
    let data = value_at(payload, &["data"]).unwrap_or(payload);
    Ok(AccountInfo {
        email: str_at(data, &["email"]),
        balance: data.get("balance").and_then(Value::as_f64).unwrap_or(0.0),
        free_credit: data.get("free_credit").and_then(Value::as_f64).unwrap_or(0.0),
    })
}

pub(crate) fn parse_daily_usage(payload: &Value) -> Result<DailyUsage, ApiError> {
    check_envelope(payload)?;
    let data = value_at(payload, &["data"]).unwrap_or(payload);
    let daily_limit = i64_at(data, &["daily_limit"]);
    let used_today = i64_at(data, &["today_usage"]);
    Ok(DailyUsage {
        daily_limit,
        used_today,
        remaining: (daily_limit - used_today).max(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_account_info() {
        let payload = json!({
            "code": 200,
            "data": {"email": "user@example.com", "balance": 12.5, "free_credit": 0.4}
        });
        let info = parse_account_info(&payload).unwrap();
        assert_eq!(info.email, "user@example.com");
        assert_eq!(info.balance, 12.5);
        assert_eq!(info.free_credit, 0.4);
    }

    #[test]
    fn test_envelope_401_maps_to_invalid_key() {
        let payload = json!({"code": 401, "message": "unauthorized"});
        assert!(matches!(
            parse_account_info(&payload),
            Err(ApiError::InvalidApiKey)
        ));
    }

    #[test]
    fn test_parse_daily_usage() {
        let payload = json!({
            "code": 200,
            "data": {"daily_limit": 1000, "today_usage": 250}
        });
        let usage = parse_daily_usage(&payload).unwrap();
        assert_eq!(usage.remaining, 750);
    }

    #[test]
    fn test_daily_usage_never_negative() {
        let payload = json!({
            "code": 200,
            "data": {"daily_limit": 100, "today_usage": 150}
        });
        assert_eq!(parse_daily_usage(&payload).unwrap().remaining, 0);
    }
}
