//! Fonctions utilitaires partagées: noms de fichiers, extraction d'URLs,
//! nettoyage des liens de partage et formatage.
//!
//! Invariants:
//! - `sanitize_filename` ne retourne jamais de caractère interdit par
//!   Windows (`\ / * ? : " < > |`) et respecte la longueur maximale.
//! - `extract_urls` retourne des URLs normalisées, validées et dédupliquées,
//!   dans l'ordre d'apparition.
use chrono::{DateTime, Utc};
use url::Url;

const FORBIDDEN: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

/// Retire les caractères interdits d'un nom de fichier et limite sa longueur.
pub fn sanitize_filename(name: &str, max_length: usize) -> String {
    let cleaned: String = name.chars().filter(|c| !FORBIDDEN.contains(c)).collect();
    let trimmed = cleaned.trim();
    trimmed.chars().take(max_length).collect()
}

/// Caractères qui terminent une URL plongée dans du texte libre.
fn is_url_terminator(c: char) -> bool {
    c.is_whitespace()
        || matches!(c, ')' | '(' | '"' | '\'' | '<' | '>' | ',' | ';' | '，' | '。' | '、' | '）' | '（')
}

/// Extrait toutes les URLs http/https d'un texte libre.
///
/// Les URLs sont validées via `url::Url`, normalisées (hôte en minuscules,
/// fragment retiré, `/` final retiré) et dédupliquées en conservant l'ordre.
pub fn extract_urls(text: &str) -> Vec<String> {
    let mut found = Vec::new();

    let mut rest = text;
    while let Some(pos) = rest.find("http") {
        let candidate_start = &rest[pos..];
        if !candidate_start.starts_with("http://") && !candidate_start.starts_with("https://") {
            // "http" au milieu d'un mot, avancer d'un caractère
            rest = &rest[pos + 4..];
            continue;
        }

        let end = candidate_start
            .char_indices()
            .find(|(_, c)| is_url_terminator(*c))
            .map(|(i, _)| i)
            .unwrap_or(candidate_start.len());
        let raw = &candidate_start[..end];

        if let Some(normalized) = normalize_url(raw) {
            if !found.contains(&normalized) {
                found.push(normalized);
            }
        }

        rest = &candidate_start[end..];
    }

    found
}

/// Valide et normalise une URL candidate. Retourne `None` si invalide.
fn normalize_url(raw: &str) -> Option<String> {
    let mut parsed = Url::parse(raw.trim()).ok()?;

    // L'hôte doit contenir au moins un point et un TLD plausible
    let host = parsed.host_str()?.to_ascii_lowercase();
    let parts: Vec<&str> = host.split('.').collect();
    if parts.len() < 2 || parts.last().map(|p| p.len()).unwrap_or(0) < 2 {
        return None;
    }

    parsed.set_fragment(None);
    let _ = parsed.set_host(Some(&host));

    Some(parsed.to_string().trim_end_matches('/').to_string())
}

/// Paramètres de requête de pistage retirés des liens de partage.
fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || matches!(key, "fbclid" | "gclid" | "ref")
}

/// Extrait la première URL d'un texte de partage et retire les paramètres
/// de pistage. Retourne le texte d'origine si aucune URL n'est trouvée.
///
/// Les applications mobiles enrobent le lien de texte décoratif; seule la
/// première URL compte.
pub fn clean_share_url(text: &str) -> String {
    let urls = extract_urls(text);
    let Some(first) = urls.first() else {
        return text.to_string();
    };

    let Ok(mut parsed) = Url::parse(first) else {
        return first.clone();
    };

    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| !is_tracking_param(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        parsed.set_query(None);
    } else {
        let mut serializer = parsed.query_pairs_mut();
        serializer.clear();
        for (k, v) in &kept {
            serializer.append_pair(k, v);
        }
        drop(serializer);
    }

    parsed.to_string().trim_end_matches('/').to_string()
}

/// Formate un grand nombre avec des séparateurs de milliers.
pub fn format_count(number: i64) -> String {
    let digits: Vec<char> = number.unsigned_abs().to_string().chars().collect();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(*c);
    }
    if number < 0 {
        format!("-{out}")
    } else {
        out
    }
}

/// Convertit un timestamp Unix en date ISO-8601 UTC (métadonnées nettoyées).
pub fn iso_timestamp(timestamp: i64) -> String {
    match DateTime::<Utc>::from_timestamp(timestamp, 0) {
        Some(dt) => dt.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_removes_forbidden_chars() {
        assert_eq!(sanitize_filename("a/b\\c:d*e?f\"g<h>i|j", 255), "abcdefghij");
        assert_eq!(sanitize_filename("  hello world  ", 255), "hello world");
    }

    #[test]
    fn test_sanitize_limits_length() {
        let long = "x".repeat(300);
        assert_eq!(sanitize_filename(&long, 50).chars().count(), 50);
        // the limit counts characters, not bytes
        let cjk = "视频".repeat(40);
        assert_eq!(sanitize_filename(&cjk, 10).chars().count(), 10);
    }

    #[test]
    fn test_extract_urls_from_share_text() {
        let text = "7.43 Kcs:/ 看看这个视频 https://v.douyin.com/abcDEF/ 复制此链接！";
        let urls = extract_urls(text);
        assert_eq!(urls, vec!["https://v.douyin.com/abcDEF".to_string()]);
    }

    #[test]
    fn test_extract_urls_dedup_and_order() {
        let text = "https://a.example.com/x\nhttps://b.example.com/y https://a.example.com/x";
        let urls = extract_urls(text);
        assert_eq!(
            urls,
            vec![
                "https://a.example.com/x".to_string(),
                "https://b.example.com/y".to_string()
            ]
        );
    }

    #[test]
    fn test_extract_urls_rejects_invalid_hosts() {
        assert!(extract_urls("https://localhost/video").is_empty());
        assert!(extract_urls("pas d'url ici").is_empty());
    }

    #[test]
    fn test_clean_share_url_strips_tracking_params() {
        let cleaned = clean_share_url(
            "https://www.tiktok.com/@user/video/123?utm_source=share&is_copy_url=1&fbclid=xyz",
        );
        assert_eq!(cleaned, "https://www.tiktok.com/@user/video/123?is_copy_url=1");
    }

    #[test]
    fn test_clean_share_url_without_url_returns_input() {
        assert_eq!(clean_share_url("rien à voir"), "rien à voir");
    }

    #[test]
    fn test_clean_share_url_drops_fragment() {
        let cleaned = clean_share_url("https://www.douyin.com/video/456#comment");
        assert_eq!(cleaned, "https://www.douyin.com/video/456");
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1234567), "1,234,567");
        assert_eq!(format_count(-4200), "-4,200");
    }

    #[test]
    fn test_iso_timestamp() {
        assert_eq!(iso_timestamp(0), "1970-01-01T00:00:00Z");
        assert_eq!(iso_timestamp(1700000000), "2023-11-14T22:13:20Z");
    }
}
