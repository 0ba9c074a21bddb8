use anyhow::{Context, Result, anyhow};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde_json::Value;
use tracing::debug;

use crate::config::IngestConfig;
use crate::http_client::build_http_client;

/// Read side of the pipeline. Every call is a single request; there is no
/// retry and no paging inside an implementation.
pub trait StatsSource {
    fn fetch_match(&self, match_id: i64) -> Result<Value>;

    fn fetch_player(&self, account_id: i64) -> Result<Value>;

    /// JSON array of the player's matches, newest first.
    fn fetch_player_matches(&self, account_id: i64) -> Result<Value>;

    /// JSON array of up to 100 professional matches. `None` asks for the
    /// newest page, `Some(id)` for matches strictly older than `id`.
    fn fetch_pro_matches(&self, less_than_match_id: Option<&str>) -> Result<Value>;
}

pub struct OpenDotaClient {
    client: Client,
    base_url: String,
}

impl OpenDotaClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn from_config(cfg: &IngestConfig) -> Result<Self> {
        let client = build_http_client(cfg.timeout_secs)?;
        Ok(Self::new(client, cfg.api_url.clone()))
    }

    pub fn match_url(&self, match_id: i64) -> String {
        format!("{}/matches/{match_id}", self.base_url)
    }

    pub fn player_url(&self, account_id: i64) -> String {
        format!("{}/players/{account_id}", self.base_url)
    }

    pub fn player_matches_url(&self, account_id: i64) -> String {
        format!("{}/players/{account_id}/matches", self.base_url)
    }

    pub fn pro_matches_url(&self, less_than_match_id: Option<&str>) -> String {
        match less_than_match_id {
            Some(cursor) => format!("{}/proMatches?less_than_match_id={cursor}", self.base_url),
            None => format!("{}/proMatches", self.base_url),
        }
    }

    fn get_json(&self, url: &str) -> Result<Value> {
        debug!(url, "GET");
        let resp = self.client.get(url).send().context("request failed")?;
        let status = resp.status();
        let body = resp.text().context("failed reading body")?;
        decode_body(status, url, &body)
    }
}

impl StatsSource for OpenDotaClient {
    fn fetch_match(&self, match_id: i64) -> Result<Value> {
        self.get_json(&self.match_url(match_id))
            .with_context(|| format!("fetch match {match_id}"))
    }

    fn fetch_player(&self, account_id: i64) -> Result<Value> {
        self.get_json(&self.player_url(account_id))
            .with_context(|| format!("fetch player {account_id}"))
    }

    fn fetch_player_matches(&self, account_id: i64) -> Result<Value> {
        self.get_json(&self.player_matches_url(account_id))
            .with_context(|| format!("fetch matches of player {account_id}"))
    }

    fn fetch_pro_matches(&self, less_than_match_id: Option<&str>) -> Result<Value> {
        self.get_json(&self.pro_matches_url(less_than_match_id))
            .context("fetch pro matches")
    }
}

/// Non-2xx statuses become errors carrying the head of the body.
fn decode_body(status: StatusCode, url: &str, body: &str) -> Result<Value> {
    if !status.is_success() {
        let head = truncate(body, 200);
        return Err(anyhow!("http {status} from {url}: {head}"));
    }
    serde_json::from_str::<Value>(body.trim())
        .with_context(|| format!("invalid json from {url}"))
}

fn truncate(raw: &str, max_chars: usize) -> &str {
    match raw.char_indices().nth(max_chars) {
        Some((idx, _)) => &raw[..idx],
        None => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OpenDotaClient {
        OpenDotaClient::new(Client::new(), "https://api.opendota.com/api/")
    }

    #[test]
    fn builds_endpoint_urls() {
        let c = client();
        assert_eq!(c.match_url(42), "https://api.opendota.com/api/matches/42");
        assert_eq!(c.player_url(7), "https://api.opendota.com/api/players/7");
        assert_eq!(
            c.player_matches_url(7),
            "https://api.opendota.com/api/players/7/matches"
        );
    }

    #[test]
    fn pro_matches_url_carries_cursor() {
        let c = client();
        assert_eq!(
            c.pro_matches_url(None),
            "https://api.opendota.com/api/proMatches"
        );
        assert_eq!(
            c.pro_matches_url(Some("7000000000")),
            "https://api.opendota.com/api/proMatches?less_than_match_id=7000000000"
        );
    }

    #[test]
    fn error_status_is_an_error_with_body_head() {
        let body = format!("{{\"error\":\"{}\"}}", "x".repeat(500));
        let err = decode_body(StatusCode::INTERNAL_SERVER_ERROR, "u", &body)
            .expect_err("500 should fail");
        let msg = format!("{err:#}");
        assert!(msg.starts_with("http 500 Internal Server Error from u: "));
        assert!(msg.contains("{\"error\""));
        assert!(msg.len() < 300);
    }

    #[test]
    fn error_status_fails_even_with_json_body() {
        let err = decode_body(StatusCode::NOT_FOUND, "u", r#"{"error":"Not Found"}"#)
            .expect_err("404 should fail");
        assert!(format!("{err:#}").contains("404"));
    }

    #[test]
    fn malformed_json_is_an_error() {
        let err = decode_body(StatusCode::OK, "u", "<html>busy</html>")
            .expect_err("html is not json");
        assert!(format!("{err:#}").starts_with("invalid json from u"));
        assert!(decode_body(StatusCode::OK, "u", "").is_err());
    }

    #[test]
    fn ok_body_is_parsed_with_surrounding_whitespace() {
        let body = " [{\"match_id\": 1}]\n";
        let v = decode_body(StatusCode::OK, "u", body).expect("json");
        assert_eq!(v[0]["match_id"], 1);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("ok", 10), "ok");
    }
}
