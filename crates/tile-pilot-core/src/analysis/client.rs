//! Blocking client for a Gemini-style generateContent endpoint.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::blocking::Client;
use serde_json::{json, Value};
use std::time::Duration;

use super::model::{extract_json, BoardAnalysis};
use crate::error::{Error, Result};

/// Default inference endpoint (model baked into the path)
pub const DEFAULT_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Prompt sent alongside every board screenshot. Asks for a strategic
/// read of the board and pins the reply to the [`BoardAnalysis`] schema.
const BOARD_PROMPT: &str = r#"Analyze this tile-matching game board as a strategic assistant. Think a few moves ahead to create special tiles and combinations.

Special tile types to look for:
- Striped tile (4 in a row or column)
- Wrapped tile (L or T shape of 5)
- Color bomb (5 in a row)

For each candidate move consider the immediate match, special tiles it could create, likely cascades, setups for the next two moves, and progress toward the level objective. Prefer color bombs, then special-tile combinations, then striped or wrapped tiles, then cascades.

Return your analysis as exactly this JSON:
{
    "moves_left": number,
    "current_objectives": {
        "type": "what needs to be collected or cleared",
        "target": number,
        "current": number
    },
    "best_move": {
        "start_pos": [row, col],
        "direction": "up/down/left/right",
        "immediate_outcome": "what happens right after the move",
        "cascade_potential": "likely cascade effects",
        "next_moves": [
            { "setup": "what this sets up", "position": [row, col], "special_tile": "type if any" }
        ]
    },
    "special_tiles": [
        { "type": "striped/wrapped/color_bomb", "position": [row, col], "potential_combinations": "possible combinations" }
    ]
}

Board coordinates start from the top-left at (0,0) and increase going right and down. Every position you return must be a valid board coordinate."#;

/// Analyzes a board screenshot into a recommended move
pub trait MoveAnalyzer {
    fn analyze(&self, png_bytes: &[u8]) -> Result<BoardAnalysis>;
}

/// HTTP-backed analyzer
pub struct VisionClient {
    http: Client,
    endpoint: String,
    api_key: String,
}

impl VisionClient {
    /// Client against the default endpoint
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_endpoint(DEFAULT_ENDPOINT, api_key)
    }

    pub fn with_endpoint(endpoint: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }

    fn request_payload(png_bytes: &[u8]) -> Value {
        json!({
            "contents": [{
                "parts": [
                    { "text": BOARD_PROMPT },
                    {
                        "inline_data": {
                            "mime_type": "image/png",
                            "data": BASE64.encode(png_bytes)
                        }
                    }
                ]
            }]
        })
    }

    fn reply_text(body: &Value) -> Option<&str> {
        body.get("candidates")?
            .get(0)?
            .get("content")?
            .get("parts")?
            .get(0)?
            .get("text")?
            .as_str()
    }
}

impl MoveAnalyzer for VisionClient {
    fn analyze(&self, png_bytes: &[u8]) -> Result<BoardAnalysis> {
        let url = format!("{}?key={}", self.endpoint, self.api_key);
        tracing::debug!("Requesting board analysis ({} byte frame)", png_bytes.len());

        let response = self
            .http
            .post(&url)
            .json(&Self::request_payload(png_bytes))
            .send()?
            .error_for_status()?;
        let body: Value = response.json()?;

        let text = Self::reply_text(&body).ok_or_else(|| Error::BadResponse {
            reason: "no candidate text in reply".into(),
        })?;
        let json_str = extract_json(text).ok_or_else(|| Error::BadResponse {
            reason: "no JSON object in candidate text".into(),
        })?;
        serde_json::from_str(json_str).map_err(|e| Error::BadResponse {
            reason: format!("malformed analysis JSON: {}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_carries_prompt_and_inline_image() {
        let payload = VisionClient::request_payload(&[1, 2, 3]);
        let parts = &payload["contents"][0]["parts"];

        let prompt = parts[0]["text"].as_str().unwrap();
        assert!(prompt.contains("best_move"));
        assert!(prompt.contains("moves_left"));

        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/png");
        assert_eq!(
            parts[1]["inline_data"]["data"].as_str().unwrap(),
            BASE64.encode([1, 2, 3])
        );
    }

    #[test]
    fn reply_text_walks_the_candidate_path() {
        let body = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "hello" }] }
            }]
        });
        assert_eq!(VisionClient::reply_text(&body), Some("hello"));

        let empty = json!({ "candidates": [] });
        assert_eq!(VisionClient::reply_text(&empty), None);
    }
}
