use serde::{Deserialize, Serialize};
use std::time::Duration;
use crate::error::{status_error, MLError, MLResult};
use crate::sentiment::SentimentPrediction;

const SYSTEM_PROMPT: &str = "You are a sentiment classifier for financial news titles. \
Return JSON with keys: label (POS/NEG/NEU), score (-1.0 to 1.0), confidence (0.0 to 1.0).";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatContent,
}

#[derive(Debug, Deserialize)]
struct ChatContent {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawVerdict {
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    confidence: Option<f64>,
}

/// Sentiment scoring through an OpenAI-compatible chat completion endpoint.
#[derive(Clone)]
pub struct LlmSentimentClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl LlmSentimentClient {
    pub fn new(base_url: String, api_key: String, model: String, timeout: Duration) -> Self {
        Self {
            client: crate::http_client(timeout),
            base_url,
            api_key,
            model,
        }
    }

    /// Score one headline.
    pub async fn score(&self, text: &str) -> MLResult<SentimentPrediction> {
        if text.trim().is_empty() {
            return Ok(SentimentPrediction {
                label: "NEU".to_string(),
                score: 0.0,
                confidence: 0.0,
            });
        }

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: SYSTEM_PROMPT.to_string() },
                ChatMessage { role: "user", content: format!("Title: {}\nReturn JSON only.", text) },
            ],
            temperature: 0.2,
        };

        let response = self
            .client
            .post(&format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response.status()));
        }

        let body = response.json::<ChatResponse>().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| MLError::InvalidResponse("empty completion".to_string()))?;

        Ok(parse_verdict(&content))
    }
}

/// Extract the JSON verdict from a completion, tolerating surrounding prose.
pub(crate) fn parse_verdict(content: &str) -> SentimentPrediction {
    let content = content.trim();
    let raw: RawVerdict = serde_json::from_str(content)
        .ok()
        .or_else(|| {
            let start = content.find('{')?;
            let end = content.rfind('}')?;
            if end <= start {
                return None;
            }
            serde_json::from_str(&content[start..=end]).ok()
        })
        .unwrap_or_default();

    let label = raw
        .label
        .map(|l| l.trim().to_uppercase())
        .filter(|l| matches!(l.as_str(), "POS" | "NEG" | "NEU"))
        .unwrap_or_else(|| "NEU".to_string());

    SentimentPrediction {
        label,
        score: raw.score.unwrap_or(0.0).clamp(-1.0, 1.0),
        confidence: raw.confidence.unwrap_or(0.0).clamp(0.0, 1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        let v = parse_verdict(r#"{"label": "pos", "score": 0.6, "confidence": 0.8}"#);
        assert_eq!(v.label, "POS");
        assert_eq!(v.score, 0.6);
        assert_eq!(v.confidence, 0.8);
    }

    #[test]
    fn test_parse_json_inside_prose() {
        let v = parse_verdict("Voici: {\"label\": \"NEG\", \"score\": -1.7, \"confidence\": 0.9} fin");
        assert_eq!(v.label, "NEG");
        assert_eq!(v.score, -1.0);
    }

    #[test]
    fn test_parse_garbage_is_neutral() {
        let v = parse_verdict("no json here");
        assert_eq!(v.label, "NEU");
        assert_eq!(v.score, 0.0);
        let v = parse_verdict(r#"{"label": "MAYBE"}"#);
        assert_eq!(v.label, "NEU");
    }
}
