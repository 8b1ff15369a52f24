//! Article title generation through an OpenAI-compatible chat completions API.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::errors::GatewayError;

const SYSTEM_PROMPT: &str =
    "You are a professional content writer specializing in creating engaging blog posts.";

static LEADING_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\s*").expect("static regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedArticle {
    pub id: usize,
    pub title: String,
    pub status: &'static str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

pub fn user_prompt(count: &str, topics: &str) -> String {
    format!("Generate {count} article titles about the following topics: {topics}")
}

/// One article per non-blank line, with any `N.` numbering removed.
pub fn parse_titles(content: &str) -> Vec<GeneratedArticle> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(i, line)| GeneratedArticle {
            id: i + 1,
            title: LEADING_NUMBER_RE.replace(line, "").into_owned(),
            status: "generated",
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct ContentGenerator {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl ContentGenerator {
    pub fn new(http: reqwest::Client, base_url: &str, model: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    pub async fn generate(
        &self,
        api_key: &str,
        count: &str,
        topics: &str,
    ) -> Result<Vec<GeneratedArticle>, GatewayError> {
        let prompt = user_prompt(count, topics);
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
        };

        let url = format!("{}/chat/completions", self.base_url);
        tracing::debug!(%url, model = %self.model, "requesting article titles");
        let resp = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = resp.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(GatewayError::EmptyCompletion)?;
        Ok(parse_titles(&content))
    }
}
