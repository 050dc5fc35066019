use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::instrument;

use crate::config::TriviaConfig;
use crate::game::Question;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider answered with status {0}")]
    Status(reqwest::StatusCode),

    #[error("Provider answered with response code {0}")]
    ResponseCode(u8),

    #[error("Malformed provider payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Fetch-only client for a remote question bank.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    async fn fetch(
        &self,
        amount: u32,
        category: Option<u32>,
        difficulty: Option<Difficulty>,
    ) -> Result<Vec<Question>, UpstreamError>;
}

// --- Open Trivia DB wire format ---
#[derive(Debug, Deserialize)]
struct OpenTriviaResponse {
    response_code: u8,
    results: Vec<OpenTriviaQuestion>,
}

#[derive(Debug, Deserialize)]
struct OpenTriviaQuestion {
    question: String,
    correct_answer: String,
    incorrect_answers: Vec<String>,
}

pub struct OpenTriviaDb {
    client: reqwest::Client,
    url: String,
}

impl OpenTriviaDb {
    pub fn new(config: &TriviaConfig) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url: format!("{}{}", config.base_url.trim_end_matches('/'), config.api_path),
        })
    }
}

#[async_trait]
impl QuestionSource for OpenTriviaDb {
    #[instrument(skip(self))]
    async fn fetch(
        &self,
        amount: u32,
        category: Option<u32>,
        difficulty: Option<Difficulty>,
    ) -> Result<Vec<Question>, UpstreamError> {
        let mut params = vec![("amount", amount.to_string())];
        if let Some(category) = category {
            params.push(("category", category.to_string()));
        }
        if let Some(difficulty) = difficulty {
            params.push(("difficulty", difficulty.as_str().to_string()));
        }

        let response = self.client.get(&self.url).query(&params).send().await?;
        if !response.status().is_success() {
            return Err(UpstreamError::Status(response.status()));
        }

        let body = response.bytes().await?;
        let questions = parse_response(&body)?;
        tracing::debug!(count = questions.len(), "Fetched trivia questions");
        Ok(questions)
    }
}

/// Decodes a provider payload into questions with HTML entities resolved.
pub fn parse_response(body: &[u8]) -> Result<Vec<Question>, UpstreamError> {
    let response: OpenTriviaResponse = serde_json::from_slice(body)?;
    if response.response_code != 0 {
        return Err(UpstreamError::ResponseCode(response.response_code));
    }

    Ok(response
        .results
        .into_iter()
        .map(|q| {
            Question::new(
                decode(&q.question),
                decode(&q.correct_answer),
                q.incorrect_answers.iter().map(|a| decode(a)).collect(),
            )
        })
        .collect())
}

fn decode(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response_decodes_entities() {
        let body = br#"{
            "response_code": 0,
            "results": [{
                "type": "multiple",
                "difficulty": "easy",
                "category": "General Knowledge",
                "question": "Who wrote &quot;Hamlet&quot;?",
                "correct_answer": "Shakespeare",
                "incorrect_answers": ["Marlowe", "Jonson &amp; co", "Kyd&#039;s"]
            }]
        }"#;

        let questions = parse_response(body).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].text, "Who wrote \"Hamlet\"?");
        assert_eq!(questions[0].correct_answer, "Shakespeare");
        assert_eq!(questions[0].incorrect_answers, vec!["Marlowe", "Jonson & co", "Kyd's"]);
        assert!(questions[0].guess.is_none());
    }

    #[test]
    fn test_parse_response_rejects_error_code() {
        let body = br#"{"response_code": 1, "results": []}"#;
        assert!(matches!(parse_response(body), Err(UpstreamError::ResponseCode(1))));
    }

    #[test]
    fn test_parse_response_rejects_malformed_payload() {
        assert!(matches!(parse_response(b"<html>oops</html>"), Err(UpstreamError::Payload(_))));
    }

    #[test]
    fn test_difficulty_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Difficulty::Medium).unwrap(), "\"medium\"");
        assert_eq!(Difficulty::Hard.as_str(), "hard");
    }
}
