//! Optional external parser consulted when the rule-based result is weak
//!
//! The collaborator (typically a hosted language model) is only asked when
//! the rule-based confidence is below [`FallbackPolicy::threshold`]. Whatever
//! happens on that call, the rule-based result stays the answer unless the
//! collaborator produced code with strictly higher confidence.

use crate::config::RobotDefaults;
use crate::error::ParseError;
use crate::parser::{parse_command, CommandType, ParseOutcome, ParseResult};
use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FallbackError {
    #[error("fallback parser is not configured")]
    Unavailable,
    #[error("fallback parser timed out after {0:?}")]
    Timeout(Duration),
    #[error("fallback service error: {0}")]
    Service(String),
}

impl From<FallbackError> for ParseError {
    fn from(err: FallbackError) -> Self {
        ParseError::FallbackUnavailable(err.to_string())
    }
}

/// Extra information handed to the collaborator alongside the command.
#[derive(Debug, Clone, Default)]
pub struct FallbackContext {
    /// Surrounding program text, if any
    pub program: Option<String>,
    /// Routines the command may call
    pub routine_names: Vec<String>,
}

/// External command parser
#[async_trait]
pub trait FallbackParser: Send + Sync {
    /// Parse one command. The returned result carries its own confidence.
    async fn parse(
        &self,
        text: &str,
        context: &FallbackContext,
    ) -> Result<ParseResult, FallbackError>;

    /// Provider name, for logs
    fn name(&self) -> &str;
}

/// When and how long to consult the collaborator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FallbackPolicy {
    /// Rule-based results at or above this confidence are kept without asking
    pub threshold: f32,
    pub timeout: Duration,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            threshold: 0.8,
            timeout: Duration::from_secs(5),
        }
    }
}

/// Ask the collaborator once, bounded by `timeout`.
pub async fn consult_fallback(
    fallback: Option<&dyn FallbackParser>,
    text: &str,
    context: &FallbackContext,
    timeout: Duration,
) -> Result<ParseResult, ParseError> {
    let fallback = fallback.ok_or(FallbackError::Unavailable)?;
    match tokio::time::timeout(timeout, fallback.parse(text, context)).await {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(e)) => Err(e.into()),
        Err(_) => Err(FallbackError::Timeout(timeout).into()),
    }
}

/// Rule-based parse, overridden by the collaborator only on a better answer.
pub async fn parse_with_fallback(
    text: &str,
    defaults: &RobotDefaults,
    fallback: Option<&dyn FallbackParser>,
    context: &FallbackContext,
    policy: FallbackPolicy,
) -> ParseResult {
    let rule_based = parse_command(text, defaults);
    if rule_based.confidence >= policy.threshold {
        return rule_based;
    }

    let provider = fallback.map(|f| f.name().to_string());
    let candidate = match consult_fallback(fallback, text, context, policy.timeout).await {
        Ok(candidate) => candidate,
        Err(e) => {
            tracing::warn!(text, provider = ?provider, error = %e, "keeping rule-based result");
            return rule_based;
        }
    };

    let adopt = rule_based.success()
        && candidate.success()
        && candidate.confidence > rule_based.confidence;
    if !adopt {
        tracing::debug!(
            text,
            rule_confidence = rule_based.confidence,
            fallback_confidence = candidate.confidence,
            "fallback result not adopted"
        );
        return rule_based;
    }

    tracing::info!(text, provider = ?provider, confidence = candidate.confidence, "fallback override");
    ParseResult {
        command_type: Some(CommandType::Fallback),
        ..candidate
    }
}

/// Canned collaborator for tests and offline use
#[derive(Debug, Clone, Default)]
pub struct MockFallback {
    responses: HashMap<String, ParseResult>,
    latency: Option<Duration>,
    failure: Option<String>,
}

impl MockFallback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `text` (matched case-insensitively) with `code`.
    pub fn with_response(mut self, text: &str, code: &str, confidence: f32) -> Self {
        self.responses.insert(
            text.trim().to_lowercase(),
            ParseResult::code(code, confidence, CommandType::Fallback),
        );
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Fail every call with a service error.
    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }
}

#[async_trait]
impl FallbackParser for MockFallback {
    async fn parse(
        &self,
        text: &str,
        _context: &FallbackContext,
    ) -> Result<ParseResult, FallbackError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(message) = &self.failure {
            return Err(FallbackError::Service(message.clone()));
        }

        let result = self
            .responses
            .get(&text.trim().to_lowercase())
            .cloned()
            .unwrap_or_else(|| ParseResult::failed(ParseError::UnrecognizedCommand));
        Ok(result)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[derive(Debug, Deserialize)]
struct CannedResponse {
    code: String,
    confidence: f32,
}

/// Load canned collaborator answers from YAML.
///
/// The file maps command text to `{ code, confidence }`.
pub fn load_fallback_responses(path: impl AsRef<Path>) -> anyhow::Result<MockFallback> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading fallback responses: {}", path.display()))?;
    let canned: HashMap<String, CannedResponse> = serde_yaml::from_str(&raw)
        .with_context(|| format!("parsing yaml: {}", path.display()))?;
    tracing::debug!(path = %path.display(), responses = canned.len(), "loaded fallback responses");

    Ok(canned
        .iter()
        .fold(MockFallback::new(), |mock, (text, response)| {
            mock.with_response(text, &response.code, response.confidence)
        }))
}

/// Whether `result` came from the collaborator.
pub fn is_fallback_result(result: &ParseResult) -> bool {
    result.command_type == Some(CommandType::Fallback) && matches!(result.outcome, ParseOutcome::Code(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    // above the rule-based stop confidence so the collaborator is consulted
    fn policy() -> FallbackPolicy {
        FallbackPolicy {
            threshold: 0.9,
            ..FallbackPolicy::default()
        }
    }

    async fn run(text: &str, fallback: Option<&dyn FallbackParser>, policy: FallbackPolicy) -> ParseResult {
        parse_with_fallback(
            text,
            &RobotDefaults::default(),
            fallback,
            &FallbackContext::default(),
            policy,
        )
        .await
    }

    #[tokio::test]
    async fn test_confident_result_skips_fallback() {
        let mock = MockFallback::new().with_response("move forward 200mm", "robot.straight(1)", 1.0);
        let result = run("move forward 200mm", Some(&mock), policy()).await;
        assert_eq!(result.generated_code(), Some("robot.straight(200)"));
        assert_eq!(result.command_type, Some(CommandType::Move));
    }

    #[tokio::test]
    async fn test_default_threshold_keeps_stop() {
        let mock = MockFallback::new().with_response("stop", "robot.brake()", 0.99);
        let result = run("stop", Some(&mock), FallbackPolicy::default()).await;
        assert_eq!(result.generated_code(), Some("robot.stop()"));
    }

    #[tokio::test]
    async fn test_higher_confidence_overrides() {
        let mock = MockFallback::new().with_response("Stop", "robot.stop()\nrobot.brake()", 0.97);
        let result = run("stop", Some(&mock), policy()).await;
        assert_eq!(result.generated_code(), Some("robot.stop()\nrobot.brake()"));
        assert_eq!(result.command_type, Some(CommandType::Fallback));
        assert!(is_fallback_result(&result));
    }

    #[tokio::test]
    async fn test_equal_confidence_keeps_rule_result() {
        let mock = MockFallback::new().with_response("stop", "robot.brake()", 0.85);
        let result = run("stop", Some(&mock), policy()).await;
        assert_eq!(result.generated_code(), Some("robot.stop()"));
    }

    #[tokio::test]
    async fn test_failed_rule_result_is_not_overridden() {
        let mock = MockFallback::new().with_response("xyzzy plugh", "robot.turn(1)", 0.99);
        let result = run("xyzzy plugh", Some(&mock), policy()).await;
        assert_eq!(result.error(), Some(&ParseError::UnrecognizedCommand));
    }

    #[tokio::test]
    async fn test_missing_fallback_keeps_rule_result() {
        let result = run("stop", None, policy()).await;
        assert_eq!(result.generated_code(), Some("robot.stop()"));

        let err = consult_fallback(None, "stop", &FallbackContext::default(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ParseError::FallbackUnavailable(_)));
    }

    #[tokio::test]
    async fn test_service_error_keeps_rule_result() {
        let mock = MockFallback::new().failing("quota exceeded");
        let result = run("stop", Some(&mock), policy()).await;
        assert_eq!(result.generated_code(), Some("robot.stop()"));

        let err = consult_fallback(Some(&mock), "stop", &FallbackContext::default(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ParseError::FallbackUnavailable("fallback service error: quota exceeded".to_string())
        );
    }

    #[tokio::test]
    async fn test_responses_load_from_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "\"Stop\":\n  code: \"robot.stop()\\nrobot.brake()\"\n  confidence: 0.97"
        )
        .unwrap();
        let mock = load_fallback_responses(file.path()).unwrap();
        let result = run("stop", Some(&mock), policy()).await;
        assert!(is_fallback_result(&result));
        assert_eq!(result.generated_code(), Some("robot.stop()\nrobot.brake()"));
    }

    #[test]
    fn test_missing_responses_file_reports_path() {
        let err = load_fallback_responses("/nonexistent/fallback.yaml").unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/fallback.yaml"));
    }

    #[tokio::test]
    async fn test_timeout_keeps_rule_result() {
        let mock = MockFallback::new()
            .with_response("stop", "robot.brake()", 0.99)
            .with_latency(Duration::from_millis(200));
        let policy = FallbackPolicy {
            threshold: 0.9,
            timeout: Duration::from_millis(10),
        };
        let result = run("stop", Some(&mock), policy).await;
        assert_eq!(result.generated_code(), Some("robot.stop()"));
        assert_eq!(result.command_type, Some(CommandType::Stop));
    }
}
