//! Mock generator for testing
//!
//! Records every call and answers with a fixed line or a forced failure.

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{ContextLine, ExternalGenerator, GenerationError};

/// Configuration for mock generator behavior
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Fail every call with this error
    pub fail_with: Option<GenerationError>,

    /// Fixed response text (defaults to "<persona> says hello")
    pub fixed_response: Option<String>,
}

/// One recorded generate() call
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub persona: String,
    pub context: Vec<ContextLine>,
}

/// Mock implementation of ExternalGenerator for testing
#[derive(Debug, Default)]
pub struct MockGenerator {
    config: RwLock<MockConfig>,
    calls: RwLock<Vec<RecordedCall>>,
}

impl MockGenerator {
    pub fn new(config: MockConfig) -> Self {
        Self {
            config: RwLock::new(config),
            calls: RwLock::new(Vec::new()),
        }
    }

    pub fn failing(error: GenerationError) -> Self {
        Self::new(MockConfig {
            fail_with: Some(error),
            ..Default::default()
        })
    }

    pub fn set_failure(&self, error: Option<GenerationError>) {
        self.config.write().fail_with = error;
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().len()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.read().clone()
    }
}

#[async_trait]
impl ExternalGenerator for MockGenerator {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn generate(&self, persona: &str, context: &[ContextLine]) -> Result<String, GenerationError> {
        self.calls.write().push(RecordedCall {
            persona: persona.to_string(),
            context: context.to_vec(),
        });

        let config = self.config.read().clone();
        if let Some(error) = config.fail_with {
            return Err(error);
        }

        Ok(config
            .fixed_response
            .unwrap_or_else(|| format!("{} says hello", persona)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_records_calls() {
        let mock = MockGenerator::default();
        let context = vec![ContextLine::new("System Log", "boot")];

        let text = mock.generate("GPT-4", &context).await.unwrap();
        assert_eq!(text, "GPT-4 says hello");
        assert_eq!(mock.call_count(), 1);
        assert_eq!(mock.calls()[0].context, context);
    }

    #[tokio::test]
    async fn test_mock_failure_toggle() {
        let mock = MockGenerator::failing(GenerationError::EmptyResponse);
        assert!(mock.generate("GPT-4", &[]).await.is_err());

        mock.set_failure(None);
        assert!(mock.generate("GPT-4", &[]).await.is_ok());
        assert_eq!(mock.call_count(), 2);
    }
}
