use std::collections::HashMap;

use crate::classification::{Classification, Classifications};
use crate::errors::{Result, SentimentCsvError};
use crate::traits::SentimentModel;

/// Scripted sentiment model for tests.
///
/// Known texts get their configured (label, probability); anything else gets
/// the fallback. Remaining probability mass is split evenly over the other
/// labels so the result stays a proper distribution.
#[derive(Debug, Clone)]
pub struct MockSentimentModel {
    labels: Vec<String>,
    responses: HashMap<String, (String, f32)>,
    fallback: (String, f32),
    fail_on_call: Option<usize>,
    calls: usize,
}

impl MockSentimentModel {
    pub fn new() -> Self {
        Self {
            labels: vec!["NEGATIVE".to_string(), "POSITIVE".to_string()],
            responses: HashMap::new(),
            fallback: ("POSITIVE".to_string(), 0.5),
            fail_on_call: None,
            calls: 0,
        }
    }

    pub fn with_response(mut self, text: &str, label: &str, probability: f32) -> Self {
        self.responses
            .insert(text.to_string(), (label.to_string(), probability));
        self
    }

    pub fn with_fallback(mut self, label: &str, probability: f32) -> Self {
        self.fallback = (label.to_string(), probability);
        self
    }

    /// Makes the `n`-th call to `classify` (1-based) fail with an inference error.
    pub fn failing_on_call(mut self, n: usize) -> Self {
        self.fail_on_call = Some(n);
        self
    }

    pub const fn calls(&self) -> usize {
        self.calls
    }
}

impl Default for MockSentimentModel {
    fn default() -> Self {
        Self::new()
    }
}

impl SentimentModel for MockSentimentModel {
    fn classify(&mut self, text: &str) -> Result<Classifications> {
        self.calls += 1;
        if self.fail_on_call == Some(self.calls) {
            return Err(SentimentCsvError::inference(
                "mock classify",
                format!("injected failure on call {}", self.calls),
            ));
        }

        let (label, probability) = self.responses.get(text).unwrap_or(&self.fallback);
        let others = self.labels.iter().filter(|l| *l != label).count();
        let rest = if others == 0 {
            0.0
        } else {
            (1.0 - probability) / others as f32
        };

        let items = self
            .labels
            .iter()
            .filter(|l| *l != label)
            .map(|l| Classification::new(l.clone(), rest))
            .chain(std::iter::once(Classification::new(label.clone(), *probability)))
            .collect();
        Ok(Classifications::new(items))
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }
}

/// Mock preloaded with the two-review scenario used across the tests.
pub fn create_mock_model() -> MockSentimentModel {
    MockSentimentModel::new()
        .with_response("great product", "POSITIVE", 0.97)
        .with_response("terrible", "NEGATIVE", 0.88)
}
