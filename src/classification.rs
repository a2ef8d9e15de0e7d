/// A single (label, probability) pair produced by a classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: String,
    pub probability: f32,
}

impl Classification {
    pub fn new(label: impl Into<String>, probability: f32) -> Self {
        Self {
            label: label.into(),
            probability,
        }
    }

    /// Probability as a percentage string with two decimals, e.g. `97.00%`.
    pub fn confidence(&self) -> String {
        format_confidence(self.probability)
    }
}

/// Ranked classification result, highest probability first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classifications {
    ranked: Vec<Classification>,
}

impl Classifications {
    /// Builds a result from unordered pairs. Ties keep their input order.
    pub fn new(mut items: Vec<Classification>) -> Self {
        items.sort_by(|a, b| b.probability.total_cmp(&a.probability));
        Self { ranked: items }
    }

    /// Turns raw logits into softmax probabilities paired with `labels`.
    ///
    /// Extra logits without a label are named `LABEL_<index>`.
    pub fn from_logits(logits: &[f32], labels: &[String]) -> Self {
        let probabilities = softmax(logits);
        let items = probabilities
            .into_iter()
            .enumerate()
            .map(|(i, p)| {
                let label = labels
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| format!("LABEL_{i}"));
                Classification::new(label, p)
            })
            .collect();
        Self::new(items)
    }

    pub fn best(&self) -> Option<&Classification> {
        self.ranked.first()
    }

    pub fn items(&self) -> &[Classification] {
        &self.ranked
    }

    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }
}

pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Formats a probability in `[0, 1]` as `NN.NN%`.
///
/// Finite out-of-range values are clamped; NaN is not, and must be rejected
/// before formatting.
pub fn format_confidence(probability: f32) -> String {
    let percent = f64::from(probability.clamp(0.0, 1.0)) * 100.0;
    format!("{percent:.2}%")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Vec<String> {
        vec!["NEGATIVE".to_string(), "POSITIVE".to_string()]
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
    }

    #[test]
    fn test_softmax_large_logits_stay_finite() {
        let probs = softmax(&[1000.0, 1000.0]);
        assert!((probs[0] - 0.5).abs() < 1e-6);
        assert!((probs[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_from_logits_ranks_descending() {
        let result = Classifications::from_logits(&[-2.5, 3.1], &labels());
        assert_eq!(result.len(), 2);

        let best = result.best().unwrap();
        assert_eq!(best.label, "POSITIVE");
        assert!(best.probability > 0.99);
        assert_eq!(result.items()[1].label, "NEGATIVE");
    }

    #[test]
    fn test_from_logits_names_unlabelled_classes() {
        let result = Classifications::from_logits(&[0.0, 0.0, 5.0], &labels());
        assert_eq!(result.best().unwrap().label, "LABEL_2");
    }

    #[test]
    fn test_empty_result_has_no_best() {
        let result = Classifications::new(vec![]);
        assert!(result.is_empty());
        assert!(result.best().is_none());
    }

    #[test]
    fn test_format_confidence() {
        let cases = vec![
            (0.97_f32, "97.00%"),
            (0.88, "88.00%"),
            (1.0, "100.00%"),
            (0.0, "0.00%"),
            (0.12345, "12.35%"),
            (1.5, "100.00%"),
            (-0.1, "0.00%"),
        ];

        for (probability, expected) in cases {
            assert_eq!(format_confidence(probability), expected);
        }
    }
}
