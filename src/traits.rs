use crate::classification::Classifications;
use crate::errors::Result;

/// Sentiment classifier used by the row pipeline.
///
/// The pipeline depends on this trait rather than on the ONNX model so it can
/// be driven by mocks in tests. `classify` takes `&mut self`: a handle serves a
/// single caller, one inference at a time.
pub trait SentimentModel {
    /// Classifies one text and returns every label ranked by probability.
    fn classify(&mut self, text: &str) -> Result<Classifications>;

    /// Labels the model can emit, in logit order.
    fn labels(&self) -> &[String];
}
