//! Classifier collaborator interface
//!
//! The detection model is a black box behind the [`Classifier`] trait: it
//! takes a decoded frame and a confidence threshold and returns labeled
//! detections. The crate ships no model backend; deployments plug one in
//! by implementing the trait for their runtime of choice.

use crate::core::classes;
use crate::core::Frame;
use crate::error::InferenceError;

/// One detected region: a class and how sure the model is about it.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// COCO class id
    pub class_id: u16,
    /// Human-readable class label
    pub label: String,
    /// Model confidence in [0, 1]
    pub confidence: f32,
}

impl Detection {
    /// Build a detection from a class id, resolving the label from the COCO table
    pub fn new(class_id: u16, confidence: f32) -> Self {
        let label = classes::class_name(class_id)
            .map(str::to_string)
            .unwrap_or_else(|| format!("class-{class_id}"));
        Self {
            class_id,
            label,
            confidence,
        }
    }
}

/// Black-box detection model.
///
/// Must be safe to call once per frame at the stream's cadence and return
/// promptly; a hung classifier stalls the whole pipeline.
pub trait Classifier: Send {
    /// Run inference on one frame.
    ///
    /// `confidence_threshold` is a hint the backend may use to prune its
    /// output early; the caller applies the authoritative strict-`>` check.
    fn infer(
        &mut self,
        frame: &Frame,
        confidence_threshold: f32,
    ) -> Result<Vec<Detection>, InferenceError>;
}

/// Placeholder backend that never detects anything.
///
/// Lets the server run end-to-end without a model; every frame comes back
/// clean. The server logs a warning at startup when this is in use.
pub struct NullClassifier;

impl Classifier for NullClassifier {
    fn infer(
        &mut self,
        _frame: &Frame,
        _confidence_threshold: f32,
    ) -> Result<Vec<Detection>, InferenceError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
pub mod testing {
    //! Canned classifiers for exercising the verifier without a model

    use super::*;

    /// Always returns the same detection set
    pub struct FixedClassifier {
        pub detections: Vec<Detection>,
    }

    impl Classifier for FixedClassifier {
        fn infer(
            &mut self,
            _frame: &Frame,
            _confidence_threshold: f32,
        ) -> Result<Vec<Detection>, InferenceError> {
            Ok(self.detections.clone())
        }
    }

    /// Always fails, for exercising the recovery path
    pub struct FailingClassifier;

    impl Classifier for FailingClassifier {
        fn infer(
            &mut self,
            _frame: &Frame,
            _confidence_threshold: f32,
        ) -> Result<Vec<Detection>, InferenceError> {
            Err(InferenceError("model exploded".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_label_resolution() {
        let det = Detection::new(16, 0.9);
        assert_eq!(det.label, "dog");

        let unknown = Detection::new(999, 0.9);
        assert_eq!(unknown.label, "class-999");
    }
}
