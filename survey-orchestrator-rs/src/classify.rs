// survey-orchestrator-rs/src/classify.rs
// Classifier seams and their adapters over the vision-sdk clients

use async_trait::async_trait;
use bytes::Bytes;
use vision_sdk::detector::DetectResponse;
use vision_sdk::{DetectorClient, GeminiClient};

use crate::assessment::{assessment_prompt, parse_assessment, AssessmentResult};
use crate::error::ClassifyError;

/// Produces a single categorical tag for a panorama
#[async_trait]
pub trait LabelClassifier: Send + Sync {
    async fn label(&self, jpeg: &Bytes) -> Result<String, ClassifyError>;
}

/// Produces a structured assessment for a panorama
#[async_trait]
pub trait AssessmentClassifier: Send + Sync {
    async fn assess(&self, jpeg: &Bytes) -> Result<AssessmentResult, ClassifyError>;
}

/// Top-1 label from the object detection service
pub struct DetectorLabelAdapter {
    client: DetectorClient,
}

impl DetectorLabelAdapter {
    pub fn new(client: DetectorClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LabelClassifier for DetectorLabelAdapter {
    async fn label(&self, jpeg: &Bytes) -> Result<String, ClassifyError> {
        let predictions = self.client.predict(jpeg.clone()).await?;
        let response = DetectResponse { predictions };

        response
            .top()
            .map(|prediction| prediction.label.clone())
            .ok_or_else(|| ClassifyError::EmptyResult("detector returned no predictions".to_string()))
    }
}

/// Street assessment from the generative vision model
pub struct GeminiAssessmentAdapter {
    client: GeminiClient,
    prompt: String,
}

impl GeminiAssessmentAdapter {
    /// Build the adapter with the justification written in `response_language`
    pub fn new(client: GeminiClient, response_language: &str) -> Self {
        Self {
            client,
            prompt: assessment_prompt(response_language),
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }
}

#[async_trait]
impl AssessmentClassifier for GeminiAssessmentAdapter {
    async fn assess(&self, jpeg: &Bytes) -> Result<AssessmentResult, ClassifyError> {
        let reply = self.client.generate_with_image(&self.prompt, jpeg).await?;
        log::trace!("Assessment reply: {}", vision_sdk::util::truncate_string(&reply, 200));
        parse_assessment(&reply)
    }
}
