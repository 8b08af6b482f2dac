//! Outbound messages from the storage service to the DAS and the BFF

use docflow_common::broker::{BrokerClient, MessagePattern};
use docflow_common::dto::AnalyzeImageMessage;
use docflow_common::DocumentTypeId;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::error::Result;

#[derive(Clone)]
pub struct AnalysisDispatcher {
    das: BrokerClient,
    bff: BrokerClient,
}

impl AnalysisDispatcher {
    pub fn new(das: BrokerClient, bff: BrokerClient) -> Self {
        Self { das, bff }
    }

    /// Hand one document to the DAS for analysis
    pub async fn send_image_to_analysis_service(
        &self,
        uuid: Uuid,
        image_base64: String,
        bundle_id: &str,
        document_type: DocumentTypeId,
    ) -> Result<()> {
        let message = AnalyzeImageMessage {
            uuid,
            image_base64,
            bundle_id: bundle_id.to_string(),
            document_type,
        };
        self.das.emit(MessagePattern::UploadNewImage, &message).await?;
        info!("Sent document {} (bundle {}) to {}", uuid, bundle_id, self.das.queue());
        Ok(())
    }

    /// Ask the BFF to refresh its clients' document tables
    pub async fn send_refresh_to_bff(&self) -> Result<()> {
        self.bff.emit(MessagePattern::RefreshAnalysis, &json!({})).await?;
        Ok(())
    }
}
