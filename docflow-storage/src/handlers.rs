//! Consumer of the storage service queue

use async_trait::async_trait;
use docflow_common::broker::{BrokerMessage, MessageHandler, MessagePattern};
use docflow_common::dto::ImageInformationFilter;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::images::ImagesService;

/// Maps each storage-owned message pattern to an [`ImagesService`] call
#[derive(Clone)]
pub struct StorageMessageHandler {
    images: ImagesService,
}

impl StorageMessageHandler {
    pub fn new(images: ImagesService) -> Self {
        Self { images }
    }

    pub async fn dispatch(&self, message: BrokerMessage) -> Result<Value> {
        debug!("Handling {}", message.pattern);
        match message.pattern {
            MessagePattern::UploadNewImage => {
                match self.images.upload_image(message.payload()?).await {
                    Ok(info) => reply(info),
                    // Rejected uploads answer `null`; the BFF turns that into a 400
                    Err(StorageError::InvalidInput(reason)) => {
                        warn!("Upload rejected: {}", reason);
                        Ok(Value::Null)
                    }
                    Err(e) => Err(e),
                }
            }
            MessagePattern::UpdateImageInformation => {
                reply(self.images.update_image_information(message.payload()?).await?)
            }
            MessagePattern::GetAllImageInformation => {
                let filter: ImageInformationFilter = if message.data.is_null() {
                    ImageInformationFilter::default()
                } else {
                    message.payload()?
                };
                reply(self.images.get_all_image_information(&filter).await?)
            }
            MessagePattern::GetImage => {
                reply(self.images.get_image(message.payload::<Uuid>()?).await?)
            }
            MessagePattern::RemoveImage => {
                reply(self.images.remove_image(message.payload::<Uuid>()?).await?)
            }
            MessagePattern::PublishAnalysis => {
                reply(self.images.save_analysis_result(message.payload()?).await?)
            }
            MessagePattern::GetImageInformation => {
                reply(self.images.get_image_information(message.payload::<Uuid>()?).await?)
            }
            MessagePattern::GetImageNft => {
                reply(self.images.get_image_nft(message.payload::<Uuid>()?).await?)
            }
            MessagePattern::AnalyzeBundle => {
                let bundle_id: String = message.payload()?;
                reply(self.images.analyze_image_bundle(&bundle_id).await?)
            }
            MessagePattern::RefreshAnalysis => Err(StorageError::InvalidInput(format!(
                "{} is not handled by the storage service",
                message.pattern
            ))),
        }
    }
}

fn reply<T: Serialize>(value: T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| StorageError::Common(e.into()))
}

#[async_trait]
impl MessageHandler for StorageMessageHandler {
    async fn handle(&self, message: BrokerMessage) -> docflow_common::Result<Value> {
        self.dispatch(message).await.map_err(Into::into)
    }
}
