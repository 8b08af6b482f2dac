//! Document lifecycle: upload, review, removal and analysis
//!
//! Rows live in `image_information`, originals in the [`BlobStore`], and
//! every document that finishes analysis gets a token through
//! [`NftsService`].

use base64::{engine::general_purpose::STANDARD, Engine as _};
use docflow_common::dto::{
    AnalysisResultMessage, ImageInformationDto, ImageInformationFilter, ReadImageDto,
    TokenReadDto, UpdateImageInformationDto, UploadImageDto,
};
use docflow_common::time;
use docflow_common::types::{strip_data_url, ANALYSIS_INITIAL_RESULT, DEFAULT_BUNDLE_ID};
use docflow_common::AnalysisStatus;
use serde_json::Value;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::blobs::{blob_key, BlobStore};
use crate::db::images::{self as repo, ImageInformation};
use crate::dispatch::AnalysisDispatcher;
use crate::error::{Result, StorageError};
use crate::nfts::NftsService;

#[derive(Clone)]
pub struct ImagesService {
    pool: SqlitePool,
    blobs: Arc<dyn BlobStore>,
    dispatcher: AnalysisDispatcher,
    nfts: NftsService,
}

impl ImagesService {
    pub fn new(
        pool: SqlitePool,
        blobs: Arc<dyn BlobStore>,
        dispatcher: AnalysisDispatcher,
        nfts: NftsService,
    ) -> Self {
        Self {
            pool,
            blobs,
            dispatcher,
            nfts,
        }
    }

    /// Stored original as base64; `None` for an unknown document
    pub async fn get_image(&self, uuid: Uuid) -> Result<Option<ReadImageDto>> {
        let Some(info) = repo::load_image_information(&self.pool, uuid).await? else {
            return Ok(None);
        };
        let data = self.blobs.get(&blob_key(uuid, info.upload_type)).await?;

        Ok(Some(ReadImageDto {
            uuid,
            image_base64: STANDARD.encode(data),
            document_upload_type: info.upload_type,
        }))
    }

    pub async fn get_image_information(&self, uuid: Uuid) -> Result<Option<ImageInformationDto>> {
        repo::load_image_information(&self.pool, uuid)
            .await?
            .map(|info| info.to_dto())
            .transpose()
    }

    pub async fn get_image_nft(&self, uuid: Uuid) -> Result<Option<TokenReadDto>> {
        self.nfts.read_nft(uuid).await
    }

    pub async fn get_all_image_information(
        &self,
        filter: &ImageInformationFilter,
    ) -> Result<Vec<ImageInformationDto>> {
        repo::list_image_information(&self.pool, filter)
            .await?
            .iter()
            .map(ImageInformation::to_dto)
            .collect()
    }

    /// Store a new document as PENDING in its bundle
    ///
    /// Undecodable payloads are rejected with [`StorageError::InvalidInput`].
    pub async fn upload_image(&self, dto: UploadImageDto) -> Result<ImageInformationDto> {
        let upload_type = dto.document_upload_type.unwrap_or_default();
        let document_type = dto.document_type.unwrap_or_default();
        let bundle_id = dto
            .bundle_id
            .filter(|b| !b.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BUNDLE_ID.to_string());

        let encoded = strip_data_url(&dto.image_base64).trim();
        let data = STANDARD
            .decode(encoded)
            .map_err(|e| StorageError::InvalidInput(format!("Image is not valid base64: {}", e)))?;
        if data.is_empty() {
            return Err(StorageError::InvalidInput("Image is empty".to_string()));
        }

        let uuid = Uuid::new_v4();
        self.blobs.put(&blob_key(uuid, upload_type), data).await?;

        let now = time::now();
        let info = ImageInformation {
            uuid,
            sender: None,
            receiver: None,
            creation_date: now,
            last_modified: now,
            upload_type,
            analysis_status: AnalysisStatus::Pending,
            document_type,
            bundle_id,
            image_analysis_result: ANALYSIS_INITIAL_RESULT.to_string(),
        };
        repo::save_image_information(&self.pool, &info).await?;

        info!("Stored document {} in bundle {}", uuid, info.bundle_id);
        info.to_dto()
    }

    /// Apply a reviewer's correction; `None` for an unknown document
    pub async fn update_image_information(
        &self,
        dto: UpdateImageInformationDto,
    ) -> Result<Option<ImageInformationDto>> {
        let Some(mut info) = repo::load_image_information(&self.pool, dto.uuid).await? else {
            return Ok(None);
        };

        info.image_analysis_result = result_text(&dto.image_analysis_result)?;
        if dto.image_analysis_result.get("sender_information").is_some() {
            (info.sender, info.receiver) = parties(&dto.image_analysis_result);
        }
        info.analysis_status = dto.analysis_status;
        info.document_type = dto.document_type;
        if let Some(bundle_id) = dto.bundle_id.filter(|b| !b.trim().is_empty()) {
            info.bundle_id = bundle_id;
        }
        info.last_modified = time::now();
        repo::save_image_information(&self.pool, &info).await?;

        if let Err(e) = self.nfts.update_nft(&info).await {
            warn!("Token of document {} not updated: {}", info.uuid, e);
        }

        info.to_dto().map(Some)
    }

    /// Delete a document's original and row; `false` for an unknown document
    pub async fn remove_image(&self, uuid: Uuid) -> Result<bool> {
        let Some(info) = repo::load_image_information(&self.pool, uuid).await? else {
            return Ok(false);
        };

        match self.blobs.delete(&blob_key(uuid, info.upload_type)).await {
            Ok(()) => {}
            Err(StorageError::BlobNotFound(key)) => warn!("Blob {} was already gone", key),
            Err(e) => return Err(e),
        }
        repo::remove_image_information(&self.pool, uuid).await?;

        info!("Removed document {}", uuid);
        Ok(true)
    }

    /// Send every PENDING document of a bundle to the DAS
    ///
    /// `false` when the bundle has no documents at all.
    pub async fn analyze_image_bundle(&self, bundle_id: &str) -> Result<bool> {
        let documents =
            repo::list_image_information(&self.pool, &ImageInformationFilter::for_bundle(bundle_id, None))
                .await?;
        if documents.is_empty() {
            return Ok(false);
        }

        let pending = documents
            .into_iter()
            .filter(|d| d.analysis_status == AnalysisStatus::Pending);
        let mut sent = 0;
        for mut info in pending {
            let data = self.blobs.get(&blob_key(info.uuid, info.upload_type)).await?;
            self.dispatcher
                .send_image_to_analysis_service(
                    info.uuid,
                    STANDARD.encode(data),
                    &info.bundle_id,
                    info.document_type,
                )
                .await?;

            info.analysis_status = AnalysisStatus::InProgress;
            info.last_modified = time::now();
            repo::save_image_information(&self.pool, &info).await?;
            sent += 1;
        }

        info!("Bundle {}: {} document(s) sent for analysis", bundle_id, sent);
        Ok(true)
    }

    /// Record the DAS's verdict for one document
    ///
    /// A result carrying `error_details` marks the document FAILED. The
    /// refresh and the token are best effort: their failures are logged and
    /// the saved row stands.
    pub async fn save_analysis_result(
        &self,
        message: AnalysisResultMessage,
    ) -> Result<Option<ImageInformationDto>> {
        let Some(stored_image) = self.get_image(message.uuid).await? else {
            warn!("Analysis result for unknown document {}", message.uuid);
            return Ok(None);
        };
        let Some(mut info) = repo::load_image_information(&self.pool, message.uuid).await? else {
            return Ok(None);
        };

        let result = &message.image_analysis_result;
        if result.get("error_details").is_some() {
            info.analysis_status = AnalysisStatus::Failed;
        } else {
            info.analysis_status = AnalysisStatus::Finished;
            (info.sender, info.receiver) = parties(result);
        }
        info.image_analysis_result = result_text(result)?;
        info.last_modified = time::now();
        repo::save_image_information(&self.pool, &info).await?;
        info!("Document {} analysis {}", info.uuid, info.analysis_status);

        if let Err(e) = self.dispatcher.send_refresh_to_bff().await {
            warn!("Refresh notification failed: {}", e);
        }
        if let Err(e) = self.nfts.create_nft(&message, &info, &stored_image).await {
            error!("Token for document {} not created: {}", info.uuid, e);
        }

        info.to_dto().map(Some)
    }
}

fn result_text(result: &Value) -> Result<String> {
    serde_json::to_string(result).map_err(|e| StorageError::Common(e.into()))
}

/// Sender and receiver company names from an analysis result
fn parties(result: &Value) -> (Option<String>, Option<String>) {
    let name = |section: &str, field: &str| {
        result
            .get(section)
            .and_then(|s| s.get(field))
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    (
        name("sender_information", "senderNameCompany"),
        name("consignee_information", "consigneeNameCompany"),
    )
}
