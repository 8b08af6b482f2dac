//! NFT records that fingerprint analyzed documents
//!
//! A token ties a document's original (asset) and its analysis result
//! (metadata) to SHA-256 hashes, plus the current analysis status. Where
//! tokens live is pluggable through [`NftFactory`]:
//! - [`DatabaseNftFactory`]: the local `nfts` table
//! - [`BlockchainNftFactory`]: an external token service over HTTP

mod blockchain;
mod database;

pub use blockchain::{BlockchainNftFactory, TokenServiceClient};
pub use database::DatabaseNftFactory;

use async_trait::async_trait;
use docflow_common::config::{NftBackend, NftConfig};
use docflow_common::dto::{
    AdditionalData, AnalysisResultMessage, ReadImageDto, TokenAssetDto, TokenMetadataDto,
    TokenMintDto, TokenReadDto,
};
use docflow_common::integrity::hash_data;
use docflow_common::{AnalysisStatus, DocumentTypeId};
use serde_json::Value;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::images::ImageInformation;
use crate::error::{Result, StorageError};

/// Everything needed to mint a token for one analyzed document
#[derive(Debug, Clone)]
pub struct MintRequest {
    pub remote_id: Uuid,
    pub analysis_status: AnalysisStatus,
    pub document_type: DocumentTypeId,
    pub image_base64: String,
    pub image_uri: String,
    pub analysis_result: Value,
    pub analysis_result_uri: String,
}

impl MintRequest {
    /// Hashes are taken over the base64 text and the compact JSON text
    pub fn to_mint_dto(&self) -> Result<TokenMintDto> {
        let analysis_result_text = serde_json::to_string(&self.analysis_result)
            .map_err(docflow_common::Error::from)?;
        let additional_data = AdditionalData {
            analysis_status: self.analysis_status,
            document_type: self.document_type,
        };

        Ok(TokenMintDto {
            remote_id: self.remote_id.to_string(),
            asset: TokenAssetDto {
                uri: self.image_uri.clone(),
                hash: hash_data(&self.image_base64),
            },
            metadata: TokenMetadataDto {
                uri: self.analysis_result_uri.clone(),
                hash: hash_data(analysis_result_text),
            },
            additional_data: additional_data.to_json()?,
            parent_ids: Vec::new(),
        })
    }
}

#[async_trait]
pub trait NftFactory: Send + Sync {
    async fn mint_nft(&self, request: MintRequest) -> Result<TokenReadDto>;

    /// `None` when no token was minted for `uuid`
    async fn read_nft(&self, uuid: Uuid) -> Result<Option<TokenReadDto>>;

    /// Rewrite the status inside `additionalData`; `None` when no token exists
    async fn update_nft_status(
        &self,
        uuid: Uuid,
        status: AnalysisStatus,
    ) -> Result<Option<TokenReadDto>>;

    fn backend_name(&self) -> &'static str;
}

/// Replace the status inside a token's `additionalData` text
pub(crate) fn with_status(additional_data: &str, status: AnalysisStatus) -> Result<String> {
    let mut data = AdditionalData::from_json(additional_data)?;
    data.analysis_status = status;
    Ok(data.to_json()?)
}

/// Build the factory selected by `nft.backend`
pub fn nft_factory_from_config(
    config: &NftConfig,
    pool: SqlitePool,
    timeout: Duration,
) -> Result<Arc<dyn NftFactory>> {
    let factory: Arc<dyn NftFactory> = match config.backend {
        NftBackend::Database => Arc::new(DatabaseNftFactory::new(pool, config)),
        NftBackend::Blockchain => {
            let url = config.token_service_url.as_deref().ok_or_else(|| {
                StorageError::Common(docflow_common::Error::Config(
                    "nft.token_service_url is required for the blockchain backend".to_string(),
                ))
            })?;
            Arc::new(BlockchainNftFactory::new(TokenServiceClient::new(url, timeout)?))
        }
    };
    info!("NFT backend: {}", factory.backend_name());
    Ok(factory)
}

#[derive(Clone)]
pub struct NftsService {
    factory: Arc<dyn NftFactory>,
}

impl NftsService {
    pub fn new(factory: Arc<dyn NftFactory>) -> Self {
        Self { factory }
    }

    /// Mint a token for a freshly analyzed document
    ///
    /// Re-analysis of a document that already has a token updates that
    /// token's status instead of minting a second one.
    pub async fn create_nft(
        &self,
        result: &AnalysisResultMessage,
        info: &ImageInformation,
        stored_image: &ReadImageDto,
    ) -> Result<TokenReadDto> {
        if let Some(existing) = self.factory.read_nft(result.uuid).await? {
            debug!("Token {} exists for {}, updating status", existing.token_id, result.uuid);
            let updated = self
                .factory
                .update_nft_status(result.uuid, info.analysis_status)
                .await?;
            return Ok(updated.unwrap_or(existing));
        }

        let request = MintRequest {
            remote_id: result.uuid,
            analysis_status: info.analysis_status,
            document_type: info.document_type,
            image_base64: stored_image.image_base64.clone(),
            image_uri: crate::blobs::blob_key(stored_image.uuid, stored_image.document_upload_type),
            analysis_result: result.image_analysis_result.clone(),
            analysis_result_uri: info.uuid.to_string(),
        };
        let token = self.factory.mint_nft(request).await?;
        info!("Minted token {} for document {}", token.token_id, result.uuid);
        Ok(token)
    }

    pub async fn read_nft(&self, uuid: Uuid) -> Result<Option<TokenReadDto>> {
        self.factory.read_nft(uuid).await
    }

    /// Mirror a status change onto the document's token, if it has one
    pub async fn update_nft(&self, info: &ImageInformation) -> Result<Option<TokenReadDto>> {
        if self.factory.read_nft(info.uuid).await?.is_none() {
            return Ok(None);
        }
        self.factory
            .update_nft_status(info.uuid, info.analysis_status)
            .await
    }
}
