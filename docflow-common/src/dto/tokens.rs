//! Token (NFT) DTOs
//!
//! Shapes follow the token service's REST contract so the blockchain-backed
//! factory can pass them through unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AnalysisStatus, DocumentTypeId};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAssetDto {
    pub uri: String,
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadataDto {
    pub uri: String,
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenHierarchyDto {
    pub active: bool,
    pub parent_ids: Vec<i64>,
    pub child_ids: Vec<i64>,
}

/// Token as returned to the UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenReadDto {
    /// Document uuid the token was minted for
    pub remote_id: String,
    pub asset: TokenAssetDto,
    pub metadata: TokenMetadataDto,
    /// JSON text, see [`AdditionalData`]
    pub additional_data: String,
    pub hierarchy: TokenHierarchyDto,
    pub owner_address: String,
    pub minter_address: String,
    pub created_on: DateTime<Utc>,
    pub last_updated_on: DateTime<Utc>,
    pub token_id: i64,
    pub token_address: String,
}

/// Request to mint a new token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenMintDto {
    pub remote_id: String,
    pub asset: TokenAssetDto,
    pub metadata: TokenMetadataDto,
    pub additional_data: String,
    #[serde(default)]
    pub parent_ids: Vec<i64>,
}

/// Partial token update; absent fields stay unchanged
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUpdateDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_data: Option<String>,
}

/// Structured form of a token's `additionalData` text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalData {
    pub analysis_status: AnalysisStatus,
    pub document_type: DocumentTypeId,
}

impl AdditionalData {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| Error::InvalidInput(format!("Malformed token additional data: {}", e)))
    }
}
