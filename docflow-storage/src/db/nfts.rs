//! `nfts` table access, used by the database-backed NFT factory

use chrono::{DateTime, Utc};
use docflow_common::dto::{
    TokenAssetDto, TokenHierarchyDto, TokenMetadataDto, TokenReadDto, TokenUpdateDto,
};
use docflow_common::time::{self, parse_rfc3339, to_db_string};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::error::{Result, StorageError};

const COLUMNS: &str = "id, remote_id, owner_address, minter_address, token_address, \
                       created_on, last_updated_on, asset_uri, asset_hash, \
                       metadata_uri, metadata_hash, additional_data";

#[derive(Debug, Clone, PartialEq)]
pub struct NftRecord {
    pub id: i64,
    pub remote_id: String,
    pub owner_address: String,
    pub minter_address: String,
    pub token_address: String,
    pub created_on: DateTime<Utc>,
    pub last_updated_on: DateTime<Utc>,
    pub asset_uri: String,
    pub asset_hash: String,
    pub metadata_uri: String,
    pub metadata_hash: String,
    pub additional_data: String,
}

/// Fields supplied when minting; id and timestamps are assigned on insert
#[derive(Debug, Clone)]
pub struct NewNft {
    pub remote_id: String,
    pub owner_address: String,
    pub minter_address: String,
    pub token_address: String,
    pub asset_uri: String,
    pub asset_hash: String,
    pub metadata_uri: String,
    pub metadata_hash: String,
    pub additional_data: String,
}

impl NftRecord {
    pub fn to_dto(&self) -> TokenReadDto {
        TokenReadDto {
            remote_id: self.remote_id.clone(),
            asset: TokenAssetDto {
                uri: self.asset_uri.clone(),
                hash: self.asset_hash.clone(),
            },
            metadata: TokenMetadataDto {
                uri: self.metadata_uri.clone(),
                hash: self.metadata_hash.clone(),
            },
            additional_data: self.additional_data.clone(),
            hierarchy: TokenHierarchyDto {
                active: true,
                parent_ids: Vec::new(),
                child_ids: Vec::new(),
            },
            owner_address: self.owner_address.clone(),
            minter_address: self.minter_address.clone(),
            created_on: self.created_on,
            last_updated_on: self.last_updated_on,
            token_id: self.id,
            token_address: self.token_address.clone(),
        }
    }
}

pub async fn insert_nft(pool: &SqlitePool, nft: &NewNft) -> Result<NftRecord> {
    let now = time::now();
    let result = sqlx::query(
        r#"
        INSERT INTO nfts (
            remote_id, owner_address, minter_address, token_address,
            created_on, last_updated_on, asset_uri, asset_hash,
            metadata_uri, metadata_hash, additional_data
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&nft.remote_id)
    .bind(&nft.owner_address)
    .bind(&nft.minter_address)
    .bind(&nft.token_address)
    .bind(to_db_string(&now))
    .bind(to_db_string(&now))
    .bind(&nft.asset_uri)
    .bind(&nft.asset_hash)
    .bind(&nft.metadata_uri)
    .bind(&nft.metadata_hash)
    .bind(&nft.additional_data)
    .execute(pool)
    .await?;

    Ok(NftRecord {
        id: result.last_insert_rowid(),
        remote_id: nft.remote_id.clone(),
        owner_address: nft.owner_address.clone(),
        minter_address: nft.minter_address.clone(),
        token_address: nft.token_address.clone(),
        created_on: now,
        last_updated_on: now,
        asset_uri: nft.asset_uri.clone(),
        asset_hash: nft.asset_hash.clone(),
        metadata_uri: nft.metadata_uri.clone(),
        metadata_hash: nft.metadata_hash.clone(),
        additional_data: nft.additional_data.clone(),
    })
}

pub async fn load_nft_by_remote_id(pool: &SqlitePool, remote_id: &str) -> Result<Option<NftRecord>> {
    let row = sqlx::query(&format!("SELECT {} FROM nfts WHERE remote_id = ?", COLUMNS))
        .bind(remote_id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(row_to_nft).transpose()
}

/// Apply the set fields of `update`; `None` when no token has `remote_id`
pub async fn update_nft(
    pool: &SqlitePool,
    remote_id: &str,
    update: &TokenUpdateDto,
) -> Result<Option<NftRecord>> {
    let result = sqlx::query(
        r#"
        UPDATE nfts SET
            asset_uri = COALESCE(?, asset_uri),
            asset_hash = COALESCE(?, asset_hash),
            metadata_uri = COALESCE(?, metadata_uri),
            metadata_hash = COALESCE(?, metadata_hash),
            additional_data = COALESCE(?, additional_data),
            last_updated_on = ?
        WHERE remote_id = ?
        "#,
    )
    .bind(&update.asset_uri)
    .bind(&update.asset_hash)
    .bind(&update.metadata_uri)
    .bind(&update.metadata_hash)
    .bind(&update.additional_data)
    .bind(to_db_string(&time::now()))
    .bind(remote_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    load_nft_by_remote_id(pool, remote_id).await
}

fn row_to_nft(row: &SqliteRow) -> Result<NftRecord> {
    let id: i64 = row.try_get("id")?;
    let timestamp = |column: &str| -> Result<DateTime<Utc>> {
        let text: String = row.try_get(column)?;
        parse_rfc3339(&text).map_err(|e| StorageError::corrupt(id, format!("{}: {}", column, e)))
    };

    Ok(NftRecord {
        id,
        remote_id: row.try_get("remote_id")?,
        owner_address: row.try_get("owner_address")?,
        minter_address: row.try_get("minter_address")?,
        token_address: row.try_get("token_address")?,
        created_on: timestamp("created_on")?,
        last_updated_on: timestamp("last_updated_on")?,
        asset_uri: row.try_get("asset_uri")?,
        asset_hash: row.try_get("asset_hash")?,
        metadata_uri: row.try_get("metadata_uri")?,
        metadata_hash: row.try_get("metadata_hash")?,
        additional_data: row.try_get("additional_data")?,
    })
}
