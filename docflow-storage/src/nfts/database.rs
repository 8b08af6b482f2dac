//! Token records kept in the service's own database

use async_trait::async_trait;
use docflow_common::config::NftConfig;
use docflow_common::dto::{TokenReadDto, TokenUpdateDto};
use docflow_common::AnalysisStatus;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{with_status, MintRequest, NftFactory};
use crate::db::nfts::{self, NewNft};
use crate::error::Result;

pub struct DatabaseNftFactory {
    pool: SqlitePool,
    owner_address: String,
    minter_address: String,
    token_address: String,
}

impl DatabaseNftFactory {
    pub fn new(pool: SqlitePool, config: &NftConfig) -> Self {
        Self {
            pool,
            owner_address: config.owner_address.clone(),
            minter_address: config.minter_address.clone(),
            token_address: config.token_address.clone(),
        }
    }
}

#[async_trait]
impl NftFactory for DatabaseNftFactory {
    async fn mint_nft(&self, request: MintRequest) -> Result<TokenReadDto> {
        let mint = request.to_mint_dto()?;
        let record = nfts::insert_nft(
            &self.pool,
            &NewNft {
                remote_id: mint.remote_id,
                owner_address: self.owner_address.clone(),
                minter_address: self.minter_address.clone(),
                token_address: self.token_address.clone(),
                asset_uri: mint.asset.uri,
                asset_hash: mint.asset.hash,
                metadata_uri: mint.metadata.uri,
                metadata_hash: mint.metadata.hash,
                additional_data: mint.additional_data,
            },
        )
        .await?;
        Ok(record.to_dto())
    }

    async fn read_nft(&self, uuid: Uuid) -> Result<Option<TokenReadDto>> {
        let record = nfts::load_nft_by_remote_id(&self.pool, &uuid.to_string()).await?;
        Ok(record.map(|r| r.to_dto()))
    }

    async fn update_nft_status(
        &self,
        uuid: Uuid,
        status: AnalysisStatus,
    ) -> Result<Option<TokenReadDto>> {
        let remote_id = uuid.to_string();
        let Some(record) = nfts::load_nft_by_remote_id(&self.pool, &remote_id).await? else {
            return Ok(None);
        };

        let update = TokenUpdateDto {
            additional_data: Some(with_status(&record.additional_data, status)?),
            ..Default::default()
        };
        let updated = nfts::update_nft(&self.pool, &remote_id, &update).await?;
        Ok(updated.map(|r| r.to_dto()))
    }

    fn backend_name(&self) -> &'static str {
        "database"
    }
}
