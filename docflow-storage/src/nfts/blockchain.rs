//! Tokens minted through an external token service
//!
//! The token service fronts the chain; this crate only speaks its REST API:
//! - `POST   {base}/tokens`               mint
//! - `GET    {base}/tokens?remoteId={id}` lookup (first entry wins)
//! - `PATCH  {base}/tokens/{tokenId}`     partial update

use async_trait::async_trait;
use docflow_common::dto::{TokenMintDto, TokenReadDto, TokenUpdateDto};
use docflow_common::AnalysisStatus;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use super::{with_status, MintRequest, NftFactory};
use crate::error::{Result, StorageError};

pub struct TokenServiceClient {
    client: Client,
    base_url: String,
}

impl TokenServiceClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn mint(&self, dto: &TokenMintDto) -> Result<TokenReadDto> {
        let url = format!("{}/tokens", self.base_url);
        debug!("POST {}", url);
        let response = self.client.post(&url).json(dto).send().await?;
        decode(response, "POST", &url).await
    }

    pub async fn find_by_remote_id(&self, remote_id: &str) -> Result<Option<TokenReadDto>> {
        let url = format!("{}/tokens", self.base_url);
        debug!("GET {}?remoteId={}", url, remote_id);
        let response = self
            .client
            .get(&url)
            .query(&[("remoteId", remote_id)])
            .send()
            .await?;
        let tokens: Vec<TokenReadDto> = decode(response, "GET", &url).await?;
        Ok(tokens.into_iter().next())
    }

    pub async fn update(&self, token_id: i64, dto: &TokenUpdateDto) -> Result<TokenReadDto> {
        let url = format!("{}/tokens/{}", self.base_url, token_id);
        debug!("PATCH {}", url);
        let response = self.client.patch(&url).json(dto).send().await?;
        decode(response, "PATCH", &url).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response, method: &str, url: &str) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(StorageError::TokenService(format!(
            "{} {} returned {}: {}",
            method, url, status, body
        )));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| StorageError::TokenService(format!("{} {}: bad response: {}", method, url, e)))
}

pub struct BlockchainNftFactory {
    client: TokenServiceClient,
}

impl BlockchainNftFactory {
    pub fn new(client: TokenServiceClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NftFactory for BlockchainNftFactory {
    async fn mint_nft(&self, request: MintRequest) -> Result<TokenReadDto> {
        self.client.mint(&request.to_mint_dto()?).await
    }

    async fn read_nft(&self, uuid: Uuid) -> Result<Option<TokenReadDto>> {
        self.client.find_by_remote_id(&uuid.to_string()).await
    }

    async fn update_nft_status(
        &self,
        uuid: Uuid,
        status: AnalysisStatus,
    ) -> Result<Option<TokenReadDto>> {
        let Some(token) = self.client.find_by_remote_id(&uuid.to_string()).await? else {
            return Ok(None);
        };

        let update = TokenUpdateDto {
            additional_data: Some(with_status(&token.additional_data, status)?),
            ..Default::default()
        };
        self.client.update(token.token_id, &update).await.map(Some)
    }

    fn backend_name(&self) -> &'static str {
        "blockchain"
    }
}
