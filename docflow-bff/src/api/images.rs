//! Document REST API
//!
//! Every route is a thin translation onto one storage-queue call. The
//! storage service answers `null` (or `false`) for unknown documents; those
//! sentinels become 404/400 here.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use docflow_common::broker::MessagePattern;
use docflow_common::dto::{
    ImageInformationDto, ImageInformationFilter, ReadImageDto, TokenReadDto,
    UpdateImageInformationDto, UploadImageDto,
};
use docflow_common::events::DocflowEvent;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

const IMAGE_NOT_FOUND: &str = "Image not found";

/// GET /images
pub async fn list_images(
    State(state): State<AppState>,
    Query(filter): Query<ImageInformationFilter>,
) -> ApiResult<Json<Vec<ImageInformationDto>>> {
    debug!("Listing documents: {:?}", filter);
    let documents = state
        .storage
        .send(MessagePattern::GetAllImageInformation, &filter)
        .await?;
    Ok(Json(documents))
}

/// GET /images/:uuid
pub async fn get_image_information(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
) -> ApiResult<Json<ImageInformationDto>> {
    state
        .storage
        .send::<_, Option<ImageInformationDto>>(MessagePattern::GetImageInformation, &uuid)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(IMAGE_NOT_FOUND.to_string()))
}

/// GET /images/:uuid/file
pub async fn get_image_file(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
) -> ApiResult<Json<ReadImageDto>> {
    state
        .storage
        .send::<_, Option<ReadImageDto>>(MessagePattern::GetImage, &uuid)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(IMAGE_NOT_FOUND.to_string()))
}

/// GET /images/:uuid/nft
pub async fn get_image_nft(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
) -> ApiResult<Json<TokenReadDto>> {
    state
        .storage
        .send::<_, Option<TokenReadDto>>(MessagePattern::GetImageNft, &uuid)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Token not found".to_string()))
}

/// POST /images
pub async fn upload_image(
    State(state): State<AppState>,
    Json(upload): Json<UploadImageDto>,
) -> ApiResult<(StatusCode, Json<ImageInformationDto>)> {
    let info = state
        .storage
        .send::<_, Option<ImageInformationDto>>(MessagePattern::UploadNewImage, &upload)
        .await?
        .ok_or_else(|| ApiError::BadRequest("The image is in the wrong format".to_string()))?;

    info!("Uploaded document {} to bundle {}", info.uuid, info.bundle_id);
    Ok((StatusCode::CREATED, Json(info)))
}

/// PUT /images/:uuid
///
/// The path uuid replaces whatever `uuid` the body carries.
pub async fn update_image_information(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
    Json(mut update): Json<UpdateImageInformationDto>,
) -> ApiResult<Json<ImageInformationDto>> {
    update.uuid = uuid;
    state
        .storage
        .send::<_, Option<ImageInformationDto>>(MessagePattern::UpdateImageInformation, &update)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(IMAGE_NOT_FOUND.to_string()))
}

/// DELETE /images/:uuid
pub async fn remove_image(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
) -> ApiResult<Json<bool>> {
    let removed: bool = state.storage.send(MessagePattern::RemoveImage, &uuid).await?;
    if !removed {
        return Err(ApiError::NotFound(IMAGE_NOT_FOUND.to_string()));
    }

    state.event_bus.emit_lossy(DocflowEvent::document_removed(uuid));
    info!("Removed document {}", uuid);
    Ok(Json(true))
}

/// PUT /images/bundles/:bundle_id
pub async fn analyze_bundle(
    State(state): State<AppState>,
    Path(bundle_id): Path<String>,
) -> ApiResult<Json<bool>> {
    let accepted: bool = state
        .storage
        .send(MessagePattern::AnalyzeBundle, &bundle_id)
        .await?;
    if !accepted {
        return Err(ApiError::NotFound("Image bundle not found".to_string()));
    }

    info!("Bundle {} queued for analysis", bundle_id);
    Ok(Json(true))
}

/// Build image routes
pub fn image_routes() -> Router<AppState> {
    Router::new()
        .route("/images", get(list_images).post(upload_image))
        .route("/images/bundles/:bundle_id", put(analyze_bundle))
        .route(
            "/images/:uuid",
            get(get_image_information)
                .put(update_image_information)
                .delete(remove_image),
        )
        .route("/images/:uuid/file", get(get_image_file))
        .route("/images/:uuid/nft", get(get_image_nft))
}
