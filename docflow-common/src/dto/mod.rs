//! Data transfer objects shared by the BFF, the storage service and the
//! analysis service
//!
//! Field names on the wire are part of the external contract; the mix of
//! camelCase and snake_case keys (`bundleId` next to `image_base64`) is
//! intentional and pinned with explicit renames.

mod images;
mod tokens;

pub use images::{
    AnalysisResultMessage, AnalyzeImageMessage, ImageInformationDto, ImageInformationFilter,
    ReadImageDto, SortField, SortOrder, UpdateImageInformationDto, UploadImageDto,
};
pub use tokens::{
    AdditionalData, TokenAssetDto, TokenHierarchyDto, TokenMetadataDto, TokenMintDto,
    TokenReadDto, TokenUpdateDto,
};
