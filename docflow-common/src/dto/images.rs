//! Document (image) DTOs

use chrono::{DateTime, Utc};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::types::{AnalysisStatus, DocumentTypeId, DocumentUploadType};

/// New document sent by the UI, forwarded by the BFF to the storage service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadImageDto {
    /// Bare base64 or a `data:` URL
    #[serde(rename = "image_base64")]
    pub image_base64: String,

    /// Falls back to the default bundle when missing or empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_id: Option<String>,

    /// Falls back to JPEG when missing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_upload_type: Option<DocumentUploadType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_type: Option<DocumentTypeId>,
}

/// Metadata and analysis result of one stored document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageInformationDto {
    pub uuid: Uuid,
    pub sender: Option<String>,
    pub receiver: Option<String>,
    pub creation_date: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub document_upload_type: DocumentUploadType,
    pub analysis_status: AnalysisStatus,
    pub document_type: DocumentTypeId,
    pub bundle_id: String,
    /// Parsed analysis result; the storage service keeps it as JSON text
    #[serde(rename = "image_analysis_result")]
    pub image_analysis_result: Value,
}

/// Reviewer correction of a document's metadata and analysis result
///
/// The UI sends a complete `ImageInformationDto`; fields not listed here
/// are ignored. The BFF overwrites `uuid` with the path parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateImageInformationDto {
    #[serde(default)]
    pub uuid: Uuid,
    pub analysis_status: AnalysisStatus,
    pub document_type: DocumentTypeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_id: Option<String>,
    #[serde(rename = "image_analysis_result")]
    pub image_analysis_result: Value,
}

/// Stored original returned as base64
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadImageDto {
    pub uuid: Uuid,
    #[serde(rename = "image_base64")]
    pub image_base64: String,
    pub document_upload_type: DocumentUploadType,
}

/// Column a document listing can be ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    CreationDate,
    LastModified,
    Sender,
    Receiver,
    AnalysisStatus,
    DocumentType,
    BundleId,
}

impl SortField {
    /// Column name in the `image_information` table
    pub fn column(&self) -> &'static str {
        match self {
            SortField::CreationDate => "creation_date",
            SortField::LastModified => "last_modified",
            SortField::Sender => "sender",
            SortField::Receiver => "receiver",
            SortField::AnalysisStatus => "analysis_status",
            SortField::DocumentType => "document_type",
            SortField::BundleId => "bundle_id",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn keyword(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Filter, sort and page selection for document listings
///
/// All filters are optional and combined with AND. Blank enum and paging
/// values count as absent, and paging numbers may arrive as text. Doubles
/// as the BFF's query-string extractor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageInformationFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "empty_as_none")]
    pub analysis_status: Option<AnalysisStatus>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "empty_as_none")]
    pub document_type: Option<DocumentTypeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundle_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "empty_as_none")]
    pub sort_by: Option<SortField>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "empty_as_none")]
    pub order: Option<SortOrder>,
    /// 1-indexed; pagination applies only when set
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "empty_as_none")]
    pub page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "empty_as_none")]
    pub page_size: Option<i64>,
}

/// Optional filter field where `null` or a blank string means absent
///
/// Query strings carry every value as text, so numeric text is read as a
/// number before the typed conversion.
fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(text)) if text.trim().is_empty() => return Ok(None),
        Some(Value::String(text)) => match text.trim().parse::<i64>() {
            Ok(number) => Value::from(number),
            Err(_) => Value::String(text),
        },
        Some(other) => other,
    };
    serde_json::from_value(value).map(Some).map_err(de::Error::custom)
}

impl ImageInformationFilter {
    /// Filter selecting one bundle's documents in a given status
    pub fn for_bundle(bundle_id: &str, status: Option<AnalysisStatus>) -> Self {
        Self {
            bundle_id: Some(bundle_id.to_string()),
            analysis_status: status,
            ..Default::default()
        }
    }
}

/// Document handed to the analysis service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeImageMessage {
    pub uuid: Uuid,
    pub image_base64: String,
    #[serde(rename = "bundleId")]
    pub bundle_id: String,
    pub document_type: DocumentTypeId,
}

/// Analysis outcome published by the analysis service
///
/// A result containing an `error_details` key marks a failed analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResultMessage {
    pub uuid: Uuid,
    pub image_analysis_result: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_upload_dto_accepts_minimal_body() {
        let dto: UploadImageDto = serde_json::from_value(json!({
            "image_base64": "QUJD"
        }))
        .unwrap();
        assert_eq!(dto.image_base64, "QUJD");
        assert!(dto.bundle_id.is_none());
        assert!(dto.document_upload_type.is_none());
    }

    #[test]
    fn test_upload_dto_wire_names() {
        let dto: UploadImageDto = serde_json::from_value(json!({
            "image_base64": "QUJD",
            "bundleId": "b-1",
            "documentUploadType": "PDF",
            "documentType": "CMR"
        }))
        .unwrap();
        assert_eq!(dto.bundle_id.as_deref(), Some("b-1"));
        assert_eq!(dto.document_upload_type, Some(DocumentUploadType::Pdf));
        assert_eq!(dto.document_type, Some(DocumentTypeId::Cmr));
    }

    #[test]
    fn test_update_dto_ignores_extra_fields_and_defaults_uuid() {
        let dto: UpdateImageInformationDto = serde_json::from_value(json!({
            "creationDate": "2025-04-03T06:24:59.535Z",
            "analysisStatus": "APPROVED",
            "documentType": "CMR",
            "image_analysis_result": {"sender_information": {}}
        }))
        .unwrap();
        assert!(dto.uuid.is_nil());
        assert_eq!(dto.analysis_status, AnalysisStatus::Approved);
    }

    #[test]
    fn test_analyze_message_matches_analysis_service_keys() {
        let msg = AnalyzeImageMessage {
            uuid: Uuid::nil(),
            image_base64: "QUJD".to_string(),
            bundle_id: "b-1".to_string(),
            document_type: DocumentTypeId::Cmr,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["bundleId"], "b-1");
        assert_eq!(value["image_base64"], "QUJD");
        assert_eq!(value["document_type"], "CMR");
    }

    #[test]
    fn test_filter_skips_absent_fields() {
        let filter = ImageInformationFilter::for_bundle("b-1", Some(AnalysisStatus::Pending));
        let value = serde_json::to_value(&filter).unwrap();
        assert_eq!(value, json!({"bundleId": "b-1", "analysisStatus": "PENDING"}));
    }

    #[test]
    fn test_sort_field_columns() {
        let field: SortField = serde_json::from_str("\"creationDate\"").unwrap();
        assert_eq!(field.column(), "creation_date");
        assert_eq!(SortOrder::default().keyword(), "ASC");
    }

    #[test]
    fn test_filter_blank_values_are_absent() {
        let filter: ImageInformationFilter = serde_json::from_value(json!({
            "sender": "",
            "analysisStatus": "",
            "documentType": " ",
            "sortBy": "",
            "order": null,
            "page": "",
            "pageSize": "",
            "bundleId": "b"
        }))
        .unwrap();
        assert_eq!(
            filter,
            ImageInformationFilter {
                sender: Some(String::new()),
                bundle_id: Some("b".to_string()),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_filter_reads_text_and_json_numbers() {
        let from_text: ImageInformationFilter = serde_json::from_value(json!({
            "analysisStatus": "FINISHED",
            "sortBy": "lastModified",
            "order": "desc",
            "page": "2",
            "pageSize": "10"
        }))
        .unwrap();
        assert_eq!(from_text.analysis_status, Some(AnalysisStatus::Finished));
        assert_eq!(from_text.sort_by, Some(SortField::LastModified));
        assert_eq!(from_text.order, Some(SortOrder::Desc));
        assert_eq!(from_text.page, Some(2));
        assert_eq!(from_text.page_size, Some(10));

        let from_numbers: ImageInformationFilter =
            serde_json::from_value(json!({"page": 3, "pageSize": 25})).unwrap();
        assert_eq!(from_numbers.page, Some(3));
        assert_eq!(from_numbers.page_size, Some(25));
    }

    #[test]
    fn test_filter_rejects_unknown_status() {
        let result: Result<ImageInformationFilter, _> =
            serde_json::from_value(json!({"analysisStatus": "DONE"}));
        assert!(result.is_err());
    }
}
