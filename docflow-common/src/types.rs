//! Document enums and shared constants
//!
//! These values appear verbatim on the wire (broker payloads, REST bodies)
//! and in the `image_information` table, so their string forms are fixed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Bundle id assigned to uploads that do not name a bundle
pub const DEFAULT_BUNDLE_ID: &str = "default";

/// Analysis result stored for a freshly uploaded document
pub const ANALYSIS_INITIAL_RESULT: &str = "{}";

// ========================================
// Analysis Status
// ========================================

/// Lifecycle label of a document record
///
/// Uploads start as `Pending`, bundle analysis moves them to `InProgress`,
/// the analysis result sets `Finished` or `Failed`, and a reviewer may
/// finally mark them `Approved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalysisStatus {
    Pending,
    InProgress,
    Finished,
    Failed,
    Approved,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "PENDING",
            AnalysisStatus::InProgress => "IN_PROGRESS",
            AnalysisStatus::Finished => "FINISHED",
            AnalysisStatus::Failed => "FAILED",
            AnalysisStatus::Approved => "APPROVED",
        }
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(AnalysisStatus::Pending),
            "IN_PROGRESS" => Ok(AnalysisStatus::InProgress),
            "FINISHED" => Ok(AnalysisStatus::Finished),
            "FAILED" => Ok(AnalysisStatus::Failed),
            "APPROVED" => Ok(AnalysisStatus::Approved),
            other => Err(Error::InvalidInput(format!("Unknown analysis status: {}", other))),
        }
    }
}

// ========================================
// Document Type
// ========================================

/// Kind of transport document recognised by the analysis service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentTypeId {
    /// Consignment note (CMR)
    Cmr,
    DeliveryNote,
    PalletNote,
}

impl DocumentTypeId {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentTypeId::Cmr => "CMR",
            DocumentTypeId::DeliveryNote => "DELIVERY_NOTE",
            DocumentTypeId::PalletNote => "PALLET_NOTE",
        }
    }
}

impl Default for DocumentTypeId {
    fn default() -> Self {
        DocumentTypeId::Cmr
    }
}

impl fmt::Display for DocumentTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentTypeId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CMR" => Ok(DocumentTypeId::Cmr),
            "DELIVERY_NOTE" => Ok(DocumentTypeId::DeliveryNote),
            "PALLET_NOTE" => Ok(DocumentTypeId::PalletNote),
            other => Err(Error::InvalidInput(format!("Unknown document type: {}", other))),
        }
    }
}

// ========================================
// Upload Type
// ========================================

/// Format of the uploaded original
///
/// Determines the blob key extension and the data URL prefix the UI uses
/// when it renders the stored file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DocumentUploadType {
    Pdf,
    Jpeg,
}

impl DocumentUploadType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentUploadType::Pdf => "PDF",
            DocumentUploadType::Jpeg => "JPEG",
        }
    }

    /// File extension used for the blob key
    pub fn extension(&self) -> &'static str {
        match self {
            DocumentUploadType::Pdf => ".pdf",
            DocumentUploadType::Jpeg => ".jpg",
        }
    }

    pub fn data_url_prefix(&self) -> &'static str {
        match self {
            DocumentUploadType::Pdf => "data:application/pdf;base64,",
            DocumentUploadType::Jpeg => "data:image/jpeg;base64,",
        }
    }
}

impl Default for DocumentUploadType {
    fn default() -> Self {
        DocumentUploadType::Jpeg
    }
}

impl fmt::Display for DocumentUploadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentUploadType {
    type Err = Error;

    /// Case-insensitive; older rows stored the lowercase form
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PDF" => Ok(DocumentUploadType::Pdf),
            "JPEG" | "JPG" => Ok(DocumentUploadType::Jpeg),
            _ => Err(Error::InvalidInput(format!("Unknown upload type: {}", s))),
        }
    }
}

/// Strip a leading `data:<mime>;base64,` prefix from an encoded payload
///
/// Camera captures arrive as data URLs while file uploads arrive as bare
/// base64; both are stored as bare base64.
pub fn strip_data_url(encoded: &str) -> &str {
    if encoded.starts_with("data:") {
        if let Some(idx) = encoded.find(";base64,") {
            return &encoded[idx + ";base64,".len()..];
        }
    }
    encoded
}
