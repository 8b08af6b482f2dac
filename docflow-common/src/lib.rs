//! # docflow Common Library
//!
//! Shared code for the docflow services:
//! - Document enums and constants (analysis status, document/upload types)
//! - DTOs exchanged over the broker and the REST API
//! - The message-pattern contract and broker transports
//! - Event types (DocflowEvent) and the EventBus
//! - Configuration loading
//! - Content hashing

pub mod broker;
pub mod config;
pub mod dto;
pub mod error;
pub mod events;
pub mod integrity;
pub mod time;
pub mod types;

pub use error::{Error, Result};
pub use types::{AnalysisStatus, DocumentTypeId, DocumentUploadType};
