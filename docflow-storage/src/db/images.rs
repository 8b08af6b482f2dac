//! `image_information` table access

use chrono::{DateTime, Utc};
use docflow_common::dto::{ImageInformationDto, ImageInformationFilter};
use docflow_common::time::{parse_rfc3339, to_db_string};
use docflow_common::{AnalysisStatus, DocumentTypeId, DocumentUploadType};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::pagination::calculate_pagination;

const COLUMNS: &str = "uuid, sender, receiver, creation_date, last_modified, upload_type, \
                       analysis_status, document_type, bundle_id, image_analysis_result";

/// One stored document's metadata
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInformation {
    pub uuid: Uuid,
    pub sender: Option<String>,
    pub receiver: Option<String>,
    pub creation_date: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub upload_type: DocumentUploadType,
    pub analysis_status: AnalysisStatus,
    pub document_type: DocumentTypeId,
    pub bundle_id: String,
    /// Analysis result as JSON text
    pub image_analysis_result: String,
}

impl ImageInformation {
    pub fn to_dto(&self) -> Result<ImageInformationDto> {
        let image_analysis_result = serde_json::from_str(&self.image_analysis_result)
            .map_err(|e| StorageError::corrupt(self.uuid, format!("analysis result: {}", e)))?;

        Ok(ImageInformationDto {
            uuid: self.uuid,
            sender: self.sender.clone(),
            receiver: self.receiver.clone(),
            creation_date: self.creation_date,
            last_modified: self.last_modified,
            document_upload_type: self.upload_type,
            analysis_status: self.analysis_status,
            document_type: self.document_type,
            bundle_id: self.bundle_id.clone(),
            image_analysis_result,
        })
    }
}

/// Insert or fully overwrite the row keyed by `info.uuid`
///
/// `creation_date` is kept from the first insert.
pub async fn save_image_information(pool: &SqlitePool, info: &ImageInformation) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO image_information (
            uuid, sender, receiver, creation_date, last_modified, upload_type,
            analysis_status, document_type, bundle_id, image_analysis_result
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(uuid) DO UPDATE SET
            sender = excluded.sender,
            receiver = excluded.receiver,
            last_modified = excluded.last_modified,
            upload_type = excluded.upload_type,
            analysis_status = excluded.analysis_status,
            document_type = excluded.document_type,
            bundle_id = excluded.bundle_id,
            image_analysis_result = excluded.image_analysis_result
        "#,
    )
    .bind(info.uuid.to_string())
    .bind(&info.sender)
    .bind(&info.receiver)
    .bind(to_db_string(&info.creation_date))
    .bind(to_db_string(&info.last_modified))
    .bind(info.upload_type.as_str())
    .bind(info.analysis_status.as_str())
    .bind(info.document_type.as_str())
    .bind(&info.bundle_id)
    .bind(&info.image_analysis_result)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn load_image_information(
    pool: &SqlitePool,
    uuid: Uuid,
) -> Result<Option<ImageInformation>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM image_information WHERE uuid = ?",
        COLUMNS
    ))
    .bind(uuid.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(row_to_image_information).transpose()
}

/// List rows matching every filter that is set
///
/// Without `sortBy` rows come back oldest first. Pagination applies only
/// when `page` or `pageSize` is given.
pub async fn list_image_information(
    pool: &SqlitePool,
    filter: &ImageInformationFilter,
) -> Result<Vec<ImageInformation>> {
    let mut clauses: Vec<&str> = Vec::new();
    let mut binds: Vec<String> = Vec::new();

    if let Some(sender) = non_empty(&filter.sender) {
        clauses.push("sender = ?");
        binds.push(sender.to_string());
    }
    if let Some(receiver) = non_empty(&filter.receiver) {
        clauses.push("receiver = ?");
        binds.push(receiver.to_string());
    }
    if let Some(status) = filter.analysis_status {
        clauses.push("analysis_status = ?");
        binds.push(status.as_str().to_string());
    }
    if let Some(document_type) = filter.document_type {
        clauses.push("document_type = ?");
        binds.push(document_type.as_str().to_string());
    }
    if let Some(bundle_id) = non_empty(&filter.bundle_id) {
        clauses.push("bundle_id = ?");
        binds.push(bundle_id.to_string());
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };

    // Sort columns come from a closed enum, never from raw input
    let order = filter.order.unwrap_or_default().keyword();
    let order_sql = match filter.sort_by {
        Some(field) => format!(" ORDER BY {} {}, uuid ASC", field.column(), order),
        None => " ORDER BY creation_date ASC, uuid ASC".to_string(),
    };

    let mut sql = format!("SELECT {} FROM image_information{}{}", COLUMNS, where_sql, order_sql);

    if filter.page.is_some() || filter.page_size.is_some() {
        let count_sql = format!("SELECT COUNT(*) FROM image_information{}", where_sql);
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        for value in &binds {
            count_query = count_query.bind(value.as_str());
        }
        let total = count_query.fetch_one(pool).await?;

        let pagination = calculate_pagination(total, filter.page.unwrap_or(1), filter.page_size);
        sql.push_str(&format!(
            " LIMIT {} OFFSET {}",
            pagination.page_size, pagination.offset
        ));
    }

    let mut query = sqlx::query(&sql);
    for value in &binds {
        query = query.bind(value.as_str());
    }
    let rows = query.fetch_all(pool).await?;

    rows.iter().map(row_to_image_information).collect()
}

/// Delete a row; `false` when it did not exist
pub async fn remove_image_information(pool: &SqlitePool, uuid: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM image_information WHERE uuid = ?")
        .bind(uuid.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn row_to_image_information(row: &SqliteRow) -> Result<ImageInformation> {
    let uuid_text: String = row.try_get("uuid")?;
    let uuid = Uuid::parse_str(&uuid_text).map_err(|e| StorageError::corrupt(&uuid_text, e))?;

    let timestamp = |column: &str| -> Result<DateTime<Utc>> {
        let text: String = row.try_get(column)?;
        parse_rfc3339(&text).map_err(|e| StorageError::corrupt(uuid, format!("{}: {}", column, e)))
    };
    let creation_date = timestamp("creation_date")?;
    let last_modified = timestamp("last_modified")?;

    let upload_type = row
        .try_get::<String, _>("upload_type")?
        .parse::<DocumentUploadType>()
        .map_err(|e| StorageError::corrupt(uuid, e))?;
    let analysis_status = row
        .try_get::<String, _>("analysis_status")?
        .parse::<AnalysisStatus>()
        .map_err(|e| StorageError::corrupt(uuid, e))?;
    let document_type = row
        .try_get::<String, _>("document_type")?
        .parse::<DocumentTypeId>()
        .map_err(|e| StorageError::corrupt(uuid, e))?;

    Ok(ImageInformation {
        uuid,
        sender: row.try_get("sender")?,
        receiver: row.try_get("receiver")?,
        creation_date,
        last_modified,
        upload_type,
        analysis_status,
        document_type,
        bundle_id: row.try_get("bundle_id")?,
        image_analysis_result: row.try_get("image_analysis_result")?,
    })
}
