//! End-to-end document lifecycle through the storage queue
//!
//! The storage handler, a fake analysis service and a fake BFF are wired to
//! one in-process broker; the database is in-memory SQLite.

use async_trait::async_trait;
use docflow_common::broker::{
    BrokerClient, BrokerMessage, InProcessBroker, MessageHandler, MessagePattern, Queue,
};
use docflow_common::config::{BrokerConfig, NftConfig};
use docflow_common::dto::{
    AnalysisResultMessage, AnalyzeImageMessage, ImageInformationDto, ReadImageDto, TokenReadDto,
};
use docflow_common::integrity::hash_data;
use docflow_common::{AnalysisStatus, DocumentTypeId, DocumentUploadType, Result};
use docflow_storage::blobs::{blob_key, BlobStore, MemoryBlobStore};
use docflow_storage::handlers::StorageMessageHandler;
use docflow_storage::nfts::DatabaseNftFactory;
use docflow_storage::{build_images_service, db};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Stands in for the DAS and the BFF: records what it receives
struct Recorder {
    seen: mpsc::UnboundedSender<BrokerMessage>,
}

#[async_trait]
impl MessageHandler for Recorder {
    async fn handle(&self, message: BrokerMessage) -> Result<Value> {
        let _ = self.seen.send(message);
        Ok(Value::Null)
    }
}

struct Harness {
    storage: BrokerClient,
    blobs: Arc<MemoryBlobStore>,
    das: mpsc::UnboundedReceiver<BrokerMessage>,
    bff: mpsc::UnboundedReceiver<BrokerMessage>,
}

async fn harness() -> Harness {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    db::create_schema(&pool).await.unwrap();

    let broker_config = BrokerConfig::default();
    let broker = Arc::new(InProcessBroker::new());
    let blobs = Arc::new(MemoryBlobStore::new());
    let nft_factory = Arc::new(DatabaseNftFactory::new(pool.clone(), &NftConfig::default()));

    let images = build_images_service(
        pool,
        blobs.clone(),
        broker.clone(),
        &broker_config,
        nft_factory,
    );

    let (das_tx, das) = mpsc::unbounded_channel();
    let (bff_tx, bff) = mpsc::unbounded_channel();
    broker.register(
        broker_config.queue(Queue::StorageService),
        Arc::new(StorageMessageHandler::new(images)),
    );
    broker.register(broker_config.queue(Queue::Das), Arc::new(Recorder { seen: das_tx }));
    broker.register(broker_config.queue(Queue::Bff), Arc::new(Recorder { seen: bff_tx }));

    Harness {
        storage: BrokerClient::new(broker, broker_config.queue(Queue::StorageService)),
        blobs,
        das,
        bff,
    }
}

async fn next(rx: &mut mpsc::UnboundedReceiver<BrokerMessage>) -> BrokerMessage {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("message should arrive")
        .expect("channel open")
}

async fn upload(h: &Harness, body: Value) -> Option<ImageInformationDto> {
    h.storage
        .send(MessagePattern::UploadNewImage, &body)
        .await
        .unwrap()
}

async fn information(h: &Harness, uuid: Uuid) -> Option<ImageInformationDto> {
    h.storage
        .send(MessagePattern::GetImageInformation, &uuid)
        .await
        .unwrap()
}

async fn token(h: &Harness, uuid: Uuid) -> Option<TokenReadDto> {
    h.storage.send(MessagePattern::GetImageNft, &uuid).await.unwrap()
}

#[tokio::test]
async fn test_upload_stores_pending_document() {
    let h = harness().await;

    let info = upload(
        &h,
        json!({
            "image_base64": "data:image/jpeg;base64,QUJD",
            "bundleId": "b-1",
            "documentType": "DELIVERY_NOTE"
        }),
    )
    .await
    .expect("upload accepted");

    assert_eq!(info.analysis_status, AnalysisStatus::Pending);
    assert_eq!(info.document_type, DocumentTypeId::DeliveryNote);
    assert_eq!(info.document_upload_type, DocumentUploadType::Jpeg);
    assert_eq!(info.bundle_id, "b-1");
    assert_eq!(info.image_analysis_result, json!({}));
    assert!(info.sender.is_none());

    let stored = h.blobs.get(&blob_key(info.uuid, info.document_upload_type)).await.unwrap();
    assert_eq!(stored, b"ABC");

    let image: ReadImageDto = h
        .storage
        .send::<_, Option<ReadImageDto>>(MessagePattern::GetImage, &info.uuid)
        .await
        .unwrap()
        .expect("image stored");
    assert_eq!(image.image_base64, "QUJD");
}

#[tokio::test]
async fn test_upload_defaults_bundle_and_types() {
    let h = harness().await;

    let info = upload(&h, json!({"image_base64": "QUJD", "bundleId": "  "}))
        .await
        .unwrap();
    assert_eq!(info.bundle_id, "default");
    assert_eq!(info.document_type, DocumentTypeId::Cmr);
    assert_eq!(info.document_upload_type, DocumentUploadType::Jpeg);
}

#[tokio::test]
async fn test_invalid_upload_answers_null() {
    let h = harness().await;

    assert!(upload(&h, json!({"image_base64": "***not base64***"})).await.is_none());
    assert!(upload(&h, json!({"image_base64": ""})).await.is_none());
    assert!(h.blobs.is_empty().await);
}

#[tokio::test]
async fn test_bundle_analysis_dispatches_pending_documents() {
    let mut h = harness().await;

    let first = upload(&h, json!({"image_base64": "QUJD", "bundleId": "b-1"}))
        .await
        .unwrap();
    let second = upload(&h, json!({"image_base64": "REVG", "bundleId": "b-1"}))
        .await
        .unwrap();
    let other = upload(&h, json!({"image_base64": "R0hJ", "bundleId": "b-2"}))
        .await
        .unwrap();

    let accepted: bool = h
        .storage
        .send(MessagePattern::AnalyzeBundle, "b-1")
        .await
        .unwrap();
    assert!(accepted);

    let mut dispatched = Vec::new();
    for _ in 0..2 {
        let message = next(&mut h.das).await;
        assert_eq!(message.pattern, MessagePattern::UploadNewImage);
        assert!(message.is_event());
        let payload: AnalyzeImageMessage = message.payload().unwrap();
        assert_eq!(payload.bundle_id, "b-1");
        dispatched.push((payload.uuid, payload.image_base64));
    }
    dispatched.sort();
    let mut expected = vec![
        (first.uuid, "QUJD".to_string()),
        (second.uuid, "REVG".to_string()),
    ];
    expected.sort();
    assert_eq!(dispatched, expected);

    for uuid in [first.uuid, second.uuid] {
        let info = information(&h, uuid).await.unwrap();
        assert_eq!(info.analysis_status, AnalysisStatus::InProgress);
    }
    assert_eq!(
        information(&h, other.uuid).await.unwrap().analysis_status,
        AnalysisStatus::Pending
    );

    // Nothing left to send in b-1, but the bundle exists
    let again: bool = h
        .storage
        .send(MessagePattern::AnalyzeBundle, "b-1")
        .await
        .unwrap();
    assert!(again);
    assert!(h.das.try_recv().is_err());
}

#[tokio::test]
async fn test_unknown_bundle_is_rejected() {
    let h = harness().await;
    let accepted: bool = h
        .storage
        .send(MessagePattern::AnalyzeBundle, "missing")
        .await
        .unwrap();
    assert!(!accepted);
}

#[tokio::test]
async fn test_published_result_finishes_document_and_mints_token() {
    let mut h = harness().await;
    let info = upload(&h, json!({"image_base64": "QUJD", "bundleId": "b-1"}))
        .await
        .unwrap();

    let result = json!({
        "sender_information": {"senderNameCompany": "ACME"},
        "consignee_information": {"consigneeNameCompany": "Globex"}
    });
    let saved: Option<ImageInformationDto> = h
        .storage
        .send(
            MessagePattern::PublishAnalysis,
            &AnalysisResultMessage {
                uuid: info.uuid,
                image_analysis_result: result.clone(),
            },
        )
        .await
        .unwrap();
    let saved = saved.expect("known document");
    assert_eq!(saved.analysis_status, AnalysisStatus::Finished);
    assert_eq!(saved.sender.as_deref(), Some("ACME"));
    assert_eq!(saved.receiver.as_deref(), Some("Globex"));
    assert_eq!(saved.image_analysis_result, result);

    let refresh = next(&mut h.bff).await;
    assert_eq!(refresh.pattern, MessagePattern::RefreshAnalysis);

    let token = token(&h, info.uuid).await.expect("token minted");
    assert_eq!(token.remote_id, info.uuid.to_string());
    assert_eq!(token.asset.uri, format!("{}.jpg", info.uuid));
    assert_eq!(token.asset.hash, hash_data("QUJD"));
    assert_eq!(token.metadata.uri, info.uuid.to_string());
    assert_eq!(
        token.metadata.hash,
        hash_data(serde_json::to_string(&result).unwrap())
    );
    assert!(token.additional_data.contains("\"FINISHED\""));
}

#[tokio::test]
async fn test_error_result_marks_document_failed() {
    let h = harness().await;
    let info = upload(&h, json!({"image_base64": "QUJD"})).await.unwrap();

    let saved: Option<ImageInformationDto> = h
        .storage
        .send(
            MessagePattern::PublishAnalysis,
            &AnalysisResultMessage {
                uuid: info.uuid,
                image_analysis_result: json!({"error_details": "unreadable"}),
            },
        )
        .await
        .unwrap();
    let saved = saved.unwrap();
    assert_eq!(saved.analysis_status, AnalysisStatus::Failed);
    assert!(saved.sender.is_none());
}

#[tokio::test]
async fn test_result_for_unknown_document_is_null() {
    let h = harness().await;
    let saved: Option<ImageInformationDto> = h
        .storage
        .send(
            MessagePattern::PublishAnalysis,
            &AnalysisResultMessage {
                uuid: Uuid::new_v4(),
                image_analysis_result: json!({}),
            },
        )
        .await
        .unwrap();
    assert!(saved.is_none());
}

#[tokio::test]
async fn test_reanalysis_reuses_existing_token() {
    let h = harness().await;
    let info = upload(&h, json!({"image_base64": "QUJD"})).await.unwrap();

    for result in [json!({"a": 1}), json!({"error_details": "x"})] {
        let _: Option<ImageInformationDto> = h
            .storage
            .send(
                MessagePattern::PublishAnalysis,
                &AnalysisResultMessage {
                    uuid: info.uuid,
                    image_analysis_result: result,
                },
            )
            .await
            .unwrap();
    }

    let token = token(&h, info.uuid).await.unwrap();
    assert!(token.additional_data.contains("\"FAILED\""));
    // Metadata hash still describes the first result
    assert_eq!(token.metadata.hash, hash_data(r#"{"a":1}"#));
}

#[tokio::test]
async fn test_review_update_mirrors_status_onto_token() {
    let h = harness().await;
    let info = upload(&h, json!({"image_base64": "QUJD", "bundleId": "b-1"}))
        .await
        .unwrap();
    let _: Option<ImageInformationDto> = h
        .storage
        .send(
            MessagePattern::PublishAnalysis,
            &AnalysisResultMessage {
                uuid: info.uuid,
                image_analysis_result: json!({"sender_information": {"senderNameCompany": "ACME"}}),
            },
        )
        .await
        .unwrap();

    let corrected = json!({
        "sender_information": {"senderNameCompany": "ACME Corp"},
        "consignee_information": {"consigneeNameCompany": "Initech"}
    });
    let updated: Option<ImageInformationDto> = h
        .storage
        .send(
            MessagePattern::UpdateImageInformation,
            &json!({
                "uuid": info.uuid,
                "analysisStatus": "APPROVED",
                "documentType": "PALLET_NOTE",
                "bundleId": "",
                "image_analysis_result": corrected
            }),
        )
        .await
        .unwrap();
    let updated = updated.expect("known document");
    assert_eq!(updated.analysis_status, AnalysisStatus::Approved);
    assert_eq!(updated.document_type, DocumentTypeId::PalletNote);
    assert_eq!(updated.bundle_id, "b-1");
    assert_eq!(updated.sender.as_deref(), Some("ACME Corp"));
    assert_eq!(updated.receiver.as_deref(), Some("Initech"));
    assert!(updated.last_modified >= info.last_modified);
    assert_eq!(updated.creation_date, info.creation_date);

    let token = token(&h, info.uuid).await.unwrap();
    assert!(token.additional_data.contains("\"APPROVED\""));
}

#[tokio::test]
async fn test_update_unknown_document_is_null() {
    let h = harness().await;
    let updated: Option<ImageInformationDto> = h
        .storage
        .send(
            MessagePattern::UpdateImageInformation,
            &json!({
                "uuid": Uuid::new_v4(),
                "analysisStatus": "APPROVED",
                "documentType": "CMR",
                "image_analysis_result": {}
            }),
        )
        .await
        .unwrap();
    assert!(updated.is_none());
}

#[tokio::test]
async fn test_remove_deletes_row_and_blob() {
    let h = harness().await;
    let info = upload(&h, json!({"image_base64": "QUJD"})).await.unwrap();

    let removed: bool = h
        .storage
        .send(MessagePattern::RemoveImage, &info.uuid)
        .await
        .unwrap();
    assert!(removed);
    assert!(information(&h, info.uuid).await.is_none());
    assert!(h.blobs.is_empty().await);

    let again: bool = h
        .storage
        .send(MessagePattern::RemoveImage, &info.uuid)
        .await
        .unwrap();
    assert!(!again);
}

#[tokio::test]
async fn test_listing_filters_through_the_queue() {
    let h = harness().await;
    for bundle in ["b-1", "b-1", "b-2"] {
        upload(&h, json!({"image_base64": "QUJD", "bundleId": bundle}))
            .await
            .unwrap();
    }

    let all: Vec<ImageInformationDto> = h
        .storage
        .send(MessagePattern::GetAllImageInformation, &Value::Null)
        .await
        .unwrap();
    assert_eq!(all.len(), 3);

    let b1: Vec<ImageInformationDto> = h
        .storage
        .send(
            MessagePattern::GetAllImageInformation,
            &json!({"bundleId": "b-1", "analysisStatus": "PENDING"}),
        )
        .await
        .unwrap();
    assert_eq!(b1.len(), 2);
    assert!(b1.iter().all(|d| d.bundle_id == "b-1"));

    let page: Vec<ImageInformationDto> = h
        .storage
        .send(
            MessagePattern::GetAllImageInformation,
            &json!({"page": 2, "pageSize": 2}),
        )
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
}

#[tokio::test]
async fn test_refresh_pattern_is_not_served_by_storage() {
    let h = harness().await;
    let result: Result<Value> = h
        .storage
        .send(MessagePattern::RefreshAnalysis, &json!({}))
        .await;
    assert!(matches!(result, Err(docflow_common::Error::InvalidInput(_))));
}
