//! Integration tests for the transfer lifecycle
//!
//! Ingest, status, download, notification, and sweeping against a real
//! SQLite database and storage area in a temporary directory.

mod common;

use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use common::{
    BASE_URL, RECIPIENT, SENDER, count_entries, files, read_all, request, setup, setup_with,
};
use courier_common::hash::sha256_bytes;
use courier_server::constants::{BLOBS_DIR_NAME, DB_BUSY_TIMEOUT_SECS, STAGING_DIR_NAME};
use courier_server::errors::{PersistenceError, ValidationError};
use courier_server::notify::NotificationKind;
use courier_server::testing::{FailingTransport, RecordingTransport};
use courier_server::{DownloadWarning, NotFoundReason, Sweeper, TransferError};
use flate2::read::GzDecoder;
use tokio::time::Instant;

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_single_file_ingest() {
    let env = setup().await;

    let outcome = env
        .service
        .ingest(request(files(&[("notes.txt", b"0123456789")]), Some(7)))
        .await
        .expect("ingest");
    assert!(outcome.warnings.is_empty());
    assert_eq!(
        outcome.download_link,
        format!("{BASE_URL}/download/{}", outcome.transfer_id)
    );

    let status = env.service.status(&outcome.transfer_id).await.unwrap();
    assert_eq!(status.artifact_name, "notes.txt");
    assert_eq!(status.total_size, 10);
    assert!(!status.downloaded);
    assert!(!status.expired);
    assert_eq!(status.sender_email, SENDER);
    assert_eq!(status.recipient_email, RECIPIENT);
    assert_eq!(status.expires_at - status.created_at, 7 * 86_400);
    assert_eq!(status.fingerprint, sha256_bytes(b"0123456789"));

    assert_eq!(count_entries(&env.storage, STAGING_DIR_NAME), 0);
}

#[tokio::test]
async fn test_two_files_become_container() {
    let env = setup().await;

    let outcome = env
        .service
        .ingest(request(
            files(&[("a/1.txt", b"11111"), ("b/2.txt", b"2222222")]),
            None,
        ))
        .await
        .expect("ingest");
    assert!(outcome.artifact_name.starts_with("transfer_"));
    assert!(outcome.artifact_name.ends_with(".tar.gz"));

    let status = env.service.status(&outcome.transfer_id).await.unwrap();
    assert_eq!(status.manifest.len(), 2);
    assert_eq!(status.total_size, 12);

    let blob = std::fs::File::open(env.storage.blob_path(&outcome.transfer_id)).unwrap();
    let mut archive = tar::Archive::new(GzDecoder::new(blob));
    let mut entries = Vec::new();
    for entry in archive.entries().unwrap() {
        let mut entry = entry.unwrap();
        let name = entry.path().unwrap().to_string_lossy().into_owned();
        let mut data = String::new();
        entry.read_to_string(&mut data).unwrap();
        entries.push((name, data));
    }
    assert_eq!(
        entries,
        vec![
            ("a/1.txt".to_string(), "11111".to_string()),
            ("b/2.txt".to_string(), "2222222".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_sequential_downloads_notify_once() {
    let env = setup().await;
    let outcome = env
        .service
        .ingest(request(files(&[("notes.txt", b"0123456789")]), None))
        .await
        .unwrap();

    let mut first = env.service.download(&outcome.transfer_id).await.unwrap();
    assert!(first.first_download);
    assert_eq!(read_all(&mut first.file).await, b"0123456789");
    assert!(env.service.status(&outcome.transfer_id).await.unwrap().downloaded);

    let mut second = env.service.download(&outcome.transfer_id).await.unwrap();
    assert!(!second.first_download);
    assert_eq!(read_all(&mut second.file).await, b"0123456789");
    assert_eq!(second.fingerprint, first.fingerprint);

    assert_eq!(env.transport.count(NotificationKind::SenderDownloaded), 1);
    let downloaded: Vec<_> = env
        .transport
        .sent()
        .into_iter()
        .filter(|m| m.kind == NotificationKind::SenderDownloaded)
        .collect();
    assert_eq!(downloaded[0].to, SENDER);
}

#[tokio::test]
async fn test_expired_transfer_is_not_served() {
    let env = setup().await;
    // One-day retention that ran out one second ago
    let created = Utc::now() - ChronoDuration::days(1) - ChronoDuration::seconds(1);
    let outcome = env
        .service
        .ingest_at(request(files(&[("notes.txt", b"0123456789")]), Some(1)), created)
        .await
        .unwrap();

    // The blob is still on disk; expiry is decided by time alone
    assert!(env.storage.blob_path(&outcome.transfer_id).exists());

    let err = env.service.download(&outcome.transfer_id).await.unwrap_err();
    assert!(err.is_expired());
    assert_eq!(err.to_string(), "transfer not available");
    assert_eq!(env.transport.count(NotificationKind::SenderDownloaded), 0);

    let status = env.service.status(&outcome.transfer_id).await.unwrap();
    assert!(status.expired);
    assert!(!status.downloaded);
}

#[tokio::test]
async fn test_empty_file_list_rejected() {
    let env = setup().await;

    let err = env.service.ingest(request(Vec::new(), None)).await.unwrap_err();
    assert!(matches!(
        err,
        TransferError::Validation(ValidationError::EmptyInput)
    ));

    assert!(env.service.list(10).await.unwrap().is_empty());
    assert_eq!(count_entries(&env.storage, BLOBS_DIR_NAME), 0);
    assert_eq!(count_entries(&env.storage, STAGING_DIR_NAME), 0);
    assert!(env.transport.sent().is_empty());
}

// ============================================================================
// Properties
// ============================================================================

#[tokio::test]
async fn test_manifest_size_is_sum_of_inputs() {
    let env = setup().await;
    let sets: Vec<Vec<(&str, Vec<u8>)>> = vec![
        vec![("one.bin", vec![1u8; 1])],
        vec![("x/a.bin", vec![0u8; 4096]), ("x/b.bin", vec![7u8; 3])],
        vec![
            ("p.txt", b"p".to_vec()),
            ("q.txt", Vec::new()),
            ("r/s/t.txt", vec![9u8; 100_000]),
        ],
    ];

    for set in sets {
        let expected: u64 = set.iter().map(|(_, data)| data.len() as u64).sum();
        let incoming = set
            .iter()
            .map(|(path, data)| courier_server::files::IncomingFile::from_bytes(*path, data.clone()))
            .collect();

        let outcome = env.service.ingest(request(incoming, None)).await.unwrap();
        let status = env.service.status(&outcome.transfer_id).await.unwrap();
        assert_eq!(status.total_size, expected);
        assert_eq!(status.manifest.len(), set.len());
    }
}

#[tokio::test]
async fn test_fingerprint_is_deterministic() {
    let env = setup().await;

    let first = env
        .service
        .ingest(request(files(&[("a/1.txt", b"11111"), ("b/2.txt", b"22")]), None))
        .await
        .unwrap();
    let second = env
        .service
        .ingest(request(files(&[("a/1.txt", b"11111"), ("b/2.txt", b"22")]), None))
        .await
        .unwrap();

    assert_ne!(first.transfer_id, second.transfer_id);
    assert_eq!(first.fingerprint, second.fingerprint);

    let blob = std::fs::read(env.storage.blob_path(&first.transfer_id)).unwrap();
    assert_eq!(first.fingerprint, sha256_bytes(&blob));
}

#[tokio::test]
async fn test_concurrent_downloads_notify_exactly_once() {
    const DOWNLOADS: usize = 16;

    let env = setup().await;
    let outcome = env
        .service
        .ingest(request(files(&[("notes.txt", b"0123456789")]), None))
        .await
        .unwrap();

    let mut handles = Vec::with_capacity(DOWNLOADS);
    for _ in 0..DOWNLOADS {
        let service = env.service.clone();
        let id = outcome.transfer_id.clone();
        handles.push(tokio::spawn(async move {
            let mut download = service.download(&id).await.expect("download");
            let data = read_all(&mut download.file).await;
            (download.first_download, data)
        }));
    }

    let mut firsts = 0;
    for handle in handles {
        let (first, data) = handle.await.unwrap();
        assert_eq!(data, b"0123456789");
        if first {
            firsts += 1;
        }
    }

    assert_eq!(firsts, 1);
    assert_eq!(env.transport.count(NotificationKind::SenderDownloaded), 1);
    assert!(env.service.status(&outcome.transfer_id).await.unwrap().downloaded);
}

#[tokio::test]
async fn test_expiry_boundary() {
    let env = setup().await;
    let outcome = env
        .service
        .ingest(request(files(&[("notes.txt", b"boundary")]), Some(1)))
        .await
        .unwrap();
    let expires_at = outcome.expires_at;

    assert!(
        env.service
            .download_at(&outcome.transfer_id, expires_at - 1)
            .await
            .is_ok()
    );
    let err = env
        .service
        .download_at(&outcome.transfer_id, expires_at)
        .await
        .unwrap_err();
    assert_eq!(err.not_found_reason(), Some(NotFoundReason::Expired));
}

#[tokio::test]
async fn test_sweeper_converges() {
    let env = setup().await;
    let created = Utc::now() - ChronoDuration::days(2);
    let expired = env
        .service
        .ingest_at(request(files(&[("old.txt", b"old")]), Some(1)), created)
        .await
        .unwrap();
    let active = env
        .service
        .ingest(request(files(&[("new.txt", b"new")]), Some(1)))
        .await
        .unwrap();

    let sweeper = Sweeper::new(env.database.transfers.clone(), env.storage.clone());
    let now = Utc::now().timestamp();

    let report = sweeper.run_once(now).await.unwrap();
    assert_eq!(report.expired, 1);
    assert_eq!(report.swept, 1);
    assert!(!env.storage.blob_path(&expired.transfer_id).exists());
    assert!(
        env.database
            .transfers
            .get(&expired.transfer_id)
            .await
            .unwrap()
            .is_none()
    );

    let err = env.service.download(&expired.transfer_id).await.unwrap_err();
    assert_eq!(err.not_found_reason(), Some(NotFoundReason::Unknown));

    // Second pass is a no-op for the swept id
    let again = sweeper.run_once(now).await.unwrap();
    assert_eq!(again.expired, 0);

    assert!(env.service.download(&active.transfer_id).await.is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_ingests_all_succeed() {
    const INGESTS: usize = 32;

    let env = setup().await;

    let mut handles = Vec::with_capacity(INGESTS);
    for i in 0..INGESTS {
        let service = env.service.clone();
        handles.push(tokio::spawn(async move {
            let name = format!("file-{i}.txt");
            service
                .ingest(request(files(&[(name.as_str(), b"concurrent")]), None))
                .await
        }));
    }

    // Downloads of an existing transfer write to the same database meanwhile
    let existing = env
        .service
        .ingest(request(files(&[("notes.txt", b"0123456789")]), None))
        .await
        .unwrap();
    assert!(env.service.download(&existing.transfer_id).await.is_ok());

    for handle in handles {
        let outcome = handle.await.unwrap();
        assert!(outcome.is_ok(), "ingest failed: {:?}", outcome.err());
    }

    assert_eq!(env.service.list(100).await.unwrap().len(), INGESTS + 1);
    assert_eq!(count_entries(&env.storage, BLOBS_DIR_NAME), INGESTS + 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_ingest_waits_for_other_writer() {
    let env = setup().await;

    let mut writer = env.pool.acquire().await.unwrap();
    sqlx::query("BEGIN IMMEDIATE")
        .execute(&mut *writer)
        .await
        .unwrap();

    let service = env.service.clone();
    let ingest = tokio::spawn(async move {
        service
            .ingest(request(files(&[("notes.txt", b"0123456789")]), None))
            .await
    });

    tokio::time::sleep(Duration::from_millis(300)).await;
    sqlx::query("ROLLBACK").execute(&mut *writer).await.unwrap();
    drop(writer);

    let outcome = ingest.await.unwrap().expect("ingest waits for the lock");
    assert!(env.service.status(&outcome.transfer_id).await.is_ok());
}

// ============================================================================
// Failure handling
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancelled_ingest_leaves_no_blob_without_record() {
    let env = setup().await;

    // Hold the write lock past the busy timeout so the insert fails
    let mut writer = env.pool.acquire().await.unwrap();
    sqlx::query("BEGIN IMMEDIATE")
        .execute(&mut *writer)
        .await
        .unwrap();

    let result = tokio::time::timeout(
        Duration::from_millis(500),
        env.service
            .ingest(request(files(&[("notes.txt", b"0123456789")]), None)),
    )
    .await;
    assert!(result.is_err(), "ingest should still be waiting for the lock");

    tokio::time::sleep(Duration::from_secs(DB_BUSY_TIMEOUT_SECS + 1)).await;
    sqlx::query("ROLLBACK").execute(&mut *writer).await.unwrap();
    drop(writer);

    let deadline = Instant::now() + Duration::from_secs(10);
    while count_entries(&env.storage, BLOBS_DIR_NAME) != 0 {
        assert!(Instant::now() < deadline, "blob of cancelled ingest was kept");
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(count_entries(&env.storage, STAGING_DIR_NAME), 0);
    assert!(env.service.list(10).await.unwrap().is_empty());
    assert!(env.transport.sent().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancelled_ingest_keeps_blob_with_record() {
    let env = setup().await;

    let mut writer = env.pool.acquire().await.unwrap();
    sqlx::query("BEGIN IMMEDIATE")
        .execute(&mut *writer)
        .await
        .unwrap();

    let result = tokio::time::timeout(
        Duration::from_millis(500),
        env.service
            .ingest(request(files(&[("notes.txt", b"0123456789")]), None)),
    )
    .await;
    assert!(result.is_err(), "ingest should still be waiting for the lock");

    // Released within the busy timeout: the insert goes through
    sqlx::query("ROLLBACK").execute(&mut *writer).await.unwrap();
    drop(writer);

    let deadline = Instant::now() + Duration::from_secs(10);
    let listed = loop {
        let listed = env.service.list(10).await.unwrap();
        if !listed.is_empty() {
            break listed;
        }
        assert!(Instant::now() < deadline, "record of cancelled ingest never appeared");
        tokio::time::sleep(Duration::from_millis(50)).await;
    };

    assert_eq!(listed.len(), 1);
    assert_eq!(count_entries(&env.storage, BLOBS_DIR_NAME), 1);
    let mut download = env.service.download(&listed[0].transfer_id).await.unwrap();
    assert_eq!(read_all(&mut download.file).await, b"0123456789");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_insert_lock_timeout_removes_blob() {
    let env = setup().await;

    let mut writer = env.pool.acquire().await.unwrap();
    sqlx::query("BEGIN IMMEDIATE")
        .execute(&mut *writer)
        .await
        .unwrap();

    let err = env
        .service
        .ingest(request(files(&[("notes.txt", b"0123456789")]), None))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TransferError::Persistence(PersistenceError::Database(_))
    ));

    sqlx::query("ROLLBACK").execute(&mut *writer).await.unwrap();
    drop(writer);

    assert_eq!(count_entries(&env.storage, BLOBS_DIR_NAME), 0);
    assert!(env.service.list(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_notification_failures_are_warnings() {
    let recorder = Arc::new(RecordingTransport::new());
    let env = setup_with(Arc::new(FailingTransport), recorder).await;

    let outcome = env
        .service
        .ingest(request(files(&[("notes.txt", b"0123456789")]), None))
        .await
        .expect("ingest succeeds without email");
    assert_eq!(outcome.warnings.len(), 2);
    let kinds: Vec<_> = outcome.warnings.iter().map(|w| w.kind).collect();
    assert!(kinds.contains(&NotificationKind::RecipientReceived));
    assert!(kinds.contains(&NotificationKind::SenderConfirmed));

    let mut download = env.service.download(&outcome.transfer_id).await.unwrap();
    assert!(download.first_download);
    assert_eq!(download.warnings.len(), 1);
    assert!(matches!(
        &download.warnings[0],
        DownloadWarning::Notification(w)
            if w.kind == NotificationKind::SenderDownloaded && w.recipient == SENDER
    ));
    assert_eq!(read_all(&mut download.file).await, b"0123456789");
    assert!(env.service.status(&outcome.transfer_id).await.unwrap().downloaded);
}

#[tokio::test]
async fn test_ingest_notifies_recipient_and_sender() {
    let env = setup().await;
    let outcome = env
        .service
        .ingest(request(files(&[("notes.txt", b"0123456789")]), None))
        .await
        .unwrap();

    let sent = env.transport.sent();
    assert_eq!(sent.len(), 2);

    let to_recipient = sent
        .iter()
        .find(|m| m.kind == NotificationKind::RecipientReceived)
        .unwrap();
    assert_eq!(to_recipient.to, RECIPIENT);
    assert!(to_recipient.text.contains(&outcome.download_link));
    assert!(to_recipient.text.contains("notes.txt"));

    let to_sender = sent
        .iter()
        .find(|m| m.kind == NotificationKind::SenderConfirmed)
        .unwrap();
    assert_eq!(to_sender.to, SENDER);
}

#[tokio::test]
async fn test_persistence_failure_removes_blob() {
    let env = setup().await;
    env.pool.close().await;

    let err = env
        .service
        .ingest(request(files(&[("notes.txt", b"0123456789")]), None))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TransferError::Persistence(PersistenceError::Database(_))
    ));

    assert_eq!(count_entries(&env.storage, BLOBS_DIR_NAME), 0);
    assert_eq!(count_entries(&env.storage, STAGING_DIR_NAME), 0);
    assert!(env.transport.sent().is_empty());
}

#[tokio::test]
async fn test_invalid_input_has_no_side_effects() {
    let env = setup().await;

    let mut bad_recipient = request(files(&[("notes.txt", b"x")]), None);
    bad_recipient.recipient_email = "   ".into();
    let err = env.service.ingest(bad_recipient).await.unwrap_err();
    assert!(matches!(
        err,
        TransferError::Validation(ValidationError::RecipientEmail(_))
    ));

    let mut bad_sender = request(files(&[("notes.txt", b"x")]), None);
    bad_sender.sender_email = "nobody".into();
    let err = env.service.ingest(bad_sender).await.unwrap_err();
    assert!(matches!(
        err,
        TransferError::Validation(ValidationError::SenderEmail(_))
    ));

    let err = env
        .service
        .ingest(request(files(&[("notes.txt", b"x")]), Some(0)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TransferError::Validation(ValidationError::Retention { max: 365 })
    ));

    assert_eq!(count_entries(&env.storage, BLOBS_DIR_NAME), 0);
    assert!(env.service.list(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_and_malformed_ids() {
    let env = setup().await;

    for id in ["ffffffffffffffffffffffffffffffff", "../../etc/passwd", ""] {
        let err = env.service.download(id).await.unwrap_err();
        assert_eq!(err.not_found_reason(), Some(NotFoundReason::Unknown));
        assert_eq!(err.to_string(), "transfer not available");

        let err = env.service.status(id).await.unwrap_err();
        assert_eq!(err.not_found_reason(), Some(NotFoundReason::Unknown));
    }
}

#[tokio::test]
async fn test_missing_blob_is_reported() {
    let env = setup().await;
    let outcome = env
        .service
        .ingest(request(files(&[("notes.txt", b"0123456789")]), None))
        .await
        .unwrap();
    std::fs::remove_file(env.storage.blob_path(&outcome.transfer_id)).unwrap();

    let err = env.service.download(&outcome.transfer_id).await.unwrap_err();
    assert_eq!(err.not_found_reason(), Some(NotFoundReason::MissingArtifact));
    assert_eq!(err.to_string(), "transfer not available");
    assert!(!env.service.status(&outcome.transfer_id).await.unwrap().downloaded);

    let err = env.service.verify(&outcome.transfer_id).await.unwrap_err();
    assert_eq!(err.not_found_reason(), Some(NotFoundReason::MissingArtifact));
}

// ============================================================================
// Auditing
// ============================================================================

#[tokio::test]
async fn test_verify_detects_tampering() {
    let env = setup().await;
    let outcome = env
        .service
        .ingest(request(files(&[("notes.txt", b"0123456789")]), None))
        .await
        .unwrap();

    let report = env.service.verify(&outcome.transfer_id).await.unwrap();
    assert!(report.is_intact());

    std::fs::write(env.storage.blob_path(&outcome.transfer_id), b"tampered").unwrap();
    let report = env.service.verify(&outcome.transfer_id).await.unwrap();
    assert!(!report.is_intact());
    assert_eq!(report.expected, outcome.fingerprint);

    // Verification never rewrites the stored fingerprint
    let status = env.service.status(&outcome.transfer_id).await.unwrap();
    assert_eq!(status.fingerprint, outcome.fingerprint);
}

#[tokio::test]
async fn test_list_newest_first() {
    let env = setup().await;
    let older = env
        .service
        .ingest_at(
            request(files(&[("a.txt", b"a")]), None),
            Utc::now() - ChronoDuration::hours(1),
        )
        .await
        .unwrap();
    let newer = env
        .service
        .ingest(request(files(&[("b.txt", b"b")]), None))
        .await
        .unwrap();

    let listed = env.service.list(10).await.unwrap();
    let ids: Vec<&str> = listed.iter().map(|s| s.transfer_id.as_str()).collect();
    assert_eq!(ids, vec![newer.transfer_id.as_str(), older.transfer_id.as_str()]);

    assert_eq!(env.service.list(1).await.unwrap().len(), 1);
}
