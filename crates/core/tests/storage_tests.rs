// ═══════════════════════════════════════════════════════════════════
// Storage Tests — file format, intent logs, record stores
// ═══════════════════════════════════════════════════════════════════

use std::time::Duration;

use fund_tracker_core::errors::CoreError;
use fund_tracker_core::models::fund::Fund;
use fund_tracker_core::models::holding::Holding;
use fund_tracker_core::models::intent::{IntentStage, TradeIntent};
use fund_tracker_core::models::ledger::Ledger;
use fund_tracker_core::models::portfolio::Portfolio;
use fund_tracker_core::models::settings::RecordStoreSettings;
use fund_tracker_core::models::user::Identity;
use fund_tracker_core::storage::format::{self, CURRENT_VERSION, HEADER_SIZE, MAGIC};
use fund_tracker_core::storage::intent_log::{FileIntentLog, IntentLog, MemoryIntentLog};
use fund_tracker_core::storage::record_store::{MemoryRecordStore, RecordStore};
use fund_tracker_core::storage::rest_store::RestRecordStore;

fn buy_intent(user_id: &str, fund_id: &str) -> TradeIntent {
    let ledger = Ledger::new(1_000.0, Portfolio::new());
    let plan = ledger
        .plan_buy(&Fund::new(fund_id, "Test Fund", 10.0), 5.0)
        .unwrap();
    TradeIntent::new(user_id, plan)
}

// ═══════════════════════════════════════════════════════════════════
// File format
// ═══════════════════════════════════════════════════════════════════

mod file_format {
    use super::*;

    #[test]
    fn header_layout() {
        let bytes = format::write_file(CURRENT_VERSION, b"payload");
        assert_eq!(bytes.len(), HEADER_SIZE + 7);
        assert_eq!(&bytes[0..4], MAGIC);
        assert_eq!(u16::from_le_bytes([bytes[4], bytes[5]]), CURRENT_VERSION);

        let (version, payload) = format::read_file(&bytes).unwrap();
        assert_eq!(version, CURRENT_VERSION);
        assert_eq!(payload, b"payload");
    }

    #[test]
    fn empty_payload() {
        let bytes = format::write_file(CURRENT_VERSION, &[]);
        let (_, payload) = format::read_file(&bytes).unwrap();
        assert!(payload.is_empty());
    }

    #[test]
    fn too_small() {
        assert!(matches!(
            format::read_file(b"MFIL"),
            Err(CoreError::InvalidFileFormat(_))
        ));
    }

    #[test]
    fn wrong_magic() {
        let mut bytes = format::write_file(CURRENT_VERSION, b"x");
        bytes[0] = b'X';
        assert!(matches!(
            format::read_file(&bytes),
            Err(CoreError::InvalidFileFormat(_))
        ));
    }

    #[test]
    fn future_version() {
        let bytes = format::write_file(CURRENT_VERSION + 1, b"x");
        assert!(matches!(
            format::read_file(&bytes),
            Err(CoreError::UnsupportedVersion(v)) if v == CURRENT_VERSION + 1
        ));
    }

    #[test]
    fn version_zero() {
        let bytes = format::write_file(0, b"x");
        assert!(matches!(
            format::read_file(&bytes),
            Err(CoreError::UnsupportedVersion(0))
        ));
    }

    #[test]
    fn truncated_payload() {
        let mut bytes = format::write_file(CURRENT_VERSION, b"0123456789");
        bytes.truncate(bytes.len() - 3);
        assert!(matches!(
            format::read_file(&bytes),
            Err(CoreError::InvalidFileFormat(_))
        ));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Intent logs
// ═══════════════════════════════════════════════════════════════════

/// Behaviour shared by every `IntentLog` implementation.
fn exercise_log(log: &dyn IntentLog) {
    let first = buy_intent("alice", "A");
    let second = buy_intent("alice", "B");
    let other = buy_intent("bob", "A");

    log.record(&first).unwrap();
    log.record(&second).unwrap();
    log.record(&other).unwrap();

    let pending = log.pending_for("alice").unwrap();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].id, first.id);
    assert_eq!(pending[1].id, second.id);

    log.update_stage(first.id, IntentStage::WalletWritten).unwrap();
    let pending = log.pending_for("alice").unwrap();
    assert_eq!(pending[0].stage, IntentStage::WalletWritten);
    assert_eq!(pending[0].plan, first.plan);

    log.remove(first.id).unwrap();
    log.remove(first.id).unwrap(); // unknown id is fine
    assert_eq!(log.pending_for("alice").unwrap().len(), 1);
    assert_eq!(log.pending_for("bob").unwrap().len(), 1);
    assert!(log.pending_for("carol").unwrap().is_empty());

    assert!(matches!(
        log.update_stage(first.id, IntentStage::HoldingWritten),
        Err(CoreError::Validation(_))
    ));
}

mod memory_intent_log {
    use super::*;

    #[test]
    fn journal_operations() {
        let log = MemoryIntentLog::new();
        assert!(log.is_empty());
        exercise_log(&log);
        assert_eq!(log.len(), 2);
    }
}

mod file_intent_log {
    use super::*;

    #[test]
    fn journal_operations() {
        let dir = tempfile::tempdir().unwrap();
        let log = FileIntentLog::open(dir.path().join("intents.bin")).unwrap();
        exercise_log(&log);
    }

    #[test]
    fn missing_file_is_an_empty_journal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("intents.bin");
        let log = FileIntentLog::open(&path).unwrap();
        assert!(log.pending_for("alice").unwrap().is_empty());
        assert!(!path.exists());
        assert_eq!(log.path(), path.as_path());
    }

    #[test]
    fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("intents.bin");
        let intent = buy_intent("alice", "A");

        {
            let log = FileIntentLog::open(&path).unwrap();
            log.record(&intent).unwrap();
            log.update_stage(intent.id, IntentStage::WalletWritten).unwrap();
        }

        let reopened = FileIntentLog::open(&path).unwrap();
        let pending = reopened.pending_for("alice").unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, intent.id);
        assert_eq!(pending[0].stage, IntentStage::WalletWritten);
        assert_eq!(pending[0].created_at, intent.created_at);
    }

    #[test]
    fn file_starts_with_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("intents.bin");
        let log = FileIntentLog::open(&path).unwrap();
        log.record(&buy_intent("alice", "A")).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[0..4], MAGIC);
    }

    #[test]
    fn rewrites_leave_no_stray_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("intents.bin");
        let log = FileIntentLog::open(&path).unwrap();
        let intent = buy_intent("alice", "A");
        log.record(&intent).unwrap();
        log.update_stage(intent.id, IntentStage::WalletWritten).unwrap();
        log.remove(intent.id).unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(entries, vec![path]);
    }

    #[test]
    fn journal_with_tmp_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("intents.tmp");
        let intent = buy_intent("alice", "A");
        {
            let log = FileIntentLog::open(&path).unwrap();
            log.record(&intent).unwrap();
            log.record(&buy_intent("alice", "B")).unwrap();
        }

        let reopened = FileIntentLog::open(&path).unwrap();
        let pending = reopened.pending_for("alice").unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id, intent.id);
    }

    #[test]
    fn corrupted_file_is_rejected_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("intents.bin");
        std::fs::write(&path, b"definitely not an intent log").unwrap();
        assert!(matches!(
            FileIntentLog::open(&path),
            Err(CoreError::InvalidFileFormat(_))
        ));
    }

    #[test]
    fn garbage_payload_is_deserialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("intents.bin");
        std::fs::write(&path, format::write_file(CURRENT_VERSION, &[0xff; 3])).unwrap();
        assert!(matches!(
            FileIntentLog::open(&path),
            Err(CoreError::Deserialization(_))
        ));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Memory record store
// ═══════════════════════════════════════════════════════════════════

mod memory_record_store {
    use super::*;

    #[tokio::test]
    async fn wallet_lifecycle() {
        let store = MemoryRecordStore::new();
        let alice = Identity::new("alice");

        assert_eq!(store.fetch_wallet(&alice).await.unwrap(), None);
        assert!(matches!(
            store.set_wallet_balance(&alice, 5.0).await,
            Err(CoreError::Store { .. })
        ));

        store.create_wallet(&alice, 100.0).await.unwrap();
        assert!(store.create_wallet(&alice, 1.0).await.is_err());
        store.set_wallet_balance(&alice, 42.5).await.unwrap();
        assert_eq!(store.fetch_wallet(&alice).await.unwrap(), Some(42.5));
        assert_eq!(store.wallet_of("alice"), Some(42.5));
    }

    #[tokio::test]
    async fn holding_writes() {
        let store = MemoryRecordStore::new();
        let alice = Identity::new("alice");
        let h = Holding::new("A", 10.0, 100.0);

        assert!(store.update_holding(&alice, &h).await.is_err());
        store.insert_holding(&alice, &h).await.unwrap();
        assert!(store.insert_holding(&alice, &h).await.is_err());

        let updated = Holding::new("A", 6.0, 100.0);
        store.update_holding(&alice, &updated).await.unwrap();
        assert_eq!(store.fetch_holdings(&alice).await.unwrap(), vec![updated]);

        store.upsert_holding(&alice, &Holding::new("B", 1.0, 5.0)).await.unwrap();
        store.upsert_holding(&alice, &Holding::new("B", 2.0, 5.0)).await.unwrap();
        assert_eq!(store.holdings_of("alice")[1].units, 2.0);

        store.delete_holding(&alice, "A").await.unwrap();
        store.delete_holding(&alice, "A").await.unwrap();
        assert_eq!(store.holdings_of("alice").len(), 1);
    }

    #[tokio::test]
    async fn users_are_isolated() {
        let store = MemoryRecordStore::new();
        let alice = Identity::new("alice");
        let bob = Identity::new("bob");

        store.create_wallet(&alice, 10.0).await.unwrap();
        store.insert_holding(&alice, &Holding::new("A", 1.0, 1.0)).await.unwrap();

        assert_eq!(store.fetch_wallet(&bob).await.unwrap(), None);
        assert!(store.fetch_holdings(&bob).await.unwrap().is_empty());
        store.delete_holding(&bob, "A").await.unwrap();
        assert_eq!(store.holdings_of("alice").len(), 1);
    }
}

// ═══════════════════════════════════════════════════════════════════
// REST record store
// ═══════════════════════════════════════════════════════════════════

mod rest_record_store {
    use super::*;

    fn store(url: &str) -> RestRecordStore {
        RestRecordStore::new(
            &RecordStoreSettings {
                url: url.into(),
                api_key: "anon-key".into(),
            },
            Duration::from_secs(5),
        )
    }

    #[test]
    fn table_url_trims_trailing_slash() {
        assert_eq!(
            store("https://db.example.com/").table_url("wallets"),
            "https://db.example.com/rest/v1/wallets"
        );
    }

    #[test]
    fn parse_holdings_rows() {
        let body = r#"[
            {"fund_id": "119551", "units": 10.5, "purchase_nav": 52.3},
            {"fund_id": "120503", "units": 0, "purchase_nav": 61.9},
            {"user_id": "alice", "fund_id": "100027", "units": 2, "purchase_nav": 11}
        ]"#;
        let holdings = RestRecordStore::parse_holdings(body).unwrap();
        assert_eq!(
            holdings,
            vec![
                Holding::new("119551", 10.5, 52.3),
                Holding::new("100027", 2.0, 11.0),
            ]
        );
    }

    #[test]
    fn parse_holdings_rejects_malformed_body() {
        assert!(matches!(
            RestRecordStore::parse_holdings(r#"{"message": "JWT expired"}"#),
            Err(CoreError::Store { ref operation, .. }) if operation == "fetch_holdings"
        ));
    }

    #[tokio::test]
    async fn unreachable_store_reports_store_error() {
        let store = store("http://127.0.0.1:9");
        let err = store
            .fetch_wallet(&Identity::new("alice"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Store { ref operation, .. } if operation == "fetch_wallet"
        ));
        assert!(err.is_retryable());
    }
}
