use docvault_core::config::AppConfig;
use docvault_core::flows::{categorize, key_info, search, summarize};
use docvault_core::notice::NoticeLevel;
use docvault_core::pipeline::{Stage, UploadState};
use docvault_core::sample::{sample_document, SAMPLE_DOCUMENT_ID};
use docvault_core::upload::UploadFile;
use docvault_core::{DocumentCategory, Vault, VaultError};
use providers::scripted::ScriptedProvider;
use serde_json::json;
use std::sync::Arc;
use storage::KvStore;

async fn memory_kv() -> KvStore {
    KvStore::new(storage::open("sqlite::memory:").await.unwrap())
}

fn diploma_provider() -> ScriptedProvider {
    ScriptedProvider::new()
        .reply_json(
            summarize::PROMPT_NAME,
            json!({
                "summary": "Bachelor's diploma for Jane Roe",
                "documentType": "Diploma",
                "name": "Jane Roe",
                "dateOfIssue": "2021-06-01",
                "issuingAuthority": "State University"
            }),
        )
        .reply_json(
            categorize::PROMPT_NAME,
            json!({ "category": "Education", "confidence": 0.95 }),
        )
        .reply_json(
            key_info::PROMPT_NAME,
            json!({ "keyInfo": [{ "label": "Degree", "value": "Bachelor of Science" }] }),
        )
}

fn diploma() -> UploadFile {
    UploadFile::with_mime("diploma.png", "image/png", vec![0u8; 2 * 1024 * 1024])
}

#[tokio::test]
async fn uploading_a_diploma_replaces_the_sample() {
    let llm = Arc::new(diploma_provider());
    let kv = memory_kv().await;
    let mut vault = Vault::with_store(AppConfig::default(), kv.clone(), llm.clone()).await;
    assert_eq!(vault.documents(), &[sample_document()]);

    let doc = vault.upload(diploma()).await.unwrap();
    assert_eq!(doc.category, DocumentCategory::Education);
    assert_eq!(doc.file_name, "diploma.png");
    assert_eq!(doc.file_type, "image/png");
    assert_eq!(doc.metadata.summary, "Bachelor's diploma for Jane Roe");
    assert!(doc.has_ephemeral_file());

    assert_eq!(vault.documents().len(), 1);
    assert_eq!(vault.documents()[0].id, doc.id);
    assert!(vault.get(SAMPLE_DOCUMENT_ID).is_none());
    assert_eq!(vault.file_contents(&doc).unwrap().bytes.len(), 2 * 1024 * 1024);
    let state = vault.upload_state().borrow().clone();
    assert_eq!(
        state,
        UploadState::Committed {
            document_id: doc.id.clone()
        }
    );

    let notices = vault.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Info);

    let stored = kv.get(&AppConfig::default().storage.key).await.unwrap().unwrap();
    assert!(stored.contains("diploma.png"));
    assert!(!stored.contains("blob:"));
}

#[tokio::test]
async fn a_failure_at_any_stage_commits_nothing() {
    for failing in [
        summarize::PROMPT_NAME,
        categorize::PROMPT_NAME,
        key_info::PROMPT_NAME,
    ] {
        let mut llm = ScriptedProvider::new();
        for (name, reply) in [
            (
                summarize::PROMPT_NAME,
                json!({ "summary": "s", "documentType": "t", "name": "n" }),
            ),
            (
                categorize::PROMPT_NAME,
                json!({ "category": "Legal", "confidence": 0.5 }),
            ),
            (key_info::PROMPT_NAME, json!({ "keyInfo": [] })),
        ] {
            llm = if name == failing {
                llm.fail(name, "provider unavailable")
            } else {
                llm.reply_json(name, reply)
            };
        }

        let kv = memory_kv().await;
        let mut vault = Vault::with_store(AppConfig::default(), kv.clone(), Arc::new(llm)).await;
        let before = vault.documents().to_vec();

        let err = vault.upload(diploma()).await.unwrap_err();
        let expected = match failing {
            summarize::PROMPT_NAME => Stage::Summarizing,
            categorize::PROMPT_NAME => Stage::Categorizing,
            _ => Stage::ExtractingKeyInfo,
        };
        assert_eq!(err.stage, expected);
        assert_eq!(vault.documents(), before.as_slice());
        assert!(vault.blobs().is_empty());
        assert!(kv.get(&vault.config().storage.key).await.unwrap().is_none());

        let notices = vault.take_notices();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].is_error());
    }
}

#[tokio::test]
async fn unreadable_and_oversized_files_fail_before_the_model() {
    let temp = tempfile::tempdir().unwrap();
    let llm = Arc::new(diploma_provider());
    let mut config = AppConfig::default();
    config.upload.max_file_size_bytes = 1024 * 1024;
    let mut vault = Vault::with_store(config, memory_kv().await, llm.clone()).await;

    let err = vault.upload(temp.path().join("missing.pdf")).await.unwrap_err();
    assert_eq!(err.stage, Stage::Reading);
    assert!(matches!(err.source, VaultError::FileRead { .. }));

    let err = vault.upload(diploma()).await.unwrap_err();
    assert!(matches!(err.source, VaultError::FileTooLarge { .. }));

    assert!(llm.calls().is_empty());
    assert_eq!(vault.documents(), &[sample_document()]);
}

#[tokio::test]
async fn documents_survive_a_reopen() {
    let temp = tempfile::tempdir().unwrap();
    let mut config = AppConfig::default();
    config.storage.path = temp.path().join("vault.db").to_string_lossy().into_owned();
    config.upload.embed_file_data = true;

    let uploaded = {
        let mut vault = Vault::open(config.clone(), Arc::new(diploma_provider()))
            .await
            .unwrap();
        let small = UploadFile::with_mime("diploma.png", "image/png", b"png".to_vec());
        vault.upload(small).await.unwrap()
    };
    assert_eq!(uploaded.file_url, "data:image/png;base64,cG5n");

    let vault = Vault::open(config, Arc::new(ScriptedProvider::new()))
        .await
        .unwrap();
    assert_eq!(vault.documents(), &[uploaded]);
}

#[tokio::test]
async fn ephemeral_files_do_not_survive_a_reopen() {
    let kv = memory_kv().await;
    let doc = {
        let mut vault =
            Vault::with_store(AppConfig::default(), kv.clone(), Arc::new(diploma_provider())).await;
        vault.upload(diploma()).await.unwrap()
    };
    let vault = Vault::with_store(AppConfig::default(), kv, Arc::new(ScriptedProvider::new())).await;
    let reloaded = vault.get(&doc.id).unwrap();
    assert_eq!(reloaded.file_url, "");
    assert_eq!(reloaded.metadata, doc.metadata);
    assert_eq!(reloaded.key_info, doc.key_info);
}

#[tokio::test]
async fn reset_twice_is_the_same_sample_state() {
    let kv = memory_kv().await;
    let mut vault =
        Vault::with_store(AppConfig::default(), kv.clone(), Arc::new(diploma_provider())).await;
    vault.upload(diploma()).await.unwrap();
    assert_eq!(vault.blobs().len(), 1);

    vault.reset().await;
    let once = vault.documents().to_vec();
    vault.reset().await;
    assert_eq!(vault.documents(), once.as_slice());
    assert_eq!(once, vec![sample_document()]);
    assert!(vault.blobs().is_empty());
    assert!(kv.get(&vault.config().storage.key).await.unwrap().is_none());
}

#[tokio::test]
async fn delete_releases_the_file_and_persists() {
    let kv = memory_kv().await;
    let mut vault =
        Vault::with_store(AppConfig::default(), kv.clone(), Arc::new(diploma_provider())).await;
    let first = vault.upload(diploma()).await.unwrap();
    let second = vault.upload(diploma()).await.unwrap();
    assert_eq!(vault.documents()[0].id, second.id);
    vault.take_notices();

    vault.delete(&first.id).await.unwrap();
    assert_eq!(vault.blobs().len(), 1);
    assert!(vault.file_contents(&first).is_none());
    let stored = kv.get(&vault.config().storage.key).await.unwrap().unwrap();
    assert!(!stored.contains(&first.id));

    assert!(matches!(
        vault.delete("nope").await,
        Err(VaultError::NotFound(_))
    ));
    let notices = vault.take_notices();
    assert_eq!(notices.len(), 2);
    assert!(notices[1].is_error());
}

#[tokio::test]
async fn storage_failures_keep_the_in_memory_state() {
    let kv = memory_kv().await.with_quota(64);
    let mut vault = Vault::with_store(AppConfig::default(), kv.clone(), Arc::new(diploma_provider())).await;
    let doc = vault.upload(diploma()).await.unwrap();
    assert_eq!(vault.documents()[0].id, doc.id);
    assert!(kv.get(&vault.config().storage.key).await.unwrap().is_none());

    let notices = vault.take_notices();
    assert_eq!(notices.len(), 2);
    assert_eq!(notices[1].title, "Saving failed");
}

#[tokio::test]
async fn empty_query_makes_no_model_call() {
    let llm = Arc::new(ScriptedProvider::new());
    let mut vault = Vault::with_store(AppConfig::default(), memory_kv().await, llm.clone()).await;
    assert!(vault.search("").await.unwrap().is_empty());
    assert!(vault.search("   ").await.unwrap().is_empty());

    vault.submit_query("");
    let state = vault.settle_search().await;
    assert!(!state.is_active());
    assert_eq!(vault.visible_documents(None).len(), 1);
    assert_eq!(
        vault.visible_documents(Some(DocumentCategory::Employment)).len(),
        1
    );
    assert!(vault
        .visible_documents(Some(DocumentCategory::Medical))
        .is_empty());
    assert!(llm.calls().is_empty());
}

fn two_document_provider() -> ScriptedProvider {
    ScriptedProvider::new()
        .reply_json(
            summarize::PROMPT_NAME,
            json!({ "summary": "Prescription for amoxicillin from Dr. Lee", "documentType": "Prescription", "name": "Jane Roe" }),
        )
        .reply_json(
            summarize::PROMPT_NAME,
            json!({ "summary": "Bachelor's diploma for Jane Roe", "documentType": "Diploma", "name": "Jane Roe" }),
        )
        .reply_json(categorize::PROMPT_NAME, json!({ "category": "Medical", "confidence": 0.9 }))
        .reply_json(categorize::PROMPT_NAME, json!({ "category": "Education", "confidence": 0.9 }))
        .reply_json(key_info::PROMPT_NAME, json!({ "keyInfo": [] }))
}

#[tokio::test]
async fn medical_query_ranks_the_prescription_first() {
    let llm = Arc::new(two_document_provider());
    let mut vault = Vault::with_store(AppConfig::default(), memory_kv().await, llm.clone()).await;
    let rx = vault
        .upload(UploadFile::with_mime("rx.pdf", "application/pdf", b"%PDF".to_vec()))
        .await
        .unwrap();
    let diploma = vault.upload(diploma()).await.unwrap();
    assert_eq!(rx.category, DocumentCategory::Medical);
    assert_eq!(diploma.category, DocumentCategory::Education);

    let llm_search = ScriptedProvider::new().reply_json(
        search::PROMPT_NAME,
        json!({ "results": [
            { "documentId": diploma.id, "relevanceScore": 0.12 },
            { "documentId": rx.id, "relevanceScore": 0.94 }
        ]}),
    );
    // Ids are only known after upload, so rank with a second provider over
    // the same stored documents.
    let kv = memory_kv().await;
    let config = AppConfig::default();
    docvault_core::persistence::save(&kv, &config.storage.key, vault.documents())
        .await
        .unwrap();
    let mut searcher = Vault::with_store(config, kv, Arc::new(llm_search)).await;

    let results = searcher.search("medical records").await.unwrap();
    assert_eq!(results[0].document_id, rx.id);
    assert!(results[0].relevance_score > results[1].relevance_score);

    searcher.submit_query("medical records");
    let state = searcher.settle_search().await;
    assert_eq!(state.results, results);
    let visible: Vec<&str> = searcher
        .visible_documents(None)
        .into_iter()
        .map(|d| d.id.as_str())
        .collect();
    assert_eq!(visible, vec![rx.id.as_str(), diploma.id.as_str()]);
    assert!(searcher
        .visible_documents(Some(DocumentCategory::Education))
        .iter()
        .all(|d| d.id == diploma.id));
}

#[tokio::test]
async fn search_failures_raise_a_notice() {
    let llm = Arc::new(ScriptedProvider::new().fail(search::PROMPT_NAME, "model down"));
    let mut vault = Vault::with_store(AppConfig::default(), memory_kv().await, llm).await;
    let err = vault.search("resume").await.unwrap_err();
    assert!(matches!(err, VaultError::Search(_)));
    let notices = vault.take_notices();
    assert_eq!(notices.len(), 1);
    assert!(notices[0].is_error());
}

#[tokio::test]
async fn embedded_files_export_after_a_reopen() {
    let temp = tempfile::tempdir().unwrap();
    let mut config = AppConfig::default();
    config.storage.path = temp.path().join("vault.db").to_string_lossy().into_owned();
    config.upload.embed_file_data = true;

    let doc = {
        let mut vault = Vault::open(config.clone(), Arc::new(diploma_provider()))
            .await
            .unwrap();
        let file = UploadFile::with_mime("diploma.png", "image/png", vec![0x89, b'P', b'N', b'G']);
        vault.upload(file).await.unwrap()
    };

    let vault = Vault::open(config, Arc::new(ScriptedProvider::new()))
        .await
        .unwrap();
    let out_dir = temp.path().join("out");
    std::fs::create_dir(&out_dir).unwrap();

    let written = vault.export(&doc.id, &out_dir).await.unwrap();
    assert_eq!(written, out_dir.join("diploma.png"));
    assert_eq!(std::fs::read(&written).unwrap(), vec![0x89, b'P', b'N', b'G']);

    let named = temp.path().join("copy.png");
    assert_eq!(vault.export(&doc.id, &named).await.unwrap(), named);
    assert_eq!(
        vault.file_data(vault.get(&doc.id).unwrap()),
        Some(("image/png".to_string(), vec![0x89, b'P', b'N', b'G']))
    );
}

#[tokio::test]
async fn ephemeral_files_export_only_while_live() {
    let temp = tempfile::tempdir().unwrap();
    let kv = memory_kv().await;
    let target = temp.path().join("diploma.png");

    let doc = {
        let mut vault =
            Vault::with_store(AppConfig::default(), kv.clone(), Arc::new(diploma_provider())).await;
        let doc = vault.upload(diploma()).await.unwrap();
        vault.export(&doc.id, &target).await.unwrap();
        doc
    };
    assert_eq!(std::fs::metadata(&target).unwrap().len(), 2 * 1024 * 1024);

    let vault = Vault::with_store(AppConfig::default(), kv, Arc::new(ScriptedProvider::new())).await;
    assert!(matches!(
        vault.export(&doc.id, &target).await,
        Err(VaultError::FileUnavailable(_))
    ));
    assert!(matches!(
        vault.export("missing", &target).await,
        Err(VaultError::NotFound(_))
    ));
    assert!(matches!(
        vault.export(SAMPLE_DOCUMENT_ID, &target).await,
        Err(VaultError::FileUnavailable(_))
    ));
}
