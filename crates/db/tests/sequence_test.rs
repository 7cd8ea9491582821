//! Integration tests for gapless document numbering.

mod common;

use std::collections::BTreeSet;
use std::sync::Arc;

use common::setup;
use corebook_core::sequence::SequenceError;
use corebook_db::SequenceRepository;
use corebook_db::entities::sea_orm_active_enums::DocumentStatus;
use corebook_shared::types::DocumentId;
use futures::future::join_all;
use tokio::sync::Barrier;

#[tokio::test]
async fn test_post_assigns_scoped_numbers() {
    let Some(fx) = setup().await else { return };
    let sequencer = SequenceRepository::new(fx.db.clone());

    let so = sequencer
        .create_draft(fx.company_id, "SO", Some(2026), None)
        .await
        .expect("draft");
    assert_eq!(so.status, DocumentStatus::Draft);
    assert!(so.number.is_none());

    let posted = sequencer
        .post(fx.company_id, DocumentId::from_uuid(so.id))
        .await
        .expect("post");
    assert_eq!(posted.status, DocumentStatus::Posted);
    assert_eq!(posted.number.as_deref(), Some("SO-2026-000001"));
    assert!(posted.posted_at.is_some());

    let jv = sequencer
        .create_draft(fx.company_id, "JV", None, None)
        .await
        .expect("draft");
    let jv = sequencer
        .post(fx.company_id, DocumentId::from_uuid(jv.id))
        .await
        .expect("post");
    assert_eq!(jv.number.as_deref(), Some("JV-GLOBAL-000001"));

    let cm = sequencer
        .create_draft(fx.company_id, "CM", None, Some("nyc"))
        .await
        .expect("draft");
    let cm = sequencer
        .post(fx.company_id, DocumentId::from_uuid(cm.id))
        .await
        .expect("post");
    assert_eq!(cm.number.as_deref(), Some("CM-NYC-GLOBAL-000001"));
}

#[tokio::test]
async fn test_years_number_independently() {
    let Some(fx) = setup().await else { return };
    let sequencer = SequenceRepository::new(fx.db.clone());

    let mut numbers = Vec::new();
    for year in [2025, 2026, 2025] {
        let draft = sequencer
            .create_draft(fx.company_id, "SO", Some(year), None)
            .await
            .expect("draft");
        let posted = sequencer
            .post(fx.company_id, DocumentId::from_uuid(draft.id))
            .await
            .expect("post");
        numbers.push(posted.number.unwrap_or_default());
    }
    assert_eq!(
        numbers,
        vec!["SO-2025-000001", "SO-2026-000001", "SO-2025-000002"]
    );
}

#[tokio::test]
async fn test_missing_scope_is_rejected() {
    let Some(fx) = setup().await else { return };
    let sequencer = SequenceRepository::new(fx.db.clone());

    let no_year = sequencer.create_draft(fx.company_id, "SO", None, None).await;
    assert!(matches!(no_year, Err(SequenceError::MissingFinancialYear(_))));

    let no_branch = sequencer.create_draft(fx.company_id, "CM", None, None).await;
    assert!(matches!(no_branch, Err(SequenceError::MissingBranch(_))));

    let unknown = sequencer.create_draft(fx.company_id, "NOPE", None, None).await;
    assert!(matches!(unknown, Err(SequenceError::DocumentTypeNotFound(_))));
}

#[tokio::test]
async fn test_posted_and_cancelled_documents_are_final() {
    let Some(fx) = setup().await else { return };
    let sequencer = SequenceRepository::new(fx.db.clone());

    let draft = sequencer
        .create_draft(fx.company_id, "JV", None, None)
        .await
        .expect("draft");
    let id = DocumentId::from_uuid(draft.id);
    sequencer.post(fx.company_id, id).await.expect("post");

    let again = sequencer.post(fx.company_id, id).await;
    assert!(matches!(again, Err(SequenceError::NotDraft { .. })));
    let cancel_posted = sequencer.cancel(fx.company_id, id).await;
    assert!(matches!(cancel_posted, Err(SequenceError::NotDraft { .. })));

    let other = sequencer
        .create_draft(fx.company_id, "JV", None, None)
        .await
        .expect("draft");
    let other_id = DocumentId::from_uuid(other.id);
    let cancelled = sequencer.cancel(fx.company_id, other_id).await.expect("cancel");
    assert_eq!(cancelled.status, DocumentStatus::Cancelled);
    assert!(cancelled.number.is_none());

    let post_cancelled = sequencer.post(fx.company_id, other_id).await;
    assert!(matches!(post_cancelled, Err(SequenceError::NotDraft { .. })));
}

#[tokio::test]
async fn test_foreign_document_is_not_found() {
    let Some(a) = setup().await else { return };
    let Some(b) = setup().await else { return };

    let draft = SequenceRepository::new(a.db.clone())
        .create_draft(a.company_id, "JV", None, None)
        .await
        .expect("draft");
    let result = SequenceRepository::new(b.db.clone())
        .post(b.company_id, DocumentId::from_uuid(draft.id))
        .await;
    assert!(matches!(result, Err(SequenceError::DocumentNotFound(_))));
}

#[tokio::test]
async fn test_concurrent_posts_are_gapless() {
    const POSTERS: usize = 25;
    let Some(fx) = setup().await else { return };

    let sequencer = Arc::new(SequenceRepository::new(fx.db.clone()));
    let barrier = Arc::new(Barrier::new(POSTERS));

    let mut drafts = Vec::with_capacity(POSTERS);
    for _ in 0..POSTERS {
        let draft = sequencer
            .create_draft(fx.company_id, "SINV", Some(2026), None)
            .await
            .expect("draft");
        drafts.push(DocumentId::from_uuid(draft.id));
    }

    let handles = drafts.into_iter().map(|id| {
        let sequencer = Arc::clone(&sequencer);
        let barrier = Arc::clone(&barrier);
        let company_id = fx.company_id;
        tokio::spawn(async move {
            barrier.wait().await;
            sequencer.post(company_id, id).await
        })
    });

    let numbers: BTreeSet<String> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| {
            joined
                .expect("task")
                .expect("post")
                .number
                .expect("number")
        })
        .collect();

    let expected: BTreeSet<String> = (1..=POSTERS)
        .map(|n| format!("SINV-2026-{n:06}"))
        .collect();
    assert_eq!(numbers, expected);
}
