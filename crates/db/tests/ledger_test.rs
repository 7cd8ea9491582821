//! Integration tests for ledger commit, reversal, balances and statements.

mod common;

use common::{BANK, CASH, EQUITY, RECEIVABLE, REVENUE, date, setup};
use corebook_core::ledger::{LedgerError, Proposal};
use corebook_db::SequenceRepository;
use corebook_db::entities::{journal_entries, sea_orm_active_enums::AccountType};
use corebook_db::repositories::{AccountRepository, CreateAccountInput};
use corebook_shared::types::{DocumentId, JournalEntryId};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use uuid::Uuid;

fn journal(company_code: &str, key: &str, amount: Decimal) -> Proposal {
    Proposal::new("JV", company_code, key, "USD", date(2026, 3, 15))
        .with_narration("Owner contribution")
        .debit(CASH, amount)
        .credit(EQUITY, amount)
}

#[tokio::test]
async fn test_commit_updates_balances() {
    let Some(fx) = setup().await else { return };
    let ledger = fx.ledger();

    let entry_id = ledger
        .commit(journal(&fx.company.code, "JV-1", dec!(1000)))
        .await
        .expect("commit");

    assert_eq!(fx.balance(CASH).await, dec!(1000));
    assert_eq!(fx.balance(EQUITY).await, dec!(-1000));

    let entry = ledger
        .get_entry(fx.company_id, JournalEntryId::from_uuid(entry_id))
        .await
        .expect("entry");
    assert_eq!(entry.lines.len(), 2);
    assert_eq!(entry.entry.idempotency_key, "JV-1");
    assert!(entry.entry.document_id.is_none());
}

#[tokio::test]
async fn test_balances_include_untouched_accounts() {
    let Some(fx) = setup().await else { return };

    let balances = fx.ledger().get_balances(fx.company_id).await.expect("balances");
    let bank = balances
        .iter()
        .find(|b| b.account_code == BANK)
        .expect("bank listed");
    assert_eq!(bank.total_debit, Decimal::ZERO);
    assert_eq!(bank.total_credit, Decimal::ZERO);
    assert_eq!(bank.balance, Decimal::ZERO);
}

#[tokio::test]
async fn test_duplicate_key_writes_nothing() {
    let Some(fx) = setup().await else { return };
    let ledger = fx.ledger();

    ledger
        .commit(journal(&fx.company.code, "JV-DUP", dec!(250)))
        .await
        .expect("first commit");
    let second = ledger
        .commit(journal(&fx.company.code, "JV-DUP", dec!(999)))
        .await;

    assert!(matches!(second, Err(LedgerError::DuplicateProposal(_))));
    assert_eq!(fx.balance(CASH).await, dec!(250));

    let entries = journal_entries::Entity::find()
        .filter(journal_entries::Column::CompanyId.eq(fx.company.id))
        .count(&fx.db)
        .await
        .expect("count");
    assert_eq!(entries, 1);
}

#[tokio::test]
async fn test_same_key_in_two_companies_is_allowed() {
    let Some(a) = setup().await else { return };
    let Some(b) = setup().await else { return };

    a.ledger()
        .commit(journal(&a.company.code, "SHARED", dec!(10)))
        .await
        .expect("company a");
    b.ledger()
        .commit(journal(&b.company.code, "SHARED", dec!(20)))
        .await
        .expect("company b");

    assert_eq!(a.balance(CASH).await, dec!(10));
    assert_eq!(b.balance(CASH).await, dec!(20));
}

#[tokio::test]
async fn test_foreign_account_code_is_not_found() {
    let Some(a) = setup().await else { return };
    let Some(b) = setup().await else { return };

    AccountRepository::new(b.db.clone())
        .create_account(CreateAccountInput {
            company_id: b.company_id,
            code: "9900".into(),
            name: "Only in B".into(),
            account_type: AccountType::Asset,
        })
        .await
        .expect("account in b");

    let proposal = Proposal::new("JV", &a.company.code, "JV-X", "USD", date(2026, 3, 15))
        .debit("9900", dec!(5))
        .credit(EQUITY, dec!(5));
    let result = a.ledger().commit(proposal).await;

    assert!(matches!(result, Err(LedgerError::AccountNotFound(code)) if code == "9900"));
    assert_eq!(a.balance(EQUITY).await, Decimal::ZERO);
}

#[tokio::test]
async fn test_unknown_company_is_rejected() {
    let Some(fx) = setup().await else { return };

    let result = fx
        .ledger()
        .commit(journal("NO-SUCH-COMPANY", "JV-1", dec!(1)))
        .await;
    assert!(matches!(result, Err(LedgerError::CompanyNotFound(_))));
}

#[tokio::test]
async fn test_unbalanced_proposal_is_rejected() {
    let Some(fx) = setup().await else { return };

    let proposal = Proposal::new("JV", &fx.company.code, "JV-U", "USD", date(2026, 3, 15))
        .debit(CASH, dec!(100))
        .credit(EQUITY, dec!(99.99));
    let result = fx.ledger().commit(proposal).await;

    assert!(matches!(result, Err(LedgerError::Unbalanced { .. })));
    assert_eq!(fx.balance(CASH).await, Decimal::ZERO);
}

#[tokio::test]
async fn test_foreign_currency_posts_base_amounts() {
    let Some(fx) = setup().await else { return };

    let proposal = Proposal::new("JV", &fx.company.code, "JV-EUR", "EUR", date(2026, 3, 15))
        .with_exchange_rate(dec!(1.1))
        .debit(RECEIVABLE, dec!(100))
        .credit(REVENUE, dec!(100));
    fx.ledger().commit(proposal).await.expect("commit");

    assert_eq!(fx.balance(RECEIVABLE).await, dec!(110));
    assert_eq!(fx.balance(REVENUE).await, dec!(-110));
}

#[tokio::test]
async fn test_reverse_once_then_reject() {
    let Some(fx) = setup().await else { return };
    let ledger = fx.ledger();

    let original = ledger
        .commit(journal(&fx.company.code, "JV-R", dec!(300)))
        .await
        .expect("commit");
    let original = JournalEntryId::from_uuid(original);

    let blank = ledger.reverse(fx.company_id, original, "   ").await;
    assert!(matches!(blank, Err(LedgerError::ReversalReasonRequired)));

    let reversal = ledger
        .reverse(fx.company_id, original, "Posted to wrong period")
        .await
        .expect("reverse");
    assert_eq!(fx.balance(CASH).await, Decimal::ZERO);
    assert_eq!(fx.balance(EQUITY).await, Decimal::ZERO);

    let entry = ledger
        .get_entry(fx.company_id, JournalEntryId::from_uuid(reversal))
        .await
        .expect("reversal entry");
    assert_eq!(entry.entry.reverses_entry_id, Some(original.into_inner()));
    assert_eq!(entry.entry.idempotency_key, format!("REV-{}", original.into_inner()));

    let again = ledger.reverse(fx.company_id, original, "Again").await;
    assert!(matches!(again, Err(LedgerError::AlreadyReversed(_))));
}

#[tokio::test]
async fn test_reverse_foreign_entry_is_not_found() {
    let Some(a) = setup().await else { return };
    let Some(b) = setup().await else { return };

    let entry = a
        .ledger()
        .commit(journal(&a.company.code, "JV-A", dec!(1)))
        .await
        .expect("commit");
    let result = b
        .ledger()
        .reverse(b.company_id, JournalEntryId::from_uuid(entry), "Not mine")
        .await;
    assert!(matches!(result, Err(LedgerError::EntryNotFound(_))));

    let missing = a
        .ledger()
        .reverse(a.company_id, JournalEntryId::from_uuid(Uuid::now_v7()), "Gone")
        .await;
    assert!(matches!(missing, Err(LedgerError::EntryNotFound(_))));
}

#[tokio::test]
async fn test_statement_running_balance() {
    let Some(fx) = setup().await else { return };
    let ledger = fx.ledger();
    let code = &fx.company.code;

    for (key, day, amount) in [("S-1", 1, dec!(100)), ("S-2", 10, dec!(50)), ("S-3", 20, dec!(25))] {
        let proposal = Proposal::new("JV", code, key, "USD", date(2026, 4, day))
            .debit(CASH, amount)
            .credit(EQUITY, amount);
        ledger.commit(proposal).await.expect("commit");
    }
    let withdrawal = Proposal::new("JV", code, "S-4", "USD", date(2026, 4, 15))
        .debit(EQUITY, dec!(30))
        .credit(CASH, dec!(30));
    ledger.commit(withdrawal).await.expect("commit");

    let statement = ledger
        .get_account_statement(fx.company_id, CASH, date(2026, 4, 5), date(2026, 4, 30))
        .await
        .expect("statement");

    assert_eq!(statement.opening_balance, dec!(100));
    let running: Vec<Decimal> = statement.lines.iter().map(|l| l.running_balance).collect();
    assert_eq!(running, vec![dec!(150), dec!(120), dec!(145)]);
    assert_eq!(statement.closing_balance, dec!(145));
}

#[tokio::test]
async fn test_auto_numbered_type_gets_document() {
    let Some(fx) = setup().await else { return };
    let ledger = fx.ledger();

    let proposal = Proposal::new("DN", &fx.company.code, "DN-1", "USD", date(2026, 5, 2))
        .debit(CASH, dec!(10))
        .credit(EQUITY, dec!(10));
    let entry_id = ledger.commit(proposal).await.expect("commit");

    let entry = ledger
        .get_entry(fx.company_id, JournalEntryId::from_uuid(entry_id))
        .await
        .expect("entry");
    let document_id = entry.entry.document_id.expect("document assigned");
    let document = SequenceRepository::new(fx.db.clone())
        .get_document(fx.company_id, DocumentId::from_uuid(document_id))
        .await
        .expect("document");
    assert_eq!(document.number.as_deref(), Some("DN-2026-000001"));
}

#[tokio::test]
async fn test_validate_does_not_touch_database() {
    let proposal = Proposal::new("JV", "ANY", "K", "usd", date(2026, 1, 1))
        .debit(CASH, dec!(1))
        .credit(EQUITY, dec!(1));
    let validated = corebook_db::LedgerRepository::validate(&proposal).expect("valid");
    assert_eq!(validated.currency, "USD");
    assert_eq!(validated.lines.len(), 2);
}

#[tokio::test]
async fn test_find_by_key_is_company_scoped() {
    let Some(a) = setup().await else { return };
    let Some(b) = setup().await else { return };
    let entry_id = a
        .ledger()
        .commit(journal(&a.company.code, "JV-LOOKUP", dec!(15)))
        .await
        .expect("commit");

    let found = a
        .ledger()
        .find_by_key(a.company_id, "JV-LOOKUP")
        .await
        .expect("query")
        .expect("entry for key");
    assert_eq!(found.id, entry_id);

    assert!(a.ledger().find_by_key(a.company_id, "JV-NONE").await.expect("query").is_none());
    assert!(b.ledger().find_by_key(b.company_id, "JV-LOOKUP").await.expect("query").is_none());
}

#[tokio::test]
async fn test_entries_for_document() {
    let Some(fx) = setup().await else { return };
    let Some(other) = setup().await else { return };
    let ledger = fx.ledger();
    let proposal = Proposal::new("DN", &fx.company.code, "DN-LINK", "USD", date(2026, 5, 3))
        .debit(CASH, dec!(7))
        .credit(EQUITY, dec!(7));
    let entry_id = ledger.commit(proposal).await.expect("commit");
    let document_id = ledger
        .get_entry(fx.company_id, JournalEntryId::from_uuid(entry_id))
        .await
        .expect("entry")
        .entry
        .document_id
        .map(DocumentId::from_uuid)
        .expect("document assigned");

    let entries = ledger
        .entries_for_document(fx.company_id, document_id)
        .await
        .expect("entries");
    let ids: Vec<Uuid> = entries.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![entry_id]);

    let foreign = other
        .ledger()
        .entries_for_document(other.company_id, document_id)
        .await
        .expect("entries");
    assert!(foreign.is_empty());
}

#[tokio::test]
async fn test_resolve_code() {
    let Some(fx) = setup().await else { return };
    let Some(other) = setup().await else { return };
    let accounts = AccountRepository::new(fx.db.clone());

    let cash_id = accounts
        .list_accounts(fx.company_id)
        .await
        .expect("accounts")
        .into_iter()
        .find(|a| a.code == CASH)
        .map(|a| a.id)
        .expect("cash listed");
    assert_eq!(accounts.resolve_code(fx.company_id, CASH).await.expect("cash"), cash_id);
    assert_eq!(
        accounts.resolve_code(fx.company_id, " 1000 ").await.expect("trimmed"),
        cash_id
    );

    let unknown = accounts.resolve_code(fx.company_id, "9999").await;
    assert!(matches!(unknown, Err(LedgerError::AccountNotFound(code)) if code == "9999"));

    let foreign = accounts.resolve_code(other.company_id, CASH).await;
    let foreign_id = foreign.expect("other company has its own cash account");
    assert_ne!(foreign_id, cash_id);

    fx.set_account_active(CASH, false).await;
    let inactive = accounts.resolve_code(fx.company_id, CASH).await;
    assert!(matches!(inactive, Err(LedgerError::AccountNotFound(_))));
}
