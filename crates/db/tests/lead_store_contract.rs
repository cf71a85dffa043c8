use sparky_core::domain::chat::SessionId;
use sparky_core::domain::lead::{LeadDraft, LeadFlag, LeadId, LeadSlot, LeadStatus};
use sparky_core::errors::DomainError;
use sparky_db::repositories::{
    InMemoryLeadRepository, LeadRepository, RepositoryError, SqlLeadRepository,
};
use sparky_db::{connect_with_settings, migrations};

type ContractResult = Result<(), String>;

fn complete_draft(name: &str) -> LeadDraft {
    let mut draft = LeadDraft::default();
    draft.fill(LeadSlot::Name, name);
    draft.fill(LeadSlot::Phone, "0412 345 678");
    draft.fill(LeadSlot::Suburb, "Clyde North");
    draft.fill(LeadSlot::JobDescription, "fix a broken switchboard");
    draft
}

async fn run_contract(repo: &dyn LeadRepository) -> ContractResult {
    let lead = repo.create(&complete_draft("Sam")).await.map_err(|e| e.to_string())?;
    if lead.status != LeadStatus::New || lead.phone != "0412345678" {
        return Err(format!("unexpected new lead: {lead:?}"));
    }
    if lead.sms_sent || lead.email_sent || lead.quote_sent || lead.review_requested {
        return Err("new lead should start with every flag cleared".to_string());
    }

    let sms = repo.set_flag(&lead.id, LeadFlag::SmsSent).await.map_err(|e| e.to_string())?;
    let sms_again = repo.set_flag(&lead.id, LeadFlag::SmsSent).await.map_err(|e| e.to_string())?;
    if !sms.changed || sms_again.changed {
        return Err("sms flag should change exactly once".to_string());
    }

    let released = repo.clear_flag(&lead.id, LeadFlag::SmsSent).await.map_err(|e| e.to_string())?;
    let reclaimed = repo.set_flag(&lead.id, LeadFlag::SmsSent).await.map_err(|e| e.to_string())?;
    if !released || !reclaimed.changed {
        return Err("a released sms flag should be claimable again".to_string());
    }

    match repo.set_flag(&lead.id, LeadFlag::ReviewRequested).await {
        Err(RepositoryError::Domain(DomainError::ReviewNotAllowed { .. })) => {}
        other => return Err(format!("review before completion should fail, got {other:?}")),
    }

    for status in [LeadStatus::Contacted, LeadStatus::Booked, LeadStatus::Completed] {
        let updated = repo.update_status(&lead.id, status).await.map_err(|e| e.to_string())?;
        if updated.status != status {
            return Err(format!("expected {status}, got {}", updated.status));
        }
    }

    match repo.update_status(&lead.id, LeadStatus::New).await {
        Err(RepositoryError::Domain(DomainError::InvalidStatusTransition { .. })) => {}
        other => return Err(format!("backwards move should fail, got {other:?}")),
    }

    match repo.update_status(&LeadId("missing".to_string()), LeadStatus::Booked).await {
        Err(RepositoryError::NotFound(id)) if id == "missing" => {}
        other => return Err(format!("unknown id should be NotFound, got {other:?}")),
    }

    let review =
        repo.set_flag(&lead.id, LeadFlag::ReviewRequested).await.map_err(|e| e.to_string())?;
    if !review.changed || !review.lead.review_requested {
        return Err("review request should be recorded once completed".to_string());
    }

    let stats = repo.stats().await.map_err(|e| e.to_string())?;
    if stats.total_leads != 1 || stats.completed != 1 {
        return Err(format!("unexpected stats: {stats:?}"));
    }

    let session = SessionId("widget-1".to_string());
    let captured =
        repo.create_for_session(&session, &complete_draft("Alex")).await.map_err(|e| e.to_string())?;
    let repeated =
        repo.create_for_session(&session, &complete_draft("Alex")).await.map_err(|e| e.to_string())?;
    if !captured.created || repeated.created || repeated.lead.id != captured.lead.id {
        return Err("a chat session should produce at most one lead".to_string());
    }
    let total = repo.list().await.map_err(|e| e.to_string())?.len();
    if total != 2 {
        return Err(format!("expected 2 leads after session capture, got {total}"));
    }

    Ok(())
}

#[tokio::test]
async fn sql_lead_store_honours_contract() {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("run migrations");
    let repo = SqlLeadRepository::new(pool);

    run_contract(&repo).await.expect("sql contract");
}

#[tokio::test]
async fn in_memory_lead_store_honours_contract() {
    let repo = InMemoryLeadRepository::default();

    run_contract(&repo).await.expect("in-memory contract");
}
