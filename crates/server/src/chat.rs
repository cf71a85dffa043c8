use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use sparky_agent::AgentRuntime;
use sparky_core::audit::{AuditContext, InMemoryAuditSink};
use sparky_core::domain::chat::{ChatSession, SessionId};
use sparky_core::domain::lead::LeadDraft;
use sparky_core::errors::ApplicationError;
use sparky_core::flows::DialogueState;
use sparky_db::repositories::{AuditRepository, ChatSessionRepository};

use crate::leads::LeadService;

#[derive(Clone, Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub quick_replies: Vec<String>,
    pub state: DialogueState,
    pub action: Option<String>,
    pub lead_data: Option<LeadDraft>,
}

/// Widget hint naming what the bot just asked for.
fn action_for(state: DialogueState, lead_saved: bool) -> Option<String> {
    let action = match state {
        DialogueState::CollectingName => "collect_name",
        DialogueState::CollectingPhone => "collect_phone",
        DialogueState::CollectingSuburb => "collect_suburb",
        DialogueState::CollectingJobDescription => "collect_job",
        DialogueState::Complete if lead_saved => "lead_saved",
        DialogueState::AwaitingIntent | DialogueState::Complete => return None,
    };
    Some(action.to_string())
}

/// Loads the session, runs the agent pipeline over it, acts on the turn's
/// actions and stores the updated session.
pub struct ChatService {
    runtime: AgentRuntime,
    sessions: Arc<dyn ChatSessionRepository>,
    leads: Arc<LeadService>,
    audit: Arc<dyn AuditRepository>,
}

impl ChatService {
    pub fn new(
        runtime: AgentRuntime,
        sessions: Arc<dyn ChatSessionRepository>,
        leads: Arc<LeadService>,
        audit: Arc<dyn AuditRepository>,
    ) -> Self {
        Self { runtime, sessions, leads, audit }
    }

    pub async fn handle(
        &self,
        request: &ChatRequest,
        correlation_id: &str,
    ) -> Result<ChatResponse, ApplicationError> {
        let now = Utc::now();
        let session_id = SessionId(request.session_id.trim().to_string());
        let session = self
            .sessions
            .load(&session_id)
            .await?
            .unwrap_or_else(|| ChatSession::new(session_id.clone(), now));

        let sink = InMemoryAuditSink::default();
        let context = AuditContext::new(None, Some(session_id.clone()), correlation_id, "chat-widget");
        let mut turn =
            self.runtime.handle_message_with_audit(session, &request.message, now, &sink, &context);

        let lead_saved = turn.should_submit_lead();
        if lead_saved {
            // Keyed by session, so a retry after a failed session save finds
            // the lead stored on the first attempt.
            let lead = self
                .leads
                .capture(&session_id, &turn.session.draft, turn.should_send_confirmation(), &context)
                .await?;
            info!(
                event_name = "chat.turn.lead_captured",
                correlation_id,
                session_id = %session_id,
                lead_id = %lead.id,
                "chat captured a lead"
            );
            turn.session.lead_id = Some(lead.id);
        }

        self.sessions.save(&turn.session).await?;
        for event in sink.drain() {
            if let Err(error) = self.audit.record(&event).await {
                warn!(
                    event_name = "system.audit.write_failed",
                    correlation_id,
                    error = %error,
                    "dialogue audit event could not be stored"
                );
            }
        }

        let state = turn.session.state;
        Ok(ChatResponse {
            response: turn.reply.text,
            quick_replies: turn.reply.quick_replies,
            state,
            action: action_for(state, lead_saved),
            lead_data: (!turn.session.draft.is_empty()).then_some(turn.session.draft),
        })
    }

    /// Reply used when the pipeline or its stores fail.
    pub fn fallback(&self) -> ChatResponse {
        let reply = self.runtime.composer().fallback_reply();
        ChatResponse {
            response: reply.text,
            quick_replies: reply.quick_replies,
            state: DialogueState::AwaitingIntent,
            action: None,
            lead_data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use sparky_agent::AgentRuntime;
    use sparky_core::domain::chat::{ChatSession, SessionId};
    use sparky_core::domain::lead::LeadStatus;
    use sparky_core::flows::DialogueState;
    use sparky_db::repositories::{
        ChatSessionRepository, InMemoryAuditRepository, InMemoryChatSessionRepository,
        RepositoryError,
    };

    use super::{action_for, ChatRequest, ChatService};
    use crate::leads::tests::in_memory_service;
    use crate::notify::SimulatedNotifier;

    fn request(message: &str) -> ChatRequest {
        ChatRequest { message: message.to_string(), session_id: "widget-1".to_string() }
    }

    /// Session store whose next save fails once `fail_next_save` is armed.
    #[derive(Default)]
    struct UnreliableSessions {
        inner: InMemoryChatSessionRepository,
        fail_next_save: AtomicBool,
    }

    #[async_trait]
    impl ChatSessionRepository for UnreliableSessions {
        async fn load(&self, id: &SessionId) -> Result<Option<ChatSession>, RepositoryError> {
            self.inner.load(id).await
        }

        async fn save(&self, session: &ChatSession) -> Result<(), RepositoryError> {
            if self.fail_next_save.swap(false, Ordering::SeqCst) {
                return Err(RepositoryError::Decode("session store unavailable".to_string()));
            }
            self.inner.save(session).await
        }
    }

    #[test]
    fn actions_follow_the_solicited_slot() {
        assert_eq!(action_for(DialogueState::CollectingName, false).as_deref(), Some("collect_name"));
        assert_eq!(
            action_for(DialogueState::CollectingJobDescription, false).as_deref(),
            Some("collect_job")
        );
        assert_eq!(action_for(DialogueState::Complete, true).as_deref(), Some("lead_saved"));
        assert_eq!(action_for(DialogueState::Complete, false), None);
        assert_eq!(action_for(DialogueState::AwaitingIntent, false), None);
    }

    #[tokio::test]
    async fn scripted_conversation_captures_a_lead_across_requests() {
        let sessions = Arc::new(InMemoryChatSessionRepository::default());
        let leads = Arc::new(in_memory_service(Arc::new(SimulatedNotifier)));
        let service = ChatService::new(
            AgentRuntime::default(),
            sessions.clone(),
            leads.clone(),
            Arc::new(InMemoryAuditRepository::default()),
        );

        let first = service.handle(&request("My name is Sam"), "req-1").await.expect("first");
        assert_eq!(first.action.as_deref(), Some("collect_phone"));
        assert_eq!(first.lead_data.as_ref().and_then(|d| d.name.as_deref()), Some("Sam"));

        service.handle(&request("0412 345 678"), "req-2").await.expect("second");
        let last = service
            .handle(&request("Clyde North, fix a broken switchboard"), "req-3")
            .await
            .expect("third");

        assert_eq!(last.state, DialogueState::Complete);
        assert_eq!(last.action.as_deref(), Some("lead_saved"));

        let stored = leads.list().await.expect("leads");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].name, "Sam");
        assert_eq!(stored[0].phone, "0412345678");
        assert_eq!(stored[0].suburb.as_deref(), Some("Clyde North"));
        assert_eq!(stored[0].job_description, "fix a broken switchboard");
        assert_eq!(stored[0].status, LeadStatus::New);
        assert!(stored[0].email_sent);

        let session = sessions
            .load(&SessionId("widget-1".to_string()))
            .await
            .expect("load")
            .expect("session saved");
        assert_eq!(session.lead_id.as_ref(), Some(&stored[0].id));

        let after = service.handle(&request("thanks!"), "req-4").await.expect("after");
        assert_eq!(after.state, DialogueState::Complete);
        assert_eq!(after.action, None);
        assert_eq!(leads.list().await.expect("leads").len(), 1);
    }

    #[tokio::test]
    async fn resending_after_a_failed_session_save_keeps_one_lead() {
        let sessions = Arc::new(UnreliableSessions::default());
        let leads = Arc::new(in_memory_service(Arc::new(SimulatedNotifier)));
        let service = ChatService::new(
            AgentRuntime::default(),
            sessions.clone(),
            leads.clone(),
            Arc::new(InMemoryAuditRepository::default()),
        );

        service.handle(&request("My name is Sam"), "req-1").await.expect("first");
        service.handle(&request("0412 345 678"), "req-2").await.expect("second");

        sessions.fail_next_save.store(true, Ordering::SeqCst);
        let failed = service.handle(&request("Clyde North, fix a broken switchboard"), "req-3").await;
        assert!(failed.is_err());
        assert_eq!(leads.list().await.expect("leads").len(), 1);

        let retried = service
            .handle(&request("Clyde North, fix a broken switchboard"), "req-4")
            .await
            .expect("retry");
        assert_eq!(retried.state, DialogueState::Complete);
        assert_eq!(retried.action.as_deref(), Some("lead_saved"));

        let stored = leads.list().await.expect("leads");
        assert_eq!(stored.len(), 1);
        assert_eq!(leads.email_logs(None).await.expect("logs").len(), 1);

        let session = sessions
            .load(&SessionId("widget-1".to_string()))
            .await
            .expect("load")
            .expect("session saved");
        assert_eq!(session.lead_id.as_ref(), Some(&stored[0].id));
    }

    #[tokio::test]
    async fn fallback_points_at_the_business_phone() {
        let service = ChatService::new(
            AgentRuntime::default(),
            Arc::new(InMemoryChatSessionRepository::default()),
            Arc::new(in_memory_service(Arc::new(SimulatedNotifier))),
            Arc::new(InMemoryAuditRepository::default()),
        );

        let reply = service.fallback();
        assert!(reply.response.contains("call us directly on 0448 195 614"));
        assert!(reply.quick_replies.is_empty());
    }
}
