use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::lead::LeadDraft;
use crate::flows::states::{DialogueAction, DialogueEvent, DialogueState, TransitionOutcome};

pub trait FlowDefinition {
    fn initial_state(&self) -> DialogueState;
    fn transition(
        &self,
        current: DialogueState,
        event: DialogueEvent,
        draft: &LeadDraft,
    ) -> TransitionOutcome;
}

/// Linear capture flow: name → phone → suburb → job description → complete.
#[derive(Clone, Debug, Default)]
pub struct LeadCaptureFlow;

impl FlowDefinition for LeadCaptureFlow {
    fn initial_state(&self) -> DialogueState {
        DialogueState::AwaitingIntent
    }

    fn transition(
        &self,
        current: DialogueState,
        event: DialogueEvent,
        draft: &LeadDraft,
    ) -> TransitionOutcome {
        transition_lead_capture(current, event, draft)
    }
}

pub struct DialogueTracker<F = LeadCaptureFlow> {
    flow: F,
}

impl<F> DialogueTracker<F>
where
    F: FlowDefinition,
{
    pub fn new(flow: F) -> Self {
        Self { flow }
    }

    pub fn initial_state(&self) -> DialogueState {
        self.flow.initial_state()
    }

    pub fn advance(
        &self,
        current: DialogueState,
        event: DialogueEvent,
        draft: &LeadDraft,
    ) -> TransitionOutcome {
        self.flow.transition(current, event, draft)
    }

    pub fn advance_with_audit<S>(
        &self,
        current: DialogueState,
        event: DialogueEvent,
        draft: &LeadDraft,
        sink: &S,
        audit: &AuditContext,
    ) -> TransitionOutcome
    where
        S: AuditSink + ?Sized,
    {
        let outcome = self.advance(current, event, draft);
        if outcome.changed() {
            sink.emit(
                AuditEvent::new(
                    audit,
                    "dialogue.transition_applied",
                    AuditCategory::Dialogue,
                    AuditOutcome::Success,
                )
                .with_metadata("from", outcome.from.as_str())
                .with_metadata("to", outcome.to.as_str())
                .with_metadata("event", format!("{:?}", outcome.event)),
            );
        }
        outcome
    }
}

impl Default for DialogueTracker<LeadCaptureFlow> {
    fn default() -> Self {
        Self::new(LeadCaptureFlow)
    }
}

fn transition_lead_capture(
    current: DialogueState,
    event: DialogueEvent,
    draft: &LeadDraft,
) -> TransitionOutcome {
    use DialogueAction::{PromptForSlot, SendConfirmation, SubmitLead};

    let (to, actions) = match current {
        DialogueState::Complete => (DialogueState::Complete, Vec::new()),
        _ if draft.is_complete() => (DialogueState::Complete, vec![SubmitLead, SendConfirmation]),
        DialogueState::AwaitingIntent
            if event == DialogueEvent::MessageReceived && draft.is_empty() =>
        {
            (DialogueState::AwaitingIntent, Vec::new())
        }
        _ => {
            // Skip over slots earlier than the current position so the
            // dialogue never walks backwards (an unanswered suburb stays skipped).
            let next = draft
                .missing_slots()
                .into_iter()
                .map(DialogueState::for_slot)
                .find(|state| state.rank() >= current.rank());
            match next {
                Some(state) => {
                    let actions = state.solicited_slot().map(PromptForSlot).into_iter().collect();
                    (state, actions)
                }
                None => (current, Vec::new()),
            }
        }
    };

    TransitionOutcome { from: current, to, event, actions }
}
