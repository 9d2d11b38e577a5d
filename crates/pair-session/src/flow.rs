//! Pair exchange over a live session.
//!
//! `PairFlow` holds one side's progress and turns local submissions, status
//! changes and inbound messages into [`FlowAction`]s for the caller to carry
//! out. It never touches the transport itself.

use tracing::{debug, info, warn};

use pair_core::{InvitePayload, PairPayloads, PairResultPayload, PeerMessage, Role, SessionId, UserAnswers};
use pair_scoring::{build_pair_payloads, calculate_pair_result};

use crate::manager::SessionStatus;

#[derive(Clone, Debug, PartialEq)]
pub enum FlowAction {
    Send(PeerMessage),
    /// Ask the session to (re)dial this session id.
    Connect(SessionId),
    /// This side's result is ready to show.
    Unlocked(Box<PairResultPayload>),
}

pub struct PairFlow {
    role: Role,
    invite: InvitePayload,
    connected: bool,
    local: Option<UserAnswers>,
    remote: Option<UserAnswers>,
    result_id: Option<u32>,
    payloads: Option<PairPayloads>,
    unlocked: Option<PairResultPayload>,
}

impl PairFlow {
    pub fn new(role: Role, invite: InvitePayload) -> Self {
        Self {
            role,
            invite,
            connected: false,
            local: None,
            remote: None,
            result_id: None,
            payloads: None,
            unlocked: None,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn session_id(&self) -> &SessionId {
        &self.invite.sid
    }

    pub fn result_id(&self) -> Option<u32> {
        self.result_id
    }

    pub fn unlocked(&self) -> Option<&PairResultPayload> {
        self.unlocked.as_ref()
    }

    pub fn has_partner_answers(&self) -> bool {
        self.remote.is_some()
    }

    /// Record this side's answers.
    pub fn submit(&mut self, answers: UserAnswers) -> Vec<FlowAction> {
        let mut actions = Vec::new();
        self.local = Some(answers.clone());
        if self.connected {
            actions.push(FlowAction::Send(PeerMessage::AnswerSummary(answers)));
        } else if self.role == Role::Guest {
            actions.push(FlowAction::Connect(self.invite.sid.clone()));
        }
        self.try_complete(&mut actions);
        actions
    }

    pub fn on_status(&mut self, status: SessionStatus) -> Vec<FlowAction> {
        let was_connected = self.connected;
        self.connected = status == SessionStatus::Connected;
        let mut actions = Vec::new();
        if !self.connected || was_connected {
            return actions;
        }

        debug!(role = %self.role, "connected, resending state");
        if let Some(local) = &self.local {
            actions.push(FlowAction::Send(PeerMessage::AnswerSummary(local.clone())));
        }
        match self.role {
            Role::Owner => {
                if let Some(payloads) = &self.payloads {
                    actions.push(FlowAction::Send(PeerMessage::PairResultPayload(Box::new(payloads.clone()))));
                }
            }
            Role::Guest => {
                if let Some(id) = self.result_id {
                    actions.push(FlowAction::Send(PeerMessage::PairResult(id)));
                }
            }
        }
        actions
    }

    pub fn on_message(&mut self, message: PeerMessage) -> Vec<FlowAction> {
        let mut actions = Vec::new();
        match message {
            PeerMessage::AnswerSummary(answers) => {
                if self.remote.as_ref() == Some(&answers) {
                    debug!("partner answers unchanged");
                    return actions;
                }
                self.remote = Some(answers);
                // fresh partner answers invalidate any earlier result
                self.result_id = None;
                self.payloads = None;
                self.try_complete(&mut actions);
            }
            PeerMessage::PairResult(id) => match self.result_id {
                Some(own) if own != id => {
                    warn!(own, received = id, "partner computed a different result")
                }
                Some(_) => debug!(result_id = id, "partner confirmed result"),
                None => debug!(result_id = id, "partner result arrived before ours"),
            },
            PeerMessage::PairResultPayload(payloads) => {
                if self.role == Role::Owner {
                    debug!("ignoring result bundle as initiator");
                    return actions;
                }
                let view = payloads.b.clone();
                if view.sid != self.invite.sid {
                    warn!(expected = %self.invite.sid, received = %view.sid, "result bundle for another session");
                    return actions;
                }
                if let Some(own) = self.result_id.filter(|own| *own != view.result_id) {
                    warn!(own, received = view.result_id, "result bundle disagrees with local result");
                }
                self.result_id.get_or_insert(view.result_id);
                self.unlock(view, &mut actions);
            }
        }
        actions
    }

    fn try_complete(&mut self, actions: &mut Vec<FlowAction>) {
        let (Some(local), Some(remote)) = (&self.local, &self.remote) else {
            return;
        };
        if self.result_id.is_some() {
            return;
        }
        match self.role {
            Role::Owner => {
                let payloads = build_pair_payloads(&self.invite, local, remote);
                let view = payloads.a.clone();
                info!(result_id = view.result_id, "pair result computed");
                self.result_id = Some(view.result_id);
                actions.push(FlowAction::Send(PeerMessage::PairResultPayload(Box::new(payloads.clone()))));
                self.payloads = Some(payloads);
                self.unlock(view, actions);
            }
            Role::Guest => {
                let pair = calculate_pair_result(remote, local);
                info!(result_id = pair.result_id, "pair result computed");
                self.result_id = Some(pair.result_id);
                actions.push(FlowAction::Send(PeerMessage::PairResult(pair.result_id)));
            }
        }
    }

    fn unlock(&mut self, view: PairResultPayload, actions: &mut Vec<FlowAction>) {
        if self.unlocked.as_ref() == Some(&view) {
            return;
        }
        self.unlocked = Some(view.clone());
        actions.push(FlowAction::Unlocked(Box::new(view)));
    }
}
