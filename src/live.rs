//! Live pair sessions: the connection manager over the relay, driven by the
//! pair exchange flow until this side's result unlocks.

use anyhow::{Context, Result};

use pair_core::{encode_payload, InvitePayload, PairResultPayload, PeerMessage, Role, UserAnswers};
use pair_relay::RelayTransport;
use pair_session::{
    spawn_session, FlowAction, PairFlow, SessionHandle, SessionOptions, SessionSnapshot, SessionStatus, Transport,
};
use pair_settings::PairSettings;

use crate::commands::encode_invite;
use crate::status::{StatusBoard, Tone};

pub async fn host(
    settings: &PairSettings,
    board: &StatusBoard,
    invite: InvitePayload,
    answers: UserAnswers,
) -> Result<()> {
    println!("Share this invite with your partner:\n{}", encode_invite(&invite)?);
    println!("or run: pairlink session join --sid {}", invite.sid);
    run(settings, board, Role::Owner, invite, answers).await
}

pub async fn join(
    settings: &PairSettings,
    board: &StatusBoard,
    invite: InvitePayload,
    answers: UserAnswers,
) -> Result<()> {
    run(settings, board, Role::Guest, invite, answers).await
}

async fn run(
    settings: &PairSettings,
    board: &StatusBoard,
    role: Role,
    invite: InvitePayload,
    answers: UserAnswers,
) -> Result<()> {
    let transport = RelayTransport::new(settings.relay.endpoint());
    let options = SessionOptions::new(role)
        .with_session_id(invite.sid.clone())
        .with_max_retries(settings.session.max_retries)
        .with_retry_delay(settings.session.retry_delay());

    let unlocked = tokio::select! {
        result = exchange(transport, options, role, invite, answers, board) => result?,
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for ctrl+c")?;
            anyhow::bail!("interrupted before the result unlocked");
        }
    };

    board.push_message("Your pair result is ready", Tone::Success);
    println!("{}", encode_payload(&unlocked)?);
    Ok(())
}

/// Run one session until this side's result unlocks.
async fn exchange<T: Transport + 'static>(
    transport: T,
    options: SessionOptions,
    role: Role,
    invite: InvitePayload,
    answers: UserAnswers,
    board: &StatusBoard,
) -> Result<PairResultPayload> {
    let max_retries = options.max_retries;
    let (handle, mut inbound, task) = spawn_session(transport, options);
    let mut statuses = handle.status_changes();
    let mut flow = PairFlow::new(role, invite);

    let mut pending = flow.submit(answers);
    let outcome = loop {
        if let Some(payload) = apply(&handle, std::mem::take(&mut pending)).await {
            break Ok(payload);
        }
        tokio::select! {
            changed = statuses.changed() => {
                if changed.is_err() {
                    break Err(anyhow::anyhow!("session ended"));
                }
                let snapshot = statuses.borrow_and_update().clone();
                if let Some(reason) = report_status(board, role, &snapshot, max_retries) {
                    break Err(anyhow::anyhow!(reason));
                }
                pending = flow.on_status(snapshot.status);
            }
            message = inbound.recv() => match message {
                Some(message) => pending = flow.on_message(message),
                None => break Err(anyhow::anyhow!("session ended")),
            },
        }
    };

    handle.disconnect();
    drop(handle);
    let _ = task.await;
    outcome
}

/// Carry out flow actions. Returns the unlocked payload once there is one.
async fn apply(handle: &SessionHandle, actions: Vec<FlowAction>) -> Option<PairResultPayload> {
    let mut unlocked = None;
    for action in actions {
        match action {
            FlowAction::Send(message) => send(handle, message).await,
            FlowAction::Connect(sid) => handle.connect(Some(sid)),
            FlowAction::Unlocked(payload) => unlocked = Some(*payload),
        }
    }
    unlocked
}

async fn send(handle: &SessionHandle, message: PeerMessage) {
    let kind = message.kind();
    if !handle.send(message).await {
        tracing::debug!(kind, "not connected, message not sent");
    }
}

/// Update the banner for a status change. Returns a reason when the session
/// cannot make progress any more.
fn report_status(board: &StatusBoard, role: Role, snapshot: &SessionSnapshot, max_retries: u32) -> Option<String> {
    match snapshot.status {
        SessionStatus::Listening => {
            board.push_message("Waiting for your partner", Tone::Info);
        }
        SessionStatus::Connecting => {
            board.push_message("Connecting", Tone::Info);
        }
        SessionStatus::Retrying => {
            board.push_message(format!("Reconnecting (attempt {})", snapshot.retry_count), Tone::Info);
        }
        SessionStatus::Connected => {
            board.push_message("Connected", Tone::Success);
        }
        SessionStatus::Idle => {
            board.clear();
        }
        SessionStatus::Error => {
            let error = snapshot.error.clone().unwrap_or_else(|| "connection failed".to_string());
            board.push_message(error.clone(), Tone::Error);
            let out_of_retries = max_retries != 0 && snapshot.retry_count >= max_retries;
            if role == Role::Owner || out_of_retries {
                return Some(error);
            }
        }
    }
    None
}
