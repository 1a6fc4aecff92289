use crate::domain::{ConfirmationOutcome, RequestStatus, SignerRequestId};
use crate::ports::SignerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Pending,
    Confirmed,
    Rejected,
}

impl From<&RequestStatus> for RequestState {
    fn from(status: &RequestStatus) -> Self {
        match status {
            RequestStatus::Pending => Self::Pending,
            RequestStatus::Confirmed(_) => Self::Confirmed,
            RequestStatus::Rejected => Self::Rejected,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignerAction {
    Confirm(ConfirmationOutcome),
    /// A confirm call failed (bad password, node error). The request stays
    /// pending and may be confirmed or rejected later.
    ConfirmFailed,
    Reject,
}

impl SignerAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Confirm(_) => "confirm",
            Self::ConfirmFailed => "confirm_failed",
            Self::Reject => "reject",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTransition {
    pub request_id: SignerRequestId,
    pub from: RequestState,
    pub to: RequestState,
    pub reason: &'static str,
}

pub fn request_transition(
    id: SignerRequestId,
    status: &RequestStatus,
    action: SignerAction,
) -> Result<(RequestStatus, StateTransition), SignerError> {
    let from = RequestState::from(status);
    let action_name = action.name();
    let (next, reason) = match (status, action) {
        (RequestStatus::Pending, SignerAction::Confirm(outcome)) => {
            (RequestStatus::Confirmed(outcome), "confirmed by signer")
        }
        (RequestStatus::Pending, SignerAction::ConfirmFailed) => {
            (RequestStatus::Pending, "confirm attempt failed")
        }
        (RequestStatus::Pending, SignerAction::Reject) => {
            (RequestStatus::Rejected, "rejected by signer")
        }
        _ => {
            return Err(SignerError::IllegalTransition {
                from,
                action: action_name,
            })
        }
    };
    let transition = StateTransition {
        request_id: id,
        from,
        to: RequestState::from(&next),
        reason,
    };
    Ok((next, transition))
}
