use alloy::primitives::B256;

use parity_signer_core::{
    request_transition, ConfirmationOutcome, RequestState, RequestStatus, SignerAction,
    SignerError, SignerRequestId,
};

fn id() -> SignerRequestId {
    SignerRequestId(1)
}

#[test]
fn pending_confirms_with_hash() {
    let outcome = ConfirmationOutcome::TransactionHash(B256::repeat_byte(0xaa));
    let (next, transition) =
        request_transition(id(), &RequestStatus::Pending, SignerAction::Confirm(outcome.clone()))
            .expect("pending -> confirmed");
    assert_eq!(next, RequestStatus::Confirmed(outcome));
    assert_eq!(transition.from, RequestState::Pending);
    assert_eq!(transition.to, RequestState::Confirmed);
}

#[test]
fn pending_rejects() {
    let (next, transition) = request_transition(id(), &RequestStatus::Pending, SignerAction::Reject)
        .expect("pending -> rejected");
    assert_eq!(next, RequestStatus::Rejected);
    assert_eq!(transition.to, RequestState::Rejected);
}

#[test]
fn failed_confirm_stays_pending() {
    let (next, transition) =
        request_transition(id(), &RequestStatus::Pending, SignerAction::ConfirmFailed)
            .expect("pending -> pending");
    assert_eq!(next, RequestStatus::Pending);
    assert_eq!(transition.from, transition.to);
}

#[test]
fn rejected_cannot_be_confirmed() {
    let err = request_transition(
        id(),
        &RequestStatus::Rejected,
        SignerAction::Confirm(ConfirmationOutcome::TransactionHash(B256::ZERO)),
    )
    .expect_err("must fail");
    assert!(matches!(
        err,
        SignerError::IllegalTransition {
            from: RequestState::Rejected,
            action: "confirm"
        }
    ));
    assert!(err.to_string().contains("illegal signer transition"));
}

#[test]
fn confirmed_cannot_be_rejected() {
    let confirmed = RequestStatus::Confirmed(ConfirmationOutcome::TransactionHash(B256::ZERO));
    let err = request_transition(id(), &confirmed, SignerAction::Reject).expect_err("must fail");
    assert!(matches!(err, SignerError::IllegalTransition { .. }));
}
