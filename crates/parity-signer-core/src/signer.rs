//! Local view of the node's signer confirmation queue.
//!
//! Requests enter as `Pending` when the node reports them and leave the
//! pending set exactly once, through a successful confirm or reject. A failed
//! confirm leaves the request pending so the user can retry. Requests with a
//! confirm or reject in flight survive a concurrent `refresh`, since the node
//! stops listing them as soon as it has acted.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use alloy::primitives::Bytes;
use serde_json::Value;

use crate::domain::{ConfirmationOutcome, SignerRequest, SignerRequestId};
use crate::ports::{SignerError, Transport, TransportError};
use crate::state_machine::{request_transition, RequestState, SignerAction, StateTransition};

pub struct SignerQueue<T: Transport> {
    transport: T,
    inner: Mutex<QueueState>,
}

#[derive(Debug, Default)]
struct QueueState {
    pending: BTreeMap<SignerRequestId, SignerRequest>,
    finished: BTreeMap<SignerRequestId, SignerRequest>,
    in_flight: BTreeSet<SignerRequestId>,
    transitions: Vec<StateTransition>,
}

/// Marks a request as having a node call in flight until dropped.
struct InFlight<'a> {
    inner: &'a Mutex<QueueState>,
    id: SignerRequestId,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Ok(mut g) = self.inner.lock() {
            g.in_flight.remove(&self.id);
        }
    }
}

impl<T: Transport> SignerQueue<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            inner: Mutex::new(QueueState::default()),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn state(&self) -> Result<MutexGuard<'_, QueueState>, SignerError> {
        self.inner
            .lock()
            .map_err(|e| SignerError::Lock(e.to_string()))
    }

    /// Pulls `signer_requestsToConfirm` and reconciles the pending set.
    /// Returns the pending requests in id order.
    pub async fn refresh(&self) -> Result<Vec<SignerRequest>, SignerError> {
        let result = self
            .transport
            .execute("signer_requestsToConfirm", Vec::new())
            .await?;
        let items = result.as_array().ok_or_else(|| {
            SignerError::Decode("signer_requestsToConfirm must return an array".to_owned())
        })?;
        let reported = items
            .iter()
            .map(SignerRequest::from_value)
            .collect::<Result<Vec<_>, _>>()?;

        let mut g = self.state()?;
        let seen: BTreeSet<SignerRequestId> = reported.iter().map(|r| r.id).collect();
        let QueueState {
            pending, in_flight, ..
        } = &mut *g;
        pending.retain(|id, _| {
            let keep = seen.contains(id) || in_flight.contains(id);
            if !keep {
                tracing::debug!(request = %id, "signer request no longer reported by node");
            }
            keep
        });
        for request in reported {
            if g.finished.contains_key(&request.id) || g.pending.contains_key(&request.id) {
                continue;
            }
            tracing::info!(request = %request.id, kind = request.payload.kind(), "new signer request");
            g.pending.insert(request.id, request);
        }
        Ok(g.pending.values().cloned().collect())
    }

    /// `signer_confirmRequest` with an optional modification object and the
    /// account password.
    pub async fn confirm(
        &self,
        id: SignerRequestId,
        modification: Value,
        password: &str,
    ) -> Result<ConfirmationOutcome, SignerError> {
        let _in_flight = self.begin(id)?;
        let result = self
            .transport
            .execute(
                "signer_confirmRequest",
                vec![id.to_param(), modification, Value::String(password.to_owned())],
            )
            .await;
        self.settle_confirm(id, result)
    }

    /// `signer_confirmRequestRaw` with data signed outside the node.
    pub async fn confirm_raw(
        &self,
        id: SignerRequestId,
        signed: Bytes,
    ) -> Result<ConfirmationOutcome, SignerError> {
        let _in_flight = self.begin(id)?;
        let result = self
            .transport
            .execute(
                "signer_confirmRequestRaw",
                vec![id.to_param(), Value::String(signed.to_string())],
            )
            .await;
        self.settle_confirm(id, result)
    }

    pub async fn reject(&self, id: SignerRequestId) -> Result<(), SignerError> {
        let _in_flight = self.begin(id)?;
        let result = self
            .transport
            .execute("signer_rejectRequest", vec![id.to_param()])
            .await?;
        if result.as_bool() != Some(true) {
            tracing::warn!(request = %id, %result, "node refused signer rejection");
            return Err(SignerError::RejectRefused(id));
        }
        self.apply(id, SignerAction::Reject)?;
        Ok(())
    }

    pub fn get(&self, id: SignerRequestId) -> Result<Option<SignerRequest>, SignerError> {
        let g = self.state()?;
        Ok(g.pending.get(&id).or_else(|| g.finished.get(&id)).cloned())
    }

    pub fn pending(&self) -> Result<Vec<SignerRequest>, SignerError> {
        Ok(self.state()?.pending.values().cloned().collect())
    }

    pub fn len(&self) -> Result<usize, SignerError> {
        Ok(self.state()?.pending.len())
    }

    pub fn is_empty(&self) -> Result<bool, SignerError> {
        Ok(self.len()? == 0)
    }

    /// Drains the transitions recorded since the previous call.
    pub fn take_transitions(&self) -> Result<Vec<StateTransition>, SignerError> {
        Ok(std::mem::take(&mut self.state()?.transitions))
    }

    fn begin(&self, id: SignerRequestId) -> Result<InFlight<'_>, SignerError> {
        let mut g = self.state()?;
        if g.pending.contains_key(&id) {
            g.in_flight.insert(id);
            return Ok(InFlight {
                inner: &self.inner,
                id,
            });
        }
        match g.finished.get(&id) {
            Some(done) => Err(SignerError::AlreadyTerminal {
                id,
                state: RequestState::from(&done.status),
            }),
            None => Err(SignerError::NotFound(id)),
        }
    }

    fn settle_confirm(
        &self,
        id: SignerRequestId,
        result: Result<Value, TransportError>,
    ) -> Result<ConfirmationOutcome, SignerError> {
        match result {
            Ok(value) => {
                let outcome = ConfirmationOutcome::from_result(&value);
                self.apply(id, SignerAction::Confirm(outcome.clone()))?;
                Ok(outcome)
            }
            Err(err) => {
                tracing::debug!(request = %id, error = %err, "signer confirm failed");
                if let Err(state_err) = self.apply(id, SignerAction::ConfirmFailed) {
                    tracing::warn!(request = %id, error = %state_err, "failed confirm not recorded");
                }
                Err(err.into())
            }
        }
    }

    fn apply(&self, id: SignerRequestId, action: SignerAction) -> Result<StateTransition, SignerError> {
        let mut g = self.state()?;
        let Some(mut request) = g.pending.remove(&id) else {
            return match g.finished.get(&id) {
                Some(done) => Err(SignerError::AlreadyTerminal {
                    id,
                    state: RequestState::from(&done.status),
                }),
                None => Err(SignerError::NotFound(id)),
            };
        };
        let (next, transition) = match request_transition(id, &request.status, action) {
            Ok(step) => step,
            Err(err) => {
                g.pending.insert(id, request);
                return Err(err);
            }
        };
        request.status = next;
        if request.status.is_terminal() {
            tracing::info!(request = %id, to = ?transition.to, "signer request settled");
            g.finished.insert(id, request);
        } else {
            g.pending.insert(id, request);
        }
        g.transitions.push(transition.clone());
        Ok(transition)
    }
}
