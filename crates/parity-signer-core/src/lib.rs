pub mod domain;
pub mod jsonrpc;
pub mod local_tx;
pub mod ports;
pub mod signer;
pub mod state_machine;
pub mod tracker;

pub use domain::{ConfirmationOutcome, ConfirmationPayload, RequestStatus, SignerRequest, SignerRequestId};
pub use jsonrpc::{
    EncodedRequest, JsonRpcRequest, JsonRpcResponse, RequestEncoder, ResponseOutcome, RpcError,
    JSONRPC_VERSION, PASSWORD_INVALID, REQUEST_NOT_FOUND, REQUEST_REJECTED, REQUEST_REJECTED_LIMIT,
};
pub use local_tx::{fetch_local_transactions, LocalTransaction, LocalTxView, ReconcileSummary, PENDING_BLOCK};
pub use ports::{execute_typed, CallOptions, SignerError, Transport, TransportError};
pub use signer::SignerQueue;
pub use state_machine::{request_transition, RequestState, SignerAction, StateTransition};
pub use tracker::RequestTracker;
