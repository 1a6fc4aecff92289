use std::collections::HashMap;

use alloy::primitives::B256;
use serde_json::Value;

use crate::domain::parse_quantity;
use crate::ports::{SignerError, Transport};

/// Block number used for transactions that are not mined yet. Sorts ahead of
/// every real block.
pub const PENDING_BLOCK: u64 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTransaction {
    pub hash: B256,
    pub status: String,
    pub block_number: u64,
}

impl LocalTransaction {
    pub fn is_pending(&self) -> bool {
        self.block_number == PENDING_BLOCK
    }
}

/// `parity_localTransactions`: a map of hash to `{status, transaction}`.
pub async fn fetch_local_transactions<T>(transport: &T) -> Result<Vec<LocalTransaction>, SignerError>
where
    T: Transport + ?Sized,
{
    let result = transport
        .execute("parity_localTransactions", Vec::new())
        .await?;
    let Value::Object(entries) = result else {
        return Err(SignerError::Decode(
            "parity_localTransactions must return an object".to_owned(),
        ));
    };
    let transactions = entries
        .iter()
        .filter_map(|(hash, entry)| {
            let hash = match hash.parse::<B256>() {
                Ok(hash) => hash,
                Err(e) => {
                    tracing::warn!(
                        key = %hash,
                        error = %e,
                        "skipping local transaction with invalid hash"
                    );
                    return None;
                }
            };
            let status = entry
                .get("status")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_owned();
            let block_number = entry
                .get("transaction")
                .and_then(|tx| tx.get("blockNumber"))
                .and_then(parse_quantity)
                .unwrap_or(PENDING_BLOCK);
            Some(LocalTransaction {
                hash,
                status,
                block_number,
            })
        })
        .collect();
    Ok(transactions)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub added: usize,
    pub removed: usize,
    pub updated: usize,
}

/// Recency-ordered view over the node's local transactions.
#[derive(Debug, Clone, Default)]
pub struct LocalTxView {
    entries: Vec<LocalTransaction>,
}

impl LocalTxView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[LocalTransaction] {
        &self.entries
    }

    pub fn hashes(&self) -> Vec<B256> {
        self.entries.iter().map(|tx| tx.hash).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends unseen hashes, drops hashes the node no longer reports and
    /// refreshes the rest, then orders pending first and by block number
    /// descending. Ties keep their existing relative order.
    pub fn reconcile(&mut self, reported: Vec<LocalTransaction>) -> ReconcileSummary {
        let mut summary = ReconcileSummary::default();
        let mut incoming: HashMap<B256, LocalTransaction> = HashMap::with_capacity(reported.len());
        let mut order = Vec::with_capacity(reported.len());
        for tx in reported {
            if incoming.insert(tx.hash, tx.clone()).is_none() {
                order.push(tx.hash);
            }
        }

        let before = self.entries.len();
        self.entries.retain(|tx| incoming.contains_key(&tx.hash));
        summary.removed = before - self.entries.len();

        for existing in &mut self.entries {
            if let Some(fresh) = incoming.remove(&existing.hash) {
                if *existing != fresh {
                    *existing = fresh;
                    summary.updated += 1;
                }
            }
        }
        for hash in order {
            if let Some(tx) = incoming.remove(&hash) {
                self.entries.push(tx);
                summary.added += 1;
            }
        }

        sort_by_recency(&mut self.entries);
        summary
    }
}

pub fn sort_by_recency(entries: &mut [LocalTransaction]) {
    entries.sort_by_key(|tx| std::cmp::Reverse(recency_key(tx.block_number)));
}

fn recency_key(block_number: u64) -> u64 {
    if block_number == PENDING_BLOCK {
        u64::MAX
    } else {
        block_number
    }
}
