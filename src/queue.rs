use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::swap::PreparedSwap;

/// Per-entry lifecycle: `Pending -> Executing -> {Completed | Failed}`.
/// Transitions are monotonic; nothing returns to `Pending` once execution
/// begins, and nothing leaves `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    Pending,
    Executing,
    Completed,
    Failed,
}

/// A unit of work in the transaction queue
#[derive(Debug, Clone)]
pub struct QueuedTransaction {
    /// Identity for reorder/delete operations
    pub id: Uuid,
    /// The originating tool-call name
    pub name: String,
    /// The original tool-call parameters, preserved for display and audit
    pub arguments: serde_json::Value,
    pub status: TxStatus,
    /// Present from enqueue time; entries are only created from a successful
    /// preparation
    pub result: Option<PreparedSwap>,
    /// Attached once execution completes
    pub tx_hash: Option<String>,
    /// Failure detail when status is `Failed`
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An ordered, user-reorderable list of prepared-but-not-yet-executed
/// transactions.
///
/// Single-writer structure: asynchronous completions land as id-keyed
/// updates, never as blind array overwrites.
#[derive(Debug, Default)]
pub struct TransactionQueue {
    entries: Vec<QueuedTransaction>,
}

impl TransactionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[QueuedTransaction] {
        &self.entries
    }

    pub fn get(&self, id: Uuid) -> Option<&QueuedTransaction> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.status == TxStatus::Pending)
            .count()
    }

    /// Append a new `Pending` entry holding a successfully prepared swap.
    /// Failed preparations never reach the queue.
    pub fn enqueue(
        &mut self,
        name: &str,
        arguments: serde_json::Value,
        prepared: PreparedSwap,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.entries.push(QueuedTransaction {
            id,
            name: name.to_string(),
            arguments,
            status: TxStatus::Pending,
            result: Some(prepared),
            tx_hash: None,
            error: None,
            created_at: Utc::now(),
        });
        id
    }

    /// Move an entry to `new_index` as a stable remove-then-insert, preserving
    /// the relative order of all other entries. Permitted only while the entry
    /// is `Pending`; returns false otherwise.
    pub fn reorder(&mut self, id: Uuid, new_index: usize) -> bool {
        let Some(current) = self.entries.iter().position(|e| e.id == id) else {
            return false;
        };
        if self.entries[current].status != TxStatus::Pending {
            return false;
        }

        let entry = self.entries.remove(current);
        let target = new_index.min(self.entries.len());
        self.entries.insert(target, entry);
        true
    }

    /// Remove an entry. Permitted only while `Pending`; a no-op on any other
    /// status even if the UI failed to prevent the call.
    pub fn delete(&mut self, id: Uuid) -> bool {
        let Some(index) = self.entries.iter().position(|e| e.id == id) else {
            return false;
        };
        if self.entries[index].status != TxStatus::Pending {
            return false;
        }
        self.entries.remove(index);
        true
    }

    /// Transition one `Pending` entry to `Executing`
    pub fn begin_execution(&mut self, id: Uuid) -> bool {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) if entry.status == TxStatus::Pending => {
                entry.status = TxStatus::Executing;
                true
            }
            _ => false,
        }
    }

    /// Transition every currently-`Pending` entry to `Executing` in a single
    /// batch, returning their ids in queue order. Entries in other states are
    /// left untouched.
    pub fn begin_batch(&mut self) -> Vec<Uuid> {
        self.entries
            .iter_mut()
            .filter(|e| e.status == TxStatus::Pending)
            .map(|e| {
                e.status = TxStatus::Executing;
                e.id
            })
            .collect()
    }

    /// Transition an `Executing` entry to `Completed`, attaching the
    /// transaction hash
    pub fn complete(&mut self, id: Uuid, tx_hash: &str) -> bool {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) if entry.status == TxStatus::Executing => {
                entry.status = TxStatus::Completed;
                entry.tx_hash = Some(tx_hash.to_string());
                true
            }
            _ => false,
        }
    }

    /// Transition an `Executing` entry to `Failed`. A failed entry can only be
    /// removed by re-issuing the instruction, never retried automatically.
    pub fn fail(&mut self, id: Uuid, error: &str) -> bool {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) if entry.status == TxStatus::Executing => {
                entry.status = TxStatus::Failed;
                entry.error = Some(error.to_string());
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::{Quote, TxPayload};
    use crate::token::Token;

    fn prepared() -> PreparedSwap {
        PreparedSwap {
            token_out: Token {
                address: "0x2791Bca1f2de4661ED88A30C99A7a9449Aa84174".to_string(),
                symbol: "USDC".to_string(),
                name: Some("USD Coin".to_string()),
                decimals: 6,
            },
            amount_in: "1000000000000000000".to_string(),
            formatted_amount_in: "1".to_string(),
            formatted_amount_out: "1.8".to_string(),
            price_impact: 0.3,
            route_tx: TxPayload {
                to: "0x80EbA3855878739F4710233A8a19d89Bdd2ffB8E".to_string(),
                data: "0xdeadbeef".to_string(),
                value: "1000000000000000000".to_string(),
            },
            quote: Quote {
                amount_out: "1800000".to_string(),
                price_impact: 30.0,
                gas: None,
                route: vec![],
            },
        }
    }

    fn queue_with(n: usize) -> (TransactionQueue, Vec<Uuid>) {
        let mut queue = TransactionQueue::new();
        let ids = (0..n)
            .map(|i| {
                queue.enqueue(
                    "create_swap_transaction",
                    serde_json::json!({ "index": i }),
                    prepared(),
                )
            })
            .collect();
        (queue, ids)
    }

    #[test]
    fn enqueue_starts_pending() {
        let (queue, ids) = queue_with(1);
        assert_eq!(queue.get(ids[0]).unwrap().status, TxStatus::Pending);
        assert!(queue.get(ids[0]).unwrap().result.is_some());
    }

    #[test]
    fn reorder_is_a_stable_move() {
        let (mut queue, ids) = queue_with(3);
        assert!(queue.reorder(ids[2], 0));
        let order: Vec<Uuid> = queue.entries().iter().map(|e| e.id).collect();
        assert_eq!(order, vec![ids[2], ids[0], ids[1]]);
    }

    #[test]
    fn reorder_clamps_out_of_range_index() {
        let (mut queue, ids) = queue_with(2);
        assert!(queue.reorder(ids[0], 99));
        assert_eq!(queue.entries()[1].id, ids[0]);
    }

    #[test]
    fn reorder_and_delete_reject_non_pending() {
        let (mut queue, ids) = queue_with(2);
        assert!(queue.begin_execution(ids[0]));
        assert!(!queue.reorder(ids[0], 1));
        assert!(!queue.delete(ids[0]));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn begin_batch_selects_only_pending() {
        let (mut queue, ids) = queue_with(3);
        queue.begin_execution(ids[1]);
        queue.complete(ids[1], "0xabc");

        let batch = queue.begin_batch();
        assert_eq!(batch, vec![ids[0], ids[2]]);
        assert_eq!(queue.get(ids[1]).unwrap().status, TxStatus::Completed);
    }

    #[test]
    fn transitions_are_monotonic() {
        let (mut queue, ids) = queue_with(1);
        let id = ids[0];
        assert!(!queue.complete(id, "0xabc"));
        assert!(queue.begin_execution(id));
        assert!(!queue.begin_execution(id));
        assert!(queue.complete(id, "0xabc"));
        assert!(!queue.fail(id, "too late"));
        assert_eq!(queue.get(id).unwrap().tx_hash.as_deref(), Some("0xabc"));
    }
}
