//! C1 — canonical encoding codec. Audit-friendly blobs (account data,
//! asset/app params, local state, txn extras) are JSON; the block
//! header and the full signed transaction are canonically framed with
//! `bincode` so their byte representation is deterministic. Every
//! codec failure is fatal to the current block (spec.md §4.1/§7).

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{WriterError, WriterResult};
use crate::types::{AccountData, Block, SignedTxnWithAd};

/// Encodes a JSON-audit blob. `serde_json` preserves struct field order
/// (not sorted), which is deterministic for a fixed Rust type — the
/// canonical order spec.md §4.1 requires for maps.
pub fn encode_json<T: Serialize>(scope: &str, value: &T) -> WriterResult<String> {
    serde_json::to_string(value).map_err(|e| WriterError::encoding(scope, e))
}

pub fn decode_json<T: DeserializeOwned>(scope: &str, blob: &str) -> WriterResult<T> {
    serde_json::from_str(blob).map_err(|e| WriterError::encoding(scope, e))
}

/// Canonical binary framing for the header and signed-transaction blobs.
pub fn encode_bin<T: Serialize>(scope: &str, value: &T) -> WriterResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| WriterError::encoding(scope, e))
}

pub fn decode_bin<T: DeserializeOwned>(scope: &str, blob: &[u8]) -> WriterResult<T> {
    bincode::deserialize(blob).map_err(|e| WriterError::encoding(scope, e))
}

pub fn encode_header(block: &Block) -> WriterResult<Vec<u8>> {
    encode_bin("encodeHeader()", &block.header_extra)
}

/// Trims transient/redundant fields from account data before encoding,
/// lossless for every behaviorally significant field: balances,
/// tombstones and ownership are never touched here, only bookkeeping
/// that query readers re-derive rather than trust from storage.
pub fn trim_account_data(data: &AccountData) -> AccountData {
    let mut trimmed = data.clone();
    if let Some(obj) = trimmed.extra.as_object_mut() {
        obj.remove("pending_rewards_cache");
    }
    trimmed
}

pub fn encode_account_data(scope: &str, data: &AccountData) -> WriterResult<String> {
    let trimmed = trim_account_data(data);
    encode_json(scope, &trimmed)
}

/// Encodes a signed transaction node with its inner-transaction list
/// pruned to empty (spec.md §4.5): inner transactions get their own
/// `txn` rows, so re-serializing them under their parent would
/// duplicate storage and break the one-row-per-node invariant.
pub fn encode_pruned_txn(scope: &str, txn: &SignedTxnWithAd) -> WriterResult<Vec<u8>> {
    let mut pruned = txn.clone();
    pruned.apply_data.inner_txns.clear();
    encode_bin(scope, &pruned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Address;

    #[test]
    fn round_trips_account_data() {
        let data = AccountData {
            micro_algos: 5,
            rewards_base: 1,
            rewards_total: 2,
            extra: serde_json::json!({"k": "v"}),
        };
        let encoded = encode_account_data("test", &data).unwrap();
        let decoded: AccountData = decode_json("test", &encoded).unwrap();
        assert_eq!(decoded.micro_algos, 5);
        assert_eq!(decoded.extra, serde_json::json!({"k": "v"}));
    }

    #[test]
    fn trim_is_lossless_for_balances() {
        let data = AccountData {
            micro_algos: 42,
            rewards_base: 1,
            rewards_total: 2,
            extra: serde_json::json!({"pending_rewards_cache": 99, "vote_id": "abc"}),
        };
        let trimmed = trim_account_data(&data);
        assert_eq!(trimmed.micro_algos, 42);
        assert_eq!(trimmed.extra["vote_id"], "abc");
        assert!(trimmed.extra.get("pending_rewards_cache").is_none());
    }

    #[test]
    fn prunes_inner_txns_from_blob() {
        let mut outer = SignedTxnWithAd::default();
        outer.txid = "OUTER".into();
        outer.apply_data.inner_txns.push(SignedTxnWithAd::default());
        let blob = encode_pruned_txn("test", &outer).unwrap();
        let decoded: SignedTxnWithAd = decode_bin("test", &blob).unwrap();
        assert!(decoded.apply_data.inner_txns.is_empty());
        let _ = Address::ZERO;
    }
}
