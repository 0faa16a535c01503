//! C5 — transaction expander. Flattens a block's payset (a forest: each
//! top-level transaction may carry inner transactions produced by an
//! application call) into the pre-order sequence of nodes the `txn`
//! table stores one row per, per spec.md §4.5. Pure: takes a round and
//! a payset, returns rows plus the flattened node list C6 reads
//! addresses off of — no I/O, so it's unit-testable without a database.

use serde_json::json;

use crate::codec::encode_pruned_txn;
use crate::error::{WriterError, WriterResult};
use crate::types::{Address, Round, SignedTxnWithAd, TxnRow, TxnType};

/// One pre-order node of the expanded payset: a transaction together
/// with the identity it inherited from its position in the forest.
#[derive(Debug, Clone)]
pub struct ExpandedTxn<'a> {
    pub round: Round,
    pub intra: u32,
    /// The outermost transaction's txid; equal to `txn.txid` for a
    /// top-level transaction, inherited for inner ones (spec.md §4.5).
    pub root_txid: String,
    pub root_intra: u32,
    pub asset: u64,
    pub txn: &'a SignedTxnWithAd,
}

impl<'a> ExpandedTxn<'a> {
    pub fn addresses(&self) -> Vec<Address> {
        collect_addresses(self.txn)
    }
}

/// Walks `payset` depth-first, pre-order, assigning a monotonically
/// increasing `intra` starting at 0 across the whole block (parents
/// before their own inner transactions, per spec.md §4.5 scenario 6).
pub fn expand_block(round: Round, payset: &[SignedTxnWithAd]) -> WriterResult<Vec<ExpandedTxn<'_>>> {
    let mut out = Vec::new();
    let mut intra = 0u32;
    for root in payset {
        let root_txid = root.txid.clone();
        expand_node(round, root, &root_txid, &mut intra, &mut out, None)?;
    }
    Ok(out)
}

fn expand_node<'a>(
    round: Round,
    node: &'a SignedTxnWithAd,
    root_txid: &str,
    intra: &mut u32,
    out: &mut Vec<ExpandedTxn<'a>>,
    parent_root_intra: Option<u32>,
) -> WriterResult<()> {
    let this_intra = *intra;
    *intra += 1;

    let asset = resolve_asset_id(node, this_intra)?;
    let root_intra = parent_root_intra.unwrap_or(this_intra);

    out.push(ExpandedTxn {
        round,
        intra: this_intra,
        root_txid: root_txid.to_string(),
        root_intra,
        asset,
        txn: node,
    });

    for inner in &node.apply_data.inner_txns {
        expand_node(round, inner, root_txid, intra, out, Some(root_intra))?;
    }
    Ok(())
}

/// Resolves the `asset`/`app` id a row is filed under: an existing
/// reference when the transaction touches one, otherwise the id the
/// protocol freshly allocated on creation (spec.md §4.5, §3 "asset").
fn resolve_asset_id(node: &SignedTxnWithAd, intra: u32) -> WriterResult<u64> {
    let scope = "expander::resolve_asset_id()";
    match node.ttype {
        TxnType::Payment | TxnType::KeyRegistration | TxnType::StateProof => Ok(0),

        TxnType::AssetConfig => match node.fields.asset_ref.filter(|id| *id != 0) {
            Some(id) => Ok(id),
            None => node
                .apply_data
                .config_asset
                .filter(|id| *id != 0)
                .ok_or_else(|| {
                    WriterError::programmer(
                        scope,
                        format!("Missing ConfigAsset for transaction: intra={intra}"),
                    )
                }),
        },

        TxnType::AssetTransfer | TxnType::AssetFreeze => {
            node.fields.asset_ref.filter(|id| *id != 0).ok_or_else(|| {
                WriterError::programmer(
                    scope,
                    format!("Missing AssetID for transaction: intra={intra}"),
                )
            })
        }

        TxnType::ApplicationCall => match node.fields.application_id.filter(|id| *id != 0) {
            Some(id) => Ok(id),
            None => node
                .apply_data
                .application_id
                .filter(|id| *id != 0)
                .ok_or_else(|| {
                    WriterError::programmer(
                        scope,
                        format!("Missing ApplicationID for transaction: intra={intra}"),
                    )
                }),
        },
    }
}

fn collect_addresses(node: &SignedTxnWithAd) -> Vec<Address> {
    let f = &node.fields;
    let mut addrs = vec![f.sender];
    addrs.extend(
        [
            f.receiver,
            f.close_remainder_to,
            f.asset_sender,
            f.asset_receiver,
            f.asset_close_to,
            f.freeze_account,
        ]
        .into_iter()
        .flatten(),
    );
    addrs.extend(f.app_accounts.iter().copied());
    addrs
}

/// Renders the expanded nodes to the rows the `txn` table stores,
/// merging in the `AssetCloseAmount` overlay and pruning each node's
/// own inner-transaction list before it is canonically encoded.
pub fn to_rows(nodes: &[ExpandedTxn<'_>]) -> WriterResult<Vec<TxnRow>> {
    let scope = "expander::to_rows()";
    nodes
        .iter()
        .map(|n| {
            let is_inner = n.intra != n.root_intra;
            let txn_blob = encode_pruned_txn(scope, n.txn)?;
            // Outer rows carry an empty extra_json (plus the
            // AssetCloseAmount overlay, when present); only inner
            // descendants link back to their root (spec.md §4.5).
            let mut extra = if is_inner {
                json!({
                    "root-txid": n.root_txid,
                    "root-intra": n.root_intra,
                })
            } else {
                json!({})
            };
            if !is_inner {
                if let Some(amt) = n.txn.apply_data.asset_close_amount {
                    extra["AssetCloseAmount"] = json!(amt);
                }
            }

            Ok(TxnRow {
                round: n.round,
                intra: n.intra,
                typeenum: n.txn.ttype.as_i64(),
                asset: n.asset,
                // Inner transactions carry no independent txid of their
                // own (spec.md §8 quantified invariant); only the
                // top-level node's txid is persisted.
                txid: if is_inner { String::new() } else { n.txn.txid.clone() },
                txn_blob,
                extra_json: extra,
            })
        })
        .collect()
}
