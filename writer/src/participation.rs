//! C6 — participation indexer. Pure function from the expander's
//! flattened nodes to the `txn_participation` rows, per spec.md §4.6:
//! every address a node names (sender, receiver, close-to, asset
//! variants, freeze target, app accounts array) except the zero
//! address, deduplicated per `(round, intra)` since one node can name
//! the same address in more than one role.

use std::collections::BTreeSet;

use crate::expander::ExpandedTxn;
use crate::types::ParticipationRow;

pub fn index(nodes: &[ExpandedTxn<'_>]) -> Vec<ParticipationRow> {
    let mut out = Vec::new();
    for node in nodes {
        let mut seen = BTreeSet::new();
        for addr in node.addresses() {
            if addr.is_zero() {
                continue;
            }
            if seen.insert(addr) {
                out.push(ParticipationRow {
                    addr,
                    round: node.round,
                    intra: node.intra,
                });
            }
        }
    }
    out
}
