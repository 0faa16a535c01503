//! C4 — account/creatable projector. Pure function from a block's state
//! delta (plus its payset, needed to derive the signature-type delta)
//! to the [`RowOp`]s that apply it, per the 5-step policy in spec.md
//! §4.4:
//!   1. every touched account gets one `AccountUpsert`/`AccountClose`;
//!   2. a deleted account's `keytype` is cleared only if this block's
//!      payset shows it was rekeyed away from a spending key, never
//!      merely because the account closed;
//!   3. a non-deleted account's `keytype` follows the tri-state delta;
//!   4. every created/recreated asset or app gets one params row;
//!   5. every touched holding/local-state gets one upsert or close.

use std::collections::BTreeMap;

use crate::batch::{KeytypeAction, RowOp};
use crate::codec::{encode_account_data, encode_json};
use crate::error::WriterResult;
use crate::types::{
    Address, CreatableType, Round, SigKind, SigTypeDelta, SignedTxnWithAd, StateDelta, TxnType,
};

/// Projects one block's [`StateDelta`] into the row operations that
/// apply it. `payset` is consulted only to derive each sender's
/// [`SigTypeDelta`] for this block — the delta itself carries no
/// signature information.
pub fn project(round: Round, delta: &StateDelta, payset: &[SignedTxnWithAd]) -> WriterResult<Vec<RowOp>> {
    let sig_deltas = derive_sig_type_deltas(payset);
    let mut ops = Vec::new();

    for acct in &delta.accts {
        ops.push(project_account(round, acct, &sig_deltas)?);
    }

    for (&id, creatable) in &delta.creatables {
        ops.push(project_creatable(round, id, creatable, delta)?);
    }

    for (&(addr, assetid), &still_open) in &delta.modified_asset_holdings {
        ops.push(project_asset_holding(round, addr, assetid, still_open, delta));
    }

    for (&(addr, app), &still_open) in &delta.modified_app_local_states {
        ops.push(project_app_local_state(round, addr, app, still_open, delta));
    }

    if !delta.totals.is_null() {
        ops.push(RowOp::MetastateUpsert {
            key: crate::metastate::KEY_ACCOUNT_TOTALS,
            value_json: encode_json("projector::project()", &delta.totals)?,
        });
    }

    Ok(ops)
}

fn project_account(
    round: Round,
    acct: &crate::types::AccountDelta,
    sig_deltas: &BTreeMap<Address, SigTypeDelta>,
    ) -> WriterResult<RowOp> {
    let sig_delta = sig_deltas.get(&acct.addr).cloned().unwrap_or(SigTypeDelta::Absent);

    match &acct.data {
        None => {
            // Deletion: keytype is only overwritten if this block
            // explicitly observed a rekey away from a spending key
            // (step 2) — an ordinary close leaves it untouched.
            let keytype = match sig_delta {
                SigTypeDelta::Present(kt) => KeytypeAction::Set(Some(kt)),
                SigTypeDelta::PresentButEmpty | SigTypeDelta::Absent => KeytypeAction::Preserve,
            };
            Ok(RowOp::AccountClose {
                addr: acct.addr,
                round,
                keytype,
            })
        }
        Some(data) => {
            let keytype = match sig_delta {
                SigTypeDelta::Present(kt) => KeytypeAction::Set(Some(kt)),
                SigTypeDelta::PresentButEmpty => KeytypeAction::Set(None),
                SigTypeDelta::Absent => KeytypeAction::Preserve,
            };
            let account_data_json = encode_account_data("projector::project_account()", data)?;
            Ok(RowOp::AccountUpsert {
                addr: acct.addr,
                round,
                microalgos: data.micro_algos,
                rewards_base: data.rewards_base,
                rewards_total: data.rewards_total,
                account_data_json,
                keytype,
            })
        }
    }
}

fn project_creatable(
    round: Round,
    id: u64,
    creatable: &crate::types::CreatableDelta,
    delta: &StateDelta,
) -> WriterResult<RowOp> {
    let scope = "projector::project_creatable()";
    if !creatable.created {
        return Ok(match creatable.ctype {
            CreatableType::Asset => RowOp::AssetClose {
                idx: id,
                round,
                creator_addr: creatable.creator,
            },
            CreatableType::App => RowOp::AppClose {
                idx: id,
                round,
                creator_addr: creatable.creator,
            },
        });
    }

    let params = find_creatable_params(id, creatable.ctype, delta).ok_or_else(|| {
        crate::error::WriterError::programmer(scope, format!("no params recorded for creatable {id}"))
    })?;
    let params_blob = encode_json(scope, &params.params)?;

    Ok(match creatable.ctype {
        CreatableType::Asset => RowOp::AssetUpsert {
            idx: id,
            round,
            creator_addr: creatable.creator,
            params_blob,
        },
        CreatableType::App => RowOp::AppUpsert {
            idx: id,
            round,
            creator_addr: creatable.creator,
            params_blob,
        },
    })
}

fn find_creatable_params(
    id: u64,
    ctype: CreatableType,
    delta: &StateDelta,
) -> Option<&crate::types::CreatableParams> {
    delta.accts.iter().find_map(|acct| match ctype {
        CreatableType::Asset => acct.created_assets.get(&id),
        CreatableType::App => acct.created_apps.get(&id),
    })
}

fn project_asset_holding(round: Round, addr: Address, assetid: u64, still_open: bool, delta: &StateDelta) -> RowOp {
    if !still_open {
        return RowOp::AccountAssetClose { addr, assetid, round };
    }
    let holding = delta
        .accts
        .iter()
        .find(|a| a.addr == addr)
        .and_then(|a| a.asset_holdings.get(&assetid));
    let (amount, frozen) = holding.map(|h| (h.amount, h.frozen)).unwrap_or((0, false));
    RowOp::AccountAssetUpsert {
        addr,
        assetid,
        round,
        amount,
        frozen,
    }
}

fn project_app_local_state(round: Round, addr: Address, app: u64, still_open: bool, delta: &StateDelta) -> RowOp {
    if !still_open {
        return RowOp::AccountAppClose { addr, app, round };
    }
    let state = delta
        .accts
        .iter()
        .find(|a| a.addr == addr)
        .and_then(|a| a.app_local_states.get(&app));
    let localstate_blob = state
        .map(|s| s.data.to_string())
        .unwrap_or_else(|| "null".to_string());
    RowOp::AccountAppUpsert {
        addr,
        app,
        round,
        localstate_blob,
    }
}

/// Derives each sender's [`SigTypeDelta`] for the block: last write
/// within the block wins, since a single account can sign more than
/// one transaction in the same round (spec.md §4.4 step 3).
fn derive_sig_type_deltas(payset: &[SignedTxnWithAd]) -> BTreeMap<Address, SigTypeDelta> {
    let mut out = BTreeMap::new();
    for txn in payset {
        visit_sig_type(txn, &mut out);
    }
    out
}

fn visit_sig_type(txn: &SignedTxnWithAd, out: &mut BTreeMap<Address, SigTypeDelta>) {
    let sender = txn.fields.sender;
    let delta = if txn.fields.rekey_to.is_some_and(|a| !a.is_zero()) {
        SigTypeDelta::PresentButEmpty
    } else {
        match txn.sig_kind {
            Some(kind) => SigTypeDelta::Present(kind.keytype().to_string()),
            None => SigTypeDelta::Absent,
        }
    };
    if !matches!(delta, SigTypeDelta::Absent) {
        out.insert(sender, delta);
    }
    for inner in &txn.apply_data.inner_txns {
        visit_sig_type(inner, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccountData, AccountDelta};

    fn addr(b: u8) -> Address {
        let mut bytes = [0u8; 32];
        bytes[0] = b;
        Address(bytes)
    }

    #[test]
    fn delete_does_not_clear_keytype_without_rekey_signal() {
        let mut delta = StateDelta::default();
        let mut acct = AccountDelta::new(addr(1));
        acct.data = None;
        delta.accts.push(acct);

        let ops = project(5, &delta, &[]).unwrap();
        match &ops[0] {
            RowOp::AccountClose { keytype, .. } => {
                assert!(matches!(keytype, KeytypeAction::Preserve));
            }
            _ => panic!("expected AccountClose"),
        }
    }

    #[test]
    fn create_then_close_same_round_projects_close() {
        let mut delta = StateDelta::default();
        delta.creatables.insert(
            9,
            crate::types::CreatableDelta {
                ctype: CreatableType::Asset,
                created: false,
                creator: addr(2),
            },
        );
        let ops = project(1, &delta, &[]).unwrap();
        assert!(matches!(ops[0], RowOp::AssetClose { idx: 9, .. }));
    }

    #[test]
    fn upsert_carries_balances() {
        let mut delta = StateDelta::default();
        let mut acct = AccountDelta::new(addr(3));
        acct.data = Some(AccountData {
            micro_algos: 100,
            rewards_base: 1,
            rewards_total: 2,
            extra: serde_json::json!({}),
        });
        delta.accts.push(acct);
        let ops = project(1, &delta, &[]).unwrap();
        match &ops[0] {
            RowOp::AccountUpsert { microalgos, .. } => assert_eq!(*microalgos, 100),
            _ => panic!("expected AccountUpsert"),
        }
    }
}
