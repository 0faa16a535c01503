//! C3 — batch executor. Operations are enqueued as typed [`RowOp`]
//! values (never raw SQL at the call site) and `flush`ed against the
//! [`StatementRegistry`] in enqueue order; every result is drained, even
//! empty ones, and the first error aborts the whole batch (spec.md
//! §4.3). Statement ordering within a flush carries no semantic meaning
//! — all statements are idempotent upserts on their own primary key —
//! but per spec.md §4.4 the projector never issues more than one
//! statement per `(table, pk)` within a single block.

use crate::error::{sql_err, WriterResult};
use crate::statements::StatementRegistry;
use crate::types::{Address, ParticipationRow, TxnRow};

#[derive(Debug, Clone)]
pub enum KeytypeAction {
    /// Leave `account.keytype` untouched (no signature-type delta, or a
    /// rekey-to-empty observed on a delete — spec.md §4.4 step 2).
    Preserve,
    /// Overwrite `account.keytype`, `None` clears it to SQL NULL.
    Set(Option<String>),
}

#[derive(Debug, Clone)]
pub enum RowOp {
    Header {
        round: u64,
        realtime: i64,
        rewards_level: u64,
        header_blob: Vec<u8>,
    },
    AccountUpsert {
        addr: Address,
        round: u64,
        microalgos: u64,
        rewards_base: u64,
        rewards_total: u64,
        account_data_json: String,
        keytype: KeytypeAction,
    },
    AccountClose {
        addr: Address,
        round: u64,
        keytype: KeytypeAction,
    },
    AssetUpsert {
        idx: u64,
        round: u64,
        creator_addr: Address,
        params_blob: String,
    },
    AssetClose {
        idx: u64,
        round: u64,
        creator_addr: Address,
    },
    AppUpsert {
        idx: u64,
        round: u64,
        creator_addr: Address,
        params_blob: String,
    },
    AppClose {
        idx: u64,
        round: u64,
        creator_addr: Address,
    },
    AccountAssetUpsert {
        addr: Address,
        assetid: u64,
        round: u64,
        amount: u128,
        frozen: bool,
    },
    AccountAssetClose {
        addr: Address,
        assetid: u64,
        round: u64,
    },
    AccountAppUpsert {
        addr: Address,
        app: u64,
        round: u64,
        localstate_blob: String,
    },
    AccountAppClose {
        addr: Address,
        app: u64,
        round: u64,
    },
    MetastateUpsert {
        key: &'static str,
        value_json: String,
    },
    Txn(TxnRow),
    Participation(ParticipationRow),
}

/// Collects [`RowOp`]s for one block and drains them against a
/// [`StatementRegistry`] bound to the same transaction, in one pass.
#[derive(Default)]
pub struct Batch {
    ops: Vec<RowOp>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: RowOp) {
        self.ops.push(op);
    }

    pub fn extend(&mut self, ops: impl IntoIterator<Item = RowOp>) {
        self.ops.extend(ops);
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Executes every enqueued op in order, draining each result before
    /// moving to the next. Aborts (returning the wrapped error) on the
    /// first failure so no partial effect from this batch is left
    /// half-applied within the surrounding transaction.
    pub fn flush(self, stmts: &mut StatementRegistry<'_>) -> WriterResult<()> {
        let scope = "Batch::flush()";
        for op in self.ops {
            execute_one(stmts, op).map_err(sql_err(scope))?;
        }
        Ok(())
    }
}

/// SQLite's native integer column is a signed 64-bit value and
/// `rusqlite` has no `ToSql` impl for `u64`; every domain `u64` is cast
/// here, at the single point where it crosses into a bound parameter.
fn i(v: u64) -> i64 {
    v as i64
}

fn execute_one(stmts: &mut StatementRegistry<'_>, op: RowOp) -> rusqlite::Result<()> {
    use rusqlite::named_params;

    match op {
        RowOp::Header {
            round,
            realtime,
            rewards_level,
            header_blob,
        } => {
            stmts.header_insert.execute(named_params! {
                ":round": i(round),
                ":realtime": realtime,
                ":rewards_level": i(rewards_level),
                ":header_blob": header_blob,
            })?;
        }

        RowOp::AccountUpsert {
            addr,
            round,
            microalgos,
            rewards_base,
            rewards_total,
            account_data_json,
            keytype,
        } => match keytype {
            KeytypeAction::Preserve => {
                stmts.account_upsert_no_keytype.execute(named_params! {
                    ":addr": addr.to_string(),
                    ":round": i(round),
                    ":microalgos": i(microalgos),
                    ":rewards_base": i(rewards_base),
                    ":rewards_total": i(rewards_total),
                    ":account_data_json": account_data_json,
                })?;
            }
            KeytypeAction::Set(keytype) => {
                stmts.account_upsert_keytype.execute(named_params! {
                    ":addr": addr.to_string(),
                    ":round": i(round),
                    ":microalgos": i(microalgos),
                    ":rewards_base": i(rewards_base),
                    ":rewards_total": i(rewards_total),
                    ":account_data_json": account_data_json,
                    ":keytype": keytype,
                })?;
            }
        },

        RowOp::AccountClose {
            addr,
            round,
            keytype,
        } => match keytype {
            KeytypeAction::Preserve => {
                stmts.account_close_no_keytype.execute(named_params! {
                    ":addr": addr.to_string(),
                    ":round": i(round),
                })?;
            }
            KeytypeAction::Set(keytype) => {
                stmts.account_close_keytype.execute(named_params! {
                    ":addr": addr.to_string(),
                    ":round": i(round),
                    ":keytype": keytype,
                })?;
            }
        },

        RowOp::AssetUpsert {
            idx,
            round,
            creator_addr,
            params_blob,
        } => {
            stmts.asset_upsert.execute(named_params! {
                ":idx": i(idx),
                ":round": i(round),
                ":creator_addr": creator_addr.to_string(),
                ":params_blob": params_blob,
            })?;
        }
        RowOp::AssetClose {
            idx,
            round,
            creator_addr,
        } => {
            stmts.asset_close.execute(named_params! {
                ":idx": i(idx),
                ":round": i(round),
                ":creator_addr": creator_addr.to_string(),
            })?;
        }

        RowOp::AppUpsert {
            idx,
            round,
            creator_addr,
            params_blob,
        } => {
            stmts.app_upsert.execute(named_params! {
                ":idx": i(idx),
                ":round": i(round),
                ":creator_addr": creator_addr.to_string(),
                ":params_blob": params_blob,
            })?;
        }
        RowOp::AppClose {
            idx,
            round,
            creator_addr,
        } => {
            stmts.app_close.execute(named_params! {
                ":idx": i(idx),
                ":round": i(round),
                ":creator_addr": creator_addr.to_string(),
            })?;
        }

        RowOp::AccountAssetUpsert {
            addr,
            assetid,
            round,
            amount,
            frozen,
        } => {
            stmts.account_asset_upsert.execute(named_params! {
                ":addr": addr.to_string(),
                ":assetid": i(assetid),
                ":round": i(round),
                ":amount": amount.to_string(),
                ":frozen": frozen,
            })?;
        }
        RowOp::AccountAssetClose {
            addr,
            assetid,
            round,
        } => {
            stmts.account_asset_close.execute(named_params! {
                ":addr": addr.to_string(),
                ":assetid": i(assetid),
                ":round": i(round),
            })?;
        }

        RowOp::AccountAppUpsert {
            addr,
            app,
            round,
            localstate_blob,
        } => {
            stmts.account_app_upsert.execute(named_params! {
                ":addr": addr.to_string(),
                ":app": i(app),
                ":round": i(round),
                ":localstate_blob": localstate_blob,
            })?;
        }
        RowOp::AccountAppClose { addr, app, round } => {
            stmts.account_app_close.execute(named_params! {
                ":addr": addr.to_string(),
                ":app": i(app),
                ":round": i(round),
            })?;
        }

        RowOp::MetastateUpsert { key, value_json } => {
            stmts.metastate_upsert.execute(named_params! {
                ":k": key,
                ":v": value_json,
            })?;
        }

        RowOp::Txn(row) => {
            stmts.txn_insert.execute(named_params! {
                ":round": i(row.round),
                ":intra": row.intra,
                ":typeenum": row.typeenum,
                ":asset": i(row.asset),
                ":txid": row.txid,
                ":txn_blob": row.txn_blob,
                ":extra_json": row.extra_json.to_string(),
            })?;
        }

        RowOp::Participation(row) => {
            stmts.participation_insert.execute(named_params! {
                ":addr": row.addr.to_string(),
                ":round": i(row.round),
                ":intra": row.intra,
            })?;
        }
    }
    Ok(())
}
