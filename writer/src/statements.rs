//! C2 — statement registry. Prepares the full set of named upsert/
//! tombstone statements once per transaction and holds them for that
//! transaction's lifetime, mirroring `task_manager/src/adv_sqlite.rs`'s
//! `DbQueries<'db>`. Every mutable-column statement is an
//! `ON CONFLICT ... DO UPDATE` upsert; deletion is modeled as an upsert
//! whose payload zeroes the entity (spec.md §4.2), so "create" and
//! "re-create" collapse onto the same primitive and same-round
//! create-then-delete commutes to the delete form while keeping
//! `created_at` pinned to its original value.

use rusqlite::{Statement, Transaction};

use crate::error::{sql_err, WriterResult};

pub struct StatementRegistry<'tx> {
    pub header_insert: Statement<'tx>,

    pub account_upsert_no_keytype: Statement<'tx>,
    pub account_upsert_keytype: Statement<'tx>,
    pub account_close_no_keytype: Statement<'tx>,
    pub account_close_keytype: Statement<'tx>,

    pub asset_upsert: Statement<'tx>,
    pub asset_close: Statement<'tx>,
    pub app_upsert: Statement<'tx>,
    pub app_close: Statement<'tx>,

    pub account_asset_upsert: Statement<'tx>,
    pub account_asset_close: Statement<'tx>,
    pub account_app_upsert: Statement<'tx>,
    pub account_app_close: Statement<'tx>,

    pub metastate_upsert: Statement<'tx>,

    pub txn_insert: Statement<'tx>,
    pub participation_insert: Statement<'tx>,
}

impl<'tx> StatementRegistry<'tx> {
    pub fn prepare(tx: &'tx Transaction<'tx>) -> WriterResult<Self> {
        let scope = "StatementRegistry::prepare()";
        let p = |sql: &str| tx.prepare(sql).map_err(sql_err(scope));

        Ok(Self {
            header_insert: p(
                "INSERT INTO block_header(round, realtime, rewards_level, header_blob)
                 VALUES (:round, :realtime, :rewards_level, :header_blob)
                 ON CONFLICT(round) DO NOTHING",
            )?,

            account_upsert_no_keytype: p(
                "INSERT INTO account(addr, microalgos, rewards_base, rewards_total, deleted,
                                      created_at, closed_at, keytype, account_data_json)
                 VALUES (:addr, :microalgos, :rewards_base, :rewards_total, 0,
                         :round, NULL, NULL, :account_data_json)
                 ON CONFLICT(addr) DO UPDATE SET
                   microalgos = excluded.microalgos,
                   rewards_base = excluded.rewards_base,
                   rewards_total = excluded.rewards_total,
                   deleted = 0,
                   closed_at = NULL,
                   account_data_json = excluded.account_data_json",
            )?,

            account_upsert_keytype: p(
                "INSERT INTO account(addr, microalgos, rewards_base, rewards_total, deleted,
                                      created_at, closed_at, keytype, account_data_json)
                 VALUES (:addr, :microalgos, :rewards_base, :rewards_total, 0,
                         :round, NULL, :keytype, :account_data_json)
                 ON CONFLICT(addr) DO UPDATE SET
                   microalgos = excluded.microalgos,
                   rewards_base = excluded.rewards_base,
                   rewards_total = excluded.rewards_total,
                   deleted = 0,
                   closed_at = NULL,
                   keytype = excluded.keytype,
                   account_data_json = excluded.account_data_json",
            )?,

            account_close_no_keytype: p(
                "INSERT INTO account(addr, microalgos, rewards_base, rewards_total, deleted,
                                      created_at, closed_at, keytype, account_data_json)
                 VALUES (:addr, 0, 0, 0, 1, :round, :round, NULL, 'null')
                 ON CONFLICT(addr) DO UPDATE SET
                   microalgos = 0,
                   rewards_base = 0,
                   rewards_total = 0,
                   deleted = 1,
                   closed_at = :round,
                   account_data_json = 'null'",
            )?,

            account_close_keytype: p(
                "INSERT INTO account(addr, microalgos, rewards_base, rewards_total, deleted,
                                      created_at, closed_at, keytype, account_data_json)
                 VALUES (:addr, 0, 0, 0, 1, :round, :round, :keytype, 'null')
                 ON CONFLICT(addr) DO UPDATE SET
                   microalgos = 0,
                   rewards_base = 0,
                   rewards_total = 0,
                   deleted = 1,
                   closed_at = :round,
                   keytype = excluded.keytype,
                   account_data_json = 'null'",
            )?,

            asset_upsert: p(
                "INSERT INTO asset(idx, creator_addr, params_blob, deleted, created_at, closed_at)
                 VALUES (:idx, :creator_addr, :params_blob, 0, :round, NULL)
                 ON CONFLICT(idx) DO UPDATE SET
                   creator_addr = excluded.creator_addr,
                   params_blob = excluded.params_blob,
                   deleted = 0,
                   closed_at = NULL",
            )?,
            asset_close: p(
                "INSERT INTO asset(idx, creator_addr, params_blob, deleted, created_at, closed_at)
                 VALUES (:idx, :creator_addr, 'null', 1, :round, :round)
                 ON CONFLICT(idx) DO UPDATE SET
                   deleted = 1,
                   closed_at = :round,
                   params_blob = 'null'",
            )?,

            app_upsert: p(
                "INSERT INTO app(idx, creator_addr, params_blob, deleted, created_at, closed_at)
                 VALUES (:idx, :creator_addr, :params_blob, 0, :round, NULL)
                 ON CONFLICT(idx) DO UPDATE SET
                   creator_addr = excluded.creator_addr,
                   params_blob = excluded.params_blob,
                   deleted = 0,
                   closed_at = NULL",
            )?,
            app_close: p(
                "INSERT INTO app(idx, creator_addr, params_blob, deleted, created_at, closed_at)
                 VALUES (:idx, :creator_addr, 'null', 1, :round, :round)
                 ON CONFLICT(idx) DO UPDATE SET
                   deleted = 1,
                   closed_at = :round,
                   params_blob = 'null'",
            )?,

            account_asset_upsert: p(
                "INSERT INTO account_asset(addr, assetid, amount, frozen, deleted, created_at, closed_at)
                 VALUES (:addr, :assetid, :amount, :frozen, 0, :round, NULL)
                 ON CONFLICT(addr, assetid) DO UPDATE SET
                   amount = excluded.amount,
                   frozen = excluded.frozen,
                   deleted = 0,
                   closed_at = NULL",
            )?,
            account_asset_close: p(
                "INSERT INTO account_asset(addr, assetid, amount, frozen, deleted, created_at, closed_at)
                 VALUES (:addr, :assetid, '0', 0, 1, :round, :round)
                 ON CONFLICT(addr, assetid) DO UPDATE SET
                   amount = '0',
                   frozen = 0,
                   deleted = 1,
                   closed_at = :round",
            )?,

            account_app_upsert: p(
                "INSERT INTO account_app(addr, app, localstate_blob, deleted, created_at, closed_at)
                 VALUES (:addr, :app, :localstate_blob, 0, :round, NULL)
                 ON CONFLICT(addr, app) DO UPDATE SET
                   localstate_blob = excluded.localstate_blob,
                   deleted = 0,
                   closed_at = NULL",
            )?,
            account_app_close: p(
                "INSERT INTO account_app(addr, app, localstate_blob, deleted, created_at, closed_at)
                 VALUES (:addr, :app, 'null', 1, :round, :round)
                 ON CONFLICT(addr, app) DO UPDATE SET
                   localstate_blob = 'null',
                   deleted = 1,
                   closed_at = :round",
            )?,

            metastate_upsert: p(
                "INSERT INTO metastate(k, v) VALUES (:k, :v)
                 ON CONFLICT(k) DO UPDATE SET v = excluded.v",
            )?,

            txn_insert: p(
                "INSERT INTO txn(round, intra, typeenum, asset, txid, txn_blob, extra_json)
                 VALUES (:round, :intra, :typeenum, :asset, :txid, :txn_blob, :extra_json)
                 ON CONFLICT(round, intra) DO UPDATE SET
                   typeenum = excluded.typeenum,
                   asset = excluded.asset,
                   txid = excluded.txid,
                   txn_blob = excluded.txn_blob,
                   extra_json = excluded.extra_json",
            )?,

            participation_insert: p(
                "INSERT INTO txn_participation(addr, round, intra)
                 VALUES (:addr, :round, :intra)
                 ON CONFLICT(addr, round, intra) DO NOTHING",
            )?,
        })
    }
}
