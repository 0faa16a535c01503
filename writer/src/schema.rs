//! Table definitions for the schema enumerated in spec.md §3/§6. Bring-up
//! only — no migration story beyond creating this one known schema
//! (spec.md §1 Non-goals).

use rusqlite::Connection;

use crate::error::{sql_err, WriterResult};

pub fn create_schema(conn: &Connection) -> WriterResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS block_header(
          round           INTEGER NOT NULL PRIMARY KEY,
          realtime        INTEGER NOT NULL,
          rewards_level   INTEGER NOT NULL,
          header_blob     BLOB NOT NULL
        );

        CREATE TABLE IF NOT EXISTS account(
          addr                TEXT NOT NULL PRIMARY KEY,
          microalgos          INTEGER NOT NULL,
          rewards_base        INTEGER NOT NULL,
          rewards_total       INTEGER NOT NULL,
          deleted             INTEGER NOT NULL,
          created_at          INTEGER NOT NULL,
          closed_at           INTEGER,
          keytype             TEXT,
          account_data_json   TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS asset(
          idx           INTEGER NOT NULL PRIMARY KEY,
          creator_addr  TEXT NOT NULL,
          params_blob   TEXT NOT NULL,
          deleted       INTEGER NOT NULL,
          created_at    INTEGER NOT NULL,
          closed_at     INTEGER
        );

        CREATE TABLE IF NOT EXISTS app(
          idx           INTEGER NOT NULL PRIMARY KEY,
          creator_addr  TEXT NOT NULL,
          params_blob   TEXT NOT NULL,
          deleted       INTEGER NOT NULL,
          created_at    INTEGER NOT NULL,
          closed_at     INTEGER
        );

        CREATE TABLE IF NOT EXISTS account_asset(
          addr        TEXT NOT NULL,
          assetid     INTEGER NOT NULL,
          amount      TEXT NOT NULL,
          frozen      INTEGER NOT NULL,
          deleted     INTEGER NOT NULL,
          created_at  INTEGER NOT NULL,
          closed_at   INTEGER,
          PRIMARY KEY (addr, assetid)
        );

        CREATE TABLE IF NOT EXISTS account_app(
          addr              TEXT NOT NULL,
          app               INTEGER NOT NULL,
          localstate_blob   TEXT NOT NULL,
          deleted           INTEGER NOT NULL,
          created_at        INTEGER NOT NULL,
          closed_at         INTEGER,
          PRIMARY KEY (addr, app)
        );

        CREATE TABLE IF NOT EXISTS txn(
          round       INTEGER NOT NULL,
          intra       INTEGER NOT NULL,
          typeenum    INTEGER NOT NULL,
          asset       INTEGER NOT NULL,
          txid        TEXT NOT NULL,
          txn_blob    BLOB NOT NULL,
          extra_json  TEXT NOT NULL,
          PRIMARY KEY (round, intra)
        );

        CREATE TABLE IF NOT EXISTS txn_participation(
          addr   TEXT NOT NULL,
          round  INTEGER NOT NULL,
          intra  INTEGER NOT NULL,
          PRIMARY KEY (addr, round, intra)
        );

        CREATE TABLE IF NOT EXISTS metastate(
          k  TEXT NOT NULL PRIMARY KEY,
          v  TEXT NOT NULL
        );
        "#,
    )
    .map_err(sql_err("create_schema()"))?;
    Ok(())
}
