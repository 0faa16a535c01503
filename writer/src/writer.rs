//! C7 — block writer orchestrator.
//!
//! ```text
//!   BlockWriter::add_block()
//!     INIT ───▶ PREPARED ───▶ PROJECTED ───▶ COMMITTED
//!       │            │              │             ▲
//!       │            │              │             │
//!       └────────────┴──────────────┴────── ABORTED
//! ```
//! One call drives a block through the state machine in spec.md §4.8:
//! `PREPARED` once the transaction is open and statements registered,
//! `PROJECTED` once every [`RowOp`] from C4/C5/C6 has been enqueued,
//! `COMMITTED` once the SQLite transaction commits. Any error taken
//! along the way moves straight to `ABORTED` and rolls back — there is
//! no partial-commit path. Transient (busy/locked) errors are retried
//! with backoff before giving up, mirroring `taskdb/src/redis_db.rs`'s
//! `backoff::retry` wrapper around connection acquisition.

use std::path::Path;
use std::time::Duration;

use backoff::ExponentialBackoff;
use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::batch::{Batch, RowOp};
use crate::codec::encode_header;
use crate::error::{sql_err, WriterError, WriterResult};
use crate::expander::{expand_block, to_rows};
use crate::metastate;
use crate::participation;
use crate::projector;
use crate::schema::create_schema;
use crate::statements::StatementRegistry;
use crate::types::{Block, StateDelta};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Init,
    Prepared,
    Projected,
    Committed,
    Aborted,
}

pub struct BlockWriter {
    conn: Connection,
}

impl BlockWriter {
    /// Opens (creating if absent) the SQLite file at `path` and applies
    /// the same bring-up pragmas as `task_manager`'s `TaskDb`: foreign
    /// keys on, WAL journaling, `synchronous = NORMAL`, in-memory temp
    /// store. A single writer owns the connection — no pool — so
    /// `locking_mode = EXCLUSIVE` is safe and avoids repeated lock
    /// negotiation per transaction.
    pub fn open_or_create(path: &Path) -> WriterResult<Self> {
        let scope = "BlockWriter::open_or_create()";
        let conn = Connection::open(path).map_err(sql_err(scope))?;
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA locking_mode = EXCLUSIVE;
             PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA temp_store = MEMORY;",
        )
        .map_err(sql_err(scope))?;
        create_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn in_memory() -> WriterResult<Self> {
        let conn = Connection::open_in_memory().map_err(sql_err("BlockWriter::in_memory()"))?;
        create_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Read-only escape hatch for callers that need to query projected
    /// state directly (reporting, tests) rather than through a typed
    /// accessor.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Writes the genesis block: header plus the bootstrap special
    /// addresses, with no account/creatable/txn projection (spec.md
    /// §4.7's reduced path for round 0 — there is no prior state to
    /// project a delta against).
    pub fn add_block_0(&mut self, block: &Block, special_addresses: &serde_json::Value) -> WriterResult<()> {
        let scope = "BlockWriter::add_block_0()";
        self.with_retry(scope, |conn| {
            let tx = conn.transaction().map_err(sql_err(scope))?;
            {
                let mut stmts = StatementRegistry::prepare(&tx)?;
                let mut batch = Batch::new();
                batch.push(RowOp::Header {
                    round: block.round,
                    realtime: block.timestamp,
                    rewards_level: block.rewards_level,
                    header_blob: encode_header(block)?,
                });
                batch.push(RowOp::MetastateUpsert {
                    key: metastate::KEY_SPECIAL_ADDRESSES,
                    value_json: serde_json::to_string(special_addresses)
                        .map_err(|e| WriterError::encoding(scope, e))?,
                });
                batch.flush(&mut stmts)?;
            }
            tx.commit().map_err(sql_err(scope))?;
            Ok(())
        })
    }

    /// Writes one block: header, account/creatable projection (C4),
    /// expanded transactions (C5) and their participation rows (C6),
    /// all inside one transaction so the block lands atomically.
    pub fn add_block(&mut self, block: &Block, delta: &StateDelta) -> WriterResult<()> {
        let scope = "BlockWriter::add_block()";
        let round = block.round;

        self.with_retry(scope, |conn| {
            let mut phase = Phase::Init;
            let tx = conn.transaction().map_err(sql_err(scope))?;
            phase = Phase::Prepared;
            debug!(round, ?phase, "block transaction opened");

            let result = (|| -> WriterResult<()> {
                let mut stmts = StatementRegistry::prepare(&tx)?;
                let mut batch = Batch::new();

                batch.push(RowOp::Header {
                    round,
                    realtime: block.timestamp,
                    rewards_level: block.rewards_level,
                    header_blob: encode_header(block)?,
                });

                let special_addresses = serde_json::json!({
                    "FeeSink": block.fee_sink.to_string(),
                    "RewardsPool": block.rewards_pool.to_string(),
                });
                batch.push(RowOp::MetastateUpsert {
                    key: metastate::KEY_SPECIAL_ADDRESSES,
                    value_json: serde_json::to_string(&special_addresses)
                        .map_err(|e| WriterError::encoding(scope, e))?,
                });

                batch.extend(projector::project(round, delta, &block.payset)?);

                let nodes = expand_block(round, &block.payset)?;
                for row in to_rows(&nodes)? {
                    batch.push(RowOp::Txn(row));
                }
                for row in participation::index(&nodes) {
                    batch.push(RowOp::Participation(row));
                }

                batch.push(RowOp::MetastateUpsert {
                    key: metastate::KEY_NEXT_ROUND_TO_ACCOUNT,
                    value_json: (round + 1).to_string(),
                });

                batch.flush(&mut stmts)
            })();

            match result {
                Ok(()) => {
                    phase = Phase::Projected;
                    debug!(round, ?phase, "batch flushed");
                }
                Err(e) => {
                    phase = Phase::Aborted;
                    warn!(round, ?phase, error = %e, "block projection failed, rolling back");
                    return Err(e);
                }
            }

            tx.commit().map_err(sql_err(scope))?;
            phase = Phase::Committed;
            info!(round, ?phase, "block committed");
            Ok(())
        })
    }

    /// Retries the whole closure — a fresh transaction each attempt —
    /// on transient errors, giving up and propagating otherwise. The
    /// backoff schedule mirrors `taskdb/src/redis_db.rs`'s connection
    /// retry: short initial interval, capped max interval, bounded
    /// total elapsed time so a truly stuck database surfaces as an
    /// error rather than hanging the caller forever.
    fn with_retry<F>(&mut self, scope: &'static str, mut op: F) -> WriterResult<()>
    where
        F: FnMut(&mut Connection) -> WriterResult<()>,
    {
        let backoff = ExponentialBackoff {
            initial_interval: Duration::from_millis(50),
            max_interval: Duration::from_secs(2),
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        let conn = &mut self.conn;
        backoff::retry(backoff, move || match op(conn) {
            Ok(()) => Ok(()),
            Err(e) if e.is_transient() => {
                warn!(%scope, error = %e, "transient error, retrying");
                Err(backoff::Error::transient(e))
            }
            Err(e) => Err(backoff::Error::permanent(e)),
        })
        .map_err(|e| match e {
            backoff::Error::Permanent(e) => e,
            backoff::Error::Transient { err, .. } => err,
        })
    }
}
