//! ```text
//!   Block ──▶ C5 expander ──▶ txn rows ───────▶┐
//!          └─▶ C6 participation indexer ───────┤
//!   StateDelta ──▶ C4 projector ──▶ row ops ───┤──▶ C3 batch ──▶ C2 statements ──▶ SQLite
//!          └─▶ C8 metastate keeper ────────────┘
//!                     all driven by C7 BlockWriter, one transaction per block
//! ```
//!
//! Persistence core for a ledger indexer: projects a decoded block
//! (header, state delta, expanded transaction forest) into a
//! relational store, atomically, per block. See `SPEC_FULL.md` for the
//! full component design; modules here map 1:1 onto its C1-C8
//! components.

pub mod batch;
pub mod codec;
pub mod error;
pub mod expander;
pub mod metastate;
pub mod participation;
pub mod projector;
pub mod schema;
pub mod statements;
pub mod types;
pub mod writer;

pub use error::{WriterError, WriterResult};
pub use types::{
    AccountData, AccountDelta, Address, AppLocalState, AssetHolding, Block, CreatableDelta,
    CreatableParams, CreatableType, ParticipationRow, Round, SigKind, SigTypeDelta,
    SignedTxnWithAd, StateDelta, TxnFields, TxnRow, TxnType,
};
pub use writer::BlockWriter;
