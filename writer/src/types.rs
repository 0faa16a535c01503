//! Domain model the projector (C4), expander (C5) and participation
//! indexer (C6) operate on. These are plain tagged variants rather than
//! an ownership graph, per the design note in spec.md §9: each delta is
//! a flat `Upsert`/`Close` pair, never a graph to walk.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub type Round = u64;
pub type AssetId = u64;
pub type AppId = u64;

/// 32-byte ledger address. The all-zero address is the special "no
/// account" sentinel excluded from participation (spec.md §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(pub [u8; 32]);

impl Address {
    pub const ZERO: Address = Address([0u8; 32]);

    pub fn is_zero(&self) -> bool {
        self == &Self::ZERO
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Tri-state signature-type delta (spec.md §4.4/§9): absent (no sender
/// observed this block), present with a concrete key type, or present
/// but cleared (the sender rekeyed away from a spending key this block).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SigTypeDelta {
    Absent,
    Present(String),
    PresentButEmpty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatableType {
    Asset,
    App,
}

/// An asset or application params record, keyed by an integer index
/// (spec.md GLOSSARY: "Creatable").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreatableParams {
    pub creator: Address,
    /// Opaque, JSON-encodable params blob (asset or app params).
    pub params: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssetHolding {
    pub amount: u128,
    pub frozen: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppLocalState {
    pub data: serde_json::Value,
}

/// An account's post-delta state. `None` (in [`AccountDelta::data`])
/// means the zero/default account, i.e. a deletion (spec.md §4.4 step 2).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountData {
    pub micro_algos: u64,
    pub rewards_base: u64,
    pub rewards_total: u64,
    /// Opaque remainder of account data (vote keys, participation,
    /// total apps/assets opted in, etc) carried through unchanged.
    pub extra: serde_json::Value,
}

impl AccountData {
    pub fn is_zero(&self) -> bool {
        self.micro_algos == 0
            && self.rewards_base == 0
            && self.rewards_total == 0
            && (self.extra.is_null() || self.extra == serde_json::json!({}))
    }
}

/// One account's delta for a block, per spec.md §4.4. `created_assets`
/// / `created_apps` are creatables whose params were produced (or
/// revived) this round and are owned by `addr`; `asset_holdings` /
/// `app_local_states` are holdings/local-states touched (created or
/// updated, not closed — closes are reported separately via
/// [`StateDelta::modified_asset_holdings`] / `modified_app_local_states`).
#[derive(Debug, Clone, Default)]
pub struct AccountDelta {
    pub addr: Address,
    pub data: Option<AccountData>,
    pub created_assets: BTreeMap<AssetId, CreatableParams>,
    pub created_apps: BTreeMap<AppId, CreatableParams>,
    pub asset_holdings: BTreeMap<AssetId, AssetHolding>,
    pub app_local_states: BTreeMap<AppId, AppLocalState>,
}

impl AccountDelta {
    pub fn new(addr: Address) -> Self {
        Self {
            addr,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreatableDelta {
    pub ctype: CreatableType,
    pub created: bool,
    pub creator: Address,
}

/// The per-block ledger change set (spec.md GLOSSARY / §4.4).
#[derive(Debug, Clone, Default)]
pub struct StateDelta {
    pub accts: Vec<AccountDelta>,
    pub creatables: BTreeMap<u64, CreatableDelta>,
    /// `(addr, assetid) -> still open?` false means the holding closed.
    pub modified_asset_holdings: BTreeMap<(Address, AssetId), bool>,
    /// `(addr, app) -> still open?` false means the local state closed.
    pub modified_app_local_states: BTreeMap<(Address, AppId), bool>,
    /// Opaque account-totals blob, persisted verbatim as metastate.
    pub totals: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[rustfmt::skip]
pub enum TxnType {
    Payment           = 0,
    KeyRegistration   = 1,
    AssetConfig       = 2,
    AssetTransfer     = 3,
    AssetFreeze       = 4,
    ApplicationCall   = 5,
    StateProof        = 6,
}

impl TxnType {
    pub fn as_i64(self) -> i64 {
        self as i64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigKind {
    Sig,
    Msig,
    Lsig,
}

impl SigKind {
    /// The `keytype` string persisted in `account.keytype` (spec.md §3).
    pub fn keytype(self) -> &'static str {
        match self {
            SigKind::Sig => "sig",
            SigKind::Msig => "msig",
            SigKind::Lsig => "lsig",
        }
    }
}

/// A transaction header's addressing fields, flattened. Only the fields
/// the expander/participation indexer need are modeled; everything else
/// lives in `extra` and round-trips through the canonical blob encoding.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TxnFields {
    pub sender: Address,
    pub receiver: Option<Address>,
    pub close_remainder_to: Option<Address>,
    pub rekey_to: Option<Address>,
    pub asset_sender: Option<Address>,
    pub asset_receiver: Option<Address>,
    pub asset_close_to: Option<Address>,
    pub freeze_account: Option<Address>,
    pub app_accounts: Vec<Address>,
    /// Existing asset reference for axfer/afrz; ignored for acfg.
    pub asset_ref: Option<AssetId>,
    /// Existing application reference for appl calls (0/None when the
    /// call is itself a creation — the fresh id then comes from apply
    /// data).
    pub application_id: Option<AppId>,
    /// Opaque remainder of the txn header/fields for canonical encoding.
    pub extra: serde_json::Value,
}

impl Default for Address {
    fn default() -> Self {
        Address::ZERO
    }
}

/// Protocol-produced side effects of executing a transaction (spec.md
/// GLOSSARY: "Apply data").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplyData {
    /// Freshly allocated asset id, set only on an asset-config creation.
    pub config_asset: Option<AssetId>,
    /// Freshly allocated application id, set only on an app-call creation.
    pub application_id: Option<AppId>,
    /// Asset-close amount supplied by a "modified transactions" overlay,
    /// absent from the on-block apply data (spec.md §4.5).
    pub asset_close_amount: Option<u64>,
    pub inner_txns: Vec<SignedTxnWithAd>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedTxnWithAd {
    pub ttype: TxnType,
    #[serde(skip)]
    pub sig_kind: Option<SigKind>,
    pub txid: String,
    pub fields: TxnFields,
    pub apply_data: ApplyData,
}

impl Default for SignedTxnWithAd {
    fn default() -> Self {
        Self {
            ttype: TxnType::Payment,
            sig_kind: None,
            txid: String::new(),
            fields: TxnFields::default(),
            apply_data: ApplyData::default(),
        }
    }
}

/// Decoded block header plus payset, the input to [`crate::writer::BlockWriter`].
#[derive(Debug, Clone)]
pub struct Block {
    pub round: Round,
    /// Header timestamp, interpreted as UTC seconds (spec.md §3).
    pub timestamp: i64,
    pub rewards_level: u64,
    pub fee_sink: Address,
    pub rewards_pool: Address,
    pub payset: Vec<SignedTxnWithAd>,
    /// Opaque remainder of the header for canonical encoding.
    pub header_extra: serde_json::Value,
}

/// One emitted `txn` row (spec.md §4.5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxnRow {
    pub round: Round,
    pub intra: u32,
    pub typeenum: i64,
    pub asset: u64,
    pub txid: String,
    pub txn_blob: Vec<u8>,
    pub extra_json: serde_json::Value,
}

/// One emitted `txn_participation` row (spec.md §4.6).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ParticipationRow {
    pub addr: Address,
    pub round: Round,
    pub intra: u32,
}
