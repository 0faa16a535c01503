//! End-to-end scenarios from spec.md §8, run against an in-memory
//! `BlockWriter` the way `task_manager`'s own tests use `tempfile` +
//! a real SQLite file — here an in-process database is enough since
//! nothing under test crosses a process boundary.

use ledger_indexer_writer::{
    AccountData, AccountDelta, Address, Block, BlockWriter, CreatableDelta, CreatableType,
    SigKind, SignedTxnWithAd, StateDelta, TxnFields, TxnType,
};
use pretty_assertions::assert_eq;

fn addr(b: u8) -> Address {
    let mut bytes = [0u8; 32];
    bytes[0] = b;
    Address(bytes)
}

fn empty_block(round: u64, timestamp: i64, rewards_level: u64) -> Block {
    Block {
        round,
        timestamp,
        rewards_level,
        fee_sink: Address::ZERO,
        rewards_pool: Address::ZERO,
        payset: Vec::new(),
        header_extra: serde_json::json!({}),
    }
}

fn txn(ttype: TxnType, txid: &str) -> SignedTxnWithAd {
    SignedTxnWithAd {
        ttype,
        sig_kind: None,
        txid: txid.to_string(),
        fields: TxnFields::default(),
        apply_data: Default::default(),
    }
}

#[test]
fn scenario_1_header_only_block() {
    let mut w = BlockWriter::in_memory().unwrap();
    let block = empty_block(2, 333, 111_111);
    let special = serde_json::json!({"FeeSink": Address::ZERO.to_string(), "RewardsPool": Address::ZERO.to_string()});
    w.add_block_0(&block, &special).unwrap();

    let conn = w.connection();
    let (round, realtime, rewards_level): (i64, i64, i64) = conn
        .query_row(
            "SELECT round, realtime, rewards_level FROM block_header",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .unwrap();
    assert_eq!((round, realtime, rewards_level), (2, 333, 111_111));

    let stored: String = conn
        .query_row("SELECT v FROM metastate WHERE k = 'special-addresses'", [], |r| r.get(0))
        .unwrap();
    let stored: serde_json::Value = serde_json::from_str(&stored).unwrap();
    assert_eq!(stored, special);
}

#[test]
fn scenario_2_create_then_delete_account_across_rounds() {
    let mut w = BlockWriter::in_memory().unwrap();
    let a = addr(1);

    let mut delta4 = StateDelta::default();
    let mut acct4 = AccountDelta::new(a);
    acct4.data = Some(AccountData {
        micro_algos: 5,
        rewards_base: 0,
        rewards_total: 0,
        extra: serde_json::json!({}),
    });
    delta4.accts.push(acct4);
    w.add_block(&empty_block(4, 1, 0), &delta4).unwrap();

    let mut delta5 = StateDelta::default();
    let mut acct5 = AccountDelta::new(a);
    acct5.data = None;
    delta5.accts.push(acct5);
    w.add_block(&empty_block(5, 2, 0), &delta5).unwrap();

    let conn = w.connection();
    let (deleted, created_at, closed_at, keytype, account_data_json): (bool, i64, Option<i64>, Option<String>, String) =
        conn.query_row(
            "SELECT deleted, created_at, closed_at, keytype, account_data_json FROM account WHERE addr = ?1",
            [a.to_string()],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?)),
        )
        .unwrap();
    assert!(deleted);
    assert_eq!(created_at, 4);
    assert_eq!(closed_at, Some(5));
    assert_eq!(keytype, None);
    assert_eq!(account_data_json, "null");
}

#[test]
fn scenario_3_same_round_create_and_delete_asset_holding() {
    let mut w = BlockWriter::in_memory().unwrap();
    let a = addr(2);

    let mut delta = StateDelta::default();
    delta.modified_asset_holdings.insert((a, 3), false);
    w.add_block(&empty_block(1, 1, 0), &delta).unwrap();

    let conn = w.connection();
    let (amount, frozen, deleted, created_at, closed_at): (String, bool, bool, i64, Option<i64>) = conn
        .query_row(
            "SELECT amount, frozen, deleted, created_at, closed_at FROM account_asset WHERE addr = ?1 AND assetid = 3",
            [a.to_string()],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?)),
        )
        .unwrap();
    assert_eq!(amount, "0");
    assert!(!frozen);
    assert!(deleted);
    assert_eq!(created_at, 1);
    assert_eq!(closed_at, Some(1));
}

#[test]
fn scenario_4_large_asset_amount() {
    let mut w = BlockWriter::in_memory().unwrap();
    let a = addr(3);

    let mut delta = StateDelta::default();
    let mut acct = AccountDelta::new(a);
    acct.data = Some(AccountData {
        micro_algos: 1,
        rewards_base: 0,
        rewards_total: 0,
        extra: serde_json::json!({}),
    });
    acct.asset_holdings.insert(
        3,
        ledger_indexer_writer::AssetHolding {
            amount: u64::MAX as u128,
            frozen: false,
        },
    );
    delta.accts.push(acct);
    delta.modified_asset_holdings.insert((a, 3), true);
    w.add_block(&empty_block(1, 1, 0), &delta).unwrap();

    let conn = w.connection();
    let amount: String = conn
        .query_row(
            "SELECT amount FROM account_asset WHERE addr = ?1 AND assetid = 3",
            [a.to_string()],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(amount, u64::MAX.to_string());
}

#[test]
fn scenario_5_delete_does_not_clear_keytype() {
    let mut w = BlockWriter::in_memory().unwrap();
    let a = addr(4);

    let mut pay = txn(TxnType::Payment, "PAY1");
    pay.sig_kind = Some(SigKind::Sig);
    pay.fields.sender = a;

    let mut delta4 = StateDelta::default();
    let mut acct4 = AccountDelta::new(a);
    acct4.data = Some(AccountData {
        micro_algos: 5,
        rewards_base: 0,
        rewards_total: 0,
        extra: serde_json::json!({}),
    });
    delta4.accts.push(acct4);
    let mut block4 = empty_block(4, 1, 0);
    block4.payset.push(pay);
    w.add_block(&block4, &delta4).unwrap();

    let mut delta5 = StateDelta::default();
    let mut acct5 = AccountDelta::new(a);
    acct5.data = None;
    delta5.accts.push(acct5);
    w.add_block(&empty_block(5, 2, 0), &delta5).unwrap();

    let conn = w.connection();
    let keytype: Option<String> = conn
        .query_row("SELECT keytype FROM account WHERE addr = ?1", [a.to_string()], |r| r.get(0))
        .unwrap();
    assert_eq!(keytype.as_deref(), Some("sig"));
}

#[test]
fn scenario_6_inner_transactions() {
    let mut w = BlockWriter::in_memory().unwrap();

    let mut appl = txn(TxnType::ApplicationCall, "APPL");
    appl.apply_data.application_id = Some(1);
    appl.apply_data.inner_txns.push(txn(TxnType::Payment, ""));
    appl.apply_data.inner_txns.push(txn(TxnType::Payment, ""));
    let mut axfer_inner = txn(TxnType::AssetTransfer, "");
    axfer_inner.fields.asset_ref = Some(9);
    appl.apply_data.inner_txns.push(axfer_inner);

    let mut acfg = txn(TxnType::AssetConfig, "ACFG");
    acfg.apply_data.config_asset = Some(5);

    let mut block = empty_block(1, 1, 0);
    block.payset.push(appl);
    block.payset.push(acfg);

    w.add_block(&block, &StateDelta::default()).unwrap();

    let conn = w.connection();
    let mut stmt = conn
        .prepare("SELECT intra, typeenum, asset, txid, extra_json FROM txn WHERE round = 1 ORDER BY intra")
        .unwrap();
    let rows: Vec<(u32, i64, i64, String, String)> = stmt
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?)))
        .unwrap()
        .map(|r| r.unwrap())
        .collect();

    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0].0, 0);
    assert_eq!(rows[4].0, 4);
    assert_eq!(rows[0].1, TxnType::ApplicationCall.as_i64());
    assert_eq!(rows[0].2, 1);
    assert_eq!(rows[4].2, 5);
    assert_eq!(rows[1].3, "");
    let extra: serde_json::Value = serde_json::from_str(&rows[1].4).unwrap();
    assert_eq!(extra["root-txid"], "APPL");
    assert_eq!(extra["root-intra"], 0);

    let outer_extra: serde_json::Value = serde_json::from_str(&rows[0].4).unwrap();
    assert_eq!(outer_extra, serde_json::json!({}));
}

#[test]
fn add_block_writes_special_addresses_from_header() {
    let mut w = BlockWriter::in_memory().unwrap();
    let mut block = empty_block(1, 1, 0);
    block.fee_sink = addr(6);
    block.rewards_pool = addr(7);

    w.add_block(&block, &StateDelta::default()).unwrap();

    let conn = w.connection();
    let stored: String = conn
        .query_row("SELECT v FROM metastate WHERE k = 'special-addresses'", [], |r| r.get(0))
        .unwrap();
    let stored: serde_json::Value = serde_json::from_str(&stored).unwrap();
    assert_eq!(stored["FeeSink"], addr(6).to_string());
    assert_eq!(stored["RewardsPool"], addr(7).to_string());
}

#[test]
fn scenario_7_invalid_inner_asset_config_fails() {
    let mut w = BlockWriter::in_memory().unwrap();

    let mut appl = txn(TxnType::ApplicationCall, "APPL");
    appl.apply_data.application_id = Some(1);
    let mut bad_acfg = txn(TxnType::AssetConfig, "");
    bad_acfg.apply_data.config_asset = None;
    appl.apply_data.inner_txns.push(bad_acfg);

    let mut block = empty_block(1, 1, 0);
    block.payset.push(appl);

    let err = w.add_block(&block, &StateDelta::default()).unwrap_err();
    assert!(err.to_string().contains("Missing ConfigAsset for transaction: "));
}

#[test]
fn open_or_create_bootstraps_schema_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("indexer.sqlite");

    let mut w = BlockWriter::open_or_create(&path).unwrap();
    w.add_block_0(&empty_block(0, 0, 0), &serde_json::json!({})).unwrap();
    drop(w);

    // Reopening the same file must not choke on `CREATE TABLE IF NOT EXISTS`
    // and must see the previously committed genesis row.
    let mut w2 = BlockWriter::open_or_create(&path).unwrap();
    let round: i64 = w2
        .connection()
        .query_row("SELECT round FROM block_header", [], |r| r.get(0))
        .unwrap();
    assert_eq!(round, 0);
}

#[test]
fn creatable_create_then_close_same_round() {
    let mut w = BlockWriter::in_memory().unwrap();
    let creator = addr(5);

    let mut delta = StateDelta::default();
    delta.creatables.insert(
        7,
        CreatableDelta {
            ctype: CreatableType::Asset,
            created: false,
            creator,
        },
    );
    w.add_block(&empty_block(1, 1, 0), &delta).unwrap();

    let conn = w.connection();
    let (deleted, created_at, closed_at): (bool, i64, Option<i64>) = conn
        .query_row(
            "SELECT deleted, created_at, closed_at FROM asset WHERE idx = 7",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .unwrap();
    assert!(deleted);
    assert_eq!(created_at, 1);
    assert_eq!(closed_at, Some(1));
}
