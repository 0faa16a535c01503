//! C8 — metastate keeper. Typed accessors over the small, fixed set of
//! singleton keys the orchestrator tracks in the `metastate` table
//! (spec.md §3/§4.7); callers never touch the table with raw strings.

use rusqlite::{Connection, OptionalExtension};
use serde_json::Value;

use crate::codec::{decode_json, encode_json};
use crate::error::{sql_err, WriterResult};

pub const KEY_SPECIAL_ADDRESSES: &str = "special-addresses";
pub const KEY_ACCOUNT_TOTALS: &str = "account-totals";
pub const KEY_NEXT_ROUND_TO_ACCOUNT: &str = "next-round-to-account";

pub fn get_raw(conn: &Connection, key: &str) -> WriterResult<Option<String>> {
    conn.query_row("SELECT v FROM metastate WHERE k = ?1", [key], |row| row.get(0))
        .optional()
        .map_err(sql_err("metastate::get_raw()"))
}

pub fn set_raw(conn: &Connection, key: &str, value_json: &str) -> WriterResult<()> {
    conn.execute(
        "INSERT INTO metastate(k, v) VALUES (?1, ?2)
         ON CONFLICT(k) DO UPDATE SET v = excluded.v",
        rusqlite::params![key, value_json],
    )
    .map_err(sql_err("metastate::set_raw()"))?;
    Ok(())
}

pub fn get_next_round_to_account(conn: &Connection) -> WriterResult<Option<u64>> {
    match get_raw(conn, KEY_NEXT_ROUND_TO_ACCOUNT)? {
        Some(raw) => Ok(Some(decode_json(
            "metastate::get_next_round_to_account()",
            &raw,
        )?)),
        None => Ok(None),
    }
}

pub fn set_next_round_to_account(conn: &Connection, round: u64) -> WriterResult<()> {
    let raw = encode_json("metastate::set_next_round_to_account()", &round)?;
    set_raw(conn, KEY_NEXT_ROUND_TO_ACCOUNT, &raw)
}

pub fn get_special_addresses(conn: &Connection) -> WriterResult<Option<Value>> {
    match get_raw(conn, KEY_SPECIAL_ADDRESSES)? {
        Some(raw) => Ok(Some(decode_json("metastate::get_special_addresses()", &raw)?)),
        None => Ok(None),
    }
}

pub fn set_special_addresses(conn: &Connection, value: &Value) -> WriterResult<()> {
    let raw = encode_json("metastate::set_special_addresses()", value)?;
    set_raw(conn, KEY_SPECIAL_ADDRESSES, &raw)
}

pub fn get_account_totals(conn: &Connection) -> WriterResult<Option<Value>> {
    match get_raw(conn, KEY_ACCOUNT_TOTALS)? {
        Some(raw) => Ok(Some(decode_json("metastate::get_account_totals()", &raw)?)),
        None => Ok(None),
    }
}
