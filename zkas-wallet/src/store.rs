//! Durable wallet storage.
//!
//! The engine only needs a handful of slots: the master seed, the
//! sequence counter, the reservation pool, and confirmed mint records.
//! [`WalletStore`] is the contract; the SQLite implementation is the
//! production backend, and tests inject failing stores to exercise the
//! crash-safety ordering.

use num_bigint::BigUint;
use rusqlite::{params, Connection};
use std::path::Path;
use tracing::{debug, info};

use zkas_common::{Denomination, MintRecord, TxId};

use crate::WalletError;

/// Durable key/value contract for wallet state.
///
/// `set_sequence_counter` must be durable when it returns: the engine
/// hands out a derived value only after this call succeeds.
pub trait WalletStore: Send {
    fn master_seed(&self) -> Result<Option<[u8; 32]>, WalletError>;
    fn set_master_seed(&mut self, seed: &[u8; 32]) -> Result<(), WalletError>;

    fn sequence_counter(&self) -> Result<u32, WalletError>;
    fn set_sequence_counter(&mut self, counter: u32) -> Result<(), WalletError>;

    fn put_pool_entry(&mut self, value: &BigUint, index: u32) -> Result<(), WalletError>;
    fn remove_pool_entry(&mut self, value: &BigUint) -> Result<(), WalletError>;
    fn pool_entries(&self) -> Result<Vec<(BigUint, u32)>, WalletError>;

    fn put_mint(&mut self, record: &MintRecord) -> Result<(), WalletError>;
    fn mints(&self) -> Result<Vec<MintRecord>, WalletError>;
}

/// SQLite-backed wallet store.
pub struct SqliteWalletStore {
    conn: Connection,
}

impl SqliteWalletStore {
    pub fn open(path: impl AsRef<Path>) -> Result<SqliteWalletStore, WalletError> {
        let conn = Connection::open(path.as_ref())
            .map_err(|e| WalletError::Storage(format!("database open failed: {e}")))?;
        let store = SqliteWalletStore { conn };
        store.init_schema()?;
        info!("Opened wallet store at {:?}", path.as_ref());
        Ok(store)
    }

    /// In-memory database (for testing).
    pub fn in_memory() -> Result<SqliteWalletStore, WalletError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| WalletError::Storage(format!("in-memory db failed: {e}")))?;
        let store = SqliteWalletStore { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), WalletError> {
        self.conn
            .execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS wallet_meta (
                    key TEXT PRIMARY KEY,
                    value BLOB NOT NULL
                );

                CREATE TABLE IF NOT EXISTS mint_pool (
                    value BLOB PRIMARY KEY,
                    seq INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS mints (
                    value BLOB PRIMARY KEY,
                    denom INTEGER NOT NULL,
                    serial BLOB NOT NULL,
                    randomness BLOB NOT NULL,
                    height INTEGER NOT NULL,
                    txid BLOB NOT NULL,
                    used INTEGER NOT NULL DEFAULT 0
                );
                "#,
            )
            .map_err(|e| WalletError::Storage(format!("schema init failed: {e}")))
    }

    fn meta_get(&self, key: &str) -> Result<Option<Vec<u8>>, WalletError> {
        let result = self.conn.query_row(
            "SELECT value FROM wallet_meta WHERE key = ?",
            params![key],
            |row| row.get(0),
        );
        match result {
            Ok(blob) => Ok(Some(blob)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(WalletError::Storage(format!("read {key} failed: {e}"))),
        }
    }

    fn meta_put(&self, key: &str, value: &[u8]) -> Result<(), WalletError> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO wallet_meta (key, value) VALUES (?, ?)",
                params![key, value],
            )
            .map_err(|e| WalletError::Storage(format!("write {key} failed: {e}")))?;
        Ok(())
    }
}

impl WalletStore for SqliteWalletStore {
    fn master_seed(&self) -> Result<Option<[u8; 32]>, WalletError> {
        let Some(blob) = self.meta_get("master_seed")? else {
            return Ok(None);
        };
        let seed: [u8; 32] = blob
            .try_into()
            .map_err(|_| WalletError::Storage("master seed has wrong length".into()))?;
        Ok(Some(seed))
    }

    fn set_master_seed(&mut self, seed: &[u8; 32]) -> Result<(), WalletError> {
        self.meta_put("master_seed", seed)
    }

    fn sequence_counter(&self) -> Result<u32, WalletError> {
        let Some(blob) = self.meta_get("sequence_counter")? else {
            return Ok(0);
        };
        let word: [u8; 4] = blob
            .try_into()
            .map_err(|_| WalletError::Storage("sequence counter has wrong length".into()))?;
        Ok(u32::from_le_bytes(word))
    }

    fn set_sequence_counter(&mut self, counter: u32) -> Result<(), WalletError> {
        self.meta_put("sequence_counter", &counter.to_le_bytes())?;
        debug!(counter, "advanced sequence counter");
        Ok(())
    }

    fn put_pool_entry(&mut self, value: &BigUint, index: u32) -> Result<(), WalletError> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO mint_pool (value, seq) VALUES (?, ?)",
                params![value.to_bytes_be(), index],
            )
            .map_err(|e| WalletError::Storage(format!("pool insert failed: {e}")))?;
        Ok(())
    }

    fn remove_pool_entry(&mut self, value: &BigUint) -> Result<(), WalletError> {
        self.conn
            .execute(
                "DELETE FROM mint_pool WHERE value = ?",
                params![value.to_bytes_be()],
            )
            .map_err(|e| WalletError::Storage(format!("pool delete failed: {e}")))?;
        Ok(())
    }

    fn pool_entries(&self) -> Result<Vec<(BigUint, u32)>, WalletError> {
        let mut stmt = self
            .conn
            .prepare("SELECT value, seq FROM mint_pool ORDER BY seq ASC")
            .map_err(|e| WalletError::Storage(format!("prepare pool query failed: {e}")))?;
        let rows = stmt
            .query_map([], |row| {
                let blob: Vec<u8> = row.get(0)?;
                let index: u32 = row.get(1)?;
                Ok((BigUint::from_bytes_be(&blob), index))
            })
            .map_err(|e| WalletError::Storage(format!("pool query failed: {e}")))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| WalletError::Storage(format!("collect pool entries failed: {e}")))
    }

    fn put_mint(&mut self, record: &MintRecord) -> Result<(), WalletError> {
        self.conn
            .execute(
                r#"
                INSERT OR REPLACE INTO mints
                    (value, denom, serial, randomness, height, txid, used)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
                params![
                    record.value.to_bytes_be(),
                    record.denomination.face_value() as i64,
                    record.serial.to_bytes_be(),
                    record.randomness.to_bytes_be(),
                    record.height,
                    record.txid.as_bytes().as_slice(),
                    record.used as i64,
                ],
            )
            .map_err(|e| WalletError::Storage(format!("mint insert failed: {e}")))?;
        Ok(())
    }

    fn mints(&self) -> Result<Vec<MintRecord>, WalletError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT value, denom, serial, randomness, height, txid, used
                 FROM mints ORDER BY height ASC",
            )
            .map_err(|e| WalletError::Storage(format!("prepare mint query failed: {e}")))?;
        let rows = stmt
            .query_map([], |row| {
                let value: Vec<u8> = row.get(0)?;
                let denom: i64 = row.get(1)?;
                let serial: Vec<u8> = row.get(2)?;
                let randomness: Vec<u8> = row.get(3)?;
                let height: u32 = row.get(4)?;
                let txid: Vec<u8> = row.get(5)?;
                let used: i64 = row.get(6)?;
                Ok((value, denom, serial, randomness, height, txid, used))
            })
            .map_err(|e| WalletError::Storage(format!("mint query failed: {e}")))?;

        let mut records = Vec::new();
        for row in rows {
            let (value, denom, serial, randomness, height, txid, used) =
                row.map_err(|e| WalletError::Storage(format!("read mint row failed: {e}")))?;
            let denomination = Denomination::from_face_value(denom as u64).ok_or_else(|| {
                WalletError::Storage(format!("unknown denomination {denom} in mint row"))
            })?;
            let txid: [u8; 32] = txid
                .try_into()
                .map_err(|_| WalletError::Storage("txid has wrong length".into()))?;
            records.push(MintRecord {
                denomination,
                value: BigUint::from_bytes_be(&value),
                serial: BigUint::from_bytes_be(&serial),
                randomness: BigUint::from_bytes_be(&randomness),
                height,
                txid: TxId(txid),
                used: used != 0,
            });
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_and_counter_round_trip() {
        let mut store = SqliteWalletStore::in_memory().unwrap();
        assert_eq!(store.master_seed().unwrap(), None);
        assert_eq!(store.sequence_counter().unwrap(), 0);

        store.set_master_seed(&[7u8; 32]).unwrap();
        store.set_sequence_counter(42).unwrap();
        assert_eq!(store.master_seed().unwrap(), Some([7u8; 32]));
        assert_eq!(store.sequence_counter().unwrap(), 42);
    }

    #[test]
    fn pool_entries_round_trip() {
        let mut store = SqliteWalletStore::in_memory().unwrap();
        let a = BigUint::from(100_003u32);
        let b = BigUint::from(100_019u32);
        store.put_pool_entry(&a, 0).unwrap();
        store.put_pool_entry(&b, 1).unwrap();
        assert_eq!(store.pool_entries().unwrap().len(), 2);

        store.remove_pool_entry(&a).unwrap();
        let remaining = store.pool_entries().unwrap();
        assert_eq!(remaining, vec![(b, 1)]);
    }

    #[test]
    fn mint_records_round_trip() {
        let mut store = SqliteWalletStore::in_memory().unwrap();
        let record = MintRecord {
            denomination: Denomination::Fifty,
            value: BigUint::from(131_071u32),
            serial: BigUint::from(17u32),
            randomness: BigUint::from(23u32),
            height: 120,
            txid: TxId([2u8; 32]),
            used: false,
        };
        store.put_mint(&record).unwrap();
        assert_eq!(store.mints().unwrap(), vec![record]);
    }
}
