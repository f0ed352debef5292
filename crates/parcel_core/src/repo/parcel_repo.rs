//! Parcel repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD over the `parcel` table plus the `parcel_history` ledger.
//! - Enforce the `registered` gate for address changes and deletion.
//!
//! # Invariants
//! - Every successful create or mutation appends exactly one history row
//!   carrying the post-mutation state.
//! - Gate checks and the guarded write are one conditional statement.
//! - Blocked address changes and deletions are silent no-ops, not errors.
//! - History rows are never updated or deleted here.
//! - Under `AuditFailurePolicy::Propagate` a write and its history row commit
//!   together or not at all.

use crate::config::{AuditFailurePolicy, StoreOptions};
use crate::db::migrations::{latest_version, schema_version};
use crate::db::DbError;
use crate::model::history::ParcelHistory;
use crate::model::parcel::{
    now_rfc3339, ClientId, Parcel, ParcelNumber, ParcelValidationError, PARCEL_STATUS_REGISTERED,
};
use log::{debug, warn};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::error::Error;
use std::fmt::{Display, Formatter};

const PARCEL_SELECT_SQL: &str = "SELECT
    number,
    client,
    status,
    address,
    created_at
FROM parcel";

const PARCEL_COLUMNS: &[&str] = &["number", "client", "status", "address", "created_at"];

const HISTORY_COLUMNS: &[&str] = &[
    "id",
    "parcel_number",
    "client",
    "address",
    "status",
    "changed_at",
];

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from parcel store operations.
#[derive(Debug)]
pub enum RepoError {
    /// Input rejected before any write.
    Validation(ParcelValidationError),
    /// Underlying SQLite failure on read or write.
    Db(DbError),
    /// No parcel with this number.
    NotFound(ParcelNumber),
    /// Persisted row cannot be converted into the read model.
    InvalidData(String),
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(number) => write!(f, "parcel not found: {number}"),
            Self::InvalidData(message) => write!(f, "invalid persisted parcel data: {message}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "parcel store requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "parcel store requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_)
            | Self::InvalidData(_)
            | Self::MissingRequiredTable(_)
            | Self::MissingRequiredColumn { .. } => None,
        }
    }
}

impl From<ParcelValidationError> for RepoError {
    fn from(value: ParcelValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for parcel persistence.
pub trait ParcelRepository {
    /// Inserts a parcel and returns the store-assigned number.
    ///
    /// `parcel.number` is ignored.
    fn add(&self, parcel: &Parcel) -> RepoResult<ParcelNumber>;
    /// Loads one parcel; `NotFound` when absent.
    fn get(&self, number: ParcelNumber) -> RepoResult<Parcel>;
    /// Lists a client's parcels in storage order. Empty when none match.
    fn get_by_client(&self, client: ClientId) -> RepoResult<Vec<Parcel>>;
    /// Overwrites status unconditionally. Unknown numbers are a no-op.
    fn set_status(&self, number: ParcelNumber, status: &str) -> RepoResult<()>;
    /// Changes address while `registered`; otherwise a silent no-op.
    fn set_address(&self, number: ParcelNumber, address: &str) -> RepoResult<()>;
    /// Deletes while `registered`; otherwise a silent no-op.
    fn delete(&self, number: ParcelNumber) -> RepoResult<()>;
    /// Appends one history row from the parcel's in-memory fields.
    fn add_history(&self, parcel: &Parcel) -> RepoResult<()>;
    /// Lists a client's history rows in ascending `id` order.
    fn get_history_by_client(&self, client: ClientId) -> RepoResult<Vec<ParcelHistory>>;
}

/// SQLite-backed parcel store.
///
/// Borrows a connection whose schema was created elsewhere.
pub struct ParcelStore<'conn> {
    conn: &'conn Connection,
    options: StoreOptions,
}

impl<'conn> ParcelStore<'conn> {
    /// Creates a store with default options from a ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        Self::with_options(conn, StoreOptions::default())
    }

    /// Creates a store with explicit options from a ready connection.
    pub fn with_options(conn: &'conn Connection, options: StoreOptions) -> RepoResult<Self> {
        ensure_parcel_connection_ready(conn)?;
        Ok(Self { conn, options })
    }

    /// Changes the address and reports whether the write applied.
    ///
    /// `Ok(false)` means the parcel exists but is no longer `registered`.
    pub fn try_set_address(&self, number: ParcelNumber, address: &str) -> RepoResult<bool> {
        let tx = self.begin_audited()?;
        let changed = self.conn.execute(
            "UPDATE parcel
             SET address = ?2
             WHERE number = ?1
               AND status = ?3;",
            params![number, address, PARCEL_STATUS_REGISTERED],
        )?;

        if changed == 0 {
            self.ensure_exists(number)?;
            debug!(
                "event=parcel_set_address module=repo status=skipped number={number} reason=not_registered"
            );
            return Ok(false);
        }

        debug!("event=parcel_set_address module=repo status=ok number={number}");
        self.record_current(number)?;
        commit_audited(tx)?;
        Ok(true)
    }

    /// Deletes the parcel and reports whether the row was removed.
    ///
    /// `Ok(false)` means the parcel exists but is no longer `registered`.
    pub fn try_delete(&self, number: ParcelNumber) -> RepoResult<bool> {
        let snapshot = if self.options.record_deletions {
            self.find(number)?
        } else {
            None
        };

        let tx = self.begin_audited()?;
        let changed = self.conn.execute(
            "DELETE FROM parcel
             WHERE number = ?1
               AND status = ?2;",
            params![number, PARCEL_STATUS_REGISTERED],
        )?;

        if changed == 0 {
            self.ensure_exists(number)?;
            debug!(
                "event=parcel_delete module=repo status=skipped number={number} reason=not_registered"
            );
            return Ok(false);
        }

        debug!("event=parcel_delete module=repo status=ok number={number}");
        if let Some(parcel) = snapshot {
            self.append_history_checked(&parcel)?;
        }
        commit_audited(tx)?;
        Ok(true)
    }

    /// Opens a transaction around a write and its history row when history
    /// failures must be reported; dropping it uncommitted rolls both back.
    fn begin_audited(&self) -> RepoResult<Option<Transaction<'_>>> {
        match self.options.audit_failure_policy {
            AuditFailurePolicy::Propagate => Ok(Some(self.conn.unchecked_transaction()?)),
            AuditFailurePolicy::Ignore => Ok(None),
        }
    }

    fn find(&self, number: ParcelNumber) -> RepoResult<Option<Parcel>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PARCEL_SELECT_SQL} WHERE number = ?1;"))?;
        let mut rows = stmt.query([number])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_parcel_row(row)?));
        }

        Ok(None)
    }

    fn ensure_exists(&self, number: ParcelNumber) -> RepoResult<()> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM parcel WHERE number = ?1;",
                [number],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        match found {
            Some(_) => Ok(()),
            None => Err(RepoError::NotFound(number)),
        }
    }

    /// Re-reads the parcel and appends its snapshot.
    ///
    /// A failed re-read skips the append without error.
    fn record_current(&self, number: ParcelNumber) -> RepoResult<()> {
        match self.find(number) {
            Ok(Some(parcel)) => self.append_history_checked(&parcel),
            Ok(None) => Ok(()),
            Err(err) => {
                warn!(
                    "event=history_append module=repo status=skipped number={number} reason=reread_failed error={err}"
                );
                Ok(())
            }
        }
    }

    fn append_history_checked(&self, parcel: &Parcel) -> RepoResult<()> {
        match self.add_history(parcel) {
            Ok(()) => Ok(()),
            Err(err) => match self.options.audit_failure_policy {
                AuditFailurePolicy::Ignore => {
                    warn!(
                        "event=history_append module=repo status=error number={} policy=ignore error={}",
                        parcel.number, err
                    );
                    Ok(())
                }
                AuditFailurePolicy::Propagate => Err(err),
            },
        }
    }
}

impl ParcelRepository for ParcelStore<'_> {
    fn add(&self, parcel: &Parcel) -> RepoResult<ParcelNumber> {
        parcel.validate()?;

        let tx = self.begin_audited()?;
        self.conn.execute(
            "INSERT INTO parcel (
                client,
                status,
                address,
                created_at
            ) VALUES (?1, ?2, ?3, ?4);",
            params![
                parcel.client,
                parcel.status.as_str(),
                parcel.address.as_str(),
                parcel.created_at.as_str(),
            ],
        )?;
        let number = self.conn.last_insert_rowid();
        debug!(
            "event=parcel_add module=repo status=ok number={number} client={}",
            parcel.client
        );

        let stored = Parcel {
            number,
            ..parcel.clone()
        };
        self.append_history_checked(&stored)?;
        commit_audited(tx)?;
        Ok(number)
    }

    fn get(&self, number: ParcelNumber) -> RepoResult<Parcel> {
        self.find(number)?.ok_or(RepoError::NotFound(number))
    }

    fn get_by_client(&self, client: ClientId) -> RepoResult<Vec<Parcel>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PARCEL_SELECT_SQL} WHERE client = ?1;"))?;
        let mut rows = stmt.query([client])?;
        let mut parcels = Vec::new();

        while let Some(row) = rows.next()? {
            parcels.push(parse_parcel_row(row)?);
        }

        Ok(parcels)
    }

    fn set_status(&self, number: ParcelNumber, status: &str) -> RepoResult<()> {
        let tx = self.begin_audited()?;
        let changed = self.conn.execute(
            "UPDATE parcel SET status = ?2 WHERE number = ?1;",
            params![number, status],
        )?;
        debug!("event=parcel_set_status module=repo status=ok number={number} changed={changed}");

        if changed == 0 {
            return Ok(());
        }
        self.record_current(number)?;
        commit_audited(tx)
    }

    fn set_address(&self, number: ParcelNumber, address: &str) -> RepoResult<()> {
        self.try_set_address(number, address).map(|_| ())
    }

    fn delete(&self, number: ParcelNumber) -> RepoResult<()> {
        self.try_delete(number).map(|_| ())
    }

    fn add_history(&self, parcel: &Parcel) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO parcel_history (
                parcel_number,
                client,
                address,
                status,
                changed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                parcel.number,
                parcel.client,
                parcel.address.as_str(),
                parcel.status.as_str(),
                now_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn get_history_by_client(&self, client: ClientId) -> RepoResult<Vec<ParcelHistory>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                id,
                parcel_number,
                client,
                address,
                status,
                changed_at
             FROM parcel_history
             WHERE client = ?1
             ORDER BY id ASC;",
        )?;
        let mut rows = stmt.query([client])?;
        let mut history = Vec::new();

        while let Some(row) = rows.next()? {
            history.push(parse_history_row(row)?);
        }

        Ok(history)
    }
}

fn commit_audited(tx: Option<Transaction<'_>>) -> RepoResult<()> {
    if let Some(tx) = tx {
        tx.commit()?;
    }
    Ok(())
}

fn parse_parcel_row(row: &Row<'_>) -> RepoResult<Parcel> {
    Ok(Parcel {
        number: row.get("number")?,
        client: row.get("client")?,
        status: row.get("status")?,
        address: row.get("address")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_history_row(row: &Row<'_>) -> RepoResult<ParcelHistory> {
    let id: i64 = row.get("id")?;
    // History columns are nullable; a NULL snapshot field means a foreign writer.
    let required_text = |column: &'static str| -> RepoResult<String> {
        row.get::<_, Option<String>>(column)?.ok_or_else(|| {
            RepoError::InvalidData(format!("NULL parcel_history.{column} in row {id}"))
        })
    };
    let required_int = |column: &'static str| -> RepoResult<i64> {
        row.get::<_, Option<i64>>(column)?.ok_or_else(|| {
            RepoError::InvalidData(format!("NULL parcel_history.{column} in row {id}"))
        })
    };

    Ok(ParcelHistory {
        id,
        parcel_number: required_int("parcel_number")?,
        client: required_int("client")?,
        address: required_text("address")?,
        status: required_text("status")?,
        changed_at: required_text("changed_at")?,
    })
}

fn ensure_parcel_connection_ready(conn: &Connection) -> RepoResult<()> {
    // Externally created schemas carry user_version 0; only newer ones are refused.
    let latest_supported = latest_version();
    let db_version = schema_version(conn)?;
    if db_version > latest_supported {
        return Err(RepoError::Db(DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        }));
    }

    for (table, columns) in [
        ("parcel", PARCEL_COLUMNS),
        ("parcel_history", HISTORY_COLUMNS),
    ] {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(RepoError::MissingRequiredColumn { table, column });
            }
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
