//! SQL-based storage for accounts, identity variants, requests and links
//!
//! Reads are unscoped lookups; the access guard decides what the caller may see.
//! Writes demand the role relation the guard hands out, and status writes and
//! link writes run in IMMEDIATE transactions so concurrent accept/deny calls
//! serialize on the database lock.

use super::super::access::{OwnerOf, ReceiverOf, SenderOf};
use super::super::account::{Account, AccountCredentials};
use super::super::error::{DisclosureError, DisclosureResult};
use super::super::identity_variant::{ProfileIdentityVariant, ProfileVariantDraft};
use super::super::request::{Request, RequestStatus, StatusTransition};
use super::super::request_variant::{
    RequestIdentityVariant, RequestVariantDraft, RequestVariantPatch, RequestVariantRecord,
};
use super::super::types::{ProfileVariantId, RequestId, RequestVariantId, Timestamp, UserId};
use crate::metrics::Timer;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row, TransactionBehavior};
use std::path::Path;
use std::time::Duration;

const REQUEST_COLUMNS: &str = "r.id, r.sender_id, r.receiver_id, s.username, v.username,
     r.reasoning, r.created_at, r.status
     FROM requests r
     JOIN users s ON s.id = r.sender_id
     JOIN users v ON v.id = r.receiver_id";

const REQUEST_VARIANT_COLUMNS: &str = "riv.id, riv.request_id, riv.label, riv.context,
     riv.profile_link_id, r.status, piv.variant_value
     FROM request_identity_variants riv
     JOIN requests r ON r.id = riv.request_id
     LEFT JOIN profile_identity_variants piv ON piv.id = riv.profile_link_id";

/// SQL-based storage for the disclosure domain
#[derive(Clone)]
pub struct DisclosureSqlStore {
    pool: Pool<SqliteConnectionManager>,
}

impl DisclosureSqlStore {
    /// Create a store over an existing pool and run migrations
    pub fn new(pool: Pool<SqliteConnectionManager>) -> DisclosureResult<Self> {
        super::migrations::migrate(&pool)?;
        Ok(Self { pool })
    }

    /// Open (or create) a database file
    pub fn open(
        path: impl AsRef<Path>,
        pool_size: u32,
        busy_timeout: Duration,
    ) -> DisclosureResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DisclosureError::Storage(format!("create {}: {}", parent.display(), e)))?;
            }
        }

        let manager = SqliteConnectionManager::file(path.as_ref()).with_init(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            conn.execute_batch("PRAGMA foreign_keys = ON;")
        });
        let pool = Pool::builder().max_size(pool_size).build(manager)?;

        tracing::info!(path = %path.as_ref().display(), pool_size, "Opened disclosure store");
        Self::new(pool)
    }

    /// Create a new in-memory store.
    ///
    /// Every pooled in-memory connection is its own database, so the pool holds one.
    pub fn memory() -> DisclosureResult<Self> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::builder().max_size(1).build(manager)?;
        Self::new(pool)
    }

    // ===== Accounts =====

    pub fn insert_account(&self, username: &str, password_hash: &str) -> DisclosureResult<Account> {
        let conn = self.pool.get()?;
        let created_at = Timestamp::now();

        let result = conn.execute(
            "INSERT INTO users (username, password_hash, created_at) VALUES (?, ?, ?)",
            params![username, password_hash, created_at.as_millis() as i64],
        );

        match result {
            Ok(_) => Ok(Account {
                id: UserId(conn.last_insert_rowid()),
                username: username.to_string(),
                created_at,
            }),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(DisclosureError::invalid(
                    "username",
                    "A user with that username already exists.",
                ))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn find_account(&self, id: UserId) -> DisclosureResult<Option<Account>> {
        let conn = self.pool.get()?;
        let account = conn
            .query_row(
                "SELECT id, username, created_at FROM users WHERE id = ?",
                params![id.as_i64()],
                account_from_row,
            )
            .optional()?;
        Ok(account)
    }

    pub fn find_account_by_username(&self, username: &str) -> DisclosureResult<Option<Account>> {
        let conn = self.pool.get()?;
        let account = conn
            .query_row(
                "SELECT id, username, created_at FROM users WHERE username = ?",
                params![username],
                account_from_row,
            )
            .optional()?;
        Ok(account)
    }

    pub fn find_credentials(&self, username: &str) -> DisclosureResult<Option<AccountCredentials>> {
        let conn = self.pool.get()?;
        let credentials = conn
            .query_row(
                "SELECT id, username, created_at, password_hash FROM users WHERE username = ?",
                params![username],
                |row| {
                    Ok(AccountCredentials {
                        account: account_from_row(row)?,
                        password_hash: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(credentials)
    }

    // ===== Profile identity variants =====

    pub fn insert_profile_variant(
        &self,
        owner_id: UserId,
        draft: &ProfileVariantDraft,
    ) -> DisclosureResult<ProfileIdentityVariant> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO profile_identity_variants (owner_id, label, context, variant_value)
             VALUES (?, ?, ?, ?)",
            params![owner_id.as_i64(), &draft.label, &draft.context, &draft.variant_value],
        )?;

        Ok(ProfileIdentityVariant {
            id: ProfileVariantId(conn.last_insert_rowid()),
            owner_id,
            label: draft.label.clone(),
            context: draft.context.clone(),
            variant_value: draft.variant_value.clone(),
        })
    }

    pub fn find_profile_variant(
        &self,
        id: ProfileVariantId,
    ) -> DisclosureResult<Option<ProfileIdentityVariant>> {
        let conn = self.pool.get()?;
        let variant = conn
            .query_row(
                "SELECT id, owner_id, label, context, variant_value
                 FROM profile_identity_variants WHERE id = ?",
                params![id.as_i64()],
                profile_variant_from_row,
            )
            .optional()?;
        Ok(variant)
    }

    pub fn list_profile_variants(&self, owner_id: UserId) -> DisclosureResult<Vec<ProfileIdentityVariant>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, owner_id, label, context, variant_value
             FROM profile_identity_variants WHERE owner_id = ? ORDER BY id",
        )?;
        let variants = stmt
            .query_map(params![owner_id.as_i64()], profile_variant_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(variants)
    }

    pub fn update_profile_variant(
        &self,
        owner: &OwnerOf,
        variant: &ProfileIdentityVariant,
    ) -> DisclosureResult<()> {
        let conn = self.pool.get()?;
        let updated = conn.execute(
            "UPDATE profile_identity_variants SET label = ?, context = ?, variant_value = ?
             WHERE id = ? AND owner_id = ?",
            params![
                &variant.label,
                &variant.context,
                &variant.variant_value,
                owner.variant_id().as_i64(),
                owner.user_id().as_i64(),
            ],
        )?;
        expect_one(updated, "ProfileIdentityVariant")
    }

    /// Delete a variant; links pointing at it become null
    pub fn delete_profile_variant(&self, owner: &OwnerOf) -> DisclosureResult<()> {
        let conn = self.pool.get()?;
        let deleted = conn.execute(
            "DELETE FROM profile_identity_variants WHERE id = ? AND owner_id = ?",
            params![owner.variant_id().as_i64(), owner.user_id().as_i64()],
        )?;
        expect_one(deleted, "ProfileIdentityVariant")
    }

    // ===== Requests =====

    pub fn insert_request(
        &self,
        sender: &Account,
        receiver: &Account,
        reasoning: &str,
    ) -> DisclosureResult<Request> {
        let conn = self.pool.get()?;
        let created_at = Timestamp::now();
        conn.execute(
            "INSERT INTO requests (sender_id, receiver_id, reasoning, created_at, status)
             VALUES (?, ?, ?, ?, ?)",
            params![
                sender.id.as_i64(),
                receiver.id.as_i64(),
                reasoning,
                created_at.as_millis() as i64,
                RequestStatus::Pending.as_str(),
            ],
        )?;

        Ok(Request {
            id: RequestId(conn.last_insert_rowid()),
            sender_id: sender.id,
            receiver_id: receiver.id,
            sender_username: sender.username.clone(),
            receiver_username: receiver.username.clone(),
            reasoning: reasoning.to_string(),
            created_at,
            status: RequestStatus::Pending,
        })
    }

    pub fn find_request(&self, id: RequestId) -> DisclosureResult<Option<Request>> {
        let conn = self.pool.get()?;
        load_request(&conn, id)
    }

    /// Requests sent by `sender`, newest first
    pub fn list_sent_requests(&self, sender: UserId) -> DisclosureResult<Vec<Request>> {
        self.list_requests("r.sender_id", sender)
    }

    /// Requests addressed to `receiver`, newest first
    pub fn list_received_requests(&self, receiver: UserId) -> DisclosureResult<Vec<Request>> {
        self.list_requests("r.receiver_id", receiver)
    }

    fn list_requests(&self, party_column: &'static str, user: UserId) -> DisclosureResult<Vec<Request>> {
        let timer = Timer::new("list_requests");
        let conn = self.pool.get()?;
        let sql = format!(
            "SELECT {} WHERE {} = ? ORDER BY r.created_at DESC, r.id DESC",
            REQUEST_COLUMNS, party_column
        );
        let mut stmt = conn.prepare(&sql)?;
        let requests = stmt
            .query_map(params![user.as_i64()], request_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        timer.stop();
        Ok(requests)
    }

    pub fn update_reasoning(&self, sender: &SenderOf, reasoning: &str) -> DisclosureResult<()> {
        let conn = self.pool.get()?;
        let updated = conn.execute(
            "UPDATE requests SET reasoning = ? WHERE id = ? AND sender_id = ?",
            params![reasoning, sender.request_id().as_i64(), sender.user_id().as_i64()],
        )?;
        expect_one(updated, "Request")
    }

    /// Delete a request and, by cascade, its request variants
    pub fn delete_request(&self, sender: &SenderOf) -> DisclosureResult<()> {
        let conn = self.pool.get()?;
        let deleted = conn.execute(
            "DELETE FROM requests WHERE id = ? AND sender_id = ?",
            params![sender.request_id().as_i64(), sender.user_id().as_i64()],
        )?;
        expect_one(deleted, "Request")
    }

    /// Write a new status; entering any status other than Accepted clears every
    /// child link in the same transaction.
    ///
    /// Returns the updated request and the number of links cleared.
    pub fn transition_status(
        &self,
        receiver: &ReceiverOf,
        transition: StatusTransition,
    ) -> DisclosureResult<(Request, usize)> {
        let timer = Timer::new("transition_status");
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let target = transition.target();
        let cleared = if transition.clears_links() {
            tx.execute(
                "UPDATE request_identity_variants SET profile_link_id = NULL
                 WHERE request_id = ? AND profile_link_id IS NOT NULL",
                params![receiver.request_id().as_i64()],
            )?
        } else {
            0
        };

        let updated = tx.execute(
            "UPDATE requests SET status = ? WHERE id = ? AND receiver_id = ?",
            params![
                target.as_str(),
                receiver.request_id().as_i64(),
                receiver.user_id().as_i64(),
            ],
        )?;
        expect_one(updated, "Request")?;

        let request = load_request(&tx, receiver.request_id())?
            .ok_or(DisclosureError::not_found("Request"))?;
        tx.commit()?;
        timer.stop();

        Ok((request, cleared))
    }

    // ===== Request identity variants =====

    pub fn insert_request_variant(
        &self,
        sender: &SenderOf,
        draft: &RequestVariantDraft,
    ) -> DisclosureResult<RequestIdentityVariant> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO request_identity_variants (request_id, label, context) VALUES (?, ?, ?)",
            params![sender.request_id().as_i64(), &draft.label, &draft.context],
        )?;

        Ok(RequestIdentityVariant {
            id: RequestVariantId(conn.last_insert_rowid()),
            request_id: sender.request_id(),
            label: draft.label.clone(),
            context: draft.context.clone(),
            linked_profile_variant_id: None,
        })
    }

    pub fn list_request_variants(
        &self,
        request_id: RequestId,
    ) -> DisclosureResult<Vec<RequestIdentityVariant>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, request_id, label, context, profile_link_id
             FROM request_identity_variants WHERE request_id = ? ORDER BY id",
        )?;
        let variants = stmt
            .query_map(params![request_id.as_i64()], |row| {
                Ok(RequestIdentityVariant {
                    id: RequestVariantId(row.get(0)?),
                    request_id: RequestId(row.get(1)?),
                    label: row.get(2)?,
                    context: row.get(3)?,
                    linked_profile_variant_id: row.get::<_, Option<i64>>(4)?.map(ProfileVariantId),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(variants)
    }

    pub fn find_request_variant(
        &self,
        id: RequestVariantId,
    ) -> DisclosureResult<Option<RequestVariantRecord>> {
        let conn = self.pool.get()?;
        load_request_variant(&conn, id)
    }

    pub fn update_request_variant(
        &self,
        sender: &SenderOf,
        id: RequestVariantId,
        patch: &RequestVariantPatch,
    ) -> DisclosureResult<()> {
        let conn = self.pool.get()?;
        let updated = conn.execute(
            "UPDATE request_identity_variants
             SET label = COALESCE(?, label), context = COALESCE(?, context)
             WHERE id = ? AND request_id = ?",
            params![&patch.label, &patch.context, id.as_i64(), sender.request_id().as_i64()],
        )?;
        expect_one(updated, "RequestIdentityVariant")
    }

    pub fn delete_request_variant(&self, sender: &SenderOf, id: RequestVariantId) -> DisclosureResult<()> {
        let conn = self.pool.get()?;
        let deleted = conn.execute(
            "DELETE FROM request_identity_variants WHERE id = ? AND request_id = ?",
            params![id.as_i64(), sender.request_id().as_i64()],
        )?;
        expect_one(deleted, "RequestIdentityVariant")
    }

    /// Set or clear a link.
    ///
    /// Status and ownership are re-checked inside the transaction, so a deny that
    /// lands between the guard check and this write still wins.
    pub fn set_link(
        &self,
        receiver: &ReceiverOf,
        id: RequestVariantId,
        target: Option<&OwnerOf>,
    ) -> DisclosureResult<RequestVariantRecord> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let status: Option<String> = tx
            .query_row(
                "SELECT status FROM requests WHERE id = ? AND receiver_id = ?",
                params![receiver.request_id().as_i64(), receiver.user_id().as_i64()],
                |row| row.get(0),
            )
            .optional()?;
        let status: RequestStatus = status
            .ok_or(DisclosureError::not_found("Request"))?
            .parse()?;
        if !status.permits_disclosure() {
            return Err(DisclosureError::forbidden("request is not accepted"));
        }

        // The target row may have been deleted or never belonged to the receiver.
        if let Some(owner) = target {
            let owner_id: Option<i64> = tx
                .query_row(
                    "SELECT owner_id FROM profile_identity_variants WHERE id = ?",
                    params![owner.variant_id().as_i64()],
                    |row| row.get(0),
                )
                .optional()?;
            if owner.user_id() != receiver.user_id()
                || owner_id != Some(receiver.user_id().as_i64())
            {
                return Err(DisclosureError::not_found("ProfileIdentityVariant"));
            }
        }

        let updated = tx.execute(
            "UPDATE request_identity_variants SET profile_link_id = ?
             WHERE id = ? AND request_id = ?",
            params![
                target.map(|owner| owner.variant_id().as_i64()),
                id.as_i64(),
                receiver.request_id().as_i64(),
            ],
        )?;
        expect_one(updated, "RequestIdentityVariant")?;

        let record = load_request_variant(&tx, id)?
            .ok_or(DisclosureError::not_found("RequestIdentityVariant"))?;
        tx.commit()?;

        Ok(record)
    }

    /// Number of links currently set under a request
    pub fn count_links(&self, request_id: RequestId) -> DisclosureResult<usize> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM request_identity_variants
             WHERE request_id = ? AND profile_link_id IS NOT NULL",
            params![request_id.as_i64()],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as usize)
    }
}

fn expect_one(changed: usize, resource: &'static str) -> DisclosureResult<()> {
    if changed == 0 {
        Err(DisclosureError::not_found(resource))
    } else {
        Ok(())
    }
}

fn load_request(conn: &Connection, id: RequestId) -> DisclosureResult<Option<Request>> {
    let sql = format!("SELECT {} WHERE r.id = ?", REQUEST_COLUMNS);
    let request = conn
        .query_row(&sql, params![id.as_i64()], request_from_row)
        .optional()?;
    Ok(request)
}

fn load_request_variant(
    conn: &Connection,
    id: RequestVariantId,
) -> DisclosureResult<Option<RequestVariantRecord>> {
    let sql = format!("SELECT {} WHERE riv.id = ?", REQUEST_VARIANT_COLUMNS);
    let record = conn
        .query_row(&sql, params![id.as_i64()], |row| {
            Ok(RequestVariantRecord {
                variant: RequestIdentityVariant {
                    id: RequestVariantId(row.get(0)?),
                    request_id: RequestId(row.get(1)?),
                    label: row.get(2)?,
                    context: row.get(3)?,
                    linked_profile_variant_id: row.get::<_, Option<i64>>(4)?.map(ProfileVariantId),
                },
                request_status: status_from_row(row, 5)?,
                linked_value: row.get(6)?,
            })
        })
        .optional()?;
    Ok(record)
}

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: UserId(row.get(0)?),
        username: row.get(1)?,
        created_at: Timestamp::from_millis(row.get::<_, i64>(2)?.max(0) as u64),
    })
}

fn profile_variant_from_row(row: &Row<'_>) -> rusqlite::Result<ProfileIdentityVariant> {
    Ok(ProfileIdentityVariant {
        id: ProfileVariantId(row.get(0)?),
        owner_id: UserId(row.get(1)?),
        label: row.get(2)?,
        context: row.get(3)?,
        variant_value: row.get(4)?,
    })
}

fn request_from_row(row: &Row<'_>) -> rusqlite::Result<Request> {
    Ok(Request {
        id: RequestId(row.get(0)?),
        sender_id: UserId(row.get(1)?),
        receiver_id: UserId(row.get(2)?),
        sender_username: row.get(3)?,
        receiver_username: row.get(4)?,
        reasoning: row.get(5)?,
        created_at: Timestamp::from_millis(row.get::<_, i64>(6)?.max(0) as u64),
        status: status_from_row(row, 7)?,
    })
}

fn status_from_row(row: &Row<'_>, idx: usize) -> rusqlite::Result<RequestStatus> {
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e: DisclosureError| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
