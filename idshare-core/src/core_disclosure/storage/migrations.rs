//! Database migrations for the disclosure schema
//!
//! Each migration is applied atomically and tracked in the
//! disclosure_schema_version table.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension};
use std::time::{SystemTime, UNIX_EPOCH};

/// Current schema version for core_disclosure
pub const CURRENT_DISCLOSURE_SCHEMA_VERSION: i32 = 2;

/// Migration descriptor
pub struct Migration {
    pub version: i32,
    pub description: &'static str,
    pub up_sql: &'static str,
    pub down_sql: Option<&'static str>,
}

/// All available migrations in order
pub fn get_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "Users, identity variants and requests",
            up_sql: r#"
                CREATE TABLE IF NOT EXISTS users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    username TEXT NOT NULL UNIQUE,
                    password_hash TEXT NOT NULL,
                    created_at INTEGER NOT NULL
                );

                -- Facts a user keeps about themselves
                CREATE TABLE IF NOT EXISTS profile_identity_variants (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    owner_id INTEGER NOT NULL,
                    label TEXT NOT NULL,
                    context TEXT NOT NULL DEFAULT '',
                    variant_value TEXT NOT NULL,
                    FOREIGN KEY (owner_id) REFERENCES users(id) ON DELETE CASCADE
                );

                CREATE INDEX IF NOT EXISTS idx_profile_variants_owner
                    ON profile_identity_variants(owner_id);

                CREATE TABLE IF NOT EXISTS requests (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    sender_id INTEGER NOT NULL,
                    receiver_id INTEGER NOT NULL,
                    reasoning TEXT NOT NULL DEFAULT '',
                    created_at INTEGER NOT NULL,
                    status TEXT NOT NULL DEFAULT 'pending'
                        CHECK(status IN ('pending', 'accepted', 'denied')),
                    FOREIGN KEY (sender_id) REFERENCES users(id) ON DELETE CASCADE,
                    FOREIGN KEY (receiver_id) REFERENCES users(id) ON DELETE CASCADE
                );

                CREATE INDEX IF NOT EXISTS idx_requests_sender ON requests(sender_id, created_at);
                CREATE INDEX IF NOT EXISTS idx_requests_receiver ON requests(receiver_id, created_at);

                -- Field asks on a request; profile_link_id is the receiver's answer
                CREATE TABLE IF NOT EXISTS request_identity_variants (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    request_id INTEGER NOT NULL,
                    label TEXT NOT NULL,
                    context TEXT NOT NULL DEFAULT '',
                    profile_link_id INTEGER,
                    FOREIGN KEY (request_id) REFERENCES requests(id) ON DELETE CASCADE,
                    FOREIGN KEY (profile_link_id)
                        REFERENCES profile_identity_variants(id) ON DELETE SET NULL
                );

                CREATE INDEX IF NOT EXISTS idx_request_variants_request
                    ON request_identity_variants(request_id);
                CREATE INDEX IF NOT EXISTS idx_request_variants_link
                    ON request_identity_variants(profile_link_id)
                    WHERE profile_link_id IS NOT NULL;
            "#,
            down_sql: Some(
                r#"
                DROP INDEX IF EXISTS idx_request_variants_link;
                DROP INDEX IF EXISTS idx_request_variants_request;
                DROP TABLE IF EXISTS request_identity_variants;
                DROP INDEX IF EXISTS idx_requests_receiver;
                DROP INDEX IF EXISTS idx_requests_sender;
                DROP TABLE IF EXISTS requests;
                DROP INDEX IF EXISTS idx_profile_variants_owner;
                DROP TABLE IF EXISTS profile_identity_variants;
                DROP TABLE IF EXISTS users;
            "#,
            ),
        },
        Migration {
            version: 2,
            description: "Request invariants enforced in the database",
            up_sql: r#"
                -- Parties are fixed at creation
                CREATE TRIGGER IF NOT EXISTS requests_parties_immutable
                BEFORE UPDATE OF sender_id, receiver_id ON requests
                WHEN NEW.sender_id != OLD.sender_id OR NEW.receiver_id != OLD.receiver_id
                BEGIN
                    SELECT RAISE(ABORT, 'request parties are immutable');
                END;

                -- Leaving Accepted wipes every link, whatever issued the update
                CREATE TRIGGER IF NOT EXISTS requests_clear_links_unless_accepted
                AFTER UPDATE OF status ON requests
                WHEN NEW.status != 'accepted'
                BEGIN
                    UPDATE request_identity_variants
                    SET profile_link_id = NULL
                    WHERE request_id = NEW.id AND profile_link_id IS NOT NULL;
                END;

                CREATE TRIGGER IF NOT EXISTS request_variants_link_requires_accepted
                BEFORE UPDATE OF profile_link_id ON request_identity_variants
                WHEN NEW.profile_link_id IS NOT NULL
                    AND (SELECT status FROM requests WHERE id = NEW.request_id) != 'accepted'
                BEGIN
                    SELECT RAISE(ABORT, 'links require an accepted request');
                END;

                -- The linked variant must belong to the request's receiver
                CREATE TRIGGER IF NOT EXISTS request_variants_link_owned_by_receiver
                BEFORE UPDATE OF profile_link_id ON request_identity_variants
                WHEN NEW.profile_link_id IS NOT NULL
                    AND (SELECT owner_id FROM profile_identity_variants WHERE id = NEW.profile_link_id)
                        IS NOT (SELECT receiver_id FROM requests WHERE id = NEW.request_id)
                BEGIN
                    SELECT RAISE(ABORT, 'linked variant must belong to the receiver');
                END;
            "#,
            down_sql: Some(
                r#"
                DROP TRIGGER IF EXISTS request_variants_link_owned_by_receiver;
                DROP TRIGGER IF EXISTS request_variants_link_requires_accepted;
                DROP TRIGGER IF EXISTS requests_clear_links_unless_accepted;
                DROP TRIGGER IF EXISTS requests_parties_immutable;
            "#,
            ),
        },
    ]
}

fn ensure_version_table(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS disclosure_schema_version (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;
    Ok(())
}

/// Get current schema version from database
pub fn current_version(conn: &Connection) -> Result<i32, rusqlite::Error> {
    ensure_version_table(conn)?;

    let version: Option<i32> = conn
        .query_row(
            "SELECT version FROM disclosure_schema_version ORDER BY version DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?;

    Ok(version.unwrap_or(0))
}

/// Run all pending migrations on one connection
pub fn migrate_connection(conn: &Connection) -> Result<(), rusqlite::Error> {
    let current = current_version(conn)?;

    for migration in get_migrations().into_iter().filter(|m| m.version > current) {
        let tx = conn.unchecked_transaction()?;

        tx.execute_batch(migration.up_sql)?;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);

        tx.execute(
            "INSERT INTO disclosure_schema_version (version, applied_at) VALUES (?, ?)",
            params![migration.version, now],
        )?;

        tx.commit()?;

        tracing::info!(
            version = migration.version,
            description = migration.description,
            "Applied migration"
        );
    }

    Ok(())
}

/// Run all pending migrations
pub fn migrate(pool: &Pool<SqliteConnectionManager>) -> Result<(), crate::core_disclosure::DisclosureError> {
    let conn = pool.get()?;
    migrate_connection(&conn)?;
    Ok(())
}

/// Roll back to `target` by applying down migrations newest first
pub fn rollback_to(conn: &Connection, target: i32) -> Result<(), rusqlite::Error> {
    let current = current_version(conn)?;

    let mut migrations: Vec<_> = get_migrations()
        .into_iter()
        .filter(|m| m.version > target && m.version <= current)
        .collect();
    migrations.sort_by(|a, b| b.version.cmp(&a.version));

    for migration in migrations {
        let Some(down_sql) = migration.down_sql else {
            tracing::warn!(version = migration.version, "Migration has no down script, stopping");
            break;
        };

        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(down_sql)?;
        tx.execute(
            "DELETE FROM disclosure_schema_version WHERE version = ?",
            params![migration.version],
        )?;
        tx.commit()?;

        tracing::info!(version = migration.version, "Rolled back migration");
    }

    Ok(())
}

/// Get the latest migration version available
pub fn get_latest_version() -> i32 {
    get_migrations().iter().map(|m| m.version).max().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        conn
    }

    fn seed(conn: &Connection) {
        conn.execute_batch(
            "INSERT INTO users (id, username, password_hash, created_at) VALUES (1, 'john', 'x', 0);
             INSERT INTO users (id, username, password_hash, created_at) VALUES (2, 'mary', 'x', 0);
             INSERT INTO profile_identity_variants (id, owner_id, label, variant_value)
                 VALUES (1, 2, 'first name', 'Michal');
             INSERT INTO requests (id, sender_id, receiver_id, created_at, status)
                 VALUES (1, 1, 2, 0, 'accepted');
             INSERT INTO request_identity_variants (id, request_id, label) VALUES (1, 1, 'first name');",
        )
        .unwrap();
    }

    fn link_of(conn: &Connection) -> Option<i64> {
        conn.query_row(
            "SELECT profile_link_id FROM request_identity_variants WHERE id = 1",
            [],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn test_initial_migration() {
        let conn = setup();
        migrate_connection(&conn).expect("Migration failed");

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert!(tables.contains(&"users".to_string()));
        assert!(tables.contains(&"profile_identity_variants".to_string()));
        assert!(tables.contains(&"requests".to_string()));
        assert!(tables.contains(&"request_identity_variants".to_string()));
    }

    #[test]
    fn test_idempotent_migrations() {
        let conn = setup();
        migrate_connection(&conn).expect("First migration failed");
        migrate_connection(&conn).expect("Second migration failed");

        assert_eq!(current_version(&conn).unwrap(), CURRENT_DISCLOSURE_SCHEMA_VERSION);
        assert_eq!(get_latest_version(), CURRENT_DISCLOSURE_SCHEMA_VERSION);
    }

    #[test]
    fn test_status_check_constraint() {
        let conn = setup();
        migrate_connection(&conn).unwrap();
        seed(&conn);

        let result = conn.execute("UPDATE requests SET status = 'archived' WHERE id = 1", []);
        assert!(result.is_err());
    }

    #[test]
    fn test_parties_are_immutable() {
        let conn = setup();
        migrate_connection(&conn).unwrap();
        seed(&conn);

        let result = conn.execute("UPDATE requests SET sender_id = 2 WHERE id = 1", []);
        assert!(result.is_err());
    }

    #[test]
    fn test_leaving_accepted_clears_links() {
        let conn = setup();
        migrate_connection(&conn).unwrap();
        seed(&conn);

        conn.execute("UPDATE request_identity_variants SET profile_link_id = 1 WHERE id = 1", [])
            .unwrap();
        assert_eq!(link_of(&conn), Some(1));

        conn.execute("UPDATE requests SET status = 'denied' WHERE id = 1", []).unwrap();
        assert_eq!(link_of(&conn), None);
    }

    #[test]
    fn test_link_rejected_unless_accepted() {
        let conn = setup();
        migrate_connection(&conn).unwrap();
        seed(&conn);

        conn.execute("UPDATE requests SET status = 'pending' WHERE id = 1", []).unwrap();
        let result =
            conn.execute("UPDATE request_identity_variants SET profile_link_id = 1 WHERE id = 1", []);
        assert!(result.is_err());
    }

    #[test]
    fn test_link_rejected_for_foreign_variant() {
        let conn = setup();
        migrate_connection(&conn).unwrap();
        seed(&conn);

        conn.execute(
            "INSERT INTO profile_identity_variants (id, owner_id, label, variant_value)
             VALUES (2, 1, 'first name', 'John')",
            [],
        )
        .unwrap();
        let result =
            conn.execute("UPDATE request_identity_variants SET profile_link_id = 2 WHERE id = 1", []);
        assert!(result.is_err());
    }

    #[test]
    fn test_cascades() {
        let conn = setup();
        migrate_connection(&conn).unwrap();
        seed(&conn);

        conn.execute("UPDATE request_identity_variants SET profile_link_id = 1 WHERE id = 1", [])
            .unwrap();
        conn.execute("DELETE FROM profile_identity_variants WHERE id = 1", []).unwrap();
        assert_eq!(link_of(&conn), None);

        conn.execute("DELETE FROM requests WHERE id = 1", []).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM request_identity_variants", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_rollback() {
        let conn = setup();
        migrate_connection(&conn).unwrap();

        rollback_to(&conn, 0).unwrap();
        assert_eq!(current_version(&conn).unwrap(), 0);

        let remaining: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='requests'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(remaining, 0);
    }
}
