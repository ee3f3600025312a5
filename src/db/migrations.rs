use anyhow::{bail, Context, Result};
use rusqlite::Connection;

/// Schema scripts in order; `user_version` counts how many have run.
const MIGRATIONS: &[&str] = &[include_str!("schemas/schema_v1.sql")];

fn schema_version(conn: &Connection) -> Result<usize> {
    let version: i64 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .context("failed to read user_version pragma")?;
    usize::try_from(version).context("user_version is negative")
}

pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let applied = schema_version(conn)?;
    if applied > MIGRATIONS.len() {
        bail!(
            "storage schema version {applied} is newer than this build supports ({})",
            MIGRATIONS.len()
        );
    }
    if applied == MIGRATIONS.len() {
        return Ok(());
    }

    let tx = conn
        .transaction()
        .context("failed to open migration transaction")?;
    for (index, script) in MIGRATIONS.iter().enumerate().skip(applied) {
        tx.execute_batch(script)
            .with_context(|| format!("migration to version {} failed", index + 1))?;
    }
    tx.pragma_update(None, "user_version", MIGRATIONS.len() as i64)
        .context("failed to update user_version pragma")?;
    tx.commit().context("failed to commit migrations")
}
