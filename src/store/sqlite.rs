use std::{path::PathBuf, sync::Mutex};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use rusqlite::{params, Connection, OptionalExtension};

use super::{migrations::run_migrations, ClaimBackend};

fn parse_datetime(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| anyhow!("invalid claimed_at '{value}': {err}"))
}

pub struct SqliteClaimBackend {
    conn: Mutex<Connection>,
}

impl SqliteClaimBackend {
    pub fn open(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create store directory {}", parent.display())
            })?;
        }

        let mut conn = Connection::open(&path)
            .with_context(|| format!("failed to open SQLite store {}", path.display()))?;
        if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
            error!("Failed to enable WAL mode: {err}");
        }
        run_migrations(&mut conn).context("failed to run outcome store migrations")?;

        info!("Outcome store initialized at {}", path.display());

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T>(&self, task: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let guard = self
            .conn
            .lock()
            .map_err(|_| anyhow!("outcome store connection poisoned"))?;
        task(&guard)
    }
}

impl ClaimBackend for SqliteClaimBackend {
    fn load(&self, widget_id: &str) -> Result<Option<DateTime<Utc>>> {
        self.with_conn(|conn| {
            let row: Option<(i64, Option<String>)> = conn
                .query_row(
                    "SELECT claimed, claimed_at FROM widget_outcomes WHERE widget_id = ?1",
                    params![widget_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()
                .context("failed to read widget outcome")?;

            match row {
                Some((claimed, claimed_at)) if claimed != 0 => {
                    let at = match claimed_at.as_deref().map(parse_datetime) {
                        Some(Ok(at)) => at,
                        Some(Err(err)) => {
                            warn!("widget {widget_id} is claimed but {err:#}, using now");
                            Utc::now()
                        }
                        None => Utc::now(),
                    };
                    Ok(Some(at))
                }
                _ => Ok(None),
            }
        })
    }

    fn save(&self, widget_id: &str, claimed_at: DateTime<Utc>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO widget_outcomes (widget_id, claimed, claimed_at)
                 VALUES (?1, 1, ?2)
                 ON CONFLICT(widget_id) DO UPDATE
                 SET claimed = 1,
                     claimed_at = COALESCE(widget_outcomes.claimed_at, excluded.claimed_at)",
                params![widget_id, claimed_at.to_rfc3339()],
            )
            .context("failed to persist widget outcome")?;
            Ok(())
        })
    }
}
