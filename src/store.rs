use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};

use crate::records::{ChatRow, MatchDetailRow, MatchRow, PlayerRow};

const INSERT_MATCH: &str = "INSERT INTO matches(id, radiant_won, is_pro) VALUES (?1, ?2, ?3)";
const INSERT_PLAYER: &str =
    "INSERT INTO players(id, name, mmr, country, is_pro) VALUES (?1, ?2, ?3, ?4, ?5)";
const INSERT_MATCH_DETAIL: &str =
    "INSERT INTO match_details(match_id, player_id, is_radiant) VALUES (?1, ?2, ?3)";
const INSERT_CHAT: &str =
    "INSERT INTO chat(match_id, player_id, message, time) VALUES (?1, ?2, ?3, ?4)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Matches,
    Players,
    MatchDetails,
    Chat,
}

impl Table {
    pub fn as_str(self) -> &'static str {
        match self {
            Table::Matches => "matches",
            Table::Players => "players",
            Table::MatchDetails => "match_details",
            Table::Chat => "chat",
        }
    }
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).ok();
    }
    Connection::open(path)
        .with_context(|| format!("open sqlite db {}", path.display()))
}

/// The database is normally provisioned ahead of time; this only fills in
/// tables that are missing. Foreign keys are switched on for the connection,
/// so detail and chat rows need their parent match and player rows.
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA foreign_keys = ON;
        CREATE TABLE IF NOT EXISTS matches (
            id INTEGER PRIMARY KEY,
            radiant_won INTEGER NOT NULL,
            is_pro INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS players (
            id INTEGER PRIMARY KEY,
            name TEXT NULL,
            mmr INTEGER NULL,
            country TEXT NULL,
            is_pro INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS match_details (
            match_id INTEGER NOT NULL REFERENCES matches(id),
            player_id INTEGER NOT NULL REFERENCES players(id),
            is_radiant INTEGER NOT NULL,
            PRIMARY KEY (match_id, player_id)
        );
        CREATE TABLE IF NOT EXISTS chat (
            match_id INTEGER NOT NULL REFERENCES matches(id),
            player_id INTEGER NOT NULL REFERENCES players(id),
            message TEXT NOT NULL,
            time INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_chat_match ON chat(match_id);
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

/// Write handle for one run. Every insert is staged inside a single
/// transaction opened by [`Store::begin`]; nothing is durable until
/// [`Store::commit`]. Dropping the store without committing discards the run.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn begin(conn: Connection) -> Result<Self> {
        conn.execute_batch("BEGIN")
            .context("begin ingest transaction")?;
        Ok(Self { conn })
    }

    pub fn commit(self) -> Result<()> {
        self.conn
            .execute_batch("COMMIT")
            .context("commit ingest transaction")?;
        self.conn
            .close()
            .map_err(|(_, err)| err)
            .context("close sqlite db")?;
        Ok(())
    }

    pub fn insert_match(&mut self, row: &MatchRow) -> Result<usize> {
        self.conn
            .prepare_cached(INSERT_MATCH)
            .context("prepare match insert")?
            .execute(params![row.id, row.radiant_won, row.is_pro])
            .with_context(|| format!("insert match {}", row.id))
    }

    pub fn insert_player(&mut self, row: &PlayerRow) -> Result<usize> {
        self.conn
            .prepare_cached(INSERT_PLAYER)
            .context("prepare player insert")?
            .execute(params![row.id, row.name, row.mmr, row.country, row.is_pro])
            .with_context(|| format!("insert player {}", row.id))
    }

    /// Stops at the first failing row; rows before it stay staged.
    pub fn insert_match_details(&mut self, rows: &[MatchDetailRow]) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        let mut stmt = self
            .conn
            .prepare_cached(INSERT_MATCH_DETAIL)
            .context("prepare match_details insert")?;
        let mut written = 0;
        for row in rows {
            written += stmt
                .execute(params![row.match_id, row.player_id, row.is_radiant])
                .with_context(|| {
                    format!(
                        "insert match_details (match {}, player {})",
                        row.match_id, row.player_id
                    )
                })?;
        }
        Ok(written)
    }

    /// Stops at the first failing row; rows before it stay staged.
    pub fn insert_chat(&mut self, rows: &[ChatRow]) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        let mut stmt = self
            .conn
            .prepare_cached(INSERT_CHAT)
            .context("prepare chat insert")?;
        let mut written = 0;
        for row in rows {
            written += stmt
                .execute(params![row.match_id, row.player_id, row.message, row.time])
                .with_context(|| format!("insert chat for match {}", row.match_id))?;
        }
        Ok(written)
    }

    pub fn row_count(&self, table: Table) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", table.as_str());
        self.conn
            .query_row(&sql, [], |row| row.get::<_, i64>(0))
            .with_context(|| format!("count rows in {}", table.as_str()))
    }

    pub fn load_match(&self, match_id: i64) -> Result<Option<MatchRow>> {
        self.conn
            .query_row(
                "SELECT id, radiant_won, is_pro FROM matches WHERE id = ?1",
                params![match_id],
                |row| {
                    Ok(MatchRow {
                        id: row.get(0)?,
                        radiant_won: row.get(1)?,
                        is_pro: row.get(2)?,
                    })
                },
            )
            .optional()
            .with_context(|| format!("load match {match_id}"))
    }

    pub fn load_player(&self, account_id: i64) -> Result<Option<PlayerRow>> {
        self.conn
            .query_row(
                "SELECT id, name, mmr, country, is_pro FROM players WHERE id = ?1",
                params![account_id],
                |row| {
                    Ok(PlayerRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        mmr: row.get(2)?,
                        country: row.get(3)?,
                        is_pro: row.get(4)?,
                    })
                },
            )
            .optional()
            .with_context(|| format!("load player {account_id}"))
    }

    pub fn load_match_details(&self, match_id: i64) -> Result<Vec<MatchDetailRow>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT match_id, player_id, is_radiant FROM match_details
                 WHERE match_id = ?1 ORDER BY player_id ASC",
            )
            .context("prepare load match_details query")?;
        let rows = stmt
            .query_map(params![match_id], |row| {
                Ok(MatchDetailRow {
                    match_id: row.get(0)?,
                    player_id: row.get(1)?,
                    is_radiant: row.get(2)?,
                })
            })
            .context("query load match_details")?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.context("decode match_details row")?);
        }
        Ok(out)
    }

    pub fn load_chat(&self, match_id: i64) -> Result<Vec<ChatRow>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT match_id, player_id, message, time FROM chat
                 WHERE match_id = ?1 ORDER BY time ASC, rowid ASC",
            )
            .context("prepare load chat query")?;
        let rows = stmt
            .query_map(params![match_id], |row| {
                Ok(ChatRow {
                    match_id: row.get(0)?,
                    player_id: row.get(1)?,
                    message: row.get(2)?,
                    time: row.get(3)?,
                })
            })
            .context("query load chat")?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.context("decode chat row")?);
        }
        Ok(out)
    }
}
