use std::io::Write;

use chrono::{DateTime, Local};
use rusqlite::{params, Connection, Result};
use time_humanize::HumanTime;

use crate::store::{self, MigrationOutcome, StoreError, StoreLocation};

/// A single finished game on the highscore list
#[derive(Debug, Clone, PartialEq)]
pub struct Highscore {
    pub player: String,
    pub game_mode: String,
    pub score: i64,
    pub darts: u32,
    pub played_at: DateTime<Local>,
}

impl Highscore {
    /// "3 hours ago" style age of the entry
    pub fn played_ago(&self) -> String {
        let elapsed = Local::now().signed_duration_since(self.played_at);
        match elapsed.to_std() {
            Ok(d) => HumanTime::from_seconds(-(d.as_secs() as i64)).to_string(),
            Err(_) => "just now".to_string(),
        }
    }
}

/// Database manager for the highscore list
#[derive(Debug)]
pub struct HighscoreDb {
    conn: Connection,
    outcome: Option<MigrationOutcome>,
}

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS highscores (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        player TEXT NOT NULL,
        game_mode TEXT NOT NULL,
        score INTEGER NOT NULL,
        darts INTEGER NOT NULL,
        played_at TEXT NOT NULL,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP
    );
    CREATE INDEX IF NOT EXISTS idx_highscores_mode_score ON highscores(game_mode, score);
"#;

const CSV_HEADER: [&str; 5] = ["player", "game_mode", "score", "darts", "played_at"];

impl HighscoreDb {
    /// Locate (migrating if needed), open and initialize the highscore store
    pub fn open(location: &StoreLocation) -> std::result::Result<Self, StoreError> {
        let opened = store::open_store(location)?;
        let mut db = Self::from_connection(opened.connection).map_err(|source| {
            StoreError::ConnectionFailed {
                path: opened.path.clone(),
                source,
            }
        })?;
        db.outcome = Some(opened.outcome);
        Ok(db)
    }

    /// Wrap an already opened connection, creating tables if needed
    pub fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(HighscoreDb {
            conn,
            outcome: None,
        })
    }

    /// How the store file got to its place on this startup, if opened from disk
    pub fn migration_outcome(&self) -> Option<MigrationOutcome> {
        self.outcome
    }

    pub fn record(&self, entry: &Highscore) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO highscores (player, game_mode, score, darts, played_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                entry.player,
                entry.game_mode,
                entry.score,
                entry.darts,
                entry.played_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    /// Record multiple entries in one transaction
    pub fn record_batch(&mut self, entries: &[Highscore]) -> Result<()> {
        let tx = self.conn.transaction()?;

        for entry in entries {
            tx.execute(
                r#"
                INSERT INTO highscores (player, game_mode, score, darts, played_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    entry.player,
                    entry.game_mode,
                    entry.score,
                    entry.darts,
                    entry.played_at.to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Best entries first: highest score, then fewest darts, then oldest
    pub fn top(&self, game_mode: Option<&str>, limit: usize) -> Result<Vec<Highscore>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT player, game_mode, score, darts, played_at
            FROM highscores
            WHERE ?1 IS NULL OR game_mode = ?1
            ORDER BY score DESC, darts ASC, played_at ASC
            LIMIT ?2
            "#,
        )?;

        let rows = stmt.query_map(params![game_mode, limit as i64], |row| {
            let played_at_str: String = row.get(4)?;
            let played_at = DateTime::parse_from_rfc3339(&played_at_str)
                .map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        4,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?
                .with_timezone(&Local);

            Ok(Highscore {
                player: row.get(0)?,
                game_mode: row.get(1)?,
                score: row.get(2)?,
                darts: row.get(3)?,
                played_at,
            })
        })?;

        rows.collect()
    }

    /// Distinct game modes that have at least one entry
    pub fn game_modes(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT game_mode FROM highscores ORDER BY game_mode")?;
        let modes = stmt.query_map([], |row| row.get(0))?;
        modes.collect()
    }

    pub fn count(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM highscores", [], |row| row.get(0))
    }

    /// Clear the whole list
    pub fn clear(&self) -> Result<()> {
        self.conn.execute("DELETE FROM highscores", [])?;
        Ok(())
    }

    /// Write the list as CSV, best entries first
    pub fn export_csv<W: Write>(
        &self,
        writer: W,
        game_mode: Option<&str>,
    ) -> std::result::Result<usize, csv::Error> {
        let entries = self
            .top(game_mode, i64::MAX as usize)
            .map_err(|e| std::io::Error::other(e.to_string()))?;

        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(CSV_HEADER)?;
        for entry in &entries {
            wtr.write_record([
                entry.player.clone(),
                entry.game_mode.clone(),
                entry.score.to_string(),
                entry.darts.to_string(),
                entry.played_at.to_rfc3339(),
            ])?;
        }
        wtr.flush()?;

        Ok(entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn create_test_db() -> HighscoreDb {
        // In-memory database keeps the unit tests off the filesystem
        let conn = Connection::open_in_memory().unwrap();
        HighscoreDb::from_connection(conn).unwrap()
    }

    fn entry(player: &str, mode: &str, score: i64, darts: u32) -> Highscore {
        Highscore {
            player: player.to_string(),
            game_mode: mode.to_string(),
            score,
            darts,
            played_at: Local::now(),
        }
    }

    #[test]
    fn test_record_and_top() {
        let db = create_test_db();
        db.record(&entry("anna", "501", 501, 15)).unwrap();

        let top = db.top(None, 10).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].player, "anna");
        assert_eq!(top[0].score, 501);
        assert_eq!(top[0].darts, 15);
    }

    #[test]
    fn test_top_ordering() {
        let db = create_test_db();
        db.record(&entry("low", "501", 100, 9)).unwrap();
        db.record(&entry("slow", "501", 501, 30)).unwrap();
        db.record(&entry("fast", "501", 501, 12)).unwrap();

        let names: Vec<String> = db
            .top(None, 10)
            .unwrap()
            .into_iter()
            .map(|h| h.player)
            .collect();
        assert_eq!(names, vec!["fast", "slow", "low"]);
    }

    #[test]
    fn test_top_ties_prefer_older_entry() {
        let db = create_test_db();
        let mut newer = entry("newer", "301", 301, 10);
        let mut older = entry("older", "301", 301, 10);
        older.played_at = newer.played_at - Duration::hours(1);
        newer.played_at = older.played_at + Duration::hours(2);
        db.record(&newer).unwrap();
        db.record(&older).unwrap();

        let top = db.top(Some("301"), 10).unwrap();
        assert_eq!(top[0].player, "older");
    }

    #[test]
    fn test_top_filters_by_mode_and_limit() {
        let db = create_test_db();
        for i in 0..5 {
            db.record(&entry("p", "301", 100 + i, 10)).unwrap();
        }
        db.record(&entry("q", "cricket", 999, 20)).unwrap();

        let top = db.top(Some("301"), 3).unwrap();
        assert_eq!(top.len(), 3);
        assert!(top.iter().all(|h| h.game_mode == "301"));
        assert_eq!(top[0].score, 104);

        assert_eq!(db.top(Some("cricket"), 10).unwrap().len(), 1);
        assert_eq!(db.top(None, 100).unwrap().len(), 6);
    }

    #[test]
    fn test_game_modes() {
        let db = create_test_db();
        db.record(&entry("a", "501", 1, 1)).unwrap();
        db.record(&entry("b", "301", 1, 1)).unwrap();
        db.record(&entry("c", "501", 1, 1)).unwrap();

        assert_eq!(db.game_modes().unwrap(), vec!["301", "501"]);
    }

    #[test]
    fn test_batch_record_and_clear() {
        let mut db = create_test_db();
        let entries = vec![
            entry("a", "501", 10, 3),
            entry("b", "501", 20, 3),
            entry("c", "501", 30, 3),
        ];
        db.record_batch(&entries).unwrap();
        assert_eq!(db.count().unwrap(), 3);

        db.clear().unwrap();
        assert_eq!(db.count().unwrap(), 0);
    }

    #[test]
    fn test_export_csv() {
        let db = create_test_db();
        db.record(&entry("anna", "501", 501, 15)).unwrap();
        db.record(&entry("ben, jr", "501", 450, 21)).unwrap();

        let mut out = Vec::new();
        let written = db.export_csv(&mut out, None).unwrap();
        assert_eq!(written, 2);

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("player,game_mode,score,darts,played_at"));
        assert!(lines.next().unwrap().starts_with("anna,501,501,15,"));
        assert!(lines.next().unwrap().starts_with("\"ben, jr\",501,450,21,"));
    }

    #[test]
    fn test_played_ago() {
        let mut h = entry("a", "501", 1, 1);
        h.played_at = Local::now() - Duration::hours(3);
        assert!(h.played_ago().contains("ago"));
    }

    #[test]
    fn test_from_connection_has_no_outcome() {
        let db = create_test_db();
        assert_eq!(db.migration_outcome(), None);
    }
}
