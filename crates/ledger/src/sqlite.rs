//! SQLite-backed ledger.
//!
//! Three tables:
//! - `actions`: append-only history of posts and replies
//! - `mentions`: one row per inbound mention, keyed by its platform id
//! - `bot_state`: small key/value store (e.g. the last seen mention id)
//!
//! Timestamps are RFC 3339 UTC text with a fixed width, so lexical order is
//! chronological order and "today" comparisons can run inside SQLite.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use murmur_core::error::LedgerError;
use murmur_core::ledger::{
    ActionKind, Disposition, Ledger, LedgerStats, MentionOutcome, NewAction, NO_ACTIONS, NO_CONVERSATIONS,
    NO_REPLIES,
};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

/// Ledger persisted in a SQLite database.
pub struct SqliteLedger {
    pool: SqlitePool,
}

fn ts(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.with_timezone(&Utc))
}

/// Start of the current UTC calendar day.
fn today_start() -> String {
    let now = Utc::now();
    let midnight = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .unwrap_or(now);
    ts(midnight)
}

fn yes_no(b: bool) -> &'static str {
    if b { "yes" } else { "no" }
}

fn query_err(context: &str) -> impl Fn(sqlx::Error) -> LedgerError + '_ {
    move |e| LedgerError::QueryFailed(format!("{context}: {e}"))
}

impl SqliteLedger {
    /// Open (or create) the ledger at `path`.
    ///
    /// Pass `":memory:"` for an ephemeral database. In-memory databases are
    /// private to one connection, so the pool is pinned to a single one.
    pub async fn open(path: &str, max_connections: u32) -> Result<Self, LedgerError> {
        let in_memory = path.contains(":memory:");
        let url = if path.starts_with("sqlite:") {
            path.to_string()
        } else {
            format!("sqlite:{path}")
        };

        let options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| LedgerError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let mut pool_options = SqlitePoolOptions::new().max_connections(if in_memory { 1 } else { max_connections.max(1) });
        if in_memory {
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }
        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| LedgerError::Storage(format!("Failed to open SQLite: {e}")))?;

        let ledger = Self { pool };
        ledger.run_migrations().await?;
        info!("SQLite ledger initialized at {path}");
        Ok(ledger)
    }

    /// Ephemeral ledger for tests and dry runs.
    pub async fn in_memory() -> Result<Self, LedgerError> {
        Self::open(":memory:", 1).await
    }

    /// Create tables and indexes.
    async fn run_migrations(&self) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS actions (
                id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                kind                TEXT NOT NULL,
                text                TEXT NOT NULL,
                external_id         TEXT UNIQUE,
                has_media           INTEGER NOT NULL DEFAULT 0,
                reply_target_id     TEXT,
                reply_target_author TEXT,
                created_at          TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| LedgerError::MigrationFailed(format!("actions table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS mentions (
                external_id   TEXT PRIMARY KEY,
                author_handle TEXT NOT NULL,
                author_text   TEXT NOT NULL DEFAULT '',
                reply_text    TEXT,
                disposition   TEXT NOT NULL,
                tools_used    TEXT,
                created_at    TEXT NOT NULL,
                updated_at    TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| LedgerError::MigrationFailed(format!("mentions table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS bot_state (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| LedgerError::MigrationFailed(format!("bot_state table: {e}")))?;

        for (name, ddl) in [
            (
                "actions created_at",
                "CREATE INDEX IF NOT EXISTS idx_actions_created_at ON actions(created_at DESC)",
            ),
            (
                "actions kind",
                "CREATE INDEX IF NOT EXISTS idx_actions_kind_created_at ON actions(kind, created_at)",
            ),
            (
                "mentions created_at",
                "CREATE INDEX IF NOT EXISTS idx_mentions_created_at ON mentions(created_at DESC)",
            ),
            (
                "mentions author",
                "CREATE INDEX IF NOT EXISTS idx_mentions_author ON mentions(author_handle COLLATE NOCASE)",
            ),
        ] {
            sqlx::query(ddl)
                .execute(&self.pool)
                .await
                .map_err(|e| LedgerError::MigrationFailed(format!("{name} index: {e}")))?;
        }

        debug!("SQLite migrations complete");
        Ok(())
    }

    /// Append an action with an explicit timestamp (imports and backfills).
    pub async fn record_action_at(&self, action: &NewAction, at: DateTime<Utc>) -> Result<i64, LedgerError> {
        action.validate()?;
        let result = sqlx::query(
            r#"
            INSERT INTO actions (kind, text, external_id, has_media, reply_target_id, reply_target_author, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(action.kind.as_str())
        .bind(&action.text)
        .bind(&action.external_id)
        .bind(action.has_media)
        .bind(&action.reply_target_id)
        .bind(&action.reply_target_author)
        .bind(ts(at))
        .execute(&self.pool)
        .await
        .map_err(query_err("insert action"))?;

        debug!(kind = %action.kind, external_id = ?action.external_id, "Recorded action");
        Ok(result.last_insert_rowid())
    }

    async fn count(&self, sql: &str, binds: &[&str]) -> Result<u64, LedgerError> {
        let mut query = sqlx::query(sql);
        for b in binds {
            query = query.bind(*b);
        }
        let row = query.fetch_one(&self.pool).await.map_err(query_err("count"))?;
        let n: i64 = row.try_get(0).map_err(query_err("count column"))?;
        Ok(n.max(0) as u64)
    }

    async fn latest(&self, sql: &str) -> Result<Option<DateTime<Utc>>, LedgerError> {
        let row = sqlx::query(sql).fetch_one(&self.pool).await.map_err(query_err("latest"))?;
        let latest: Option<String> = row.try_get(0).map_err(query_err("latest column"))?;
        Ok(latest.as_deref().and_then(parse_ts))
    }
}

#[async_trait]
impl Ledger for SqliteLedger {
    async fn record_action(&self, action: &NewAction) -> Result<i64, LedgerError> {
        self.record_action_at(action, Utc::now()).await
    }

    async fn recent_actions_context(&self, limit: usize) -> Result<String, LedgerError> {
        let rows = sqlx::query(
            r#"
            SELECT kind, text, has_media, reply_target_author
            FROM actions
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(query_err("recent actions"))?;

        if rows.is_empty() {
            return Ok(NO_ACTIONS.to_string());
        }

        let mut lines = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().rev().enumerate() {
            let kind: String = row.try_get("kind").map_err(query_err("kind column"))?;
            let text: String = row.try_get("text").map_err(query_err("text column"))?;
            let has_media: bool = row.try_get("has_media").map_err(query_err("has_media column"))?;
            let author: Option<String> = row
                .try_get("reply_target_author")
                .map_err(query_err("reply_target_author column"))?;

            let line = match ActionKind::parse(&kind) {
                Some(ActionKind::Reply) => format!(
                    "{}. REPLY to @{} (pic: {}): {}",
                    i + 1,
                    author.as_deref().unwrap_or("unknown"),
                    yes_no(has_media),
                    text
                ),
                _ => format!("{}. POST (pic: {}): {}", i + 1, yes_no(has_media), text),
            };
            lines.push(line);
        }
        Ok(lines.join("\n"))
    }

    async fn recent_replies_context(&self, limit: usize) -> Result<String, LedgerError> {
        let rows = sqlx::query(
            r#"
            SELECT author_handle, author_text, reply_text
            FROM mentions
            WHERE reply_text IS NOT NULL
            ORDER BY created_at DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(query_err("recent replies"))?;

        if rows.is_empty() {
            return Ok(NO_REPLIES.to_string());
        }

        let mut lines = Vec::with_capacity(rows.len() * 2);
        for (i, row) in rows.iter().rev().enumerate() {
            let who: String = row.try_get("author_handle").map_err(query_err("author_handle column"))?;
            let said: String = row.try_get("author_text").map_err(query_err("author_text column"))?;
            let reply: String = row.try_get("reply_text").map_err(query_err("reply_text column"))?;
            lines.push(format!("{}. @{who}: {said}", i + 1));
            lines.push(format!("   Your reply: {reply}"));
        }
        Ok(lines.join("\n"))
    }

    async fn mention_exists(&self, external_id: &str, include_pending: bool) -> Result<bool, LedgerError> {
        let row = sqlx::query("SELECT disposition FROM mentions WHERE external_id = ?")
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(query_err("mention lookup"))?;

        let Some(row) = row else {
            return Ok(false);
        };
        let disposition: String = row.try_get("disposition").map_err(query_err("disposition column"))?;
        Ok(include_pending || Disposition::parse(&disposition) != Some(Disposition::Pending))
    }

    async fn upsert_pending_mention(
        &self,
        external_id: &str,
        author_handle: &str,
        author_text: &str,
    ) -> Result<(), LedgerError> {
        let now = ts(Utc::now());
        sqlx::query(
            r#"
            INSERT INTO mentions (external_id, author_handle, author_text, disposition, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(external_id) DO NOTHING
            "#,
        )
        .bind(external_id)
        .bind(author_handle.trim_start_matches('@'))
        .bind(author_text)
        .bind(Disposition::Pending.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(query_err("upsert pending mention"))?;
        Ok(())
    }

    async fn finalize_mention(&self, outcome: &MentionOutcome) -> Result<(), LedgerError> {
        if !outcome.disposition.is_terminal() {
            return Err(LedgerError::InvalidRecord(
                "finalize_mention needs a terminal disposition".into(),
            ));
        }

        let now = ts(Utc::now());
        let tools_used = (!outcome.tools_used.is_empty()).then(|| outcome.tools_used.join(","));

        // Only a pending row moves; a terminal row keeps its first outcome.
        let result = sqlx::query(
            r#"
            INSERT INTO mentions
                (external_id, author_handle, author_text, reply_text, disposition, tools_used, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(external_id) DO UPDATE SET
                reply_text  = excluded.reply_text,
                disposition = excluded.disposition,
                tools_used  = excluded.tools_used,
                updated_at  = excluded.updated_at
            WHERE mentions.disposition = 'pending'
            "#,
        )
        .bind(&outcome.external_id)
        .bind(outcome.author_handle.as_deref().unwrap_or("unknown").trim_start_matches('@'))
        .bind(outcome.author_text.as_deref().unwrap_or(""))
        .bind(&outcome.reply_text)
        .bind(outcome.disposition.as_str())
        .bind(&tools_used)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(query_err("finalize mention"))?;

        if result.rows_affected() == 0 {
            debug!(external_id = %outcome.external_id, "Mention already final, left unchanged");
        } else {
            debug!(
                external_id = %outcome.external_id,
                disposition = outcome.disposition.as_str(),
                "Finalized mention"
            );
        }
        Ok(())
    }

    async fn count_today(&self, kind: ActionKind) -> Result<u32, LedgerError> {
        let today = today_start();
        let n = self
            .count(
                "SELECT COUNT(*) FROM actions WHERE kind = ? AND created_at >= ?",
                &[kind.as_str(), today.as_str()],
            )
            .await?;
        Ok(u32::try_from(n).unwrap_or(u32::MAX))
    }

    async fn conversation_history(&self, author_handle: &str, limit: usize) -> Result<String, LedgerError> {
        let handle = author_handle.trim_start_matches('@');
        let rows = sqlx::query(
            r#"
            SELECT author_handle, author_text, reply_text
            FROM mentions
            WHERE author_handle = ? COLLATE NOCASE AND reply_text IS NOT NULL
            ORDER BY created_at DESC
            LIMIT ?
            "#,
        )
        .bind(handle)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(query_err("conversation history"))?;

        if rows.is_empty() {
            return Ok(NO_CONVERSATIONS.to_string());
        }

        let mut exchanges = Vec::with_capacity(rows.len());
        for row in rows.iter().rev() {
            let who: String = row.try_get("author_handle").map_err(query_err("author_handle column"))?;
            let said: String = row.try_get("author_text").map_err(query_err("author_text column"))?;
            let reply: String = row.try_get("reply_text").map_err(query_err("reply_text column"))?;
            exchanges.push(format!("@{who}: {said}\nYou replied: {reply}"));
        }
        Ok(exchanges.join("\n\n"))
    }

    async fn get_state(&self, key: &str) -> Result<Option<String>, LedgerError> {
        let row = sqlx::query("SELECT value FROM bot_state WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(query_err("get state"))?;
        row.map(|r| r.try_get("value").map_err(query_err("value column")))
            .transpose()
    }

    async fn set_state(&self, key: &str, value: &str) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            INSERT INTO bot_state (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(ts(Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(query_err("set state"))?;
        Ok(())
    }

    async fn stats(&self) -> Result<LedgerStats, LedgerError> {
        let today = today_start();
        Ok(LedgerStats {
            posts_total: self.count("SELECT COUNT(*) FROM actions WHERE kind = ?", &["post"]).await?,
            posts_today: self
                .count("SELECT COUNT(*) FROM actions WHERE kind = ? AND created_at >= ?", &["post", today.as_str()])
                .await?,
            replies_total: self.count("SELECT COUNT(*) FROM actions WHERE kind = ?", &["reply"]).await?,
            replies_today: self
                .count("SELECT COUNT(*) FROM actions WHERE kind = ? AND created_at >= ?", &["reply", today.as_str()])
                .await?,
            mentions_total: self.count("SELECT COUNT(*) FROM mentions", &[]).await?,
            mentions_today: self
                .count("SELECT COUNT(*) FROM mentions WHERE created_at >= ?", &[today.as_str()])
                .await?,
            last_action_at: self.latest("SELECT MAX(created_at) FROM actions").await?,
            last_mention_at: self.latest("SELECT MAX(created_at) FROM mentions").await?,
        })
    }

    async fn ping(&self) -> Result<(), LedgerError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| LedgerError::Storage(format!("ping: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn test_ledger() -> SqliteLedger {
        SqliteLedger::in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn empty_ledger_renders_placeholder() {
        let ledger = test_ledger().await;
        assert_eq!(ledger.recent_actions_context(20).await.unwrap(), NO_ACTIONS);
        assert_eq!(ledger.conversation_history("alice", 10).await.unwrap(), NO_CONVERSATIONS);
    }

    #[tokio::test]
    async fn recent_actions_are_oldest_first_and_bounded() {
        let ledger = test_ledger().await;
        let base = Utc::now() - Duration::minutes(10);
        ledger.record_action_at(&NewAction::post("first", "1", false), base).await.unwrap();
        ledger
            .record_action_at(&NewAction::reply("second", "2", true, "99", "alice"), base + Duration::minutes(1))
            .await
            .unwrap();
        ledger
            .record_action_at(&NewAction::post("third", "3", true), base + Duration::minutes(2))
            .await
            .unwrap();

        let all = ledger.recent_actions_context(20).await.unwrap();
        assert_eq!(
            all,
            "1. POST (pic: no): first\n2. REPLY to @alice (pic: yes): second\n3. POST (pic: yes): third"
        );

        let window = ledger.recent_actions_context(2).await.unwrap();
        assert!(window.starts_with("1. REPLY to @alice"));
        assert!(!window.contains("first"));
    }

    #[tokio::test]
    async fn reply_without_target_is_rejected() {
        let ledger = test_ledger().await;
        let mut action = NewAction::reply("hi", "5", false, "99", "alice");
        action.reply_target_id = None;
        assert!(matches!(
            ledger.record_action(&action).await,
            Err(LedgerError::InvalidRecord(_))
        ));
    }

    #[tokio::test]
    async fn external_id_is_unique() {
        let ledger = test_ledger().await;
        ledger.record_action(&NewAction::post("a", "dup", false)).await.unwrap();
        assert!(ledger.record_action(&NewAction::post("b", "dup", false)).await.is_err());
    }

    #[tokio::test]
    async fn pending_mentions_only_exist_when_asked() {
        let ledger = test_ledger().await;
        assert!(!ledger.mention_exists("m1", true).await.unwrap());

        ledger.upsert_pending_mention("m1", "@alice", "hello bot").await.unwrap();
        assert!(ledger.mention_exists("m1", true).await.unwrap());
        assert!(!ledger.mention_exists("m1", false).await.unwrap());

        ledger.finalize_mention(&MentionOutcome::ignored("m1")).await.unwrap();
        assert!(ledger.mention_exists("m1", false).await.unwrap());
    }

    #[tokio::test]
    async fn first_author_text_wins() {
        let ledger = test_ledger().await;
        ledger.upsert_pending_mention("m1", "alice", "original").await.unwrap();
        ledger.upsert_pending_mention("m1", "alice", "edited").await.unwrap();
        ledger
            .finalize_mention(&MentionOutcome::replied("m1", "hi alice", vec![]))
            .await
            .unwrap();

        let history = ledger.conversation_history("alice", 10).await.unwrap();
        assert_eq!(history, "@alice: original\nYou replied: hi alice");
    }

    #[tokio::test]
    async fn finalize_creates_missing_row() {
        let ledger = test_ledger().await;
        ledger
            .finalize_mention(
                &MentionOutcome::replied("m7", "thanks!", vec!["web_search".into()]).with_author("bob", "nice cat"),
            )
            .await
            .unwrap();

        assert!(ledger.mention_exists("m7", false).await.unwrap());
        let history = ledger.conversation_history("BOB", 10).await.unwrap();
        assert_eq!(history, "@bob: nice cat\nYou replied: thanks!");
    }

    #[tokio::test]
    async fn second_finalize_keeps_first_outcome() {
        let ledger = test_ledger().await;
        ledger.upsert_pending_mention("m1", "alice", "hey").await.unwrap();
        ledger
            .finalize_mention(&MentionOutcome::replied("m1", "first reply", vec![]))
            .await
            .unwrap();
        ledger
            .finalize_mention(&MentionOutcome::replied("m1", "second reply", vec![]))
            .await
            .unwrap();
        ledger.finalize_mention(&MentionOutcome::ignored("m1")).await.unwrap();

        let history = ledger.conversation_history("alice", 10).await.unwrap();
        assert!(history.contains("first reply"));
        assert!(!history.contains("second reply"));
    }

    #[tokio::test]
    async fn finalize_rejects_pending() {
        let ledger = test_ledger().await;
        let mut outcome = MentionOutcome::ignored("m1");
        outcome.disposition = Disposition::Pending;
        assert!(ledger.finalize_mention(&outcome).await.is_err());
    }

    #[tokio::test]
    async fn count_today_ignores_yesterday() {
        let ledger = test_ledger().await;
        let yesterday = Utc::now() - Duration::days(1) - Duration::hours(1);
        ledger
            .record_action_at(&NewAction::post("old", "y1", false), yesterday)
            .await
            .unwrap();
        for i in 0..3 {
            ledger
                .record_action(&NewAction::post(format!("p{i}"), format!("t{i}"), false))
                .await
                .unwrap();
        }
        ledger
            .record_action(&NewAction::reply("r", "r1", false, "9", "alice"))
            .await
            .unwrap();

        assert_eq!(ledger.count_today(ActionKind::Post).await.unwrap(), 3);
        assert_eq!(ledger.count_today(ActionKind::Reply).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn history_is_per_author_bounded_and_replied_only() {
        let ledger = test_ledger().await;
        for i in 0..4 {
            let id = format!("a{i}");
            ledger.upsert_pending_mention(&id, "alice", &format!("msg {i}")).await.unwrap();
            ledger
                .finalize_mention(&MentionOutcome::replied(&id, format!("reply {i}"), vec![]))
                .await
                .unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
        ledger.upsert_pending_mention("b1", "bob", "unanswered").await.unwrap();
        ledger.upsert_pending_mention("a9", "alice", "still pending").await.unwrap();

        let history = ledger.conversation_history("@Alice", 2).await.unwrap();
        assert_eq!(
            history,
            "@alice: msg 2\nYou replied: reply 2\n\n@alice: msg 3\nYou replied: reply 3"
        );
        assert_eq!(ledger.conversation_history("bob", 10).await.unwrap(), NO_CONVERSATIONS);
    }

    #[tokio::test]
    async fn recent_replies_skip_unanswered() {
        let ledger = test_ledger().await;
        assert_eq!(ledger.recent_replies_context(10).await.unwrap(), NO_REPLIES);

        ledger.upsert_pending_mention("m1", "alice", "hi cat").await.unwrap();
        ledger
            .finalize_mention(&MentionOutcome::replied("m1", "hi alice", vec![]))
            .await
            .unwrap();
        ledger.upsert_pending_mention("m2", "bob", "ignored one").await.unwrap();
        ledger.finalize_mention(&MentionOutcome::ignored("m2")).await.unwrap();

        assert_eq!(
            ledger.recent_replies_context(10).await.unwrap(),
            "1. @alice: hi cat\n   Your reply: hi alice"
        );
    }

    #[tokio::test]
    async fn state_roundtrip_and_overwrite() {
        let ledger = test_ledger().await;
        assert_eq!(ledger.get_state("last_mention_id").await.unwrap(), None);
        ledger.set_state("last_mention_id", "100").await.unwrap();
        ledger.set_state("last_mention_id", "200").await.unwrap();
        assert_eq!(ledger.get_state("last_mention_id").await.unwrap().as_deref(), Some("200"));
    }

    #[tokio::test]
    async fn stats_and_ping() {
        let ledger = test_ledger().await;
        ledger.ping().await.unwrap();
        ledger.record_action(&NewAction::post("p", "1", false)).await.unwrap();
        ledger.record_action(&NewAction::reply("r", "2", false, "9", "alice")).await.unwrap();
        ledger.upsert_pending_mention("m1", "alice", "hi").await.unwrap();

        let stats = ledger.stats().await.unwrap();
        assert_eq!(stats.posts_total, 1);
        assert_eq!(stats.posts_today, 1);
        assert_eq!(stats.replies_total, 1);
        assert_eq!(stats.mentions_total, 1);
        assert_eq!(stats.mentions_today, 1);
        assert!(stats.last_action_at.is_some());
        assert!(stats.last_mention_at.is_some());
    }

    #[tokio::test]
    async fn file_ledger_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("murmur.db");
        let path = path.to_str().unwrap();
        {
            let ledger = SqliteLedger::open(path, 2).await.unwrap();
            ledger.record_action(&NewAction::post("kept", "1", false)).await.unwrap();
        }
        let reopened = SqliteLedger::open(path, 2).await.unwrap();
        assert!(reopened.recent_actions_context(5).await.unwrap().contains("kept"));
    }
}
