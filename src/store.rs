// SQLite persistence - two tables plus a key-value mirror
//
// The record store is authoritative: one row per watch-list title (id
// order = insertion order) and one row per ranked movie with an
// explicit integer rank column. The kv table mirrors both collections
// as JSON under two fixed keys, matching the original app's habit of
// writing the same data to its key-value store alongside the tables;
// it doubles as a recovery source when the tables come back empty.

use std::path::Path;

use rusqlite::{params, Connection};

use crate::error::AppResult;
use crate::ranking::{MissingRankPolicy, RankedEntry, RankedList};
use crate::watchlist::WatchList;

const KV_WATCH_LIST: &str = "watch_list";
const KV_RANKED: &str = "ranked_movies";

/// Handle to the on-disk (or in-memory) movie store.
///
/// Constructed explicitly and passed where needed; there is no global
/// connection. Tests run against `open_in_memory`.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (creating if needed) the database at `path`.
    pub fn open(path: &Path) -> AppResult<Self> {
        let conn = Connection::open(path)?;
        // WAL keeps a half-finished save from corrupting the file
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::create_tables(&conn)?;
        Ok(Store { conn })
    }

    /// In-memory store for tests and throwaway sessions.
    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::create_tables(&conn)?;
        Ok(Store { conn })
    }

    fn create_tables(conn: &Connection) -> AppResult<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS watch_list (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                movie TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS ranked_movies (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                movie TEXT NOT NULL,
                rank INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    /// Persist both collections.
    ///
    /// Everything happens inside one transaction: tables and mirror are
    /// rewritten together, so a reader never observes a half-written
    /// watch-list/ranked pair.
    pub fn save(&mut self, watch_list: &WatchList, ranked: &RankedList) -> AppResult<()> {
        let watch_json = serde_json::to_string(watch_list.titles())?;
        let ranked_json = serde_json::to_string(&ranked.entries())?;

        let tx = self.conn.transaction()?;

        tx.execute("DELETE FROM watch_list", [])?;
        for movie in watch_list.titles() {
            tx.execute("INSERT INTO watch_list (movie) VALUES (?1)", params![movie])?;
        }

        tx.execute("DELETE FROM ranked_movies", [])?;
        for entry in ranked.entries() {
            tx.execute(
                "INSERT INTO ranked_movies (movie, rank) VALUES (?1, ?2)",
                params![entry.title, entry.rank as i64],
            )?;
        }

        tx.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![KV_WATCH_LIST, watch_json],
        )?;
        tx.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![KV_RANKED, ranked_json],
        )?;

        tx.commit()?;
        Ok(())
    }

    /// Load both collections.
    ///
    /// Ranked rows are read in rank order and renumbered 1..N, so a
    /// store written with gaps (or by an older version) still comes
    /// back with contiguous ranks. Empty tables fall back to the
    /// key-value mirror.
    pub fn load(&self, policy: MissingRankPolicy) -> AppResult<(WatchList, RankedList)> {
        let watch_titles = self.load_watch_titles()?;
        let ranked_titles = self.load_ranked_titles()?;

        if watch_titles.is_empty() && ranked_titles.is_empty() {
            if let Some(restored) = self.load_from_mirror(policy)? {
                return Ok(restored);
            }
        }

        Ok((
            WatchList::from_titles(watch_titles),
            RankedList::from_titles(ranked_titles, policy),
        ))
    }

    fn load_watch_titles(&self) -> AppResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT movie FROM watch_list ORDER BY id ASC")?;
        let titles = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(titles)
    }

    fn load_ranked_titles(&self) -> AppResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT movie FROM ranked_movies ORDER BY rank ASC, id ASC")?;
        let titles = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(titles)
    }

    fn load_from_mirror(
        &self,
        policy: MissingRankPolicy,
    ) -> AppResult<Option<(WatchList, RankedList)>> {
        let watch_json = self.kv_get(KV_WATCH_LIST)?;
        let ranked_json = self.kv_get(KV_RANKED)?;
        if watch_json.is_none() && ranked_json.is_none() {
            return Ok(None);
        }

        let watch_titles: Vec<String> = match watch_json {
            Some(json) => serde_json::from_str(&json)?,
            None => Vec::new(),
        };

        let mut entries: Vec<RankedEntry> = match ranked_json {
            Some(json) => serde_json::from_str(&json)?,
            None => Vec::new(),
        };
        entries.sort_by_key(|e| e.rank);
        let ranked_titles: Vec<String> = entries.into_iter().map(|e| e.title).collect();

        Ok(Some((
            WatchList::from_titles(watch_titles),
            RankedList::from_titles(ranked_titles, policy),
        )))
    }

    fn kv_get(&self, key: &str) -> AppResult<Option<String>> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let mut rows = stmt.query_map(params![key], |row| row.get(0))?;
        match rows.next() {
            Some(value) => Ok(Some(value?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_lists() -> (WatchList, RankedList) {
        let mut watch = WatchList::new();
        watch.push("Dune");
        watch.push("Alien");

        let mut ranked = RankedList::new();
        ranked.insert_at(1, "Heat").unwrap();
        ranked.insert_at(2, "Ran").unwrap();
        (watch, ranked)
    }

    #[test]
    fn test_save_load_round_trip() {
        let mut store = Store::open_in_memory().unwrap();
        let (watch, ranked) = sample_lists();

        store.save(&watch, &ranked).unwrap();
        let (loaded_watch, loaded_ranked) = store.load(MissingRankPolicy::Ignore).unwrap();

        assert_eq!(loaded_watch.titles(), watch.titles());
        assert_eq!(loaded_ranked.entries(), ranked.entries());
    }

    #[test]
    fn test_save_twice_keeps_single_copy() {
        let mut store = Store::open_in_memory().unwrap();
        let (watch, ranked) = sample_lists();

        store.save(&watch, &ranked).unwrap();
        store.save(&watch, &ranked).unwrap();

        let (loaded_watch, loaded_ranked) = store.load(MissingRankPolicy::Ignore).unwrap();
        assert_eq!(loaded_watch.len(), 2);
        assert_eq!(loaded_ranked.len(), 2);
    }

    #[test]
    fn test_empty_store_loads_empty_collections() {
        let store = Store::open_in_memory().unwrap();
        let (watch, ranked) = store.load(MissingRankPolicy::Ignore).unwrap();

        assert!(watch.is_empty());
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_load_renumbers_gapped_ranks() {
        let store = Store::open_in_memory().unwrap();
        for (movie, rank) in [("C", 9i64), ("A", 2), ("B", 5)] {
            store
                .conn
                .execute(
                    "INSERT INTO ranked_movies (movie, rank) VALUES (?1, ?2)",
                    params![movie, rank],
                )
                .unwrap();
        }

        let (_, ranked) = store.load(MissingRankPolicy::Ignore).unwrap();

        assert_eq!(
            ranked.entries(),
            vec![
                RankedEntry { rank: 1, title: "A".to_string() },
                RankedEntry { rank: 2, title: "B".to_string() },
                RankedEntry { rank: 3, title: "C".to_string() },
            ]
        );
    }

    #[test]
    fn test_mirror_fallback_when_tables_empty() {
        let mut store = Store::open_in_memory().unwrap();
        let (watch, ranked) = sample_lists();
        store.save(&watch, &ranked).unwrap();

        // Simulate table loss; the mirror survives
        store.conn.execute("DELETE FROM watch_list", []).unwrap();
        store.conn.execute("DELETE FROM ranked_movies", []).unwrap();

        let (loaded_watch, loaded_ranked) = store.load(MissingRankPolicy::Ignore).unwrap();
        assert_eq!(loaded_watch.titles(), watch.titles());
        assert_eq!(loaded_ranked.entries(), ranked.entries());
    }

    #[test]
    fn test_open_on_disk_persists_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("movies.db");

        {
            let mut store = Store::open(&path).unwrap();
            let (watch, ranked) = sample_lists();
            store.save(&watch, &ranked).unwrap();
        }

        let store = Store::open(&path).unwrap();
        let (watch, ranked) = store.load(MissingRankPolicy::Ignore).unwrap();
        assert_eq!(watch.len(), 2);
        assert_eq!(ranked.title_at(1), Some("Heat"));
    }

    #[test]
    fn test_loaded_list_carries_requested_policy() {
        let store = Store::open_in_memory().unwrap();
        let (_, ranked) = store.load(MissingRankPolicy::Strict).unwrap();
        assert_eq!(ranked.policy(), MissingRankPolicy::Strict);
    }
}
