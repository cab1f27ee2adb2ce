//! Durable key/value storage behind the collection stores.
//!
//! The browser build writes to `localStorage`; the native host keeps the same
//! key/value layout in a single SQLite table. Tests use [`MemoryStorage`].

use anyhow::Result;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Per-origin persistent key/value store.
///
/// Reads never fail: an unreadable entry is reported as absent.
pub trait DurableStorage {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&self, key: &str) -> Result<()>;
}

impl<S: DurableStorage + ?Sized> DurableStorage for Rc<S> {
    fn get_item(&self, key: &str) -> Option<String> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        (**self).remove_item(key)
    }
}

/// In-memory storage. Clones share the same map, so a second store built over
/// a clone sees what the first one wrote (a page reload in miniature).
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl DurableStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

#[cfg(feature = "native")]
pub use sqlite::SqliteStorage;

#[cfg(feature = "native")]
mod sqlite {
    use super::DurableStorage;
    use anyhow::{Context, Result};
    use rusqlite::{params, Connection, OptionalExtension};
    use std::path::Path;

    /// `localStorage` semantics on top of one SQLite table.
    pub struct SqliteStorage {
        conn: Connection,
    }

    impl SqliteStorage {
        pub fn open(path: impl AsRef<Path>) -> Result<Self> {
            let path = path.as_ref();
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("Failed to create {}", parent.display()))?;
                }
            }
            let conn = Connection::open(path)
                .with_context(|| format!("Failed to open store at {}", path.display()))?;
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.pragma_update(None, "busy_timeout", 250)?;
            Self::init(conn)
        }

        pub fn open_in_memory() -> Result<Self> {
            Self::init(Connection::open_in_memory()?)
        }

        fn init(conn: Connection) -> Result<Self> {
            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS kv(
                    key   TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );
                "#,
            )?;
            Ok(Self { conn })
        }
    }

    impl DurableStorage for SqliteStorage {
        fn get_item(&self, key: &str) -> Option<String> {
            let res = self
                .conn
                .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                    row.get::<_, String>(0)
                })
                .optional();
            match res {
                Ok(v) => v,
                Err(e) => {
                    log::warn!("storage read failed for {key}: {e}");
                    None
                }
            }
        }

        fn set_item(&self, key: &str, value: &str) -> Result<()> {
            self.conn.execute(
                "INSERT INTO kv(key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )?;
            Ok(())
        }

        fn remove_item(&self, key: &str) -> Result<()> {
            self.conn
                .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_clones_share_entries() {
        let a = MemoryStorage::new();
        let b = a.clone();
        a.set_item("k", "v").unwrap();
        assert_eq!(b.get_item("k").as_deref(), Some("v"));
        b.remove_item("k").unwrap();
        assert!(a.is_empty());
    }

    #[cfg(feature = "native")]
    #[test]
    fn sqlite_overwrites_and_removes() {
        let s = SqliteStorage::open_in_memory().unwrap();
        assert_eq!(s.get_item("compareList"), None);
        s.set_item("compareList", "[1]").unwrap();
        s.set_item("compareList", "[1,2]").unwrap();
        assert_eq!(s.get_item("compareList").as_deref(), Some("[1,2]"));
        s.remove_item("compareList").unwrap();
        assert_eq!(s.get_item("compareList"), None);
        // Removing a missing key is fine
        s.remove_item("compareList").unwrap();
    }
}
