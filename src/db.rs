use std::path::Path;

use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};

pub fn connect(path: &str) -> Result<Connection> {
    if let Some(dir) = Path::new(path).parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS lectures (
            id                    INTEGER PRIMARY KEY,
            source                TEXT NOT NULL,
            source_id             TEXT NOT NULL,
            title                 TEXT NOT NULL,
            url                   TEXT NOT NULL,
            price                 TEXT NOT NULL,
            instructor            TEXT NOT NULL,
            image_url             TEXT NOT NULL,
            source_main_category  TEXT NOT NULL,
            source_sub_category   TEXT NOT NULL,
            main_category         TEXT NOT NULL,
            sub_category          TEXT NOT NULL,
            keywords              TEXT NOT NULL,
            description           TEXT NOT NULL,
            created_at            TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at            TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(source, source_id)
        );
        CREATE INDEX IF NOT EXISTS idx_lectures_category ON lectures(main_category, sub_category);
        ",
    )?;
    Ok(())
}

// ── Saving ──

/// A lecture in the canonical taxonomy, ready to be upserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalLecture {
    pub title: String,
    pub source: String,
    pub source_id: String,
    pub url: String,
    pub price: String,
    pub instructor: String,
    pub image_url: String,
    pub source_main_category: String,
    pub source_sub_category: String,
    pub main_category: String,
    pub sub_category: String,
    pub keywords: String,
    pub description: String,
}

impl CanonicalLecture {
    pub fn tsv(&self) -> String {
        [
            self.source_id.as_str(),
            self.title.as_str(),
            self.instructor.as_str(),
            self.price.as_str(),
            self.main_category.as_str(),
            self.sub_category.as_str(),
            self.url.as_str(),
        ]
        .join("\t")
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SaveStats {
    pub inserted: usize,
    pub updated: usize,
}

/// Upsert a batch for one source, keyed by (source, source_id), in one transaction.
pub fn save_or_update_lectures(
    conn: &Connection,
    source: &str,
    lectures: &[CanonicalLecture],
) -> Result<SaveStats> {
    let tx = conn.unchecked_transaction()?;
    let mut stats = SaveStats::default();
    {
        let mut exists_stmt =
            tx.prepare("SELECT id FROM lectures WHERE source = ?1 AND source_id = ?2")?;
        let mut upsert_stmt = tx.prepare(
            "INSERT INTO lectures
             (source, source_id, title, url, price, instructor, image_url,
              source_main_category, source_sub_category, main_category, sub_category,
              keywords, description)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
             ON CONFLICT(source, source_id) DO UPDATE SET
                title = excluded.title,
                url = excluded.url,
                price = excluded.price,
                instructor = excluded.instructor,
                image_url = excluded.image_url,
                source_main_category = excluded.source_main_category,
                source_sub_category = excluded.source_sub_category,
                main_category = excluded.main_category,
                sub_category = excluded.sub_category,
                keywords = excluded.keywords,
                description = excluded.description,
                updated_at = datetime('now')",
        )?;

        for l in lectures {
            let existing: Option<i64> = exists_stmt
                .query_row(rusqlite::params![source, l.source_id], |row| row.get(0))
                .optional()?;
            upsert_stmt.execute(rusqlite::params![
                source, l.source_id, l.title, l.url, l.price, l.instructor, l.image_url,
                l.source_main_category, l.source_sub_category, l.main_category, l.sub_category,
                l.keywords, l.description,
            ])?;
            if existing.is_some() {
                stats.updated += 1;
            } else {
                stats.inserted += 1;
            }
        }
    }
    tx.commit()?;
    Ok(stats)
}

// ── Reading ──

pub struct OverviewRow {
    pub source_id: String,
    pub title: String,
    pub instructor: String,
    pub price: String,
    pub main_category: String,
    pub sub_category: String,
}

pub fn fetch_overview(
    conn: &Connection,
    main_category: Option<&str>,
    limit: usize,
) -> Result<Vec<OverviewRow>> {
    let mut stmt = conn.prepare(
        "SELECT source_id, title, instructor, price, main_category, sub_category
         FROM lectures
         WHERE (?1 IS NULL OR main_category = ?1)
         ORDER BY main_category, sub_category, CAST(source_id AS INTEGER)
         LIMIT ?2",
    )?;
    let rows = stmt
        .query_map(rusqlite::params![main_category, limit as i64], |row| {
            Ok(OverviewRow {
                source_id: row.get(0)?,
                title: row.get(1)?,
                instructor: row.get(2)?,
                price: row.get(3)?,
                main_category: row.get(4)?,
                sub_category: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub struct Stats {
    pub total: usize,
    pub by_category: Vec<(String, usize)>,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let total: i64 = conn.query_row("SELECT COUNT(*) FROM lectures", [], |row| row.get(0))?;
    let mut stmt = conn.prepare(
        "SELECT main_category, COUNT(*) FROM lectures
         GROUP BY main_category ORDER BY COUNT(*) DESC, main_category",
    )?;
    let by_category = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get::<_, i64>(1)? as usize)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Stats {
        total: total as usize,
        by_category,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lecture(id: &str, title: &str, main: &str) -> CanonicalLecture {
        CanonicalLecture {
            title: title.into(),
            source: "coloso".into(),
            source_id: id.into(),
            url: format!("https://coloso.test/courses/{id}"),
            price: "99000".into(),
            instructor: "Jane Doe".into(),
            image_url: "img.jpg".into(),
            source_main_category: "드로잉".into(),
            source_sub_category: "캐릭터 일러스트".into(),
            main_category: main.into(),
            sub_category: "일러스트".into(),
            keywords: "draw".into(),
            description: String::new(),
        }
    }

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn upsert_by_source_id() {
        let conn = memory_db();
        let first = save_or_update_lectures(
            &conn,
            "coloso",
            &[lecture("1", "old title", "디자인"), lecture("2", "b", "디자인")],
        )
        .unwrap();
        assert_eq!(first, SaveStats { inserted: 2, updated: 0 });

        let second = save_or_update_lectures(
            &conn,
            "coloso",
            &[lecture("1", "new title", "디자인"), lecture("3", "c", "음악")],
        )
        .unwrap();
        assert_eq!(second, SaveStats { inserted: 1, updated: 1 });

        let rows = fetch_overview(&conn, None, 10).unwrap();
        assert_eq!(rows.len(), 3);
        let one = rows.iter().find(|r| r.source_id == "1").unwrap();
        assert_eq!(one.title, "new title");
    }

    #[test]
    fn same_id_under_another_source_is_distinct() {
        let conn = memory_db();
        save_or_update_lectures(&conn, "coloso", &[lecture("1", "a", "디자인")]).unwrap();
        let mut other = lecture("1", "a", "디자인");
        other.source = "fastcampus".into();
        let s = save_or_update_lectures(&conn, "fastcampus", &[other]).unwrap();
        assert_eq!(s.inserted, 1);
        assert_eq!(get_stats(&conn).unwrap().total, 2);
    }

    #[test]
    fn overview_filter_and_stats() {
        let conn = memory_db();
        save_or_update_lectures(
            &conn,
            "coloso",
            &[
                lecture("10", "a", "디자인"),
                lecture("2", "b", "디자인"),
                lecture("3", "c", "음악"),
            ],
        )
        .unwrap();

        let design = fetch_overview(&conn, Some("디자인"), 10).unwrap();
        let ids: Vec<&str> = design.iter().map(|r| r.source_id.as_str()).collect();
        assert_eq!(ids, vec!["2", "10"]);
        assert_eq!(fetch_overview(&conn, None, 1).unwrap().len(), 1);

        let stats = get_stats(&conn).unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_category[0], ("디자인".to_string(), 2));
    }
}
