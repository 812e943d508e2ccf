//! SQLite catalog of repository tags and their CRDs
//!
//! Features:
//! - WAL mode so readers can browse while an index run writes
//! - Foreign keys enforced: every CRD row points at an existing tag
//! - Idempotent writes (`ON CONFLICT DO NOTHING`)

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OpenFlags, OptionalExtension, ToSql, params};
use std::path::Path;

use crdoc_core::{CrdRecord, CrdSummary, Gvk, RepoTag, StoredCrd};

use crate::error::{Result, StoreError};
use crate::schema::SCHEMA;

/// Bound parameters per CRD row
const CRD_COLUMNS: usize = 6;

/// Rows per multi-row INSERT, kept well under SQLite's variable limit
const MAX_ROWS_PER_STATEMENT: usize = 500;

/// The CRD catalog
pub struct Catalog {
    conn: Connection,
}

impl Catalog {
    /// Open or create the catalog at a specific path
    pub fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )?;

        let mut catalog = Self { conn };
        catalog.init()?;
        Ok(catalog)
    }

    /// Open an in-memory catalog (for testing)
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let mut catalog = Self { conn };
        catalog.init()?;
        Ok(catalog)
    }

    fn init(&mut self) -> Result<()> {
        self.conn.pragma_update(None, "journal_mode", "WAL")?;
        self.conn.pragma_update(None, "synchronous", "NORMAL")?;
        self.conn.pragma_update(None, "foreign_keys", "ON")?;

        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Id of a tag row, if it exists
    pub fn tag_id(&self, repo: &str, name: &str) -> Result<Option<i64>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM tags WHERE repo = ?1 AND name = ?2",
                params![repo, name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    /// Return the id of `(repo, name)`, creating the row on first sight
    ///
    /// An existing row keeps its original time.
    pub fn ensure_tag(&mut self, name: &str, repo: &str, time: DateTime<Utc>) -> Result<i64> {
        if let Some(id) = self.tag_id(repo, name)? {
            return Ok(id);
        }

        self.conn.execute(
            "INSERT INTO tags (name, repo, time) VALUES (?1, ?2, ?3)",
            params![name, repo, time.timestamp()],
        )?;
        let id = self.conn.last_insert_rowid();

        tracing::debug!(repo, tag = name, id, "Created tag");
        Ok(id)
    }

    /// Insert CRD rows in one transaction, ignoring rows that already exist
    ///
    /// Returns the number of rows actually written.
    pub fn insert_crds(&mut self, records: &[CrdRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.transaction()?;
        let mut inserted = 0;

        for chunk in records.chunks(MAX_ROWS_PER_STATEMENT) {
            let sql = insert_statement(chunk.len());
            let mut values: Vec<&dyn ToSql> = Vec::with_capacity(chunk.len() * CRD_COLUMNS);
            for record in chunk {
                values.push(&record.gvk.group);
                values.push(&record.gvk.version);
                values.push(&record.gvk.kind);
                values.push(&record.tag_id);
                values.push(&record.filename);
                values.push(&record.data);
            }
            inserted += tx.execute(&sql, values.as_slice())?;
        }

        tx.commit()?;
        Ok(inserted)
    }

    /// Tags of a repository, newest first
    pub fn tags(&self, repo: &str) -> Result<Vec<RepoTag>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, name, repo, time
            FROM tags
            WHERE LOWER(repo) = LOWER(?1)
            ORDER BY time DESC, id DESC
            "#,
        )?;

        let rows = stmt
            .query_map([repo], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, name, repo, time)| -> Result<RepoTag> {
                let time = DateTime::from_timestamp(time, 0).ok_or_else(|| {
                    StoreError::InvalidTime {
                        repo: repo.clone(),
                        tag: name.clone(),
                        value: time,
                    }
                })?;
                Ok(RepoTag {
                    id,
                    name,
                    repo,
                    time,
                })
            })
            .collect()
    }

    /// Most recent tag of a repository
    pub fn latest_tag(&self, repo: &str) -> Result<Option<RepoTag>> {
        Ok(self.tags(repo)?.into_iter().next())
    }

    /// Resolve an explicit tag name, or the latest tag when `None`
    pub fn resolve_tag(&self, repo: &str, tag: Option<&str>) -> Result<Option<RepoTag>> {
        match tag {
            Some(name) => Ok(self.tags(repo)?.into_iter().find(|t| t.name == name)),
            None => self.latest_tag(repo),
        }
    }

    /// CRDs of a repository at a tag (latest when `None`), ordered by kind
    pub fn crds(&self, repo: &str, tag: Option<&str>) -> Result<Vec<CrdSummary>> {
        let Some(tag) = self.resolve_tag(repo, tag)? else {
            return Ok(Vec::new());
        };

        let mut stmt = self.conn.prepare(
            r#"
            SELECT "group", version, kind, filename
            FROM crds
            WHERE tag_id = ?1
            ORDER BY kind, "group", version
            "#,
        )?;

        let crds = stmt
            .query_map([tag.id], |row| {
                Ok(CrdSummary {
                    repo: tag.repo.clone(),
                    tag: tag.name.clone(),
                    gvk: Gvk::new(
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ),
                    filename: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(crds)
    }

    /// One stored CRD document
    pub fn crd(&self, repo: &str, tag: Option<&str>, gvk: &Gvk) -> Result<Option<StoredCrd>> {
        let Some(tag) = self.resolve_tag(repo, tag)? else {
            return Ok(None);
        };

        let crd = self
            .conn
            .query_row(
                r#"
                SELECT filename, data
                FROM crds
                WHERE tag_id = ?1 AND "group" = ?2 AND version = ?3 AND kind = ?4
                "#,
                params![tag.id, gvk.group, gvk.version, gvk.kind],
                |row| {
                    Ok(StoredCrd {
                        tag: tag.name.clone(),
                        gvk: gvk.clone(),
                        filename: row.get(0)?,
                        data: row.get(1)?,
                    })
                },
            )
            .optional()?;

        Ok(crd)
    }

    /// CRDs of every repository under a tag name, ordered by kind
    ///
    /// Used for the platform release pages, where all operators share
    /// one release tag.
    pub fn crds_for_tag_name(&self, name: &str) -> Result<Vec<CrdSummary>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT t.repo, t.name, c."group", c.version, c.kind, c.filename
            FROM tags t
            JOIN crds c ON c.tag_id = t.id
            WHERE t.name = ?1
            ORDER BY c.kind, t.repo, c."group", c.version
            "#,
        )?;

        let crds = stmt
            .query_map([name], |row| {
                Ok(CrdSummary {
                    repo: row.get(0)?,
                    tag: row.get(1)?,
                    gvk: Gvk::new(
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ),
                    filename: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(crds)
    }

    /// Catalog statistics
    pub fn stats(&self) -> Result<CatalogStats> {
        let repo_count: i64 =
            self.conn
                .query_row("SELECT COUNT(DISTINCT repo) FROM tags", [], |r| r.get(0))?;

        let tag_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM tags", [], |r| r.get(0))?;

        let crd_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM crds", [], |r| r.get(0))?;

        Ok(CatalogStats {
            repo_count: repo_count as usize,
            tag_count: tag_count as usize,
            crd_count: crd_count as usize,
        })
    }
}

fn insert_statement(rows: usize) -> String {
    let row = format!("({})", vec!["?"; CRD_COLUMNS].join(", "));
    format!(
        r#"INSERT INTO crds ("group", version, kind, tag_id, filename, data) VALUES {} ON CONFLICT DO NOTHING"#,
        vec![row; rows].join(", ")
    )
}

/// Catalog statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogStats {
    pub repo_count: usize,
    pub tag_count: usize,
    pub crd_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Months, TimeZone};

    const REPO: &str = "github.com/stackabletech/airflow-operator";

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn record(tag_id: i64, kind: &str) -> CrdRecord {
        CrdRecord {
            gvk: Gvk::new("example.com", "v1", kind),
            tag_id,
            filename: "crds.yaml".to_string(),
            data: serde_json::to_vec(&serde_json::json!({ "spec": { "names": { "kind": kind } } }))
                .unwrap(),
        }
    }

    #[test]
    fn test_fresh_catalog_is_empty() {
        let catalog = Catalog::open_memory().unwrap();
        let stats = catalog.stats().unwrap();
        assert_eq!(
            stats,
            CatalogStats {
                repo_count: 0,
                tag_count: 0,
                crd_count: 0
            }
        );
        assert!(catalog.tags(REPO).unwrap().is_empty());
        assert!(catalog.crds(REPO, None).unwrap().is_empty());
    }

    #[test]
    fn test_ensure_tag_is_idempotent() {
        let mut catalog = Catalog::open_memory().unwrap();

        let id = catalog.ensure_tag("23.11.0", REPO, t0()).unwrap();
        let again = catalog
            .ensure_tag("23.11.0", REPO, t0() + Duration::days(3))
            .unwrap();
        assert_eq!(id, again);

        let tags = catalog.tags(REPO).unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].time, t0());
    }

    #[test]
    fn test_insert_crds_ignores_duplicates() {
        let mut catalog = Catalog::open_memory().unwrap();
        let tag = catalog.ensure_tag("v1", REPO, t0()).unwrap();
        let records = vec![record(tag, "Foo"), record(tag, "Bar")];

        assert_eq!(catalog.insert_crds(&records).unwrap(), 2);
        assert_eq!(catalog.insert_crds(&records).unwrap(), 0);
        assert_eq!(catalog.stats().unwrap().crd_count, 2);
    }

    #[test]
    fn test_insert_crds_requires_existing_tag() {
        let mut catalog = Catalog::open_memory().unwrap();
        let result = catalog.insert_crds(&[record(42, "Foo")]);
        assert!(matches!(result, Err(StoreError::Database(_))));
        assert_eq!(catalog.stats().unwrap().crd_count, 0);
    }

    #[test]
    fn test_insert_crds_in_many_statements() {
        let mut catalog = Catalog::open_memory().unwrap();
        let tag = catalog.ensure_tag("v1", REPO, t0()).unwrap();
        let records: Vec<_> = (0..1203).map(|i| record(tag, &format!("Kind{i}"))).collect();

        assert_eq!(catalog.insert_crds(&records).unwrap(), 1203);
        assert_eq!(catalog.crds(REPO, Some("v1")).unwrap().len(), 1203);
    }

    #[test]
    fn test_nightly_sorts_last() {
        let mut catalog = Catalog::open_memory().unwrap();
        let nightly_time = t0().checked_sub_months(Months::new(600)).unwrap();

        catalog.ensure_tag("nightly", REPO, nightly_time).unwrap();
        catalog.ensure_tag("23.11.0", REPO, t0()).unwrap();
        catalog
            .ensure_tag("23.7.0", REPO, t0() - Duration::days(120))
            .unwrap();

        let names: Vec<_> = catalog
            .tags(REPO)
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["23.11.0", "23.7.0", "nightly"]);
        assert_eq!(catalog.latest_tag(REPO).unwrap().unwrap().name, "23.11.0");
    }

    #[test]
    fn test_crds_default_to_latest_tag() {
        let mut catalog = Catalog::open_memory().unwrap();
        let old = catalog
            .ensure_tag("v1", REPO, t0() - Duration::days(1))
            .unwrap();
        let new = catalog.ensure_tag("v2", REPO, t0()).unwrap();
        catalog
            .insert_crds(&[record(old, "Old"), record(new, "Zeta"), record(new, "Alpha")])
            .unwrap();

        let latest = catalog.crds(REPO, None).unwrap();
        let kinds: Vec<_> = latest.iter().map(|c| c.gvk.kind.as_str()).collect();
        assert_eq!(kinds, vec!["Alpha", "Zeta"]);
        assert!(latest.iter().all(|c| c.tag == "v2"));

        let old_crds = catalog.crds(REPO, Some("v1")).unwrap();
        assert_eq!(old_crds.len(), 1);
        assert!(catalog.crds(REPO, Some("v9")).unwrap().is_empty());
    }

    #[test]
    fn test_crd_lookup_is_case_insensitive_on_repo() {
        let mut catalog = Catalog::open_memory().unwrap();
        let tag = catalog.ensure_tag("v1", REPO, t0()).unwrap();
        catalog.insert_crds(&[record(tag, "Foo")]).unwrap();

        let gvk = Gvk::new("example.com", "v1", "Foo");
        let crd = catalog
            .crd("GitHub.com/StackableTech/Airflow-Operator", None, &gvk)
            .unwrap()
            .unwrap();
        assert_eq!(crd.tag, "v1");
        assert_eq!(crd.filename, "crds.yaml");
        assert_eq!(crd.document().unwrap()["spec"]["names"]["kind"], "Foo");

        let missing = Gvk::new("example.com", "v1", "Bar");
        assert!(catalog.crd(REPO, None, &missing).unwrap().is_none());
    }

    #[test]
    fn test_crds_for_tag_name_spans_repos() {
        let mut catalog = Catalog::open_memory().unwrap();
        let a = catalog
            .ensure_tag("23.11.0", "github.com/org/a-operator", t0())
            .unwrap();
        let b = catalog
            .ensure_tag("23.11.0", "github.com/org/b-operator", t0())
            .unwrap();
        let other = catalog
            .ensure_tag("24.3.0", "github.com/org/a-operator", t0())
            .unwrap();
        catalog
            .insert_crds(&[record(a, "Zoo"), record(b, "Bee"), record(other, "Ant")])
            .unwrap();

        let crds = catalog.crds_for_tag_name("23.11.0").unwrap();
        let kinds: Vec<_> = crds.iter().map(|c| c.gvk.kind.as_str()).collect();
        assert_eq!(kinds, vec!["Bee", "Zoo"]);
        assert_eq!(crds[0].repo, "github.com/org/b-operator");

        let stats = catalog.stats().unwrap();
        assert_eq!(stats.repo_count, 2);
        assert_eq!(stats.tag_count, 3);
    }

    #[test]
    fn test_catalog_persists_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("catalog.db");

        {
            let mut catalog = Catalog::open_at(&path).unwrap();
            let tag = catalog.ensure_tag("v1", REPO, t0()).unwrap();
            catalog.insert_crds(&[record(tag, "Foo")]).unwrap();
        }

        let catalog = Catalog::open_at(&path).unwrap();
        assert_eq!(catalog.stats().unwrap().crd_count, 1);
        assert_eq!(catalog.tags(REPO).unwrap()[0].time, t0());
    }
}
