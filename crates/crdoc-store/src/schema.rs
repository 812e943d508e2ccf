//! SQL schema for the catalog.
//!
//! Idempotent thanks to `CREATE ... IF NOT EXISTS`; executed on every open.

/// Full schema DDL
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS tags (
    id    INTEGER PRIMARY KEY,
    name  TEXT NOT NULL,
    repo  TEXT NOT NULL,      -- '<host>/<org>/<repo>', lower-cased
    time  INTEGER NOT NULL,   -- unix seconds; nightly is back-dated
    UNIQUE (repo, name)
);

-- Never updated or deleted; conflicting inserts are ignored.
CREATE TABLE IF NOT EXISTS crds (
    "group"   TEXT NOT NULL,
    version   TEXT NOT NULL,
    kind      TEXT NOT NULL,
    tag_id    INTEGER NOT NULL REFERENCES tags(id),
    filename  TEXT NOT NULL,
    data      BLOB NOT NULL,  -- normalized CRD document (JSON)
    UNIQUE (tag_id, "group", version, kind)
);

CREATE INDEX IF NOT EXISTS idx_tags_repo_time ON tags(repo, time DESC);
CREATE INDEX IF NOT EXISTS idx_crds_tag ON crds(tag_id);
CREATE INDEX IF NOT EXISTS idx_crds_kind ON crds(kind);
"#;
