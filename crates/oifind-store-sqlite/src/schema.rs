//! SQL schema for the oifind SQLite store.
//!
//! Table and column names follow the published OIerDB dump, so a database
//! produced by the upstream converters can be opened directly.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS OIer (
    uid           INTEGER PRIMARY KEY,
    initials      TEXT,
    name          TEXT NOT NULL,
    gender        INTEGER NOT NULL DEFAULT 0,   -- 1 male, -1 female, 0 unknown
    enroll_middle INTEGER,
    oierdb_score  REAL,
    ccf_score     REAL,
    ccf_level     INTEGER
);

CREATE TABLE IF NOT EXISTS Contest (
    id            INTEGER PRIMARY KEY,
    name          TEXT NOT NULL,
    type          TEXT NOT NULL,
    year          INTEGER NOT NULL,
    fall_semester INTEGER NOT NULL DEFAULT 0,
    full_score    INTEGER
);

CREATE TABLE IF NOT EXISTS School (
    id       INTEGER PRIMARY KEY,
    name     TEXT NOT NULL,
    province TEXT,
    city     TEXT,
    score    REAL
);

CREATE TABLE IF NOT EXISTS Record (
    id         INTEGER PRIMARY KEY,
    oier_uid   INTEGER NOT NULL REFERENCES OIer(uid),
    contest_id INTEGER NOT NULL REFERENCES Contest(id),
    school_id  INTEGER REFERENCES School(id),
    score      REAL,
    rank       INTEGER,
    province   TEXT,
    level      TEXT
);

CREATE INDEX IF NOT EXISTS idx_oier_score
    ON OIer(oierdb_score DESC, uid);
CREATE INDEX IF NOT EXISTS idx_oier_enroll
    ON OIer(enroll_middle);

-- Covers the narrowing join: enumerated lookups seek on oier_uid, unscoped
-- ones drive from Contest.
CREATE INDEX IF NOT EXISTS idx_record_oier
    ON Record(oier_uid, contest_id, province, level);
CREATE INDEX IF NOT EXISTS idx_record_contest
    ON Record(contest_id, oier_uid);
";

