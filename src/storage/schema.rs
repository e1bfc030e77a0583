//! Database schema definitions
//!
//! Timestamps are RFC 3339 strings in UTC with a fixed precision, so they
//! order correctly as text.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Saved searches; never deleted, only deactivated
CREATE TABLE IF NOT EXISTS search_criteria (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    name TEXT NOT NULL,
    make TEXT,
    model TEXT,
    price_min INTEGER,
    price_max INTEGER,
    year_min INTEGER,
    year_max INTEGER,
    mileage_min INTEGER,
    mileage_max INTEGER,
    fuel TEXT,
    gearbox TEXT,
    condition TEXT,
    seller_type TEXT,
    zip_code TEXT,
    radius_km INTEGER,
    features TEXT NOT NULL DEFAULT '[]',
    active INTEGER NOT NULL DEFAULT 1,
    tier TEXT NOT NULL,
    polling_interval_minutes INTEGER NOT NULL,
    last_run_at TEXT,
    last_error TEXT,
    last_status TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(user_id, name)
);

CREATE INDEX IF NOT EXISTS idx_criteria_tier_active ON search_criteria(tier, active);

-- Canonical vehicle records, keyed by identity
CREATE TABLE IF NOT EXISTS vehicles (
    id TEXT PRIMARY KEY,
    url TEXT,
    source_id TEXT,
    title TEXT NOT NULL,
    make TEXT,
    model TEXT,
    variant TEXT,
    price INTEGER,
    year INTEGER,
    month INTEGER,
    mileage INTEGER,
    power_kw INTEGER,
    doors INTEGER,
    seats INTEGER,
    fuel TEXT,
    gearbox TEXT,
    category TEXT,
    condition TEXT,
    seller_type TEXT,
    seller_name TEXT,
    features TEXT NOT NULL DEFAULT '[]',
    images TEXT NOT NULL DEFAULT '[]',
    content_hash TEXT NOT NULL,
    first_seen TEXT NOT NULL,
    last_seen TEXT NOT NULL,
    cycle_id TEXT
);

CREATE INDEX IF NOT EXISTS idx_vehicles_url ON vehicles(url);
CREATE INDEX IF NOT EXISTS idx_vehicles_content ON vehicles(content_hash);
CREATE INDEX IF NOT EXISTS idx_vehicles_make_model ON vehicles(make COLLATE NOCASE, model COLLATE NOCASE);
CREATE INDEX IF NOT EXISTS idx_vehicles_last_seen ON vehicles(last_seen);

-- Which search has already seen which vehicle
CREATE TABLE IF NOT EXISTS search_sightings (
    search_id INTEGER NOT NULL REFERENCES search_criteria(id),
    vehicle_id TEXT NOT NULL REFERENCES vehicles(id),
    cycle_id TEXT NOT NULL,
    first_seen TEXT NOT NULL,
    last_seen TEXT NOT NULL,
    PRIMARY KEY (search_id, vehicle_id)
);

CREATE INDEX IF NOT EXISTS idx_sightings_vehicle ON search_sightings(vehicle_id);

-- One row per finished cycle
CREATE TABLE IF NOT EXISTS monitoring_cycles (
    id TEXT PRIMARY KEY,
    search_id INTEGER NOT NULL REFERENCES search_criteria(id),
    tier TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    pages_fetched INTEGER NOT NULL DEFAULT 0,
    vehicles_found INTEGER NOT NULL DEFAULT 0,
    vehicles_new INTEGER NOT NULL DEFAULT 0,
    vehicles_notified INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL,
    error TEXT
);

CREATE INDEX IF NOT EXISTS idx_cycles_search ON monitoring_cycles(search_id, started_at);
CREATE INDEX IF NOT EXISTS idx_cycles_started ON monitoring_cycles(started_at);

-- Outbox read by the external delivery service
CREATE TABLE IF NOT EXISTS notifications (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    vehicle_id TEXT NOT NULL,
    urgency TEXT NOT NULL,
    payload TEXT NOT NULL,
    created_at TEXT NOT NULL,
    delivered_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_notifications_pending ON notifications(delivered_at, urgency);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        assert!(initialize_schema(&conn).is_ok());
    }

    #[test]
    fn test_tables_exist_after_init() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        for table in [
            "search_criteria",
            "vehicles",
            "search_sightings",
            "monitoring_cycles",
            "notifications",
        ] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "Table {} should exist", table);
        }
    }
}
