//! SQLite storage implementation
//!
//! One connection behind a mutex serves both store traits, the notification
//! outbox and the statistics queries. Statements are short and never held
//! across an await point.

use crate::dedup::DeduplicationIndex;
use crate::model::{
    Category, Condition, CycleStatus, Fuel, Gearbox, MonitoringCycle, SearchCriteria, SellerType,
    Urgency, Vehicle,
};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{CriteriaStore, StorageError, StorageResult, VehicleStore};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const CRITERIA_COLUMNS: &str = "id, user_id, name, make, model, price_min, price_max, \
     year_min, year_max, mileage_min, mileage_max, fuel, gearbox, condition, seller_type, \
     zip_code, radius_km, features, active, tier, polling_interval_minutes, last_run_at, \
     last_error, last_status";

const VEHICLE_COLUMNS: &str = "id, url, source_id, title, make, model, variant, price, year, \
     month, mileage, power_kw, doors, seats, fuel, gearbox, category, condition, seller_type, \
     seller_name, features, images, content_hash, first_seen, last_seen, cycle_id";

/// Formats a timestamp so that text order matches time order
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(index: usize, text: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
}

fn optional_timestamp(row: &Row<'_>, index: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    row.get::<_, Option<String>>(index)?
        .map(|text| parse_timestamp(index, &text))
        .transpose()
}

fn json_column<T: serde::de::DeserializeOwned>(row: &Row<'_>, index: usize) -> rusqlite::Result<T> {
    let text: String = row.get(index)?;
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
}

fn criteria_from_row(row: &Row<'_>) -> rusqlite::Result<SearchCriteria> {
    let mut criteria = SearchCriteria::new(
        row.get::<_, String>(1)?,
        row.get::<_, String>(2)?,
        row.get::<_, String>(19)?,
    );
    criteria.id = row.get(0)?;
    criteria.make = row.get(3)?;
    criteria.model = row.get(4)?;
    criteria.price_min = row.get(5)?;
    criteria.price_max = row.get(6)?;
    criteria.year_min = row.get(7)?;
    criteria.year_max = row.get(8)?;
    criteria.mileage_min = row.get(9)?;
    criteria.mileage_max = row.get(10)?;
    criteria.fuel = row.get::<_, Option<String>>(11)?.map(|s| Fuel::from_canonical(&s));
    criteria.gearbox = row.get::<_, Option<String>>(12)?.map(|s| Gearbox::from_canonical(&s));
    criteria.condition = row
        .get::<_, Option<String>>(13)?
        .map(|s| Condition::from_canonical(&s));
    criteria.seller_type = row
        .get::<_, Option<String>>(14)?
        .map(|s| SellerType::from_canonical(&s));
    criteria.zip_code = row.get(15)?;
    criteria.radius_km = row.get(16)?;
    criteria.features = json_column(row, 17)?;
    criteria.active = row.get(18)?;
    criteria.polling_interval_minutes = row.get(20)?;
    criteria.last_run_at = optional_timestamp(row, 21)?;
    criteria.last_error = row.get(22)?;
    criteria.last_status = row
        .get::<_, Option<String>>(23)?
        .and_then(|s| CycleStatus::from_db_string(&s));
    Ok(criteria)
}

fn vehicle_from_row(row: &Row<'_>) -> rusqlite::Result<Vehicle> {
    let first_seen = parse_timestamp(23, &row.get::<_, String>(23)?)?;
    let last_seen = parse_timestamp(24, &row.get::<_, String>(24)?)?;

    let mut vehicle = Vehicle::new(
        row.get::<_, String>(0)?,
        row.get::<_, String>(3)?,
        first_seen,
    );
    vehicle.url = row.get(1)?;
    vehicle.source_id = row.get(2)?;
    vehicle.make = row.get(4)?;
    vehicle.model = row.get(5)?;
    vehicle.variant = row.get(6)?;
    vehicle.mileage = row.get(10)?;
    vehicle.power_kw = row.get(11)?;
    vehicle.doors = row.get(12)?;
    vehicle.seats = row.get(13)?;
    vehicle.fuel = row.get::<_, Option<String>>(14)?.map(|s| Fuel::from_canonical(&s));
    vehicle.gearbox = row.get::<_, Option<String>>(15)?.map(|s| Gearbox::from_canonical(&s));
    vehicle.category = row
        .get::<_, Option<String>>(16)?
        .map(|s| Category::from_canonical(&s));
    vehicle.condition = row
        .get::<_, Option<String>>(17)?
        .map(|s| Condition::from_canonical(&s));
    vehicle.seller_type = row
        .get::<_, Option<String>>(18)?
        .map(|s| SellerType::from_canonical(&s));
    vehicle.seller_name = row.get(19)?;
    vehicle.features = json_column(row, 20)?;
    vehicle.images = json_column(row, 21)?;
    vehicle.last_seen = last_seen;
    vehicle.cycle_id = row.get(25)?;

    vehicle.set_price(row.get(7)?);
    vehicle.set_registration(row.get(8)?, row.get(9)?);
    vehicle.refresh_derived();
    Ok(vehicle)
}

/// SQLite storage backend
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens or creates the database file
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ===== Notification outbox =====

    /// Appends a notification for the external delivery service
    pub fn enqueue_notification(
        &self,
        user_id: &str,
        vehicle_id: &str,
        urgency: Urgency,
        payload: &str,
    ) -> StorageResult<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO notifications (user_id, vehicle_id, urgency, payload, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user_id,
                vehicle_id,
                urgency.as_str(),
                payload,
                timestamp(Utc::now())
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Undelivered notifications as (user, vehicle, urgency, payload)
    pub fn pending_notifications(&self) -> StorageResult<Vec<(String, String, String, String)>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT user_id, vehicle_id, urgency, payload FROM notifications
             WHERE delivered_at IS NULL ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ===== Statistics =====

    /// (active, inactive) search counts
    pub fn count_searches(&self) -> StorageResult<(u64, u64)> {
        let conn = self.conn();
        let counts = conn.query_row(
            "SELECT COALESCE(SUM(active = 1), 0), COALESCE(SUM(active = 0), 0) FROM search_criteria",
            [],
            |row| Ok((row.get::<_, i64>(0)? as u64, row.get::<_, i64>(1)? as u64)),
        )?;
        Ok(counts)
    }

    /// Active searches per tier, sorted by tier name
    pub fn active_searches_by_tier(&self) -> StorageResult<Vec<(String, u64)>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT tier, COUNT(*) FROM search_criteria WHERE active = 1
             GROUP BY tier ORDER BY tier",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get::<_, i64>(1)? as u64)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn count_vehicles(&self) -> StorageResult<u64> {
        let conn = self.conn();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM vehicles", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub fn count_vehicles_seen_since(&self, since: DateTime<Utc>) -> StorageResult<u64> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM vehicles WHERE last_seen >= ?1",
            params![timestamp(since)],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Recorded cycles per final status
    pub fn cycle_status_summary(&self) -> StorageResult<HashMap<CycleStatus, u64>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT status, COUNT(*) FROM monitoring_cycles GROUP BY status")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut summary = HashMap::new();
        for row in rows {
            let (status, count) = row?;
            if let Some(status) = CycleStatus::from_db_string(&status) {
                summary.insert(status, count as u64);
            }
        }
        Ok(summary)
    }

    /// Totals over all recorded cycles: (pages, found, new, notified)
    pub fn cycle_totals(&self) -> StorageResult<(u64, u64, u64, u64)> {
        let conn = self.conn();
        let totals = conn.query_row(
            "SELECT COALESCE(SUM(pages_fetched), 0), COALESCE(SUM(vehicles_found), 0),
                    COALESCE(SUM(vehicles_new), 0), COALESCE(SUM(vehicles_notified), 0)
             FROM monitoring_cycles",
            [],
            |row| {
                Ok((
                    row.get::<_, i64>(0)? as u64,
                    row.get::<_, i64>(1)? as u64,
                    row.get::<_, i64>(2)? as u64,
                    row.get::<_, i64>(3)? as u64,
                ))
            },
        )?;
        Ok(totals)
    }

    /// Active searches whose last cycle did not complete
    pub fn failing_searches(&self) -> StorageResult<Vec<SearchCriteria>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM search_criteria
             WHERE active = 1 AND last_status IS NOT NULL AND last_status != ?1
             ORDER BY id",
            CRITERIA_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![CycleStatus::Completed.to_db_string()], criteria_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn count_pending_notifications(&self) -> StorageResult<u64> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM notifications WHERE delivered_at IS NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Cycles of one search, newest first
    pub fn cycles_for_search(&self, search_id: i64) -> StorageResult<Vec<MonitoringCycle>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, search_id, tier, started_at, finished_at, pages_fetched, vehicles_found,
                    vehicles_new, vehicles_notified, status, error
             FROM monitoring_cycles WHERE search_id = ?1 ORDER BY started_at DESC",
        )?;
        let rows = stmt
            .query_map(params![search_id], |row| {
                Ok(MonitoringCycle {
                    id: row.get(0)?,
                    search_id: row.get(1)?,
                    tier: row.get(2)?,
                    started_at: parse_timestamp(3, &row.get::<_, String>(3)?)?,
                    finished_at: optional_timestamp(row, 4)?,
                    pages_fetched: row.get(5)?,
                    vehicles_found: row.get(6)?,
                    vehicles_new: row.get(7)?,
                    vehicles_notified: row.get(8)?,
                    status: CycleStatus::from_db_string(&row.get::<_, String>(9)?)
                        .unwrap_or(CycleStatus::Failed),
                    error: row.get(10)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[async_trait]
impl CriteriaStore for SqliteStore {
    async fn list_active(&self, tier: &str) -> StorageResult<Vec<SearchCriteria>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM search_criteria WHERE active = 1 AND tier = ?1 ORDER BY id",
            CRITERIA_COLUMNS
        ))?;
        let searches = stmt
            .query_map(params![tier], criteria_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(searches)
    }

    async fn record_cycle_result(
        &self,
        search_id: i64,
        cycle: &MonitoringCycle,
    ) -> StorageResult<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let finished_at = cycle.finished_at.unwrap_or_else(Utc::now);
        // The polling interval is measured from cycle start
        let updated = tx.execute(
            "UPDATE search_criteria SET last_run_at = ?1, last_status = ?2, last_error = ?3
             WHERE id = ?4",
            params![
                timestamp(cycle.started_at),
                cycle.status.to_db_string(),
                cycle.error,
                search_id
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::SearchNotFound(search_id));
        }

        tx.execute(
            "INSERT OR REPLACE INTO monitoring_cycles
             (id, search_id, tier, started_at, finished_at, pages_fetched, vehicles_found,
              vehicles_new, vehicles_notified, status, error)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                cycle.id,
                search_id,
                cycle.tier,
                timestamp(cycle.started_at),
                timestamp(finished_at),
                cycle.pages_fetched,
                cycle.vehicles_found,
                cycle.vehicles_new,
                cycle.vehicles_notified,
                cycle.status.to_db_string(),
                cycle.error
            ],
        )?;

        tx.commit()?;
        Ok(())
    }

    async fn upsert_criteria(&self, criteria: &SearchCriteria) -> StorageResult<i64> {
        criteria.validate()?;

        let features = serde_json::to_string(&criteria.features)?;
        let now = timestamp(Utc::now());
        let fuel = criteria.fuel.as_ref().map(|v| v.as_str().to_string());
        let gearbox = criteria.gearbox.as_ref().map(|v| v.as_str().to_string());
        let condition = criteria.condition.as_ref().map(|v| v.as_str().to_string());
        let seller_type = criteria.seller_type.as_ref().map(|v| v.as_str().to_string());

        let conn = self.conn();

        if criteria.id > 0 {
            let updated = conn.execute(
                "UPDATE search_criteria SET user_id = ?1, name = ?2, make = ?3, model = ?4,
                    price_min = ?5, price_max = ?6, year_min = ?7, year_max = ?8,
                    mileage_min = ?9, mileage_max = ?10, fuel = ?11, gearbox = ?12,
                    condition = ?13, seller_type = ?14, zip_code = ?15, radius_km = ?16,
                    features = ?17, active = ?18, tier = ?19, polling_interval_minutes = ?20,
                    updated_at = ?21
                 WHERE id = ?22",
                params![
                    criteria.user_id,
                    criteria.name,
                    criteria.make,
                    criteria.model,
                    criteria.price_min,
                    criteria.price_max,
                    criteria.year_min,
                    criteria.year_max,
                    criteria.mileage_min,
                    criteria.mileage_max,
                    fuel,
                    gearbox,
                    condition,
                    seller_type,
                    criteria.zip_code,
                    criteria.radius_km,
                    features,
                    criteria.active,
                    criteria.tier,
                    criteria.polling_interval_minutes,
                    now,
                    criteria.id
                ],
            )?;
            if updated == 0 {
                return Err(StorageError::SearchNotFound(criteria.id));
            }
            return Ok(criteria.id);
        }

        let id = conn.query_row(
            "INSERT INTO search_criteria
             (user_id, name, make, model, price_min, price_max, year_min, year_max,
              mileage_min, mileage_max, fuel, gearbox, condition, seller_type, zip_code,
              radius_km, features, active, tier, polling_interval_minutes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                     ?17, ?18, ?19, ?20, ?21, ?21)
             ON CONFLICT(user_id, name) DO UPDATE SET
                make = excluded.make, model = excluded.model,
                price_min = excluded.price_min, price_max = excluded.price_max,
                year_min = excluded.year_min, year_max = excluded.year_max,
                mileage_min = excluded.mileage_min, mileage_max = excluded.mileage_max,
                fuel = excluded.fuel, gearbox = excluded.gearbox,
                condition = excluded.condition, seller_type = excluded.seller_type,
                zip_code = excluded.zip_code, radius_km = excluded.radius_km,
                features = excluded.features, active = excluded.active, tier = excluded.tier,
                polling_interval_minutes = excluded.polling_interval_minutes,
                updated_at = excluded.updated_at
             RETURNING id",
            params![
                criteria.user_id,
                criteria.name,
                criteria.make,
                criteria.model,
                criteria.price_min,
                criteria.price_max,
                criteria.year_min,
                criteria.year_max,
                criteria.mileage_min,
                criteria.mileage_max,
                fuel,
                gearbox,
                condition,
                seller_type,
                criteria.zip_code,
                criteria.radius_km,
                features,
                criteria.active,
                criteria.tier,
                criteria.polling_interval_minutes,
                now
            ],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    async fn get_criteria(&self, id: i64) -> StorageResult<Option<SearchCriteria>> {
        let conn = self.conn();
        let criteria = conn
            .query_row(
                &format!("SELECT {} FROM search_criteria WHERE id = ?1", CRITERIA_COLUMNS),
                params![id],
                criteria_from_row,
            )
            .optional()?;
        Ok(criteria)
    }

    async fn deactivate(&self, id: i64) -> StorageResult<bool> {
        let conn = self.conn();
        let updated = conn.execute(
            "UPDATE search_criteria SET active = 0, updated_at = ?1 WHERE id = ?2",
            params![timestamp(Utc::now()), id],
        )?;
        Ok(updated > 0)
    }

    async fn prune_cycles(&self, before: DateTime<Utc>) -> StorageResult<usize> {
        let conn = self.conn();
        let deleted = conn.execute(
            "DELETE FROM monitoring_cycles WHERE started_at < ?1",
            params![timestamp(before)],
        )?;
        Ok(deleted)
    }
}

#[async_trait]
impl VehicleStore for SqliteStore {
    async fn find_by_identity(&self, id: &str) -> StorageResult<Option<Vehicle>> {
        let conn = self.conn();
        let vehicle = conn
            .query_row(
                &format!("SELECT {} FROM vehicles WHERE id = ?1", VEHICLE_COLUMNS),
                params![id],
                vehicle_from_row,
            )
            .optional()?;
        Ok(vehicle)
    }

    async fn upsert(&self, vehicle: &Vehicle) -> StorageResult<bool> {
        let features = serde_json::to_string(&vehicle.features)?;
        let images = serde_json::to_string(&vehicle.images)?;

        let conn = self.conn();
        let existed = conn
            .query_row(
                "SELECT 1 FROM vehicles WHERE id = ?1",
                params![vehicle.id],
                |_| Ok(()),
            )
            .optional()?
            .is_some();

        conn.execute(
            &format!(
                "INSERT INTO vehicles ({})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                         ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26)
                 ON CONFLICT(id) DO UPDATE SET
                    url = excluded.url, source_id = excluded.source_id, title = excluded.title,
                    make = excluded.make, model = excluded.model, variant = excluded.variant,
                    price = excluded.price, year = excluded.year, month = excluded.month,
                    mileage = excluded.mileage, power_kw = excluded.power_kw,
                    doors = excluded.doors, seats = excluded.seats, fuel = excluded.fuel,
                    gearbox = excluded.gearbox, category = excluded.category,
                    condition = excluded.condition, seller_type = excluded.seller_type,
                    seller_name = excluded.seller_name, features = excluded.features,
                    images = excluded.images, content_hash = excluded.content_hash,
                    last_seen = excluded.last_seen
                 WHERE excluded.last_seen >= vehicles.last_seen",
                VEHICLE_COLUMNS
            ),
            params![
                vehicle.id,
                vehicle.url,
                vehicle.source_id,
                vehicle.title,
                vehicle.make,
                vehicle.model,
                vehicle.variant,
                vehicle.price(),
                vehicle.year(),
                vehicle.month(),
                vehicle.mileage,
                vehicle.power_kw,
                vehicle.doors,
                vehicle.seats,
                vehicle.fuel.as_ref().map(|v| v.as_str()),
                vehicle.gearbox.as_ref().map(|v| v.as_str()),
                vehicle.category.as_ref().map(|v| v.as_str()),
                vehicle.condition.as_ref().map(|v| v.as_str()),
                vehicle.seller_type.as_ref().map(|v| v.as_str()),
                vehicle.seller_name,
                features,
                images,
                vehicle.content_hash(),
                timestamp(vehicle.first_seen),
                timestamp(vehicle.last_seen),
                vehicle.cycle_id
            ],
        )?;

        Ok(!existed)
    }

    async fn mark_seen(&self, id: &str, seen_at: DateTime<Utc>) -> StorageResult<()> {
        let conn = self.conn();
        conn.execute(
            "UPDATE vehicles SET last_seen = ?1 WHERE id = ?2 AND last_seen < ?1",
            params![timestamp(seen_at), id],
        )?;
        Ok(())
    }

    async fn candidate_index(&self, vehicle: &Vehicle) -> StorageResult<DeduplicationIndex> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM vehicles
             WHERE id = ?1
                OR url = ?2
                OR content_hash = ?3
                OR (make = ?4 COLLATE NOCASE AND model = ?5 COLLATE NOCASE)
             ORDER BY first_seen",
            VEHICLE_COLUMNS
        ))?;
        let candidates = stmt
            .query_map(
                params![
                    vehicle.id,
                    vehicle.url,
                    vehicle.content_hash(),
                    vehicle.make,
                    vehicle.model
                ],
                vehicle_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(DeduplicationIndex::from_vehicles(candidates.iter()))
    }

    async fn record_sighting(
        &self,
        search_id: i64,
        vehicle_id: &str,
        cycle_id: &str,
    ) -> StorageResult<bool> {
        let conn = self.conn();
        let now = timestamp(Utc::now());
        let inserted = conn.execute(
            "INSERT INTO search_sightings (search_id, vehicle_id, cycle_id, first_seen, last_seen)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT(search_id, vehicle_id) DO NOTHING",
            params![search_id, vehicle_id, cycle_id, now],
        )?;
        if inserted == 0 {
            conn.execute(
                "UPDATE search_sightings SET cycle_id = ?1, last_seen = ?2
                 WHERE search_id = ?3 AND vehicle_id = ?4",
                params![cycle_id, now, search_id, vehicle_id],
            )?;
        }
        Ok(inserted > 0)
    }

    async fn has_sighting(&self, search_id: i64, vehicle_id: &str) -> StorageResult<bool> {
        let conn = self.conn();
        let found = conn
            .query_row(
                "SELECT 1 FROM search_sightings WHERE search_id = ?1 AND vehicle_id = ?2",
                params![search_id, vehicle_id],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        Ok(found)
    }

    async fn prune_stale(&self, before: DateTime<Utc>) -> StorageResult<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let cutoff = timestamp(before);

        tx.execute(
            "DELETE FROM search_sightings
             WHERE vehicle_id IN (SELECT id FROM vehicles WHERE last_seen < ?1)",
            params![cutoff],
        )?;
        let deleted = tx.execute("DELETE FROM vehicles WHERE last_seen < ?1", params![cutoff])?;

        tx.commit()?;
        Ok(deleted)
    }
}
