//! Spatial store adapter: PostGIS-backed persistence for pollution grid
//! cells, users, saved routes, route exposure history, and alert log
//! entries.

use aeris_common::model::{
    AlertKind, AlertLogEntry, NetcdfObjectRecord, NotificationPreferences,
    RouteExposureHistoryEntry, SavedRoute, User,
};
use aeris_common::{AerisError, AerisResult, BoundingBox, Gas, Mode, Severity};
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool, Row};
use uuid::Uuid;

/// Rows are bulk-inserted in chunks of this size; each chunk commits as
/// its own transaction so a mid-batch failure cannot corrupt earlier
/// chunks.
pub const INSERT_CHUNK_SIZE: usize = 2000;

/// One raw observation read back from `pollution_grid`, used by the UPES
/// aggregator to bucket values into a regular grid.
#[derive(Debug, Clone)]
pub struct GasObservation {
    pub gas: Gas,
    pub lon: f64,
    pub lat: f64,
    pub value: f64,
}

/// Result of a line-intersect aggregation over the pollution grid.
#[derive(Debug, Clone, Copy)]
pub struct LineAggregate {
    pub avg_value: Option<f64>,
    pub sum_severity: i64,
}

/// A cell ready for bulk insertion (polygon as WKT, SRID 4326 assumed).
#[derive(Debug, Clone)]
pub struct NewGridCell {
    pub timestamp: DateTime<Utc>,
    pub gas: Gas,
    pub polygon_wkt: String,
    pub pollution_value: f64,
    pub severity_level: Severity,
}

pub struct SpatialStore {
    pool: PgPool,
}

impl SpatialStore {
    pub async fn connect(database_url: &str) -> AerisResult<Self> {
        Self::connect_with_pool_size(database_url, 10).await
    }

    pub async fn connect_with_pool_size(
        database_url: &str,
        max_connections: u32,
    ) -> AerisResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| AerisError::Database(format!("connection failed: {}", e)))?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> AerisResult<()> {
        for statement in SCHEMA_SQL.split(';') {
            let trimmed = statement.trim();
            if !trimmed.is_empty() {
                sqlx::query(trimmed)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| AerisError::Database(format!("migration failed: {}", e)))?;
            }
        }
        Ok(())
    }

    /// Bulk-insert grid cells in chunks of [`INSERT_CHUNK_SIZE`], each
    /// chunk committed as its own transaction. Returns the total number of
    /// rows inserted across all chunks that succeeded; a failing chunk
    /// aborts the whole call but leaves prior chunks intact.
    pub async fn bulk_insert_cells(&self, cells: &[NewGridCell]) -> AerisResult<usize> {
        let mut inserted = 0usize;
        for chunk in cells.chunks(INSERT_CHUNK_SIZE) {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| AerisError::Database(format!("begin failed: {}", e)))?;

            for cell in chunk {
                sqlx::query(
                    r#"
                    INSERT INTO pollution_grid
                        (timestamp, gas_type, geom, pollution_value, severity_level)
                    VALUES
                        ($1, $2, ST_SetSRID(ST_GeomFromText($3), 4326), $4, $5)
                    "#,
                )
                .bind(cell.timestamp)
                .bind(cell.gas.as_str())
                .bind(&cell.polygon_wkt)
                .bind(cell.pollution_value)
                .bind(cell.severity_level.0 as i32)
                .execute(&mut *tx)
                .await
                .map_err(|e| AerisError::Database(format!("insert failed: {}", e)))?;
            }

            tx.commit()
                .await
                .map_err(|e| AerisError::Database(format!("commit failed: {}", e)))?;
            inserted += chunk.len();
        }
        Ok(inserted)
    }

    /// Range-query centroids within a time window and bbox.
    pub async fn range_query(
        &self,
        window: (DateTime<Utc>, DateTime<Utc>),
        bbox: BoundingBox,
    ) -> AerisResult<Vec<GasObservation>> {
        let rows = sqlx::query(
            r#"
            SELECT gas_type,
                   ST_X(ST_Centroid(geom)) AS lon,
                   ST_Y(ST_Centroid(geom)) AS lat,
                   pollution_value
            FROM pollution_grid
            WHERE timestamp BETWEEN $1 AND $2
              AND geom && ST_MakeEnvelope($3, $4, $5, $6, 4326)
            "#,
        )
        .bind(window.0)
        .bind(window.1)
        .bind(bbox.west)
        .bind(bbox.south)
        .bind(bbox.east)
        .bind(bbox.north)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AerisError::Database(format!("range query failed: {}", e)))?;

        rows.into_iter()
            .map(|row| {
                let gas_str: String = row.try_get("gas_type").unwrap_or_default();
                let gas = Gas::from_str_opt(&gas_str)
                    .ok_or_else(|| AerisError::SchemaAnomaly(format!("unknown gas {}", gas_str)))?;
                Ok(GasObservation {
                    gas,
                    lon: row.try_get("lon").unwrap_or(0.0),
                    lat: row.try_get("lat").unwrap_or(0.0),
                    value: row.try_get("pollution_value").unwrap_or(0.0),
                })
            })
            .collect()
    }

    /// Average value and summed severity for cells intersecting a route's
    /// straight line over the last completed hour. Used by the legacy
    /// blended-score task.
    pub async fn line_intersect_aggregate(
        &self,
        line: [(f64, f64); 2],
        window: (DateTime<Utc>, DateTime<Utc>),
    ) -> AerisResult<LineAggregate> {
        let wkt = format!(
            "LINESTRING({} {}, {} {})",
            line[0].0, line[0].1, line[1].0, line[1].1
        );
        let row = sqlx::query(
            r#"
            SELECT AVG(pollution_value) AS avg_value,
                   COALESCE(SUM(severity_level), 0) AS sum_severity
            FROM pollution_grid
            WHERE timestamp BETWEEN $1 AND $2
              AND ST_Intersects(geom, ST_SetSRID(ST_GeomFromText($3), 4326))
            "#,
        )
        .bind(window.0)
        .bind(window.1)
        .bind(&wkt)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AerisError::Database(format!("line intersect query failed: {}", e)))?;

        Ok(LineAggregate {
            avg_value: row.try_get::<Option<f64>, _>("avg_value").unwrap_or(None),
            sum_severity: row.try_get::<i64, _>("sum_severity").unwrap_or(0),
        })
    }

    /// Latest observation timestamp across the whole grid, `None` if empty.
    pub async fn max_timestamp(&self) -> AerisResult<Option<DateTime<Utc>>> {
        let ts: Option<DateTime<Utc>> =
            sqlx::query_scalar("SELECT MAX(timestamp) FROM pollution_grid")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| AerisError::Database(format!("max timestamp query failed: {}", e)))?;
        Ok(ts)
    }

    // --- Users & saved routes --------------------------------------------

    pub async fn get_user(&self, id: Uuid) -> AerisResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, notification_preferences, preferred_activity, \
             exposure_sensitivity_level FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AerisError::Database(format!("user query failed: {}", e)))?;
        row.map(TryInto::try_into).transpose()
    }

    pub async fn list_saved_routes(&self) -> AerisResult<Vec<SavedRoute>> {
        let rows = sqlx::query_as::<_, SavedRouteRow>(
            "SELECT id, user_id, origin_lat, origin_lon, dest_lat, dest_lon, \
             activity_type, last_computed_score, last_updated_at, \
             last_upes_score, last_upes_updated_at FROM saved_routes",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AerisError::Database(format!("saved route query failed: {}", e)))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn update_route_upes_score(
        &self,
        route_id: Uuid,
        score: f64,
        at: DateTime<Utc>,
    ) -> AerisResult<()> {
        sqlx::query(
            "UPDATE saved_routes SET last_upes_score = $1, last_upes_updated_at = $2 WHERE id = $3",
        )
        .bind(score)
        .bind(at)
        .bind(route_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AerisError::Database(format!("route update failed: {}", e)))?;
        Ok(())
    }

    pub async fn update_route_legacy_score(
        &self,
        route_id: Uuid,
        score: f64,
        at: DateTime<Utc>,
    ) -> AerisResult<()> {
        sqlx::query(
            "UPDATE saved_routes SET last_computed_score = $1, last_updated_at = $2 WHERE id = $3",
        )
        .bind(score)
        .bind(at)
        .bind(route_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AerisError::Database(format!("route update failed: {}", e)))?;
        Ok(())
    }

    // --- Route exposure history -------------------------------------------

    pub async fn insert_route_exposure_history(
        &self,
        route_id: Uuid,
        timestamp: DateTime<Utc>,
        mean_upes: f64,
        max_upes_along_route: Option<f64>,
        score_source: &str,
    ) -> AerisResult<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO route_exposure_history \
             (id, route_id, timestamp, mean_upes, max_upes_along_route, score_source) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(id)
        .bind(route_id)
        .bind(timestamp)
        .bind(mean_upes)
        .bind(max_upes_along_route)
        .bind(score_source)
        .execute(&self.pool)
        .await
        .map_err(|e| AerisError::Database(format!("history insert failed: {}", e)))?;
        Ok(id)
    }

    /// The two most recent history entries for a route, most recent first.
    /// `[0]` is "current", `[1]` (if present) is "previous".
    pub async fn recent_history(
        &self,
        route_id: Uuid,
        limit: i64,
    ) -> AerisResult<Vec<RouteExposureHistoryEntry>> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            "SELECT id, route_id, timestamp, mean_upes, max_upes_along_route, score_source \
             FROM route_exposure_history WHERE route_id = $1 \
             ORDER BY timestamp DESC LIMIT $2",
        )
        .bind(route_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AerisError::Database(format!("history query failed: {}", e)))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Minimum mean UPES for a route since `since`.
    pub async fn recent_min_mean_upes(
        &self,
        route_id: Uuid,
        since: DateTime<Utc>,
    ) -> AerisResult<Option<f64>> {
        let min: Option<f64> = sqlx::query_scalar(
            "SELECT MIN(mean_upes) FROM route_exposure_history \
             WHERE route_id = $1 AND timestamp >= $2",
        )
        .bind(route_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AerisError::Database(format!("history min query failed: {}", e)))?;
        Ok(min)
    }

    // --- Alert log ---------------------------------------------------------

    pub async fn insert_alert_log(&self, entry: &AlertLogEntry) -> AerisResult<()> {
        sqlx::query(
            "INSERT INTO alert_log \
             (id, user_id, route_id, kind, score_before, score_after, threshold, \
              metadata, created_at, notified_channels) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(entry.id)
        .bind(entry.user_id)
        .bind(entry.route_id)
        .bind(entry.kind.as_str())
        .bind(entry.score_before)
        .bind(entry.score_after)
        .bind(entry.threshold)
        .bind(&entry.metadata)
        .bind(entry.created_at)
        .bind(
            serde_json::to_value(&entry.notified_channels)
                .map_err(AerisError::from)?,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AerisError::Database(format!("alert log insert failed: {}", e)))?;
        Ok(())
    }

    // --- NetCDF audit records ------------------------------------------------

    pub async fn insert_netcdf_record(&self, record: &NetcdfObjectRecord) -> AerisResult<()> {
        sqlx::query(
            "INSERT INTO netcdf_files (file_name, bucket_path, timestamp, gas_type) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(&record.file_name)
        .bind(&record.bucket_path)
        .bind(record.timestamp)
        .bind(record.gas.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| AerisError::Database(format!("netcdf record insert failed: {}", e)))?;
        Ok(())
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    notification_preferences: serde_json::Value,
    preferred_activity: String,
    exposure_sensitivity_level: i16,
}

impl TryFrom<UserRow> for User {
    type Error = AerisError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            email: row.email,
            notification_preferences: serde_json::from_value(row.notification_preferences)
                .unwrap_or_default(),
            preferred_activity: Mode::from_str_opt(&row.preferred_activity)
                .unwrap_or(Mode::Commute),
            exposure_sensitivity_level: row.exposure_sensitivity_level.clamp(1, 5) as u8,
        })
    }
}

#[derive(FromRow)]
struct SavedRouteRow {
    id: Uuid,
    user_id: Uuid,
    origin_lat: f64,
    origin_lon: f64,
    dest_lat: f64,
    dest_lon: f64,
    activity_type: Option<String>,
    last_computed_score: Option<f64>,
    last_updated_at: Option<DateTime<Utc>>,
    last_upes_score: Option<f64>,
    last_upes_updated_at: Option<DateTime<Utc>>,
}

impl From<SavedRouteRow> for SavedRoute {
    fn from(row: SavedRouteRow) -> Self {
        SavedRoute {
            id: row.id,
            user_id: row.user_id,
            origin_lat: row.origin_lat,
            origin_lon: row.origin_lon,
            dest_lat: row.dest_lat,
            dest_lon: row.dest_lon,
            activity_type: row.activity_type.and_then(|s| Mode::from_str_opt(&s)),
            last_computed_score: row.last_computed_score,
            last_updated_at: row.last_updated_at,
            last_upes_score: row.last_upes_score,
            last_upes_updated_at: row.last_upes_updated_at,
        }
    }
}

#[derive(FromRow)]
struct HistoryRow {
    id: Uuid,
    route_id: Uuid,
    timestamp: DateTime<Utc>,
    mean_upes: f64,
    max_upes_along_route: Option<f64>,
    score_source: String,
}

impl From<HistoryRow> for RouteExposureHistoryEntry {
    fn from(row: HistoryRow) -> Self {
        RouteExposureHistoryEntry {
            id: row.id,
            route_id: row.route_id,
            timestamp: row.timestamp,
            mean_upes: row.mean_upes,
            max_upes_along_route: row.max_upes_along_route,
            score_source: row.score_source,
        }
    }
}

// Alert kind round-trips through its string representation at the DB
// boundary; parsing back is only needed if a future reader queries
// alert_log, so it lives here rather than on the model type.
pub fn alert_kind_from_str(s: &str) -> Option<AlertKind> {
    match s {
        "route_deterioration" => Some(AlertKind::RouteDeterioration),
        "hazard" => Some(AlertKind::Hazard),
        "wind_shift" => Some(AlertKind::WindShift),
        "time_based" => Some(AlertKind::TimeBased),
        _ => None,
    }
}

pub fn default_notification_preferences() -> NotificationPreferences {
    NotificationPreferences::default()
}

const SCHEMA_SQL: &str = r#"
CREATE EXTENSION IF NOT EXISTS postgis;

CREATE TABLE IF NOT EXISTS users (
    id UUID PRIMARY KEY,
    email VARCHAR(255) NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    notification_preferences JSONB NOT NULL DEFAULT '{}',
    preferred_activity VARCHAR(20) NOT NULL DEFAULT 'commute'
        CHECK (preferred_activity IN ('commute', 'jog', 'cycle')),
    exposure_sensitivity_level SMALLINT NOT NULL DEFAULT 1
        CHECK (exposure_sensitivity_level BETWEEN 1 AND 5)
);

CREATE TABLE IF NOT EXISTS saved_routes (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    origin_lat DOUBLE PRECISION NOT NULL,
    origin_lon DOUBLE PRECISION NOT NULL,
    dest_lat DOUBLE PRECISION NOT NULL,
    dest_lon DOUBLE PRECISION NOT NULL,
    activity_type VARCHAR(20) CHECK (activity_type IN ('commute', 'jog', 'cycle')),
    last_computed_score DOUBLE PRECISION,
    last_updated_at TIMESTAMPTZ,
    last_upes_score DOUBLE PRECISION,
    last_upes_updated_at TIMESTAMPTZ
);

CREATE TABLE IF NOT EXISTS pollution_grid (
    id BIGSERIAL PRIMARY KEY,
    timestamp TIMESTAMPTZ NOT NULL,
    gas_type VARCHAR(10) NOT NULL,
    geom GEOMETRY(POLYGON, 4326) NOT NULL,
    pollution_value DOUBLE PRECISION NOT NULL,
    severity_level SMALLINT NOT NULL CHECK (severity_level >= 0)
);

CREATE INDEX IF NOT EXISTS idx_pollution_grid_geom ON pollution_grid USING GIST (geom);
CREATE INDEX IF NOT EXISTS idx_pollution_grid_ts_gas ON pollution_grid (timestamp, gas_type);

CREATE TABLE IF NOT EXISTS route_exposure_history (
    id UUID PRIMARY KEY,
    route_id UUID NOT NULL REFERENCES saved_routes(id) ON DELETE CASCADE,
    timestamp TIMESTAMPTZ NOT NULL,
    mean_upes DOUBLE PRECISION NOT NULL,
    max_upes_along_route DOUBLE PRECISION,
    score_source VARCHAR(20) NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_route_exposure_history_route_ts
    ON route_exposure_history (route_id, timestamp DESC);

CREATE TABLE IF NOT EXISTS alert_log (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    route_id UUID NOT NULL REFERENCES saved_routes(id) ON DELETE CASCADE,
    kind VARCHAR(30) NOT NULL,
    score_before DOUBLE PRECISION,
    score_after DOUBLE PRECISION NOT NULL,
    threshold DOUBLE PRECISION NOT NULL,
    metadata JSONB NOT NULL DEFAULT '{}',
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    notified_channels JSONB NOT NULL DEFAULT '[]'
);

CREATE TABLE IF NOT EXISTS netcdf_files (
    id BIGSERIAL PRIMARY KEY,
    file_name VARCHAR(255) NOT NULL,
    bucket_path TEXT NOT NULL,
    timestamp TIMESTAMPTZ NOT NULL,
    gas_type VARCHAR(10) NOT NULL
)
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_size_matches_spec() {
        assert_eq!(INSERT_CHUNK_SIZE, 2000);
    }

    #[test]
    fn bulk_insert_chunks_evenly_and_remainder() {
        let cells: Vec<NewGridCell> = (0..4500)
            .map(|i| NewGridCell {
                timestamp: Utc::now(),
                gas: Gas::No2,
                polygon_wkt: "POLYGON((0 0,0 1,1 1,1 0,0 0))".to_string(),
                pollution_value: i as f64,
                severity_level: Severity(0),
            })
            .collect();
        let chunks: Vec<_> = cells.chunks(INSERT_CHUNK_SIZE).collect();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 2000);
        assert_eq!(chunks[2].len(), 500);
    }
}
