//! Repository for the authoritative `road_assets` table.
//!
//! All geometry crosses this boundary as GeoJSON text:
//! `ST_AsGeoJSON` on the way out, `ST_GeomFromGeoJSON` on the way in.
//! Scope filtering happens in SQL — exact region match or a PostGIS
//! intersects test against an envelope in the canonical CRS.

use sqlx::PgPool;

use roadgrid_core::compare::CurrentRoad;
use roadgrid_core::scope::ImportScope;

use crate::models::road_asset::{NewRoadAsset, RoadAssetPatch, RoadAssetRecord, RoadAssetRestore};

/// Column list shared across queries; geometry rendered as GeoJSON.
const COLUMNS: &str = "id, road_id, name, road_type, lanes, direction, status, region, \
    data_source, valid_from, valid_to, ST_AsGeoJSON(geometry) AS geometry, \
    created_at, updated_at";

/// Provides scoped reads and publish/rollback writes for road assets.
pub struct RoadAssetRepo;

impl RoadAssetRepo {
    // ── Scoped reads ─────────────────────────────────────────────────

    /// List every active record in scope.
    pub async fn list_active_in_scope(
        pool: &PgPool,
        scope: &ImportScope,
    ) -> Result<Vec<RoadAssetRecord>, sqlx::Error> {
        match scope {
            ImportScope::Full => {
                let query = format!(
                    "SELECT {COLUMNS} FROM road_assets WHERE status = 'active' ORDER BY road_id"
                );
                sqlx::query_as::<_, RoadAssetRecord>(&query)
                    .fetch_all(pool)
                    .await
            }
            ImportScope::Region { name } => {
                let query = format!(
                    "SELECT {COLUMNS} FROM road_assets \
                     WHERE status = 'active' AND region = $1 ORDER BY road_id"
                );
                sqlx::query_as::<_, RoadAssetRecord>(&query)
                    .bind(name)
                    .fetch_all(pool)
                    .await
            }
            ImportScope::Bbox {
                min_x,
                min_y,
                max_x,
                max_y,
            } => {
                let query = format!(
                    "SELECT {COLUMNS} FROM road_assets \
                     WHERE status = 'active' \
                       AND ST_Intersects(geometry, ST_MakeEnvelope($1, $2, $3, $4, 4326)) \
                     ORDER BY road_id"
                );
                sqlx::query_as::<_, RoadAssetRecord>(&query)
                    .bind(min_x)
                    .bind(min_y)
                    .bind(max_x)
                    .bind(max_y)
                    .fetch_all(pool)
                    .await
            }
        }
    }

    /// Scoped read shaped for the diff engine: comparison scalars plus
    /// the geometry parsed back into a GeoJSON value.
    pub async fn current_roads_in_scope(
        pool: &PgPool,
        scope: &ImportScope,
    ) -> Result<Vec<CurrentRoad>, sqlx::Error> {
        let records = Self::list_active_in_scope(pool, scope).await?;
        Ok(records
            .into_iter()
            .map(|record| CurrentRoad {
                road_id: record.road_id,
                name: record.name,
                road_type: Some(record.road_type),
                lanes: Some(record.lanes),
                direction: Some(record.direction),
                region: record.region,
                geometry: record
                    .geometry
                    .as_deref()
                    .and_then(|raw| serde_json::from_str(raw).ok()),
            })
            .collect())
    }

    // ── Publish writes (inside the publish transaction) ──────────────

    /// Insert a new active record. The publisher has already applied the
    /// attribute defaults; geometry is GeoJSON text or absent.
    pub async fn insert_active(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        input: &NewRoadAsset,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO road_assets
                (road_id, name, road_type, lanes, direction, status, region, data_source, geometry)
             VALUES ($1, $2, $3, $4, $5, 'active', $6, $7, ST_GeomFromGeoJSON($8))",
        )
        .bind(&input.road_id)
        .bind(&input.name)
        .bind(&input.road_type)
        .bind(input.lanes)
        .bind(&input.direction)
        .bind(&input.region)
        .bind(&input.data_source)
        .bind(&input.geometry)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Update only the asserted fields of an existing record; `None`
    /// leaves the stored value in place. Geometry is refreshed when
    /// supplied, `updated_at` always.
    pub async fn update_asserted(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        road_id: &str,
        patch: &RoadAssetPatch,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE road_assets SET
                name = COALESCE($2, name),
                road_type = COALESCE($3, road_type),
                lanes = COALESCE($4, lanes),
                direction = COALESCE($5, direction),
                region = COALESCE($6, region),
                data_source = COALESCE($7, data_source),
                geometry = COALESCE(ST_GeomFromGeoJSON($8), geometry),
                updated_at = NOW()
             WHERE road_id = $1",
        )
        .bind(road_id)
        .bind(&patch.name)
        .bind(&patch.road_type)
        .bind(patch.lanes)
        .bind(&patch.direction)
        .bind(&patch.region)
        .bind(&patch.data_source)
        .bind(&patch.geometry)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Soft-delete every active in-scope record whose `road_id` is not
    /// in `present_ids`. Regional refresh only; records are never
    /// hard-deleted by a publish.
    pub async fn deactivate_absent_in_scope(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        scope: &ImportScope,
        present_ids: &[String],
    ) -> Result<u64, sqlx::Error> {
        let result = match scope {
            ImportScope::Full => {
                sqlx::query(
                    "UPDATE road_assets SET status = 'inactive', updated_at = NOW() \
                     WHERE status = 'active' AND NOT (road_id = ANY($1))",
                )
                .bind(present_ids)
                .execute(&mut **tx)
                .await?
            }
            ImportScope::Region { name } => {
                sqlx::query(
                    "UPDATE road_assets SET status = 'inactive', updated_at = NOW() \
                     WHERE status = 'active' AND region = $2 AND NOT (road_id = ANY($1))",
                )
                .bind(present_ids)
                .bind(name)
                .execute(&mut **tx)
                .await?
            }
            ImportScope::Bbox {
                min_x,
                min_y,
                max_x,
                max_y,
            } => {
                sqlx::query(
                    "UPDATE road_assets SET status = 'inactive', updated_at = NOW() \
                     WHERE status = 'active' \
                       AND ST_Intersects(geometry, ST_MakeEnvelope($2, $3, $4, $5, 4326)) \
                       AND NOT (road_id = ANY($1))",
                )
                .bind(present_ids)
                .bind(min_x)
                .bind(min_y)
                .bind(max_x)
                .bind(max_y)
                .execute(&mut **tx)
                .await?
            }
        };
        Ok(result.rows_affected())
    }

    // ── Rollback writes (inside the rollback transaction) ────────────

    /// Unconditional upsert by `road_id`, overwriting every field with
    /// the snapshot's values. The snapshot is ground truth.
    pub async fn restore_record(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        record: &RoadAssetRestore,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO road_assets
                (road_id, name, road_type, lanes, direction, status, region, data_source, geometry)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, ST_GeomFromGeoJSON($9))
             ON CONFLICT (road_id) DO UPDATE SET
                name = EXCLUDED.name,
                road_type = EXCLUDED.road_type,
                lanes = EXCLUDED.lanes,
                direction = EXCLUDED.direction,
                status = EXCLUDED.status,
                region = EXCLUDED.region,
                data_source = EXCLUDED.data_source,
                geometry = EXCLUDED.geometry,
                updated_at = NOW()",
        )
        .bind(&record.road_id)
        .bind(&record.name)
        .bind(&record.road_type)
        .bind(record.lanes)
        .bind(&record.direction)
        .bind(&record.status)
        .bind(&record.region)
        .bind(&record.data_source)
        .bind(&record.geometry)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}
