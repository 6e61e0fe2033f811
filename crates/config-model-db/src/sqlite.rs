//! SQLite implementation of ModelRepository
//!
//! Records span three tables (`models`, `model_modules`, `model_replaces`).
//! Every write and every multi-table read runs inside one transaction, so a
//! record is never partially visible.

use async_trait::async_trait;
use config_model_core::{
    ModelIdentity, ModelName, ModelRecord, ModelVersion, ModuleInfo, ReplaceDirective,
};
use sqlx::sqlite::{SqliteConnection, SqlitePool, SqliteRow};
use sqlx::Row;
use std::collections::HashMap;
use tracing::{debug, instrument, warn};

use crate::error::{DbError, DbResult};
use crate::repository::ModelRepository;

/// SQLite-backed model registry
#[derive(Debug, Clone)]
pub struct SqliteModelRepository {
    pool: SqlitePool,
}

impl SqliteModelRepository {
    /// Create a new repository over an already migrated pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

type ModelKey = (String, String);

fn row_to_identity(row: &SqliteRow) -> DbResult<ModelIdentity> {
    let name: String = row.try_get("name")?;
    let version: String = row.try_get("version")?;
    Ok(ModelIdentity::new(
        ModelName::new(name)?,
        ModelVersion::new(version)?,
    ))
}

fn row_to_module(row: &SqliteRow) -> DbResult<ModuleInfo> {
    Ok(ModuleInfo {
        name: row.try_get("name")?,
        organization: row.try_get("organization")?,
        version: row.try_get("version")?,
        data: row.try_get("data")?,
    })
}

fn row_to_replace(row: &SqliteRow) -> DbResult<ReplaceDirective> {
    Ok(ReplaceDirective::new(
        row.try_get::<String, _>("source")?,
        row.try_get::<String, _>("substitute")?,
    ))
}

fn row_key(row: &SqliteRow) -> DbResult<ModelKey> {
    Ok((row.try_get("model_name")?, row.try_get("model_version")?))
}

/// Rebuild a record from its `models` row and its child rows
fn assemble(
    row: &SqliteRow,
    modules: Vec<ModuleInfo>,
    replace: Vec<ReplaceDirective>,
) -> DbResult<ModelRecord> {
    let identity = row_to_identity(row)?;
    let target: String = row.try_get("target")?;
    let stored_file: String = row.try_get("artifact_file")?;

    let record = ModelRecord::new(identity, modules, target, replace);
    if record.artifact_file() != stored_file {
        return Err(DbError::InvalidData(format!(
            "Stored artifact file {} does not match derived file {}",
            stored_file,
            record.artifact_file()
        )));
    }
    Ok(record)
}

async fn fetch_record(
    conn: &mut SqliteConnection,
    name: &str,
    version: &str,
) -> DbResult<Option<ModelRecord>> {
    let row = sqlx::query(
        r#"
        SELECT name, version, target, artifact_file
        FROM models
        WHERE name = ?1 AND version = ?2
        "#,
    )
    .bind(name)
    .bind(version)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let modules = sqlx::query(
        r#"
        SELECT name, organization, version, data
        FROM model_modules
        WHERE model_name = ?1 AND model_version = ?2
        ORDER BY position
        "#,
    )
    .bind(name)
    .bind(version)
    .fetch_all(&mut *conn)
    .await?
    .iter()
    .map(row_to_module)
    .collect::<DbResult<Vec<_>>>()?;

    let replace = sqlx::query(
        r#"
        SELECT source, substitute
        FROM model_replaces
        WHERE model_name = ?1 AND model_version = ?2
        ORDER BY position
        "#,
    )
    .bind(name)
    .bind(version)
    .fetch_all(&mut *conn)
    .await?
    .iter()
    .map(row_to_replace)
    .collect::<DbResult<Vec<_>>>()?;

    assemble(&row, modules, replace).map(Some)
}

#[async_trait]
impl ModelRepository for SqliteModelRepository {
    #[instrument(skip(self, record), fields(model = %record.identity))]
    async fn add_model(&self, record: ModelRecord) -> DbResult<()> {
        debug!("Adding model to registry database");

        let name = record.identity.name.as_str();
        let version = record.identity.version.as_str();

        let mut tx = self.pool.begin().await?;

        let owner = sqlx::query("SELECT name, version FROM models WHERE artifact_file = ?1")
            .bind(record.artifact_file())
            .fetch_optional(&mut *tx)
            .await?;
        if let Some(owner) = owner {
            let owner = row_to_identity(&owner)?;
            if owner == record.identity {
                return Err(DbError::AlreadyExists {
                    name: name.to_string(),
                    version: version.to_string(),
                });
            }
            return Err(DbError::ArtifactConflict {
                file: record.artifact_file().to_string(),
                owner: owner.to_string(),
            });
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO models (name, version, target, artifact_file)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(name)
        .bind(version)
        .bind(&record.plugin.target)
        .bind(record.artifact_file())
        .execute(&mut *tx)
        .await;

        // A concurrent writer on another connection may have won the race
        // between the lookup above and this insert.
        match inserted {
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                return Err(DbError::AlreadyExists {
                    name: name.to_string(),
                    version: version.to_string(),
                });
            }
            other => {
                other?;
            }
        }

        for (position, module) in record.modules.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO model_modules (
                    model_name, model_version, position, name, organization, version, data
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(name)
            .bind(version)
            .bind(position as i64)
            .bind(&module.name)
            .bind(&module.organization)
            .bind(&module.version)
            .bind(&module.data)
            .execute(&mut *tx)
            .await?;
        }

        for (position, directive) in record.plugin.replace.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO model_replaces (model_name, model_version, position, source, substitute)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(name)
            .bind(version)
            .bind(position as i64)
            .bind(&directive.source)
            .bind(&directive.substitute)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!("Model added successfully");
        Ok(())
    }

    #[instrument(skip(self), fields(model = %identity))]
    async fn remove_model(&self, identity: &ModelIdentity) -> DbResult<ModelRecord> {
        debug!("Removing model from registry database");

        let name = identity.name.as_str();
        let version = identity.version.as_str();

        let mut tx = self.pool.begin().await?;

        let record = fetch_record(&mut tx, name, version)
            .await?
            .ok_or_else(|| DbError::NotFound(identity.to_string()))?;

        for table in ["model_modules", "model_replaces"] {
            sqlx::query(&format!(
                "DELETE FROM {} WHERE model_name = ?1 AND model_version = ?2",
                table
            ))
            .bind(name)
            .bind(version)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("DELETE FROM models WHERE name = ?1 AND version = ?2")
            .bind(name)
            .bind(version)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!("Model removed successfully");
        Ok(record)
    }

    #[instrument(skip(self), fields(model = %identity))]
    async fn get_model(&self, identity: &ModelIdentity) -> DbResult<ModelRecord> {
        let mut tx = self.pool.begin().await?;
        let record =
            fetch_record(&mut tx, identity.name.as_str(), identity.version.as_str()).await?;
        tx.commit().await?;

        record.ok_or_else(|| DbError::NotFound(identity.to_string()))
    }

    async fn find_by_artifact(&self, file: &str) -> DbResult<Option<ModelRecord>> {
        let mut tx = self.pool.begin().await?;

        let owner = sqlx::query("SELECT name, version FROM models WHERE artifact_file = ?1")
            .bind(file)
            .fetch_optional(&mut *tx)
            .await?;

        let record = match owner {
            Some(row) => {
                let name: String = row.try_get("name")?;
                let version: String = row.try_get("version")?;
                fetch_record(&mut tx, &name, &version).await?
            }
            None => None,
        };

        tx.commit().await?;
        Ok(record)
    }

    #[instrument(skip(self))]
    async fn list_models(&self) -> DbResult<Vec<ModelRecord>> {
        // One read transaction gives a consistent snapshot across the three tables.
        let mut tx = self.pool.begin().await?;

        let model_rows = sqlx::query(
            "SELECT name, version, target, artifact_file FROM models ORDER BY name, version",
        )
        .fetch_all(&mut *tx)
        .await?;

        let mut modules: HashMap<ModelKey, Vec<ModuleInfo>> = HashMap::new();
        for row in sqlx::query(
            r#"
            SELECT model_name, model_version, name, organization, version, data
            FROM model_modules
            ORDER BY model_name, model_version, position
            "#,
        )
        .fetch_all(&mut *tx)
        .await?
        {
            modules.entry(row_key(&row)?).or_default().push(row_to_module(&row)?);
        }

        let mut replaces: HashMap<ModelKey, Vec<ReplaceDirective>> = HashMap::new();
        for row in sqlx::query(
            r#"
            SELECT model_name, model_version, source, substitute
            FROM model_replaces
            ORDER BY model_name, model_version, position
            "#,
        )
        .fetch_all(&mut *tx)
        .await?
        {
            replaces.entry(row_key(&row)?).or_default().push(row_to_replace(&row)?);
        }

        tx.commit().await?;

        let mut records = Vec::with_capacity(model_rows.len());
        for row in &model_rows {
            let key: ModelKey = (row.try_get("name")?, row.try_get("version")?);
            let record = assemble(
                row,
                modules.remove(&key).unwrap_or_default(),
                replaces.remove(&key).unwrap_or_default(),
            )?;
            records.push(record);
        }

        if !modules.is_empty() {
            warn!("{} module groups have no owning model row", modules.len());
        }

        Ok(records)
    }

    async fn count_models(&self) -> DbResult<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM models")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    async fn health_check(&self) -> DbResult<()> {
        crate::pool::verify_pool_health(&self.pool).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{create_pool, PoolConfig};

    async fn repository() -> SqliteModelRepository {
        let pool = create_pool(&PoolConfig::in_memory()).await.unwrap();
        SqliteModelRepository::new(pool)
    }

    fn record(name: &str, version: &str) -> ModelRecord {
        ModelRecord::new(
            ModelIdentity::parse(name, version).unwrap(),
            vec![
                ModuleInfo::new("test1", "ONF", "2018-02-20", b"module test1 {}".to_vec()),
                ModuleInfo::new("alpha", "ONF", "2019-06-10", vec![0u8, 159, 146, 150]),
            ],
            "github.com/onosproject/onos-config",
            vec![
                ReplaceDirective::new("github.com/a/b", "github.com/a/b2"),
                ReplaceDirective::new("github.com/a/b2", "../local/b"),
            ],
        )
    }

    #[tokio::test]
    async fn test_round_trip_preserves_order_and_bytes() {
        let repo = repository().await;
        let rec = record("device", "1.0.0");
        repo.add_model(rec.clone()).await.unwrap();

        let fetched = repo.get_model(&rec.identity).await.unwrap();
        assert_eq!(fetched, rec);
        assert_eq!(fetched.modules[0].name, "test1");
        assert_eq!(fetched.modules[1].data, vec![0u8, 159, 146, 150]);
        assert_eq!(fetched.plugin.replace[1].substitute, "../local/b");
    }

    #[tokio::test]
    async fn test_duplicate_add_is_rejected() {
        let repo = repository().await;
        repo.add_model(record("device", "1.0.0")).await.unwrap();

        let err = repo.add_model(record("device", "1.0.0")).await.unwrap_err();
        assert!(matches!(err, DbError::AlreadyExists { .. }));
        assert_eq!(repo.count_models().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_artifact_collision_is_rejected() {
        let repo = repository().await;
        repo.add_model(record("a-b", "1")).await.unwrap();

        let err = repo.add_model(record("a", "b-1")).await.unwrap_err();
        assert!(matches!(err, DbError::ArtifactConflict { .. }));
    }

    #[tokio::test]
    async fn test_remove_returns_record_and_clears_children() {
        let repo = repository().await;
        let rec = record("device", "1.0.0");
        repo.add_model(rec.clone()).await.unwrap();

        let removed = repo.remove_model(&rec.identity).await.unwrap();
        assert_eq!(removed, rec);
        assert!(repo.get_model(&rec.identity).await.unwrap_err().is_not_found());

        // Re-adding works, so no orphaned child rows were left behind.
        repo.add_model(rec.clone()).await.unwrap();
        assert_eq!(repo.get_model(&rec.identity).await.unwrap().modules.len(), 2);
    }

    #[tokio::test]
    async fn test_remove_missing_is_not_found() {
        let repo = repository().await;
        let id = ModelIdentity::parse("x", "1.0").unwrap();
        assert!(repo.remove_model(&id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_list_models_snapshot() {
        let repo = repository().await;
        repo.add_model(record("zeta", "1.0")).await.unwrap();
        repo.add_model(record("alpha", "1.0")).await.unwrap();

        let listed = repo.list_models().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].identity.name.as_str(), "alpha");
        assert_eq!(listed[1].identity.name.as_str(), "zeta");
        assert_eq!(listed[1].modules.len(), 2);
    }

    #[tokio::test]
    async fn test_find_by_artifact() {
        let repo = repository().await;
        let rec = record("device", "2.0");
        repo.add_model(rec.clone()).await.unwrap();

        let found = repo.find_by_artifact("device-2.0.so").await.unwrap();
        assert_eq!(found, Some(rec));
        assert!(repo.find_by_artifact("other-1.0.so").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("models.db").display());
        let rec = record("device", "1.0.0");

        {
            let pool = create_pool(&PoolConfig::new(&url)).await.unwrap();
            SqliteModelRepository::new(pool.clone())
                .add_model(rec.clone())
                .await
                .unwrap();
            pool.close().await;
        }

        let pool = create_pool(&PoolConfig::new(&url)).await.unwrap();
        let repo = SqliteModelRepository::new(pool);
        assert_eq!(repo.get_model(&rec.identity).await.unwrap(), rec);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_reads_never_see_partial_records() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("models.db").display());
        let pool = create_pool(&PoolConfig::new(&url).max_connections(4)).await.unwrap();
        let repo = SqliteModelRepository::new(pool);
        let rec = record("device", "1.0.0");

        let writer = {
            let repo = repo.clone();
            let rec = rec.clone();
            tokio::spawn(async move {
                for _ in 0..50 {
                    repo.add_model(rec.clone()).await.unwrap();
                    repo.remove_model(&rec.identity).await.unwrap();
                }
            })
        };

        while !writer.is_finished() {
            match repo.get_model(&rec.identity).await {
                Ok(fetched) => assert_eq!(fetched, rec),
                Err(err) => assert!(err.is_not_found(), "unexpected error: {}", err),
            }
            if let Some(found) = repo.find_by_artifact("device-1.0.0.so").await.unwrap() {
                assert_eq!(found, rec);
            }
        }
        writer.await.unwrap();
    }
}
