//! 应用数据访问层（DAO）

use crate::dify::app::models::DifyApp;
use anyhow::{Context, Result};
use sqlx::{sqlite::SqliteRow, Pool, Row, Sqlite};
use tracing::debug;

/// 应用 DAO（基于 sqlx）
#[derive(Clone)]
pub struct AppDao {
    db: Pool<Sqlite>,
}

impl AppDao {
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self { db }
    }

    fn row_to_app(row: SqliteRow) -> DifyApp {
        let valid: i64 = row.get("valid");
        DifyApp {
            id: row.get("id"),
            name: row.get("name"),
            base_url: row.get("base_url"),
            api_key: row.get("api_key"),
            valid: valid != 0,
        }
    }

    /// 插入或更新应用
    pub async fn upsert_app(&self, app: &DifyApp) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO dify_apps (id, name, base_url, api_key, valid)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                base_url = excluded.base_url,
                api_key = excluded.api_key,
                valid = excluded.valid
            "#,
        )
        .bind(&app.id)
        .bind(&app.name)
        .bind(&app.base_url)
        .bind(&app.api_key)
        .bind(if app.valid { 1 } else { 0 })
        .execute(&self.db)
        .await
        .context("插入或更新应用失败")?;
        Ok(())
    }

    /// 根据 ID 查询应用
    pub async fn get_app_by_id(&self, id: &str) -> Result<Option<DifyApp>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, base_url, api_key, valid
            FROM dify_apps
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("查询单个应用失败")?;

        Ok(row.map(Self::row_to_app))
    }

    /// 获取所有有效应用（按名称排序）
    pub async fn get_valid_apps(&self) -> Result<Vec<DifyApp>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, base_url, api_key, valid
            FROM dify_apps
            WHERE valid = 1
            ORDER BY name ASC, id ASC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("查询有效应用列表失败")?;

        let apps: Vec<DifyApp> = rows.into_iter().map(Self::row_to_app).collect();
        debug!("[AppDAO] 获取有效应用列表，共 {} 个", apps.len());
        Ok(apps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dify::db::create_sqlite_pool_with_migration;

    #[tokio::test]
    async fn test_upsert_and_list_valid_apps() -> Result<()> {
        let pool = create_sqlite_pool_with_migration("sqlite::memory:").await?;
        let dao = AppDao::new(pool);

        let mut disabled = DifyApp::new("app-b", "Beta", "http://b", "key-b");
        disabled.valid = false;
        dao.upsert_app(&DifyApp::new("app-z", "Zeta", "http://z", "key-z"))
            .await?;
        dao.upsert_app(&DifyApp::new("app-a", "Alpha", "http://a", "key-a"))
            .await?;
        dao.upsert_app(&disabled).await?;

        let ids: Vec<String> = dao
            .get_valid_apps()
            .await?
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec!["app-a", "app-z"]);

        let mut renamed = DifyApp::new("app-a", "Alpha 2", "http://a2", "key-a2");
        renamed.valid = false;
        dao.upsert_app(&renamed).await?;
        assert_eq!(dao.get_app_by_id("app-a").await?, Some(renamed));
        assert_eq!(dao.get_app_by_id("missing").await?, None);
        Ok(())
    }
}
