//! 应用注册表：决定本次同步涉及哪些应用

use crate::dify::app::dao::AppDao;
use crate::dify::app::models::DifyApp;
use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, warn};

/// 应用注册表接口
#[async_trait]
pub trait AppRegistry: Send + Sync {
    /// 指定 `app_id` 时返回该有效应用（不存在或无效则为空），否则返回全部有效应用
    async fn apps_to_sync(&self, app_id: Option<&str>) -> Result<Vec<DifyApp>>;
}

/// 基于 SQLite `dify_apps` 表的注册表
pub struct SqliteAppRegistry {
    dao: AppDao,
}

impl SqliteAppRegistry {
    pub fn new(dao: AppDao) -> Self {
        Self { dao }
    }
}

#[async_trait]
impl AppRegistry for SqliteAppRegistry {
    async fn apps_to_sync(&self, app_id: Option<&str>) -> Result<Vec<DifyApp>> {
        match app_id {
            Some(id) => match self.dao.get_app_by_id(id).await? {
                Some(app) if app.valid => Ok(vec![app]),
                Some(_) => {
                    warn!("[AppRegistry] 应用 {} 已停用，跳过", id);
                    Ok(Vec::new())
                }
                None => {
                    debug!("[AppRegistry] 未找到应用 {}", id);
                    Ok(Vec::new())
                }
            },
            None => self.dao.get_valid_apps().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dify::db::create_sqlite_pool_with_migration;

    async fn setup() -> Result<SqliteAppRegistry> {
        let pool = create_sqlite_pool_with_migration("sqlite::memory:").await?;
        let dao = AppDao::new(pool);
        dao.upsert_app(&DifyApp::new("app-1", "One", "http://one", "k1"))
            .await?;
        dao.upsert_app(&DifyApp::new("app-2", "Two", "http://two", "k2"))
            .await?;
        let mut off = DifyApp::new("app-off", "Off", "http://off", "k3");
        off.valid = false;
        dao.upsert_app(&off).await?;
        Ok(SqliteAppRegistry::new(dao))
    }

    #[tokio::test]
    async fn test_all_valid_apps_without_filter() -> Result<()> {
        let registry = setup().await?;
        let apps = registry.apps_to_sync(None).await?;
        assert_eq!(apps.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_single_app_filter() -> Result<()> {
        let registry = setup().await?;

        let apps = registry.apps_to_sync(Some("app-2")).await?;
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].name, "Two");

        assert!(registry.apps_to_sync(Some("app-off")).await?.is_empty());
        assert!(registry.apps_to_sync(Some("nope")).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_hand_inserted_app_row_is_synced() -> Result<()> {
        let pool = create_sqlite_pool_with_migration("sqlite::memory:").await?;
        sqlx::query(
            "INSERT INTO dify_apps (id, name, base_url, api_key, valid) \
             VALUES ('app-1', 'Support Bot', 'https://api.dify.ai/v1', 'app-xxxxxxxx', 1)",
        )
        .execute(&pool)
        .await?;
        sqlx::query("INSERT INTO dify_apps (id, name) VALUES ('app-2', 'Defaults Only')")
            .execute(&pool)
            .await?;

        let registry = SqliteAppRegistry::new(AppDao::new(pool));
        let apps = registry.apps_to_sync(None).await?;

        assert_eq!(apps.len(), 2);
        let bot = apps.iter().find(|a| a.id == "app-1").unwrap();
        assert_eq!(bot.base_url, "https://api.dify.ai/v1");
        assert_eq!(bot.api_key, "app-xxxxxxxx");
        assert!(apps.iter().all(|a| a.valid));
        Ok(())
    }
}
