//! Application bootstrap: database, migrations, modules, and HTTP server.

use anyhow::Context;
use axum::Router;
use bookshelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};
use sqlx::SqlitePool;

use crate::modules;

/// A bootstrapped application: migrated database plus initialized modules.
pub struct App {
    settings: Settings,
    pool: SqlitePool,
    registry: ModuleRegistry,
}

impl App {
    /// Connect to the configured database and bootstrap on top of it.
    pub async fn bootstrap(settings: Settings) -> anyhow::Result<Self> {
        let pool = bookshelf_db::connect(&settings.database).await?;
        Self::with_pool(settings, pool).await
    }

    /// Run migrations and initialize modules against an existing pool.
    pub async fn with_pool(settings: Settings, pool: SqlitePool) -> anyhow::Result<Self> {
        let registry = module_registry();

        let applied = bookshelf_db::migrate(&pool, &registry.collect_migrations())
            .await
            .context("failed to run migrations")?;
        tracing::info!(applied, "migrations complete");

        let app = Self {
            settings,
            pool,
            registry,
        };
        app.registry.init_modules(&app.ctx()).await?;

        Ok(app)
    }

    fn ctx(&self) -> InitCtx<'_> {
        InitCtx {
            settings: &self.settings,
            db: &self.pool,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// The full HTTP router: module routes, fallbacks, and global layers.
    pub fn router(&self) -> Router {
        bookshelf_http::build_router(&self.registry, &self.ctx())
    }

    /// Start modules, serve until ctrl-c, then stop modules and close the pool.
    pub async fn serve(self) -> anyhow::Result<()> {
        let ctx = self.ctx();
        self.registry.start_modules(&ctx).await?;

        let served = bookshelf_http::start_server(&self.registry, &ctx).await;

        self.registry.stop_modules().await?;
        self.pool.close().await;
        tracing::info!("bookshelf shut down");

        served
    }
}

/// Every module this application ships with.
pub fn module_registry() -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry);
    registry
}

/// Bootstrap and serve.
pub async fn serve(settings: &Settings) -> anyhow::Result<()> {
    App::bootstrap(settings.clone()).await?.serve().await
}

/// Apply pending migrations and return how many ran.
pub async fn migrate(settings: &Settings) -> anyhow::Result<usize> {
    let pool = bookshelf_db::connect(&settings.database).await?;
    let applied = bookshelf_db::migrate(&pool, &module_registry().collect_migrations()).await?;
    pool.close().await;
    Ok(applied)
}
