use std::sync::Arc;

use anyhow::Context;
use axum_extra::extract::cookie::Key;

use datahub_api::{app, login::LoginManager, middleware::AuthState};
use datahub_auth::IdentityStore;
use datahub_infra::{InMemoryIdentityStore, PostgresIdentityStore, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    datahub_observability::init();

    let settings = Settings::from_env().context("invalid configuration")?;

    let store: Arc<dyn IdentityStore> = match &settings.database_url {
        Some(url) => Arc::new(PostgresIdentityStore::connect_lazy(url)?),
        None => {
            tracing::warn!("DATABASE_URL not set; using an empty in-memory identity store");
            Arc::new(InMemoryIdentityStore::new())
        }
    };

    let cookie_key = match &settings.secret_key {
        Some(secret) => Key::try_from(secret.as_bytes())
            .map_err(|e| anyhow::anyhow!("SECRET_KEY cannot sign cookies: {e:?}"))?,
        None => {
            tracing::warn!("SECRET_KEY not set; sessions will not survive a restart");
            Key::generate()
        }
    };

    let login = LoginManager::new(store, settings.abort_codes);
    let app = app::build_app(AuthState::new(login, cookie_key, settings.session_cookie_name.as_str()));

    let listener = tokio::net::TcpListener::bind(settings.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
