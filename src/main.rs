//! CRM sync command line client
//!
//! Signs in against the local SQLite backend, loads the CRM data and prints a summary.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crm_sync::db::{self, Repository};
use crm_sync::{Config, LocalSession, Session, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting CRM sync client");
    tracing::info!("Remote: {}", config.remote_url);

    if config.remote_key.is_none() {
        tracing::warn!("No remote key configured (CRM_REMOTE_KEY)");
    }
    if !config.drafting_enabled() {
        tracing::warn!("No AI API key configured (CRM_AI_API_KEY). Drafting is disabled.");
    }

    // Initialize database
    let pool = db::init_database(&config.db_path()).await?;
    let repo = Repository::new(pool);

    let store = Store::new(Arc::new(repo.clone()), config.settings());
    let session = Arc::new(LocalSession::new(repo));

    let (Some(email), Some(password)) = (config.email.as_deref(), config.password.as_deref())
    else {
        tracing::error!("Set CRM_EMAIL and CRM_PASSWORD to sign in");
        return Ok(());
    };

    let identity = session.sign_in(email, password).await?;
    let report = store.load(identity).await;
    if !report.is_complete() {
        tracing::warn!(failures = report.failures.len(), "Some collections failed to load");
    }

    let settings = store.settings();
    println!("{}", settings.company_name);
    if let Some(user) = store.current_user() {
        println!("Signed in as {} <{}>", user.name, user.email);
    }

    println!();
    println!("Pipeline");
    for column in store.pipeline_board().columns {
        println!(
            "  {:<12} {:>4} leads  {:>12.2}",
            column.stage,
            column.count(),
            column.total_value()
        );
    }

    let metrics = store.dashboard();
    println!();
    println!("New leads:       {}", metrics.new_leads);
    println!("Won deals:       {}", metrics.won_deals);
    println!("Revenue:         {:.2}", metrics.revenue);
    println!("Conversion rate: {:.1}%", metrics.conversion_rate);
    println!("My open tasks:   {}", metrics.my_pending_tasks);

    println!();
    println!("Recent activity");
    for activity in store.activities() {
        let actor = store
            .user(&activity.user_id)
            .map(|u| u.name)
            .unwrap_or_else(|| "Someone".to_string());
        println!(
            "  {}  {} {}",
            activity.timestamp.format("%Y-%m-%d %H:%M"),
            actor,
            activity.action
        );
    }

    session.sign_out().await;
    store.clear();

    Ok(())
}
