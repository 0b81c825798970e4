use classroom_notifier::AppResources;
use classroom_notifier::api::start_webserver;
use classroom_notifier::config::{MailerBackend, load_config_or_panic};
use classroom_notifier::mailer::{Mailer, NoopMailer, SmtpMailer};
use classroom_notifier::notifications::queue::DispatchQueue;
use classroom_notifier::recipients::{RecipientSource, StaticRecipientSource};
use classroom_notifier::verification::issuer::CodeIssuer;
use classroom_notifier::verification::rate_limit::InMemoryRateLimitStore;
use std::env;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::time::{Duration, interval};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn initialize_standard_tracing() {
    let default_directives = "classroom_notifier=info,hyper=warn";
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    let registry = tracing_subscriber::registry().with(env_filter);
    let layer = fmt::layer().with_target(true).with_level(true);

    registry.with(layer).init();
}

fn is_debug_mode() -> bool {
    env::var("RUST_LOG").unwrap_or_default().contains("debug")
        || env::var("RUST_LOG").unwrap_or_default().contains("trace")
}

#[tokio::main]
async fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install().expect("Failed to install `color_eyre::install`");

    initialize_standard_tracing();

    // Load config
    let config = Arc::new(load_config_or_panic());

    // Set up the mail transport
    let mailer: Arc<dyn Mailer> = match config.mailer_backend {
        MailerBackend::Smtp => Arc::new(SmtpMailer::from_config(&config.smtp)?),
        MailerBackend::Noop => {
            tracing::warn!("Mailer backend is 'noop': outgoing email is logged and dropped");
            Arc::new(NoopMailer::default())
        }
    };

    // Group rosters for the recipient source
    let recipients: Arc<dyn RecipientSource> = match &config.roster_path {
        Some(path) => Arc::new(StaticRecipientSource::from_json_file(path)?),
        None => {
            tracing::warn!("No roster_path configured; dispatch requests will find no groups");
            Arc::new(StaticRecipientSource::new())
        }
    };

    let rate_limits = Arc::new(InMemoryRateLimitStore::new());
    let code_issuer = Arc::new(CodeIssuer::new(mailer.clone(), rate_limits));
    let dispatch_queue = Arc::new(DispatchQueue::new());

    // Start background sweep of expired challenges and stale rate-limit records
    {
        let issuer = code_issuer.clone();
        tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(300)); // 5 minutes
            loop {
                interval.tick().await;
                issuer.sweep_expired(OffsetDateTime::now_utc());
            }
        });
    }

    let debug_mode = is_debug_mode();

    // If debug mode, spawn periodic job stats logging task
    if debug_mode {
        let queue = dispatch_queue.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                let active_dispatch_jobs = queue.active_jobs().await.len();
                tracing::debug!(
                    target = "stats",
                    active_dispatch_jobs,
                    "Periodic stats"
                );
            }
        });
    }

    let resources = AppResources {
        mailer,
        recipients,
        dispatch_queue,
        code_issuer,
        config,
    };
    tracing::info!(
        backend = ?resources.config.mailer_backend,
        batch_size = resources.config.dispatch.batch_size,
        inter_batch_delay_ms = resources.config.dispatch.inter_batch_delay_ms,
        "dispatch configuration"
    );

    start_webserver(resources).await?;
    Ok(())
}
