use std::{fs, process, sync::Arc, time::Duration};

use gitpress::{
    application::{
        error::AppError,
        posts::PostService,
        repos::ContentStore,
        revalidate::{self, RevalidateError, RevalidateService, RevalidationPlan},
    },
    cache::{CacheTrigger, MemoryTagCache, RefreshConsumer, RefreshQueue, TagCache},
    config,
    infra::{
        error::InfraError,
        github::GitHubContentStore,
        http::{self, AppState},
        telemetry,
    },
};
use gitpress_api_types::WebhookPayload;
use tokio::{signal, sync::Notify, task::JoinHandle};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Plan(args) => run_plan(&settings, &args),
        config::Command::Sign(args) => run_sign(&settings, &args),
    }
}

struct ApplicationContext {
    state: AppState,
    trigger: Arc<CacheTrigger>,
}

fn build_application_context(settings: &config::Settings) -> Result<ApplicationContext, AppError> {
    let store: Arc<dyn ContentStore> = Arc::new(GitHubContentStore::new(&settings.content)?);
    let cache: Arc<dyn TagCache> = Arc::new(MemoryTagCache::new());

    let posts = Arc::new(
        PostService::new(store, cache.clone(), settings.content.layout.clone())
            .with_cache_enabled(settings.cache.enabled)
            .with_fetch_concurrency(settings.content.fetch_concurrency.get()),
    );

    let queue = Arc::new(RefreshQueue::new(settings.cache.refresh_queue_limit));
    let consumer = Arc::new(RefreshConsumer::new(
        settings.cache.clone(),
        queue.clone(),
        posts.clone(),
    ));
    let trigger = Arc::new(CacheTrigger::new(
        settings.cache.clone(),
        cache,
        queue,
        consumer,
    ));

    let revalidate = Arc::new(RevalidateService::new(
        settings.webhook.secret.clone(),
        settings.content.branch.clone(),
        settings.content.layout.clone(),
        trigger.clone(),
    ));

    Ok(ApplicationContext {
        state: AppState {
            posts,
            revalidate,
            max_body_bytes: settings.webhook.max_body_bytes.get(),
        },
        trigger,
    })
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    telemetry::init(&settings.logging)?;

    if settings.content.token.is_none() {
        warn!(
            target = "gitpress::startup",
            "no GitHub token configured; content requests are unauthenticated and rate limited"
        );
    }
    if settings.webhook.secret.is_none() {
        warn!(
            target = "gitpress::startup",
            "no webhook secret configured; every delivery will be rejected"
        );
    }

    let app = build_application_context(&settings)?;

    app.trigger.warmup_on_startup().await;

    let refresh_handle = spawn_refresh_loop(&app.trigger);
    let result = serve_http(&settings, app.state).await;

    if let Some(handle) = refresh_handle {
        handle.abort();
        let _ = handle.await;
    }

    result
}

fn spawn_refresh_loop(trigger: &Arc<CacheTrigger>) -> Option<JoinHandle<()>> {
    if !trigger.config().refresh_enabled() {
        return None;
    }

    let trigger = trigger.clone();
    let interval_ms = trigger.config().auto_consume_interval_ms.max(1);
    Some(tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(interval_ms));
        interval.tick().await;
        loop {
            interval.tick().await;
            trigger.consume_pending().await;
        }
    }))
}

async fn serve_http(settings: &config::Settings, state: AppState) -> Result<(), AppError> {
    let router = http::build_router(state);
    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(InfraError::from)?;

    info!(
        target = "gitpress::startup",
        addr = %settings.server.addr,
        branch = %settings.content.branch,
        repo = %format!("{}/{}", settings.content.owner, settings.content.repo),
        "Listening"
    );

    let stopping = Arc::new(Notify::new());
    let signalled = stopping.clone();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                signalled.notify_one();
            })
            .await
    });

    let grace = settings.server.graceful_shutdown;
    let outcome = tokio::select! {
        joined = &mut server => joined,
        _ = async {
            stopping.notified().await;
            tokio::time::sleep(grace).await;
        } => {
            warn!(
                target = "gitpress::shutdown",
                grace_seconds = grace.as_secs(),
                "in-flight requests did not finish in time; aborting"
            );
            server.abort();
            return Ok(());
        }
    };

    match outcome {
        Ok(Ok(())) => {
            info!(target = "gitpress::shutdown", "Server stopped");
            Ok(())
        }
        Ok(Err(err)) => Err(AppError::from(InfraError::from(err))),
        Err(err) => Err(AppError::unexpected(format!("server task failed: {err}"))),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!(target = "gitpress::shutdown", "Shutdown requested");
}

/// Print what a push payload would revalidate, without touching any cache.
fn run_plan(settings: &config::Settings, args: &config::PlanArgs) -> Result<(), AppError> {
    let raw = fs::read(&args.file).map_err(InfraError::from)?;
    let payload: WebhookPayload =
        serde_json::from_slice(&raw).map_err(RevalidateError::InvalidPayload)?;

    let tracked = revalidate::branch_ref(&settings.content.branch);
    if payload.git_ref != tracked {
        println!(
            "skipped: push to `{}` does not match tracked `{tracked}`",
            payload.git_ref
        );
        return Ok(());
    }

    let plan = RevalidationPlan::from_payload(&payload, &settings.content.layout);
    let tags = serde_json::to_string_pretty(&plan.revalidated_tags())
        .map_err(|err| AppError::unexpected(err.to_string()))?;
    println!("{plan}");
    println!("{tags}");
    Ok(())
}

/// Print the `X-Hub-Signature-256` value GitHub would send for a file.
fn run_sign(settings: &config::Settings, args: &config::SignArgs) -> Result<(), AppError> {
    let secret = settings
        .webhook
        .secret
        .as_deref()
        .ok_or(RevalidateError::NotConfigured)?;
    let body = fs::read(&args.file).map_err(InfraError::from)?;
    println!("{}", revalidate::sign(secret, &body));
    Ok(())
}
