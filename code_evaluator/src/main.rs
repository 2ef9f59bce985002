use code_evaluator::config::Config;
use code_evaluator::orchestrator::Orchestrator;
use code_evaluator::runner::HttpCodingApi;
use code_evaluator::stash::ResultStash;
use code_evaluator::{AppState, routes};
use env_logger::Env;
use log::{error, info};
use std::process::exit;
use std::sync::Arc;
use std::time::Duration;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;
use utoipa_redoc::Redoc;
use utoipa_redoc::Servable;

#[derive(OpenApi)]
#[openapi(info(description = "API for running and submitting solutions to coding problems"))]
struct ApiDoc;

async fn run() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let config = envy::from_env::<Config>()?;

    let api = Arc::new(HttpCodingApi::new(
        config.base_url().parse()?,
        config.api_token.clone(),
        Duration::from_secs(config.request_grace_secs),
    ));
    let orchestrator = Orchestrator::new(
        api,
        config.use_judge0,
        config.execution_timeout_secs,
        Arc::new(ResultStash::default()),
    );

    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .routes(routes!(routes::open_attempt))
        .routes(routes!(routes::abandon_attempt))
        .routes(routes!(routes::edit_code))
        .routes(routes!(routes::set_language))
        .routes(routes!(routes::run_code))
        .routes(routes!(routes::submit_code))
        .routes(routes!(routes::confirm_submission))
        .routes(routes!(routes::cancel_submission))
        .routes(routes!(routes::reveal_hint))
        .routes(routes!(routes::last_result))
        .split_for_parts();

    let idle_timeout = Duration::from_secs(config.attempt_idle_secs);
    let state = AppState::new(orchestrator, idle_timeout);
    let attempts = state.attempts.clone();
    tokio::spawn(async move {
        let mut sweep = tokio::time::interval(
            idle_timeout.clamp(Duration::from_secs(1), Duration::from_secs(60)),
        );
        loop {
            sweep.tick().await;
            let evicted = attempts.evict_idle();
            if evicted > 0 {
                info!("Evicted {evicted} idle attempts");
            }
        }
    });

    info!(
        "Starting on port {} against {}",
        config.port, config.api_base_url
    );
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    axum::serve(
        listener,
        router
            .merge(Redoc::with_url("/redoc", api))
            .with_state(state),
    )
    .await?;

    Ok(())
}

fn main() {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(err) => {
            eprintln!("failed to start runtime: {err}");
            exit(1)
        }
    };

    if let Err(err) = rt.block_on(run()) {
        error!("{}", err);
        exit(1)
    }
}
