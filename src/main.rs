use std::{future::IntoFuture, process, sync::Arc};

use catalog_proxy::{
    application::{
        commerce::CommerceApi, error::AppError, products::ProductService, tokens::TokenManager,
    },
    cache::{CacheConfig, ProductCache, TokenCache},
    config::{self, FetchArgs},
    infra::{
        commerce::HttpCommerceApi,
        error::InfraError,
        http::{self, HttpState, RouterLayers},
        telemetry,
    },
};
use tokio::sync::Notify;
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
        .with_writer(std::io::stderr)
        .with_max_level(Level::ERROR)
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

    telemetry::init(&settings.logging)?;

    let products = build_product_service(&settings)?;

    match command {
        config::Command::Serve(_) => serve_http(&settings, products).await,
        config::Command::Fetch(args) => run_fetch(products, args).await,
    }
}

fn build_product_service(settings: &config::Settings) -> Result<ProductService, AppError> {
    let api: Arc<dyn CommerceApi> = Arc::new(HttpCommerceApi::new(&settings.upstream)?);
    let tokens = Arc::new(TokenManager::new(api.clone(), Arc::new(TokenCache::new())));

    Ok(ProductService::new(
        api,
        tokens,
        Arc::new(ProductCache::new()),
        &CacheConfig::from(&settings.cache),
        settings.upstream.cdn_base.as_str(),
    ))
}

async fn run_fetch(products: ProductService, args: FetchArgs) -> Result<(), AppError> {
    let product = products.product(&args.product_id).await?;
    let rendered = serde_json::to_string_pretty(&product)
        .map_err(|err| AppError::unexpected(format!("failed to render product: {err}")))?;
    println!("{rendered}");
    Ok(())
}

async fn serve_http(settings: &config::Settings, products: ProductService) -> Result<(), AppError> {
    let router = http::build_router(
        HttpState::new(products),
        RouterLayers::from(&settings.server),
    );

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(InfraError::from)?;
    info!(addr = %settings.server.addr, "listening");

    let shutdown = Arc::new(Notify::new());
    let drain = shutdown.clone();
    let mut server = tokio::spawn(
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { drain.notified().await })
            .into_future(),
    );

    tokio::select! {
        result = &mut server => return flatten_server_result(result),
        () = shutdown_signal() => {}
    }

    info!("shutdown signal received");
    shutdown.notify_one();

    match tokio::time::timeout(settings.server.graceful_shutdown, &mut server).await {
        Ok(result) => flatten_server_result(result),
        Err(_) => {
            warn!(
                timeout_secs = settings.server.graceful_shutdown.as_secs(),
                "graceful shutdown timed out; aborting open connections"
            );
            server.abort();
            Ok(())
        }
    }
}

fn flatten_server_result(
    result: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), AppError> {
    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(InfraError::from(err).into()),
        Err(err) => Err(AppError::unexpected(format!("server task failed: {err}"))),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
