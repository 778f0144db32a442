use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the catalog-proxy binary.
#[derive(Debug, Parser)]
#[command(
    name = "catalog-proxy",
    version,
    about = "Caching proxy for commerce catalogue imagery"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "CATALOG_PROXY_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP proxy.
    Serve(Box<ServeArgs>),
    /// Fetch one product through the proxy pipeline and print the shaped JSON.
    Fetch(FetchArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Clone)]
pub struct FetchArgs {
    #[command(flatten)]
    pub upstream: UpstreamOverrides,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Product identifier to fetch.
    #[arg(value_name = "PRODUCT_ID")]
    pub product_id: String,
}

#[derive(Debug, Args, Default, Clone)]
pub struct UpstreamOverrides {
    /// Override the OAuth2 client id.
    #[arg(long = "upstream-client-id", value_name = "ID")]
    pub client_id: Option<String>,

    /// Override the commerce short code.
    #[arg(long = "upstream-short-code", value_name = "CODE")]
    pub short_code: Option<String>,

    /// Override the commerce organization id.
    #[arg(long = "upstream-organization-id", value_name = "ID")]
    pub organization_id: Option<String>,

    /// Override the OAuth2 scope string.
    #[arg(long = "upstream-scope", value_name = "SCOPE")]
    pub scope: Option<String>,

    /// Override the authorization endpoint URL.
    #[arg(long = "upstream-auth-url", value_name = "URL")]
    pub auth_url: Option<String>,

    /// Override the product API base URL.
    #[arg(long = "upstream-api-base", value_name = "URL")]
    pub api_base: Option<String>,

    /// Override the CDN base that image URLs are rewritten onto.
    #[arg(long = "upstream-cdn-base", value_name = "URL")]
    pub cdn_base: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub upstream: UpstreamOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Toggle permissive CORS.
    #[arg(
        long = "server-cors",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cors: Option<bool>,

    /// Toggle gzip response compression.
    #[arg(
        long = "server-compression",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub compression: Option<bool>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override how long shaped products are cached.
    #[arg(long = "cache-product-ttl-seconds", value_name = "SECONDS")]
    pub cache_product_ttl_seconds: Option<u64>,

    /// Serialize concurrent cache misses for the same product.
    #[arg(
        long = "cache-coalesce-inflight",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_coalesce_inflight: Option<bool>,
}
