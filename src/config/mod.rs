//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{fmt, net::SocketAddr, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

mod cli;

pub use cli::{CliArgs, Command, FetchArgs, ServeArgs, ServeOverrides, UpstreamOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "catalog-proxy";
const ENV_PREFIX: &str = "CATALOG_PROXY";
const PLATFORM_PORT_VAR: &str = "PORT";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 10;
const DEFAULT_AUTH_URL: &str = "https://account.demandware.com/dwsso/oauth2/access_token";
const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 4;
const DEFAULT_PRODUCT_TTL_SECS: u64 = 24 * 60 * 60;
const MAX_PRODUCT_TTL_SECS: u64 = 365 * 24 * 60 * 60;
const ORGANIZATION_PREFIX: &str = "f_ecom_";

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub upstream: UpstreamSettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
    pub cors: bool,
    pub compression: bool,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    pub client_id: String,
    pub client_secret: Secret,
    pub short_code: String,
    pub organization_id: String,
    pub scope: String,
    pub auth_url: Url,
    pub api_base: Url,
    pub cdn_base: Url,
    pub pool_max_idle_per_host: usize,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub product_ttl: Duration,
    pub coalesce_inflight: bool,
}

/// String whose value never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
///
/// The platform `PORT` variable is honoured when no file or prefixed
/// environment value sets `server.port`.
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    if raw.server.port.is_none() {
        raw.server.port = platform_port()?;
    }

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Fetch(args)) => raw.apply_fetch_overrides(args),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

fn platform_port() -> Result<Option<u16>, LoadError> {
    match std::env::var(PLATFORM_PORT_VAR) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|err| LoadError::invalid("PORT", format!("failed to parse: {err}"))),
        Err(_) => Ok(None),
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    upstream: RawUpstreamSettings,
    cache: RawCacheSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(cors) = overrides.cors {
            self.server.cors = Some(cors);
        }
        if let Some(compression) = overrides.compression {
            self.server.compression = Some(compression);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(seconds) = overrides.cache_product_ttl_seconds {
            self.cache.product_ttl_seconds = Some(seconds);
        }
        if let Some(coalesce) = overrides.cache_coalesce_inflight {
            self.cache.coalesce_inflight = Some(coalesce);
        }

        self.apply_upstream_overrides(&overrides.upstream);
    }

    fn apply_fetch_overrides(&mut self, args: &FetchArgs) {
        if let Some(level) = args.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        self.apply_upstream_overrides(&args.upstream);
    }

    fn apply_upstream_overrides(&mut self, overrides: &UpstreamOverrides) {
        if let Some(value) = overrides.client_id.as_ref() {
            self.upstream.client_id = Some(value.clone());
        }
        if let Some(value) = overrides.short_code.as_ref() {
            self.upstream.short_code = Some(value.clone());
        }
        if let Some(value) = overrides.organization_id.as_ref() {
            self.upstream.organization_id = Some(value.clone());
        }
        if let Some(value) = overrides.scope.as_ref() {
            self.upstream.scope = Some(value.clone());
        }
        if let Some(value) = overrides.auth_url.as_ref() {
            self.upstream.auth_url = Some(value.clone());
        }
        if let Some(value) = overrides.api_base.as_ref() {
            self.upstream.api_base = Some(value.clone());
        }
        if let Some(value) = overrides.cdn_base.as_ref() {
            self.upstream.cdn_base = Some(value.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            upstream,
            cache,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let upstream = build_upstream_settings(upstream)?;
        let cache = build_cache_settings(cache)?;

        Ok(Self {
            server,
            logging,
            upstream,
            cache,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
        cors: server.cors.unwrap_or(true),
        compression: server.compression.unwrap_or(true),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_upstream_settings(upstream: RawUpstreamSettings) -> Result<UpstreamSettings, LoadError> {
    let client_id = required(upstream.client_id, "upstream.client_id")?;
    let client_secret = Secret::new(required(
        upstream.client_secret,
        "upstream.client_secret",
    )?);
    let short_code = required(upstream.short_code, "upstream.short_code")?;
    let organization_id = required(upstream.organization_id, "upstream.organization_id")?;

    let scope = match non_empty(upstream.scope) {
        Some(scope) => scope,
        None => default_scope(&organization_id),
    };

    let auth_url = parse_url(
        upstream.auth_url.as_deref().unwrap_or(DEFAULT_AUTH_URL),
        "upstream.auth_url",
    )?;

    let api_base = match non_empty(upstream.api_base) {
        Some(base) => parse_url(&base, "upstream.api_base")?,
        None => parse_url(
            &format!("https://{short_code}.api.commercecloud.salesforce.com"),
            "upstream.short_code",
        )?,
    };

    let cdn_base = parse_url(
        upstream
            .cdn_base
            .as_deref()
            .unwrap_or(crate::domain::shaping::DEFAULT_CDN_BASE),
        "upstream.cdn_base",
    )?;

    let pool_max_idle_per_host = upstream
        .pool_max_idle_per_host
        .unwrap_or(DEFAULT_POOL_MAX_IDLE_PER_HOST);
    if pool_max_idle_per_host == 0 {
        return Err(LoadError::invalid(
            "upstream.pool_max_idle_per_host",
            "must be greater than zero",
        ));
    }

    Ok(UpstreamSettings {
        client_id,
        client_secret,
        short_code,
        organization_id,
        scope,
        auth_url,
        api_base,
        cdn_base,
        pool_max_idle_per_host,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let ttl_secs = cache.product_ttl_seconds.unwrap_or(DEFAULT_PRODUCT_TTL_SECS);
    if ttl_secs == 0 {
        return Err(LoadError::invalid(
            "cache.product_ttl_seconds",
            "must be greater than zero",
        ));
    }
    if ttl_secs > MAX_PRODUCT_TTL_SECS {
        return Err(LoadError::invalid(
            "cache.product_ttl_seconds",
            format!("must not exceed {MAX_PRODUCT_TTL_SECS}"),
        ));
    }

    Ok(CacheSettings {
        product_ttl: Duration::from_secs(ttl_secs),
        coalesce_inflight: cache.coalesce_inflight.unwrap_or(false),
    })
}

/// `SALESFORCE_COMMERCE_API:<tenant> sfcc.products`, tenant being the org id without `f_ecom_`.
fn default_scope(organization_id: &str) -> String {
    let tenant = organization_id
        .strip_prefix(ORGANIZATION_PREFIX)
        .unwrap_or(organization_id);
    format!("SALESFORCE_COMMERCE_API:{tenant} sfcc.products")
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
    cors: Option<bool>,
    compression: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Clone, Deserialize, Default)]
#[serde(default)]
struct RawUpstreamSettings {
    client_id: Option<String>,
    client_secret: Option<String>,
    short_code: Option<String>,
    organization_id: Option<String>,
    scope: Option<String>,
    auth_url: Option<String>,
    api_base: Option<String>,
    cdn_base: Option<String>,
    pool_max_idle_per_host: Option<usize>,
}

impl fmt::Debug for RawUpstreamSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawUpstreamSettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "***"))
            .field("short_code", &self.short_code)
            .field("organization_id", &self.organization_id)
            .field("scope", &self.scope)
            .field("auth_url", &self.auth_url)
            .field("api_base", &self.api_base)
            .field("cdn_base", &self.cdn_base)
            .field("pool_max_idle_per_host", &self.pool_max_idle_per_host)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    product_ttl_seconds: Option<u64>,
    coalesce_inflight: Option<bool>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn required(value: Option<String>, key: &'static str) -> Result<String, LoadError> {
    non_empty(value).ok_or_else(|| LoadError::invalid(key, "must be set"))
}

fn parse_url(value: &str, key: &'static str) -> Result<Url, LoadError> {
    let url = Url::parse(value.trim())
        .map_err(|err| LoadError::invalid(key, format!("invalid url `{value}`: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            key,
            format!("unsupported scheme `{}`", url.scheme()),
        ));
    }
    Ok(url)
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[cfg(test)]
mod tests;
