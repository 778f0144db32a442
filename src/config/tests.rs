use super::*;

fn raw_with_upstream() -> RawSettings {
    let mut raw = RawSettings::default();
    raw.upstream.client_id = Some("client".to_string());
    raw.upstream.client_secret = Some("secret".to_string());
    raw.upstream.short_code = Some("q0u18r0g".to_string());
    raw.upstream.organization_id = Some("f_ecom_aazi_dev".to_string());
    raw
}

#[test]
fn defaults_resolve_with_required_upstream_fields() {
    let settings = Settings::from_raw(raw_with_upstream()).expect("valid settings");

    assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
    assert!(settings.server.cors);
    assert!(settings.server.compression);
    assert_eq!(settings.cache.product_ttl, Duration::from_secs(86_400));
    assert!(!settings.cache.coalesce_inflight);
    assert_eq!(settings.upstream.auth_url.as_str(), DEFAULT_AUTH_URL);
    assert_eq!(
        settings.upstream.api_base.as_str(),
        "https://q0u18r0g.api.commercecloud.salesforce.com/"
    );
    assert_eq!(
        settings.upstream.cdn_base.as_str(),
        "https://www.seedheritage.com/"
    );
    assert_eq!(settings.upstream.pool_max_idle_per_host, 4);
}

#[test]
fn scope_defaults_to_tenant_of_organization() {
    let settings = Settings::from_raw(raw_with_upstream()).expect("valid settings");
    assert_eq!(
        settings.upstream.scope,
        "SALESFORCE_COMMERCE_API:aazi_dev sfcc.products"
    );
}

#[test]
fn missing_credentials_are_rejected() {
    let mut raw = raw_with_upstream();
    raw.upstream.client_secret = Some("   ".to_string());

    let err = Settings::from_raw(raw).expect_err("secret required");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "upstream.client_secret",
            ..
        }
    ));
}

#[test]
fn secret_is_redacted_in_debug_output() {
    let settings = Settings::from_raw(raw_with_upstream()).expect("valid settings");
    let rendered = format!("{settings:?}");
    assert!(!rendered.contains("secret\""));
    assert!(rendered.contains("Secret(***)"));
    assert_eq!(settings.upstream.client_secret.expose(), "secret");
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = raw_with_upstream();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        port: Some(4321),
        log_level: Some("debug".to_string()),
        upstream: UpstreamOverrides {
            api_base: Some("http://127.0.0.1:9000".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.upstream.api_base.as_str(), "http://127.0.0.1:9000/");
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = raw_with_upstream();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn zero_ttl_is_rejected() {
    let mut raw = raw_with_upstream();
    raw.cache.product_ttl_seconds = Some(0);

    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "cache.product_ttl_seconds",
            ..
        })
    ));
}

#[test]
fn non_http_cdn_base_is_rejected() {
    let mut raw = raw_with_upstream();
    raw.upstream.cdn_base = Some("ftp://cdn.example.com".to_string());

    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["catalog-proxy"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "catalog-proxy",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--server-port",
        "8080",
        "--cache-coalesce-inflight",
        "yes",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(serve.overrides.port, Some(8080));
            assert_eq!(serve.overrides.cache_coalesce_inflight, Some(true));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_fetch_arguments() {
    let args = CliArgs::parse_from([
        "catalog-proxy",
        "fetch",
        "--upstream-short-code",
        "abc123",
        "P-100",
    ]);

    match args.command.expect("fetch command") {
        Command::Fetch(fetch) => {
            assert_eq!(fetch.product_id, "P-100");
            assert_eq!(fetch.upstream.short_code.as_deref(), Some("abc123"));
        }
        _ => panic!("wrong command parsed"),
    }
}

mod layered {
    use std::net::Ipv4Addr;

    use serial_test::serial;

    use super::*;

    const UPSTREAM_ENV: [(&str, &str); 4] = [
        ("CATALOG_PROXY__UPSTREAM__CLIENT_ID", "env-client"),
        ("CATALOG_PROXY__UPSTREAM__CLIENT_SECRET", "env-secret"),
        ("CATALOG_PROXY__UPSTREAM__SHORT_CODE", "envshort"),
        ("CATALOG_PROXY__UPSTREAM__ORGANIZATION_ID", "f_ecom_aazi_dev"),
    ];

    const TOUCHED_ENV: [&str; 8] = [
        "PORT",
        "CATALOG_PROXY_CONFIG_FILE",
        "CATALOG_PROXY__SERVER__PORT",
        "CATALOG_PROXY__SERVER__HOST",
        "CATALOG_PROXY__UPSTREAM__CLIENT_ID",
        "CATALOG_PROXY__UPSTREAM__CLIENT_SECRET",
        "CATALOG_PROXY__UPSTREAM__SHORT_CODE",
        "CATALOG_PROXY__UPSTREAM__ORGANIZATION_ID",
    ];

    /// Clears the variables `load` reads and restores a clean slate on drop.
    struct ScopedEnv;

    impl ScopedEnv {
        fn with(vars: &[(&str, &str)]) -> Self {
            clear();
            for &(key, value) in &UPSTREAM_ENV {
                set(key, value);
            }
            for &(key, value) in vars {
                set(key, value);
            }
            Self
        }
    }

    impl Drop for ScopedEnv {
        fn drop(&mut self) {
            clear();
        }
    }

    fn set(key: &str, value: &str) {
        // SAFETY: every test touching the environment is `#[serial]`.
        unsafe { std::env::set_var(key, value) };
    }

    fn clear() {
        for key in TOUCHED_ENV {
            // SAFETY: every test touching the environment is `#[serial]`.
            unsafe { std::env::remove_var(key) };
        }
    }

    fn load_args(args: &[&str]) -> Result<Settings, LoadError> {
        load(&CliArgs::parse_from(args))
    }

    #[test]
    #[serial]
    fn environment_layer_supplies_settings() {
        let _env = ScopedEnv::with(&[("CATALOG_PROXY__SERVER__PORT", "4100")]);

        let settings = load_args(&["catalog-proxy"]).expect("settings");

        assert_eq!(settings.server.addr.port(), 4100);
        assert_eq!(settings.upstream.client_id, "env-client");
        assert_eq!(settings.upstream.client_secret.expose(), "env-secret");
        assert_eq!(
            settings.upstream.api_base.as_str(),
            "https://envshort.api.commercecloud.salesforce.com/"
        );
    }

    #[test]
    #[serial]
    fn platform_port_is_reachable_on_every_interface() {
        let _env = ScopedEnv::with(&[("PORT", "8080")]);

        let settings = load_args(&["catalog-proxy"]).expect("settings");

        assert_eq!(settings.server.addr.port(), 8080);
        assert_eq!(settings.server.addr.ip(), Ipv4Addr::UNSPECIFIED);
    }

    #[test]
    #[serial]
    fn prefixed_port_wins_over_platform_port() {
        let _env = ScopedEnv::with(&[("PORT", "8080"), ("CATALOG_PROXY__SERVER__PORT", "4100")]);

        let settings = load_args(&["catalog-proxy"]).expect("settings");

        assert_eq!(settings.server.addr.port(), 4100);
    }

    #[test]
    #[serial]
    fn cli_port_wins_over_platform_port() {
        let _env = ScopedEnv::with(&[("PORT", "8080")]);

        let settings =
            load_args(&["catalog-proxy", "serve", "--server-port", "9090"]).expect("settings");

        assert_eq!(settings.server.addr.port(), 9090);
    }

    #[test]
    #[serial]
    fn unparseable_platform_port_is_rejected() {
        let _env = ScopedEnv::with(&[("PORT", "eighty")]);

        assert!(matches!(
            load_args(&["catalog-proxy"]),
            Err(LoadError::Invalid { key: "PORT", .. })
        ));
    }

    #[test]
    #[serial]
    fn missing_upstream_environment_is_reported() {
        let _env = ScopedEnv::with(&[]);
        // SAFETY: every test touching the environment is `#[serial]`.
        unsafe { std::env::remove_var("CATALOG_PROXY__UPSTREAM__CLIENT_ID") };

        assert!(matches!(
            load_args(&["catalog-proxy"]),
            Err(LoadError::Invalid {
                key: "upstream.client_id",
                ..
            })
        ));
    }
}
