// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;

use alarmdesk_api::Client;
use alarmdesk_app::{AppState, DateRange, PickerDate};
use alarmdesk_db::Store;
use anyhow::{Context, Result, anyhow, bail};
use config::Config;
use runtime::{ApiRuntime, DEMO_SEED, DemoRuntime};
use std::env;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use time::OffsetDateTime;
use tracing::info;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "ALARMDESK_LOG";
const PASSWORD_ENV: &str = "ALARMDESK_PASSWORD";

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let utc_offset = alarmdesk_app::local_offset();
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `alarmdesk --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    let db_path = if options.demo {
        PathBuf::from(":memory:")
    } else {
        config.db_path()?
    };
    if options.print_db_path {
        println!("{}", db_path.display());
        return Ok(());
    }

    let log_path = init_tracing(&config)?;
    info!(
        config = %options.config_path.display(),
        log = %log_path.display(),
        demo = options.demo,
        "starting alarmdesk"
    );

    if options.demo {
        let store = Store::open_memory()?;
        store.bootstrap()?;
        if options.check_only {
            return Ok(());
        }
        let mut state = initial_state(&config, &store, alarmdesk_app::today_at(utc_offset, 0))?;
        let now = OffsetDateTime::now_utc().to_offset(utc_offset);
        let mut runtime = DemoRuntime::new(&store, DEMO_SEED, now);
        return alarmdesk_tui::run_app(&mut state, &mut runtime);
    }

    let store = Store::open(&db_path).with_context(|| {
        format!(
            "open database {} -- if this path is wrong, set [storage].db_path or {}",
            db_path.display(),
            alarmdesk_db::DB_PATH_ENV
        )
    })?;
    store.bootstrap()?;

    if options.reset_settings {
        let removed = reset_settings(&store)?;
        println!("removed {removed} stored settings");
        return Ok(());
    }

    if options.logout {
        store.clear_session()?;
        println!("logged out");
        return Ok(());
    }

    let mut client = Client::new(config.api_base_url(), config.api_timeout()?).with_context(|| {
        format!(
            "invalid [api] config in {}; fix base_url/timeout values",
            options.config_path.display()
        )
    })?;

    if options.login {
        let username = login_username(&config, &store)?;
        let password = env::var(PASSWORD_ENV).map_err(|_| {
            anyhow!("set {PASSWORD_ENV} to the password for {username:?} and rerun `alarmdesk --login`")
        })?;
        let session = client.login(&username, &password)?;
        store.put_session_cookie(&session.cookie)?;
        store.put_username(&session.username)?;
        println!("logged in as {}", session.username);
        return Ok(());
    }

    if let Some(cookie) = store.session_cookie()? {
        client = client.with_session(cookie);
    }
    if options.check_only {
        println!("{}", check_summary(&client, &db_path));
        return Ok(());
    }
    if client.session().is_none() {
        bail!("not logged in -- set {PASSWORD_ENV} and run `alarmdesk --login`, or try `alarmdesk --demo`");
    }

    let mut state = initial_state(&config, &store, alarmdesk_app::today_at(utc_offset, 0))?;
    let mut runtime = ApiRuntime::new(client, &store, utc_offset);
    alarmdesk_tui::run_app(&mut state, &mut runtime)
}

/// Stored preferences win over the config defaults.
fn initial_state(config: &Config, store: &Store, today: PickerDate) -> Result<AppState> {
    let range = match store.history_range()? {
        Some(range) => range,
        None => DateRange::trailing_days(today, config.history_days()),
    };
    let mut state = AppState::new(config.start_screen(), range);
    state.query = store.last_query()?;
    Ok(state)
}

fn check_summary(client: &Client, db_path: &Path) -> String {
    let session = if client.session().is_some() {
        "stored"
    } else {
        "none"
    };
    format!(
        "api {} (timeout {}ms), database {}, session {session}",
        client.base_url(),
        client.timeout().as_millis(),
        db_path.display()
    )
}

fn login_username(config: &Config, store: &Store) -> Result<String> {
    if let Some(username) = config.username() {
        return Ok(username.to_owned());
    }
    store.username()?.ok_or_else(|| {
        anyhow!("no username to log in with; set [api].username in the config file")
    })
}

fn reset_settings(store: &Store) -> Result<usize> {
    let mut removed = 0;
    for key in store.keys()? {
        if store.remove(&key)? {
            removed += 1;
        }
    }
    Ok(removed)
}

fn init_tracing(config: &Config) -> Result<PathBuf> {
    let path = config.log_file()?;
    open_log_dir(&path)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open log file {}; set [log].file to a writable path", path.display()))?;

    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(config.log_filter()))
        .with_context(|| {
            format!(
                "invalid log filter {:?}; fix [log].filter or {LOG_ENV}",
                config.log_filter()
            )
        })?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|error| anyhow!("install log subscriber: {error}"))?;
    Ok(path)
}

fn open_log_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_db_path: bool,
    demo: bool,
    print_example: bool,
    login: bool,
    logout: bool,
    reset_settings: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_db_path: false,
        demo: false,
        print_example: false,
        login: false,
        logout: false,
        reset_settings: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--print-config-path" => options.print_config_path = true,
            "--print-path" => options.print_db_path = true,
            "--print-example-config" => options.print_example = true,
            "--demo" => options.demo = true,
            "--login" => options.login = true,
            "--logout" => options.logout = true,
            "--reset-settings" => options.reset_settings = true,
            "--check" => options.check_only = true,
            "--help" | "-h" => options.show_help = true,
            unknown => {
                bail!("unknown argument {unknown:?}; run with --help to see supported options");
            }
        }
    }

    if options.demo && (options.login || options.logout) {
        bail!("--demo runs without a server; drop --login/--logout");
    }

    Ok(options)
}

fn print_help() {
    println!("alarmdesk");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-path             Print resolved database path");
    println!("  --print-example-config   Print a config template");
    println!("  --demo                   Launch with generated incidents (no server)");
    println!("  --login                  Log in with {PASSWORD_ENV} and store the session");
    println!("  --logout                 Forget the stored session");
    println!("  --reset-settings         Remove every stored setting, session included");
    println!("  --check                  Validate config + DB + API settings");
    println!("  --help                   Show this help");
}
