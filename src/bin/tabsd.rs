// Copyright (C) 2025-2026 Michael Herstine <sp1ff@pobox.com>
//
// This file is part of tabs.
//
// tabs is free software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// tabs is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without
// even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
// General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with tabs.  If not,
// see <http://www.gnu.org/licenses/>.

//! # tabsd
//!
//! The tabs server: a small HTTP daemon fronting a per-user tab store backed by SQLite.
//!
//! Most configuration is read from file (versioned TOML); the few command-line options it
//! accepts govern where to find that file & how to log, and all have corresponding environment
//! variables for the sake of convenience when running in a container. The process runs in the
//! foreground; SIGHUP makes it re-read its configuration & SIGTERM shuts it down gracefully.

use std::{
    env,
    future::IntoFuture,
    io,
    net::SocketAddr,
    path::PathBuf,
    str::FromStr,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use axum::{Router, routing::get};
use clap::{Arg, ArgAction, Command, crate_authors, crate_version, value_parser};
use http::{HeaderName, HeaderValue};
use secrecy::SecretString;
use serde::Deserialize;
use snafu::{ResultExt, Snafu};
use tap::Pipe;
use tokio::{
    net::TcpListener,
    signal::unix::{SignalKind, signal},
    sync::Notify,
};
use tower_http::{
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, error, info};
use tracing_subscriber::{Layer, Registry, filter::EnvFilter, fmt, layer::SubscriberExt};

use tabs::{api::make_router as make_api_router, sqlite::Store, tabs::Tabs};

/// The tabsd application error type
///
/// Note that I do not derive the [Debug] trait for this error. This is because `main()` returns
/// `Result<(), Error>`; should the `Err` variant be returned, the Rust runtime uses the `Debug`
/// implementation to produce an error message on stderr, and the derived implementation is not
/// very readable. Therefore, I'm implementing it "by hand" in terms of `Display`.
#[derive(Snafu)]
pub enum Error {
    #[snafu(display("Failed to bind to {address}: {source}"))]
    Bind {
        address: SocketAddr,
        source: std::io::Error,
    },
    #[snafu(display("Unable to read configuration file: {source}"))]
    ConfigNotFound {
        pth: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Error parsing configuration file: {source}"))]
    ConfigParse {
        pth: PathBuf,
        source: toml::de::Error,
    },
    #[snafu(display("Failed to parse RUST_LOG: {source}"))]
    EnvFilter {
        source: tracing_subscriber::filter::FromEnvError,
    },
    #[snafu(display("While serving: {source}"))]
    Serve { source: std::io::Error },
    #[snafu(display("While opening the tab store: {source}"))]
    Sqlite { source: tabs::sqlite::Error },
    #[snafu(display("Failed to set the tracing subscriber: {source}"))]
    Subscriber {
        source: tracing::subscriber::SetGlobalDefaultError,
    },
    #[snafu(display("Failed to instantiate a Tokio runtime: {source}"))]
    TokioRuntime { source: std::io::Error },
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self, f)
    }
}

type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                    command-line interface                                      //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Logging-related options read from the command line or the environment
struct LogOpts {
    pub plain: bool,
    pub level: Level,
}

impl LogOpts {
    fn new(matches: &clap::ArgMatches) -> LogOpts {
        LogOpts {
            plain: matches.get_flag("plain"),
            level: match (
                matches.get_flag("debug"),
                matches.get_flag("verbose"),
                matches.get_flag("quiet"),
            ) {
                (true, _, _) => Level::TRACE,
                (false, true, _) => Level::DEBUG,
                (false, false, true) => Level::ERROR,
                (_, _, _) => Level::INFO,
            },
        }
    }
}

/// Configuration options read from the CLI (or the environment)
struct CliOpts {
    pub log_opts: LogOpts,
    pub cfg: Option<PathBuf>,
}

impl CliOpts {
    fn new(matches: clap::ArgMatches) -> Result<CliOpts> {
        let here = env::current_dir().ok();
        Ok(CliOpts {
            log_opts: LogOpts::new(&matches),
            cfg: matches.get_one::<PathBuf>("config").cloned().map(|p| {
                match &here {
                    Some(here) => here.join(&p),
                    None => p,
                }
            }),
        })
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                         configuration                                          //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// tabs configuration, version one
// Nb that we can only deserialize (i.e. not serialize) due to the presence of the salt in the
// struct
#[derive(Clone, Debug, Deserialize)]
struct ConfigV1 {
    /// Local address at which to listen; specify as "address:port"
    address: SocketAddr,
    /// Path to the SQLite database file (created on first use)
    db: PathBuf,
    /// The shared secret from which per-user tokens are derived
    salt: SecretString,
}

impl Default for ConfigV1 {
    fn default() -> Self {
        ConfigV1 {
            address: "0.0.0.0:8845".parse::<SocketAddr>().unwrap(/* known good */),
            db: PathBuf::from_str("db.sqlite3").unwrap(/* known good */),
            salt: SecretString::from("tabs"),
        }
    }
}

#[derive(Deserialize)]
#[serde(tag = "version")] // tag "internally"
enum Configuration {
    #[serde(rename = "1")]
    V1(ConfigV1),
}

/// Parse the tabs configuration file
///
/// If no path was given, try `/etc/tabs.toml` & fall back to the defaults should it not exist;
/// an explicitly-given path that can't be read is an error.
fn parse_config(cfg: &Option<PathBuf>) -> Result<ConfigV1> {
    use snafu::IntoError;
    let (pth, defaulted): (PathBuf, bool) = cfg.as_ref().map_or_else(
        || (PathBuf::from_str("/etc/tabs.toml").unwrap(), true),
        |p| (p.clone(), false),
    );
    match std::fs::read_to_string(&pth) {
        Ok(text) => match toml::from_str::<Configuration>(&text) {
            Ok(cfg) => match cfg {
                Configuration::V1(cfg) => Ok(cfg),
            },
            Err(err) => Err(ConfigParseSnafu { pth }.into_error(err)),
        },
        Err(err) => {
            if defaulted {
                Ok(ConfigV1::default())
            } else {
                Err(ConfigNotFoundSnafu { pth }.into_error(err))
            }
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                            logging                                             //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Build the tracing layer & filter for process-wide logging
///
/// Structured (JSON) output by default, human-readable with `--plain`; either way to stdout.
/// `json()` & `compact()` produce `Layer` instances *of different types*, hence the
/// `Box<dyn Layer<Registry> + Send + Sync>`.
fn configure_logging(
    logopts: &LogOpts,
) -> Result<(Box<dyn Layer<Registry> + Send + Sync>, EnvFilter)> {
    let filter = EnvFilter::builder()
        .with_default_directive(logopts.level.into())
        .from_env()
        .context(EnvFilterSnafu)?;
    let formatter: Box<dyn Layer<Registry> + Send + Sync> = if logopts.plain {
        Box::new(fmt::Layer::default().compact().with_writer(io::stdout))
    } else {
        Box::new(
            fmt::Layer::default()
                .json()
                .with_current_span(true)
                .with_writer(io::stdout),
        )
    };
    Ok((formatter, filter))
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                          application                                           //
////////////////////////////////////////////////////////////////////////////////////////////////////

async fn healthcheck() -> &'static str {
    "GOOD"
}

/// Generate request IDs by just counting up from zero
///
/// Sequential request IDs are readable in a way UUIDs are not, and a useful gauge of how long
/// the server's been up.
#[derive(Clone, Debug, Default)]
struct RequestIdGenerator {
    counter: Arc<AtomicU64>,
}

impl MakeRequestId for RequestIdGenerator {
    fn make_request_id<B>(&mut self, _request: &axum::extract::Request<B>) -> Option<RequestId> {
        self.counter
            .fetch_add(1, Ordering::SeqCst)
            .to_string()
            .pipe(|s| RequestId::new(HeaderValue::from_str(&s).unwrap(/* known good */)))
            .pipe(Some)
    }
}

/// Make the complete [Router]: the `/api` routes plus `/healthcheck`
fn make_app(state: Arc<Tabs>) -> Router {
    Router::new()
        .route("/healthcheck", get(healthcheck))
        .merge(make_api_router(state))
        // We want incoming requests to hit the `SetRequestIdLayer` *first*, so it must be the
        // last/outer layer we apply (layers wrap whatever's been built up so far).
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            "x-request-id",
        )))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static("x-request-id"),
            RequestIdGenerator::default(),
        ))
}

/// Serve tabs API requests
async fn serve(opts: CliOpts, mut cfg: ConfigV1) -> Result<()> {
    // Produce a future which can be used to signal graceful shutdown, below.
    async fn shutdown_signal(nfy: Arc<Notify>) {
        nfy.notified().await
    }

    let mut sighup = signal(SignalKind::hangup()).context(ServeSnafu)?;
    let mut sigterm = signal(SignalKind::terminate()).context(ServeSnafu)?;

    loop {
        let storage = Arc::new(Store::new(&cfg.db).await.context(SqliteSnafu)?);
        let state = Arc::new(Tabs::new(storage, cfg.salt.clone()));

        let nfy = Arc::new(Notify::new());
        let server = axum::serve(
            TcpListener::bind(cfg.address)
                .await
                .context(BindSnafu {
                    address: cfg.address,
                })?,
            make_app(state),
        )
        .with_graceful_shutdown(shutdown_signal(nfy.clone()));

        info!("tabs listening on {}", cfg.address);

        let mut server = std::pin::pin!(server.into_future());

        tokio::select! {
            // Intentionally not handling this-- the server *should* never shutdown on its own.
            res = &mut server => {
                error!("The server exited early with {:?}; shutting-down.", res);
                break;
            },
            _ = sighup.recv() => {
                info!("Received SIGHUP; re-reading configuration.");
                nfy.notify_one();
                if let Err(err) = server.await {
                    error!("{:?}", err);
                }
                // Re-read our configuration; on failure, keep the old.
                cfg = match parse_config(&opts.cfg) {
                    Ok(cfg) => cfg,
                    Err(err) => {
                        error!("Failed to re-read configuration ({}); keeping the old.", err);
                        cfg
                    }
                };
            },
            _ = sigterm.recv() => {
                info!("Received SIGTERM; terminating.");
                nfy.notify_one();
                if let Err(err) = server.await {
                    error!("{:?}", err);
                }
                break;
            },
        }; // End tokio::select!.
    } // End loop.

    Ok(())
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                    main() & process startup                                    //
////////////////////////////////////////////////////////////////////////////////////////////////////

async fn go_async(opts: CliOpts) -> Result<()> {
    let cfg = parse_config(&opts.cfg)?;
    let (formatter, filter) = configure_logging(&opts.log_opts)?;
    tracing::subscriber::set_global_default(Registry::default().with(formatter).with(filter))
        .context(SubscriberSnafu)?;
    serve(opts, cfg).await
}

fn cli() -> Command {
    Command::new("tabsd")
        .version(crate_version!())
        .author(crate_authors!())
        .about("A personal tab store over HTTP")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .num_args(1)
                .value_parser(value_parser!(PathBuf))
                .env("TABS_CONFIG")
                .help(
                    "path (absolute or relative to the process' current directory) to a \
                   configuration file",
                ),
        )
        .arg(
            Arg::new("debug")
                .short('D')
                .long("debug")
                .num_args(0)
                .action(ArgAction::SetTrue)
                .env("TABS_DEBUG")
                .help("produce debug output"),
        )
        .arg(
            Arg::new("plain")
                .short('p')
                .long("plain")
                .num_args(0)
                .action(ArgAction::SetTrue)
                .env("TABS_PLAIN")
                .help("log in human-readable format, not JSON/structured logging"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .num_args(0)
                .action(ArgAction::SetTrue)
                .env("TABS_QUIET")
                .help("produce only error output"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .num_args(0)
                .action(ArgAction::SetTrue)
                .env("TABS_VERBOSE")
                .help("produce prolix output"),
        )
}

fn main() -> Result<()> {
    let opts = CliOpts::new(cli().get_matches())?;

    tokio::runtime::Runtime::new()
        .context(TokioRuntimeSnafu)?
        .block_on(go_async(opts))
}
