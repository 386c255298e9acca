//! Skiff — a scriptable mini web server with a WebSocket event bridge.
//!
//! Serves static files out of a webroot, runs script-extension requests
//! through a pluggable engine, and turns WebSocket events into synthetic
//! requests against the same engine.
//!
//! Usage:
//!   skiff                                  # Serve CWD on port 8080
//!   skiff --port 9090 --webroot ./site     # Custom port and webroot
//!   skiff --rewrites                       # Framework rewrites to index.html
//!   skiff --health-check                   # Enable /health endpoints
//!   skiff config.json                      # Load settings from a JSON file

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context};
use clap::Parser;
use serde::Deserialize;
use skiff_bridge::ConnectionRegistry;
use skiff_core::{EngineError, ScriptEngine, ScriptRequest};
use skiff_http::{HealthOptions, PipelineConfig};
use skiff_transport::{TransportConfig, WebServer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "skiff", about = "Skiff — a scriptable mini web server")]
struct Cli {
    /// JSON configuration file (skiff.json in the CWD is picked up
    /// automatically)
    config: Option<PathBuf>,

    /// Port to listen on (0 for OS-assigned)
    #[arg(short, long, env = "SKIFF_PORT")]
    port: Option<u16>,

    /// Hostname to bind to
    #[arg(long, env = "SKIFF_HOST")]
    host: Option<String>,

    /// Directory to serve (defaults to the current directory)
    #[arg(short, long, env = "SKIFF_WEBROOT")]
    webroot: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, env = "SKIFF_DEBUG")]
    debug: bool,

    /// Enable framework rewrites, optionally naming the front controller
    #[arg(
        short,
        long,
        env = "SKIFF_REWRITES",
        num_args = 0..=1,
        default_missing_value = "index.html"
    )]
    rewrites: Option<String>,

    /// Enable the /health endpoints
    #[arg(long, env = "SKIFF_HEALTH_CHECK")]
    health_check: bool,

    /// Restrict detailed health output to loopback peers
    #[arg(long, env = "SKIFF_HEALTH_CHECK_SECURE")]
    health_check_secure: bool,

    /// Additional env file to load (a .env in the CWD is always loaded)
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Write logs to a file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

/// Settings read from the JSON configuration file. Anything given on the
/// command line or in the environment wins over these.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct FileConfig {
    port: Option<u16>,
    host: Option<String>,
    webroot: Option<PathBuf>,
    debug: Option<bool>,
    rewrites: Option<bool>,
    rewrite_file: Option<String>,
    health_check: Option<bool>,
    health_check_secure: Option<bool>,
    warmup_urls: Vec<String>,
}

/// Fully resolved configuration: CLI > environment > JSON file > defaults.
#[derive(Debug)]
struct Settings {
    port: u16,
    host: String,
    webroot: PathBuf,
    debug: bool,
    rewrite_file: Option<String>,
    health_check: bool,
    health_check_secure: bool,
    warmup_urls: Vec<String>,
}

fn resolve_settings(cli: &Cli, file: FileConfig) -> Settings {
    let rewrite_file = match (&cli.rewrites, file.rewrites) {
        (Some(f), _) => Some(f.clone()),
        (None, Some(true)) => Some(
            file.rewrite_file
                .clone()
                .unwrap_or_else(|| "index.html".to_string()),
        ),
        _ => None,
    };
    Settings {
        port: cli.port.or(file.port).unwrap_or(8080),
        host: cli
            .host
            .clone()
            .or(file.host)
            .unwrap_or_else(|| "0.0.0.0".to_string()),
        webroot: cli
            .webroot
            .clone()
            .or(file.webroot)
            .unwrap_or_else(|| PathBuf::from(".")),
        debug: cli.debug || file.debug.unwrap_or(false),
        rewrite_file,
        health_check: cli.health_check || file.health_check.unwrap_or(false),
        health_check_secure: cli.health_check_secure || file.health_check_secure.unwrap_or(false),
        warmup_urls: file.warmup_urls,
    }
}

/// Load `KEY=VALUE` lines from an env file into the process environment.
/// Existing variables are not overwritten.
fn load_env_file(path: &Path) -> std::io::Result<usize> {
    let contents = std::fs::read_to_string(path)?;
    let mut loaded = 0;
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            let value = value.trim().trim_matches('"');
            if std::env::var_os(key).is_none() {
                // Only called at startup, before any worker threads exist.
                unsafe { std::env::set_var(key, value) };
                loaded += 1;
            }
        }
    }
    Ok(loaded)
}

// ─────────────────────────────────────────────────────────────────────────────
// Demo engine
// ─────────────────────────────────────────────────────────────────────────────

/// Built-in engine for trying the server without a real scripting runtime.
///
/// HTTP requests to `*.echo` get a small report page; socket events are
/// greeted on connect and echoed back through the registry.
struct EchoEngine {
    registry: Arc<ConnectionRegistry>,
    extensions: Vec<String>,
}

impl EchoEngine {
    fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            registry,
            extensions: vec!["echo".to_string()],
        }
    }
}

impl ScriptEngine for EchoEngine {
    fn handle(&self, request: &ScriptRequest, out: &mut dyn Write) -> Result<(), EngineError> {
        if let Some(attachment) = &request.attachment {
            match request.query_param("eventType") {
                Some("Connect") => {
                    self.registry
                        .send_text(&attachment.connection, "hello from skiff");
                }
                Some("TextMessage") => {
                    if let Some(text) = attachment.payload.as_ref().and_then(|p| p.as_text()) {
                        self.registry
                            .send_text(&attachment.connection, format!("echo: {text}"));
                    }
                }
                Some("BinaryMessage") => {
                    let len = attachment
                        .payload
                        .as_ref()
                        .map_or(0, |p| p.as_bytes().len());
                    self.registry
                        .send_text(&attachment.connection, format!("echo: {len} bytes"));
                }
                _ => {}
            }
            return Ok(());
        }

        writeln!(out, "<html><body><h1>skiff echo</h1>")?;
        writeln!(out, "<p>{} {}</p>", request.method, request.target)?;
        writeln!(out, "</body></html>")?;
        Ok(())
    }

    fn extensions(&self) -> &[String] {
        &self.extensions
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Startup
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let started = Instant::now();

    // A .env in the CWD is loaded before argument parsing so SKIFF_* vars
    // from it feed the CLI's env fallbacks.
    let default_env = Path::new(".env");
    if default_env.is_file() {
        let _ = load_env_file(default_env);
    }

    let cli = Cli::parse();

    if let Some(ref env_file) = cli.env_file {
        let loaded = load_env_file(env_file)
            .with_context(|| format!("failed to load env file {}", env_file.display()))?;
        eprintln!("Loaded {loaded} variables from {}", env_file.display());
    }

    // JSON config: explicit positional argument, or skiff.json in the CWD.
    let config_path = cli
        .config
        .clone()
        .or_else(|| Path::new("skiff.json").is_file().then(|| PathBuf::from("skiff.json")));
    let file_config = match &config_path {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("invalid config file {}", path.display()))?
        }
        None => FileConfig::default(),
    };
    let settings = resolve_settings(&cli, file_config);

    let filter = if settings.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    if let Some(ref log_path) = cli.log_file {
        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
            .with_context(|| format!("failed to open log file {}", log_path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .init();
        eprintln!("Logging to {}", log_path.display());
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let webroot = settings
        .webroot
        .canonicalize()
        .with_context(|| format!("webroot {} does not exist", settings.webroot.display()))?;
    if !webroot.is_dir() {
        bail!("webroot {} is not a directory", webroot.display());
    }
    std::fs::read_dir(&webroot)
        .with_context(|| format!("webroot {} is not readable", webroot.display()))?;

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                            Skiff                             ║");
    println!("║               scriptable mini web server                     ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    println!("  Webroot:    {}", webroot.display());
    println!("  Binding:    {}:{}", settings.host, settings.port);
    match &settings.rewrite_file {
        Some(file) => println!("  Rewrites:   enabled (front controller: /{file})"),
        None => println!("  Rewrites:   disabled"),
    }
    if settings.health_check {
        let mode = if settings.health_check_secure {
            " (secure)"
        } else {
            ""
        };
        println!("  Health:     /health enabled{mode}");
    }
    if let Some(path) = &config_path {
        println!("  Config:     {}", path.display());
    }
    println!();

    let registry = Arc::new(ConnectionRegistry::new());
    let shutdown = Arc::new(AtomicBool::new(false));
    let engine = Arc::new(EchoEngine::new(registry.clone()));

    let transport = TransportConfig {
        host: settings.host.clone(),
        port: settings.port,
        ..TransportConfig::default()
    };
    let pipeline = PipelineConfig {
        webroot,
        rewrite_file: settings.rewrite_file.clone(),
        health: HealthOptions {
            enabled: settings.health_check,
            secure: settings.health_check_secure,
        },
    };

    let mut server = WebServer::start(
        transport,
        pipeline,
        engine,
        registry.clone(),
        shutdown.clone(),
    )
    .await
    .context("failed to start server")?;

    let port = server.port();
    println!("  Server running at http://{}:{port}/", settings.host);
    println!("  WebSocket endpoint at ws://{}:{port}/ws", settings.host);
    println!("  Started in {}ms", started.elapsed().as_millis());
    println!();
    println!("  Press Ctrl+C to stop.");
    println!();

    warm_up(&settings.warmup_urls).await;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    println!();
    println!("  Shutting down...");
    // New socket events are suppressed from here on; in-flight script
    // invocations run to completion.
    shutdown.store(true, Ordering::SeqCst);
    server.stop().await;
    println!("  Server stopped.");
    Ok(())
}

/// Fire one GET at each configured warmup URL. Failures are logged, never
/// fatal.
async fn warm_up(urls: &[String]) {
    if urls.is_empty() {
        return;
    }
    let client = reqwest::Client::new();
    for url in urls {
        match client.get(url).send().await {
            Ok(response) => info!(%url, status = %response.status(), "warmup request done"),
            Err(e) => warn!(%url, error = %e, "warmup request failed"),
        }
    }
}
