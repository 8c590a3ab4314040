#![forbid(unsafe_code)]

use anyhow::Context;
use bollard_sdk::{Confirmation, ControlCommand, ControlSession, Error, SessionEvent};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

mod discover;
mod render;

use discover::{auto_discover, Overrides, TEMPLATE_BOLLARD_TOML};
use render::{emit, event_line, settings_lines, state_line, status_text, Format};

#[derive(Debug, Parser)]
#[command(name = "bollard-cli", version, about = "Bollard control command line interface")]
struct Cli {
	/// Service root URL (override). Default: http://127.0.0.1:8000
	#[arg(long, global = true)]
	base_url: Option<String>,
	/// Access token; sent as "Token <value>" unless it already names a scheme
	#[arg(long, global = true)]
	token: Option<String>,
	/// Request timeout in milliseconds
	#[arg(long, global = true)]
	timeout_ms: Option<u64>,
	/// Output format
	#[arg(long, global = true, value_enum, default_value_t = Format::Text)]
	format: Format,
	/// Debug logging on stderr
	#[arg(long, short, global = true)]
	verbose: bool,

	#[command(subcommand)]
	command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
	#[command(flatten)]
	Remote(RemoteCmd),
	/// Config helpers
	Config {
		#[command(subcommand)]
		action: ConfigCmd,
	},
}

/// Commands that talk to the service.
#[derive(Debug, Subcommand)]
enum RemoteCmd {
	/// Show bollard state and active settings
	Status,
	/// Show the live bollard state only
	State,
	/// Show the active detector settings
	Settings,
	/// Send a control action
	Control {
		/// open, close, auto, start-system or stop-system
		#[arg(value_parser = parse_command)]
		action: ControlCommand,
		/// Confirm a disruptive action (close, stop-system)
		#[arg(long, short)]
		yes: bool,
	},
	/// Validate and submit detector settings
	UpdateSettings {
		/// Percentage of the frame the target must occupy (1-100)
		#[arg(long)]
		occupy_ratio: String,
		/// Frames to hold the barrier after a detection (>= 1)
		#[arg(long)]
		maintain_frame: String,
		/// Target class label; left unchanged when omitted
		#[arg(long, default_value = "")]
		target_object: String,
	},
	/// Follow the bollard state until Ctrl-C
	Watch,
}

#[derive(Debug, Subcommand)]
enum ConfigCmd {
	/// Show effective config (resolved from file, env and flags)
	Show,
	/// Write a bollard.toml template
	WriteTemplate {
		/// Destination path (default: ./bollard.toml)
		#[arg(long)]
		path: Option<PathBuf>,
		/// Overwrite if the file exists
		#[arg(long)]
		force: bool,
	},
}

fn parse_command(s: &str) -> Result<ControlCommand, String> { s.parse() }

#[tokio::main(flavor = "multi_thread")]
async fn main() {
	let cli = Cli::parse();
	init_tracing(cli.verbose);
	if let Err(e) = run(cli).await {
		eprintln!("error: {e:#}");
		std::process::exit(exit_code(&e));
	}
}

fn init_tracing(verbose: bool) {
	let filter = if verbose {
		EnvFilter::new("debug")
	} else {
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
	};
	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false).init();
}

/// 2 for failures raised before any request was sent, 1 otherwise.
fn exit_code(e: &anyhow::Error) -> i32 {
	match e.downcast_ref::<Error>() {
		Some(err) if err.is_preflight() => 2,
		_ => 1,
	}
}

async fn run(cli: Cli) -> anyhow::Result<()> {
	let overrides = Overrides { base_url: cli.base_url, token: cli.token, timeout_ms: cli.timeout_ms };
	match cli.command {
		Commands::Config { action } => run_config(action, &overrides),
		Commands::Remote(cmd) => {
			let found = auto_discover(&overrides)?;
			let session = ControlSession::with_http(found.config)?;
			run_remote(cmd, &session, cli.format).await
		}
	}
}

async fn run_remote(cmd: RemoteCmd, session: &ControlSession, format: Format) -> anyhow::Result<()> {
	match cmd {
		RemoteCmd::Status => {
			let status = session.refresh_status().await?;
			emit(format, || status_text(&status), || json!(status));
		}
		RemoteCmd::State => {
			let state = session.refresh_state().await?;
			emit(format, || state_line(&state), || json!(state));
		}
		RemoteCmd::Settings => {
			let settings = session.refresh_settings().await?;
			emit(format, || settings_lines(&settings), || json!(settings));
		}
		RemoteCmd::Control { action, yes } => {
			let report = session.dispatch(action, Confirmation::from(yes)).await?;
			let refreshed = warn_refresh(&report.refresh);
			let status = session.status();
			emit(
				format,
				|| if refreshed { format!("{}\n{}", action.success_message(), status_text(&status)) } else { action.success_message().to_string() },
				|| json!({
					"command": action,
					"message": action.success_message(),
					"response": report.ack.message,
					"status": refreshed.then_some(&status),
				}),
			);
		}
		RemoteCmd::UpdateSettings { occupy_ratio, maintain_frame, target_object } => {
			session.edit_form(|f| {
				f.occupy_ratio = occupy_ratio;
				f.maintain_frame = maintain_frame;
				f.target_object = target_object;
			});
			let report = session.save_settings().await?;
			let refreshed = warn_refresh(&report.refresh);
			let status = session.status();
			emit(
				format,
				|| if refreshed { format!("settings saved\n{}", status_text(&status)) } else { "settings saved".to_string() },
				|| json!({ "saved": report.patch, "status": refreshed.then_some(&status) }),
			);
		}
		RemoteCmd::Watch => watch(session, format).await?,
	}
	Ok(())
}

/// The write went through; a failed follow-up refresh is only a warning.
fn warn_refresh(refresh: &bollard_sdk::Result<()>) -> bool {
	match refresh {
		Ok(()) => true,
		Err(e) => {
			eprintln!("warning: status refresh failed: {e}");
			false
		}
	}
}

async fn watch(session: &ControlSession, format: Format) -> anyhow::Result<()> {
	if !session.has_credential() {
		return Err(Error::NoCredential.into());
	}
	let mut rx = session.subscribe();
	session.activate().await?;
	let ctrl_c = tokio::signal::ctrl_c();
	tokio::pin!(ctrl_c);
	loop {
		tokio::select! {
			_ = &mut ctrl_c => break,
			ev = rx.recv() => match ev {
				Ok(SessionEvent::Failed(msg)) => eprintln!("warning: {msg}"),
				Ok(ev) => if let Some(line) = event_line(format, &ev) { println!("{line}") },
				Err(RecvError::Lagged(n)) => tracing::debug!(skipped = n, "watch fell behind"),
				Err(RecvError::Closed) => break,
			},
		}
	}
	session.deactivate();
	Ok(())
}

#[derive(Serialize)]
struct ConfigView {
	base_url: String,
	request_timeout_ms: u64,
	connect_timeout_ms: u64,
	poll_interval_ms: u64,
	token_present: bool,
	config_file: Option<String>,
}

fn run_config(action: ConfigCmd, overrides: &Overrides) -> anyhow::Result<()> {
	match action {
		ConfigCmd::Show => {
			let found = auto_discover(overrides)?;
			let cfg = found.config;
			let view = ConfigView {
				base_url: cfg.base_url,
				request_timeout_ms: cfg.request_timeout_ms,
				connect_timeout_ms: cfg.connect_timeout_ms,
				poll_interval_ms: cfg.poll_interval_ms,
				token_present: cfg.token.is_some(),
				config_file: found.source.map(|p| p.display().to_string()),
			};
			println!("{}", serde_json::to_string_pretty(&view)?);
		}
		ConfigCmd::WriteTemplate { path, force } => {
			let path = path.unwrap_or_else(|| PathBuf::from("bollard.toml"));
			if path.exists() && !force {
				eprintln!("refusing to overwrite existing file: {} (use --force)", path.display());
				std::process::exit(2);
			}
			if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
				std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
			}
			std::fs::write(&path, TEMPLATE_BOLLARD_TOML).with_context(|| format!("writing {}", path.display()))?;
			eprintln!("wrote {}", path.display());
		}
	}
	Ok(())
}
