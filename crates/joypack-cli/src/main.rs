//! Joypack - MCP server installer
//!
//! Usage:
//!   joypack list                 # Catalog servers and their install state
//!   joypack install <name> -i    # Install, prompting for environment values
//!   joypack disable <name>       # Keep installed but turned off
//!   joypack uninstall <name>     # Remove registry entry and artifacts

mod interactive;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use console::style;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use joypack_core::catalog::{Catalog, ServerListing};
use joypack_core::context::AppContext;
use joypack_core::orchestration::Installer;
use joypack_core::process::SystemRunner;
use joypack_core::progress::{
    InstallationStep, ProgressBus, ProgressTracker, ServerProgress, StepStatus, Subscription,
};
use joypack_core::types::{EnvValues, EnvVarKind, ServerDescriptor};

use crate::interactive::{EnvForm, mask_value};

#[derive(Parser)]
#[command(name = "joypack")]
#[command(about = "Install and manage MCP servers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List catalog servers and their install state
    #[command(alias = "ls")]
    List {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Install a server from the catalog
    Install(EnvArgs),

    /// Remove a server and its files
    #[command(alias = "rm")]
    Uninstall {
        name: String,
    },

    /// Enable an installed server
    Enable {
        name: String,
    },

    /// Disable an installed server without removing it
    Disable {
        name: String,
    },

    /// Flip an installed server between enabled and disabled
    Toggle {
        name: String,
    },

    /// Update the environment of an installed server
    Configure(EnvArgs),

    /// Show the saved environment of a server
    Env {
        name: String,

        /// Print password values in clear text
        #[arg(long)]
        reveal: bool,
    },

    /// Show or change the tools disabled for a server
    Tools {
        name: String,

        /// Tool to disable (repeatable); replaces the current list
        #[arg(long = "disable", value_name = "TOOL")]
        disable: Vec<String>,

        /// Re-enable every tool
        #[arg(long, conflicts_with = "disable")]
        clear: bool,
    },
}

#[derive(Args)]
struct EnvArgs {
    /// Server name as listed in the catalog
    name: String,

    /// Environment value (repeatable)
    #[arg(short, long = "env", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    env: Vec<(String, String)>,

    /// Prompt for every environment variable
    #[arg(short, long)]
    interactive: bool,
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "joypack=info,joypack_core=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let ctx = AppContext::load()?;
    let bus = ProgressBus::new();
    let installer = Installer::new(ctx, bus, Arc::new(SystemRunner));

    run_cli(&installer, cli.command).await
}

async fn run_cli(installer: &Installer, command: Commands) -> Result<()> {
    match command {
        Commands::List { format } => run_list(installer, format).await?,
        Commands::Install(args) => run_install(installer, args).await?,
        Commands::Uninstall { name } => run_uninstall(installer, &name).await?,
        Commands::Enable { name } => {
            installer.set_enabled(&name, true).await?;
            println!("{} Enabled '{}'", style("✓").green(), name);
        }
        Commands::Disable { name } => {
            installer.set_enabled(&name, false).await?;
            println!("{} Disabled '{}'", style("✓").green(), name);
        }
        Commands::Toggle { name } => {
            let enabled = installer.toggle(&name).await?;
            let state = if enabled { "enabled" } else { "disabled" };
            println!("{} '{}' is now {}", style("✓").green(), name, state);
        }
        Commands::Configure(args) => run_configure(installer, args).await?,
        Commands::Env { name, reveal } => run_env(installer, &name, reveal).await?,
        Commands::Tools {
            name,
            disable,
            clear,
        } => run_tools(installer, &name, disable, clear).await?,
    }
    Ok(())
}

async fn load_catalog(installer: &Installer) -> Result<Catalog> {
    Catalog::fetch(installer.context().catalog())
        .await
        .context("Could not load the server catalog")
}

async fn find_server(installer: &Installer, name: &str) -> Result<ServerDescriptor> {
    let catalog = load_catalog(installer).await?;
    catalog
        .get(name)
        .cloned()
        .with_context(|| format!("Server '{}' is not in the catalog", name))
}

async fn run_list(installer: &Installer, format: OutputFormat) -> Result<()> {
    let listing = installer.list_servers().await?;
    match format {
        OutputFormat::Table => print_listing_table(&listing),
        OutputFormat::Json => print_listing_json(&listing)?,
    }
    Ok(())
}

fn print_listing_table(listing: &ServerListing) {
    println!(
        "  {:<20} {:<18} {:<10} Description",
        "Name", "Setup", "State"
    );
    println!("  {}", "-".repeat(70));

    for server in &listing.installed {
        let state = match &server.launch_config {
            Some(config) if !config.is_enabled() => style("disabled").yellow(),
            _ => style("enabled").green(),
        };
        print_listing_row(server, state);
    }
    for server in &listing.available {
        print_listing_row(server, style("available").dim());
    }
    for (name, config) in &listing.unlisted {
        println!(
            "  {:<20} {:<18} {:<10} {}",
            truncate(name, 20),
            "-",
            style("unlisted").dim(),
            config.command
        );
    }
}

fn print_listing_row(server: &ServerDescriptor, state: console::StyledObject<&str>) {
    println!(
        "  {:<20} {:<18} {:<10} {}",
        truncate(&server.name, 20),
        server.launch_strategy.label(),
        state,
        truncate(server.description.as_deref().unwrap_or(""), 40)
    );
}

fn print_listing_json(listing: &ServerListing) -> Result<()> {
    let entry = |server: &ServerDescriptor| {
        serde_json::json!({
            "name": server.name,
            "displayName": server.display_name,
            "description": server.description,
            "setup": server.launch_strategy.label(),
            "mcpConfig": server.launch_config,
        })
    };
    let output = serde_json::json!({
        "installed": listing.installed.iter().map(entry).collect::<Vec<_>>(),
        "available": listing.available.iter().map(entry).collect::<Vec<_>>(),
        "unlisted": listing
            .unlisted
            .iter()
            .map(|(name, config)| serde_json::json!({ "name": name, "mcpConfig": config }))
            .collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Saved values (or schema defaults) overlaid with `--env`, then prompted
/// for when `-i` is given.
fn resolve_env(
    installer: &Installer,
    descriptor: &ServerDescriptor,
    args: &EnvArgs,
) -> Result<EnvValues> {
    let mut values = installer
        .read_saved_environment(descriptor)
        .unwrap_or_else(|| descriptor.environment_schema.default_values());

    for (key, value) in &args.env {
        if !descriptor.environment_schema.contains(key) {
            tracing::warn!(key = %key, "Ignoring variable not declared by {}", descriptor.name);
            continue;
        }
        values.insert(key.as_str(), value.as_str());
    }

    if args.interactive {
        values = EnvForm::new(
            descriptor.title(),
            &descriptor.environment_schema,
            values,
        )
        .collect()?;
    }
    Ok(values)
}

async fn run_install(installer: &Installer, args: EnvArgs) -> Result<()> {
    let descriptor = find_server(installer, &args.name).await?;
    let values = resolve_env(installer, &descriptor, &args)?;

    let _progress = print_progress(installer.bus(), &descriptor.name);
    let tracker = ProgressTracker::attach_server(installer.bus(), &descriptor.name);
    let result = installer.install(&descriptor, &values).await;
    print_summary(&tracker, &descriptor.name);
    let report = result?;

    println!();
    println!(
        "{} Installed '{}'",
        style("✓").green().bold(),
        descriptor.title()
    );
    if let Some(wrapper) = &report.wrapper_path {
        println!("  Wrapper: {}", wrapper.display());
    }
    println!("  Command: {}", report.launch_config.command);
    println!("  Env:     {}", report.env_file.display());
    if let Some(checkout) = &report.checkout {
        println!("  Repo:    {}", checkout.display());
    }
    let elapsed = report.finished_at - report.started_at;
    println!("  Took {:.1}s", elapsed.num_milliseconds() as f64 / 1000.0);
    Ok(())
}

async fn run_uninstall(installer: &Installer, name: &str) -> Result<()> {
    let catalog = load_catalog(installer).await?;
    let Some(descriptor) = catalog.get(name) else {
        if installer.uninstall_unlisted(name).await? {
            println!("{} Removed '{}'", style("✓").green(), name);
            return Ok(());
        }
        anyhow::bail!("Server '{}' is neither in the catalog nor installed", name);
    };

    let _progress = print_progress(installer.bus(), name);
    let tracker = ProgressTracker::attach_server(installer.bus(), name);
    let result = installer.uninstall(descriptor).await;
    print_summary(&tracker, name);
    let report = result?;
    if report.registry_entry_removed {
        println!("{} Uninstalled '{}'", style("✓").green(), descriptor.title());
    } else {
        println!(
            "• '{}' was not registered; cleaned up leftover files",
            descriptor.title()
        );
    }
    Ok(())
}

async fn run_configure(installer: &Installer, args: EnvArgs) -> Result<()> {
    let descriptor = find_server(installer, &args.name).await?;
    let values = resolve_env(installer, &descriptor, &args)?;
    let path = installer.configure(&descriptor, &values).await?;
    println!(
        "{} Updated environment for '{}' ({})",
        style("✓").green(),
        descriptor.title(),
        path.display()
    );
    Ok(())
}

async fn run_env(installer: &Installer, name: &str, reveal: bool) -> Result<()> {
    let descriptor = find_server(installer, name).await?;
    let Some(values) = installer.read_saved_environment(&descriptor) else {
        println!("• No saved environment for '{}'", name);
        return Ok(());
    };

    for (key, value) in values.iter() {
        let secret = descriptor
            .environment_schema
            .get(key)
            .is_some_and(|spec| spec.kind == EnvVarKind::Password);
        let shown = if secret && !reveal {
            mask_value(value)
        } else {
            value.to_string()
        };
        println!("  {}={}", style(key).bold(), shown);
    }
    Ok(())
}

async fn run_tools(
    installer: &Installer,
    name: &str,
    disable: Vec<String>,
    clear: bool,
) -> Result<()> {
    if clear || !disable.is_empty() {
        let config = installer.set_disabled_tools(name, disable).await?;
        let tools = config.disabled_tools.unwrap_or_default();
        println!(
            "{} Disabled tools for '{}': {}",
            style("✓").green(),
            name,
            if tools.is_empty() {
                "none".to_string()
            } else {
                tools.join(", ")
            }
        );
        return Ok(());
    }

    let config = installer
        .context()
        .registry_store()
        .get(name)?
        .with_context(|| format!("Server '{}' is not installed", name))?;
    match config.disabled_tools.as_deref() {
        Some(tools) if !tools.is_empty() => {
            for tool in tools {
                println!("  {}", tool);
            }
        }
        _ => println!("• No tools disabled for '{}'", name),
    }
    Ok(())
}

/// Print step transitions for `server` until the subscription is dropped.
fn print_progress(bus: &ProgressBus, server: &str) -> Subscription {
    bus.subscribe_server(server, |step| {
        if let Some(line) = format_step(step) {
            println!("{}", line);
        }
    })
}

fn format_step(step: &InstallationStep) -> Option<String> {
    let message = step.message.as_deref().unwrap_or("");
    let line = match step.status {
        StepStatus::Pending => return None,
        StepStatus::InProgress => {
            format!("  {} {}: {}", style("…").cyan(), step.step, message)
        }
        StepStatus::Complete => format!("  {} {}", style("✓").green(), step.step),
        StepStatus::Error => format!("  {} {}: {}", style("✗").red(), step.step, message),
    };
    Some(line)
}

/// Print the final state of every step the tracker saw for `server`.
fn print_summary(tracker: &ProgressTracker, server: &str) {
    let Some(progress) = tracker.snapshot(server) else {
        return;
    };
    println!();
    for line in format_summary(&progress) {
        println!("{}", line);
    }
}

fn format_summary(progress: &ServerProgress) -> Vec<String> {
    let mut lines = vec![format!("{}", style("Summary").bold())];
    for step in progress.steps() {
        let line = match step.status {
            StepStatus::Pending => format!("  {} {} (not run)", style("·").dim(), step.step),
            StepStatus::InProgress => {
                format!("  {} {} (interrupted)", style("…").yellow(), step.step)
            }
            StepStatus::Complete => format!("  {} {}", style("✓").green(), step.step),
            StepStatus::Error => format!(
                "  {} {}: {}",
                style("✗").red(),
                step.step,
                step.message.as_deref().unwrap_or("failed")
            ),
        };
        lines.push(line);
    }
    lines
}

fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{head}...")
    }
}
