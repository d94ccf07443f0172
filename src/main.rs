#![forbid(unsafe_code)]

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, Level as TraceLevel};
use tracing_subscriber::FmtSubscriber;

use applet_manager::config::{JsonSettings, ManagerConfig, SettingsStore};
use applet_manager::constants::settings::ENABLED_APPLETS;
use applet_manager::host::{MemoryPanelHost, PanelHost};
use applet_manager::notify::LogNotifier;
use applet_manager::packages::StaticPackageLoader;
use applet_manager::roles::RoleTable;
use applet_manager::types::{ContainerId, Location, PanelId};
use applet_manager::{AppletDefinition, AppletManager, DefinitionSet, ShellContext};

#[derive(Debug, Parser)]
#[command(name = "applet-manager", version, about = "Inspect and edit panel applet declarations")]
struct Cli {
    /// Manager config file (defaults to the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print every declaration, flagging malformed ones
    List,
    /// Upgrade legacy records that lack an instance id
    Migrate,
    /// Remove a single declaration
    Remove { package: String, instance: String },
    /// Remove every declaration on a panel
    Clear { panel: PanelId },
    /// Copy one panel's applets onto another
    Paste {
        #[arg(long)]
        from: PanelId,
        #[arg(long)]
        to: PanelId,
    },
    /// Load every declared applet into the configured panels and print them
    Layout,
    /// Write the effective config to the config path
    InitConfig,
}

fn parse_level(value: &str) -> TraceLevel {
    match value.to_lowercase().as_str() {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    }
}

/// Everything the manager talks to, standing in for a running shell
struct Shell {
    panels: MemoryPanelHost,
    packages: StaticPackageLoader,
    roles: RoleTable,
    settings: JsonSettings,
    notifier: LogNotifier,
}

impl Shell {
    fn from_config(config: &ManagerConfig) -> Result<Self> {
        Ok(Self {
            panels: config.panel_host(),
            packages: StaticPackageLoader::new(config.packages.clone()),
            roles: RoleTable::new(),
            settings: JsonSettings::open(config.settings_path())?,
            notifier: LogNotifier::new(),
        })
    }

    fn ctx(&mut self) -> ShellContext<'_> {
        ShellContext {
            panels: &mut self.panels,
            packages: &mut self.packages,
            roles: &mut self.roles,
            settings: &mut self.settings,
            notifier: &mut self.notifier,
        }
    }
}

fn list(shell: &Shell) {
    for record in shell.settings.string_list(ENABLED_APPLETS) {
        match AppletDefinition::decode(&record, &shell.panels) {
            Ok(definition) => {
                let panel_state = if definition.panel.is_some() { "" } else { "  (panel missing)" };
                println!(
                    "panel{}:{} order={} {} #{}{}",
                    definition.panel_id,
                    definition.location,
                    definition.order,
                    definition.package_id,
                    definition.instance_id,
                    panel_state
                );
            }
            Err(err) => println!("{record}  <{err}>"),
        }
    }
}

fn print_layout(panels: &MemoryPanelHost) {
    for panel_id in panels.panel_ids() {
        for location in Location::ALL {
            let container = ContainerId::new(panel_id, location);
            println!("{container}: {}", panels.applet_ids(container).join(" "));
        }
    }
}

fn run(command: Command, config: &ManagerConfig, config_path: &Path) -> Result<()> {
    let mut shell = Shell::from_config(config)?;
    let mut manager = AppletManager::from_config(config);

    match command {
        Command::List => list(&shell),
        Command::Migrate => {
            let before = shell.settings.string_list(ENABLED_APPLETS);
            DefinitionSet::load(&mut shell.settings, &shell.panels);
            let after = shell.settings.string_list(ENABLED_APPLETS);
            let upgraded = before.iter().zip(&after).filter(|(old, new)| old != new).count();
            println!("Upgraded {upgraded} of {} records", after.len());
        }
        Command::Remove { package, instance } => {
            let mut ctx = shell.ctx();
            manager.initialize(&mut ctx);
            if manager.remove_applet_from_panel(&mut ctx, &package, &instance)? {
                manager.pump(&mut ctx);
                println!("Removed {package} #{instance}");
            } else {
                println!("No declaration for {package} #{instance}");
            }
        }
        Command::Clear { panel } => {
            let mut ctx = shell.ctx();
            manager.initialize(&mut ctx);
            let removed = manager.clear_applet_configuration(&mut ctx, panel)?;
            manager.pump(&mut ctx);
            println!("Removed {removed} applets from panel {panel}");
        }
        Command::Paste { from, to } => {
            let mut ctx = shell.ctx();
            manager.initialize(&mut ctx);
            manager.copy_applet_configuration(from);
            if manager.clipboard().is_empty() {
                println!("Panel {from} has no applets, {to} will be cleared");
            }
            let report = manager.paste_applet_configuration(&mut ctx, to)?;
            manager.pump(&mut ctx);
            for record in &report.pasted {
                println!("+ {record}");
            }
            for package in &report.skipped {
                println!("- {package} (instance limit)");
            }
        }
        Command::Layout => {
            let report = manager.initialize(&mut shell.ctx());
            for failure in &report.failed {
                println!("! {failure}");
            }
            print_layout(&shell.panels);
        }
        Command::InitConfig => {
            config.save_to(config_path)?;
            println!("Wrote config to {}", config_path.display());
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ManagerConfig::load_from(path)?,
        None => ManagerConfig::load()?,
    };
    let config_path = cli.config.clone().unwrap_or_else(ManagerConfig::path);

    let log_level = parse_level(
        &std::env::var("LOG_LEVEL").unwrap_or_else(|_| config.log_level.clone()),
    );
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!(command = ?cli.command, "Starting applet-manager");
    run(cli.command, &config, &config_path)
}
