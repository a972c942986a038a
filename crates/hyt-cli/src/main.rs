//! CLI entry point for the hyt plugin development tool.
//!
//! # Usage
//!
//! ```bash
//! hyt [OPTIONS] <COMMAND>
//!
//! # Build once, then rebuild on every change until Ctrl-C
//! hyt dev --path ./my-plugin
//!
//! # One-shot full rebuild
//! hyt build --clean
//!
//! # Check that Java and the game installation can be found
//! hyt doctor
//!
//! # Download Java 25 into ~/.hyt/java25
//! hyt install-java
//!
//! # Create a plugin project from a template
//! hyt init better-mobs --template ./templates/plugin
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::io::{IsTerminal, Write};

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{WrapErr, eyre};
use hyt_build::{BuildRunner, GradleRunner, has_gradle_wrapper, wrapper_path};
use hyt_core::{HytConfig, WatchConfig, paths};
use hyt_dev::{RebuildCoordinator, StatusEvent};
use hyt_env::{
    EnvError, GameInstallLocator, JavaInstaller, JavaLocator, JavaRuntime, JavaSource,
    REQUIRED_JAVA_VERSION, SearchPathLocator, SystemJavaLocator,
};
use hyt_scaffold::{PluginName, scaffold};
use hyt_watcher::DEFAULT_IGNORE_PATTERNS;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Development loop for Hytale server plugins.
///
/// Finds a Java 25 runtime and the game installation, builds the plugin with
/// its Gradle wrapper, and rebuilds it whenever a source file changes.
#[derive(Parser)]
#[command(name = "hyt", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,

    /// Plugin project directory.
    ///
    /// Defaults to the current directory.
    #[arg(short, long, global = true, env = "HYT_PROJECT")]
    path: Option<Utf8PathBuf>,

    /// Path to the `java` executable (overrides `javaPath` in the config).
    #[arg(long, global = true, env = "HYT_JAVA")]
    java: Option<Utf8PathBuf>,

    /// Hytale installation directory (overrides `hytaleInstallPath`).
    #[arg(long, global = true, env = "HYT_HYTALE_DIR")]
    hytale_dir: Option<Utf8PathBuf>,

    /// Answer yes to prompts, such as downloading a missing Java runtime.
    #[arg(short, long, global = true)]
    yes: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Build, then watch the project and rebuild on every change.
    Dev {
        /// Quiet period before a burst of changes triggers a rebuild.
        #[arg(long, value_name = "MS")]
        quiet_period_ms: Option<u64>,

        /// Extra glob to ignore (repeatable).
        #[arg(long = "ignore", value_name = "GLOB")]
        ignore: Vec<String>,

        /// Skip the build that normally runs before watching starts.
        #[arg(long)]
        no_initial_build: bool,
    },

    /// Build the project once.
    Build {
        /// Run `clean build --rerun-tasks` instead of an incremental build.
        #[arg(long)]
        clean: bool,
    },

    /// Report which Java runtime and game installation would be used.
    Doctor,

    /// Download Java 25 into ~/.hyt/java25.
    InstallJava {
        /// Reinstall even if a managed runtime is already usable.
        #[arg(long)]
        force: bool,
    },

    /// Create a plugin project from a template directory.
    ///
    /// The project is created at `--path`, or in a directory named after
    /// the plugin.
    Init {
        /// Plugin name, e.g. `better-mobs`.
        name: String,

        /// Template project to copy.
        #[arg(short, long, value_name = "DIR")]
        template: Utf8PathBuf,
    },
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects the `RUST_LOG` environment variable if set. Otherwise, uses
/// `debug` level if `--verbose` is set, or `info` level by default.
/// `notify` is filtered to `warn` level.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("{level},notify=warn,globset=warn"))
    });

    // Check if colors should be disabled (flag or NO_COLOR env var)
    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_ansi(use_ansi))
        .with(filter)
        .init();
}

/// Resolves and validates the project directory.
fn project_dir(cli: &Cli) -> color_eyre::Result<Utf8PathBuf> {
    let path = cli.path.clone().unwrap_or_else(|| Utf8PathBuf::from("."));
    paths::ensure_dir(&path)?;
    if !has_gradle_wrapper(&path) {
        return Err(eyre!(
            "No Gradle wrapper at {}. Is {} a plugin project?",
            wrapper_path(&path),
            path
        ));
    }
    Ok(path)
}

/// Loads `~/.hyt/config.json`, falling back to defaults if it is unreadable.
fn load_config() -> HytConfig {
    match HytConfig::load() {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "Ignoring unreadable config");
            HytConfig::default()
        }
    }
}

/// Finds Java, offering to install it, and remembers a discovered runtime
/// for next time.
async fn resolve_java(cli: &Cli, config: &mut HytConfig) -> color_eyre::Result<JavaRuntime> {
    let configured = cli.java.clone().or_else(|| config.java_path.clone());
    let locator = SystemJavaLocator::new().with_configured(configured.clone());

    let java = match locator.locate().await {
        Ok(java) => java,
        Err(err) => {
            if configured.is_some() || !offer_install(&err, cli.yes).await? {
                return Err(err).wrap_err("A Java runtime is required to build plugins");
            }
            locator
                .with_installer(JavaInstaller::new()?)
                .locate()
                .await
                .wrap_err("Installing Java failed")?
        }
    };

    if java.source != JavaSource::Configured {
        remember_java(config, &java);
    }
    Ok(java)
}

/// Asks whether to download Java after `err`. Never asks when stdin is not
/// a terminal.
async fn offer_install(err: &EnvError, assume_yes: bool) -> color_eyre::Result<bool> {
    if !err.is_installable() {
        return Ok(false);
    }
    if assume_yes {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        info!("Run `hyt install-java` or pass --yes to download Java {REQUIRED_JAVA_VERSION}");
        return Ok(false);
    }

    let question = format!(
        "{err}\nDownload Java {REQUIRED_JAVA_VERSION} to {}?",
        paths::java_install_dir()?
    );
    let answer = tokio::task::spawn_blocking(move || ask_yes_no(&question, true)).await??;
    Ok(answer)
}

/// Prompts on stdout and reads a yes/no answer from stdin.
fn ask_yes_no(question: &str, default_yes: bool) -> std::io::Result<bool> {
    let hint = if default_yes { "(Y/n)" } else { "(y/N)" };
    {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        write!(handle, "{question} {hint}: ")?;
        handle.flush()?;
    }

    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(parse_yes_no(&answer, default_yes))
}

fn parse_yes_no(answer: &str, default_yes: bool) -> bool {
    match answer.trim().to_ascii_lowercase().as_str() {
        "" => default_yes,
        "y" | "yes" => true,
        _ => false,
    }
}

/// Saves `java` as the configured runtime if it is not already.
fn remember_java(config: &mut HytConfig, java: &JavaRuntime) {
    if config.java_path.as_ref() == Some(&java.executable) {
        return;
    }
    config.java_path = Some(java.executable.clone());
    if let Err(e) = config.save() {
        warn!(error = %e, "Could not save config");
    }
}

fn gradle_runner(java: &JavaRuntime) -> GradleRunner {
    match java.home() {
        Some(home) => GradleRunner::new().with_java_home(home),
        None => GradleRunner::new(),
    }
}

/// Merges command-line watch options over the configured defaults.
fn watch_config(
    base: &WatchConfig,
    quiet_period_ms: Option<u64>,
    ignore: &[String],
) -> WatchConfig {
    let config = base.clone().with_ignore_patterns(ignore.iter().cloned());
    match quiet_period_ms {
        Some(ms) => config.with_quiet_period_ms(ms),
        None => config,
    }
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Runs the edit-rebuild loop until Ctrl-C or SIGTERM.
async fn run_dev(
    cli: &Cli,
    quiet_period_ms: Option<u64>,
    ignore: &[String],
    no_initial_build: bool,
) -> color_eyre::Result<()> {
    let project = project_dir(cli)?;
    let mut config = load_config();
    let java = resolve_java(cli, &mut config).await?;

    let configured_install = cli
        .hytale_dir
        .clone()
        .or_else(|| config.hytale_install_path.clone());
    match SearchPathLocator::new()
        .with_configured(configured_install)
        .locate()
    {
        Ok(install) => info!(path = %install.root(), "Using Hytale installation"),
        Err(e) => warn!(error = %e, "Continuing without a Hytale installation"),
    }

    let runner = gradle_runner(&java);
    if !no_initial_build {
        print_status(&StatusEvent::Building {
            build: 0,
            changed_files: 0,
        });
        let outcome = runner.run(&project).await;
        print_status(&if outcome.success {
            StatusEvent::BuildSucceeded {
                build: 0,
                outcome,
            }
        } else {
            StatusEvent::BuildFailed {
                build: 0,
                outcome,
            }
        });
    }

    let watch = watch_config(&config.watch, quiet_period_ms, ignore);
    let mut coordinator = RebuildCoordinator::new(runner);
    coordinator.start_watching(&project, &watch, |status| print_status(&status))?;

    shutdown_signal().await?;

    coordinator.stop_watching();
    if coordinator.build_state().is_building() {
        info!("Waiting for the running build to finish");
    }
    coordinator.wait().await;
    Ok(())
}

/// Builds the project once.
async fn run_build(cli: &Cli, clean: bool) -> color_eyre::Result<()> {
    let project = project_dir(cli)?;
    let mut config = load_config();
    let java = resolve_java(cli, &mut config).await?;

    let runner = gradle_runner(&java).force_rebuild(clean);
    info!(path = %project, args = ?runner.build_args(), "Building");
    let outcome = runner.run(&project).await.into_result("build")?;
    print_status(&StatusEvent::BuildSucceeded { build: 1, outcome });
    Ok(())
}

/// Downloads Java into the managed directory and makes it the configured
/// runtime.
async fn run_install_java(force: bool) -> color_eyre::Result<()> {
    let installer = JavaInstaller::new()?;
    let mut config = load_config();

    if !force {
        let existing = SystemJavaLocator::new()
            .with_managed_dir(installer.install_dir())
            .without_path_lookup()
            .locate()
            .await;
        if let Ok(java) = existing {
            let stdout = std::io::stdout();
            writeln!(
                stdout.lock(),
                "Java {} is already installed at {} (use --force to reinstall)",
                java.version,
                java.executable
            )?;
            remember_java(&mut config, &java);
            return Ok(());
        }
    }

    let java = installer
        .install()
        .await
        .wrap_err("Installing Java failed")?;
    remember_java(&mut config, &java);

    let stdout = std::io::stdout();
    writeln!(
        stdout.lock(),
        "Installed Java {} at {}",
        java.version,
        java.executable
    )?;
    Ok(())
}

/// Creates a plugin project from a template.
fn run_init(cli: &Cli, name: &str, template: &Utf8Path) -> color_eyre::Result<()> {
    let name = PluginName::parse(name)?;
    let dest = cli
        .path
        .clone()
        .unwrap_or_else(|| Utf8PathBuf::from(name.as_str()));

    let report = scaffold(template, &dest, &name)
        .wrap_err_with(|| format!("Could not create {dest} from {template}"))?;

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    writeln!(
        handle,
        "Created {} ({}) with {} files in {dest}",
        name,
        name.class_name(),
        report.files.len()
    )?;
    if !has_gradle_wrapper(&dest) {
        writeln!(handle, "Note: the template has no Gradle wrapper ({})", wrapper_path(&dest))?;
    }
    writeln!(handle, "Next: cd {dest} && hyt dev")?;
    Ok(())
}

/// Prints what the environment looks like to hyt.
async fn run_doctor(cli: &Cli) -> color_eyre::Result<()> {
    let config = load_config();
    let configured = cli.java.clone().or_else(|| config.java_path.clone());
    let java = SystemJavaLocator::new()
        .with_configured(configured)
        .locate()
        .await;

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    writeln!(handle, "Config")?;
    match paths::config_path() {
        Ok(path) => writeln!(handle, "  file:    {path}")?,
        Err(e) => writeln!(handle, "  file:    unavailable ({e})")?,
    }

    writeln!(handle)?;
    writeln!(handle, "Java")?;
    match java {
        Ok(java) => {
            writeln!(handle, "  found:   Java {} ({})", java.version, java.source)?;
            writeln!(handle, "  path:    {}", java.executable)?;
        }
        Err(e) => {
            writeln!(handle, "  missing: {e}")?;
            if e.is_installable() {
                writeln!(
                    handle,
                    "  fix:     run `hyt install-java` to download Java {REQUIRED_JAVA_VERSION}"
                )?;
            }
        }
    }

    writeln!(handle)?;
    writeln!(handle, "Hytale")?;
    let configured = cli
        .hytale_dir
        .clone()
        .or_else(|| config.hytale_install_path.clone());
    let locator = SearchPathLocator::new().with_configured(configured);
    match locator.locate() {
        Ok(install) => writeln!(handle, "  found:   {}", install.root())?,
        Err(e) => {
            writeln!(handle, "  missing: {e}")?;
            for path in locator.search_paths() {
                writeln!(handle, "  looked:  {path}")?;
            }
        }
    }

    writeln!(handle)?;
    writeln!(handle, "Project")?;
    let project = cli.path.clone().unwrap_or_else(|| Utf8PathBuf::from("."));
    let wrapper = if has_gradle_wrapper(&project) { "yes" } else { "no" };
    writeln!(handle, "  path:    {project}")?;
    writeln!(handle, "  gradlew: {wrapper}")?;
    writeln!(handle, "  output:  {}", paths::build_output_dir(&project))?;
    writeln!(
        handle,
        "  ignored: {}",
        DEFAULT_IGNORE_PATTERNS
            .iter()
            .copied()
            .chain(config.watch.ignore_patterns.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    )?;
    Ok(())
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

/// Prints one status transition.
fn print_status(status: &StatusEvent) {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    let _ = writeln!(handle, "[{}] {status}", status.label());

    if let StatusEvent::BuildFailed { outcome, .. } = status {
        for line in outcome.tail(20) {
            let _ = writeln!(handle, "   {line}");
        }
    }
}

/// Resolves on Ctrl-C, or on SIGTERM on Unix.
async fn shutdown_signal() -> color_eyre::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result?,
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await?;

    Ok(())
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // 1. Install color-eyre FIRST (before any potential panics)
    color_eyre::install()?;

    // 2. Parse CLI arguments
    let cli = Cli::parse();

    // 3. Initialize tracing (handles --no-color for log output)
    init_tracing(cli.verbose, cli.no_color);

    // 4. Route to appropriate command
    match &cli.command {
        Commands::Dev {
            quiet_period_ms,
            ignore,
            no_initial_build,
        } => run_dev(&cli, *quiet_period_ms, ignore, *no_initial_build).await,
        Commands::Build { clean } => run_build(&cli, *clean).await,
        Commands::Doctor => run_doctor(&cli).await,
        Commands::InstallJava { force } => run_install_java(*force).await,
        Commands::Init { name, template } => run_init(&cli, name, template),
    }
}
