//! Application orchestrator.
//! Loads/merges config, initializes logging, installs the signal handler, reads
//! sandbox metadata, builds the migration units and runs them in order.

use anyhow::Result;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

use xdg_relocate::cli::Args;
use xdg_relocate::config::{create_template_config, load_or_default, CONFIG_ENV};
use xdg_relocate::output as out;
use xdg_relocate::{default_config_path, shutdown, Migrator, Namespace, RelocateError, SandboxInfo};

use crate::logging::init_tracing;

/// How a successful run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every directory is in place; the application can start.
    Ready,
    /// A two-step migration just ran; the application must be restarted.
    RestartRequired,
}

/// Run the CLI application.
pub fn run(args: Args) -> Result<Outcome> {
    // Handled before logging init
    if args.print_config {
        print_config_location();
        return Ok(Outcome::Ready);
    }
    if args.init_config {
        let path = default_config_path()?;
        create_template_config(&path)?;
        out::print_success(&format!("A template config was written to: {}", path.display()));
        out::print_info("Edit the file to set <state_dir>, then re-run.");
        return Ok(Outcome::Ready);
    }

    // Build config (may read XML). CLI args override config values.
    let (mut cfg, cfg_path) = load_or_default()?;
    args.apply_overrides(&mut cfg);

    let guard_opt = init_tracing(&cfg.log_level, cfg.log_file.as_deref(), args.json).map_err(|e| {
        out::print_error(&format!("Failed to initialize logging: {e}"));
        e
    })?;

    // Dropping the guard flushes the file appender; the handler does it on SIGINT.
    let guard_slot: Arc<Mutex<Option<WorkerGuard>>> = Arc::new(Mutex::new(guard_opt));
    {
        let guard_slot = Arc::clone(&guard_slot);
        if let Err(e) = ctrlc::set_handler(move || {
            shutdown::request();
            out::print_warn("Received interrupt; stopping after the current directory...");
            if let Ok(mut g) = guard_slot.lock() {
                let _ = g.take();
            }
        }) {
            warn!(error = %e, "failed to install signal handler");
        }
    }

    debug!(config = ?cfg_path, "starting xdg_relocate: {:?}", args);

    let result = (|| -> Result<Outcome> {
        let mut sandbox = SandboxInfo::load(&cfg.sandbox_info, cfg.sandbox_info_required)?;
        sandbox.extend_filesystems(cfg.extra_filesystems.iter().cloned());
        if let Some(runtime) = &sandbox.runtime {
            debug!(runtime, version = sandbox.flatpak_version.as_deref().unwrap_or("-"), "sandbox");
        }

        let mut migrators = Vec::new();
        for (ns, unit) in cfg.build_units(&sandbox)? {
            migrators.push((ns, Migrator::new(unit)?));
        }

        if cfg.dry_run {
            return dry_run(&migrators);
        }

        let mut restart = false;
        for (ns, migrator) in &migrators {
            if shutdown::is_requested() {
                return Err(RelocateError::Interrupted.into());
            }
            let needs = migrator.apply().map_err(|e| e.context(format!("migrating {ns} directory")))?;
            if needs {
                info!(namespace = %ns, "restart required after migration");
            }
            restart |= needs;
        }
        Ok(if restart {
            Outcome::RestartRequired
        } else {
            Outcome::Ready
        })
    })();

    if let Err(e) = &result {
        log_failure(e);
    }

    // Ensure logs are flushed before exit
    if let Ok(mut g) = guard_slot.lock() {
        let _ = g.take();
    }

    result
}

fn print_config_location() {
    if let Some(p) = std::env::var_os(CONFIG_ENV) {
        out::print_info(&format!(
            "Using {CONFIG_ENV} (explicit):\n  {}\n",
            p.to_string_lossy()
        ));
        out::print_info(&format!("To override, unset {CONFIG_ENV} or set it to another file."));
        return;
    }
    match default_config_path() {
        Ok(p) => {
            out::print_info(&format!("Default xdg_relocate config path:\n  {}\n", p.display()));
            if p.exists() {
                out::print_info("A config file already exists at that location.");
            } else {
                out::print_info("No config file exists there yet. Run with --init-config to create a template.");
            }
        }
        Err(e) => out::print_error(&format!("Could not determine a default config path: {e}")),
    }
}

fn dry_run(migrators: &[(Namespace, Migrator)]) -> Result<Outcome> {
    let mut restart = false;
    for (ns, migrator) in migrators {
        let plan = migrator.plan()?;
        info!(namespace = %ns, state = %plan.state, steps = plan.steps.len(), "dry-run plan");
        if plan.steps.is_empty() {
            out::print_step(&ns.to_string(), &format!("nothing to do ({})", plan.state));
        }
        for step in &plan.steps {
            out::print_step(&ns.to_string(), &step.to_string());
        }
        restart |= plan.restart_needed;
    }
    if restart {
        out::print_info("A restart would be required after these steps.");
    }
    Ok(Outcome::Ready)
}

fn log_failure(e: &anyhow::Error) {
    match e.downcast_ref::<RelocateError>() {
        Some(re) => {
            let code = re.code();
            let kind = re.kind();
            if re.is_configuration() {
                error!(code, kind, error = %re, "invalid configuration; nothing was changed");
            } else if matches!(re, RelocateError::Interrupted) {
                error!(code, kind, "run aborted by user");
            } else {
                error!(code, kind, error = %format!("{e:#}"), "migration failed");
            }
        }
        None => error!(error = %format!("{e:#}"), "migration failed"),
    }
}
