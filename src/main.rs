use std::env;
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use lionp::cli::{self, Args, ExitSlot, WorkflowResult};
use lionp::config;
use lionp::domain::PackageManifest;
use lionp::git::GitRepository;
use lionp::github::BrowserOpener;
use lionp::package_manager::Pnpm;
use lionp::registry::NpmRegistry;
use lionp::task::Collaborators;
use lionp::ui::{self, DialoguerPrompter};
use lionp::LionpError;

/// Publishes through pnpm; npm still answers the registry queries
const PUBLISHER: &str = "pnpm";

fn main() {
    let args = Args::parse();

    if args.debug {
        env::set_var("RUST_LOG", "lionp=debug");
    }
    env_logger::init();

    if let Err(e) = run(&args) {
        ui::display_error(&format!("{:#}", e));
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let cwd = env::current_dir().context("Could not read the working directory")?;
    let manifest = PackageManifest::discover(&cwd)?;
    let root = manifest.root.clone();
    let file_config = config::load_config(&root)?;

    let collaborators = Collaborators {
        git: Arc::new(GitRepository::open(&root)?),
        registry: Arc::new(NpmRegistry::new(&root, PUBLISHER)),
        package_manager: Arc::new(Pnpm::new(&root)),
        prompter: Arc::new(DialoguerPrompter),
        opener: Arc::new(BrowserOpener),
    };

    let exit_slot = ExitSlot::default();
    cli::install_interrupt_handler(exit_slot.clone())?;

    let result = cli::run_release(
        args.to_workflow_args(),
        collaborators,
        manifest,
        &file_config,
        &exit_slot,
    );
    let summary = match result {
        Ok(WorkflowResult::Released(summary)) => summary,
        Ok(WorkflowResult::Declined) => return Ok(()),
        // escape at a prompt is an abort, not a failure
        Err(LionpError::Cancelled) => {
            ui::display_error("Aborted!");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    for warning in &summary.warnings {
        ui::display_warning(warning);
    }
    if !summary.preview && !summary.draft_only {
        ui::display_published(&summary.name, &summary.version);
    }
    Ok(())
}
