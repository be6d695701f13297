//! Declarative commands
//!
//! - `validate` - Check the configuration offline
//! - `plan` - Refresh and show what apply would change
//! - `apply` - Make the server match the configuration
//! - `destroy` - Delete everything recorded in state
//! - `refresh` - Re-read recorded resources into state

use anyhow::{Context as AnyhowContext, Result, bail};
use declarative::{DeadlineSink, ExecutionPlan, ExecutionReport};
use superset_client::HttpApi;

use crate::Context;
use crate::config::Config;
use crate::engine::executor::BarProgress;
use crate::engine::{self, ClientDeadline, ExecuteOptions, Goal};
use crate::resource;
use crate::state::StateFile;
use crate::ui;

pub(crate) fn load_config(ctx: &Context) -> Result<Config> {
    Config::load(&ctx.config_path)
}

pub(crate) fn load_state(ctx: &Context) -> Result<StateFile> {
    StateFile::load(&ctx.state_path)
}

pub(crate) fn save_state(ctx: &Context, state: &mut StateFile) -> Result<()> {
    state.save(&ctx.state_path)
}

/// Log in with `[provider]` settings, falling back to flags and environment
pub(crate) fn connect(ctx: &Context, config: &Config) -> Result<HttpApi> {
    let provider = config.provider.resolve(&ctx.provider)?;
    log::info!("Connecting to {} as {}", provider.server_base_url, provider.username);
    HttpApi::login(
        provider.server_base_url.clone(),
        &provider.username,
        &provider.password,
        provider.page_size,
    )
    .with_context(|| format!("Failed to log in to {}", provider.server_base_url))
}

/// Stop before contacting the server if any declared resource is invalid
fn preflight(plan: &ExecutionPlan<'_>) -> Result<()> {
    let mut errors = 0;
    for resource in &plan.resources {
        if !resource.is_declared() {
            continue;
        }
        let diags = resource.validate();
        errors += diags.error_count();
        ui::diagnostics(&resource.address().to_string(), &diags);
    }
    if errors > 0 {
        bail!("Configuration has {errors} error(s)");
    }
    Ok(())
}

fn refresh_plan(plan: &mut ExecutionPlan<'_>, sink: &dyn DeadlineSink) -> ExecutionReport {
    let report = declarative::refresh(plan, Some(sink), &mut BarProgress::default());
    engine::print_diagnostics(&report);
    report
}

pub fn validate(ctx: &Context) -> Result<()> {
    let config = load_config(ctx)?;
    let mut errors = 0;

    for block in &config.resources {
        match resource::validate(block) {
            Ok(diags) => {
                errors += diags.error_count();
                ui::diagnostics(&block.address.to_string(), &diags);
            }
            Err(e) => {
                errors += 1;
                ui::error(&format!("{e:#}"));
            }
        }
    }

    if errors > 0 {
        bail!("Configuration has {errors} error(s)");
    }
    if !ctx.quiet {
        ui::success(&format!(
            "Configuration is valid ({} resources)",
            config.resources.len()
        ));
    }
    Ok(())
}

pub fn plan(ctx: &Context, target: Option<&str>) -> Result<()> {
    let config = load_config(ctx)?;
    let state = load_state(ctx)?;
    let api = connect(ctx, &config)?;
    let sink = ClientDeadline(&api);

    let mut plan =
        engine::build_plan(&api, &config, &state, Goal::Converge)?.filter_by_target(target);
    preflight(&plan)?;
    let refreshed = refresh_plan(&mut plan, &sink);

    engine::display_diff(&plan.diffs()?, ctx.verbose > 0);

    if refreshed.has_errors() {
        bail!("Refresh failed for some resources");
    }
    Ok(())
}

pub fn apply(ctx: &Context, target: Option<&str>, dry_run: bool, yes: bool) -> Result<()> {
    let config = load_config(ctx)?;
    let mut state = load_state(ctx)?;
    let api = connect(ctx, &config)?;
    let sink = ClientDeadline(&api);

    let mut plan =
        engine::build_plan(&api, &config, &state, Goal::Converge)?.filter_by_target(target);
    preflight(&plan)?;
    let refreshed = refresh_plan(&mut plan, &sink);
    if refreshed.has_errors() {
        bail!("Refresh failed for some resources; nothing was applied");
    }

    let opts = ExecuteOptions {
        dry_run,
        yes,
        verbose: ctx.verbose > 0,
    };
    let report = engine::execute(&mut plan, &opts, Some(&sink))?;

    if dry_run {
        return Ok(());
    }

    // Partial progress is kept even when some operations failed
    engine::record(&plan, &mut state)?;
    save_state(ctx, &mut state)?;

    if report.has_errors() {
        bail!("Apply finished with errors");
    }
    Ok(())
}

pub fn destroy(ctx: &Context, target: Option<&str>, yes: bool) -> Result<()> {
    let config = load_config(ctx)?;
    let mut state = load_state(ctx)?;
    if state.resources.is_empty() {
        ui::info("Nothing to destroy; state is empty");
        return Ok(());
    }
    let api = connect(ctx, &config)?;
    let sink = ClientDeadline(&api);

    let mut plan =
        engine::build_plan(&api, &config, &state, Goal::Recorded)?.filter_by_target(target);
    let refreshed = refresh_plan(&mut plan, &sink);

    let opts = ExecuteOptions {
        dry_run: false,
        yes,
        verbose: ctx.verbose > 0,
    };
    let report = engine::execute(&mut plan, &opts, Some(&sink))?;

    engine::record(&plan, &mut state)?;
    save_state(ctx, &mut state)?;

    if refreshed.has_errors() || report.has_errors() {
        bail!("Destroy finished with errors");
    }
    Ok(())
}

pub fn refresh(ctx: &Context) -> Result<()> {
    let config = load_config(ctx)?;
    let mut state = load_state(ctx)?;
    let api = connect(ctx, &config)?;
    let sink = ClientDeadline(&api);

    let mut plan = engine::build_plan(&api, &config, &state, Goal::Recorded)?;
    let before = plan.len();
    let report = refresh_plan(&mut plan, &sink);

    engine::record(&plan, &mut state)?;
    save_state(ctx, &mut state)?;

    let dropped = plan.resources.iter().filter(|r| !r.is_tracked()).count();
    if !ctx.quiet {
        ui::success(&format!("Refreshed {} resources", before - dropped));
        if dropped > 0 {
            ui::warn(&format!(
                "{dropped} resources no longer exist remotely and were removed from state"
            ));
        }
    }

    if report.has_errors() {
        bail!("Refresh finished with errors");
    }
    Ok(())
}
