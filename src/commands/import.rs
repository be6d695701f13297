//! Adopt an existing remote object into state

use anyhow::{Result, anyhow, bail};
use declarative::{Address, ApplyContext, ApplyResult};

use super::declarative::{connect, load_config, load_state, save_state};
use crate::Context;
use crate::engine::ClientDeadline;
use crate::resource;
use crate::ui;

pub fn run(ctx: &Context, address: &str, id: &str) -> Result<()> {
    let address: Address = address.parse().map_err(|e: String| anyhow!(e))?;
    let mut state = load_state(ctx)?;
    if state.contains(&address) {
        bail!(
            "{address} is already managed; run `dashform state rm {address}` before importing it again"
        );
    }

    let config = load_config(ctx)?;
    let block = config.resource(&address);
    if block.is_none() {
        ui::warn(&format!(
            "{address} is not declared in {}; the next apply will destroy it",
            ctx.config_path.display()
        ));
    }

    let api = connect(ctx, &config)?;
    let sink = ClientDeadline(&api);
    let mut resource = resource::build(&api, &address, block, None)?;

    let mut apply_ctx = ApplyContext::new(false, ctx.verbose > 0)
        .with_timeouts(resource.timeouts())
        .with_deadline_sink(Some(&sink));
    let result = resource.import(&mut apply_ctx, id);
    ui::diagnostics(&address.to_string(), &apply_ctx.diagnostics);

    if let ApplyResult::Failed { error } = result {
        bail!("Import of {address} failed: {error}");
    }

    state.set(&address, resource.state_value()?);
    save_state(ctx, &mut state)?;

    if !ctx.quiet {
        ui::success(&format!("Imported {address} from ID {id}"));
    }
    Ok(())
}
