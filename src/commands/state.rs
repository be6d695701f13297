//! State file inspection

use anyhow::{Context as AnyhowContext, Result, anyhow, bail};
use declarative::Address;

use super::declarative::{load_state, save_state};
use crate::Context;
use crate::ui;

fn parse(address: &str) -> Result<Address> {
    address.parse().map_err(|e: String| anyhow!(e))
}

pub fn list(ctx: &Context) -> Result<()> {
    let state = load_state(ctx)?;
    let addresses = state.addresses()?;
    if addresses.is_empty() {
        if !ctx.quiet {
            ui::info("State is empty");
        }
        return Ok(());
    }
    for address in addresses {
        println!("{address}");
    }
    Ok(())
}

pub fn show(ctx: &Context, address: &str) -> Result<()> {
    let address = parse(address)?;
    let state = load_state(ctx)?;
    let Some(record) = state.get(&address) else {
        bail!("{address} is not in state");
    };

    ui::header(&address.to_string());
    let attributes =
        serde_json::to_string_pretty(&record.attributes).context("Failed to format attributes")?;
    println!("{attributes}");
    Ok(())
}

pub fn rm(ctx: &Context, address: &str) -> Result<()> {
    let address = parse(address)?;
    let mut state = load_state(ctx)?;
    if state.remove(&address).is_none() {
        bail!("{address} is not in state");
    }
    save_state(ctx, &mut state)?;

    if !ctx.quiet {
        ui::success(&format!("Removed {address} from state"));
        ui::dim("The remote object was left untouched");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderSettings;
    use crate::state::StateFile;
    use serde_json::json;

    fn context(dir: &tempfile::TempDir) -> Context {
        Context {
            verbose: 0,
            quiet: true,
            config_path: dir.path().join("dashform.toml"),
            state_path: dir.path().join("dashform.state.json"),
            provider: ProviderSettings::default(),
        }
    }

    #[test]
    fn test_rm_forgets_address() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir);
        let mut state = StateFile::default();
        state.set(&Address::new("tag", "finance"), Some(json!({"id": 1, "name": "finance"})));
        state.set(&Address::new("role", "analysts"), Some(json!({"id": 2, "name": "Analysts"})));
        state.save(&ctx.state_path).unwrap();

        rm(&ctx, "tag.finance").unwrap();

        let state = StateFile::load(&ctx.state_path).unwrap();
        assert_eq!(state.addresses().unwrap(), vec![Address::new("role", "analysts")]);
        assert!(rm(&ctx, "tag.finance").is_err());
    }

    #[test]
    fn test_show_unknown_address() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir);
        assert!(show(&ctx, "user.nobody").is_err());
        assert!(show(&ctx, "no-dot").is_err());
    }
}
