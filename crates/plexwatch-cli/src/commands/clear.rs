use crate::output::Output;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use plexwatch_config::PathManager;
use plexwatch_core::JsonStateStore;
use std::fs;

pub fn run_clear(state: bool, credentials: bool, output: &Output) -> Result<()> {
    let paths = PathManager::default();

    if !state && !credentials {
        output.warn("No clear option specified. Use --state or --credentials");
        output.println("\nExample: plexwatch clear --state");
        return Ok(());
    }

    if state {
        clear_state(&paths, output)?;
    }
    if credentials {
        clear_credentials(&paths, output)?;
    }
    Ok(())
}

fn clear_state(paths: &PathManager, output: &Output) -> Result<()> {
    let store = JsonStateStore::new(paths.state_file());
    let removed = store
        .clear()
        .map_err(|e| eyre!("Failed to clear tracked state: {}", e))?;
    if removed {
        output.success(format!("Cleared tracked state: {}", store.path().display()));
    } else {
        output.info("No tracked state found to clear");
    }
    Ok(())
}

fn clear_credentials(paths: &PathManager, output: &Output) -> Result<()> {
    let credentials_file = paths.credentials_file();
    if !credentials_file.exists() {
        output.info("No credentials file found to clear");
        return Ok(());
    }
    fs::remove_file(&credentials_file).map_err(|e| {
        eyre!(
            "Failed to remove credentials file at {}: {}",
            credentials_file.display(),
            e
        )
    })?;
    output.success(format!("Cleared credentials: {}", credentials_file.display()));
    Ok(())
}
