use crate::output::Output;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use comfy_table::{presets, Attribute, Cell, Color, Table};
use plexwatch_config::PathManager;
use plexwatch_core::{JsonStateStore, StateStore};
use plexwatch_models::{TrackedEntry, TrackingStatus};

pub fn run_status(pending_only: bool, output: &Output) -> Result<()> {
    let paths = PathManager::default();
    let store = JsonStateStore::new(paths.state_file());
    let entries = store
        .load()
        .map_err(|e| eyre!("Failed to load tracked state from {}: {}", store.path().display(), e))?;
    let entries = select(entries, pending_only);

    if !output.is_human() {
        output.json(&serde_json::to_value(&entries).unwrap_or_default());
        return Ok(());
    }
    if output.is_quiet() {
        return Ok(());
    }

    if entries.is_empty() {
        output.info(if pending_only {
            "Nothing pending: every tracked title is in the library"
        } else {
            "No tracked entries yet. Run 'plexwatch scan' first."
        });
        return Ok(());
    }

    println!("{}", render_table(&entries));
    let added = entries.iter().filter(|e| e.is_added()).count();
    output.println(format!("{} tracked, {} in library, {} pending", entries.len(), added, entries.len() - added));
    Ok(())
}

/// Pending first, then by title
fn select(mut entries: Vec<TrackedEntry>, pending_only: bool) -> Vec<TrackedEntry> {
    if pending_only {
        entries.retain(|e| !e.is_added());
    }
    entries.sort_by(|a, b| {
        a.is_added()
            .cmp(&b.is_added())
            .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
    });
    entries
}

fn render_table(entries: &[TrackedEntry]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL);
    table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    table.set_header(
        ["Title", "Year", "Type", "ID", "Status", "Added"]
            .into_iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
            .collect::<Vec<_>>(),
    );

    for entry in entries {
        let id = match (entry.external_provider, entry.external_id.as_deref()) {
            (Some(provider), Some(id)) => format!("{}:{}", provider.as_str(), id),
            (None, Some(id)) => id.to_string(),
            _ => "-".to_string(),
        };
        let status = match entry.status {
            TrackingStatus::Added => Cell::new("added").fg(Color::Green),
            TrackingStatus::Pending => Cell::new("pending").fg(Color::Yellow),
        };
        let added = entry
            .added_at
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());

        table.add_row(vec![
            Cell::new(&entry.title),
            Cell::new(entry.year.map(|y| y.to_string()).unwrap_or_else(|| "-".to_string())),
            Cell::new(entry.media_type.as_str()),
            Cell::new(id),
            status,
            Cell::new(added),
        ]);
    }
    table
}
