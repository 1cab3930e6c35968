use anyhow::Result;
use gamefy_core::feed::http_client;
use gamefy_core::{DateRange, FeedClient, GamefyConfig, JsonFileStore, assemble};
use owo_colors::OwoColorize;

use crate::render::{Render, day_label};
use crate::utils::tui::create_spinner;

pub async fn run(
    config: &GamefyConfig,
    feed_override: Option<&str>,
    range: DateRange,
    json: bool,
) -> Result<()> {
    let feed = match feed_override.or(config.feed_url()) {
        Some(url) => {
            let client = FeedClient::new(http_client(config.feed_timeout()?)?, url)?;
            let spinner = (!json).then(|| create_spinner("Fetching calendar feed".into()));
            let result = client.occurrences(&range).await;
            if let Some(spinner) = spinner {
                spinner.finish_and_clear();
            }
            result
        }
        None => Ok(Vec::new()),
    };

    let store = JsonFileStore::new(config.events_path());
    let view = assemble(feed, &store, &range)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&view.items)?);
        return Ok(());
    }

    if let Some(err) = &view.feed_error {
        println!("{}", format!("{}; showing stored events only", err).dimmed());
    }

    if view.items.is_empty() {
        println!("{}", "No events found".dimmed());
        return Ok(());
    }

    // Group events by day and print
    let today = chrono::Local::now().date_naive();
    let mut current_date: Option<String> = None;

    for item in &view.items {
        let date_label = day_label(item, today);

        if current_date.as_ref() != Some(&date_label) {
            if current_date.is_some() {
                println!();
            }
            println!("{}", date_label.bold());
            current_date = Some(date_label);
        }

        println!("  {}", item.render());
    }

    Ok(())
}
