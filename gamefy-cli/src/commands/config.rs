use anyhow::Result;
use gamefy_core::GamefyConfig;
use owo_colors::OwoColorize;

pub fn run() -> Result<()> {
    let config_path = GamefyConfig::config_path()?;
    let config = GamefyConfig::load()?;

    println!("{}", "Paths".bold());
    println!("  Config:     {}", config_path.display());
    println!("  Events:     {}", config.events_path().display());

    println!("{}", "Feed".bold());
    match config.feed_url() {
        Some(url) => println!("  URL:        {}", url),
        None => println!("  URL:        {}", "not configured".dimmed()),
    }
    println!(
        "  Window:     {} days back, {} days ahead",
        config.past_days, config.future_days
    );

    Ok(())
}
