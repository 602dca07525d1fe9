//! Run one upstream search and print the raw payload next to the normalized records.
//! Usage:
//!   cargo run --bin search_props -- <search term...>
//! Reads the same UPSTREAM_* variables as the server (.env supported).

use anyhow::Result;
use dotenvy::dotenv;
use std::env;
use watchdiary::config::Config;
use watchdiary::normalize::{self, NormalizeOptions, ResponseShape};
use watchdiary::search::UpstreamClient;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let query = env::args().skip(1).collect::<Vec<_>>().join(" ");
    if query.trim().is_empty() {
        eprintln!("Usage: cargo run --bin search_props -- <search term>");
        std::process::exit(1);
    }

    let config = Config::from_env()?;
    let expected = config.upstream.provider.shape();
    let client = UpstreamClient::new(config.upstream.clone())?;
    let raw = client.fetch_raw(query.trim()).await?;

    println!("Raw response:\n{}", serde_json::to_string_pretty(&raw)?);
    match ResponseShape::detect(&raw) {
        Some(shape) if shape == expected => println!("\nShape: {:?}", shape),
        Some(shape) => println!("\nShape: {:?} (provider expects {:?})", shape, expected),
        None => println!("\nShape: none recognized"),
    }

    let all = normalize::normalize(
        expected,
        &raw,
        NormalizeOptions {
            require_image: false,
        },
    );
    let kept = normalize::normalize(expected, &raw, config.upstream.normalize);
    println!(
        "\nNormalized {} entries ({} kept after filters):\n{}",
        all.len(),
        kept.len(),
        serde_json::to_string_pretty(&kept)?
    );
    Ok(())
}
