//! skein binary.
//!
//! - `replay`: run a scenario file against an in-memory guild
//! - `decode`: show the thread ownership encoded in a channel name and topic

use anyhow::{Context, bail};
use clap::Parser;
use skein_bot::cli::{Cli, Command};
use skein_bot::config::BotConfig;
use skein_bot::{logging, replay};
use skein_threads::ThreadCodec;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	let config = BotConfig::load_or_default(cli.config.as_deref()).context("loading configuration")?;
	logging::init(&config.log, cli.debug, cli.debug_platform);

	match cli.command {
		Command::Replay { scenario, json } => {
			tracing::info!(scenario = %scenario.display(), "replay.start");
			let script = replay::Scenario::load(&scenario)?;
			let reports = replay::run(&script, config.threads).await?;
			if json {
				println!("{}", replay::render_json(&reports)?);
			} else {
				print!("{}", replay::render(&reports));
			}
		}
		Command::Decode { name, topic } => {
			let codec = ThreadCodec::new(&config.threads);
			let Some(decoded) = codec.decode(&name, &topic) else {
				bail!("not a thread channel: {name:?}");
			};
			println!("origin:        {}", decoded.origin);
			println!("first contact: {}", decoded.first_contact);
			match decoded.starter {
				Some(starter) => println!("starter:       {starter}"),
				None => println!("starter:       unknown"),
			}
		}
	}
	Ok(())
}
