use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "skein")]
#[command(about = "Private side threads for chat messages")]
#[command(version)]
/// Command-line arguments.
pub struct Cli {
	/// TOML configuration file (defaults apply when absent)
	#[arg(long, short = 'c', global = true, value_name = "PATH")]
	pub config: Option<PathBuf>,

	/// Debug logging for skein itself
	#[arg(long, global = true)]
	pub debug: bool,

	/// Debug logging for the platform layer
	#[arg(long, global = true)]
	pub debug_platform: bool,

	/// Subcommand to execute.
	#[command(subcommand)]
	pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
	/// Run a scripted scenario against an in-memory guild and print the threads
	Replay {
		/// Scenario file
		scenario: PathBuf,

		/// Print the result as JSON
		#[arg(long)]
		json: bool,
	},
	/// Decode thread ownership from a channel name and topic
	Decode {
		/// Channel name
		name: String,
		/// Channel topic
		topic: String,
	},
}
