use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use outreach_protocol::ConnectionDegree;

use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "outreach")]
#[command(about = "Quota-bounded outreach runs from the command line")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug, -vvv trace)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Output format
	#[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
	pub format: OutputFormat,

	/// Settings file (defaults to <data dir>/outreach/settings.json)
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// SQLite database holding invitations and sessions
	#[arg(long, global = true, value_name = "FILE")]
	pub database: Option<PathBuf>,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Run one search-and-connect session
	Run(RunArgs),

	/// List recent sessions
	Sessions {
		#[arg(long, default_value_t = 10)]
		limit: usize,
	},

	/// List recent invitations
	#[command(alias = "inv")]
	Invitations {
		#[arg(long, default_value_t = 100)]
		limit: usize,
	},

	/// Show day and week quota usage
	Quota,

	/// Inspect or clear the cached login session
	Auth {
		#[command(subcommand)]
		action: AuthAction,
	},
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
	/// Recorded search script driving the run
	#[arg(long, value_name = "SCRIPT")]
	pub replay: PathBuf,

	#[arg(long)]
	pub sector: Option<String>,

	#[arg(long)]
	pub job_title: Option<String>,

	#[arg(long)]
	pub location: Option<String>,

	/// Connection degree: 2nd or 3rd
	#[arg(long)]
	pub degree: Option<ConnectionDegree>,

	/// Stop after visiting this many profiles
	#[arg(long)]
	pub max_profiles: Option<u32>,
}

#[derive(Subcommand, Debug)]
pub enum AuthAction {
	/// Show cookies and storage in the cached session
	Show,
	/// Delete the cached session
	Clear,
}
