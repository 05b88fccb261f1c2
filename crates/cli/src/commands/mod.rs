//! Command dispatch and result envelopes.

mod auth;
mod history;
mod quota;
mod run;

use std::time::Instant;

use serde::Serialize;

use crate::cli::{AuthAction, Cli, Commands};
use crate::error::Result;
use crate::output::{OutputFormat, ResultBuilder, print_result};
use crate::settings::Overrides;

pub async fn dispatch(cli: Cli) -> Result<()> {
	let format = cli.format;
	let overrides = Overrides {
		config: cli.config,
		database: cli.database,
	};
	let started = Instant::now();

	match cli.command {
		Commands::Run(args) => emit("run", format, started, run::execute(args, &overrides).await),
		Commands::Sessions { limit } => emit("sessions", format, started, history::sessions(limit, &overrides)),
		Commands::Invitations { limit } => emit("invitations", format, started, history::invitations(limit, &overrides)),
		Commands::Quota => emit("quota", format, started, quota::execute(&overrides)),
		Commands::Auth { action } => match action {
			AuthAction::Show => emit("auth show", format, started, auth::show(&overrides)),
			AuthAction::Clear => emit("auth clear", format, started, auth::clear(&overrides)),
		},
	}
}

/// Prints the envelope for `result` and passes the error on.
fn emit<T: Serialize>(command: &str, format: OutputFormat, started: Instant, result: Result<T>) -> Result<()> {
	match result {
		Ok(data) => {
			print_result(&ResultBuilder::started_at(command, started).data(data).build(), format);
			Ok(())
		}
		Err(err) => {
			let envelope = ResultBuilder::<T>::started_at(command, started)
				.error_with_details(err.code(), err.to_string(), err.details())
				.build();
			print_result(&envelope, format);
			Err(err)
		}
	}
}
