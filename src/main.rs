#[macro_use]
extern crate log;

use pairgan::{cli, commands, logging};

fn main() {
	logging::init_simple_logger();

	let app_m = cli::build_cli();

	let result = match app_m.subcommand() {
		("train", Some(sub_m)) => commands::train(sub_m),
		("test", Some(sub_m)) => commands::test(sub_m),
		("export", Some(sub_m)) => commands::export(sub_m),
		_ => unreachable!("clap requires a subcommand"),
	};

	if let Err(err) = result {
		error!("Error: {}", err);
		std::process::exit(1);
	}
}
