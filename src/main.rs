#![allow(dead_code)]

mod bookkeeper;
mod cli;
mod error;
mod explorer;
mod generator;
mod logging;
mod property;
mod refinement;
mod solver;
mod state;
mod threaded;
mod transition;

use clap::Parser;
use colored::Colorize;

use cli::{Cli, CliCommand};
use error::EngineResult;
use explorer::Config;
use generator::two_state_chain;
use logging::{error, error_and_exit, message};
use property::{Property, StateFormula};
use refinement::Controller;
use solver::UniformizationSolver;

fn main() {
	let cli = Cli::parse();
	let result = match cli.command {
		CliCommand::Demo(args) => run_demo(args.into()),
	};
	if let Err(err) = result {
		error!("{err}");
		error_and_exit!("run failed: {err}");
	}
}

fn run_demo(config: Config) -> EngineResult<()> {
	let gen = two_state_chain();
	let property = Property::until(StateFormula::new("true"), StateFormula::new("at_b"), Some(1.0));
	let solver = UniformizationSolver::new();

	let mut controller = Controller::new(&gen, config)?;
	let outcome = controller.run(&property, &solver)?;

	message!(
		"converged after {} pass(es) over {} states",
		outcome.passes,
		outcome.states
	);
	println!(
		"{}",
		format!(
			"P_min = {:.6}, P_max = {:.6} (window {:.2e})",
			outcome.p_min,
			outcome.p_max,
			outcome.window()
		)
		.green()
	);
	Ok(())
}
