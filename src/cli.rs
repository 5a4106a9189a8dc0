//! Command-line surface (spec.md S6 "CLI surface"). Model/property file
//! ingestion is explicitly out of scope for this engine (spec.md S2
//! Non-goals), so the only runnable subcommand is `demo`, which drives the
//! bundled two-state-chain generator end to end; every other flag below
//! still exists because the collaborator contract in spec.md S6 enumerates
//! them, and they're threaded straight into `explorer::Config`.

use clap::{Parser, Subcommand, ValueEnum};

use crate::explorer::{Config, EventBias, Method};

#[derive(Parser, Debug)]
#[command(name = "truncate-ctmc", version, about = "Probabilistic state-space truncation for CTMCs")]
pub struct Cli {
	#[command(subcommand)]
	pub command: CliCommand,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
	/// Run the bundled two-state-chain demo model through the refinement
	/// controller and print the resulting P_min/P_max window.
	Demo(TruncationArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct TruncationArgs {
	#[arg(long, default_value_t = 1.0e-6)]
	pub kappa: f64,
	#[arg(long, default_value_t = 1000.0)]
	pub reduce_kappa: f64,
	#[arg(long, default_value_t = 2.0)]
	pub approx_factor: f64,
	#[arg(long, default_value_t = 1.0)]
	pub fudge_factor: f64,
	#[arg(long, default_value_t = 1.0e-3)]
	pub prob_win: f64,
	#[arg(long, default_value_t = 10)]
	pub max_approx_count: u32,
	#[arg(long, default_value_t = false)]
	pub no_prop_refine: bool,

	/// Destination for the finished sparse model; left unhandled here and
	/// delegated to an external exporter, per spec.md S6.
	#[arg(long)]
	pub export_filename: Option<String>,
	#[arg(long, default_value_t = false)]
	pub export_perimeter_states: bool,
	#[arg(long)]
	pub import_filename: Option<String>,
	#[arg(long)]
	pub property: Option<String>,
	#[arg(long)]
	pub consts: Option<String>,
	#[arg(long)]
	pub export_trans: Option<String>,
	#[arg(long, default_value_t = false)]
	pub rank_transitions: bool,

	#[arg(long)]
	pub max_iterations: Option<u64>,
	#[arg(long, value_enum, default_value_t = MethodArg::Iterative)]
	pub method: MethodArg,
	#[arg(long, default_value_t = 1)]
	pub threads: u8,
	#[arg(long, default_value_t = true)]
	pub preterminate: bool,
	#[arg(long, value_enum, default_value_t = EventArg::Undefined)]
	pub event: EventArg,
	#[arg(long, default_value_t = 0.0)]
	pub distance_weight: f64,
	#[arg(long, default_value_t = false)]
	pub quiet: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum MethodArg {
	Iterative,
	Priority,
	ReExploring,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum EventArg {
	Undefined,
	Rare,
	Common,
}

impl From<TruncationArgs> for Config {
	fn from(args: TruncationArgs) -> Self {
		Config {
			kappa: args.kappa,
			reduce_kappa: args.reduce_kappa,
			approx_factor: args.approx_factor,
			fudge_factor: args.fudge_factor,
			prob_win: args.prob_win,
			max_approx_count: args.max_approx_count,
			no_prop_refine: args.no_prop_refine,
			max_iterations: args.max_iterations,
			max_states: None,
			threads: args.threads as usize,
			method: match args.method {
				MethodArg::Iterative => Method::Iterative,
				MethodArg::Priority => Method::Priority,
				MethodArg::ReExploring => Method::ReExploring,
			},
			preterminate: args.preterminate,
			quiet: args.quiet,
			event: match args.event {
				EventArg::Undefined => EventBias::Undefined,
				EventArg::Rare => EventBias::Rare,
				EventArg::Common => EventBias::Common,
			},
			distance_weight: args.distance_weight,
			reachability_overshoot_tolerance: 1.0e-9,
		}
	}
}
