use std::{
	fs,
	path::{Path, PathBuf},
};

use clap::Parser;
use color_eyre::eyre;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use arag_cli::OutputFormat;
use arag_domain::{Candidate, Coverage, Plan, RequestContext, RoundResult};
use arag_executor::{Executor, RetrievalReport, StageError};

#[derive(Debug, Parser)]
#[command(
	version = arag_cli::VERSION,
	rename_all = "kebab",
	styles = arag_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// Plan and request bundles to execute, one run per file.
	#[arg(long = "case", value_name = "FILE", num_args = 1.., required = true)]
	pub cases: Vec<PathBuf>,
	/// Also write `<DIR>/<case_id>.json` for every case.
	#[arg(long, value_name = "DIR")]
	pub output: Option<PathBuf>,
	#[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
	pub format: OutputFormat,
}

#[derive(Debug, Deserialize)]
struct CaseFile {
	#[serde(default)]
	id: Option<String>,
	plan: Plan,
	normalized_query: String,
	#[serde(default)]
	constraints: Map<String, Value>,
	#[serde(default)]
	guardrails: Map<String, Value>,
	#[serde(default)]
	signals: Map<String, Value>,
}

#[derive(Debug)]
struct Case {
	id: String,
	plan: Plan,
	context: RequestContext,
}

#[derive(Debug, Serialize)]
struct CaseOutput {
	case_id: String,
	final_evidence: Vec<Candidate>,
	coverage: Option<Coverage>,
	retrieval_report: RetrievalReport,
	errors: Vec<StageError>,
	rounds: Vec<RoundResult>,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = arag_config::load(&args.config)?;

	arag_cli::init_tracing(&config.service.log_level);

	let executor = Executor::from_config(&config);

	if let Some(dir) = &args.output {
		fs::create_dir_all(dir)?;
	}

	for path in &args.cases {
		let case = load_case(path)?;

		tracing::info!(case_id = %case.id, path = %path.display(), "Running case.");

		let output = run_case(&executor, case).await;

		if !output.errors.is_empty() {
			tracing::warn!(
				case_id = %output.case_id,
				errors = output.errors.len(),
				"Case finished with stage errors."
			);
		}

		println!("{}", render(&output, args.format)?);

		if let Some(dir) = &args.output {
			let path = write_output(dir, &output)?;

			tracing::info!(case_id = %output.case_id, path = %path.display(), "Wrote case output.");
		}
	}

	Ok(())
}

fn load_case(path: &Path) -> color_eyre::Result<Case> {
	let raw = fs::read_to_string(path)?;
	let file: CaseFile = serde_json::from_str(&raw)?;

	if file.normalized_query.trim().is_empty() {
		return Err(eyre::eyre!("Case {} must include a non-empty normalized_query.", path.display()));
	}

	let id = match file.id.filter(|id| !id.trim().is_empty()) {
		Some(id) => id,
		None => path
			.file_stem()
			.map(|stem| stem.to_string_lossy().into_owned())
			.ok_or_else(|| eyre::eyre!("Cannot derive a case id from {}.", path.display()))?,
	};
	let context = RequestContext {
		normalized_query: file.normalized_query,
		constraints: file.constraints,
		guardrails: file.guardrails,
		signals: file.signals,
	};

	Ok(Case { id, plan: file.plan.normalized(), context })
}

async fn run_case(executor: &Executor, case: Case) -> CaseOutput {
	let state = executor.run(case.plan, case.context).await;

	CaseOutput {
		case_id: case.id,
		final_evidence: state.final_evidence,
		coverage: state.coverage,
		retrieval_report: state.retrieval_report,
		errors: state.errors,
		rounds: state.rounds,
	}
}

fn render(output: &CaseOutput, format: OutputFormat) -> serde_json::Result<String> {
	match format {
		OutputFormat::Compact => serde_json::to_string(output),
		OutputFormat::Pretty => serde_json::to_string_pretty(output),
	}
}

fn write_output(dir: &Path, output: &CaseOutput) -> color_eyre::Result<PathBuf> {
	let path = dir.join(format!("{}.json", output.case_id));

	fs::write(&path, serde_json::to_string_pretty(output)?)?;

	Ok(path)
}
