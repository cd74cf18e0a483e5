use clap::Parser;

use arag_run::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = Args::parse();

	arag_run::run(args).await
}
