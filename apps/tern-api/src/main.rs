use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = tern_api::Args::parse();

	tern_api::run(args).await
}
