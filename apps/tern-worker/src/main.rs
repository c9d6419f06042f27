use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = tern_worker::Args::parse();

	tern_worker::run(args).await
}
