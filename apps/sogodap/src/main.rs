use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = sogodap::Args::parse();
	sogodap::run(args).await
}
