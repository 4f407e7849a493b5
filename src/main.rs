use clap::Parser;
use color_eyre::Result;
use conference_simulator::{
    init_errors,
    init_logging,
    run,
    Args,
    Config,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_errors()?;
    init_logging()?;

    let args = Args::parse();
    let config = Config::new(&args)?;
    if args.save {
        config.save()?;
    }

    let outcome = run(&config, &args).await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
