use clap::Parser;
use clap::Subcommand;
use cmd::command::search;
use cmd::command::search::Search;
use cmd::command::segment;
use cmd::command::segment::Segment;
use cmd::command::user_agent;
use cmd::command::user_agent::UserAgent;
use cmd::command::Cfg;
use cmd::config::Config;
use cmd::error::Error;
use cmd::error::Result;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

#[derive(Subcommand, Clone)]
enum Commands {
    /// Search users by attributes and events
    Search(Search),
    /// Create a recurring user segment
    Segment(Segment),
    /// Resolve browser, os and device of a user agent
    UserAgent(UserAgent),
}

impl Commands {
    fn cfg(&self) -> &Cfg {
        match self {
            Commands::Search(args) => &args.cfg,
            Commands::Segment(args) => &args.cfg,
            Commands::UserAgent(args) => &args.cfg,
        }
    }
}

#[derive(Parser)]
#[command(propagate_version = true)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let Some(command) = &args.command else {
        return Err(Error::BadRequest("no command specified".to_string()));
    };

    let cfg: Config = config::Config::builder()
        .add_source(config::File::from(command.cfg().config.clone()))
        .build()?
        .try_deserialize()?;

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cfg.log.level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).map_err(Error::SetGlobalDefaultError)?;

    let version = env!("CARGO_PKG_VERSION");
    info!("cmd v{version}");

    match command {
        Commands::Search(args) => search::run(args, &cfg).await?,
        Commands::Segment(args) => segment::run(args, &cfg).await?,
        Commands::UserAgent(args) => user_agent::run(args, &cfg)?,
    };

    Ok(())
}
