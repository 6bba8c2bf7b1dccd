use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Args;
use ingester::mappers::UserAgentMapper;

use crate::command::Cfg;
use crate::config::Config;
use crate::error::Error;
use crate::error::Result;

#[derive(Args, Clone, Debug)]
pub struct UserAgent {
    #[command(flatten)]
    pub cfg: Cfg,
    /// Overrides the regexes database of the config
    #[arg(long)]
    pub ua_db_path: Option<PathBuf>,
    pub user_agent: String,
}

pub fn run(args: &UserAgent, cfg: &Config) -> Result<()> {
    let path = args
        .ua_db_path
        .as_ref()
        .or(cfg.data.ua_db_path.as_ref())
        .ok_or_else(|| Error::BadRequest("user agent database path is not set".to_string()))?;

    let mapper = UserAgentMapper::try_new(path)?;
    let resolved: BTreeMap<_, _> = mapper.resolve(&args.user_agent).into_iter().collect();
    println!("{}", serde_json::to_string_pretty(&resolved)?);

    Ok(())
}
