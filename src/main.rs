// moltboard-gh: query GitHub through the MoltBoard access layer.
// Prints the result envelope as JSON and keeps the cache between runs.

use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{error, warn};

use moltboard_github::github::StateFilter;
use moltboard_github::logging::init_logging;
use moltboard_github::{Config, GitHubService, IssueQuery, MoltError, QueryResult};

#[derive(Parser, Debug)]
#[command(name = "moltboard-gh")]
#[command(about = "Rate-limit aware GitHub queries for MoltBoard")]
struct Args {
    /// Skip loading and saving the on-disk cache
    #[arg(long)]
    no_cache: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show repository metadata and fork linkage
    Repo {
        /// Repository as owner/repo
        repo: String,
    },
    /// List a repository's issues (uncached)
    Issues {
        /// Repository as owner/repo
        repo: String,
        #[command(flatten)]
        options: IssueArgs,
    },
    /// List a repository's issues for a project (cached)
    ProjectIssues {
        project_id: String,
        /// Repository as owner/repo
        repo: String,
        #[command(flatten)]
        options: IssueArgs,
    },
    /// Drop all cached responses
    ClearCache,
}

#[derive(clap::Args, Debug)]
struct IssueArgs {
    #[arg(long, value_enum, default_value_t = StateArg::Open)]
    state: StateArg,
    #[arg(long, default_value_t = 100)]
    per_page: u32,
    #[arg(long, default_value_t = 10)]
    max_pages: u32,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StateArg {
    Open,
    Closed,
    All,
}

impl From<&IssueArgs> for IssueQuery {
    fn from(args: &IssueArgs) -> Self {
        IssueQuery {
            state: match args.state {
                StateArg::Open => StateFilter::Open,
                StateArg::Closed => StateFilter::Closed,
                StateArg::All => StateFilter::All,
            },
            per_page: args.per_page,
            max_pages: args.max_pages,
            min_remaining: None,
        }
    }
}

fn split_repo(full_name: &str) -> Result<(&str, &str), MoltError> {
    match full_name.split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
            Ok((owner, repo))
        }
        _ => Err(MoltError::Config(format!(
            "expected owner/repo, got {}",
            full_name
        ))),
    }
}

fn print_result<T: Serialize>(result: &QueryResult<T>) -> Result<ExitCode, MoltError> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(if result.data.is_some() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn run(args: Args, config: Config) -> Result<ExitCode, MoltError> {
    let service = GitHubService::from_config(&config)?;
    let cache_dir = if args.no_cache {
        None
    } else {
        config.cache_dir.clone()
    };

    if let Some(dir) = &cache_dir {
        if let Err(e) = service.load_caches(dir) {
            warn!(error = %e, "could not load cache snapshots");
        }
    }

    let token = config.token.as_deref();
    let code = match &args.command {
        Command::Repo { repo } => {
            let (owner, repo) = split_repo(repo)?;
            print_result(&service.fetch_repository_metadata(owner, repo, token).await)?
        }
        Command::Issues { repo, options } => {
            let (owner, repo) = split_repo(repo)?;
            let result = service
                .fetch_repository_issues(owner, repo, token, options.into())
                .await;
            print_result(&result)?
        }
        Command::ProjectIssues {
            project_id,
            repo,
            options,
        } => {
            let (owner, repo) = split_repo(repo)?;
            let result = service
                .fetch_project_issues(project_id, owner, repo, token, options.into())
                .await;
            print_result(&result)?
        }
        Command::ClearCache => {
            if let Some(dir) = &cache_dir {
                service.purge_caches(dir)?;
            }
            return Ok(ExitCode::SUCCESS);
        }
    };

    if let Some(dir) = &cache_dir {
        service.save_caches(dir)?;
    }

    Ok(code)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("moltboard-gh: {}", e);
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config.log_level);

    match run(args, config).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "moltboard-gh failed");
            eprintln!("moltboard-gh: {}", e);
            ExitCode::FAILURE
        }
    }
}
