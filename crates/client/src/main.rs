use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use meritpath_citation::{CitersQuery, JobStatus, SortKey};
use meritpath_client::{CitationSession, ClientConfig, Notifier};
use meritpath_core::UserId;
use meritpath_infra::{CitationStore, FileStateStorage, HttpCitationApi};

#[derive(Parser, Debug)]
#[command(name = "meritpath", about = "MeritPath citation analysis client")]
struct Cli {
    /// Signed-in user id.
    #[arg(long, env = "MERITPATH_USER_ID", global = true)]
    user: Option<UserId>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the locally known job status.
    Status {
        /// Ask the backend first.
        #[arg(long)]
        refresh: bool,
    },
    /// Load the profile and queue the citation analysis.
    Start,
    /// Follow the job until it is done.
    Watch {
        /// Seconds between backend polls.
        #[arg(long, default_value_t = 15)]
        interval: u64,
    },
    /// Forget the local state.
    Reset,
    /// Show the profile, optionally linking a Semantic Scholar author id.
    Profile {
        #[arg(long)]
        link: Option<String>,
    },
    /// List researchers who cited your work.
    Citers {
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, value_enum)]
        sort: Option<SortArg>,
        /// Sort descending (only with --sort).
        #[arg(long, requires = "sort")]
        desc: bool,
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Print citer ids.
        #[arg(long)]
        ids: bool,
        #[arg(long, default_value_t = 10)]
        page_size: usize,
    },
    /// Show one citer and which of your papers they cited.
    Citer {
        /// Citer id as listed by `citers --ids`.
        id: String,
    },
}

#[derive(ValueEnum, Debug, Copy, Clone)]
enum SortArg {
    Name,
    Papers,
    Citations,
}

impl From<SortArg> for SortKey {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Name => SortKey::CiterName,
            SortArg::Papers => SortKey::PaperCount,
            SortArg::Citations => SortKey::TotalCitations,
        }
    }
}

/// Alerts go straight to the terminal.
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn alert(&self, message: &str) {
        println!("{message}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    meritpath_observability::init();

    let cli = Cli::parse();
    let config = ClientConfig::from_env();

    match cli.command {
        Command::Status { refresh: false } => {
            let state = open_store(&config).snapshot();
            println!("status: {}", state.status);
            println!("eligible: {}", state.is_eligible);
        }
        Command::Status { refresh: true } => {
            let session = connect(&config, cli.user)?;
            if let Err(err) = session.check_remote_status().await {
                eprintln!("could not reach backend, status unknown: {err}");
            }
            let state = session.store().snapshot();
            println!("status: {}", state.status);
            println!("eligible: {}", state.is_eligible);
        }
        Command::Start => {
            let session = connect(&config, cli.user)?;
            let (_, check) = session.load_profile().await.context("failed to load profile")?;
            if check.needs_semantic_scholar_id {
                println!("link your Semantic Scholar id first: meritpath profile --link <ID>");
                return Ok(());
            }
            session.start_analysis().await?;
        }
        Command::Watch { interval } => {
            let session = connect(&config, cli.user)?;
            watch(&session, &config, Duration::from_secs(interval.max(1))).await?;
        }
        Command::Reset => {
            open_store(&config).reset();
            println!("status: {}", JobStatus::NotStarted);
        }
        Command::Profile { link } => {
            let session = connect(&config, cli.user)?;
            let (profile, check) = match link {
                Some(id) => session.link_semantic_scholar_id(&id).await?,
                None => session.load_profile().await?,
            };
            println!("{}", serde_json::to_string_pretty(&profile)?);
            println!("eligible: {}", check.eligible);
            if check.needs_semantic_scholar_id {
                println!("no Semantic Scholar id linked yet");
            }
        }
        Command::Citers {
            search,
            sort,
            desc,
            page,
            ids,
            page_size,
        } => {
            let session = connect(&config, cli.user)?;

            let mut query = CitersQuery::new();
            query.set_search(search);
            query.set_page_size(page_size)?;
            if let Some(sort) = sort {
                query.request_sort(sort.into());
                if desc {
                    query.request_sort(sort.into());
                }
            }
            query.set_page(page);

            if session.store().status() != JobStatus::Done {
                if let Err(err) = session.check_remote_status().await {
                    eprintln!("could not reach backend, status unknown: {err}");
                }
            }
            let view = session.citers(&query).await?;
            let Some(page) = view.page() else {
                println!("{}", view.message().unwrap_or_default());
                return Ok(());
            };
            for c in &page.rows {
                if ids {
                    print!("{:<16} ", c.citer_id);
                }
                println!(
                    "{:<40} {:>8} papers {:>8} citations",
                    c.citer_name, c.paper_count, c.total_citations
                );
            }
            println!(
                "page {}/{}, {} citers, {} citations",
                page.page,
                page.total_pages.max(1),
                page.total_entries,
                page.total_citations
            );
        }
        Command::Citer { id } => {
            let session = connect(&config, cli.user)?;
            let detail = session
                .citer_detail(&id)
                .await
                .with_context(|| format!("failed to load citer {id}"))?;

            println!("{} ({})", detail.citer.citer_name, detail.profile_url());
            println!("total papers published: {}", detail.citer.paper_count);
            println!("citations to your work: {}", detail.citer.total_citations);
            for (yours, citing) in &detail.papers {
                println!();
                println!("Your Paper: {yours}");
                for title in citing {
                    println!("  {title}");
                }
            }
        }
    }

    Ok(())
}

fn open_store(config: &ClientConfig) -> CitationStore {
    CitationStore::open(Arc::new(FileStateStorage::in_dir(&config.state_dir)))
}

fn connect(config: &ClientConfig, user: Option<UserId>) -> Result<CitationSession<HttpCitationApi>> {
    let user = user.context("--user (or MERITPATH_USER_ID) is required for this command")?;
    Ok(CitationSession::from_config(config, user)?.with_notifier(Arc::new(ConsoleNotifier)))
}

async fn watch(
    session: &CitationSession<HttpCitationApi>,
    config: &ClientConfig,
    interval: Duration,
) -> Result<()> {
    attach_realtime(session, config)?;
    let changes = session.store().watch();
    println!("status: {}", session.store().status());

    loop {
        if let Err(err) = session.check_remote_status().await {
            eprintln!("status unknown: {err}");
        }
        for state in changes.drain() {
            println!("status: {}", state.status);
        }
        if session.store().status() == JobStatus::Done {
            break;
        }
        tokio::time::sleep(interval).await;
    }

    session.detach_realtime();
    Ok(())
}

#[cfg(feature = "redis")]
fn attach_realtime(session: &CitationSession<HttpCitationApi>, config: &ClientConfig) -> Result<()> {
    use meritpath_infra::event_bus::RedisChangeFeed;

    if let Some(url) = &config.redis_url {
        let feed = RedisChangeFeed::new(url, config.realtime_channel.clone())?;
        session.attach_realtime(&feed)?;
    }
    Ok(())
}

#[cfg(not(feature = "redis"))]
fn attach_realtime(_session: &CitationSession<HttpCitationApi>, config: &ClientConfig) -> Result<()> {
    if config.redis_url.is_some() {
        tracing::warn!("MERITPATH_REDIS_URL is set but this build has no redis support; polling only");
    }
    Ok(())
}
