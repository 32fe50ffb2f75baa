use std::sync::Arc;

use almoner::api::http::HttpResourceApi;
use almoner::auth::{Anonymous, AuthContext, StaticSession};
use almoner::capabilities::{
    share_or_copy, AutoConfirm, CapabilityError, Clipboard, ConfirmPrompt, Confirmer,
    SharePayload,
};
use almoner::config::ClientConfig;
use almoner::models::{
    ContactInfo, Event, GalleryItem, SocialLink, StudyMaterial, TrustPartner, VolunteerRole,
};
use almoner::query::{ListQuery, SortDirection, StatusFilter};
use almoner::{Mode, RecordId, Removal, Resource, ResourceController};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[derive(Parser)]
#[command(name = "almoner-admin", version, about = "Manage Almoner site collections")]
struct Cli {
    /// Site root, e.g. https://example.org
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Bearer token for admin requests
    #[arg(long, global = true)]
    token: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Show canned data when the API is unreachable
    #[arg(long, global = true)]
    offline_fallback: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum ResourceKind {
    Events,
    VolunteerRoles,
    SocialLinks,
    ContactInfo,
    TrustPartners,
    StudyMaterials,
    Gallery,
}

#[derive(Subcommand)]
enum Command {
    /// Print the collection as JSON lines
    List {
        resource: ResourceKind,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Create a record from a JSON draft
    Create {
        resource: ResourceKind,
        #[arg(long = "json")]
        draft: String,
    },
    /// Replace a record with a JSON draft
    Update {
        resource: ResourceKind,
        id: String,
        #[arg(long = "json")]
        draft: String,
    },
    /// Flip a record's active flag
    Toggle { resource: ResourceKind, id: String },
    /// Delete a record
    Delete {
        resource: ResourceKind,
        id: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Print a record's public link
    Share { resource: ResourceKind, id: String },
}

#[derive(Args, Default)]
struct FilterArgs {
    #[arg(long)]
    search: Option<String>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long, value_enum, default_value_t = StatusArg::All)]
    status: StatusArg,
    /// Earliest date, inclusive (YYYY-MM-DD or RFC 3339)
    #[arg(long, value_parser = parse_date)]
    from: Option<DateTime<Utc>>,
    /// Latest date, inclusive
    #[arg(long, value_parser = parse_date)]
    to: Option<DateTime<Utc>>,
    /// Field to sort by
    #[arg(long)]
    sort: Option<String>,
    #[arg(long)]
    desc: bool,
}

#[derive(Clone, Copy, Default, ValueEnum)]
enum StatusArg {
    #[default]
    All,
    Active,
    Inactive,
}

impl FilterArgs {
    fn to_query(&self) -> ListQuery {
        let mut query = ListQuery::new()
            .status(match self.status {
                StatusArg::All => StatusFilter::All,
                StatusArg::Active => StatusFilter::Active,
                StatusArg::Inactive => StatusFilter::Inactive,
            })
            .between(self.from, self.to);
        if let Some(search) = &self.search {
            query = query.search(search.clone());
        }
        if let Some(category) = &self.category {
            query = query.category(category.clone());
        }
        if let Some(key) = &self.sort {
            let direction = if self.desc {
                SortDirection::Descending
            } else {
                SortDirection::Ascending
            };
            query = query.sort_by(key.clone(), direction);
        }
        query
    }
}

fn parse_date(raw: &str) -> Result<DateTime<Utc>, String> {
    almoner::models::parse_datetime(raw).ok_or_else(|| format!("invalid date '{raw}'"))
}

/// Asks on the terminal.
struct StdinConfirmer;

#[async_trait]
impl Confirmer for StdinConfirmer {
    async fn confirm(&self, prompt: &ConfirmPrompt) -> bool {
        let mut stdout = tokio::io::stdout();
        let question = format!("{}\n{} [y/N] ", prompt.title, prompt.message);
        if stdout.write_all(question.as_bytes()).await.is_err() || stdout.flush().await.is_err() {
            return false;
        }
        let mut answer = String::new();
        let mut stdin = BufReader::new(tokio::io::stdin());
        match stdin.read_line(&mut answer).await {
            Ok(_) => matches!(answer.trim(), "y" | "Y" | "yes"),
            Err(_) => false,
        }
    }
}

/// A terminal has no clipboard; the link is printed instead.
struct StdoutClipboard;

#[async_trait]
impl Clipboard for StdoutClipboard {
    async fn write_text(&self, text: &str) -> Result<(), CapabilityError> {
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(format!("{text}\n").as_bytes())
            .await
            .map_err(|e| CapabilityError::Failed(e.to_string()))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "almoner=info,almoner_admin=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::load().context("Failed to load configuration")?;
    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(token) = &cli.token {
        config.auth_token = Some(token.clone());
    }
    if let Some(timeout) = cli.timeout {
        config.request_timeout_secs = timeout;
    }
    config.offline_fallback |= cli.offline_fallback;

    let auth: Arc<dyn AuthContext> = match &config.auth_token {
        Some(token) => Arc::new(StaticSession::new(token.clone())),
        None => Arc::new(Anonymous),
    };

    let resource = match &cli.command {
        Command::List { resource, .. }
        | Command::Create { resource, .. }
        | Command::Update { resource, .. }
        | Command::Toggle { resource, .. }
        | Command::Delete { resource, .. }
        | Command::Share { resource, .. } => *resource,
    };

    match resource {
        ResourceKind::Events => run::<Event>(&cli.command, &config, auth).await,
        ResourceKind::VolunteerRoles => run::<VolunteerRole>(&cli.command, &config, auth).await,
        ResourceKind::SocialLinks => run::<SocialLink>(&cli.command, &config, auth).await,
        ResourceKind::ContactInfo => run::<ContactInfo>(&cli.command, &config, auth).await,
        ResourceKind::TrustPartners => run::<TrustPartner>(&cli.command, &config, auth).await,
        ResourceKind::StudyMaterials => run::<StudyMaterial>(&cli.command, &config, auth).await,
        ResourceKind::Gallery => run::<GalleryItem>(&cli.command, &config, auth).await,
    }
}

async fn run<R>(command: &Command, config: &ClientConfig, auth: Arc<dyn AuthContext>) -> Result<()>
where
    R: Resource,
    R::Draft: DeserializeOwned,
{
    let client = HttpResourceApi::build_client(config)?;
    let controller = ResourceController::<R>::from_config(config, client, auth)?;

    if let Command::Create { draft, .. } = command {
        let draft: R::Draft = serde_json::from_str(draft).context("Invalid draft JSON")?;
        let created = controller.create(draft).await.map_err(report)?;
        tracing::info!(id = %created.id(), "Created");
        return print_record(&created);
    }

    // Everything else works on the loaded collection.
    if controller.load().await.map_err(report)? == Mode::Offline {
        tracing::warn!("API unreachable, showing offline data");
    }

    match command {
        Command::List { filter, .. } => {
            for record in controller.view(&filter.to_query()) {
                print_record(&record)?;
            }
        }
        Command::Update { id, draft, .. } => {
            let draft: R::Draft = serde_json::from_str(draft).context("Invalid draft JSON")?;
            let updated = controller
                .update(&record_id(id)?, draft)
                .await
                .map_err(report)?;
            print_record(&updated)?;
        }
        Command::Toggle { id, .. } => {
            let toggled = controller.toggle_flag(&record_id(id)?).await.map_err(report)?;
            print_record(&toggled)?;
        }
        Command::Delete { id, yes, .. } => {
            let id = record_id(id)?;
            let outcome = if *yes {
                controller.remove(&id, &AutoConfirm).await
            } else {
                controller.remove(&id, &StdinConfirmer).await
            }
            .map_err(report)?;
            match outcome {
                Removal::Removed => tracing::info!(%id, "Deleted"),
                Removal::Declined => tracing::info!(%id, "Kept"),
            }
        }
        Command::Share { id, .. } => {
            let id = record_id(id)?;
            let snapshot = controller.snapshot();
            let Some(record) = snapshot.find(&id) else {
                bail!("{} has no record {id}", R::NAME);
            };
            let site = config.base_url()?;
            let payload = SharePayload::for_record(&site, R::NAME, id.as_str(), record.display_name());
            share_or_copy(None, &StdoutClipboard, &payload).await?;
        }
        Command::Create { .. } => {}
    }
    Ok(())
}

fn record_id(raw: &str) -> Result<RecordId> {
    RecordId::parse(raw).context("Record id must not be blank")
}

fn print_record<R: Resource>(record: &R) -> Result<()> {
    println!("{}", serde_json::to_string(record)?);
    Ok(())
}

fn report(err: almoner::ControllerError) -> anyhow::Error {
    if let Some(fields) = err.field_errors() {
        for (field, message) in fields.iter() {
            tracing::error!(field, "{message}");
        }
    }
    anyhow::anyhow!("{}: {err}", err.user_message())
}
