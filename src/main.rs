use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use subnoto_embed_demo::orchestrator::{App, BatchItem, ResumeReport, SignableEnvelope};
use subnoto_embed_demo::utils::logging;
use subnoto_embed_demo::Config;

/// Subnoto 嵌入签署演示
#[derive(Parser, Debug)]
#[command(name = "subnoto-demo", version, about = "Create Subnoto envelopes and embedded signing links")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an envelope from the sample PDF and print its signing link
    Create {
        #[arg(long)]
        title: Option<String>,
        /// Defaults to the API key owner's email
        #[arg(long)]
        signer: Option<String>,
    },
    /// Render a quote form (TOML) to a Smart Anchor PDF and create an envelope
    Quote {
        #[arg(long)]
        form: PathBuf,
        #[arg(long)]
        title: Option<String>,
    },
    /// Create several envelopes in a row with random titles
    Batch {
        #[arg(long, default_value_t = 5)]
        count: usize,
        #[arg(long, default_value_t = 1000)]
        delay_ms: u64,
    },
    /// List saved envelopes that can still be signed
    Resume {
        /// Issue a fresh signing link for each envelope
        #[arg(long)]
        links: bool,
    },
    /// Issue a fresh signing link for an existing envelope
    Link {
        envelope_uuid: String,
        #[arg(long)]
        signer: Option<String>,
    },
    /// Show the current status of an envelope
    Status { envelope_uuid: String },
    /// Show the team and owner behind the configured API key
    Whoami,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Create { .. } => "create",
            Command::Quote { .. } => "quote",
            Command::Batch { .. } => "batch",
            Command::Resume { .. } => "resume",
            Command::Link { .. } => "link",
            Command::Status { .. } => "status",
            Command::Whoami => "whoami",
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // 加载配置，缺失项在任何远程调用之前报出
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    // 初始化日志
    logging::init(config.verbose_logging);
    logging::log_startup(&config, cli.command.name());

    match run(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, config: Config) -> Result<()> {
    let app = App::initialize(config)?;

    match command {
        Command::Create { title, signer } => {
            let created = app
                .create_and_sign(title.as_deref(), signer.as_deref())
                .await?;
            print_signable(&created);
        }
        Command::Quote { form, title } => {
            let created = app.create_quote(&form, title.as_deref()).await?;
            print_signable(&created);
        }
        Command::Batch { count, delay_ms } => {
            let items = app.batch(count, delay_ms).await?;
            for (i, item) in items.iter().enumerate() {
                match item {
                    BatchItem::Created {
                        envelope_uuid,
                        title,
                        ..
                    } => println!("{:>3}. ✓ {}  {}", i + 1, envelope_uuid, title),
                    BatchItem::Failed { error } => println!("{:>3}. ✗ {}", i + 1, error),
                }
            }
        }
        Command::Resume { links } => {
            let report = app.resume(links).await?;
            print_resume(&report);
        }
        Command::Link {
            envelope_uuid,
            signer,
        } => {
            let link = app.link(&envelope_uuid, signer.as_deref()).await?;
            println!("{}", link.iframe_url);
        }
        Command::Status { envelope_uuid } => {
            let status = app.status(&envelope_uuid).await?;
            println!("{}: {}", envelope_uuid, status);
        }
        Command::Whoami => {
            let info = app.whoami().await?;
            println!("API:        {}", info.api_base_url);
            println!("Team:       {} ({})", info.team_name, info.team_uuid);
            println!("Owner:      {} ({})", info.owner_email, info.owner_uuid);
            println!("Access key: {}", info.access_key);
        }
    }

    Ok(())
}

fn print_signable(created: &SignableEnvelope) {
    println!("Envelope:  {}", created.envelope.envelope_uuid);
    println!("Document:  {}", created.envelope.document_uuid);
    println!("Title:     {}", created.title);
    println!("Signer:    {}", created.signer_email);
    println!("Sign here: {}", created.link.iframe_url);
}

fn print_resume(report: &ResumeReport) {
    if report.pending.is_empty() {
        println!("No envelopes waiting for a signature.");
    }
    for pending in &report.pending {
        let created = chrono::DateTime::from_timestamp_millis(pending.record.created_at)
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        match &pending.link {
            Some(link) => println!("{}  {}  {}", pending.record.envelope_uuid, created, link.iframe_url),
            None => println!("{}  {}", pending.record.envelope_uuid, created),
        }
    }
    if report.pruned > 0 {
        println!("Removed {} finished envelope(s) from the list.", report.pruned);
    }
    if report.unknown > 0 {
        println!("Skipped {} envelope(s) whose status could not be read.", report.unknown);
    }
}
