use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use docvault::{render, watch};
use docvault_core::config;
use docvault_core::config::AppConfig;
use docvault_core::pipeline::UploadState;
use docvault_core::registry;
use docvault_core::search::{self, SearchState};
use docvault_core::{DocumentCategory, Vault};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch::Receiver;

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries command output (including --json), logs go to stderr.
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Upload { file, json } => run_upload(cfg, file, json).await,
        Commands::List { category, json } => run_list(cfg, category, json).await,
        Commands::Show { id, json } => run_show(cfg, &id, json).await,
        Commands::Delete { id } => run_delete(cfg, &id).await,
        Commands::Export { id, path } => run_export(cfg, &id, &path).await,
        Commands::Reset => run_reset(cfg).await,
        Commands::Search {
            query,
            category,
            json,
        } => run_search(cfg, &query, category, json).await,
        Commands::Categories => {
            for c in DocumentCategory::ALL {
                println!("{}", c);
            }
            Ok(())
        }
        Commands::Watch { dir } => {
            let mut vault = open_vault(cfg).await?;
            watch::watch_dir(&mut vault, &dir).await
        }
        Commands::Browse { category } => run_browse(cfg, category).await,
    }
}

#[derive(Parser)]
#[command(name = "docvault")]
#[command(about = "AI-assisted personal document vault", long_about = None)]
struct Cli {
    /// Path to config TOML
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file: summarize, categorize, extract key info and save it
    Upload {
        file: PathBuf,
        /// Output the stored document as JSON
        #[arg(long)]
        json: bool,
    },
    /// List stored documents, newest first
    List {
        /// Only show one category (e.g. Education, ID)
        #[arg(long)]
        category: Option<DocumentCategory>,
        #[arg(long)]
        json: bool,
    },
    /// Show one document with its metadata and key information
    Show {
        id: String,
        #[arg(long)]
        json: bool,
    },
    /// Delete a document
    Delete { id: String },
    /// Save a document's file to PATH (a directory keeps the original name)
    Export { id: String, path: PathBuf },
    /// Remove every stored document and restore the sample
    Reset,
    /// Rank stored documents against a natural-language question
    Search {
        query: String,
        #[arg(long)]
        category: Option<DocumentCategory>,
        #[arg(long)]
        json: bool,
    },
    /// List the document categories
    Categories,
    /// Upload files as they are dropped into a directory
    Watch { dir: PathBuf },
    /// Read queries from stdin and show live search results
    Browse {
        #[arg(long)]
        category: Option<DocumentCategory>,
    },
}

async fn open_vault(cfg: AppConfig) -> Result<Vault> {
    let llm = registry::build_llm(&cfg.provider)?;
    Vault::open(cfg, llm).await
}

fn print_notices(vault: &mut Vault) {
    for notice in vault.take_notices() {
        eprintln!("{}", render::notice_line(&notice));
    }
}

async fn run_upload(cfg: AppConfig, file: PathBuf, json: bool) -> Result<()> {
    let mut vault = open_vault(cfg).await?;
    let mut progress = vault.upload_state();
    let outcome = {
        let upload = vault.upload(file);
        tokio::pin!(upload);
        loop {
            tokio::select! {
                res = &mut upload => break res,
                Ok(()) = progress.changed() => print_progress(&mut progress),
            }
        }
    };
    if progress.has_changed().unwrap_or(false) {
        print_progress(&mut progress);
    }
    print_notices(&mut vault);
    let doc = outcome?;
    if json {
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        print!("{}", render::document_detail(&doc));
    }
    Ok(())
}

fn print_progress(progress: &mut Receiver<UploadState>) {
    if let Some(line) = render::upload_state_line(&progress.borrow_and_update()) {
        eprintln!("{}", line);
    }
}

async fn run_list(cfg: AppConfig, category: Option<DocumentCategory>, json: bool) -> Result<()> {
    let vault = open_vault(cfg).await?;
    let docs = vault.visible_documents(category);
    if json {
        println!("{}", serde_json::to_string_pretty(&docs)?);
    } else if docs.is_empty() {
        println!("no documents");
    } else {
        for doc in docs {
            println!("{}", render::document_row(doc));
        }
    }
    Ok(())
}

async fn run_show(cfg: AppConfig, id: &str, json: bool) -> Result<()> {
    let vault = open_vault(cfg).await?;
    let Some(doc) = vault.get(id) else {
        bail!("no document with id {}", id);
    };
    if json {
        println!("{}", serde_json::to_string_pretty(doc)?);
    } else {
        print!("{}", render::document_detail(doc));
    }
    Ok(())
}

async fn run_delete(cfg: AppConfig, id: &str) -> Result<()> {
    let mut vault = open_vault(cfg).await?;
    let outcome = vault.delete(id).await;
    print_notices(&mut vault);
    outcome?;
    Ok(())
}

async fn run_export(cfg: AppConfig, id: &str, path: &Path) -> Result<()> {
    let vault = open_vault(cfg).await?;
    let written = vault.export(id, path).await?;
    println!("wrote {}", written.display());
    Ok(())
}

async fn run_reset(cfg: AppConfig) -> Result<()> {
    let mut vault = open_vault(cfg).await?;
    vault.reset().await;
    print_notices(&mut vault);
    Ok(())
}

async fn run_search(
    cfg: AppConfig,
    query: &str,
    category: Option<DocumentCategory>,
    json: bool,
) -> Result<()> {
    let mut vault = open_vault(cfg).await?;
    let outcome = vault.search(query).await;
    print_notices(&mut vault);
    let results = outcome?;

    let state = SearchState {
        query: query.to_string(),
        results,
        ..SearchState::default()
    };
    let docs = search::visible_documents(vault.documents(), category, &state);
    if json {
        let rows: Vec<_> = docs
            .iter()
            .map(|d| {
                serde_json::json!({
                    "document": d,
                    "relevanceScore": score_for(&state, &d.id),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    print_ranked(&state, &docs);
    Ok(())
}

async fn run_browse(cfg: AppConfig, category: Option<DocumentCategory>) -> Result<()> {
    let mut vault = open_vault(cfg).await?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        vault.submit_query(&line);
        let state = vault.settle_search().await;
        print_notices(&mut vault);
        let docs = vault.visible_documents(category);
        if state.is_active() {
            println!("-- {} --", state.query);
        }
        print_ranked(&state, &docs);
    }
    Ok(())
}

fn score_for(state: &SearchState, id: &str) -> Option<f32> {
    state
        .results
        .iter()
        .find(|r| r.document_id == id)
        .map(|r| r.relevance_score)
}

fn print_ranked(state: &SearchState, docs: &[&docvault_core::Document]) {
    if docs.is_empty() {
        println!("no matching documents");
        return;
    }
    for doc in docs {
        let hit = state.results.iter().find(|r| r.document_id == doc.id);
        println!("{}", render::search_row(doc, hit));
    }
}
