use axum::routing::{get, post};
use axum::Router;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use repo_scout::api;
use repo_scout::config::Config;
use repo_scout::index;
use repo_scout::llm::ollama::TextGenerator;
use repo_scout::models::RankedRepo;
use repo_scout::search::hybrid;
use repo_scout::state::AppState;

#[derive(Parser)]
#[command(name = "repo-scout", about = "Hybrid search over repository summaries")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API server
    Serve,
    /// Summarize and index the configured repositories
    Build,
    /// Search the indexed summaries
    Query {
        /// The search query
        query: Vec<String>,
        /// Number of results to return
        #[arg(long, default_value_t = 5)]
        num_results: usize,
        /// Re-rank the top results with the LLM
        #[arg(long)]
        rerank: bool,
    },
    /// Show stored summaries (all, or one repository)
    View { repo_name: Option<String> },
    /// Drop the entire corpus
    Clear,
    /// Pull an Ollama model ahead of a build
    Pull { model: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let state = AppState::new(config)?;

    match cli.command {
        Command::Serve => serve(state).await,
        Command::Build => build(state).await,
        Command::Query {
            query,
            num_results,
            rerank,
        } => run_query(state, &query.join(" "), num_results, rerank).await,
        Command::View { repo_name } => view(state, repo_name.as_deref()),
        Command::Clear => {
            state.store.clear()?;
            println!("Corpus cleared.");
            Ok(())
        }
        Command::Pull { model } => {
            state.ollama.pull(Some(&model)).await?;
            println!("Pulled {model}.");
            Ok(())
        }
    }
}

async fn serve(state: AppState) -> anyhow::Result<()> {
    let bind_addr = state.config.bind_addr.clone();
    tracing::info!("Data directory: {}", state.config.data_dir.display());
    tracing::info!(
        "Ollama: {} (model {}, embeddings {})",
        state.config.ollama.base_url,
        state.config.ollama.model,
        state.config.ollama.embedding_model
    );

    let app = Router::new()
        .route("/health", get(api::repos::health))
        .route("/api/config", get(api::repos::get_config))
        .route("/api/build", post(api::repos::build))
        .route("/api/search", post(api::search::search))
        .route("/api/summaries", get(api::repos::list_summaries))
        .route("/api/summaries/{repo_name}", get(api::repos::get_summary))
        .route("/api/clear", post(api::repos::clear))
        .route("/api/ollama/pull", post(api::repos::pull_model))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server listening on {bind_addr}");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn build(state: AppState) -> anyhow::Result<()> {
    let repos = state.config.repositories.clone();
    if repos.is_empty() {
        anyhow::bail!("No repositories configured; add them to the config file");
    }

    let outcomes = index::build_index(&state, &repos).await;
    for outcome in &outcomes {
        match &outcome.detail {
            Some(detail) => println!("{}: {:?} ({detail})", outcome.repo_name, outcome.status),
            None => println!("{}: {:?}", outcome.repo_name, outcome.status),
        }
    }
    println!("Indexed {} repositories.", state.store.count());
    Ok(())
}

async fn run_query(
    state: AppState,
    query: &str,
    num_results: usize,
    rerank: bool,
) -> anyhow::Result<()> {
    let query = query.trim();
    if query.is_empty() {
        anyhow::bail!("Query is required");
    }

    let reranker = rerank.then(|| state.ollama.as_ref() as &dyn TextGenerator);
    let results = hybrid::search_repositories(
        &state.store,
        reranker,
        query,
        num_results,
        &state.config.search,
    )
    .await?;

    if results.is_empty() {
        println!("No results. Is the index built?");
        return Ok(());
    }

    for (i, repo) in results.iter().enumerate() {
        print_result(i + 1, repo);
    }
    Ok(())
}

fn print_result(rank: usize, repo: &RankedRepo) {
    println!("{rank}. {} ({})", repo.repo_name, repo.repo_url);
    match repo.rerank_score {
        Some(rr) => println!(
            "   hybrid {:.3}  dense {:.3}  bm25 {:.3}  rerank {:.3}",
            repo.hybrid_score, repo.dense_score, repo.bm25_score, rr
        ),
        None => println!(
            "   hybrid {:.3}  dense {:.3}  bm25 {:.3}",
            repo.hybrid_score, repo.dense_score, repo.bm25_score
        ),
    }
    println!("   {}", repo.summary);
    println!();
}

fn view(state: AppState, repo_name: Option<&str>) -> anyhow::Result<()> {
    match repo_name {
        Some(name) => {
            let doc = state
                .store
                .get(name)
                .ok_or_else(|| anyhow::anyhow!("No summary stored for '{name}'"))?;
            println!("{} ({})", doc.metadata.repo_name, doc.metadata.repo_url);
            println!("indexed {}  {} chars", doc.metadata.indexed_at, doc.metadata.summary_length);
            println!();
            println!("{}", doc.document);
        }
        None => {
            let docs = state.store.get_all();
            if docs.is_empty() {
                println!("Corpus is empty.");
                return Ok(());
            }
            for doc in docs {
                println!(
                    "{}  {} chars  indexed {}",
                    doc.metadata.repo_name, doc.metadata.summary_length, doc.metadata.indexed_at
                );
            }
        }
    }
    Ok(())
}
