#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dotenvy::dotenv;
use futures::StreamExt;
use std::{
    env, fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::info;
use tracing_subscriber::{
    prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

use colab::{
    parse_document, search_documents,
    stream::{ask, Conversation, PartialResult, Retrieval},
    ChunkOptions, Document, DocumentKind, ModelType, OpenAI, Pinecone, StoreKind, Supabase,
    VectorStore,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Args)]
struct ChunkArgs {
    #[arg(long, default_value_t = 1000)]
    chunk_size: usize,
    #[arg(long, default_value_t = 200)]
    chunk_overlap: usize,
}

#[derive(Debug, Args)]
struct StoreArgs {
    /// `supabase` or `pinecone`
    #[arg(long, default_value = "supabase")]
    store: StoreKind,
    /// Documents to search, comma separated
    #[arg(long, value_delimiter = ',', required = true)]
    documents: Vec<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the chunks a file would be embedded as
    Chunk {
        path: PathBuf,
        #[command(flatten)]
        options: ChunkArgs,
    },
    /// Chunk a file and write its embeddings to a vector store
    Embed {
        path: PathBuf,
        #[arg(long)]
        document_id: Option<String>,
        #[arg(long, default_value = "supabase")]
        store: StoreKind,
        #[command(flatten)]
        options: ChunkArgs,
    },
    /// Print the chunks closest to a query
    Query {
        query: String,
        #[command(flatten)]
        target: StoreArgs,
        #[arg(long, default_value_t = 4)]
        count: usize,
    },
    /// Answer a question from the given documents
    Ask {
        query: String,
        #[command(flatten)]
        target: StoreArgs,
        #[arg(long, default_value = "gpt-3.5-turbo")]
        model: ModelType,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "cli=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Chunk { path, options } => {
            let document = read_document(&path, &options)?;

            println!("{}", serde_json::to_string_pretty(&document)?);
        }
        Commands::Embed {
            path,
            document_id,
            store,
            options,
        } => {
            let document = read_document(&path, &options)?;
            let name = file_name(&path);
            let document_id = document_id.unwrap_or_else(|| name.clone());

            let client = OpenAI::new();
            let store = connect(store).await?;

            let points = client
                .embed(&document_id, &name, &document.chunks)
                .await?;

            store.delete_document(&document_id).await?;
            store.upsert(&points).await?;

            info!(
                "Embedded {} chunks of {name} into {}",
                points.len(),
                store.kind()
            );
        }
        Commands::Query {
            query,
            target,
            count,
        } => {
            let client = OpenAI::new();
            let store = connect(target.store).await?;

            let results =
                search_documents(&client, store.as_ref(), &target.documents, &query, count)
                    .await?;

            for result in results {
                println!(
                    "{:.3} {} #{} {}",
                    result.score,
                    result.payload.document_name,
                    result.payload.chunk_index,
                    result.payload.title.unwrap_or_default()
                );
                println!("{}\n", result.payload.text);
            }
        }
        Commands::Ask {
            query,
            target,
            model,
        } => {
            let store = connect(target.store).await?;
            let conversation = Conversation {
                prompt: None,
                history: Vec::new(),
                question: query,
                model,
                temperature: 0.0,
                retrieval: Some(Retrieval::new(store, target.documents)),
            };

            let mut stream = Box::pin(ask(OpenAI::new(), conversation));
            let mut stdout = io::stdout();

            while let Some(result) = stream.next().await {
                match result? {
                    PartialResult::References(sources) => {
                        for (i, source) in sources.iter().enumerate() {
                            eprintln!("[{}] {}", i + 1, source.document_name);
                        }
                    }
                    PartialResult::PartialAnswer(delta) => {
                        write!(stdout, "{delta}")?;
                        stdout.flush()?;
                    }
                }
            }

            writeln!(stdout)?;
        }
    }

    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("document")
        .to_string()
}

fn read_document(path: &Path, options: &ChunkArgs) -> Result<Document> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let name = file_name(path);
    let kind = DocumentKind::detect(&name, None);

    parse_document(
        &name,
        &content,
        kind,
        ChunkOptions {
            chunk_size: options.chunk_size,
            chunk_overlap: options.chunk_overlap,
        },
    )
}

async fn connect(kind: StoreKind) -> Result<Arc<dyn VectorStore>> {
    let store: Arc<dyn VectorStore> = match kind {
        StoreKind::Supabase => {
            let url = env::var("DATABASE_URL").context("DATABASE_URL not set")?;
            Arc::new(Supabase::connect(&url).await?)
        }
        StoreKind::Pinecone => Arc::new(Pinecone::from_env()?),
    };

    Ok(store)
}
