use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use larder_cli::{Session, display_banner, init_logging, print_answer, print_failure};
use larder_openai::{OpenAiChat, OpenAiConfig, OpenAiEmbeddings};
use larder_rag::{IndexStatus, RagConfig, RagPipeline, SystemInstruction, open_store};

#[derive(Parser)]
#[command(name = "larder")]
#[command(about = "Ask questions about your recipe collection", long_about = None)]
struct Cli {
    /// Answer one question and exit
    #[arg(short, long)]
    query: Option<String>,

    /// Directory of JSON recipe files used by the upload step
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging();
    let cli = Cli::parse();

    let openai = OpenAiConfig::from_env().context("load model configuration")?;
    let rag = RagConfig::from_env().context("load pipeline configuration")?;

    let embeddings = OpenAiEmbeddings::new(&openai).context("create embedding client")?;
    let chat = OpenAiChat::new(&openai).context("create chat client")?;
    let store = open_store(&rag).context("open document store")?;

    let pipeline = RagPipeline::new(
        &rag,
        store,
        Arc::new(embeddings),
        openai.embedding_dimensions,
        Arc::new(chat),
        SystemInstruction::default(),
        openai.max_tokens,
    );

    let index = &pipeline.index_spec().name;
    match pipeline.ensure_index().await.context("ensure vector index")? {
        IndexStatus::Created => info!(index = %index, "vector index created"),
        IndexStatus::AlreadyExists => info!(index = %index, "vector index ready"),
    }

    if let Some(query) = cli.query {
        let result = pipeline.answer(&query).await.context("query")?;
        print_answer(&result);
        return Ok(());
    }

    display_banner();
    match pipeline.document_count().await {
        Ok(count) => println!("{} documents in the corpus", count.to_string().bold()),
        Err(e) => print_failure("count documents", &e),
    }

    let session = Session::new(&pipeline, cli.data_dir);
    session.run(&mut io::stdin().lock()).await?;

    Ok(())
}
