//! Interactive operator session

use std::io::BufRead;
use std::path::PathBuf;
use tracing::info;

use larder_core::{CompletionResult, Result};
use larder_rag::{IngestionReport, RagPipeline};

use crate::loader::{LoadFailure, load_records};
use crate::menu::MenuChoice;
use crate::ui;

/// Result of the upload step: source entries that could not be read, and the
/// store upserts
#[derive(Debug)]
pub struct UploadOutcome {
    pub unreadable: Vec<LoadFailure>,
    pub report: IngestionReport,
}

/// Dispatches menu selections to the pipeline
pub struct Session<'a> {
    pipeline: &'a RagPipeline,
    data_dir: PathBuf,
}

impl<'a> Session<'a> {
    pub fn new(pipeline: &'a RagPipeline, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            pipeline,
            data_dir: data_dir.into(),
        }
    }

    /// Read the ingestion source and store its records without embeddings
    pub async fn upload(&self) -> Result<UploadOutcome> {
        let loaded = load_records(&self.data_dir).await?;
        info!(
            dir = %self.data_dir.display(),
            records = loaded.records.len(),
            "uploading corpus"
        );

        let report = self.pipeline.upload(loaded.records).await;
        Ok(UploadOutcome {
            unreadable: loaded.failures,
            report,
        })
    }

    /// Embed every stored document under the vector index
    pub async fn vectorize(&self) -> Result<IngestionReport> {
        self.pipeline.vectorize().await
    }

    pub async fn ask(&self, query: &str) -> Result<CompletionResult> {
        self.pipeline.answer(query).await
    }

    /// Run the menu loop until `q` or end of input
    pub async fn run<R: BufRead>(&self, input: &mut R) -> Result<()> {
        ui::print_menu();

        while let Some(line) = ui::prompt(input, "larder>")? {
            let Some(choice) = MenuChoice::parse(&line) else {
                if !line.is_empty() {
                    println!("Unknown option {:?}; type help for the menu", line);
                }
                continue;
            };

            match choice {
                MenuChoice::Upload => match self.upload().await {
                    Ok(outcome) => {
                        ui::print_load_failures(&outcome.unreadable);
                        ui::print_report(choice.operation(), &outcome.report);
                    }
                    Err(e) => ui::print_failure(choice.operation(), &e),
                },
                MenuChoice::Vectorize => match self.vectorize().await {
                    Ok(report) => ui::print_report(choice.operation(), &report),
                    Err(e) => ui::print_failure(choice.operation(), &e),
                },
                MenuChoice::Query => self.query_loop(input).await?,
                MenuChoice::Help => ui::print_menu(),
                MenuChoice::Quit => break,
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    async fn query_loop<R: BufRead>(&self, input: &mut R) -> Result<()> {
        while let Some(query) = ui::prompt(input, "question>")? {
            if query.is_empty() {
                break;
            }
            match self.ask(&query).await {
                Ok(result) => ui::print_answer(&result),
                Err(e) => ui::print_failure(MenuChoice::Query.operation(), &e),
            }
        }
        Ok(())
    }
}
