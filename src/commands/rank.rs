use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use crate::cli::RankArgs;
use crate::embedding::{Embedder, HashEmbedder, resolve_model_config};
use crate::error::PipelineError;
use crate::model::{CollectionInput, Document, Query, RunMetadata};
use crate::util::{now_utc_string, write_json_pretty};
use crate::{assemble, chunk, extract, pool, rank};

struct DocumentTask {
    document_id: String,
    pdf_path: PathBuf,
}

pub fn run(args: RankArgs) -> Result<()> {
    let started = Instant::now();

    validate_config(&args)?;

    let raw = fs::read(&args.input)
        .with_context(|| format!("failed to read input file: {}", args.input.display()))?;
    let input: CollectionInput = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse input file: {}", args.input.display()))?;

    if input.documents.is_empty() {
        bail!("input lists no documents: {}", args.input.display());
    }

    let input_dir = args
        .input
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let pdf_dir = args
        .pdf_dir
        .clone()
        .unwrap_or_else(|| input_dir.join("PDFs"));
    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| input_dir.join("ranking_output.json"));

    let model = resolve_model_config(&args.model_id);
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(&model));

    let query_text = format!(
        "Persona: {}. Task: {}",
        input.persona.role, input.job_to_be_done.task
    );
    let query = Query {
        persona_role: input.persona.role.clone(),
        task: input.job_to_be_done.task.clone(),
        embedding: chunk::embed_query(&query_text, embedder.as_ref())?,
    };

    info!(
        document_count = input.documents.len(),
        persona = %query.persona_role,
        task = %query.task,
        model_id = %model.model_id,
        model_name = %model.model_name,
        dimensions = model.dimensions,
        normalization = %model.normalization,
        workers = args.workers,
        "starting ranking run"
    );

    let tasks: Vec<DocumentTask> = input
        .documents
        .iter()
        .map(|document| DocumentTask {
            document_id: document.filename.clone(),
            pdf_path: pdf_dir.join(&document.filename),
        })
        .collect();

    let embedder_ref: &dyn Embedder = embedder.as_ref();
    let chunk_budget = args.chunk_budget;
    let outcomes = pool::scatter_gather(&tasks, args.workers, |task| {
        process_document(task, embedder_ref, chunk_budget)
    });

    let mut documents = Vec::<Document>::new();
    let mut skipped = Vec::<String>::new();
    for (task, outcome) in tasks.iter().zip(outcomes) {
        match outcome {
            Ok(document) => {
                info!(
                    document = %document.filename,
                    page_count = document.page_count,
                    section_count = document.sections.len(),
                    strategy = ?document.sectioning,
                    "document processed"
                );
                documents.push(document);
            }
            Err(err) => {
                warn!(document = %task.document_id, error = %err, "skipping document");
                skipped.push(task.document_id.clone());
            }
        }
    }

    if documents.is_empty() {
        bail!("all {} documents failed to process", tasks.len());
    }

    let (ranked, refined) = rank::rank(&documents, &query, args.top_n, args.top_k_chunks)?;

    let metadata = RunMetadata {
        input_documents: input
            .documents
            .iter()
            .map(|document| document.filename.clone())
            .collect(),
        persona: input.persona.role.clone(),
        job_to_be_done: input.job_to_be_done.task.clone(),
        processing_timestamp: now_utc_string(),
    };
    let result = assemble::assemble(&ranked, &refined, metadata)?;

    write_json_pretty(&output_path, &result)?;

    info!(
        path = %output_path.display(),
        ranked_sections = ranked.len(),
        skipped_documents = skipped.len(),
        duration_ms = started.elapsed().as_secs_f64() * 1000.0,
        "wrote ranking output"
    );

    Ok(())
}

fn validate_config(args: &RankArgs) -> Result<(), PipelineError> {
    if args.top_n == 0 {
        return Err(PipelineError::Configuration(
            "--top-n must be at least 1".to_string(),
        ));
    }
    if args.top_k_chunks == 0 {
        return Err(PipelineError::Configuration(
            "--top-k-chunks must be at least 1".to_string(),
        ));
    }
    if args.chunk_budget == 0 {
        return Err(PipelineError::Configuration(
            "--chunk-budget must be at least 1".to_string(),
        ));
    }
    if args.workers == 0 {
        return Err(PipelineError::Configuration(
            "--workers must be at least 1".to_string(),
        ));
    }
    Ok(())
}

fn process_document(
    task: &DocumentTask,
    embedder: &dyn Embedder,
    chunk_budget: usize,
) -> Result<Document, PipelineError> {
    let mut document = extract::extract(&task.pdf_path)?;
    chunk::embed_document(&mut document, embedder, chunk_budget)?;
    Ok(document)
}
