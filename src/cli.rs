use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "sectionrank",
    version,
    about = "Persona-driven section ranking over PDF collections"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Rank(RankArgs),
    Inventory(InventoryArgs),
    Sections(SectionsArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RankArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long)]
    pub pdf_dir: Option<PathBuf>,

    #[arg(long)]
    pub output: Option<PathBuf>,

    #[arg(long, default_value_t = 5)]
    pub top_n: usize,

    #[arg(long, default_value_t = 3)]
    pub top_k_chunks: usize,

    #[arg(long, default_value_t = 800)]
    pub chunk_budget: usize,

    #[arg(long, default_value_t = 4)]
    pub workers: usize,

    #[arg(long, default_value = "local-hash-v1")]
    pub model_id: String,
}

#[derive(Args, Debug, Clone)]
pub struct InventoryArgs {
    #[arg(long)]
    pub pdf_dir: PathBuf,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SectionsArgs {
    #[arg(long)]
    pub pdf: PathBuf,
}
