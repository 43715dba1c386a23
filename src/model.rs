use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectioningStrategy {
    Outline,
    PerPage,
}

#[derive(Debug, Clone)]
pub struct Chunk {
    pub text: String,
    pub page_number: i64,
    pub order_index: usize,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct Section {
    pub title: String,
    pub start_page: i64,
    pub end_page: i64,
    pub body: String,
    pub chunks: Vec<Chunk>,
}

#[derive(Debug, Clone)]
pub struct Document {
    pub filename: String,
    pub page_count: usize,
    pub sectioning: SectioningStrategy,
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone)]
pub struct Query {
    pub persona_role: String,
    pub task: String,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct RankedSection {
    pub document: String,
    pub section_title: String,
    pub page_number: i64,
    pub score: f64,
    pub rank: usize,
}

#[derive(Debug, Clone)]
pub struct RefinedExcerpt {
    pub document: String,
    pub page_number: i64,
    pub refined_text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionInput {
    pub documents: Vec<DocumentRef>,
    pub persona: PersonaSpec,
    pub job_to_be_done: JobSpec,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentRef {
    pub filename: String,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersonaSpec {
    pub role: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobSpec {
    pub task: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMetadata {
    pub input_documents: Vec<String>,
    pub persona: String,
    pub job_to_be_done: String,
    pub processing_timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractedSectionEntry {
    pub document: String,
    pub section_title: String,
    pub importance_rank: usize,
    pub page_number: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubsectionAnalysisEntry {
    pub document: String,
    pub refined_text: String,
    pub page_number: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultDocument {
    pub metadata: RunMetadata,
    pub extracted_sections: Vec<ExtractedSectionEntry>,
    pub subsection_analysis: Vec<SubsectionAnalysisEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfEntry {
    pub filename: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfInventoryManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub source_directory: String,
    pub pdf_count: usize,
    pub pdfs: Vec<PdfEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionSummary {
    pub title: String,
    pub start_page: i64,
    pub end_page: i64,
    pub body_chars: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentStructure {
    pub filename: String,
    pub page_count: usize,
    pub sectioning: SectioningStrategy,
    pub section_count: usize,
    pub sections: Vec<SectionSummary>,
}
