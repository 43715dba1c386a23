use crate::error::PipelineError;
use crate::model::{
    ExtractedSectionEntry, RankedSection, RefinedExcerpt, ResultDocument, RunMetadata,
    SubsectionAnalysisEntry,
};

pub fn assemble(
    ranked: &[RankedSection],
    refined: &[RefinedExcerpt],
    metadata: RunMetadata,
) -> Result<ResultDocument, PipelineError> {
    if ranked.len() != refined.len() {
        return Err(PipelineError::Assembly(format!(
            "ranked section count {} does not match refined excerpt count {}",
            ranked.len(),
            refined.len()
        )));
    }

    for (index, section) in ranked.iter().enumerate() {
        if section.rank != index + 1 {
            return Err(PipelineError::Assembly(format!(
                "rank {} found at position {}; ranks must be contiguous from 1",
                section.rank,
                index + 1
            )));
        }
    }

    let extracted_sections = ranked
        .iter()
        .map(|section| ExtractedSectionEntry {
            document: section.document.clone(),
            section_title: section.section_title.clone(),
            importance_rank: section.rank,
            page_number: section.page_number,
        })
        .collect();

    let subsection_analysis = refined
        .iter()
        .map(|excerpt| SubsectionAnalysisEntry {
            document: excerpt.document.clone(),
            refined_text: excerpt.refined_text.clone(),
            page_number: excerpt.page_number,
        })
        .collect();

    Ok(ResultDocument {
        metadata,
        extracted_sections,
        subsection_analysis,
    })
}
