use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::SectionsArgs;
use crate::extract;
use crate::model::{DocumentStructure, SectionSummary};

pub fn run(args: SectionsArgs) -> Result<()> {
    let document = extract::extract(&args.pdf)?;

    info!(
        document = %document.filename,
        page_count = document.page_count,
        section_count = document.sections.len(),
        strategy = ?document.sectioning,
        "extracted structure"
    );

    let structure = DocumentStructure {
        filename: document.filename.clone(),
        page_count: document.page_count,
        sectioning: document.sectioning,
        section_count: document.sections.len(),
        sections: document
            .sections
            .iter()
            .map(|section| SectionSummary {
                title: section.title.clone(),
                start_page: section.start_page,
                end_page: section.end_page,
                body_chars: section.body.chars().count(),
            })
            .collect(),
    };

    let mut output = io::BufWriter::new(io::stdout().lock());
    serde_json::to_writer_pretty(&mut output, &structure)
        .context("failed to serialize structure output")?;
    writeln!(output)?;
    output.flush()?;

    Ok(())
}
