use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, bail};
use regex::Regex;
use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::model::{Document, Section, SectioningStrategy};
use crate::util::normalize_whitespace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    pub title: String,
    pub page: i64,
}

pub fn extract(pdf_path: &Path) -> Result<Document, PipelineError> {
    let filename = pdf_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| pdf_path.display().to_string());

    let pages = extract_pages_with_pdftotext(pdf_path)
        .map_err(|err| PipelineError::parse(filename.clone(), err))?;

    let outline = match extract_outline_with_pdftohtml(pdf_path, pages.len()) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(document = %filename, error = %err, "outline extraction failed; using per-page sections");
            Vec::new()
        }
    };

    let (sectioning, mut sections) = if outline.is_empty() {
        (SectioningStrategy::PerPage, sections_per_page(pages.len()))
    } else {
        (
            SectioningStrategy::Outline,
            sections_from_outline(&outline, pages.len()),
        )
    };

    populate_section_bodies(&mut sections, &pages);

    debug!(
        document = %filename,
        page_count = pages.len(),
        section_count = sections.len(),
        strategy = ?sectioning,
        "extracted document structure"
    );

    Ok(Document {
        filename,
        page_count: pages.len(),
        sectioning,
        sections,
    })
}

fn extract_pages_with_pdftotext(pdf_path: &Path) -> Result<Vec<String>> {
    let output = Command::new("pdftotext")
        .arg("-enc")
        .arg("UTF-8")
        .arg(pdf_path)
        .arg("-")
        .output()
        .with_context(|| format!("failed to execute pdftotext for {}", pdf_path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "pdftotext returned non-zero exit status for {}: {}",
            pdf_path.display(),
            stderr.trim()
        );
    }

    let raw = String::from_utf8_lossy(&output.stdout);
    Ok(split_pages(&raw))
}

pub fn split_pages(raw: &str) -> Vec<String> {
    let mut pages: Vec<String> = raw
        .split('\u{000C}')
        .map(|page| page.replace('\u{0000}', ""))
        .collect();

    // pdftotext terminates every page with a form feed, leaving an empty
    // trailing slice that is not a page.
    while let Some(last_page) = pages.last() {
        if last_page.trim().is_empty() {
            pages.pop();
            continue;
        }
        break;
    }

    pages
}

fn extract_outline_with_pdftohtml(pdf_path: &Path, page_count: usize) -> Result<Vec<OutlineEntry>> {
    let output = Command::new("pdftohtml")
        .arg("-xml")
        .arg("-f")
        .arg("1")
        .arg("-l")
        .arg("1")
        .arg(pdf_path)
        .arg("-stdout")
        .output()
        .with_context(|| format!("failed to execute pdftohtml for {}", pdf_path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "pdftohtml returned non-zero exit status for {}: {}",
            pdf_path.display(),
            stderr.trim()
        );
    }

    let xml = String::from_utf8_lossy(&output.stdout);
    parse_outline_items(&xml, page_count)
}

pub fn parse_outline_items(xml: &str, page_count: usize) -> Result<Vec<OutlineEntry>> {
    if page_count == 0 {
        return Ok(Vec::new());
    }

    let item_regex = Regex::new(r#"<item page="(\d+)">(.*?)</item>"#)
        .context("failed to compile outline item regex")?;

    let last_page = page_count as i64;
    let mut entries = Vec::<OutlineEntry>::new();

    for captures in item_regex.captures_iter(xml) {
        let page = captures
            .get(1)
            .and_then(|value| value.as_str().parse::<i64>().ok())
            .unwrap_or(1);

        let raw_label = captures.get(2).map(|value| value.as_str()).unwrap_or("");
        let title = normalize_outline_label(raw_label);
        if title.is_empty() {
            continue;
        }

        entries.push(OutlineEntry {
            title,
            page: page.clamp(1, last_page),
        });
    }

    entries.sort_by_key(|entry| entry.page);

    // A page-granular sectioner cannot split two outline targets on the same
    // page; the first entry keeps the page.
    entries.dedup_by_key(|entry| entry.page);

    Ok(entries)
}

fn normalize_outline_label(raw_label: &str) -> String {
    let unescaped = raw_label
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace('\u{00a0}', " ");

    normalize_whitespace(&unescaped)
}

pub fn sections_from_outline(entries: &[OutlineEntry], page_count: usize) -> Vec<Section> {
    let last_page = page_count as i64;
    let mut sections = Vec::<Section>::with_capacity(entries.len());

    for (index, entry) in entries.iter().enumerate() {
        let start_page = entry.page;
        let end_page = entries
            .get(index + 1)
            .map(|next| (next.page - 1).max(start_page))
            .unwrap_or(last_page);

        sections.push(Section {
            title: entry.title.clone(),
            start_page,
            end_page,
            body: String::new(),
            chunks: Vec::new(),
        });
    }

    sections
}

pub fn sections_per_page(page_count: usize) -> Vec<Section> {
    (1..=page_count as i64)
        .map(|page| Section {
            title: format!("Page {page}"),
            start_page: page,
            end_page: page,
            body: String::new(),
            chunks: Vec::new(),
        })
        .collect()
}

pub fn populate_section_bodies(sections: &mut [Section], pages: &[String]) {
    for section in sections {
        let first_index = (section.start_page.max(1) - 1) as usize;
        let last_index = (section.end_page.max(section.start_page) as usize).min(pages.len());

        let body = if first_index >= last_index {
            String::new()
        } else {
            normalize_whitespace(&pages[first_index..last_index].join("\n"))
        };

        section.body = body;
    }
}
