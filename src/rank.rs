use crate::embedding::cosine_similarity;
use crate::error::PipelineError;
use crate::model::{Chunk, Document, Query, RankedSection, RefinedExcerpt, Section};
use crate::util::clean_excerpt_text;

struct ScoredSection<'a> {
    document_index: usize,
    section_index: usize,
    document: &'a str,
    section: &'a Section,
    score: f64,
    best_chunk: &'a Chunk,
}

pub fn rank(
    documents: &[Document],
    query: &Query,
    top_n: usize,
    top_k_chunks: usize,
) -> Result<(Vec<RankedSection>, Vec<RefinedExcerpt>), PipelineError> {
    if top_n == 0 {
        return Err(PipelineError::Configuration(
            "top_n must be at least 1".to_string(),
        ));
    }
    if top_k_chunks == 0 {
        return Err(PipelineError::Configuration(
            "top_k_chunks must be at least 1".to_string(),
        ));
    }

    let mut scored = Vec::<ScoredSection>::new();
    for (document_index, document) in documents.iter().enumerate() {
        for (section_index, section) in document.sections.iter().enumerate() {
            let Some((best_chunk, score)) =
                score_section(section, &query.embedding, top_k_chunks)?
            else {
                continue;
            };

            scored.push(ScoredSection {
                document_index,
                section_index,
                document: &document.filename,
                section,
                score,
                best_chunk,
            });
        }
    }

    scored.sort_by(|left, right| {
        right
            .score
            .total_cmp(&left.score)
            .then(left.document_index.cmp(&right.document_index))
            .then(left.section.start_page.cmp(&right.section.start_page))
            .then(left.section_index.cmp(&right.section_index))
    });
    if scored.len() > top_n {
        scored.truncate(top_n);
    }

    let mut ranked = Vec::<RankedSection>::with_capacity(scored.len());
    let mut refined = Vec::<RefinedExcerpt>::with_capacity(scored.len());

    for (position, entry) in scored.iter().enumerate() {
        ranked.push(RankedSection {
            document: entry.document.to_string(),
            section_title: entry.section.title.clone(),
            page_number: entry.section.start_page,
            score: entry.score,
            rank: position + 1,
        });
        refined.push(RefinedExcerpt {
            document: entry.document.to_string(),
            page_number: entry.best_chunk.page_number,
            refined_text: clean_excerpt_text(&entry.best_chunk.text),
        });
    }

    Ok((ranked, refined))
}

fn score_section<'a>(
    section: &'a Section,
    query_embedding: &[f32],
    top_k_chunks: usize,
) -> Result<Option<(&'a Chunk, f64)>, PipelineError> {
    if section.chunks.is_empty() {
        return Ok(None);
    }

    let mut similarities = Vec::<f64>::with_capacity(section.chunks.len());
    let mut best_chunk: Option<(&Chunk, f64)> = None;

    for chunk in &section.chunks {
        if chunk.embedding.len() != query_embedding.len() {
            return Err(PipelineError::Configuration(format!(
                "chunk embedding dimensionality {} does not match query dimensionality {}",
                chunk.embedding.len(),
                query_embedding.len()
            )));
        }

        let similarity = cosine_similarity(&chunk.embedding, query_embedding);
        similarities.push(similarity);

        // lowest order_index wins among equal similarities
        let replace = match best_chunk {
            None => true,
            Some((best, best_similarity)) => {
                similarity > best_similarity
                    || (similarity == best_similarity && chunk.order_index < best.order_index)
            }
        };
        if replace {
            best_chunk = Some((chunk, similarity));
        }
    }

    similarities.sort_by(|left, right| right.total_cmp(left));
    let considered = top_k_chunks.min(similarities.len());
    let score = similarities[..considered].iter().sum::<f64>() / considered as f64;

    Ok(best_chunk.map(|(chunk, _)| (chunk, score)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SectioningStrategy;

    fn unit(x: f32, y: f32, z: f32) -> Vec<f32> {
        let mut vector = vec![x, y, z];
        crate::embedding::l2_normalize(&mut vector);
        vector
    }

    fn chunk(text: &str, order_index: usize, embedding: Vec<f32>) -> Chunk {
        Chunk {
            text: text.to_string(),
            page_number: 1,
            order_index,
            embedding,
        }
    }

    fn section(title: &str, start_page: i64, chunks: Vec<Chunk>) -> Section {
        Section {
            title: title.to_string(),
            start_page,
            end_page: start_page,
            body: String::new(),
            chunks,
        }
    }

    fn document(filename: &str, sections: Vec<Section>) -> Document {
        Document {
            filename: filename.to_string(),
            page_count: sections.len(),
            sectioning: SectioningStrategy::PerPage,
            sections,
        }
    }

    fn query() -> Query {
        Query {
            persona_role: "Analyst".to_string(),
            task: "find the signal".to_string(),
            embedding: unit(1.0, 0.0, 0.0),
        }
    }

    fn aligned(weight: f32) -> Vec<f32> {
        unit(weight, (1.0 - weight * weight).max(0.0).sqrt(), 0.0)
    }

    #[test]
    fn rank_rejects_zero_top_n() {
        let err = rank(&[], &query(), 0, 3).expect_err("must fail");
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn rank_rejects_zero_top_k() {
        let err = rank(&[], &query(), 5, 0).expect_err("must fail");
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn rank_of_empty_collection_is_empty() {
        let (ranked, refined) = rank(&[], &query(), 5, 3).expect("rank");
        assert!(ranked.is_empty());
        assert!(refined.is_empty());
    }

    #[test]
    fn rank_orders_sections_by_descending_score() {
        let documents = vec![document(
            "doc.pdf",
            vec![
                section("Weak", 1, vec![chunk("weak", 0, aligned(0.2))]),
                section("Strong", 2, vec![chunk("strong", 0, aligned(0.9))]),
                section("Middle", 3, vec![chunk("middle", 0, aligned(0.5))]),
            ],
        )];

        let (ranked, _) = rank(&documents, &query(), 5, 3).expect("rank");
        let titles: Vec<&str> = ranked.iter().map(|r| r.section_title.as_str()).collect();
        assert_eq!(titles, vec!["Strong", "Middle", "Weak"]);

        let ranks: Vec<usize> = ranked.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);

        assert!(ranked.windows(2).all(|pair| pair[0].score >= pair[1].score));
    }

    #[test]
    fn rank_truncates_to_top_n() {
        let sections = (1..=8)
            .map(|page| {
                section(
                    &format!("S{page}"),
                    page,
                    vec![chunk("c", 0, aligned(0.1 * page as f32))],
                )
            })
            .collect();
        let documents = vec![document("doc.pdf", sections)];

        let (ranked, refined) = rank(&documents, &query(), 5, 3).expect("rank");
        assert_eq!(ranked.len(), 5);
        assert_eq!(refined.len(), 5);
    }

    #[test]
    fn rank_breaks_ties_by_document_then_page_order() {
        let embedding = aligned(0.7);
        let documents = vec![
            document(
                "first.pdf",
                vec![
                    section("B", 4, vec![chunk("b", 0, embedding.clone())]),
                    section("A", 9, vec![chunk("a", 0, embedding.clone())]),
                ],
            ),
            document(
                "second.pdf",
                vec![section("C", 1, vec![chunk("c", 0, embedding.clone())])],
            ),
        ];

        let (ranked, _) = rank(&documents, &query(), 5, 3).expect("rank");
        let order: Vec<(&str, i64)> = ranked
            .iter()
            .map(|r| (r.document.as_str(), r.page_number))
            .collect();
        assert_eq!(
            order,
            vec![("first.pdf", 4), ("first.pdf", 9), ("second.pdf", 1)]
        );
    }

    #[test]
    fn section_score_is_mean_of_top_k() {
        let documents = vec![document(
            "doc.pdf",
            vec![section(
                "Mixed",
                1,
                vec![
                    chunk("best", 0, aligned(0.9)),
                    chunk("good", 1, aligned(0.8)),
                    chunk("weak", 2, aligned(0.1)),
                    chunk("noise", 3, aligned(0.0)),
                ],
            )],
        )];

        let (ranked, _) = rank(&documents, &query(), 1, 2).expect("rank");
        let expected = (0.9_f64 + 0.8) / 2.0;
        assert!((ranked[0].score - expected).abs() < 1e-6);
    }

    #[test]
    fn section_score_never_exceeds_best_chunk_similarity() {
        let documents = vec![document(
            "doc.pdf",
            vec![section(
                "Mixed",
                1,
                vec![
                    chunk("best", 0, aligned(0.9)),
                    chunk("weak", 1, aligned(0.2)),
                ],
            )],
        )];

        let (ranked, _) = rank(&documents, &query(), 1, 5).expect("rank");
        assert!(ranked[0].score <= 0.9 + 1e-6);
    }

    #[test]
    fn top_k_larger_than_chunk_count_averages_all() {
        let documents = vec![document(
            "doc.pdf",
            vec![section(
                "Small",
                1,
                vec![
                    chunk("one", 0, aligned(0.6)),
                    chunk("two", 1, aligned(0.4)),
                ],
            )],
        )];

        let (ranked, _) = rank(&documents, &query(), 1, 10).expect("rank");
        let expected = (0.6_f64 + 0.4) / 2.0;
        assert!((ranked[0].score - expected).abs() < 1e-6);
    }

    #[test]
    fn chunkless_sections_are_never_selected() {
        let documents = vec![document(
            "doc.pdf",
            vec![
                section("Blank", 1, Vec::new()),
                section("Present", 2, vec![chunk("text", 0, aligned(0.3))]),
            ],
        )];

        let (ranked, _) = rank(&documents, &query(), 5, 3).expect("rank");
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].section_title, "Present");
    }

    #[test]
    fn all_blank_sections_produce_empty_output() {
        let documents = vec![document(
            "doc.pdf",
            vec![section("Blank", 1, Vec::new()), section("Empty", 2, Vec::new())],
        )];

        let (ranked, refined) = rank(&documents, &query(), 5, 3).expect("rank");
        assert!(ranked.is_empty());
        assert!(refined.is_empty());
    }

    #[test]
    fn refinement_picks_highest_scoring_chunk() {
        let documents = vec![document(
            "doc.pdf",
            vec![section(
                "Mixed",
                1,
                vec![
                    chunk("mediocre  text", 0, aligned(0.4)),
                    chunk("the   best\u{0007} excerpt", 1, aligned(0.95)),
                ],
            )],
        )];

        let (_, refined) = rank(&documents, &query(), 1, 3).expect("rank");
        assert_eq!(refined[0].refined_text, "the best excerpt");
    }

    #[test]
    fn refinement_tie_prefers_earlier_chunk() {
        let embedding = aligned(0.5);
        let documents = vec![document(
            "doc.pdf",
            vec![section(
                "Tied",
                1,
                vec![
                    chunk("first", 0, embedding.clone()),
                    chunk("second", 1, embedding.clone()),
                ],
            )],
        )];

        let (_, refined) = rank(&documents, &query(), 1, 3).expect("rank");
        assert_eq!(refined[0].refined_text, "first");
    }

    #[test]
    fn rank_rejects_mismatched_chunk_dimensions() {
        let documents = vec![document(
            "doc.pdf",
            vec![section("Bad", 1, vec![chunk("bad", 0, vec![1.0, 0.0])])],
        )];

        let err = rank(&documents, &query(), 1, 3).expect_err("must fail");
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn rank_is_deterministic_across_runs() {
        let documents = vec![
            document(
                "a.pdf",
                vec![
                    section("A1", 1, vec![chunk("a1", 0, aligned(0.62))]),
                    section("A2", 2, vec![chunk("a2", 0, aligned(0.62))]),
                ],
            ),
            document(
                "b.pdf",
                vec![section("B1", 1, vec![chunk("b1", 0, aligned(0.8))])],
            ),
        ];

        let first = rank(&documents, &query(), 3, 3).expect("rank");
        let second = rank(&documents, &query(), 3, 3).expect("rank");

        let titles = |result: &(Vec<RankedSection>, Vec<RefinedExcerpt>)| {
            result
                .0
                .iter()
                .map(|r| r.section_title.clone())
                .collect::<Vec<String>>()
        };
        assert_eq!(titles(&first), titles(&second));
        assert_eq!(
            first.1.iter().map(|r| &r.refined_text).collect::<Vec<_>>(),
            second.1.iter().map(|r| &r.refined_text).collect::<Vec<_>>()
        );
    }

    #[test]
    fn outline_and_page_documents_rank_together() {
        // one outlined document with 4 sections, two 20-page documents
        let outlined = document(
            "guide.pdf",
            (1..=4)
                .map(|index| {
                    section(
                        &format!("Chapter {index}"),
                        index as i64 * 3,
                        vec![chunk("chapter text", 0, aligned(0.3 + 0.1 * index as f32))],
                    )
                })
                .collect(),
        );
        let paged = |name: &str, base: f32| {
            document(
                name,
                (1..=20)
                    .map(|page| {
                        section(
                            &format!("Page {page}"),
                            page,
                            vec![chunk("page text", 0, aligned(base))],
                        )
                    })
                    .collect(),
            )
        };

        let documents = vec![outlined, paged("notes.pdf", 0.55), paged("misc.pdf", 0.1)];
        let total_sections: usize = documents.iter().map(|d| d.sections.len()).sum();
        assert_eq!(total_sections, 44);

        let (ranked, refined) = rank(&documents, &query(), 5, 3).expect("rank");
        assert_eq!(ranked.len(), 5);
        assert_eq!(refined.len(), 5);
        assert_eq!(
            ranked.iter().map(|r| r.rank).collect::<Vec<usize>>(),
            vec![1, 2, 3, 4, 5]
        );

        let from_guide = ranked.iter().filter(|r| r.document == "guide.pdf").count();
        let from_notes = ranked.iter().filter(|r| r.document == "notes.pdf").count();
        assert!(from_guide >= 1);
        assert!(from_notes >= 1);
    }
}
