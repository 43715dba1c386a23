use tracing::warn;

use crate::embedding::{Embedder, l2_normalize};
use crate::error::PipelineError;
use crate::model::{Chunk, Document};

pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::<String>::new();
    let mut current = String::new();
    let mut characters = text.chars().peekable();

    while let Some(character) = characters.next() {
        current.push(character);

        let is_terminator = matches!(character, '.' | '!' | '?');
        let at_boundary = characters
            .peek()
            .map(|next| next.is_whitespace())
            .unwrap_or(true);

        if is_terminator && at_boundary {
            let sentence = current.trim().to_string();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            current.clear();
        }
    }

    let tail = current.trim().to_string();
    if !tail.is_empty() {
        sentences.push(tail);
    }

    sentences
}

pub fn group_sentences(sentences: &[String], chunk_char_budget: usize) -> Vec<String> {
    let mut chunks = Vec::<String>::new();
    let mut current = Vec::<&str>::new();
    let mut carried = false;

    for sentence in sentences {
        let projected =
            joined_len(&current) + sentence.len() + usize::from(!current.is_empty());

        // A full chunk closes and the next chunk re-opens with the closing
        // sentence so context survives the boundary. A chunk holding only the
        // carried sentence always accepts one more, otherwise it would emit a
        // chunk that duplicates the overlap and nothing else.
        let only_carried_sentence = carried && current.len() == 1;
        if !current.is_empty() && projected > chunk_char_budget && !only_carried_sentence {
            let overlap = current[current.len() - 1];
            chunks.push(current.join(" "));
            current = vec![overlap];
            carried = true;
        }

        current.push(sentence);
    }

    if !current.is_empty() {
        chunks.push(current.join(" "));
    }

    chunks
}

fn joined_len(parts: &[&str]) -> usize {
    if parts.is_empty() {
        return 0;
    }
    parts.iter().map(|part| part.len()).sum::<usize>() + parts.len() - 1
}

pub fn embed_document(
    document: &mut Document,
    embedder: &dyn Embedder,
    chunk_char_budget: usize,
) -> Result<(), PipelineError> {
    let filename = document.filename.clone();

    for section in &mut document.sections {
        let sentences = split_sentences(&section.body);
        let grouped = group_sentences(&sentences, chunk_char_budget);

        let mut chunks = Vec::<Chunk>::with_capacity(grouped.len());
        for (order_index, text) in grouped.into_iter().enumerate() {
            match embedder.embed(&text) {
                Ok(mut embedding) => {
                    if embedding.len() != embedder.dimensions() {
                        return Err(PipelineError::Configuration(format!(
                            "embedding dimensionality {} does not match model '{}' dimensionality {}",
                            embedding.len(),
                            embedder.model_id(),
                            embedder.dimensions()
                        )));
                    }

                    l2_normalize(&mut embedding);
                    chunks.push(Chunk {
                        text,
                        page_number: section.start_page,
                        order_index,
                        embedding,
                    });
                }
                Err(err) => {
                    warn!(
                        document = %filename,
                        section = %section.title,
                        order_index,
                        error = %err,
                        "dropping chunk after embedding failure"
                    );
                }
            }
        }

        section.chunks = chunks;
    }

    Ok(())
}

pub fn embed_query(text: &str, embedder: &dyn Embedder) -> Result<Vec<f32>, PipelineError> {
    let mut embedding = embedder
        .embed(text)
        .map_err(|source| PipelineError::Embedding {
            scope: "query".to_string(),
            source,
        })?;

    if embedding.len() != embedder.dimensions() {
        return Err(PipelineError::Configuration(format!(
            "query embedding dimensionality {} does not match model '{}' dimensionality {}",
            embedding.len(),
            embedder.model_id(),
            embedder.dimensions()
        )));
    }

    l2_normalize(&mut embedding);
    Ok(embedding)
}
