//! Repository summarization: fetch flattened content, assemble README and
//! root-document context blocks, and ask the model for a technical summary.
//!
//! Summarization degrades in two distinct ways. A fetch failure or a blob
//! with no extractable content means there is nothing to say, so the
//! repository is skipped (`None`). A generation failure still has the
//! extracted text in hand, so a raw-context fallback summary is indexed
//! instead of dropping the repository.

use crate::config::Config;
use crate::extract::{self, truncate_chars};
use crate::fetch::ContentFetcher;
use crate::llm::ollama::TextGenerator;

/// Root-document characters included in the fallback summary.
const FALLBACK_DOCS_CHARS: usize = 800;

/// Produce an indexable summary for the repository at `url`, or `None` when
/// the repository should be skipped.
pub async fn generate_summary(
    fetcher: &dyn ContentFetcher,
    generator: &dyn TextGenerator,
    config: &Config,
    name: &str,
    url: &str,
) -> Option<String> {
    let content = match fetcher.fetch(url).await {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!("Skipping {name}: content fetch failed: {e:#}");
            return None;
        }
    };

    let Some((readme_block, docs_block)) = extract::build_context_blocks(&content, &config.extraction)
    else {
        tracing::warn!("Skipping {name}: no extractable content");
        return None;
    };

    let prompt = build_summary_prompt(name, &readme_block, &docs_block, config.extraction.max_prompt_chars);

    match generator.generate(&prompt).await {
        Ok(summary) => Some(summary),
        Err(e) => {
            tracing::warn!("Summarization failed for {name}, indexing raw context: {e}");
            Some(fallback_summary(name, &readme_block, &docs_block))
        }
    }
}

fn build_summary_prompt(
    name: &str,
    readme_block: &str,
    docs_block: &str,
    max_prompt_chars: usize,
) -> String {
    let blocks = format!(
        "Repository: {name}\n\n[README]\n{readme_block}\n\n[ROOT_DOCS]\n{docs_block}"
    );
    let blocks = cap_prompt(&blocks, max_prompt_chars);

    format!(
        "You are a technical writer summarizing a software repository for a \
         search index.\n\
         \n\
         {blocks}\n\
         \n\
         Write a dense technical summary of this repository in 2-4 paragraphs. \
         Cover what the project does, the main technologies involved, and who \
         would use it. Use concrete terminology from the material above. Do \
         not invent features that are not mentioned."
    )
}

fn cap_prompt(blocks: &str, max_prompt_chars: usize) -> String {
    let capped = truncate_chars(blocks, max_prompt_chars);
    if capped.len() < blocks.len() {
        format!("{capped}\n[... truncated ...]")
    } else {
        blocks.to_string()
    }
}

/// Raw-context summary used when generation fails. Still lexically and
/// semantically close to the repository, so search stays useful.
fn fallback_summary(name: &str, readme_block: &str, docs_block: &str) -> String {
    let docs = truncate_chars(docs_block, FALLBACK_DOCS_CHARS);
    format!("{name}\n\nREADME: {readme_block}\n\nROOT_DOCS: {docs}")
}
