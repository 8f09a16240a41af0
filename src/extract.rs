//! Section extraction: turns a flattened repository content dump into named
//! text sections used both for indexing context and for summarization.
//!
//! The input blob interleaves multiple logical files, each preceded by a
//! header. Three header styles are recognized, tried in order until one
//! yields at least one section:
//!
//! 1. Heading lines (`# name`) or explicit `FILE:`/`PATH:`/`FILENAME:` labels
//! 2. Triple-line separator blocks (`===`/`---` fencing a name line)
//! 3. Single-line separator-wrapped names (`=== name ===`)
//!
//! Extraction never fails: an unparsable blob yields zero sections, which
//! callers treat as "no content available".

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::config::ExtractionConfig;

/// Upper bound on the README text kept for context assembly.
pub const README_MAX_CHARS: usize = 8000;

/// A named section parsed out of a content blob. Bodies never include the
/// header/separator tokens that delimited them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub body: String,
}

/// Which sections feed the summarization context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    /// Root-level `.toml`/`.txt` files in original order (the simple default)
    RootDocs,
    /// All sections ranked README-first with generated artifacts dropped
    Prioritized,
}

type Matcher = fn(&str) -> Vec<Section>;

/// Header matchers in priority order. The first one producing at least one
/// section wins; later forms are never merged in.
const MATCHERS: [Matcher; 3] = [
    match_heading_sections,
    match_fenced_sections,
    match_wrapped_sections,
];

/// Parse a raw content blob into an ordered list of named sections.
pub fn extract_sections(content: &str) -> Vec<Section> {
    for matcher in MATCHERS {
        let sections = matcher(content);
        if !sections.is_empty() {
            return sections;
        }
    }
    Vec::new()
}

fn heading_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^(?:#{1,6}[ \t]+|(?i:file|path|filename)[ \t]*:[ \t]+)([^\n]+)\n")
            .expect("valid heading pattern")
    })
}

fn fenced_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^(?:=+|-+)\n([^\n]+)\n(?:=+|-+)\n").expect("valid fence pattern")
    })
}

fn wrapped_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^(?:=+|-+)[ \t]*([^\n]+?)[ \t]*(?:=+|-+)(?:\n|\z)")
            .expect("valid wrapped pattern")
    })
}

fn match_heading_sections(content: &str) -> Vec<Section> {
    split_at_headers(content, heading_pattern())
}

fn match_fenced_sections(content: &str) -> Vec<Section> {
    split_at_headers(content, fenced_pattern())
}

fn match_wrapped_sections(content: &str) -> Vec<Section> {
    split_at_headers(content, wrapped_pattern())
}

/// Slice the content between consecutive header matches. The body of each
/// section runs from the end of its header to the start of the next one.
fn split_at_headers(content: &str, pattern: &Regex) -> Vec<Section> {
    let headers: Vec<(usize, usize, String)> = pattern
        .captures_iter(content)
        .filter_map(|cap| {
            let whole = cap.get(0)?;
            let name = clean_section_name(cap.get(1)?.as_str());
            Some((whole.start(), whole.end(), name))
        })
        .collect();

    let mut sections = Vec::with_capacity(headers.len());
    for (idx, (_, body_start, name)) in headers.iter().enumerate() {
        let body_end = headers
            .get(idx + 1)
            .map(|(start, _, _)| *start)
            .unwrap_or(content.len());
        let body = content[*body_start..body_end].trim_matches('\n').to_string();
        sections.push(Section {
            name: name.clone(),
            body,
        });
    }
    sections
}

struct NameCleaners {
    trailing_annotation: Regex,
    label: Regex,
    leading_separators: Regex,
    trailing_separators: Regex,
}

fn name_cleaners() -> &'static NameCleaners {
    static CLEANERS: OnceLock<NameCleaners> = OnceLock::new();
    CLEANERS.get_or_init(|| NameCleaners {
        trailing_annotation: Regex::new(r"\s+\(.*\)$").expect("valid annotation pattern"),
        label: Regex::new(r"(?i)^(?:file|path|filename)\s*:\s*").expect("valid label pattern"),
        leading_separators: Regex::new(r"^[-=]+\s*").expect("valid separator pattern"),
        trailing_separators: Regex::new(r"\s*[-=]+$").expect("valid separator pattern"),
    })
}

/// Strip surrounding whitespace/backticks, a trailing parenthetical
/// annotation, an optional leading `file:`/`path:`/`filename:` label, and
/// leading/trailing separator punctuation from a section name.
pub fn clean_section_name(name: &str) -> String {
    let cleaners = name_cleaners();
    let cleaned = name.trim().trim_matches('`');
    let cleaned = cleaners.trailing_annotation.replace(cleaned, "");
    let cleaned = cleaners.label.replace(&cleaned, "");
    let cleaned = cleaners.leading_separators.replace(&cleaned, "");
    let cleaned = cleaners.trailing_separators.replace(&cleaned, "");
    cleaned.into_owned()
}

/// Final path component, after either separator style.
fn base_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

/// Return the README body if present, capped at [`README_MAX_CHARS`].
///
/// Selection: the first section whose final path component starts with
/// "readme" (case-insensitive), else the first whose final component contains
/// it. When sectioning failed entirely, a secondary pass looks for an inline
/// `README` heading block directly in the raw content. Returns an empty
/// string when nothing matches; callers render an explicit placeholder.
pub fn extract_readme(content: &str) -> String {
    let sections = extract_sections(content);
    if !sections.is_empty() {
        for section in &sections {
            if base_name(&section.name).to_lowercase().starts_with("readme") {
                return truncate_chars(section.body.trim(), README_MAX_CHARS).to_string();
            }
        }
        for section in &sections {
            if base_name(&section.name).to_lowercase().contains("readme") {
                return truncate_chars(section.body.trim(), README_MAX_CHARS).to_string();
            }
        }
    }
    inline_readme(content)
}

fn inline_readme_start() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?mi)^(?:#{1,6}[ \t]+|FILE:[ \t]+)?README(?:\.(?:md|rst|txt))?[ \t]*\n")
            .expect("valid readme pattern")
    })
}

fn next_header_start() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?mi)^(?:#{1,6}[ \t]+|FILE:[ \t]+)").expect("valid header pattern")
    })
}

/// Secondary README pass for blobs that defeated all three header forms.
fn inline_readme(content: &str) -> String {
    let Some(heading) = inline_readme_start().find(content) else {
        return String::new();
    };
    let rest = &content[heading.end()..];
    let body_end = next_header_start()
        .find(rest)
        .map(|m| m.start())
        .unwrap_or(rest.len());
    truncate_chars(rest[..body_end].trim(), README_MAX_CHARS).to_string()
}

fn is_root_name(name: &str) -> bool {
    !name.contains('/') && !name.contains('\\')
}

/// Root-level documentation sections: no path separator in the name, and a
/// name ending with one of the configured extensions. Order is preserved
/// from the original section order; previews are truncated and entries that
/// become empty are dropped.
pub fn extract_root_docs(content: &str, config: &ExtractionConfig) -> Vec<Section> {
    let mut filtered: Vec<Section> = extract_sections(content)
        .into_iter()
        .filter(|s| {
            let lower = s.name.to_lowercase();
            is_root_name(&s.name)
                && config
                    .root_doc_extensions
                    .iter()
                    .any(|ext| lower.ends_with(ext.as_str()))
        })
        .collect();
    filtered.truncate(config.max_files);
    preview_sections(filtered, config.max_file_preview_chars)
}

/// Alternate extraction mode: keep every section that is not a generated or
/// binary artifact and rank them README-first, then docs, manifests, source,
/// config, and everything else. Ranking is stable, so sections of the same
/// class keep their original order.
pub fn extract_prioritized(content: &str, config: &ExtractionConfig) -> Vec<Section> {
    let mut kept: Vec<Section> = extract_sections(content)
        .into_iter()
        .filter(|s| !is_generated_artifact(&s.name))
        .collect();
    kept.sort_by_key(|s| section_priority(&s.name));
    kept.truncate(config.max_files);
    preview_sections(kept, config.max_file_preview_chars)
}

fn preview_sections(sections: Vec<Section>, max_chars: usize) -> Vec<Section> {
    sections
        .into_iter()
        .filter_map(|s| {
            let preview = truncate_chars(s.body.trim(), max_chars);
            if preview.is_empty() {
                None
            } else {
                Some(Section {
                    name: s.name,
                    body: preview.to_string(),
                })
            }
        })
        .collect()
}

const SOURCE_EXTENSIONS: [&str; 17] = [
    ".rs", ".py", ".js", ".ts", ".tsx", ".jsx", ".go", ".java", ".c", ".cpp", ".h", ".rb",
    ".php", ".swift", ".kt", ".scala", ".sh",
];

const CONFIG_EXTENSIONS: [&str; 7] = [".yaml", ".yml", ".json", ".toml", ".ini", ".cfg", ".conf"];

fn section_priority(name: &str) -> u8 {
    let lower = name.to_lowercase();
    let base = base_name(&lower);
    if base.starts_with("readme") {
        return 0;
    }
    if lower.ends_with(".md") || lower.ends_with(".rst") || lower.ends_with(".txt") {
        return 1;
    }
    if matches!(base, "setup.py" | "pyproject.toml" | "package.json" | "cargo.toml") {
        return 2;
    }
    if SOURCE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        return 3;
    }
    if CONFIG_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        return 4;
    }
    5
}

const LOCKFILE_NAMES: [&str; 8] = [
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "cargo.lock",
    "poetry.lock",
    "pipfile.lock",
    "composer.lock",
    "gemfile.lock",
];

const BINARY_SUFFIXES: [&str; 16] = [
    ".min.js", ".min.css", ".bundle.js", ".map", ".png", ".jpg", ".jpeg", ".gif", ".ico",
    ".svg", ".webp", ".woff", ".woff2", ".ttf", ".otf", ".eot",
];

const METADATA_DIRS: [&str; 7] = [
    ".git",
    ".svn",
    ".hg",
    ".idea",
    ".vscode",
    "__pycache__",
    "node_modules",
];

/// Generated or binary artifacts that carry no summarization signal.
fn is_generated_artifact(name: &str) -> bool {
    let lower = name.to_lowercase();
    let base = base_name(&lower);
    if LOCKFILE_NAMES.contains(&base) {
        return true;
    }
    if BINARY_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix)) {
        return true;
    }
    lower
        .split(['/', '\\'])
        .any(|segment| METADATA_DIRS.contains(&segment))
}

/// Assemble labeled context blocks for summarization. Returns `None` when the
/// blob produced no sections and no inline README — "no content available" —
/// so callers skip the repository instead of indexing an empty record.
pub fn build_context_blocks(content: &str, config: &ExtractionConfig) -> Option<(String, String)> {
    let readme = extract_readme(content);
    if readme.is_empty() && extract_sections(content).is_empty() {
        return None;
    }

    let docs = match config.mode {
        ExtractionMode::RootDocs => extract_root_docs(content, config),
        ExtractionMode::Prioritized => extract_prioritized(content, config),
    };

    let readme_block = if readme.is_empty() {
        "(README missing or empty)".to_string()
    } else {
        readme
    };

    let docs_block = if docs.is_empty() {
        "(No root .toml/.txt files captured)".to_string()
    } else {
        docs.iter()
            .map(|s| format!("FILE: {}\n{}", s.name, s.body))
            .collect::<Vec<_>>()
            .join("\n\n---\n\n")
    };

    Some((readme_block, docs_block))
}

/// Truncate to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
