mod heading;

use anyhow::{bail, Result};
use heading::Heading;
use inflector::Inflector;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::Path};
use text_splitter::{ChunkConfig, MarkdownSplitter, TextSplitter};
use tracing::debug;
use yaml_front_matter::YamlFrontMatter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentKind {
    #[default]
    Text,
    Markdown,
}

impl DocumentKind {
    #[must_use]
    pub fn from_content_type(content_type: &str) -> Self {
        match content_type.split(';').next().map(str::trim) {
            Some("text/markdown" | "text/x-markdown") => Self::Markdown,
            _ => Self::Text,
        }
    }

    /// Picks the kind from the content type, or from a `.md`/`.mdx` name when
    /// no content type is given.
    #[must_use]
    pub fn detect(name: &str, content_type: Option<&str>) -> Self {
        if let Some(content_type) = content_type {
            return Self::from_content_type(content_type);
        }

        match Path::new(name).extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("md") || ext.eq_ignore_ascii_case("mdx") => {
                Self::Markdown
            }
            _ => Self::Text,
        }
    }

    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Text => "text/plain",
            Self::Markdown => "text/markdown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkOptions {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl ChunkOptions {
    fn config(self) -> Result<ChunkConfig<text_splitter::Characters>> {
        if self.chunk_size == 0 {
            bail!("Chunk size must be greater than zero");
        }

        if self.chunk_overlap >= self.chunk_size {
            bail!("Chunk overlap must be smaller than chunk size");
        }

        Ok(ChunkConfig::new(self.chunk_size).with_overlap(self.chunk_overlap)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Chunk {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub title: String,
    pub description: Option<String>,
    pub chunks: Vec<Chunk>,
}

#[derive(Debug, serde::Deserialize, Default)]
struct FrontMatter {
    title: Option<String>,
    description: Option<String>,
}

fn has_front_matter(content: &str) -> bool {
    let mut lines = content.lines().skip_while(|line| line.trim().is_empty());

    lines.next().map(str::trim) == Some("---") && lines.any(|line| line.trim() == "---")
}

// A leading `---` may just be a thematic break, so anything that isn't valid
// front matter is kept as content.
fn parse_meta(content: &str) -> (FrontMatter, String) {
    if !has_front_matter(content) {
        return (FrontMatter::default(), content.to_string());
    }

    match YamlFrontMatter::parse::<FrontMatter>(content) {
        Ok(document) => (document.metadata, document.content.trim().to_owned()),
        Err(err) => {
            debug!(error = %err, "Leading rule is not front matter");
            (FrontMatter::default(), content.to_string())
        }
    }
}

fn title_from_name(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(name)
        .to_title_case()
}

#[derive(Debug)]
struct Section {
    title: Option<String>,
    content: String,
}

impl Section {
    const fn with_title(title: Option<String>) -> Self {
        Self {
            title,
            content: String::new(),
        }
    }

    fn append(&mut self, line: &str) {
        if !self.content.is_empty() {
            self.content.push('\n');
        }

        self.content.push_str(line.trim_end());
    }
}

struct State {
    is_inside_code_block: bool,
    sections: Vec<Section>,
    depth_map: BTreeMap<usize, String>,
    first_heading: Option<String>,
}

impl State {
    fn with_title(title: Option<String>) -> Self {
        Self {
            is_inside_code_block: false,
            sections: vec![Section::with_title(title.clone())],
            depth_map: title.map_or_else(BTreeMap::new, |title| BTreeMap::from([(1, title)])),
            first_heading: None,
        }
    }

    fn toggle_code_block(&mut self) {
        self.is_inside_code_block = !self.is_inside_code_block;
    }

    fn compute_title(&mut self, heading: &Heading) -> String {
        if heading.depth == 1 && self.first_heading.is_none() {
            self.first_heading = Some(heading.content.clone());
        }

        self.depth_map.retain(|depth, _| *depth < heading.depth);
        self.depth_map
            .insert(heading.depth, heading.content.clone());

        self.depth_map
            .values()
            .cloned()
            .collect::<Vec<_>>()
            .join(": ")
    }

    fn push_line(&mut self, line: &str) {
        if let Some(section) = self.sections.last_mut() {
            section.append(line);
        }
    }

    fn into_sections(self) -> Vec<Section> {
        self.sections
            .into_iter()
            .filter(|section| !section.content.trim().is_empty())
            .collect()
    }
}

/// Returns the sections and the first top-level heading.
fn extract_sections(content: &str, title: Option<String>) -> (Vec<Section>, Option<String>) {
    let mut state = State::with_title(title);

    for line in content.lines() {
        if line.trim_start().starts_with("```") {
            state.toggle_code_block();
        }

        if !state.is_inside_code_block {
            if let Some(heading) = Heading::try_parse(line) {
                let title = state.compute_title(&heading);
                state.sections.push(Section::with_title(Some(title)));

                continue;
            }
        }

        state.push_line(line);
    }

    let first_heading = state.first_heading.take();
    (state.into_sections(), first_heading)
}

/// Parses a document and splits it into chunks ready to be embedded.
///
/// Markdown documents are split at their headings first, and every chunk
/// remembers the heading path it came from.
///
/// # Errors
///
/// Returns an error if the chunk options are invalid.
pub fn parse_document(
    name: &str,
    content: &str,
    kind: DocumentKind,
    options: ChunkOptions,
) -> Result<Document> {
    let (title, description, sections) = match kind {
        DocumentKind::Markdown => {
            let (metadata, content) = parse_meta(content);
            let (sections, first_heading) = extract_sections(&content, metadata.title.clone());

            (metadata.title.or(first_heading), metadata.description, sections)
        }
        DocumentKind::Text => (
            None,
            None,
            vec![Section {
                title: None,
                content: content.to_string(),
            }],
        ),
    };

    let markdown = MarkdownSplitter::new(options.config()?);
    let text = TextSplitter::new(options.config()?);
    let mut chunks = Vec::new();

    for section in sections {
        let pieces: Vec<&str> = match kind {
            DocumentKind::Markdown => markdown.chunks(&section.content).collect(),
            DocumentKind::Text => text.chunks(&section.content).collect(),
        };

        for piece in pieces.into_iter().map(str::trim).filter(|p| !p.is_empty()) {
            chunks.push(Chunk {
                index: chunks.len(),
                title: section.title.clone(),
                content: piece.to_string(),
            });
        }
    }

    debug!(
        document = name,
        chunk_count = chunks.len(),
        chunk_size = options.chunk_size,
        "Document chunked"
    );

    Ok(Document {
        title: title.unwrap_or_else(|| title_from_name(name)),
        description,
        chunks,
    })
}
