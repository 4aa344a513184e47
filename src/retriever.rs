//! Example store: past routing decisions, ranked by tag overlap with a query.
//!
//! Rows are loaded once from a CSV or YAML table and never mutated. Ranking
//! is purely lexical: the score of a row is the number of its tags that
//! appear as words in the query.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::config::RetrievalPolicy;
use crate::tools::Catalog;

/// One past query with the tool that answered it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExampleRecord {
    pub query: String,
    pub tool_name: String,
    pub reasoning: String,
    pub summary: String,
    /// Lowercase, deduplicated, in table order.
    pub tags: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ExampleStoreError {
    #[error("failed to read example table {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("example table line {line}: {message}")]
    Csv { line: usize, message: String },
    #[error("example table is missing column \"{0}\"")]
    MissingColumn(&'static str),
    #[error("invalid YAML example table: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("unsupported example table format: {0} (expected .csv, .yaml or .yml)")]
    UnsupportedFormat(String),
}

/// Tags may be written comma-joined or as a list in YAML tables.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TagField {
    Joined(String),
    List(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct YamlRow {
    query: String,
    tool_name: String,
    #[serde(default)]
    reasoning: String,
    #[serde(default, alias = "action_input")]
    summary: String,
    tags: TagField,
}

/// Read-only table of example records.
#[derive(Debug, Clone, Default)]
pub struct ExampleStore {
    records: Vec<ExampleRecord>,
}

/// Lowercase query words with edge punctuation trimmed.
pub fn query_words(query: &str) -> HashSet<String> {
    query
        .split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect()
}

fn normalize_tags<I: IntoIterator<Item = String>>(raw: I) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .collect()
}

fn split_tags(joined: &str) -> Vec<String> {
    normalize_tags(joined.split(',').map(str::to_string))
}

/// Split CSV text into records of fields, honoring double-quoted fields
/// (which may contain commas, newlines and `""` escapes).
fn parse_csv(content: &str) -> Result<Vec<(usize, Vec<String>)>, ExampleStoreError> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut record_line = 1;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.is_empty() => in_quotes = true,
            ',' if !in_quotes => fields.push(std::mem::take(&mut field)),
            '\r' if !in_quotes => {}
            '\n' if !in_quotes => {
                fields.push(std::mem::take(&mut field));
                if fields.iter().any(|f| !f.trim().is_empty()) {
                    records.push((record_line, std::mem::take(&mut fields)));
                } else {
                    fields.clear();
                }
                line += 1;
                record_line = line;
            }
            '\n' => {
                field.push(c);
                line += 1;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(ExampleStoreError::Csv {
            line: record_line,
            message: "unterminated quoted field".to_string(),
        });
    }
    fields.push(field);
    if fields.iter().any(|f| !f.trim().is_empty()) {
        records.push((record_line, fields));
    }

    Ok(records)
}

impl ExampleStore {
    pub fn new(records: Vec<ExampleRecord>) -> Self {
        Self { records }
    }

    /// Load a table from disk; the format follows the file extension.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ExampleStoreError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ExampleStoreError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_lowercase();

        let store = match extension.as_str() {
            "csv" => Self::from_csv_str(&content)?,
            "yaml" | "yml" => Self::from_yaml_str(&content)?,
            other => return Err(ExampleStoreError::UnsupportedFormat(other.to_string())),
        };

        log::info!(
            "ExampleStore: loaded {} examples from {}",
            store.len(),
            path.display()
        );
        Ok(store)
    }

    /// Parse a CSV table with header `query,tool_name,reasoning,summary,tags`.
    ///
    /// `action_input` is accepted in place of `summary`; other columns are ignored.
    pub fn from_csv_str(content: &str) -> Result<Self, ExampleStoreError> {
        // Spreadsheet exports often start with a byte order mark.
        let content = content.trim_start_matches('\u{feff}');
        let mut rows = parse_csv(content)?.into_iter();
        let Some((_, header)) = rows.next() else {
            return Ok(Self::default());
        };

        let header: Vec<String> = header.iter().map(|h| h.trim().to_lowercase()).collect();
        let column = |names: &[&str]| header.iter().position(|h| names.contains(&h.as_str()));
        let query_col = column(&["query"]).ok_or(ExampleStoreError::MissingColumn("query"))?;
        let tool_col =
            column(&["tool_name"]).ok_or(ExampleStoreError::MissingColumn("tool_name"))?;
        let tags_col = column(&["tags"]).ok_or(ExampleStoreError::MissingColumn("tags"))?;
        let reasoning_col = column(&["reasoning"]);
        let summary_col = column(&["summary", "action_input"]);

        let mut records = Vec::new();
        for (line, fields) in rows {
            if fields.len() != header.len() {
                return Err(ExampleStoreError::Csv {
                    line,
                    message: format!("expected {} fields, found {}", header.len(), fields.len()),
                });
            }
            let get = |col: Option<usize>| {
                col.and_then(|i| fields.get(i))
                    .map(|f| f.trim().to_string())
                    .unwrap_or_default()
            };
            records.push(ExampleRecord {
                query: get(Some(query_col)),
                tool_name: get(Some(tool_col)),
                reasoning: get(reasoning_col),
                summary: get(summary_col),
                tags: split_tags(&get(Some(tags_col))),
            });
        }

        Ok(Self::new(records))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ExampleStoreError> {
        let rows: Vec<YamlRow> = serde_yaml::from_str(content)?;
        let records = rows
            .into_iter()
            .map(|row| ExampleRecord {
                query: row.query,
                tool_name: row.tool_name,
                reasoning: row.reasoning,
                summary: row.summary,
                tags: match row.tags {
                    TagField::Joined(joined) => split_tags(&joined),
                    TagField::List(list) => normalize_tags(list),
                },
            })
            .collect();
        Ok(Self::new(records))
    }

    /// Drop rows naming a tool the catalog does not offer. Returns how many.
    pub fn retain_known_tools(&mut self, catalog: &Catalog) -> usize {
        let before = self.records.len();
        self.records.retain(|record| {
            let known = catalog.get(&record.tool_name).is_some();
            if !known {
                log::warn!(
                    "ExampleStore: dropping example \"{}\" with unknown tool {}",
                    record.query,
                    record.tool_name
                );
            }
            known
        });
        before - self.records.len()
    }

    fn scored<'a>(&'a self, query: &str) -> Vec<(usize, &'a ExampleRecord)> {
        let words = query_words(query);
        self.records
            .iter()
            .map(|record| {
                let score = record.tags.iter().filter(|t| words.contains(*t)).count();
                (score, record)
            })
            .collect()
    }

    /// Up to `top_n` rows sharing at least one tag with `query`, best first.
    ///
    /// Ties keep table order. An empty result means "no examples", not an error.
    pub fn retrieve(&self, query: &str, top_n: usize) -> Vec<&ExampleRecord> {
        let mut scored: Vec<_> = self
            .scored(query)
            .into_iter()
            .filter(|(score, _)| *score > 0)
            .collect();
        // Stable sort: equal scores stay in table order.
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().take(top_n).map(|(_, r)| r).collect()
    }

    /// The single highest-scoring row, even when nothing overlaps.
    ///
    /// With zero overlap everywhere this is the first row of the table.
    /// `None` only for an empty table.
    pub fn retrieve_best(&self, query: &str) -> Option<&ExampleRecord> {
        let mut best: Option<(usize, &ExampleRecord)> = None;
        for (score, record) in self.scored(query) {
            if best.map_or(true, |(top, _)| score > top) {
                best = Some((score, record));
            }
        }
        best.map(|(_, record)| record)
    }

    pub fn retrieve_with(
        &self,
        policy: RetrievalPolicy,
        query: &str,
        top_n: usize,
    ) -> Vec<&ExampleRecord> {
        match policy {
            RetrievalPolicy::TopN => self.retrieve(query, top_n),
            RetrievalPolicy::BestMatch => self.retrieve_best(query).into_iter().collect(),
        }
    }

    #[cfg(test)]
    pub fn records(&self) -> &[ExampleRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
