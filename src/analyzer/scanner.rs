//! Codebase scanner for SQL queries.

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use super::{HostLanguage, SourceNode, commit_hash, extract_nodes};
use crate::config::ScanConfig;
use crate::query::{Detection, NodeId, StatementKind, view_of};
use crate::table::{Provenance, RowSink};

/// A detected query.
#[derive(Debug, Clone)]
pub struct QueryMatch {
    pub file: PathBuf,
    pub line: Option<usize>,
    pub node: NodeId,
    pub kind: StatementKind,
    pub sql: String,
}

/// Text that looked like SQL but did not parse.
#[derive(Debug, Clone)]
pub struct SkippedCandidate {
    pub file: PathBuf,
    pub line: Option<usize>,
    pub message: String,
}

/// Analysis result for a single file
#[derive(Debug, Clone)]
pub struct FileAnalysis {
    pub file: PathBuf,
    pub language: HostLanguage,
    /// Host nodes looked at.
    pub nodes: usize,
    pub queries: usize,
    pub skipped: usize,
}

/// Complete scan result with per-file breakdown
#[derive(Debug, Default)]
pub struct ScanResult {
    pub matches: Vec<QueryMatch>,
    pub skipped: Vec<SkippedCandidate>,
    pub files: Vec<FileAnalysis>,
}

impl ScanResult {
    pub fn query_count(&self) -> usize {
        self.matches.len()
    }
}

#[derive(Debug)]
struct FileOutcome {
    analysis: FileAnalysis,
    matches: Vec<QueryMatch>,
    skipped: Vec<SkippedCandidate>,
}

/// Scanner for finding SQL in source trees.
///
/// Files are processed in parallel; rows go to the sink as they are found.
#[derive(Debug, Clone, Default)]
pub struct CodebaseScanner {
    config: ScanConfig,
}

impl CodebaseScanner {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Scan files and directories, writing report rows into `sink`.
    pub fn scan(&self, roots: &[PathBuf], sink: &dyn RowSink) -> ScanResult {
        let mut files = Vec::new();
        for root in roots {
            let commit = if self.config.git_provenance {
                let dir = if root.is_dir() {
                    Some(root.as_path())
                } else {
                    root.parent().filter(|p| !p.as_os_str().is_empty())
                };
                commit_hash(dir.unwrap_or(Path::new(".")))
            } else {
                None
            };

            let mut found = Vec::new();
            if root.is_file() {
                if let Some(language) = HostLanguage::for_path(root) {
                    found.push((root.clone(), language));
                }
            } else if root.is_dir() {
                self.collect_dir(root, &mut found);
            } else {
                tracing::warn!("Skipping {}: no such file or directory", root.display());
            }
            found.sort_by(|a, b| a.0.cmp(&b.0));
            files.extend(found.into_iter().map(|(path, lang)| (path, lang, commit.clone())));
        }
        tracing::debug!("Scanning {} files", files.len());

        let outcomes: Vec<FileOutcome> = files
            .par_iter()
            .filter_map(|(path, language, commit)| {
                self.scan_file(path, *language, commit.as_deref(), sink)
            })
            .collect();

        let mut result = ScanResult::default();
        for outcome in outcomes {
            result.files.push(outcome.analysis);
            result.matches.extend(outcome.matches);
            result.skipped.extend(outcome.skipped);
        }
        tracing::info!(
            "Found {} queries in {} files ({} candidates did not parse)",
            result.matches.len(),
            result.files.iter().filter(|f| f.queries > 0).count(),
            result.skipped.len()
        );
        result
    }

    /// Recursively collect the files to visit.
    fn collect_dir(&self, dir: &Path, found: &mut Vec<(PathBuf, HostLanguage)>) {
        let entries = match fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!("Cannot read {}: {}", dir.display(), e);
                return;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
                if self.config.skips_dir(name) {
                    continue;
                }
                self.collect_dir(&path, found);
            } else if let Some(ext) = path.extension().and_then(|e| e.to_str())
                && self.config.wants_extension(ext)
                && let Some(language) = HostLanguage::from_extension(ext)
            {
                found.push((path, language));
            }
        }
    }

    fn scan_file(
        &self,
        path: &Path,
        language: HostLanguage,
        commit: Option<&str>,
        sink: &dyn RowSink,
    ) -> Option<FileOutcome> {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("Cannot read {}: {}", path.display(), e);
                return None;
            }
        };
        let nodes = extract_nodes(path, language, &content).unwrap_or_else(|e| {
            tracing::debug!("{}", e);
            Vec::new()
        });

        let source_path = path.display().to_string();
        let mut outcome = FileOutcome {
            analysis: FileAnalysis {
                file: path.to_path_buf(),
                language,
                nodes: nodes.len(),
                queries: 0,
                skipped: 0,
            },
            matches: Vec::new(),
            skipped: Vec::new(),
        };

        for SourceNode { node, line, .. } in nodes {
            match view_of(&node, self.config.dialect) {
                Detection::Query(view) => {
                    let provenance = Provenance {
                        source_path: Some(source_path.clone()),
                        line_number: line,
                        commit_hash: commit.map(str::to_string),
                    };
                    sink.insert_query(view.query_text_row(Some(&source_path)));
                    for row in view.usage_rows(&provenance) {
                        sink.insert_usage(row);
                    }
                    outcome.matches.push(QueryMatch {
                        file: path.to_path_buf(),
                        line,
                        node: view.node_id(),
                        kind: view.kind(),
                        sql: view.sql().to_string(),
                    });
                }
                Detection::Failed(failure) => {
                    outcome.skipped.push(SkippedCandidate {
                        file: path.to_path_buf(),
                        line,
                        message: failure.message().to_string(),
                    });
                }
                Detection::NotApplicable => {}
            }
        }

        outcome.analysis.queries = outcome.matches.len();
        outcome.analysis.skipped = outcome.skipped.len();
        Some(outcome)
    }
}
