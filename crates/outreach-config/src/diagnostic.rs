// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns figment failures into miette diagnostics that point at the
//! offending key in `outreach.toml` and suggest the closest valid key.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use std::fmt::Write as _;

use figment::error::Kind;
use miette::{Diagnostic, GraphicalReportHandler, NamedSource, SourceSpan};
use thiserror::Error;

/// Keys scoring below this Jaro-Winkler similarity are never suggested.
const MIN_SIMILARITY: f64 = 0.75;

/// Everything that can be wrong with an Outreach configuration.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("`{key}` is not a recognized setting{}", in_section(.section))]
    #[diagnostic(
        code(outreach::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        /// Dotted table path the key was found under; empty at top level.
        section: String,
        suggestion: Option<String>,
        valid_keys: String,
        #[label("unknown key")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{key}` has the wrong type: found {found}")]
    #[diagnostic(code(outreach::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        found: String,
        expected: String,
    },

    #[error("`{key}` is required{}", in_section(.section))]
    #[diagnostic(
        code(outreach::config::missing_key),
        help("set `{key}` in outreach.toml or through an OUTREACH_ environment variable")
    )]
    MissingKey { key: String, section: String },

    /// A value parsed but failed a semantic check.
    #[error("{message}")]
    #[diagnostic(code(outreach::config::validation))]
    Validation { message: String },

    #[error("{0}")]
    #[diagnostic(code(outreach::config::other))]
    Other(String),
}

fn in_section(section: &str) -> String {
    if section.is_empty() {
        String::new()
    } else {
        format!(" in [{section}]")
    }
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    let mut help = String::new();
    if let Some(key) = suggestion {
        let _ = write!(help, "did you mean `{key}`? ");
    }
    let _ = write!(help, "accepted keys here: {valid_keys}");
    help
}

/// Converts every error carried by a `figment::Error` into a [`ConfigError`].
///
/// `toml_sources` pairs a display path with file content; it is used to
/// attach a labelled span to unknown keys.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| {
            let section = error.path.join(".");
            match error.kind {
                Kind::UnknownField(ref key, expected) => {
                    let (span, src) = locate(&error, key, toml_sources);
                    ConfigError::UnknownKey {
                        suggestion: suggest_key(key, expected),
                        valid_keys: expected.join(", "),
                        key: key.clone(),
                        section,
                        span,
                        src,
                    }
                }
                Kind::MissingField(ref key) => ConfigError::MissingKey {
                    key: key.to_string(),
                    section,
                },
                Kind::InvalidType(ref found, ref expected) => ConfigError::InvalidType {
                    key: section,
                    found: found.to_string(),
                    expected: expected.clone(),
                },
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

/// Picks the source the error came from and finds the key inside it.
fn locate(
    error: &figment::Error,
    key: &str,
    toml_sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let from_file = match error.metadata.as_ref().and_then(|m| m.source.as_ref()) {
        Some(figment::Source::File(path)) => Some(path.display().to_string()),
        _ => None,
    };

    // Inline TOML carries no file source.
    let found = match (from_file, toml_sources) {
        (Some(path), sources) => sources.iter().find(|(name, _)| *name == path),
        (None, [only]) => Some(only),
        (None, _) => None,
    };

    found
        .and_then(|(name, content)| {
            let offset = find_key_offset(content, &error.path, key)?;
            Some((
                Some(SourceSpan::new(offset.into(), key.len())),
                Some(NamedSource::new(name, content.clone())),
            ))
        })
        .unwrap_or((None, None))
}

/// Byte offset of `key` inside the table named by `path[0]`, or anywhere in
/// the document when `path` is empty.
pub fn find_key_offset(content: &str, path: &[String], key: &str) -> Option<usize> {
    let start = match path.first() {
        Some(table) => {
            let header = format!("[{table}]");
            content.find(&header)? + header.len()
        }
        None => 0,
    };

    let mut offset = start;
    for line in content[start..].split_inclusive('\n') {
        let indent = line.len() - line.trim_start().len();
        let rest = &line[indent..];
        if rest.starts_with('[') && !path.is_empty() {
            return None;
        }
        if let Some(after) = rest.strip_prefix(key)
            && after.trim_start().starts_with('=')
        {
            return Some(offset + indent);
        }
        offset += line.len();
    }
    None
}

/// The valid key most similar to `unknown`, when one is close enough.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    let mut best: Option<(f64, &str)> = None;
    for key in valid_keys {
        let score = strsim::jaro_winkler(unknown, key);
        if score > MIN_SIMILARITY && best.is_none_or(|(top, _)| score > top) {
            best = Some((score, *key));
        }
    }
    best.map(|(_, key)| key.to_string())
}

/// Prints every error to stderr as a graphical miette report.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = GraphicalReportHandler::new();
    let mut out = String::new();
    for error in errors {
        if handler.render_report(&mut out, error as &dyn Diagnostic).is_err() {
            let _ = writeln!(out, "error: {error}");
        }
    }
    let _ = writeln!(
        out,
        "{} configuration error(s); outreach did not start",
        errors.len()
    );
    eprint!("{out}");
}
