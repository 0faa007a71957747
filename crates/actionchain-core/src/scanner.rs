//! Finds the auxiliary files a chunk artifact references.
//!
//! The patterns here are tied to the serialized artifact grammar and are
//! tested against literal artifact text.

use crate::config::Config;
use crate::control::EXTRA_FILEREFS_ARG;
use crate::paths::{ACTIONCHAIN_DIR, ACTIONCHAIN_FILE_PREFIX};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

static FILE_REF_RE: OnceLock<Regex> = OnceLock::new();
static EXTRA_FILEREFS_LINE_RE: OnceLock<Regex> = OnceLock::new();

fn file_ref_re() -> &'static Regex {
    FILE_REF_RE.get_or_init(|| Regex::new(r"(salt://|topfn:\s*)([a-zA-Z0-9_\./]+)").unwrap())
}

fn extra_filerefs_line_re() -> &'static Regex {
    EXTRA_FILEREFS_LINE_RE.get_or_init(|| {
        Regex::new(&format!(r"(?m)^.*{}.*$", regex::escape(EXTRA_FILEREFS_ARG))).unwrap()
    })
}

/// Collects the references of an artifact that belong to it alone.
#[derive(Debug, Clone)]
pub struct ReferenceScanner<'a> {
    permanent_tops: &'a [String],
    permanent_states: &'a [String],
}

impl<'a> ReferenceScanner<'a> {
    pub fn new(permanent_tops: &'a [String], permanent_states: &'a [String]) -> Self {
        Self {
            permanent_tops,
            permanent_states,
        }
    }

    pub fn from_config(config: &'a Config) -> Self {
        Self::new(&config.permanent_tops, &config.permanent_states)
    }

    /// References in `text` that can be deleted together with the artifact.
    ///
    /// Skips the extra file bundle line (shared by every chunk of the chain),
    /// permanent tops and states, and other chunk artifacts. Matches may
    /// overlap: each search resumes one character after the previous match
    /// start. A capture directly followed by `://` is a scheme, not a path.
    pub fn scan(&self, text: &str) -> Vec<String> {
        let text = extra_filerefs_line_re().replace_all(text, "");
        let chunk_prefix = format!("{ACTIONCHAIN_DIR}/{ACTIONCHAIN_FILE_PREFIX}");

        let mut refs = Vec::new();
        let mut start = 0;
        while let Some(caps) = file_ref_re().captures_at(&text, start) {
            let (Some(whole), Some(path)) = (caps.get(0), caps.get(2)) else {
                break;
            };
            start = whole.start() + 1;
            if text[path.end()..].starts_with("://") {
                continue;
            }
            let path = path.as_str();
            if self.is_permanent(path) || path.starts_with(&chunk_prefix) {
                continue;
            }
            refs.push(path.to_string());
        }
        refs
    }

    /// Read an artifact and scan it. Unreadable files yield no references.
    pub fn find_file_refs_to_delete(&self, artifact: &Path) -> Vec<String> {
        match std::fs::read_to_string(artifact) {
            Ok(text) => self.scan(&text),
            Err(e) => {
                tracing::warn!(
                    path = %artifact.display(),
                    error = %e,
                    "could not collect file references"
                );
                Vec::new()
            }
        }
    }

    fn is_permanent(&self, path: &str) -> bool {
        self.permanent_tops
            .iter()
            .chain(self.permanent_states)
            .any(|entry| path.starts_with(entry.as_str()))
    }
}
