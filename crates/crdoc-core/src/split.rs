//! Multi-document YAML splitting
//!
//! Manifest files usually bundle several resources separated by `---`.
//! Every document is decoded on its own, so one malformed resource never
//! hides its siblings:
//!
//! ```text
//!   bytes ──► raw chunks (by `---` / `...` lines) ──► decode each ──► canonical YAML
//!                                                       │
//!                                                       └─► Err(SplitError) for that chunk only
//! ```

use serde_yaml::{Mapping, Value};
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;

/// Why a single document could not be produced
#[derive(Debug, Error)]
pub enum SplitError {
    #[error("document {index}: {source}")]
    Decode {
        index: usize,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("document {index}: invalid UTF-8: {source}")]
    InvalidUtf8 {
        index: usize,
        #[source]
        source: std::str::Utf8Error,
    },

    #[error("document {index}: root is not a mapping")]
    NotAMapping { index: usize },

    #[error("document {index}: failed to re-encode: {source}")]
    Encode {
        index: usize,
        #[source]
        source: serde_yaml::Error,
    },
}

impl SplitError {
    /// Position of the failing document among the non-empty documents of the file
    pub fn index(&self) -> usize {
        match self {
            SplitError::Decode { index, .. }
            | SplitError::InvalidUtf8 { index, .. }
            | SplitError::NotAMapping { index }
            | SplitError::Encode { index, .. } => *index,
        }
    }
}

/// Iterator over the documents of one YAML stream
///
/// Yields each non-empty document re-serialized from a generic mapping, in
/// input order. The iterator is consumed as it goes and cannot be restarted.
pub struct YamlDocuments {
    chunks: std::vec::IntoIter<Vec<u8>>,
    index: usize,
}

impl YamlDocuments {
    pub fn new(content: &[u8]) -> Self {
        Self {
            chunks: raw_documents(content).into_iter(),
            index: 0,
        }
    }
}

impl Iterator for YamlDocuments {
    type Item = Result<Vec<u8>, SplitError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let chunk = self.chunks.next()?;
            if is_blank(&chunk) {
                continue;
            }

            let index = self.index;
            self.index += 1;

            match decode(index, &chunk) {
                Ok(Some(doc)) => return Some(Ok(doc)),
                // An explicit null document (`~`) carries nothing
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Split a file into canonical documents, logging and skipping bad ones
///
/// A panic inside the decoder is contained here: the whole file then
/// yields no documents instead of taking the run down.
pub fn split_yaml(content: &[u8], filename: &str) -> Vec<Vec<u8>> {
    contain_panic(filename, || {
        YamlDocuments::new(content)
            .filter_map(|doc| match doc {
                Ok(doc) => Some(doc),
                Err(e) => {
                    tracing::warn!(file = filename, "Skipping YAML document: {}", e);
                    None
                }
            })
            .collect()
    })
}

/// Run `f`, turning a panic into an empty result for `filename`
fn contain_panic<T: Default>(filename: &str, f: impl FnOnce() -> T) -> T {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!(file = filename, "YAML decoder failed, ignoring file");
            T::default()
        }
    }
}

/// Cut the stream at document markers without interpreting content
///
/// Works on raw bytes so an invalid byte sequence only spoils the document
/// holding it.
fn raw_documents(content: &[u8]) -> Vec<Vec<u8>> {
    let mut docs = Vec::new();
    let mut current = Vec::new();

    for line in lines(content) {
        if let Some(rest) = line.strip_prefix(b"---") {
            if rest.first().is_none_or(u8::is_ascii_whitespace) {
                docs.push(std::mem::take(&mut current));
                // `--- key: value` starts the next document on the marker line
                let rest = rest.trim_ascii_start();
                if !rest.is_empty() && !rest.starts_with(b"#") {
                    current.extend_from_slice(rest);
                    current.push(b'\n');
                }
                continue;
            }
        }

        if line.trim_ascii_end() == b"..." {
            docs.push(std::mem::take(&mut current));
            continue;
        }

        // Directives are only valid ahead of a `---` marker
        if line.starts_with(b"%") {
            continue;
        }

        current.extend_from_slice(line);
        current.push(b'\n');
    }

    docs.push(current);
    docs
}

/// Lines without their `\n` or `\r\n` terminator
fn lines(content: &[u8]) -> impl Iterator<Item = &[u8]> {
    content.split_inclusive(|b| *b == b'\n').map(|line| {
        let line = line.strip_suffix(b"\n").unwrap_or(line);
        line.strip_suffix(b"\r").unwrap_or(line)
    })
}

fn is_blank(chunk: &[u8]) -> bool {
    lines(chunk).all(|l| {
        let l = l.trim_ascii();
        l.is_empty() || l.starts_with(b"#")
    })
}

fn decode(index: usize, chunk: &[u8]) -> Result<Option<Vec<u8>>, SplitError> {
    let text =
        std::str::from_utf8(chunk).map_err(|source| SplitError::InvalidUtf8 { index, source })?;
    let value: Value =
        serde_yaml::from_str(text).map_err(|source| SplitError::Decode { index, source })?;

    let mapping: Mapping = match value {
        Value::Mapping(mapping) => mapping,
        Value::Null => return Ok(None),
        _ => return Err(SplitError::NotAMapping { index }),
    };

    let doc =
        serde_yaml::to_string(&mapping).map_err(|source| SplitError::Encode { index, source })?;
    Ok(Some(doc.into_bytes()))
}
