//! Strategy selection from the size and the tail of a document.

use std::io::{Read, Seek, SeekFrom};

use log::{debug, warn};

use super::{ParserOptions, Strategy, VasprunError};

/// Number of trailing bytes inspected for the closing root tag
const TAIL_SIZE: u64 = 1024;

const CLOSING_ROOT: &str = "</modeling>";

/// Size and integrity of a document
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Preflight {
    pub size_mb: f64,
    pub truncated: bool,
}

impl Preflight {
    /// Inspect a seekable source, leaving it positioned at the start
    pub fn inspect<R: Read + Seek>(source: &mut R, label: &str) -> Result<Self, VasprunError> {
        let size = source
            .seek(SeekFrom::End(0))
            .map_err(|_| VasprunError::NoSize(label.to_string()))?;

        // Read the last KiB to find the closing root tag
        let read_size = size.min(TAIL_SIZE);
        source.seek(SeekFrom::End(-(read_size as i64)))?;
        let mut tail = vec![0u8; read_size as usize];
        source.read_exact(&mut tail)?;
        source.seek(SeekFrom::Start(0))?;

        let tail = String::from_utf8_lossy(&tail);
        let truncated = last_line(&tail) != Some(CLOSING_ROOT);
        if truncated {
            warn!("{} does not end with {}, reading it in recovery mode", label, CLOSING_ROOT);
        }

        Ok(Self {
            size_mb: size as f64 / (1024.0 * 1024.0),
            truncated,
        })
    }

    /// Pick the extraction strategy
    ///
    /// Truncated documents are always loaded whole, recovery needs the tree.
    pub fn strategy(&self, options: &ParserOptions) -> Strategy {
        let strategy = if self.truncated {
            Strategy::WholeDocument
        } else if options.force_streaming || self.size_mb >= options.size_cutoff_mb {
            Strategy::Streaming
        } else {
            Strategy::WholeDocument
        };
        debug!(
            "Selected {} strategy for {:.3} MB (truncated: {})",
            strategy, self.size_mb, self.truncated
        );
        strategy
    }
}

/// Last line with content
fn last_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).rev().find(|line| !line.is_empty())
}
