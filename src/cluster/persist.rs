//! Text persistence for cluster stores.
//!
//! # Storage Format
//!
//! Whitespace-delimited, one record per line, in creation order:
//!
//! ```text
//! <clusterCount>
//! <memberCount> <centroid[0]> .. <centroid[W-1]> <embeddingId> <embeddingLen> <embedding..>
//! ```
//!
//! `W` is the store's feature width; it is not written to the file, so a file
//! must be loaded into a store configured with the width it was saved from.
//! Floats use Rust's shortest round-trip formatting, which makes
//! `save` followed by `load` exact.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::cluster::store::{Cluster, ClusterStore};
use crate::cluster::types::{ClusterError, ClusterId};

/// Tokens in a record before the embedding values: count, id, length.
const RECORD_OVERHEAD: usize = 3;

/// Path reported for read failures that did not come from a file.
const READER_PATH: &str = "<reader>";

/// Fully parsed store contents, built before anything is swapped in.
struct ParsedStore {
    clusters: Vec<Cluster>,
    embeddings: HashMap<ClusterId, Vec<f32>>,
    next_id: ClusterId,
}

impl ClusterStore {
    /// Writes the store to `path`, replacing any existing file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ClusterError> {
        let path = path.as_ref();
        let io_error = |source| ClusterError::IoUnavailable {
            path: path.to_path_buf(),
            source,
        };

        let file = File::create(path).map_err(io_error)?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer).map_err(io_error)?;
        writer.flush().map_err(io_error)?;

        info!(
            clusters = self.len(),
            path = %path.display(),
            "saved cluster store"
        );
        Ok(())
    }

    /// Replaces the store's contents with the clusters saved at `path`.
    ///
    /// All-or-nothing: on any error the in-memory state is left untouched.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), ClusterError> {
        let path = path.as_ref();
        let io_error = |source| ClusterError::IoUnavailable {
            path: path.to_path_buf(),
            source,
        };

        let mut contents = String::new();
        File::open(path)
            .and_then(|mut file| file.read_to_string(&mut contents))
            .map_err(io_error)?;

        match self.parse(&contents) {
            Ok(parsed) => {
                self.install(parsed);
                info!(
                    clusters = self.len(),
                    path = %path.display(),
                    "loaded cluster store"
                );
                Ok(())
            }
            Err(e) => {
                warn!(path = %path.display(), "rejected cluster file: {e}");
                Err(e)
            }
        }
    }

    /// Writes the persisted representation to any writer.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(writer, "{}", self.clusters.len())?;

        for cluster in &self.clusters {
            write!(writer, "{}", cluster.member_count)?;
            for value in &cluster.centroid {
                write!(writer, " {value}")?;
            }

            let embedding = self
                .embeddings
                .get(&cluster.id)
                .unwrap_or(&cluster.embedding);
            write!(writer, " {} {}", cluster.id, embedding.len())?;
            for value in embedding {
                write!(writer, " {value}")?;
            }
            writeln!(writer)?;
        }

        Ok(())
    }

    /// Replaces the store's contents from any reader. All-or-nothing.
    ///
    /// Input that is not UTF-8 is `MalformedPersistedData`; any other read
    /// failure is `IoUnavailable` with the placeholder path `<reader>`.
    pub fn read_from<R: Read>(&mut self, reader: &mut R) -> Result<(), ClusterError> {
        let mut contents = String::new();
        reader.read_to_string(&mut contents).map_err(|e| {
            if e.kind() == io::ErrorKind::InvalidData {
                ClusterError::malformed(1, format!("input is not UTF-8 text: {e}"))
            } else {
                ClusterError::IoUnavailable {
                    path: PathBuf::from(READER_PATH),
                    source: e,
                }
            }
        })?;

        let parsed = self.parse(&contents)?;
        self.install(parsed);
        Ok(())
    }

    fn install(&mut self, parsed: ParsedStore) {
        self.clusters = parsed.clusters;
        self.embeddings = parsed.embeddings;
        self.next_id = parsed.next_id;
    }

    fn parse(&self, contents: &str) -> Result<ParsedStore, ClusterError> {
        let width = self.feature_width();
        let mut lines = contents
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line))
            .filter(|(_, line)| !line.trim().is_empty());

        let (header_line, header) = lines
            .next()
            .ok_or_else(|| ClusterError::malformed(1, "missing cluster count"))?;
        let count: usize = header
            .trim()
            .parse()
            .map_err(|_| ClusterError::malformed(header_line, "cluster count is not an integer"))?;

        // The header is untrusted, so storage grows with the records found
        let mut clusters = Vec::new();
        let mut embeddings = HashMap::new();
        let mut next_id = ClusterId::new(0);

        for index in 0..count {
            let (line_no, line) = lines.next().ok_or_else(|| {
                ClusterError::malformed(
                    header_line,
                    format!("expected {count} records, found {index}"),
                )
            })?;

            let cluster = parse_record(line, line_no, width)?;
            if embeddings.contains_key(&cluster.id) {
                return Err(ClusterError::malformed(
                    line_no,
                    format!("duplicate embedding identity {}", cluster.id),
                ));
            }

            if cluster.id >= next_id {
                next_id = cluster.id.checked_next().ok_or_else(|| {
                    ClusterError::malformed(line_no, "embedding identity is out of range")
                })?;
            }
            embeddings.insert(cluster.id, cluster.embedding.clone());
            clusters.push(cluster);
        }

        if let Some((line_no, _)) = lines.next() {
            return Err(ClusterError::malformed(
                line_no,
                format!("unexpected data after {count} records"),
            ));
        }

        Ok(ParsedStore {
            clusters,
            embeddings,
            next_id,
        })
    }
}

fn parse_record(line: &str, line_no: usize, width: usize) -> Result<Cluster, ClusterError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < width + RECORD_OVERHEAD {
        return Err(ClusterError::malformed(
            line_no,
            format!(
                "record has {} values, a {width}-wide centroid needs at least {}",
                tokens.len(),
                width + RECORD_OVERHEAD
            ),
        ));
    }

    let member_count: u32 = parse_token(tokens[0], line_no, "member count")?;
    if member_count == 0 {
        return Err(ClusterError::malformed(line_no, "member count must be at least 1"));
    }

    let centroid = parse_floats(&tokens[1..=width], line_no)?;
    let id: u32 = parse_token(tokens[width + 1], line_no, "embedding identity")?;
    let embedding_len: usize = parse_token(tokens[width + 2], line_no, "embedding length")?;

    if embedding_len > width {
        return Err(ClusterError::malformed(
            line_no,
            format!("embedding length {embedding_len} exceeds the feature width {width}"),
        ));
    }
    let expected = width + RECORD_OVERHEAD + embedding_len;
    if tokens.len() != expected {
        return Err(ClusterError::malformed(
            line_no,
            format!(
                "embedding length {embedding_len} implies {expected} values, found {}",
                tokens.len()
            ),
        ));
    }

    let embedding = parse_floats(&tokens[width + RECORD_OVERHEAD..], line_no)?;

    Ok(Cluster {
        centroid,
        embedding,
        id: ClusterId::new(id),
        member_count,
    })
}

fn parse_token<T: std::str::FromStr>(
    token: &str,
    line_no: usize,
    what: &str,
) -> Result<T, ClusterError> {
    token
        .parse()
        .map_err(|_| ClusterError::malformed(line_no, format!("invalid {what} '{token}'")))
}

fn parse_floats(tokens: &[&str], line_no: usize) -> Result<Vec<f32>, ClusterError> {
    tokens
        .iter()
        .map(|token| {
            let value: f32 = parse_token(token, line_no, "value")?;
            if value.is_finite() {
                Ok(value)
            } else {
                Err(ClusterError::malformed(
                    line_no,
                    format!("non-finite value '{token}'"),
                ))
            }
        })
        .collect()
}
