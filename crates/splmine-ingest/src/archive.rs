//! Release archive unpacking.
//!
//! A DailyMed release package is a zip of per-label zips, each holding one
//! SPL XML payload. [`Unpacker`] walks one or more inputs lazily and yields
//! every payload as a [`RawDocument`]. Unreadable entries are yielded as
//! `Error::ArchiveCorrupt` items and the walk carries on. A `.zip` found in
//! a directory walk is opened as a release package when it holds `.zip`
//! entries; archives nested any deeper are counted and logged, not read.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::ZipArchive;

use crate::parse::detect_namespace;
use splmine_core::{Error, RawDocument, Result};

/// Counters describing what the unpacker has walked so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnpackStats {
    pub outer_archives: usize,
    pub inner_archives: usize,
    pub payloads: usize,
    /// Inner archives holding more than one payload.
    pub ambiguous_payloads: usize,
    pub corrupt_entries: usize,
    /// Archives nested below the inner level, which are not unpacked.
    pub nested_archives_ignored: usize,
}

/// Kind of a top-level input path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Release package (outer zip).
    ReleaseArchive,
    /// Directory of extracted payloads and/or inner zips.
    Directory,
    /// A single `.xml` or `.xml.gz` payload.
    Payload,
}

impl InputKind {
    pub fn detect(path: &Path) -> Option<Self> {
        if path.is_dir() {
            return Some(Self::Directory);
        }
        let name = path.file_name()?.to_str()?;
        if is_zip(name) {
            Some(Self::ReleaseArchive)
        } else if is_payload(name) || is_gz_payload(name) {
            Some(Self::Payload)
        } else {
            None
        }
    }
}

fn has_suffix(name: &str, suffix: &str) -> bool {
    name.len() >= suffix.len()
        && name.is_char_boundary(name.len() - suffix.len())
        && name[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}

fn is_zip(name: &str) -> bool {
    has_suffix(name, ".zip")
}

fn is_payload(name: &str) -> bool {
    has_suffix(name, ".xml")
}

fn is_gz_payload(name: &str) -> bool {
    has_suffix(name, ".xml.gz")
}

fn corrupt(entry: impl Into<String>, reason: impl std::fmt::Display) -> Error {
    Error::ArchiveCorrupt {
        entry: entry.into(),
        reason: reason.to_string(),
    }
}

/// The input currently being walked.
enum Source {
    Archive {
        label: String,
        archive: ZipArchive<BufReader<File>>,
        next: usize,
    },
    Walk {
        walker: walkdir::IntoIter,
    },
}

/// Outcome of advancing the current source by one entry.
enum Step {
    NextInput,
    Exhausted,
    Skip,
    Payload(RawDocument),
    /// A zip found in a release package, or in a directory walk (`top_level`).
    Inner {
        origin: String,
        bytes: Vec<u8>,
        top_level: bool,
    },
    Corrupt(Error),
}

/// Lazy, restartable sequence of document payloads over a list of inputs.
pub struct Unpacker {
    inputs: VecDeque<PathBuf>,
    current: Option<Source>,
    pending: VecDeque<Result<RawDocument>>,
    stats: UnpackStats,
}

impl Unpacker {
    /// Prepare to walk `inputs` in order. Fails if an input does not exist
    /// or is not a recognised kind; nothing is read yet.
    pub fn open<P: AsRef<Path>>(inputs: &[P]) -> Result<Self> {
        let mut queue = VecDeque::new();
        for input in inputs {
            let path = input.as_ref();
            if !path.exists() {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("input not found: {}", path.display()),
                )));
            }
            if InputKind::detect(path).is_none() {
                return Err(Error::Config(format!(
                    "unsupported input {} (expected a .zip, .xml, .xml.gz or directory)",
                    path.display()
                )));
            }
            queue.push_back(path.to_path_buf());
        }
        Ok(Self {
            inputs: queue,
            current: None,
            pending: VecDeque::new(),
            stats: UnpackStats::default(),
        })
    }

    pub fn stats(&self) -> &UnpackStats {
        &self.stats
    }

    /// Start walking the next input. Returns false when none are left.
    fn advance_input(&mut self) -> bool {
        let Some(path) = self.inputs.pop_front() else {
            return false;
        };
        let label = path.display().to_string();

        match InputKind::detect(&path) {
            Some(InputKind::Directory) => {
                info!("Walking payload directory {}", label);
                self.current = Some(Source::Walk {
                    walker: WalkDir::new(&path).sort_by_file_name().into_iter(),
                });
            }
            Some(InputKind::ReleaseArchive) => {
                let opened = File::open(&path)
                    .map_err(|e| corrupt(&label, e))
                    .and_then(|f| ZipArchive::new(BufReader::new(f)).map_err(|e| corrupt(&label, e)));
                match opened {
                    Ok(archive) => {
                        info!("Processing {} ({} entries)", label, archive.len());
                        self.stats.outer_archives += 1;
                        self.current = Some(Source::Archive {
                            label,
                            archive,
                            next: 0,
                        });
                    }
                    Err(e) => self.push_corrupt(e),
                }
            }
            Some(InputKind::Payload) => match read_payload_file(&path) {
                Step::Payload(doc) => self.push_payload(doc),
                Step::Corrupt(e) => self.push_corrupt(e),
                _ => {}
            },
            None => {}
        }
        true
    }

    fn push_payload(&mut self, doc: RawDocument) {
        debug!(
            "Payload {} from {} (namespace {})",
            doc.name,
            doc.origin,
            detect_namespace(&doc.content).unwrap_or_default()
        );
        self.stats.payloads += 1;
        self.pending.push_back(Ok(doc));
    }

    fn push_corrupt(&mut self, err: Error) {
        warn!("{}", err);
        self.stats.corrupt_entries += 1;
        self.pending.push_back(Err(err));
    }

    /// Open one inner archive and queue every payload it holds. A top-level
    /// zip holding other zips is a release package and is unpacked as one.
    fn unpack_inner(&mut self, origin: String, bytes: Vec<u8>, top_level: bool) {
        let mut archive = match ZipArchive::new(Cursor::new(bytes)) {
            Ok(a) => a,
            Err(e) => {
                self.stats.inner_archives += 1;
                self.push_corrupt(corrupt(&origin, e));
                return;
            }
        };

        if top_level && archive.file_names().any(is_zip) {
            info!("Processing {} ({} entries)", origin, archive.len());
            self.stats.outer_archives += 1;
            for i in 0..archive.len() {
                match read_zip_entry(&mut archive, i, &origin) {
                    Step::Payload(doc) => self.push_payload(doc),
                    Step::Inner { origin: inner, bytes, .. } => self.unpack_inner(inner, bytes, false),
                    Step::Corrupt(e) => self.push_corrupt(e),
                    _ => {}
                }
            }
            return;
        }

        self.stats.inner_archives += 1;
        let mut payloads = Vec::new();
        for i in 0..archive.len() {
            match read_zip_entry(&mut archive, i, &origin) {
                Step::Payload(doc) => payloads.push(doc),
                Step::Corrupt(e) => self.push_corrupt(e),
                Step::Inner { origin: nested, .. } => {
                    warn!("Ignoring archive nested too deep: {}", nested);
                    self.stats.nested_archives_ignored += 1;
                }
                _ => {}
            }
        }

        if payloads.len() > 1 {
            warn!(
                "Ambiguous payload: {} holds {} documents, emitting all",
                origin,
                payloads.len()
            );
            self.stats.ambiguous_payloads += 1;
        }
        for doc in payloads {
            self.push_payload(doc);
        }
    }

    /// Advance the current source by one entry.
    fn step(&mut self) -> Step {
        match self.current.as_mut() {
            None => Step::NextInput,
            Some(Source::Archive {
                label,
                archive,
                next,
            }) => {
                if *next >= archive.len() {
                    return Step::Exhausted;
                }
                let index = *next;
                *next += 1;
                read_zip_entry(archive, index, label)
            }
            Some(Source::Walk { walker }) => match walker.next() {
                None => Step::Exhausted,
                Some(Err(e)) => {
                    let entry = e
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "<directory>".to_string());
                    Step::Corrupt(corrupt(entry, e))
                }
                Some(Ok(entry)) => {
                    if !entry.file_type().is_file() {
                        return Step::Skip;
                    }
                    let name = entry.file_name().to_string_lossy();
                    if is_zip(&name) {
                        let label = entry.path().display().to_string();
                        match std::fs::read(entry.path()) {
                            Ok(bytes) => Step::Inner {
                                origin: label,
                                bytes,
                                top_level: true,
                            },
                            Err(e) => Step::Corrupt(corrupt(label, e)),
                        }
                    } else if is_payload(&name) || is_gz_payload(&name) {
                        read_payload_file(entry.path())
                    } else {
                        Step::Skip
                    }
                }
            },
        }
    }
}

impl Iterator for Unpacker {
    type Item = Result<RawDocument>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Some(item);
            }
            match self.step() {
                Step::NextInput => {
                    if !self.advance_input() {
                        return None;
                    }
                }
                Step::Exhausted => self.current = None,
                Step::Skip => {}
                Step::Payload(doc) => self.push_payload(doc),
                Step::Inner {
                    origin,
                    bytes,
                    top_level,
                } => self.unpack_inner(origin, bytes, top_level),
                Step::Corrupt(e) => self.push_corrupt(e),
            }
        }
    }
}

/// Read entry `index` of a zip archive labelled `label`.
fn read_zip_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, index: usize, label: &str) -> Step {
    let mut entry = match archive.by_index(index) {
        Ok(e) => e,
        Err(e) => return Step::Corrupt(corrupt(format!("{}#{}", label, index), e)),
    };
    if entry.is_dir() {
        return Step::Skip;
    }
    let name = entry.name().to_string();
    if !is_zip(&name) && !is_payload(&name) {
        return Step::Skip;
    }

    let mut bytes = Vec::new();
    if let Err(e) = entry.read_to_end(&mut bytes) {
        return Step::Corrupt(corrupt(format!("{}!{}", label, name), e));
    }

    if is_zip(&name) {
        Step::Inner {
            origin: format!("{}!{}", label, name),
            bytes,
            top_level: false,
        }
    } else {
        let file_name = name.rsplit('/').next().unwrap_or(&name).to_string();
        Step::Payload(RawDocument::new(file_name, label, bytes))
    }
}

/// Read a loose `.xml` or `.xml.gz` file.
fn read_payload_file(path: &Path) -> Step {
    let label = path.display().to_string();
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string();

    let mut bytes = Vec::new();
    let read = File::open(path).and_then(|mut f| {
        if is_gz_payload(&name) {
            GzDecoder::new(f).read_to_end(&mut bytes)
        } else {
            f.read_to_end(&mut bytes)
        }
    });
    match read {
        Ok(_) => {
            let name = name.strip_suffix(".gz").unwrap_or(&name).to_string();
            Step::Payload(RawDocument::new(name, label, bytes))
        }
        Err(e) => Step::Corrupt(corrupt(label, e)),
    }
}
