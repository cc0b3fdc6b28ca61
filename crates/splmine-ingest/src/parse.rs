//! SPL document parsing.
//!
//! Streams one payload through a namespace-aware pull parser and pulls out
//! the label identity (root-level `<id>`, `<setId>`, `<versionNumber>`) and
//! the text of every coded `<section>`.

use std::collections::HashSet;

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;

use splmine_core::{Error, LabelIdentity, RawDocument, Result};

/// Text of one coded section.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionText {
    pub code: String,
    pub display_name: Option<String>,
    /// Descendant text nodes joined by single spaces, not yet normalized.
    pub text: String,
}

/// Everything the parser pulls out of one document.
#[derive(Debug, Clone)]
pub struct ParsedLabel {
    pub identity: LabelIdentity,
    /// Namespace URI of the root element, if any.
    pub namespace: Option<String>,
    /// Selected sections, ordered by start position.
    pub sections: Vec<SectionText>,
}

/// Which coded sections the parser reports.
#[derive(Debug, Clone)]
enum SectionFilter {
    Codes(HashSet<String>),
    All,
}

impl SectionFilter {
    fn accepts(&self, code: &str) -> bool {
        match self {
            Self::Codes(codes) => codes.contains(code),
            Self::All => true,
        }
    }
}

/// Raw result of one pass over a document, before identity checks.
#[derive(Debug, Clone)]
pub struct DocumentScan {
    pub source_name: String,
    pub namespace: Option<String>,
    pub document_id: Option<String>,
    pub set_id: Option<String>,
    /// `None` when no `<versionNumber>` was seen, `Some(None)` when it had
    /// no usable `value`.
    pub version: Option<Option<String>>,
    pub sections: Vec<SectionText>,
}

impl DocumentScan {
    /// Require the identity fields, turning the scan into a label.
    pub fn into_label(self) -> Result<ParsedLabel> {
        let document_id = self.document_id.ok_or_else(|| Error::MissingIdentity {
            source_name: self.source_name.clone(),
            field: "id",
        })?;
        let set_id = self.set_id.ok_or_else(|| Error::MissingIdentity {
            source_name: self.source_name.clone(),
            field: "setId",
        })?;
        let version_number = parse_version(self.version, &self.source_name)?;
        Ok(ParsedLabel {
            identity: LabelIdentity {
                document_id,
                set_id,
                version_number,
            },
            namespace: self.namespace,
            sections: self.sections,
        })
    }
}

/// A `<section>` that has been opened but not yet closed.
struct OpenSection {
    /// Element depth of the `<section>` tag (root = 1).
    depth: usize,
    order: usize,
    code: Option<String>,
    display_name: Option<String>,
    pieces: Vec<String>,
}

impl OpenSection {
    fn wants_text(&self, filter: &SectionFilter) -> bool {
        self.code.as_deref().map_or(true, |c| filter.accepts(c))
    }
}

#[derive(Debug, Clone)]
pub struct DocumentParser {
    filter: SectionFilter,
}

impl DocumentParser {
    /// Report sections whose code is one of `codes`.
    pub fn new<S: AsRef<str>>(codes: &[S]) -> Self {
        Self {
            filter: SectionFilter::Codes(codes.iter().map(|c| c.as_ref().to_string()).collect()),
        }
    }

    /// Report every coded section.
    pub fn all_sections() -> Self {
        Self {
            filter: SectionFilter::All,
        }
    }

    /// Parse a label. Fails on malformed markup or missing identity.
    pub fn parse(&self, doc: &RawDocument) -> Result<ParsedLabel> {
        self.scan(doc)?.into_label()
    }

    /// Walk the document once. Only malformed markup is an error here.
    pub fn scan(&self, doc: &RawDocument) -> Result<DocumentScan> {
        let source_name = doc.source_name();
        let malformed = |reason: String| Error::MalformedDocument {
            source_name: source_name.clone(),
            reason,
        };

        let mut reader = NsReader::from_reader(&doc.content[..]);
        reader.config_mut().trim_text(true);
        let mut buf = Vec::new();

        let mut depth = 0usize;
        let mut root_seen = false;
        let mut root_ns: Option<Vec<u8>> = None;
        let mut document_id: Option<String> = None;
        let mut set_id: Option<String> = None;
        let mut version: Option<Option<String>> = None;

        let mut open: Vec<OpenSection> = Vec::new();
        let mut done: Vec<(usize, SectionText)> = Vec::new();
        let mut next_order = 0usize;

        loop {
            buf.clear();
            let (ns, event) = reader
                .read_resolved_event_into(&mut buf)
                .map_err(|e| malformed(e.to_string()))?;

            match event {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    let is_empty = matches!(event, Event::Empty(_));
                    if depth == 0 {
                        if root_seen {
                            return Err(malformed("multiple root elements".into()));
                        }
                        root_seen = true;
                        root_ns = match &ns {
                            ResolveResult::Bound(Namespace(uri)) => Some(uri.to_vec()),
                            _ => None,
                        };
                    }

                    let in_root_ns = match &ns {
                        ResolveResult::Bound(Namespace(uri)) => root_ns.as_deref() == Some(*uri),
                        ResolveResult::Unbound => root_ns.is_none(),
                        ResolveResult::Unknown(_) => false,
                    };

                    if in_root_ns {
                        let local = e.local_name();
                        match local.as_ref() {
                            b"id" if depth == 1 && document_id.is_none() => {
                                document_id = attribute(e, "root");
                            }
                            b"setId" if depth == 1 && set_id.is_none() => {
                                set_id = attribute(e, "root");
                            }
                            b"versionNumber" if depth == 1 && version.is_none() => {
                                version = Some(attribute(e, "value"));
                            }
                            b"code" => {
                                if let Some(section) = open.last_mut() {
                                    if section.depth == depth && section.code.is_none() {
                                        section.code = attribute(e, "code");
                                        section.display_name = attribute(e, "displayName");
                                    }
                                }
                            }
                            b"section" if !is_empty => {
                                open.push(OpenSection {
                                    depth: depth + 1,
                                    order: next_order,
                                    code: None,
                                    display_name: None,
                                    pieces: Vec::new(),
                                });
                                next_order += 1;
                            }
                            _ => {}
                        }
                    }

                    if !is_empty {
                        depth += 1;
                    }
                }
                Event::End(_) => {
                    if depth == 0 {
                        return Err(malformed("unbalanced end tag".into()));
                    }
                    if open.last().is_some_and(|s| s.depth == depth) {
                        if let Some(section) = open.pop() {
                            if let Some(code) = section.code {
                                if self.filter.accepts(&code) {
                                    done.push((
                                        section.order,
                                        SectionText {
                                            code,
                                            display_name: section.display_name,
                                            text: section.pieces.join(" "),
                                        },
                                    ));
                                }
                            }
                        }
                    }
                    depth -= 1;
                }
                Event::Text(ref t) => {
                    let text = t.unescape().map_err(|e| malformed(e.to_string()))?;
                    if depth == 0 {
                        return Err(malformed("text outside the root element".into()));
                    }
                    self.push_text(&mut open, &text);
                }
                Event::CData(ref c) => {
                    let text = std::str::from_utf8(c).map_err(|e| malformed(e.to_string()))?;
                    if depth == 0 {
                        return Err(malformed("text outside the root element".into()));
                    }
                    self.push_text(&mut open, text);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !root_seen {
            return Err(malformed("no root element".into()));
        }
        if depth != 0 {
            return Err(malformed(format!("{} unclosed element(s) at end of input", depth)));
        }

        done.sort_by_key(|(order, _)| *order);
        Ok(DocumentScan {
            namespace: root_ns.map(|uri| String::from_utf8_lossy(&uri).into_owned()),
            document_id,
            set_id,
            version,
            sections: done.into_iter().map(|(_, s)| s).collect(),
            source_name,
        })
    }

    /// Append a text node to every open section that may still be reported.
    fn push_text(&self, open: &mut [OpenSection], text: &str) {
        if text.is_empty() {
            return;
        }
        for section in open.iter_mut() {
            if section.wants_text(&self.filter) {
                section.pieces.push(text.to_string());
            }
        }
    }
}

/// Trimmed, unescaped attribute value. Empty values count as absent.
fn attribute(e: &BytesStart<'_>, key: &str) -> Option<String> {
    let attr = e.try_get_attribute(key).ok().flatten()?;
    let value = attr.unescape_value().ok()?;
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_version(version: Option<Option<String>>, source_name: &str) -> Result<u32> {
    let missing = |reason: String| Error::MissingVersion {
        source_name: source_name.to_string(),
        reason,
    };
    match version {
        None => Err(missing("no <versionNumber> element".into())),
        Some(None) => Err(missing("<versionNumber> has no value".into())),
        Some(Some(raw)) => match raw.parse::<u32>() {
            Ok(v) if v > 0 => Ok(v),
            _ => Err(missing(format!("invalid versionNumber {:?}", raw))),
        },
    }
}

/// Namespace URI of the root element, if the payload has one.
pub fn detect_namespace(content: &[u8]) -> Option<String> {
    let mut reader = NsReader::from_reader(content);
    let mut buf = Vec::new();
    loop {
        match reader.read_resolved_event_into(&mut buf) {
            Ok((ResolveResult::Bound(Namespace(uri)), Event::Start(_) | Event::Empty(_))) => {
                return Some(String::from_utf8_lossy(uri).into_owned());
            }
            Ok((_, Event::Start(_) | Event::Empty(_))) | Ok((_, Event::Eof)) | Err(_) => return None,
            _ => {}
        }
        buf.clear();
    }
}
