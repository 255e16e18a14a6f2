//! Manifest source backed by a sitemap document.
//!
//! Each `<url>` element contributes one entry: its `<loc>` child is the
//! locator and its `<lastmod>` child the revision. Only direct children in
//! the sitemap namespace (or unqualified ones) count, so extension elements
//! such as `<image:loc>` never leak into a locator. A missing `<lastmod>`
//! yields an empty revision, and a `<url>` without a usable `<loc>` is
//! skipped with a warning.

use docsync_core::{
    manifest_from_entries, Locator, Manifest, ManifestEntry, ManifestSource, RemoteError,
};
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use ureq::Agent;

use crate::http::{read_body, remote_err};

/// Largest sitemap accepted; the sitemap protocol caps files at 50 MiB.
pub const MAX_SITEMAP_BYTES: u64 = 50 * 1024 * 1024;

const SITEMAP_NS: &[u8] = b"http://www.sitemaps.org/schemas/sitemap/0.9";

// Element depths inside a well-formed sitemap.
const URLSET_DEPTH: usize = 1;
const URL_DEPTH: usize = 2;
const FIELD_DEPTH: usize = 3;

pub struct SitemapSource {
    agent: Agent,
    url: String,
    max_bytes: u64,
}

impl SitemapSource {
    pub fn new(agent: Agent, url: &str) -> Self {
        Self {
            agent,
            url: url.to_string(),
            max_bytes: MAX_SITEMAP_BYTES,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }
}

impl ManifestSource for SitemapSource {
    fn fetch(&self) -> Result<Manifest, RemoteError> {
        let response = self
            .agent
            .get(&self.url)
            .call()
            .map_err(|e| remote_err(&self.url, e))?;
        let bytes = read_body(&self.url, response, self.max_bytes)?;
        let payload_err = |message: String| RemoteError::Payload {
            source_name: self.url.clone(),
            message,
        };
        let body = String::from_utf8(bytes).map_err(|e| payload_err(e.to_string()))?;
        let entries = parse(&body).map_err(payload_err)?;
        tracing::debug!(url = %self.url, entries = entries.len(), "sitemap parsed");
        Ok(manifest_from_entries(entries))
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    Loc,
    Lastmod,
}

fn in_sitemap_ns(ns: &ResolveResult) -> bool {
    match ns {
        ResolveResult::Bound(Namespace(uri)) => *uri == SITEMAP_NS,
        ResolveResult::Unbound => true,
        ResolveResult::Unknown(_) => false,
    }
}

fn root_err(name: &[u8]) -> String {
    format!(
        "expected <urlset> root, found <{}>",
        String::from_utf8_lossy(name)
    )
}

/// Parse a sitemap `<urlset>` into manifest entries, in document order.
pub fn parse(xml: &str) -> Result<Vec<ManifestEntry>, String> {
    let mut reader = NsReader::from_str(xml);
    reader.trim_text(true);

    let mut entries = Vec::new();
    let mut seen_root = false;
    let mut depth = 0usize;
    let mut in_url = false;
    let mut field: Option<Field> = None;
    let mut loc = String::new();
    let mut lastmod = String::new();

    loop {
        match reader.read_resolved_event() {
            Ok((ns, Event::Start(e))) => {
                depth += 1;
                let ours = in_sitemap_ns(&ns);
                let name = e.local_name();
                match depth {
                    URLSET_DEPTH => {
                        if !ours || name.as_ref() != b"urlset" {
                            return Err(root_err(name.as_ref()));
                        }
                        seen_root = true;
                    }
                    URL_DEPTH if ours && name.as_ref() == b"url" => {
                        in_url = true;
                        loc.clear();
                        lastmod.clear();
                    }
                    FIELD_DEPTH if in_url && ours => {
                        field = match name.as_ref() {
                            b"loc" => Some(Field::Loc),
                            b"lastmod" => Some(Field::Lastmod),
                            _ => None,
                        };
                    }
                    _ => {}
                }
            }
            Ok((ns, Event::Empty(e))) if depth == 0 => {
                let name = e.local_name();
                if in_sitemap_ns(&ns) && name.as_ref() == b"urlset" {
                    return Ok(entries);
                }
                return Err(root_err(name.as_ref()));
            }
            Ok((_, Event::Text(t))) if depth == FIELD_DEPTH => {
                let text = t.unescape().map_err(|e| e.to_string())?;
                push_text(field, &text, &mut loc, &mut lastmod);
            }
            Ok((_, Event::CData(c))) if depth == FIELD_DEPTH => {
                let raw = c.into_inner();
                push_text(field, &String::from_utf8_lossy(&raw), &mut loc, &mut lastmod);
            }
            Ok((_, Event::End(_))) => {
                match depth {
                    FIELD_DEPTH => field = None,
                    URL_DEPTH if in_url => {
                        in_url = false;
                        let locator = loc.trim();
                        if locator.is_empty() {
                            tracing::warn!("sitemap <url> without <loc>; skipping");
                        } else {
                            entries.push(ManifestEntry {
                                locator: Locator::from(locator),
                                revision: lastmod.trim().to_string(),
                            });
                        }
                    }
                    _ => {}
                }
                depth = depth.saturating_sub(1);
            }
            Ok((_, Event::Eof)) => break,
            Err(e) => return Err(format!("malformed sitemap: {e}")),
            Ok(_) => {}
        }
    }

    if !seen_root {
        return Err("document has no <urlset> element".to_string());
    }
    Ok(entries)
}

fn push_text(field: Option<Field>, text: &str, loc: &mut String, lastmod: &mut String) {
    match field {
        Some(Field::Loc) => loc.push_str(text),
        Some(Field::Lastmod) => lastmod.push_str(text),
        None => {}
    }
}
