//! Media RSS image hints that `feed-rs` does not model.
//!
//! `feed-rs` keeps a `media:content` element's MIME `type` but drops its
//! `medium` attribute, so `<media:content url="..." medium="image"/>` (common
//! in WordPress feeds) would otherwise be invisible to the image extractor.
//! This module does one streaming pass over the raw document with `quick-xml`
//! and records, per entry, the first image-like `media:content` URL.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// For each `<item>`/`<entry>` in document order, the URL of its first
/// `media:content` whose `medium` or `type` mentions `image`.
///
/// Indexes line up with `feed_rs::model::Feed::entries`. Documents that are
/// not XML (JSON Feed) yield an empty list.
pub fn image_media_by_entry(bytes: &[u8]) -> Vec<Option<String>> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut found: Vec<Option<String>> = Vec::new();
    let mut buf = Vec::new();
    let mut entry_depth: usize = 0;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if is_entry(&e) => {
                if entry_depth == 0 {
                    found.push(None);
                }
                entry_depth += 1;
            }
            Ok(Event::Empty(e)) if entry_depth == 0 && is_entry(&e) => {
                found.push(None);
            }
            Ok(Event::End(e)) if matches!(e.local_name().as_ref(), b"item" | b"entry") => {
                entry_depth = entry_depth.saturating_sub(1);
            }
            Ok(Event::Start(e) | Event::Empty(e))
                if entry_depth > 0 && e.local_name().as_ref() == b"content" =>
            {
                if let Some(slot) = found.last_mut() {
                    if slot.is_none() {
                        *slot = image_url(&e, &reader);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                tracing::debug!(error = %e, "Media scan stopped early");
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    found
}

fn is_entry(e: &BytesStart<'_>) -> bool {
    matches!(e.local_name().as_ref(), b"item" | b"entry")
}

fn image_url(e: &BytesStart<'_>, reader: &Reader<&[u8]>) -> Option<String> {
    let mut url = None;
    let mut is_image = false;

    for attr in e.attributes().flatten() {
        let Ok(value) = attr.decode_and_unescape_value(reader.decoder()) else {
            continue;
        };
        match attr.key.local_name().as_ref() {
            b"url" => url = Some(value.trim().to_owned()),
            b"medium" | b"type" => is_image |= value.to_ascii_lowercase().contains("image"),
            _ => {}
        }
    }

    url.filter(|u| is_image && !u.is_empty())
}
