//! Index reconstruction for files whose cross-reference data is unusable.
//!
//! The whole file is scanned front to back for `N G obj` headers and
//! `trailer` dictionaries. A later definition of the same id replaces an
//! earlier one, matching how incremental updates append to a file.

use std::collections::BTreeMap;

use log::{debug, warn};

use crate::document::Slot;
use crate::error::{PdfSpliceError, Result};
use crate::object::{Dictionary, Object, ObjectId};

use super::lexer::{Lexer, is_regular};
use super::objstm::parse_object_stream;

/// Objects and trailer recovered by a scan.
pub(crate) struct Recovered {
    pub slots: BTreeMap<ObjectId, Slot>,
    pub trailer: Dictionary,
}

/// Scan `bytes` for every indirect object and trailer. Object streams
/// found on the way may decode to at most `max_decoded` bytes each.
pub(crate) fn rebuild_index(bytes: &[u8], max_decoded: usize) -> Result<Recovered> {
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();
    let mut trailer = Dictionary::new();
    let mut containers = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let starts_token = pos == 0 || !is_regular(bytes[pos - 1]);
        if !starts_token {
            pos += 1;
            continue;
        }

        match bytes[pos] {
            b'0'..=b'9' => {
                let mut lexer = Lexer::new(bytes, pos);
                if lexer.read_object_header().is_none() {
                    pos += 1;
                    continue;
                }
                let mut lexer = Lexer::new(bytes, pos);
                match lexer.read_indirect_object(&|_| None) {
                    Ok((id, object)) => {
                        if let Some(dict) = object.as_dict() {
                            if dict.has_type(b"ObjStm") {
                                containers.push(id);
                            } else if dict.has_type(b"XRef") {
                                absorb_trailer(&mut trailer, dict);
                            }
                        }
                        objects.insert(id, object);
                        pos = lexer.pos().max(pos + 1);
                    }
                    Err(err) => {
                        debug!("Skipping unreadable object at {pos}: {err}");
                        pos += 1;
                    }
                }
            }
            b't' if bytes[pos..].starts_with(b"trailer") => {
                let mut lexer = Lexer::new(bytes, pos + b"trailer".len());
                match lexer.read_object() {
                    Ok(Object::Dictionary(dict)) => {
                        absorb_trailer(&mut trailer, &dict);
                        pos = lexer.pos();
                    }
                    _ => pos += 1,
                }
            }
            _ => pos += 1,
        }
    }

    if objects.is_empty() {
        return Err(PdfSpliceError::malformed(0, "no indirect objects found while scanning"));
    }

    let direct_count = objects.len();
    for container in containers {
        let Some(Object::Stream(stream)) = objects.get(&container) else {
            continue;
        };
        match parse_object_stream(stream, max_decoded) {
            Ok(members) => {
                let found: Vec<(ObjectId, Object)> = members
                    .into_iter()
                    .filter_map(|(number, member)| member.ok().map(|object| ((number, 0), object)))
                    .collect();
                for (id, object) in found {
                    objects.entry(id).or_insert(object);
                }
            }
            Err(err) => warn!(
                "Object stream {} {} is unreadable: {err}",
                container.0, container.1
            ),
        }
    }

    if !root_is_catalog(&trailer, &objects) {
        let catalog = objects
            .iter()
            .rev()
            .find(|(_, object)| {
                object
                    .as_dict()
                    .is_some_and(|dict| dict.has_type(b"Catalog") && dict.has(b"Pages"))
            })
            .map(|(id, _)| *id)
            .ok_or_else(|| PdfSpliceError::malformed(0, "no document catalog found while scanning"))?;
        trailer.set("Root", catalog);
    }

    debug!(
        "Scan recovered {} object(s) ({} from object streams)",
        objects.len(),
        objects.len() - direct_count
    );

    let slots = objects
        .into_iter()
        .map(|(id, object)| (id, Slot::Resident(object)))
        .collect();
    Ok(Recovered { slots, trailer })
}

/// Later trailers override earlier ones key by key. Keys that only make
/// sense for the broken cross-reference data are dropped.
fn absorb_trailer(trailer: &mut Dictionary, found: &Dictionary) {
    for (key, value) in found.iter() {
        if matches!(
            key.as_slice(),
            b"Root" | b"Info" | b"ID" | b"Encrypt" | b"Size"
        ) {
            trailer.set(key.clone(), value.clone());
        }
    }
}

fn root_is_catalog(trailer: &Dictionary, objects: &BTreeMap<ObjectId, Object>) -> bool {
    trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .and_then(|id| objects.get(&id))
        .and_then(Object::as_dict)
        .is_some_and(|dict| dict.has(b"Pages"))
}
