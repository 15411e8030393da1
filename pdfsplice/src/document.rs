//! The in-memory document.
//!
//! A parsed [`Document`] keeps the source bytes and an index from object id
//! to location; objects are parsed on first access and cached. Documents
//! built by merge or split hold every object resident. Either way the page
//! sequence is resolved once, when the document is created.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use log::debug;

use crate::cancel::Cancellation;
use crate::config::Limits;
use crate::error::{PdfSpliceError, Result};
use crate::object::{Dictionary, Object, ObjectId};
use crate::pages::{self, PageRef, PageTree};
use crate::parser::lexer::Lexer;
use crate::parser::objstm::parse_object_stream;

/// Reference chains longer than this are treated as broken.
const MAX_REFERENCE_HOPS: usize = 32;

/// Where an indexed object lives in the source bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Location {
    /// Byte offset of the `N G obj` header.
    Offset(usize),
    /// Member `index` of the object stream `container 0 R`.
    Compressed { container: u32, index: u32 },
}

#[derive(Debug, Clone)]
pub(crate) enum Slot {
    Resident(Object),
    Lazy {
        location: Location,
        cell: OnceLock<Object>,
    },
}

impl Slot {
    pub(crate) fn lazy(location: Location) -> Self {
        Slot::Lazy {
            location,
            cell: OnceLock::new(),
        }
    }
}

/// Everything the parser hands over to build a [`Document`].
pub(crate) struct DocumentParts {
    pub version: String,
    pub trailer: Dictionary,
    pub slots: BTreeMap<ObjectId, Slot>,
    pub source: Option<Arc<[u8]>>,
    pub tolerant: bool,
    pub repaired: bool,
}

/// A PDF document: object table, trailer and resolved page sequence.
///
/// Documents are immutable once created and are `Send + Sync`, so they can
/// be loaded on worker threads and shared freely.
#[derive(Debug, Clone)]
pub struct Document {
    version: String,
    trailer: Dictionary,
    slots: BTreeMap<ObjectId, Slot>,
    source: Option<Arc<[u8]>>,
    page_tree: PageTree,
    tolerant: bool,
    repaired: bool,
    max_decoded_bytes: usize,
}

impl Document {
    /// Assemble a document and resolve its page tree.
    pub(crate) fn from_parts(
        parts: DocumentParts,
        limits: &Limits,
        cancel: &Cancellation,
    ) -> Result<Self> {
        let mut doc = Document {
            version: parts.version,
            trailer: parts.trailer,
            slots: parts.slots,
            source: parts.source,
            page_tree: PageTree::default(),
            tolerant: parts.tolerant,
            repaired: parts.repaired,
            max_decoded_bytes: limits.max_input_bytes,
        };
        let root = doc.pages_root()?;
        doc.page_tree = pages::walk(&doc, root, limits, cancel)?;
        debug!(
            "Resolved {} page(s) from {} page tree node(s)",
            doc.page_tree.pages.len(),
            doc.page_tree.nodes.len()
        );
        Ok(doc)
    }

    /// Build a document from resident objects.
    ///
    /// The trailer must name the catalog under `/Root`. The page tree is
    /// validated exactly as for a parsed document.
    ///
    /// # Errors
    ///
    /// Fails with the page-tree errors ([`PdfSpliceError::CyclicPageTree`],
    /// [`PdfSpliceError::EmptyDocument`], [`PdfSpliceError::MissingObject`]).
    pub fn from_objects(
        version: impl Into<String>,
        objects: BTreeMap<ObjectId, Object>,
        trailer: Dictionary,
    ) -> Result<Self> {
        let slots = objects
            .into_iter()
            .map(|(id, object)| (id, Slot::Resident(object)))
            .collect();
        Self::from_parts(
            DocumentParts {
                version: version.into(),
                trailer,
                slots,
                source: None,
                tolerant: false,
                repaired: false,
            },
            &Limits::unlimited(),
            &Cancellation::new(),
        )
    }

    /// Allow dangling references to be copied as `null` from this document.
    pub fn with_tolerance(mut self, tolerant: bool) -> Self {
        self.tolerant = tolerant;
        self
    }

    /// PDF version from the header, e.g. `"1.7"`.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The trailer dictionary.
    pub fn trailer(&self) -> &Dictionary {
        &self.trailer
    }

    /// Whether the object index had to be rebuilt by scanning the file.
    pub fn was_repaired(&self) -> bool {
        self.repaired
    }

    /// Whether dangling references are tolerated when copying from this document.
    pub fn is_tolerant(&self) -> bool {
        self.tolerant
    }

    /// Whether `id` is present in the object table.
    pub fn contains(&self, id: ObjectId) -> bool {
        self.slots.contains_key(&id)
    }

    /// Number of indexed objects.
    pub fn object_count(&self) -> usize {
        self.slots.len()
    }

    /// Largest object number in use, or 0 for an empty table.
    pub fn max_object_number(&self) -> u32 {
        self.slots.keys().next_back().map_or(0, |id| id.0)
    }

    /// All indexed object ids in ascending order.
    pub fn object_ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.slots.keys().copied()
    }

    /// Fetch an object, parsing it on first access.
    ///
    /// # Errors
    ///
    /// [`PdfSpliceError::MissingObject`] if `id` is not indexed, or the
    /// input error raised while parsing the object.
    pub fn get(&self, id: ObjectId) -> Result<&Object> {
        match self.slots.get(&id) {
            None => Err(PdfSpliceError::MissingObject { id }),
            Some(Slot::Resident(object)) => Ok(object),
            Some(Slot::Lazy { location, cell }) => {
                if let Some(object) = cell.get() {
                    return Ok(object);
                }
                let object = self.load(id, *location)?;
                Ok(cell.get_or_init(|| object))
            }
        }
    }

    /// Follow references until a direct object is reached.
    pub fn resolve<'a>(&'a self, object: &'a Object) -> Result<&'a Object> {
        let mut current = object;
        for _ in 0..MAX_REFERENCE_HOPS {
            match current {
                Object::Reference(id) => current = self.get(*id)?,
                direct => return Ok(direct),
            }
        }
        Err(PdfSpliceError::malformed(
            0,
            format!("reference chain longer than {MAX_REFERENCE_HOPS} hops"),
        ))
    }

    /// Look up `key` in `dict`, resolving an indirect value.
    pub fn resolve_key<'a>(&'a self, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
        dict.get(key).and_then(|value| self.resolve(value).ok())
    }

    /// The document catalog (`/Root`).
    pub fn catalog(&self) -> Result<&Dictionary> {
        let root = self
            .trailer
            .get(b"Root")
            .ok_or_else(|| PdfSpliceError::malformed(0, "trailer has no /Root entry"))?;
        self.resolve(root)?
            .as_dict()
            .ok_or_else(|| PdfSpliceError::malformed(0, "/Root is not a dictionary"))
    }

    /// Id of the page tree root named by the catalog.
    pub(crate) fn pages_root(&self) -> Result<ObjectId> {
        self.catalog()?
            .get(b"Pages")
            .and_then(Object::as_reference)
            .ok_or_else(|| {
                PdfSpliceError::malformed(0, "catalog has no indirect /Pages entry")
            })
    }

    /// The document information dictionary, if the trailer names one.
    pub fn info(&self) -> Option<&Dictionary> {
        self.resolve_key(&self.trailer, b"Info")
            .and_then(Object::as_dict)
    }

    /// Pages in document order.
    pub fn pages(&self) -> &[PageRef] {
        &self.page_tree.pages
    }

    /// Page object ids in document order.
    pub fn page_ids(&self) -> Vec<ObjectId> {
        self.page_tree.pages.iter().map(|page| page.id).collect()
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.page_tree.pages.len()
    }

    pub(crate) fn page_tree(&self) -> &PageTree {
        &self.page_tree
    }

    /// Raw (still encoded) content stream bytes of the page at `index`,
    /// concatenated in order when `/Contents` is an array.
    pub fn page_contents(&self, index: usize) -> Result<Vec<u8>> {
        let page = self
            .page_tree
            .pages
            .get(index)
            .ok_or(PdfSpliceError::RangeOutOfBounds {
                start: index + 1,
                end: index + 1,
                total: self.page_count(),
            })?;
        let dict = self
            .get(page.id)?
            .as_dict()
            .ok_or_else(|| PdfSpliceError::malformed(0, "page is not a dictionary"))?;

        let mut bytes = Vec::new();
        let Some(contents) = dict.get(b"Contents") else {
            return Ok(bytes);
        };
        let parts = match self.resolve(contents)? {
            Object::Array(items) => items.iter().collect(),
            single => vec![single],
        };
        for part in parts {
            if let Some(stream) = self.resolve(part)?.as_stream() {
                bytes.extend_from_slice(&stream.content);
            }
        }
        Ok(bytes)
    }

    fn load(&self, id: ObjectId, location: Location) -> Result<Object> {
        match location {
            Location::Offset(offset) => self.load_at(id, offset),
            Location::Compressed { container, index } => {
                self.load_compressed(id, container, index)
            }
        }
    }

    fn load_at(&self, id: ObjectId, offset: usize) -> Result<Object> {
        let bytes = self
            .source
            .as_deref()
            .ok_or(PdfSpliceError::MissingObject { id })?;
        let mut lexer = Lexer::new(bytes, offset);
        let (found, object) =
            lexer.read_indirect_object(&|length_id| self.direct_length(length_id, id))?;
        if found.0 != id.0 {
            return Err(PdfSpliceError::malformed(
                offset,
                format!(
                    "expected object {} {} but found {} {}",
                    id.0, id.1, found.0, found.1
                ),
            ));
        }
        Ok(object)
    }

    /// Opening an object stream materializes every member that the index
    /// attributes to it, not only the one requested.
    fn load_compressed(&self, id: ObjectId, container: u32, index: u32) -> Result<Object> {
        let container_id = (container, 0);
        if let Some(Slot::Lazy {
            location: Location::Compressed { .. },
            ..
        }) = self.slots.get(&container_id)
        {
            return Err(PdfSpliceError::malformed(
                0,
                format!("object stream {container} is itself compressed"),
            ));
        }
        let stream = self
            .get(container_id)?
            .as_stream()
            .ok_or_else(|| {
                PdfSpliceError::malformed(0, format!("object {container} is not a stream"))
            })?;

        let mut members = parse_object_stream(stream, self.max_decoded_bytes)?;
        let position = match members.get(index as usize) {
            Some((number, _)) if *number == id.0 => Some(index as usize),
            _ => members.iter().position(|(number, _)| *number == id.0),
        };
        let requested = position.map(|position| members.swap_remove(position).1);

        for (number, member) in members {
            let Ok(object) = member else { continue };
            if let Some(Slot::Lazy {
                location: Location::Compressed { container: owner, .. },
                cell,
            }) = self.slots.get(&(number, 0))
            {
                if *owner == container {
                    let _ = cell.set(object);
                }
            }
        }

        requested.unwrap_or(Err(PdfSpliceError::MissingObject { id }))
    }

    /// Resolve an indirect `/Length` without going through the object cache,
    /// so a stream whose length refers back to itself cannot recurse.
    fn direct_length(&self, length_id: ObjectId, loading: ObjectId) -> Option<usize> {
        if length_id == loading {
            return None;
        }
        let value = match self.slots.get(&length_id)? {
            Slot::Resident(object) => object.as_i64(),
            Slot::Lazy { cell, location } => match (cell.get(), location) {
                (Some(object), _) => object.as_i64(),
                (None, Location::Offset(offset)) => {
                    let bytes = self.source.as_deref()?;
                    let mut lexer = Lexer::new(bytes, *offset);
                    lexer.read_object_header()?;
                    lexer.read_object().ok()?.as_i64()
                }
                (None, Location::Compressed { .. }) => None,
            },
        };
        value.and_then(|length| usize::try_from(length).ok())
    }
}
