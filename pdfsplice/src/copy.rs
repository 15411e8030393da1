//! Renumbering deep copy of pages into a new document.
//!
//! Merge and split both build their output through [`DocumentBuilder`].
//! Copying a set of pages is done in two passes over the source:
//!
//! 1. **Collect**: breadth-first from the selected pages, every reachable
//!    object gets a fresh id from the output's [`IdAllocator`].
//! 2. **Rewrite**: each collected object is cloned with its references
//!    mapped to the new ids.
//!
//! References that must not be followed become `null`: the source page
//! tree nodes, pages that were not selected, and (in tolerant mode)
//! objects missing from the source.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use log::{debug, warn};

use crate::cancel::Cancellation;
use crate::config::Limits;
use crate::document::Document;
use crate::error::{PdfSpliceError, Result};
use crate::object::{Dictionary, Object, ObjectId};

/// Hands out consecutive object numbers, starting at 1, generation 0.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: u32,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl IdAllocator {
    /// A fresh allocator.
    pub fn new() -> Self {
        Self::default()
    }

    /// The next unused id.
    pub fn allocate(&mut self) -> ObjectId {
        let id = (self.next, 0);
        self.next += 1;
        id
    }

    /// Number of ids handed out so far.
    pub fn allocated(&self) -> usize {
        (self.next - 1) as usize
    }
}

/// Counters reported after a copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStats {
    /// Pages appended.
    pub pages: usize,
    /// Objects copied, pages included.
    pub objects: usize,
    /// References rewritten to `null` because their target was missing.
    pub dangling: usize,
}

/// Accumulates pages from one or more sources into a new document.
pub(crate) struct DocumentBuilder<'a> {
    alloc: IdAllocator,
    objects: BTreeMap<ObjectId, Object>,
    catalog_id: ObjectId,
    pages_id: ObjectId,
    kids: Vec<ObjectId>,
    limits: &'a Limits,
    cancel: &'a Cancellation,
    version: String,
    stats: CopyStats,
}

impl<'a> DocumentBuilder<'a> {
    pub(crate) fn new(limits: &'a Limits, cancel: &'a Cancellation) -> Self {
        let mut alloc = IdAllocator::new();
        let catalog_id = alloc.allocate();
        let pages_id = alloc.allocate();
        Self {
            alloc,
            objects: BTreeMap::new(),
            catalog_id,
            pages_id,
            kids: Vec::new(),
            limits,
            cancel,
            version: "1.4".to_string(),
            stats: CopyStats::default(),
        }
    }

    pub(crate) fn page_count(&self) -> usize {
        self.kids.len()
    }

    pub(crate) fn stats(&self) -> CopyStats {
        self.stats
    }

    /// Raise the output version to `version` if it is newer.
    fn raise_version(&mut self, version: &str) {
        if version_key(version) > version_key(&self.version) {
            self.version = version.to_string();
        }
    }

    fn allocate(&mut self) -> Result<ObjectId> {
        // The catalog, the page root and the Info object come on top.
        let requested = self.alloc.allocated() + 2;
        if requested > self.limits.max_objects {
            return Err(PdfSpliceError::PageLimitExceeded {
                what: "objects",
                limit: self.limits.max_objects,
                requested,
            });
        }
        Ok(self.alloc.allocate())
    }

    /// Copy the pages at the zero-based `indices` of `source`, in that order.
    ///
    /// The same page may be selected more than once; each occurrence
    /// becomes an independent copy.
    pub(crate) fn append_pages(&mut self, source: &Document, indices: &[usize]) -> Result<()> {
        let requested = self.kids.len() + indices.len();
        if requested > self.limits.max_pages {
            return Err(PdfSpliceError::PageLimitExceeded {
                what: "pages",
                limit: self.limits.max_pages,
                requested,
            });
        }
        self.raise_version(source.version());

        // Repeated selections are copied as separate batches so each gets
        // its own object graph.
        let mut batch: Vec<usize> = Vec::new();
        let mut in_batch: HashSet<usize> = HashSet::new();
        for &index in indices {
            if !in_batch.insert(index) {
                self.copy_batch(source, &batch)?;
                batch.clear();
                in_batch.clear();
                in_batch.insert(index);
            }
            batch.push(index);
        }
        if !batch.is_empty() {
            self.copy_batch(source, &batch)?;
        }
        Ok(())
    }

    fn copy_batch(&mut self, source: &Document, indices: &[usize]) -> Result<()> {
        let all_pages = source.pages();
        let mut selected: Vec<(ObjectId, &Dictionary)> = Vec::with_capacity(indices.len());
        for &index in indices {
            let page = all_pages.get(index).ok_or(PdfSpliceError::RangeOutOfBounds {
                start: index + 1,
                end: index + 1,
                total: all_pages.len(),
            })?;
            selected.push((page.id, &page.inherited));
        }

        let tree = source.page_tree();
        let inherited_by_page: HashMap<ObjectId, &Dictionary> =
            selected.iter().copied().collect();
        let tolerant = source.is_tolerant();

        // Pass 1: collect and renumber.
        let mut map: HashMap<ObjectId, ObjectId> = HashMap::new();
        let mut order: Vec<ObjectId> = Vec::new();
        let mut queue: VecDeque<ObjectId> = VecDeque::new();
        for (id, _) in &selected {
            let new_id = self.allocate()?;
            map.insert(*id, new_id);
            order.push(*id);
            queue.push_back(*id);
        }

        let mut dangling = 0usize;
        while let Some(id) = queue.pop_front() {
            self.cancel.check()?;
            let object = match source.get(id) {
                Ok(object) => object,
                Err(err) if tolerant => {
                    warn!("Object {} {} is unreadable, copying as null: {err}", id.0, id.1);
                    continue;
                }
                Err(err) => return Err(err),
            };

            let mut targets = Vec::new();
            let inherited = inherited_by_page.get(&id);
            collect_references(object, inherited.is_some(), &mut targets);
            if let Some(inherited) = inherited {
                inherited.for_each_reference(&mut |target| targets.push(target));
            }

            for target in targets {
                if map.contains_key(&target)
                    || tree.nodes.contains(&target)
                    || (tree.leaves.contains(&target) && !inherited_by_page.contains_key(&target))
                {
                    continue;
                }
                if !source.contains(target) {
                    if tolerant {
                        dangling += 1;
                        continue;
                    }
                    return Err(PdfSpliceError::MissingObject { id: target });
                }
                if is_structural_stream(source, target) {
                    continue;
                }
                let new_id = self.allocate()?;
                map.insert(target, new_id);
                order.push(target);
                queue.push_back(target);
            }
        }

        // Pass 2: clone with references rewritten.
        let pages_id = self.pages_id;
        for old_id in &order {
            self.cancel.check()?;
            let new_id = map[old_id];
            let mut object = source.get(*old_id).cloned().unwrap_or(Object::Null);
            object.rewrite_references(&mut |target| {
                map.get(&target)
                    .map_or(Object::Null, |mapped| Object::Reference(*mapped))
            });

            if let Object::Stream(stream) = &mut object {
                stream.dict.set("Length", stream.content.len());
            }

            if let Some(inherited) = inherited_by_page.get(old_id) {
                if let Some(dict) = object.as_dict_mut() {
                    dict.set("Type", "Page");
                    dict.set("Parent", pages_id);
                    for (key, value) in inherited.iter() {
                        if !dict.has(key) {
                            let mut value = value.clone();
                            value.rewrite_references(&mut |target| {
                                map.get(&target)
                                    .map_or(Object::Null, |mapped| Object::Reference(*mapped))
                            });
                            dict.set(key.clone(), value);
                        }
                    }
                }
            }

            self.objects.insert(new_id, object);
        }

        for (id, _) in &selected {
            self.kids.push(map[id]);
        }

        if dangling > 0 {
            warn!("Rewrote {dangling} dangling reference(s) to null");
        }
        self.stats.pages += selected.len();
        self.stats.objects += order.len();
        self.stats.dangling += dangling;
        debug!(
            "Copied {} page(s) as {} object(s)",
            selected.len(),
            order.len()
        );
        Ok(())
    }

    /// Write the page root, the catalog and the optional Info dictionary,
    /// and turn the collected objects into a document.
    pub(crate) fn finish(mut self, info: Option<Dictionary>) -> Result<Document> {
        if self.kids.is_empty() {
            return Err(PdfSpliceError::EmptyDocument);
        }

        let pages = Dictionary::from_iter([
            (b"Type".to_vec(), Object::name("Pages")),
            (
                b"Kids".to_vec(),
                Object::Array(self.kids.iter().map(|id| Object::Reference(*id)).collect()),
            ),
            (b"Count".to_vec(), Object::from(self.kids.len())),
        ]);
        self.objects.insert(self.pages_id, Object::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.set("Type", "Catalog");
        catalog.set("Pages", self.pages_id);
        self.objects.insert(self.catalog_id, Object::Dictionary(catalog));

        let mut trailer = Dictionary::new();
        trailer.set("Root", self.catalog_id);
        if let Some(info) = info.filter(|info| !info.is_empty()) {
            let info_id = self.alloc.allocate();
            self.objects.insert(info_id, Object::Dictionary(info));
            trailer.set("Info", info_id);
        }

        Document::from_objects(self.version, self.objects, trailer)
    }
}

/// References held by `object`, skipping ones the copy sets itself: a
/// page's `/Parent` and every stream's `/Length`.
fn collect_references(object: &Object, is_page: bool, out: &mut Vec<ObjectId>) {
    match object {
        Object::Dictionary(dict) => {
            for (key, value) in dict.iter() {
                if is_page && key.as_slice() == b"Parent" {
                    continue;
                }
                value.for_each_reference(&mut |id| out.push(id));
            }
        }
        Object::Stream(stream) => {
            for (key, value) in stream.dict.iter() {
                if key.as_slice() == b"Length" {
                    continue;
                }
                value.for_each_reference(&mut |id| out.push(id));
            }
        }
        other => other.for_each_reference(&mut |id| out.push(id)),
    }
}

/// Cross-reference and object streams describe the source file's layout
/// and are meaningless in the output.
fn is_structural_stream(source: &Document, id: ObjectId) -> bool {
    source
        .get(id)
        .ok()
        .and_then(Object::as_stream)
        .is_some_and(|stream| stream.dict.has_type(b"XRef") || stream.dict.has_type(b"ObjStm"))
}

/// Resolve indirect values so a dictionary can be embedded on its own.
pub(crate) fn detach_dictionary(source: &Document, dict: &Dictionary) -> Dictionary {
    dict.iter()
        .filter_map(|(key, value)| {
            let value = source.resolve(value).ok()?;
            match value {
                Object::String(..) | Object::Name(_) | Object::Integer(_) | Object::Real(_)
                | Object::Boolean(_) => Some((key.clone(), value.clone())),
                _ => None,
            }
        })
        .collect()
}

fn version_key(version: &str) -> (u32, u32) {
    let (major, minor) = version.split_once('.').unwrap_or((version, "0"));
    (major.parse().unwrap_or(0), minor.parse().unwrap_or(0))
}
