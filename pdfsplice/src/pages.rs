//! Page tree resolution.
//!
//! The walk is an explicit depth-first traversal over `/Kids`, done once
//! per document. It yields the ordered page sequence, the attributes each
//! page inherits from its ancestors, and the ids of the intermediate
//! `/Pages` nodes (which copies must not drag along).

use std::collections::{BTreeSet, HashSet};

use log::warn;

use crate::cancel::Cancellation;
use crate::config::Limits;
use crate::document::Document;
use crate::error::{PdfSpliceError, Result};
use crate::object::{Dictionary, Object, ObjectId};

/// Page attributes that may be set on an ancestor `/Pages` node.
pub const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// One page in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRef {
    /// The page object.
    pub id: ObjectId,
    /// Inheritable attributes found on ancestors and absent from the page
    /// itself, nearest ancestor first in precedence.
    pub inherited: Dictionary,
}

/// Result of walking a page tree.
#[derive(Debug, Clone, Default)]
pub struct PageTree {
    /// Pages in document order.
    pub pages: Vec<PageRef>,
    /// Ids of the intermediate `/Pages` nodes, root included.
    pub nodes: BTreeSet<ObjectId>,
    /// Ids of the pages, for membership tests.
    pub leaves: HashSet<ObjectId>,
}

enum NodeKind {
    Branch,
    Leaf,
}

fn classify(dict: &Dictionary) -> NodeKind {
    match dict.type_name() {
        Some(b"Pages") => NodeKind::Branch,
        Some(b"Page") => NodeKind::Leaf,
        // Untyped or mistyped nodes are judged by their shape.
        _ if dict.has(b"Kids") => NodeKind::Branch,
        _ => NodeKind::Leaf,
    }
}

/// Walk the page tree rooted at `root`.
///
/// # Errors
///
/// - [`PdfSpliceError::CyclicPageTree`] when a node is reached twice
/// - [`PdfSpliceError::EmptyDocument`] when no page is found
/// - [`PdfSpliceError::PageLimitExceeded`] past `limits.max_pages`
/// - [`PdfSpliceError::Cancelled`] when `cancel` fires
/// - any error raised while loading a node
pub fn walk(
    doc: &Document,
    root: ObjectId,
    limits: &Limits,
    cancel: &Cancellation,
) -> Result<PageTree> {
    let mut tree = PageTree::default();
    let mut visited = BTreeSet::new();
    let mut stack = vec![(root, Dictionary::new())];

    while let Some((id, inherited)) = stack.pop() {
        cancel.check()?;
        if !visited.insert(id) {
            return Err(PdfSpliceError::CyclicPageTree { id });
        }

        let dict = doc.get(id)?.as_dict().ok_or_else(|| {
            PdfSpliceError::malformed(
                0,
                format!("page tree node {} {} is not a dictionary", id.0, id.1),
            )
        })?;

        match classify(dict) {
            NodeKind::Branch => {
                tree.nodes.insert(id);
                let mut passed_down = inherited;
                for key in INHERITABLE_KEYS {
                    if let Some(value) = dict.get(key) {
                        passed_down.set(key, value.clone());
                    }
                }

                let kids = match dict.get(b"Kids").map(|kids| doc.resolve(kids)) {
                    Some(Ok(Object::Array(kids))) => kids.as_slice(),
                    Some(Err(err)) => return Err(err),
                    _ => &[],
                };
                // Reverse so the first kid is popped first.
                for kid in kids.iter().rev() {
                    match kid {
                        Object::Reference(kid_id) => stack.push((*kid_id, passed_down.clone())),
                        other => warn!(
                            "Skipping non-reference /Kids entry ({}) in node {} {}",
                            other.type_label(),
                            id.0,
                            id.1
                        ),
                    }
                }
            }
            NodeKind::Leaf => {
                let mut own = Dictionary::new();
                for (key, value) in inherited.iter() {
                    if !dict.has(key) {
                        own.set(key.clone(), value.clone());
                    }
                }
                tree.leaves.insert(id);
                tree.pages.push(PageRef { id, inherited: own });
                if tree.pages.len() > limits.max_pages {
                    return Err(PdfSpliceError::PageLimitExceeded {
                        what: "pages",
                        limit: limits.max_pages,
                        requested: tree.pages.len(),
                    });
                }
            }
        }
    }

    if tree.pages.is_empty() {
        return Err(PdfSpliceError::EmptyDocument);
    }
    Ok(tree)
}
