//! Single-document page selection
//!
//! Reversal and every flavor of deletion reduce to the same primitive:
//! rebuild the root page tree so it lists the kept page references in
//! output order, then prune everything that became unreachable.

use crate::error::PdfOpError;
use crate::{load_document, save_document};
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashSet;

/// Which end of the document a count-based delete removes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Start,
    End,
}

/// Reverse the page order: output page i is input page (N-1-i).
pub fn reverse_pages(bytes: &[u8]) -> Result<Vec<u8>, PdfOpError> {
    let doc = load_document(bytes)?;
    let total = doc.get_pages().len();
    let keep: Vec<usize> = (0..total).rev().collect();
    write_selection(doc, &keep)
}

/// Delete `count` pages from the start or end of the document.
///
/// A count at or past the page total clamps to an empty document rather
/// than erroring.
pub fn delete_count(bytes: &[u8], count: usize, location: Location) -> Result<Vec<u8>, PdfOpError> {
    let doc = load_document(bytes)?;
    let total = doc.get_pages().len();

    let keep: Vec<usize> = match location {
        Location::Start => (count.min(total)..total).collect(),
        Location::End => (0..total.saturating_sub(count)).collect(),
    };

    write_selection(doc, &keep)
}

/// Delete the final two pages, keeping pages [0, N-2) in order.
/// Documents with fewer than two pages clamp to zero pages.
pub fn delete_last_two(bytes: &[u8]) -> Result<Vec<u8>, PdfOpError> {
    delete_count(bytes, 2, Location::End)
}

/// Delete the given 1-based pages, keeping the rest in original order.
///
/// Page numbers outside `1..=N` are rejected.
pub fn delete_listed(bytes: &[u8], pages: &[u32]) -> Result<Vec<u8>, PdfOpError> {
    let doc = load_document(bytes)?;
    let total = doc.get_pages().len() as u32;

    for &page in pages {
        if page == 0 || page > total {
            return Err(PdfOpError::PageOutOfRange { page, total });
        }
    }

    let to_delete: HashSet<u32> = pages.iter().copied().collect();
    let keep: Vec<usize> = (1..=total)
        .filter(|p| !to_delete.contains(p))
        .map(|p| (p - 1) as usize)
        .collect();

    write_selection(doc, &keep)
}

/// Serialize `doc` with only the pages at the given 0-based indices, in the
/// given order.
fn write_selection(mut doc: Document, keep: &[usize]) -> Result<Vec<u8>, PdfOpError> {
    let pages: Vec<ObjectId> = doc.get_pages().values().copied().collect();

    let mut selected = Vec::with_capacity(keep.len());
    for &index in keep {
        let id = pages
            .get(index)
            .copied()
            .ok_or(PdfOpError::PageOutOfRange {
                page: index as u32 + 1,
                total: pages.len() as u32,
            })?;
        selected.push(id);
    }

    resolve_page_attributes(&mut doc, &selected);
    rebuild_page_tree(&mut doc, &selected)?;

    // Drop pages (and their resources) that fell out of the tree
    doc.prune_objects();
    doc.compress();

    save_document(doc)
}

/// Page attributes a Pages node passes down to its descendants.
const INHERITABLE_PAGE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Materialize inherited attributes onto each listed page.
///
/// Pages may inherit Resources, MediaBox, CropBox and Rotate from
/// intermediate Pages nodes. The rebuilt tree is flat, so any attribute a
/// page still inherits has to be copied onto the page dictionary before the
/// old ancestors are pruned.
pub(crate) fn resolve_page_attributes(doc: &mut Document, page_refs: &[ObjectId]) {
    for &page_id in page_refs {
        let mut resolved: Vec<(&[u8], Object)> = Vec::new();

        if let Some(page_dict) = doc.objects.get(&page_id).and_then(|o| o.as_dict().ok()) {
            for key in INHERITABLE_PAGE_KEYS {
                if page_dict.has(key) {
                    continue;
                }
                if let Some(value) = lookup_ancestors(doc, page_dict, key) {
                    resolved.push((key, value));
                }
            }
        }

        if let Some(Object::Dictionary(ref mut page_dict)) = doc.objects.get_mut(&page_id) {
            for (key, value) in resolved {
                page_dict.set(key, value);
            }
        }
    }
}

/// Walk the Parent chain for the nearest node defining `key`.
fn lookup_ancestors(doc: &Document, start: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut parent = start.get(b"Parent").and_then(Object::as_reference).ok();

    // Depth guard against malformed self-referencing trees
    for _ in 0..32 {
        let id = parent?;
        let dict = doc.objects.get(&id)?.as_dict().ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value.clone());
        }
        parent = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }

    None
}

/// Find the root Pages node via the trailer's catalog.
fn root_pages_id(doc: &Document) -> Result<ObjectId, PdfOpError> {
    let root_obj = doc
        .trailer
        .get(b"Root")
        .map_err(|_| PdfOpError::OperationError("No Root in trailer".into()))?;

    let catalog_id = root_obj
        .as_reference()
        .map_err(|_| PdfOpError::OperationError("Root is not a reference".into()))?;

    let catalog = doc
        .objects
        .get(&catalog_id)
        .ok_or_else(|| PdfOpError::OperationError("Catalog not found".into()))?
        .as_dict()
        .map_err(|_| PdfOpError::OperationError("Invalid catalog".into()))?;

    let pages_obj = catalog
        .get(b"Pages")
        .map_err(|_| PdfOpError::OperationError("No Pages in catalog".into()))?;

    pages_obj
        .as_reference()
        .map_err(|_| PdfOpError::OperationError("Pages is not a reference".into()))
}

/// Rewrite the root page tree so it lists exactly `page_refs`, in order.
///
/// The rebuilt tree is flat, so every kept page is reparented to the root
/// Pages node; intermediate tree nodes become unreachable and are pruned by
/// the caller.
pub(crate) fn rebuild_page_tree(
    doc: &mut Document,
    page_refs: &[ObjectId],
) -> Result<(), PdfOpError> {
    let pages_id = root_pages_id(doc)?;

    for &page_id in page_refs {
        if let Some(Object::Dictionary(ref mut page_dict)) = doc.objects.get_mut(&page_id) {
            page_dict.set("Parent", Object::Reference(pages_id));
        }
    }

    if let Some(Object::Dictionary(ref mut pages_dict)) = doc.objects.get_mut(&pages_id) {
        let kids = page_refs
            .iter()
            .map(|&id| Object::Reference(id))
            .collect::<Vec<_>>();
        pages_dict.set("Kids", Object::Array(kids));
        pages_dict.set("Count", Object::Integer(page_refs.len() as i64));
        Ok(())
    } else {
        Err(PdfOpError::OperationError(
            "Invalid pages dictionary".into(),
        ))
    }
}
