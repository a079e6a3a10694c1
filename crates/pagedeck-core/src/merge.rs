//! Multi-document merge
//!
//! Concatenates documents in upload order, pages in document order. Object
//! ids of each subsequent source are shifted past the destination's current
//! maximum so nothing collides, then the page tree is rebuilt with every
//! page reference in output order.

use crate::error::PdfOpError;
use crate::select::{rebuild_page_tree, resolve_page_attributes};
use crate::{load_document, save_document};
use lopdf::{Document, Object, ObjectId};
use std::collections::BTreeMap;

/// Merge multiple PDFs into one, in the given order.
pub fn merge_documents(documents: Vec<Vec<u8>>) -> Result<Vec<u8>, PdfOpError> {
    if documents.is_empty() {
        return Err(PdfOpError::OperationError("No documents to merge".into()));
    }

    // A single source round-trips unchanged, but it still has to parse.
    if documents.len() == 1 {
        let bytes = documents.into_iter().next().unwrap_or_default();
        load_document(&bytes)?;
        return Ok(bytes);
    }

    let mut sources = Vec::with_capacity(documents.len());
    for (i, bytes) in documents.iter().enumerate() {
        let doc = Document::load_mem(bytes).map_err(|e| {
            PdfOpError::ParseError(format!("Failed to load document {}: {}", i + 1, e))
        })?;
        sources.push(doc);
    }

    let mut dest = sources.remove(0);
    let mut page_refs: Vec<ObjectId> = dest.get_pages().values().copied().collect();

    for source in sources {
        absorb(&mut dest, source, &mut page_refs);
    }

    // Old ancestors are about to be pruned, so inherited page attributes
    // must land on the pages first
    resolve_page_attributes(&mut dest, &page_refs);
    rebuild_page_tree(&mut dest, &page_refs)?;

    // The absorbed catalogs and page tree nodes are now unreachable
    dest.prune_objects();
    dest.compress();

    save_document(dest)
}

/// Move every object of `source` into `dest` with shifted object ids and
/// append the source's page references, in page order, to `page_refs`.
fn absorb(dest: &mut Document, source: Document, page_refs: &mut Vec<ObjectId>) {
    let offset = dest.max_id;
    let source_pages: Vec<ObjectId> = source.get_pages().values().copied().collect();
    let source_max = source.max_id;

    let mut shifted = BTreeMap::new();
    for (old_id, object) in source.objects.into_iter() {
        shifted.insert((old_id.0 + offset, old_id.1), shift_refs(object, offset));
    }
    dest.objects.extend(shifted);

    for page in source_pages {
        page_refs.push((page.0 + offset, page.1));
    }

    dest.max_id = (source_max + offset).max(dest.max_id);
}

/// Recursively shift object references inside an object by `offset`.
fn shift_refs(obj: Object, offset: u32) -> Object {
    match obj {
        Object::Reference(id) => Object::Reference((id.0 + offset, id.1)),
        Object::Array(arr) => {
            Object::Array(arr.into_iter().map(|o| shift_refs(o, offset)).collect())
        }
        Object::Dictionary(mut dict) => {
            for (_, value) in dict.iter_mut() {
                *value = shift_refs(value.clone(), offset);
            }
            Object::Dictionary(dict)
        }
        Object::Stream(mut stream) => {
            for (_, value) in stream.dict.iter_mut() {
                *value = shift_refs(value.clone(), offset);
            }
            Object::Stream(stream)
        }
        other => other,
    }
}
