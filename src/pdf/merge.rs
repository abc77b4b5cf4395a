use anyhow::{bail, Context, Result};
use lopdf::{dictionary, Document, Object, ObjectId};
use std::collections::BTreeMap;

use super::document::inherited_attribute;

/// Attributes a page may inherit from its page tree ancestors.
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Concatenate documents in order into a single document.
pub fn merge_documents(documents: Vec<Document>) -> Result<Document> {
    if documents.len() < 2 {
        bail!("At least 2 documents are required to merge");
    }

    let mut merged = Document::with_version("1.5");
    let mut max_id = 1;
    let mut page_order: Vec<(ObjectId, Object)> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for (idx, mut doc) in documents.into_iter().enumerate() {
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        // Old page tree nodes are dropped below, so pull inherited attributes down first.
        for page_id in doc.get_pages().into_values() {
            let mut page = doc
                .get_dictionary(page_id)
                .with_context(|| format!("Document {} has a broken page tree", idx + 1))?
                .clone();
            for key in INHERITABLE {
                if page.get(key).is_err() {
                    if let Some(value) = inherited_attribute(&doc, page_id, key) {
                        page.set(key.to_vec(), value);
                    }
                }
            }
            page_order.push((page_id, Object::Dictionary(page)));
        }

        for (object_id, object) in doc.objects {
            match object.type_name().unwrap_or(b"") {
                b"Catalog" | b"Pages" | b"Page" | b"Outlines" | b"Outline" => {}
                _ => {
                    objects.insert(object_id, object);
                }
            }
        }
    }

    merged.objects.extend(objects);
    merged.max_id = max_id;

    let pages_id = merged.new_object_id();
    let mut kids = Vec::with_capacity(page_order.len());
    for (page_id, page) in page_order {
        if let Object::Dictionary(mut dict) = page {
            dict.set("Parent", pages_id);
            merged.objects.insert(page_id, Object::Dictionary(dict));
            kids.push(Object::Reference(page_id));
        }
    }

    let count = kids.len() as i64;
    merged.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = merged.new_object_id();
    merged.objects.insert(
        catalog_id,
        Object::Dictionary(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        }),
    );
    merged.trailer.set("Root", catalog_id);

    merged.renumber_objects();
    merged.compress();

    Ok(merged)
}
