use anyhow::{bail, Context, Result};
use lopdf::encryption::{EncryptionState, EncryptionVersion, Permissions};
use lopdf::{Document, Object, ObjectId, StringFormat};
use std::collections::BTreeSet;
use std::path::Path;

/// How hard `compress` should work on a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionLevel {
    /// Stream compression only
    High,
    /// Also drop unreferenced objects and empty streams
    #[default]
    Medium,
    /// Also strip document metadata
    Low,
}

impl CompressionLevel {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "medium" => Ok(CompressionLevel::Medium),
            "high" => Ok(CompressionLevel::High),
            "low" => Ok(CompressionLevel::Low),
            other => bail!("Unknown compression quality: {}", other),
        }
    }
}

pub struct PdfDocument {
    pub doc: Document,
}

impl PdfDocument {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let doc = Document::load(path)
            .with_context(|| format!("Failed to open PDF: {}", path.display()))?;
        Ok(PdfDocument { doc })
    }

    #[cfg(test)]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let doc = Document::load_mem(bytes).context("Failed to parse PDF")?;
        Ok(PdfDocument { doc })
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Page object IDs in page order
    pub fn page_ids(&self) -> Vec<ObjectId> {
        // get_pages is keyed by 1-based page number, so values come out in order
        self.doc.get_pages().into_values().collect()
    }

    /// Keep only the given zero-based pages
    pub fn extract_pages(&self, pages: &[usize]) -> Result<Document> {
        if pages.is_empty() {
            bail!("No pages selected");
        }

        let total = self.page_count();
        if let Some(&bad) = pages.iter().find(|&&p| p >= total) {
            bail!("Page {} is out of range (1-{})", bad + 1, total);
        }

        let keep: BTreeSet<usize> = pages.iter().copied().collect();
        let pages_to_delete: Vec<u32> = (0..total)
            .filter(|idx| !keep.contains(idx))
            .map(|idx| idx as u32 + 1)
            .collect();

        let mut new_doc = self.doc.clone();
        if !pages_to_delete.is_empty() {
            new_doc.delete_pages(&pages_to_delete);
            new_doc.prune_objects();
        }

        Ok(new_doc)
    }

    /// Add `angle` degrees of clockwise rotation to the selected zero-based pages.
    pub fn rotate_pages(&mut self, pages: &[usize], angle: i64) -> Result<()> {
        if angle % 90 != 0 {
            bail!("Rotation must be a multiple of 90 degrees, got {}", angle);
        }

        let page_ids = self.page_ids();
        for &idx in pages {
            let page_id = *page_ids
                .get(idx)
                .with_context(|| format!("Page {} is out of range (1-{})", idx + 1, page_ids.len()))?;

            let current = match inherited_attribute(&self.doc, page_id, b"Rotate") {
                Some(Object::Integer(r)) => r,
                Some(Object::Real(r)) => r as i64,
                _ => 0,
            };
            // Normalize both sides first; either may be any i64
            let rotated = (current.rem_euclid(360) + angle.rem_euclid(360)) % 360;

            self.doc
                .get_dictionary_mut(page_id)
                .with_context(|| format!("Page {} has no dictionary", idx + 1))?
                .set("Rotate", Object::Integer(rotated));
        }

        Ok(())
    }

    pub fn compress(&mut self, level: CompressionLevel) {
        if level != CompressionLevel::High {
            self.doc.prune_objects();
            self.doc.delete_zero_length_streams();
        }
        if level == CompressionLevel::Low {
            if let Ok(Object::Reference(info_id)) = self.doc.trailer.get(b"Info").cloned() {
                self.doc.objects.remove(&info_id);
            }
            self.doc.trailer.remove(b"Info");
            self.doc.renumber_objects();
        }
        self.doc.compress();
    }

    /// Protect the document with the standard security handler (RC4, 128-bit).
    pub fn encrypt(&mut self, password: &str) -> Result<()> {
        if self.doc.is_encrypted() {
            bail!("PDF is already encrypted");
        }

        if self.doc.trailer.get(b"ID").is_err() {
            let id = uuid::Uuid::new_v4().as_bytes().to_vec();
            self.doc.trailer.set(
                "ID",
                Object::Array(vec![
                    Object::String(id.clone(), StringFormat::Hexadecimal),
                    Object::String(id, StringFormat::Hexadecimal),
                ]),
            );
        }

        let version = EncryptionVersion::V2 {
            document: &self.doc,
            owner_password: password,
            user_password: password,
            key_length: 128,
            permissions: Permissions::all(),
        };
        let state = EncryptionState::try_from(version).context("Failed to set up encryption")?;
        self.doc.encrypt(&state).context("Failed to encrypt PDF")?;

        Ok(())
    }

    /// Save to a file
    pub fn save<P: AsRef<Path>>(doc: &mut Document, path: P) -> Result<()> {
        doc.save(&path)
            .with_context(|| format!("Failed to save PDF: {}", path.as_ref().display()))?;
        Ok(())
    }

    pub fn to_bytes(doc: &mut Document) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        doc.save_to(&mut out).context("Failed to write PDF")?;
        Ok(out)
    }
}

/// Look up a page attribute, walking up the page tree for inheritable keys.
pub fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = doc.get_dictionary(page_id).ok()?;
    // Page trees are shallow; the bound guards against Parent cycles.
    for _ in 0..32 {
        if let Ok(value) = current.get(key) {
            return match value {
                Object::Reference(id) => doc.get_object(*id).ok().cloned(),
                other => Some(other.clone()),
            };
        }
        let parent = current.get(b"Parent").and_then(Object::as_reference).ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }
    None
}

/// Media box of a page as `[llx, lly, urx, ury]`, US Letter when absent.
pub fn media_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    let fallback = [0.0, 0.0, 612.0, 792.0];
    let Some(Object::Array(values)) = inherited_attribute(doc, page_id, b"MediaBox") else {
        return fallback;
    };
    if values.len() != 4 {
        return fallback;
    }

    let mut rect = [0.0f32; 4];
    for (slot, value) in rect.iter_mut().zip(values.iter()) {
        *slot = match value {
            Object::Integer(i) => *i as f32,
            Object::Real(r) => *r as f32,
            _ => return fallback,
        };
    }
    rect
}
