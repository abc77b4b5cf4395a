use anyhow::{bail, Context, Result};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use super::compose::encode_latin1;
use super::document::{inherited_attribute, media_box};

const FONT_SIZE: f32 = 60.0;
const GREY: f32 = 0.5;
const FONT_NAME: &str = "FWatermark";
const STATE_NAME: &str = "GSWatermark";

#[derive(Debug, Clone)]
pub struct Watermark {
    pub text: String,
    /// Fill alpha in `0.0..=1.0`
    pub opacity: f32,
}

impl Watermark {
    pub fn new(text: impl Into<String>, opacity: f32) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            bail!("Watermark text must not be empty");
        }
        if !(0.0..=1.0).contains(&opacity) {
            bail!("Opacity must be between 0 and 1, got {}", opacity);
        }
        Ok(Watermark { text, opacity })
    }

    /// Stamp every page with the watermark, rotated 45° about the page centre.
    pub fn apply(&self, doc: &mut Document) -> Result<()> {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let state_id = doc.add_object(dictionary! {
            "Type" => "ExtGState",
            "ca" => self.opacity,
        });

        let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));

        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
        for page_id in page_ids {
            let [llx, lly, urx, ury] = media_box(doc, page_id);
            let centre = ((llx + urx) / 2.0, (lly + ury) / 2.0);

            // Restore whatever state the page content left behind before drawing
            let mut content = b"\nQ\n".to_vec();
            content.extend(self.content(centre).encode().context("Failed to encode watermark")?);
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content));

            register_resource(doc, page_id, b"Font", FONT_NAME, font_id)?;
            register_resource(doc, page_id, b"ExtGState", STATE_NAME, state_id)?;
            wrap_content(doc, page_id, save_id, content_id)?;
        }

        Ok(())
    }

    fn content(&self, (cx, cy): (f32, f32)) -> Content {
        let (sin, cos) = std::f32::consts::FRAC_PI_4.sin_cos();
        // Helvetica averages about half an em per glyph; close enough to centre the text.
        let approx_width = self.text.chars().count() as f32 * FONT_SIZE * 0.5;

        Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new("gs", vec![STATE_NAME.into()]),
                Operation::new("rg", vec![GREY.into(), GREY.into(), GREY.into()]),
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![FONT_NAME.into(), FONT_SIZE.into()]),
                Operation::new(
                    "Tm",
                    vec![cos.into(), sin.into(), (-sin).into(), cos.into(), cx.into(), cy.into()],
                ),
                Operation::new("Td", vec![(-approx_width / 2.0).into(), 0.into()]),
                Operation::new(
                    "Tj",
                    vec![Object::String(encode_latin1(&self.text), StringFormat::Literal)],
                ),
                Operation::new("ET", vec![]),
                Operation::new("Q", vec![]),
            ],
        }
    }
}

/// Add `name -> target` under `category` in the page's resources.
///
/// Inherited resources are copied onto the page first so siblings are not affected.
fn register_resource(
    doc: &mut Document,
    page_id: ObjectId,
    category: &[u8],
    name: &str,
    target: ObjectId,
) -> Result<()> {
    let resources_ref = doc
        .get_dictionary(page_id)
        .context("Page has no dictionary")?
        .get(b"Resources")
        .ok()
        .cloned();

    let resources: &mut Dictionary = match resources_ref {
        Some(Object::Reference(id)) => doc
            .get_dictionary_mut(id)
            .context("Page resources are not a dictionary")?,
        Some(Object::Dictionary(_)) => page_resources_mut(doc, page_id)?,
        _ => {
            let inherited = match inherited_attribute(doc, page_id, b"Resources") {
                Some(Object::Dictionary(dict)) => dict,
                _ => Dictionary::new(),
            };
            doc.get_dictionary_mut(page_id)
                .context("Page has no dictionary")?
                .set("Resources", inherited);
            page_resources_mut(doc, page_id)?
        }
    };

    let category_ref = resources.get(category).ok().cloned();
    match category_ref {
        Some(Object::Reference(id)) => {
            doc.get_dictionary_mut(id)
                .context("Resource category is not a dictionary")?
                .set(name, target);
        }
        Some(Object::Dictionary(mut dict)) => {
            dict.set(name, target);
            resources.set(category.to_vec(), dict);
        }
        _ => {
            resources.set(category.to_vec(), dictionary! { name => target });
        }
    }

    Ok(())
}

fn page_resources_mut(doc: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary> {
    doc.get_dictionary_mut(page_id)
        .context("Page has no dictionary")?
        .get_mut(b"Resources")
        .and_then(Object::as_dict_mut)
        .context("Page resources are not a dictionary")
}

/// Contents become `[save, existing..., watermark]`; `save` opens the `q` that
/// the watermark stream closes.
fn wrap_content(
    doc: &mut Document,
    page_id: ObjectId,
    save_id: ObjectId,
    content_id: ObjectId,
) -> Result<()> {
    let page = doc
        .get_dictionary_mut(page_id)
        .context("Page has no dictionary")?;

    let mut contents = vec![Object::Reference(save_id)];
    match page.get(b"Contents").ok().cloned() {
        Some(Object::Reference(existing)) => contents.push(Object::Reference(existing)),
        Some(Object::Array(existing)) => contents.extend(existing),
        _ => {}
    }
    contents.push(Object::Reference(content_id));
    page.set("Contents", Object::Array(contents));

    Ok(())
}
