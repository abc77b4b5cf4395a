//! Build new PDFs from scratch: styled text pages and image pages.

use anyhow::{bail, Context, Result};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

const TEXT_MARGIN: f32 = 50.0;
const MAX_LINE_CHARS: usize = 100;
const IMAGE_FILL: f32 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageSize {
    #[default]
    A4,
    Letter,
    Legal,
}

impl PageSize {
    /// Unknown names fall back to A4
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "letter" => PageSize::Letter,
            "legal" => PageSize::Legal,
            _ => PageSize::A4,
        }
    }

    /// Width and height in points
    pub fn dimensions(self) -> (f32, f32) {
        match self {
            PageSize::A4 => (595.2756, 841.8898),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FontFamily {
    #[default]
    Helvetica,
    Times,
    Courier,
}

impl FontFamily {
    /// Arial and unknown families map to Helvetica
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "times" | "times-roman" => FontFamily::Times,
            "courier" => FontFamily::Courier,
            _ => FontFamily::Helvetica,
        }
    }

    fn base_font(self) -> &'static str {
        match self {
            FontFamily::Helvetica => "Helvetica",
            FontFamily::Times => "Times-Roman",
            FontFamily::Courier => "Courier",
        }
    }
}

/// RGB colour with components in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb(pub f32, pub f32, pub f32);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0.0, 0.0, 0.0);

    /// Parse `#RRGGBB` or `#RGB` (the `#` is optional)
    pub fn parse_hex(s: &str) -> Option<Rgb> {
        let hex = s.trim().trim_start_matches('#');
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |v: u8| v as f32 / 255.0;
        match hex.len() {
            6 => {
                let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
                let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
                let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
                Some(Rgb(channel(r), channel(g), channel(b)))
            }
            3 => {
                let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|d| d * 17);
                Some(Rgb(channel(digit(0)?), channel(digit(1)?), channel(digit(2)?)))
            }
            _ => None,
        }
    }

    fn fill_op(self) -> Operation {
        Operation::new("rg", vec![self.0.into(), self.1.into(), self.2.into()])
    }
}

#[derive(Debug, Clone)]
pub struct TextStyle {
    pub font: FontFamily,
    pub font_size: f32,
    pub color: Rgb,
    pub highlight: Option<Rgb>,
    pub page_size: PageSize,
}

impl Default for TextStyle {
    fn default() -> Self {
        TextStyle {
            font: FontFamily::Helvetica,
            font_size: 12.0,
            color: Rgb::BLACK,
            highlight: None,
            page_size: PageSize::A4,
        }
    }
}

/// Encode text for a standard Type1 font; characters outside Latin-1 become `?`
pub fn encode_latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if (c as u32) < 256 { c as u8 } else { b'?' })
        .collect()
}

/// Lay out `text` line by line on as many pages as needed.
pub fn compose_text(text: &str, style: &TextStyle) -> Result<Document> {
    if !(1.0..=200.0).contains(&style.font_size) {
        bail!("Font size must be between 1 and 200, got {}", style.font_size);
    }

    let (width, height) = style.page_size.dimensions();
    let line_height = style.font_size * 1.5;

    let mut builder = PageTreeBuilder::new(style.page_size);
    let font_id = builder.doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => style.font.base_font(),
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = builder.doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut operations = Vec::new();
    let mut y = height - TEXT_MARGIN;

    for line in text.lines() {
        if y < TEXT_MARGIN {
            builder.add_page(std::mem::take(&mut operations), resources_id)?;
            y = height - TEXT_MARGIN;
        }

        if let Some(highlight) = style.highlight {
            operations.push(highlight.fill_op());
            operations.push(Operation::new(
                "re",
                vec![
                    (TEXT_MARGIN - 5.0).into(),
                    (y - 5.0).into(),
                    (width - 2.0 * TEXT_MARGIN + 10.0).into(),
                    line_height.into(),
                ],
            ));
            operations.push(Operation::new("f", vec![]));
        }

        let visible: String = line.chars().take(MAX_LINE_CHARS).collect();
        operations.push(style.color.fill_op());
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new("Tf", vec!["F1".into(), style.font_size.into()]));
        operations.push(Operation::new("Td", vec![TEXT_MARGIN.into(), y.into()]));
        operations.push(Operation::new(
            "Tj",
            vec![Object::String(encode_latin1(&visible), StringFormat::Literal)],
        ));
        operations.push(Operation::new("ET", vec![]));

        y -= line_height;
    }

    builder.add_page(operations, resources_id)?;
    Ok(builder.finish())
}

/// One page per image, scaled to fit and centred.
pub fn compose_images(images: &[Vec<u8>], page_size: PageSize) -> Result<Document> {
    if images.is_empty() {
        bail!("At least one image is required");
    }

    let (width, height) = page_size.dimensions();
    let mut builder = PageTreeBuilder::new(page_size);

    for (idx, bytes) in images.iter().enumerate() {
        let decoded = image::load_from_memory(bytes)
            .with_context(|| format!("Failed to decode image {}", idx + 1))?;
        let rgb = decoded.to_rgb8();
        let (img_w, img_h) = rgb.dimensions();
        if img_w == 0 || img_h == 0 {
            bail!("Image {} is empty", idx + 1);
        }

        let image_id = builder.doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => img_w as i64,
                "Height" => img_h as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            rgb.into_raw(),
        ));
        let resources_id = builder.doc.add_object(dictionary! {
            "XObject" => dictionary! { "Im0" => image_id },
        });

        let scale = (width / img_w as f32).min(height / img_h as f32) * IMAGE_FILL;
        let draw_w = img_w as f32 * scale;
        let draw_h = img_h as f32 * scale;
        let x = (width - draw_w) / 2.0;
        let y = (height - draw_h) / 2.0;

        builder.add_page(
            vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![draw_w.into(), 0.into(), 0.into(), draw_h.into(), x.into(), y.into()],
                ),
                Operation::new("Do", vec!["Im0".into()]),
                Operation::new("Q", vec![]),
            ],
            resources_id,
        )?;
    }

    Ok(builder.finish())
}

/// Accumulates pages of a fixed size under a single page tree node.
struct PageTreeBuilder {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
    page_size: PageSize,
}

impl PageTreeBuilder {
    fn new(page_size: PageSize) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        PageTreeBuilder {
            doc,
            pages_id,
            kids: Vec::new(),
            page_size,
        }
    }

    fn add_page(&mut self, operations: Vec<Operation>, resources_id: ObjectId) -> Result<()> {
        let content = Content { operations }
            .encode()
            .context("Failed to encode page content")?;
        let content_id = self.doc.add_object(Stream::new(Dictionary::new(), content));
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        self.kids.push(Object::Reference(page_id));
        Ok(())
    }

    fn finish(mut self) -> Document {
        let (width, height) = self.page_size.dimensions();
        let count = self.kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => self.kids,
                "Count" => count,
                "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.compress();
        self.doc
    }
}
