//! PDF assembly: one JPEG slice of the report bitmap per A4 page.

use image::{imageops, DynamicImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use serde::Serialize;
use tracing::debug;

use crate::error::ExportError;
use crate::image_export::{encode_jpeg, flatten_on_white, DEFAULT_QUALITY};
use crate::paginate::{paginate, PageLayout, Slice, SlicePolicy, MAX_MARGIN_MM};

const PT_PER_MM: f64 = 72.0 / 25.4;

#[derive(Debug, Clone)]
pub struct PdfOptions {
    pub margin_mm: f64,
    pub slice_policy: SlicePolicy,
    /// JPEG quality of the embedded slices, `0..=1`.
    pub quality: f64,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            margin_mm: MAX_MARGIN_MM,
            slice_policy: SlicePolicy::default(),
            quality: DEFAULT_QUALITY,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RenderedPdf {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub layout: PageLayout,
    pub slices: Vec<Slice>,
}

fn pdf_err(err: impl std::fmt::Display) -> ExportError {
    ExportError::Pdf(err.to_string())
}

fn pt(mm: f64) -> Object {
    Object::Real((mm * PT_PER_MM) as f32)
}

/// Slice `bitmap` at the given bitmap-pixel breakpoints and lay the slices
/// out on A4 pages, top-aligned at the margin, all with the same width.
pub fn render_pdf(
    bitmap: &DynamicImage,
    breaks: &[u32],
    options: &PdfOptions,
) -> Result<RenderedPdf, ExportError> {
    let (width, height) = (bitmap.width(), bitmap.height());
    if width == 0 || height == 0 {
        return Err(ExportError::EmptyBitmap);
    }

    let layout = PageLayout::a4_for(width, height, options.margin_mm);
    let px_per_mm = layout.px_per_mm(width);
    let slices = paginate(
        height,
        breaks,
        layout.usable_height_px(width),
        &options.slice_policy,
    );
    debug!(
        width,
        height,
        pages = slices.len(),
        orientation = ?layout.orientation,
        "paginated report bitmap"
    );

    let flat = flatten_on_white(bitmap);
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::with_capacity(slices.len());

    for slice in &slices {
        let band = imageops::crop_imm(&flat, 0, slice.y, width, slice.height).to_image();
        let jpeg = encode_jpeg(&band, options.quality)?;
        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(width),
                "Height" => i64::from(slice.height),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            jpeg,
        ));
        let page_id = add_page(&mut doc, pages_id, image_id, &layout, slice.height as f64 / px_per_mm)?;
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).map_err(pdf_err)?;

    Ok(RenderedPdf {
        bytes,
        layout,
        slices,
    })
}

fn add_page(
    doc: &mut Document,
    pages_id: ObjectId,
    image_id: ObjectId,
    layout: &PageLayout,
    image_height_mm: f64,
) -> Result<ObjectId, ExportError> {
    let margin = layout.margin_mm;
    // PDF origin is bottom-left; the slice hangs from the top margin.
    let bottom = layout.page_height_mm - margin - image_height_mm;
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    pt(layout.image_width_mm()),
                    0.into(),
                    0.into(),
                    pt(image_height_mm),
                    pt(margin),
                    pt(bottom),
                ],
            ),
            Operation::new("Do", vec!["Im0".into()]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().map_err(pdf_err)?));

    Ok(doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), pt(layout.page_width_mm), pt(layout.page_height_mm)],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! {
                "Im0" => image_id,
            },
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paginate::Orientation;
    use image::{Rgb, RgbImage};

    fn bitmap(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(w, h, |_, y| Rgb([(y % 256) as u8, 40, 90])))
    }

    #[test]
    fn test_one_page_per_slice() {
        // 170 px across a 170 mm image width: 1 px/mm, 257 px per page.
        let rendered = render_pdf(&bitmap(170, 1000), &[], &PdfOptions::default()).unwrap();
        assert_eq!(rendered.layout.orientation, Orientation::Portrait);
        assert_eq!(rendered.slices.len(), 4);
        assert!(rendered.bytes.starts_with(b"%PDF-1.5"));

        let doc = Document::load_mem(&rendered.bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 4);
    }

    #[test]
    fn test_breaks_shape_the_pages() {
        let rendered = render_pdf(&bitmap(170, 600), &[250, 500], &PdfOptions::default()).unwrap();
        assert_eq!(rendered.slices[0], Slice { y: 0, height: 230 });
        let covered: u32 = rendered.slices.iter().map(|s| s.height).sum();
        assert_eq!(covered, 600);
    }

    #[test]
    fn test_landscape_for_wide_bitmap() {
        let rendered = render_pdf(&bitmap(400, 100), &[], &PdfOptions::default()).unwrap();
        assert_eq!(rendered.layout.orientation, Orientation::Landscape);
        assert_eq!(rendered.slices.len(), 1);
    }

    #[test]
    fn test_empty_bitmap_is_error() {
        let result = render_pdf(&bitmap(0, 0), &[], &PdfOptions::default());
        assert!(matches!(result, Err(ExportError::EmptyBitmap)));
    }
}
