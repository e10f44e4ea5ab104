//! Low-level drawing engine.
//!
//! Produces the PDF directly: a title page, then per story page a
//! bordered, vertically centered text page followed by a full-bleed
//! image page. Page numbers appear only on text pages, counted from
//! the first story page.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

// printpdf bundles its own `image` version; decode through the
// re-export so the DynamicImage types line up.
use printpdf::image_crate::{self, GenericImageView as _};
use printpdf::{
    Color, Image, ImageTransform, IndirectFontRef, Line, LineDashPattern, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Point, Rgb,
};

use crate::cli::StorybookArgs;
use crate::document::StoryDocument;
use crate::fetch::PageImage;
use crate::layout::{
    centered_block_top, char_width_mm, max_chars_per_line, mm_from_px, parse_hex_color,
    rounded_rect_path, wrap_text,
};

/// Line height of story text.
const LINE_HEIGHT_MM: f64 = 8.0;
/// Border inset from the page edge.
const BORDER_MARGIN_MM: f64 = 10.0;
/// Border corner radius.
const BORDER_RADIUS_MM: f64 = 10.0;
/// Extra horizontal padding inside the border for text.
const TEXT_INNER_PADDING_MM: f64 = 20.0;
/// Footer baseline height above the page bottom.
const FOOTER_Y_MM: f64 = 15.0;
/// Polyline samples per border corner arc.
const ARC_SEGMENTS: usize = 12;
/// Border stroke gray.
const BORDER_GRAY: f64 = 180.0 / 255.0;

/// Errors from the drawing engine.
#[derive(Debug, thiserror::Error)]
pub enum DrawError {
    #[error("Failed to load font {path}: {message}")]
    Font { path: String, message: String },

    #[error("Failed to decode image: {0}")]
    ImageDecode(#[from] image_crate::ImageError),

    #[error("PDF write failed: {0}")]
    Pdf(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Render the whole storybook to `output`.
pub fn render_draw(
    args: &StorybookArgs,
    document: &StoryDocument,
    images: &[Option<PageImage>],
    output: &Path,
) -> Result<(), DrawError> {
    let (page_w, page_h) = (args.width_mm, args.height_mm);
    let (doc, first_page, first_layer) = PdfDocument::new(
        document.title_or_default(),
        Mm(page_w),
        Mm(page_h),
        "Layer 1",
    );
    let font = add_font(&doc, args)?;

    let wallpaper = match args.wallpaper_file.as_deref() {
        Some(p) if p.exists() => Some(image_crate::open(p)?),
        _ => None,
    };

    let layer = doc.get_page(first_page).get_layer(first_layer);
    draw_title_page(&layer, &font, args, document);

    let mut logical_page = 0u32;
    for (i, page) in document.pages.iter().enumerate() {
        // Text page.
        let (page_idx, layer_idx) = doc.add_page(Mm(page_w), Mm(page_h), "Layer 1");
        let layer = doc.get_page(page_idx).get_layer(layer_idx);
        logical_page += 1;

        if let Some(wp) = &wallpaper {
            place_image_full_page(&layer, wp, args);
        }
        draw_rounded_dotted_border(&layer, page_w, page_h);
        draw_centered_text_block(&layer, &font, &page.text, args);
        draw_footer(&layer, &font, logical_page, args);

        // Image page.
        let (page_idx, layer_idx) = doc.add_page(Mm(page_w), Mm(page_h), "Layer 1");
        let layer = doc.get_page(page_idx).get_layer(layer_idx);
        match images.get(i).and_then(|img| img.as_ref()) {
            Some(img) => {
                let decoded = image_crate::load_from_memory(&img.bytes)?;
                place_image_full_page(&layer, &decoded, args);
            }
            None => draw_missing_image_notice(&layer, &font, i + 1, args),
        }
    }

    doc.save(&mut BufWriter::new(File::create(output)?))
        .map_err(|e| DrawError::Pdf(e.to_string()))?;
    tracing::info!(output = %output.display(), "Rendered PDF via draw engine");
    Ok(())
}

fn add_font(
    doc: &PdfDocumentReference,
    args: &StorybookArgs,
) -> Result<IndirectFontRef, DrawError> {
    let file = File::open(&args.font_file).map_err(|e| DrawError::Font {
        path: args.font_file.display().to_string(),
        message: e.to_string(),
    })?;
    doc.add_external_font(file).map_err(|e| DrawError::Font {
        path: args.font_file.display().to_string(),
        message: e.to_string(),
    })
}

fn fill_color(layer: &PdfLayerReference, hex: &str) {
    let (r, g, b) = parse_hex_color(hex).unwrap_or((0.0, 0.0, 0.0));
    layer.set_fill_color(Color::Rgb(Rgb::new(r, g, b, None)));
}

/// One line of text, horizontally centered by estimated width.
fn centered_line(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    text: &str,
    font_size: f64,
    y_mm: f64,
    page_w: f64,
) {
    let width = text.chars().count() as f64 * char_width_mm(font_size);
    let x = ((page_w - width) / 2.0).max(0.0);
    layer.use_text(text, font_size, Mm(x), Mm(y_mm), font);
}

fn draw_title_page(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    args: &StorybookArgs,
    document: &StoryDocument,
) {
    let mid = args.height_mm / 2.0;

    fill_color(layer, &args.color_title);
    centered_line(
        layer,
        font,
        document.title_or_default(),
        args.font_size_title,
        mid + 10.0,
        args.width_mm,
    );

    if let Some(subtitle) = document.subtitle.as_deref() {
        fill_color(layer, &args.color_main);
        centered_line(
            layer,
            font,
            subtitle,
            args.font_size_main,
            mid - 10.0,
            args.width_mm,
        );
    }
}

fn draw_rounded_dotted_border(layer: &PdfLayerReference, page_w: f64, page_h: f64) {
    let path = rounded_rect_path(
        BORDER_MARGIN_MM,
        BORDER_MARGIN_MM,
        page_w - 2.0 * BORDER_MARGIN_MM,
        page_h - 2.0 * BORDER_MARGIN_MM,
        BORDER_RADIUS_MM,
        ARC_SEGMENTS,
    );
    let points = path
        .into_iter()
        .map(|(x, y)| (Point::new(Mm(x), Mm(y)), false))
        .collect();

    layer.set_outline_color(Color::Rgb(Rgb::new(BORDER_GRAY, BORDER_GRAY, BORDER_GRAY, None)));
    layer.set_outline_thickness(0.85);
    layer.set_line_dash_pattern(LineDashPattern {
        offset: 0,
        dash_1: Some(3),
        gap_1: Some(3),
        dash_2: None,
        gap_2: None,
        dash_3: None,
        gap_3: None,
    });
    layer.add_shape(Line {
        points,
        is_closed: true,
        has_fill: false,
        has_stroke: true,
        is_clipping_path: false,
    });
    layer.set_line_dash_pattern(LineDashPattern::default());
}

fn draw_centered_text_block(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    text: &str,
    args: &StorybookArgs,
) {
    let text_width = args.width_mm - 2.0 * BORDER_MARGIN_MM - TEXT_INNER_PADDING_MM;
    let area_height = args.height_mm - 2.0 * BORDER_MARGIN_MM;
    let lines = wrap_text(text, max_chars_per_line(text_width, args.font_size_main));
    let top = centered_block_top(area_height, lines.len(), LINE_HEIGHT_MM);

    fill_color(layer, &args.color_main);
    for (i, line) in lines.iter().enumerate() {
        if line.is_empty() {
            continue;
        }
        let y = args.height_mm - (BORDER_MARGIN_MM + top + (i as f64 + 0.8) * LINE_HEIGHT_MM);
        centered_line(layer, font, line, args.font_size_main, y, args.width_mm);
    }
}

fn draw_footer(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    logical_page: u32,
    args: &StorybookArgs,
) {
    fill_color(layer, &args.color_footer);
    centered_line(
        layer,
        font,
        &logical_page.to_string(),
        args.font_size_footer,
        FOOTER_Y_MM,
        args.width_mm,
    );
}

fn draw_missing_image_notice(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    page_number: usize,
    args: &StorybookArgs,
) {
    fill_color(layer, &args.color_main);
    centered_line(
        layer,
        font,
        &format!("Image for page {page_number} could not be loaded."),
        args.font_size_main,
        args.height_mm / 2.0,
        args.width_mm,
    );
}

/// Stretch an image across the full page.
fn place_image_full_page(
    layer: &PdfLayerReference,
    img: &image_crate::DynamicImage,
    args: &StorybookArgs,
) {
    let native_w = mm_from_px(img.width(), args.dpi);
    let native_h = mm_from_px(img.height(), args.dpi);
    if native_w <= 0.0 || native_h <= 0.0 {
        return;
    }

    let pdf_image = Image::from_dynamic_image(img);
    pdf_image.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(0.0)),
            translate_y: Some(Mm(0.0)),
            scale_x: Some(args.width_mm / native_w),
            scale_y: Some(args.height_mm / native_h),
            dpi: Some(args.dpi as f64),
            ..Default::default()
        },
    );
}
