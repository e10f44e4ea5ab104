//! HTML/CSS engine.
//!
//! Builds a single self-contained HTML document — all styling inline,
//! all images embedded as `data:` URIs — and hands it to the external
//! `weasyprint` converter for paginated PDF output. Print geometry
//! (trim size, bleed, crop marks, page counters) is expressed through
//! `@page` rules.

use std::path::Path;

use crate::cli::StorybookArgs;
use crate::document::StoryDocument;
use crate::fetch::PageImage;

/// Errors from the HTML engine.
#[derive(Debug, thiserror::Error)]
pub enum HtmlError {
    #[error("weasyprint binary not found: {0}")]
    NotFound(std::io::Error),

    #[error("weasyprint execution failed (exit code {exit_code:?}): {stderr}")]
    ExecutionFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Escape text for safe interpolation into HTML content.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// A `file://` URI for a local resource referenced from CSS.
fn file_uri(path: &Path) -> Option<String> {
    let absolute = path.canonicalize().ok()?;
    Some(format!("file://{}", absolute.display()).replace(' ', "%20"))
}

/// The embedded stylesheet, parameterized by the CLI options.
pub fn generate_css(args: &StorybookArgs) -> String {
    let font_uri = file_uri(&args.font_file).unwrap_or_default();
    let wallpaper_uri = args
        .wallpaper_file
        .as_deref()
        .filter(|p| p.exists())
        .and_then(file_uri);

    let marks = if args.show_bleed_marks {
        "marks: crop;"
    } else {
        ""
    };
    let wallpaper_rule = wallpaper_uri
        .map(|uri| format!("background-image: url(\"{uri}\");"))
        .unwrap_or_default();

    format!(
        r#"
    @font-face {{
        font-family: '{font_name}';
        src: url("{font_uri}");
    }}

    @page {{
        size: {width}mm {height}mm;
        margin: 0;
        bleed: {bleed}mm;
        {marks}
    }}

    /* Named page for story content that carries a page number */
    @page main-content {{
        @bottom-center {{
            content: counter(page);
            font-family: '{font_name}';
            font-size: {footer_size}pt;
            color: {footer_color};
            margin-bottom: {footer_margin}mm;
            vertical-align: top;
        }}
    }}

    body {{
        font-family: '{font_name}', sans-serif;
        margin: 0;
        padding: 0;
    }}

    .page {{
        width: {width}mm;
        height: {height}mm;
        position: relative;
        overflow: hidden;
        box-sizing: border-box;
        page-break-after: always;
        display: flex;
        flex-direction: column;
    }}

    .page:last-child {{
        page-break-after: auto;
    }}

    .content-box {{
        width: 100%;
        box-sizing: border-box;
        white-space: pre-wrap;
        word-wrap: break-word;
    }}

    .valign-top {{ justify-content: flex-start; }}
    .valign-middle {{ justify-content: center; }}
    .valign-bottom {{ justify-content: flex-end; }}

    .title-page, .copyright-page, .introduction-page {{
        padding: {bleed}mm;
    }}

    .title-page .content-box {{
        color: {title_color};
        font-size: {title_size}pt;
        text-align: center;
        padding: 0 {title_margin}mm;
    }}

    .copyright-page .content-box {{
        color: {copyright_color};
        font-size: {copyright_size}pt;
        text-align: center;
        padding: 0 {copyright_margin}mm;
    }}

    .introduction-page .content-box {{
        color: {introduction_color};
        font-size: {introduction_size}pt;
        text-align: justify;
        padding: 0 {introduction_margin}mm;
    }}

    .story-image-page img {{
        width: calc({width}mm + 2 * {bleed}mm);
        height: calc({height}mm + 2 * {bleed}mm);
        position: absolute;
        top: -{bleed}mm;
        left: -{bleed}mm;
        object-fit: cover;
    }}

    .story-text-page {{
        page: main-content;
        padding: {bleed}mm;
        display: flex;
        justify-content: center;
        align-items: center;
        text-align: center;
        background-size: cover;
        background-position: center;
        {wallpaper_rule}
    }}

    .story-text-page .text-container {{
        color: {main_color};
        font-size: {main_size}pt;
        width: calc({width}mm - 2 * {main_margin}mm);
        height: calc({height}mm - 2 * {main_margin}mm);
        border: 1px dotted #999;
        border-radius: 10mm;
        display: flex;
        justify-content: center;
        align-items: center;
        padding: 10mm;
        box-sizing: border-box;
    }}
    "#,
        font_name = args.font_name,
        font_uri = font_uri,
        width = args.width_mm,
        height = args.height_mm,
        bleed = args.bleed_mm,
        marks = marks,
        footer_size = args.font_size_footer,
        footer_color = args.color_footer,
        footer_margin = args.page_number_margin_bottom_mm,
        title_color = args.color_title,
        title_size = args.font_size_title,
        title_margin = args.margin_horizontal_title_mm,
        copyright_color = args.color_copyright,
        copyright_size = args.font_size_copyright,
        copyright_margin = args.margin_horizontal_copyright_mm,
        introduction_color = args.color_introduction,
        introduction_size = args.font_size_introduction,
        introduction_margin = args.margin_horizontal_introduction_mm,
        main_color = args.color_main,
        main_size = args.font_size_main,
        main_margin = args.margin_horizontal_main_mm,
        wallpaper_rule = wallpaper_rule,
    )
}

/// The full HTML document: optional front matter, then alternating
/// text/image pages.
pub fn generate_html(
    args: &StorybookArgs,
    document: &StoryDocument,
    images: &[Option<PageImage>],
) -> String {
    let mut parts: Vec<String> = Vec::new();

    for (text, class, valign) in [
        (&args.title_page_text, "title-page", args.valign_title),
        (&args.copyright_text, "copyright-page", args.valign_copyright),
        (
            &args.introduction_text,
            "introduction-page",
            args.valign_introduction,
        ),
    ] {
        if !text.is_empty() {
            parts.push(format!(
                r#"<div class="page {class} valign-{valign}">
    <div class="content-box">{content}</div>
</div>"#,
                class = class,
                valign = valign.as_css(),
                content = escape_html(text),
            ));
        }
    }

    for (i, page) in document.pages.iter().enumerate() {
        parts.push(format!(
            r#"<div class="page story-text-page">
    <div class="text-container">
        <div class="content-box">{}</div>
    </div>
</div>"#,
            escape_html(&page.text),
        ));

        let image_html = match images.get(i).and_then(|img| img.as_ref()) {
            Some(img) => format!(r#"<img src="{}">"#, img.data_uri()),
            None => "<p>Image could not be loaded.</p>".to_string(),
        };
        parts.push(format!(
            r#"<div class="page story-image-page">
    {image_html}
</div>"#,
        ));
    }

    format!(
        "<!DOCTYPE html><html><head><meta charset='UTF-8'><style>{}</style></head><body>{}</body></html>",
        generate_css(args),
        parts.join("\n"),
    )
}

/// Render an HTML string to PDF by invoking the external `weasyprint`
/// binary on a temp file.
pub async fn render_with_weasyprint(html: &str, output: &Path) -> Result<(), HtmlError> {
    let html_file = tempfile::Builder::new()
        .prefix("storybook_")
        .suffix(".html")
        .tempfile()?;
    std::fs::write(html_file.path(), html)?;

    let result = tokio::process::Command::new("weasyprint")
        .arg(html_file.path())
        .arg(output)
        .output()
        .await
        .map_err(HtmlError::NotFound)?;

    if !result.status.success() {
        return Err(HtmlError::ExecutionFailed {
            exit_code: result.status.code(),
            stderr: String::from_utf8_lossy(&result.stderr).to_string(),
        });
    }

    tracing::info!(output = %output.display(), "Rendered PDF via weasyprint");
    Ok(())
}

/// Build the HTML and render it.
pub async fn render_html(
    args: &StorybookArgs,
    document: &StoryDocument,
    images: &[Option<PageImage>],
    output: &Path,
) -> Result<(), HtmlError> {
    let html = generate_html(args, document, images);
    render_with_weasyprint(&html, output).await
}
