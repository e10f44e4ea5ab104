//! CLI options for the storybook assembler.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Which rendering engine produces the PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Engine {
    /// Direct PDF drawing primitives.
    Draw,
    /// HTML/CSS rendered through an external converter.
    Html,
}

/// Vertical alignment of a front-matter page's text block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VAlign {
    Top,
    Middle,
    Bottom,
}

impl VAlign {
    /// CSS helper-class suffix.
    pub fn as_css(self) -> &'static str {
        match self {
            VAlign::Top => "top",
            VAlign::Middle => "middle",
            VAlign::Bottom => "bottom",
        }
    }
}

/// Generate a storybook PDF from JSON story data.
#[derive(Debug, Parser)]
#[command(name = "storyloom-pdf")]
#[command(about = "Assemble a print-ready storybook PDF from {text, image_url} pages")]
pub struct StorybookArgs {
    /// Path to the JSON file containing story data.
    #[arg(long)]
    pub data_file: PathBuf,

    /// Path to save the generated PDF file.
    #[arg(long)]
    pub output_file: PathBuf,

    /// Rendering engine.
    #[arg(long, value_enum, default_value = "draw")]
    pub engine: Engine,

    // -- page geometry --
    /// Page trim width in millimeters.
    #[arg(long)]
    pub width_mm: f64,

    /// Page trim height in millimeters.
    #[arg(long)]
    pub height_mm: f64,

    /// Bleed in millimeters for each outer edge (html engine).
    #[arg(long, default_value_t = 0.0)]
    pub bleed_mm: f64,

    /// DPI for image placement.
    #[arg(long, default_value_t = 300)]
    pub dpi: u32,

    /// Draw crop marks (html engine).
    #[arg(long)]
    pub show_bleed_marks: bool,

    // -- content --
    /// Text for the title page (html engine; empty = no title page).
    #[arg(long, default_value = "")]
    pub title_page_text: String,

    /// Text for the copyright page (html engine; empty = omitted).
    #[arg(long, default_value = "")]
    pub copyright_text: String,

    /// Text for the introduction page (html engine; empty = omitted).
    #[arg(long, default_value = "")]
    pub introduction_text: String,

    /// Optional wallpaper image behind story text pages.
    #[arg(long)]
    pub wallpaper_file: Option<PathBuf>,

    // -- styling --
    /// Logical name for the font.
    #[arg(long)]
    pub font_name: String,

    /// Path to the .ttf font file.
    #[arg(long)]
    pub font_file: PathBuf,

    #[arg(long, default_value_t = 14.0)]
    pub font_size_main: f64,

    #[arg(long, default_value_t = 10.0)]
    pub font_size_footer: f64,

    #[arg(long, default_value_t = 24.0)]
    pub font_size_title: f64,

    #[arg(long, default_value_t = 8.0)]
    pub font_size_copyright: f64,

    #[arg(long, default_value_t = 12.0)]
    pub font_size_introduction: f64,

    /// Hex color for main story text.
    #[arg(long, default_value = "#000000")]
    pub color_main: String,

    /// Hex color for the footer page numbers.
    #[arg(long, default_value = "#808080")]
    pub color_footer: String,

    /// Hex color for the title page text.
    #[arg(long, default_value = "#1E1E64")]
    pub color_title: String,

    #[arg(long, default_value = "#000000")]
    pub color_copyright: String,

    #[arg(long, default_value = "#000000")]
    pub color_introduction: String,

    // -- alignment and margins --
    #[arg(long, value_enum, default_value = "middle")]
    pub valign_title: VAlign,

    #[arg(long, default_value_t = 25.4)]
    pub margin_horizontal_title_mm: f64,

    #[arg(long, value_enum, default_value = "bottom")]
    pub valign_copyright: VAlign,

    #[arg(long, default_value_t = 25.4)]
    pub margin_horizontal_copyright_mm: f64,

    #[arg(long, value_enum, default_value = "top")]
    pub valign_introduction: VAlign,

    #[arg(long, default_value_t = 25.4)]
    pub margin_horizontal_introduction_mm: f64,

    /// Horizontal margin for main story text pages in mm.
    #[arg(long, default_value_t = 19.0)]
    pub margin_horizontal_main_mm: f64,

    /// Bottom margin for page numbers in mm.
    #[arg(long, default_value_t = 12.7)]
    pub page_number_margin_bottom_mm: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Vec<&'static str> {
        vec![
            "storyloom-pdf",
            "--data-file",
            "story.json",
            "--output-file",
            "out.pdf",
            "--width-mm",
            "216",
            "--height-mm",
            "216",
            "--font-name",
            "Storybook",
            "--font-file",
            "font.ttf",
        ]
    }

    #[test]
    fn minimal_invocation_parses() {
        let args = StorybookArgs::parse_from(base_args());
        assert_eq!(args.engine, Engine::Draw);
        assert_eq!(args.dpi, 300);
        assert_eq!(args.valign_copyright, VAlign::Bottom);
        assert_eq!(args.margin_horizontal_main_mm, 19.0);
    }

    #[test]
    fn engine_and_bleed_options() {
        let mut argv = base_args();
        argv.extend([
            "--engine",
            "html",
            "--bleed-mm",
            "3",
            "--show-bleed-marks",
            "--valign-title",
            "top",
        ]);
        let args = StorybookArgs::parse_from(argv);
        assert_eq!(args.engine, Engine::Html);
        assert_eq!(args.bleed_mm, 3.0);
        assert!(args.show_bleed_marks);
        assert_eq!(args.valign_title, VAlign::Top);
    }

    #[test]
    fn valign_css_suffixes() {
        assert_eq!(VAlign::Top.as_css(), "top");
        assert_eq!(VAlign::Middle.as_css(), "middle");
        assert_eq!(VAlign::Bottom.as_css(), "bottom");
    }
}
