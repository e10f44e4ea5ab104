//! Storybook PDF assembly.
//!
//! Takes a story document — ordered {text, image_url} pages plus
//! optional front-matter — and produces a print-ready PDF through one
//! of two engines: direct drawing primitives, or an HTML/CSS document
//! rendered by an external browser-engine converter. Page geometry is
//! given in millimeters with optional bleed for print runs.

pub mod cli;
pub mod document;
pub mod draw;
pub mod fetch;
pub mod html;
pub mod layout;
