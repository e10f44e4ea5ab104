//! Standard aspect-ratio snapping for hosted models that take a ratio
//! name instead of pixel dimensions.

/// The ratio names hosted APIs accept, with their numeric values.
const STANDARD_RATIOS: &[(&str, f64)] = &[
    ("1:1", 1.0),
    ("16:9", 16.0 / 9.0),
    ("4:3", 4.0 / 3.0),
    ("3:2", 3.0 / 2.0),
    ("2:3", 2.0 / 3.0),
    ("3:4", 3.0 / 4.0),
    ("9:16", 9.0 / 16.0),
    ("21:9", 21.0 / 9.0),
];

/// Snap a width/height pair to the closest standard aspect ratio name.
///
/// A zero height yields `"1:1"` rather than dividing by zero.
pub fn closest_aspect_ratio(width: u32, height: u32) -> &'static str {
    if height == 0 {
        return "1:1";
    }
    let actual = width as f64 / height as f64;
    STANDARD_RATIOS
        .iter()
        .min_by(|(_, a), (_, b)| {
            (a - actual)
                .abs()
                .partial_cmp(&(b - actual).abs())
                .expect("ratios are finite")
        })
        .map(|(name, _)| *name)
        .expect("ratio table is non-empty")
}
