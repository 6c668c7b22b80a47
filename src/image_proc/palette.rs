//! Spectra 7-color palette and nearest-color search.
//!
//! The palette approximates the ink colors as they actually look on the
//! panel (the "black" is not pure black, the "white" is paper), so the
//! simulated preview is closer to the physical result than a pure RGB cube
//! palette would be.

/// Ink colors in canonical palette order.
///
/// The order matters: the nearest-color search resolves ties in favour of
/// the earlier entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Black,
    White,
    Red,
    Green,
    Blue,
    Yellow,
    Orange,
}

/// RGB value of each ink color, indexed by [`Color::index`]
pub const SPECTRA_PALETTE: [(u8, u8, u8); 7] = [
    (25, 25, 30),    // Black
    (252, 250, 244), // White (paper)
    (225, 20, 35),   // Red
    (0, 140, 60),    // Green
    (10, 50, 180),   // Blue
    (255, 215, 0),   // Yellow
    (255, 115, 0),   // Orange
];

/// Per-channel weights for the squared distance.
/// They intentionally do not sum to 1; green carries the most weight.
pub const W_R: f64 = 0.29;
pub const W_G: f64 = 0.55;
pub const W_B: f64 = 0.45;

impl Color {
    /// All colors in canonical order
    pub fn all() -> &'static [Color; 7] {
        &[
            Color::Black,
            Color::White,
            Color::Red,
            Color::Green,
            Color::Blue,
            Color::Yellow,
            Color::Orange,
        ]
    }

    /// Position in the canonical palette
    pub fn index(self) -> usize {
        match self {
            Color::Black => 0,
            Color::White => 1,
            Color::Red => 2,
            Color::Green => 3,
            Color::Blue => 4,
            Color::Yellow => 5,
            Color::Orange => 6,
        }
    }

    pub fn rgb(self) -> (u8, u8, u8) {
        SPECTRA_PALETTE[self.index()]
    }

    /// 4-bit color code understood by the EPD7IN3E controller
    pub fn panel_code(self) -> u8 {
        match self {
            Color::Black => 0,
            Color::White => 1,
            Color::Yellow => 2,
            Color::Red => 3,
            Color::Orange => 4,
            Color::Blue => 5,
            Color::Green => 6,
        }
    }

    /// Exact reverse lookup of a palette RGB value
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Option<Color> {
        Color::all().iter().copied().find(|c| c.rgb() == (r, g, b))
    }

    /// Get color name for logging
    pub fn name(self) -> &'static str {
        match self {
            Color::Black => "Black",
            Color::White => "White",
            Color::Red => "Red",
            Color::Green => "Green",
            Color::Blue => "Blue",
            Color::Yellow => "Yellow",
            Color::Orange => "Orange",
        }
    }
}

/// Weighted squared distance between a working-buffer triple and a palette color.
///
/// Each difference is squared before it is weighted.
#[inline]
pub fn color_distance(r: f64, g: f64, b: f64, color: Color) -> f64 {
    let (pr, pg, pb) = color.rgb();
    let dr = r - pr as f64;
    let dg = g - pg as f64;
    let db = b - pb as f64;
    W_R * (dr * dr) + W_G * (dg * dg) + W_B * (db * db)
}

/// Find the nearest palette color under the weighted distance.
///
/// Inputs may lie outside [0, 255] once diffused error has been added.
/// On equal distance the earlier palette entry is kept.
#[inline]
pub fn nearest_color(r: f64, g: f64, b: f64) -> Color {
    let mut closest = Color::Black;
    let mut min_dist = f64::INFINITY;

    for &color in Color::all() {
        let dist = color_distance(r, g, b, color);
        if dist < min_dist {
            min_dist = dist;
            closest = color;
        }
    }
    closest
}
