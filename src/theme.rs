//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use cogtui::PieceColor;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// One Dark palette and UI colours loaded from a theme file.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Piece colours indexed by `PieceColor::index()`: red, blue, green, yellow, purple, orange.
    pub pieces: [Color; 6],
    /// Board background.
    pub bg: Color,
    /// Grid / border.
    pub div_line: Color,
    /// Text (score, moves).
    pub main_fg: Color,
    /// Highlight / titles.
    pub title: Color,
    /// Links between meshed gears.
    pub gear_link: Color,
    /// Secondary text (key help).
    pub inactive_fg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::onedark_default()
    }
}

/// Fallback hex per piece colour, in `PieceColor::index()` order.
const PIECE_HEX: [&str; 6] = ["#E06C75", "#61AFEF", "#98C379", "#E5C07B", "#C678DD", "#D19A66"];

/// Theme keys tried per piece colour, in `PieceColor::index()` order.
const PIECE_KEYS: [&[&str]; 6] = [
    &["cpu_end", "temp_end"],
    &["cpu_box"],
    &["mem_box", "cpu_start"],
    &["title", "cpu_mid"],
    &["net_box"],
    &["proc_misc", "used_end"],
];

impl Theme {
    /// One Dark defaults.
    pub fn onedark_default() -> Self {
        Self {
            pieces: PIECE_HEX.map(hex_or_gray),
            bg: hex_or_gray("#31353F"),
            div_line: hex_or_gray("#3F444F"),
            main_fg: hex_or_gray("#ABB2BF"),
            title: hex_or_gray("#E5C07B"),
            gear_link: hex_or_gray("#ABB2BF"),
            inactive_fg: hex_or_gray("#5C6370"),
        }
    }

    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// Falls back to One Dark defaults if path is None or the file does not exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ThemeError> {
        let path = match path {
            Some(p) if p.exists() => p,
            _ => return Ok(Self::default()),
        };
        let s = std::fs::read_to_string(path)?;
        let map = parse_theme_file(&s);
        Ok(Self::from_map(&map))
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| {
            map.get(key)
                .and_then(|v| parse_hex(v.trim_matches('"').trim_matches('\'').trim()).ok())
        };
        let defaults = Self::onedark_default();
        let mut pieces = defaults.pieces;
        for (slot, keys) in pieces.iter_mut().zip(PIECE_KEYS) {
            if let Some(c) = keys.iter().find_map(|&k| get(k)) {
                *slot = c;
            }
        }
        Self {
            pieces,
            bg: get("meter_bg").unwrap_or(defaults.bg),
            div_line: get("div_line").unwrap_or(defaults.div_line),
            main_fg: get("main_fg").unwrap_or(defaults.main_fg),
            title: get("title").unwrap_or(defaults.title),
            gear_link: get("hi_fg").or_else(|| get("main_fg")).unwrap_or(defaults.gear_link),
            inactive_fg: get("inactive_fg").unwrap_or(defaults.inactive_fg),
        }
    }

    #[inline]
    pub fn piece_color(&self, color: PieceColor) -> Color {
        self.pieces[color.index() as usize % 6]
    }
}

fn hex_or_gray(s: &str) -> Color {
    parse_hex(s).unwrap_or(Color::Gray)
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(stripped) = line.strip_prefix("theme[") {
            if let Some(end) = stripped.find(']') {
                let key = stripped[..end].trim();
                let rest = stripped[end + 1..].trim();
                if let Some(eq) = rest.find('=') {
                    let value = rest[eq + 1..]
                        .trim()
                        .trim_matches('"')
                        .trim_matches('\'')
                        .to_string();
                    if !value.is_empty() {
                        map.insert(key.to_string(), value);
                    }
                }
            }
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&s[range], 16).map_err(|_| ThemeError::InvalidHex(s.to_string()))
    };
    let (r, g, b) = match s.len() {
        6 if s.is_ascii() => (channel(0..2)?, channel(2..4)?, channel(4..6)?),
        3 if s.is_ascii() => (channel(0..1)? * 17, channel(1..2)? * 17, channel(2..3)? * 17),
        _ => return Err(ThemeError::InvalidHex(s.to_string())),
    };
    Ok(Color::Rgb(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_6() {
        let c = parse_hex("#98C379").unwrap();
        assert!(matches!(c, Color::Rgb(0x98, 0xC3, 0x79)));
    }

    #[test]
    fn test_parse_hex_3() {
        let c = parse_hex("#FFF").unwrap();
        assert!(matches!(c, Color::Rgb(255, 255, 255)));
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert!(parse_hex("#12345").is_err());
        assert!(parse_hex("#GGGGGG").is_err());
    }

    #[test]
    fn test_parse_theme_line() {
        let map = parse_theme_file(r##"theme[meter_bg]="#31353F""##);
        assert_eq!(map.get("meter_bg"), Some(&"#31353F".to_string()));
    }

    #[test]
    fn test_theme_keys_override_piece_colours() {
        let map = parse_theme_file("theme[cpu_box]=\"#000080\"\ntheme[net_box]='#FF00FF'");
        let theme = Theme::from_map(&map);
        assert_eq!(theme.piece_color(PieceColor::Blue), Color::Rgb(0, 0, 0x80));
        assert_eq!(theme.piece_color(PieceColor::Purple), Color::Rgb(255, 0, 255));
        assert_eq!(theme.piece_color(PieceColor::Red), Theme::default().piece_color(PieceColor::Red));
    }
}
