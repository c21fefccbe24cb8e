//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use crate::Palette;
use nodeblast::TileType;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Tile and UI colours loaded from a theme file.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Tile colours in `TileType` order: blue, green, orange, pink, purple, red, yellow.
    pub tiles: [Color; 7],
    /// Normal cell background.
    pub bg: Color,
    /// Holes in the board.
    pub void: Color,
    /// Grid / border.
    pub div_line: Color,
    /// Text (moves, goals).
    pub main_fg: Color,
    /// Highlight / titles.
    pub title: Color,
    /// Secondary text and key hints.
    pub inactive_fg: Color,
    pub wood: Color,
    pub ice: Color,
    pub cursor: Color,
    /// Cell picked as the first half of a board swap.
    pub marked: Color,
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

impl Theme {
    /// One Dark defaults, with orange and pink filled in from the same family.
    pub fn onedark_default() -> Self {
        Self {
            tiles: [
                Color::Rgb(0x61, 0xAF, 0xEF), // blue
                Color::Rgb(0x98, 0xC3, 0x79), // green
                Color::Rgb(0xD1, 0x9A, 0x66), // orange
                Color::Rgb(0xE8, 0x8E, 0xC4), // pink
                Color::Rgb(0xC6, 0x78, 0xDD), // purple
                Color::Rgb(0xE0, 0x6C, 0x75), // red
                Color::Rgb(0xE5, 0xC0, 0x7B), // yellow
            ],
            bg: Color::Rgb(0x31, 0x35, 0x3F),
            void: Color::Rgb(0x21, 0x25, 0x2B),
            div_line: Color::Rgb(0x3F, 0x44, 0x4F),
            main_fg: Color::Rgb(0xAB, 0xB2, 0xBF),
            title: Color::Rgb(0xE5, 0xC0, 0x7B),
            inactive_fg: Color::Rgb(0x5C, 0x63, 0x70),
            wood: Color::Rgb(0x8B, 0x5A, 0x2B),
            ice: Color::Rgb(0xB4, 0xE4, 0xF4),
            cursor: Color::Rgb(0xFF, 0xFF, 0xFF),
            marked: Color::Rgb(0x56, 0xB6, 0xC2),
        }
    }

    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// Falls back to One Dark defaults if path is None or the file is missing.
    pub fn load(path: Option<&Path>, palette: Palette) -> Result<Self, ThemeError> {
        let path = match path {
            Some(p) if p.exists() => p,
            _ => return Ok(Self::default_for_palette(palette)),
        };
        let s = std::fs::read_to_string(path)?;
        let map = parse_theme_file(&s);
        let mut theme = Self::from_map(&map);
        theme.apply_palette(palette);
        Ok(theme)
    }

    fn default_for_palette(palette: Palette) -> Self {
        let mut t = Self::onedark_default();
        t.apply_palette(palette);
        t
    }

    /// Override tile colours for high-contrast or colorblind play.
    pub fn apply_palette(&mut self, palette: Palette) {
        match palette {
            Palette::Normal => {}
            Palette::HighContrast => {
                self.tiles = [
                    Color::Rgb(0x00, 0x88, 0xFF),
                    Color::Rgb(0x00, 0xFF, 0x00),
                    Color::Rgb(0xFF, 0x88, 0x00),
                    Color::Rgb(0xFF, 0x88, 0xCC),
                    Color::Rgb(0xAA, 0x00, 0xFF),
                    Color::Rgb(0xFF, 0x00, 0x00),
                    Color::Rgb(0xFF, 0xFF, 0x00),
                ];
            }
            Palette::Colorblind => {
                // Tol's bright scheme plus grey for the seventh colour.
                self.tiles = [
                    Color::Rgb(0x44, 0x77, 0xAA),
                    Color::Rgb(0x22, 0x88, 0x33),
                    Color::Rgb(0xEE, 0x77, 0x33),
                    Color::Rgb(0xEE, 0x66, 0x77),
                    Color::Rgb(0xAA, 0x33, 0x77),
                    Color::Rgb(0xBB, 0xBB, 0xBB),
                    Color::Rgb(0xCC, 0xBB, 0x44),
                ];
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| map.get(*k).and_then(|v| parse_hex(v).ok()))
        };
        let d = Self::onedark_default();
        // `tile_<colour>` keys win; otherwise borrow the btop key with the closest hue.
        let fallbacks: [&[&str]; 7] = [
            &["tile_blue", "cpu_box"],
            &["tile_green", "mem_box", "cpu_start"],
            &["tile_orange", "temp_mid"],
            &["tile_pink", "proc_box"],
            &["tile_purple", "net_box"],
            &["tile_red", "cpu_end", "temp_end"],
            &["tile_yellow", "title", "cpu_mid"],
        ];
        let mut tiles = d.tiles;
        for (slot, keys) in tiles.iter_mut().zip(fallbacks) {
            if let Some(c) = get(keys) {
                *slot = c;
            }
        }
        Self {
            tiles,
            bg: get(&["meter_bg"]).unwrap_or(d.bg),
            void: get(&["main_bg"]).unwrap_or(d.void),
            div_line: get(&["div_line"]).unwrap_or(d.div_line),
            main_fg: get(&["main_fg"]).unwrap_or(d.main_fg),
            title: get(&["title"]).unwrap_or(d.title),
            inactive_fg: get(&["inactive_fg"]).unwrap_or(d.inactive_fg),
            wood: get(&["wood"]).unwrap_or(d.wood),
            ice: get(&["ice"]).unwrap_or(d.ice),
            cursor: get(&["selected_bg", "hi_fg"]).unwrap_or(d.cursor),
            marked: get(&["proc_misc"]).unwrap_or(d.marked),
        }
    }

    #[inline]
    pub fn tile_color(&self, tile_type: TileType) -> Color {
        self.tiles[tile_type.index()]
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(stripped) = line.strip_prefix("theme[") else {
            continue;
        };
        let Some(end) = stripped.find(']') else {
            continue;
        };
        let key = stripped[..end].trim();
        let rest = stripped[end + 1..].trim();
        if let Some(value) = rest.strip_prefix('=') {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            if !value.is_empty() {
                map.insert(key.to_string(), value.to_string());
            }
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(s.to_string());
    let channel = |hex: &str| u8::from_str_radix(hex, 16).map_err(|_| invalid());
    let (r, g, b) = match s.len() {
        _ if !s.is_ascii() => return Err(invalid()),
        6 => (channel(&s[0..2])?, channel(&s[2..4])?, channel(&s[4..6])?),
        3 => (
            channel(&s[0..1])? * 17,
            channel(&s[1..2])? * 17,
            channel(&s[2..3])? * 17,
        ),
        _ => return Err(invalid()),
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
    fn test_tile_key_beats_btop_fallback() {
        let map = parse_theme_file(
            r##"
theme[cpu_end]="#FF0000"
theme[tile_red]="#00FF00"
theme[net_box]="#0000FF"
"##,
        );
        let theme = Theme::from_map(&map);
        assert_eq!(theme.tile_color(TileType::Red), Color::Rgb(0, 0xFF, 0));
        assert_eq!(theme.tile_color(TileType::Purple), Color::Rgb(0, 0, 0xFF));
        assert_eq!(theme.bg, Theme::onedark_default().bg);
    }
}
