//! Bitmap fonts: BMFont text parsing, glyph extraction and placement tables.
//!
//! Glyphs go through the same processing and packing as sprites. After the
//! atlas is laid out every character gets a [`GlyphPlacement`] recording where
//! its trimmed pixels ended up and how far the trim moved them from the
//! glyph's original origin, so baselines survive trimming.

use std::collections::HashMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::{BakeError, Result};
use crate::geometry::{PlacedTile, UvRect};
use crate::model::Rect;

/// One `char` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FontChar {
    pub id: u32,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub xoffset: i32,
    pub yoffset: i32,
    pub xadvance: i32,
    /// Colour channel of packed fonts (0 = blue, 1 = green, 2 = red, 3 = alpha).
    pub channel: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kerning {
    pub first: u32,
    pub second: u32,
    pub amount: i32,
}

/// Parsed font description. Sizes are in pixels of the glyph sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FontDefinition {
    pub line_height: i32,
    pub scale_w: u32,
    pub scale_h: u32,
    pub packed: bool,
    pub page_file: Option<String>,
    pub chars: Vec<FontChar>,
    pub kernings: Vec<Kerning>,
}

/// Splits a line into `key=value` tokens, honouring double quotes.
fn tokenize(line: &str) -> (&str, Vec<(&str, &str)>) {
    let line = line.trim();
    let (tag, mut rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let mut pairs = Vec::new();
    loop {
        rest = rest.trim_start();
        let Some(eq) = rest.find('=') else { break };
        let key = rest[..eq].trim();
        let after = &rest[eq + 1..];
        let (value, tail) = if let Some(quoted) = after.strip_prefix('"') {
            match quoted.find('"') {
                Some(end) => (&quoted[..end], &quoted[end + 1..]),
                None => (quoted, ""),
            }
        } else {
            let end = after.find(char::is_whitespace).unwrap_or(after.len());
            (&after[..end], &after[end..])
        };
        pairs.push((key, value));
        rest = tail;
    }
    (tag, pairs)
}

struct Fields<'a> {
    line: usize,
    pairs: Vec<(&'a str, &'a str)>,
}

impl<'a> Fields<'a> {
    fn raw(&self, key: &str) -> Option<&'a str> {
        self.pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }

    fn int(&self, key: &str) -> Result<i64> {
        let v = self.raw(key).ok_or_else(|| BakeError::FontParse {
            line: self.line,
            message: format!("missing `{key}`"),
        })?;
        v.parse().map_err(|_| BakeError::FontParse {
            line: self.line,
            message: format!("`{key}` is not an integer: {v:?}"),
        })
    }

    fn int_or(&self, key: &str, default: i64) -> Result<i64> {
        match self.raw(key) {
            Some(_) => self.int(key),
            None => Ok(default),
        }
    }

    fn i32(&self, key: &str) -> Result<i32> {
        Ok(self.int(key)? as i32)
    }
}

/// Parses the BMFont text format (`info`/`common`/`page`/`chars`/`char`/
/// `kernings`/`kerning` lines). Only single-page fonts are accepted.
pub fn parse_bmfont(text: &str) -> Result<FontDefinition> {
    let mut def = FontDefinition::default();
    let mut saw_common = false;
    for (i, raw) in text.lines().enumerate() {
        let (tag, pairs) = tokenize(raw);
        let f = Fields { line: i + 1, pairs };
        match tag {
            "common" => {
                def.line_height = f.i32("lineHeight")?;
                def.scale_w = f.int("scaleW")?.max(0) as u32;
                def.scale_h = f.int("scaleH")?.max(0) as u32;
                let pages = f.int("pages")?;
                if pages != 1 {
                    return Err(BakeError::FontParse {
                        line: f.line,
                        message: format!("only single-page fonts are supported, found {pages} pages"),
                    });
                }
                def.packed = f.int_or("packed", 0)? != 0;
                saw_common = true;
            }
            "page" => {
                def.page_file = f.raw("file").map(str::to_owned);
            }
            "char" => {
                let id = f.int("id")?;
                let channel = if def.packed {
                    let chnl = f.int_or("chnl", 15)?.max(1) as f32;
                    chnl.log2().round() as u8
                } else {
                    0
                };
                def.chars.push(FontChar {
                    id: if id < 0 { 0 } else { id as u32 },
                    x: f.i32("x")?,
                    y: f.i32("y")?,
                    width: f.i32("width")?,
                    height: f.i32("height")?,
                    xoffset: f.i32("xoffset")?,
                    yoffset: f.i32("yoffset")?,
                    xadvance: f.i32("xadvance")?,
                    channel,
                });
            }
            "kerning" => def.kernings.push(Kerning {
                first: f.int("first")?.max(0) as u32,
                second: f.int("second")?.max(0) as u32,
                amount: f.i32("amount")?,
            }),
            _ => {}
        }
    }
    if !saw_common {
        return Err(BakeError::FontParse {
            line: 0,
            message: "no `common` line".into(),
        });
    }
    Ok(def)
}

/// Rect of `c` on the (rescaled) glyph sheet, or `None` for empty glyphs.
pub fn glyph_rect(c: &FontChar, def: &FontDefinition, flip_texture_y: bool, rescale: f32, sheet: (u32, u32)) -> Option<Rect> {
    if c.width <= 0 || c.height <= 0 {
        return None;
    }
    let y = if flip_texture_y {
        def.scale_h as i32 - c.y - c.height
    } else {
        c.y
    };
    let x0 = ((c.x as f32 * rescale) as i64).max(0) as u32;
    let y0 = ((y as f32 * rescale) as i64).max(0) as u32;
    let w = (c.width as f32 * rescale) as u32;
    let h = (c.height as f32 * rescale) as u32;
    let x1 = (x0 + w).min(sheet.0);
    let y1 = (y0 + h).min(sheet.1);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some(Rect::new(x0, y0, x1 - x0, y1 - y0))
}

/// Where one character lives in the baked atlas.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GlyphPlacement {
    pub id: u32,
    pub page: usize,
    /// Content rect on the page, pad excluded (footprint, so post-flip).
    pub tex_x: u32,
    pub tex_y: u32,
    pub tex_w: u32,
    pub tex_h: u32,
    /// Trim offset from the glyph's left edge and from its bottom edge, rescaled pixels.
    pub offset_x: i32,
    pub offset_y: i32,
    pub flipped: bool,
    pub uv: [f32; 4],
    /// Quad corners relative to the pen position (top-left, bottom-right), y up.
    pub p0: Vec2,
    pub p1: Vec2,
    pub advance: i32,
    pub channel: u8,
}

/// Per-font lookup table produced by a bake.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FontTable {
    pub name: String,
    pub line_height: i32,
    pub texture_scale: f32,
    pub glyphs: Vec<GlyphPlacement>,
    pub kernings: Vec<Kerning>,
    /// Fallback for characters the font does not define.
    pub missing: GlyphPlacement,
    #[serde(skip)]
    index: HashMap<u32, usize>,
}

impl FontTable {
    /// Placement of `id`, falling back to the missing-glyph tile.
    pub fn glyph(&self, id: u32) -> &GlyphPlacement {
        self.index
            .get(&id)
            .map(|&i| &self.glyphs[i])
            .unwrap_or(&self.missing)
    }

    pub fn kerning(&self, first: u32, second: u32) -> i32 {
        self.kernings
            .iter()
            .find(|k| k.first == first && k.second == second)
            .map_or(0, |k| k.amount)
    }

    /// Pen advance for a string, kerning included.
    pub fn measure(&self, text: &str) -> i32 {
        let mut prev: Option<u32> = None;
        let mut width = 0;
        for ch in text.chars() {
            let id = ch as u32;
            if let Some(p) = prev {
                width += self.kerning(p, id);
            }
            width += self.glyph(id).advance;
            prev = Some(id);
        }
        width
    }
}

fn uv_array(r: UvRect) -> [f32; 4] {
    [r.u0, r.v0, r.u1, r.v1]
}

fn placed_glyph(c: &FontChar, def: &FontDefinition, flip_texture_y: bool, rescale: f32, placed: &PlacedTile) -> GlyphPlacement {
    let (tile, entry) = (placed.tile, placed.entry);
    let pad = tile.pad;
    let trim = tile.trim;
    let offset_x = trim.x as i32;
    let offset_y = if flip_texture_y {
        trim.y as i32
    } else {
        tile.source_size.1 as i32 - trim.h as i32 - trim.y as i32
    };
    let (tex_w, tex_h) = (entry.w.saturating_sub(2 * pad), entry.h.saturating_sub(2 * pad));
    let (w, h) = if entry.flipped { (tex_h, tex_w) } else { (tex_w, tex_h) };
    let p0 = Vec2::new(
        c.xoffset as f32 + offset_x as f32 / rescale,
        (def.line_height - c.yoffset) as f32 - offset_y as f32 / rescale,
    );
    let size = Vec2::new(w as f32, -(h as f32)) / rescale;
    GlyphPlacement {
        id: c.id,
        page: entry.page,
        tex_x: entry.x + pad,
        tex_y: entry.y + pad,
        tex_w,
        tex_h,
        offset_x,
        offset_y,
        flipped: entry.flipped,
        uv: uv_array(placed.uv_rect()),
        p0,
        p1: p0 + size,
        advance: c.xadvance,
        channel: c.channel,
    }
}

fn fallback_glyph(id: u32, advance: i32, channel: u8, missing: &PlacedTile) -> GlyphPlacement {
    let (e, pad) = (missing.entry, missing.tile.pad);
    GlyphPlacement {
        id,
        page: e.page,
        tex_x: e.x + pad,
        tex_y: e.y + pad,
        tex_w: 0,
        tex_h: 0,
        offset_x: 0,
        offset_y: 0,
        flipped: false,
        uv: uv_array(missing.uv_rect()),
        p0: Vec2::ZERO,
        p1: Vec2::ZERO,
        advance,
        channel,
    }
}

/// Builds the table for one font. `placed` holds the glyphs that produced a
/// tile; every other character points at `missing`.
pub fn build_font_table(
    name: &str,
    def: &FontDefinition,
    flip_texture_y: bool,
    rescale: f32,
    placed: &HashMap<u32, PlacedTile>,
    missing: &PlacedTile,
) -> FontTable {
    let mut glyphs = Vec::with_capacity(def.chars.len());
    let mut index = HashMap::with_capacity(def.chars.len());
    for c in &def.chars {
        let g = match placed.get(&c.id) {
            Some(p) => placed_glyph(c, def, flip_texture_y, rescale, p),
            None => fallback_glyph(c.id, c.xadvance, c.channel, missing),
        };
        index.insert(c.id, glyphs.len());
        glyphs.push(g);
    }
    FontTable {
        name: name.to_owned(),
        line_height: def.line_height,
        texture_scale: rescale,
        glyphs,
        kernings: def.kernings.clone(),
        missing: fallback_glyph(u32::MAX, 0, 0, missing),
        index,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"info face="Sample Font" size=32 bold=0
common lineHeight=36 base=29 scaleW=64 scaleH=32 pages=1 packed=0
page id=0 file="sample font.png"
chars count=2
char id=65 x=0 y=0 width=10 height=12 xoffset=1 yoffset=4 xadvance=11 page=0 chnl=15
char id=-1 x=12 y=0 width=0 height=0 xoffset=0 yoffset=0 xadvance=8 page=0 chnl=15
kernings count=1
kerning first=65 second=65 amount=-2
"#;

    #[test]
    fn parses_text_format() {
        let def = parse_bmfont(SAMPLE).expect("parse");
        assert_eq!(def.line_height, 36);
        assert_eq!((def.scale_w, def.scale_h), (64, 32));
        assert_eq!(def.page_file.as_deref(), Some("sample font.png"));
        assert_eq!(def.chars.len(), 2);
        assert_eq!(def.chars[1].id, 0);
        assert_eq!(def.kernings[0].amount, -2);
    }

    #[test]
    fn rejects_multi_page_fonts() {
        let text = "common lineHeight=10 scaleW=8 scaleH=8 pages=2\n";
        let err = parse_bmfont(text).unwrap_err();
        assert!(matches!(err, BakeError::FontParse { line: 1, .. }));
    }

    #[test]
    fn packed_channel_is_log2() {
        let text = "common lineHeight=10 scaleW=8 scaleH=8 pages=1 packed=1\n\
                    char id=1 x=0 y=0 width=1 height=1 xoffset=0 yoffset=0 xadvance=1 chnl=4\n";
        let def = parse_bmfont(text).expect("parse");
        assert_eq!(def.chars[0].channel, 2);
    }

    #[test]
    fn flipped_sheet_rects_count_from_the_bottom() {
        let def = parse_bmfont(SAMPLE).expect("parse");
        let r = glyph_rect(&def.chars[0], &def, true, 1.0, (64, 32)).expect("rect");
        assert_eq!(r, Rect::new(0, 20, 10, 12));
        assert!(glyph_rect(&def.chars[1], &def, false, 1.0, (64, 32)).is_none());
    }
}
