use atlas_baker_core::font::parse_bmfont;
use atlas_baker_core::{BakeConfig, BakeInput, FontRequest, SourceRef, SpriteRequest, bake};
use image::{Rgba, RgbaImage};

const FNT: &str = r#"info face="Test Sans" size=12 bold=0 italic=0
common lineHeight=14 base=11 scaleW=64 scaleH=32 pages=1 packed=0
page id=0 file="test_0.png"
chars count=2
char id=65 x=0 y=0 width=10 height=12 xoffset=1 yoffset=2 xadvance=10 page=0 chnl=15
char id=32 x=0 y=0 width=0 height=0 xoffset=0 yoffset=0 xadvance=4 page=0 chnl=15
kernings count=1
kerning first=65 second=65 amount=-2
"#;

/// 64x32 sheet; glyph 'A' occupies (0,0,10,12) with ink in x 2..8, y 3..12.
fn sheet() -> RgbaImage {
    RgbaImage::from_fn(64, 32, |x, y| {
        if (2..8).contains(&x) && (3..12).contains(&y) {
            Rgba([(x * 20) as u8, (y * 20) as u8, 128, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}

fn font_input(with_sprite: bool) -> BakeInput {
    let mut textures = vec![sheet()];
    let mut sprites = Vec::new();
    if with_sprite {
        textures.push(RgbaImage::from_pixel(8, 8, Rgba([255, 0, 0, 255])));
        sprites.push(SpriteRequest::new("red", SourceRef::Texture(1)));
    }
    BakeInput {
        textures,
        sprites,
        fonts: vec![FontRequest {
            name: "test".into(),
            texture: 0,
            definition: parse_bmfont(FNT).expect("parse"),
            flip_texture_y: false,
        }],
    }
}

#[test]
fn glyph_is_trimmed_and_offset_from_the_bottom() {
    let cfg = BakeConfig::builder().allow_rotation(false).build();
    let out = bake(font_input(true), &cfg).expect("bake");
    assert_eq!(out.fonts.len(), 1);
    let table = &out.fonts[0];
    let a = table.glyph(65);
    assert_eq!(a.id, 65);
    assert_eq!((a.offset_x, a.offset_y), (2, 0));
    assert_eq!((a.tex_w, a.tex_h), (6, 9));
    assert!(!a.flipped);
    assert_eq!(a.advance, 10);

    let src = sheet();
    let page = &out.pages[a.page].rgba;
    for j in 0..a.tex_h {
        for i in 0..a.tex_w {
            assert_eq!(page.get_pixel(a.tex_x + i, a.tex_y + j), src.get_pixel(2 + i, 3 + j));
        }
    }
}

#[test]
fn glyph_quad_is_relative_to_the_pen() {
    let cfg = BakeConfig::builder().allow_rotation(false).build();
    let out = bake(font_input(false), &cfg).expect("bake");
    let a = out.fonts[0].glyph(65);
    // xoffset 1 + trim 2; top at lineHeight - yoffset
    assert_eq!(a.p0.x, 3.0);
    assert_eq!(a.p0.y, 12.0);
    assert_eq!(a.p1 - a.p0, glam::Vec2::new(6.0, -9.0));
}

#[test]
fn unknown_and_empty_characters_fall_back() {
    let out = bake(font_input(false), &BakeConfig::default()).expect("bake");
    let table = &out.fonts[0];
    assert_eq!(table.glyph(0x263A), &table.missing);
    assert_eq!(table.glyph(0x263A).advance, 0);
    // the space has no pixels but keeps its advance
    let space = table.glyph(32);
    assert_eq!((space.tex_w, space.tex_h), (0, 0));
    assert_eq!(space.advance, 4);
    assert_eq!(space.uv, table.missing.uv);
}

#[test]
fn missing_glyph_texel_origin_matches_its_uv() {
    let cfg = BakeConfig::default();
    assert_eq!(cfg.effective_pad(), 2);
    let out = bake(font_input(false), &cfg).expect("bake");
    let missing = &out.fonts[0].missing;
    let page = &out.pages[missing.page].rgba;
    let u0 = (missing.uv[0] * page.width() as f32).floor() as u32;
    let v0 = (missing.uv[1] * page.height() as f32).floor() as u32;
    assert_eq!((missing.tex_x, missing.tex_y), (u0, v0));
}

#[test]
fn measure_applies_kerning() {
    let out = bake(font_input(false), &BakeConfig::default()).expect("bake");
    let table = &out.fonts[0];
    assert_eq!(table.kerning(65, 65), -2);
    assert_eq!(table.measure("AA"), 18);
    assert_eq!(table.measure("A A"), 24);
    assert_eq!(table.measure(""), 0);
}

#[test]
fn font_only_bake_produces_a_page() {
    let out = bake(font_input(false), &BakeConfig::default()).expect("bake");
    assert!(out.sprites.is_empty());
    assert_eq!(out.pages.len(), 1);
    // glyph plus the missing-glyph tile
    assert_eq!(out.stats().num_slots, 2);
}

#[test]
fn missing_font_texture_still_bakes() {
    let mut input = font_input(false);
    input.fonts[0].texture = 9;
    let out = bake(input, &BakeConfig::default()).expect("bake");
    let table = &out.fonts[0];
    let a = table.glyph(65);
    assert_eq!(a.id, 65);
    assert_eq!(a.advance, 10);
    assert_eq!((a.tex_x, a.tex_y), (table.missing.tex_x, table.missing.tex_y));
    assert_eq!(a.uv, table.missing.uv);
}
