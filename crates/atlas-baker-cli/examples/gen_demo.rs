//! Writes a small demo project: loose sprites, a sheet with regions, a digit
//! BMFont and a `manifest.yaml` tying them together.
//!
//! cargo run -p atlas-baker-cli --example gen_demo -- demo
//! cargo run -p atlas-baker-cli -- bake demo/manifest.yaml -o demo/out

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};
use rand::{Rng, SeedableRng};

fn solid(w: u32, h: u32, c: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(w, h, Rgba(c))
}

fn random_color_opaque(rng: &mut impl Rng) -> [u8; 4] {
    [rng.r#gen(), rng.r#gen(), rng.r#gen(), 255]
}

fn draw_rect(img: &mut RgbaImage, x: u32, y: u32, w: u32, h: u32, c: [u8; 4]) {
    let (iw, ih) = img.dimensions();
    for yy in y.min(ih)..(y.saturating_add(h)).min(ih) {
        for xx in x.min(iw)..(x.saturating_add(w)).min(iw) {
            img.put_pixel(xx, yy, Rgba(c));
        }
    }
}

fn draw_ellipse(img: &mut RgbaImage, cx: i32, cy: i32, rx: f32, ry: f32, c: [u8; 4]) {
    let (iw, ih) = img.dimensions();
    for y in 0..ih as i32 {
        for x in 0..iw as i32 {
            let dx = (x - cx) as f32;
            let dy = (y - cy) as f32;
            if (dx * dx) / (rx * rx) + (dy * dy) / (ry * ry) <= 1.0 {
                img.put_pixel(x as u32, y as u32, Rgba(c));
            }
        }
    }
}

// 3x5 digits, each row is 3 bits (MSB left)
const FONT_3X5: [[u8; 5]; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111],
    [0b010, 0b110, 0b010, 0b010, 0b111],
    [0b111, 0b001, 0b111, 0b100, 0b111],
    [0b111, 0b001, 0b111, 0b001, 0b111],
    [0b101, 0b101, 0b111, 0b001, 0b001],
    [0b111, 0b100, 0b111, 0b001, 0b111],
    [0b111, 0b100, 0b111, 0b101, 0b111],
    [0b111, 0b001, 0b010, 0b010, 0b010],
    [0b111, 0b101, 0b111, 0b101, 0b111],
    [0b111, 0b101, 0b111, 0b001, 0b111],
];

const GLYPH_SCALE: u32 = 3;
const CELL: u32 = 4 * GLYPH_SCALE;

fn draw_digit(img: &mut RgbaImage, x: u32, y: u32, d: usize) {
    for (row_i, row) in FONT_3X5[d].iter().enumerate() {
        for col in 0..3 {
            if (row >> (2 - col)) & 1 == 1 {
                draw_rect(
                    img,
                    x + col * GLYPH_SCALE,
                    y + row_i as u32 * GLYPH_SCALE,
                    GLYPH_SCALE,
                    GLYPH_SCALE,
                    [255, 255, 255, 255],
                );
            }
        }
    }
}

/// Digit sheet plus its BMFont text description.
fn digit_font() -> (RgbaImage, String) {
    let (w, h) = (CELL * 10, CELL * 2);
    let mut sheet = RgbaImage::new(w, h);
    let mut fnt = String::new();
    let _ = writeln!(fnt, r#"info face="Digits3x5" size={} bold=0 italic=0"#, 5 * GLYPH_SCALE);
    let _ = writeln!(
        fnt,
        "common lineHeight={} base={} scaleW={w} scaleH={h} pages=1 packed=0",
        6 * GLYPH_SCALE,
        5 * GLYPH_SCALE
    );
    let _ = writeln!(fnt, r#"page id=0 file="digits.png""#);
    let _ = writeln!(fnt, "chars count=11");
    for d in 0..10 {
        let x = d as u32 * CELL;
        // one pixel of headroom so the trim has something to remove
        draw_digit(&mut sheet, x, GLYPH_SCALE, d);
        let _ = writeln!(
            fnt,
            "char id={} x={x} y=0 width={CELL} height={} xoffset=0 yoffset=0 xadvance={CELL} page=0 chnl=15",
            '0' as u32 + d as u32,
            6 * GLYPH_SCALE
        );
    }
    let _ = writeln!(
        fnt,
        "char id=32 x=0 y=0 width=0 height=0 xoffset=0 yoffset=0 xadvance={CELL} page=0 chnl=15"
    );
    let _ = writeln!(fnt, "kernings count=1");
    let _ = writeln!(fnt, "kerning first=49 second=49 amount=-{GLYPH_SCALE}");
    (sheet, fnt)
}

fn write_png(img: &RgbaImage, path: &Path) -> anyhow::Result<()> {
    img.save(path)?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let out: PathBuf = std::env::args().nth(1).unwrap_or_else(|| "demo".into()).into();
    let sprites_dir = out.join("sprites");
    fs::create_dir_all(&sprites_dir)?;
    let mut rng = rand::rngs::StdRng::seed_from_u64(42);

    let mut manifest = String::from("config:\n  max_texture_size: 512\n  pixels_per_unit: 32\n\nsprites:\n");

    // loose sprites with transparent margins
    for i in 0..12 {
        let w = rng.gen_range(16..=64);
        let h = rng.gen_range(16..=64);
        let mut img = RgbaImage::new(w, h);
        let c = random_color_opaque(&mut rng);
        if i % 2 == 0 {
            draw_ellipse(&mut img, w as i32 / 2, h as i32 / 2, w as f32 * 0.4, h as f32 * 0.4, c);
        } else {
            draw_rect(&mut img, 3, 3, w - 6, h - 6, c);
        }
        let file = format!("sprite_{i:02}.png");
        write_png(&img, &sprites_dir.join(&file))?;
        let _ = writeln!(manifest, "  - name: sprite_{i:02}\n    texture: sprites/{file}");
    }

    // two byte-identical copies fold into one slot
    let tile = solid(24, 24, [40, 160, 90, 255]);
    write_png(&tile, &sprites_dir.join("tile_a.png"))?;
    write_png(&tile, &sprites_dir.join("tile_b.png"))?;
    manifest.push_str("  - name: tile_a\n    texture: sprites/tile_a.png\n");
    manifest.push_str("  - name: tile_b\n    texture: sprites/tile_b.png\n");

    // 4x2 sheet of 32px cells, cut by regions
    let mut sheet = RgbaImage::new(128, 64);
    for cy in 0..2 {
        for cx in 0..4 {
            let c = random_color_opaque(&mut rng);
            draw_ellipse(&mut sheet, cx * 32 + 16, cy * 32 + 16, 12.0, 12.0, c);
            let _ = writeln!(
                manifest,
                "  - name: coin_{}\n    texture: sheet.png\n    region: {{ x: {}, y: {}, w: 32, h: 32 }}\n    collider: {{ type: box_trimmed }}",
                cy * 4 + cx,
                cx * 32,
                cy * 32
            );
        }
    }
    write_png(&sheet, &out.join("sheet.png"))?;

    // a large backdrop diced into 32px cells, half of it empty
    let mut backdrop = RgbaImage::new(128, 96);
    draw_rect(&mut backdrop, 0, 0, 64, 96, [90, 90, 160, 255]);
    write_png(&backdrop, &out.join("backdrop.png"))?;
    manifest.push_str(
        "  - name: backdrop\n    texture: backdrop.png\n    anchor: lower_left\n    dice: { unit_x: 32, unit_y: 32, filter: solid_only }\n",
    );

    // custom polygon with an extruded collider
    let mut gem = RgbaImage::new(48, 48);
    draw_ellipse(&mut gem, 24, 24, 20.0, 20.0, [220, 60, 200, 255]);
    write_png(&gem, &sprites_dir.join("gem.png"))?;
    manifest.push_str(concat!(
        "  - name: gem\n",
        "    texture: sprites/gem.png\n",
        "    custom_geometry:\n",
        "      - points: [[24, 4], [44, 24], [24, 44], [4, 24]]\n",
        "    collider:\n",
        "      type: polygon\n",
        "      cap: front_and_back\n",
        "      islands:\n",
        "        - points: [[24, 4], [44, 24], [24, 44], [4, 24]]\n",
        "    attach_points:\n",
        "      - { name: top, position: [24, 4], angle: 90 }\n",
    ));

    // dangling reference: baked as the checkerboard placeholder
    manifest.push_str("  - name: missing\n    texture: sprites/does_not_exist.png\n");

    let (digits, fnt) = digit_font();
    write_png(&digits, &out.join("digits.png"))?;
    fs::write(out.join("digits.fnt"), fnt)?;
    manifest.push_str("\nfonts:\n  - name: digits\n    fnt: digits.fnt\n");

    fs::write(out.join("manifest.yaml"), manifest)?;
    println!("demo project written to {}", out.display());
    Ok(())
}
