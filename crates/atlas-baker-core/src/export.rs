use serde_json::{Value, json};

use crate::pipeline::BakeOutput;

/// Serialize a bake as `{ meta, stats, pages, sprites, fonts }`.
///
/// Pages carry their layout only (`index`, `width`, `height`, `occupancy`,
/// `entries`); pixels are left to the caller's image encoder. `file_stem`
/// names the page images as `{file_stem}_{index}.png` in the output.
pub fn to_json(out: &BakeOutput, file_stem: &str) -> Value {
    let pages: Vec<Value> = out
        .pages
        .iter()
        .map(|p| {
            json!({
                "index": p.layout.index,
                "image": page_file_name(file_stem, p.layout.index),
                "width": p.layout.width,
                "height": p.layout.height,
                "occupancy": p.layout.occupancy,
                "entries": &p.layout.entries,
            })
        })
        .collect();
    json!({
        "meta": &out.meta,
        "stats": out.stats(),
        "pages": pages,
        "sprites": &out.sprites,
        "fonts": &out.fonts,
    })
}

/// File name the CLI writes page `index` to.
pub fn page_file_name(file_stem: &str, index: usize) -> String {
    format!("{file_stem}_{index}.png")
}
