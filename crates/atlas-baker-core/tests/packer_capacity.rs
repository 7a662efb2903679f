use atlas_baker_core::packer::paging::{PagingOptions, pack_pages};
use atlas_baker_core::{BakeConfig, BakeError, BakeInput, FailureReason, SourceRef, SpriteRequest, bake};
use image::{Rgba, RgbaImage};

fn opts(max: u32, pages: usize) -> PagingOptions {
    let cfg = BakeConfig::builder()
        .max_texture_size(max)
        .allow_multiple_pages(pages > 1)
        .max_pages(pages)
        .build();
    PagingOptions::from_config(&cfg)
}

fn solid(w: u32, h: u32, shade: u8) -> RgbaImage {
    RgbaImage::from_pixel(w, h, Rgba([shade, 0, 0, 255]))
}

fn three_sprites() -> BakeInput {
    BakeInput {
        textures: vec![solid(50, 50, 1), solid(50, 50, 2), solid(100, 100, 3)],
        sprites: (0..3)
            .map(|i| SpriteRequest::new(format!("s{i}"), SourceRef::Texture(i)))
            .collect(),
        fonts: vec![],
    }
}

#[test]
fn aggregate_overflow_is_capacity_exceeded() {
    let err = pack_pages(&[(50, 50), (50, 50), (100, 100)], &opts(128, 1)).unwrap_err();
    assert!(matches!(err, BakeError::TooManyTextures { placed: 1, total: 3, pages: 1 }));
    assert_eq!(err.reason(), FailureReason::CapacityExceeded);
}

#[test]
fn single_oversize_item_is_reported_separately() {
    let err = pack_pages(&[(10, 10), (200, 20)], &opts(128, 4)).unwrap_err();
    assert!(matches!(
        err,
        BakeError::OversizeTexture {
            slot: 1,
            width: 200,
            height: 20,
            ..
        }
    ));
    assert_eq!(err.reason(), FailureReason::OversizeTexture);
}

#[test]
fn bake_reports_capacity_without_truncating() {
    let cfg = BakeConfig::builder().max_texture_size(128).pad_amount(0).build();
    let err = bake(three_sprites(), &cfg).err().expect("must not fit one page");
    assert_eq!(err.reason(), FailureReason::CapacityExceeded);
}

#[test]
fn multiple_pages_absorb_the_overflow() {
    let cfg = BakeConfig::builder()
        .max_texture_size(128)
        .pad_amount(0)
        .allow_multiple_pages(true)
        .max_pages(4)
        .build();
    let out = bake(three_sprites(), &cfg).expect("bake");
    assert_eq!(out.pages.len(), 2);
    let placed: usize = out.pages.iter().map(|p| p.layout.entries.len()).sum();
    assert_eq!(placed, 3);
    // material ids follow pages when spilling
    for s in &out.sprites {
        assert_eq!(s.material_id, s.page);
    }
}

#[test]
fn auto_size_never_exceeds_max() {
    let out = pack_pages(&[(30, 30), (40, 20), (8, 60)], &opts(256, 1)).expect("pack");
    assert_eq!(out.len(), 1);
    assert!(out[0].width <= 256 && out[0].height <= 256);
    assert!(out[0].width < 256 || out[0].height < 256, "page should shrink below the maximum");
}

#[test]
fn force_square_keeps_pages_square() {
    let cfg = BakeConfig::builder().max_texture_size(512).force_square(true).build();
    let pages = pack_pages(&[(100, 20), (20, 20)], &PagingOptions::from_config(&cfg)).expect("pack");
    assert_eq!(pages[0].width, pages[0].height);
}
