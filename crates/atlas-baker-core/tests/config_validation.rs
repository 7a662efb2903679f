use atlas_baker_core::config::{DiceFilter, PadMode, PolygonCap};
use atlas_baker_core::{
    BakeConfig, BakeError, BakeInput, FailureReason, FilterMode, MaxRectsHeuristic, TextureCompression, bake,
};

fn rejects(cfg: BakeConfig) -> BakeError {
    cfg.validate().err().expect("config should be rejected")
}

#[test]
fn zero_page_size_is_invalid_dimensions() {
    let err = rejects(BakeConfig::builder().max_texture_size(0).build());
    assert!(matches!(err, BakeError::InvalidDimensions { width: 0, height: 0 }));
    let err = rejects(BakeConfig::builder().forced_size(256, 0).build());
    assert!(matches!(err, BakeError::InvalidDimensions { width: 256, height: 0 }));
    assert_eq!(err.reason(), FailureReason::Configuration);
}

#[test]
fn rescale_must_be_in_unit_interval() {
    for r in [0.0, -0.5, 1.5, f32::NAN] {
        let err = rejects(BakeConfig::builder().global_texture_rescale(r).build());
        assert!(matches!(err, BakeError::InvalidConfig(_)), "rescale {r}");
    }
    for r in [0.25, 0.5, 1.0] {
        BakeConfig::builder()
            .global_texture_rescale(r)
            .build()
            .validate()
            .expect("valid rescale");
    }
}

#[test]
fn scale_and_budget_checks() {
    rejects(BakeConfig::builder().pixels_per_unit(0.0).build());
    rejects(BakeConfig::builder().global_scale(0.0).build());
    rejects(BakeConfig::builder().global_scale(f32::INFINITY).build());
    rejects(
        BakeConfig::builder()
            .allow_multiple_pages(true)
            .max_pages(0)
            .build(),
    );
    rejects(BakeConfig::builder().heuristics(vec![]).build());
}

#[test]
fn bake_validates_before_doing_work() {
    let cfg = BakeConfig::builder().max_texture_size(0).build();
    let err = bake(BakeInput::default(), &cfg).err().expect("invalid config");
    assert!(matches!(err, BakeError::InvalidDimensions { .. }));
}

#[test]
fn empty_input_is_rejected() {
    let err = bake(BakeInput::default(), &BakeConfig::default())
        .err()
        .expect("nothing to bake");
    assert!(matches!(err, BakeError::Empty));
    assert_eq!(err.reason(), FailureReason::InvalidInput);
}

#[test]
fn pad_follows_filter_mode_unless_set() {
    assert_eq!(BakeConfig::default().effective_pad(), 2);
    let point = BakeConfig::builder().filter_mode(FilterMode::Point).build();
    assert_eq!(point.effective_pad(), 0);
    let explicit = BakeConfig::builder()
        .filter_mode(FilterMode::Point)
        .pad_amount(3)
        .build();
    assert_eq!(explicit.effective_pad(), 3);
}

#[test]
fn page_budget_and_bounds() {
    let cfg = BakeConfig::builder().max_pages(4).build();
    assert_eq!(cfg.page_budget(), 1);
    let cfg = BakeConfig::builder()
        .allow_multiple_pages(true)
        .max_pages(4)
        .build();
    assert_eq!(cfg.page_budget(), 4);
    let cfg = BakeConfig::builder()
        .max_texture_size(512)
        .forced_size(128, 64)
        .build();
    assert_eq!(cfg.page_bounds(), (128, 64));
}

#[test]
fn pixel_scale_combines_scale_ppu_and_rescale() {
    let cfg = BakeConfig::builder()
        .global_scale(2.0)
        .pixels_per_unit(100.0)
        .global_texture_rescale(0.5)
        .build();
    assert!((cfg.pixel_scale() - 0.04).abs() < 1e-6);
}

#[test]
fn enum_names_parse_with_aliases() {
    assert_eq!("BAF".parse(), Ok(MaxRectsHeuristic::BestAreaFit));
    assert_eq!("contactpoint".parse(), Ok(MaxRectsHeuristic::ContactPoint));
    assert_eq!("wrap".parse(), Ok(PadMode::TileXY));
    assert_eq!("solid".parse(), Ok(DiceFilter::SolidOnly));
    assert_eq!("both".parse(), Ok(PolygonCap::FrontAndBack));
    assert_eq!("rgb565".parse(), Ok(TextureCompression::Dithered16BitNoAlpha));
    assert_eq!("nearest".parse(), Ok(FilterMode::Point));
    assert!("spiral".parse::<MaxRectsHeuristic>().is_err());
}

#[test]
fn serde_defaults_match_default() {
    let parsed: BakeConfig = serde_json::from_str("{}").expect("parse");
    let d = BakeConfig::default();
    assert_eq!(parsed.max_texture_size, d.max_texture_size);
    assert_eq!(parsed.max_pages, d.max_pages);
    assert_eq!(parsed.heuristics, d.heuristics);
    assert!(parsed.allow_rotation && parsed.remove_duplicates);
    assert_eq!(parsed.global_texture_rescale, 1.0);
    assert_eq!(parsed.physics_depth, d.physics_depth);
    parsed.validate().expect("defaults are valid");

    let tuned: BakeConfig = serde_json::from_str(
        r#"{"max_texture_size": 256, "texture_compression": "dithered16_bit_alpha", "pad_amount": 4}"#,
    )
    .expect("parse");
    assert_eq!(tuned.max_texture_size, 256);
    assert_eq!(tuned.texture_compression, TextureCompression::Dithered16BitAlpha);
    assert_eq!(tuned.effective_pad(), 4);
}
