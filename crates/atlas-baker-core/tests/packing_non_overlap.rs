use atlas_baker_core::model::{PageLayout, Rect};
use atlas_baker_core::packer::paging::{PagingOptions, pack_pages};
use atlas_baker_core::{BakeConfig, MaxRectsHeuristic};
use rand::{Rng, SeedableRng};

fn overlaps(a: &Rect, b: &Rect) -> bool {
    a.intersects(b)
}

fn assert_valid(pages: &[PageLayout], sizes: &[(u32, u32)]) {
    let mut seen = vec![false; sizes.len()];
    for page in pages {
        for (i, a) in page.entries.iter().enumerate() {
            assert!(a.x + a.w <= page.width && a.y + a.h <= page.height, "entry outside page");
            let (w, h) = sizes[a.slot];
            if a.flipped {
                assert_eq!((a.w, a.h), (h, w));
            } else {
                assert_eq!((a.w, a.h), (w, h));
            }
            assert!(!seen[a.slot], "slot placed twice");
            seen[a.slot] = true;
            for b in &page.entries[i + 1..] {
                assert!(!overlaps(&a.rect(), &b.rect()), "{a:?} overlaps {b:?}");
            }
        }
    }
    assert!(seen.iter().all(|s| *s), "every slot placed");
}

fn random_sizes(seed: u64, n: usize) -> Vec<(u32, u32)> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| (rng.gen_range(1..=96), rng.gen_range(1..=96)))
        .collect()
}

#[test]
fn random_sets_never_overlap() {
    let sizes = random_sizes(42, 160);
    for heuristic in [
        MaxRectsHeuristic::BestAreaFit,
        MaxRectsHeuristic::BestShortSideFit,
        MaxRectsHeuristic::BestLongSideFit,
        MaxRectsHeuristic::BottomLeft,
        MaxRectsHeuristic::ContactPoint,
    ] {
        let cfg = BakeConfig::builder()
            .max_texture_size(256)
            .allow_multiple_pages(true)
            .heuristics(vec![heuristic])
            .build();
        let pages = pack_pages(&sizes, &PagingOptions::from_config(&cfg)).expect("pack");
        assert_valid(&pages, &sizes);
    }
}

#[test]
fn rotation_off_keeps_orientation() {
    let sizes = random_sizes(7, 60);
    let cfg = BakeConfig::builder()
        .max_texture_size(512)
        .allow_multiple_pages(true)
        .allow_rotation(false)
        .build();
    let pages = pack_pages(&sizes, &PagingOptions::from_config(&cfg)).expect("pack");
    assert!(pages.iter().flat_map(|p| &p.entries).all(|e| !e.flipped));
    assert_valid(&pages, &sizes);
}

#[test]
fn placement_is_deterministic() {
    let sizes = random_sizes(42, 80);
    let cfg = BakeConfig::builder()
        .max_texture_size(512)
        .allow_multiple_pages(true)
        .build();
    let opts = PagingOptions::from_config(&cfg);
    let a = pack_pages(&sizes, &opts).expect("pack");
    let b = pack_pages(&sizes, &opts).expect("pack");
    assert_eq!(a.len(), b.len());
    for (pa, pb) in a.iter().zip(&b) {
        assert_eq!((pa.width, pa.height), (pb.width, pb.height));
        assert_eq!(pa.entries, pb.entries);
    }
}
