use atlas_baker_core::{
    Anchor, AttachPointSpec, BakeConfig, BakeInput, GeometryIsland, NormalGeneration, SourceRef, SpriteDefinition,
    SpriteRequest, bake,
};
use glam::{Vec2, Vec3, Vec4};
use image::{Rgba, RgbaImage};
use rand::{Rng, SeedableRng};

fn close2(a: Vec2, b: Vec2) -> bool {
    (a - b).length() < 1e-4
}

fn close3(a: Vec3, b: Vec3) -> bool {
    (a - b).length() < 1e-4
}

fn bake_one(img: RgbaImage, req: SpriteRequest, cfg: &BakeConfig) -> SpriteDefinition {
    let input = BakeInput {
        textures: vec![img],
        sprites: vec![req],
        fonts: vec![],
    };
    let mut out = bake(input, cfg).expect("bake");
    out.sprites.remove(0)
}

fn opaque(w: u32, h: u32) -> RgbaImage {
    RgbaImage::from_pixel(w, h, Rgba([200, 200, 200, 255]))
}

#[test]
fn anchor_scale_and_pixels_per_unit() {
    let cfg = BakeConfig::builder().pixels_per_unit(10.0).build();
    let req = SpriteRequest {
        anchor: Anchor::UpperLeft,
        scale: Vec2::new(2.0, 3.0),
        ..SpriteRequest::new("s", SourceRef::Texture(0))
    };
    let s = bake_one(opaque(20, 10), req, &cfg);
    assert!(close3(s.bounds.center, Vec3::new(2.0, -1.5, 0.0)));
    assert!(close3(s.bounds.size, Vec3::new(4.0, 3.0, 0.0)));
    assert!(close3(s.untrimmed_bounds.size, s.bounds.size));
    assert!(close2(s.texel_size, Vec2::new(0.2, 0.3)));
    // bottom-left, bottom-right, top-left, top-right
    assert!(close3(s.positions[0], Vec3::new(0.0, -3.0, 0.0)));
    assert!(close3(s.positions[3], Vec3::new(4.0, 0.0, 0.0)));
}

#[test]
fn custom_anchor_is_in_source_pixels() {
    let req = SpriteRequest {
        anchor: Anchor::Custom { x: 5.0, y: 2.0 },
        ..SpriteRequest::new("s", SourceRef::Texture(0))
    };
    let s = bake_one(opaque(20, 10), req, &BakeConfig::default());
    // top-left corner of the sprite
    assert!(close3(s.positions[2], Vec3::new(-5.0, 2.0, 0.0)));
}

#[test]
fn mesh_size_survives_texture_rescale() {
    let cfg = BakeConfig::builder().global_texture_rescale(0.5).build();
    let s = bake_one(opaque(32, 32), SpriteRequest::new("s", SourceRef::Texture(0)), &cfg);
    assert!(close3(s.bounds.size, Vec3::new(32.0, 32.0, 0.0)));
    assert!(close3(s.bounds.center, Vec3::ZERO));
    assert!(close2(s.texel_size, Vec2::ONE));
}

#[test]
fn trimmed_quad_keeps_its_place_in_the_source() {
    let mut img = RgbaImage::new(40, 20);
    for y in 12..20 {
        for x in 30..40 {
            img.put_pixel(x, y, Rgba([1, 2, 3, 255]));
        }
    }
    let cfg = BakeConfig::builder().sprite_local_uv2(true).build();
    let s = bake_one(img, SpriteRequest::new("corner", SourceRef::Texture(0)), &cfg);
    // anchor (20, 10): trimmed rect spans x 10..20, y -10..-2
    assert!(close3(s.bounds.center, Vec3::new(15.0, -6.0, 0.0)));
    assert!(close3(s.bounds.size, Vec3::new(10.0, 8.0, 0.0)));
    assert!(close3(s.untrimmed_bounds.size, Vec3::new(40.0, 20.0, 0.0)));
    let uv2 = s.uv2.expect("uv2 requested");
    assert!(close2(uv2[0], Vec2::new(0.75, 0.0)));
    assert!(close2(uv2[3], Vec2::new(1.0, 0.4)));
}

#[test]
fn custom_polygon_is_triangulated_and_mapped() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(42);
    let img = RgbaImage::from_fn(32, 32, |_, _| Rgba([rng.r#gen(), rng.r#gen(), rng.r#gen(), 255]));
    let island = GeometryIsland::closed(vec![
        Vec2::new(4.0, 4.0),
        Vec2::new(28.0, 4.0),
        Vec2::new(28.0, 28.0),
        Vec2::new(16.0, 20.0),
        Vec2::new(4.0, 28.0),
    ]);
    let req = SpriteRequest {
        custom_geometry: Some(vec![island]),
        ..SpriteRequest::new("poly", SourceRef::Texture(0))
    };
    let cfg = BakeConfig::builder().allow_rotation(false).build();
    let input = BakeInput {
        textures: vec![img.clone()],
        sprites: vec![req],
        fonts: vec![],
    };
    let out = bake(input, &cfg).expect("bake");
    let s = &out.sprites[0];
    assert_eq!(s.positions.len(), 5);
    assert_eq!(s.indices.len(), 9);
    assert!(close3(s.bounds.size, Vec3::new(24.0, 24.0, 0.0)));

    // every triangle faces the camera (+z)
    for t in s.indices.chunks(3) {
        let (a, b, c) = (s.positions[t[0] as usize], s.positions[t[1] as usize], s.positions[t[2] as usize]);
        assert!((b - a).cross(c - a).z > 0.0);
    }

    // the notch vertex samples the source pixel it sits on
    let page = &out.pages[0].rgba;
    let uv = s.uvs[3];
    let px = page.get_pixel(
        (uv.x * page.width() as f32 + 0.5) as u32,
        (uv.y * page.height() as f32 + 0.5) as u32,
    );
    assert_eq!(px, img.get_pixel(16, 20));
}

#[test]
fn double_sided_mirrors_the_triangles() {
    let cfg = BakeConfig::builder()
        .normal_generation(NormalGeneration::NormalsAndTangents)
        .build();
    let req = SpriteRequest {
        double_sided: true,
        ..SpriteRequest::new("card", SourceRef::Texture(0))
    };
    let s = bake_one(opaque(8, 8), req, &cfg);
    assert_eq!(s.positions.len(), 8);
    assert_eq!(s.indices.len(), 12);
    assert_eq!(&s.indices[..6], &[0, 1, 3, 0, 3, 2]);
    assert_eq!(&s.indices[6..], &[4, 7, 5, 4, 6, 7]);
    let normals = s.normals.expect("normals requested");
    assert!(normals[..4].iter().all(|n| close3(*n, Vec3::Z)));
    assert!(normals[4..].iter().all(|n| close3(*n, -Vec3::Z)));
    let tangents = s.tangents.expect("tangents requested");
    assert!(tangents.iter().all(|t| *t == Vec4::new(1.0, 0.0, 0.0, 1.0)));
}

#[test]
fn no_normals_unless_asked() {
    let s = bake_one(opaque(8, 8), SpriteRequest::new("s", SourceRef::Texture(0)), &BakeConfig::default());
    assert!(s.normals.is_none() && s.tangents.is_none() && s.uv2.is_none());
}

#[test]
fn attach_points_land_in_mesh_space() {
    let req = SpriteRequest {
        scale: Vec2::splat(0.5),
        attach_points: vec![
            AttachPointSpec {
                name: "muzzle".into(),
                position: Vec2::new(20.0, 0.0),
                angle: 45.0,
            },
            AttachPointSpec {
                name: "grip".into(),
                position: Vec2::new(10.0, 10.0),
                angle: 0.0,
            },
        ],
        ..SpriteRequest::new("gun", SourceRef::Texture(0))
    };
    let s = bake_one(opaque(20, 10), req, &BakeConfig::default());
    assert_eq!(s.attach_points.len(), 2);
    assert_eq!(s.attach_points[0].name, "muzzle");
    assert!(close2(s.attach_points[0].position, Vec2::new(5.0, 2.5)));
    assert_eq!(s.attach_points[0].angle, 45.0);
    assert!(close2(s.attach_points[1].position, Vec2::new(0.0, -2.5)));
}
