use std::collections::{HashMap, HashSet};

use glam::Vec2;
use image::RgbaImage;
use tracing::{debug, info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::collider::build_collider;
use crate::compositing::composite_page;
use crate::config::{BakeConfig, PadMode};
use crate::dedup::{IdentityIndex, IdentityKey, SlotTable, assign_slots};
use crate::dice::dice;
use crate::dither::DitherTarget;
use crate::error::{BakeError, Result};
use crate::font::{FontTable, build_font_table, glyph_rect};
use crate::geometry::{MeshData, PlacedTile, SpriteFrame};
use crate::model::{
    AtlasEntry, AtlasMeta, AtlasPage, AttachPoint, BakeStats, PageLayout, Placeholder, Rect, SpriteDefinition,
};
use crate::packer::paging::{PagingOptions, pack_pages};
use crate::process::{ProcessParams, ProcessedTile, TileOrigin, process};
use crate::request::{Anchor, BakeInput, SourceRef, SpriteRequest};
use crate::source::{Provenance, SourceImage, SourceKey, SourceResolver};

/// Everything a bake produces.
pub struct BakeOutput {
    pub pages: Vec<AtlasPage>,
    /// One definition per sprite request, in request order.
    pub sprites: Vec<SpriteDefinition>,
    /// One table per font request, in request order.
    pub fonts: Vec<FontTable>,
    pub meta: AtlasMeta,
    stats: BakeStats,
}

impl BakeOutput {
    pub fn stats(&self) -> BakeStats {
        self.stats
    }

    pub fn sprite(&self, name: &str) -> Option<&SpriteDefinition> {
        self.sprites.iter().find(|s| s.name == name)
    }
}

/// One unit of pixel work: a rect of a resolved source run through the processor.
#[derive(Debug, Clone)]
struct TileJob {
    source: usize,
    rect: Rect,
    params: ProcessParams,
    origin: TileOrigin,
    dedup_exempt: bool,
}

#[derive(Debug, Clone, Copy)]
struct TileRef {
    tile: usize,
    cell_origin: (u32, u32),
}

#[derive(Debug, Clone)]
struct SpritePlan {
    request: SpriteRequest,
    source: usize,
    tiles: Vec<TileRef>,
    placeholder: Option<Placeholder>,
}

#[derive(Debug, Clone)]
struct FontPlan {
    glyphs: Vec<(u32, usize)>,
    missing: usize,
}

/// Output of the resolve stage: sources, the pixel jobs cut from them, and how
/// sprites and fonts map onto those jobs.
struct Plan {
    sources: Vec<SourceImage>,
    jobs: Vec<TileJob>,
    sprites: Vec<SpritePlan>,
    fonts: Vec<FontPlan>,
    identity_folded: usize,
}

/// Output of the process stage, indexed like `Plan::jobs`.
struct Processed {
    tiles: Vec<Option<ProcessedTile>>,
    /// Jobs whose rect had nothing visible and got the transparent stand-in.
    substituted: HashSet<usize>,
}

/// Output of the pack stage.
struct Packed {
    slots: SlotTable,
    layouts: Vec<PageLayout>,
    entry_of_slot: Vec<AtlasEntry>,
}

/// Bakes `input` into atlas pages, sprite definitions and font tables.
///
/// Stages run strictly forward: validate, normalise requests, resolve sources
/// into pixel jobs, process, fold duplicates, pack, composite, build geometry.
/// Per-sprite input problems are logged and replaced by placeholders; only
/// configuration and capacity problems fail the bake.
#[instrument(skip_all, fields(sprites = input.sprites.len(), fonts = input.fonts.len()))]
pub fn bake(input: BakeInput, cfg: &BakeConfig) -> Result<BakeOutput> {
    cfg.validate()?;
    if input.sprites.is_empty() && input.fonts.is_empty() {
        return Err(BakeError::Empty);
    }
    let requests = normalize_requests(&input.sprites, cfg)?;
    let plan = resolve(&input, requests, cfg);
    let processed = process_jobs(&plan, cfg);
    let packed = pack(&processed, cfg)?;
    let pages = composite(&processed, &packed);

    let sprites: Vec<SpriteDefinition> = plan
        .sprites
        .iter()
        .map(|sp| build_sprite(sp, &plan, &processed, &packed, cfg))
        .collect();
    let fonts = build_fonts(&input, &plan, &processed, &packed, cfg);

    let stats = BakeStats::from_pages(&pages, sprites.len(), plan.identity_folded + packed.slots.folded);
    info!(
        pages = stats.num_pages,
        slots = stats.num_slots,
        folded = stats.duplicates_folded,
        occupancy = stats.occupancy,
        "bake finished"
    );
    Ok(BakeOutput {
        pages,
        sprites,
        fonts,
        meta: meta(cfg),
        stats,
    })
}

fn meta(cfg: &BakeConfig) -> AtlasMeta {
    AtlasMeta {
        schema_version: "1".into(),
        app: "atlas-baker".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        texture_compression: cfg.texture_compression,
        filter_mode: cfg.filter_mode,
        premultiplied_alpha: cfg.premultiplied_alpha,
        pad_amount: cfg.effective_pad(),
        max_texture_size: cfg.max_texture_size,
        global_texture_rescale: cfg.global_texture_rescale,
    }
}

/// Applies policy fix-ups, then rejects combinations no fix-up can rescue.
#[instrument(skip_all)]
fn normalize_requests(sprites: &[SpriteRequest], cfg: &BakeConfig) -> Result<Vec<SpriteRequest>> {
    let mut out = sprites.to_vec();
    for req in &mut out {
        if req.resolve_conflicts() {
            warn!(sprite = %req.name, "dicing and custom geometry are exclusive; both were disabled");
        }
        if req.custom_geometry.is_some() && !req.has_custom_geometry() {
            req.custom_geometry = None;
        }
    }
    if cfg.allow_multiple_pages {
        if let Some(req) = out.iter().find(|r| r.is_diced()) {
            return Err(BakeError::DiceWithMultiplePages {
                sprite: req.name.clone(),
            });
        }
    }
    Ok(out)
}

fn base_params(cfg: &BakeConfig) -> ProcessParams {
    ProcessParams {
        trim: !cfg.disable_trimming,
        trim_threshold: cfg.trim_threshold,
        pad_mode: Default::default(),
        pad: cfg.effective_pad(),
        premultiply: cfg.premultiplied_alpha,
        additive: false,
        dither: DitherTarget::for_compression(cfg.texture_compression),
        geometry_box: None,
    }
}

/// Integer bounding box of every island vertex, in rescaled pixels.
fn geometry_box(req: &SpriteRequest, rescale: f32) -> Option<Rect> {
    let islands = req.custom_geometry.as_ref()?;
    let mut pts = islands.iter().flat_map(|i| i.points.iter()).map(|p| *p * rescale);
    let first = pts.next()?;
    let (lo, hi) = pts.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p)));
    let lo = lo.floor().max(Vec2::ZERO);
    let hi = hi.ceil().max(lo);
    Some(Rect::new(lo.x as u32, lo.y as u32, (hi.x - lo.x) as u32, (hi.y - lo.y) as u32))
}

/// Resolves every source and cuts it into pixel jobs. Requests that share a
/// source and processing policy reuse the first request's jobs.
#[instrument(skip_all)]
fn resolve(input: &BakeInput, requests: Vec<SpriteRequest>, cfg: &BakeConfig) -> Plan {
    let rescale = cfg.global_texture_rescale;
    let mut resolver = SourceResolver::new(&input.textures, rescale);
    let mut identity = IdentityIndex::new();
    let mut plan = Plan {
        sources: Vec::new(),
        jobs: Vec::new(),
        sprites: Vec::with_capacity(requests.len()),
        fonts: Vec::with_capacity(input.fonts.len()),
        identity_folded: 0,
    };

    for (index, mut req) in requests.into_iter().enumerate() {
        let mut params = base_params(cfg);
        params.trim &= req.trim;
        params.pad_mode = req.pad;
        params.pad += req.extra_padding;
        params.additive = req.additive && cfg.premultiplied_alpha;
        params.geometry_box = geometry_box(&req, rescale);

        let foldable = !req.is_diced() && !req.has_custom_geometry();
        if foldable {
            let key = IdentityKey {
                source: SourceKey::of(req.source),
                params: params.clone(),
            };
            if let Some(first) = identity.fold(key, index) {
                let earlier = &plan.sprites[first];
                debug!(sprite = %req.name, reuses = %earlier.request.name, "identical source and policy");
                let (source, tiles, placeholder) = (earlier.source, earlier.tiles.clone(), earlier.placeholder);
                if placeholder == Some(Placeholder::MissingTexture) {
                    req.anchor = Anchor::MiddleCenter;
                }
                plan.identity_folded += tiles.len();
                plan.sprites.push(SpritePlan {
                    request: req,
                    source,
                    tiles,
                    placeholder,
                });
                continue;
            }
        }

        let src = resolver.resolve(req.source);
        let placeholder = match src.provenance {
            Provenance::MissingTexture => {
                warn!(sprite = %req.name, "source texture missing, using placeholder");
                req.anchor = Anchor::MiddleCenter;
                Some(Placeholder::MissingTexture)
            }
            Provenance::Empty => Some(Placeholder::Transparent),
            _ => None,
        };
        if placeholder.is_some() {
            req.dice = None;
            req.custom_geometry = None;
            params.geometry_box = None;
        }
        let source = plan.sources.len();
        let (w, h) = src.rgba.dimensions();
        let mut tiles = Vec::new();
        match req.dice {
            Some(settings) => {
                let cells = dice(&src.rgba, &settings, rescale);
                debug!(sprite = %req.name, cells = cells.len(), "diced");
                // neighbouring cells sample each other's edge, never a transparent seam
                let params = ProcessParams {
                    pad_mode: PadMode::Extend,
                    ..params.clone()
                };
                for cell in cells {
                    tiles.push(TileRef {
                        tile: plan.jobs.len(),
                        cell_origin: (cell.rect.x, cell.rect.y),
                    });
                    plan.jobs.push(TileJob {
                        source,
                        rect: cell.rect,
                        params: params.clone(),
                        origin: TileOrigin::Split {
                            sprite: index,
                            index: cell.index,
                        },
                        dedup_exempt: true,
                    });
                }
            }
            None => {
                tiles.push(TileRef {
                    tile: plan.jobs.len(),
                    cell_origin: (0, 0),
                });
                plan.jobs.push(TileJob {
                    source,
                    rect: Rect::new(0, 0, w, h),
                    params: params.clone(),
                    origin: TileOrigin::Sprite { sprite: index },
                    dedup_exempt: req.has_custom_geometry(),
                });
            }
        }
        plan.sources.push(src);
        plan.sprites.push(SpritePlan {
            request: req,
            source,
            tiles,
            placeholder,
        });
    }

    for (font, req) in input.fonts.iter().enumerate() {
        let mut params = base_params(cfg);
        params.pad_mode = PadMode::Default;
        let mut glyphs = Vec::new();
        let sheet = resolver.resolve(Some(SourceRef::Texture(req.texture)));
        if sheet.is_placeholder() {
            warn!(font = %req.name, "font texture missing; every glyph falls back to the missing glyph");
        } else {
            let source = plan.sources.len();
            for c in &req.definition.chars {
                let Some(rect) = glyph_rect(c, &req.definition, req.flip_texture_y, rescale, sheet.rgba.dimensions())
                else {
                    continue;
                };
                glyphs.push((c.id, plan.jobs.len()));
                plan.jobs.push(TileJob {
                    source,
                    rect,
                    params: params.clone(),
                    origin: TileOrigin::Glyph { font, char_id: c.id },
                    dedup_exempt: false,
                });
            }
            plan.sources.push(sheet);
        }
        let blank = plan.sources.len();
        plan.sources.push(SourceImage {
            key: SourceKey::Empty,
            provenance: Provenance::Empty,
            rgba: RgbaImage::new(5, 5),
        });
        let missing = plan.jobs.len();
        plan.jobs.push(TileJob {
            source: blank,
            rect: Rect::new(0, 0, 5, 5),
            params,
            origin: TileOrigin::MissingGlyph { font },
            dedup_exempt: false,
        });
        plan.fonts.push(FontPlan { glyphs, missing });
    }
    debug!(
        sources = plan.sources.len(),
        jobs = plan.jobs.len(),
        rescaled_sheets = resolver.cached(),
        identity_folded = plan.identity_folded,
        "sources resolved"
    );
    plan
}

fn run_job(plan: &Plan, job: &TileJob) -> Option<ProcessedTile> {
    let src = &plan.sources[job.source].rgba;
    process(src, job.rect, &job.params, job.origin).map(|mut t| {
        t.dedup_exempt = job.dedup_exempt;
        t
    })
}

/// Trims, pads and filters every job. Sprites and the missing glyph with
/// nothing visible get a transparent stand-in; empty dice cells and glyphs are dropped.
#[instrument(skip_all, fields(jobs = plan.jobs.len()))]
fn process_jobs(plan: &Plan, #[cfg_attr(not(feature = "parallel"), allow(unused_variables))] cfg: &BakeConfig) -> Processed {
    #[cfg(feature = "parallel")]
    let raw: Vec<Option<ProcessedTile>> = if cfg.parallel {
        plan.jobs.par_iter().map(|j| run_job(plan, j)).collect()
    } else {
        plan.jobs.iter().map(|j| run_job(plan, j)).collect()
    };
    #[cfg(not(feature = "parallel"))]
    let raw: Vec<Option<ProcessedTile>> = plan.jobs.iter().map(|j| run_job(plan, j)).collect();

    let mut substituted = HashSet::new();
    let tiles = raw
        .into_iter()
        .zip(&plan.jobs)
        .enumerate()
        .map(|(i, (tile, job))| match (tile, job.origin) {
            (Some(t), _) => Some(t),
            (None, TileOrigin::Sprite { .. } | TileOrigin::MissingGlyph { .. }) => {
                substituted.insert(i);
                let mut t = ProcessedTile::transparent((job.rect.w, job.rect.h), job.params.pad, job.origin);
                t.dedup_exempt = job.dedup_exempt;
                Some(t)
            }
            (None, _) => None,
        })
        .collect::<Vec<_>>();
    debug!(
        tiles = tiles.iter().flatten().count(),
        substituted = substituted.len(),
        "tiles processed"
    );
    Processed { tiles, substituted }
}

/// Folds duplicates and packs one rect per atlas slot.
#[instrument(skip_all)]
fn pack(processed: &Processed, cfg: &BakeConfig) -> Result<Packed> {
    let slots = assign_slots(&processed.tiles, cfg.remove_duplicates);
    debug!(slots = slots.slot_count(), folded = slots.folded, "slots assigned");
    let sizes: Vec<(u32, u32)> = slots
        .representatives
        .iter()
        .filter_map(|&t| processed.tiles[t].as_ref().map(ProcessedTile::padded_size))
        .collect();
    let layouts = pack_pages(&sizes, &PagingOptions::from_config(cfg))?;
    let mut entry_of_slot: Vec<Option<AtlasEntry>> = vec![None; sizes.len()];
    for layout in &layouts {
        for e in &layout.entries {
            entry_of_slot[e.slot] = Some(*e);
        }
    }
    Ok(Packed {
        slots,
        layouts,
        // pack_pages either places every slot or fails
        entry_of_slot: entry_of_slot.into_iter().flatten().collect(),
    })
}

#[instrument(skip_all)]
fn composite(processed: &Processed, packed: &Packed) -> Vec<AtlasPage> {
    packed
        .layouts
        .iter()
        .map(|layout| {
            let rgba = composite_page(layout, |slot| {
                let tile = *packed.slots.representatives.get(slot)?;
                processed.tiles[tile].as_ref().map(|t| &t.rgba)
            });
            AtlasPage {
                layout: layout.clone(),
                rgba,
            }
        })
        .collect()
}

/// Where job `job` ended up, if it produced a tile.
fn placed_tile<'a>(processed: &'a Processed, packed: &'a Packed, job: usize) -> Option<PlacedTile<'a>> {
    let tile = processed.tiles[job].as_ref()?;
    let slot = packed.slots.slot_of_tile[job]?;
    let entry = packed.entry_of_slot.get(slot)?;
    let layout = &packed.layouts[entry.page];
    Some(PlacedTile {
        tile,
        entry,
        page_size: (layout.width, layout.height),
        cell_origin: (0, 0),
    })
}

fn build_sprite(sp: &SpritePlan, plan: &Plan, processed: &Processed, packed: &Packed, cfg: &BakeConfig) -> SpriteDefinition {
    let req = &sp.request;
    let src = &plan.sources[sp.source];
    let (w, h) = (src.width() as f32, src.height() as f32);
    let rescale = cfg.global_texture_rescale;
    let frame = SpriteFrame {
        width: w,
        height: h,
        anchor: req.anchor.resolve(w, h, rescale),
        scale: req.scale,
        pixel_scale: cfg.pixel_scale(),
        rescale,
    };

    let mut mesh = MeshData::default();
    let mut first: Option<PlacedTile> = None;
    for r in &sp.tiles {
        let Some(mut p) = placed_tile(processed, packed, r.tile) else {
            continue;
        };
        p.cell_origin = r.cell_origin;
        match &req.custom_geometry {
            Some(islands) => mesh.push_polygons(&frame, islands, &p),
            _ => mesh.push_quad(&frame, &p),
        }
        first.get_or_insert(p);
    }
    if req.double_sided {
        mesh.make_double_sided();
    }

    let bounds = mesh.bounds();
    let (normals, tangents) = mesh.vertex_attributes(cfg.normal_generation);
    let page = first.map_or(0, |p| p.entry.page);
    let placeholder = sp.placeholder.or_else(|| {
        let all_blank = !sp.tiles.is_empty()
            && !req.is_diced()
            && sp.tiles.iter().all(|r| processed.substituted.contains(&r.tile));
        all_blank.then_some(Placeholder::Transparent)
    });
    if placeholder == Some(Placeholder::Transparent) && sp.placeholder.is_none() {
        warn!(sprite = %req.name, "sprite has no visible pixels, baked as a transparent placeholder");
    }

    SpriteDefinition {
        name: req.name.clone(),
        uv2: cfg.sprite_local_uv2.then(|| mesh.uv2(&frame)),
        normals,
        tangents,
        bounds,
        untrimmed_bounds: frame.untrimmed_bounds(),
        texel_size: frame.texel_size(),
        collider: build_collider(&req.collider, &frame, &bounds, cfg.physics_depth),
        material_id: if cfg.allow_multiple_pages { page } else { req.material_id },
        page,
        flipped: !req.is_diced() && first.is_some_and(|p| p.entry.flipped),
        attach_points: req
            .attach_points
            .iter()
            .map(|a| AttachPoint {
                name: a.name.clone(),
                position: frame.local_original(a.position).truncate(),
                angle: a.angle,
            })
            .collect(),
        placeholder,
        positions: mesh.positions,
        uvs: mesh.uvs,
        indices: mesh.indices,
    }
}

fn build_fonts(input: &BakeInput, plan: &Plan, processed: &Processed, packed: &Packed, cfg: &BakeConfig) -> Vec<FontTable> {
    input
        .fonts
        .iter()
        .zip(&plan.fonts)
        .filter_map(|(req, fp)| {
            let glyphs: HashMap<u32, PlacedTile> = fp
                .glyphs
                .iter()
                .filter_map(|&(id, job)| placed_tile(processed, packed, job).map(|p| (id, p)))
                .collect();
            // the missing glyph is never dropped by processing
            let missing = placed_tile(processed, packed, fp.missing)?;
            debug!(font = %req.name, glyphs = glyphs.len(), "font table built");
            Some(build_font_table(
                &req.name,
                &req.definition,
                req.flip_texture_y,
                cfg.global_texture_rescale,
                &glyphs,
                &missing,
            ))
        })
        .collect()
}
