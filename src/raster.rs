//! Pattern rasterizer.
//!
//! A pattern without textures rasterizes immediately. As soon as one tile
//! references a texture the work is returned as a future so decoding never
//! runs on the input path; [`RasterWorker`] drives those futures on one
//! background thread and [`RasterSlot`] makes sure only the newest request
//! ever lands.

use crate::error::Result;
use crate::geometry::{BoundingBox, point_in_ring};
use crate::model::{Pattern, Point, Rgba, Tile};
use futures::FutureExt;
use futures::future::BoxFuture;
use image::RgbaImage;
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_polygon_mut, draw_polygon_mut};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError, mpsc};
use tracing::{debug, warn};

/// Largest raster side we are willing to allocate.
const MAX_RASTER_SIDE: u32 = 4096;

/// Resolves a tile's `texture_ref` to encoded image bytes.
pub trait TextureStore: Send + Sync {
    fn load(&self, texture_ref: &str) -> Option<Vec<u8>>;
}

#[derive(Clone, Debug, Default)]
pub struct MemoryTextures {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemoryTextures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, texture_ref: impl Into<String>, bytes: Vec<u8>) {
        self.entries.insert(texture_ref.into(), bytes);
    }
}

impl TextureStore for MemoryTextures {
    fn load(&self, texture_ref: &str) -> Option<Vec<u8>> {
        self.entries.get(texture_ref).cloned()
    }
}

/// Textures on disk, addressed through the project's `textures` table.
/// Relative paths resolve against `root`.
#[derive(Clone, Debug, Default)]
pub struct FileTextures {
    pub root: PathBuf,
    pub index: BTreeMap<String, String>,
}

impl TextureStore for FileTextures {
    fn load(&self, texture_ref: &str) -> Option<Vec<u8>> {
        let path = self.root.join(self.index.get(texture_ref)?);
        match std::fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(texture = texture_ref, path = %path.display(), error = %e, "texture unreadable");
                None
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RasterOptions {
    pub pixels_per_unit: f64,
    /// Replaces the pattern's gap colour as background.
    pub background: Option<Rgba>,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            pixels_per_unit: 1.0,
            background: None,
        }
    }
}

pub enum Raster {
    Ready(RgbaImage),
    Pending(BoxFuture<'static, RgbaImage>),
}

impl Raster {
    pub fn is_ready(&self) -> bool {
        matches!(self, Raster::Ready(_))
    }

    /// Drive the raster to completion on the current thread.
    pub fn wait(self) -> RgbaImage {
        match self {
            Raster::Ready(img) => img,
            Raster::Pending(fut) => futures::executor::block_on(fut),
        }
    }
}

/// Decoded textures shared between raster requests. Each `texture_ref` is
/// read and decoded at most once; a missing or undecodable texture is
/// remembered as such until [`TextureCache::forget`].
pub struct TextureCache {
    store: Box<dyn TextureStore>,
    decoded: Mutex<BTreeMap<String, Option<Arc<RgbaImage>>>>,
}

impl TextureCache {
    pub fn new(store: impl TextureStore + 'static) -> Self {
        Self {
            store: Box::new(store),
            decoded: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn get(&self, texture_ref: &str) -> Option<Arc<RgbaImage>> {
        let mut decoded = self.decoded.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = decoded.get(texture_ref) {
            return entry.clone();
        }
        let entry = match self.store.load(texture_ref) {
            None => {
                debug!(texture = texture_ref, "texture not found, using flat colour");
                None
            }
            Some(bytes) => match decode_texture(&bytes) {
                Ok(img) => Some(Arc::new(img)),
                Err(e) => {
                    warn!(texture = texture_ref, error = %e, "texture decode failed");
                    None
                }
            },
        };
        decoded.insert(texture_ref.to_string(), entry.clone());
        entry
    }

    pub fn forget(&self, texture_ref: &str) {
        self.decoded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(texture_ref);
    }
}

pub fn needs_textures(pattern: &Pattern) -> bool {
    pattern.tiles.iter().any(|t| t.texture_ref.is_some())
}

pub fn rasterize(pattern: &Pattern, options: &RasterOptions, textures: Arc<TextureCache>) -> Raster {
    if !needs_textures(pattern) {
        return Raster::Ready(paint(pattern, options, &BTreeMap::new()));
    }
    let pattern = pattern.clone();
    let options = *options;
    Raster::Pending(
        async move {
            let decoded = decode_textures(&pattern, &textures);
            paint(&pattern, &options, &decoded)
        }
        .boxed(),
    )
}

pub fn decode_texture(bytes: &[u8]) -> Result<RgbaImage> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

fn decode_textures(pattern: &Pattern, cache: &TextureCache) -> BTreeMap<String, Arc<RgbaImage>> {
    let mut decoded = BTreeMap::new();
    for texture_ref in pattern.tiles.iter().filter_map(|t| t.texture_ref.as_deref()) {
        if decoded.contains_key(texture_ref) {
            continue;
        }
        if let Some(img) = cache.get(texture_ref) {
            decoded.insert(texture_ref.to_string(), img);
        }
    }
    decoded
}

/// One raster request for [`RasterWorker`].
pub struct RasterJob {
    pub generation: u64,
    pub pattern: Pattern,
    pub options: RasterOptions,
    pub textures: Arc<TextureCache>,
}

/// Finished raster tagged with the generation it was requested under.
pub type RasterResult = (u64, RgbaImage);

/// A single background thread that paints textured patterns. Requests that
/// queue up while it is busy are skipped in favour of the newest one.
pub struct RasterWorker {
    jobs: mpsc::Sender<RasterJob>,
    results: mpsc::Receiver<RasterResult>,
}

impl RasterWorker {
    /// Start the worker; `notify` runs after every finished raster.
    pub fn spawn(notify: impl Fn() + Send + 'static) -> Result<Self> {
        let (jobs, job_rx) = mpsc::channel::<RasterJob>();
        let (result_tx, results) = mpsc::channel();
        std::thread::Builder::new()
            .name("pattern-raster".into())
            .spawn(move || {
                while let Ok(job) = job_rx.recv() {
                    let job = newest(job, &job_rx);
                    let image = rasterize(&job.pattern, &job.options, job.textures).wait();
                    if result_tx.send((job.generation, image)).is_err() {
                        break;
                    }
                    notify();
                }
                debug!("raster worker stopped");
            })?;
        Ok(Self { jobs, results })
    }

    pub fn submit(&self, job: RasterJob) -> bool {
        self.jobs.send(job).is_ok()
    }

    pub fn try_recv(&self) -> Option<RasterResult> {
        self.results.try_recv().ok()
    }
}

/// Drain whatever queued behind `job` and keep the last one.
fn newest(mut job: RasterJob, queue: &mpsc::Receiver<RasterJob>) -> RasterJob {
    while let Ok(next) = queue.try_recv() {
        debug!(skipped = job.generation, "superseded raster request");
        job = next;
    }
    job
}

fn raster_size(pattern: &Pattern, ppu: f64) -> (u32, u32) {
    let side = |v: f64| ((v * ppu).ceil().max(1.0) as u32).min(MAX_RASTER_SIDE);
    (side(pattern.width), side(pattern.height))
}

fn paint(pattern: &Pattern, options: &RasterOptions, textures: &BTreeMap<String, Arc<RgbaImage>>) -> RgbaImage {
    let ppu = if options.pixels_per_unit > 0.0 {
        options.pixels_per_unit
    } else {
        1.0
    };
    let (w, h) = raster_size(pattern, ppu);
    let background = options.background.unwrap_or(pattern.gap_color);
    let mut img = RgbaImage::from_pixel(w, h, background.to_image());

    for tile in &pattern.tiles {
        let texture = tile.texture_ref.as_deref().and_then(|r| textures.get(r));
        match texture {
            Some(texture) => fill_textured(&mut img, tile, texture, ppu),
            None => fill_flat(&mut img, tile, ppu),
        }
        stroke(&mut img, tile, pattern.gap_color, pattern.tiles_gap, ppu);
    }
    img
}

/// Integer polygon for imageproc: consecutive duplicates and a repeated
/// closing point are dropped.
fn int_polygon(points: &[Point], ppu: f64) -> Vec<imageproc::point::Point<i32>> {
    let mut poly: Vec<imageproc::point::Point<i32>> = Vec::with_capacity(points.len());
    for p in points {
        let q = imageproc::point::Point::new((p.x * ppu).round() as i32, (p.y * ppu).round() as i32);
        if poly.last() != Some(&q) {
            poly.push(q);
        }
    }
    while poly.len() > 1 && poly.first() == poly.last() {
        poly.pop();
    }
    poly
}

fn fill_flat(img: &mut RgbaImage, tile: &Tile, ppu: f64) {
    let poly = int_polygon(&tile.points, ppu);
    if poly.len() < 3 {
        return;
    }
    draw_polygon_mut(img, &poly, tile.color.to_image());
}

fn fill_textured(img: &mut RgbaImage, tile: &Tile, texture: &RgbaImage, ppu: f64) {
    let Some(bounds) = BoundingBox::from_points(&tile.points) else {
        return;
    };
    let scale = if tile.texture_scale > 0.0 {
        tile.texture_scale
    } else {
        1.0
    };
    let (tw, th) = (texture.width() as f64, texture.height() as f64);
    let x0 = (bounds.min_x * ppu).floor().max(0.0) as u32;
    let y0 = (bounds.min_y * ppu).floor().max(0.0) as u32;
    let x1 = ((bounds.max_x * ppu).ceil().max(0.0) as u32).min(img.width());
    let y1 = ((bounds.max_y * ppu).ceil().max(0.0) as u32).min(img.height());

    for py in y0..y1 {
        for px in x0..x1 {
            let p = Point::new((px as f64 + 0.5) / ppu, (py as f64 + 0.5) / ppu);
            if !point_in_ring(p, &tile.points) {
                continue;
            }
            let tx = ((p.x - tile.texture_offset_x) / scale).rem_euclid(tw) as u32;
            let ty = ((p.y - tile.texture_offset_y) / scale).rem_euclid(th) as u32;
            let texel = *texture.get_pixel(tx.min(texture.width() - 1), ty.min(texture.height() - 1));
            img.put_pixel(px, py, texel);
        }
    }
}

/// Outline a tile with the gap colour, `width` pattern units wide and
/// centred on the tile edges. Adjacent tiles laid edge to edge end up
/// exactly `width` apart.
fn stroke(img: &mut RgbaImage, tile: &Tile, color: Rgba, width: f64, ppu: f64) {
    let poly = int_polygon(&tile.points, ppu);
    if poly.len() < 3 || !(width > 0.0) {
        return;
    }
    let half = width * ppu * 0.5;
    let color = color.to_image();
    if half < 0.5 {
        let hairline: Vec<imageproc::point::Point<f32>> = poly
            .iter()
            .map(|p| imageproc::point::Point::new(p.x as f32, p.y as f32))
            .collect();
        draw_hollow_polygon_mut(img, &hairline, color);
        return;
    }

    let corners: Vec<Point> = tile.points.iter().map(|&p| p * ppu).collect();
    for (i, &a) in corners.iter().enumerate() {
        let b = corners[(i + 1) % corners.len()];
        let dir = b - a;
        let len = dir.length();
        if len > 0.0 {
            let normal = Point::new(-dir.y / len, dir.x / len) * half;
            let band = int_polygon(&[a + normal, b + normal, b - normal, a - normal], 1.0);
            if band.len() >= 3 {
                draw_polygon_mut(img, &band, color);
            }
        }
        // round joins
        draw_filled_circle_mut(img, (a.x.round() as i32, a.y.round() as i32), half.round() as i32, color);
    }
}

/// Holds the displayed raster and the generation of the newest request.
/// Results from older requests are dropped when they arrive.
#[derive(Debug, Default)]
pub struct RasterSlot {
    generation: u64,
    shown_generation: u64,
    current: Option<RgbaImage>,
}

impl RasterSlot {
    /// Start a new request; anything issued earlier becomes stale.
    pub fn request(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Accept a finished raster if it belongs to the newest request.
    pub fn complete(&mut self, generation: u64, image: RgbaImage) -> bool {
        if generation != self.generation {
            debug!(generation, latest = self.generation, "dropping stale raster");
            return false;
        }
        self.current = Some(image);
        self.shown_generation = generation;
        true
    }

    pub fn current(&self) -> Option<&RgbaImage> {
        self.current.as_ref()
    }

    pub fn latest(&self) -> u64 {
        self.generation
    }

    pub fn is_pending(&self) -> bool {
        self.shown_generation != self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::pattern::{default_pattern, rectangle_tile};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    fn png(color: [u8; 4]) -> Vec<u8> {
        let img = RgbaImage::from_pixel(4, 4, image::Rgba(color));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn single_tile() -> Pattern {
        Pattern {
            width: 40.0,
            height: 40.0,
            gap_color: Rgba::rgb(0, 0, 0),
            tiles: vec![rectangle_tile(1, 10.0, 10.0, 20.0, 20.0, Rgba::rgb(200, 10, 10))],
            ..default_pattern()
        }
    }

    fn store() -> Arc<TextureCache> {
        let mut textures = MemoryTextures::new();
        textures.insert("blue", png([0, 0, 255, 255]));
        textures.insert("broken", b"not an image".to_vec());
        Arc::new(TextureCache::new(textures))
    }

    /// Counts how often a texture is fetched.
    struct CountingStore {
        inner: MemoryTextures,
        loads: Arc<AtomicUsize>,
    }

    impl TextureStore for CountingStore {
        fn load(&self, texture_ref: &str) -> Option<Vec<u8>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.inner.load(texture_ref)
        }
    }

    fn job(generation: u64, textures: &Arc<TextureCache>) -> RasterJob {
        let mut pattern = single_tile();
        pattern.tiles[0].texture_ref = Some("blue".into());
        RasterJob {
            generation,
            pattern,
            options: RasterOptions::default(),
            textures: textures.clone(),
        }
    }

    #[test]
    fn flat_pattern_is_ready_immediately() {
        let raster = rasterize(&single_tile(), &RasterOptions::default(), store());
        assert!(raster.is_ready());
        let img = raster.wait();
        assert_eq!(img.dimensions(), (40, 40));
        assert_eq!(img.get_pixel(20, 20).0, [200, 10, 10, 255]);
        assert_eq!(img.get_pixel(2, 2).0, [0, 0, 0, 255]);
        // outline painted in the gap colour
        assert_eq!(img.get_pixel(10, 20).0, [0, 0, 0, 255]);
    }

    #[test]
    fn gap_width_follows_tiles_gap() {
        let mut pattern = Pattern {
            width: 100.0,
            height: 100.0,
            tiles_gap: 20.0,
            ..single_tile()
        };
        pattern.tiles = vec![rectangle_tile(1, 20.0, 20.0, 60.0, 60.0, Rgba::rgb(200, 10, 10))];
        let wide = rasterize(&pattern, &RasterOptions::default(), store()).wait();
        // 2 units inside the left edge, within half the gap
        assert_eq!(wide.get_pixel(22, 50).0, [0, 0, 0, 255]);
        assert_eq!(wide.get_pixel(50, 50).0, [200, 10, 10, 255]);

        pattern.tiles_gap = 0.0;
        let none = rasterize(&pattern, &RasterOptions::default(), store()).wait();
        assert_eq!(none.get_pixel(22, 50).0, [200, 10, 10, 255]);
        assert_ne!(wide, none);
    }

    #[test]
    fn background_override_and_scaling() {
        let options = RasterOptions {
            pixels_per_unit: 2.0,
            background: Some(Rgba::rgb(9, 9, 9)),
        };
        let img = rasterize(&single_tile(), &options, store()).wait();
        assert_eq!(img.dimensions(), (80, 80));
        assert_eq!(img.get_pixel(3, 3).0, [9, 9, 9, 255]);
        assert_eq!(img.get_pixel(40, 40).0, [200, 10, 10, 255]);
    }

    #[test]
    fn textured_pattern_resolves_later() {
        let mut pattern = single_tile();
        pattern.tiles[0].texture_ref = Some("blue".into());
        let raster = rasterize(&pattern, &RasterOptions::default(), store());
        assert!(!raster.is_ready());
        let img = raster.wait();
        assert_eq!(img.get_pixel(20, 20).0, [0, 0, 255, 255]);
    }

    #[test]
    fn missing_or_broken_texture_falls_back_to_colour() {
        for name in ["nowhere", "broken"] {
            let mut pattern = single_tile();
            pattern.tiles[0].texture_ref = Some(name.into());
            let img = rasterize(&pattern, &RasterOptions::default(), store()).wait();
            assert_eq!(img.get_pixel(20, 20).0, [200, 10, 10, 255], "{name}");
        }
    }

    #[test]
    fn decode_reports_bad_bytes() {
        assert!(matches!(decode_texture(b"nope"), Err(Error::Image(_))));
    }

    #[test]
    fn degenerate_tiles_are_skipped() {
        let mut pattern = single_tile();
        pattern.tiles[0].points.truncate(2);
        let img = rasterize(&pattern, &RasterOptions::default(), store()).wait();
        assert_eq!(img.get_pixel(20, 20).0, [0, 0, 0, 255]);
    }

    #[test]
    fn textures_are_decoded_once() {
        let loads = Arc::new(AtomicUsize::new(0));
        let mut inner = MemoryTextures::new();
        inner.insert("blue", png([0, 0, 255, 255]));
        let cache = Arc::new(TextureCache::new(CountingStore {
            inner,
            loads: loads.clone(),
        }));
        let mut pattern = single_tile();
        pattern.tiles[0].texture_ref = Some("blue".into());
        pattern.tiles.push(rectangle_tile(2, 0.0, 0.0, 5.0, 5.0, Rgba::rgb(1, 1, 1)));
        pattern.tiles[1].texture_ref = Some("missing".into());

        for _ in 0..3 {
            let img = rasterize(&pattern, &RasterOptions::default(), cache.clone()).wait();
            assert_eq!(img.get_pixel(20, 20).0, [0, 0, 255, 255]);
        }
        // one load each for "blue" and "missing"
        assert_eq!(loads.load(Ordering::SeqCst), 2);

        cache.forget("blue");
        rasterize(&pattern, &RasterOptions::default(), cache).wait();
        assert_eq!(loads.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn queued_requests_collapse_to_the_newest() {
        let textures = store();
        let (tx, rx) = mpsc::channel();
        for generation in 2..=4 {
            tx.send(job(generation, &textures)).unwrap();
        }
        let picked = newest(job(1, &textures), &rx);
        assert_eq!(picked.generation, 4);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn worker_paints_in_the_background() {
        let textures = store();
        let worker = RasterWorker::spawn(|| {}).unwrap();
        assert!(worker.submit(job(7, &textures)));

        let deadline = Instant::now() + Duration::from_secs(10);
        let (generation, image) = loop {
            if let Some(result) = worker.try_recv() {
                break result;
            }
            assert!(Instant::now() < deadline, "raster worker never answered");
            std::thread::sleep(Duration::from_millis(5));
        };
        assert_eq!(generation, 7);
        assert_eq!(image.get_pixel(20, 20).0, [0, 0, 255, 255]);
    }

    #[test]
    fn stale_raster_never_overwrites_newer() {
        let mut slot = RasterSlot::default();
        let first = slot.request();
        let second = slot.request();
        assert!(slot.is_pending());
        assert!(slot.complete(second, RgbaImage::new(2, 2)));
        assert!(!slot.complete(first, RgbaImage::new(1, 1)));
        assert_eq!(slot.current().map(|i| i.width()), Some(2));
        assert!(!slot.is_pending());
        assert_eq!(slot.latest(), 2);
    }
}
