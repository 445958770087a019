//! Content-addressed image store (Sixel / iTerm2 inline images).
//!
//! A [`RasterizedImage`] is the decoded pixel data plus the cell-span it was
//! sliced into. Cells hold only a small [`ImageFragmentRef`] (kept `Copy` so
//! [`crate::cell::Cell`] stays `Copy`); the pool owns the actual pixels and
//! reference-counts fragments explicitly, since the grid never holds a
//! pointer the pool can observe drop.

use std::collections::{HashMap, VecDeque};

/// Placeholder pixel footprint assumed for one grid cell when a wire format
/// doesn't declare its own pixel size (no font-metrics source is available
/// here; real rendering backends substitute their own cell size).
pub const DEFAULT_CELL_PIXEL_WIDTH: u32 = 10;
pub const DEFAULT_CELL_PIXEL_HEIGHT: u32 = 20;

/// Read a DEC sixel raster-attributes command (`"Pan;Pad;Ph;Pv`) out of a
/// sixel data stream, returning the declared `(width, height)` in pixels.
///
/// Returns `None` if the stream never sets raster attributes, which is
/// legal sixel (size is then implied by the pixel data itself).
#[must_use]
pub fn parse_sixel_raster_attributes(data: &[u8]) -> Option<(u32, u32)> {
    let quote = data.iter().position(|&b| b == b'"')?;
    let rest = &data[quote + 1..];
    let end = rest
        .iter()
        .position(|&b| !(b.is_ascii_digit() || b == b';'))
        .unwrap_or(rest.len());
    let text = std::str::from_utf8(&rest[..end]).ok()?;
    let mut parts = text.split(';');
    let _pan = parts.next()?;
    let _pad = parts.next()?;
    let ph: u32 = parts.next()?.parse().ok()?;
    let pv: u32 = parts.next()?.parse().ok()?;
    Some((ph, pv))
}

/// An iTerm2 inline-image OSC 1337 payload, parsed enough to place it:
/// declared cell span (if given in cells rather than pixels/percent) and
/// the base64 pixel payload.
#[derive(Debug, Clone, Default)]
pub struct Iterm2ImageSpec {
    pub width_cells: Option<u16>,
    pub height_cells: Option<u16>,
    pub base64_data: String,
}

/// Parse `File=[key=value;...]:<base64>` (the `File=` prefix already
/// stripped by the caller's classifier is tolerated either way).
#[must_use]
pub fn parse_iterm2_image(payload: &str) -> Iterm2ImageSpec {
    let body = payload.strip_prefix("File=").unwrap_or(payload);
    let (params, data) = body.split_once(':').unwrap_or((body, ""));
    let mut spec = Iterm2ImageSpec { base64_data: data.to_string(), ..Default::default() };
    for kv in params.split(';') {
        let Some((key, value)) = kv.split_once('=') else { continue };
        match key {
            "width" => spec.width_cells = parse_cell_count(value),
            "height" => spec.height_cells = parse_cell_count(value),
            _ => {}
        }
    }
    spec
}

/// iTerm2 width/height values may be a bare cell count, a `px`/`%` suffixed
/// size, or `auto`. Only the bare-cell-count form maps onto a span directly;
/// pixel and percentage forms need font metrics this crate doesn't have.
fn parse_cell_count(value: &str) -> Option<u16> {
    if value.ends_with("px") || value.ends_with('%') || value == "auto" {
        return None;
    }
    value.parse().ok()
}

/// Monotonically increasing image identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageId(pub u32);

/// Source protocol an image was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Sixel,
    Iterm2,
}

/// How a rasterized image is aligned within its cell span when the pixel
/// size isn't an exact multiple of the cell grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageAlignment {
    #[default]
    TopLeft,
    Center,
}

/// How a rasterized image is fit to its cell span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageResizePolicy {
    #[default]
    Stretch,
    Preserve,
    NoResize,
}

/// A decoded image plus the cell-span geometry it was sliced into.
///
/// `data` is opaque RGBA pixel data; this crate never decodes or paints it,
/// it only tracks the geometry and reference count needed to know when a
/// fragment can be evicted.
#[derive(Debug, Clone)]
pub struct RasterizedImage {
    pub id: ImageId,
    pub format: ImageFormat,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub cell_cols: u16,
    pub cell_rows: u16,
    pub alignment: ImageAlignment,
    pub resize: ImageResizePolicy,
    pub data: Vec<u8>,
    refcount: u32,
}

/// A cell-sized reference to one fragment of a [`RasterizedImage`].
///
/// `col`/`row` are the fragment's position within the image's cell span, not
/// its grid position (the grid already knows which cell holds it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageFragmentRef {
    pub image_id: ImageId,
    pub col: u16,
    pub row: u16,
}

/// LRU index mapping human-assigned names to image ids, plus the content
/// store itself.
///
/// Images are released when both the last placed fragment and the last
/// name binding drop.
#[derive(Debug)]
pub struct ImagePool {
    next_id: u32,
    images: HashMap<ImageId, RasterizedImage>,
    name_order: VecDeque<String>,
    name_index: HashMap<String, ImageId>,
    name_capacity: usize,
}

impl Default for ImagePool {
    fn default() -> Self {
        Self::new(64)
    }
}

impl ImagePool {
    pub fn new(name_capacity: usize) -> Self {
        Self {
            next_id: 1,
            images: HashMap::new(),
            name_order: VecDeque::new(),
            name_index: HashMap::new(),
            name_capacity: name_capacity.max(1),
        }
    }

    /// Register a newly-rasterized image with zero outstanding fragments.
    pub fn register(
        &mut self,
        format: ImageFormat,
        pixel_width: u32,
        pixel_height: u32,
        cell_cols: u16,
        cell_rows: u16,
        alignment: ImageAlignment,
        resize: ImageResizePolicy,
        data: Vec<u8>,
    ) -> ImageId {
        let id = ImageId(self.next_id);
        self.next_id += 1;
        self.images.insert(
            id,
            RasterizedImage {
                id,
                format,
                pixel_width,
                pixel_height,
                cell_cols,
                cell_rows,
                alignment,
                resize,
                data,
                refcount: 0,
            },
        );
        id
    }

    pub fn get(&self, id: ImageId) -> Option<&RasterizedImage> {
        self.images.get(&id)
    }

    /// Take a reference to one fragment of `id`, incrementing its refcount.
    ///
    /// Returns `None` if `id` is not (or no longer) registered.
    pub fn fragment_ref(&mut self, id: ImageId, col: u16, row: u16) -> Option<ImageFragmentRef> {
        let img = self.images.get_mut(&id)?;
        img.refcount += 1;
        Some(ImageFragmentRef {
            image_id: id,
            col,
            row,
        })
    }

    /// Release one fragment reference, evicting the image once its refcount
    /// and name bindings both reach zero.
    pub fn release_fragment(&mut self, frag: ImageFragmentRef) {
        let should_evict = match self.images.get_mut(&frag.image_id) {
            Some(img) => {
                img.refcount = img.refcount.saturating_sub(1);
                img.refcount == 0 && !self.name_index.values().any(|v| *v == frag.image_id)
            }
            None => false,
        };
        if should_evict {
            self.images.remove(&frag.image_id);
        }
    }

    /// Bind a human-readable name to an image id, evicting the
    /// least-recently-used binding if the name index is at capacity.
    pub fn bind_name(&mut self, name: String, id: ImageId) {
        if let Some(existing) = self.name_index.remove(&name) {
            self.name_order.retain(|n| n != &name);
            self.maybe_evict_if_orphaned(existing);
        }
        while self.name_order.len() >= self.name_capacity {
            if let Some(oldest) = self.name_order.pop_front() {
                if let Some(old_id) = self.name_index.remove(&oldest) {
                    self.maybe_evict_if_orphaned(old_id);
                }
            } else {
                break;
            }
        }
        self.name_order.push_back(name.clone());
        self.name_index.insert(name, id);
    }

    /// Resolve a bound name to its image id, marking it most-recently-used.
    pub fn resolve_name(&mut self, name: &str) -> Option<ImageId> {
        if !self.name_index.contains_key(name) {
            return None;
        }
        self.name_order.retain(|n| n != name);
        self.name_order.push_back(name.to_string());
        self.name_index.get(name).copied()
    }

    fn maybe_evict_if_orphaned(&mut self, id: ImageId) {
        let orphaned = matches!(self.images.get(&id), Some(img) if img.refcount == 0)
            && !self.name_index.values().any(|v| *v == id);
        if orphaned {
            self.images.remove(&id);
        }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(pool: &mut ImagePool) -> ImageId {
        pool.register(
            ImageFormat::Sixel,
            64,
            32,
            8,
            2,
            ImageAlignment::TopLeft,
            ImageResizePolicy::Stretch,
            vec![0u8; 64 * 32 * 4],
        )
    }

    #[test]
    fn fragment_refcount_releases_on_last_drop() {
        let mut pool = ImagePool::default();
        let id = sample(&mut pool);
        let f1 = pool.fragment_ref(id, 0, 0).unwrap();
        let f2 = pool.fragment_ref(id, 1, 0).unwrap();
        assert_eq!(pool.len(), 1);
        pool.release_fragment(f1);
        assert_eq!(pool.len(), 1);
        pool.release_fragment(f2);
        assert_eq!(pool.len(), 0);
    }

    #[test]
    fn name_binding_keeps_image_alive_without_fragments() {
        let mut pool = ImagePool::default();
        let id = sample(&mut pool);
        let frag = pool.fragment_ref(id, 0, 0).unwrap();
        pool.bind_name("logo".into(), id);
        pool.release_fragment(frag);
        assert_eq!(pool.len(), 1, "name binding should keep the image alive");
        assert_eq!(pool.resolve_name("logo"), Some(id));
    }

    #[test]
    fn name_lru_evicts_oldest_binding() {
        let mut pool = ImagePool::new(2);
        let a = sample(&mut pool);
        let b = sample(&mut pool);
        let c = sample(&mut pool);
        pool.bind_name("a".into(), a);
        pool.bind_name("b".into(), b);
        pool.bind_name("c".into(), c);
        assert_eq!(pool.resolve_name("a"), None, "oldest binding should be evicted");
        assert_eq!(pool.resolve_name("b"), Some(b));
        assert_eq!(pool.resolve_name("c"), Some(c));
    }

    #[test]
    fn unregistered_image_fragment_ref_is_none() {
        let mut pool = ImagePool::default();
        assert!(pool.fragment_ref(ImageId(999), 0, 0).is_none());
    }

    #[test]
    fn sixel_raster_attributes_parse_width_and_height() {
        assert_eq!(parse_sixel_raster_attributes(b"\"1;1;64;32#0;2;0;0;0"), Some((64, 32)));
    }

    #[test]
    fn sixel_raster_attributes_absent_returns_none() {
        assert_eq!(parse_sixel_raster_attributes(b"#0;2;0;0;0$-"), None);
    }

    #[test]
    fn iterm2_image_parses_cell_dimensions_and_payload() {
        let spec = parse_iterm2_image("File=width=4;height=2;inline=1:aGVsbG8=");
        assert_eq!(spec.width_cells, Some(4));
        assert_eq!(spec.height_cells, Some(2));
        assert_eq!(spec.base64_data, "aGVsbG8=");
    }

    #[test]
    fn iterm2_image_pixel_size_is_unresolved_without_font_metrics() {
        let spec = parse_iterm2_image("File=width=100px;height=auto:aGVsbG8=");
        assert_eq!(spec.width_cells, None);
        assert_eq!(spec.height_cells, None);
    }
}
