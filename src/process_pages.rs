use crate::compositor::PageDocument;
use crate::error::{Result, WatermarkError};
use crate::params::{PageTarget, PlacementRect};
use crate::synth::ResolvedRaster;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::debug;

// ========== small helpers ==========
#[inline]
fn dict_get<'a>(dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    dict.get(key).ok()
}

#[inline]
fn obj_as_dict_owned(obj: &Object, doc: &Document) -> Option<Dictionary> {
    match obj {
        Object::Dictionary(d) => Some(d.clone()),
        Object::Reference(idref) => {
            let d = doc.get_object(*idref).ok()?.as_dict().ok()?;
            Some(d.clone())
        }
        _ => None,
    }
}

fn as_f64(n: &Object) -> Option<f64> {
    match n {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

/// Embedded watermark image, shared by every page that shows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbeddedImage {
    id: ObjectId,
}

impl EmbeddedImage {
    /// Resource name used in page `/XObject` dictionaries.
    fn resource_name(&self) -> String {
        format!("Wm{}", self.id.0)
    }
}

/// A PDF opened with lopdf. Every change stays in memory until [`save`].
///
/// [`save`]: PageDocument::save
pub struct LopdfDocument {
    doc: Document,
    pages: BTreeMap<u32, ObjectId>,
    /// pages whose original content is already wrapped in `q`/`Q`
    isolated: HashSet<ObjectId>,
}

impl LopdfDocument {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(WatermarkError::InputNotFound {
                path: path.to_path_buf(),
            });
        }
        let doc = Document::load(path)?;
        Ok(Self::from_document(doc))
    }

    pub fn from_document(doc: Document) -> Self {
        let pages = doc.get_pages();
        Self {
            doc,
            pages,
            isolated: HashSet::new(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    fn page_id(&self, page: u32) -> Result<ObjectId> {
        self.pages
            .get(&page)
            .copied()
            .ok_or_else(|| WatermarkError::page(page, "page does not exist"))
    }

    /// Visible page box `(llx, lly, urx, ury)`.
    fn page_box(&self, page: u32) -> Result<(f64, f64, f64, f64)> {
        let pid = self.page_id(page)?;
        effective_box(&self.doc, pid, b"CropBox")
            .or_else(|| effective_box(&self.doc, pid, b"MediaBox"))
            .ok_or_else(|| WatermarkError::page(page, "page has no MediaBox"))
    }

    /// Clockwise display rotation of the page: 0, 90, 180 or 270.
    fn page_rotation(&self, page: u32) -> Result<i64> {
        let pid = self.page_id(page)?;
        Ok(effective_rotation(&self.doc, pid))
    }

    /// Wrap the page's existing content in `q`/`Q` so its graphics state
    /// cannot leak into the watermark.
    fn isolate_content(&mut self, pid: ObjectId) -> Result<()> {
        if !self.isolated.insert(pid) {
            return Ok(());
        }
        let old = content_refs(&self.doc, pid)?;
        if old.is_empty() {
            return Ok(());
        }
        let push = self
            .doc
            .add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        let pop = self
            .doc
            .add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));

        let mut contents = Vec::with_capacity(old.len() + 2);
        contents.push(Object::Reference(push));
        contents.extend(old);
        contents.push(Object::Reference(pop));
        let pd = self.doc.get_object_mut(pid)?.as_dict_mut()?;
        pd.set("Contents", Object::Array(contents));
        Ok(())
    }

    /// Make `image` reachable as `/name` from the page's resources.
    fn register_xobject(&mut self, pid: ObjectId, image: EmbeddedImage) -> Result<()> {
        let mut resources = effective_resources(&self.doc, pid).unwrap_or_default();
        let mut xobjs = if let Some(o) = dict_get(&resources, b"XObject") {
            obj_as_dict_owned(o, &self.doc).unwrap_or_default()
        } else {
            Dictionary::new()
        };
        let name = image.resource_name();
        if xobjs.has(name.as_bytes()) {
            return Ok(());
        }
        xobjs.set(name, Object::Reference(image.id));
        resources.set("XObject", Object::Dictionary(xobjs));

        let pd = self.doc.get_object_mut(pid)?.as_dict_mut()?;
        pd.set("Resources", Object::Dictionary(resources));
        Ok(())
    }

    fn append_content(&mut self, pid: ObjectId, content: Vec<u8>) -> Result<()> {
        let mut contents = content_refs(&self.doc, pid)?;
        let id = self.doc.add_object(Stream::new(Dictionary::new(), content));
        contents.push(Object::Reference(id));
        let pd = self.doc.get_object_mut(pid)?.as_dict_mut()?;
        pd.set("Contents", Object::Array(contents));
        Ok(())
    }
}

impl PageDocument for LopdfDocument {
    type Raster = EmbeddedImage;

    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_target(&self, page: u32) -> Result<PageTarget> {
        let (llx, lly, urx, ury) = self.page_box(page)?;
        let (width, height) = match self.page_rotation(page)? {
            90 | 270 => (ury - lly, urx - llx),
            _ => (urx - llx, ury - lly),
        };
        Ok(PageTarget {
            index: page,
            width,
            height,
        })
    }

    /// RGB samples plus an 8-bit soft mask carrying the raster's alpha.
    fn embed_raster(&mut self, raster: &ResolvedRaster) -> Result<EmbeddedImage> {
        let (w, h) = (raster.width() as i64, raster.height() as i64);
        let pixel_count = raster.pixels().len() / 4;
        let mut rgb = Vec::with_capacity(pixel_count * 3);
        let mut alpha = Vec::with_capacity(pixel_count);
        for px in raster.pixels().chunks_exact(4) {
            rgb.extend_from_slice(&px[..3]);
            alpha.push(px[3]);
        }

        let smask_id = self.doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => w,
                "Height" => h,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            alpha,
        ));
        let image_id = self.doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => w,
                "Height" => h,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Interpolate" => true,
                "SMask" => smask_id,
            },
            rgb,
        ));
        debug!(?image_id, width = w, height = h, "watermark image embedded");
        Ok(EmbeddedImage { id: image_id })
    }

    fn insert_raster(&mut self, page: u32, raster: EmbeddedImage, rect: &PlacementRect) -> Result<()> {
        let pid = self.page_id(page)?;
        let page_box = self.page_box(page)?;
        let rotation = self.page_rotation(page)?;

        self.isolate_content(pid)?;
        self.register_xobject(pid, raster)?;

        let [a, b, c, d, e, f] = placement_matrix(page_box, rotation, rect);
        let content = format!(
            "q\n{a:.4} {b:.4} {c:.4} {d:.4} {e:.4} {f:.4} cm\n/{name} Do\nQ\n",
            name = raster.resource_name(),
        );
        self.append_content(pid, content.into_bytes())
    }

    /// Write to a temporary file next to `path`, then rename it into place.
    fn save(&mut self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        _ = self.doc.compress();
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        self.doc.save_to(&mut tmp)?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// `cm` operands drawing the unit image square at `rect`, where `rect` is in
/// top-left coordinates of the page as displayed. The image stays upright
/// on screen whatever the page's `/Rotate`.
fn placement_matrix(page_box: (f64, f64, f64, f64), rotation: i64, rect: &PlacementRect) -> [f64; 6] {
    let (llx, lly, urx, ury) = page_box;
    let (w, h) = (urx - llx, ury - lly);
    let visible_h = if rotation % 180 == 0 { h } else { w };
    // lower-left corner of the rect in displayed space, y up
    let (dx, dy) = (rect.x, visible_h - rect.y - rect.height);
    let (rw, rh) = (rect.width, rect.height);

    match rotation {
        90 => [0.0, rw, -rh, 0.0, llx + w - dy, lly + dx],
        180 => [-rw, 0.0, 0.0, -rh, llx + w - dx, lly + h - dy],
        270 => [0.0, -rw, rh, 0.0, llx + dy, lly + h - dx],
        _ => [rw, 0.0, 0.0, rh, llx + dx, lly + dy],
    }
}

// ========== page tree lookups ==========
/// Content stream references of a page, flattened into a list.
fn content_refs(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>> {
    let page = doc.get_object(page_id)?.as_dict()?;
    let out = match dict_get(page, b"Contents") {
        None => Vec::new(),
        Some(Object::Array(arr)) => arr.clone(),
        Some(Object::Reference(cid)) => match doc.get_object(*cid)? {
            Object::Array(arr) => arr.clone(),
            _ => vec![Object::Reference(*cid)],
        },
        // content streams must be indirect; anything else is malformed
        Some(_) => {
            return Err(WatermarkError::corrupt(format!(
                "page object {} has an unsupported /Contents entry",
                page_id.0
            )));
        }
    };
    Ok(out)
}

fn effective_resources(doc: &Document, page_id: ObjectId) -> Option<Dictionary> {
    // directly on the page
    let page = doc.get_object(page_id).ok()?.as_dict().ok()?;
    if let Some(obj) = dict_get(page, b"Resources") {
        return obj_as_dict_owned(obj, doc);
    }

    // inherited through the Parent chain
    let mut cur = page;
    while let Some(Object::Reference(pid)) = dict_get(cur, b"Parent") {
        let parent = doc.get_object(*pid).ok()?.as_dict().ok()?;
        if let Some(obj) = dict_get(parent, b"Resources") {
            return obj_as_dict_owned(obj, doc);
        }
        cur = parent;
    }
    None
}

/// Inheritable `/Rotate`, normalized to 0..360. Values that are not a
/// multiple of 90 are invalid and read as 0.
fn effective_rotation(doc: &Document, page_id: ObjectId) -> i64 {
    let Ok(mut cur) = doc.get_object(page_id).and_then(Object::as_dict) else {
        return 0;
    };
    loop {
        if let Some(obj) = dict_get(cur, b"Rotate") {
            let degrees = match obj {
                Object::Integer(i) => *i,
                Object::Real(r) => *r as i64,
                _ => 0,
            };
            let degrees = degrees.rem_euclid(360);
            return if degrees % 90 == 0 { degrees } else { 0 };
        }
        match dict_get(cur, b"Parent") {
            Some(Object::Reference(pid)) => match doc.get_object(*pid).and_then(Object::as_dict) {
                Ok(parent) => cur = parent,
                Err(_) => return 0,
            },
            _ => return 0,
        }
    }
}

/// Look up an inheritable page box (`MediaBox`, `CropBox`), walking the
/// Parent chain. Corners are normalized so `ll < ur`.
fn effective_box(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<(f64, f64, f64, f64)> {
    let mut cur = doc.get_object(page_id).ok()?.as_dict().ok()?;
    loop {
        if let Some(obj) = dict_get(cur, key) {
            let arr = match obj {
                Object::Array(a) => a.clone(),
                Object::Reference(id) => doc.get_object(*id).ok()?.as_array().ok()?.clone(),
                _ => return None,
            };
            if arr.len() != 4 {
                return None;
            }
            let v: Vec<f64> = arr.iter().map(as_f64).collect::<Option<_>>()?;
            let (llx, urx) = (v[0].min(v[2]), v[0].max(v[2]));
            let (lly, ury) = (v[1].min(v[3]), v[1].max(v[3]));
            if urx - llx <= 0.0 || ury - lly <= 0.0 {
                return None;
            }
            return Some((llx, lly, urx, ury));
        }
        match dict_get(cur, b"Parent") {
            Some(Object::Reference(pid)) => {
                cur = doc.get_object(*pid).ok()?.as_dict().ok()?;
            }
            _ => return None,
        }
    }
}
