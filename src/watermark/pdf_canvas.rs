//! lopdf-backed [`PageCanvas`] implementation.
//!
//! Stamp tiles are drawn as PDF text runs: each draw emits a glyph run with
//! its own rotation matrix (`cm`) and an `/ExtGState` alpha, so opacity and
//! angle are render parameters of the run, not raster post-processing. The
//! page's pre-existing content is wrapped in a save/restore pair and the
//! stamp layer composites over it; page count and order are untouched.
//!
//! Text is set in built-in Helvetica. Measurement uses the standard AFM
//! advance widths, so no font program needs to be embedded.

use super::canvas::{PageCanvas, PageSize, TextExtent};
use super::{StampStyle, WatermarkError};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::BTreeSet;

/// Helvetica advance widths for WinAnsi codes 32..=126, in 1/1000 em.
const HELVETICA_WIDTHS_32_126: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, 556, 556, 556,
    556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, 1015, 667, 667, 722, 722,
    667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, 667, 778, 722, 667, 611, 722, 667, 944,
    667, 667, 611, 278, 278, 278, 469, 556, 333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222,
    500, 222, 833, 556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334,
    584,
];

/// Fallback advance for characters outside the table.
const FALLBACK_WIDTH: u16 = 600;

/// Helvetica vertical metrics (AFM ascender/descender), 1/1000 em.
const ASCENT: f64 = 718.0;
const DESCENT: f64 = 207.0;

/// Resource names registered on stamped pages.
const STAMP_FONT_NAME: &str = "Fwm";
const STAMP_GS_PREFIX: &str = "GSwm";

/// Geometry of one page, resolved once at open.
#[derive(Debug, Clone, Copy)]
struct PageGeometry {
    id: ObjectId,
    /// Lower-left corner of the media box; stamp coordinates are relative
    /// to the page's visual origin, so draws translate by this.
    llx: f64,
    lly: f64,
    width: f64,
    height: f64,
}

/// A document opened for stamping.
pub struct PdfCanvas {
    doc: Document,
    pages: Vec<PageGeometry>,
    /// Accumulated stamp operators per page, baked in by [`into_bytes`].
    overlays: Vec<Vec<u8>>,
    /// Distinct quantized alphas used by draws; one ExtGState each.
    alphas: BTreeSet<u16>,
}

impl PdfCanvas {
    /// Decode `bytes` as a PDF. Fails with `RenderFailure` when the
    /// container cannot be parsed or a page has no resolvable media box.
    pub fn open(bytes: &[u8]) -> Result<Self, WatermarkError> {
        let doc = Document::load_mem(bytes)
            .map_err(|e| WatermarkError::RenderFailure(format!("failed to parse PDF: {}", e)))?;

        let mut pages = Vec::new();
        for (number, id) in doc.get_pages() {
            let (llx, lly, urx, ury) = effective_media_box(&doc, id).ok_or_else(|| {
                WatermarkError::RenderFailure(format!("page {} has no media box", number))
            })?;
            pages.push(PageGeometry {
                id,
                llx,
                lly,
                width: urx - llx,
                height: ury - lly,
            });
        }

        let overlays = vec![Vec::new(); pages.len()];
        Ok(Self {
            doc,
            pages,
            overlays,
            alphas: BTreeSet::new(),
        })
    }

    /// Bake accumulated stamp layers into every page and serialize the
    /// document to a fresh byte stream.
    pub fn into_bytes(mut self) -> Result<Vec<u8>, WatermarkError> {
        if self.overlays.iter().any(|ops| !ops.is_empty()) {
            let font_id = self.add_stamp_font();
            let alphas: Vec<u16> = self.alphas.iter().copied().collect();
            let gs_ids: Vec<(u16, ObjectId)> = alphas
                .into_iter()
                .map(|q| (q, add_alpha_gstate(&mut self.doc, q)))
                .collect();

            for index in 0..self.pages.len() {
                if self.overlays[index].is_empty() {
                    continue;
                }
                let overlay = std::mem::take(&mut self.overlays[index]);
                let page = self.pages[index];
                attach_overlay(&mut self.doc, page.id, overlay, font_id, &gs_ids)
                    .map_err(|e| WatermarkError::RenderFailure(e.to_string()))?;
            }
        }

        let mut out = Vec::new();
        self.doc
            .save_to(&mut out)
            .map_err(|e| WatermarkError::RenderFailure(format!("failed to serialize PDF: {}", e)))?;
        Ok(out)
    }

    fn add_stamp_font(&mut self) -> ObjectId {
        let mut font = Dictionary::new();
        font.set("Type", Object::Name(b"Font".to_vec()));
        font.set("Subtype", Object::Name(b"Type1".to_vec()));
        font.set("BaseFont", Object::Name(b"Helvetica".to_vec()));
        self.doc.add_object(Object::Dictionary(font))
    }
}

impl PageCanvas for PdfCanvas {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_size(&self, page: usize) -> Result<PageSize, WatermarkError> {
        let geometry = self
            .pages
            .get(page)
            .ok_or_else(|| WatermarkError::RenderFailure(format!("page {} out of range", page)))?;
        Ok(PageSize {
            width: geometry.width,
            height: geometry.height,
        })
    }

    fn measure_text(&self, text: &str, font_size: f64) -> TextExtent {
        let advance_sum: u64 = text
            .chars()
            .map(|c| match u32::from(c) {
                32..=126 => u64::from(HELVETICA_WIDTHS_32_126[(u32::from(c) - 32) as usize]),
                _ => u64::from(FALLBACK_WIDTH),
            })
            .sum();

        TextExtent {
            width: advance_sum as f64 * font_size / 1000.0,
            height: (ASCENT + DESCENT) * font_size / 1000.0,
        }
    }

    fn draw_rotated_text(
        &mut self,
        page: usize,
        x: f64,
        y: f64,
        text: &str,
        style: &StampStyle,
    ) -> Result<(), WatermarkError> {
        let geometry = *self
            .pages
            .get(page)
            .ok_or_else(|| WatermarkError::RenderFailure(format!("page {} out of range", page)))?;

        let alpha_q = quantize_alpha(style.opacity);
        self.alphas.insert(alpha_q);

        let extent = self.measure_text(text, style.font_size);
        let theta = style.rotation_degrees.to_radians();
        let (sin, cos) = theta.sin_cos();
        let (r, g, b) = style.color.to_unit_rgb();

        // Center the run on the tile position: shift half the advance back
        // along the baseline, and drop the baseline below the optical
        // center of the glyph box.
        let dx = -extent.width / 2.0;
        let dy = -extent.height * 0.35;

        let ops = format!(
            concat!(
                "q\n",
                "/{gs} gs\n",
                "{r:.4} {g:.4} {b:.4} rg\n",
                "{cos:.6} {sin:.6} {msin:.6} {cos:.6} {x:.3} {y:.3} cm\n",
                "BT\n",
                "/{font} {fs:.3} Tf\n",
                "{dx:.3} {dy:.3} Td\n",
                "({text}) Tj\n",
                "ET\n",
                "Q\n",
            ),
            gs = gstate_name(alpha_q),
            r = r,
            g = g,
            b = b,
            cos = cos,
            sin = sin,
            msin = -sin,
            x = geometry.llx + x,
            y = geometry.lly + y,
            font = STAMP_FONT_NAME,
            fs = style.font_size,
            dx = dx,
            dy = dy,
            text = escape_pdf_text(text),
        );

        self.overlays[page].extend_from_slice(ops.as_bytes());
        Ok(())
    }
}

fn quantize_alpha(opacity: f64) -> u16 {
    (opacity.clamp(0.0, 1.0) * 1000.0).round() as u16
}

fn gstate_name(alpha_q: u16) -> String {
    format!("{}{}", STAMP_GS_PREFIX, alpha_q)
}

fn add_alpha_gstate(doc: &mut Document, alpha_q: u16) -> ObjectId {
    let mut gs = Dictionary::new();
    gs.set("Type", Object::Name(b"ExtGState".to_vec()));
    gs.set("BM", Object::Name(b"Normal".to_vec()));
    gs.set("ca", Object::Real(alpha_q as f32 / 1000.0));
    gs.set("CA", Object::Real(alpha_q as f32 / 1000.0));
    doc.add_object(Object::Dictionary(gs))
}

/// Escape the characters with meaning inside a PDF literal string. The
/// stamp font is WinAnsi-encoded Type1, so anything outside ASCII folds to
/// `?` rather than producing mis-encoded bytes.
fn escape_pdf_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' => escaped.push_str("\\("),
            ')' => escaped.push_str("\\)"),
            '\\' => escaped.push_str("\\\\"),
            c if c.is_ascii_graphic() || c == ' ' => escaped.push(c),
            _ => escaped.push('?'),
        }
    }
    escaped
}

/// Walk the page's `Parent` chain for an inheritable `MediaBox`.
fn effective_media_box(doc: &Document, page_id: ObjectId) -> Option<(f64, f64, f64, f64)> {
    let mut current = doc.get_object(page_id).ok()?.as_dict().ok()?;
    loop {
        if let Ok(obj) = current.get(b"MediaBox") {
            let array = resolve(doc, obj)?.as_array().ok()?;
            if array.len() == 4 {
                return Some((
                    object_to_f64(&array[0])?,
                    object_to_f64(&array[1])?,
                    object_to_f64(&array[2])?,
                    object_to_f64(&array[3])?,
                ));
            }
        }
        match current.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => {
                current = doc.get_object(*parent_id).ok()?.as_dict().ok()?;
            }
            _ => return None,
        }
    }
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn object_to_f64(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

/// The page's own or inherited `Resources` dictionary, dereferenced and
/// cloned so it can be amended per page.
fn effective_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    let mut current = match doc.get_object(page_id).ok().and_then(|o| o.as_dict().ok()) {
        Some(dict) => dict,
        None => return Dictionary::new(),
    };
    loop {
        if let Ok(obj) = current.get(b"Resources") {
            if let Some(Object::Dictionary(dict)) = resolve(doc, obj) {
                return dict.clone();
            }
        }
        match current.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => {
                match doc.get_object(*parent_id).ok().and_then(|o| o.as_dict().ok()) {
                    Some(dict) => current = dict,
                    None => return Dictionary::new(),
                }
            }
            _ => return Dictionary::new(),
        }
    }
}

/// Existing content stream references of a page, in draw order.
fn content_refs(doc: &Document, page_id: ObjectId) -> lopdf::Result<Vec<ObjectId>> {
    let page = doc.get_object(page_id)?.as_dict()?;
    let mut refs = Vec::new();
    if let Ok(obj) = page.get(b"Contents") {
        match obj {
            Object::Reference(id) => refs.push(*id),
            Object::Array(array) => {
                for entry in array {
                    if let Object::Reference(id) = entry {
                        refs.push(*id);
                    }
                }
            }
            _ => {}
        }
    }
    Ok(refs)
}

/// Wrap the page's existing content in a save/restore pair and append the
/// stamp overlay, registering the stamp font and alpha graphics states in
/// the page's resources.
fn attach_overlay(
    doc: &mut Document,
    page_id: ObjectId,
    overlay: Vec<u8>,
    font_id: ObjectId,
    gs_ids: &[(u16, ObjectId)],
) -> lopdf::Result<()> {
    // A page may carry its content stream inline rather than by reference;
    // hoist it into an object so the wrapping below sees it.
    let direct = {
        let page = doc.get_object(page_id)?.as_dict()?;
        match page.get(b"Contents") {
            Ok(Object::Stream(stream)) => Some(stream.clone()),
            _ => None,
        }
    };
    if let Some(stream) = direct {
        let hoisted = doc.add_object(Object::Stream(stream));
        let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
        page.set("Contents", Object::Reference(hoisted));
    }

    let existing = content_refs(doc, page_id)?;

    // Merge stamp resources into a clone of the page's effective resources.
    let mut resources = effective_resources(doc, page_id);

    let mut fonts = match resources.get(b"Font") {
        Ok(obj) => match resolve_owned(doc, obj) {
            Some(dict) => dict,
            None => Dictionary::new(),
        },
        Err(_) => Dictionary::new(),
    };
    fonts.set(STAMP_FONT_NAME, Object::Reference(font_id));
    resources.set("Font", Object::Dictionary(fonts));

    let mut gstates = match resources.get(b"ExtGState") {
        Ok(obj) => match resolve_owned(doc, obj) {
            Some(dict) => dict,
            None => Dictionary::new(),
        },
        Err(_) => Dictionary::new(),
    };
    for (alpha_q, gs_id) in gs_ids {
        gstates.set(gstate_name(*alpha_q), Object::Reference(*gs_id));
    }
    resources.set("ExtGState", Object::Dictionary(gstates));

    // Content order: [q] [existing...] [Q + overlay]. The save/restore pair
    // shields the stamp layer from any graphics state the page left open.
    let mut contents: Vec<Object> = Vec::new();
    if existing.is_empty() {
        let overlay_id = doc.add_object(Object::Stream(Stream::new(Dictionary::new(), overlay)));
        contents.push(Object::Reference(overlay_id));
    } else {
        let save_id = doc.add_object(Object::Stream(Stream::new(
            Dictionary::new(),
            b"q\n".to_vec(),
        )));
        contents.push(Object::Reference(save_id));
        contents.extend(existing.into_iter().map(Object::Reference));

        let mut restore_and_stamp = b"Q\n".to_vec();
        restore_and_stamp.extend_from_slice(&overlay);
        let overlay_id = doc.add_object(Object::Stream(Stream::new(
            Dictionary::new(),
            restore_and_stamp,
        )));
        contents.push(Object::Reference(overlay_id));
    }

    let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
    page.set("Resources", Object::Dictionary(resources));
    page.set("Contents", Object::Array(contents));
    Ok(())
}

/// Dereference-and-clone for dictionary-valued entries.
fn resolve_owned(doc: &Document, obj: &Object) -> Option<Dictionary> {
    match obj {
        Object::Dictionary(dict) => Some(dict.clone()),
        Object::Reference(id) => doc.get_object(*id).ok()?.as_dict().ok().cloned(),
        _ => None,
    }
}
