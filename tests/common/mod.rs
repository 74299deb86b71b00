//! Shared fixtures for integration tests.

use lopdf::{Dictionary, Document, Object, Stream};

/// Build a minimal PDF with `page_count` pages of the given size. Each page
/// carries its own media box and a one-line content stream.
pub fn sample_pdf(page_count: usize, width: f64, height: f64) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut font = Dictionary::new();
    font.set("Type", Object::Name(b"Font".to_vec()));
    font.set("Subtype", Object::Name(b"Type1".to_vec()));
    font.set("BaseFont", Object::Name(b"Helvetica".to_vec()));
    let font_id = doc.add_object(Object::Dictionary(font));

    let mut font_resources = Dictionary::new();
    font_resources.set("F1", Object::Reference(font_id));
    let mut resources = Dictionary::new();
    resources.set("Font", Object::Dictionary(font_resources));

    let mut kids: Vec<Object> = Vec::new();
    for number in 1..=page_count {
        let ops = format!(
            "BT\n/F1 12 Tf\n72.0 {:.1} Td\n(Fixture page {}) Tj\nET\n",
            height - 72.0,
            number
        );
        let content_id =
            doc.add_object(Object::Stream(Stream::new(Dictionary::new(), ops.into_bytes())));

        let mut page = Dictionary::new();
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("Parent", Object::Reference(pages_id));
        page.set("Contents", Object::Reference(content_id));
        page.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(width as f32),
                Object::Real(height as f32),
            ]),
        );
        page.set("Resources", Object::Dictionary(resources.clone()));
        let page_id = doc.add_object(Object::Dictionary(page));
        kids.push(Object::Reference(page_id));
    }

    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Kids", Object::Array(kids));
    pages.set("Count", Object::Integer(page_count as i64));
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(Object::Dictionary(catalog));
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).expect("fixture PDF serializes");
    out
}

/// Page count as lopdf sees it, for round-trip assertions.
pub fn page_count(bytes: &[u8]) -> usize {
    Document::load_mem(bytes)
        .expect("output parses as PDF")
        .get_pages()
        .len()
}
