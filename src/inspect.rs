use crate::error::AquamarkError;
use lopdf::Document as LoDocument;

/// What the preflight pass learned about an input document before any page
/// work begins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentReport {
    pub pdf_version: String,
    pub page_count: usize,
    pub encrypted: bool,
    pub file_size_bytes: usize,
}

/// Parse the document header and page tree without rendering anything.
pub fn inspect_document_bytes(bytes: &[u8]) -> Result<DocumentReport, AquamarkError> {
    let pdf = LoDocument::load_mem(bytes)
        .map_err(|err| AquamarkError::DocumentDecode(err.to_string()))?;

    Ok(DocumentReport {
        pdf_version: pdf.version.clone(),
        page_count: pdf.get_pages().len(),
        encrypted: pdf.is_encrypted(),
        file_size_bytes: bytes.len(),
    })
}

/// Reject documents the stamping pipeline cannot process. Runs before any
/// rasterization so a bad input fails without page work.
pub fn require_stampable(report: &DocumentReport) -> Result<(), AquamarkError> {
    if report.encrypted {
        return Err(AquamarkError::DocumentDecode(
            "encrypted documents are not supported".to_string(),
        ));
    }
    if report.page_count == 0 {
        return Err(AquamarkError::DocumentDecode(
            "document has no pages".to_string(),
        ));
    }
    Ok(())
}

/// Build a minimal valid text-only PDF for pipeline tests.
#[cfg(test)]
pub(crate) fn test_pdf_bytes(page_count: usize) -> Vec<u8> {
    use lopdf::{Object as LoObject, Stream as LoStream, dictionary};

    let mut doc = LoDocument::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let mut kids: Vec<LoObject> = Vec::with_capacity(page_count);
    for page_no in 1..=page_count {
        let content = format!("BT /F1 18 Tf 72 720 Td (page {}) Tj ET", page_no).into_bytes();
        let content_id = doc.add_object(LoStream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
    }
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count as i64,
    };
    doc.objects.insert(pages_id, LoObject::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("save pdf");
    bytes
}
