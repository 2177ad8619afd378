use crate::StampedPage;
use crate::error::AquamarkError;
use std::io::{Cursor, Write};
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

/// Bundle the ordered stamped pages into one ZIP archive, one
/// `page_<n>.png` entry per page. All-or-nothing: any entry failure aborts
/// the whole archive.
pub fn bundle_pages(pages: &[StampedPage]) -> Result<Vec<u8>, AquamarkError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for page in pages {
        writer
            .start_file(page.entry_name(), options)
            .map_err(|err| AquamarkError::Archive(err.to_string()))?;
        writer
            .write_all(&page.png)
            .map_err(|err| AquamarkError::Archive(err.to_string()))?;
    }

    let cursor = writer
        .finish()
        .map_err(|err| AquamarkError::Archive(err.to_string()))?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    fn stamped(page_no: usize, payload: &[u8]) -> StampedPage {
        StampedPage {
            page_no,
            width: 2,
            height: 2,
            png: payload.to_vec(),
        }
    }

    #[test]
    fn bundle_has_one_entry_per_page_in_order() {
        let pages = vec![stamped(1, b"first"), stamped(2, b"second"), stamped(3, b"third")];
        let bytes = bundle_pages(&pages).unwrap();

        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 3);
        for (idx, expected) in [b"first".as_slice(), b"second", b"third"].iter().enumerate() {
            let mut entry = archive.by_index(idx).unwrap();
            assert_eq!(entry.name(), format!("page_{}.png", idx + 1));
            let mut content = Vec::new();
            entry.read_to_end(&mut content).unwrap();
            assert_eq!(&content, expected);
        }
    }

    #[test]
    fn empty_page_list_bundles_to_empty_archive() {
        let bytes = bundle_pages(&[]).unwrap();
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 0);
    }
}
