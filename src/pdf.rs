use crate::StampedPage;
use crate::error::AquamarkError;
use lopdf::{Document as LoDocument, Object as LoObject, Stream as LoStream, dictionary};
use std::io::Write;

struct PageImage {
    width: u32,
    height: u32,
    rgb: Vec<u8>,
    alpha: Option<Vec<u8>>,
}

/// Reassemble the ordered stamped pages into a new PDF. Each page embeds
/// its image as an RGB FlateDecode XObject (SMask when alpha survives) and
/// is sized to exactly the image's pixel dimensions, one pixel per document
/// unit. Any embed failure aborts; no partial document is returned.
pub fn assemble_document(pages: &[StampedPage]) -> Result<Vec<u8>, AquamarkError> {
    let mut doc = LoDocument::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<LoObject> = Vec::with_capacity(pages.len());

    for page in pages {
        let image = decode_page_image(&page.png)?;

        let smask_id = image.alpha.as_ref().map(|alpha| {
            doc.add_object(LoStream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => image.width as i64,
                    "Height" => image.height as i64,
                    "ColorSpace" => "DeviceGray",
                    "BitsPerComponent" => 8,
                    "Filter" => "FlateDecode",
                },
                alpha.clone(),
            ))
        });

        let mut image_dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => image.width as i64,
            "Height" => image.height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
        };
        if let Some(smask_id) = smask_id {
            image_dict.set("SMask", LoObject::Reference(smask_id));
        }
        let image_id = doc.add_object(LoStream::new(image_dict, image.rgb));

        let resources_id = doc.add_object(dictionary! {
            "XObject" => dictionary! { "Im0" => image_id },
        });
        let content = format!("q {} 0 0 {} 0 0 cm /Im0 Do Q", image.width, image.height);
        let content_id = doc.add_object(LoStream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                (image.width as i64).into(),
                (image.height as i64).into(),
            ],
        });
        kids.push(page_id.into());
    }

    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => pages.len() as i64,
    };
    doc.objects.insert(pages_id, LoObject::Dictionary(pages_dict));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|err| AquamarkError::DocumentAssemble(err.to_string()))?;
    Ok(bytes)
}

fn decode_page_image(png: &[u8]) -> Result<PageImage, AquamarkError> {
    let decoded = image::load_from_memory(png)
        .map_err(|err| AquamarkError::DocumentAssemble(err.to_string()))?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgb = Vec::with_capacity((width as usize) * (height as usize) * 3);
    let mut alpha = Vec::with_capacity((width as usize) * (height as usize));
    let mut has_alpha = false;
    for pixel in rgba.pixels() {
        let [r, g, b, a] = pixel.0;
        if a != 255 {
            has_alpha = true;
        }
        rgb.extend_from_slice(&[r, g, b]);
        alpha.push(a);
    }

    Ok(PageImage {
        width,
        height,
        rgb: flate_compress(&rgb),
        alpha: has_alpha.then(|| flate_compress(&alpha)),
    })
}

fn flate_compress(data: &[u8]) -> Vec<u8> {
    use flate2::Compression;
    use flate2::write::ZlibEncoder;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    let _ = encoder.write_all(data);
    encoder.finish().unwrap_or_default()
}
