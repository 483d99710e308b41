//! Local PDF feature extraction.
//!
//! Parsing is CPU-bound, so each extraction runs on the blocking pool.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::debug;

use dprscope_core::content::{self, SectionCoverage};
use dprscope_core::{DprError, DprResult, ExtractionResult, FeatureExtractor, FeatureSet};

/// Weight of section coverage in the text score; the rest is length.
const SECTION_WEIGHT: f64 = 0.7;

fn load(path: &Path) -> Result<Document, lopdf::Error> {
    Document::load(path)
}

async fn run_blocking<F>(name: &str, path: &Path, f: F) -> DprResult<ExtractionResult>
where
    F: FnOnce(&Document) -> DprResult<ExtractionResult> + Send + 'static,
{
    let path: PathBuf = path.to_path_buf();
    let service = format!("{name}-extractor");
    let start = Instant::now();
    let svc = service.clone();
    let result = tokio::task::spawn_blocking(move || {
        let document = load(&path).map_err(|e| DprError::upstream(&svc, format!("unreadable PDF: {e}")))?;
        f(&document)
    })
    .await
    .map_err(|e| DprError::Internal(format!("{service} task panicked: {e}")))?;
    debug!(extractor = name, elapsed_ms = start.elapsed().as_millis() as u64, "Local extraction finished");
    result
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

/// Extracts text statistics and section coverage from the PDF text layer.
#[derive(Debug, Default, Clone)]
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

/// Features and score for already-extracted text.
pub fn text_features(text: &str, page_count: usize) -> ExtractionResult {
    let words = content::word_count(text);
    let coverage = SectionCoverage::detect(text);
    let length_ratio = (words as f64 / content::DETAILED_WORD_THRESHOLD as f64).min(1.0);
    let score = SECTION_WEIGHT * coverage.ratio() + (1.0 - SECTION_WEIGHT) * length_ratio;

    let features = FeatureSet::new()
        .with("page_count", page_count)
        .with("word_count", words)
        .with("has_budget", coverage.budget)
        .with("has_timeline", coverage.timeline)
        .with("has_manpower", coverage.manpower)
        .with("length_class", content::length_class(words).as_str());

    ExtractionResult {
        features,
        score: Some(score),
    }
}

fn analyze_text(document: &Document) -> DprResult<ExtractionResult> {
    let pages: Vec<u32> = document.get_pages().keys().copied().collect();
    if pages.is_empty() {
        return Ok(text_features("", 0));
    }
    let text = document
        .extract_text(&pages)
        .map_err(|e| DprError::upstream("text-extractor", format!("text layer unreadable: {e}")))?;
    Ok(text_features(&text, pages.len()))
}

#[async_trait]
impl FeatureExtractor for PdfTextExtractor {
    fn name(&self) -> &str {
        "text"
    }

    async fn extract(&self, path: &Path) -> DprResult<ExtractionResult> {
        run_blocking(self.name(), path, analyze_text).await
    }
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

/// Counts embedded raster images and how many pages carry them.
#[derive(Debug, Default, Clone)]
pub struct PdfImageExtractor;

impl PdfImageExtractor {
    pub fn new() -> Self {
        Self
    }
}

fn resolve<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => document.get_object(*id).ok(),
        other => Some(other),
    }
}

fn is_image(object: &Object) -> bool {
    match object {
        Object::Stream(stream) => {
            matches!(stream.dict.get(b"Subtype"), Ok(Object::Name(name)) if name.as_slice() == b"Image")
        }
        _ => false,
    }
}

/// Bound on `Parent` hops, so a cyclic page tree cannot loop forever.
const MAX_TREE_DEPTH: usize = 64;

/// The resource dictionary in effect for a page: its own, or the nearest
/// one inherited from an ancestor in the page tree.
fn page_resources<'a>(document: &'a Document, page: &'a Dictionary) -> Option<&'a Dictionary> {
    let mut node = page;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(resources) = node.get(b"Resources") {
            return resolve(document, resources).and_then(|r| r.as_dict().ok());
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = document.get_dictionary(parent).ok()?;
    }
    None
}

/// Image XObjects named in the resources a page can draw from.
fn page_images(document: &Document, page: &Dictionary) -> Vec<ObjectId> {
    let xobjects = page_resources(document, page)
        .and_then(|r| r.get(b"XObject").ok())
        .and_then(|x| resolve(document, x))
        .and_then(|x| x.as_dict().ok());

    let Some(xobjects) = xobjects else {
        return Vec::new();
    };
    xobjects
        .iter()
        .filter_map(|(_, obj)| match obj {
            Object::Reference(id) => document
                .get_object(*id)
                .ok()
                .filter(|o| is_image(o))
                .map(|_| *id),
            _ => None,
        })
        .collect()
}

/// Features and score from image counts.
pub fn image_features(image_count: usize, pages_with_images: usize, page_count: usize) -> ExtractionResult {
    let (density, coverage) = if page_count == 0 {
        (0.0, 0.0)
    } else {
        (
            image_count as f64 / page_count as f64,
            (pages_with_images as f64 / page_count as f64).min(1.0),
        )
    };
    let features = FeatureSet::new()
        .with("image_count", image_count)
        .with("pages_with_images", pages_with_images)
        .with("image_density", density);

    ExtractionResult {
        features,
        score: Some(coverage),
    }
}

fn analyze_images(document: &Document) -> DprResult<ExtractionResult> {
    let pages = document.get_pages();
    let mut seen: HashSet<ObjectId> = HashSet::new();
    let mut pages_with_images = 0;

    for page_id in pages.values() {
        let Ok(page) = document.get_dictionary(*page_id) else {
            continue;
        };
        let images = page_images(document, page);
        if !images.is_empty() {
            pages_with_images += 1;
        }
        seen.extend(images);
    }

    // Soft masks and orphaned streams are never named by a page, so they stay out.
    Ok(image_features(seen.len(), pages_with_images, pages.len()))
}

#[async_trait]
impl FeatureExtractor for PdfImageExtractor {
    fn name(&self) -> &str {
        "image"
    }

    async fn extract(&self, path: &Path) -> DprResult<ExtractionResult> {
        run_blocking(self.name(), path, analyze_images).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Stream};
    use serde_json::json;

    /// Build a small PDF with one page per entry in `pages`; `true` pages carry an image.
    fn write_pdf(path: &Path, text: &str, pages: &[bool]) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 1,
                "Height" => 1,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            vec![0u8],
        ));

        let mut kids = Vec::new();
        for has_image in pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let mut resources = dictionary! { "Font" => dictionary! { "F1" => font_id } };
            if *has_image {
                resources.set("XObject", dictionary! { "Im1" => image_id });
            }
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources,
            });
            kids.push(Object::from(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    #[test]
    fn test_text_features_score() {
        let result = text_features("Project budget and timeline", 1);
        assert_eq!(result.features.get("word_count"), Some(&json!(4)));
        assert_eq!(result.features.get("has_manpower"), Some(&json!(false)));
        assert_eq!(result.features.get("length_class"), Some(&json!("Brief")));
        let score = result.score.unwrap();
        // 0.7 * 2/3 + 0.3 * 4/300
        assert!((score - 0.47).abs() < 0.001, "score was {score}");
    }

    #[test]
    fn test_image_features_without_pages() {
        let result = image_features(0, 0, 0);
        assert_eq!(result.score, Some(0.0));
        assert_eq!(result.features.get("image_density"), Some(&json!(0.0)));
    }

    #[tokio::test]
    async fn test_pdf_text_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        write_pdf(&path, "Project budget and timeline", &[false, false]);

        let result = PdfTextExtractor::new().extract(&path).await.unwrap();
        assert_eq!(result.features.get("page_count"), Some(&json!(2)));
        assert_eq!(result.features.get("has_budget"), Some(&json!(true)));
        assert_eq!(result.features.get("has_timeline"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn test_pdf_image_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site-photos.pdf");
        write_pdf(&path, "Site photos", &[true, false, true, false]);

        let result = PdfImageExtractor::new().extract(&path).await.unwrap();
        assert_eq!(result.features.get("image_count"), Some(&json!(1)));
        assert_eq!(result.features.get("pages_with_images"), Some(&json!(2)));
        assert_eq!(result.score, Some(0.5));
    }

    #[tokio::test]
    async fn test_inherited_resources_and_unused_images() {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mask_id = doc.add_object(Stream::new(
            dictionary! { "Type" => "XObject", "Subtype" => "Image", "Width" => 1, "Height" => 1 },
            vec![255u8],
        ));
        let photo_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 1,
                "Height" => 1,
                "SMask" => mask_id,
            },
            vec![0u8],
        ));
        // Never referenced by any page.
        doc.add_object(Stream::new(
            dictionary! { "Type" => "XObject", "Subtype" => "Image", "Width" => 1, "Height" => 1 },
            vec![0u8],
        ));

        let kids: Vec<Object> = (0..2)
            .map(|_| {
                let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
                Object::from(doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                    "Contents" => content_id,
                }))
            })
            .collect();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => 2,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
                "Resources" => dictionary! { "XObject" => dictionary! { "Im1" => photo_id } },
            }),
        );
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inherited.pdf");
        doc.save(&path).unwrap();

        let result = PdfImageExtractor::new().extract(&path).await.unwrap();
        assert_eq!(result.features.get("image_count"), Some(&json!(1)));
        assert_eq!(result.features.get("pages_with_images"), Some(&json!(2)));
        assert_eq!(result.features.get("image_density"), Some(&json!(0.5)));
        assert_eq!(result.score, Some(1.0));
    }

    #[tokio::test]
    async fn test_non_pdf_is_upstream_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.pdf");
        std::fs::write(&path, b"definitely not a pdf").unwrap();

        let err = PdfTextExtractor::new().extract(&path).await.unwrap_err();
        assert!(matches!(err, DprError::Upstream { ref service, .. } if service == "text-extractor"));
    }
}
