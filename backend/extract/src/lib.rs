//! Feature extractors for uploaded DPR documents.
//!
//! Local extractors read the PDF with `lopdf`; remote extractors post the
//! file to an external analysis service. Both implement `FeatureExtractor`.

pub mod pdf;
pub mod remote;

pub use pdf::{PdfImageExtractor, PdfTextExtractor};
pub use remote::RemoteExtractor;

use std::sync::Arc;
use std::time::Duration;

use dprscope_core::{DprResult, FeatureExtractor};

/// Pick the text extractor: remote when a URL is configured, local PDF otherwise.
pub fn text_extractor(url: Option<&str>, timeout: Duration) -> DprResult<Arc<dyn FeatureExtractor>> {
    Ok(match url {
        Some(url) => Arc::new(RemoteExtractor::new("text", url, timeout)?),
        None => Arc::new(PdfTextExtractor::new()),
    })
}

/// Pick the image extractor: remote when a URL is configured, local PDF otherwise.
pub fn image_extractor(url: Option<&str>, timeout: Duration) -> DprResult<Arc<dyn FeatureExtractor>> {
    Ok(match url {
        Some(url) => Arc::new(RemoteExtractor::new("image", url, timeout)?),
        None => Arc::new(PdfImageExtractor::new()),
    })
}
