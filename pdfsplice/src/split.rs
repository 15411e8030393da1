//! Page-range extraction.

use log::{debug, info};

use crate::cancel::Cancellation;
use crate::config::Limits;
use crate::copy::{DocumentBuilder, detach_dictionary};
use crate::document::Document;
use crate::error::Result;
use crate::merge::PRODUCER;
use crate::object::Object;
use crate::ranges::PageRange;

/// Produces one document per page range.
#[derive(Debug, Clone, Default)]
pub struct Splitter {
    limits: Limits,
    cancel: Cancellation,
}

impl Splitter {
    /// Create a splitter with default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `limits` to every output.
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Observe `cancel` between copy steps.
    pub fn with_cancellation(mut self, cancel: Cancellation) -> Self {
        self.cancel = cancel;
        self
    }

    /// Extract each range of `source` into its own document, in order.
    ///
    /// All ranges are checked against the page count before anything is
    /// copied. Outputs are independent: none shares objects with another
    /// or with `source`.
    ///
    /// # Errors
    ///
    /// - [`PdfSpliceError::RangeOutOfBounds`](crate::PdfSpliceError::RangeOutOfBounds)
    ///   for a range outside the document
    /// - copy errors as for [`Merger::merge`](crate::Merger::merge)
    pub fn split(&self, source: &Document, ranges: &[PageRange]) -> Result<Vec<Document>> {
        let total = source.page_count();
        for range in ranges {
            range.check(total)?;
        }

        let info = source.info().map(|info| {
            let mut info = detach_dictionary(source, info);
            info.set("Producer", Object::text(PRODUCER));
            info
        });

        let mut outputs = Vec::with_capacity(ranges.len());
        for range in ranges {
            self.cancel.check()?;
            let indices: Vec<usize> = range.indices().collect();
            let mut builder = DocumentBuilder::new(&self.limits, &self.cancel);
            builder.append_pages(source, &indices)?;
            debug!(
                "Range {range}: {} object(s) copied",
                builder.stats().objects
            );
            outputs.push(builder.finish(info.clone())?);
        }

        info!(
            "Split {total} page(s) into {} document(s)",
            outputs.len()
        );
        Ok(outputs)
    }
}
