//! Page range planning.
//!
//! A range specification is a comma-separated list of `N` or `N-M` tokens
//! with 1-based, inclusive page numbers, e.g. `"1-3, 5, 7-9"`.

use std::fmt;

use crate::error::{PdfSpliceError, Result};

/// An inclusive, 1-based range of pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageRange {
    /// First page.
    pub start: usize,
    /// Last page.
    pub end: usize,
}

impl PageRange {
    /// Create a range. No validation; see [`PageRange::check`].
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// A range holding one page.
    pub fn single(page: usize) -> Self {
        Self::new(page, page)
    }

    /// Number of pages covered.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start) + 1
    }

    /// Always false; a range covers at least one page.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether `page` falls inside the range.
    pub fn contains(&self, page: usize) -> bool {
        self.start <= page && page <= self.end
    }

    /// Zero-based page indices covered by the range.
    pub fn indices(&self) -> std::ops::Range<usize> {
        self.start.saturating_sub(1)..self.end
    }

    /// Ensure `1 <= start <= end <= total`.
    ///
    /// # Errors
    ///
    /// [`PdfSpliceError::RangeOutOfBounds`] otherwise.
    pub fn check(&self, total: usize) -> Result<()> {
        if self.start == 0 || self.start > self.end || self.end > total {
            return Err(PdfSpliceError::RangeOutOfBounds {
                start: self.start,
                end: self.end,
                total,
            });
        }
        Ok(())
    }

    /// File stem for the output holding this range:
    /// `{prefix}_page_{n}` or `{prefix}_pages_{start}-{end}`.
    pub fn file_stem(&self, prefix: &str) -> String {
        if self.start == self.end {
            format!("{prefix}_page_{}", self.start)
        } else {
            format!("{prefix}_pages_{}-{}", self.start, self.end)
        }
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// An ordered list of page ranges, one per output document.
pub type PlannedRanges = Vec<PageRange>;

/// Parse a range specification against a document of `total` pages.
///
/// Order and duplicates are preserved. An empty (or all-whitespace)
/// specification yields every page as its own range.
///
/// # Errors
///
/// [`PdfSpliceError::InvalidRange`] naming the first offending token.
///
/// # Examples
///
/// ```
/// use pdfsplice::{PageRange, parse_range_spec};
///
/// let ranges = parse_range_spec("1-3, 5", 10).unwrap();
/// assert_eq!(ranges, vec![PageRange::new(1, 3), PageRange::single(5)]);
/// ```
pub fn parse_range_spec(spec: &str, total: usize) -> Result<PlannedRanges> {
    if spec.trim().is_empty() {
        return Ok((1..=total).map(PageRange::single).collect());
    }
    spec.split(',')
        .map(|token| parse_token(token.trim(), total))
        .collect()
}

fn parse_token(token: &str, total: usize) -> Result<PageRange> {
    let number = |text: &str| -> Result<usize> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PdfSpliceError::invalid_range(token, "missing page number"));
        }
        text.parse::<usize>().map_err(|_| {
            PdfSpliceError::invalid_range(token, format!("'{text}' is not a page number"))
        })
    };

    let (start, end) = match token.split_once('-') {
        Some((start, end)) => (number(start)?, number(end)?),
        None => {
            let page = number(token)?;
            (page, page)
        }
    };

    if start == 0 {
        return Err(PdfSpliceError::invalid_range(token, "pages are numbered from 1"));
    }
    if start > end {
        return Err(PdfSpliceError::invalid_range(token, "start is after end"));
    }
    if end > total {
        return Err(PdfSpliceError::invalid_range(
            token,
            format!("document has only {total} page(s)"),
        ));
    }
    Ok(PageRange::new(start, end))
}

/// Pages of `1..=total` covered by none of `ranges`, as maximal ascending runs.
///
/// ```
/// use pdfsplice::{PageRange, ranges::complement};
///
/// let rest = complement(&[PageRange::new(2, 4)], 10);
/// assert_eq!(rest, vec![PageRange::single(1), PageRange::new(5, 10)]);
/// ```
pub fn complement(ranges: &[PageRange], total: usize) -> PlannedRanges {
    let mut covered = vec![false; total + 1];
    for range in ranges {
        let end = range.end.min(total);
        for page in range.start.max(1)..=end {
            covered[page] = true;
        }
    }

    let mut out = Vec::new();
    let mut run_start = None;
    for page in 1..=total {
        match (covered[page], run_start) {
            (false, None) => run_start = Some(page),
            (true, Some(start)) => {
                out.push(PageRange::new(start, page - 1));
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = run_start {
        out.push(PageRange::new(start, total));
    }
    out
}

/// The explicit ranges followed by the pages they leave out.
pub fn with_remaining(ranges: &[PageRange], total: usize) -> PlannedRanges {
    let mut planned = ranges.to_vec();
    planned.extend(complement(ranges, total));
    planned
}
