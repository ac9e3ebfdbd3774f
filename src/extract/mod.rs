//! Page classification and record extraction
//!
//! A fetched page is routed to an [`Extractor`] by the page type its task carries.
//! Extractors never fail outright: structural or value problems degrade the
//! affected field, or the whole record to [`Item::Empty`].

pub mod actor;
mod markup;
pub mod movie;

pub use actor::ActorExtractor;
pub use markup::{element_text, first_digit_run, page_title};
pub use movie::MovieExtractor;

use crate::crawler::{PageType, Task};
use crate::item::Item;
use thiserror::Error;
use url::Url;

/// Why a field could not be extracted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// An expected element or section is missing
    #[error("missing {0}")]
    Structural(&'static str),

    /// The element is present but holds no usable number
    #[error("no number in {0}")]
    Value(&'static str),
}

/// A fetched page as seen by an extractor
#[derive(Debug, Clone, Copy)]
pub struct PageContext<'a> {
    pub html: &'a str,
    /// URL the page was requested under; becomes the record URL
    pub url: &'a Url,
    /// Only links on this site are followed
    pub site_root: &'a Url,
}

/// Result of extracting one page
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub item: Item,
    /// Follow-up tasks, in link order
    pub children: Vec<Task>,
}

impl Extraction {
    pub fn empty() -> Self {
        Self {
            item: Item::Empty,
            children: Vec::new(),
        }
    }
}

/// Turns a page of one type into a record plus follow-up tasks
pub trait Extractor: Send + Sync {
    fn page_type(&self) -> PageType;

    fn extract(&self, page: &PageContext<'_>) -> Extraction;
}

/// Picks the extractor for a page type
pub fn classify(page_type: PageType) -> &'static dyn Extractor {
    match page_type {
        PageType::Actor => &ActorExtractor,
        PageType::Movie => &MovieExtractor,
    }
}

/// Logs a degraded field and hands back its absent value
pub(crate) fn degrade<T>(url: &Url, field: &str, result: Result<T, ExtractError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!("{}: {} left empty ({})", url, field, e);
            None
        }
    }
}
