//! Graph records produced by the extractors
//!
//! Every crawled page yields exactly one [`Item`]. Actor and movie records carry
//! references to each other by URL; the reverse edge appears once the page on the
//! other side has been crawled too.

use serde::{Deserialize, Serialize};

/// A performer page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorItem {
    /// Page title
    pub name: String,

    /// Current age, or age at death; `None` when the page does not say
    pub age: Option<u32>,

    /// Canonical URL of the page
    pub url: String,

    /// Movie page URLs from the filmography section, in encounter order
    pub movies: Vec<String>,
}

/// A film page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieItem {
    /// Page title
    pub name: String,

    /// Digits of the box office figure with currency and scale dropped
    pub income: Option<u64>,

    /// Canonical URL of the page
    pub url: String,

    /// Actor page URLs from the "Starring" row, in listed order
    pub actors: Vec<String>,
}

/// One record of the output item stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Item {
    Actor(ActorItem),
    Movie(MovieItem),
    /// A page whose structure could not be read; carries no fields
    Empty,
}

impl Item {
    /// Returns the page URL for populated records
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Actor(actor) => Some(&actor.url),
            Self::Movie(movie) => Some(&movie.url),
            Self::Empty => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}
