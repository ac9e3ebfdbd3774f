//! Actor page extraction
//!
//! An actor record takes its name from the page title, its age from the
//! biography fact box, and its movies from the links between the "Filmography"
//! heading and the next top-level heading.

use crate::crawler::{PageType, Task};
use crate::extract::markup::{
    collect_links, element_text, find_first, first_digit_run, node_text, page_title, LinkSet,
};
use crate::extract::{degrade, ExtractError, Extraction, Extractor, PageContext};
use crate::item::{ActorItem, Item};
use scraper::{ElementRef, Html};
use url::Url;

/// Extractor for actor pages
#[derive(Debug, Clone, Copy, Default)]
pub struct ActorExtractor;

impl Extractor for ActorExtractor {
    fn page_type(&self) -> PageType {
        PageType::Actor
    }

    fn extract(&self, page: &PageContext<'_>) -> Extraction {
        let document = Html::parse_document(page.html);

        match parse_actor(&document, page) {
            Ok((actor, movies)) => Extraction {
                item: Item::Actor(actor),
                children: movies.into_iter().map(Task::movie).collect(),
            },
            Err(e) => {
                tracing::debug!("{}: actor page unreadable ({}), emitting empty record", page.url, e);
                Extraction::empty()
            }
        }
    }
}

fn parse_actor(document: &Html, page: &PageContext<'_>) -> Result<(ActorItem, Vec<Url>), ExtractError> {
    let name = page_title(document).ok_or(ExtractError::Structural("page title"))?;
    let movies = filmography_links(document, page)?;
    let age = degrade(page.url, "age", resolve_age(document));

    let actor = ActorItem {
        name,
        age,
        url: page.url.to_string(),
        movies: movies.iter().map(Url::to_string).collect(),
    };

    Ok((actor, movies))
}

/// Reads the current age, falling back to the age stated next to the death date
fn resolve_age(document: &Html) -> Result<u32, ExtractError> {
    if let Some(marker) = find_first(document, "span.ForceAgeToShow") {
        return first_digit_run(&element_text(marker)).ok_or(ExtractError::Value("current age"));
    }

    let death_date = find_first(document, "span.deathdate")
        .ok_or(ExtractError::Structural("age or death date marker"))?;
    let container = death_date
        .parent()
        .ok_or(ExtractError::Structural("death date container"))?;

    // "(1937-06-01) June 1, 1937 (aged 83)": the age follows the dated span
    let description = container
        .next_siblings()
        .map(|node| node_text(node.value(), ElementRef::wrap(node)))
        .find(|text| !text.is_empty())
        .ok_or(ExtractError::Structural("death description"))?;

    first_digit_run(&description).ok_or(ExtractError::Value("age at death"))
}

/// Collects links between the filmography heading and the next top-level heading
///
/// Running out of siblings before that heading is a structural error: the links
/// gathered so far are discarded, so the page yields an empty record with no
/// movie tasks.
fn filmography_links(document: &Html, page: &PageContext<'_>) -> Result<Vec<Url>, ExtractError> {
    let anchor = filmography_anchor(document).ok_or(ExtractError::Structural("filmography section"))?;
    let mut links = LinkSet::default();

    for node in anchor.next_siblings() {
        let Some(element) = ElementRef::wrap(node) else {
            continue;
        };
        if is_section_boundary(element) {
            return Ok(links.into_vec());
        }
        collect_links(element, page, &mut links);
    }

    Err(ExtractError::Structural("heading after filmography section"))
}

/// Finds the top-level heading of the filmography section
///
/// Newer markup wraps the `h2` in a `div.mw-heading`; siblings are then walked
/// from the wrapper.
fn filmography_anchor(document: &Html) -> Option<ElementRef<'_>> {
    let marker = find_first(document, "#Filmography")?;

    let heading = if marker.value().name() == "h2" {
        marker
    } else {
        marker
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|e| e.value().name() == "h2")?
    };

    let wrapper = heading
        .parent()
        .and_then(ElementRef::wrap)
        .filter(|e| e.value().name() == "div" && e.value().classes().any(|c| c == "mw-heading"));

    Some(wrapper.unwrap_or(heading))
}

fn is_section_boundary(element: ElementRef<'_>) -> bool {
    element.value().name() == "h2" || element.value().classes().any(|c| c == "mw-heading2")
}
