//! Movie page extraction
//!
//! Income and cast come from the labelled rows of the page's fact box. A page
//! without a fact box still yields a record carrying its name.

use crate::crawler::{PageType, Task};
use crate::extract::markup::{
    collect_links, element_text, find_first, first_digit_run, page_title, selector, LinkSet,
};
use crate::extract::{degrade, ExtractError, Extraction, Extractor, PageContext};
use crate::item::{Item, MovieItem};
use scraper::{ElementRef, Html};
use url::Url;

const BOX_OFFICE_LABEL: &str = "Box office";
const STARRING_LABEL: &str = "Starring";

/// Extractor for movie pages
#[derive(Debug, Clone, Copy, Default)]
pub struct MovieExtractor;

impl Extractor for MovieExtractor {
    fn page_type(&self) -> PageType {
        PageType::Movie
    }

    fn extract(&self, page: &PageContext<'_>) -> Extraction {
        let document = Html::parse_document(page.html);

        let Some(name) = page_title(&document) else {
            tracing::debug!("{}: movie page has no title, emitting empty record", page.url);
            return Extraction::empty();
        };

        let fact_box = find_first(&document, "table.infobox");
        let income = degrade(
            page.url,
            "income",
            fact_box
                .ok_or(ExtractError::Structural("fact box"))
                .and_then(box_office),
        );
        let actors = degrade(
            page.url,
            "actors",
            fact_box
                .ok_or(ExtractError::Structural("fact box"))
                .and_then(|fact_box| starring_links(fact_box, page)),
        )
        .unwrap_or_default();

        let movie = MovieItem {
            name,
            income,
            url: page.url.to_string(),
            actors: actors.iter().map(Url::to_string).collect(),
        };

        Extraction {
            item: Item::Movie(movie),
            children: actors.into_iter().map(Task::actor).collect(),
        }
    }
}

/// Finds the header cell of the fact box row labelled `label`
fn label_cell<'a>(fact_box: ElementRef<'a>, label: &str) -> Option<ElementRef<'a>> {
    let headers = selector("th")?;
    fact_box
        .select(&headers)
        .find(|th| element_text(*th) == label)
}

fn box_office(fact_box: ElementRef<'_>) -> Result<u64, ExtractError> {
    let label = label_cell(fact_box, BOX_OFFICE_LABEL).ok_or(ExtractError::Structural("box office row"))?;
    let value = label
        .next_siblings()
        .find_map(ElementRef::wrap)
        .ok_or(ExtractError::Structural("box office value"))?;

    first_digit_run(&element_text(value)).ok_or(ExtractError::Value("box office"))
}

fn starring_links(fact_box: ElementRef<'_>, page: &PageContext<'_>) -> Result<Vec<Url>, ExtractError> {
    let label = label_cell(fact_box, STARRING_LABEL).ok_or(ExtractError::Structural("starring row"))?;
    let row = label
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "tr")
        .ok_or(ExtractError::Structural("starring row"))?;

    let mut links = LinkSet::default();
    collect_links(row, page, &mut links);
    Ok(links.into_vec())
}
