//! HTML extraction for the two page shapes of the code reference: search
//! result listings and single reference documents.

pub mod document;
pub mod dom;
pub mod listing;
pub mod text;

use scraper::Html;
use wp_reference_client::types::Document;

pub use document::extract_document;
pub use dom::DomNode;
pub use listing::{extract_listing, is_not_found, ListingPage, PaginationControl};

/// What a search results page turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingScan {
    NotFound,
    Page(ListingPage),
}

/// Parses `html` as a search results page, checking for the "nothing
/// found" page first.
pub fn scan_listing(html: &str) -> ListingScan {
    let document = Html::parse_document(html);
    let root = dom::root(&document);
    if is_not_found(root) {
        ListingScan::NotFound
    } else {
        ListingScan::Page(extract_listing(root))
    }
}

/// Parses `html` as a single reference document served at `page_url`.
pub fn parse_document(html: &str, page_url: &str) -> Option<Document> {
    let document = Html::parse_document(html);
    extract_document(dom::root(&document), page_url)
}
