use wp_reference_client::types::{ResultKind, SearchResultItem};

use super::{dom::DomNode, text::remove_ignore_case};

/// Which `<nav>` (by position among all navs) holds the pagination links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationControl {
    pub nav_index: usize,
}

/// One search results page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    pub items: Vec<SearchResultItem>,
    pub pagination: Option<PaginationControl>,
    pub is_last_page: bool,
}

impl ListingPage {
    #[must_use]
    pub fn is_paginated(&self) -> bool {
        self.pagination.is_some()
    }
}

/// `true` when the page is the site's "nothing found" result.
pub fn is_not_found<N: DomNode>(root: N) -> bool {
    root.descendants_by_tag("section")
        .iter()
        .any(|section| section.class_contains("not-found"))
}

/// Locates the pagination `<nav>`; the last matching nav wins.
pub fn find_pagination<N: DomNode>(root: N) -> Option<PaginationControl> {
    root.descendants_by_tag("nav")
        .iter()
        .enumerate()
        .filter(|(_, nav)| nav.class_contains("pagination"))
        .map(|(nav_index, _)| PaginationControl { nav_index })
        .last()
}

/// A page is the last one unless the pagination control links to "next".
pub fn is_last_page<N: DomNode>(root: N, control: Option<PaginationControl>) -> bool {
    let Some(nav) = control.and_then(|control| root.nth_by_tag("nav", control.nav_index)) else {
        return true;
    };
    !nav.descendants_by_tag("a")
        .iter()
        .any(|anchor| anchor.text_content().to_ascii_lowercase().contains("next"))
}

/// Reads every `<article>` of the main region. A page without `<main>`
/// yields no items.
pub fn extract_listing<N: DomNode>(root: N) -> ListingPage {
    let pagination = find_pagination(root);
    let is_last_page = is_last_page(root, pagination);
    let items = root
        .first_by_tag("main")
        .map(|main| {
            main.descendants_by_tag("article")
                .into_iter()
                .filter_map(extract_item)
                .collect()
        })
        .unwrap_or_default();

    ListingPage {
        items,
        pagination,
        is_last_page,
    }
}

fn extract_item<N: DomNode>(article: N) -> Option<SearchResultItem> {
    let heading = article.first_by_tag("h1")?;
    let title = heading.text_content().trim().to_string();
    let link = heading
        .first_by_tag("a")
        .and_then(|anchor| anchor.attr("href").map(str::to_string))
        .unwrap_or_default();

    let summary = article
        .nth_by_tag("div", 0)
        .and_then(|block| block.first_by_tag("p"));
    let label = summary
        .and_then(|p| p.first_by_tag("b"))
        .map(|bold| bold.text_content())
        .unwrap_or_default();
    let label = remove_ignore_case(&remove_ignore_case(&label, ":"), " hook");
    let kind = ResultKind::from_label(&label.trim().to_lowercase());

    let description = summary
        .map(|p| p.text_content())
        .and_then(|text| {
            text.split_once(':')
                .map(|(_, rest)| rest.trim().to_string())
        })
        .unwrap_or_default();

    let source = article
        .nth_by_tag("div", 1)
        .and_then(|block| block.first_by_tag("p"))
        .map(|p| remove_ignore_case(&p.text_content(), "source: "))
        .unwrap_or_default();
    let (source_file, source_line) = match source.split_once(':') {
        Some((file, line)) => (file.trim().to_string(), line.trim().parse().unwrap_or(0)),
        None => (source.trim().to_string(), 0),
    };

    Some(SearchResultItem {
        title,
        kind,
        link,
        source_file,
        source_line,
        description,
    })
}
