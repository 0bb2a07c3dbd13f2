use wp_reference_client::types::{
    Changelog, Document, DocumentKind, NestedParameter, OrderedMap, ParameterSpec, Requirement,
    ReturnSpec, SourceLocation,
};

use super::{
    dom::DomNode,
    text::{collapse_whitespace, remove_ignore_case, sanitize_description, strip_parentheses},
};

/// Extracts a single reference entry.
///
/// Returns `None` when the page has no `<main>`/`<article>` or when the
/// `content-toc` region is missing; every section inside that region is
/// optional.
pub fn extract_document<N: DomNode>(root: N, page_url: &str) -> Option<Document> {
    let article = root.first_by_tag("main")?.first_by_tag("article")?;

    let structure = article
        .first_by_tag("h1")
        .map(|heading| heading.text_content().replace('\u{a0}', " ").trim().to_string())
        .unwrap_or_default();
    let summary = article
        .first_by_tag("section")
        .and_then(|section| section.first_by_tag("p"))
        .map(|p| p.text_content().trim().to_string())
        .unwrap_or_default();

    let content = article.first_with_class("div", "content-toc")?;

    Some(Document {
        page_url: page_url.to_string(),
        kind: DocumentKind::from_url(page_url),
        structure,
        summary,
        description: content
            .first_with_class("section", "description")
            .map(|section| sanitize_description(&section.outer_html())),
        source: content
            .first_with_class("section", "source-content")
            .and_then(extract_source),
        parameters: content
            .first_with_class("section", "parameters")
            .and_then(extract_parameters),
        return_value: content
            .first_with_class("section", "return")
            .and_then(extract_return),
        changelog: content
            .first_with_class("section", "changelog")
            .and_then(|section| section.first_by_tag("table"))
            .and_then(extract_changelog),
    })
}

fn extract_source<N: DomNode>(section: N) -> Option<SourceLocation> {
    let paragraphs = section.descendants_by_tag("p");
    let first = paragraphs.first()?;
    let file_index = usize::from(
        first
            .attr("class")
            .is_some_and(|class| class.trim().eq_ignore_ascii_case("toc-jump")),
    );
    let file = paragraphs
        .get(file_index)
        .map(|p| {
            collapse_whitespace(&remove_ignore_case(&p.text_content(), "file: "))
                .trim()
                .to_string()
        })
        .unwrap_or_default();

    let line = section
        .first_with_class("div", "source-code-container")
        .and_then(|container| container.first_by_tag("pre"))
        .and_then(|pre| pre.attr("class").and_then(first_line_number));

    Some(SourceLocation { file, line })
}

fn first_line_number(class: &str) -> Option<u32> {
    let (_, rest) = class.split_once("first-line:")?;
    let digits: String = rest
        .trim_start()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

fn extract_parameters<N: DomNode>(section: N) -> Option<OrderedMap<ParameterSpec>> {
    let list = section.first_by_tag("dl")?;
    let names: Vec<String> = list
        .descendants_by_tag("dt")
        .iter()
        .map(|term| term.text_content().trim().to_string())
        .collect();
    if names.is_empty() {
        return None;
    }

    let specs = list.descendants_by_tag("dd").into_iter().map(extract_parameter);
    Some(names.into_iter().zip(specs).collect())
}

fn extract_parameter<N: DomNode>(definition: N) -> ParameterSpec {
    let mut spec = ParameterSpec::default();

    if let Some(p) = definition.first_by_tag("p") {
        if let Some(kind) = p.first_with_class("span", "type") {
            spec.kind = strip_parentheses(&kind.text_content());
        }
        if let Some(required) = p.first_with_class("span", "required") {
            spec.required = Requirement::from_label(&strip_parentheses(&required.text_content()));
        }
        if let Some(description) = p.first_with_class("span", "description") {
            spec.description = collapse_whitespace(&description.text_content())
                .trim()
                .to_string();
        }
    }

    if let Some(list) = definition.first_by_tag("ul") {
        spec.nested = list
            .descendants_by_tag("li")
            .into_iter()
            .map(extract_nested_parameter)
            .collect();

        // The parent description repeats the nested keys; keep only the lead-in.
        if let Some(first) = spec.nested.keys().next() {
            let marker = format!("'{first}'");
            if let Some((lead, _)) = spec.description.split_once(marker.as_str()) {
                spec.description = lead.trim().to_string();
            }
        }
    }

    spec
}

fn extract_nested_parameter<N: DomNode>(item: N) -> (String, NestedParameter) {
    let name = item
        .first_by_tag("b")
        .map(|bold| bold.text_content().trim().trim_matches('\'').to_string())
        .unwrap_or_default();
    let kind = item
        .first_by_tag("i")
        .map(|italic| strip_parentheses(&italic.text_content()))
        .unwrap_or_default();

    let text = item.text_content();
    let description = text
        .split_once(format!("({kind})").as_str())
        .map(|(_, rest)| collapse_whitespace(rest).trim().to_string())
        .unwrap_or_default();

    (name, NestedParameter { kind, description })
}

fn extract_return<N: DomNode>(section: N) -> Option<ReturnSpec> {
    let paragraph = section.nth_by_tag("p", 1)?;
    let raw_kind = paragraph
        .first_by_tag("span")
        .map(|span| span.text_content())
        .unwrap_or_default();
    let text = paragraph.text_content();
    let description = if raw_kind.is_empty() {
        text.as_str()
    } else {
        text.split_once(raw_kind.as_str()).map_or("", |(_, rest)| rest)
    };

    Some(ReturnSpec {
        kind: strip_parentheses(&raw_kind),
        description: collapse_whitespace(description).trim().to_string(),
    })
}

fn extract_changelog<N: DomNode>(table: N) -> Option<Changelog> {
    let columns: Vec<String> = table
        .first_by_tag("thead")?
        .first_by_tag("tr")?
        .descendants_by_tag("th")
        .iter()
        .map(|cell| cell.text_content().trim().to_string())
        .collect();

    let rows = table
        .first_by_tag("tbody")?
        .descendants_by_tag("tr")
        .into_iter()
        .map(|row| {
            let cells = row.descendants_by_tag("td");
            columns
                .iter()
                .enumerate()
                .map(|(index, column)| {
                    let value = cells
                        .get(index)
                        .map(|cell| collapse_whitespace(&cell.text_content()).trim().to_string())
                        .unwrap_or_default();
                    (column.clone(), value)
                })
                .collect()
        })
        .collect();

    Some(Changelog { columns, rows })
}
