//! Minimal DOM capabilities the extractors rely on.
//!
//! The listing and document extractors only ever walk descendants by tag
//! name, match class attributes and read text, so they are written against
//! [`DomNode`] rather than a particular HTML parser. [`scraper`] provides the
//! implementation used at runtime.

use scraper::{ElementRef, Html};

pub trait DomNode: Copy {
    fn tag_name(&self) -> &str;

    fn attr(&self, name: &str) -> Option<&str>;

    /// Descendant elements named `tag`, in document order, excluding `self`.
    fn descendants_by_tag(&self, tag: &str) -> Vec<Self>;

    /// Concatenated text of every descendant text node.
    fn text_content(&self) -> String;

    /// The element serialized back to markup, including its own tags.
    fn outer_html(&self) -> String;

    fn first_by_tag(&self, tag: &str) -> Option<Self> {
        self.descendants_by_tag(tag).into_iter().next()
    }

    fn nth_by_tag(&self, tag: &str, index: usize) -> Option<Self> {
        self.descendants_by_tag(tag).into_iter().nth(index)
    }

    /// Case-insensitive substring match against the `class` attribute.
    fn class_contains(&self, token: &str) -> bool {
        self.attr("class")
            .is_some_and(|class| class.to_ascii_lowercase().contains(&token.to_ascii_lowercase()))
    }

    /// First `tag` descendant whose class attribute contains `token`.
    fn first_with_class(&self, tag: &str, token: &str) -> Option<Self> {
        self.descendants_by_tag(tag)
            .into_iter()
            .find(|node| node.class_contains(token))
    }
}

impl<'a> DomNode for ElementRef<'a> {
    fn tag_name(&self) -> &str {
        self.value().name()
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.value().attr(name)
    }

    fn descendants_by_tag(&self, tag: &str) -> Vec<Self> {
        self.descendants()
            .skip(1)
            .filter_map(ElementRef::wrap)
            .filter(|element| element.value().name().eq_ignore_ascii_case(tag))
            .collect()
    }

    fn text_content(&self) -> String {
        self.text().collect()
    }

    fn outer_html(&self) -> String {
        self.html()
    }
}

/// Root element of a parsed page.
pub fn root(document: &Html) -> ElementRef<'_> {
    document.root_element()
}
