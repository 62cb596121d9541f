//! Rich-text rendering
//!
//! Converts CMS rich-text elements into HTML. Inline spans are
//! character ranges over an element's text; overlapping spans that do not
//! nest are clipped to their enclosing span.

use crate::cms::{InlineSpan, RichTextSpan};

/// Render a rich-text field to HTML
pub fn as_html(elements: &[RichTextSpan]) -> String {
    let mut html = String::new();
    let mut open_list: Option<&'static str> = None;

    for element in elements {
        let list = match element.kind.as_str() {
            "list-item" => Some("ul"),
            "o-list-item" => Some("ol"),
            _ => None,
        };

        if open_list != list {
            if let Some(tag) = open_list {
                html.push_str(&format!("</{}>", tag));
            }
            if let Some(tag) = list {
                html.push_str(&format!("<{}>", tag));
            }
            open_list = list;
        }

        html.push_str(&render_element(element));
    }

    if let Some(tag) = open_list {
        html.push_str(&format!("</{}>", tag));
    }

    html
}

fn render_element(element: &RichTextSpan) -> String {
    match element.kind.as_str() {
        "heading1" | "heading2" | "heading3" | "heading4" | "heading5" | "heading6" => {
            let level = &element.kind["heading".len()..];
            format!("<h{0}>{1}</h{0}>", level, render_inline(element))
        }
        "preformatted" => format!("<pre>{}</pre>", render_inline(element)),
        "list-item" | "o-list-item" => format!("<li>{}</li>", render_inline(element)),
        "image" => {
            let url = element.url.as_deref().unwrap_or_default();
            let alt = element.alt.as_deref().unwrap_or_default();
            format!(
                r#"<p class="block-img"><img src="{}" alt="{}"></p>"#,
                html_escape(url),
                html_escape(alt)
            )
        }
        // embeds carry provider markup we do not reproduce; keep a link
        "embed" => match element.url.as_deref() {
            Some(url) => format!(
                r#"<div data-type="embed"><a href="{0}">{0}</a></div>"#,
                html_escape(url)
            ),
            None => String::new(),
        },
        _ => format!("<p>{}</p>", render_inline(element)),
    }
}

/// Apply inline spans to the element's text
fn render_inline(element: &RichTextSpan) -> String {
    let chars: Vec<char> = element.text.chars().collect();
    let len = chars.len();

    let mut spans: Vec<(usize, usize, &InlineSpan)> = element
        .spans
        .iter()
        .map(|s| (s.start.min(len), s.end.min(len), s))
        .filter(|(start, end, _)| start < end)
        .collect();
    // outer spans first when two start together
    spans.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

    let mut html = String::new();
    let mut stack: Vec<(usize, &InlineSpan)> = Vec::new();
    let mut next_span = 0;

    for (i, c) in chars.iter().enumerate() {
        close_spans(&mut html, &mut stack, i);

        while next_span < spans.len() && spans[next_span].0 == i {
            let (_, end, span) = spans[next_span];
            let end = stack.last().map_or(end, |(outer, _)| end.min(*outer));
            html.push_str(&open_tag(span));
            stack.push((end, span));
            next_span += 1;
        }

        match c {
            '\n' => html.push_str("<br />"),
            _ => html.push_str(&html_escape(&c.to_string())),
        }
    }
    close_spans(&mut html, &mut stack, len);
    while let Some((_, span)) = stack.pop() {
        html.push_str(close_tag(span));
    }

    html
}

fn close_spans(html: &mut String, stack: &mut Vec<(usize, &InlineSpan)>, at: usize) {
    while let Some(&(end, span)) = stack.last() {
        if end > at {
            break;
        }
        html.push_str(close_tag(span));
        stack.pop();
    }
}

fn open_tag(span: &InlineSpan) -> String {
    match span.kind.as_str() {
        "strong" => "<strong>".to_string(),
        "em" => "<em>".to_string(),
        "hyperlink" => {
            let data = span.data.as_ref();
            let url = data.and_then(|d| d.url.as_deref()).unwrap_or("#");
            match data.and_then(|d| d.target.as_deref()) {
                Some(target) => format!(
                    r#"<a href="{}" target="{}" rel="noopener">"#,
                    html_escape(url),
                    html_escape(target)
                ),
                None => format!(r#"<a href="{}">"#, html_escape(url)),
            }
        }
        "label" => {
            let label = span
                .data
                .as_ref()
                .and_then(|d| d.label.as_deref())
                .unwrap_or_default();
            format!(r#"<span class="{}">"#, html_escape(label))
        }
        _ => "<span>".to_string(),
    }
}

fn close_tag(span: &InlineSpan) -> &'static str {
    match span.kind.as_str() {
        "strong" => "</strong>",
        "em" => "</em>",
        "hyperlink" => "</a>",
        _ => "</span>",
    }
}

/// Simple HTML escaping
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::SpanData;

    fn span(kind: &str, start: usize, end: usize) -> InlineSpan {
        InlineSpan {
            start,
            end,
            kind: kind.to_string(),
            data: None,
        }
    }

    fn element(kind: &str, text: &str, spans: Vec<InlineSpan>) -> RichTextSpan {
        RichTextSpan {
            kind: kind.to_string(),
            text: text.to_string(),
            spans,
            ..Default::default()
        }
    }

    #[test]
    fn test_render_paragraph_with_spans() {
        let p = element("paragraph", "Hello bold world", vec![span("strong", 6, 10)]);
        assert_eq!(as_html(&[p]), "<p>Hello <strong>bold</strong> world</p>");
    }

    #[test]
    fn test_render_nested_spans() {
        let p = element(
            "paragraph",
            "abcdef",
            vec![span("em", 2, 4), span("strong", 0, 6)],
        );
        assert_eq!(
            as_html(&[p]),
            "<p><strong>ab<em>cd</em>ef</strong></p>"
        );
    }

    #[test]
    fn test_render_hyperlink_and_escaping() {
        let mut link = span("hyperlink", 0, 4);
        link.data = Some(SpanData {
            url: Some("https://rocketseat.com.br".to_string()),
            ..Default::default()
        });
        let p = element("paragraph", "Site <3", vec![link]);
        assert_eq!(
            as_html(&[p]),
            r#"<p><a href="https://rocketseat.com.br">Site</a> &lt;3</p>"#
        );
    }

    #[test]
    fn test_render_groups_list_items() {
        let elements = vec![
            element("list-item", "one", vec![]),
            element("list-item", "two", vec![]),
            element("o-list-item", "first", vec![]),
            element("heading2", "Title", vec![]),
        ];
        assert_eq!(
            as_html(&elements),
            "<ul><li>one</li><li>two</li></ul><ol><li>first</li></ol><h2>Title</h2>"
        );
    }

    #[test]
    fn test_render_multibyte_offsets() {
        let p = element("paragraph", "ação rápida", vec![span("em", 5, 11)]);
        assert_eq!(as_html(&[p]), "<p>ação <em>rápida</em></p>");
    }

    #[test]
    fn test_out_of_range_spans_are_clamped() {
        let p = element("paragraph", "short", vec![span("strong", 2, 99), span("em", 50, 60)]);
        assert_eq!(as_html(&[p]), "<p>sh<strong>ort</strong></p>");
    }
}
