//! Light-markdown scene bodies.
//!
//! Scene content is authored with a small markdown subset (emphasis, lists,
//! paragraphs). The player renders it to HTML; narration needs plain text.

use pulldown_cmark::{Event, Options, Parser, TagEnd, html};

/// Renders a scene body to HTML.
#[must_use]
pub fn render_html(content: &str) -> String {
    let parser = Parser::new_ext(content, Options::ENABLE_STRIKETHROUGH);
    let mut out = String::with_capacity(content.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Strips markup, keeping text suitable for speech.
#[must_use]
pub fn plain_text(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    for event in Parser::new(content) {
        match event {
            Event::Text(text) | Event::Code(text) => out.push_str(&text),
            Event::SoftBreak | Event::HardBreak => out.push(' '),
            Event::End(TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item) => {
                if !out.ends_with(' ') && !out.is_empty() {
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
    out.trim_end().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_html_emphasis() {
        let html = render_html("You feel **nervous**.");

        assert_eq!(html, "<p>You feel <strong>nervous</strong>.</p>\n");
    }

    #[test]
    fn test_plain_text_strips_markup_and_joins_paragraphs() {
        let text = plain_text("**Maya** looks up.\n\nShe *sighs*.");

        assert_eq!(text, "Maya looks up. She sighs.");
    }

    #[test]
    fn test_plain_text_of_list_items() {
        let text = plain_text("- one\n- two\n");

        assert_eq!(text, "one two");
    }
}
