use pulldown_cmark::{html, Event, Options, Parser, Tag};

/// The length, in characters, that excerpts are pruned to.
pub const EXCERPT_LENGTH: usize = 140;

const ELLIPSIS: char = '…';

fn options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);
    options
}

/// Converts markdown to HTML.
pub fn to_html(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, Parser::new_ext(markdown, options()));
    out
}

/// Extracts the plain text of `markdown` and prunes it to
/// [`EXCERPT_LENGTH`] characters.
pub fn excerpt(markdown: &str) -> String {
    let mut text = String::new();
    for ev in Parser::new_ext(markdown, options()) {
        match ev {
            Event::Text(s) | Event::Code(s) => text.push_str(&s),
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            Event::End(Tag::Paragraph)
            | Event::End(Tag::Heading(_))
            | Event::End(Tag::Item)
            | Event::End(Tag::CodeBlock(_)) => text.push(' '),
            _ => {}
        }
    }
    let collapsed = text.split_whitespace().collect::<Vec<&str>>().join(" ");
    prune(&collapsed, EXCERPT_LENGTH)
}

/// Shortens `text` to at most `length` characters plus an ellipsis, cutting
/// at the last word boundary. Text that already fits is returned unchanged.
pub fn prune(text: &str, length: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= length {
        return text.to_owned();
    }

    let cut: String = text.chars().take(length).collect();
    let at_boundary = text
        .chars()
        .nth(length)
        .map_or(true, char::is_whitespace);
    let kept = match at_boundary {
        true => cut.as_str(),
        false => match cut.rfind(char::is_whitespace) {
            Some(i) => &cut[..i],
            None => cut.as_str(),
        },
    };

    let mut out = kept.trim_end().to_owned();
    out.push(ELLIPSIS);
    out
}
