//! Turn the literal text of a matched element into a token.
//!
//! Every function here is pure: the tokenizer passes in the captured span
//! together with whatever context the mode needs.

use std::sync::LazyLock;

use quick_xml::escape::escape;
use regex::Regex;

use crate::parser::{NamespaceScope, QualifiedName};

use super::ExtractMode;

/// `xmlns="..."` and `xmlns:prefix='...'` attributes of a start tag.
static NAMESPACE_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\sxmlns(?::([^\s=:]+))?\s*=\s*('[^']*'|"[^"]*")"#)
        .expect("namespace declaration pattern is valid")
});

/// What the renderer may need besides the span itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderContext<'a> {
    /// Recorded text preceding each open ancestor, outermost first.
    pub segments: &'a [String],
    /// Names of the open ancestors, outermost first.
    pub path: &'a [QualifiedName],
    /// Namespace bindings in scope at the matched element.
    pub scope: Option<&'a NamespaceScope>,
}

/// Returns the byte index of the `>` that closes the first tag of `span`.
///
/// `>` inside quoted attribute values is skipped.
pub fn start_tag_end(span: &str) -> Option<usize> {
    let mut quote = None;
    for (i, b) in span.bytes().enumerate() {
        match (quote, b) {
            (None, b'"' | b'\'') => quote = Some(b),
            (Some(q), b) if q == b => quote = None,
            (None, b'>') => return Some(i),
            _ => {}
        }
    }
    None
}

/// Returns `stag` with every character inside a quoted attribute value
/// replaced by `x`. Byte offsets and the quotes themselves are kept.
fn mask_quoted(stag: &str) -> String {
    let mut quote = None;
    let mut out = String::with_capacity(stag.len());
    for c in stag.chars() {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(q), c) if q == c => quote = None,
            (Some(_), c) => {
                out.extend(std::iter::repeat_n('x', c.len_utf8()));
                continue;
            }
            _ => {}
        }
        out.push(c);
    }
    out
}

/// Declare every binding of `scope` that the start tag of `span` does not
/// declare itself.
///
/// New declarations use the quote character of the first declaration already
/// present, or `"` if there is none.
pub fn inject(span: &str, scope: &NamespaceScope) -> String {
    let Some(end) = start_tag_end(span) else {
        return span.to_owned();
    };
    let insert_at = if span[..end].ends_with('/') { end - 1 } else { end };

    let stag = mask_quoted(&span[..end]);
    let mut declared = vec![];
    let mut quote = '"';
    for (i, caps) in NAMESPACE_DECL.captures_iter(&stag).enumerate() {
        declared.push(caps.get(1).map_or("", |m| m.as_str()));
        if i == 0 {
            quote = caps[2].chars().next().unwrap_or('"');
        }
    }

    let mut out = String::with_capacity(span.len() + 32 * scope.len());
    out.push_str(&span[..insert_at]);
    for (prefix, uri) in scope.iter() {
        if declared.contains(&prefix) {
            continue;
        }
        out.push_str(" xmlns");
        if !prefix.is_empty() {
            out.push(':');
            out.push_str(prefix);
        }
        out.push('=');
        out.push(quote);
        out.push_str(&escape(uri));
        out.push(quote);
    }
    out.push_str(&span[insert_at..]);
    out
}

fn close_ancestors(out: &mut String, path: &[QualifiedName]) {
    for name in path.iter().rev() {
        out.push_str("</");
        out.push_str(&name.qname());
        out.push('>');
    }
}

/// Embed `span` in the recorded ancestor text and close every ancestor.
pub fn wrap(span: &str, segments: &[String], path: &[QualifiedName]) -> String {
    let mut out = segments.concat();
    out.push_str(span);
    close_ancestors(&mut out, path);
    out
}

/// Returns the content between the start tag and the last end tag of `span`.
///
/// An empty element yields `""`.
pub fn unwrap(span: &str) -> String {
    let Some(start) = start_tag_end(span) else {
        return String::new();
    };
    match span.rfind("</") {
        Some(end) if end > start => span[start + 1..end].to_owned(),
        _ => String::new(),
    }
}

/// Returns the concatenation of the text found between each `>` and the
/// following `<`.
pub fn text(span: &str) -> String {
    let mut out = String::new();
    let mut rest = span;
    while let Some(gt) = rest.find('>') {
        let after = &rest[gt + 1..];
        let Some(lt) = after.find('<') else {
            break;
        };
        out.push_str(&after[..lt]);
        rest = &after[lt..];
    }
    out
}

/// Render one matched element.
pub(crate) fn render_token(mode: ExtractMode, span: &str, ctx: &RenderContext) -> String {
    match mode {
        ExtractMode::Inject => match ctx.scope {
            Some(scope) => inject(span, scope),
            None => span.to_owned(),
        },
        ExtractMode::Wrap => wrap(span, ctx.segments, ctx.path),
        ExtractMode::Unwrap => unwrap(span),
        ExtractMode::Text => text(span),
    }
}

/// Render a batch of tokens.
///
/// In wrap mode the batch shares the ancestor context, otherwise it is
/// enclosed in a synthetic `<group>` element.
pub(crate) fn render_group(mode: ExtractMode, tokens: &[String], ctx: &RenderContext) -> String {
    let mut out = match mode {
        ExtractMode::Wrap => ctx.segments.concat(),
        _ => String::from("<group>"),
    };
    for token in tokens {
        out.push_str(token);
    }
    match mode {
        ExtractMode::Wrap => close_ancestors(&mut out, ctx.path),
        _ => out.push_str("</group>"),
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope(decls: &[(&str, &str)]) -> NamespaceScope {
        let decls = decls
            .iter()
            .map(|&(p, u)| (p.to_owned(), u.to_owned()))
            .collect::<Vec<_>>();
        NamespaceScope::new().extend(&decls)
    }

    #[test]
    fn start_tag_end_test() {
        const CASES: &[(&str, Option<usize>)] = &[
            ("<a>x</a>", Some(2)),
            ("<a/>", Some(3)),
            ("<a b='>'>x</a>", Some(8)),
            ("<a b=\"'>\" c='\"'>", Some(15)),
            ("<a b='x", None),
        ];
        for &(span, expected) in CASES {
            assert_eq!(start_tag_end(span), expected, "span: {span}");
        }
    }

    #[test]
    fn inject_test() {
        let scope = scope(&[("g", "urn:g"), ("c", "urn:c")]);
        const CASES: &[(&str, &str)] = &[
            (
                "<c:C>x</c:C>",
                r#"<c:C xmlns:g="urn:g" xmlns:c="urn:c">x</c:C>"#,
            ),
            (
                "<c:C/>",
                r#"<c:C xmlns:g="urn:g" xmlns:c="urn:c"/>"#,
            ),
            (
                "<c:C attr='1' xmlns:c='urn:c'>peach</c:C>",
                "<c:C attr='1' xmlns:c='urn:c' xmlns:g='urn:g'>peach</c:C>",
            ),
            (
                "<c:C a='>' xmlns:g=\"urn:g\" xmlns:c='urn:c'/>",
                "<c:C a='>' xmlns:g=\"urn:g\" xmlns:c='urn:c'/>",
            ),
            (
                "<c:C t=\" xmlns:g='zz'\"><g:x/></c:C>",
                "<c:C t=\" xmlns:g='zz'\" xmlns:g=\"urn:g\" xmlns:c=\"urn:c\"><g:x/></c:C>",
            ),
            (
                "<c:C t=' xmlns:g=\"' xmlns:c='urn:c'/>",
                "<c:C t=' xmlns:g=\"' xmlns:c='urn:c' xmlns:g='urn:g'/>",
            ),
        ];
        for &(span, expected) in CASES {
            assert_eq!(inject(span, &scope), expected, "span: {span}");
        }
    }

    #[test]
    fn inject_default_namespace_test() {
        let default = scope(&[("", "http://www.apache.org/xml/test")]);
        assert_eq!(
            inject("<statement>we love</statement>", &default),
            r#"<statement xmlns="http://www.apache.org/xml/test">we love</statement>"#
        );

        // text inside an attribute value is not a declaration
        let default = scope(&[("", "urn:a?x&y")]);
        assert_eq!(
            inject("<a title='xmlns=\"x\"'/>", &default),
            r#"<a title='xmlns="x"' xmlns="urn:a?x&amp;y"/>"#
        );
    }

    #[test]
    fn unwrap_test() {
        const CASES: &[(&str, &str)] = &[
            ("<aunt>emma</aunt>", "emma"),
            ("<aunt/>", ""),
            ("<a x='>'><b>y</b></a>", "<b>y</b>"),
            ("<a></a>", ""),
        ];
        for &(span, expected) in CASES {
            assert_eq!(unwrap(span), expected, "span: {span}");
        }
    }

    #[test]
    fn text_test() {
        const CASES: &[(&str, &str)] = &[
            ("<aunt>emma</aunt>", "emma"),
            ("<aunt/>", ""),
            (
                "<grandparent><uncle/><aunt>emma</aunt><c:parent><c:child/></c:parent></grandparent>",
                "emma",
            ),
            ("<a>x<b>y</b>z</a>", "xyz"),
        ];
        for &(span, expected) in CASES {
            assert_eq!(text(span), expected, "span: {span}");
        }
    }

    #[test]
    fn wrap_and_group_test() {
        let segments = vec!["<?xml version='1.0'?>".to_owned(), "<g:A xmlns:g='urn:g'>".to_owned()];
        let path = vec![QualifiedName::new("urn:g", "A", "g")];
        let ctx = RenderContext {
            segments: &segments,
            path: &path,
            scope: None,
        };
        assert_eq!(
            render_token(ExtractMode::Wrap, "<b/>", &ctx),
            "<?xml version='1.0'?><g:A xmlns:g='urn:g'><b/></g:A>"
        );
        let tokens = vec!["<b>1</b>".to_owned(), "<b>2</b>".to_owned()];
        assert_eq!(
            render_group(ExtractMode::Wrap, &tokens, &ctx),
            "<?xml version='1.0'?><g:A xmlns:g='urn:g'><b>1</b><b>2</b></g:A>"
        );
        assert_eq!(
            render_group(ExtractMode::Text, &tokens, &ctx),
            "<group><b>1</b><b>2</b></group>"
        );
        assert_eq!(render_token(ExtractMode::Inject, "<b/>", &ctx), "<b/>");
    }
}
