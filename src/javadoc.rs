//! @ai:module:intent Read documentation comments into plain text
//! @ai:module:layer application
//! @ai:module:public_api Documented, DocComment, extract_summary, extract_description, extract_param_doc
//! @ai:module:depends_on ast
//! @ai:module:stateless true

use crate::ast::{MethodDeclaration, TypeDeclaration};
use regex::Regex;
use std::sync::OnceLock;

/// @ai:intent Declarations that may carry a documentation comment
pub trait Documented {
    fn raw_doc(&self) -> Option<&str>;
}

impl Documented for MethodDeclaration {
    fn raw_doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }
}

impl Documented for TypeDeclaration {
    fn raw_doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }
}

/// @ai:intent A documentation comment split into prose and block tags
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocComment {
    pub paragraphs: Vec<String>,
    pub params: Vec<(String, String)>,
    pub returns: Option<String>,
}

fn inline_tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{@(?:code|literal|link|linkplain|value)\s+([^}]*)\}").expect("valid regex")
    })
}

fn html_tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"</?[a-zA-Z][^>]*>").expect("valid regex"))
}

impl DocComment {
    /// @ai:intent Parse raw `/** ... */` text
    /// @ai:example ("/** Finds things. */") -> paragraphs ["Finds things."]
    /// @ai:effects pure
    pub fn parse(raw: &str) -> Self {
        let inner = raw
            .trim()
            .trim_start_matches("/**")
            .trim_end_matches("*/");

        let lines: Vec<String> = inner
            .lines()
            .map(|line| {
                let trimmed = line.trim();
                let stripped = trimmed.strip_prefix('*').unwrap_or(trimmed);
                stripped.strip_prefix(' ').unwrap_or(stripped).to_string()
            })
            .collect();

        let mut doc = DocComment::default();
        let mut current = String::new();
        let mut tag: Option<(String, String)> = None;

        let flush_paragraph = |current: &mut String, paragraphs: &mut Vec<String>| {
            let text = normalize(current);
            if !text.is_empty() {
                paragraphs.push(text);
            }
            current.clear();
        };

        for line in lines {
            let trimmed = line.trim();
            if trimmed.starts_with('@') {
                if let Some(done) = tag.take() {
                    doc.push_tag(done);
                }
                flush_paragraph(&mut current, &mut doc.paragraphs);
                let (name, rest) = trimmed.split_once(char::is_whitespace).unwrap_or((trimmed, ""));
                tag = Some((name.to_string(), rest.to_string()));
                continue;
            }

            if let Some((_, text)) = tag.as_mut() {
                text.push(' ');
                text.push_str(trimmed);
                continue;
            }

            if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("<p>") {
                flush_paragraph(&mut current, &mut doc.paragraphs);
                continue;
            }

            for (i, part) in trimmed.split("<p>").enumerate() {
                if i > 0 {
                    flush_paragraph(&mut current, &mut doc.paragraphs);
                }
                current.push(' ');
                current.push_str(part);
            }
        }

        if let Some(done) = tag.take() {
            doc.push_tag(done);
        }
        flush_paragraph(&mut current, &mut doc.paragraphs);
        doc
    }

    fn push_tag(&mut self, (name, text): (String, String)) {
        match name.as_str() {
            "@param" => {
                let text = text.trim();
                let (param, description) = text.split_once(char::is_whitespace).unwrap_or((text, ""));
                self.params.push((param.to_string(), normalize(description)));
            }
            "@return" => self.returns = Some(normalize(&text)),
            _ => {}
        }
    }

    /// @ai:intent First sentence of the prose
    /// @ai:effects pure
    pub fn summary(&self) -> Option<String> {
        let first = self.paragraphs.first()?;
        let (sentence, _) = split_first_sentence(first);
        Some(sentence.to_string())
    }

    /// @ai:intent Prose remaining after the summary sentence
    /// @ai:post None when nothing follows the first sentence
    /// @ai:effects pure
    pub fn description(&self) -> Option<String> {
        let first = self.paragraphs.first()?;
        let (_, rest) = split_first_sentence(first);
        let mut parts: Vec<&str> = Vec::new();
        if !rest.is_empty() {
            parts.push(rest);
        }
        parts.extend(self.paragraphs.iter().skip(1).map(String::as_str));
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n\n"))
        }
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(param, _)| param == name)
            .map(|(_, text)| text.as_str())
            .filter(|text| !text.is_empty())
    }
}

/// Collapses whitespace and strips inline markup.
fn normalize(text: &str) -> String {
    let text = inline_tag_pattern().replace_all(text, "$1");
    let text = html_tag_pattern().replace_all(&text, "");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// @ai:intent Split at the first period followed by whitespace
/// @ai:example ("Finds widgets. Sorted by name.") -> ("Finds widgets.", "Sorted by name.")
/// @ai:effects pure
fn split_first_sentence(paragraph: &str) -> (&str, &str) {
    let bytes = paragraph.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'.' && bytes.get(i + 1).is_some_and(|next| next.is_ascii_whitespace()) {
            return (&paragraph[..=i], paragraph[i + 1..].trim());
        }
    }
    (paragraph, "")
}

/// @ai:intent Summary text of a declaration's documentation
/// @ai:effects pure
pub fn extract_summary(decl: &impl Documented) -> Option<String> {
    decl.raw_doc().map(DocComment::parse).and_then(|d| d.summary())
}

/// @ai:intent Longer description of a declaration's documentation
/// @ai:effects pure
pub fn extract_description(decl: &impl Documented) -> Option<String> {
    decl.raw_doc().map(DocComment::parse).and_then(|d| d.description())
}

/// @ai:intent `@param` text for one parameter
/// @ai:effects pure
pub fn extract_param_doc(decl: &impl Documented, param: &str) -> Option<String> {
    let doc = DocComment::parse(decl.raw_doc()?);
    doc.param(param).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::TypeRef;
    use pretty_assertions::assert_eq;

    const DOC: &str = "/**\n * Finds widgets by {@code color}. Results are unordered.\n *\n * <p>Backed by an index.\n *\n * @param color the color to\n *        match\n * @return matching widgets\n */";

    #[test]
    fn test_parse_paragraphs_and_tags() {
        let doc = DocComment::parse(DOC);
        assert_eq!(
            doc.paragraphs,
            vec![
                "Finds widgets by color. Results are unordered.".to_string(),
                "Backed by an index.".to_string()
            ]
        );
        assert_eq!(doc.param("color"), Some("the color to match"));
        assert_eq!(doc.returns.as_deref(), Some("matching widgets"));
    }

    #[test]
    fn test_summary_and_description() {
        let mut method = MethodDeclaration::new("findByColor", TypeRef::simple("List"), vec![]);
        method.doc = Some(DOC.to_string());

        assert_eq!(extract_summary(&method).as_deref(), Some("Finds widgets by color."));
        assert_eq!(
            extract_description(&method).as_deref(),
            Some("Results are unordered.\n\nBacked by an index.")
        );
        assert_eq!(extract_param_doc(&method, "color").as_deref(), Some("the color to match"));
        assert_eq!(extract_param_doc(&method, "size"), None);
    }

    #[test]
    fn test_single_line_doc_has_no_description() {
        let mut method = MethodDeclaration::new("count", TypeRef::simple("long"), vec![]);
        method.doc = Some("/** Counts widgets. */".to_string());
        assert_eq!(extract_summary(&method).as_deref(), Some("Counts widgets."));
        assert_eq!(extract_description(&method), None);
    }

    #[test]
    fn test_undocumented() {
        let method = MethodDeclaration::new("count", TypeRef::simple("long"), vec![]);
        assert_eq!(extract_summary(&method), None);
    }
}
