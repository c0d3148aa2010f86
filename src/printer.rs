//! @ai:module:intent Serialize the declaration graph back to Java source
//! @ai:module:layer infrastructure
//! @ai:module:public_api print_unit, render_annotation, write_unit
//! @ai:module:depends_on ast, error
//! @ai:module:stateless true

use crate::ast::{
    Annotation, AnnotationArgs, AnnotationValue, CompilationUnit, Member, MethodDeclaration,
    Parameter, TypeDeclaration, TypeKind, TypeRef,
};
use crate::error::{Error, Result};
use std::path::Path;

const INDENT: usize = 4;
const MAX_WIDTH: usize = 100;

/// @ai:intent Write a unit back to the file it was parsed from
/// @ai:pre unit.path is set
/// @ai:effects fs:write
pub fn write_unit(unit: &CompilationUnit) -> Result<()> {
    let path = unit
        .path
        .as_deref()
        .ok_or_else(|| Error::NotFound(Path::new("<unsaved unit>").to_path_buf()))?;
    std::fs::write(path, print_unit(unit)).map_err(|e| Error::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })
}

/// @ai:intent Render a whole compilation unit as Java source
/// @ai:post output parses back to a content-equal unit
/// @ai:effects pure
pub fn print_unit(unit: &CompilationUnit) -> String {
    let mut out = String::new();

    push_lines(&mut out, &unit.header, 0);
    if !unit.header.is_empty() {
        out.push('\n');
    }

    if let Some(package) = &unit.package {
        out.push_str(&format!("package {};\n\n", package));
    }

    for import in &unit.imports {
        push_lines(&mut out, &import.comments, 0);
        out.push_str("import ");
        if import.is_static {
            out.push_str("static ");
        }
        out.push_str(&import.path);
        if import.is_wildcard {
            out.push_str(".*");
        }
        out.push_str(";\n");
    }
    if !unit.imports.is_empty() {
        out.push('\n');
    }

    let types: Vec<String> = unit.types.iter().map(|t| print_type(unit, t)).collect();
    out.push_str(&types.join("\n"));

    if !unit.trailer.is_empty() {
        out.push('\n');
        push_lines(&mut out, &unit.trailer, 0);
    }
    out
}

fn print_type(unit: &CompilationUnit, decl: &TypeDeclaration) -> String {
    let mut out = String::new();

    push_lines(&mut out, &decl.leading, 0);
    if let Some(doc) = &decl.doc {
        out.push_str(&indent_all(doc, 0));
        out.push('\n');
    }

    if decl.kind == TypeKind::Opaque {
        out.push_str(decl.source.as_deref().unwrap_or_default());
        out.push('\n');
        return out;
    }

    for annotation in &decl.annotations {
        out.push_str(&render_annotation(unit, annotation, 0));
        out.push('\n');
    }
    if !decl.annotations.is_empty() {
        push_lines(&mut out, &decl.comments, 0);
    }

    let mut header: Vec<String> = decl.modifiers.clone();
    header.push(
        match decl.kind {
            TypeKind::Class => "class",
            _ => "interface",
        }
        .to_string(),
    );
    let mut name = decl.name.clone();
    if let Some(params) = &decl.type_parameters_source {
        name.push_str(params);
    }
    header.push(name);

    if let Some(superclass) = &decl.superclass {
        header.push(format!("extends {}", superclass.render()));
    }
    if !decl.extends.is_empty() {
        let keyword = if decl.kind == TypeKind::Class {
            "implements"
        } else {
            "extends"
        };
        let list: Vec<String> = decl.extends.iter().map(TypeRef::render).collect();
        header.push(format!("{} {}", keyword, list.join(", ")));
    }
    out.push_str(&header.join(" "));
    let line_closed = decl.annotations.is_empty() && push_trailing(&mut out, &decl.comments, 0);
    out.push_str(if line_closed { "\n{\n" } else { " {\n" });

    for member in &decl.members {
        out.push('\n');
        match member {
            Member::Method(method) => out.push_str(&print_method(unit, method, INDENT)),
            Member::Verbatim(text) => out.push_str(&indent_all(text, INDENT)),
        }
        out.push('\n');
    }

    out.push_str("}\n");
    out
}

fn print_method(unit: &CompilationUnit, method: &MethodDeclaration, indent: usize) -> String {
    let pad = " ".repeat(indent);
    let mut out = String::new();

    if let Some(doc) = &method.doc {
        out.push_str(&indent_all(doc, indent));
        out.push('\n');
    }

    for annotation in &method.annotations {
        out.push_str(&pad);
        out.push_str(&render_annotation(unit, annotation, indent));
        out.push('\n');
    }
    if !method.annotations.is_empty() {
        push_lines(&mut out, &method.comments, indent);
    }

    let mut prefix = method.modifiers.clone();
    if !method.type_parameters.is_empty() {
        prefix.push(format!("<{}>", method.type_parameters.join(", ")));
    }
    prefix.push(method.return_type.render());
    out.push_str(&pad);
    out.push_str(&prefix.join(" "));

    let continuation = indent + 2 * INDENT;
    if method.annotations.is_empty() && push_trailing(&mut out, &method.comments, continuation) {
        out.push('\n');
        out.push_str(&" ".repeat(continuation));
    } else {
        out.push(' ');
    }
    out.push_str(&method.name);
    out.push_str(&print_parameters(unit, &method.parameters, indent));
    if !method.throws.is_empty() {
        let throws: Vec<String> = method.throws.iter().map(TypeRef::render).collect();
        out.push_str(&format!(" throws {}", throws.join(", ")));
    }

    match &method.body {
        Some(body) => {
            out.push(' ');
            out.push_str(&indent_tail(body, indent));
        }
        None => out.push(';'),
    }
    out
}

/// @ai:intent Render a parameter list; a `//` comment puts every parameter on its own line
fn print_parameters(unit: &CompilationUnit, params: &[Parameter], indent: usize) -> String {
    let multiline = params
        .iter()
        .any(|p| p.comments.iter().any(|c| is_line_comment(c)));

    if !multiline {
        let rendered: Vec<String> = params
            .iter()
            .map(|p| {
                let mut text = print_parameter(unit, p);
                push_trailing(&mut text, &p.comments, indent);
                text
            })
            .collect();
        return format!("({})", rendered.join(", "));
    }

    let inner = indent + 2 * INDENT;
    let mut out = String::from("(");
    for (i, param) in params.iter().enumerate() {
        out.push('\n');
        out.push_str(&" ".repeat(inner));
        out.push_str(&print_parameter(unit, param));
        if i + 1 < params.len() {
            out.push(',');
        }
        push_trailing(&mut out, &param.comments, inner);
    }
    out.push('\n');
    out.push_str(&" ".repeat(indent));
    out.push(')');
    out
}

fn print_parameter(unit: &CompilationUnit, param: &Parameter) -> String {
    let mut parts: Vec<String> = param
        .annotations
        .iter()
        .map(|a| inline_annotation(unit, a))
        .collect();
    parts.extend(param.modifiers.iter().cloned());
    let ty = param.ty.render();
    if param.varargs {
        parts.push(format!("{}...", ty));
    } else {
        parts.push(ty);
    }
    parts.push(param.name.clone());
    parts.join(" ")
}

/// @ai:intent Render an annotation, breaking it across lines past the width limit
/// @ai:post first line carries no indentation, later lines carry absolute indentation
/// @ai:effects pure
pub fn render_annotation(unit: &CompilationUnit, annotation: &Annotation, indent: usize) -> String {
    let inline = inline_annotation(unit, annotation);
    if indent.saturating_add(inline.len()) <= MAX_WIDTH {
        return inline;
    }

    let name = display_name(unit, &annotation.name);
    match &annotation.args {
        AnnotationArgs::Marker => format!("@{}", name),
        AnnotationArgs::Single(value) => {
            format!("@{}({})", name, render_value(unit, value, indent))
        }
        AnnotationArgs::Named(pairs) => {
            let inner = indent + INDENT;
            let pad = " ".repeat(inner);
            let lines: Vec<String> = pairs
                .iter()
                .map(|(key, value)| {
                    let prefix = format!("{} = ", key);
                    format!(
                        "{}{}{}",
                        pad,
                        prefix,
                        render_value(unit, value, inner)
                    )
                })
                .collect();
            format!("@{}(\n{}\n{})", name, lines.join(",\n"), " ".repeat(indent))
        }
    }
}

fn render_value(unit: &CompilationUnit, value: &AnnotationValue, indent: usize) -> String {
    match value {
        AnnotationValue::Annotation(inner) => render_annotation(unit, inner, indent),
        AnnotationValue::Array(items) => {
            let inline = inline_value(unit, value);
            if indent.saturating_add(inline.len()) <= MAX_WIDTH || items.is_empty() {
                return inline;
            }
            let inner = indent + INDENT;
            let pad = " ".repeat(inner);
            let lines: Vec<String> = items
                .iter()
                .map(|item| format!("{}{}", pad, render_value(unit, item, inner)))
                .collect();
            format!("{{\n{}\n{}}}", lines.join(",\n"), " ".repeat(indent))
        }
        _ => inline_value(unit, value),
    }
}

fn inline_annotation(unit: &CompilationUnit, annotation: &Annotation) -> String {
    let name = display_name(unit, &annotation.name);
    match &annotation.args {
        AnnotationArgs::Marker => format!("@{}", name),
        AnnotationArgs::Single(value) => format!("@{}({})", name, inline_value(unit, value)),
        AnnotationArgs::Named(pairs) => {
            let rendered: Vec<String> = pairs
                .iter()
                .map(|(key, value)| format!("{} = {}", key, inline_value(unit, value)))
                .collect();
            format!("@{}({})", name, rendered.join(", "))
        }
    }
}

fn inline_value(unit: &CompilationUnit, value: &AnnotationValue) -> String {
    match value {
        AnnotationValue::Str(s) => quote(s),
        AnnotationValue::Bool(b) => b.to_string(),
        AnnotationValue::Int(i) => i.to_string(),
        AnnotationValue::Class(ty) => {
            format!("{}{}.class", display_name(unit, &ty.name), "[]".repeat(ty.dims))
        }
        AnnotationValue::Expr(expr) => expr.clone(),
        AnnotationValue::Annotation(inner) => inline_annotation(unit, inner),
        AnnotationValue::Array(items) => {
            let rendered: Vec<String> = items.iter().map(|i| inline_value(unit, i)).collect();
            format!("{{{}}}", rendered.join(", "))
        }
    }
}

fn display_name<'a>(unit: &CompilationUnit, name: &'a str) -> &'a str {
    if unit.can_use_simple_name(name) {
        crate::ast::simple_name_of(name)
    } else {
        name
    }
}

/// @ai:intent Quote a string as a Java literal
/// @ai:example ("say \"hi\"") -> "\"say \\\"hi\\\"\""
/// @ai:effects pure
fn quote(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('"');
    for c in raw.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

fn is_line_comment(comment: &str) -> bool {
    comment.starts_with("//")
}

/// @ai:intent Write each comment on its own line at the given indentation
fn push_lines(out: &mut String, comments: &[String], indent: usize) {
    for comment in comments {
        out.push_str(&indent_all(comment, indent));
        out.push('\n');
    }
}

/// @ai:intent Append comments after text already on the current line
/// @ai:post true when a `//` comment closed the line; the caller must break it
fn push_trailing(out: &mut String, comments: &[String], indent: usize) -> bool {
    let mut line_closed = false;
    for comment in comments {
        if line_closed {
            out.push('\n');
            out.push_str(&" ".repeat(indent));
        } else {
            out.push(' ');
        }
        out.push_str(&indent_tail(comment, indent));
        line_closed = is_line_comment(comment);
    }
    line_closed
}

fn indent_all(text: &str, indent: usize) -> String {
    let pad = " ".repeat(indent);
    text.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", pad, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn indent_tail(text: &str, indent: usize) -> String {
    let mut lines = text.lines();
    let first = lines.next().unwrap_or_default().to_string();
    let rest = indent_all(&lines.collect::<Vec<_>>().join("\n"), indent);
    if rest.is_empty() && !text.contains('\n') {
        first
    } else {
        format!("{}\n{}", first, rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Import;
    use crate::parser::parse_source;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    const SOURCE: &str = r#"package com.acme.repo;

import com.acme.model.Widget;
import jakarta.ws.rs.GET;

/**
 * Widgets.
 */
public interface WidgetRepository extends CrudRepository<Widget, Long> {

    /** Widgets by color. */
    @GET
    List<Widget> findByColor(@Param("color") String color);

    default Widget touch(Widget widget) {
        if (widget != null) {
            return widget;
        }
        return null;
    }
}
"#;

    fn parse(source: &str) -> CompilationUnit {
        parse_source(source, &PathBuf::from("WidgetRepository.java")).unwrap()
    }

    #[test]
    fn test_print_reparses_to_equal_unit() {
        let unit = parse(SOURCE);
        let printed = print_unit(&unit);
        assert_eq!(parse(&printed), unit);
        assert_eq!(print_unit(&parse(&printed)), printed);
    }

    #[test]
    fn test_comments_survive_printing() {
        let source = r#"// license
package com.acme.repo;

import com.acme.model.Widget;
// collections
import java.util.List;

/** Widgets. */
public interface WidgetRepository extends CrudRepository<Widget, Long> {

    @Deprecated // keep: legacy finder
    List<Widget> findByColor(String color /* keep: css name */);

    List<Widget> findBySize(int size, // keep: inches
            String unit);

    List<Widget> /* keep: plain */ findByName(String name);
}
// keep: trailer
"#;
        let unit = parse(source);
        let printed = print_unit(&unit);
        for comment in [
            "// license",
            "// collections",
            "// keep: legacy finder",
            "/* keep: css name */",
            "// keep: inches",
            "/* keep: plain */",
            "// keep: trailer",
        ] {
            assert_eq!(printed.matches(comment).count(), 1, "{} in\n{}", comment, printed);
        }
        assert!(printed.find("// collections") > printed.find("package com.acme.repo;"));
        assert!(printed.contains("    List<Widget> findBySize(\n            int size, // keep: inches\n            String unit\n    );"));
        assert!(printed.contains("    List<Widget> /* keep: plain */ findByName(String name);"));
        assert!(printed.ends_with("}\n\n// keep: trailer\n"));

        assert_eq!(parse(&printed), unit);
        assert_eq!(print_unit(&parse(&printed)), printed);
    }

    #[test]
    fn test_print_uses_simple_names_for_imports() {
        let mut unit = CompilationUnit::new(Some("com.acme".to_string()));
        unit.imports.push(Import::single("jakarta.ws.rs.Path"));
        let path = Annotation::single("jakarta.ws.rs.Path", AnnotationValue::Str("widgets".into()));
        let get = Annotation::marker("jakarta.ws.rs.GET");
        assert_eq!(render_annotation(&unit, &path, 0), "@Path(\"widgets\")");
        assert_eq!(render_annotation(&unit, &get, 0), "@jakarta.ws.rs.GET");
    }

    #[test]
    fn test_long_annotations_break_lines() {
        let unit = CompilationUnit::new(None);
        let operation = Annotation::named(
            "Operation",
            vec![
                ("summary".to_string(), AnnotationValue::Str("A fairly long summary".into())),
                (
                    "description".to_string(),
                    AnnotationValue::Str("An even longer description that pushes the width".into()),
                ),
            ],
        );
        let rendered = render_annotation(&unit, &operation, 4);
        assert_eq!(
            rendered,
            "@Operation(\n        summary = \"A fairly long summary\",\n        description = \"An even longer description that pushes the width\"\n    )"
        );
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("a \"b\"\n"), "\"a \\\"b\\\"\\n\"");
        assert_eq!(quote("a\u{8}b\u{0}c\u{c}"), r#""a\bb\u0000c\f""#);
    }

    #[test]
    fn test_user_string_escapes_keep_their_value() {
        let source = r#"interface WidgetRepository {
    @Query("a\bb\0c\s\101")
    List<Widget> findByColor(String color);
}
"#;
        let unit = parse(source);
        let printed = print_unit(&unit);
        assert!(printed.contains(r#"@Query("a\bb\u0000c A")"#));
        assert_eq!(parse(&printed), unit);
    }
}
