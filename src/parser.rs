//! @ai:module:intent Parse Java source files into the declaration graph
//! @ai:module:layer infrastructure
//! @ai:module:public_api parse_file, parse_source
//! @ai:module:depends_on ast, error
//! @ai:module:stateless true

use crate::ast::{
    Annotation, AnnotationArgs, AnnotationValue, CompilationUnit, Import, Member,
    MethodDeclaration, Parameter, TypeDeclaration, TypeKind, TypeRef,
};
use crate::error::{Error, Result};
use std::path::Path;
use tree_sitter::{Node, Parser};

/// @ai:intent Parse a Java file into a compilation unit bound to its path
/// @ai:pre path points at a readable Java source file
/// @ai:post result.path == Some(path)
/// @ai:effects fs:read
pub fn parse_file(path: &Path) -> Result<CompilationUnit> {
    if !path.is_file() {
        return Err(Error::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut unit = parse_source(&content, path)?;
    unit.path = Some(path.to_path_buf());
    Ok(unit)
}

/// @ai:intent Parse Java source text; `origin` is only used in diagnostics
/// @ai:post syntax errors are rejected rather than partially modelled
/// @ai:effects pure
pub fn parse_source(source: &str, origin: &Path) -> Result<CompilationUnit> {
    let parse_error = |line: usize, message: String| Error::Parse {
        file: origin.to_path_buf(),
        line,
        message,
    };

    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_java::LANGUAGE.into())
        .map_err(|e| parse_error(0, e.to_string()))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| parse_error(0, "parser produced no syntax tree".to_string()))?;

    let root = tree.root_node();
    if root.has_error() {
        let (line, message) = match first_error(root) {
            Some(node) if node.is_missing() => (
                node.start_position().row + 1,
                format!("missing `{}`", node.kind()),
            ),
            Some(node) => (node.start_position().row + 1, "unexpected syntax".to_string()),
            None => (1, "unexpected syntax".to_string()),
        };
        return Err(parse_error(line, message));
    }

    let mut builder = UnitBuilder {
        source,
        unit: CompilationUnit::new(None),
    };
    builder.visit_program(root);
    Ok(builder.unit)
}

fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|c| c.has_error() || c.is_missing())
        .find_map(first_error)
}

fn is_comment(node: &Node) -> bool {
    matches!(node.kind(), "line_comment" | "block_comment")
}

fn is_doc_comment(text: &str) -> bool {
    text.starts_with("/**") && text != "/**/"
}

/// @ai:intent Named children without interleaved comments
fn named_children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| !is_comment(c))
        .collect()
}

fn all_children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

/// @ai:intent Strip the original indentation from every line after the first
/// @ai:example ("{\n        return x;\n    }", 4) -> "{\n    return x;\n}"
/// @ai:effects pure
pub(crate) fn dedent_tail(text: &str, column: usize) -> String {
    let mut lines = text.lines();
    let mut out = lines.next().unwrap_or_default().to_string();
    for line in lines {
        out.push('\n');
        let strip = line
            .chars()
            .take(column)
            .take_while(|c| *c == ' ' || *c == '\t')
            .count();
        out.push_str(line[strip..].trim_end());
    }
    out
}

#[derive(Default)]
struct Modifiers {
    annotations: Vec<Annotation>,
    keywords: Vec<String>,
    doc: Option<String>,
    comments: Vec<String>,
}

struct UnitBuilder<'s> {
    source: &'s str,
    unit: CompilationUnit,
}

impl<'s> UnitBuilder<'s> {
    fn text(&self, node: Node) -> &'s str {
        &self.source[node.start_byte()..node.end_byte()]
    }

    fn relative_text(&self, node: Node) -> String {
        dedent_tail(self.text(node), node.start_position().column)
    }

    /// @ai:intent Every comment nested anywhere under a node, in source order
    fn comments_within(&self, node: Node) -> Vec<String> {
        let mut found = Vec::new();
        for child in all_children(node) {
            if is_comment(&child) {
                found.push(self.relative_text(child));
            } else {
                found.extend(self.comments_within(child));
            }
        }
        found
    }

    /// Comments inside an annotation's argument tree; values kept as raw text carry their own.
    fn annotation_comments(&self, node: Node, found: &mut Vec<String>) {
        for child in all_children(node) {
            if is_comment(&child) {
                found.push(self.relative_text(child));
            } else if matches!(
                child.kind(),
                "annotation"
                    | "marker_annotation"
                    | "annotation_argument_list"
                    | "element_value_pair"
                    | "element_value_array_initializer"
            ) {
                self.annotation_comments(child, found);
            }
        }
    }

    fn visit_program(&mut self, root: Node) {
        let mut pending: Vec<String> = Vec::new();
        let mut pending_doc: Option<String> = None;

        for child in all_children(root) {
            match child.kind() {
                "line_comment" | "block_comment" => {
                    let text = self.relative_text(child);
                    if is_doc_comment(&text) {
                        pending.extend(pending_doc.replace(text));
                    } else {
                        pending.push(text);
                    }
                }
                "package_declaration" => {
                    self.unit.header.append(&mut pending);
                    self.unit.header.extend(pending_doc.take());
                    self.unit.package = named_children(child)
                        .into_iter()
                        .find(|n| matches!(n.kind(), "scoped_identifier" | "identifier"))
                        .map(|n| self.text(n).to_string());
                }
                "import_declaration" => {
                    pending.extend(pending_doc.take());
                    if let Some(mut import) = self.import(child) {
                        pending.append(&mut import.comments);
                        import.comments = std::mem::take(&mut pending);
                        self.unit.imports.push(import);
                    }
                }
                "class_declaration" | "interface_declaration" => {
                    let kind = if child.kind() == "class_declaration" {
                        TypeKind::Class
                    } else {
                        TypeKind::Interface
                    };
                    let mut decl = self.type_declaration(child, kind, pending_doc.take());
                    decl.leading = std::mem::take(&mut pending);
                    self.unit.types.push(decl);
                }
                "enum_declaration" | "record_declaration" | "annotation_type_declaration" => {
                    let mut decl = self.opaque_declaration(child, pending_doc.take());
                    decl.leading = std::mem::take(&mut pending);
                    self.unit.types.push(decl);
                }
                _ => {}
            }
        }

        pending.extend(pending_doc);
        self.unit.trailer = pending;
    }

    fn import(&self, node: Node) -> Option<Import> {
        let mut path = None;
        let mut is_static = false;
        let mut is_wildcard = false;
        let mut comments = Vec::new();

        for child in all_children(node) {
            match child.kind() {
                "static" => is_static = true,
                "asterisk" => is_wildcard = true,
                "scoped_identifier" | "identifier" => path = Some(self.text(child).to_string()),
                "line_comment" | "block_comment" => comments.push(self.relative_text(child)),
                _ => {}
            }
        }

        path.map(|path| Import {
            path,
            is_static,
            is_wildcard,
            comments,
        })
    }

    /// @ai:intent Qualify an annotation name through the unit's single-type imports
    fn qualify_annotation(&self, written: &str) -> String {
        if written.contains('.') {
            return written.to_string();
        }
        self.unit
            .import_for(written)
            .map(str::to_string)
            .unwrap_or_else(|| written.to_string())
    }

    /// Splits a `modifiers` node into annotations, keywords, an embedded doc comment and
    /// the remaining comments.
    fn modifiers(&self, node: Node) -> Modifiers {
        let mut modifiers = Modifiers::default();

        for child in all_children(node) {
            match child.kind() {
                "annotation" | "marker_annotation" => {
                    modifiers.annotations.push(self.annotation(child));
                    self.annotation_comments(child, &mut modifiers.comments);
                }
                "line_comment" | "block_comment" => {
                    let text = self.relative_text(child);
                    if is_doc_comment(&text) && modifiers.doc.is_none() {
                        modifiers.doc = Some(text);
                    } else {
                        modifiers.comments.push(text);
                    }
                }
                _ => modifiers.keywords.push(self.text(child).to_string()),
            }
        }

        modifiers
    }

    fn type_parameter_names(&self, node: Node) -> Vec<String> {
        named_children(node)
            .into_iter()
            .filter(|n| n.kind() == "type_parameter")
            .filter_map(|param| {
                named_children(param)
                    .into_iter()
                    .find(|n| matches!(n.kind(), "type_identifier" | "identifier"))
                    .map(|n| self.text(n).to_string())
            })
            .collect()
    }

    fn type_list(&self, node: Node) -> Vec<TypeRef> {
        named_children(node)
            .into_iter()
            .flat_map(|child| {
                if child.kind() == "type_list" {
                    named_children(child)
                        .into_iter()
                        .map(|t| self.type_ref(t))
                        .collect::<Vec<_>>()
                } else {
                    vec![self.type_ref(child)]
                }
            })
            .collect()
    }

    fn type_declaration(&self, node: Node, kind: TypeKind, doc: Option<String>) -> TypeDeclaration {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();

        let mut decl = TypeDeclaration {
            kind,
            name,
            modifiers: Vec::new(),
            type_parameters: Vec::new(),
            type_parameters_source: None,
            superclass: None,
            extends: Vec::new(),
            members: Vec::new(),
            annotations: Vec::new(),
            doc,
            source: None,
            leading: Vec::new(),
            comments: Vec::new(),
        };

        for child in all_children(node) {
            match child.kind() {
                "modifiers" => {
                    let modifiers = self.modifiers(child);
                    decl.annotations = modifiers.annotations;
                    decl.modifiers = modifiers.keywords;
                    if decl.doc.is_none() {
                        decl.doc = modifiers.doc;
                    } else {
                        decl.comments.extend(modifiers.doc);
                    }
                    decl.comments.extend(modifiers.comments);
                }
                "line_comment" | "block_comment" => {
                    let text = self.relative_text(child);
                    if is_doc_comment(&text) && decl.doc.is_none() {
                        decl.doc = Some(text);
                    } else {
                        decl.comments.push(text);
                    }
                }
                "type_parameters" => {
                    decl.type_parameters = self.type_parameter_names(child);
                    decl.type_parameters_source = Some(self.text(child).to_string());
                }
                "superclass" => {
                    decl.superclass = named_children(child).first().map(|t| self.type_ref(*t));
                    decl.comments.extend(self.comments_within(child));
                }
                "extends_interfaces" | "super_interfaces" => {
                    decl.extends.extend(self.type_list(child));
                    decl.comments.extend(self.comments_within(child));
                }
                "class_body" | "interface_body" => {
                    decl.members = self.members(child);
                }
                _ => decl.comments.extend(self.comments_within(child)),
            }
        }

        decl
    }

    fn opaque_declaration(&self, node: Node, doc: Option<String>) -> TypeDeclaration {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();

        TypeDeclaration {
            kind: TypeKind::Opaque,
            name,
            modifiers: Vec::new(),
            type_parameters: Vec::new(),
            type_parameters_source: None,
            superclass: None,
            extends: Vec::new(),
            members: Vec::new(),
            annotations: Vec::new(),
            doc,
            source: Some(self.relative_text(node)),
            leading: Vec::new(),
            comments: Vec::new(),
        }
    }

    fn members(&self, body: Node) -> Vec<Member> {
        let mut members = Vec::new();
        let mut pending_doc: Option<String> = None;

        for child in all_children(body) {
            match child.kind() {
                "{" | "}" | ";" => {}
                "line_comment" | "block_comment" => {
                    let text = self.relative_text(child);
                    if is_doc_comment(&text) {
                        if let Some(previous) = pending_doc.replace(text) {
                            members.push(Member::Verbatim(previous));
                        }
                    } else {
                        if let Some(previous) = pending_doc.take() {
                            members.push(Member::Verbatim(previous));
                        }
                        members.push(Member::Verbatim(text));
                    }
                }
                "method_declaration" => {
                    members.push(Member::Method(self.method(child, pending_doc.take())));
                }
                _ => {
                    let text = self.relative_text(child);
                    let text = match pending_doc.take() {
                        Some(doc) => format!("{}\n{}", doc, text),
                        None => text,
                    };
                    members.push(Member::Verbatim(text));
                }
            }
        }

        if let Some(doc) = pending_doc {
            members.push(Member::Verbatim(doc));
        }

        members
    }

    fn method(&self, node: Node, doc: Option<String>) -> MethodDeclaration {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();
        let return_type = node
            .child_by_field_name("type")
            .map(|n| self.type_ref(n))
            .unwrap_or_else(|| TypeRef::simple("void"));

        let mut method = MethodDeclaration::new(name, return_type, Vec::new());
        method.doc = doc;

        for child in all_children(node) {
            match child.kind() {
                "modifiers" => {
                    let modifiers = self.modifiers(child);
                    method.annotations = modifiers.annotations;
                    method.modifiers = modifiers.keywords;
                    if method.doc.is_none() {
                        method.doc = modifiers.doc;
                    } else {
                        method.comments.extend(modifiers.doc);
                    }
                    method.comments.extend(modifiers.comments);
                }
                "line_comment" | "block_comment" => {
                    let text = self.relative_text(child);
                    if is_doc_comment(&text) && method.doc.is_none() {
                        method.doc = Some(text);
                    } else {
                        method.comments.push(text);
                    }
                }
                "type_parameters" => {
                    for param in all_children(child) {
                        if param.kind() == "type_parameter" {
                            method.type_parameters.push(
                                self.text(param).split_whitespace().collect::<Vec<_>>().join(" "),
                            );
                        } else if is_comment(&param) {
                            method.comments.push(self.relative_text(param));
                        }
                    }
                }
                "formal_parameters" => {
                    let (parameters, unattached) = self.parameters(child);
                    method.parameters = parameters;
                    method.comments.extend(unattached);
                }
                "throws" => {
                    method.throws = self.type_list(child);
                    method.comments.extend(self.comments_within(child));
                }
                "dimensions" => {
                    method.return_type.dims += self.text(child).matches('[').count();
                }
                "block" => {
                    method.body = Some(dedent_tail(self.text(child), node.start_position().column));
                }
                _ => method.comments.extend(self.comments_within(child)),
            }
        }

        method
    }

    /// @ai:intent Parameters with their comments; a comment between parameters stays with
    /// the one before it
    /// @ai:post second element holds comments of an empty parameter list
    fn parameters(&self, node: Node) -> (Vec<Parameter>, Vec<String>) {
        let mut parameters: Vec<Parameter> = Vec::new();
        let mut before_first = Vec::new();

        for child in all_children(node) {
            let mut param = match child.kind() {
                "formal_parameter" => self.formal_parameter(child),
                "spread_parameter" => self.spread_parameter(child),
                "line_comment" | "block_comment" => {
                    let text = self.relative_text(child);
                    match parameters.last_mut() {
                        Some(previous) => previous.comments.push(text),
                        None => before_first.push(text),
                    }
                    continue;
                }
                _ => continue,
            };
            if !before_first.is_empty() {
                before_first.append(&mut param.comments);
                param.comments = std::mem::take(&mut before_first);
            }
            parameters.push(param);
        }

        (parameters, before_first)
    }

    fn formal_parameter(&self, node: Node) -> Parameter {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();
        let mut ty = node
            .child_by_field_name("type")
            .map(|n| self.type_ref(n))
            .unwrap_or_else(|| TypeRef::simple("Object"));
        if let Some(dims) = node.child_by_field_name("dimensions") {
            ty.dims += self.text(dims).matches('[').count();
        }

        let mut param = Parameter::new(name, ty);
        for child in all_children(node) {
            if child.kind() == "modifiers" {
                let modifiers = self.modifiers(child);
                param.annotations = modifiers.annotations;
                param.modifiers = modifiers.keywords;
            }
        }
        param.comments = self.comments_within(node);
        param
    }

    fn spread_parameter(&self, node: Node) -> Parameter {
        let mut param = Parameter::new(String::new(), TypeRef::simple("Object"));
        param.varargs = true;

        for child in named_children(node) {
            match child.kind() {
                "modifiers" => {
                    let modifiers = self.modifiers(child);
                    param.annotations = modifiers.annotations;
                    param.modifiers = modifiers.keywords;
                }
                "variable_declarator" => {
                    if let Some(name) = child.child_by_field_name("name") {
                        param.name = self.text(name).to_string();
                    }
                }
                _ => param.ty = self.type_ref(child),
            }
        }
        param.comments = self.comments_within(node);
        param
    }

    /// @ai:intent Convert a type node into a type reference
    /// @ai:effects pure
    fn type_ref(&self, node: Node) -> TypeRef {
        match node.kind() {
            "generic_type" => {
                let mut name = String::new();
                let mut args = Vec::new();
                for child in named_children(node) {
                    match child.kind() {
                        "type_arguments" => {
                            args = named_children(child)
                                .into_iter()
                                .map(|arg| self.type_ref(arg))
                                .collect();
                        }
                        _ if name.is_empty() => name = self.text(child).to_string(),
                        _ => {}
                    }
                }
                TypeRef::generic(name, args)
            }
            "array_type" => {
                let mut element = node
                    .child_by_field_name("element")
                    .map(|n| self.type_ref(n))
                    .unwrap_or_else(|| TypeRef::simple("Object"));
                if let Some(dims) = node.child_by_field_name("dimensions") {
                    element.dims += self.text(dims).matches('[').count();
                }
                element
            }
            "annotated_type" => named_children(node)
                .into_iter()
                .rev()
                .find(|n| !matches!(n.kind(), "annotation" | "marker_annotation"))
                .map(|n| self.type_ref(n))
                .unwrap_or_else(|| TypeRef::simple(self.text(node))),
            _ => TypeRef::simple(
                self.text(node)
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
        }
    }

    fn annotation(&self, node: Node) -> Annotation {
        let written = node
            .child_by_field_name("name")
            .map(|n| self.text(n))
            .unwrap_or_default();
        let name = self.qualify_annotation(written);

        let Some(arguments) = node.child_by_field_name("arguments") else {
            return Annotation::marker(name);
        };

        let values = named_children(arguments);
        let args = if values.is_empty() {
            AnnotationArgs::Marker
        } else if values.iter().all(|v| v.kind() == "element_value_pair") {
            AnnotationArgs::Named(
                values
                    .into_iter()
                    .filter_map(|pair| {
                        let key = pair.child_by_field_name("key")?;
                        let value = pair.child_by_field_name("value")?;
                        Some((self.text(key).to_string(), self.value(value)))
                    })
                    .collect(),
            )
        } else {
            AnnotationArgs::Single(self.value(values[0]))
        };

        Annotation { name, args }
    }

    fn value(&self, node: Node) -> AnnotationValue {
        let text = self.text(node);
        match node.kind() {
            "string_literal" if !text.starts_with("\"\"\"") => {
                AnnotationValue::Str(unescape(&text[1..text.len().saturating_sub(1).max(1)]))
            }
            "true" => AnnotationValue::Bool(true),
            "false" => AnnotationValue::Bool(false),
            "decimal_integer_literal" => text
                .parse::<i64>()
                .map(AnnotationValue::Int)
                .unwrap_or_else(|_| AnnotationValue::Expr(text.to_string())),
            "class_literal" => named_children(node)
                .first()
                .map(|ty| AnnotationValue::Class(self.type_ref(*ty)))
                .unwrap_or_else(|| AnnotationValue::Expr(text.to_string())),
            "element_value_array_initializer" => AnnotationValue::Array(
                named_children(node)
                    .into_iter()
                    .map(|item| self.value(item))
                    .collect(),
            ),
            "annotation" | "marker_annotation" => {
                AnnotationValue::Annotation(Box::new(self.annotation(node)))
            }
            _ => AnnotationValue::Expr(text.to_string()),
        }
    }
}

/// @ai:intent Decode Java string escapes, octal and unicode forms included
/// @ai:example ("a\\\"b") -> "a\"b"
/// @ai:effects pure
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('s') => out.push(' '),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('\\') => out.push('\\'),
            Some(first @ '0'..='7') => {
                // Three digits only when the first is 0-3; the value never exceeds \377.
                let limit = if first <= '3' { 3 } else { 2 };
                let mut value = first.to_digit(8).unwrap_or_default();
                for _ in 1..limit {
                    match chars.peek().and_then(|d| d.to_digit(8)) {
                        Some(digit) => {
                            value = value * 8 + digit;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.extend(char::from_u32(value));
            }
            Some('u') => {
                while chars.peek() == Some(&'u') {
                    chars.next();
                }
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
