//! @ai:module:intent Define the declaration graph parsed from Java sources
//! @ai:module:layer domain
//! @ai:module:public_api CompilationUnit, TypeDeclaration, MethodDeclaration, Parameter, Annotation, AnnotationArgs, AnnotationValue, TypeRef, Import, Member, TypeKind
//! @ai:module:stateless true

use serde::Serialize;
use std::path::PathBuf;

/// Simple names that never need an import.
const IMPLICIT_PACKAGES: &[&str] = &["java.lang"];

/// @ai:intent A possibly generic type reference as written in source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeRef {
    pub name: String,
    pub args: Vec<TypeRef>,
    pub dims: usize,
}

impl TypeRef {
    /// @ai:intent Create a non-generic type reference
    pub fn simple(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            dims: 0,
        }
    }

    /// @ai:intent Create a generic type reference
    pub fn generic(name: impl Into<String>, args: Vec<TypeRef>) -> Self {
        Self {
            name: name.into(),
            args,
            dims: 0,
        }
    }

    /// @ai:intent Last segment of the (possibly qualified) name
    /// @ai:example (java.util.Optional) -> "Optional"
    /// @ai:effects pure
    pub fn simple_name(&self) -> &str {
        simple_name_of(&self.name)
    }

    pub fn is_void(&self) -> bool {
        self.name == "void" && self.dims == 0
    }

    /// @ai:intent Render as Java source text
    /// @ai:effects pure
    pub fn render(&self) -> String {
        let mut out = self.name.clone();
        if !self.args.is_empty() {
            let args: Vec<String> = self.args.iter().map(TypeRef::render).collect();
            out.push('<');
            out.push_str(&args.join(", "));
            out.push('>');
        }
        for _ in 0..self.dims {
            out.push_str("[]");
        }
        out
    }

    /// @ai:intent Collect every type name mentioned by this reference, arguments included
    pub fn names(&self) -> Vec<&str> {
        let mut names = vec![self.name.as_str()];
        for arg in &self.args {
            names.extend(arg.names());
        }
        names
    }
}

/// @ai:intent Last dot-separated segment of a name
/// @ai:effects pure
pub fn simple_name_of(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

/// @ai:intent Check whether a written name denotes a qualified name
/// @ai:effects pure
pub fn names_match(written: &str, qualified: &str) -> bool {
    if written == qualified {
        return true;
    }
    if !written.contains('.') || !qualified.contains('.') {
        return simple_name_of(written) == simple_name_of(qualified);
    }
    false
}

/// @ai:intent A single import entry of a compilation unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Import {
    pub path: String,
    pub is_static: bool,
    pub is_wildcard: bool,
    /// Comments written on the lines above this import.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<String>,
}

impl Import {
    pub fn single(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_static: false,
            is_wildcard: false,
            comments: Vec::new(),
        }
    }

    /// @ai:intent Simple name this import binds; wildcards bind nothing
    pub fn simple_name(&self) -> Option<&str> {
        if self.is_wildcard || self.is_static {
            None
        } else {
            Some(simple_name_of(&self.path))
        }
    }
}

/// @ai:intent A value appearing inside annotation arguments
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AnnotationValue {
    Str(String),
    Bool(bool),
    Int(i64),
    Class(TypeRef),
    /// Any other expression kept as written (enum constants, arithmetic, text blocks).
    Expr(String),
    Annotation(Box<Annotation>),
    Array(Vec<AnnotationValue>),
}

impl AnnotationValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AnnotationValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AnnotationValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// @ai:intent Argument list shape of an annotation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationArgs {
    Marker,
    Single(AnnotationValue),
    Named(Vec<(String, AnnotationValue)>),
}

/// @ai:intent An annotation node attached to a declaration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    pub name: String,
    pub args: AnnotationArgs,
}

impl Annotation {
    pub fn marker(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: AnnotationArgs::Marker,
        }
    }

    pub fn single(name: impl Into<String>, value: AnnotationValue) -> Self {
        Self {
            name: name.into(),
            args: AnnotationArgs::Single(value),
        }
    }

    pub fn named(name: impl Into<String>, pairs: Vec<(String, AnnotationValue)>) -> Self {
        Self {
            name: name.into(),
            args: AnnotationArgs::Named(pairs),
        }
    }

    /// @ai:intent Check annotation class identity against a configured name
    /// @ai:effects pure
    pub fn is(&self, class_name: &str) -> bool {
        names_match(&self.name, class_name)
    }

    /// @ai:intent Look up a named argument; `value` also answers a single positional argument
    pub fn arg(&self, key: &str) -> Option<&AnnotationValue> {
        match &self.args {
            AnnotationArgs::Marker => None,
            AnnotationArgs::Single(value) => (key == "value").then_some(value),
            AnnotationArgs::Named(pairs) => pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v),
        }
    }

    /// @ai:intent Collect annotation and class names referenced anywhere in this tree
    pub fn referenced_names(&self) -> Vec<String> {
        let mut names = vec![self.name.clone()];
        match &self.args {
            AnnotationArgs::Marker => {}
            AnnotationArgs::Single(value) => collect_value_names(value, &mut names),
            AnnotationArgs::Named(pairs) => {
                for (_, value) in pairs {
                    collect_value_names(value, &mut names);
                }
            }
        }
        names
    }
}

fn collect_value_names(value: &AnnotationValue, names: &mut Vec<String>) {
    match value {
        AnnotationValue::Class(ty) => names.push(ty.name.clone()),
        AnnotationValue::Annotation(inner) => names.extend(inner.referenced_names()),
        AnnotationValue::Array(items) => {
            for item in items {
                collect_value_names(item, names);
            }
        }
        _ => {}
    }
}

/// @ai:intent Add an annotation unless one of the same class is already attached
/// @ai:post at most one annotation per class name is added
/// @ai:effects pure
pub fn add_if_absent(list: &mut Vec<Annotation>, annotation: Annotation) -> bool {
    if list.iter().any(|a| a.is(&annotation.name)) {
        return false;
    }
    list.push(annotation);
    true
}

/// @ai:intent Drop every annotation of the given classes
/// @ai:effects pure
pub fn remove_all(list: &mut Vec<Annotation>, class_names: &[&str]) -> bool {
    let before = list.len();
    list.retain(|a| !class_names.iter().any(|name| a.is(name)));
    list.len() != before
}

/// @ai:intent A formal parameter of a method
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub name: String,
    pub ty: TypeRef,
    pub annotations: Vec<Annotation>,
    pub modifiers: Vec<String>,
    pub varargs: bool,
    /// Comments written anywhere inside or right after the parameter.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<String>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            annotations: Vec::new(),
            modifiers: Vec::new(),
            varargs: false,
            comments: Vec::new(),
        }
    }
}

/// @ai:intent A method declared on a class or interface
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodDeclaration {
    pub name: String,
    pub modifiers: Vec<String>,
    /// Type parameters as written, bounds included (`S extends T`).
    pub type_parameters: Vec<String>,
    pub return_type: TypeRef,
    pub parameters: Vec<Parameter>,
    pub throws: Vec<TypeRef>,
    pub annotations: Vec<Annotation>,
    /// Raw `/** ... */` text.
    pub doc: Option<String>,
    /// Raw block text including braces; `None` for abstract declarations.
    pub body: Option<String>,
    /// Non-doc comments inside the declaration header (modifiers, types, throws).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<String>,
}

impl MethodDeclaration {
    pub fn new(name: impl Into<String>, return_type: TypeRef, parameters: Vec<Parameter>) -> Self {
        Self {
            name: name.into(),
            modifiers: Vec::new(),
            type_parameters: Vec::new(),
            return_type,
            parameters,
            throws: Vec::new(),
            annotations: Vec::new(),
            doc: None,
            body: None,
            comments: Vec::new(),
        }
    }

    pub fn has_annotation(&self, class_name: &str) -> bool {
        self.annotations.iter().any(|a| a.is(class_name))
    }

    pub fn annotation(&self, class_name: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.is(class_name))
    }

    /// @ai:intent Names of the method's own type variables, bounds dropped
    pub fn type_variables(&self) -> Vec<&str> {
        self.type_parameters
            .iter()
            .filter_map(|p| p.split_whitespace().next())
            .collect()
    }

    /// @ai:intent Parameter type names in declaration order
    pub fn parameter_types(&self) -> Vec<&str> {
        self.parameters.iter().map(|p| p.ty.simple_name()).collect()
    }

    /// @ai:intent Check that no annotation, doc or comment of a user's remains on the signature
    /// @ai:post comments equal to `allowed` do not count; the body is not inspected
    pub fn is_bare(&self, allowed: &[&str]) -> bool {
        self.annotations.is_empty()
            && self.doc.is_none()
            && self.comments.iter().all(|c| allowed.contains(&c.as_str()))
            && self
                .parameters
                .iter()
                .all(|p| p.annotations.is_empty() && p.comments.is_empty())
    }
}

/// @ai:intent A member of a type body in source order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Member {
    Method(MethodDeclaration),
    /// Fields, constructors, nested types and free comments, kept as written.
    Verbatim(String),
}

/// @ai:intent Kind of a top-level type declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    Class,
    Interface,
    /// Enums, records and annotation types; printed verbatim.
    Opaque,
}

/// @ai:intent A class or interface declaration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeDeclaration {
    pub kind: TypeKind,
    pub name: String,
    pub modifiers: Vec<String>,
    pub type_parameters: Vec<String>,
    /// Raw `<...>` text for re-printing bounds.
    pub type_parameters_source: Option<String>,
    /// Superclass of a class.
    pub superclass: Option<TypeRef>,
    /// Extended interfaces of an interface, implemented interfaces of a class.
    pub extends: Vec<TypeRef>,
    pub members: Vec<Member>,
    pub annotations: Vec<Annotation>,
    pub doc: Option<String>,
    /// Full text of an opaque declaration.
    pub source: Option<String>,
    /// Comments on the lines above the declaration, ahead of its doc comment.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub leading: Vec<String>,
    /// Non-doc comments inside the declaration header.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<String>,
}

impl TypeDeclaration {
    /// @ai:intent Create an empty interface declaration
    pub fn interface(name: impl Into<String>) -> Self {
        Self {
            kind: TypeKind::Interface,
            name: name.into(),
            modifiers: vec!["public".to_string()],
            type_parameters: Vec::new(),
            type_parameters_source: None,
            superclass: None,
            extends: Vec::new(),
            members: Vec::new(),
            annotations: Vec::new(),
            doc: None,
            source: None,
            leading: Vec::new(),
            comments: Vec::new(),
        }
    }

    /// @ai:intent Every supertype edge in declaration order
    pub fn supertypes(&self) -> Vec<&TypeRef> {
        self.superclass.iter().chain(self.extends.iter()).collect()
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodDeclaration> {
        self.members.iter().filter_map(|m| match m {
            Member::Method(method) => Some(method),
            Member::Verbatim(_) => None,
        })
    }

    pub fn methods_mut(&mut self) -> impl Iterator<Item = &mut MethodDeclaration> {
        self.members.iter_mut().filter_map(|m| match m {
            Member::Method(method) => Some(method),
            Member::Verbatim(_) => None,
        })
    }

    /// @ai:intent Find the member index of the first method satisfying a predicate
    pub fn position_of(&self, pred: impl Fn(&MethodDeclaration) -> bool) -> Option<usize> {
        self.members.iter().position(|m| match m {
            Member::Method(method) => pred(method),
            Member::Verbatim(_) => false,
        })
    }

    pub fn method_at(&self, index: usize) -> Option<&MethodDeclaration> {
        match self.members.get(index) {
            Some(Member::Method(method)) => Some(method),
            _ => None,
        }
    }

    pub fn method_at_mut(&mut self, index: usize) -> Option<&mut MethodDeclaration> {
        match self.members.get_mut(index) {
            Some(Member::Method(method)) => Some(method),
            _ => None,
        }
    }

    /// @ai:intent Append a method and return its member index
    pub fn push_method(&mut self, method: MethodDeclaration) -> usize {
        self.members.push(Member::Method(method));
        self.members.len() - 1
    }

    pub fn annotation(&self, class_name: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.is(class_name))
    }

    pub fn is_type_parameter(&self, name: &str) -> bool {
        self.type_parameters.iter().any(|p| p == name)
    }
}

/// @ai:intent One parsed Java source file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompilationUnit {
    /// File the unit was parsed from; the only place it may be written back to.
    pub path: Option<PathBuf>,
    /// Comments ahead of the package declaration (license headers).
    pub header: Vec<String>,
    pub package: Option<String>,
    pub imports: Vec<Import>,
    pub types: Vec<TypeDeclaration>,
    /// Comments after the last type declaration.
    pub trailer: Vec<String>,
}

impl CompilationUnit {
    pub fn new(package: Option<String>) -> Self {
        Self {
            path: None,
            header: Vec::new(),
            package,
            imports: Vec::new(),
            types: Vec::new(),
            trailer: Vec::new(),
        }
    }

    /// @ai:intent Pick the public type named after the file, falling back to the first type
    /// @ai:effects pure
    pub fn root_type_index(&self) -> Option<usize> {
        let stem = self
            .path
            .as_ref()
            .and_then(|p| p.file_stem())
            .and_then(|s| s.to_str());
        stem.and_then(|stem| self.types.iter().position(|t| t.name == stem))
            .or_else(|| (!self.types.is_empty()).then_some(0))
    }

    /// @ai:intent Qualified name of a type declared in this unit
    pub fn qualified_name_of(&self, simple: &str) -> String {
        match &self.package {
            Some(pkg) if !pkg.is_empty() => format!("{}.{}", pkg, simple),
            _ => simple.to_string(),
        }
    }

    /// @ai:intent Find the explicit single-type import binding a simple name
    pub fn import_for(&self, simple: &str) -> Option<&str> {
        self.imports
            .iter()
            .find(|i| i.simple_name() == Some(simple))
            .map(|i| i.path.as_str())
    }

    /// @ai:intent Check whether a qualified name can be written by its simple name here
    /// @ai:effects pure
    pub fn can_use_simple_name(&self, qualified: &str) -> bool {
        if !qualified.contains('.') {
            return true;
        }
        let simple = simple_name_of(qualified);
        if let Some(bound) = self.import_for(simple) {
            return bound == qualified;
        }
        let package = qualified.rsplit_once('.').map(|(pkg, _)| pkg).unwrap_or("");
        IMPLICIT_PACKAGES.contains(&package) || self.package.as_deref() == Some(package)
    }

    /// @ai:intent Import a qualified name unless it is implicit, local, or already bound
    /// @ai:post returns false when the simple name is bound to a different class
    /// @ai:effects pure
    pub fn ensure_import(&mut self, qualified: &str) -> bool {
        if self.can_use_simple_name(qualified) {
            return true;
        }
        if self.import_for(simple_name_of(qualified)).is_some() {
            return false;
        }
        self.imports.push(Import::single(qualified));
        true
    }

    /// @ai:intent Every annotation name referenced anywhere in this unit
    pub fn referenced_annotation_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for decl in &self.types {
            for annotation in &decl.annotations {
                names.extend(annotation.referenced_names());
            }
            for method in decl.methods() {
                for annotation in &method.annotations {
                    names.extend(annotation.referenced_names());
                }
                for param in &method.parameters {
                    for annotation in &param.annotations {
                        names.extend(annotation.referenced_names());
                    }
                }
            }
        }
        names
    }

    /// @ai:intent Every type name used by annotations, signatures and supertypes
    pub fn referenced_names(&self) -> Vec<String> {
        let mut names = self.referenced_annotation_names();
        for decl in &self.types {
            for ty in decl.supertypes() {
                names.extend(ty.names().into_iter().map(str::to_string));
            }
            for method in decl.methods() {
                let types = std::iter::once(&method.return_type)
                    .chain(method.parameters.iter().map(|p| &p.ty))
                    .chain(method.throws.iter());
                for ty in types {
                    names.extend(ty.names().into_iter().map(str::to_string));
                }
            }
        }
        names
    }

    /// @ai:intent Check free text (bodies, verbatim members) for a simple name
    fn mentions_in_text(&self, simple: &str) -> bool {
        let mentions = |text: &str| {
            text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
                .any(|word| word == simple)
        };
        self.types.iter().any(|decl| {
            decl.source.as_deref().is_some_and(mentions)
                || decl.members.iter().any(|member| match member {
                    Member::Method(method) => method.body.as_deref().is_some_and(mentions),
                    Member::Verbatim(text) => mentions(text),
                })
        })
    }

    /// @ai:intent Drop imports of the given classes once nothing references them
    /// @ai:effects pure
    pub fn prune_imports(&mut self, candidates: &[&str]) -> bool {
        let referenced = self.referenced_names();
        let unused: Vec<String> = self
            .imports
            .iter()
            .filter(|import| !import.is_wildcard && !import.is_static)
            .filter(|import| candidates.iter().any(|c| *c == import.path))
            .filter(|import| !referenced.iter().any(|name| names_match(name, &import.path)))
            .filter(|import| !self.mentions_in_text(simple_name_of(&import.path)))
            .map(|import| import.path.clone())
            .collect();
        if unused.is_empty() {
            return false;
        }

        // Comments above a dropped import move down to whatever follows it.
        let mut carried: Vec<String> = Vec::new();
        let mut kept = Vec::with_capacity(self.imports.len());
        for mut import in std::mem::take(&mut self.imports) {
            let dropped = !import.is_wildcard && !import.is_static && unused.contains(&import.path);
            if dropped {
                carried.append(&mut import.comments);
            } else {
                if !carried.is_empty() {
                    carried.append(&mut import.comments);
                    import.comments = std::mem::take(&mut carried);
                }
                kept.push(import);
            }
        }
        self.imports = kept;
        if !carried.is_empty() {
            let target = match self.types.first_mut() {
                Some(decl) => &mut decl.leading,
                None => &mut self.trailer,
            };
            carried.append(target);
            *target = carried;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_ref_render() {
        let ty = TypeRef::generic(
            "Map",
            vec![TypeRef::simple("String"), TypeRef::generic("List", vec![TypeRef::simple("Widget")])],
        );
        assert_eq!(ty.render(), "Map<String, List<Widget>>");
        assert_eq!(TypeRef::simple("java.util.Optional").simple_name(), "Optional");
    }

    #[test]
    fn test_names_match_qualified_and_simple() {
        assert!(names_match("GET", "jakarta.ws.rs.GET"));
        assert!(names_match("jakarta.ws.rs.GET", "jakarta.ws.rs.GET"));
        assert!(!names_match("javax.ws.rs.GET", "jakarta.ws.rs.GET"));
        assert!(!names_match("POST", "jakarta.ws.rs.GET"));
    }

    #[test]
    fn test_add_if_absent_is_idempotent() {
        let mut list = vec![Annotation::marker("jakarta.ws.rs.GET")];
        assert!(!add_if_absent(&mut list, Annotation::marker("GET")));
        assert!(add_if_absent(&mut list, Annotation::marker("jakarta.ws.rs.Path")));
        assert_eq!(list.len(), 2);
        assert!(remove_all(&mut list, &["jakarta.ws.rs.GET", "jakarta.ws.rs.Path"]));
        assert!(list.is_empty());
    }

    #[test]
    fn test_ensure_and_prune_imports() {
        let mut unit = CompilationUnit::new(Some("com.acme.repo".to_string()));
        assert!(unit.ensure_import("java.lang.String"));
        assert!(unit.ensure_import("com.acme.repo.Local"));
        assert!(unit.ensure_import("jakarta.ws.rs.GET"));
        assert!(unit.ensure_import("jakarta.ws.rs.GET"));
        assert_eq!(unit.imports, vec![Import::single("jakarta.ws.rs.GET")]);

        assert!(unit.prune_imports(&["jakarta.ws.rs.GET"]));
        assert!(unit.imports.is_empty());
    }

    #[test]
    fn test_prune_keeps_comments_of_dropped_imports() {
        let mut unit = CompilationUnit::new(Some("com.acme.repo".to_string()));
        let mut get = Import::single("jakarta.ws.rs.GET");
        get.comments.push("// rest".to_string());
        let mut list = Import::single("java.util.List");
        list.comments.push("// collections".to_string());
        unit.imports = vec![get, list];
        unit.types.push(TypeDeclaration::interface("WidgetRepository"));

        assert!(unit.prune_imports(&["jakarta.ws.rs.GET", "java.util.List"]));
        assert!(unit.imports.is_empty());
        assert_eq!(unit.types[0].leading, vec!["// rest", "// collections"]);
    }

    #[test]
    fn test_annotation_arg_lookup() {
        let directive = Annotation::named(
            "RestResource",
            vec![
                ("exported".to_string(), AnnotationValue::Bool(false)),
                ("path".to_string(), AnnotationValue::Str("byColor".to_string())),
            ],
        );
        assert_eq!(directive.arg("exported").and_then(AnnotationValue::as_bool), Some(false));
        assert_eq!(directive.arg("path").and_then(AnnotationValue::as_str), Some("byColor"));

        let single = Annotation::single("Path", AnnotationValue::Str("widgets".to_string()));
        assert_eq!(single.arg("value").and_then(AnnotationValue::as_str), Some("widgets"));
    }
}
