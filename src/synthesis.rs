//! @ai:module:intent Build the annotation trees attached to exported operations
//! @ai:module:layer domain
//! @ai:module:public_api Synthesizer, Verb, Binding, SchemaRef, Response, schema_for_return, humanize, collection_path, localize_type, import_annotation
//! @ai:module:depends_on ast, config
//! @ai:module:stateless true

use crate::ast::{Annotation, AnnotationValue, CompilationUnit, TypeRef};
use crate::config::EnrichConfig;
use serde::Serialize;

/// Wrappers whose single type argument is rendered as a list schema.
const LIST_WRAPPERS: &[&str] = &[
    "List", "Iterable", "Collection", "Set", "Page", "Slice", "Stream",
];

/// @ai:intent HTTP verb of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

/// @ai:intent Where a parameter is bound in the request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Path,
    Query,
}

/// @ai:intent Schema reference of a body: one entity or a list of them
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaRef {
    Single(TypeRef),
    List(TypeRef),
}

/// @ai:intent One declared response of an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub code: u16,
    pub description: &'static str,
    pub schema: Option<SchemaRef>,
}

impl Response {
    pub fn ok(schema: Option<SchemaRef>) -> Self {
        Self {
            code: 200,
            description: "OK",
            schema,
        }
    }

    pub fn created(schema: SchemaRef) -> Self {
        Self {
            code: 201,
            description: "Created",
            schema: Some(schema),
        }
    }

    pub fn no_content() -> Self {
        Self {
            code: 204,
            description: "No Content",
            schema: None,
        }
    }

    pub fn not_found() -> Self {
        Self {
            code: 404,
            description: "Not Found",
            schema: None,
        }
    }

    /// @ai:intent Response for a method's declared return shape; void means no content
    pub fn for_return(ty: &TypeRef) -> Self {
        match schema_for_return(ty) {
            Some(schema) => Self::ok(Some(schema)),
            None => Self::no_content(),
        }
    }
}

fn raw(ty: &TypeRef) -> TypeRef {
    TypeRef::simple(ty.name.clone())
}

/// @ai:intent Derive the response schema of a declared return type
/// @ai:example (Optional<Widget>) -> Single(Widget); (List<Widget>) -> List(Widget); (void) -> None
/// @ai:effects pure
pub fn schema_for_return(ty: &TypeRef) -> Option<SchemaRef> {
    if ty.is_void() || ty.name == "Void" || ty.name == "java.lang.Void" {
        return None;
    }
    if ty.dims > 0 {
        return Some(SchemaRef::List(raw(ty)));
    }
    let element = || ty.args.first().map(raw).unwrap_or_else(|| TypeRef::simple("Object"));
    match ty.simple_name() {
        "Optional" => Some(SchemaRef::Single(element())),
        name if LIST_WRAPPERS.contains(&name) => Some(SchemaRef::List(element())),
        _ => Some(SchemaRef::Single(raw(ty))),
    }
}

/// @ai:intent Turn a method name into a sentence
/// @ai:example ("findByColorAndSize") -> "Find by color and size"
/// @ai:effects pure
pub fn humanize(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        let boundary = i > 0
            && c.is_uppercase()
            && (chars[i - 1].is_lowercase()
                || chars[i - 1].is_ascii_digit()
                || chars.get(i + 1).is_some_and(|n| n.is_lowercase()) && chars[i - 1].is_uppercase());
        if boundary && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }

    let sentence = words
        .iter()
        .map(|w| {
            if w.chars().all(|c| c.is_uppercase()) && w.len() > 1 {
                w.clone()
            } else {
                w.to_lowercase()
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    capitalize(&sentence)
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// @ai:intent Default collection path of a domain type
/// @ai:example ("Category") -> "categories"; ("Box") -> "boxes"
/// @ai:effects pure
pub fn collection_path(domain_simple_name: &str) -> String {
    let mut chars = domain_simple_name.chars();
    let name: String = match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => return String::new(),
    };

    let consonant_y = name.ends_with('y')
        && !name
            .chars()
            .rev()
            .nth(1)
            .is_some_and(|c| "aeiou".contains(c));
    if consonant_y {
        format!("{}ies", &name[..name.len() - 1])
    } else if ["s", "x", "z", "ch", "sh"].iter().any(|s| name.ends_with(s)) {
        format!("{}es", name)
    } else {
        format!("{}s", name)
    }
}

/// @ai:intent Write a type by simple names, importing what it references
/// @ai:post names that clash with an existing import stay qualified
pub fn localize_type(unit: &mut CompilationUnit, ty: &TypeRef) -> TypeRef {
    let name = if ty.name.contains('.') && unit.ensure_import(&ty.name) && unit.can_use_simple_name(&ty.name) {
        crate::ast::simple_name_of(&ty.name).to_string()
    } else {
        ty.name.clone()
    };
    TypeRef {
        name,
        args: ty.args.iter().map(|a| localize_type(unit, a)).collect(),
        dims: ty.dims,
    }
}

/// @ai:intent Import every qualified class an annotation tree mentions
pub fn import_annotation(unit: &mut CompilationUnit, annotation: &Annotation) {
    for name in annotation.referenced_names() {
        if name.contains('.') {
            unit.ensure_import(&name);
        }
    }
}

fn pair(key: &str, value: AnnotationValue) -> (String, AnnotationValue) {
    (key.to_string(), value)
}

fn text(value: &str) -> AnnotationValue {
    AnnotationValue::Str(value.to_string())
}

/// @ai:intent Annotation builders over the configured catalog
#[derive(Debug, Clone, Copy)]
pub struct Synthesizer<'c> {
    config: &'c EnrichConfig,
}

impl<'c> Synthesizer<'c> {
    pub fn new(config: &'c EnrichConfig) -> Self {
        Self { config }
    }

    pub fn verb_class(&self, verb: Verb) -> &'c str {
        let catalog = &self.config.annotations;
        match verb {
            Verb::Get => &catalog.get,
            Verb::Post => &catalog.post,
            Verb::Put => &catalog.put,
            Verb::Patch => &catalog.patch,
            Verb::Delete => &catalog.delete,
        }
    }

    pub fn verb(&self, verb: Verb) -> Annotation {
        Annotation::marker(self.verb_class(verb))
    }

    pub fn path(&self, path: &str) -> Annotation {
        Annotation::single(&self.config.annotations.path, text(path))
    }

    /// @ai:intent `@PathParam("id")` or `@QueryParam("color")`
    pub fn binding(&self, binding: Binding, name: &str) -> Annotation {
        let class = match binding {
            Binding::Path => &self.config.annotations.path_param,
            Binding::Query => &self.config.annotations.query_param,
        };
        Annotation::single(class, text(name))
    }

    /// @ai:intent Parameter metadata carrying the required flag and description
    pub fn parameter(&self, required: bool, description: Option<&str>) -> Annotation {
        let mut pairs = vec![pair("required", AnnotationValue::Bool(required))];
        if let Some(description) = description {
            pairs.push(pair("description", text(description)));
        }
        Annotation::named(&self.config.annotations.parameter, pairs)
    }

    fn schema(&self, ty: &TypeRef) -> AnnotationValue {
        AnnotationValue::Annotation(Box::new(Annotation::named(
            &self.config.annotations.schema,
            vec![pair("implementation", AnnotationValue::Class(raw(ty)))],
        )))
    }

    /// @ai:intent One content entry per configured media type, in configured order
    /// @ai:example (Single(Widget)) -> {@Content(mediaType = "application/json", schema = @Schema(implementation = Widget.class)), ...}
    /// @ai:effects pure
    pub fn content(&self, schema: &SchemaRef) -> AnnotationValue {
        let (key, value) = match schema {
            SchemaRef::Single(ty) => ("schema", self.schema(ty)),
            SchemaRef::List(ty) => (
                "array",
                AnnotationValue::Annotation(Box::new(Annotation::named(
                    &self.config.annotations.array_schema,
                    vec![pair("schema", self.schema(ty))],
                ))),
            ),
        };
        AnnotationValue::Array(
            self.config
                .policy
                .media_types
                .iter()
                .map(|media| {
                    AnnotationValue::Annotation(Box::new(Annotation::named(
                        &self.config.annotations.content,
                        vec![pair("mediaType", text(media)), pair(key, value.clone())],
                    )))
                })
                .collect(),
        )
    }

    pub fn response(&self, response: &Response) -> AnnotationValue {
        let mut pairs = vec![
            pair("responseCode", text(&response.code.to_string())),
            pair("description", text(response.description)),
        ];
        if let Some(schema) = &response.schema {
            pairs.push(pair("content", self.content(schema)));
        }
        AnnotationValue::Annotation(Box::new(Annotation::named(
            &self.config.annotations.api_response,
            pairs,
        )))
    }

    /// @ai:intent Required request body referencing the domain type
    pub fn request_body(&self, domain: &TypeRef) -> AnnotationValue {
        AnnotationValue::Annotation(Box::new(Annotation::named(
            &self.config.annotations.request_body,
            vec![
                pair("required", AnnotationValue::Bool(true)),
                pair("content", self.content(&SchemaRef::Single(domain.clone()))),
            ],
        )))
    }

    /// @ai:intent Operation metadata: summary, description, request body, responses
    /// @ai:effects pure
    pub fn operation(
        &self,
        summary: &str,
        description: Option<&str>,
        request_body: Option<&TypeRef>,
        responses: &[Response],
    ) -> Annotation {
        let mut pairs = vec![pair("summary", text(summary))];
        if let Some(description) = description {
            pairs.push(pair("description", text(description)));
        }
        if let Some(domain) = request_body {
            pairs.push(pair("requestBody", self.request_body(domain)));
        }
        pairs.push(pair(
            "responses",
            AnnotationValue::Array(responses.iter().map(|r| self.response(r)).collect()),
        ));
        Annotation::named(&self.config.annotations.operation, pairs)
    }

    /// @ai:intent Classes stripped from a method by every remove phase
    pub fn method_classes(&self) -> Vec<&'c str> {
        let catalog = &self.config.annotations;
        let mut classes: Vec<&str> = catalog.verbs().to_vec();
        classes.push(&catalog.path);
        classes.push(&catalog.operation);
        classes
    }

    /// @ai:intent Classes stripped from parameters by every remove phase
    pub fn parameter_classes(&self) -> [&'c str; 3] {
        let catalog = &self.config.annotations;
        [&catalog.path_param, &catalog.query_param, &catalog.parameter]
    }
}
