//! @ai:module:intent Closed set of operation kinds with add and remove phases
//! @ai:module:layer application
//! @ai:module:public_api Operation, ByIdKind, SearchKind, UpdateKind, Phase, Outcome, RepositoryContext, Preparation, Workspace, Companion, finish_remove, ALL
//! @ai:module:depends_on ast, config, resolver, matcher, policy, synthesis, javadoc
//! @ai:module:stateless false

mod bulk;
mod by_id;
mod create;
mod passthrough;
mod search;
mod update;

use crate::ast::{
    add_if_absent, remove_all, Annotation, CompilationUnit, MethodDeclaration, TypeDeclaration,
    TypeKind, TypeRef,
};
use crate::config::EnrichConfig;
use crate::error::Result;
use crate::javadoc::{extract_description, extract_summary, DocComment};
use crate::matcher::{FoundMethod, Matcher};
use crate::parser::parse_file;
use crate::policy::ResourceConfig;
use crate::resolver::{Classification, Resolver};
use crate::synthesis::{collection_path, import_annotation, localize_type, Binding, Synthesizer};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Wrapper introduced by synthesized fetch-by-id declarations.
const OPTIONAL: &str = "java.util.Optional";

/// @ai:intent Which half of the two-phase contract runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Add,
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ByIdKind {
    Fetch,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchKind {
    Finder,
    Remover,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    Put,
    Patch,
}

/// @ai:intent One operation kind of the repository catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    ById(ByIdKind),
    Create,
    BulkFind,
    Search(SearchKind),
    Update(UpdateKind),
    Passthrough,
}

/// Every operation kind in application order.
pub const ALL: [Operation; 9] = [
    Operation::ById(ByIdKind::Fetch),
    Operation::ById(ByIdKind::Delete),
    Operation::Create,
    Operation::BulkFind,
    Operation::Search(SearchKind::Finder),
    Operation::Search(SearchKind::Remover),
    Operation::Update(UpdateKind::Put),
    Operation::Update(UpdateKind::Patch),
    Operation::Passthrough,
];

/// @ai:intent Result of running one operation kind against one repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Applied,
    Removed,
    Unchanged,
    /// Found, but a directive or hidden marker keeps it out of the API.
    NotExported,
    /// Nothing to host the operation was found or could be synthesized.
    NotApplicable,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Operation::ById(ByIdKind::Fetch) => "fetch-by-id",
            Operation::ById(ByIdKind::Delete) => "delete-by-id",
            Operation::Create => "create",
            Operation::BulkFind => "bulk-find",
            Operation::Search(SearchKind::Finder) => "custom-finder",
            Operation::Search(SearchKind::Remover) => "custom-remove",
            Operation::Update(UpdateKind::Put) => "update",
            Operation::Update(UpdateKind::Patch) => "patch",
            Operation::Passthrough => "passthrough",
        };
        f.write_str(label)
    }
}

impl Operation {
    /// @ai:intent Run one phase of this operation kind
    /// @ai:effects fs:read
    pub fn apply(self, ctx: &RepositoryContext<'_>, ws: &mut Workspace, phase: Phase) -> Result<Outcome> {
        let outcome = match self {
            Operation::ById(kind) => by_id::apply(kind, ctx, ws, phase),
            Operation::Create => create::apply(ctx, ws, phase),
            Operation::BulkFind => bulk::apply(ctx, ws, phase),
            Operation::Search(kind) => search::apply(kind, ctx, ws, phase),
            Operation::Update(kind) => update::apply(kind, ctx, ws, phase),
            Operation::Passthrough => passthrough::apply(ctx, ws, phase),
        }?;
        debug!(operation = %self, ?phase, ?outcome, "operation finished");
        Ok(outcome)
    }
}

/// @ai:intent Per-repository facts shared by every operation kind
pub struct RepositoryContext<'c> {
    pub config: &'c EnrichConfig,
    pub resolver: Resolver<'c>,
    pub matcher: Matcher<'c>,
    pub synth: Synthesizer<'c>,
    pub classification: Classification,
    /// Qualified where resolvable.
    pub domain: TypeRef,
    pub id: Option<TypeRef>,
    pub collection_path: String,
    pub repo_annotation_required: bool,
    pub finder: Regex,
    pub remover: Regex,
}

/// @ai:intent Why a file was or was not handed to the operations
pub enum Preparation<'c> {
    Ready(Box<RepositoryContext<'c>>),
    NotRepository,
    NotExported,
    NoDomain,
}

impl<'c> RepositoryContext<'c> {
    /// @ai:intent Classify a root type and gather the facts every operation needs
    /// @ai:pre root indexes a declaration of unit
    /// @ai:post configuration errors abort only this repository
    /// @ai:effects fs:read
    pub fn prepare(config: &'c EnrichConfig, unit: &CompilationUnit, root: usize) -> Result<Preparation<'c>> {
        let resolver = Resolver::new(config);
        let matcher = Matcher::new(resolver);
        let decl = &unit.types[root];

        if decl.kind != TypeKind::Interface {
            return Ok(Preparation::NotRepository);
        }
        let classification = resolver.classify(decl, unit)?;
        if !classification.is_repository() {
            return Ok(Preparation::NotRepository);
        }

        let type_directive = matcher.find_type_directive(decl, unit)?;
        let type_config = ResourceConfig::resolve(type_directive.as_ref(), false);
        if !type_config.exported {
            return Ok(Preparation::NotExported);
        }

        let Some(domain) = resolver.domain_type(decl, unit)? else {
            return Ok(Preparation::NoDomain);
        };
        let id = resolver.id_type(decl, unit)?;
        let (finder, remover) = config.method_patterns()?;

        let collection_path = type_config
            .path
            .unwrap_or_else(|| collection_path(domain.simple_name()));

        Ok(Preparation::Ready(Box::new(RepositoryContext {
            config,
            resolver,
            matcher,
            synth: Synthesizer::new(config),
            classification,
            domain,
            id,
            collection_path,
            repo_annotation_required: !classification.crud && type_directive.is_none(),
            finder,
            remover,
        })))
    }

    pub fn domain_simple(&self) -> &str {
        self.domain.simple_name()
    }
}

/// @ai:intent Companion interface loaded or created during a pass
#[derive(Debug, Clone)]
pub struct Companion {
    pub unit: CompilationUnit,
    pub index: usize,
    pub created: bool,
    pub modified: bool,
}

impl Companion {
    pub fn decl(&self) -> &TypeDeclaration {
        &self.unit.types[self.index]
    }
}

/// @ai:intent Units mutated while enriching one repository file
#[derive(Debug, Clone)]
pub struct Workspace {
    pub unit: CompilationUnit,
    pub root: usize,
    pub companion: Option<Companion>,
}

impl Workspace {
    pub fn new(unit: CompilationUnit, root: usize) -> Self {
        Self {
            unit,
            root,
            companion: None,
        }
    }

    pub fn decl(&self) -> &TypeDeclaration {
        &self.unit.types[self.root]
    }

    /// @ai:intent Load the custom companion, creating it next to the repository when asked
    /// @ai:post a created companion is added as an extra supertype of the repository
    /// @ai:effects fs:read
    pub fn companion(&mut self, ctx: &RepositoryContext<'_>, create: bool) -> Result<Option<&mut Companion>> {
        if self.companion.is_none() {
            self.companion = self.locate_companion(ctx, create)?;
        }
        Ok(self.companion.as_mut())
    }

    fn locate_companion(&mut self, ctx: &RepositoryContext<'_>, create: bool) -> Result<Option<Companion>> {
        if let Some(loaded) = ctx.resolver.find_custom_companion(self.decl(), &self.unit)? {
            if loaded.unit.path == self.unit.path {
                debug!(companion = %loaded.qualified_name(), "companion shares the repository file, ignoring");
                return Ok(None);
            }
            return Ok(Some(Companion {
                unit: loaded.unit,
                index: loaded.index,
                created: false,
                modified: false,
            }));
        }
        if !create {
            return Ok(None);
        }

        let name = ctx.resolver.companion_name(self.decl());
        let Some(path) = ctx.resolver.companion_path(&self.unit, self.decl()) else {
            return Ok(None);
        };

        let existing = if path.is_file() {
            let unit = parse_file(&path)?;
            unit.types.iter().position(|t| t.name == name).map(|index| (unit, index))
        } else {
            None
        };
        let (unit, index, created) = match existing {
            Some((unit, index)) => (unit, index, false),
            None => {
                let mut unit = CompilationUnit::new(self.unit.package.clone());
                unit.path = Some(path);
                unit.types.push(TypeDeclaration::interface(name.clone()));
                (unit, 0, true)
            }
        };

        let root = &mut self.unit.types[self.root];
        if !root.extends.iter().any(|e| e.simple_name() == name) {
            root.extends.push(TypeRef::simple(name.clone()));
        }
        debug!(companion = %name, created, "attached companion");

        Ok(Some(Companion {
            unit,
            index,
            created,
            modified: created,
        }))
    }
}

/// @ai:intent Render a type by simple names only, for shape comparison
fn simple_render(ty: &TypeRef) -> String {
    let mut out = ty.simple_name().to_string();
    if !ty.args.is_empty() {
        let args: Vec<String> = ty.args.iter().map(simple_render).collect();
        out.push_str(&format!("<{}>", args.join(",")));
    }
    out.push_str(&"[]".repeat(ty.dims));
    out
}

/// Comment carried by every method synthesized to host an operation.
pub(crate) const GENERATED_MARKER: &str = "// generated by repodoc";

/// @ai:intent Tag a synthesized declaration so removal can tell it from user code
pub(crate) fn generated(mut method: MethodDeclaration) -> MethodDeclaration {
    method.comments.push(GENERATED_MARKER.to_string());
    method
}

/// @ai:intent Check that a method is a synthesized declaration nobody has touched since
/// @ai:post false for any unmarked method, even one with exactly the synthesized shape
/// @ai:effects pure
pub(crate) fn is_generated_leftover(method: &MethodDeclaration, shape: &MethodDeclaration) -> bool {
    method.comments.iter().any(|c| c == GENERATED_MARKER)
        && method.is_bare(&[GENERATED_MARKER])
        && method.body == shape.body
        && same_shape(method, shape)
}

/// @ai:intent Check a declaration against a synthesized shape
/// @ai:effects pure
pub(crate) fn same_shape(method: &MethodDeclaration, shape: &MethodDeclaration) -> bool {
    method.name == shape.name
        && simple_render(&method.return_type) == simple_render(&shape.return_type)
        && method.parameters.len() == shape.parameters.len()
        && method
            .parameters
            .iter()
            .zip(&shape.parameters)
            .all(|(a, b)| a.name == b.name && simple_render(&a.ty) == simple_render(&b.ty))
}

/// @ai:intent Place a method on a type with its types written locally
/// @ai:post returns the new member index
fn push_localized(unit: &mut CompilationUnit, type_index: usize, mut method: MethodDeclaration) -> usize {
    method.return_type = localize_type(unit, &method.return_type);
    for param in &mut method.parameters {
        param.ty = localize_type(unit, &param.ty);
        for annotation in &param.annotations {
            import_annotation(unit, annotation);
        }
    }
    method.throws = method
        .throws
        .iter()
        .map(|t| localize_type(unit, t))
        .collect();
    for annotation in &method.annotations {
        import_annotation(unit, annotation);
    }
    unit.types[type_index].push_method(method)
}

/// @ai:intent Member index of the method hosting an operation on the repository
/// @ai:post inherited hits are copied down, absent ones synthesized when allowed
fn host(ws: &mut Workspace, found: Option<FoundMethod>, synthesized: Option<MethodDeclaration>) -> Option<usize> {
    match found {
        Some(found) if found.local => ws.decl().position_of(|m| *m == found.method),
        Some(found) => {
            debug!(method = %found.method.name, owner = %found.owner, "copying inherited method down");
            Some(push_localized(&mut ws.unit, ws.root, found.method))
        }
        None => synthesized.map(|method| push_localized(&mut ws.unit, ws.root, method)),
    }
}

/// @ai:intent Attach annotations to a method, importing their classes
/// @ai:post existing annotations of the same class are kept
fn attach(unit: &mut CompilationUnit, type_index: usize, member: usize, annotations: Vec<Annotation>) -> bool {
    let mut changed = false;
    for annotation in annotations {
        import_annotation(unit, &annotation);
        if let Some(method) = unit.types[type_index].method_at_mut(member) {
            changed |= add_if_absent(&mut method.annotations, annotation);
        }
    }
    changed
}

/// @ai:intent Add a binding and parameter metadata to every parameter
fn bind_parameters(
    ctx: &RepositoryContext<'_>,
    unit: &mut CompilationUnit,
    type_index: usize,
    member: usize,
    binding: Binding,
) -> bool {
    let Some(method) = unit.types[type_index].method_at(member) else {
        return false;
    };
    let doc = method.doc.as_deref().map(DocComment::parse);
    let plans: Vec<[Annotation; 2]> = method
        .parameters
        .iter()
        .map(|param| {
            let bound_name = param
                .annotations
                .iter()
                .find(|a| a.is(&ctx.config.directives.param))
                .and_then(|a| a.arg("value"))
                .and_then(|v| v.as_str())
                .unwrap_or(&param.name);
            let description = doc.as_ref().and_then(|d| d.param(&param.name));
            [
                ctx.synth.binding(binding, bound_name),
                ctx.synth.parameter(true, description),
            ]
        })
        .collect();

    let mut changed = false;
    for (index, plan) in plans.into_iter().enumerate() {
        for annotation in plan {
            import_annotation(unit, &annotation);
            if let Some(param) = unit.types[type_index]
                .method_at_mut(member)
                .and_then(|m| m.parameters.get_mut(index))
            {
                changed |= add_if_absent(&mut param.annotations, annotation);
            }
        }
    }
    changed
}

/// @ai:intent Strip every annotation an operation may have added to a method
fn strip(ctx: &RepositoryContext<'_>, method: &mut MethodDeclaration) -> bool {
    let mut changed = remove_all(&mut method.annotations, &ctx.synth.method_classes());
    let parameter_classes = ctx.synth.parameter_classes();
    for param in &mut method.parameters {
        changed |= remove_all(&mut param.annotations, &parameter_classes);
    }
    changed
}

/// @ai:intent Summary and description of a hosting method, with a fallback summary
fn describe(method: &MethodDeclaration, default_summary: String) -> (String, Option<String>) {
    (
        extract_summary(method).unwrap_or(default_summary),
        extract_description(method),
    )
}

/// @ai:intent Add the collection path to a hosting type if absent
fn ensure_type_path(ctx: &RepositoryContext<'_>, unit: &mut CompilationUnit, type_index: usize) -> bool {
    let path = ctx.synth.path(&ctx.collection_path);
    import_annotation(unit, &path);
    add_if_absent(&mut unit.types[type_index].annotations, path)
}

/// @ai:intent Drop the type-level path once no method carries a verb, then prune imports
/// @ai:effects pure
pub fn finish_remove(ctx: &RepositoryContext<'_>, unit: &mut CompilationUnit, type_index: usize) -> bool {
    let catalog = &ctx.config.annotations;
    let verbs = catalog.verbs();
    let routed = unit.types[type_index]
        .methods()
        .any(|m| verbs.iter().any(|verb| m.has_annotation(verb)));

    let mut changed = false;
    if !routed {
        changed |= remove_all(&mut unit.types[type_index].annotations, &[catalog.path.as_str()]);
    }
    let mut candidates = catalog.all();
    candidates.push(OPTIONAL);
    candidates.push(&ctx.config.bases.predicate_type);
    // Types a synthesized declaration may have imported.
    candidates.extend(ctx.domain.names());
    if let Some(id) = &ctx.id {
        candidates.extend(id.names());
    }
    changed |= unit.prune_imports(&candidates);
    changed
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::fs;
    use std::path::{Path, PathBuf};

    pub fn write(root: &Path, relative: &str, source: &str) -> PathBuf {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, source).unwrap();
        path
    }

    /// Builds the context and workspace the enricher would build for a file.
    pub fn load<'c>(config: &'c EnrichConfig, path: &Path) -> (RepositoryContext<'c>, Workspace) {
        let unit = parse_file(path).unwrap();
        let root = unit.root_type_index().unwrap();
        match RepositoryContext::prepare(config, &unit, root).unwrap() {
            Preparation::Ready(ctx) => (*ctx, Workspace::new(unit, root)),
            _ => panic!("{} is not an exported repository", path.display()),
        }
    }

    /// Runs one phase of one operation and returns its outcome.
    pub fn run(op: Operation, config: &EnrichConfig, path: &Path, phase: Phase) -> (Outcome, Workspace) {
        let (ctx, mut ws) = load(config, path);
        let outcome = op.apply(&ctx, &mut ws, phase).unwrap();
        if phase == Phase::Remove {
            let root = ws.root;
            finish_remove(&ctx, &mut ws.unit, root);
        }
        (outcome, ws)
    }

    /// Writes the root unit and any companion back to disk.
    pub fn persist(ws: &Workspace) {
        crate::printer::write_unit(&ws.unit).unwrap();
        if let Some(companion) = &ws.companion {
            crate::printer::write_unit(&companion.unit).unwrap();
        }
    }

    /// Every annotation in the unit, flattened, for content comparisons.
    pub fn annotation_set(unit: &CompilationUnit) -> Vec<String> {
        let mut names = Vec::new();
        for decl in &unit.types {
            names.extend(decl.annotations.iter().map(|a| format!("{}:{:?}", decl.name, a)));
            for method in decl.methods() {
                names.extend(method.annotations.iter().map(|a| format!("{}:{:?}", method.name, a)));
                for param in &method.parameters {
                    names.extend(
                        param
                            .annotations
                            .iter()
                            .map(|a| format!("{}.{}:{:?}", method.name, param.name, a)),
                    );
                }
            }
        }
        names
    }
}
