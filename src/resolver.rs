//! @ai:module:intent Resolve type references and walk repository hierarchies across files
//! @ai:module:layer domain
//! @ai:module:public_api Resolver, LoadedType, Classification, Substitution, substitute
//! @ai:module:depends_on ast, config, parser, error
//! @ai:module:stateless true

use crate::ast::{simple_name_of, CompilationUnit, TypeDeclaration, TypeKind, TypeRef};
use crate::config::{AncestorOrder, BaseKind, EnrichConfig};
use crate::error::{Error, Result};
use crate::parser::parse_file;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

/// Unqualified names resolved without an import.
const WELL_KNOWN: &[(&str, &str)] = &[
    ("String", "java.lang.String"),
    ("Object", "java.lang.Object"),
    ("Boolean", "java.lang.Boolean"),
    ("Byte", "java.lang.Byte"),
    ("Character", "java.lang.Character"),
    ("Short", "java.lang.Short"),
    ("Integer", "java.lang.Integer"),
    ("Long", "java.lang.Long"),
    ("Float", "java.lang.Float"),
    ("Double", "java.lang.Double"),
    ("Void", "java.lang.Void"),
    ("Iterable", "java.lang.Iterable"),
    ("Optional", "java.util.Optional"),
    ("List", "java.util.List"),
    ("Set", "java.util.Set"),
    ("Collection", "java.util.Collection"),
    ("Map", "java.util.Map"),
    ("Stream", "java.util.stream.Stream"),
    ("Page", "org.springframework.data.domain.Page"),
    ("Slice", "org.springframework.data.domain.Slice"),
    ("Pageable", "org.springframework.data.domain.Pageable"),
    ("Sort", "org.springframework.data.domain.Sort"),
];

const PRIMITIVES: &[&str] = &[
    "void", "boolean", "byte", "char", "short", "int", "long", "float", "double",
];

/// Type variable name to the argument bound at an extends edge.
pub type Substitution = HashMap<String, TypeRef>;

/// @ai:intent A type declaration parsed from its own source file
#[derive(Debug, Clone)]
pub struct LoadedType {
    pub unit: CompilationUnit,
    pub index: usize,
}

impl LoadedType {
    pub fn decl(&self) -> &TypeDeclaration {
        &self.unit.types[self.index]
    }

    pub fn qualified_name(&self) -> String {
        self.unit.qualified_name_of(&self.decl().name)
    }
}

/// @ai:intent Which well-known bases a declaration transitively extends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub crud: bool,
    pub predicate: bool,
    pub plain: bool,
}

impl Classification {
    pub fn is_repository(&self) -> bool {
        self.crud || self.predicate || self.plain
    }

    fn mark(&mut self, kind: BaseKind) {
        match kind {
            BaseKind::Crud => self.crud = true,
            BaseKind::Predicate => self.predicate = true,
            BaseKind::Plain => self.plain = true,
        }
    }

    fn merge(&mut self, other: Classification) {
        self.crud |= other.crud;
        self.predicate |= other.predicate;
        self.plain |= other.plain;
    }
}

/// Which generic argument of a well-known base is being extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Domain,
    Id,
}

impl Slot {
    fn index(self) -> usize {
        match self {
            Slot::Domain => 0,
            Slot::Id => 1,
        }
    }

    fn applies_to(self, kind: BaseKind) -> bool {
        match self {
            Slot::Domain => true,
            Slot::Id => kind != BaseKind::Predicate,
        }
    }
}

/// @ai:intent Replace type variables bound by a substitution
/// @ai:example (List<T>, {T: Widget}) -> List<Widget>
/// @ai:effects pure
pub fn substitute(ty: &TypeRef, substitution: &Substitution) -> TypeRef {
    if ty.args.is_empty() {
        if let Some(bound) = substitution.get(&ty.name) {
            let mut replaced = bound.clone();
            replaced.dims += ty.dims;
            return replaced;
        }
    }
    TypeRef {
        name: ty.name.clone(),
        args: ty.args.iter().map(|a| substitute(a, substitution)).collect(),
        dims: ty.dims,
    }
}

pub(crate) fn enter(stack: &mut Vec<String>, qualified: String) -> Result<()> {
    if stack.contains(&qualified) {
        let mut chain = stack.clone();
        chain.push(qualified);
        return Err(Error::CyclicHierarchy {
            chain: chain.join(" -> "),
        });
    }
    stack.push(qualified);
    Ok(())
}

/// @ai:intent Type and hierarchy queries driven by one configuration
/// @ai:effects fs:read
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'c> {
    config: &'c EnrichConfig,
}

impl<'c> Resolver<'c> {
    pub fn new(config: &'c EnrichConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &'c EnrichConfig {
        self.config
    }

    /// @ai:intent Qualify a written name: import, then well-known table, then package
    /// @ai:post None only for a detached unit without package
    /// @ai:example ("Widget" in package com.acme) -> Some("com.acme.Widget")
    /// @ai:effects pure
    pub fn qualify(&self, name: &str, unit: &CompilationUnit) -> Option<String> {
        if name.contains('.') || PRIMITIVES.contains(&name) || name.starts_with('?') {
            return Some(name.to_string());
        }
        if let Some(imported) = unit.import_for(name) {
            return Some(imported.to_string());
        }
        if let Some((_, qualified)) = WELL_KNOWN.iter().find(|(simple, _)| *simple == name) {
            return Some(qualified.to_string());
        }
        match &unit.package {
            Some(package) if !package.is_empty() => Some(format!("{}.{}", package, name)),
            _ if unit.path.is_some() => Some(name.to_string()),
            _ => None,
        }
    }

    /// @ai:intent Qualify every name of a type reference except the given type variables
    /// @ai:effects pure
    pub fn qualify_type(&self, ty: &TypeRef, unit: &CompilationUnit, vars: &[String]) -> TypeRef {
        let name = if vars.contains(&ty.name) {
            ty.name.clone()
        } else {
            self.qualify(&ty.name, unit).unwrap_or_else(|| ty.name.clone())
        };
        TypeRef {
            name,
            args: ty.args.iter().map(|a| self.qualify_type(a, unit, vars)).collect(),
            dims: ty.dims,
        }
    }

    /// @ai:intent Directory a unit's package hierarchy is rooted at
    fn source_root(unit: &CompilationUnit) -> Option<PathBuf> {
        let dir = unit.path.as_ref()?.parent()?.to_path_buf();
        let Some(package) = unit.package.as_deref().filter(|p| !p.is_empty()) else {
            return Some(dir);
        };
        let mut root = dir.clone();
        for segment in package.rsplit('.') {
            if root.file_name().and_then(|n| n.to_str()) != Some(segment) {
                return Some(dir);
            }
            root.pop();
        }
        Some(root)
    }

    /// @ai:intent Locate the source file declaring a qualified name
    /// @ai:effects fs:read
    pub fn source_file_for(&self, qualified: &str, unit: &CompilationUnit) -> Option<PathBuf> {
        let mut candidates = Vec::new();
        if let Some(root) = Self::source_root(unit) {
            let relative = format!("{}.java", qualified.replace('.', "/"));
            candidates.push(root.join(relative));
        }
        let package = qualified.rsplit_once('.').map(|(pkg, _)| pkg);
        if package == unit.package.as_deref() || package.is_none() {
            if let Some(dir) = unit.path.as_ref().and_then(|p| p.parent()) {
                candidates.push(dir.join(format!("{}.java", simple_name_of(qualified))));
            }
        }
        candidates.into_iter().find(|c| c.is_file())
    }

    /// @ai:intent Load the declaration an extends edge points at
    /// @ai:post Ok(None) when no source file exists; the edge is then a leaf
    /// @ai:effects fs:read
    pub fn load_supertype(&self, ty: &TypeRef, unit: &CompilationUnit) -> Result<Option<LoadedType>> {
        let simple = ty.simple_name();

        if !ty.name.contains('.') && unit.import_for(simple).is_none() {
            if let Some(index) = unit.types.iter().position(|t| t.name == simple) {
                return Ok(Some(LoadedType {
                    unit: unit.clone(),
                    index,
                }));
            }
        }

        let qualified = self
            .qualify(&ty.name, unit)
            .ok_or_else(|| Error::UnresolvableReference {
                name: ty.name.clone(),
                context: unit.package.clone().unwrap_or_else(|| "<default package>".to_string()),
            })?;

        let Some(path) = self.source_file_for(&qualified, unit) else {
            debug!(supertype = %qualified, "no source for supertype, treating as leaf");
            return Ok(None);
        };

        let loaded = parse_file(&path)?;
        let index = loaded.types.iter().position(|t| t.name == simple);
        Ok(index.map(|index| LoadedType {
            unit: loaded,
            index,
        }))
    }

    /// @ai:intent Extends edges in configured tie-break order
    pub fn edges<'d>(&self, decl: &'d TypeDeclaration) -> Vec<&'d TypeRef> {
        let mut edges = decl.supertypes();
        if self.config.policy.ancestor_order == AncestorOrder::Reverse {
            edges.reverse();
        }
        edges
    }

    /// @ai:intent Classify a declaration by the well-known bases it reaches
    /// @ai:effects fs:read
    pub fn classify(&self, decl: &TypeDeclaration, unit: &CompilationUnit) -> Result<Classification> {
        self.classify_in(decl, unit, &mut Vec::new())
    }

    fn classify_in(
        &self,
        decl: &TypeDeclaration,
        unit: &CompilationUnit,
        stack: &mut Vec<String>,
    ) -> Result<Classification> {
        enter(stack, unit.qualified_name_of(&decl.name))?;

        let mut classification = Classification::default();
        for edge in self.edges(decl) {
            match self.config.bases.kind_of(&edge.name) {
                Some(kind) => classification.mark(kind),
                None => {
                    if let Some(loaded) = self.load_supertype(edge, unit)? {
                        classification.merge(self.classify_in(loaded.decl(), &loaded.unit, stack)?);
                    }
                }
            }
        }

        stack.pop();
        Ok(classification)
    }

    /// @ai:intent Check whether a declaration names a base of this kind directly
    pub fn is_direct_descendant(&self, decl: &TypeDeclaration, kind: BaseKind) -> bool {
        decl.supertypes()
            .iter()
            .any(|edge| self.config.bases.kind_of(&edge.name) == Some(kind))
    }

    /// @ai:intent Domain entity type of a repository, qualified where resolvable
    /// @ai:pre well-known bases in the hierarchy carry their type arguments
    /// @ai:effects fs:read
    pub fn domain_type(&self, decl: &TypeDeclaration, unit: &CompilationUnit) -> Result<Option<TypeRef>> {
        self.type_argument(decl, unit, Slot::Domain, &mut Vec::new())
    }

    /// @ai:intent Identifier type of a repository, qualified where resolvable
    /// @ai:effects fs:read
    pub fn id_type(&self, decl: &TypeDeclaration, unit: &CompilationUnit) -> Result<Option<TypeRef>> {
        self.type_argument(decl, unit, Slot::Id, &mut Vec::new())
    }

    fn type_argument(
        &self,
        decl: &TypeDeclaration,
        unit: &CompilationUnit,
        slot: Slot,
        stack: &mut Vec<String>,
    ) -> Result<Option<TypeRef>> {
        enter(stack, unit.qualified_name_of(&decl.name))?;
        let found = self.type_argument_edges(decl, unit, slot, stack)?;
        stack.pop();
        Ok(found)
    }

    fn type_argument_edges(
        &self,
        decl: &TypeDeclaration,
        unit: &CompilationUnit,
        slot: Slot,
        stack: &mut Vec<String>,
    ) -> Result<Option<TypeRef>> {
        let vars = &decl.type_parameters;
        let edges = self.edges(decl);

        for edge in &edges {
            let Some(kind) = self.config.bases.kind_of(&edge.name) else {
                continue;
            };
            if !slot.applies_to(kind) {
                continue;
            }
            return match edge.args.get(slot.index()) {
                Some(arg) => Ok(Some(self.qualify_type(arg, unit, vars))),
                None => Err(Error::MissingTypeArguments {
                    base: edge.render(),
                    declaration: unit.qualified_name_of(&decl.name),
                }),
            };
        }

        for edge in &edges {
            if self.config.bases.kind_of(&edge.name).is_some() {
                continue;
            }
            let Some(loaded) = self.load_supertype(edge, unit)? else {
                continue;
            };
            if let Some(found) = self.type_argument(loaded.decl(), &loaded.unit, slot, stack)? {
                let substitution = self.substitution_for(edge, unit, vars, loaded.decl());
                return Ok(Some(substitute(&found, &substitution)));
            }
        }

        let pass_through = edges
            .iter()
            .filter(|edge| self.config.bases.kind_of(&edge.name).is_none())
            .find_map(|edge| edge.args.get(slot.index()));
        Ok(pass_through.map(|arg| self.qualify_type(arg, unit, vars)))
    }

    /// @ai:intent Bind an ancestor's type parameters to the arguments written at an edge
    /// @ai:effects pure
    pub fn substitution_for(
        &self,
        edge: &TypeRef,
        unit: &CompilationUnit,
        vars: &[String],
        ancestor: &TypeDeclaration,
    ) -> Substitution {
        ancestor
            .type_parameters
            .iter()
            .cloned()
            .zip(edge.args.iter().map(|arg| self.qualify_type(arg, unit, vars)))
            .collect()
    }

    /// @ai:intent First directly extended interface that is not itself a repository
    /// @ai:effects fs:read
    pub fn find_custom_companion(
        &self,
        decl: &TypeDeclaration,
        unit: &CompilationUnit,
    ) -> Result<Option<LoadedType>> {
        for edge in self.edges(decl) {
            if self.config.bases.kind_of(&edge.name).is_some() {
                continue;
            }
            let Some(loaded) = self.load_supertype(edge, unit)? else {
                continue;
            };
            if loaded.decl().kind != TypeKind::Interface {
                continue;
            }
            if !self.classify(loaded.decl(), &loaded.unit)?.is_repository() {
                return Ok(Some(loaded));
            }
        }
        Ok(None)
    }

    /// @ai:intent Path of the companion file synthesized next to a repository
    pub fn companion_path(&self, unit: &CompilationUnit, decl: &TypeDeclaration) -> Option<PathBuf> {
        let dir = unit.path.as_ref()?.parent()?;
        Some(dir.join(format!("{}.java", self.companion_name(decl))))
    }

    pub fn companion_name(&self, decl: &TypeDeclaration) -> String {
        format!("{}{}", decl.name, self.config.policy.companion_suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_file;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, source: &str) -> PathBuf {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, source).unwrap();
        path
    }

    fn root_of(path: &Path) -> CompilationUnit {
        parse_file(path).unwrap()
    }

    #[test]
    fn test_qualify_order() {
        let config = EnrichConfig::default();
        let resolver = Resolver::new(&config);
        let mut unit = CompilationUnit::new(Some("com.acme.repo".to_string()));
        unit.imports.push(crate::ast::Import::single("com.acme.model.Widget"));

        assert_eq!(resolver.qualify("Widget", &unit).as_deref(), Some("com.acme.model.Widget"));
        assert_eq!(resolver.qualify("Optional", &unit).as_deref(), Some("java.util.Optional"));
        assert_eq!(resolver.qualify("Gadget", &unit).as_deref(), Some("com.acme.repo.Gadget"));
        assert_eq!(resolver.qualify("long", &unit).as_deref(), Some("long"));

        let detached = CompilationUnit::new(None);
        assert_eq!(resolver.qualify("Gadget", &detached), None);
    }

    #[test]
    fn test_widget_scenario_domain_and_id() {
        let dir = TempDir::new().unwrap();
        let path = write(
            dir.path(),
            "com/acme/WidgetRepository.java",
            "package com.acme;\n\npublic interface WidgetRepository extends PagingAndSortingRepository<Widget, String> {\n}\n",
        );
        let unit = root_of(&path);
        let decl = &unit.types[0];
        let config = EnrichConfig::default();
        let resolver = Resolver::new(&config);

        let classification = resolver.classify(decl, &unit).unwrap();
        assert!(classification.crud);
        assert!(!classification.predicate);
        assert_eq!(
            resolver.domain_type(decl, &unit).unwrap(),
            Some(TypeRef::simple("com.acme.Widget"))
        );
        assert_eq!(
            resolver.id_type(decl, &unit).unwrap(),
            Some(TypeRef::simple("java.lang.String"))
        );
    }

    #[test]
    fn test_generic_ancestor_substitution() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "com/acme/base/BaseRepository.java",
            "package com.acme.base;\n\npublic interface BaseRepository<T, ID> extends CrudRepository<T, ID>, QuerydslPredicateExecutor<T> {\n}\n",
        );
        let path = write(
            dir.path(),
            "com/acme/repo/GadgetRepository.java",
            "package com.acme.repo;\n\nimport com.acme.base.BaseRepository;\nimport com.acme.model.Gadget;\n\npublic interface GadgetRepository extends BaseRepository<Gadget, Long> {\n}\n",
        );
        let unit = root_of(&path);
        let decl = &unit.types[0];
        let config = EnrichConfig::default();
        let resolver = Resolver::new(&config);

        let classification = resolver.classify(decl, &unit).unwrap();
        assert!(classification.crud && classification.predicate);
        assert!(!resolver.is_direct_descendant(decl, BaseKind::Crud));
        assert_eq!(
            resolver.domain_type(decl, &unit).unwrap(),
            Some(TypeRef::simple("com.acme.model.Gadget"))
        );
        assert_eq!(
            resolver.id_type(decl, &unit).unwrap(),
            Some(TypeRef::simple("java.lang.Long"))
        );
    }

    #[test]
    fn test_missing_ancestor_is_a_leaf() {
        let dir = TempDir::new().unwrap();
        let path = write(
            dir.path(),
            "com/acme/ThingRepository.java",
            "package com.acme;\n\nimport org.external.Vendor;\n\npublic interface ThingRepository extends Vendor<Thing> {\n}\n",
        );
        let unit = root_of(&path);
        let config = EnrichConfig::default();
        let resolver = Resolver::new(&config);
        let classification = resolver.classify(&unit.types[0], &unit).unwrap();
        assert!(!classification.is_repository());
        assert_eq!(
            resolver.domain_type(&unit.types[0], &unit).unwrap(),
            Some(TypeRef::simple("com.acme.Thing"))
        );
    }

    #[test]
    fn test_missing_type_arguments_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        let path = write(
            dir.path(),
            "com/acme/RawRepository.java",
            "package com.acme;\n\npublic interface RawRepository extends CrudRepository {\n}\n",
        );
        let unit = root_of(&path);
        let config = EnrichConfig::default();
        let err = Resolver::new(&config).id_type(&unit.types[0], &unit).unwrap_err();
        assert!(matches!(err, Error::MissingTypeArguments { .. }));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_cycle_is_detected() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "com/acme/A.java",
            "package com.acme;\n\npublic interface A extends B {\n}\n",
        );
        let path = write(
            dir.path(),
            "com/acme/B.java",
            "package com.acme;\n\npublic interface B extends A {\n}\n",
        );
        let unit = root_of(&path);
        let config = EnrichConfig::default();
        let err = Resolver::new(&config).classify(&unit.types[0], &unit).unwrap_err();
        match err {
            Error::CyclicHierarchy { chain } => assert_eq!(chain, "com.acme.B -> com.acme.A -> com.acme.B"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_find_custom_companion() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "com/acme/WidgetRepositoryCustom.java",
            "package com.acme;\n\npublic interface WidgetRepositoryCustom {\n}\n",
        );
        let path = write(
            dir.path(),
            "com/acme/WidgetRepository.java",
            "package com.acme;\n\npublic interface WidgetRepository extends CrudRepository<Widget, Long>, WidgetRepositoryCustom {\n}\n",
        );
        let unit = root_of(&path);
        let config = EnrichConfig::default();
        let resolver = Resolver::new(&config);
        let companion = resolver.find_custom_companion(&unit.types[0], &unit).unwrap().unwrap();
        assert_eq!(companion.qualified_name(), "com.acme.WidgetRepositoryCustom");
        assert_eq!(
            resolver.companion_path(&unit, &unit.types[0]),
            Some(dir.path().join("com/acme/WidgetRepositoryCustom.java"))
        );
    }

    #[test]
    fn test_substitute_nested() {
        let mut substitution = Substitution::new();
        substitution.insert("T".to_string(), TypeRef::simple("Widget"));
        let ty = TypeRef::generic("List", vec![TypeRef::simple("T")]);
        assert_eq!(substitute(&ty, &substitution).render(), "List<Widget>");
    }
}
