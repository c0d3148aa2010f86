//! @ai:module:intent Locate operation methods and export directives up a hierarchy
//! @ai:module:layer domain
//! @ai:module:public_api Matcher, FoundMethod, Signature, signature_matches
//! @ai:module:depends_on ast, resolver, error
//! @ai:module:stateless true

use crate::ast::{
    simple_name_of, Annotation, CompilationUnit, MethodDeclaration, TypeDeclaration, TypeRef,
};
use crate::error::Result;
use crate::resolver::{enter, substitute, Resolver, Substitution};
use serde::Serialize;
use tracing::debug;

/// @ai:intent A method name plus expected parameter type names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub params: Vec<String>,
}

impl Signature {
    pub fn new(name: impl Into<String>, params: &[&str]) -> Self {
        Self {
            name: name.into(),
            params: params.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// @ai:intent Signature of an existing declaration
    pub fn of(method: &MethodDeclaration) -> Self {
        Self {
            name: method.name.clone(),
            params: method.parameter_types().iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// @ai:intent A matched method and where it was declared
#[derive(Debug, Clone, Serialize)]
pub struct FoundMethod {
    /// Declared method for local hits; for inherited hits a copy with qualified,
    /// substituted types ready to be placed on the concrete repository.
    pub method: MethodDeclaration,
    pub owner: String,
    pub local: bool,
}

/// One declaration visited during a hierarchy walk.
struct Site<'a> {
    decl: &'a TypeDeclaration,
    unit: &'a CompilationUnit,
    substitution: &'a Substitution,
    local: bool,
}

/// @ai:intent Check name and parameter shape; type variables match any argument
/// @ai:example (save(S entity) with <S extends T>, "save", ["Widget"]) -> true
/// @ai:effects pure
pub fn signature_matches(method: &MethodDeclaration, owner: &TypeDeclaration, signature: &Signature) -> bool {
    if method.name != signature.name || method.parameters.len() != signature.params.len() {
        return false;
    }
    let method_vars = method.type_variables();
    method
        .parameters
        .iter()
        .zip(&signature.params)
        .all(|(param, expected)| {
            let written = param.ty.simple_name();
            written == simple_name_of(expected)
                || method_vars.contains(&written)
                || owner.is_type_parameter(written)
        })
}

/// @ai:intent Hierarchy searches sharing one resolver
#[derive(Debug, Clone, Copy)]
pub struct Matcher<'c> {
    resolver: Resolver<'c>,
}

impl<'c> Matcher<'c> {
    pub fn new(resolver: Resolver<'c>) -> Self {
        Self { resolver }
    }

    /// Depth first, own declaration before ancestors, edges in configured order.
    fn walk<R>(
        &self,
        site: Site<'_>,
        repositories_only: bool,
        stack: &mut Vec<String>,
        visit: &mut dyn FnMut(&Site<'_>) -> Option<R>,
    ) -> Result<Option<R>> {
        enter(stack, site.unit.qualified_name_of(&site.decl.name))?;

        if let Some(hit) = visit(&site) {
            stack.pop();
            return Ok(Some(hit));
        }

        let bases = &self.resolver.config().bases;
        for edge in self.resolver.edges(site.decl) {
            if bases.kind_of(&edge.name).is_some() {
                continue;
            }
            let Some(loaded) = self.resolver.load_supertype(edge, site.unit)? else {
                continue;
            };
            if repositories_only
                && !self
                    .resolver
                    .classify(loaded.decl(), &loaded.unit)?
                    .is_repository()
            {
                continue;
            }

            let mut substitution = self.resolver.substitution_for(
                edge,
                site.unit,
                &site.decl.type_parameters,
                loaded.decl(),
            );
            for bound in substitution.values_mut() {
                *bound = substitute(bound, site.substitution);
            }

            let inner = Site {
                decl: loaded.decl(),
                unit: &loaded.unit,
                substitution: &substitution,
                local: false,
            };
            if let Some(hit) = self.walk(inner, repositories_only, stack, visit)? {
                stack.pop();
                return Ok(Some(hit));
            }
        }

        stack.pop();
        Ok(None)
    }

    fn root<'a>(
        decl: &'a TypeDeclaration,
        unit: &'a CompilationUnit,
        empty: &'a Substitution,
    ) -> Site<'a> {
        Site {
            decl,
            unit,
            substitution: empty,
            local: true,
        }
    }

    fn found(&self, site: &Site<'_>, method: &MethodDeclaration) -> FoundMethod {
        let method = if site.local {
            method.clone()
        } else {
            self.inherited_copy(site, method)
        };
        FoundMethod {
            method,
            owner: site.unit.qualified_name_of(&site.decl.name),
            local: site.local,
        }
    }

    /// @ai:intent Re-express an ancestor's method in terms of the concrete repository
    /// @ai:post types are qualified against the ancestor unit and type variables are bound
    fn inherited_copy(&self, site: &Site<'_>, method: &MethodDeclaration) -> MethodDeclaration {
        let mut vars: Vec<String> = method.type_variables().iter().map(|v| v.to_string()).collect();
        vars.extend(site.decl.type_parameters.iter().cloned());

        let rebind = |ty: &TypeRef| substitute(&self.resolver.qualify_type(ty, site.unit, &vars), site.substitution);

        let mut copy = method.clone();
        copy.return_type = rebind(&method.return_type);
        for param in &mut copy.parameters {
            param.ty = rebind(&param.ty);
            param.comments.clear();
        }
        copy.comments.clear();
        copy.throws = method.throws.iter().map(rebind).collect();
        copy.body = None;
        copy.modifiers.retain(|m| m != "default" && m != "static");
        copy
    }

    /// @ai:intent Closest declaration of a method by name and parameter shape
    /// @ai:post local hits win; inherited hits follow extends order
    /// @ai:effects fs:read
    pub fn find_closest_method(
        &self,
        decl: &TypeDeclaration,
        unit: &CompilationUnit,
        signature: &Signature,
    ) -> Result<Option<FoundMethod>> {
        let empty = Substitution::new();
        self.walk(Self::root(decl, unit, &empty), false, &mut Vec::new(), &mut |site| {
            site.decl
                .methods()
                .find(|m| signature_matches(m, site.decl, signature))
                .map(|m| self.found(site, m))
        })
    }

    /// @ai:intent First variant with a declaration anywhere in the hierarchy
    /// @ai:post variant order dominates depth
    /// @ai:effects fs:read
    pub fn find_closest_method_from_variants(
        &self,
        decl: &TypeDeclaration,
        unit: &CompilationUnit,
        variants: &[Signature],
    ) -> Result<Option<(usize, FoundMethod)>> {
        for (index, variant) in variants.iter().enumerate() {
            if let Some(found) = self.find_closest_method(decl, unit, variant)? {
                return Ok(Some((index, found)));
            }
        }
        Ok(None)
    }

    /// @ai:intent First export directive attached to a matching method in the hierarchy
    /// @ai:effects fs:read
    pub fn find_closest_export_directive(
        &self,
        decl: &TypeDeclaration,
        unit: &CompilationUnit,
        signature: &Signature,
    ) -> Result<Option<Annotation>> {
        let directive = &self.resolver.config().directives.method;
        let empty = Substitution::new();
        self.walk(Self::root(decl, unit, &empty), false, &mut Vec::new(), &mut |site| {
            site.decl
                .methods()
                .filter(|m| signature_matches(m, site.decl, signature))
                .find_map(|m| m.annotation(directive).cloned())
        })
    }

    /// @ai:intent Closest type-level repository directive
    /// @ai:effects fs:read
    pub fn find_type_directive(
        &self,
        decl: &TypeDeclaration,
        unit: &CompilationUnit,
    ) -> Result<Option<Annotation>> {
        let directive = &self.resolver.config().directives.repository;
        let empty = Substitution::new();
        self.walk(Self::root(decl, unit, &empty), true, &mut Vec::new(), &mut |site| {
            site.decl.annotation(directive).cloned()
        })
    }

    /// @ai:intent Every method of the repository and its repository ancestors
    /// @ai:post one entry per signature, closest declaration first
    /// @ai:effects fs:read
    pub fn hierarchy_methods(
        &self,
        decl: &TypeDeclaration,
        unit: &CompilationUnit,
    ) -> Result<Vec<FoundMethod>> {
        let mut collected: Vec<FoundMethod> = Vec::new();
        let empty = Substitution::new();
        self.walk::<()>(Self::root(decl, unit, &empty), true, &mut Vec::new(), &mut |site| {
            for method in site.decl.methods() {
                let signature = Signature::of(method);
                let seen = collected
                    .iter()
                    .any(|f| f.method.name == signature.name && Signature::of(&f.method) == signature);
                if seen {
                    continue;
                }
                if !site.local && method.body.is_some() {
                    debug!(method = %method.name, "skipping inherited default method");
                    continue;
                }
                collected.push(self.found(site, method));
            }
            None
        })?;
        Ok(collected)
    }
}
