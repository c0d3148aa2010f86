//! @ai:module:intent Bulk find over the whole collection
//! @ai:module:layer application
//! @ai:module:stateless true

use super::{
    attach, describe, ensure_type_path, generated, host, is_generated_leftover, strip, Outcome, Phase,
    RepositoryContext, Workspace,
};
use crate::ast::{simple_name_of, MethodDeclaration, Parameter, TypeRef};
use crate::config::BaseKind;
use crate::error::Result;
use crate::matcher::{signature_matches, Signature};
use crate::policy::ResourceConfig;
use crate::synthesis::{Response, SchemaRef, Verb};

/// Position of the predicate variant in `variants`.
const PREDICATE: usize = 0;
/// Position of the no-argument variant in `variants`.
const NO_ARGS: usize = 3;

fn variants(ctx: &RepositoryContext<'_>) -> [Signature; 4] {
    let predicate = simple_name_of(&ctx.config.bases.predicate_type);
    [
        Signature::new("findAll", &[predicate]),
        Signature::new("findAll", &["Pageable"]),
        Signature::new("findAll", &["Sort"]),
        Signature::new("findAll", &[]),
    ]
}

/// @ai:intent Declaration synthesized for a variant, if that variant may be synthesized here
/// @ai:post predicate descendants get the predicate variant, CRUD descendants the no-argument one
fn shape(ctx: &RepositoryContext<'_>, variant: usize, direct_predicate: bool, direct_crud: bool) -> Option<MethodDeclaration> {
    let returns = TypeRef::generic("Iterable", vec![ctx.domain.clone()]);
    match variant {
        PREDICATE if direct_predicate => Some(generated(MethodDeclaration::new(
            "findAll",
            returns,
            vec![Parameter::new(
                "predicate",
                TypeRef::simple(ctx.config.bases.predicate_type.clone()),
            )],
        ))),
        NO_ARGS if direct_crud => Some(generated(MethodDeclaration::new("findAll", returns, Vec::new()))),
        _ => None,
    }
}

pub(super) fn apply(ctx: &RepositoryContext<'_>, ws: &mut Workspace, phase: Phase) -> Result<Outcome> {
    let direct_predicate = ctx.resolver.is_direct_descendant(ws.decl(), BaseKind::Predicate);
    let direct_crud = ctx.resolver.is_direct_descendant(ws.decl(), BaseKind::Crud);
    match phase {
        Phase::Add => add(ctx, ws, direct_predicate, direct_crud),
        Phase::Remove => remove(ctx, ws, direct_predicate, direct_crud),
    }
}

fn add(ctx: &RepositoryContext<'_>, ws: &mut Workspace, direct_predicate: bool, direct_crud: bool) -> Result<Outcome> {
    let variants = variants(ctx);
    let found = ctx
        .matcher
        .find_closest_method_from_variants(ws.decl(), &ws.unit, &variants)?;

    let (variant, found, synthesized) = match found {
        Some((variant, found)) => (variant, Some(found), None),
        None => {
            let synthesized = shape(ctx, PREDICATE, direct_predicate, direct_crud)
                .map(|m| (PREDICATE, m))
                .or_else(|| shape(ctx, NO_ARGS, direct_predicate, direct_crud).map(|m| (NO_ARGS, m)));
            match synthesized {
                Some((variant, method)) => (variant, None, Some(method)),
                None => return Ok(Outcome::NotApplicable),
            }
        }
    };

    let directive = ctx
        .matcher
        .find_closest_export_directive(ws.decl(), &ws.unit, &variants[variant])?;
    let config = ResourceConfig::resolve(directive.as_ref(), ctx.repo_annotation_required);
    if !config.exported {
        return Ok(Outcome::NotExported);
    }

    let Some(member) = host(ws, found, synthesized) else {
        return Ok(Outcome::NotApplicable);
    };
    let root = ws.root;
    let Some(method) = ws.unit.types[root].method_at(member) else {
        return Ok(Outcome::NotApplicable);
    };

    let (summary, description) = describe(method, format!("List {}s", ctx.domain_simple()));
    let mut annotations = Vec::new();
    if let Some(path) = &config.path {
        annotations.push(ctx.synth.path(path));
    }
    annotations.push(ctx.synth.verb(Verb::Get));
    annotations.push(ctx.synth.operation(
        &summary,
        description.as_deref(),
        None,
        &[Response::ok(Some(SchemaRef::List(ctx.domain.clone())))],
    ));
    attach(&mut ws.unit, root, member, annotations);
    ensure_type_path(ctx, &mut ws.unit, root);
    Ok(Outcome::Applied)
}

fn remove(ctx: &RepositoryContext<'_>, ws: &mut Workspace, direct_predicate: bool, direct_crud: bool) -> Result<Outcome> {
    let root = ws.root;
    let mut outcome = Outcome::Unchanged;

    for (variant, signature) in variants(ctx).iter().enumerate() {
        let decl = ws.decl();
        let Some(member) = decl.position_of(|m| signature_matches(m, decl, signature)) else {
            continue;
        };
        let Some(method) = ws.unit.types[root].method_at_mut(member) else {
            continue;
        };

        if strip(ctx, method) {
            outcome = Outcome::Removed;
        }
        let synthesized = shape(ctx, variant, direct_predicate, direct_crud);
        if synthesized.is_some_and(|s| is_generated_leftover(method, &s)) {
            ws.unit.types[root].members.remove(member);
            outcome = Outcome::Removed;
        }
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::super::testing::{annotation_set, persist, run, write};
    use super::super::Operation;
    use super::*;
    use crate::ast::AnnotationValue;
    use crate::config::EnrichConfig;
    use crate::printer::print_unit;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_predicate_descendant_gets_predicate_variant() {
        let dir = TempDir::new().unwrap();
        let path = write(
            dir.path(),
            "com/acme/WidgetRepository.java",
            "package com.acme;\n\npublic interface WidgetRepository extends CrudRepository<Widget, Long>, QuerydslPredicateExecutor<Widget> {\n}\n",
        );
        let config = EnrichConfig::default();
        let (outcome, ws) = run(Operation::BulkFind, &config, &path, Phase::Add);
        assert_eq!(outcome, Outcome::Applied);

        let find_all = ws.decl().methods().next().unwrap();
        assert_eq!(find_all.parameters[0].ty.render(), "Predicate");
        assert_eq!(find_all.return_type.render(), "Iterable<Widget>");
        assert!(find_all.has_annotation("jakarta.ws.rs.GET"));
        assert!(print_unit(&ws.unit).contains("import com.querydsl.core.types.Predicate;"));

        let operation = find_all.annotation("io.swagger.v3.oas.annotations.Operation").unwrap();
        assert_eq!(operation.arg("summary").and_then(|v| v.as_str()), Some("List Widgets"));
        let printed = print_unit(&ws.unit);
        assert!(printed.contains("array = @ArraySchema(schema = @Schema(implementation = Widget.class))"));
    }

    #[test]
    fn test_declared_pageable_variant_wins_over_synthesis() {
        let dir = TempDir::new().unwrap();
        let path = write(
            dir.path(),
            "com/acme/WidgetRepository.java",
            "package com.acme;\n\npublic interface WidgetRepository extends CrudRepository<Widget, Long> {\n\n    Page<Widget> findAll(Pageable pageable);\n}\n",
        );
        let config = EnrichConfig::default();
        let (outcome, ws) = run(Operation::BulkFind, &config, &path, Phase::Add);
        assert_eq!(outcome, Outcome::Applied);
        assert_eq!(ws.decl().methods().count(), 1);
        let find_all = ws.decl().methods().next().unwrap();
        assert_eq!(find_all.parameters[0].name, "pageable");
        assert!(find_all.has_annotation("jakarta.ws.rs.GET"));
    }

    #[test]
    fn test_directive_path_is_used_verbatim() {
        let dir = TempDir::new().unwrap();
        let path = write(
            dir.path(),
            "com/acme/WidgetRepository.java",
            "package com.acme;\n\npublic interface WidgetRepository extends CrudRepository<Widget, Long> {\n\n    @RestResource(path = \"everything\")\n    Iterable<Widget> findAll();\n}\n",
        );
        let config = EnrichConfig::default();
        let (_, ws) = run(Operation::BulkFind, &config, &path, Phase::Add);
        let find_all = ws.decl().methods().next().unwrap();
        let method_path = find_all.annotation("jakarta.ws.rs.Path").unwrap();
        assert_eq!(
            method_path.arg("value"),
            Some(&AnnotationValue::Str("everything".to_string()))
        );
    }

    #[test]
    fn test_bulk_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = write(
            dir.path(),
            "com/acme/WidgetRepository.java",
            "package com.acme;\n\npublic interface WidgetRepository extends CrudRepository<Widget, Long>, QuerydslPredicateExecutor<Widget> {\n}\n",
        );
        let config = EnrichConfig::default();
        let original = crate::parser::parse_file(&path).unwrap();

        let (_, ws) = run(Operation::BulkFind, &config, &path, Phase::Add);
        persist(&ws);
        let (_, again) = run(Operation::BulkFind, &config, &path, Phase::Add);
        assert_eq!(annotation_set(&again.unit), annotation_set(&ws.unit));

        let (outcome, ws) = run(Operation::BulkFind, &config, &path, Phase::Remove);
        assert_eq!(outcome, Outcome::Removed);
        assert_eq!(ws.unit.types, original.types);
        assert_eq!(ws.unit.imports, original.imports);
    }
}
