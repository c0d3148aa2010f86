//! @ai:module:intent Create operation hosted on a save-shaped method
//! @ai:module:layer application
//! @ai:module:stateless true

use super::{
    attach, describe, ensure_type_path, generated, host, is_generated_leftover, strip, Outcome, Phase,
    RepositoryContext, Workspace,
};
use crate::ast::{MethodDeclaration, Parameter, TypeRef};
use crate::config::BaseKind;
use crate::error::Result;
use crate::matcher::{signature_matches, Signature};
use crate::policy::ResourceConfig;
use crate::synthesis::{Response, SchemaRef, Verb};
use tracing::debug;

fn shape(domain: &TypeRef) -> MethodDeclaration {
    generated(MethodDeclaration::new(
        "save",
        domain.clone(),
        vec![Parameter::new("entity", domain.clone())],
    ))
}

pub(super) fn apply(ctx: &RepositoryContext<'_>, ws: &mut Workspace, phase: Phase) -> Result<Outcome> {
    let signature = Signature::new("save", &[ctx.domain_simple()]);
    let direct = ctx.resolver.is_direct_descendant(ws.decl(), BaseKind::Crud);
    match phase {
        Phase::Add => add(ctx, ws, &signature, direct),
        Phase::Remove => remove(ctx, ws, &signature, direct),
    }
}

fn add(ctx: &RepositoryContext<'_>, ws: &mut Workspace, signature: &Signature, direct: bool) -> Result<Outcome> {
    let found = ctx.matcher.find_closest_method(ws.decl(), &ws.unit, signature)?;
    if found
        .as_ref()
        .is_some_and(|f| f.method.has_annotation(&ctx.config.directives.hidden))
    {
        debug!("save is hidden, skipping create");
        return Ok(Outcome::NotExported);
    }

    let directive = ctx
        .matcher
        .find_closest_export_directive(ws.decl(), &ws.unit, signature)?;
    let config = ResourceConfig::resolve(directive.as_ref(), ctx.repo_annotation_required);
    if !config.exported {
        return Ok(Outcome::NotExported);
    }

    let Some(member) = host(ws, found, direct.then(|| shape(&ctx.domain))) else {
        return Ok(Outcome::NotApplicable);
    };
    let root = ws.root;
    let Some(method) = ws.unit.types[root].method_at(member) else {
        return Ok(Outcome::NotApplicable);
    };

    let (summary, description) = describe(method, format!("Create a {}", ctx.domain_simple()));
    let mut annotations = Vec::new();
    if let Some(path) = &config.path {
        annotations.push(ctx.synth.path(path));
    }
    annotations.push(ctx.synth.verb(Verb::Post));
    annotations.push(ctx.synth.operation(
        &summary,
        description.as_deref(),
        Some(&ctx.domain),
        &[Response::created(SchemaRef::Single(ctx.domain.clone()))],
    ));
    attach(&mut ws.unit, root, member, annotations);
    ensure_type_path(ctx, &mut ws.unit, root);
    Ok(Outcome::Applied)
}

fn remove(ctx: &RepositoryContext<'_>, ws: &mut Workspace, signature: &Signature, direct: bool) -> Result<Outcome> {
    let root = ws.root;
    let decl = ws.decl();
    let Some(member) = decl.position_of(|m| signature_matches(m, decl, signature)) else {
        return Ok(Outcome::Unchanged);
    };
    let Some(method) = ws.unit.types[root].method_at_mut(member) else {
        return Ok(Outcome::Unchanged);
    };

    let changed = strip(ctx, method);
    if direct && is_generated_leftover(method, &shape(&ctx.domain)) {
        ws.unit.types[root].members.remove(member);
        return Ok(Outcome::Removed);
    }
    Ok(if changed {
        Outcome::Removed
    } else {
        Outcome::Unchanged
    })
}

#[cfg(test)]
mod tests {
    use super::super::testing::{annotation_set, persist, run, write};
    use super::super::Operation;
    use super::*;
    use crate::ast::AnnotationValue;
    use crate::config::EnrichConfig;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_create_synthesizes_save_with_request_body() {
        let dir = TempDir::new().unwrap();
        let path = write(
            dir.path(),
            "com/acme/repo/WidgetRepository.java",
            "package com.acme.repo;\n\nimport com.acme.model.Widget;\n\npublic interface WidgetRepository extends CrudRepository<Widget, Long> {\n}\n",
        );
        let config = EnrichConfig::default();
        let (outcome, ws) = run(Operation::Create, &config, &path, Phase::Add);
        assert_eq!(outcome, Outcome::Applied);

        let save = ws.decl().methods().next().unwrap();
        assert_eq!(save.return_type.render(), "Widget");
        assert!(save.has_annotation("jakarta.ws.rs.POST"));
        let operation = save.annotation("io.swagger.v3.oas.annotations.Operation").unwrap();
        assert_eq!(operation.arg("summary").and_then(|v| v.as_str()), Some("Create a Widget"));
        assert!(matches!(operation.arg("requestBody"), Some(AnnotationValue::Annotation(_))));
        let Some(AnnotationValue::Array(responses)) = operation.arg("responses") else {
            panic!("responses missing");
        };
        let Some(AnnotationValue::Annotation(created)) = responses.first() else {
            panic!("response missing");
        };
        assert_eq!(created.arg("responseCode").and_then(|v| v.as_str()), Some("201"));
    }

    #[test]
    fn test_hidden_save_is_skipped() {
        let dir = TempDir::new().unwrap();
        let path = write(
            dir.path(),
            "com/acme/WidgetRepository.java",
            "package com.acme;\n\nimport io.swagger.v3.oas.annotations.Hidden;\n\npublic interface WidgetRepository extends CrudRepository<Widget, Long> {\n\n    @Hidden\n    Widget save(Widget entity);\n}\n",
        );
        let config = EnrichConfig::default();
        let before = crate::parser::parse_file(&path).unwrap();
        let (outcome, ws) = run(Operation::Create, &config, &path, Phase::Add);
        assert_eq!(outcome, Outcome::NotExported);
        assert_eq!(ws.unit, before);
    }

    #[test]
    fn test_create_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = write(
            dir.path(),
            "com/acme/WidgetRepository.java",
            "package com.acme;\n\npublic interface WidgetRepository extends CrudRepository<Widget, Long> {\n\n    List<Widget> findByColor(String color);\n}\n",
        );
        let config = EnrichConfig::default();
        let original = crate::parser::parse_file(&path).unwrap();

        let (_, ws) = run(Operation::Create, &config, &path, Phase::Add);
        persist(&ws);
        let (_, again) = run(Operation::Create, &config, &path, Phase::Add);
        assert_eq!(annotation_set(&again.unit), annotation_set(&ws.unit));

        let (outcome, ws) = run(Operation::Create, &config, &path, Phase::Remove);
        assert_eq!(outcome, Outcome::Removed);
        assert_eq!(ws.unit.types, original.types);
        assert_eq!(ws.unit.imports, original.imports);
    }
}
