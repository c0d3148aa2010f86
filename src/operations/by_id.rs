//! @ai:module:intent Fetch-by-id and delete-by-id operations
//! @ai:module:layer application
//! @ai:module:stateless true

use super::{
    attach, bind_parameters, describe, ensure_type_path, generated, host, is_generated_leftover, strip,
    ByIdKind, Outcome, Phase, RepositoryContext, Workspace,
};
use crate::ast::{MethodDeclaration, Parameter, TypeRef};
use crate::config::BaseKind;
use crate::error::Result;
use crate::matcher::{signature_matches, Signature};
use crate::policy::ResourceConfig;
use crate::synthesis::{Binding, Response, SchemaRef, Verb};

fn method_name(kind: ByIdKind) -> &'static str {
    match kind {
        ByIdKind::Fetch => "findById",
        ByIdKind::Delete => "deleteById",
    }
}

/// @ai:intent Declaration synthesized on a direct CRUD descendant
/// @ai:example (Fetch, Widget, String) -> Optional<Widget> findById(String id)
fn shape(kind: ByIdKind, domain: &TypeRef, id: &TypeRef) -> MethodDeclaration {
    let return_type = match kind {
        ByIdKind::Fetch => TypeRef::generic(super::OPTIONAL, vec![domain.clone()]),
        ByIdKind::Delete => TypeRef::simple("void"),
    };
    generated(MethodDeclaration::new(
        method_name(kind),
        return_type,
        vec![Parameter::new("id", id.clone())],
    ))
}

pub(super) fn apply(kind: ByIdKind, ctx: &RepositoryContext<'_>, ws: &mut Workspace, phase: Phase) -> Result<Outcome> {
    let Some(id) = &ctx.id else {
        return Ok(Outcome::NotApplicable);
    };
    let signature = Signature::new(method_name(kind), &[id.simple_name()]);
    let direct = ctx.resolver.is_direct_descendant(ws.decl(), BaseKind::Crud);

    match phase {
        Phase::Add => add(kind, ctx, ws, &signature, direct, id),
        Phase::Remove => remove(kind, ctx, ws, &signature, direct, id),
    }
}

fn add(
    kind: ByIdKind,
    ctx: &RepositoryContext<'_>,
    ws: &mut Workspace,
    signature: &Signature,
    direct: bool,
    id: &TypeRef,
) -> Result<Outcome> {
    let found = ctx.matcher.find_closest_method(ws.decl(), &ws.unit, signature)?;
    let directive = ctx
        .matcher
        .find_closest_export_directive(ws.decl(), &ws.unit, signature)?;
    let config = ResourceConfig::resolve(directive.as_ref(), ctx.repo_annotation_required);
    if !config.exported {
        return Ok(Outcome::NotExported);
    }

    let synthesized = direct.then(|| shape(kind, &ctx.domain, id));
    let Some(member) = host(ws, found, synthesized) else {
        return Ok(Outcome::NotApplicable);
    };
    let root = ws.root;
    let Some(method) = ws.unit.types[root].method_at(member) else {
        return Ok(Outcome::NotApplicable);
    };

    let id_param = method
        .parameters
        .first()
        .map(|p| p.name.clone())
        .unwrap_or_else(|| "id".to_string());
    let domain = ctx.domain_simple();
    let (verb, default_summary, responses) = match kind {
        ByIdKind::Fetch => (
            Verb::Get,
            format!("Get a {} by id", domain),
            vec![
                Response::ok(Some(SchemaRef::Single(ctx.domain.clone()))),
                Response::not_found(),
            ],
        ),
        ByIdKind::Delete => (
            Verb::Delete,
            format!("Delete a {} by id", domain),
            vec![Response::no_content(), Response::not_found()],
        ),
    };
    let (summary, description) = describe(method, default_summary);
    let path = config.path.unwrap_or_else(|| format!("{{{}}}", id_param));

    let annotations = vec![
        ctx.synth.path(&path),
        ctx.synth.verb(verb),
        ctx.synth
            .operation(&summary, description.as_deref(), None, &responses),
    ];
    attach(&mut ws.unit, root, member, annotations);
    bind_parameters(ctx, &mut ws.unit, root, member, Binding::Path);
    ensure_type_path(ctx, &mut ws.unit, root);
    Ok(Outcome::Applied)
}

fn remove(
    kind: ByIdKind,
    ctx: &RepositoryContext<'_>,
    ws: &mut Workspace,
    signature: &Signature,
    direct: bool,
    id: &TypeRef,
) -> Result<Outcome> {
    let root = ws.root;
    let decl = ws.decl();
    let Some(member) = decl.position_of(|m| signature_matches(m, decl, signature)) else {
        return Ok(Outcome::Unchanged);
    };
    let Some(method) = ws.unit.types[root].method_at_mut(member) else {
        return Ok(Outcome::Unchanged);
    };

    let changed = strip(ctx, method);
    if direct && is_generated_leftover(method, &shape(kind, &ctx.domain, id)) {
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
    use super::super::testing::{annotation_set, load, persist, run, write};
    use super::super::{finish_remove, Operation};
    use super::*;
    use crate::config::EnrichConfig;
    use crate::printer::print_unit;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const WIDGETS: &str = "package com.acme;\n\npublic interface WidgetRepository extends PagingAndSortingRepository<Widget, String> {\n}\n";

    #[test]
    fn test_fetch_by_id_is_synthesized_on_direct_descendant() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "com/acme/WidgetRepository.java", WIDGETS);
        let config = EnrichConfig::default();

        let (outcome, ws) = run(Operation::ById(ByIdKind::Fetch), &config, &path, Phase::Add);
        assert_eq!(outcome, Outcome::Applied);

        let method = ws.decl().methods().next().unwrap();
        assert_eq!(method.name, "findById");
        assert_eq!(method.return_type.render(), "Optional<Widget>");
        assert_eq!(method.parameters[0].ty.render(), "String");
        assert_eq!(method.parameters[0].name, "id");
        assert!(method.has_annotation("jakarta.ws.rs.GET"));
        let path_param = method.parameters[0]
            .annotations
            .iter()
            .find(|a| a.is("jakarta.ws.rs.PathParam"))
            .unwrap();
        assert_eq!(path_param.arg("value").and_then(|v| v.as_str()), Some("id"));
        let parameter = method.parameters[0]
            .annotations
            .iter()
            .find(|a| a.is("io.swagger.v3.oas.annotations.Parameter"))
            .unwrap();
        assert_eq!(parameter.arg("required").and_then(|v| v.as_bool()), Some(true));

        let printed = print_unit(&ws.unit);
        assert!(printed.contains("@Path(\"widgets\")\npublic interface WidgetRepository"));
        assert!(printed.contains("@Path(\"{id}\")"));
        assert!(printed.contains("import java.util.Optional;"));
    }

    #[test]
    fn test_round_trip_and_idempotence() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "com/acme/WidgetRepository.java", WIDGETS);
        let config = EnrichConfig::default();
        let original = crate::parser::parse_file(&path).unwrap();

        for kind in [ByIdKind::Fetch, ByIdKind::Delete] {
            let (_, ws) = run(Operation::ById(kind), &config, &path, Phase::Add);
            persist(&ws);
        }
        let once = crate::parser::parse_file(&path).unwrap();

        let (ctx, mut ws) = load(&config, &path);
        for kind in [ByIdKind::Fetch, ByIdKind::Delete] {
            Operation::ById(kind).apply(&ctx, &mut ws, Phase::Add).unwrap();
        }
        assert_eq!(annotation_set(&ws.unit), annotation_set(&once));

        for kind in [ByIdKind::Fetch, ByIdKind::Delete] {
            assert_eq!(
                Operation::ById(kind).apply(&ctx, &mut ws, Phase::Remove).unwrap(),
                Outcome::Removed
            );
        }
        let root = ws.root;
        finish_remove(&ctx, &mut ws.unit, root);
        assert_eq!(ws.unit.types, original.types);
        assert_eq!(ws.unit.imports, original.imports);
    }

    #[test]
    fn test_user_method_is_kept_on_remove() {
        let dir = TempDir::new().unwrap();
        let path = write(
            dir.path(),
            "com/acme/WidgetRepository.java",
            "package com.acme;\n\npublic interface WidgetRepository extends CrudRepository<Widget, Long> {\n\n    /** Loads one widget. */\n    Optional<Widget> findById(Long id);\n}\n",
        );
        let config = EnrichConfig::default();
        let (_, ws) = run(Operation::ById(ByIdKind::Fetch), &config, &path, Phase::Add);
        let method = ws.decl().methods().next().unwrap();
        let operation = method.annotation("io.swagger.v3.oas.annotations.Operation").unwrap();
        assert_eq!(
            operation.arg("summary").and_then(|v| v.as_str()),
            Some("Loads one widget.")
        );
        persist(&ws);

        let (outcome, ws) = run(Operation::ById(ByIdKind::Fetch), &config, &path, Phase::Remove);
        assert_eq!(outcome, Outcome::Removed);
        let method = ws.decl().methods().next().unwrap();
        assert!(method.annotations.is_empty());
        assert!(method.doc.is_some());
    }

    #[test]
    fn test_bare_user_method_with_synthesized_shape_survives_remove() {
        let dir = TempDir::new().unwrap();
        let path = write(
            dir.path(),
            "com/acme/WidgetRepository.java",
            "package com.acme;\n\nimport java.util.Optional;\n\npublic interface WidgetRepository extends PagingAndSortingRepository<Widget, String> {\n\n    Optional<Widget> findById(String id);\n}\n",
        );
        let config = EnrichConfig::default();
        let (outcome, ws) = run(Operation::ById(ByIdKind::Fetch), &config, &path, Phase::Add);
        assert_eq!(outcome, Outcome::Applied);
        assert!(ws.decl().methods().next().unwrap().comments.is_empty());
        persist(&ws);

        let (outcome, ws) = run(Operation::ById(ByIdKind::Fetch), &config, &path, Phase::Remove);
        assert_eq!(outcome, Outcome::Removed);
        let methods: Vec<_> = ws.decl().methods().collect();
        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].name, "findById");
        assert!(methods[0].annotations.is_empty());
    }

    #[test]
    fn test_synthesized_method_carries_marker_through_disk() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "com/acme/WidgetRepository.java", WIDGETS);
        let config = EnrichConfig::default();
        let (_, ws) = run(Operation::ById(ByIdKind::Fetch), &config, &path, Phase::Add);
        persist(&ws);

        let reloaded = crate::parser::parse_file(&path).unwrap();
        let method = reloaded.types[0].methods().next().unwrap();
        assert_eq!(method.comments, vec![super::super::GENERATED_MARKER.to_string()]);

        let (_, ws) = run(Operation::ById(ByIdKind::Fetch), &config, &path, Phase::Remove);
        assert_eq!(ws.decl().methods().count(), 0);
    }

    #[test]
    fn test_export_suppression_leaves_declaration_untouched() {
        let dir = TempDir::new().unwrap();
        let path = write(
            dir.path(),
            "com/acme/WidgetRepository.java",
            "package com.acme;\n\npublic interface WidgetRepository extends CrudRepository<Widget, Long> {\n\n    @RestResource(exported = false)\n    void deleteById(Long id);\n}\n",
        );
        let config = EnrichConfig::default();
        let before = crate::parser::parse_file(&path).unwrap();
        let (outcome, ws) = run(Operation::ById(ByIdKind::Delete), &config, &path, Phase::Add);
        assert_eq!(outcome, Outcome::NotExported);
        assert_eq!(ws.unit, before);
    }
}
