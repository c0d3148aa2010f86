//! @ai:module:intent Custom finders and removers exposed under search/
//! @ai:module:layer application
//! @ai:module:stateless true

use super::{
    attach, bind_parameters, describe, ensure_type_path, host, strip, Outcome, Phase,
    RepositoryContext, SearchKind, Workspace,
};
use crate::ast::MethodDeclaration;
use crate::error::Result;
use crate::matcher::{FoundMethod, Signature};
use crate::policy::ResourceConfig;
use crate::synthesis::{humanize, Binding, Response, Verb};
use regex::Regex;
use tracing::debug;

fn pattern<'r>(kind: SearchKind, ctx: &'r RepositoryContext<'_>) -> &'r Regex {
    match kind {
        SearchKind::Finder => &ctx.finder,
        SearchKind::Remover => &ctx.remover,
    }
}

/// @ai:intent Check a method name against the kind's prefix rule and the reserved list
fn is_candidate(kind: SearchKind, ctx: &RepositoryContext<'_>, method: &MethodDeclaration) -> bool {
    pattern(kind, ctx).is_match(&method.name) && !ctx.config.is_reserved(&method.name)
}

pub(super) fn apply(kind: SearchKind, ctx: &RepositoryContext<'_>, ws: &mut Workspace, phase: Phase) -> Result<Outcome> {
    match phase {
        Phase::Add => add(kind, ctx, ws),
        Phase::Remove => Ok(remove(kind, ctx, ws)),
    }
}

fn add(kind: SearchKind, ctx: &RepositoryContext<'_>, ws: &mut Workspace) -> Result<Outcome> {
    let candidates: Vec<FoundMethod> = ctx
        .matcher
        .hierarchy_methods(ws.decl(), &ws.unit)?
        .into_iter()
        .filter(|found| is_candidate(kind, ctx, &found.method))
        .collect();

    let mut outcome = Outcome::NotApplicable;
    for found in candidates {
        let next = add_one(kind, ctx, ws, found)?;
        outcome = match (outcome, next) {
            (Outcome::Applied, _) | (_, Outcome::Applied) => Outcome::Applied,
            (_, next) => next,
        };
    }
    Ok(outcome)
}

fn add_one(kind: SearchKind, ctx: &RepositoryContext<'_>, ws: &mut Workspace, found: FoundMethod) -> Result<Outcome> {
    let signature = Signature::of(&found.method);
    let directive = ctx
        .matcher
        .find_closest_export_directive(ws.decl(), &ws.unit, &signature)?;
    let config = ResourceConfig::resolve_custom(directive.as_ref(), ctx.repo_annotation_required);
    if !config.exported {
        debug!(method = %found.method.name, "search method not exported");
        return Ok(Outcome::NotExported);
    }

    let Some(member) = host(ws, Some(found), None) else {
        return Ok(Outcome::NotApplicable);
    };
    let root = ws.root;
    let Some(method) = ws.unit.types[root].method_at(member) else {
        return Ok(Outcome::NotApplicable);
    };

    let (verb, response) = match kind {
        SearchKind::Finder => (Verb::Get, Response::for_return(&method.return_type)),
        SearchKind::Remover => (Verb::Delete, Response::no_content()),
    };
    let (summary, description) = describe(method, humanize(&method.name));
    let path = format!("search/{}", config.path.as_deref().unwrap_or(&method.name));

    let annotations = vec![
        ctx.synth.path(&path),
        ctx.synth.verb(verb),
        ctx.synth
            .operation(&summary, description.as_deref(), None, &[response]),
    ];
    attach(&mut ws.unit, root, member, annotations);
    bind_parameters(ctx, &mut ws.unit, root, member, Binding::Query);
    ensure_type_path(ctx, &mut ws.unit, root);
    Ok(Outcome::Applied)
}

/// Copied-down declarations stay on the repository; only annotations go.
fn remove(kind: SearchKind, ctx: &RepositoryContext<'_>, ws: &mut Workspace) -> Outcome {
    let root = ws.root;
    let mut outcome = Outcome::Unchanged;
    for method in ws.unit.types[root].methods_mut() {
        if is_candidate(kind, ctx, method) && strip(ctx, method) {
            outcome = Outcome::Removed;
        }
    }
    outcome
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

    const FINDER: Operation = Operation::Search(SearchKind::Finder);
    const REMOVER: Operation = Operation::Search(SearchKind::Remover);

    #[test]
    fn test_find_by_color_scenario() {
        let dir = TempDir::new().unwrap();
        let path = write(
            dir.path(),
            "com/acme/WidgetRepository.java",
            "package com.acme;\n\nimport java.util.List;\n\npublic interface WidgetRepository extends CrudRepository<Widget, Long> {\n\n    List<Widget> findByColor(String color);\n\n    Optional<Widget> findById(Long id);\n}\n",
        );
        let config = EnrichConfig::default();
        let (outcome, ws) = run(FINDER, &config, &path, Phase::Add);
        assert_eq!(outcome, Outcome::Applied);

        let finder = ws.decl().methods().find(|m| m.name == "findByColor").unwrap();
        assert_eq!(
            finder.annotation("jakarta.ws.rs.Path").and_then(|a| a.arg("value")),
            Some(&AnnotationValue::Str("search/findByColor".to_string()))
        );
        assert!(finder.has_annotation("jakarta.ws.rs.GET"));
        let color = &finder.parameters[0];
        let query = color
            .annotations
            .iter()
            .find(|a| a.is("jakarta.ws.rs.QueryParam"))
            .unwrap();
        assert_eq!(query.arg("value").and_then(|v| v.as_str()), Some("color"));
        assert!(color
            .annotations
            .iter()
            .any(|a| a.is("io.swagger.v3.oas.annotations.Parameter")
                && a.arg("required").and_then(|v| v.as_bool()) == Some(true)));

        let operation = finder.annotation("io.swagger.v3.oas.annotations.Operation").unwrap();
        assert_eq!(operation.arg("summary").and_then(|v| v.as_str()), Some("Find by color"));
        let printed = crate::printer::print_unit(&ws.unit);
        assert!(printed.contains("responseCode = \"200\""));
        assert!(printed.contains("array = @ArraySchema(schema = @Schema(implementation = Widget.class))"));

        let by_id = ws.decl().methods().find(|m| m.name == "findById").unwrap();
        assert!(by_id.annotations.is_empty());
    }

    #[test]
    fn test_inherited_finder_is_copied_down_with_param_rename() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "com/acme/base/OwnedRepository.java",
            "package com.acme.base;\n\nimport java.util.List;\n\npublic interface OwnedRepository<T> extends CrudRepository<T, Long> {\n\n    /**\n     * Everything someone owns.\n     *\n     * @param owner login of the owner\n     */\n    List<T> findAllByOwner(@Param(\"login\") String owner);\n}\n",
        );
        let path = write(
            dir.path(),
            "com/acme/repo/WidgetRepository.java",
            "package com.acme.repo;\n\nimport com.acme.base.OwnedRepository;\nimport com.acme.model.Widget;\n\npublic interface WidgetRepository extends OwnedRepository<Widget> {\n}\n",
        );
        let config = EnrichConfig::default();
        let (outcome, ws) = run(FINDER, &config, &path, Phase::Add);
        assert_eq!(outcome, Outcome::Applied);

        let copy = ws.decl().methods().find(|m| m.name == "findAllByOwner").unwrap();
        assert_eq!(copy.return_type.render(), "List<Widget>");
        let operation = copy.annotation("io.swagger.v3.oas.annotations.Operation").unwrap();
        assert_eq!(
            operation.arg("summary").and_then(|v| v.as_str()),
            Some("Everything someone owns.")
        );
        let owner = &copy.parameters[0];
        let query = owner
            .annotations
            .iter()
            .find(|a| a.is("jakarta.ws.rs.QueryParam"))
            .unwrap();
        assert_eq!(query.arg("value").and_then(|v| v.as_str()), Some("login"));
        let parameter = owner
            .annotations
            .iter()
            .find(|a| a.is("io.swagger.v3.oas.annotations.Parameter"))
            .unwrap();
        assert_eq!(
            parameter.arg("description").and_then(|v| v.as_str()),
            Some("login of the owner")
        );
    }

    #[test]
    fn test_remover_uses_override_path_and_no_content() {
        let dir = TempDir::new().unwrap();
        let path = write(
            dir.path(),
            "com/acme/WidgetRepository.java",
            "package com.acme;\n\npublic interface WidgetRepository extends CrudRepository<Widget, Long> {\n\n    @RestResource(path = \"purge\")\n    long deleteByColor(String color);\n}\n",
        );
        let config = EnrichConfig::default();
        let (outcome, ws) = run(REMOVER, &config, &path, Phase::Add);
        assert_eq!(outcome, Outcome::Applied);

        let remover = ws.decl().methods().next().unwrap();
        assert!(remover.has_annotation("jakarta.ws.rs.DELETE"));
        assert_eq!(
            remover.annotation("jakarta.ws.rs.Path").and_then(|a| a.arg("value")),
            Some(&AnnotationValue::Str("search/purge".to_string()))
        );
        let printed = crate::printer::print_unit(&ws.unit);
        assert!(printed.contains("responseCode = \"204\""));
        assert!(!printed.contains("responseCode = \"200\""));
    }

    #[test]
    fn test_plain_repository_requires_opt_in() {
        let dir = TempDir::new().unwrap();
        let path = write(
            dir.path(),
            "com/acme/WidgetRepository.java",
            "package com.acme;\n\npublic interface WidgetRepository extends Repository<Widget, Long> {\n\n    List<Widget> findByColor(String color);\n\n    @RestResource\n    List<Widget> findBySize(int size);\n}\n",
        );
        let config = EnrichConfig::default();
        let (outcome, ws) = run(FINDER, &config, &path, Phase::Add);
        assert_eq!(outcome, Outcome::Applied);

        let by_color = ws.decl().methods().find(|m| m.name == "findByColor").unwrap();
        assert!(by_color.annotations.is_empty());
        let by_size = ws.decl().methods().find(|m| m.name == "findBySize").unwrap();
        assert!(by_size.has_annotation("jakarta.ws.rs.GET"));
    }

    #[test]
    fn test_search_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = write(
            dir.path(),
            "com/acme/WidgetRepository.java",
            "package com.acme;\n\nimport java.util.List;\n\npublic interface WidgetRepository extends CrudRepository<Widget, Long> {\n\n    /** Widgets in one color. */\n    List<Widget> findByColor(String color);\n\n    void removeByColor(String color);\n}\n",
        );
        let config = EnrichConfig::default();
        let original = crate::parser::parse_file(&path).unwrap();

        for op in [FINDER, REMOVER] {
            let (_, ws) = run(op, &config, &path, Phase::Add);
            persist(&ws);
        }
        let once = crate::parser::parse_file(&path).unwrap();
        for op in [FINDER, REMOVER] {
            let (_, ws) = run(op, &config, &path, Phase::Add);
            assert_eq!(annotation_set(&ws.unit), annotation_set(&once));
        }

        for op in [FINDER, REMOVER] {
            let (outcome, ws) = run(op, &config, &path, Phase::Remove);
            assert_eq!(outcome, Outcome::Removed);
            persist(&ws);
        }
        let restored = crate::parser::parse_file(&path).unwrap();
        assert_eq!(restored.types, original.types);
        assert_eq!(restored.imports, original.imports);
    }
}
