//! @ai:module:intent Replace and partial update, hosted on the custom companion
//! @ai:module:layer application
//! @ai:module:stateless true

use super::{
    attach, describe, ensure_type_path, generated, is_generated_leftover, push_localized, strip, Outcome,
    Phase, RepositoryContext, UpdateKind, Workspace,
};
use crate::ast::{MethodDeclaration, Parameter, TypeRef};
use crate::error::Result;
use crate::matcher::{signature_matches, Signature};
use crate::policy::ResourceConfig;
use crate::synthesis::{Response, SchemaRef, Verb};
use tracing::debug;

/// Body of a synthesized companion default method.
const PASS_THROUGH_BODY: &str = "{\n    return entity;\n}";

fn method_name(kind: UpdateKind) -> &'static str {
    match kind {
        UpdateKind::Put => "update",
        UpdateKind::Patch => "patch",
    }
}

/// @ai:intent No-op default method synthesized on the companion
/// @ai:example (Put, Widget) -> default Widget update(Widget entity) { return entity; }
fn shape(kind: UpdateKind, domain: &TypeRef) -> MethodDeclaration {
    let mut method = MethodDeclaration::new(
        method_name(kind),
        domain.clone(),
        vec![Parameter::new("entity", domain.clone())],
    );
    method.modifiers = vec!["default".to_string()];
    method.body = Some(PASS_THROUGH_BODY.to_string());
    generated(method)
}

pub(super) fn apply(kind: UpdateKind, ctx: &RepositoryContext<'_>, ws: &mut Workspace, phase: Phase) -> Result<Outcome> {
    let signature = Signature::new(method_name(kind), &[ctx.domain_simple()]);
    match phase {
        Phase::Add => add(kind, ctx, ws, &signature),
        Phase::Remove => remove(kind, ctx, ws, &signature),
    }
}

fn add(kind: UpdateKind, ctx: &RepositoryContext<'_>, ws: &mut Workspace, signature: &Signature) -> Result<Outcome> {
    if kind == UpdateKind::Put && ctx.config.policy.suppress_put {
        debug!("PUT synthesis suppressed");
        return Ok(Outcome::NotApplicable);
    }

    // A companion created earlier in this pass is not on disk yet.
    let pending = ws.companion.as_ref().and_then(|companion| {
        let decl = companion.decl();
        decl.methods()
            .find(|m| signature_matches(m, decl, signature))
            .cloned()
    });
    let declared = match pending {
        Some(method) => method,
        None => match ctx.matcher.find_closest_method(ws.decl(), &ws.unit, signature)? {
            Some(found) => found.method,
            None => return Ok(Outcome::NotApplicable),
        },
    };

    let directive = match declared.annotation(&ctx.config.directives.method) {
        Some(directive) => Some(directive.clone()),
        None => ctx
            .matcher
            .find_closest_export_directive(ws.decl(), &ws.unit, signature)?,
    };
    let config = ResourceConfig::resolve_custom(directive.as_ref(), ctx.repo_annotation_required);
    if !config.exported {
        return Ok(Outcome::NotExported);
    }

    let Some(companion) = ws.companion(ctx, true)? else {
        debug!("no companion could be placed, skipping update");
        return Ok(Outcome::NotApplicable);
    };
    let index = companion.index;
    let decl = companion.decl();
    let (member, synthesized) = match decl.position_of(|m| signature_matches(m, decl, signature)) {
        Some(member) => (member, false),
        None => (
            push_localized(&mut companion.unit, index, shape(kind, &ctx.domain)),
            true,
        ),
    };

    let (verb, default_summary) = match kind {
        UpdateKind::Put => (Verb::Put, format!("Replace a {}", ctx.domain_simple())),
        UpdateKind::Patch => (Verb::Patch, format!("Patch a {}", ctx.domain_simple())),
    };
    let (summary, description) = describe(&declared, default_summary);
    let mut annotations = Vec::new();
    if let Some(path) = &config.path {
        annotations.push(ctx.synth.path(path));
    }
    annotations.push(ctx.synth.verb(verb));
    annotations.push(ctx.synth.operation(
        &summary,
        description.as_deref(),
        Some(&ctx.domain),
        &[
            Response::no_content(),
            Response::ok(Some(SchemaRef::Single(ctx.domain.clone()))),
        ],
    ));

    let mut changed = synthesized;
    changed |= attach(&mut companion.unit, index, member, annotations);
    changed |= ensure_type_path(ctx, &mut companion.unit, index);
    companion.modified |= changed;
    Ok(Outcome::Applied)
}

fn remove(kind: UpdateKind, ctx: &RepositoryContext<'_>, ws: &mut Workspace, signature: &Signature) -> Result<Outcome> {
    let Some(companion) = ws.companion(ctx, false)? else {
        return Ok(Outcome::Unchanged);
    };
    let index = companion.index;
    let decl = companion.decl();
    let Some(member) = decl.position_of(|m| signature_matches(m, decl, signature)) else {
        return Ok(Outcome::Unchanged);
    };
    let Some(method) = companion.unit.types[index].method_at_mut(member) else {
        return Ok(Outcome::Unchanged);
    };

    let mut changed = strip(ctx, method);
    if is_generated_leftover(method, &shape(kind, &ctx.domain)) {
        companion.unit.types[index].members.remove(member);
        changed = true;
    }

    companion.modified |= changed;
    Ok(if changed {
        Outcome::Removed
    } else {
        Outcome::Unchanged
    })
}
