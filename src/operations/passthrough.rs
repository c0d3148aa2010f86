//! @ai:module:intent Operation metadata for hand-written companion endpoints
//! @ai:module:layer application
//! @ai:module:stateless true

use super::{attach, describe, Outcome, Phase, RepositoryContext, Workspace};
use crate::ast::{remove_all, Member, MethodDeclaration};
use crate::error::Result;
use crate::policy::ResourceConfig;
use crate::synthesis::{humanize, Response};
use tracing::debug;

/// Companion methods owned by the update operations.
const UPDATE_METHODS: [&str; 2] = ["update", "patch"];

fn is_update(ctx: &RepositoryContext<'_>, method: &MethodDeclaration) -> bool {
    UPDATE_METHODS.contains(&method.name.as_str())
        && method.parameters.len() == 1
        && method.parameters[0].ty.simple_name() == ctx.domain_simple()
}

/// @ai:intent Check that a method already declares its own verb
fn is_routed(ctx: &RepositoryContext<'_>, method: &MethodDeclaration) -> bool {
    ctx.config
        .annotations
        .verbs()
        .iter()
        .any(|verb| method.has_annotation(verb))
}

pub(super) fn apply(ctx: &RepositoryContext<'_>, ws: &mut Workspace, phase: Phase) -> Result<Outcome> {
    let Some(companion) = ws.companion(ctx, false)? else {
        return Ok(match phase {
            Phase::Add => Outcome::NotApplicable,
            Phase::Remove => Outcome::Unchanged,
        });
    };
    let index = companion.index;
    let operation_class = ctx.config.annotations.operation.as_str();

    match phase {
        Phase::Add => {
            let mut planned = Vec::new();
            let mut outcome = Outcome::NotApplicable;
            for (member, method) in companion.decl().members.iter().enumerate().filter_map(|(i, m)| match m {
                Member::Method(method) => Some((i, method)),
                _ => None,
            }) {
                if is_update(ctx, method) || !is_routed(ctx, method) || method.has_annotation(operation_class) {
                    continue;
                }
                let directive = method.annotation(&ctx.config.directives.method);
                let config = ResourceConfig::resolve_custom(directive, ctx.repo_annotation_required);
                if !config.exported || method.has_annotation(&ctx.config.directives.hidden) {
                    debug!(method = %method.name, "passthrough method not exported");
                    outcome = Outcome::NotExported;
                    continue;
                }
                let (summary, description) = describe(method, humanize(&method.name));
                let operation = ctx.synth.operation(
                    &summary,
                    description.as_deref(),
                    None,
                    &[Response::for_return(&method.return_type)],
                );
                planned.push((member, operation));
            }

            if !planned.is_empty() {
                outcome = Outcome::Applied;
            }
            for (member, operation) in planned {
                companion.modified |= attach(&mut companion.unit, index, member, vec![operation]);
            }
            Ok(outcome)
        }
        Phase::Remove => {
            let mut changed = false;
            for method in companion.unit.types[index].methods_mut() {
                if !is_update(ctx, method) && is_routed(ctx, method) {
                    changed |= remove_all(&mut method.annotations, &[operation_class]);
                }
            }
            companion.modified |= changed;
            Ok(if changed {
                Outcome::Removed
            } else {
                Outcome::Unchanged
            })
        }
    }
}
