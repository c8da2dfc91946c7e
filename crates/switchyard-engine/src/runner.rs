use chrono::Utc;
use tracing::{debug, info, warn};

use switchyard_core::context::{latest_output_or_input, Context};
use switchyard_core::error::{Result, SwitchyardError};
use switchyard_core::event::{EventSink, PlanEvent};
use switchyard_core::record::ExecutionRecord;
use switchyard_core::traits::Step;

use crate::plan::{NodeId, Plan};

/// Interprets a [`Plan`] against a [`Context`].
///
/// Steps run strictly one after another. Each step receives the output of
/// the most recent step that produced one, falling back to the context's
/// original input. Routers select the next node from their branch table;
/// actions continue to their chained successor or end the run.
#[derive(Debug, Clone, Copy, Default)]
pub struct Runner;

impl Runner {
    pub fn new() -> Self {
        Self
    }

    /// Execute `plan` to completion, mutating `ctx` in place.
    ///
    /// On failure the context keeps the records of the steps that ran before
    /// the error; the error itself is returned to the caller.
    pub async fn execute(&self, ctx: &mut Context, plan: &Plan, sink: &dyn EventSink) -> Result<()> {
        let run_id = ctx.run_id().clone();
        info!(run_id = %run_id, root = %plan.root().key(), "Plan run started");
        sink.emit(PlanEvent::RunStarted {
            run_id: run_id.clone(),
            input: ctx.input().clone(),
        });

        match self.walk(ctx, plan, sink).await {
            Ok(()) => {
                info!(run_id = %run_id, steps = ctx.records().len(), "Plan run completed");
                sink.emit(PlanEvent::RunCompleted {
                    run_id,
                    steps: ctx.records().len(),
                });
                Ok(())
            }
            Err(e) => {
                warn!(run_id = %run_id, error = %e, "Plan run failed");
                sink.emit(PlanEvent::RunFailed {
                    run_id,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn walk(&self, ctx: &mut Context, plan: &Plan, sink: &dyn EventSink) -> Result<()> {
        let mut current = Some(plan.root_id());

        while let Some(id) = current {
            current = self.step(ctx, plan, id, sink).await?;
        }

        Ok(())
    }

    /// Run one node and return the node to continue with.
    async fn step(
        &self,
        ctx: &mut Context,
        plan: &Plan,
        id: NodeId,
        sink: &dyn EventSink,
    ) -> Result<Option<NodeId>> {
        let step = plan
            .node(id)
            .map(|n| n.step())
            .ok_or_else(|| SwitchyardError::step(id.to_string(), "node not found in plan"))?;
        let input = latest_output_or_input(ctx).clone();

        sink.emit(PlanEvent::StepStarted {
            run_id: ctx.run_id().clone(),
            step: step.name().to_string(),
            kind: step.kind(),
        });

        match step {
            Step::Router(router) => {
                debug!(step = %router.name(), node = %id, "Executing router step");

                let started_at = Utc::now();
                let route_key = match router.decide(&input, ctx).await? {
                    Some(key) if !key.trim().is_empty() => key,
                    _ => return Err(SwitchyardError::UndeterminedRoute(router.name().to_string())),
                };
                let finished_at = Utc::now();

                debug!(step = %router.name(), route_key = %route_key, "Router step determined route key");

                ctx.set_route_key(route_key.clone());
                ctx.push_record(ExecutionRecord::routed(
                    router.name(),
                    started_at,
                    finished_at,
                    input,
                    route_key.clone(),
                ));
                sink.emit(PlanEvent::RouteDecided {
                    run_id: ctx.run_id().clone(),
                    step: router.name().to_string(),
                    route_key: route_key.clone(),
                });

                let branches = plan
                    .branches(id)
                    .filter(|b| !b.is_empty())
                    .ok_or_else(|| SwitchyardError::RouterHasNoBranches(router.name().to_string()))?;

                let next = branches.get(&route_key).copied().ok_or_else(|| {
                    SwitchyardError::UnmatchedRouteKey {
                        router: router.name().to_string(),
                        route_key,
                    }
                })?;

                Ok(Some(next))
            }
            Step::Action(action) => {
                debug!(step = %action.name(), node = %id, "Executing action step");

                let started_at = Utc::now();
                let output = action.act(&input, ctx).await?.filter(|v| !v.is_null());
                let finished_at = Utc::now();

                let has_output = output.is_some();
                ctx.set_output(output.clone());
                ctx.push_record(ExecutionRecord::acted(
                    action.name(),
                    started_at,
                    finished_at,
                    input,
                    output,
                ));
                sink.emit(PlanEvent::ActionCompleted {
                    run_id: ctx.run_id().clone(),
                    step: action.name().to_string(),
                    has_output,
                });

                Ok(plan.next(id))
            }
        }
    }
}
