//! Dispatch phase: every live actor acts once, in creation order.
//!
//! Each yielded action runs against the world immediately, so later actors
//! see the effects of earlier ones within the same turn.

use crate::components::entity::EntityId;
use crate::events::turn::SimEvent;
use crate::resources::script_runtime::{ActionReply, ScriptScheduler, ScriptStep};
use crate::resources::simworld::SimWorld;
use crate::resources::terrain::TerrainProvider;
use crate::systems::{actions, physics};
use log::{debug, info, warn};

pub fn dispatch_actions(
    world: &mut SimWorld,
    terrain: &dyn TerrainProvider,
    scheduler: &mut ScriptScheduler,
    events: &mut Vec<SimEvent>,
) {
    for actor in scheduler.actors() {
        if !world.contains(actor) || !scheduler.has_more_actions(actor) {
            continue;
        }
        match scheduler.resume(actor) {
            ScriptStep::Action(request) => match actions::execute(world, terrain, actor, &request) {
                Ok(reply) => {
                    let success = !matches!(reply, ActionReply::Done(false));
                    scheduler.deliver(actor, reply);
                    events.push(SimEvent::ActionPerformed {
                        actor,
                        action: request.name(),
                        success,
                    });
                }
                Err(err) => fault_actor(world, scheduler, actor, err.to_string(), events),
            },
            ScriptStep::AutoYield => {
                debug!("{} used its instruction budget without acting", actor);
                events.push(SimEvent::AutoYielded { actor });
            }
            ScriptStep::Finished => {
                info!("{} finished its script", label(world, actor));
                events.push(SimEvent::ScriptFinished { actor });
            }
            ScriptStep::Faulted(reason) => fault_actor(world, scheduler, actor, reason, events),
        }
    }
}

fn label(world: &SimWorld, actor: EntityId) -> String {
    world
        .get(actor)
        .map(|e| e.name.clone())
        .unwrap_or_else(|| actor.to_string())
}

/// Stops `actor` and drops whatever it carries.
fn fault_actor(
    world: &mut SimWorld,
    scheduler: &mut ScriptScheduler,
    actor: EntityId,
    reason: String,
    events: &mut Vec<SimEvent>,
) {
    warn!("{} faulted: {}", label(world, actor), reason);
    scheduler.fault(actor);
    physics::release(world, actor);
    events.push(SimEvent::ActorFaulted { actor, reason });
}
