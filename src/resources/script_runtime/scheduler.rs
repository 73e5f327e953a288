//! Cooperative scheduler over actor scripts.
//!
//! The scheduler owns one [`ActorScript`] per actor, keyed by entity id so
//! that iteration follows creation order. It remembers the reply to each
//! actor's last action and hands it back on the next resume.

use super::commands::{ActionReply, ScriptRunState, ScriptStep};
use super::runtime::ScriptRuntime;
use crate::components::entity::EntityId;
use crate::error::SimError;
use log::debug;
use std::collections::BTreeMap;

/// A suspend/resume unit that yields exactly once per primitive action.
pub trait ActorScript {
    fn label(&self) -> &str;

    /// Rewinds to the entry point and resets the script's globals.
    fn start(&mut self) -> Result<(), SimError>;

    /// Runs until the next action, the end of the script, an auto-yield or
    /// a fault. `reply` is the result of the previous action.
    fn resume(&mut self, reply: ActionReply) -> ScriptStep;

    fn run_state(&self) -> ScriptRunState;

    /// Stops the script for good (until the next `start`).
    fn fault(&mut self);

    fn has_more_actions(&self) -> bool {
        self.run_state().is_live()
    }
}

struct Scheduled {
    script: Box<dyn ActorScript>,
    reply: ActionReply,
}

pub struct ScriptScheduler {
    runtime: ScriptRuntime,
    scripts: BTreeMap<EntityId, Scheduled>,
}

impl ScriptScheduler {
    pub fn new(auto_yield_instructions: u32) -> Result<Self, SimError> {
        Ok(Self {
            runtime: ScriptRuntime::new(auto_yield_instructions)?,
            scripts: BTreeMap::new(),
        })
    }

    /// Compiles and validates `source` without installing it.
    pub fn check(&self, label: &str, source: &str, actions: &[&str]) -> Result<(), SimError> {
        self.runtime.compile(label, source, actions).map(|_| ())
    }

    /// Compiles `source` for `actor`, starts it and installs it.
    pub fn install(
        &mut self,
        actor: EntityId,
        label: &str,
        source: &str,
        actions: &[&str],
    ) -> Result<(), SimError> {
        let script = self.runtime.compile(label, source, actions)?;
        self.install_script(actor, Box::new(script))
    }

    pub fn install_script(&mut self, actor: EntityId, mut script: Box<dyn ActorScript>) -> Result<(), SimError> {
        script.start()?;
        debug!("installed script for {} ({})", script.label(), actor);
        self.scripts.insert(
            actor,
            Scheduled {
                script,
                reply: ActionReply::Nothing,
            },
        );
        Ok(())
    }

    pub fn is_installed(&self, actor: EntityId) -> bool {
        self.scripts.contains_key(&actor)
    }

    /// Actors in creation order.
    pub fn actors(&self) -> Vec<EntityId> {
        self.scripts.keys().copied().collect()
    }

    pub fn has_more_actions(&self, actor: EntityId) -> bool {
        self.scripts
            .get(&actor)
            .is_some_and(|s| s.script.has_more_actions())
    }

    /// Whether any actor can still act.
    pub fn any_live(&self) -> bool {
        self.scripts.values().any(|s| s.script.has_more_actions())
    }

    pub fn run_state(&self, actor: EntityId) -> Option<ScriptRunState> {
        self.scripts.get(&actor).map(|s| s.script.run_state())
    }

    pub fn resume(&mut self, actor: EntityId) -> ScriptStep {
        match self.scripts.get_mut(&actor) {
            Some(scheduled) => {
                let reply = std::mem::take(&mut scheduled.reply);
                scheduled.script.resume(reply)
            }
            None => ScriptStep::Finished,
        }
    }

    /// Stores the result of `actor`'s action for its next resume.
    pub fn deliver(&mut self, actor: EntityId, reply: ActionReply) {
        if let Some(scheduled) = self.scripts.get_mut(&actor) {
            scheduled.reply = reply;
        }
    }

    pub fn fault(&mut self, actor: EntityId) {
        if let Some(scheduled) = self.scripts.get_mut(&actor) {
            scheduled.script.fault();
        }
    }

    pub fn remove(&mut self, actor: EntityId) {
        self.scripts.remove(&actor);
    }

    /// Drops the scripts of actors for which `keep` is false.
    pub fn retain(&mut self, mut keep: impl FnMut(EntityId) -> bool) {
        self.scripts.retain(|id, _| keep(*id));
    }

    /// Restarts every script from the top.
    pub fn restart_all(&mut self) -> Result<(), SimError> {
        for scheduled in self.scripts.values_mut() {
            scheduled.script.start()?;
            scheduled.reply = ActionReply::Nothing;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}
