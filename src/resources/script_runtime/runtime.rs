//! Lua state and per-actor coroutine scripts.
//!
//! One [`ScriptRuntime`] owns the Lua state shared by every actor. Each actor
//! gets a [`LuaScript`]: its chunk compiled once against a private
//! environment table, and a coroutine created from that chunk. Action
//! functions in the environment are thin wrappers that `coroutine.yield` the
//! action name and arguments, so the engine sees exactly one yield per
//! action.
//!
//! An instruction-count hook enforces the per-resume budget: when a script
//! runs `auto_yield_instructions` VM instructions without calling an action,
//! the hook yields the coroutine with no values, which the scheduler treats
//! as a turn spent idle.

use super::commands::{ActionReply, ActionRequest, ScriptRunState, ScriptStep};
use super::scheduler::ActorScript;
use super::validate::{self, ALLOWED_BUILTINS};
use crate::error::SimError;
use log::info;
use mlua::prelude::*;
use mlua::{HookTriggers, StdLib, VmState};
use std::cell::Cell;

/// Instructions between two hook calls.
const HOOK_GRANULARITY: u32 = 100;

/// Library tables copied into every script environment. Each start gets its
/// own shallow copy.
const LIBRARY_TABLES: [&str; 3] = ["math", "string", "table"];

/// Builds action wrappers. Each wrapper yields its name and arguments and
/// returns whatever the engine resumes it with.
const ACTION_FACTORY: &str = r#"
local yield = coroutine.yield
return function(name)
    return function(...)
        return yield(name, ...)
    end
end
"#;

/// Shared state read by the instruction hook.
pub(super) struct ScriptAppData {
    instructions: Cell<u32>,
    budget: u32,
    /// Only set while a script coroutine is being resumed.
    resuming: Cell<bool>,
}

pub struct ScriptRuntime {
    lua: Lua,
    action_factory: LuaFunction,
}

impl ScriptRuntime {
    /// Creates the Lua state and installs the instruction hook.
    ///
    /// # Errors
    ///
    /// Returns an error if Lua initialization fails.
    pub fn new(auto_yield_instructions: u32) -> LuaResult<Self> {
        let lua = Lua::new_with(
            StdLib::COROUTINE | StdLib::MATH | StdLib::STRING | StdLib::TABLE,
            LuaOptions::default(),
        )?;

        lua.set_app_data(ScriptAppData {
            instructions: Cell::new(0),
            budget: auto_yield_instructions.max(HOOK_GRANULARITY),
            resuming: Cell::new(false),
        });

        lua.set_hook(
            HookTriggers::new().every_nth_instruction(HOOK_GRANULARITY),
            |lua, _debug| {
                let Some(data) = lua.app_data_ref::<ScriptAppData>() else {
                    return Ok(VmState::Continue);
                };
                if !data.resuming.get() {
                    return Ok(VmState::Continue);
                }
                let spent = data.instructions.get() + HOOK_GRANULARITY;
                if spent >= data.budget {
                    data.instructions.set(0);
                    return Ok(VmState::Yield);
                }
                data.instructions.set(spent);
                Ok(VmState::Continue)
            },
        )?;

        let action_factory: LuaFunction = lua
            .load(ACTION_FACTORY)
            .set_name("=action_factory")
            .eval()?;

        Ok(Self {
            lua,
            action_factory,
        })
    }

    /// Base environment for one actor: its actions, the allowed builtins,
    /// library tables and a `print` routed to the logger.
    fn build_base(&self, label: &str, actions: &[&str]) -> LuaResult<LuaTable> {
        let base = self.lua.create_table()?;
        let globals = self.lua.globals();

        for name in ALLOWED_BUILTINS.iter().chain(LIBRARY_TABLES.iter()) {
            if *name == "print" {
                continue;
            }
            base.raw_set(*name, globals.raw_get::<LuaValue>(*name)?)?;
        }

        let actor = label.to_string();
        base.raw_set(
            "print",
            self.lua.create_function(move |_, args: LuaMultiValue| {
                let line = args.iter().map(display_value).collect::<Vec<_>>().join("\t");
                info!(target: "script", "[{}] {}", actor, line);
                Ok(())
            })?,
        )?;

        for name in actions {
            let wrapper: LuaFunction = self.action_factory.call(*name)?;
            base.raw_set(*name, wrapper)?;
        }
        Ok(base)
    }

    /// Compiles `source` for the actor `label` allowed to call `actions`.
    ///
    /// # Errors
    ///
    /// [`SimError::Validation`] when the script calls something it may not,
    /// [`SimError::Compile`] on a syntax error.
    pub fn compile(&self, label: &str, source: &str, actions: &[&str]) -> Result<LuaScript, SimError> {
        validate::check_calls(source, actions.iter().copied()).map_err(|forbidden| {
            SimError::Validation {
                actor: label.to_string(),
                token: forbidden.token,
                line: forbidden.line,
            }
        })?;

        let env = self.lua.create_table()?;
        let chunk = self
            .lua
            .load(source)
            .set_name(format!("={}", label))
            .set_environment(env.clone())
            .into_function()
            .map_err(|e| SimError::Compile {
                actor: label.to_string(),
                message: match e {
                    LuaError::SyntaxError { message, .. } => message,
                    other => other.to_string(),
                },
            })?;
        let base = self.build_base(label, actions)?;

        Ok(LuaScript {
            lua: self.lua.clone(),
            label: label.to_string(),
            chunk,
            env,
            base,
            thread: None,
            state: ScriptRunState::NotStarted,
        })
    }
}

fn display_value(value: &LuaValue) -> String {
    match value {
        LuaValue::Nil => "nil".to_string(),
        LuaValue::Boolean(b) => b.to_string(),
        LuaValue::Integer(i) => i.to_string(),
        LuaValue::Number(n) => n.to_string(),
        LuaValue::String(s) => String::from(s.to_string_lossy()),
        other => other.type_name().to_string(),
    }
}

/// One actor's compiled script and its coroutine.
pub struct LuaScript {
    lua: Lua,
    label: String,
    chunk: LuaFunction,
    env: LuaTable,
    base: LuaTable,
    thread: Option<LuaThread>,
    state: ScriptRunState,
}

impl LuaScript {
    fn set_resuming(&self, resuming: bool) {
        if let Some(data) = self.lua.app_data_ref::<ScriptAppData>() {
            data.instructions.set(0);
            data.resuming.set(resuming);
        }
    }

    /// Shallow copy of a library table, so scripts cannot patch each other's.
    fn copy_table(&self, table: &LuaTable) -> LuaResult<LuaTable> {
        let copy = self.lua.create_table()?;
        for pair in table.pairs::<LuaValue, LuaValue>() {
            let (key, value) = pair?;
            copy.raw_set(key, value)?;
        }
        Ok(copy)
    }

    fn fault_with(&mut self, reason: String) -> ScriptStep {
        self.state = ScriptRunState::Faulted;
        self.thread = None;
        ScriptStep::Faulted(reason)
    }
}

impl ActorScript for LuaScript {
    fn label(&self) -> &str {
        &self.label
    }

    /// Rewinds to the top of the chunk with fresh globals.
    fn start(&mut self) -> Result<(), SimError> {
        self.env.clear()?;
        for pair in self.base.pairs::<LuaValue, LuaValue>() {
            let (key, value) = pair?;
            let library = matches!(&key, LuaValue::String(name)
                if LIBRARY_TABLES.iter().any(|lib| name == lib));
            match value {
                LuaValue::Table(table) if library => {
                    self.env.raw_set(key, self.copy_table(&table)?)?;
                }
                value => self.env.raw_set(key, value)?,
            }
        }
        self.thread = Some(self.lua.create_thread(self.chunk.clone())?);
        self.state = ScriptRunState::NotStarted;
        Ok(())
    }

    fn resume(&mut self, reply: ActionReply) -> ScriptStep {
        if !self.state.is_live() {
            return match self.state {
                ScriptRunState::Faulted => ScriptStep::Faulted("script already faulted".to_string()),
                _ => ScriptStep::Finished,
            };
        }
        let Some(thread) = self.thread.clone() else {
            return ScriptStep::Finished;
        };

        self.set_resuming(true);
        let result = if self.state == ScriptRunState::NotStarted {
            thread.resume::<LuaMultiValue>(())
        } else {
            thread.resume::<LuaMultiValue>(reply)
        };
        self.set_resuming(false);

        let values = match result {
            Ok(values) => values,
            Err(e) => return self.fault_with(e.to_string()),
        };
        if !matches!(thread.status(), LuaThreadStatus::Resumable) {
            self.state = ScriptRunState::Finished;
            self.thread = None;
            return ScriptStep::Finished;
        }
        self.state = ScriptRunState::Suspended;

        let values: Vec<LuaValue> = values.into_iter().collect();
        match values.split_first() {
            None => ScriptStep::AutoYield,
            Some((LuaValue::String(name), args)) => {
                let name = String::from(name.to_string_lossy());
                match ActionRequest::from_yield(&name, args) {
                    Ok(request) => ScriptStep::Action(request),
                    Err(e) => self.fault_with(e.to_string()),
                }
            }
            Some((other, _)) => self.fault_with(format!("yielded a {} instead of an action", other.type_name())),
        }
    }

    fn run_state(&self) -> ScriptRunState {
        self.state
    }

    fn fault(&mut self) {
        self.state = ScriptRunState::Faulted;
        self.thread = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WALKER: [&str; 4] = ["turnLeft", "turnRight", "wait", "walk"];

    fn started(runtime: &ScriptRuntime, source: &str) -> LuaScript {
        let mut script = runtime.compile("tester", source, &WALKER).unwrap();
        script.start().unwrap();
        script
    }

    #[test]
    fn one_yield_per_action() {
        let runtime = ScriptRuntime::new(10_000).unwrap();
        let mut script = started(&runtime, "walk()\nturnLeft()\nwait()");

        assert_eq!(script.resume(ActionReply::Nothing), ScriptStep::Action(ActionRequest::Walk));
        assert_eq!(
            script.resume(ActionReply::Done(true)),
            ScriptStep::Action(ActionRequest::TurnLeft)
        );
        assert_eq!(script.resume(ActionReply::Done(true)), ScriptStep::Action(ActionRequest::Wait));
        assert_eq!(script.resume(ActionReply::Nothing), ScriptStep::Finished);
        assert_eq!(script.run_state(), ScriptRunState::Finished);
        assert!(!script.has_more_actions());
    }

    #[test]
    fn reply_becomes_call_result() {
        let runtime = ScriptRuntime::new(10_000).unwrap();
        let source = "if walk() then turnLeft() else turnRight() end";

        let mut script = started(&runtime, source);
        script.resume(ActionReply::Nothing);
        assert_eq!(
            script.resume(ActionReply::Done(false)),
            ScriptStep::Action(ActionRequest::TurnRight)
        );

        script.start().unwrap();
        script.resume(ActionReply::Nothing);
        assert_eq!(
            script.resume(ActionReply::Done(true)),
            ScriptStep::Action(ActionRequest::TurnLeft)
        );
    }

    #[test]
    fn start_resets_globals() {
        let runtime = ScriptRuntime::new(10_000).unwrap();
        let source = "if counter then turnLeft() end\ncounter = 1\nwalk()";
        let mut script = started(&runtime, source);
        assert_eq!(script.resume(ActionReply::Nothing), ScriptStep::Action(ActionRequest::Walk));

        script.start().unwrap();
        assert_eq!(script.resume(ActionReply::Nothing), ScriptStep::Action(ActionRequest::Walk));
    }

    #[test]
    fn busy_loop_is_auto_yielded() {
        let runtime = ScriptRuntime::new(1_000).unwrap();
        let mut script = started(&runtime, "local n = 0\nwhile true do n = n + 1 end");
        assert_eq!(script.resume(ActionReply::Nothing), ScriptStep::AutoYield);
        assert_eq!(script.resume(ActionReply::Nothing), ScriptStep::AutoYield);
        assert!(script.has_more_actions());
    }

    #[test]
    fn runtime_error_faults_script() {
        let runtime = ScriptRuntime::new(10_000).unwrap();
        let mut script = started(&runtime, "walk()\nerror('boom')");
        script.resume(ActionReply::Nothing);
        let step = script.resume(ActionReply::Done(true));
        assert!(matches!(step, ScriptStep::Faulted(ref msg) if msg.contains("boom")));
        assert_eq!(script.run_state(), ScriptRunState::Faulted);
    }

    #[test]
    fn ungranted_call_fails_validation() {
        let runtime = ScriptRuntime::new(10_000).unwrap();
        let result = runtime.compile("tester", "walk()\ngrab()", &WALKER);
        assert!(matches!(
            result,
            Err(SimError::Validation { ref token, line: 2, .. }) if token == "grab"
        ));
    }

    #[test]
    fn syntax_error_fails_compile() {
        let runtime = ScriptRuntime::new(10_000).unwrap();
        let result = runtime.compile("tester", "walk(", &WALKER);
        assert!(matches!(result, Err(SimError::Compile { .. })));
    }

    #[test]
    fn scripts_do_not_share_globals() {
        let runtime = ScriptRuntime::new(10_000).unwrap();
        let mut first = started(&runtime, "shared = true\nwalk()");
        let mut second = started(&runtime, "if shared then turnLeft() else wait() end");
        first.resume(ActionReply::Nothing);
        assert_eq!(second.resume(ActionReply::Nothing), ScriptStep::Action(ActionRequest::Wait));
    }

    #[test]
    fn library_tables_are_private_to_each_script() {
        let runtime = ScriptRuntime::new(10_000).unwrap();
        let patcher = "local had = math.floor ~= nil\nmath.floor = nil\nif had then turnLeft() else turnRight() end";
        let reader = "if math.floor then turnLeft() else turnRight() end";
        let mut first = started(&runtime, patcher);
        let mut second = started(&runtime, reader);

        for _ in 0..2 {
            assert_eq!(first.resume(ActionReply::Nothing), ScriptStep::Action(ActionRequest::TurnLeft));
            assert_eq!(second.resume(ActionReply::Nothing), ScriptStep::Action(ActionRequest::TurnLeft));
            first.start().unwrap();
            second.start().unwrap();
        }
    }
}
