//! Execution environment for Lua data files.
//!
//! Data files are Lua 5.1 chunks that declare a module and assign table
//! literals to its fields:
//!
//! ```lua
//! module("Data")
//! RoomData = { [1] = { name = "Lobby", size = 2.5 } }
//! ```
//!
//! [`Environment`] wraps one embedded Lua 5.1 state (through `mlua`) with the
//! safe standard libraries loaded, so `module`, `package.seeall`, loops,
//! local functions and the `string` library behave as they do in the game.
//! Globals are handed out as raw [`mlua::Value`]s; the
//! [`decoder`](crate::decoder) is the only place that converts them into the
//! closed [`Value`](crate::Value) tree.
//!
//! Each load owns its own `Environment`, and the Lua state is closed when it
//! is dropped.

use mlua::{Lua, Value as LuaValue};

/// One Lua state.
pub struct Environment {
    lua: Lua,
}

impl Environment {
    pub fn new() -> Self {
        Self { lua: Lua::new() }
    }

    /// Execute a chunk. `name` appears in Lua's error messages
    /// (`[string "name"]:3: ...`).
    pub fn exec(&self, chunk: &str, name: &str) -> mlua::Result<()> {
        self.lua.load(chunk).set_name(name).exec()
    }

    /// Read a global by name (`nil` if unset).
    pub fn global(&self, name: &str) -> mlua::Result<LuaValue> {
        self.lua.globals().get::<LuaValue>(name)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

/// Lua's name for the type of `value`. Integers and floats are both
/// `number`, as `type()` reports them.
pub fn type_name(value: &LuaValue) -> &'static str {
    match value {
        LuaValue::Integer(_) | LuaValue::Number(_) => "number",
        other => other.type_name(),
    }
}
