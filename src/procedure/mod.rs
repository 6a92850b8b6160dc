//! Server-side procedures and the runner that invokes them.
//!
//! A [`Procedure`] is a compiled Lua body. A [`ProcedureRunner`] executes it
//! atomically against a remote store for a single key.

pub mod scripts;

mod redis_runner;

use async_trait::async_trait;

use crate::error::Result;

/// Raw reply of a procedure: `(consumed, ttl_ms)` or nil.
pub type ProcedureReply = Option<(i64, i64)>;

/// A named server-side procedure.
///
/// Compiling computes the script digest up front so runners can call it by
/// hash and only ship the body when the server does not know it yet.
#[derive(Debug, Clone)]
pub struct Procedure {
    name: String,
    script: redis::Script,
    body: String,
}

impl Procedure {
    /// Compile a procedure from its Lua body.
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        let body = body.into();
        Self {
            name: name.into(),
            script: redis::Script::new(&body),
            body,
        }
    }

    /// The default fixed-window increment procedure.
    pub fn increment() -> Self {
        Self::new("increment", scripts::INCREMENT)
    }

    /// The default read-only peek procedure.
    pub fn peek() -> Self {
        Self::new("peek", scripts::PEEK)
    }

    /// Name used in logs and by test runners.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The Lua source.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// SHA1 digest of the body, as used by `EVALSHA`.
    pub fn hash(&self) -> &str {
        self.script.get_hash()
    }

    pub(crate) fn script(&self) -> &redis::Script {
        &self.script
    }
}

/// Executes a procedure atomically against the remote store.
///
/// Implementations must run the whole body without interleaving other
/// commands on the same key.
#[async_trait]
pub trait ProcedureRunner: Send + Sync {
    /// Invoke `procedure` with one key and positional string arguments.
    async fn run(&self, procedure: &Procedure, key: &str, args: &[String]) -> Result<ProcedureReply>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_procedures() {
        let incr = Procedure::increment();
        let peek = Procedure::peek();

        assert_eq!(incr.name(), "increment");
        assert_eq!(peek.name(), "peek");
        assert_eq!(incr.body(), scripts::INCREMENT);
        assert_ne!(incr.hash(), peek.hash());
    }

    #[test]
    fn test_hash_follows_body() {
        let a = Procedure::new("increment", "return {1, 2}");
        let b = Procedure::new("other", "return {1, 2}");
        let c = Procedure::new("increment", "return {1, 3}");

        assert_eq!(a.hash(), b.hash());
        assert_ne!(a.hash(), c.hash());
        assert_eq!(a.hash().len(), 40);
    }
}
