//! Procedure runner over a multiplexed Redis connection.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use tracing::trace;

use super::{Procedure, ProcedureReply, ProcedureRunner};
use crate::error::Result;

#[async_trait]
impl ProcedureRunner for MultiplexedConnection {
    async fn run(&self, procedure: &Procedure, key: &str, args: &[String]) -> Result<ProcedureReply> {
        let mut conn = self.clone();

        let mut invocation = procedure.script().prepare_invoke();
        invocation.key(key);
        for arg in args {
            invocation.arg(arg.as_str());
        }

        trace!(
            procedure = procedure.name(),
            hash = procedure.hash(),
            key = %key,
            args = ?args,
            "Invoking procedure"
        );

        // EVALSHA first, falling back to EVAL on NOSCRIPT.
        let reply: ProcedureReply = invocation.invoke_async(&mut conn).await?;
        Ok(reply)
    }
}
