use futures::future::{join_all, BoxFuture, FutureExt};
use serde_json::Value;
use tracing::{debug, warn};

use tessera_api::{Block, RenderNode};

use super::builders;
use super::context::RenderContext;

/// Render a block list. Siblings are rendered concurrently and independently:
/// a failing block becomes an `Error` placeholder without affecting the others.
///
/// Boxed because container builders recurse back into it.
pub fn render_blocks<'a>(blocks: &'a [Value], ctx: &'a RenderContext) -> BoxFuture<'a, Vec<RenderNode>> {
    async move {
        let renders = blocks.iter().enumerate().map(|(index, block)| {
            let child = ctx.at(index);
            async move { render_block(block, &child).await }
        });
        join_all(renders).await
    }
    .boxed()
}

/// Render one block document.
pub async fn render_block(block: &Value, ctx: &RenderContext) -> RenderNode {
    let parsed = Block::parse(block);
    debug!(block_type = parsed.block_type(), path = %ctx.path, "Dispatching block");

    match builders::build(&parsed, ctx).await {
        Ok(node) => node,
        Err(e) => {
            warn!(block_type = parsed.block_type(), path = %ctx.path, error = %e, "Block failed to render");
            RenderNode::Error {
                block_type: parsed.block_type().to_string(),
                message: e.to_string(),
            }
        }
    }
}
