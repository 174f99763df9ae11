use tracing::debug;

use tessera_api::block::tags;
use tessera_api::{DataFetchBlock, RenderNode};

use crate::data::FetchPlan;
use crate::error::{FetchError, RenderError};
use crate::render::context::RenderContext;
use crate::render::interpreter::render_blocks;
use crate::render::mount::NodeState;

/// Fetch, merge, publish, then render children in the extended context.
///
/// One-shot renders await the fetch inline. Mounted renders read the node's
/// current state and never wait: the first pass emits `Loading`.
pub async fn build(block: &DataFetchBlock, ctx: &RenderContext) -> Result<RenderNode, RenderError> {
    let plan = FetchPlan::from_block(block, &ctx.config().default_data_key);
    if plan.sources.is_empty() {
        return Err(FetchError::NoSources.into());
    }

    let state = match &ctx.mount {
        Some(registry) => registry.observe(&ctx.path, &plan),
        None => match plan.run(&ctx.services.fetcher).await {
            Ok(entries) => NodeState::Ready(entries),
            Err(e) => NodeState::Failed(e.to_string()),
        },
    };

    match state {
        NodeState::Pending => Ok(RenderNode::Loading {
            block_type: tags::DATA_FETCH.to_string(),
        }),
        NodeState::Failed(message) => Ok(RenderNode::Error {
            block_type: tags::DATA_FETCH.to_string(),
            message,
        }),
        NodeState::Ready(entries) => {
            let keys: Vec<String> = entries.keys().cloned().collect();
            debug!(data_key = %plan.data_key, keys = ?keys, "Publishing data context");
            let child_ctx = ctx.with_data(ctx.data.extend(entries)).at("children");
            let children = render_blocks(&block.children, &child_ctx).await;
            Ok(RenderNode::DataScope {
                data_key: plan.data_key,
                keys,
                children,
            })
        }
    }
}
