use tracing::debug;

use tessera_api::{RenderNode, SlotBlock};

use crate::render::context::RenderContext;
use crate::render::interpreter::render_blocks;

/// A slot outside any reference has no caller content; its defaults render in place.
pub async fn build(block: &SlotBlock, ctx: &RenderContext) -> RenderNode {
    debug!(slot = %block.name, "Unresolved slot, rendering its defaults");
    let defaults = block.default_blocks.as_deref().unwrap_or(&[]);
    let slot_ctx = ctx.at(format_args!("slot:{}", block.name));
    RenderNode::Fragment {
        children: render_blocks(defaults, &slot_ctx).await,
    }
}
