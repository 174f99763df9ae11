//! One builder per block type
//!
//! Container builders (`grid`, `dataFetch`, references, `blocksTable`) recurse
//! through [`render_blocks`](super::interpreter::render_blocks) for their children.

mod data_fetch;
mod grid;
mod heading;
mod reference;
mod rich_text;
mod slot;
mod stat_card;
mod table;

pub use stat_card::group_thousands;

use tracing::warn;

use tessera_api::{Block, RenderNode};

use crate::error::RenderError;

use super::context::RenderContext;

pub(crate) async fn build(block: &Block, ctx: &RenderContext) -> Result<RenderNode, RenderError> {
    match block {
        Block::Heading(b) => Ok(heading::build(b)),
        Block::RichText(b) => Ok(rich_text::build(b)),
        Block::StatCard(b) => Ok(stat_card::build(b, ctx)),
        Block::Grid(b) => Ok(grid::build(b, ctx).await),
        Block::DataFetch(b) => data_fetch::build(b, ctx).await,
        Block::BlockRef(b) => reference::build_block_ref(b, ctx).await,
        Block::SectionRef(b) => reference::build_section_ref(b, ctx).await,
        Block::Table(b) | Block::BlocksTable(b) => table::build(b, block.block_type(), ctx).await,
        Block::Slot(b) => Ok(slot::build(b, ctx).await),
        Block::Unknown { block_type } => {
            warn!(block_type = %block_type, path = %ctx.path, "Unknown block type");
            Ok(RenderNode::Unknown {
                block_type: block_type.clone(),
            })
        }
        Block::Invalid { block_type, reason } => {
            warn!(block_type = %block_type, path = %ctx.path, reason = %reason, "Invalid block");
            Ok(RenderNode::Invalid {
                block_type: block_type.clone(),
                reason: reason.clone(),
            })
        }
    }
}
