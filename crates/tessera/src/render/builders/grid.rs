use futures::future::join_all;

use tessera_api::{GridBlock, GridCell, RenderNode};

use crate::render::context::RenderContext;
use crate::render::interpreter::render_blocks;

pub async fn build(block: &GridBlock, ctx: &RenderContext) -> RenderNode {
    let columns = block
        .columns
        .filter(|c| *c > 0)
        .unwrap_or_else(|| block.items.len().max(1) as u32);

    let cells = join_all(block.items.iter().enumerate().map(|(index, item)| {
        let cell_ctx = ctx.at(format_args!("items.{index}"));
        async move {
            GridCell {
                span: item.span.unwrap_or(1).clamp(1, columns),
                children: render_blocks(&item.content, &cell_ctx).await,
            }
        }
    }))
    .await;

    RenderNode::Grid { columns, cells }
}
