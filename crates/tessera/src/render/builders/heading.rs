use tessera_api::{HeadingBlock, RenderNode};

pub fn build(block: &HeadingBlock) -> RenderNode {
    RenderNode::Heading {
        level: block.level.clamp(1, 6),
        text: block.text.clone(),
    }
}
