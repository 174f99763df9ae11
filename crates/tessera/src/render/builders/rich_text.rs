use tessera_api::{RenderNode, RichTextBlock};

/// The structured document is passed through; turning it into markup is the
/// frontend's job.
pub fn build(block: &RichTextBlock) -> RenderNode {
    RenderNode::RichText {
        document: block.content.clone(),
    }
}
