use serde_json::Value;
use tracing::error;

use tessera_api::block::tags;
use tessera_api::value::document_id;
use tessera_api::{BlockRefBlock, DocRef, Map, RenderNode, SectionRefBlock};

use crate::error::RenderError;
use crate::props::resolve_children;
use crate::render::context::RenderContext;
use crate::render::interpreter::render_blocks;

/// Fields a referenced document may keep its blocks under, in lookup order.
const BLOCK_FIELDS: &[&str] = &["blocks", "content", "layout"];

pub async fn build_block_ref(block: &BlockRefBlock, ctx: &RenderContext) -> Result<RenderNode, RenderError> {
    let collection = ctx.config().blocks_collection.clone();
    build_reference(tags::BLOCK_REF, &block.block, &block.props, &collection, ctx).await
}

pub async fn build_section_ref(
    block: &SectionRefBlock,
    ctx: &RenderContext,
) -> Result<RenderNode, RenderError> {
    let collection = ctx.config().sections_collection.clone();
    build_reference(tags::SECTION_REF, &block.section, &block.props, &collection, ctx).await
}

async fn build_reference(
    block_type: &str,
    reference: &DocRef,
    props: &Map<String, Value>,
    collection: &str,
    ctx: &RenderContext,
) -> Result<RenderNode, RenderError> {
    let max_depth = ctx.config().max_reference_depth;
    if ctx.reference_depth >= max_depth {
        error!(
            reference_depth = ctx.reference_depth,
            path = %ctx.path,
            "Reference recursion depth exceeded {max_depth}, likely a cycle"
        );
        return Err(RenderError::ReferenceDepthExceeded(ctx.reference_depth));
    }

    let document = load_document(reference, collection, ctx).await?;
    let id = document_id(&document).unwrap_or_default();
    let blocks = BLOCK_FIELDS
        .iter()
        .find_map(|field| document.get(*field).and_then(Value::as_array))
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    let resolved = resolve_children(blocks, props);
    let child_ctx = ctx
        .deeper_reference()
        .at(format_args!("{block_type}:{id}"));
    let children = render_blocks(&resolved, &child_ctx).await;

    Ok(RenderNode::Reference {
        block_type: block_type.to_string(),
        id,
        children,
    })
}

/// The referenced document: used directly when populated with its blocks,
/// otherwise looked up by id.
async fn load_document(
    reference: &DocRef,
    collection: &str,
    ctx: &RenderContext,
) -> Result<Value, RenderError> {
    if let DocRef::Populated(doc) = reference {
        if BLOCK_FIELDS.iter().any(|field| doc.contains_key(*field)) {
            return Ok(Value::Object(doc.clone()));
        }
    }
    let id = reference.id().ok_or(RenderError::MissingReference)?;
    ctx.services
        .store
        .find_by_id(collection, &id, Some(0))
        .await
        .map_err(|e| RenderError::Store(e.to_string()))?
        .ok_or_else(|| RenderError::ReferenceNotFound {
            collection: collection.to_string(),
            id,
        })
}
