use crate::error::{Mutation, Rejection};
use crate::types::Layer;

/// Refuses `action` unless `layer` is editable. The stored flag is trusted as-is; it is set
/// when the layer is created and never flipped.
pub fn guard_mutation(layer: &Layer, action: Mutation) -> Result<(), Rejection> {
    if !layer.editable {
        tracing::info!(layer = layer.id, %action, "refusing mutation of read-only layer");
        return Err(Rejection::ReadOnlyLayer {
            layer: layer.id,
            action,
        });
    }
    Ok(())
}
