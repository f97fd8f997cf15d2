pub mod cleanup;
pub mod reconciler;
