//! Version source trait
//!
//! The evaluator only needs one capability from the outside world: the
//! version of the block at a given height. The RPC client implements it
//! against a live node; tests implement it with synthetic schedules.

use crate::rpc::RpcError;
use crate::types::{BlockHeight, BlockVersion};

/// Provides the version field of the block at a height.
pub trait VersionSource {
    /// Fetch the version of the block at `height`.
    ///
    /// Fails once `height` is above the node's best block.
    fn block_version(&self, height: BlockHeight) -> Result<BlockVersion, RpcError>;
}

impl<S: VersionSource + ?Sized> VersionSource for &S {
    fn block_version(&self, height: BlockHeight) -> Result<BlockVersion, RpcError> {
        (**self).block_version(height)
    }
}
