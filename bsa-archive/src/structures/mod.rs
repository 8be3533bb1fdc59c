//! raw on-disk layout of every supported archive family
//!
//! these types only describe bytes, use [`crate::archive`] to work with archives.

pub(crate) mod ba2;
pub(crate) mod common;
pub(crate) mod tes3;
pub(crate) mod tes4;
