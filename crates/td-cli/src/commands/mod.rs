//! Command implementations

pub(crate) mod common;
pub(crate) mod dump;
pub(crate) mod load;
pub(crate) mod new;
pub(crate) mod status;
pub(crate) mod unlock;
pub(crate) mod up;
