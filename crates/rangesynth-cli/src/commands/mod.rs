pub(crate) mod check;
pub(crate) mod helpers;
pub(crate) mod offsets;
pub(crate) mod propagate;
pub(crate) mod reanchor;
pub(crate) mod rebind;
pub(crate) mod synthesize;
pub(crate) mod targets;
