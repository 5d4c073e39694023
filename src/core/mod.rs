pub(crate) mod document;
pub(crate) mod errors;
pub(crate) mod ordering;
