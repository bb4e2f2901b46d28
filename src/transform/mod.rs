//! Transform adapters from upstream API shapes into flat drug records.

pub(crate) mod facet;
pub(crate) mod trial;
