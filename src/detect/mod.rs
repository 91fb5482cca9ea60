// Content classification: MIME prefixes, extensions, magic bytes, embeddable links.

pub mod container;
pub mod embed;
pub mod media_kind;
