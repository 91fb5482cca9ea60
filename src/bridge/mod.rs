// Bridge service contract: wire types, the client seam and its HTTP implementation.

pub mod client;
pub mod protocol;
