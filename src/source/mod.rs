// Media acquisition: pluggable backends for fetching, direct loading and local files.

pub mod direct;
pub mod http_source;
pub mod local_file;
pub mod traits;
