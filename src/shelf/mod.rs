pub mod browse;
pub mod config;
pub mod decode;
pub mod events;
pub mod ingest;
pub mod lock;
pub mod merge;
pub mod partition;
pub mod paths;
pub mod record;
pub mod util;
