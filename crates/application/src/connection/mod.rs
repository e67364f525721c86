mod manager;

pub use manager::{ConnectionSettings, ServiceConnectionManager};

pub(crate) use manager::Dispatch;
