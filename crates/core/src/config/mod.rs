//! Configuration entities, collections, settings and the config service.

mod entities;
mod service;
mod settings;
mod state;

pub use entities::{
    ConfigEntry, ConnectionConfig, Credentials, DsMask, FilesWorkingSetConfig, JobsFilter,
    JobsWorkingSetConfig, UssPath, ZVersion,
};
pub use service::ConfigService;
pub use settings::{HttpSettings, Settings};
pub use state::{ConfigState, EntityClass};
