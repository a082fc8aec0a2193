pub mod api;
pub mod config;
pub mod domain;
pub mod infra;
pub mod startup;

pub use api::routes::*;
pub use config::*;
pub use domain::{
    Error as GameweekError, GameweekManager, GameweekOps, GameweekSnapshot, GameweekStore,
    GameweekWatcher, NotificationLevel, Notifications,
};
pub use infra::db::*;
pub use startup::*;
