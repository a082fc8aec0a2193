mod notification_routes;

pub use notification_routes::*;
