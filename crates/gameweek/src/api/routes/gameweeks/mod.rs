mod gameweek_routes;

pub use gameweek_routes::*;
