//! OpenSky Network integration
//!
//! - `token` - OAuth2 client-credentials cache
//! - `states` - bounding-box state vectors
//! - `routes` - recent flight of one aircraft
//! - `airports` - static ICAO → coordinate table

pub mod airports;
pub mod routes;
pub mod states;
pub mod token;

pub use routes::{RouteFetcher, RouteInfo};
pub use states::StateFetcher;
pub use token::{AccessToken, TokenCache};
