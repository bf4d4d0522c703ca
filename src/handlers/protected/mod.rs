// handlers/protected/mod.rs - Protected handlers (bearer JWT required)
//
// Every handler here runs after `jwt_auth_middleware` has placed an
// `AuthUser` in the request extensions.
pub mod audio;
pub mod communities;
pub mod geocode;
pub mod messages;
pub mod presence;
pub mod tiles;
pub mod transcribe;
pub mod voice_notes;
pub mod weather;

pub use communities::{communities_get, communities_post, community_join};
pub use geocode::geocode_get;
pub use messages::{messages_get, messages_post};
pub use presence::presence_auth_post;
pub use tiles::tile_get;
pub use transcribe::transcribe_post;
pub use voice_notes::voice_note_post;
pub use weather::weather_get;
