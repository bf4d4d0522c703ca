// handlers/mod.rs - Handler tiers
//
// Public (no auth) → Protected (bearer JWT, applied by `jwt_auth_middleware`)
pub mod public;
pub mod protected;
