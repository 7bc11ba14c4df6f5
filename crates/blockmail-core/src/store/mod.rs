pub mod app_state;
pub mod profile_cache;

pub use app_state::{AppState, StateChange};
pub use profile_cache::ProfileCache;
