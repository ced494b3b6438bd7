//! Multiplayer synchronization: the remote entity registry, transform
//! interpolation, throttled state publishing, the respawn protocol, and the
//! connection session that ties them to the combat layer.

pub mod entity;
pub mod events;
mod handlers;
pub mod interpolation;
pub mod publisher;
pub mod registry;
pub mod scheduler;
pub mod session;
pub mod sync;

pub use entity::{Entity, LOCAL_PLAYER_ID, RemoteEntity};
pub use events::{EventQueue, GameEvent, SimEvent, Sound};
pub use interpolation::{blend_toward, infer_speed, interpolate_remotes, lerp_angle_raw};
pub use publisher::{StatePublisher, player_snapshot};
pub use registry::{EntityRegistry, RemoteDefaults, SceneGate};
pub use scheduler::{Scheduler, TaskHandle};
pub use session::{Session, SessionError};
pub use sync::{SyncState, SyncTask};
