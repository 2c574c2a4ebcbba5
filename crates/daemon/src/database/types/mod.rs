mod dtimestamp;
mod duuid;
mod enums;

pub use dtimestamp::DTimestamp;
pub use duuid::DUuid;
pub use enums::{BroadcastKind, Component, Difficulty, RequestStatus, UnknownVariant};
