//! Out-of-core streaming of point-cloud octants

pub mod config;
pub mod disk_io;
pub mod priority;
pub mod budget;
pub mod pending;
pub mod cache;
pub mod loader;
pub mod visibility;
pub mod updater;
pub mod streamer;

pub use config::StreamingConfig;
pub use disk_io::{
    decode_node, OctantStore,
    NODE_FILE_EXTENSION, NODE_HEADER_LEN, OCTANTS_DIR,
};
pub use priority::{OctantPriority, OctantPriorityQueue};
pub use budget::PointBudget;
pub use pending::{PendingOctant, PendingSet, PendingState};
pub use cache::{LoadedMeshCache, LoadedOctant};
pub use loader::{LoaderContext, LoaderSignal, LoaderStats, LoaderStatsSnapshot, StreamingLoader};
pub use visibility::VisibilityClassifier;
pub use updater::{OctantVisibility, ReconcileSummary, SceneUpdater};
pub use streamer::OctreeStreamer;
