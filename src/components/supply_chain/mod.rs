mod api;
mod component;
mod editing;
mod editor;
mod error;
mod graph;
mod node_panel;
mod rank;
mod render;
mod state;
mod sync;
mod types;
mod wire;

pub use api::HttpBackend;
pub use component::{ROLE_MIME, SupplyChainCanvas};
pub use editor::EditorState;
pub use error::EditorError;
pub use node_panel::NodePanel;
pub use sync::Synchronizer;
