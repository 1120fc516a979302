//! The command catalog
//!
//! Each command checks one aspect of the running dashboard through the
//! page's test surface (`window.__mapTestApi__`, `window.__mapTestApi3D__`)
//! or the backend's REST endpoints.

pub mod invariants;
pub mod perf;
pub mod robust;
pub mod safe_routes;
pub mod smoke;
pub mod terrain;
pub mod visual;

pub use invariants::InvariantsCommand;
pub use perf::PerfCommand;
pub use robust::RobustCommand;
pub use safe_routes::SafeRoutesCommand;
pub use smoke::SmokeCommand;
pub use terrain::TerrainCommand;
pub use visual::{VisualCommand, VisualView};

pub(crate) const MAP_API_PRESENT: &str = "typeof window.__mapTestApi__ !== 'undefined'";
pub(crate) const GET_LAYER_STATES: &str = "window.__mapTestApi__.getLayerStates()";
pub(crate) const VALIDATE_LAYERS: &str = "window.__mapTestApi__.validateLayers()";
