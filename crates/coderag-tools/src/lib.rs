//! Callable operations over an index directory, with validated inputs and
//! failures rendered as text.

pub mod codebase;
pub mod executor;
pub mod params;
pub mod registry;

pub use codebase::{CodebaseTools, ToolDefaults};
pub use executor::{ToolCall, ToolError, ToolOutput, deserialize_params};
pub use params::{ListCollectionsParams, ListRowsParams, QueryCodebaseParams};
pub use registry::{ToolDef, ToolRegistry};
