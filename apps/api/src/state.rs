use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::ResumeModel;
use crate::rasterize::{PageRasterizer, RasterCache};

/// Shared application state injected into all route handlers via Axum
/// extractors. Nothing here outlives the process or persists between runs;
/// the raster cache is the only cross-request state.
#[derive(Clone)]
pub struct AppState {
    /// Startup configuration. The model client takes its key at
    /// construction; handlers currently read nothing else from it.
    #[allow(dead_code)]
    pub config: Config,
    /// Pluggable model client. Production: `GeminiClient`; tests inject stubs.
    pub model: Arc<dyn ResumeModel>,
    /// Pluggable rasterizer backend. Production: `MupdfRasterizer`.
    pub rasterizer: Arc<dyn PageRasterizer>,
    /// Memoizes first-page rasterization by upload content hash.
    pub raster_cache: Arc<RasterCache>,
}
