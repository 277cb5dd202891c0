//! Page rendering and asset pipelines for tessera sites.
//!
//! Renders one HTML page per locale from its aggregated project document and
//! runs the independent style, script, image and static-file stages.

pub mod assets;
pub mod builder;
pub mod cdn;
pub mod stage;
pub mod templates;

pub use assets::{AssetError, AssetPipeline, CompiledStyles, CopyMode};
pub use builder::{BuildConfig, BuildError, BuildResult, CdnConfig, SiteBuilder, STYLES_OUTPUT};
pub use cdn::CdnRewriter;
pub use stage::Stage;
pub use templates::{TemplateEngine, TemplateError};
