//! Independently re-runnable pipeline stages.

use std::fmt;

/// A unit of the build the dev loop can re-run on its own.
///
/// Variants are ordered in the sequence a batch of stages runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    /// Aggregate locale JSON, then re-render its page
    Data,
    /// Re-render the locale page from the persisted project document
    Pages,
    /// Compile stylesheets
    Styles,
    /// Copy scripts
    Scripts,
    /// Copy changed images
    Images,
    /// Copy top-level static files
    Static,
}

impl Stage {
    /// Stages that do not depend on a locale.
    pub const ASSETS: [Stage; 4] = [Stage::Styles, Stage::Scripts, Stage::Images, Stage::Static];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Data => "data",
            Stage::Pages => "pages",
            Stage::Styles => "styles",
            Stage::Scripts => "scripts",
            Stage::Images => "images",
            Stage::Static => "static",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
