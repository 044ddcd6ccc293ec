//! Built-in reference analyzers, one per shipped dimension.

mod ai_reliability;
mod architecture;
mod security;

pub use ai_reliability::AiReliabilityPlugin;
pub use architecture::ArchitecturePlugin;
pub use security::SecurityPlugin;

use crate::plugin::AnalyzerPlugin;

/// The default dimension set, in reporting order.
pub fn builtin_plugins() -> Vec<Box<dyn AnalyzerPlugin>> {
    vec![
        Box::new(AiReliabilityPlugin),
        Box::new(SecurityPlugin),
        Box::new(ArchitecturePlugin),
    ]
}
