pub mod mirror;

pub use mirror::{synthesize, GeneratorConfig, SynthesisSummary};
