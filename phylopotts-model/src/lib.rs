//! Potts models on phylogenies.
//!
//! - **Parameters**: [`load_parameters`] reads bmDCA-style `J`/`h` text
//!   files into dense [`FieldTensor`] and [`CouplingTensor`] values
//! - **Sampling**: the [`TreeSampler`] trait and its Metropolis
//!   implementation, [`MetropolisTreeSampler`]
//! - **Pipeline**: [`GenerationPipeline`] runs map, relabel, root, load,
//!   sample and save in order, writing every intermediate artifact

pub mod params;
pub mod pipeline;
pub mod sampler;
pub mod tensor;

pub use params::{load_parameter_set, load_parameters, ParameterSet, ParameterStats};
pub use pipeline::{
    artifact_paths, GenerationConfig, GenerationOutputs, GenerationPipeline,
    DEFAULT_EQUILIBRATION_STEPS, DEFAULT_PREFIX,
};
pub use sampler::{MetropolisTreeSampler, TreeSampler};
pub use tensor::{CouplingTensor, FieldTensor, STATES};
