//! Core domain model types.
//!
//! This module contains the fundamental types used throughout the crate:
//! - Optimization levels and the variant matrix
//! - Artifact naming
//! - Stage group status and kind enums

mod artifact;
mod status;
mod variant;

pub use artifact::{signal_path, ArtifactLayout, LABEL_PARAMETER, LABEL_PLACEHOLDER};
pub use status::{GroupKind, GroupStatus};
pub use variant::{OptLevel, Variant, VariantMatrix};
