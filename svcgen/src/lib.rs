//! svcgen core library.
//!
//! Reads entity tables from a schema module and keeps one generated
//! service per entity in sync with it. Generated methods carry an
//! ownership marker in their doc comment; methods without it belong to
//! the user and are never rewritten.
//!
//! ```no_run
//! use svcgen::{Engine, EngineConfig};
//!
//! # fn main() -> Result<(), svcgen::GenError> {
//! let mut engine = Engine::open(EngineConfig::new("."))?;
//! let catalog = engine.load_catalog()?;
//! let report = engine.run(&catalog)?;
//! println!("{}", report.summary());
//! # Ok(())
//! # }
//! ```

pub mod artifact;
pub mod config;
pub mod engine;
pub mod errors;
pub mod naming;
pub mod pipeline;
pub mod schema;
pub mod snapshot;

pub use artifact::{MemberSpec, MergeOutcome, OWNERSHIP_MARKER, SourceArtifact, SourceArtifactStore};
pub use config::EngineConfig;
pub use engine::{CustomMember, Engine, EntityState, EntityStatus, FailedEntity, Orphan, RunReport};
pub use errors::{GenError, GenResult};
pub use pipeline::{ClassTarget, CrudPlugin, GenerationContext, GeneratorPipeline, GeneratorPlugin};
pub use schema::{EntitySchema, FieldDef, SchemaCatalog};
pub use snapshot::{ChangeDetector, SnapshotStore};
