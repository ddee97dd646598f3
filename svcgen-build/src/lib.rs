//! Build-time driver for svcgen.
//!
//! Runs the same engine as the `svcgen generate` command from a build
//! script, and keeps the `mod.rs` files of the generated tree in sync.
//!
//! # Example
//!
//! In your `build.rs`:
//!
//! ```ignore
//! fn main() {
//!     svcgen_build::generate_services()
//!         .schema_file("src/schema.rs")
//!         .output_dir("src/services")
//!         .run()
//!         .expect("Failed to generate services");
//! }
//! ```

mod generator;

pub use generator::ServiceGenerator;

/// Create a new service generator with default settings.
///
/// # Example
///
/// ```ignore
/// svcgen_build::generate_services()
///     .output_dir("src/generated")
///     .runtime_module("crate::storage")
///     .run()
///     .expect("Failed to generate services");
/// ```
pub fn generate_services() -> ServiceGenerator {
    ServiceGenerator::new()
}
