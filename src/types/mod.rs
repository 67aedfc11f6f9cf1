//! Core types for describing and holding decoded binary structures.
//!
//! - [`PrimitiveType`] lists the fixed-width numeric representations in the plugin ABI
//! - [`StructSchema`] is a declarative field table (name, offset, kind, repeat count)
//! - [`SchemaBuilder`] computes offsets under `#pragma pack(n)` rules
//! - [`Record`] and [`Value`] hold decoded data keyed by field name
//! - [`FromValue`] provides typed, fallible extraction from decoded values
//!
//! ```rust
//! use rf2_capture::types::{PrimitiveType, StructSchema};
//!
//! let schema = StructSchema::builder("Sample", 4)
//!     .scalar("mID", PrimitiveType::Int32)
//!     .scalar("mElapsedTime", PrimitiveType::Float64)
//!     .text("mName", 16)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(schema.field("mElapsedTime").unwrap().offset, 4);
//! assert_eq!(schema.size(), 28);
//! ```

mod primitive;
mod record;
mod schema;

pub use primitive::{PrimitiveType, Value};
pub use record::{FromValue, Record};
pub use schema::{FieldDef, FieldKind, FieldSlot, SchemaBuilder, StructSchema};
