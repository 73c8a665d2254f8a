pub mod model;
pub mod parser;
pub mod types;

pub use model::{build_schema, Field, Schema, Traits};
pub use parser::{parse_descriptor, parse_descriptor_str};
pub use types::{DialectName, EntityDescriptor, FieldDescriptor, TemplateDescriptor};
