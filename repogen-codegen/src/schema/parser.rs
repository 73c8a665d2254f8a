use super::types::EntityDescriptor;
use crate::error::Result;
use std::path::Path;

/// Parse an entity descriptor YAML file
pub fn parse_descriptor(path: &Path) -> Result<EntityDescriptor> {
    let content = std::fs::read_to_string(path)?;
    parse_descriptor_str(&content)
}

/// Parse an entity descriptor YAML string
pub fn parse_descriptor_str(content: &str) -> Result<EntityDescriptor> {
    let descriptor: EntityDescriptor = serde_yaml::from_str(content)?;
    Ok(descriptor)
}
