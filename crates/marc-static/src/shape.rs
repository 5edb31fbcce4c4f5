//! Record shapes for static reference data
//!
//! A shape names a kind of reference record and the fields each value must
//! carry. The catalog ships with the built-in shapes and accepts more from
//! configuration.

use serde::{Deserialize, Serialize};

/// Required structure of one kind of static record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    /// Canonical name (`material_types`)
    pub name: String,
    /// Other accepted names (`mtype`)
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Fields that must be present and not null
    #[serde(default)]
    pub required: Vec<String>,
    /// Fields that, when present, must be non-empty strings
    #[serde(default)]
    pub strings: Vec<String>,
    /// Fields that, when present, must be objects
    #[serde(default)]
    pub objects: Vec<String>,
}

impl Shape {
    /// Create shape with no field constraints
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            required: Vec::new(),
            strings: Vec::new(),
            objects: Vec::new(),
        }
    }

    /// Add accepted aliases
    #[must_use]
    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases.extend(aliases.iter().map(ToString::to_string));
        self
    }

    /// Add required string fields
    #[must_use]
    pub fn with_required_strings(mut self, fields: &[&str]) -> Self {
        for field in fields {
            self.required.push((*field).to_string());
            self.strings.push((*field).to_string());
        }
        self
    }

    /// Add a required object field
    #[must_use]
    pub fn with_required_object(mut self, field: &str) -> Self {
        self.required.push(field.to_string());
        self.objects.push(field.to_string());
        self
    }

    /// Whether `name` refers to this shape
    #[must_use]
    pub fn answers_to(&self, name: &str) -> bool {
        let wanted = normalize(name);
        normalize(&self.name) == wanted || self.aliases.iter().any(|a| normalize(a) == wanted)
    }
}

/// Case-insensitive, with `-` read as `_`
fn normalize(name: &str) -> String {
    name.trim().to_ascii_lowercase().replace('-', "_")
}

/// Known shapes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeCatalog {
    shapes: Vec<Shape>,
}

impl Default for ShapeCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ShapeCatalog {
    /// Create empty catalog
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self { shapes: Vec::new() }
    }

    /// Create catalog with the built-in shapes
    #[must_use]
    pub fn builtin() -> Self {
        let mut catalog = Self::empty();
        catalog.register(
            Shape::new("material_types")
                .with_aliases(&["mtype", "materialtype"])
                .with_required_strings(&["name"]),
        );
        catalog.register(
            Shape::new("loan_types")
                .with_aliases(&["loantype"])
                .with_required_strings(&["name"]),
        );
        catalog.register(Shape::new("identifier_types").with_required_strings(&["name"]));
        catalog.register(Shape::new("contributor_name_types").with_required_strings(&["name"]));
        catalog.register(
            Shape::new("instance_types").with_required_strings(&["name", "code", "source"]),
        );
        catalog.register(
            Shape::new("locations")
                .with_aliases(&["shelflocation"])
                .with_required_strings(&["name", "code"]),
        );
        catalog.register(
            Shape::new("templates")
                .with_required_strings(&["name"])
                .with_required_object("template"),
        );
        catalog
    }

    /// Add a shape, replacing one with the same canonical name
    pub fn register(&mut self, shape: Shape) {
        match self.shapes.iter_mut().find(|s| s.name == shape.name) {
            Some(existing) => *existing = shape,
            None => self.shapes.push(shape),
        }
    }

    /// Add several shapes
    #[must_use]
    pub fn with_shapes(mut self, shapes: impl IntoIterator<Item = Shape>) -> Self {
        for shape in shapes {
            self.register(shape);
        }
        self
    }

    /// Find the shape a type name refers to
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.answers_to(name))
    }

    /// Canonical names, in registration order
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.shapes.iter().map(|s| s.name.as_str()).collect()
    }

    /// Get number of shapes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// Check if catalog is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_aliases_case_insensitively() {
        let catalog = ShapeCatalog::builtin();
        assert_eq!(catalog.resolve("mtype").unwrap().name, "material_types");
        assert_eq!(catalog.resolve("Material-Types").unwrap().name, "material_types");
        assert_eq!(catalog.resolve("SHELFLOCATION").unwrap().name, "locations");
        assert!(catalog.resolve("widgets").is_none());
    }

    #[test]
    fn builtin_names() {
        assert_eq!(
            ShapeCatalog::builtin().names(),
            vec![
                "material_types",
                "loan_types",
                "identifier_types",
                "contributor_name_types",
                "instance_types",
                "locations",
                "templates"
            ]
        );
    }

    #[test]
    fn register_replaces_by_name() {
        let catalog = ShapeCatalog::builtin().with_shapes([
            Shape::new("material_types").with_required_strings(&["name", "code"]),
            Shape::new("statistical_codes").with_required_strings(&["code"]),
        ]);
        assert_eq!(catalog.len(), 8);
        let material = catalog.resolve("material_types").unwrap();
        assert_eq!(material.required, vec!["name", "code"]);
        assert!(material.aliases.is_empty());
        assert!(catalog.resolve("statistical-codes").is_some());
    }

    #[test]
    fn shape_deserializes_with_defaults() {
        let shape: Shape =
            serde_json::from_str(r#"{ "name": "holdings_types", "required": ["name"] }"#).unwrap();
        assert_eq!(shape.required, vec!["name"]);
        assert!(shape.strings.is_empty());
        assert!(ShapeCatalog::empty().is_empty());
    }
}
