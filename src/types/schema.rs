//! Declarative structure schemas
//!
//! A [`StructSchema`] is a flat table of fields (name, byte offset, kind, optional
//! fixed repeat count). Nested structures reference another schema. The table is
//! the single source of truth for both decoding and encoding, so offsets here are
//! a compatibility contract with the writer process.

use std::collections::HashMap;
use std::sync::Arc;

use super::PrimitiveType;
use crate::{Result, TelemetryError};

/// Kind of data stored in a field.
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// A single primitive value
    Primitive(PrimitiveType),
    /// Fixed-length byte array holding zero-terminated text
    Text(usize),
    /// Fixed-length opaque byte array
    Bytes(usize),
    /// An embedded structure
    Nested(Arc<StructSchema>),
}

impl FieldKind {
    /// Size in bytes of one element of this kind.
    pub fn size(&self) -> usize {
        match self {
            FieldKind::Primitive(ty) => ty.size(),
            FieldKind::Text(len) | FieldKind::Bytes(len) => *len,
            FieldKind::Nested(schema) => schema.size(),
        }
    }

    /// Natural alignment of one element of this kind.
    pub fn align(&self) -> usize {
        match self {
            FieldKind::Primitive(ty) => ty.align(),
            FieldKind::Text(_) | FieldKind::Bytes(_) => 1,
            FieldKind::Nested(schema) => schema.align(),
        }
    }
}

/// One entry of a schema table.
#[derive(Debug, Clone)]
pub struct FieldDef {
    /// Field name as declared by the writer
    pub name: String,
    /// Byte offset from the start of the enclosing structure
    pub offset: usize,
    /// Element kind
    pub kind: FieldKind,
    /// Fixed repeat count (`None` for a scalar field)
    pub repeat: Option<usize>,
}

impl FieldDef {
    /// Total number of bytes covered by this field.
    pub fn span(&self) -> usize {
        self.kind.size() * self.repeat.unwrap_or(1)
    }
}

/// Resolved location of a (possibly nested, possibly indexed) field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSlot<'a> {
    /// Absolute byte offset from the start of the root structure
    pub offset: usize,
    /// Kind of the addressed element
    pub kind: &'a FieldKind,
    /// Remaining repeat count when the path stopped at an unindexed array
    pub repeat: Option<usize>,
}

/// Declarative description of a fixed-size binary structure.
#[derive(Debug)]
pub struct StructSchema {
    name: String,
    size: usize,
    align: usize,
    fields: Vec<FieldDef>,
    index: HashMap<String, usize>,
}

impl StructSchema {
    /// Create a schema from an explicit field table, validating it.
    pub fn new(name: impl Into<String>, size: usize, fields: Vec<FieldDef>) -> Result<Self> {
        let align = fields.iter().map(|f| f.kind.align()).max().unwrap_or(1);
        let schema = Self::assemble(name.into(), size, align, fields);
        schema.validate()?;
        Ok(schema)
    }

    /// Start a schema whose offsets are computed under `#pragma pack(pack)` rules.
    pub fn builder(name: impl Into<String>, pack: usize) -> SchemaBuilder {
        SchemaBuilder::new(name, pack)
    }

    fn assemble(name: String, size: usize, align: usize, fields: Vec<FieldDef>) -> Self {
        let index = fields.iter().enumerate().map(|(i, f)| (f.name.clone(), i)).collect();
        Self { name, size, align, fields, index }
    }

    /// Structure name, used in error messages.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Exact size in bytes of one instance.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Alignment of the structure after packing.
    pub fn align(&self) -> usize {
        self.align
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Look up a direct field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    /// Validate the table for internal consistency.
    pub fn validate(&self) -> Result<()> {
        if self.index.len() != self.fields.len() {
            return Err(TelemetryError::schema_error(format!(
                "{} declares a field name more than once",
                self.name
            )));
        }

        let mut ordered: Vec<&FieldDef> = self.fields.iter().collect();
        ordered.sort_by_key(|f| f.offset);

        let mut end_of_previous = 0usize;
        let mut previous_name = "";
        for field in ordered {
            if field.repeat == Some(0) {
                return Err(TelemetryError::schema_error(format!(
                    "{}.{} has a repeat count of 0",
                    self.name, field.name
                )));
            }

            if field.offset < end_of_previous {
                return Err(TelemetryError::schema_error(format!(
                    "{}.{} overlaps {}",
                    self.name, field.name, previous_name
                )));
            }

            let end = field.offset + field.span();
            if end > self.size {
                return Err(TelemetryError::schema_error(format!(
                    "{}.{} ends at byte {} but the structure is {} bytes",
                    self.name, field.name, end, self.size
                )));
            }

            end_of_previous = end;
            previous_name = &field.name;
        }

        Ok(())
    }

    /// Resolve a path like `mWheels[2].mTemperature[0]` to its absolute location.
    pub fn locate(&self, path: &str) -> Option<FieldSlot<'_>> {
        let mut schema = self;
        let mut offset = 0usize;
        let mut segments = path.split('.').peekable();

        while let Some(segment) = segments.next() {
            let (name, index) = parse_segment(segment)?;
            let field = schema.field(name)?;
            offset += field.offset;

            let repeat = match (index, field.repeat) {
                (Some(i), Some(count)) if i < count => {
                    offset += i * field.kind.size();
                    None
                }
                (Some(_), _) => return None,
                (None, repeat) => repeat,
            };

            if segments.peek().is_none() {
                return Some(FieldSlot { offset, kind: &field.kind, repeat });
            }

            match (&field.kind, repeat) {
                (FieldKind::Nested(nested), None) => schema = nested,
                _ => return None,
            }
        }

        None
    }
}

fn parse_segment(segment: &str) -> Option<(&str, Option<usize>)> {
    match segment.split_once('[') {
        None => Some((segment, None)),
        Some((name, rest)) => {
            let index = rest.strip_suffix(']')?.parse().ok()?;
            Some((name, Some(index)))
        }
    }
}

/// Computes field offsets the way a C compiler does under `#pragma pack(n)`.
///
/// Each member is aligned to `min(natural alignment, pack)`; the structure size is
/// rounded up to the largest member alignment.
#[derive(Debug)]
pub struct SchemaBuilder {
    name: String,
    pack: usize,
    cursor: usize,
    max_align: usize,
    fields: Vec<FieldDef>,
}

impl SchemaBuilder {
    pub fn new(name: impl Into<String>, pack: usize) -> Self {
        Self { name: name.into(), pack: pack.max(1), cursor: 0, max_align: 1, fields: Vec::new() }
    }

    fn push(mut self, name: &str, kind: FieldKind, repeat: Option<usize>) -> Self {
        let align = kind.align().min(self.pack);
        self.cursor = self.cursor.next_multiple_of(align);
        self.max_align = self.max_align.max(align);

        let field = FieldDef { name: name.to_string(), offset: self.cursor, kind, repeat };
        self.cursor += field.span();
        self.fields.push(field);
        self
    }

    pub fn scalar(self, name: &str, ty: PrimitiveType) -> Self {
        self.push(name, FieldKind::Primitive(ty), None)
    }

    pub fn array(self, name: &str, ty: PrimitiveType, count: usize) -> Self {
        self.push(name, FieldKind::Primitive(ty), Some(count))
    }

    pub fn text(self, name: &str, len: usize) -> Self {
        self.push(name, FieldKind::Text(len), None)
    }

    pub fn bytes(self, name: &str, len: usize) -> Self {
        self.push(name, FieldKind::Bytes(len), None)
    }

    pub fn nested(self, name: &str, schema: &Arc<StructSchema>) -> Self {
        self.push(name, FieldKind::Nested(Arc::clone(schema)), None)
    }

    pub fn nested_array(self, name: &str, schema: &Arc<StructSchema>, count: usize) -> Self {
        self.push(name, FieldKind::Nested(Arc::clone(schema)), Some(count))
    }

    /// Current offset, i.e. where the next field would start before alignment.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Finish the structure, padding its size to the structure alignment.
    pub fn build(self) -> Result<Arc<StructSchema>> {
        let size = self.cursor.next_multiple_of(self.max_align);
        let schema = StructSchema::assemble(self.name, size, self.max_align, self.fields);
        schema.validate()?;
        Ok(Arc::new(schema))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vec3() -> Arc<StructSchema> {
        StructSchema::builder("Vec3", 4)
            .scalar("x", PrimitiveType::Float64)
            .scalar("y", PrimitiveType::Float64)
            .scalar("z", PrimitiveType::Float64)
            .build()
            .unwrap()
    }

    #[test]
    fn pack_four_aligns_doubles_to_four_bytes() {
        let schema = StructSchema::builder("Mixed", 4)
            .scalar("id", PrimitiveType::Int32)
            .scalar("dt", PrimitiveType::Float64)
            .scalar("flag", PrimitiveType::UInt8)
            .scalar("et", PrimitiveType::Float64)
            .build()
            .unwrap();

        assert_eq!(schema.field("dt").unwrap().offset, 4);
        assert_eq!(schema.field("flag").unwrap().offset, 12);
        assert_eq!(schema.field("et").unwrap().offset, 16);
        assert_eq!(schema.size(), 24);
        assert_eq!(schema.align(), 4);
    }

    #[test]
    fn natural_packing_aligns_doubles_to_eight_bytes() {
        let schema = StructSchema::builder("Mixed", 8)
            .scalar("id", PrimitiveType::Int32)
            .scalar("dt", PrimitiveType::Float64)
            .scalar("flag", PrimitiveType::UInt8)
            .build()
            .unwrap();

        assert_eq!(schema.field("dt").unwrap().offset, 8);
        assert_eq!(schema.size(), 24);
    }

    #[test]
    fn byte_only_structs_are_not_padded() {
        let schema = StructSchema::builder("Name", 4).text("name", 18).build().unwrap();
        assert_eq!(schema.size(), 18);
        assert_eq!(schema.align(), 1);
    }

    #[test]
    fn locate_walks_nested_repeats() {
        let vec3 = vec3();
        let schema = StructSchema::builder("Body", 4)
            .scalar("id", PrimitiveType::Int32)
            .nested_array("ori", &vec3, 3)
            .build()
            .unwrap();

        let slot = schema.locate("ori[2].y").unwrap();
        assert_eq!(slot.offset, 4 + 2 * 24 + 8);
        assert!(matches!(slot.kind, FieldKind::Primitive(PrimitiveType::Float64)));

        let whole = schema.locate("ori").unwrap();
        assert_eq!(whole.repeat, Some(3));

        assert!(schema.locate("ori[3].y").is_none());
        assert!(schema.locate("ori.y").is_none());
        assert!(schema.locate("id[0]").is_none());
        assert!(schema.locate("missing").is_none());
        assert!(schema.locate("ori[x]").is_none());
    }

    #[test]
    fn explicit_tables_are_validated() {
        let overlapping = vec![
            FieldDef {
                name: "a".into(),
                offset: 0,
                kind: FieldKind::Primitive(PrimitiveType::Int32),
                repeat: None,
            },
            FieldDef {
                name: "b".into(),
                offset: 2,
                kind: FieldKind::Primitive(PrimitiveType::Int32),
                repeat: None,
            },
        ];
        assert!(StructSchema::new("Overlap", 8, overlapping).is_err());

        let too_long = vec![FieldDef {
            name: "a".into(),
            offset: 4,
            kind: FieldKind::Primitive(PrimitiveType::Float64),
            repeat: None,
        }];
        assert!(StructSchema::new("Short", 8, too_long).is_err());

        let empty_repeat = vec![FieldDef {
            name: "a".into(),
            offset: 0,
            kind: FieldKind::Bytes(4),
            repeat: Some(0),
        }];
        assert!(StructSchema::new("Empty", 8, empty_repeat).is_err());

        let ok = vec![FieldDef {
            name: "a".into(),
            offset: 4,
            kind: FieldKind::Primitive(PrimitiveType::Float32),
            repeat: None,
        }];
        let schema = StructSchema::new("Ok", 8, ok).unwrap();
        assert_eq!(schema.align(), 4);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let result = StructSchema::builder("Dup", 4)
            .scalar("a", PrimitiveType::Int32)
            .scalar("a", PrimitiveType::Int32)
            .build();
        assert!(matches!(result, Err(TelemetryError::Schema { .. })));
    }
}
