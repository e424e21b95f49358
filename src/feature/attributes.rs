use serde::{Deserialize, Serialize};

/// Declared type of a source attribute field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AttributeKind {
    Integer,
    Real,
    #[default]
    String,
    Date,
    DateTime,
    Other,
}

/// One raw attribute carried over from the source layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub kind: AttributeKind,
    pub value: String,
}

impl Attribute {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: AttributeKind, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            value: value.into(),
        }
    }
}

/// Ordered attribute list; lookups return the first field with a matching name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Attributes {
    fields: Vec<Attribute>,
}

impl Attributes {
    #[must_use]
    pub fn new(fields: Vec<Attribute>) -> Self {
        Self { fields }
    }

    /// Look up `name`.
    ///
    /// Missing fields give `None`. A present field with an empty value gives
    /// `Some(default)`, otherwise its own value.
    #[must_use]
    pub fn get<'a>(&'a self, name: &str, default: &'a str) -> Option<&'a str> {
        let field = self.fields.iter().find(|f| f.name == name)?;
        if field.value.is_empty() {
            Some(default)
        } else {
            Some(field.value.as_str())
        }
    }

    #[must_use]
    pub fn kind_of(&self, name: &str) -> Option<AttributeKind> {
        self.fields.iter().find(|f| f.name == name).map(|f| f.kind)
    }

    pub fn push(&mut self, attribute: Attribute) {
        self.fields.push(attribute);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.fields.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Vec<Attribute>> for Attributes {
    fn from(fields: Vec<Attribute>) -> Self {
        Self::new(fields)
    }
}
