// ============================================================
// Layer 3 — Dataset Records
// ============================================================
// One example of a dataset split: named fields in source order.
// The first record of a split decides which per-field text files
// get written, so field order must be stable.

/// A single field value as delivered by a dataset source.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    /// Fixed or variable-shape tensor, flattened.
    Array(Vec<FieldValue>),
    /// Present in the schema but absent from this example.
    Missing,
    /// A structured value (map) with no single-line form.
    Nested,
}

impl FieldValue {
    /// Text form written to a per-field file, or `None` when the
    /// value has no single-line representation.
    ///
    /// Text is written verbatim except for line breaks, which are
    /// escaped so that one example always stays one line.
    pub fn render(&self) -> Option<String> {
        match self {
            FieldValue::Int(v)   => Some(v.to_string()),
            FieldValue::Float(v) => Some(v.to_string()),
            FieldValue::Bool(v)  => Some(v.to_string()),
            FieldValue::Text(s)  => Some(s.replace('\r', "\\r").replace('\n', "\\n")),
            FieldValue::Array(items) => {
                let mut parts = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        FieldValue::Array(_) | FieldValue::Missing | FieldValue::Nested => return None,
                        scalar => parts.push(scalar.render()?),
                    }
                }
                Some(parts.join(" "))
            }
            FieldValue::Missing | FieldValue::Nested => None,
        }
    }
}

/// One example: `(field name, value)` pairs in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, FieldValue)>,
}

impl Record {
    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Value of `name`, `Missing` when the example lacks it.
    pub fn get(&self, name: &str) -> &FieldValue {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
            .unwrap_or(&FieldValue::Missing)
    }
}

impl FromIterator<(String, FieldValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self { fields: iter.into_iter().collect() }
    }
}
