//! In-memory PDF object model.
//!
//! Every value that can appear in a PDF body is an [`Object`]. Composite
//! values own their children; indirect objects are linked through
//! [`Object::Reference`] and resolved against the owning
//! [`Document`](crate::document::Document).

use indexmap::IndexMap;

/// Identifier of an indirect object: (object number, generation number).
pub type ObjectId = (u32, u16);

/// How a string object was written in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StringFormat {
    /// `(text)`
    #[default]
    Literal,
    /// `<48656C6C6F>`
    Hexadecimal,
}

/// A PDF object.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// The `null` object.
    Null,
    /// `true` or `false`.
    Boolean(bool),
    /// Integer number.
    Integer(i64),
    /// Real number.
    Real(f64),
    /// Byte string, either literal or hexadecimal.
    String(Vec<u8>, StringFormat),
    /// Name without the leading slash, escapes already decoded.
    Name(Vec<u8>),
    /// Ordered sequence of objects.
    Array(Vec<Object>),
    /// Name-keyed mapping.
    Dictionary(Dictionary),
    /// Dictionary plus raw payload.
    Stream(Stream),
    /// Indirect reference `n g R`.
    Reference(ObjectId),
}

impl Object {
    /// Create a name object.
    pub fn name(name: impl Into<Vec<u8>>) -> Self {
        Object::Name(name.into())
    }

    /// Create a literal string object.
    pub fn string_literal(text: impl Into<Vec<u8>>) -> Self {
        Object::String(text.into(), StringFormat::Literal)
    }

    /// Create a text string: a literal for printable ASCII, otherwise
    /// UTF-16BE with a byte order mark written as hex.
    pub fn text(text: &str) -> Self {
        if text.bytes().all(|b| (0x20..0x7f).contains(&b)) {
            return Object::string_literal(text);
        }
        let mut bytes = vec![0xFE, 0xFF];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        Object::String(bytes, StringFormat::Hexadecimal)
    }

    /// Short type label used in diagnostics.
    pub fn type_label(&self) -> &'static str {
        match self {
            Object::Null => "null",
            Object::Boolean(_) => "boolean",
            Object::Integer(_) => "integer",
            Object::Real(_) => "real",
            Object::String(..) => "string",
            Object::Name(_) => "name",
            Object::Array(_) => "array",
            Object::Dictionary(_) => "dictionary",
            Object::Stream(_) => "stream",
            Object::Reference(_) => "reference",
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Object::Integer(value) => Some(*value),
            Object::Real(value) if value.fract() == 0.0 => Some(*value as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Object::Integer(value) => Some(*value as f64),
            Object::Real(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&[u8]> {
        match self {
            Object::Name(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_str_bytes(&self) -> Option<&[u8]> {
        match self {
            Object::String(bytes, _) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<ObjectId> {
        match self {
            Object::Reference(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Object>> {
        match self {
            Object::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Dictionary view of a dictionary or of a stream's dictionary.
    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            Object::Dictionary(dict) => Some(dict),
            Object::Stream(stream) => Some(&stream.dict),
            _ => None,
        }
    }

    pub fn as_dict_mut(&mut self) -> Option<&mut Dictionary> {
        match self {
            Object::Dictionary(dict) => Some(dict),
            Object::Stream(stream) => Some(&mut stream.dict),
            _ => None,
        }
    }

    pub fn as_stream(&self) -> Option<&Stream> {
        match self {
            Object::Stream(stream) => Some(stream),
            _ => None,
        }
    }

    /// Call `visit` for every reference held anywhere inside this object.
    pub fn for_each_reference(&self, visit: &mut impl FnMut(ObjectId)) {
        match self {
            Object::Reference(id) => visit(*id),
            Object::Array(items) => items.iter().for_each(|item| item.for_each_reference(visit)),
            Object::Dictionary(dict) => dict.for_each_reference(visit),
            Object::Stream(stream) => stream.dict.for_each_reference(visit),
            _ => {}
        }
    }

    /// Replace every reference inside this object with the result of `map`.
    pub fn rewrite_references(&mut self, map: &mut impl FnMut(ObjectId) -> Object) {
        match self {
            Object::Reference(id) => *self = map(*id),
            Object::Array(items) => items
                .iter_mut()
                .for_each(|item| item.rewrite_references(map)),
            Object::Dictionary(dict) => dict.rewrite_references(map),
            Object::Stream(stream) => stream.dict.rewrite_references(map),
            _ => {}
        }
    }
}

impl From<bool> for Object {
    fn from(value: bool) -> Self {
        Object::Boolean(value)
    }
}

impl From<i64> for Object {
    fn from(value: i64) -> Self {
        Object::Integer(value)
    }
}

impl From<i32> for Object {
    fn from(value: i32) -> Self {
        Object::Integer(i64::from(value))
    }
}

impl From<usize> for Object {
    fn from(value: usize) -> Self {
        Object::Integer(value as i64)
    }
}

impl From<f64> for Object {
    fn from(value: f64) -> Self {
        Object::Real(value)
    }
}

/// String slices become names, which is what dictionary literals need
/// far more often than text strings.
impl From<&str> for Object {
    fn from(value: &str) -> Self {
        Object::Name(value.as_bytes().to_vec())
    }
}

impl From<ObjectId> for Object {
    fn from(id: ObjectId) -> Self {
        Object::Reference(id)
    }
}

impl From<Vec<Object>> for Object {
    fn from(items: Vec<Object>) -> Self {
        Object::Array(items)
    }
}

impl From<Dictionary> for Object {
    fn from(dict: Dictionary) -> Self {
        Object::Dictionary(dict)
    }
}

impl From<Stream> for Object {
    fn from(stream: Stream) -> Self {
        Object::Stream(stream)
    }
}

/// A PDF dictionary. Keys are names without the leading slash; insertion
/// order is kept so that a parsed dictionary serializes in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dictionary(IndexMap<Vec<u8>, Object>);

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &[u8]) -> Option<&Object> {
        self.0.get(key)
    }

    pub fn get_mut(&mut self, key: &[u8]) -> Option<&mut Object> {
        self.0.get_mut(key)
    }

    pub fn has(&self, key: &[u8]) -> bool {
        self.0.contains_key(key)
    }

    /// Insert or replace an entry, keeping the position of an existing key.
    pub fn set(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Object>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &[u8]) -> Option<Object> {
        self.0.shift_remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Vec<u8>, &Object)> {
        self.0.iter()
    }

    /// Value of `/Type`, if it is a name.
    pub fn type_name(&self) -> Option<&[u8]> {
        self.get(b"Type").and_then(Object::as_name)
    }

    /// Whether `/Type` equals `name`.
    pub fn has_type(&self, name: &[u8]) -> bool {
        self.type_name() == Some(name)
    }

    pub fn for_each_reference(&self, visit: &mut impl FnMut(ObjectId)) {
        self.0
            .values()
            .for_each(|value| value.for_each_reference(visit));
    }

    pub fn rewrite_references(&mut self, map: &mut impl FnMut(ObjectId) -> Object) {
        self.0
            .values_mut()
            .for_each(|value| value.rewrite_references(map));
    }
}

impl FromIterator<(Vec<u8>, Object)> for Dictionary {
    fn from_iter<I: IntoIterator<Item = (Vec<u8>, Object)>>(iter: I) -> Self {
        Dictionary(iter.into_iter().collect())
    }
}

/// A stream object: its dictionary and the payload exactly as stored in
/// the file (still encoded by whatever `/Filter` says).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stream {
    pub dict: Dictionary,
    pub content: Vec<u8>,
}

impl Stream {
    pub fn new(dict: Dictionary, content: Vec<u8>) -> Self {
        Self { dict, content }
    }

    /// Filter names in application order.
    pub fn filters(&self) -> Vec<&[u8]> {
        match self.dict.get(b"Filter") {
            Some(Object::Name(name)) => vec![name.as_slice()],
            Some(Object::Array(items)) => items.iter().filter_map(Object::as_name).collect(),
            _ => Vec::new(),
        }
    }
}

/// Build a [`Dictionary`] from `"Key" => value` pairs.
///
/// ```
/// use pdfsplice::dictionary;
///
/// let page = dictionary! {
///     "Type" => "Page",
///     "Rotate" => 90,
/// };
/// assert!(page.has_type(b"Page"));
/// ```
#[macro_export]
macro_rules! dictionary {
    () => {
        $crate::object::Dictionary::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut dict = $crate::object::Dictionary::new();
        $(
            dict.set($key, $value);
        )+
        dict
    }};
}
