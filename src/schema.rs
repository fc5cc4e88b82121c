//! Positional field schemas and the bounds-checked cursor that walks them.
//!
//! The wire format carries no tags: a block is a fixed, ordered list of
//! little endian fields. Each block layout is described once as a [Field] slice
//! and read (or written) by the same generic [Cursor] (or [Writer]).
use crate::Error;

/// Wire type of a [Field]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FieldKind {
    U8,
    U16,
    I32,
    I64,
    F32,
    F64,
}

impl FieldKind {
    /// Width on the wire, in bytes
    pub const fn width(&self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::I32 | Self::F32 => 4,
            Self::I64 | Self::F64 => 8,
        }
    }
}

/// One named, fixed width field
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl Field {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }
}

/// Total width of a schema, in bytes
pub const fn schema_width(schema: &[Field]) -> usize {
    let mut width = 0;
    let mut i = 0;
    while i < schema.len() {
        width += schema[i].kind.width();
        i += 1;
    }
    width
}

/// Decoded field [Value]
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Value {
    U8(u8),
    U16(u16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl Value {
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::U8(_) => FieldKind::U8,
            Self::U16(_) => FieldKind::U16,
            Self::I32(_) => FieldKind::I32,
            Self::I64(_) => FieldKind::I64,
            Self::F32(_) => FieldKind::F32,
            Self::F64(_) => FieldKind::F64,
        }
    }

    fn write_le(&self, buf: &mut Vec<u8>) {
        match self {
            Self::U8(v) => buf.push(*v),
            Self::U16(v) => buf.extend_from_slice(&v.to_le_bytes()),
            Self::I32(v) => buf.extend_from_slice(&v.to_le_bytes()),
            Self::I64(v) => buf.extend_from_slice(&v.to_le_bytes()),
            Self::F32(v) => buf.extend_from_slice(&v.to_le_bytes()),
            Self::F64(v) => buf.extend_from_slice(&v.to_le_bytes()),
        }
    }
}

/// One decoded block: values in schema order
#[derive(Debug, Clone, PartialEq)]
pub struct Fields {
    schema: &'static [Field],
    values: Vec<Value>,
}

impl Fields {
    fn value(&self, name: &'static str) -> Result<Value, Error> {
        self.schema
            .iter()
            .position(|field| field.name == name)
            .and_then(|index| self.values.get(index).copied())
            .ok_or(Error::SchemaMismatch(name))
    }

    pub fn i32(&self, name: &'static str) -> Result<i32, Error> {
        match self.value(name)? {
            Value::I32(v) => Ok(v),
            _ => Err(Error::SchemaMismatch(name)),
        }
    }

    pub fn i64(&self, name: &'static str) -> Result<i64, Error> {
        match self.value(name)? {
            Value::I64(v) => Ok(v),
            _ => Err(Error::SchemaMismatch(name)),
        }
    }

    pub fn f32(&self, name: &'static str) -> Result<f32, Error> {
        match self.value(name)? {
            Value::F32(v) => Ok(v),
            _ => Err(Error::SchemaMismatch(name)),
        }
    }

    pub fn f64(&self, name: &'static str) -> Result<f64, Error> {
        match self.value(name)? {
            Value::F64(v) => Ok(v),
            _ => Err(Error::SchemaMismatch(name)),
        }
    }
}

/// Bounds-checked reader over a byte slice.
/// Fails on underrun instead of reading past the end.
#[derive(Debug)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.offset
    }

    /// Fails with [Error::Underrun] unless `needed` bytes remain.
    pub fn ensure(&self, needed: usize) -> Result<(), Error> {
        if needed > self.remaining() {
            Err(Error::Underrun {
                offset: self.offset,
                needed,
                available: self.remaining(),
            })
        } else {
            Ok(())
        }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        self.ensure(N)?;
        let mut bytes = [0; N];
        bytes.copy_from_slice(&self.buf[self.offset..self.offset + N]);
        self.offset += N;
        Ok(bytes)
    }

    /// Reads one value of this kind and advances by its width.
    pub fn read(&mut self, kind: FieldKind) -> Result<Value, Error> {
        Ok(match kind {
            FieldKind::U8 => Value::U8(self.take::<1>()?[0]),
            FieldKind::U16 => Value::U16(u16::from_le_bytes(self.take()?)),
            FieldKind::I32 => Value::I32(i32::from_le_bytes(self.take()?)),
            FieldKind::I64 => Value::I64(i64::from_le_bytes(self.take()?)),
            FieldKind::F32 => Value::F32(f32::from_le_bytes(self.take()?)),
            FieldKind::F64 => Value::F64(f64::from_le_bytes(self.take()?)),
        })
    }

    /// Reads a complete block. Nothing is consumed when the block does not fit.
    pub fn read_fields(&mut self, schema: &'static [Field]) -> Result<Fields, Error> {
        self.ensure(schema_width(schema))?;

        let values = schema
            .iter()
            .map(|field| self.read(field.kind))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Fields { schema, values })
    }
}

/// Little endian block [Writer], the counterpart of [Cursor].
#[derive(Debug, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn write(&mut self, value: Value) {
        value.write_le(&mut self.buf);
    }

    /// Writes one block, values must follow the schema order and kinds.
    pub fn write_fields(&mut self, schema: &[Field], values: &[Value]) -> Result<(), Error> {
        if let Some(field) = schema.get(values.len()) {
            return Err(Error::SchemaMismatch(field.name));
        }

        if values.len() > schema.len() {
            return Err(Error::SchemaMismatch("<trailing value>"));
        }

        if let Some(field) = schema
            .iter()
            .zip(values.iter())
            .find_map(|(field, value)| (field.kind != value.kind()).then_some(field))
        {
            return Err(Error::SchemaMismatch(field.name));
        }

        for value in values {
            self.write(*value);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}
