//! GzipNbtCodec - gzip container + big-endian named tags
//!
//! Decoding fully inflates the payload first, then parses from memory, so a
//! half-written upload surfaces as `Truncated` (either from the gzip trailer
//! check or from the parser running out of bytes).

use super::mutf8;
use crate::features::nbt::domain::{NbtCompound, NbtDocument, NbtList, Tag, TagId};
use crate::features::nbt::error::{NbtError, NbtResult};
use crate::features::nbt::ports::DocumentCodec;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{self, Cursor, Read, Write};

/// Nesting limit matching the game's own reader
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Inflated payload cap; real schematics are a few MiB at most
pub const DEFAULT_MAX_PAYLOAD_BYTES: u64 = 64 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct GzipNbtCodec {
    max_depth: usize,
    max_payload_bytes: u64,
}

impl Default for GzipNbtCodec {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}

impl GzipNbtCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth,
            ..Self::default()
        }
    }

    pub fn with_max_payload_bytes(mut self, max_payload_bytes: u64) -> Self {
        self.max_payload_bytes = max_payload_bytes;
        self
    }

    /// Inflate at most `max_payload_bytes`; anything larger is rejected
    /// before it is fully buffered
    fn inflate(&self, bytes: &[u8]) -> NbtResult<Vec<u8>> {
        let mut limited = GzDecoder::new(bytes).take(self.max_payload_bytes.saturating_add(1));
        let mut payload = Vec::new();
        limited
            .read_to_end(&mut payload)
            .map_err(classify_gzip_error)?;
        if payload.len() as u64 > self.max_payload_bytes {
            return Err(NbtError::Malformed(format!(
                "inflated payload exceeds {} bytes",
                self.max_payload_bytes
            )));
        }
        Ok(payload)
    }

    /// Parse an uncompressed payload
    pub fn decode_payload(&self, payload: &[u8]) -> NbtResult<NbtDocument> {
        let mut reader = TagReader {
            cursor: Cursor::new(payload),
            max_depth: self.max_depth,
        };
        reader.read_root()
    }

    /// Serialize without compression
    pub fn encode_payload(&self, document: &NbtDocument) -> NbtResult<Vec<u8>> {
        let mut writer = TagWriter { buf: Vec::new() };
        writer.write_root(document)?;
        Ok(writer.buf)
    }
}

impl DocumentCodec for GzipNbtCodec {
    fn decode(&self, bytes: &[u8]) -> NbtResult<NbtDocument> {
        let payload = self.inflate(bytes)?;
        self.decode_payload(&payload)
    }

    fn encode(&self, document: &NbtDocument) -> NbtResult<Vec<u8>> {
        let payload = self.encode_payload(document)?;
        let mut encoder = GzEncoder::new(Vec::with_capacity(payload.len() / 2), Compression::default());
        encoder.write_all(&payload).map_err(encode_io)?;
        encoder.finish().map_err(encode_io)
    }
}

fn classify_gzip_error(e: io::Error) -> NbtError {
    match e.kind() {
        io::ErrorKind::UnexpectedEof => NbtError::Truncated(format!("gzip stream: {}", e)),
        _ => NbtError::CorruptStream(e.to_string()),
    }
}

fn eof(e: io::Error) -> NbtError {
    NbtError::Truncated(e.to_string())
}

fn encode_io(e: io::Error) -> NbtError {
    NbtError::Encode(e.to_string())
}

// ═══════════════════════════════════════════════════════════════════════════
// Reader
// ═══════════════════════════════════════════════════════════════════════════

struct TagReader<'a> {
    cursor: Cursor<&'a [u8]>,
    max_depth: usize,
}

impl<'a> TagReader<'a> {
    fn remaining(&self) -> usize {
        let len = self.cursor.get_ref().len();
        len.saturating_sub(self.cursor.position() as usize)
    }

    fn read_root(&mut self) -> NbtResult<NbtDocument> {
        let id = self.read_tag_id()?;
        if id != TagId::Compound {
            return Err(NbtError::Malformed(format!(
                "root tag must be a compound, found {:?}",
                id
            )));
        }
        let root_name = self.read_string()?;
        let root = self.read_compound(1)?;
        Ok(NbtDocument { root_name, root })
    }

    fn read_tag_id(&mut self) -> NbtResult<TagId> {
        let raw = self.cursor.read_u8().map_err(eof)?;
        TagId::from_u8(raw).ok_or_else(|| NbtError::Malformed(format!("unknown tag id {}", raw)))
    }

    fn read_string(&mut self) -> NbtResult<String> {
        let len = self.cursor.read_u16::<BigEndian>().map_err(eof)? as usize;
        let bytes = self.take(len)?;
        mutf8::decode(bytes).map_err(NbtError::Malformed)
    }

    fn take(&mut self, len: usize) -> NbtResult<&'a [u8]> {
        if len > self.remaining() {
            return Err(NbtError::Truncated(format!(
                "need {} bytes, {} left",
                len,
                self.remaining()
            )));
        }
        let start = self.cursor.position() as usize;
        let data: &'a [u8] = *self.cursor.get_ref();
        self.cursor.set_position((start + len) as u64);
        Ok(&data[start..start + len])
    }

    /// Array/list length: negative is malformed, longer than the data is truncated
    fn read_length(&mut self, min_element_size: usize) -> NbtResult<usize> {
        let len = self.cursor.read_i32::<BigEndian>().map_err(eof)?;
        if len < 0 {
            return Err(NbtError::Malformed(format!("negative length {}", len)));
        }
        let len = len as usize;
        if len.saturating_mul(min_element_size) > self.remaining() {
            return Err(NbtError::Truncated(format!(
                "length {} exceeds remaining {} bytes",
                len,
                self.remaining()
            )));
        }
        Ok(len)
    }

    fn read_payload(&mut self, id: TagId, depth: usize) -> NbtResult<Tag> {
        let tag = match id {
            TagId::End => {
                return Err(NbtError::Malformed("unexpected end tag".to_string()));
            }
            TagId::Byte => Tag::Byte(self.cursor.read_i8().map_err(eof)?),
            TagId::Short => Tag::Short(self.cursor.read_i16::<BigEndian>().map_err(eof)?),
            TagId::Int => Tag::Int(self.cursor.read_i32::<BigEndian>().map_err(eof)?),
            TagId::Long => Tag::Long(self.cursor.read_i64::<BigEndian>().map_err(eof)?),
            TagId::Float => Tag::Float(self.cursor.read_f32::<BigEndian>().map_err(eof)?),
            TagId::Double => Tag::Double(self.cursor.read_f64::<BigEndian>().map_err(eof)?),
            TagId::ByteArray => {
                let len = self.read_length(1)?;
                let bytes = self.take(len)?;
                Tag::ByteArray(bytes.iter().map(|&b| b as i8).collect())
            }
            TagId::String => Tag::String(self.read_string()?),
            TagId::List => Tag::List(self.read_list(depth)?),
            TagId::Compound => Tag::Compound(self.read_compound(depth)?),
            TagId::IntArray => {
                let len = self.read_length(4)?;
                let mut values = vec![0i32; len];
                self.cursor
                    .read_i32_into::<BigEndian>(&mut values)
                    .map_err(eof)?;
                Tag::IntArray(values)
            }
            TagId::LongArray => {
                let len = self.read_length(8)?;
                let mut values = vec![0i64; len];
                self.cursor
                    .read_i64_into::<BigEndian>(&mut values)
                    .map_err(eof)?;
                Tag::LongArray(values)
            }
        };
        Ok(tag)
    }

    fn check_depth(&self, depth: usize) -> NbtResult<()> {
        if depth > self.max_depth {
            return Err(NbtError::Malformed(format!(
                "nesting deeper than {}",
                self.max_depth
            )));
        }
        Ok(())
    }

    fn read_compound(&mut self, depth: usize) -> NbtResult<NbtCompound> {
        self.check_depth(depth)?;
        let mut compound = NbtCompound::new();
        loop {
            let id = self.read_tag_id()?;
            if id == TagId::End {
                break;
            }
            let key = self.read_string()?;
            let value = self.read_payload(id, depth + 1)?;
            compound.insert(key, value);
        }
        Ok(compound)
    }

    fn read_list(&mut self, depth: usize) -> NbtResult<NbtList> {
        self.check_depth(depth)?;
        let element_id = self.read_tag_id()?;
        let len = self.read_length(0)?;
        if element_id == TagId::End && len > 0 {
            return Err(NbtError::Malformed(
                "list of end tags with non-zero length".to_string(),
            ));
        }
        // Every element occupies at least one byte
        if len > self.remaining() {
            return Err(NbtError::Truncated(format!(
                "list of {} elements exceeds remaining {} bytes",
                len,
                self.remaining()
            )));
        }
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(self.read_payload(element_id, depth + 1)?);
        }
        Ok(NbtList::new(element_id, items))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Writer
// ═══════════════════════════════════════════════════════════════════════════

struct TagWriter {
    buf: Vec<u8>,
}

impl TagWriter {
    fn write_root(&mut self, document: &NbtDocument) -> NbtResult<()> {
        self.buf.write_u8(TagId::Compound.as_u8()).map_err(encode_io)?;
        self.write_string(&document.root_name)?;
        self.write_compound(&document.root)
    }

    fn write_string(&mut self, s: &str) -> NbtResult<()> {
        let bytes = mutf8::encode(s);
        if bytes.len() > u16::MAX as usize {
            return Err(NbtError::Encode(format!(
                "string of {} encoded bytes exceeds 65535",
                bytes.len()
            )));
        }
        self.buf
            .write_u16::<BigEndian>(bytes.len() as u16)
            .map_err(encode_io)?;
        self.buf.write_all(&bytes).map_err(encode_io)
    }

    fn write_length(&mut self, len: usize) -> NbtResult<()> {
        let len = i32::try_from(len)
            .map_err(|_| NbtError::Encode(format!("length {} exceeds i32", len)))?;
        self.buf.write_i32::<BigEndian>(len).map_err(encode_io)
    }

    fn write_payload(&mut self, tag: &Tag) -> NbtResult<()> {
        match tag {
            Tag::Byte(v) => self.buf.write_i8(*v).map_err(encode_io),
            Tag::Short(v) => self.buf.write_i16::<BigEndian>(*v).map_err(encode_io),
            Tag::Int(v) => self.buf.write_i32::<BigEndian>(*v).map_err(encode_io),
            Tag::Long(v) => self.buf.write_i64::<BigEndian>(*v).map_err(encode_io),
            Tag::Float(v) => self.buf.write_f32::<BigEndian>(*v).map_err(encode_io),
            Tag::Double(v) => self.buf.write_f64::<BigEndian>(*v).map_err(encode_io),
            Tag::ByteArray(values) => {
                self.write_length(values.len())?;
                self.buf.extend(values.iter().map(|&b| b as u8));
                Ok(())
            }
            Tag::String(s) => self.write_string(s),
            Tag::List(list) => self.write_list(list),
            Tag::Compound(compound) => self.write_compound(compound),
            Tag::IntArray(values) => {
                self.write_length(values.len())?;
                for v in values {
                    self.buf.write_i32::<BigEndian>(*v).map_err(encode_io)?;
                }
                Ok(())
            }
            Tag::LongArray(values) => {
                self.write_length(values.len())?;
                for v in values {
                    self.buf.write_i64::<BigEndian>(*v).map_err(encode_io)?;
                }
                Ok(())
            }
        }
    }

    fn write_compound(&mut self, compound: &NbtCompound) -> NbtResult<()> {
        for (key, value) in compound.iter() {
            self.buf.write_u8(value.id().as_u8()).map_err(encode_io)?;
            self.write_string(key)?;
            self.write_payload(value)?;
        }
        self.buf.write_u8(TagId::End.as_u8()).map_err(encode_io)
    }

    fn write_list(&mut self, list: &NbtList) -> NbtResult<()> {
        if !list.is_homogeneous() {
            return Err(NbtError::Encode(format!(
                "list declared as {:?} holds other tag types",
                list.element_id()
            )));
        }
        self.buf
            .write_u8(list.element_id().as_u8())
            .map_err(encode_io)?;
        self.write_length(list.len())?;
        for item in list.iter() {
            self.write_payload(item)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_document() -> NbtDocument {
        let components: NbtCompound = [
            ("create:clipboard_pages", Tag::from("page one")),
            ("minecraft:custom_data", Tag::Int(7)),
        ]
        .into_iter()
        .collect();
        let block: NbtCompound = [
            ("state", Tag::Int(0)),
            ("components", Tag::Compound(components)),
        ]
        .into_iter()
        .collect();
        let root: NbtCompound = [
            ("DataVersion", Tag::Int(3953)),
            ("size", Tag::List(NbtList::from(vec![Tag::Int(1), Tag::Int(2), Tag::Int(3)]))),
            ("blocks", Tag::List(NbtList::from(vec![Tag::Compound(block)]))),
            ("palette", Tag::List(NbtList::empty(TagId::Compound))),
            ("bytes", Tag::ByteArray(vec![-1, 0, 1])),
            ("longs", Tag::LongArray(vec![i64::MIN, 0, i64::MAX])),
            ("ints", Tag::IntArray(vec![1, -2])),
            ("scale", Tag::Double(0.5)),
            ("f", Tag::Float(1.25)),
            ("s", Tag::Short(-3)),
            ("b", Tag::Byte(1)),
            ("l", Tag::Long(42)),
        ]
        .into_iter()
        .collect();
        NbtDocument::new("", root)
    }

    #[test]
    fn test_decode_encoded_document() {
        let codec = GzipNbtCodec::new();
        let document = sample_document();
        let bytes = codec.encode(&document).unwrap();
        assert_eq!(&bytes[..2], &[0x1F, 0x8B]);
        assert_eq!(codec.decode(&bytes).unwrap(), document);
    }

    #[test]
    fn test_payload_layout() {
        let codec = GzipNbtCodec::new();
        let root: NbtCompound = [("a", Tag::Byte(5))].into_iter().collect();
        let payload = codec.encode_payload(&NbtDocument::new("hi", root)).unwrap();
        assert_eq!(
            payload,
            vec![10, 0, 2, b'h', b'i', 1, 0, 1, b'a', 5, 0]
        );
    }

    #[test]
    fn test_truncated_stream() {
        let codec = GzipNbtCodec::new();
        let bytes = codec.encode(&sample_document()).unwrap();
        let cut = &bytes[..bytes.len() - 6];
        assert!(matches!(codec.decode(cut), Err(NbtError::Truncated(_))));
    }

    #[test]
    fn test_truncated_payload() {
        let codec = GzipNbtCodec::new();
        let payload = codec.encode_payload(&sample_document()).unwrap();
        let result = codec.decode_payload(&payload[..payload.len() / 2]);
        assert!(matches!(result, Err(NbtError::Truncated(_))));
    }

    #[test]
    fn test_corrupt_stream() {
        let codec = GzipNbtCodec::new();
        let mut bytes = codec.encode(&sample_document()).unwrap();
        // Reserved deflate block type 0b11 in the first block header
        bytes[10] = 0xFF;
        bytes[11] = 0xFF;
        let result = codec.decode(&bytes);
        assert!(
            matches!(result, Err(NbtError::CorruptStream(_)) | Err(NbtError::Truncated(_))),
            "got {:?}",
            result
        );
    }

    #[test]
    fn test_non_compound_root_is_malformed() {
        let codec = GzipNbtCodec::new();
        let payload = vec![8, 0, 0, 0, 1, b'x'];
        assert!(matches!(
            codec.decode_payload(&payload),
            Err(NbtError::Malformed(_))
        ));
    }

    #[test]
    fn test_unknown_tag_id_is_malformed() {
        let codec = GzipNbtCodec::new();
        let payload = vec![10, 0, 0, 42, 0, 1, b'k', 0];
        assert!(matches!(
            codec.decode_payload(&payload),
            Err(NbtError::Malformed(_))
        ));
    }

    #[test]
    fn test_negative_length_is_malformed() {
        let codec = GzipNbtCodec::new();
        let payload = vec![10, 0, 0, 7, 0, 1, b'k', 0xFF, 0xFF, 0xFF, 0xFF, 0];
        assert!(matches!(
            codec.decode_payload(&payload),
            Err(NbtError::Malformed(_))
        ));
    }

    #[test]
    fn test_huge_declared_length_does_not_allocate() {
        let codec = GzipNbtCodec::new();
        let payload = vec![10, 0, 0, 12, 0, 1, b'k', 0x7F, 0xFF, 0xFF, 0xFF];
        assert!(matches!(
            codec.decode_payload(&payload),
            Err(NbtError::Truncated(_))
        ));
    }

    #[test]
    fn test_depth_limit() {
        let codec = GzipNbtCodec::with_max_depth(4);
        let mut inner = NbtCompound::new();
        for _ in 0..6 {
            let mut outer = NbtCompound::new();
            outer.insert("n", Tag::Compound(inner));
            inner = outer;
        }
        let payload = GzipNbtCodec::new()
            .encode_payload(&NbtDocument::new("", inner))
            .unwrap();
        assert!(matches!(
            codec.decode_payload(&payload),
            Err(NbtError::Malformed(_))
        ));
    }

    #[test]
    fn test_encode_rejects_oversized_string() {
        let codec = GzipNbtCodec::new();
        let root: NbtCompound = [("text", Tag::String("x".repeat(70_000)))]
            .into_iter()
            .collect();
        assert!(matches!(
            codec.encode(&NbtDocument::new("", root)),
            Err(NbtError::Encode(_))
        ));
    }

    #[test]
    fn test_encode_rejects_mixed_list() {
        let codec = GzipNbtCodec::new();
        let list = NbtList::new(TagId::Int, vec![Tag::Int(1), Tag::from("two")]);
        let root: NbtCompound = [("mixed", Tag::List(list))].into_iter().collect();
        assert!(matches!(
            codec.encode(&NbtDocument::new("", root)),
            Err(NbtError::Encode(_))
        ));
    }

    #[test]
    fn test_decode_wide_compound_is_linear() {
        let codec = GzipNbtCodec::new();
        let root: NbtCompound = (0..100_000)
            .map(|i| (format!("k{}", i), Tag::Byte(1)))
            .collect();
        let payload = codec.encode_payload(&NbtDocument::new("", root)).unwrap();

        let started = std::time::Instant::now();
        let decoded = codec.decode_payload(&payload).unwrap();
        let elapsed = started.elapsed();

        assert_eq!(decoded.root.len(), 100_000);
        assert!(
            elapsed < std::time::Duration::from_secs(5),
            "decoding 100k keys took {:?}",
            elapsed
        );
    }

    #[test]
    fn test_decode_rejects_oversized_payload() {
        let root: NbtCompound = [("blob", Tag::ByteArray(vec![0; 8192]))]
            .into_iter()
            .collect();
        let bytes = GzipNbtCodec::new()
            .encode(&NbtDocument::new("", root))
            .unwrap();

        let capped = GzipNbtCodec::new().with_max_payload_bytes(1024);
        assert!(matches!(capped.decode(&bytes), Err(NbtError::Malformed(_))));
        assert!(GzipNbtCodec::new().decode(&bytes).is_ok());
    }
}
