//! Value codecs selected per table at open time

use crate::bytes::{ByteReader, ByteWriter};
use crate::error::{DecodeError, EncodeError, Result};
use crate::model::{
    LabelRecord, LinkLocation, LinkSlot, PageId, PageLabel, PageRecord, PageType, SenseRecord,
    StructureNode, Translation,
};

/// Sentinel id marking a pruned slot in a link array
pub const HOLE_ID: PageId = -1;

/// Nesting limit when decoding structure trees
pub const MAX_STRUCTURE_DEPTH: usize = 256;

/// Bidirectional mapping between a value and its byte form.
///
/// Implementations are zero-sized and chosen when a table is opened, so the
/// key and value types of a table are fixed at compile time.
pub trait Codec: Send + Sync + 'static {
    type Value: Send + Sync + 'static;

    /// Short name used in error messages
    fn name(&self) -> &'static str;

    fn encode_into(
        &self,
        value: &Self::Value,
        out: &mut ByteWriter,
    ) -> std::result::Result<(), EncodeError>;

    fn decode_from(&self, input: &mut ByteReader<'_>) -> Result<Self::Value>;

    fn encode(&self, value: &Self::Value) -> std::result::Result<Vec<u8>, EncodeError> {
        let mut out = ByteWriter::new();
        self.encode_into(value, &mut out)?;
        Ok(out.into_inner())
    }

    /// Decode a whole buffer, rejecting leftover bytes
    fn decode(&self, bytes: &[u8]) -> Result<Self::Value> {
        let mut input = ByteReader::new(bytes);
        let value = self.decode_from(&mut input)?;
        input.finish(self.name())?;
        Ok(value)
    }
}

/// 4-byte signed integer, also used for page-id keys
#[derive(Debug, Clone, Copy, Default)]
pub struct I32Codec;

impl Codec for I32Codec {
    type Value = i32;

    fn name(&self) -> &'static str {
        "int"
    }

    fn encode_into(
        &self,
        value: &i32,
        out: &mut ByteWriter,
    ) -> std::result::Result<(), EncodeError> {
        out.put_i32(*value);
        Ok(())
    }

    fn decode_from(&self, input: &mut ByteReader<'_>) -> Result<i32> {
        input.get_i32()
    }
}

/// 8-byte signed integer for statistics
#[derive(Debug, Clone, Copy, Default)]
pub struct I64Codec;

impl Codec for I64Codec {
    type Value = i64;

    fn name(&self) -> &'static str {
        "long"
    }

    fn encode_into(
        &self,
        value: &i64,
        out: &mut ByteWriter,
    ) -> std::result::Result<(), EncodeError> {
        out.put_i64(*value);
        Ok(())
    }

    fn decode_from(&self, input: &mut ByteReader<'_>) -> Result<i64> {
        input.get_i64()
    }
}

/// Raw UTF-8 filling the whole buffer; keys sort lexicographically
#[derive(Debug, Clone, Copy, Default)]
pub struct StringCodec;

impl Codec for StringCodec {
    type Value = String;

    fn name(&self) -> &'static str {
        "string"
    }

    fn encode_into(
        &self,
        value: &String,
        out: &mut ByteWriter,
    ) -> std::result::Result<(), EncodeError> {
        out.put_raw(value.as_bytes());
        Ok(())
    }

    fn decode_from(&self, input: &mut ByteReader<'_>) -> Result<String> {
        let bytes = input.rest();
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|err| DecodeError::malformed("string", err.to_string()))
    }
}

/// Int array whose length is implied by the buffer size
#[derive(Debug, Clone, Copy, Default)]
pub struct IdListCodec;

impl Codec for IdListCodec {
    type Value = Vec<PageId>;

    fn name(&self) -> &'static str {
        "id list"
    }

    fn encode_into(
        &self,
        value: &Vec<PageId>,
        out: &mut ByteWriter,
    ) -> std::result::Result<(), EncodeError> {
        for id in value {
            out.put_i32(*id);
        }
        Ok(())
    }

    fn decode_from(&self, input: &mut ByteReader<'_>) -> Result<Vec<PageId>> {
        let remaining = input.remaining();
        if remaining % 4 != 0 {
            return Err(DecodeError::malformed(
                "id list",
                format!("{remaining} bytes is not a whole number of ints"),
            ));
        }
        let mut ids = Vec::with_capacity(remaining / 4);
        while !input.is_exhausted() {
            ids.push(input.get_i32()?);
        }
        Ok(ids)
    }
}

/// Sentence positions: 2-byte count, then 2-byte deltas (first absolute)
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionsCodec;

impl Codec for PositionsCodec {
    type Value = Vec<u32>;

    fn name(&self) -> &'static str {
        "sentence positions"
    }

    fn encode_into(
        &self,
        value: &Vec<u32>,
        out: &mut ByteWriter,
    ) -> std::result::Result<(), EncodeError> {
        out.put_count16("sentence position count", value.len())?;
        let mut previous: Option<u32> = None;
        for &position in value {
            let delta = match previous {
                None => i64::from(position),
                Some(prev) if position > prev => i64::from(position - prev),
                Some(prev) => {
                    return Err(EncodeError::invalid(
                        "sentence positions",
                        format!("{position} does not follow {prev}"),
                    ))
                }
            };
            let delta = i16::try_from(delta).map_err(|_| EncodeError::Overflow {
                what: "sentence position delta",
                value: delta,
                max: i64::from(i16::MAX),
            })?;
            out.put_i16(delta);
            previous = Some(position);
        }
        Ok(())
    }

    fn decode_from(&self, input: &mut ByteReader<'_>) -> Result<Vec<u32>> {
        let count = usize::from(input.get_u16()?);
        let mut positions = Vec::with_capacity(count);
        let mut running: u32 = 0;
        for i in 0..count {
            let delta = input.get_i16()?;
            if delta < 0 || (i > 0 && delta == 0) {
                return Err(DecodeError::malformed(
                    "sentence positions",
                    format!("delta {delta} at index {i}"),
                ));
            }
            running = running
                .checked_add(delta.unsigned_abs().into())
                .ok_or_else(|| DecodeError::malformed("sentence positions", "position overflow"))?;
            positions.push(running);
        }
        Ok(positions)
    }
}

/// Link array: 4-byte count, then per slot an id (or hole) and its positions
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkArrayCodec;

impl Codec for LinkArrayCodec {
    type Value = Vec<LinkSlot>;

    fn name(&self) -> &'static str {
        "link array"
    }

    fn encode_into(
        &self,
        value: &Vec<LinkSlot>,
        out: &mut ByteWriter,
    ) -> std::result::Result<(), EncodeError> {
        out.put_count32("link count", value.len())?;
        for slot in value {
            match slot {
                LinkSlot::Hole => out.put_i32(HOLE_ID),
                LinkSlot::Link(link) => {
                    if link.target == HOLE_ID {
                        return Err(EncodeError::invalid(
                            "link array",
                            "target id collides with the hole sentinel",
                        ));
                    }
                    out.put_i32(link.target);
                    PositionsCodec.encode_into(&link.sentences, out)?;
                }
            }
        }
        Ok(())
    }

    fn decode_from(&self, input: &mut ByteReader<'_>) -> Result<Vec<LinkSlot>> {
        let count = input.get_count32("link count")?;
        // Each slot takes at least 4 bytes; bound the allocation by what is there.
        let mut slots = Vec::with_capacity(count.min(input.remaining() / 4));
        for _ in 0..count {
            let target = input.get_i32()?;
            if target == HOLE_ID {
                slots.push(LinkSlot::Hole);
            } else {
                let sentences = PositionsCodec.decode_from(input)?;
                slots.push(LinkSlot::Link(LinkLocation { target, sentences }));
            }
        }
        Ok(slots)
    }
}

/// Recursive document structure record
#[derive(Debug, Clone, Copy, Default)]
pub struct StructureCodec;

impl StructureCodec {
    fn write_node(
        node: &StructureNode,
        out: &mut ByteWriter,
    ) -> std::result::Result<(), EncodeError> {
        out.put_i32(node.start());
        match node {
            StructureNode::Paragraph { breaks } => {
                out.put_count16("sentence break count", breaks.len())?;
                for b in breaks {
                    out.put_i32(*b);
                }
                out.put_u16(0);
            }
            StructureNode::Section { children, .. } => {
                out.put_u16(0);
                out.put_count16("child count", children.len())?;
                for child in children {
                    Self::write_node(child, out)?;
                }
            }
        }
        Ok(())
    }

    fn read_node(input: &mut ByteReader<'_>, depth: usize) -> Result<StructureNode> {
        if depth > MAX_STRUCTURE_DEPTH {
            return Err(DecodeError::malformed("structure", "nesting too deep"));
        }
        let start = input.get_i32()?;
        let break_count = usize::from(input.get_u16()?);
        let mut breaks = Vec::with_capacity(break_count);
        for _ in 0..break_count {
            breaks.push(input.get_i32()?);
        }
        let child_count = usize::from(input.get_u16()?);

        if break_count > 0 {
            if child_count > 0 {
                return Err(DecodeError::malformed(
                    "structure",
                    "node carries both sentence breaks and children",
                ));
            }
            if breaks[0] != start {
                return Err(DecodeError::malformed(
                    "structure",
                    format!("paragraph start {start} differs from first break {}", breaks[0]),
                ));
            }
            return StructureNode::paragraph(breaks)
                .map_err(|err| DecodeError::malformed("structure", err.to_string()));
        }

        let mut children = Vec::with_capacity(child_count);
        for _ in 0..child_count {
            children.push(Self::read_node(input, depth + 1)?);
        }
        StructureNode::section(start, children)
            .map_err(|err| DecodeError::malformed("structure", err.to_string()))
    }
}

impl Codec for StructureCodec {
    type Value = StructureNode;

    fn name(&self) -> &'static str {
        "structure"
    }

    fn encode_into(
        &self,
        value: &StructureNode,
        out: &mut ByteWriter,
    ) -> std::result::Result<(), EncodeError> {
        Self::write_node(value, out)
    }

    fn decode_from(&self, input: &mut ByteReader<'_>) -> Result<StructureNode> {
        Self::read_node(input, 0)
    }
}

/// Page record: length-prefixed title and a type byte
#[derive(Debug, Clone, Copy, Default)]
pub struct PageCodec;

impl Codec for PageCodec {
    type Value = PageRecord;

    fn name(&self) -> &'static str {
        "page"
    }

    fn encode_into(
        &self,
        value: &PageRecord,
        out: &mut ByteWriter,
    ) -> std::result::Result<(), EncodeError> {
        out.put_str(&value.title)?;
        out.put_u8(value.page_type.code());
        Ok(())
    }

    fn decode_from(&self, input: &mut ByteReader<'_>) -> Result<PageRecord> {
        let title = input.get_str()?;
        let code = input.get_u8()?;
        let page_type = PageType::from_code(code)
            .ok_or_else(|| DecodeError::malformed("page", format!("unknown page type {code}")))?;
        Ok(PageRecord { title, page_type })
    }
}

/// Label statistics followed by its senses
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelCodec;

impl Codec for LabelCodec {
    type Value = LabelRecord;

    fn name(&self) -> &'static str {
        "label"
    }

    fn encode_into(
        &self,
        value: &LabelRecord,
        out: &mut ByteWriter,
    ) -> std::result::Result<(), EncodeError> {
        out.put_u32(value.doc_count);
        out.put_u64(value.occ_count);
        out.put_u32(value.link_doc_count);
        out.put_u64(value.link_occ_count);
        out.put_count16("sense count", value.senses.len())?;
        for sense in &value.senses {
            out.put_i32(sense.page_id);
            out.put_u32(sense.link_doc_count);
            out.put_u32(sense.link_occ_count);
            out.put_bool(sense.from_title);
            out.put_bool(sense.from_redirect);
        }
        Ok(())
    }

    fn decode_from(&self, input: &mut ByteReader<'_>) -> Result<LabelRecord> {
        let doc_count = input.get_u32()?;
        let occ_count = input.get_u64()?;
        let link_doc_count = input.get_u32()?;
        let link_occ_count = input.get_u64()?;
        let sense_count = usize::from(input.get_u16()?);
        let mut senses = Vec::with_capacity(sense_count);
        for _ in 0..sense_count {
            senses.push(SenseRecord {
                page_id: input.get_i32()?,
                link_doc_count: input.get_u32()?,
                link_occ_count: input.get_u32()?,
                from_title: input.get_bool()?,
                from_redirect: input.get_bool()?,
            });
        }
        Ok(LabelRecord {
            doc_count,
            occ_count,
            link_doc_count,
            link_occ_count,
            senses,
        })
    }
}

/// Language/title pairs
#[derive(Debug, Clone, Copy, Default)]
pub struct TranslationsCodec;

impl Codec for TranslationsCodec {
    type Value = Vec<Translation>;

    fn name(&self) -> &'static str {
        "translations"
    }

    fn encode_into(
        &self,
        value: &Vec<Translation>,
        out: &mut ByteWriter,
    ) -> std::result::Result<(), EncodeError> {
        out.put_count16("translation count", value.len())?;
        for t in value {
            out.put_str(&t.language)?;
            out.put_str(&t.title)?;
        }
        Ok(())
    }

    fn decode_from(&self, input: &mut ByteReader<'_>) -> Result<Vec<Translation>> {
        let count = usize::from(input.get_u16()?);
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            let language = input.get_str()?;
            let title = input.get_str()?;
            out.push(Translation { language, title });
        }
        Ok(out)
    }
}

/// Labels referring to a page: text, link counts and a flag byte per entry
#[derive(Debug, Clone, Copy, Default)]
pub struct PageLabelsCodec;

const FROM_TITLE: u8 = 0b001;
const FROM_REDIRECT: u8 = 0b010;
const PRIMARY: u8 = 0b100;

impl Codec for PageLabelsCodec {
    type Value = Vec<PageLabel>;

    fn name(&self) -> &'static str {
        "page labels"
    }

    fn encode_into(
        &self,
        value: &Vec<PageLabel>,
        out: &mut ByteWriter,
    ) -> std::result::Result<(), EncodeError> {
        out.put_count16("page label count", value.len())?;
        for label in value {
            out.put_str(&label.text)?;
            out.put_u32(label.link_doc_count);
            out.put_u32(label.link_occ_count);
            let mut flags = 0;
            if label.from_title {
                flags |= FROM_TITLE;
            }
            if label.from_redirect {
                flags |= FROM_REDIRECT;
            }
            if label.is_primary {
                flags |= PRIMARY;
            }
            out.put_u8(flags);
        }
        Ok(())
    }

    fn decode_from(&self, input: &mut ByteReader<'_>) -> Result<Vec<PageLabel>> {
        let count = usize::from(input.get_u16()?);
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            let text = input.get_str()?;
            let link_doc_count = input.get_u32()?;
            let link_occ_count = input.get_u32()?;
            let flags = input.get_u8()?;
            if flags & !(FROM_TITLE | FROM_REDIRECT | PRIMARY) != 0 {
                return Err(DecodeError::malformed(
                    "page labels",
                    format!("unknown flag bits {flags:#04b}"),
                ));
            }
            out.push(PageLabel {
                text,
                link_doc_count,
                link_occ_count,
                from_title: flags & FROM_TITLE != 0,
                from_redirect: flags & FROM_REDIRECT != 0,
                is_primary: flags & PRIMARY != 0,
            });
        }
        Ok(out)
    }
}
