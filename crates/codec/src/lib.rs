//! # Wikigraph Codec
//!
//! Byte encodings for every value kept in the wikigraph store, plus the
//! data model those values describe.
//!
//! ## Encodings
//!
//! ```text
//! int            4 bytes, big-endian, sign bit flipped (sorts bytewise)
//! id list        N × int, length implied by the buffer
//! positions      u16 count, then i16 deltas (first value absolute)
//! link array     int count, then per slot: int id | -1 hole, positions
//! structure      int start, u16 breaks + N × int, u16 children + N × node
//! page labels    u16 count, then per label: string, u32, u32, flag byte
//! ```
//!
//! ## Example
//!
//! ```
//! use wikigraph_codec::{Codec, LinkArrayCodec, LinkLocation, LinkSlot};
//!
//! let links = vec![LinkSlot::Link(LinkLocation::new(42, vec![0, 3]).unwrap())];
//! let bytes = LinkArrayCodec.encode(&links).unwrap();
//! assert_eq!(LinkArrayCodec.decode(&bytes).unwrap(), links);
//! ```

mod bytes;
mod codec;
mod error;
mod model;

pub use bytes::{ByteReader, ByteWriter};
pub use codec::{
    Codec, I32Codec, I64Codec, IdListCodec, LabelCodec, LinkArrayCodec, PageCodec,
    PageLabelsCodec, PositionsCodec, StringCodec, StructureCodec, TranslationsCodec, HOLE_ID,
    MAX_STRUCTURE_DEPTH,
};
pub use error::{DecodeError, EncodeError, InvariantError, Result};
pub use model::{
    compact_links, LabelRecord, LinkLocation, LinkSlot, PageId, PageLabel, PageRecord, PageType,
    SenseRecord, StructureNode, Translation,
};
