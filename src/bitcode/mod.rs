//! Compact binary encoding of symbol records.
//!
//! A stream is a 4-byte signature followed by length-framed top-level
//! blocks: one metadata block describing every block and record layout,
//! one version block, then one block per record.
//!
//! ```text
//! stream  := "SYMB" frame*
//! frame   := block-id:u8 length:u32le body[length]
//! body    := (0x01 record-id:u8 payload | 0x02 frame)*
//! ```
//!
//! Payloads are bit-packed by the record's abbreviation and padded to a
//! byte. Fields holding their default value are not written at all.
//! Readers skip any block they do not recognize by its length, so new
//! record kinds can be added without breaking older readers.

mod ids;
mod reader;
mod stream;
mod writer;

pub use reader::decode;
pub use stream::AbbrevOp;
pub use writer::{Writer, encode, encode_info};

/// Magic bytes at the start of every stream.
pub const SIGNATURE: [u8; 4] = *b"SYMB";

/// Format version written into the version block. Informational only.
pub const VERSION: u32 = 1;
