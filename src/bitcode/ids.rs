//! Block and record identifiers, and the abbreviation each record uses.
//!
//! Ids are part of the format: never renumber, only append. Records
//! `1..16` of every entity block are the common attributes; kind-specific
//! records start at 16.

use super::stream::AbbrevOp::{self, Array, Blob, Fixed};
use crate::hir::{
    AccessKind, FieldSpecs, FunctionClass, FunctionSpecs, InfoKind, NamespaceSpecs, RecordKeyKind,
    RecordSpecs, StorageClass, TemplateParamKind, VariableSpecs,
};

pub type BlockId = u8;
pub type RecordId = u8;

// ============================================================================
// BLOCKS
// ============================================================================

pub const METADATA_BLOCK: BlockId = 0;
pub const VERSION_BLOCK: BlockId = 1;

pub const NAMESPACE_BLOCK: BlockId = 2;
pub const RECORD_BLOCK: BlockId = 3;
pub const FUNCTION_BLOCK: BlockId = 4;
pub const ENUM_BLOCK: BlockId = 5;
pub const ENUMERATOR_BLOCK: BlockId = 6;
pub const FIELD_BLOCK: BlockId = 7;
pub const VARIABLE_BLOCK: BlockId = 8;
pub const TYPEDEF_BLOCK: BlockId = 9;
pub const FRIEND_BLOCK: BlockId = 10;
pub const SPECIALIZATION_BLOCK: BlockId = 11;

pub const JAVADOC_BLOCK: BlockId = 12;
pub const TYPE_BLOCK: BlockId = 13;
pub const BASE_BLOCK: BlockId = 14;
pub const PARAM_BLOCK: BlockId = 15;
pub const TEMPLATE_BLOCK: BlockId = 16;
pub const TEMPLATE_PARAM_BLOCK: BlockId = 17;
pub const TEMPLATE_ARG_BLOCK: BlockId = 18;

/// The block an entity of `kind` is written as.
pub fn entity_block(kind: InfoKind) -> BlockId {
    match kind {
        InfoKind::Namespace => NAMESPACE_BLOCK,
        InfoKind::Record => RECORD_BLOCK,
        InfoKind::Function => FUNCTION_BLOCK,
        InfoKind::Enum => ENUM_BLOCK,
        InfoKind::Enumerator => ENUMERATOR_BLOCK,
        InfoKind::Field => FIELD_BLOCK,
        InfoKind::Variable => VARIABLE_BLOCK,
        InfoKind::Typedef => TYPEDEF_BLOCK,
        InfoKind::Friend => FRIEND_BLOCK,
        InfoKind::Specialization => SPECIALIZATION_BLOCK,
    }
}

/// The kind stored in an entity block, or `None` for any other block.
pub fn entity_kind(block: BlockId) -> Option<InfoKind> {
    InfoKind::ALL
        .into_iter()
        .find(|kind| entity_block(*kind) == block)
}

// ============================================================================
// RECORDS
// ============================================================================

// Metadata block. Abbreviations here are fixed, never declared.
pub const META_SETBID: RecordId = 1;
pub const META_RECORD_ABBREV: RecordId = 2;

// Version block.
pub const VERSION_NUMBER: RecordId = 1;

// Common to every entity block.
pub const INFO_ID: RecordId = 1;
pub const INFO_NAME: RecordId = 2;
pub const INFO_PARENTS: RecordId = 3;
pub const INFO_ACCESS: RecordId = 4;
pub const INFO_DEF_LOC: RecordId = 5;
pub const INFO_LOC: RecordId = 6;

pub const NAMESPACE_MEMBERS: RecordId = 16;
pub const NAMESPACE_SPECIALIZATIONS: RecordId = 17;
pub const NAMESPACE_SPECS: RecordId = 18;

pub const RECORD_KEY_KIND: RecordId = 16;
pub const RECORD_IS_TYPEDEF: RecordId = 17;
pub const RECORD_MEMBERS: RecordId = 18;
pub const RECORD_SPECIALIZATIONS: RecordId = 19;
pub const RECORD_FRIENDS: RecordId = 20;
pub const RECORD_SPECS: RecordId = 21;

pub const FUNCTION_CLASS: RecordId = 16;
pub const FUNCTION_STORAGE: RecordId = 17;
pub const FUNCTION_SPECS: RecordId = 18;

pub const ENUM_SCOPED: RecordId = 16;
pub const ENUM_MEMBERS: RecordId = 17;

pub const ENUMERATOR_INITIALIZER: RecordId = 16;

pub const FIELD_DEFAULT: RecordId = 16;
pub const FIELD_BITFIELD_WIDTH: RecordId = 17;
pub const FIELD_SPECS: RecordId = 18;

pub const VARIABLE_STORAGE: RecordId = 16;
pub const VARIABLE_SPECS: RecordId = 17;

pub const TYPEDEF_IS_USING: RecordId = 16;

pub const FRIEND_SYMBOL: RecordId = 16;

pub const SPECIALIZATION_PRIMARY: RecordId = 16;
pub const SPECIALIZATION_MEMBERS: RecordId = 17;

pub const JAVADOC_BRIEF: RecordId = 1;
pub const JAVADOC_PARAGRAPH: RecordId = 2;

pub const TYPE_ID: RecordId = 1;
pub const TYPE_NAME: RecordId = 2;

pub const BASE_ACCESS: RecordId = 1;
pub const BASE_IS_VIRTUAL: RecordId = 2;

pub const PARAM_NAME: RecordId = 1;
pub const PARAM_DEFAULT: RecordId = 2;

pub const TEMPLATE_PRIMARY: RecordId = 1;

pub const TEMPLATE_PARAM_KIND: RecordId = 1;
pub const TEMPLATE_PARAM_NAME: RecordId = 2;
pub const TEMPLATE_PARAM_DEFAULT: RecordId = 3;
pub const TEMPLATE_PARAM_IS_PACK: RecordId = 4;

pub const TEMPLATE_ARG_VALUE: RecordId = 1;

// ============================================================================
// ABBREVIATIONS
// ============================================================================

pub const BOOL_ABBREV: &[AbbrevOp] = &[Fixed(1)];
pub const INT_ABBREV: &[AbbrevOp] = &[Fixed(32)];
pub const STRING_ABBREV: &[AbbrevOp] = &[Blob];
/// A symbol id: twenty 8-bit elements.
pub const SYMBOL_ID_ABBREV: &[AbbrevOp] = &[Array(8)];
/// Several symbol ids, flattened.
pub const SYMBOL_IDS_ABBREV: &[AbbrevOp] = &[Array(8)];
/// Line, in-root flag, file name.
pub const LOCATION_ABBREV: &[AbbrevOp] = &[Fixed(32), Fixed(1), Blob];

/// Block id and block name.
pub const SETBID_ABBREV: &[AbbrevOp] = &[Fixed(8), Blob];
/// Record id, record name, encoded ops as `(tag, width)` byte pairs.
pub const RECORD_ABBREV_ABBREV: &[AbbrevOp] = &[Fixed(8), Blob, Array(8)];

/// A record of a block, with the abbreviation it is written with.
#[derive(Clone, Copy, Debug)]
pub struct RecordSpec {
    pub id: RecordId,
    pub name: &'static str,
    pub abbrev: &'static [AbbrevOp],
}

/// A block and the records it may contain.
#[derive(Clone, Copy, Debug)]
pub struct BlockSpec {
    pub id: BlockId,
    pub name: &'static str,
    pub records: &'static [RecordSpec],
}

macro_rules! records {
    ($($id:expr => $name:literal : $abbrev:expr),* $(,)?) => {
        &[$(RecordSpec { id: $id, name: $name, abbrev: $abbrev }),*]
    };
}

/// Records shared by every entity block.
pub const INFO_RECORDS: &[RecordSpec] = records![
    INFO_ID => "id": SYMBOL_ID_ABBREV,
    INFO_NAME => "name": STRING_ABBREV,
    INFO_PARENTS => "parents": SYMBOL_IDS_ABBREV,
    INFO_ACCESS => "access": &[Fixed(AccessKind::BITS)],
    INFO_DEF_LOC => "def_loc": LOCATION_ABBREV,
    INFO_LOC => "loc": LOCATION_ABBREV,
];

pub const VERSION_ABBREV: &[AbbrevOp] = INT_ABBREV;

/// Every block this version of the format writes, with its own records.
pub const BLOCKS: &[BlockSpec] = &[
    BlockSpec {
        id: VERSION_BLOCK,
        name: "version",
        records: records![VERSION_NUMBER => "version": VERSION_ABBREV],
    },
    BlockSpec {
        id: NAMESPACE_BLOCK,
        name: "namespace",
        records: records![
            NAMESPACE_MEMBERS => "members": SYMBOL_IDS_ABBREV,
            NAMESPACE_SPECIALIZATIONS => "specializations": SYMBOL_IDS_ABBREV,
            NAMESPACE_SPECS => "specs": &[Fixed(NamespaceSpecs::BITS)],
        ],
    },
    BlockSpec {
        id: RECORD_BLOCK,
        name: "record",
        records: records![
            RECORD_KEY_KIND => "key_kind": &[Fixed(RecordKeyKind::BITS)],
            RECORD_IS_TYPEDEF => "is_typedef": BOOL_ABBREV,
            RECORD_MEMBERS => "members": SYMBOL_IDS_ABBREV,
            RECORD_SPECIALIZATIONS => "specializations": SYMBOL_IDS_ABBREV,
            RECORD_FRIENDS => "friends": SYMBOL_IDS_ABBREV,
            RECORD_SPECS => "specs": &[Fixed(RecordSpecs::BITS)],
        ],
    },
    BlockSpec {
        id: FUNCTION_BLOCK,
        name: "function",
        records: records![
            FUNCTION_CLASS => "class": &[Fixed(FunctionClass::BITS)],
            FUNCTION_STORAGE => "storage": &[Fixed(StorageClass::BITS)],
            FUNCTION_SPECS => "specs": &[Fixed(FunctionSpecs::BITS)],
        ],
    },
    BlockSpec {
        id: ENUM_BLOCK,
        name: "enum",
        records: records![
            ENUM_SCOPED => "scoped": BOOL_ABBREV,
            ENUM_MEMBERS => "members": SYMBOL_IDS_ABBREV,
        ],
    },
    BlockSpec {
        id: ENUMERATOR_BLOCK,
        name: "enumerator",
        records: records![ENUMERATOR_INITIALIZER => "initializer": STRING_ABBREV],
    },
    BlockSpec {
        id: FIELD_BLOCK,
        name: "field",
        records: records![
            FIELD_DEFAULT => "default": STRING_ABBREV,
            FIELD_BITFIELD_WIDTH => "bitfield_width": STRING_ABBREV,
            FIELD_SPECS => "specs": &[Fixed(FieldSpecs::BITS)],
        ],
    },
    BlockSpec {
        id: VARIABLE_BLOCK,
        name: "variable",
        records: records![
            VARIABLE_STORAGE => "storage": &[Fixed(StorageClass::BITS)],
            VARIABLE_SPECS => "specs": &[Fixed(VariableSpecs::BITS)],
        ],
    },
    BlockSpec {
        id: TYPEDEF_BLOCK,
        name: "typedef",
        records: records![TYPEDEF_IS_USING => "is_using": BOOL_ABBREV],
    },
    BlockSpec {
        id: FRIEND_BLOCK,
        name: "friend",
        records: records![FRIEND_SYMBOL => "symbol": SYMBOL_ID_ABBREV],
    },
    BlockSpec {
        id: SPECIALIZATION_BLOCK,
        name: "specialization",
        records: records![
            SPECIALIZATION_PRIMARY => "primary": SYMBOL_ID_ABBREV,
            SPECIALIZATION_MEMBERS => "members": SYMBOL_IDS_ABBREV,
        ],
    },
    BlockSpec {
        id: JAVADOC_BLOCK,
        name: "javadoc",
        records: records![
            JAVADOC_BRIEF => "brief": STRING_ABBREV,
            JAVADOC_PARAGRAPH => "paragraph": STRING_ABBREV,
        ],
    },
    BlockSpec {
        id: TYPE_BLOCK,
        name: "type",
        records: records![
            TYPE_ID => "id": SYMBOL_ID_ABBREV,
            TYPE_NAME => "name": STRING_ABBREV,
        ],
    },
    BlockSpec {
        id: BASE_BLOCK,
        name: "base",
        records: records![
            BASE_ACCESS => "access": &[Fixed(AccessKind::BITS)],
            BASE_IS_VIRTUAL => "is_virtual": BOOL_ABBREV,
        ],
    },
    BlockSpec {
        id: PARAM_BLOCK,
        name: "param",
        records: records![
            PARAM_NAME => "name": STRING_ABBREV,
            PARAM_DEFAULT => "default": STRING_ABBREV,
        ],
    },
    BlockSpec {
        id: TEMPLATE_BLOCK,
        name: "template",
        records: records![TEMPLATE_PRIMARY => "primary": SYMBOL_ID_ABBREV],
    },
    BlockSpec {
        id: TEMPLATE_PARAM_BLOCK,
        name: "template_param",
        records: records![
            TEMPLATE_PARAM_KIND => "kind": &[Fixed(TemplateParamKind::BITS)],
            TEMPLATE_PARAM_NAME => "name": STRING_ABBREV,
            TEMPLATE_PARAM_DEFAULT => "default": STRING_ABBREV,
            TEMPLATE_PARAM_IS_PACK => "is_pack": BOOL_ABBREV,
        ],
    },
    BlockSpec {
        id: TEMPLATE_ARG_BLOCK,
        name: "template_arg",
        records: records![TEMPLATE_ARG_VALUE => "value": STRING_ABBREV],
    },
];

pub fn block_spec(block: BlockId) -> Option<&'static BlockSpec> {
    BLOCKS.iter().find(|spec| spec.id == block)
}

/// Every record `block` may contain, common entity records included.
pub fn block_records(block: BlockId) -> impl Iterator<Item = &'static RecordSpec> {
    let common: &'static [RecordSpec] = if entity_kind(block).is_some() {
        INFO_RECORDS
    } else {
        &[]
    };
    let own = block_spec(block).map_or(&[][..], |spec| spec.records);
    common.iter().chain(own)
}

/// The abbreviation this version writes `record` of `block` with.
pub fn expected_abbrev(block: BlockId, record: RecordId) -> Option<&'static [AbbrevOp]> {
    block_records(block)
        .find(|spec| spec.id == record)
        .map(|spec| spec.abbrev)
}
