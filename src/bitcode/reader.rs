//! Decoding a bitcode stream back into symbol records.
//!
//! Records are parsed with the abbreviations the stream itself declares.
//! A record this reader knows must be declared exactly as it would write
//! it; records and blocks it does not know are skipped by length.

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use super::SIGNATURE;
use super::VERSION;
use super::ids::*;
use super::stream::{AbbrevOp, BitReader, Cursor, Value};
use crate::base::{Location, SYMBOL_ID_LEN, SymbolId};
use crate::error::FormatError;
use crate::hir::{
    AccessKind, BaseInfo, FieldSpecs, FunctionClass, FunctionSpecs, Info, InfoBase, InfoKind,
    Javadoc, NamespaceSpecs, Param, RecordKeyKind, RecordSpecs, SpecializedMember, StorageClass,
    TemplateArg, TemplateInfo, TemplateParam, TemplateParamKind, TypeInfo, VariableSpecs,
};

const ENTRY_RECORD: u8 = 0x01;
const ENTRY_BLOCK: u8 = 0x02;

type Result<T> = std::result::Result<T, FormatError>;

// ============================================================================
// ABBREVIATION SOURCES
// ============================================================================

/// Where the reader looks up how a record is laid out.
trait Abbrevs {
    fn declared(&self, block: BlockId, record: RecordId) -> Option<&[AbbrevOp]>;
}

/// The fixed layout of metadata records.
struct Bootstrap;

impl Abbrevs for Bootstrap {
    fn declared(&self, block: BlockId, record: RecordId) -> Option<&[AbbrevOp]> {
        match (block, record) {
            (METADATA_BLOCK, META_SETBID) => Some(SETBID_ABBREV),
            (METADATA_BLOCK, META_RECORD_ABBREV) => Some(RECORD_ABBREV_ABBREV),
            _ => None,
        }
    }
}

/// What a stream's metadata block declared.
#[derive(Debug, Default)]
struct StreamSchema {
    names: FxHashMap<BlockId, SmolStr>,
    abbrevs: FxHashMap<(BlockId, RecordId), Vec<AbbrevOp>>,
}

impl Abbrevs for StreamSchema {
    fn declared(&self, block: BlockId, record: RecordId) -> Option<&[AbbrevOp]> {
        self.abbrevs.get(&(block, record)).map(Vec::as_slice)
    }
}

impl StreamSchema {
    fn parse(body: &[u8]) -> Result<Self> {
        let mut schema = Self::default();
        let mut current: Option<BlockId> = None;
        walk(METADATA_BLOCK, body, &Bootstrap, |entry| {
            let Entry::Record(record) = entry else {
                return Ok(());
            };
            match record.id {
                META_SETBID => {
                    let block = record.narrow::<u8>(0)?;
                    schema.names.insert(block, record.string(1)?);
                    current = Some(block);
                }
                META_RECORD_ABBREV => {
                    let block = current.ok_or(FormatError::OrphanAbbrev { record: record.id })?;
                    let id = record.narrow::<u8>(0)?;
                    let pairs = record.bytes(2)?;
                    if pairs.len() % 2 != 0 {
                        return Err(record.mismatch());
                    }
                    let ops = pairs
                        .chunks_exact(2)
                        .map(|pair| {
                            AbbrevOp::from_pair(pair[0], pair[1])
                                .ok_or(FormatError::BadAbbrevOp { op: pair[0] })
                        })
                        .collect::<Result<Vec<_>>>()?;
                    schema.abbrevs.insert((block, id), ops);
                }
                _ => {}
            }
            Ok(())
        })?;
        tracing::trace!(
            bitcode.blocks = schema.names.len(),
            bitcode.abbrevs = schema.abbrevs.len(),
            "read bitcode metadata"
        );
        Ok(schema)
    }
}

// ============================================================================
// ENTRIES
// ============================================================================

/// One decoded record.
#[derive(Debug)]
struct Record {
    block: BlockId,
    id: RecordId,
    values: Vec<Value>,
}

impl Record {
    fn mismatch(&self) -> FormatError {
        FormatError::AbbrevMismatch {
            block: self.block,
            record: self.id,
        }
    }

    fn bad_value(&self, value: u64) -> FormatError {
        FormatError::BadValue {
            block: self.block,
            record: self.id,
            value,
        }
    }

    fn int(&self, index: usize) -> Result<u64> {
        match self.values.get(index) {
            Some(Value::Int(v)) => Ok(*v),
            _ => Err(self.mismatch()),
        }
    }

    fn narrow<T: TryFrom<u64>>(&self, index: usize) -> Result<T> {
        let value = self.int(index)?;
        T::try_from(value).map_err(|_| self.bad_value(value))
    }

    fn flag(&self) -> Result<bool> {
        Ok(self.int(0)? != 0)
    }

    fn raw<T>(&self, parse: fn(u64) -> Option<T>) -> Result<T> {
        let value = self.int(0)?;
        parse(value).ok_or_else(|| self.bad_value(value))
    }

    fn string(&self, index: usize) -> Result<SmolStr> {
        match self.values.get(index) {
            Some(Value::Blob(bytes)) => std::str::from_utf8(bytes)
                .map(SmolStr::new)
                .map_err(|_| FormatError::BadString {
                    block: self.block,
                    record: self.id,
                }),
            _ => Err(self.mismatch()),
        }
    }

    fn bytes(&self, index: usize) -> Result<Vec<u8>> {
        match self.values.get(index) {
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| u8::try_from(*v).map_err(|_| self.bad_value(*v)))
                .collect(),
            _ => Err(self.mismatch()),
        }
    }

    fn bad_id(&self) -> FormatError {
        FormatError::BadSymbolId {
            block: self.block,
            record: self.id,
        }
    }

    fn symbol_id(&self) -> Result<SymbolId> {
        SymbolId::from_bytes(&self.bytes(0)?).map_err(|_| self.bad_id())
    }

    fn symbol_ids(&self) -> Result<Vec<SymbolId>> {
        let bytes = self.bytes(0)?;
        if bytes.len() % SYMBOL_ID_LEN != 0 {
            return Err(self.bad_id());
        }
        bytes
            .chunks_exact(SYMBOL_ID_LEN)
            .map(|chunk| SymbolId::from_bytes(chunk).map_err(|_| self.bad_id()))
            .collect()
    }

    fn location(&self) -> Result<Location> {
        Ok(Location {
            line: self.narrow::<u32>(0)?,
            is_file_in_root: self.int(1)? != 0,
            filename: self.string(2)?,
        })
    }
}

#[derive(Debug)]
enum Entry<'a> {
    Record(Record),
    Block(BlockId, &'a [u8]),
}

/// Read `id, u32 length, body` at the cursor.
fn read_frame<'a>(cursor: &mut Cursor<'a>) -> Result<(BlockId, &'a [u8])> {
    let block = cursor.u8().ok_or(FormatError::PrematureEnd)?;
    let len = cursor.u32_le().ok_or(FormatError::PrematureEnd)? as usize;
    let available = cursor.remaining();
    let body = cursor.take(len).ok_or(FormatError::BlockOverrun {
        block,
        len,
        available,
    })?;
    Ok((block, body))
}

struct BlockReader<'a> {
    block: BlockId,
    cursor: Cursor<'a>,
}

impl<'a> BlockReader<'a> {
    fn new(block: BlockId, body: &'a [u8]) -> Self {
        Self {
            block,
            cursor: Cursor::new(body),
        }
    }

    fn next_entry(&mut self, abbrevs: &dyn Abbrevs) -> Result<Option<Entry<'a>>> {
        let block = self.block;
        let Some(tag) = self.cursor.u8() else {
            return Ok(None);
        };
        match tag {
            ENTRY_RECORD => {
                let record = self
                    .cursor
                    .u8()
                    .ok_or(FormatError::TruncatedRecord { block, record: 0 })?;
                let declared = abbrevs
                    .declared(block, record)
                    .ok_or(FormatError::UnknownAbbrev { block, record })?;
                if let Some(expected) = expected_abbrev(block, record) {
                    if declared != expected {
                        return Err(FormatError::AbbrevMismatch { block, record });
                    }
                }
                let mut bits = BitReader::new(self.cursor.rest());
                let values = bits
                    .read_operands(declared)
                    .ok_or(FormatError::TruncatedRecord { block, record })?;
                self.cursor.advance(bits.consumed());
                Ok(Some(Entry::Record(Record {
                    block,
                    id: record,
                    values,
                })))
            }
            ENTRY_BLOCK => {
                let (id, body) = read_frame(&mut self.cursor)?;
                Ok(Some(Entry::Block(id, body)))
            }
            tag => Err(FormatError::BadEntry { block, tag }),
        }
    }
}

/// Feed every entry of a block body to `f`.
fn walk<'a>(
    block: BlockId,
    body: &'a [u8],
    abbrevs: &dyn Abbrevs,
    mut f: impl FnMut(Entry<'a>) -> Result<()>,
) -> Result<()> {
    let mut reader = BlockReader::new(block, body);
    while let Some(entry) = reader.next_entry(abbrevs)? {
        f(entry)?;
    }
    Ok(())
}

fn skipped(parent: BlockId, block: BlockId, len: usize) {
    tracing::trace!(bitcode.parent = parent, bitcode.block = block, bitcode.len = len, "skipping sub-block");
}

// ============================================================================
// COMPOUND FIELDS
// ============================================================================

fn read_type(body: &[u8], schema: &StreamSchema) -> Result<TypeInfo> {
    let mut ty = TypeInfo::default();
    walk(TYPE_BLOCK, body, schema, |entry| {
        if let Entry::Record(r) = entry {
            match r.id {
                TYPE_ID => ty.id = r.symbol_id()?,
                TYPE_NAME => ty.name = r.string(0)?,
                _ => {}
            }
        }
        Ok(())
    })?;
    Ok(ty)
}

fn read_javadoc(body: &[u8], schema: &StreamSchema) -> Result<Javadoc> {
    let mut javadoc = Javadoc::default();
    walk(JAVADOC_BLOCK, body, schema, |entry| {
        if let Entry::Record(r) = entry {
            match r.id {
                JAVADOC_BRIEF => javadoc.brief = r.string(0)?,
                JAVADOC_PARAGRAPH => javadoc.blocks.push(r.string(0)?),
                _ => {}
            }
        }
        Ok(())
    })?;
    Ok(javadoc)
}

fn read_base(body: &[u8], schema: &StreamSchema) -> Result<BaseInfo> {
    let mut base = BaseInfo::default();
    walk(BASE_BLOCK, body, schema, |entry| {
        match entry {
            Entry::Record(r) => match r.id {
                BASE_ACCESS => base.access = r.raw(AccessKind::from_raw)?,
                BASE_IS_VIRTUAL => base.is_virtual = r.flag()?,
                _ => {}
            },
            Entry::Block(TYPE_BLOCK, body) => base.ty = read_type(body, schema)?,
            Entry::Block(id, body) => skipped(BASE_BLOCK, id, body.len()),
        }
        Ok(())
    })?;
    Ok(base)
}

fn read_param(body: &[u8], schema: &StreamSchema) -> Result<Param> {
    let mut param = Param::default();
    walk(PARAM_BLOCK, body, schema, |entry| {
        match entry {
            Entry::Record(r) => match r.id {
                PARAM_NAME => param.name = r.string(0)?,
                PARAM_DEFAULT => param.default = r.string(0)?,
                _ => {}
            },
            Entry::Block(TYPE_BLOCK, body) => param.ty = read_type(body, schema)?,
            Entry::Block(id, body) => skipped(PARAM_BLOCK, id, body.len()),
        }
        Ok(())
    })?;
    Ok(param)
}

fn read_template_param(body: &[u8], schema: &StreamSchema) -> Result<TemplateParam> {
    let mut param = TemplateParam::default();
    walk(TEMPLATE_PARAM_BLOCK, body, schema, |entry| {
        if let Entry::Record(r) = entry {
            match r.id {
                TEMPLATE_PARAM_KIND => param.kind = r.raw(TemplateParamKind::from_raw)?,
                TEMPLATE_PARAM_NAME => param.name = r.string(0)?,
                TEMPLATE_PARAM_DEFAULT => param.default = r.string(0)?,
                TEMPLATE_PARAM_IS_PACK => param.is_pack = r.flag()?,
                _ => {}
            }
        }
        Ok(())
    })?;
    Ok(param)
}

fn read_template_arg(body: &[u8], schema: &StreamSchema) -> Result<TemplateArg> {
    let mut arg = TemplateArg::default();
    walk(TEMPLATE_ARG_BLOCK, body, schema, |entry| {
        if let Entry::Record(r) = entry {
            if r.id == TEMPLATE_ARG_VALUE {
                arg.value = r.string(0)?;
            }
        }
        Ok(())
    })?;
    Ok(arg)
}

fn read_template(body: &[u8], schema: &StreamSchema) -> Result<TemplateInfo> {
    let mut template = TemplateInfo::default();
    walk(TEMPLATE_BLOCK, body, schema, |entry| {
        match entry {
            Entry::Record(r) => {
                if r.id == TEMPLATE_PRIMARY {
                    template.primary = r.symbol_id()?;
                }
            }
            Entry::Block(TEMPLATE_PARAM_BLOCK, body) => {
                template.params.push(read_template_param(body, schema)?)
            }
            Entry::Block(TEMPLATE_ARG_BLOCK, body) => {
                template.args.push(read_template_arg(body, schema)?)
            }
            Entry::Block(id, body) => skipped(TEMPLATE_BLOCK, id, body.len()),
        }
        Ok(())
    })?;
    Ok(template)
}

// ============================================================================
// ENTITIES
// ============================================================================

/// Apply a common-attribute record. Returns `true` if it carried the id.
fn read_base_record(base: &mut InfoBase, r: &Record) -> Result<bool> {
    match r.id {
        INFO_ID => {
            base.id = r.symbol_id()?;
            return Ok(true);
        }
        INFO_NAME => base.name = r.string(0)?,
        INFO_PARENTS => base.parents = r.symbol_ids()?,
        INFO_ACCESS => base.access = r.raw(AccessKind::from_raw)?,
        INFO_DEF_LOC => base.source.def_loc = Some(r.location()?),
        INFO_LOC => base.source.add_location(r.location()?),
        _ => {}
    }
    Ok(false)
}

fn read_kind_record(info: &mut Info, r: &Record) -> Result<()> {
    match info {
        Info::Namespace(i) => match r.id {
            NAMESPACE_MEMBERS => i.members.extend(r.symbol_ids()?),
            NAMESPACE_SPECIALIZATIONS => i.specializations.extend(r.symbol_ids()?),
            NAMESPACE_SPECS => i.specs = NamespaceSpecs::from_bits(r.int(0)?),
            _ => {}
        },
        Info::Record(i) => match r.id {
            RECORD_KEY_KIND => i.key_kind = r.raw(RecordKeyKind::from_raw)?,
            RECORD_IS_TYPEDEF => i.is_typedef = r.flag()?,
            RECORD_MEMBERS => i.members.extend(r.symbol_ids()?),
            RECORD_SPECIALIZATIONS => i.specializations.extend(r.symbol_ids()?),
            RECORD_FRIENDS => i.friends = r.symbol_ids()?,
            RECORD_SPECS => i.specs = RecordSpecs::from_bits(r.int(0)?),
            _ => {}
        },
        Info::Function(i) => match r.id {
            FUNCTION_CLASS => i.class = r.raw(FunctionClass::from_raw)?,
            FUNCTION_STORAGE => i.storage = r.raw(StorageClass::from_raw)?,
            FUNCTION_SPECS => i.specs = FunctionSpecs::from_bits(r.int(0)?),
            _ => {}
        },
        Info::Enum(i) => match r.id {
            ENUM_SCOPED => i.scoped = r.flag()?,
            ENUM_MEMBERS => i.members.extend(r.symbol_ids()?),
            _ => {}
        },
        Info::Enumerator(i) => {
            if r.id == ENUMERATOR_INITIALIZER {
                i.initializer = r.string(0)?;
            }
        }
        Info::Field(i) => match r.id {
            FIELD_DEFAULT => i.default = r.string(0)?,
            FIELD_BITFIELD_WIDTH => i.bitfield_width = r.string(0)?,
            FIELD_SPECS => i.specs = FieldSpecs::from_bits(r.int(0)?),
            _ => {}
        },
        Info::Variable(i) => match r.id {
            VARIABLE_STORAGE => i.storage = r.raw(StorageClass::from_raw)?,
            VARIABLE_SPECS => i.specs = VariableSpecs::from_bits(r.int(0)?),
            _ => {}
        },
        Info::Typedef(i) => {
            if r.id == TYPEDEF_IS_USING {
                i.is_using = r.flag()?;
            }
        }
        Info::Friend(i) => {
            if r.id == FRIEND_SYMBOL {
                i.friend_symbol = r.symbol_id()?;
            }
        }
        Info::Specialization(i) => match r.id {
            SPECIALIZATION_PRIMARY => i.primary = r.symbol_id()?,
            SPECIALIZATION_MEMBERS => {
                let ids = r.symbol_ids()?;
                if ids.len() % 2 != 0 {
                    return Err(r.bad_id());
                }
                i.members.extend(ids.chunks_exact(2).map(|pair| SpecializedMember {
                    primary: pair[0],
                    specialized: pair[1],
                }));
            }
            _ => {}
        },
    }
    Ok(())
}

fn read_kind_block(info: &mut Info, block: BlockId, body: &[u8], schema: &StreamSchema) -> Result<()> {
    let parent = info.kind();
    match (info, block) {
        (info, JAVADOC_BLOCK) => info.base_mut().javadoc = Some(read_javadoc(body, schema)?),
        (Info::Record(i), BASE_BLOCK) => i.bases.push(read_base(body, schema)?),
        (Info::Record(i), TEMPLATE_BLOCK) => i.template = Some(read_template(body, schema)?),
        (Info::Function(i), TYPE_BLOCK) => i.return_type = read_type(body, schema)?,
        (Info::Function(i), PARAM_BLOCK) => i.params.push(read_param(body, schema)?),
        (Info::Function(i), TEMPLATE_BLOCK) => i.template = Some(read_template(body, schema)?),
        (Info::Enum(i), TYPE_BLOCK) => i.underlying = Some(read_type(body, schema)?),
        (Info::Field(i), TYPE_BLOCK) => i.ty = read_type(body, schema)?,
        (Info::Variable(i), TYPE_BLOCK) => i.ty = read_type(body, schema)?,
        (Info::Variable(i), TEMPLATE_BLOCK) => i.template = Some(read_template(body, schema)?),
        (Info::Typedef(i), TYPE_BLOCK) => i.underlying = read_type(body, schema)?,
        (Info::Typedef(i), TEMPLATE_BLOCK) => i.template = Some(read_template(body, schema)?),
        (Info::Friend(i), TYPE_BLOCK) => i.friend_type = Some(read_type(body, schema)?),
        (Info::Specialization(i), TEMPLATE_ARG_BLOCK) => {
            i.args.push(read_template_arg(body, schema)?)
        }
        (_, other) => skipped(entity_block(parent), other, body.len()),
    }
    Ok(())
}

fn read_entity(kind: InfoKind, block: BlockId, body: &[u8], schema: &StreamSchema) -> Result<Info> {
    let mut info = Info::new(SymbolId::INVALID, kind);
    let mut has_id = false;
    walk(block, body, schema, |entry| {
        match entry {
            Entry::Record(r) if r.id < 16 => has_id |= read_base_record(info.base_mut(), &r)?,
            Entry::Record(r) => read_kind_record(&mut info, &r)?,
            Entry::Block(sub, body) => read_kind_block(&mut info, sub, body, schema)?,
        }
        Ok(())
    })?;
    if !has_id {
        return Err(FormatError::MissingId { block });
    }
    info.canonicalize();
    Ok(info)
}

fn read_version(body: &[u8], schema: &StreamSchema) -> Result<u32> {
    let mut version = 0;
    walk(VERSION_BLOCK, body, schema, |entry| {
        if let Entry::Record(r) = entry {
            if r.id == VERSION_NUMBER {
                version = r.narrow::<u32>(0)?;
            }
        }
        Ok(())
    })?;
    Ok(version)
}

// ============================================================================
// ENTRY POINT
// ============================================================================

/// Decode every record in a stream.
///
/// Any malformed part fails the whole stream. Top-level blocks this
/// reader does not know are skipped.
pub fn decode(bytes: &[u8]) -> Result<Vec<Info>> {
    if bytes.len() < SIGNATURE.len() || bytes[..SIGNATURE.len()] != SIGNATURE {
        return Err(FormatError::BadSignature);
    }
    let mut cursor = Cursor::new(&bytes[SIGNATURE.len()..]);
    let mut schema: Option<StreamSchema> = None;
    let mut infos = Vec::new();

    while !cursor.is_empty() {
        let (block, body) = read_frame(&mut cursor)?;
        if block == METADATA_BLOCK {
            schema = Some(StreamSchema::parse(body)?);
            continue;
        }

        let known = block == VERSION_BLOCK || entity_kind(block).is_some();
        if !known {
            let name = schema
                .as_ref()
                .and_then(|s| s.names.get(&block))
                .map(SmolStr::as_str)
                .unwrap_or("<undeclared>");
            tracing::debug!(bitcode.block = block, bitcode.name = name, bitcode.len = body.len(), "skipping unknown block");
            continue;
        }

        let Some(schema) = schema.as_ref() else {
            return Err(FormatError::MissingMetadata {
                block,
                record: if block == VERSION_BLOCK { VERSION_NUMBER } else { INFO_ID },
            });
        };

        match entity_kind(block) {
            Some(kind) => infos.push(read_entity(kind, block, body, schema)?),
            None => {
                let version = read_version(body, schema)?;
                if version != VERSION {
                    tracing::debug!(bitcode.version = version, expected = VERSION, "decoding bitcode from another version");
                }
            }
        }
    }

    tracing::trace!(bitcode.infos = infos.len(), bitcode.len = bytes.len(), "decoded bitcode");
    Ok(infos)
}
