//! Encoding symbol records into a bitcode stream.

use super::SIGNATURE;
use super::VERSION;
use super::ids::*;
use super::stream::{AbbrevOp, BitWriter, Operand};
use crate::base::{Location, SYMBOL_ID_LEN, SourceInfo, SymbolId};
use crate::hir::{
    BaseInfo, EnumInfo, EnumeratorInfo, FieldInfo, FriendInfo, FunctionInfo, Info, InfoBase,
    Javadoc, NamespaceInfo, Param, RecordInfo, SpecializationInfo, TemplateArg, TemplateInfo,
    TemplateParam, TypeInfo, TypedefInfo, VariableInfo, visit,
};

const ENTRY_RECORD: u8 = 0x01;
const ENTRY_BLOCK: u8 = 0x02;

/// The body of one block under construction.
struct BlockWriter {
    id: BlockId,
    body: Vec<u8>,
}

impl BlockWriter {
    fn new(id: BlockId) -> Self {
        Self {
            id,
            body: Vec::new(),
        }
    }

    fn record_with(&mut self, record: RecordId, ops: &[AbbrevOp], operands: &[Operand<'_>]) {
        self.body.push(ENTRY_RECORD);
        self.body.push(record);
        let mut bits = BitWriter::new();
        bits.write_operands(ops, operands);
        self.body.extend_from_slice(&bits.finish());
    }

    fn record(&mut self, record: RecordId, operands: &[Operand<'_>]) {
        let ops = expected_abbrev(self.id, record).unwrap_or_default();
        debug_assert!(!ops.is_empty(), "record {record} not declared for block {}", self.id);
        self.record_with(record, ops, operands);
    }

    // Each helper below omits the record when the value is the default.

    fn int(&mut self, record: RecordId, value: u64) {
        if value != 0 {
            self.record(record, &[Operand::Int(value)]);
        }
    }

    fn flag(&mut self, record: RecordId, value: bool) {
        self.int(record, u64::from(value));
    }

    fn string(&mut self, record: RecordId, value: &str) {
        if !value.is_empty() {
            self.record(record, &[Operand::Blob(value.as_bytes())]);
        }
    }

    fn symbol_id(&mut self, record: RecordId, id: SymbolId) {
        if id.is_valid() {
            self.record(record, &[Operand::Array(id.as_bytes())]);
        }
    }

    fn symbol_ids<'a>(&mut self, record: RecordId, ids: impl IntoIterator<Item = &'a SymbolId>) {
        let mut flat = Vec::new();
        for id in ids {
            flat.extend_from_slice(id.as_bytes());
        }
        if !flat.is_empty() {
            self.record(record, &[Operand::Array(&flat)]);
        }
    }

    fn location(&mut self, record: RecordId, loc: &Location) {
        self.record(
            record,
            &[
                Operand::Int(u64::from(loc.line)),
                Operand::Int(u64::from(loc.is_file_in_root)),
                Operand::Blob(loc.filename.as_bytes()),
            ],
        );
    }

    fn sub_block(&mut self, block: BlockWriter) {
        self.body.push(ENTRY_BLOCK);
        block.frame_into(&mut self.body);
    }

    /// Append `id, u32 length, body` to `out`.
    fn frame_into(self, out: &mut Vec<u8>) {
        out.push(self.id);
        out.extend_from_slice(&(self.body.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.body);
    }
}

// ============================================================================
// METADATA
// ============================================================================

fn metadata_block() -> BlockWriter {
    let mut meta = BlockWriter::new(METADATA_BLOCK);
    for block in BLOCKS {
        meta.record_with(
            META_SETBID,
            SETBID_ABBREV,
            &[Operand::Int(u64::from(block.id)), Operand::Blob(block.name.as_bytes())],
        );
        for record in block_records(block.id) {
            let ops: Vec<u8> = record.abbrev.iter().flat_map(|op| op.to_pair()).collect();
            meta.record_with(
                META_RECORD_ABBREV,
                RECORD_ABBREV_ABBREV,
                &[
                    Operand::Int(u64::from(record.id)),
                    Operand::Blob(record.name.as_bytes()),
                    Operand::Array(&ops),
                ],
            );
        }
    }
    meta
}

fn version_block() -> BlockWriter {
    let mut version = BlockWriter::new(VERSION_BLOCK);
    version.record(VERSION_NUMBER, &[Operand::Int(u64::from(VERSION))]);
    version
}

// ============================================================================
// COMPOUND FIELDS
// ============================================================================

fn type_block(ty: &TypeInfo) -> BlockWriter {
    let mut block = BlockWriter::new(TYPE_BLOCK);
    block.symbol_id(TYPE_ID, ty.id);
    block.string(TYPE_NAME, &ty.name);
    block
}

/// Write a required type only when something is known about it.
fn write_type(parent: &mut BlockWriter, ty: &TypeInfo) {
    if !ty.is_empty() {
        parent.sub_block(type_block(ty));
    }
}

/// Write an optional type whenever it is present, even if empty.
fn write_opt_type(parent: &mut BlockWriter, ty: Option<&TypeInfo>) {
    if let Some(ty) = ty {
        parent.sub_block(type_block(ty));
    }
}

fn write_javadoc(parent: &mut BlockWriter, javadoc: &Javadoc) {
    let mut block = BlockWriter::new(JAVADOC_BLOCK);
    block.string(JAVADOC_BRIEF, &javadoc.brief);
    for paragraph in &javadoc.blocks {
        block.record(JAVADOC_PARAGRAPH, &[Operand::Blob(paragraph.as_bytes())]);
    }
    parent.sub_block(block);
}

fn write_base(parent: &mut BlockWriter, base: &BaseInfo) {
    let mut block = BlockWriter::new(BASE_BLOCK);
    block.int(BASE_ACCESS, base.access.to_raw());
    block.flag(BASE_IS_VIRTUAL, base.is_virtual);
    write_type(&mut block, &base.ty);
    parent.sub_block(block);
}

fn write_param(parent: &mut BlockWriter, param: &Param) {
    let mut block = BlockWriter::new(PARAM_BLOCK);
    block.string(PARAM_NAME, &param.name);
    block.string(PARAM_DEFAULT, &param.default);
    write_type(&mut block, &param.ty);
    parent.sub_block(block);
}

fn write_template_param(parent: &mut BlockWriter, param: &TemplateParam) {
    let mut block = BlockWriter::new(TEMPLATE_PARAM_BLOCK);
    block.int(TEMPLATE_PARAM_KIND, param.kind.to_raw());
    block.string(TEMPLATE_PARAM_NAME, &param.name);
    block.string(TEMPLATE_PARAM_DEFAULT, &param.default);
    block.flag(TEMPLATE_PARAM_IS_PACK, param.is_pack);
    parent.sub_block(block);
}

fn write_template_arg(parent: &mut BlockWriter, arg: &TemplateArg) {
    let mut block = BlockWriter::new(TEMPLATE_ARG_BLOCK);
    block.string(TEMPLATE_ARG_VALUE, &arg.value);
    parent.sub_block(block);
}

fn write_template(parent: &mut BlockWriter, template: Option<&TemplateInfo>) {
    let Some(template) = template else {
        return;
    };
    let mut block = BlockWriter::new(TEMPLATE_BLOCK);
    block.symbol_id(TEMPLATE_PRIMARY, template.primary);
    for param in &template.params {
        write_template_param(&mut block, param);
    }
    for arg in &template.args {
        write_template_arg(&mut block, arg);
    }
    parent.sub_block(block);
}

fn write_source(block: &mut BlockWriter, source: &SourceInfo) {
    if let Some(def) = &source.def_loc {
        block.location(INFO_DEF_LOC, def);
    }
    for loc in &source.locs {
        block.location(INFO_LOC, loc);
    }
}

// ============================================================================
// ENTITIES
// ============================================================================

fn write_base_info(block: &mut BlockWriter, base: &InfoBase) {
    // The id is written even when invalid so the reader can insist on it.
    block.record(INFO_ID, &[Operand::Array(base.id.as_bytes())]);
    block.string(INFO_NAME, &base.name);
    block.symbol_ids(INFO_PARENTS, &base.parents);
    block.int(INFO_ACCESS, base.access.to_raw());
    write_source(block, &base.source);
    if let Some(javadoc) = &base.javadoc {
        write_javadoc(block, javadoc);
    }
}

fn write_namespace(block: &mut BlockWriter, info: &NamespaceInfo) {
    block.symbol_ids(NAMESPACE_MEMBERS, &info.members);
    block.symbol_ids(NAMESPACE_SPECIALIZATIONS, &info.specializations);
    block.int(NAMESPACE_SPECS, info.specs.to_bits());
}

fn write_record(block: &mut BlockWriter, info: &RecordInfo) {
    block.int(RECORD_KEY_KIND, info.key_kind.to_raw());
    block.flag(RECORD_IS_TYPEDEF, info.is_typedef);
    block.symbol_ids(RECORD_MEMBERS, &info.members);
    block.symbol_ids(RECORD_SPECIALIZATIONS, &info.specializations);
    block.symbol_ids(RECORD_FRIENDS, &info.friends);
    block.int(RECORD_SPECS, info.specs.to_bits());
    for base in &info.bases {
        write_base(block, base);
    }
    write_template(block, info.template.as_ref());
}

fn write_function(block: &mut BlockWriter, info: &FunctionInfo) {
    block.int(FUNCTION_CLASS, info.class.to_raw());
    block.int(FUNCTION_STORAGE, info.storage.to_raw());
    block.int(FUNCTION_SPECS, info.specs.to_bits());
    write_type(block, &info.return_type);
    for param in &info.params {
        write_param(block, param);
    }
    write_template(block, info.template.as_ref());
}

fn write_enum(block: &mut BlockWriter, info: &EnumInfo) {
    block.flag(ENUM_SCOPED, info.scoped);
    block.symbol_ids(ENUM_MEMBERS, &info.members);
    write_opt_type(block, info.underlying.as_ref());
}

fn write_enumerator(block: &mut BlockWriter, info: &EnumeratorInfo) {
    block.string(ENUMERATOR_INITIALIZER, &info.initializer);
}

fn write_field(block: &mut BlockWriter, info: &FieldInfo) {
    block.string(FIELD_DEFAULT, &info.default);
    block.string(FIELD_BITFIELD_WIDTH, &info.bitfield_width);
    block.int(FIELD_SPECS, info.specs.to_bits());
    write_type(block, &info.ty);
}

fn write_variable(block: &mut BlockWriter, info: &VariableInfo) {
    block.int(VARIABLE_STORAGE, info.storage.to_raw());
    block.int(VARIABLE_SPECS, info.specs.to_bits());
    write_type(block, &info.ty);
    write_template(block, info.template.as_ref());
}

fn write_typedef(block: &mut BlockWriter, info: &TypedefInfo) {
    block.flag(TYPEDEF_IS_USING, info.is_using);
    write_type(block, &info.underlying);
    write_template(block, info.template.as_ref());
}

fn write_friend(block: &mut BlockWriter, info: &FriendInfo) {
    block.symbol_id(FRIEND_SYMBOL, info.friend_symbol);
    write_opt_type(block, info.friend_type.as_ref());
}

fn write_specialization(block: &mut BlockWriter, info: &SpecializationInfo) {
    block.symbol_id(SPECIALIZATION_PRIMARY, info.primary);
    let mut flat = Vec::with_capacity(info.members.len() * SYMBOL_ID_LEN * 2);
    for member in &info.members {
        flat.extend_from_slice(member.primary.as_bytes());
        flat.extend_from_slice(member.specialized.as_bytes());
    }
    if !flat.is_empty() {
        block.record(SPECIALIZATION_MEMBERS, &[Operand::Array(&flat)]);
    }
    for arg in &info.args {
        write_template_arg(block, arg);
    }
}

fn entity_block_writer(info: &Info) -> BlockWriter {
    let mut block = BlockWriter::new(entity_block(info.kind()));
    visit!(info, i => write_base_info(&mut block, &i.base));
    match info {
        Info::Namespace(i) => write_namespace(&mut block, i),
        Info::Record(i) => write_record(&mut block, i),
        Info::Function(i) => write_function(&mut block, i),
        Info::Enum(i) => write_enum(&mut block, i),
        Info::Enumerator(i) => write_enumerator(&mut block, i),
        Info::Field(i) => write_field(&mut block, i),
        Info::Variable(i) => write_variable(&mut block, i),
        Info::Typedef(i) => write_typedef(&mut block, i),
        Info::Friend(i) => write_friend(&mut block, i),
        Info::Specialization(i) => write_specialization(&mut block, i),
    }
    block
}

// ============================================================================
// ENTRY POINTS
// ============================================================================

/// Streams entity blocks after a single header.
pub struct Writer {
    out: Vec<u8>,
    count: usize,
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer {
    /// Start a stream: signature, metadata and version.
    pub fn new() -> Self {
        let mut out = Vec::with_capacity(4096);
        out.extend_from_slice(&SIGNATURE);
        metadata_block().frame_into(&mut out);
        version_block().frame_into(&mut out);
        Self { out, count: 0 }
    }

    /// Append one entity block.
    pub fn write(&mut self, info: &Info) {
        entity_block_writer(info).frame_into(&mut self.out);
        self.count += 1;
    }

    pub fn finish(self) -> Vec<u8> {
        tracing::trace!(bitcode.infos = self.count, bitcode.len = self.out.len(), "encoded bitcode");
        self.out
    }
}

/// Encode a set of records into one stream.
pub fn encode<'a>(infos: impl IntoIterator<Item = &'a Info>) -> Vec<u8> {
    let mut writer = Writer::new();
    for info in infos {
        writer.write(info);
    }
    writer.finish()
}

/// Encode a single record as a complete stream.
pub fn encode_info(info: &Info) -> Vec<u8> {
    encode([info])
}
