//! Compound field types shared by several entity kinds.
//!
//! Small enums here are stored on the wire as fixed-width integers, so each
//! one knows its raw value and how many bits it needs.

use indexmap::IndexSet;
use smol_str::SmolStr;

use crate::base::SymbolId;

/// Declares a field-less enum with a stable raw encoding.
macro_rules! raw_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident : $bits:literal {
            $( $(#[$vmeta:meta])* $variant:ident = $value:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            #[default]
            $( $(#[$vmeta])* $variant = $value ),+
        }

        impl $name {
            /// Bits needed to store any variant.
            pub const BITS: u8 = $bits;

            /// The raw wire value.
            #[inline]
            pub const fn to_raw(self) -> u64 {
                self as u64
            }

            /// Parse a raw wire value.
            pub fn from_raw(raw: u64) -> Option<Self> {
                match raw {
                    $( $value => Some(Self::$variant), )+
                    _ => None,
                }
            }

            /// Whether this is the default variant, treated as "unset" by merge.
            #[inline]
            pub fn is_default(self) -> bool {
                self == Self::default()
            }
        }
    };
}

raw_enum! {
    /// C++ access specifier.
    pub enum AccessKind: 2 {
        None = 0,
        Public = 1,
        Protected = 2,
        Private = 3,
    }
}

raw_enum! {
    /// The class-key a record was declared with.
    pub enum RecordKeyKind: 2 {
        Struct = 0,
        Class = 1,
        Union = 2,
    }
}

raw_enum! {
    /// Storage class of a function or variable.
    pub enum StorageClass: 3 {
        None = 0,
        Extern = 1,
        Static = 2,
        Auto = 3,
        Register = 4,
    }
}

raw_enum! {
    /// What sort of special member a function is.
    pub enum FunctionClass: 2 {
        Normal = 0,
        Constructor = 1,
        Conversion = 2,
        Destructor = 3,
    }
}

raw_enum! {
    /// Template parameter flavour.
    pub enum TemplateParamKind: 2 {
        Type = 0,
        NonType = 1,
        Template = 2,
    }
}

/// Declares a struct of boolean specifiers packed into one bit field.
///
/// Merging ORs every flag: a specifier seen on any redeclaration holds
/// for the merged symbol.
macro_rules! specs {
    (
        $(#[$meta:meta])*
        pub struct $name:ident : $bits:literal {
            $( $(#[$fmeta:meta])* $field:ident = $bit:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
        pub struct $name {
            $( $(#[$fmeta])* pub $field: bool, )+
        }

        impl $name {
            /// Width of the packed bit field.
            pub const BITS: u8 = $bits;

            /// OR every flag of `other` into `self`.
            pub fn merge(&mut self, other: Self) {
                $( self.$field |= other.$field; )+
            }

            /// Pack into a bit field.
            pub fn to_bits(self) -> u64 {
                let mut bits = 0u64;
                $( if self.$field { bits |= 1 << $bit; } )+
                bits
            }

            /// Unpack from a bit field. Unknown bits are ignored.
            pub fn from_bits(bits: u64) -> Self {
                Self {
                    $( $field: bits & (1 << $bit) != 0, )+
                }
            }

            /// Whether no flag is set.
            pub fn is_empty(self) -> bool {
                self.to_bits() == 0
            }
        }
    };
}

specs! {
    /// Specifiers of a function declaration.
    pub struct FunctionSpecs: 16 {
        is_variadic = 0,
        is_virtual = 1,
        is_pure = 2,
        is_override = 3,
        is_final = 4,
        is_const = 5,
        is_volatile = 6,
        is_noexcept = 7,
        is_deleted = 8,
        is_defaulted = 9,
        is_explicit = 10,
        is_inline = 11,
        is_constexpr = 12,
        is_consteval = 13,
        is_nodiscard = 14,
        has_trailing_return = 15,
    }
}

specs! {
    /// Specifiers of a class, struct or union.
    pub struct RecordSpecs: 2 {
        is_final = 0,
        is_final_destructor = 1,
    }
}

specs! {
    /// Specifiers of a non-static data member.
    pub struct FieldSpecs: 5 {
        is_mutable = 0,
        is_bitfield = 1,
        is_maybe_unused = 2,
        is_deprecated = 3,
        has_no_unique_address = 4,
    }
}

specs! {
    /// Specifiers of a variable.
    pub struct VariableSpecs: 4 {
        is_inline = 0,
        is_constexpr = 1,
        is_constinit = 2,
        is_thread_local = 3,
    }
}

specs! {
    /// Specifiers of a namespace.
    pub struct NamespaceSpecs: 2 {
        is_inline = 0,
        is_anonymous = 1,
    }
}

/// A reference to a type as spelled at the use site.
///
/// `id` is [`SymbolId::INVALID`] for builtin or unextracted types.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct TypeInfo {
    pub id: SymbolId,
    pub name: SmolStr,
}

impl TypeInfo {
    /// Create a type reference.
    pub fn new(id: SymbolId, name: impl Into<SmolStr>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Create a reference to a builtin type.
    pub fn builtin(name: impl Into<SmolStr>) -> Self {
        Self::new(SymbolId::INVALID, name)
    }

    /// Whether neither an id nor a spelling is known.
    pub fn is_empty(&self) -> bool {
        !self.id.is_valid() && self.name.is_empty()
    }
}

/// A direct base class of a record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BaseInfo {
    pub ty: TypeInfo,
    pub access: AccessKind,
    pub is_virtual: bool,
}

/// A function parameter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Param {
    pub name: SmolStr,
    pub ty: TypeInfo,
    pub default: SmolStr,
}

/// A template parameter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TemplateParam {
    pub kind: TemplateParamKind,
    pub name: SmolStr,
    pub default: SmolStr,
    pub is_pack: bool,
}

/// A template argument, as written.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TemplateArg {
    pub value: SmolStr,
}

impl TemplateArg {
    pub fn new(value: impl Into<SmolStr>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

/// Template information for a templated declaration.
///
/// `primary` is set for explicit and partial specializations and names
/// the primary template.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TemplateInfo {
    pub params: Vec<TemplateParam>,
    pub args: Vec<TemplateArg>,
    pub primary: SymbolId,
}

impl TemplateInfo {
    /// Whether this describes a specialization rather than a primary template.
    pub fn is_specialization(&self) -> bool {
        self.primary.is_valid()
    }
}

/// A member of a class template specialization paired with the
/// member of the primary template it specializes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpecializedMember {
    pub primary: SymbolId,
    pub specialized: SymbolId,
}

/// Documentation attached to a symbol.
///
/// The core treats the contents as opaque; it only knows how to combine
/// two of them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Javadoc {
    pub brief: SmolStr,
    pub blocks: Vec<SmolStr>,
}

impl Javadoc {
    pub fn new(brief: impl Into<SmolStr>) -> Self {
        Self {
            brief: brief.into(),
            blocks: Vec::new(),
        }
    }

    /// Combine with another comment for the same symbol.
    ///
    /// Keeps the first brief and appends paragraphs not already present.
    pub fn merge(&mut self, other: Javadoc) {
        if self.brief.is_empty() {
            self.brief = other.brief;
        }
        let mut seen: IndexSet<SmolStr> = self.blocks.iter().cloned().collect();
        for block in other.blocks {
            if seen.insert(block.clone()) {
                self.blocks.push(block);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.brief.is_empty() && self.blocks.is_empty()
    }
}
