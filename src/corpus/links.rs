//! Outgoing references of a record, resolved against the corpus.

use smol_str::SmolStr;

use super::Corpus;
use crate::base::SymbolId;
use crate::hir::{Info, TemplateInfo, TypeInfo};

/// Where a reference target was found.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Link<'a> {
    /// The target is in the corpus.
    Resolved(&'a Info),
    /// The target was never extracted; render it as plain text.
    Unresolved(SymbolId),
}

impl<'a> Link<'a> {
    pub fn id(&self) -> SymbolId {
        match self {
            Link::Resolved(info) => info.id(),
            Link::Unresolved(id) => *id,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Link::Resolved(_))
    }

    pub fn info(&self) -> Option<&'a Info> {
        match *self {
            Link::Resolved(info) => Some(info),
            Link::Unresolved(_) => None,
        }
    }
}

/// Why one record points at another.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LinkRole {
    Parent,
    Member,
    Specialization,
    Base,
    Friend,
    /// A type spelled in a signature or declaration.
    Type,
    /// The primary template of a specialization.
    Primary,
}

/// One outgoing reference with its resolution state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SymbolLink<'a> {
    pub role: LinkRole,
    pub link: Link<'a>,
    /// How the source spelled the target, when it did.
    pub spelling: SmolStr,
}

impl<'a> SymbolLink<'a> {
    /// Text to show for the link: the target's name if known, else
    /// the source spelling.
    pub fn text(&self) -> &str {
        match self.link {
            Link::Resolved(info) if !info.name().is_empty() => info.name(),
            _ => &self.spelling,
        }
    }
}

struct Collector<'a> {
    corpus: &'a Corpus,
    out: Vec<SymbolLink<'a>>,
}

impl<'a> Collector<'a> {
    fn push(&mut self, role: LinkRole, id: SymbolId, spelling: &str) {
        if !id.is_valid() {
            return;
        }
        self.out.push(SymbolLink {
            role,
            link: self.corpus.link(id),
            spelling: SmolStr::new(spelling),
        });
    }

    fn ids<'i>(&mut self, role: LinkRole, ids: impl IntoIterator<Item = &'i SymbolId>) {
        for id in ids {
            self.push(role, *id, "");
        }
    }

    fn ty(&mut self, ty: &TypeInfo) {
        self.push(LinkRole::Type, ty.id, &ty.name);
    }

    fn template(&mut self, template: Option<&TemplateInfo>) {
        if let Some(t) = template {
            self.push(LinkRole::Primary, t.primary, "");
        }
    }
}

/// Every outgoing reference of `info`, in declaration order.
pub(super) fn outgoing<'a>(corpus: &'a Corpus, info: &Info) -> Vec<SymbolLink<'a>> {
    let mut c = Collector {
        corpus,
        out: Vec::new(),
    };
    c.ids(LinkRole::Parent, &info.base().parents);
    match info {
        Info::Namespace(i) => {
            c.ids(LinkRole::Member, &i.members);
            c.ids(LinkRole::Specialization, &i.specializations);
        }
        Info::Record(i) => {
            for base in &i.bases {
                c.push(LinkRole::Base, base.ty.id, &base.ty.name);
            }
            c.template(i.template.as_ref());
            c.ids(LinkRole::Member, &i.members);
            c.ids(LinkRole::Specialization, &i.specializations);
            c.ids(LinkRole::Friend, &i.friends);
        }
        Info::Function(i) => {
            c.ty(&i.return_type);
            for param in &i.params {
                c.ty(&param.ty);
            }
            c.template(i.template.as_ref());
        }
        Info::Enum(i) => {
            if let Some(ty) = &i.underlying {
                c.ty(ty);
            }
            c.ids(LinkRole::Member, &i.members);
        }
        Info::Enumerator(_) => {}
        Info::Field(i) => c.ty(&i.ty),
        Info::Variable(i) => {
            c.ty(&i.ty);
            c.template(i.template.as_ref());
        }
        Info::Typedef(i) => {
            c.ty(&i.underlying);
            c.template(i.template.as_ref());
        }
        Info::Friend(i) => {
            c.push(LinkRole::Friend, i.friend_symbol, "");
            if let Some(ty) = &i.friend_type {
                c.ty(ty);
            }
        }
        Info::Specialization(i) => {
            c.push(LinkRole::Primary, i.primary, "");
            for m in &i.members {
                c.push(LinkRole::Member, m.specialized, "");
            }
        }
    }
    c.out
}
