//! The package tree.
//!
//! A tree of package nodes whose leaves are top-level declarations. The name
//! resolver builds it once for the whole linking unit and every import-table
//! lookup and qualified-name resolution walks it.

use indexmap::IndexMap;
use jcc_ast::ids::TypeDecl;

/// Handle to a node in the package tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PkgId(u32);

impl PkgId {
    /// The root (unnamed) package.
    #[must_use]
    pub const fn root() -> Self { Self(0) }

    #[must_use]
    const fn index(self) -> usize { self.0 as usize }
}

/// A child of a package node: either a nested package or a declaration leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PkgChild {
    /// A nested package
    Package(PkgId),
    /// A top-level class or interface declaration
    Decl(TypeDecl),
}

/// One node of the package tree.
#[derive(Debug)]
struct PkgNode {
    /// Children in insertion order, keyed by simple name
    children: IndexMap<String, PkgChild>,
}

/// The package tree for a whole linking unit.
#[derive(Debug)]
pub struct PackageTree {
    nodes: Vec<PkgNode>,
}

impl PackageTree {
    /// Creates a tree holding only the root package.
    #[must_use]
    pub fn new() -> Self { Self { nodes: vec![PkgNode { children: IndexMap::new() }] } }

    /// Looks up a child of the given package by name.
    #[must_use]
    pub fn lookup(&self, pkg: PkgId, name: &str) -> Option<PkgChild> {
        self.nodes[pkg.index()].children.get(name).copied()
    }

    /// Returns the child package with the given name, creating it if absent.
    ///
    /// Returns `None` if the name is already taken by a declaration leaf.
    pub fn get_or_create_package(&mut self, parent: PkgId, name: &str) -> Option<PkgId> {
        match self.lookup(parent, name) {
            Some(PkgChild::Package(id)) => Some(id),
            Some(PkgChild::Decl(_)) => None,
            None => {
                let id = PkgId(self.nodes.len() as u32);
                self.nodes.push(PkgNode { children: IndexMap::new() });
                let _ = self.nodes[parent.index()]
                    .children
                    .insert(name.to_string(), PkgChild::Package(id));
                Some(id)
            }
        }
    }

    /// Inserts a declaration leaf under a package.
    ///
    /// Returns false if the name is already taken.
    pub fn insert_decl(&mut self, pkg: PkgId, name: &str, decl: TypeDecl) -> bool {
        if self.nodes[pkg.index()].children.contains_key(name) {
            return false;
        }
        let _ = self.nodes[pkg.index()].children.insert(name.to_string(), PkgChild::Decl(decl));
        true
    }

    /// Iterates the children of a package in insertion order.
    pub fn children(&self, pkg: PkgId) -> impl Iterator<Item = (&str, PkgChild)> + '_ {
        self.nodes[pkg.index()].children.iter().map(|(name, child)| (name.as_str(), *child))
    }

    /// Walks a dotted path of package names from the root.
    ///
    /// Every segment must resolve to a package node; a declaration in the
    /// middle of the path (or a missing segment) returns `None`.
    #[must_use]
    pub fn resolve_package_path<S: AsRef<str>>(&self, parts: &[S]) -> Option<PkgId> {
        let mut cur = PkgId::root();
        for part in parts {
            match self.lookup(cur, part.as_ref())? {
                PkgChild::Package(next) => cur = next,
                PkgChild::Decl(_) => return None,
            }
        }
        Some(cur)
    }
}

impl Default for PackageTree {
    fn default() -> Self { Self::new() }
}
