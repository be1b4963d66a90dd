//! Fragment merge: flattens a type's fragment stack into a
//! [`DescriptorSet`], most specific declaration first.

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::{
    DeclaredProperty, DescriptorFragment, DescriptorSet, GetFn, GetMutFn, PropertyDescriptor,
    ReadAccessor, ResolutionMode, TypeProperties, WriteAccessor,
};
use crate::spec::TypeIdent;

/// A projection chain from the resolved root down to the fragment that
/// declared a candidate. Empty at the root.
#[derive(Clone)]
struct Projection {
    get: Option<GetFn>,
    get_mut: Option<GetMutFn>,
}

impl Projection {
    fn root() -> Self {
        Projection { get: None, get_mut: None }
    }

    /// Extends the chain one embedding deeper.
    fn extend(&self, project: &GetFn, project_mut: &GetMutFn) -> Self {
        match (&self.get, &self.get_mut) {
            (None, None) => Projection {
                get: Some(project.clone()),
                get_mut: Some(project_mut.clone()),
            },
            (Some(outer), Some(outer_mut)) => {
                let outer = outer.clone();
                let outer_mut = outer_mut.clone();
                let inner = project.clone();
                let inner_mut = project_mut.clone();
                Projection {
                    get: Some(Arc::new(move |obj| outer(obj).and_then(|base| inner(base)))),
                    get_mut: Some(Arc::new(move |obj| {
                        outer_mut(obj).and_then(|base| inner_mut(base))
                    })),
                }
            }
            _ => unreachable!("projection halves always travel together"),
        }
    }

    fn apply_read(&self, read: ReadAccessor) -> ReadAccessor {
        match (&self.get, &self.get_mut) {
            (None, None) => read,
            (Some(project), Some(project_mut)) => {
                let project = project.clone();
                let project_mut = project_mut.clone();
                let get = read.get;
                let get_mut = read.get_mut;
                ReadAccessor {
                    ty: read.ty,
                    get: Arc::new(move |obj| project(obj).and_then(|base| get(base))),
                    get_mut: Arc::new(move |obj| project_mut(obj).and_then(|base| get_mut(base))),
                }
            }
            _ => unreachable!("projection halves always travel together"),
        }
    }

    fn apply_write(&self, write: WriteAccessor) -> WriteAccessor {
        match &self.get_mut {
            None => write,
            Some(project_mut) => {
                let project_mut = project_mut.clone();
                let set = write.set;
                WriteAccessor {
                    ty: write.ty,
                    set: Arc::new(move |obj, value| match project_mut(obj) {
                        Some(base) => set(base, value),
                        None => Err(value),
                    }),
                }
            }
        }
    }
}

/// One declaration in merge order.
struct Candidate {
    /// Embedding distance from the resolved root. Lower is more specific.
    depth: u32,
    /// `Own` declarations outrank `Contract` declarations at equal depth.
    rank: u8,
    /// Declaration order within the walk, for a stable tiebreak.
    order: usize,
    declaring: TypeIdent,
    property: DeclaredProperty,
}

struct Walk<'a> {
    mode: ResolutionMode,
    lookup: &'a dyn Fn(TypeId) -> Option<TypeProperties>,
    visited: HashSet<TypeId>,
    candidates: Vec<Candidate>,
    order: usize,
}

impl Walk<'_> {
    fn push(
        &mut self,
        depth: u32,
        rank: u8,
        declaring: TypeIdent,
        projection: &Projection,
        properties: Vec<DeclaredProperty>,
    ) {
        for property in properties {
            let property = DeclaredProperty {
                name: property.name,
                read: property.read.map(|read| projection.apply_read(read)),
                write: property.write.map(|write| projection.apply_write(write)),
            };
            self.candidates.push(Candidate {
                depth,
                rank,
                order: self.order,
                declaring,
                property,
            });
            self.order += 1;
        }
    }

    fn collect(&mut self, source: TypeProperties, depth: u32, projection: &Projection) {
        let declaring = source.ty;
        for fragment in source.fragments {
            match fragment {
                DescriptorFragment::Own { properties } => {
                    self.push(depth, 0, declaring, projection, properties);
                }
                DescriptorFragment::Contract { ty, redeclares, properties } => {
                    if !redeclares && self.mode == ResolutionMode::Strict {
                        continue;
                    }
                    self.push(depth, 1, ty, projection, properties);
                }
                DescriptorFragment::Base { ty, project, project_mut } => {
                    if !self.visited.insert(ty.id()) {
                        log::warn!(
                            "property base cycle through `{}`; fragment skipped",
                            ty.name()
                        );
                        continue;
                    }
                    match (self.lookup)(ty.id()) {
                        Some(base) => {
                            let projection = projection.extend(&project, &project_mut);
                            self.collect(base, depth + 1, &projection);
                        }
                        None => {
                            log::debug!(
                                "no property source registered for base `{}`; fragment skipped",
                                ty.name()
                            );
                        }
                    }
                }
            }
        }
    }
}

/// Merges one type's fragment stack under `mode`.
///
/// `lookup` supplies the declared surfaces of embedded base types; an
/// unknown base is skipped rather than failing the whole resolution.
pub(crate) fn resolve(
    root: TypeProperties,
    mode: ResolutionMode,
    lookup: &dyn Fn(TypeId) -> Option<TypeProperties>,
) -> DescriptorSet {
    let ty = root.ty;
    let mut walk = Walk {
        mode,
        lookup,
        visited: HashSet::from([ty.id()]),
        candidates: Vec::new(),
        order: 0,
    };
    walk.collect(root, 0, &Projection::root());

    let mut candidates = walk.candidates;
    candidates.sort_by_key(|candidate| (candidate.depth, candidate.rank, candidate.order));

    let mut grouped: HashMap<&'static str, Vec<Candidate>> = HashMap::new();
    let mut names: Vec<&'static str> = Vec::new();
    for candidate in candidates {
        let group = grouped.entry(candidate.property.name).or_default();
        if group.is_empty() {
            names.push(candidate.property.name);
        }
        group.push(candidate);
    }

    let mut by_name = HashMap::with_capacity(names.len());
    for name in &names {
        let group = grouped.remove(name).unwrap_or_default();
        if let Some(descriptor) = merge_group(name, group, mode) {
            by_name.insert(*name, descriptor);
        }
    }
    names.retain(|name| by_name.contains_key(name));
    names.sort_unstable();

    DescriptorSet { ty, mode, by_name, names }
}

/// Merges all candidates for one property name.
///
/// The read accessor is the most specific readable candidate, which
/// realizes covariant narrowing: a derived type's narrower getter
/// shadows the base declaration. Write candidates are deduplicated by
/// parameter type before disambiguation so a redeclared identical
/// setter never counts as an overload.
fn merge_group(
    name: &'static str,
    group: Vec<Candidate>,
    mode: ResolutionMode,
) -> Option<PropertyDescriptor> {
    let declaring_fallback = group.first().map(|candidate| candidate.declaring)?;

    let read = group
        .iter()
        .find_map(|candidate| candidate.property.read.clone().map(|r| (candidate.declaring, r)));

    let mut writes: Vec<(TypeIdent, WriteAccessor)> = Vec::new();
    for candidate in &group {
        if let Some(write) = &candidate.property.write {
            let already = writes
                .iter()
                .any(|(_, seen)| seen.ty.ident().id() == write.ty.ident().id());
            if !already {
                writes.push((candidate.declaring, write.clone()));
            }
        }
    }

    let write = match writes.len() {
        0 => None,
        1 => writes.into_iter().next(),
        _ => {
            let matching = writes.iter().position(|(_, write)| match &read {
                Some((_, read)) => write.ty.ident().id() == read.ty.ident().id(),
                None => write.ty.is_top(),
            });
            match (matching, mode) {
                (Some(index), _) => Some(writes.swap_remove(index)),
                (None, ResolutionMode::Basic) => Some(writes.remove(0)),
                (None, ResolutionMode::Strict) => {
                    log::debug!(
                        "ambiguous overloaded setters for property `{name}`; none selected"
                    );
                    None
                }
            }
        }
    };

    let declaring_type = read
        .as_ref()
        .map(|(declaring, _)| *declaring)
        .or_else(|| write.as_ref().map(|(declaring, _)| *declaring))
        .unwrap_or(declaring_fallback);

    Some(PropertyDescriptor {
        name,
        read: read.map(|(_, read)| read),
        write: write.map(|(_, write)| write),
        declaring_type,
    })
}

// -----------------------------------------------------------------------------
// Tests
