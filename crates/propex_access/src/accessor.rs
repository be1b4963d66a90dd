//! The [`Accessor`]: reading, writing and type-checking nested
//! properties over a live value graph.
//!
//! Reads walk shared references and clone the resolved value out of
//! the graph. Writes walk mutable references segment by segment,
//! reborrowing at each step, and coerce the incoming value to the
//! declared type of the final slot before storing it. With auto-grow
//! enabled, missing intermediate values are default-constructed on the
//! way down; sequence writes past the end always extend the sequence,
//! bounded by the growth limit.

use propex_model::{
    Accessible, ContainerMut, ContainerRef, DescriptorRegistry, ResolutionMode, Shape, TypeSpec,
    Typed,
};

use crate::convert::{Coercer, ConversionError};
use crate::error::{PropertyAccessError, Suggestions};
use crate::path::{PathSegment, PropertyPath};

// -----------------------------------------------------------------------------
// Accessor

/// Path-based access to a graph of [`Accessible`] values.
///
/// # Examples
///
/// ```
/// use propex_access::Accessor;
///
/// #[derive(Debug, Clone, Default, PartialEq)]
/// struct Person {
///     name: String,
///     age: i32,
/// }
///
/// propex_model::define_properties! {
///     Person default {
///         name: String => get set,
///         age: i32 => get set,
///     }
/// }
///
/// let accessor = Accessor::new();
/// let mut person = Person::default();
/// accessor.set_value(&mut person, "age", "65".to_string()).unwrap();
/// assert_eq!(person.age, 65);
/// assert_eq!(accessor.get_as::<i32>(&mut person, "age").unwrap(), Some(65));
/// ```
#[derive(Debug)]
pub struct Accessor {
    mode: ResolutionMode,
    auto_grow: bool,
    auto_grow_limit: usize,
    coercer: Coercer,
}

impl Accessor {
    /// An accessor with strict descriptor resolution, auto-grow off
    /// and only built-in coercions.
    pub fn new() -> Self {
        Self {
            mode: ResolutionMode::default(),
            auto_grow: false,
            auto_grow_limit: usize::MAX,
            coercer: Coercer::new(),
        }
    }

    /// Selects the descriptor resolution mode.
    pub fn with_mode(mut self, mode: ResolutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Enables or disables default-construction of missing
    /// intermediate values.
    pub fn with_auto_grow(mut self, auto_grow: bool) -> Self {
        self.auto_grow = auto_grow;
        self
    }

    /// Caps the index up to which sequences may be grown.
    pub fn with_auto_grow_limit(mut self, limit: usize) -> Self {
        self.auto_grow_limit = limit;
        self
    }

    /// Replaces the coercion pipeline.
    pub fn with_coercer(mut self, coercer: Coercer) -> Self {
        self.coercer = coercer;
        self
    }

    /// Returns the coercion pipeline for converter registration.
    pub fn coercer_mut(&mut self) -> &mut Coercer {
        &mut self.coercer
    }

    // -------------------------------------------------------------------------
    // Reads

    /// Reads the value at `path`, cloned out of the graph.
    ///
    /// `Ok(None)` is the tolerant outcome: a null final slot, a missing
    /// key or an out-of-range index. A null value in the middle of the
    /// path is an error unless auto-grow fills it in; `root` is mutable
    /// because that growth mutates the graph. Growth stops short of the
    /// final slot, except for a sequence index, so a tolerant read
    /// never creates the key or value it reports as missing.
    pub fn get(
        &self,
        root: &mut dyn Accessible,
        path: &str,
    ) -> Result<Option<Box<dyn Accessible>>, PropertyAccessError> {
        let parsed = PropertyPath::parse(path)?;
        if self.auto_grow {
            self.grow_for_read(root, &parsed);
        }
        self.read_parsed(root, &parsed)
    }

    /// Reads the value at `path` coerced to `T`.
    pub fn get_as<T>(
        &self,
        root: &mut dyn Accessible,
        path: &str,
    ) -> Result<Option<T>, PropertyAccessError>
    where
        T: Accessible + Typed,
    {
        let parsed = PropertyPath::parse(path)?;
        if self.auto_grow {
            self.grow_for_read(root, &parsed);
        }
        let Some(value) = self.read_parsed(root, &parsed)? else {
            return Ok(None);
        };

        let (_, last) = parsed.split_last();
        let spec = T::type_spec();
        let coerced = self
            .coercer
            .coerce(value, &spec, parsed.as_str())
            .map_err(|source| type_mismatch(parsed.as_str(), &last.display_name(), &spec, source))?;
        match coerced.take::<T>() {
            Ok(value) => Ok(Some(value)),
            Err(other) => Err(type_mismatch(
                parsed.as_str(),
                &last.display_name(),
                &spec,
                ConversionError {
                    from: other.type_ident().short_name(),
                    to: spec.ident().short_name(),
                    value: other.rendered().to_string(),
                    kind: crate::convert::ConversionErrorKind::NoMatch,
                },
            )),
        }
    }

    /// Returns `true` if `path` parses and resolves readably on `root`.
    pub fn is_readable(&self, root: &dyn Accessible, path: &str) -> bool {
        let Ok(parsed) = PropertyPath::parse(path) else {
            return false;
        };
        self.read_parsed(root, &parsed).is_ok()
    }

    /// Returns `true` if a write to `path` on `root` could succeed.
    pub fn is_writable(&self, root: &dyn Accessible, path: &str) -> bool {
        let Ok(parsed) = PropertyPath::parse(path) else {
            return false;
        };
        let (parents, last) = parsed.split_last();

        let mut current = root;
        for segment in parents {
            match self.resolve_step(current, segment, parsed.as_str()) {
                Ok(Resolved::Value(next)) => current = next,
                _ => return false,
            }
        }

        match last {
            PathSegment::Property { name, .. } => match current.container_ref() {
                ContainerRef::Bean(bean) => DescriptorRegistry::global()
                    .descriptor_set(bean.type_ident(), self.mode)
                    .and_then(|set| set.get(name).map(|descriptor| descriptor.write().is_some()))
                    .unwrap_or(false),
                ContainerRef::Keyed(_) => true,
                _ => false,
            },
            PathSegment::Key { token, .. } => match current.container_ref() {
                ContainerRef::Sequence(seq) => match token.as_index() {
                    Some(index) if index < seq.len() => true,
                    Some(index) => {
                        index < self.auto_grow_limit
                            && (index == seq.len() || seq.elem_spec().can_construct())
                    }
                    None => false,
                },
                ContainerRef::Keyed(_) => true,
                _ => false,
            },
        }
    }

    /// Returns the declared type of the final slot of `path`.
    pub fn read_type(
        &self,
        root: &dyn Accessible,
        path: &str,
    ) -> Result<TypeSpec, PropertyAccessError> {
        let parsed = PropertyPath::parse(path)?;
        let (parents, last) = parsed.split_last();

        let mut current = root;
        let mut trail = String::new();
        for segment in parents {
            trail = extend_trail(&trail, segment);
            match self.resolve_step(current, segment, parsed.as_str())? {
                Resolved::Value(next) => current = next,
                Resolved::NullSlot | Resolved::Absent => {
                    return Err(null_in_path(
                        parsed.as_str(),
                        &trail,
                        &current.type_ident().short_name(),
                    ));
                }
            }
        }

        let type_name = current.type_ident().short_name();
        match last {
            PathSegment::Property { name, .. } => match current.container_ref() {
                ContainerRef::Bean(bean) => {
                    let set = DescriptorRegistry::global()
                        .descriptor_set(bean.type_ident(), self.mode)
                        .ok_or_else(|| {
                            not_readable(parsed.as_str(), name, &type_name, Suggestions::default())
                        })?;
                    let descriptor = set.get(name).ok_or_else(|| {
                        not_readable(parsed.as_str(), name, &type_name, suggest(name, &set))
                    })?;
                    descriptor.read_type().cloned().ok_or_else(|| {
                        not_readable(parsed.as_str(), name, &type_name, Suggestions::default())
                    })
                }
                ContainerRef::Keyed(map) => Ok(map.value_spec()),
                other => Err(invalid_property(
                    parsed.as_str(),
                    name,
                    format!("named property applied to a {} value", other.shape()),
                )),
            },
            PathSegment::Key { token, .. } => match current.container_ref() {
                ContainerRef::Sequence(seq) => Ok(seq.elem_spec()),
                ContainerRef::Unordered(set) => Ok(set.elem_spec()),
                ContainerRef::Keyed(map) => Ok(map.value_spec()),
                other => Err(invalid_property(
                    parsed.as_str(),
                    &token.as_text(),
                    format!("bracket key applied to a {} value", other.shape()),
                )),
            },
        }
    }

    // -------------------------------------------------------------------------
    // Writes

    /// Writes `value` to `path`, coercing it to the declared type of
    /// the final slot.
    pub fn set(
        &self,
        root: &mut dyn Accessible,
        path: &str,
        value: Box<dyn Accessible>,
    ) -> Result<(), PropertyAccessError> {
        let parsed = PropertyPath::parse(path)?;
        self.write_path(root, parsed.segments(), parsed.as_str(), "", value)
    }

    /// Boxing convenience over [`Accessor::set`].
    pub fn set_value<T: Accessible>(
        &self,
        root: &mut dyn Accessible,
        path: &str,
        value: T,
    ) -> Result<(), PropertyAccessError> {
        self.set(root, path, Box::new(value))
    }

    // -------------------------------------------------------------------------
    // Shared walk

    fn read_parsed(
        &self,
        root: &dyn Accessible,
        parsed: &PropertyPath,
    ) -> Result<Option<Box<dyn Accessible>>, PropertyAccessError> {
        let (parents, last) = parsed.split_last();

        let mut current = root;
        let mut trail = String::new();
        for segment in parents {
            trail = extend_trail(&trail, segment);
            match self.resolve_step(current, segment, parsed.as_str())? {
                Resolved::Value(next) => current = next,
                Resolved::NullSlot => {
                    return Err(null_in_path(
                        parsed.as_str(),
                        &trail,
                        &current.type_ident().short_name(),
                    ));
                }
                Resolved::Absent => return Ok(None),
            }
        }

        match self.resolve_step(current, last, parsed.as_str())? {
            Resolved::Value(value) => Ok(Some(value.clone_value())),
            Resolved::NullSlot | Resolved::Absent => Ok(None),
        }
    }

    /// Resolves one segment against a shared reference.
    fn resolve_step<'a>(
        &self,
        current: &'a dyn Accessible,
        segment: &PathSegment,
        path: &str,
    ) -> Result<Resolved<'a>, PropertyAccessError> {
        let type_name = current.type_ident().short_name();
        match segment {
            PathSegment::Property { name, .. } => match current.container_ref() {
                ContainerRef::Bean(bean) => {
                    let set = DescriptorRegistry::global()
                        .descriptor_set(bean.type_ident(), self.mode)
                        .ok_or_else(|| {
                            not_readable(path, name, &type_name, Suggestions::default())
                        })?;
                    let descriptor = set
                        .get(name)
                        .ok_or_else(|| not_readable(path, name, &type_name, suggest(name, &set)))?;
                    let read = descriptor.read().ok_or_else(|| {
                        not_readable(path, name, &type_name, Suggestions::default())
                    })?;
                    Ok(match (read.get)(bean) {
                        Some(value) => Resolved::Value(value),
                        None => Resolved::NullSlot,
                    })
                }
                // A bare name on a keyed container reads as a key.
                ContainerRef::Keyed(map) => Ok(map
                    .get(name)
                    .map(Resolved::Value)
                    .unwrap_or(Resolved::Absent)),
                other => Err(invalid_property(
                    path,
                    name,
                    format!("named property applied to a {} value", other.shape()),
                )),
            },
            PathSegment::Key { token, .. } => match current.container_ref() {
                ContainerRef::Sequence(seq) => {
                    let index = token.as_index().ok_or_else(|| {
                        invalid_property(
                            path,
                            &token.as_text(),
                            "sequences take numeric indexes".to_string(),
                        )
                    })?;
                    Ok(seq
                        .get(index)
                        .map(Resolved::Value)
                        .unwrap_or(Resolved::Absent))
                }
                ContainerRef::Keyed(map) => Ok(map
                    .get(&token.as_text())
                    .map(Resolved::Value)
                    .unwrap_or(Resolved::Absent)),
                ContainerRef::Unordered(set) => {
                    let index = token.as_index().ok_or_else(|| {
                        invalid_property(
                            path,
                            &token.as_text(),
                            "unordered containers take iteration positions".to_string(),
                        )
                    })?;
                    Ok(set
                        .get_at(index)
                        .map(Resolved::Value)
                        .unwrap_or(Resolved::Absent))
                }
                other => Err(invalid_property(
                    path,
                    &token.as_text(),
                    format!("bracket key applied to a {} value", other.shape()),
                )),
            },
        }
    }

    // -------------------------------------------------------------------------
    // Mutable walk

    /// Best-effort growth before a read. Only parent segments and a
    /// terminal sequence index are grown; terminal bean and keyed
    /// slots stay untouched so tolerant reads have no side effects.
    /// Errors fall through to the read, which reports the precise
    /// condition.
    fn grow_for_read(&self, root: &mut dyn Accessible, parsed: &PropertyPath) {
        let (parents, last) = parsed.split_last();

        let mut current = root;
        let mut trail = String::new();
        for segment in parents {
            trail = extend_trail(&trail, segment);
            match self.step_mut(current, segment, parsed.as_str(), &trail) {
                Ok(next) => current = next,
                Err(_) => return,
            }
        }

        if let PathSegment::Key { token, .. } = last {
            if let Some(index) = token.as_index() {
                if current.shape() == Shape::Sequence {
                    trail = extend_trail(&trail, last);
                    let _ = self.sequence_child_mut(current, index, parsed.as_str(), &trail);
                }
            }
        }
    }

    /// Walks and writes in one recursive pass. `trail` is the joined
    /// path behind `segments`, for error attribution.
    fn write_path(
        &self,
        current: &mut dyn Accessible,
        segments: &[PathSegment],
        path: &str,
        trail: &str,
        value: Box<dyn Accessible>,
    ) -> Result<(), PropertyAccessError> {
        let [segment, rest @ ..] = segments else {
            unreachable!("parsed paths are never empty");
        };
        let trail = extend_trail(trail, segment);

        if rest.is_empty() {
            return self.write_segment(current, segment, path, &trail, value);
        }

        // A write through a set element takes the element out, mutates
        // the owned value and reinserts it; sets hand out no mutable
        // references.
        if current.shape() == Shape::Unordered {
            if let PathSegment::Key { token, .. } = segment {
                let index = token.as_index().ok_or_else(|| {
                    invalid_property(
                        path,
                        &token.as_text(),
                        "unordered containers take iteration positions".to_string(),
                    )
                })?;
                return self.write_through_unordered(current, index, rest, path, &trail, value);
            }
        }

        let next = self.step_mut(current, segment, path, &trail)?;
        self.write_path(next, rest, path, &trail, value)
    }

    fn write_through_unordered(
        &self,
        current: &mut dyn Accessible,
        index: usize,
        rest: &[PathSegment],
        path: &str,
        trail: &str,
        value: Box<dyn Accessible>,
    ) -> Result<(), PropertyAccessError> {
        let type_name = current.type_ident().short_name();
        let ContainerMut::Unordered(set) = current.container_mut() else {
            return Err(invalid_property(
                path,
                &index.to_string(),
                "expected an unordered container".to_string(),
            ));
        };
        let Some(mut element) = set.take_at(index) else {
            return Err(null_in_path(path, trail, &type_name));
        };
        let written = self.write_path(&mut *element, rest, path, trail, value);
        // The element came out of this set, so reinsertion cannot mismatch.
        let _ = set.try_insert(element);
        written
    }

    /// Advances one segment mutably, growing missing values when
    /// auto-grow allows it.
    fn step_mut<'a>(
        &self,
        current: &'a mut dyn Accessible,
        segment: &PathSegment,
        path: &str,
        trail: &str,
    ) -> Result<&'a mut dyn Accessible, PropertyAccessError> {
        match segment {
            PathSegment::Property { name, .. } => match current.shape() {
                Shape::Bean => self.bean_child_mut(current, name, path, trail),
                Shape::Keyed => self.keyed_child_mut(current, name, path, trail),
                other => Err(invalid_property(
                    path,
                    name,
                    format!("named property applied to a {other} value"),
                )),
            },
            PathSegment::Key { token, .. } => match current.shape() {
                Shape::Sequence => {
                    let index = token.as_index().ok_or_else(|| {
                        invalid_property(
                            path,
                            &token.as_text(),
                            "sequences take numeric indexes".to_string(),
                        )
                    })?;
                    self.sequence_child_mut(current, index, path, trail)
                }
                Shape::Keyed => self.keyed_child_mut(current, &token.as_text(), path, trail),
                Shape::Unordered => Err(invalid_property(
                    path,
                    &token.as_text(),
                    "unordered containers hand out no mutable elements".to_string(),
                )),
                other => Err(invalid_property(
                    path,
                    &token.as_text(),
                    format!("bracket key applied to a {other} value"),
                )),
            },
        }
    }

    fn bean_child_mut<'a>(
        &self,
        current: &'a mut dyn Accessible,
        name: &str,
        path: &str,
        trail: &str,
    ) -> Result<&'a mut dyn Accessible, PropertyAccessError> {
        let type_name = current.type_ident().short_name();
        let set = DescriptorRegistry::global()
            .descriptor_set(current.type_ident(), self.mode)
            .ok_or_else(|| not_readable(path, name, &type_name, Suggestions::default()))?;
        let descriptor = set
            .get(name)
            .ok_or_else(|| not_readable(path, name, &type_name, suggest(name, &set)))?;
        let read = descriptor
            .read()
            .cloned()
            .ok_or_else(|| not_readable(path, name, &type_name, Suggestions::default()))?;
        let write = descriptor.write().cloned();
        drop(set);

        if (read.get)(&*current).is_none() {
            if !self.auto_grow {
                return Err(null_in_path(path, trail, &type_name));
            }
            let fresh = read
                .ty
                .construct_default()
                .ok_or_else(|| null_in_path(path, trail, &type_name))?;
            let write = write.ok_or_else(|| null_in_path(path, trail, &type_name))?;
            (write.set)(&mut *current, fresh).map_err(|_| null_in_path(path, trail, &type_name))?;
        }
        (read.get_mut)(current).ok_or_else(|| null_in_path(path, trail, &type_name))
    }

    fn keyed_child_mut<'a>(
        &self,
        current: &'a mut dyn Accessible,
        key: &str,
        path: &str,
        trail: &str,
    ) -> Result<&'a mut dyn Accessible, PropertyAccessError> {
        let grow = self.auto_grow;
        let type_name = current.type_ident().short_name();
        let ContainerMut::Keyed(map) = current.container_mut() else {
            return Err(invalid_property(
                path,
                key,
                "expected a keyed container".to_string(),
            ));
        };
        if map.get(key).is_none() {
            if !grow {
                return Err(null_in_path(path, trail, &type_name));
            }
            let fresh = map
                .value_spec()
                .construct_default()
                .ok_or_else(|| null_in_path(path, trail, &type_name))?;
            if map.insert(key, fresh).is_err() {
                return Err(null_in_path(path, trail, &type_name));
            }
        }
        map.get_mut(key)
            .ok_or_else(|| null_in_path(path, trail, &type_name))
    }

    fn sequence_child_mut<'a>(
        &self,
        current: &'a mut dyn Accessible,
        index: usize,
        path: &str,
        trail: &str,
    ) -> Result<&'a mut dyn Accessible, PropertyAccessError> {
        let grow = self.auto_grow;
        let limit = self.auto_grow_limit;
        let type_name = current.type_ident().short_name();
        let ContainerMut::Sequence(seq) = current.container_mut() else {
            return Err(invalid_property(
                path,
                &index.to_string(),
                "expected a sequence".to_string(),
            ));
        };
        let len = seq.len();
        if index >= len {
            if !grow {
                return Err(invalid_property(
                    path,
                    &index.to_string(),
                    format!("index {index} out of bounds (len {len})"),
                ));
            }
            if index >= limit {
                log::warn!("growth limit {limit} stops index {index} in `{path}`");
                return Err(invalid_property(
                    path,
                    &index.to_string(),
                    format!("index {index} exceeds the growth limit {limit}"),
                ));
            }
            while seq.len() <= index {
                if !seq.push_default() {
                    return Err(null_in_path(path, trail, &type_name));
                }
            }
        }
        seq.get_mut(index)
            .ok_or_else(|| null_in_path(path, trail, &type_name))
    }

    // -------------------------------------------------------------------------
    // Final-segment writes

    fn write_segment(
        &self,
        parent: &mut dyn Accessible,
        segment: &PathSegment,
        path: &str,
        trail: &str,
        value: Box<dyn Accessible>,
    ) -> Result<(), PropertyAccessError> {
        let type_name = parent.type_ident().short_name();
        match segment {
            PathSegment::Property { name, .. } => match parent.shape() {
                Shape::Bean => self.write_bean(parent, name, path, value),
                Shape::Keyed => self.write_keyed(parent, name, path, value),
                other => Err(invalid_property(
                    path,
                    name,
                    format!("named property applied to a {other} value"),
                )),
            },
            PathSegment::Key { token, .. } => match parent.shape() {
                Shape::Sequence => {
                    let index = token.as_index().ok_or_else(|| {
                        invalid_property(
                            path,
                            &token.as_text(),
                            "sequences take numeric indexes".to_string(),
                        )
                    })?;
                    self.write_sequence(parent, index, path, trail, value)
                }
                Shape::Keyed => self.write_keyed(parent, &token.as_text(), path, value),
                Shape::Unordered => Err(not_writable(
                    path,
                    &token.as_text(),
                    &type_name,
                    Suggestions::default(),
                )),
                other => Err(invalid_property(
                    path,
                    &token.as_text(),
                    format!("bracket key applied to a {other} value"),
                )),
            },
        }
    }

    fn write_bean(
        &self,
        parent: &mut dyn Accessible,
        name: &str,
        path: &str,
        value: Box<dyn Accessible>,
    ) -> Result<(), PropertyAccessError> {
        let type_name = parent.type_ident().short_name();
        let set = DescriptorRegistry::global()
            .descriptor_set(parent.type_ident(), self.mode)
            .ok_or_else(|| not_writable(path, name, &type_name, Suggestions::default()))?;
        let descriptor = set
            .get(name)
            .ok_or_else(|| not_writable(path, name, &type_name, suggest(name, &set)))?;
        let write = descriptor
            .write()
            .cloned()
            .ok_or_else(|| not_writable(path, name, &type_name, Suggestions::default()))?;
        drop(set);

        let coerced = self
            .coercer
            .coerce(value, &write.ty, path)
            .map_err(|source| type_mismatch(path, name, &write.ty, source))?;
        (write.set)(parent, coerced).map_err(|rejected| {
            invalid_property(
                path,
                name,
                format!("setter rejected value `{}`", rejected.rendered()),
            )
        })
    }

    fn write_keyed(
        &self,
        parent: &mut dyn Accessible,
        key: &str,
        path: &str,
        value: Box<dyn Accessible>,
    ) -> Result<(), PropertyAccessError> {
        let ContainerMut::Keyed(map) = parent.container_mut() else {
            return Err(invalid_property(
                path,
                key,
                "expected a keyed container".to_string(),
            ));
        };
        let spec = map.value_spec();
        let coerced = self
            .coercer
            .coerce(value, &spec, path)
            .map_err(|source| type_mismatch(path, key, &spec, source))?;
        map.insert(key, coerced).map(|_| ()).map_err(|rejected| {
            invalid_property(
                path,
                key,
                format!("container rejected value `{}`", rejected.rendered()),
            )
        })
    }

    /// Sequence writes extend past the end unconditionally, padding
    /// the gap with defaults, bounded only by the growth limit.
    fn write_sequence(
        &self,
        parent: &mut dyn Accessible,
        index: usize,
        path: &str,
        trail: &str,
        value: Box<dyn Accessible>,
    ) -> Result<(), PropertyAccessError> {
        let limit = self.auto_grow_limit;
        let type_name = parent.type_ident().short_name();
        let ContainerMut::Sequence(seq) = parent.container_mut() else {
            return Err(invalid_property(
                path,
                &index.to_string(),
                "expected a sequence".to_string(),
            ));
        };
        let spec = seq.elem_spec();
        let coerced = self
            .coercer
            .coerce(value, &spec, path)
            .map_err(|source| type_mismatch(path, &index.to_string(), &spec, source))?;

        let len = seq.len();
        if index < len {
            return seq.set(index, coerced).map_err(|rejected| {
                invalid_property(
                    path,
                    &index.to_string(),
                    format!("container rejected value `{}`", rejected.rendered()),
                )
            });
        }

        if index >= limit {
            log::warn!("growth limit {limit} stops index {index} in `{path}`");
            return Err(invalid_property(
                path,
                &index.to_string(),
                format!("index {index} exceeds the growth limit {limit}"),
            ));
        }
        while seq.len() < index {
            if !seq.push_default() {
                return Err(null_in_path(path, trail, &type_name));
            }
        }
        seq.try_push(coerced).map_err(|rejected| {
            invalid_property(
                path,
                &index.to_string(),
                format!("container cannot append value `{}`", rejected.rendered()),
            )
        })
    }
}

impl Default for Accessor {
    fn default() -> Self {
        Self::new()
    }
}

// -----------------------------------------------------------------------------
// Step outcome

/// What one shared-walk step found.
enum Resolved<'a> {
    /// A live value to continue from.
    Value(&'a dyn Accessible),
    /// A bean property that exists but holds null.
    NullSlot,
    /// A container key or index with nothing behind it.
    Absent,
}

// -----------------------------------------------------------------------------
// Error constructors

fn suggest(name: &str, set: &propex_model::DescriptorSet) -> Suggestions {
    Suggestions::for_name(name, set.names().iter().copied())
}

fn invalid_property(path: &str, property: &str, reason: String) -> PropertyAccessError {
    PropertyAccessError::InvalidProperty {
        path: path.to_string(),
        property: property.to_string(),
        reason,
    }
}

fn not_readable(
    path: &str,
    property: &str,
    type_name: &str,
    suggestions: Suggestions,
) -> PropertyAccessError {
    PropertyAccessError::NotReadable {
        path: path.to_string(),
        property: property.to_string(),
        type_name: type_name.to_string(),
        suggestions,
    }
}

fn not_writable(
    path: &str,
    property: &str,
    type_name: &str,
    suggestions: Suggestions,
) -> PropertyAccessError {
    PropertyAccessError::NotWritable {
        path: path.to_string(),
        property: property.to_string(),
        type_name: type_name.to_string(),
        suggestions,
    }
}

/// Joins `segment` onto the walked-so-far path for error attribution.
fn extend_trail(trail: &str, segment: &PathSegment) -> String {
    let mut joined = String::with_capacity(trail.len() + 8);
    joined.push_str(trail);
    match segment {
        PathSegment::Property { name, .. } => {
            if !joined.is_empty() {
                joined.push('.');
            }
            joined.push_str(name);
        }
        PathSegment::Key { token, .. } => {
            joined.push('[');
            joined.push_str(&token.as_text());
            joined.push(']');
        }
    }
    joined
}

fn null_in_path(path: &str, trail: &str, type_name: &str) -> PropertyAccessError {
    PropertyAccessError::NullValueInNestedPath {
        path: path.to_string(),
        property: trail.to_string(),
        type_name: type_name.to_string(),
    }
}

fn type_mismatch(
    path: &str,
    property: &str,
    expected: &TypeSpec,
    source: ConversionError,
) -> PropertyAccessError {
    PropertyAccessError::TypeMismatch {
        path: path.to_string(),
        property: property.to_string(),
        expected: expected.to_string(),
        actual: source.from.clone(),
        value: source.value.clone(),
        source,
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Country {
        name: String,
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Address {
        city: String,
        country: Country,
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Person {
        name: String,
        age: i32,
        address: Option<Address>,
        scores: HashMap<String, i32>,
        tags: Vec<String>,
    }

    propex_model::define_properties! {
        Country default {
            name: String => get set,
        }
    }

    propex_model::define_properties! {
        Address default {
            city: String => get set,
            country: Country => get set,
        }
    }

    propex_model::define_properties! {
        Person default {
            name: String => get set,
            age: i32 => get set,
            address: option(Address) => get set,
            scores: HashMap<String, i32> => get set,
            tags: Vec<String> => get set,
        }
    }

    #[test]
    fn scalar_round_trip_with_coercion() {
        let accessor = Accessor::new();
        let mut person = Person::default();

        accessor
            .set_value(&mut person, "age", "65".to_string())
            .unwrap();
        assert_eq!(person.age, 65);
        assert_eq!(accessor.get_as::<i32>(&mut person, "age").unwrap(), Some(65));
        assert_eq!(
            accessor.get_as::<String>(&mut person, "age").unwrap(),
            Some("65".to_string())
        );
    }

    #[test]
    fn nested_read_through_live_values() {
        let accessor = Accessor::new();
        let mut person = Person {
            address: Some(Address {
                city: "Basel".to_string(),
                country: Country { name: "CH".to_string() },
            }),
            ..Person::default()
        };

        assert_eq!(
            accessor
                .get_as::<String>(&mut person, "address.country.name")
                .unwrap(),
            Some("CH".to_string())
        );
    }

    #[test]
    fn null_intermediate_names_the_property() {
        let accessor = Accessor::new();
        let mut person = Person::default();

        let err = accessor
            .get(&mut person, "address.city")
            .unwrap_err();
        assert_eq!(err.property(), Some("address"));
        assert!(matches!(err, PropertyAccessError::NullValueInNestedPath { .. }));

        let err = accessor
            .set_value(&mut person, "address.city", "Basel".to_string())
            .unwrap_err();
        assert!(matches!(err, PropertyAccessError::NullValueInNestedPath { .. }));
    }

    #[test]
    fn auto_grow_materializes_the_chain() {
        let accessor = Accessor::new().with_auto_grow(true);
        let mut person = Person::default();

        accessor
            .set_value(&mut person, "address.country.name", "CH".to_string())
            .unwrap();
        assert_eq!(
            person.address.as_ref().map(|a| a.country.name.as_str()),
            Some("CH")
        );
    }

    #[test]
    fn auto_grow_read_is_idempotent() {
        let accessor = Accessor::new().with_auto_grow(true);
        let mut person = Person::default();

        let first = accessor.get(&mut person, "tags[2]").unwrap();
        assert_eq!(person.tags.len(), 3);
        assert!(first.unwrap().is::<String>());

        accessor.get(&mut person, "tags[2]").unwrap();
        assert_eq!(person.tags.len(), 3);
    }

    #[test]
    fn auto_grow_reads_leave_terminal_slots_alone() {
        let accessor = Accessor::new().with_auto_grow(true);
        let mut person = Person::default();

        assert!(accessor.get(&mut person, "scores[pending]").unwrap().is_none());
        assert!(person.scores.is_empty());

        assert!(accessor.get(&mut person, "address").unwrap().is_none());
        assert!(person.address.is_none());

        assert_eq!(accessor.get_as::<i32>(&mut person, "scores[pending]").unwrap(), None);
        assert!(person.scores.is_empty());
    }

    #[test]
    fn sequence_reads_degrade_to_none() {
        let accessor = Accessor::new();
        let mut person = Person::default();
        assert!(accessor.get(&mut person, "tags[9]").unwrap().is_none());
    }

    #[test]
    fn sequence_writes_extend_up_to_the_limit() {
        let accessor = Accessor::new().with_auto_grow_limit(4);
        let mut person = Person::default();

        accessor
            .set_value(&mut person, "tags[2]", "c".to_string())
            .unwrap();
        assert_eq!(person.tags, vec!["".to_string(), "".to_string(), "c".to_string()]);

        let err = accessor
            .set_value(&mut person, "tags[9]", "z".to_string())
            .unwrap_err();
        assert!(matches!(err, PropertyAccessError::InvalidProperty { .. }));
    }

    #[test]
    fn keyed_reads_are_tolerant_and_writes_create() {
        let accessor = Accessor::new();
        let mut person = Person::default();

        assert!(accessor.get(&mut person, "scores[math]").unwrap().is_none());

        accessor.set_value(&mut person, "scores[math]", 92_i32).unwrap();
        assert_eq!(person.scores.get("math"), Some(&92));
        assert_eq!(
            accessor.get_as::<i32>(&mut person, "scores[math]").unwrap(),
            Some(92)
        );
    }

    #[test]
    fn unknown_write_suggests_near_misses() {
        let accessor = Accessor::new();
        let mut person = Person::default();

        let err = accessor.set_value(&mut person, "ag", 1_i32).unwrap_err();
        let PropertyAccessError::NotWritable { suggestions, .. } = &err else {
            panic!("expected NotWritable, got {err:?}");
        };
        assert_eq!(suggestions.names().first().map(String::as_str), Some("age"));
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Visitor {
        name: String,
        age: i32,
        address: Option<Address>,
    }

    propex_model::define_properties! {
        Visitor default {
            name: String => get set,
            age: i32 => get set,
            address: option(Address) => get set,
        }
    }

    #[test]
    fn near_miss_matches_are_exact() {
        let accessor = Accessor::new();
        let mut visitor = Visitor::default();

        let err = accessor.set_value(&mut visitor, "ag", 1_i32).unwrap_err();
        assert_eq!(err.suggestions().unwrap().names(), &["age"]);
        assert!(err.to_string().contains("did you mean `age`?"));
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Order {
        shipping: Option<Address>,
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Customer {
        order: Option<Order>,
    }

    propex_model::define_properties! {
        Order default {
            shipping: option(Address) => get set,
        }
    }

    propex_model::define_properties! {
        Customer default {
            order: option(Order) => get set,
        }
    }

    #[test]
    fn null_errors_carry_the_joined_trail() {
        let accessor = Accessor::new();
        let mut customer = Customer {
            order: Some(Order::default()),
        };

        let err = accessor
            .get(&mut customer, "order.shipping.city")
            .unwrap_err();
        let PropertyAccessError::NullValueInNestedPath { property, type_name, .. } = &err else {
            panic!("expected NullValueInNestedPath, got {err:?}");
        };
        assert_eq!(property, "order.shipping");
        assert_eq!(type_name, "Order");

        let err = accessor
            .set_value(&mut customer, "order.shipping.city", "Basel".to_string())
            .unwrap_err();
        assert_eq!(err.property(), Some("order.shipping"));
    }

    #[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
    struct Badge {
        label: String,
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Collector {
        badges: HashSet<Badge>,
    }

    propex_model::define_properties! {
        Badge default {
            label: String => get set,
        }
    }

    propex_model::define_properties! {
        Collector default {
            badges: HashSet<Badge> => get set,
        }
    }

    #[test]
    fn set_element_writes_resolve_in_place() {
        let accessor = Accessor::new();
        let mut collector = Collector::default();
        collector.badges.insert(Badge { label: "bronze".to_string() });

        accessor
            .set_value(&mut collector, "badges[0].label", "gold".to_string())
            .unwrap();
        assert_eq!(collector.badges.len(), 1);
        assert!(collector.badges.contains(&Badge { label: "gold".to_string() }));

        // The element slot itself stays read-only.
        let err = accessor
            .set_value(&mut collector, "badges[0]", Badge::default())
            .unwrap_err();
        assert!(matches!(err, PropertyAccessError::NotWritable { .. }));

        // A missing position reports the trail, and the set survives.
        let err = accessor
            .set_value(&mut collector, "badges[9].label", "x".to_string())
            .unwrap_err();
        assert_eq!(err.property(), Some("badges[9]"));
        assert_eq!(collector.badges.len(), 1);
    }

    #[test]
    fn type_mismatch_carries_the_conversion_failure() {
        let accessor = Accessor::new();
        let mut person = Person::default();

        let err = accessor
            .set_value(&mut person, "age", "not-a-number".to_string())
            .unwrap_err();
        let PropertyAccessError::TypeMismatch { expected, value, .. } = &err else {
            panic!("expected TypeMismatch, got {err:?}");
        };
        assert_eq!(expected, "i32");
        // Strings render with their quotes.
        assert_eq!(value, "\"not-a-number\"");
    }

    #[test]
    fn read_type_reports_declared_types() {
        let accessor = Accessor::new();
        let person = Person::default();

        assert!(accessor.read_type(&person, "age").unwrap().ident().is::<i32>());
        assert!(
            accessor
                .read_type(&person, "scores[math]")
                .unwrap()
                .ident()
                .is::<i32>()
        );
        assert!(
            accessor
                .read_type(&person, "tags[0]")
                .unwrap()
                .ident()
                .is::<String>()
        );
        assert!(accessor.read_type(&person, "address").unwrap().is_nullable());
    }

    #[test]
    fn readability_and_writability_probes() {
        let accessor = Accessor::new();
        let person = Person::default();

        assert!(accessor.is_readable(&person, "age"));
        assert!(accessor.is_writable(&person, "age"));
        assert!(!accessor.is_readable(&person, "aeg"));
        assert!(!accessor.is_writable(&person, "aeg"));
        assert!(accessor.is_writable(&person, "scores[anything]"));
        assert!(!accessor.is_readable(&person, "age..x"));
    }
}
