//! Container impls: `Vec`, `[T; N]`, string-keyed maps, sets.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::hash::Hash;

use crate::ops::{Keyed, Sequence, Unordered};
use crate::spec::{TypeIdent, TypeSpec};
use crate::value::{Accessible, ContainerMut, ContainerRef};
use crate::{Typed, __accessible_plumbing};

fn render_elements<'a>(
    f: &mut fmt::Formatter<'_>,
    elements: impl Iterator<Item = &'a dyn Accessible>,
    open: &str,
    close: &str,
) -> fmt::Result {
    f.write_str(open)?;
    for (i, element) in elements.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        element.render(f)?;
    }
    f.write_str(close)
}

// -----------------------------------------------------------------------------
// Vec

impl<T: Accessible + Typed + Clone> Accessible for Vec<T> {
    #[inline]
    fn type_ident(&self) -> TypeIdent {
        TypeIdent::of::<Vec<T>>()
    }

    #[inline]
    fn container_ref(&self) -> ContainerRef<'_> {
        ContainerRef::Sequence(self)
    }

    #[inline]
    fn container_mut(&mut self) -> ContainerMut<'_> {
        ContainerMut::Sequence(self)
    }

    __accessible_plumbing!();

    fn render(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        render_elements(f, self.iter().map(|v| v as &dyn Accessible), "[", "]")
    }
}

impl<T: Accessible + Typed + Clone> Typed for Vec<T> {
    fn type_spec() -> TypeSpec {
        TypeSpec::sequence::<Vec<T>>(T::type_spec()).with_construct(|| Box::new(Vec::<T>::new()))
    }
}

impl<T: Accessible + Typed + Clone> Sequence for Vec<T> {
    #[inline]
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    #[inline]
    fn get(&self, index: usize) -> Option<&dyn Accessible> {
        self.as_slice().get(index).map(|v| v as &dyn Accessible)
    }

    #[inline]
    fn get_mut(&mut self, index: usize) -> Option<&mut dyn Accessible> {
        self.as_mut_slice()
            .get_mut(index)
            .map(|v| v as &mut dyn Accessible)
    }

    fn set(
        &mut self,
        index: usize,
        value: Box<dyn Accessible>,
    ) -> Result<(), Box<dyn Accessible>> {
        if index >= self.as_slice().len() {
            return Err(value);
        }
        let value = value.take::<T>()?;
        self[index] = value;
        Ok(())
    }

    fn try_push(&mut self, value: Box<dyn Accessible>) -> Result<(), Box<dyn Accessible>> {
        let value = value.take::<T>()?;
        self.push(value);
        Ok(())
    }

    fn push_default(&mut self) -> bool {
        let Some(element) = T::type_spec().construct_default() else {
            return false;
        };
        match element.take::<T>() {
            Ok(element) => {
                self.push(element);
                true
            }
            Err(_) => false,
        }
    }

    #[inline]
    fn elem_spec(&self) -> TypeSpec {
        T::type_spec()
    }
}

// -----------------------------------------------------------------------------
// Fixed-size arrays

impl<T: Accessible + Typed + Clone, const N: usize> Accessible for [T; N] {
    #[inline]
    fn type_ident(&self) -> TypeIdent {
        TypeIdent::of::<[T; N]>()
    }

    #[inline]
    fn container_ref(&self) -> ContainerRef<'_> {
        ContainerRef::Sequence(self)
    }

    #[inline]
    fn container_mut(&mut self) -> ContainerMut<'_> {
        ContainerMut::Sequence(self)
    }

    __accessible_plumbing!();

    fn render(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        render_elements(f, self.iter().map(|v| v as &dyn Accessible), "[", "]")
    }
}

impl<T: Accessible + Typed + Clone, const N: usize> Typed for [T; N] {
    fn type_spec() -> TypeSpec {
        // Fixed size: no constructor, auto-grow cannot extend arrays.
        TypeSpec::sequence::<[T; N]>(T::type_spec())
    }
}

impl<T: Accessible + Typed + Clone, const N: usize> Sequence for [T; N] {
    #[inline]
    fn len(&self) -> usize {
        N
    }

    #[inline]
    fn get(&self, index: usize) -> Option<&dyn Accessible> {
        self.as_slice().get(index).map(|v| v as &dyn Accessible)
    }

    #[inline]
    fn get_mut(&mut self, index: usize) -> Option<&mut dyn Accessible> {
        self.as_mut_slice()
            .get_mut(index)
            .map(|v| v as &mut dyn Accessible)
    }

    fn set(
        &mut self,
        index: usize,
        value: Box<dyn Accessible>,
    ) -> Result<(), Box<dyn Accessible>> {
        if index >= N {
            return Err(value);
        }
        let value = value.take::<T>()?;
        self[index] = value;
        Ok(())
    }

    #[inline]
    fn try_push(&mut self, value: Box<dyn Accessible>) -> Result<(), Box<dyn Accessible>> {
        Err(value)
    }

    #[inline]
    fn push_default(&mut self) -> bool {
        false
    }

    #[inline]
    fn elem_spec(&self) -> TypeSpec {
        T::type_spec()
    }
}

// -----------------------------------------------------------------------------
// String-keyed maps

macro_rules! impl_keyed_map {
    ($map:ident) => {
        impl<V: Accessible + Typed + Clone> Accessible for $map<String, V> {
            #[inline]
            fn type_ident(&self) -> TypeIdent {
                TypeIdent::of::<$map<String, V>>()
            }

            #[inline]
            fn container_ref(&self) -> ContainerRef<'_> {
                ContainerRef::Keyed(self)
            }

            #[inline]
            fn container_mut(&mut self) -> ContainerMut<'_> {
                ContainerMut::Keyed(self)
            }

            __accessible_plumbing!();

            fn render(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("{")?;
                for (i, (key, value)) in self.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key:?}: ")?;
                    value.render(f)?;
                }
                f.write_str("}")
            }
        }

        impl<V: Accessible + Typed + Clone> Typed for $map<String, V> {
            fn type_spec() -> TypeSpec {
                TypeSpec::keyed::<$map<String, V>>(TypeIdent::of::<String>(), V::type_spec())
                    .with_construct(|| Box::new($map::<String, V>::new()))
            }
        }

        impl<V: Accessible + Typed + Clone> Keyed for $map<String, V> {
            #[inline]
            fn len(&self) -> usize {
                $map::len(self)
            }

            #[inline]
            fn get(&self, key: &str) -> Option<&dyn Accessible> {
                $map::get(self, key).map(|v| v as &dyn Accessible)
            }

            #[inline]
            fn get_mut(&mut self, key: &str) -> Option<&mut dyn Accessible> {
                $map::get_mut(self, key).map(|v| v as &mut dyn Accessible)
            }

            fn insert(
                &mut self,
                key: &str,
                value: Box<dyn Accessible>,
            ) -> Result<Option<Box<dyn Accessible>>, Box<dyn Accessible>> {
                let value = value.take::<V>()?;
                let previous = $map::insert(self, key.to_string(), value);
                Ok(previous.map(|v| Box::new(v) as Box<dyn Accessible>))
            }

            fn keys(&self) -> Vec<String> {
                $map::keys(self).cloned().collect()
            }

            #[inline]
            fn key_ident(&self) -> TypeIdent {
                TypeIdent::of::<String>()
            }

            #[inline]
            fn value_spec(&self) -> TypeSpec {
                V::type_spec()
            }
        }
    };
}

impl_keyed_map!(HashMap);
impl_keyed_map!(BTreeMap);

// -----------------------------------------------------------------------------
// Sets

macro_rules! impl_unordered_set {
    ($set:ident, $($extra:ident),+) => {
        impl<T: Accessible + Typed + Clone + $($extra+)+> Accessible for $set<T> {
            #[inline]
            fn type_ident(&self) -> TypeIdent {
                TypeIdent::of::<$set<T>>()
            }

            #[inline]
            fn container_ref(&self) -> ContainerRef<'_> {
                ContainerRef::Unordered(self)
            }

            #[inline]
            fn container_mut(&mut self) -> ContainerMut<'_> {
                ContainerMut::Unordered(self)
            }

            __accessible_plumbing!();

            fn render(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                render_elements(f, self.iter().map(|v| v as &dyn Accessible), "{", "}")
            }
        }

        impl<T: Accessible + Typed + Clone + $($extra+)+> Typed for $set<T> {
            fn type_spec() -> TypeSpec {
                TypeSpec::unordered::<$set<T>>(T::type_spec())
                    .with_construct(|| Box::new($set::<T>::new()))
            }
        }

        impl<T: Accessible + Typed + Clone + $($extra+)+> Unordered for $set<T> {
            #[inline]
            fn len(&self) -> usize {
                $set::len(self)
            }

            fn get_at(&self, index: usize) -> Option<&dyn Accessible> {
                self.iter().nth(index).map(|v| v as &dyn Accessible)
            }

            fn take_at(&mut self, index: usize) -> Option<Box<dyn Accessible>> {
                let element = self.iter().nth(index)?.clone();
                self.take(&element).map(|v| Box::new(v) as Box<dyn Accessible>)
            }

            fn try_insert(
                &mut self,
                value: Box<dyn Accessible>,
            ) -> Result<bool, Box<dyn Accessible>> {
                let value = value.take::<T>()?;
                Ok(self.insert(value))
            }

            #[inline]
            fn elem_spec(&self) -> TypeSpec {
                T::type_spec()
            }
        }
    };
}

impl_unordered_set!(HashSet, Eq, Hash);
impl_unordered_set!(BTreeSet, Ord);

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Shape;

    #[test]
    fn vec_sequence_ops() {
        let mut values = vec![1_i32, 2, 3];
        let seq: &mut dyn Sequence = &mut values;

        assert_eq!(seq.len(), 3);
        assert!(seq.set(1, Box::new(20_i32)).is_ok());
        assert!(seq.set(9, Box::new(0_i32)).is_err());
        // Wrong element type is handed back.
        assert!(seq.set(0, Box::new("oops".to_string())).is_err());
        assert!(seq.push_default());

        assert_eq!(values, vec![1, 20, 3, 0]);
    }

    #[test]
    fn array_cannot_grow() {
        let mut values = [1_i32, 2];
        let seq: &mut dyn Sequence = &mut values;

        assert!(!seq.push_default());
        assert!(seq.try_push(Box::new(3_i32)).is_err());
        assert!(seq.set(0, Box::new(9_i32)).is_ok());
        assert_eq!(values, [9, 2]);
    }

    #[test]
    fn map_keyed_ops() {
        let mut map: HashMap<String, i32> = HashMap::new();
        let keyed: &mut dyn Keyed = &mut map;

        assert!(keyed.get("missing").is_none());
        assert!(keyed.insert("one", Box::new(1_i32)).unwrap().is_none());
        let previous = keyed.insert("one", Box::new(11_i32)).unwrap().unwrap();
        assert_eq!(previous.downcast_ref::<i32>(), Some(&1));
        assert_eq!(map["one"], 11);
    }

    #[test]
    fn set_reads_by_position() {
        let set: BTreeSet<i32> = [3, 1, 2].into_iter().collect();
        let unordered: &dyn Unordered = &set;

        assert_eq!(unordered.get_at(0).unwrap().downcast_ref::<i32>(), Some(&1));
        assert_eq!(unordered.get_at(2).unwrap().downcast_ref::<i32>(), Some(&3));
        assert!(unordered.get_at(3).is_none());
    }

    #[test]
    fn nested_spec_recurses() {
        let spec = <Vec<HashMap<String, i32>> as Typed>::type_spec();
        assert_eq!(spec.shape(), Shape::Sequence);
        let value = spec.elem().unwrap();
        assert_eq!(value.shape(), Shape::Keyed);
        assert!(value.elem().unwrap().ident().is::<i32>());
    }
}
