//! Declaration macros: [`define_properties!`](crate::define_properties)
//! and [`scalar_variants!`](crate::scalar_variants).

/// Declares the property surface of a bean type.
///
/// Implements [`Accessible`](crate::Accessible),
/// [`Typed`](crate::Typed) and [`PropertySource`](crate::PropertySource)
/// for the named type and, with the `auto_register` feature on,
/// submits it to the global registry at startup. The type must be
/// `Clone + Send + Sync + 'static`.
///
/// Each field line names a struct field, its declared type and its
/// accessor surface (`get set`, `get` or `set`), with a required
/// trailing comma. `option(T)` declares an `Option<T>` field as a
/// nullable property; `option_boxed(T)` does the same for
/// `Option<Box<T>>`.
///
/// The head takes two optional qualifiers. `default` attaches a
/// [`Default`]-based constructor to the type spec, which is what lets
/// auto-grow materialize missing intermediate values. `extends` names
/// an embedded field whose own declared properties are inherited
/// through projection; because the embedding names a concrete
/// parameterization, inherited property types come out concrete.
///
/// # Examples
///
/// ```
/// use propex_model::{DescriptorRegistry, ResolutionMode, TypeIdent};
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
/// let set = DescriptorRegistry::global()
///     .descriptor_set(TypeIdent::of::<Person>(), ResolutionMode::Strict)
///     .unwrap();
/// assert_eq!(set.names(), &["age", "name"]);
/// ```
#[macro_export]
macro_rules! define_properties {
    // ---- internal: Typed spec, with or without the default constructor
    (@spec $owner:ty,) => {
        $crate::TypeSpec::bean::<$owner>()
    };
    (@spec $owner:ty, default) => {
        $crate::TypeSpec::bean::<$owner>().with_construct(|| {
            ::std::boxed::Box::new(<$owner as ::std::default::Default>::default())
        })
    };

    // ---- internal: base fragment from an `extends` clause
    (@bases $owner:ty, $frags:ident,) => {};
    (@bases $owner:ty, $frags:ident, $field:ident : $base:ty) => {{
        fn project(
            obj: &dyn $crate::Accessible,
        ) -> ::std::option::Option<&dyn $crate::Accessible> {
            obj.downcast_ref::<$owner>()
                .map(|owner| &owner.$field as &dyn $crate::Accessible)
        }
        fn project_mut(
            obj: &mut dyn $crate::Accessible,
        ) -> ::std::option::Option<&mut dyn $crate::Accessible> {
            obj.downcast_mut::<$owner>()
                .map(|owner| &mut owner.$field as &mut dyn $crate::Accessible)
        }
        $frags.push($crate::DescriptorFragment::Base {
            ty: $crate::TypeIdent::of::<$base>(),
            project: ::std::sync::Arc::new(project),
            project_mut: ::std::sync::Arc::new(project_mut),
        });
    }};

    // ---- internal: read accessors per field kind
    (@read $owner:ty, $fname:ident, $fty:ty) => {{
        fn get(obj: &dyn $crate::Accessible) -> ::std::option::Option<&dyn $crate::Accessible> {
            obj.downcast_ref::<$owner>()
                .map(|owner| &owner.$fname as &dyn $crate::Accessible)
        }
        fn get_mut(
            obj: &mut dyn $crate::Accessible,
        ) -> ::std::option::Option<&mut dyn $crate::Accessible> {
            obj.downcast_mut::<$owner>()
                .map(|owner| &mut owner.$fname as &mut dyn $crate::Accessible)
        }
        $crate::ReadAccessor {
            ty: <$fty as $crate::Typed>::type_spec(),
            get: ::std::sync::Arc::new(get),
            get_mut: ::std::sync::Arc::new(get_mut),
        }
    }};
    (@read_opt $owner:ty, $fname:ident, $fty:ty) => {{
        fn get(obj: &dyn $crate::Accessible) -> ::std::option::Option<&dyn $crate::Accessible> {
            obj.downcast_ref::<$owner>()
                .and_then(|owner| owner.$fname.as_ref())
                .map(|value| value as &dyn $crate::Accessible)
        }
        fn get_mut(
            obj: &mut dyn $crate::Accessible,
        ) -> ::std::option::Option<&mut dyn $crate::Accessible> {
            obj.downcast_mut::<$owner>()
                .and_then(|owner| owner.$fname.as_mut())
                .map(|value| value as &mut dyn $crate::Accessible)
        }
        $crate::ReadAccessor {
            ty: <$fty as $crate::Typed>::type_spec().into_nullable(),
            get: ::std::sync::Arc::new(get),
            get_mut: ::std::sync::Arc::new(get_mut),
        }
    }};
    (@read_opt_boxed $owner:ty, $fname:ident, $fty:ty) => {{
        fn get(obj: &dyn $crate::Accessible) -> ::std::option::Option<&dyn $crate::Accessible> {
            obj.downcast_ref::<$owner>()
                .and_then(|owner| owner.$fname.as_deref())
                .map(|value| value as &dyn $crate::Accessible)
        }
        fn get_mut(
            obj: &mut dyn $crate::Accessible,
        ) -> ::std::option::Option<&mut dyn $crate::Accessible> {
            obj.downcast_mut::<$owner>()
                .and_then(|owner| owner.$fname.as_deref_mut())
                .map(|value| value as &mut dyn $crate::Accessible)
        }
        $crate::ReadAccessor {
            ty: <$fty as $crate::Typed>::type_spec().into_nullable(),
            get: ::std::sync::Arc::new(get),
            get_mut: ::std::sync::Arc::new(get_mut),
        }
    }};

    // ---- internal: write accessors per field kind
    (@write $owner:ty, $fname:ident, $fty:ty) => {{
        fn set(
            obj: &mut dyn $crate::Accessible,
            value: ::std::boxed::Box<dyn $crate::Accessible>,
        ) -> ::std::result::Result<(), ::std::boxed::Box<dyn $crate::Accessible>> {
            let ::std::option::Option::Some(owner) = obj.downcast_mut::<$owner>() else {
                return ::std::result::Result::Err(value);
            };
            owner.$fname = value.take::<$fty>()?;
            ::std::result::Result::Ok(())
        }
        $crate::WriteAccessor {
            ty: <$fty as $crate::Typed>::type_spec(),
            set: ::std::sync::Arc::new(set),
        }
    }};
    (@write_opt $owner:ty, $fname:ident, $fty:ty) => {{
        fn set(
            obj: &mut dyn $crate::Accessible,
            value: ::std::boxed::Box<dyn $crate::Accessible>,
        ) -> ::std::result::Result<(), ::std::boxed::Box<dyn $crate::Accessible>> {
            let ::std::option::Option::Some(owner) = obj.downcast_mut::<$owner>() else {
                return ::std::result::Result::Err(value);
            };
            owner.$fname = ::std::option::Option::Some(value.take::<$fty>()?);
            ::std::result::Result::Ok(())
        }
        $crate::WriteAccessor {
            ty: <$fty as $crate::Typed>::type_spec(),
            set: ::std::sync::Arc::new(set),
        }
    }};
    (@write_opt_boxed $owner:ty, $fname:ident, $fty:ty) => {{
        fn set(
            obj: &mut dyn $crate::Accessible,
            value: ::std::boxed::Box<dyn $crate::Accessible>,
        ) -> ::std::result::Result<(), ::std::boxed::Box<dyn $crate::Accessible>> {
            let ::std::option::Option::Some(owner) = obj.downcast_mut::<$owner>() else {
                return ::std::result::Result::Err(value);
            };
            owner.$fname =
                ::std::option::Option::Some(::std::boxed::Box::new(value.take::<$fty>()?));
            ::std::result::Result::Ok(())
        }
        $crate::WriteAccessor {
            ty: <$fty as $crate::Typed>::type_spec(),
            set: ::std::sync::Arc::new(set),
        }
    }};

    // ---- internal: field muncher
    // The `option(..)` / `option_boxed(..)` arms must come before the
    // plain arms; a parenthesized path would otherwise parse as a type.
    (@fields $owner:ty, $props:ident,) => {};
    (@fields $owner:ty, $props:ident,
        $fname:ident : option($fty:ty) => get set, $($rest:tt)*
    ) => {
        $props.push($crate::DeclaredProperty {
            name: ::std::stringify!($fname),
            read: ::std::option::Option::Some(
                $crate::define_properties!(@read_opt $owner, $fname, $fty),
            ),
            write: ::std::option::Option::Some(
                $crate::define_properties!(@write_opt $owner, $fname, $fty),
            ),
        });
        $crate::define_properties!(@fields $owner, $props, $($rest)*);
    };
    (@fields $owner:ty, $props:ident,
        $fname:ident : option($fty:ty) => get, $($rest:tt)*
    ) => {
        $props.push($crate::DeclaredProperty {
            name: ::std::stringify!($fname),
            read: ::std::option::Option::Some(
                $crate::define_properties!(@read_opt $owner, $fname, $fty),
            ),
            write: ::std::option::Option::None,
        });
        $crate::define_properties!(@fields $owner, $props, $($rest)*);
    };
    (@fields $owner:ty, $props:ident,
        $fname:ident : option($fty:ty) => set, $($rest:tt)*
    ) => {
        $props.push($crate::DeclaredProperty {
            name: ::std::stringify!($fname),
            read: ::std::option::Option::None,
            write: ::std::option::Option::Some(
                $crate::define_properties!(@write_opt $owner, $fname, $fty),
            ),
        });
        $crate::define_properties!(@fields $owner, $props, $($rest)*);
    };
    (@fields $owner:ty, $props:ident,
        $fname:ident : option_boxed($fty:ty) => get set, $($rest:tt)*
    ) => {
        $props.push($crate::DeclaredProperty {
            name: ::std::stringify!($fname),
            read: ::std::option::Option::Some(
                $crate::define_properties!(@read_opt_boxed $owner, $fname, $fty),
            ),
            write: ::std::option::Option::Some(
                $crate::define_properties!(@write_opt_boxed $owner, $fname, $fty),
            ),
        });
        $crate::define_properties!(@fields $owner, $props, $($rest)*);
    };
    (@fields $owner:ty, $props:ident,
        $fname:ident : option_boxed($fty:ty) => get, $($rest:tt)*
    ) => {
        $props.push($crate::DeclaredProperty {
            name: ::std::stringify!($fname),
            read: ::std::option::Option::Some(
                $crate::define_properties!(@read_opt_boxed $owner, $fname, $fty),
            ),
            write: ::std::option::Option::None,
        });
        $crate::define_properties!(@fields $owner, $props, $($rest)*);
    };
    (@fields $owner:ty, $props:ident,
        $fname:ident : option_boxed($fty:ty) => set, $($rest:tt)*
    ) => {
        $props.push($crate::DeclaredProperty {
            name: ::std::stringify!($fname),
            read: ::std::option::Option::None,
            write: ::std::option::Option::Some(
                $crate::define_properties!(@write_opt_boxed $owner, $fname, $fty),
            ),
        });
        $crate::define_properties!(@fields $owner, $props, $($rest)*);
    };
    (@fields $owner:ty, $props:ident,
        $fname:ident : $fty:ty => get set, $($rest:tt)*
    ) => {
        $props.push($crate::DeclaredProperty {
            name: ::std::stringify!($fname),
            read: ::std::option::Option::Some(
                $crate::define_properties!(@read $owner, $fname, $fty),
            ),
            write: ::std::option::Option::Some(
                $crate::define_properties!(@write $owner, $fname, $fty),
            ),
        });
        $crate::define_properties!(@fields $owner, $props, $($rest)*);
    };
    (@fields $owner:ty, $props:ident,
        $fname:ident : $fty:ty => get, $($rest:tt)*
    ) => {
        $props.push($crate::DeclaredProperty {
            name: ::std::stringify!($fname),
            read: ::std::option::Option::Some(
                $crate::define_properties!(@read $owner, $fname, $fty),
            ),
            write: ::std::option::Option::None,
        });
        $crate::define_properties!(@fields $owner, $props, $($rest)*);
    };
    (@fields $owner:ty, $props:ident,
        $fname:ident : $fty:ty => set, $($rest:tt)*
    ) => {
        $props.push($crate::DeclaredProperty {
            name: ::std::stringify!($fname),
            read: ::std::option::Option::None,
            write: ::std::option::Option::Some(
                $crate::define_properties!(@write $owner, $fname, $fty),
            ),
        });
        $crate::define_properties!(@fields $owner, $props, $($rest)*);
    };

    // ---- internal: shared expansion
    (@define $owner:ty, [$($construct:ident)?], [$($ext:tt)*], { $($body:tt)* }) => {
        impl $crate::Accessible for $owner {
            #[inline]
            fn type_ident(&self) -> $crate::TypeIdent {
                $crate::TypeIdent::of::<$owner>()
            }

            #[inline]
            fn container_ref(&self) -> $crate::ContainerRef<'_> {
                $crate::ContainerRef::Bean(self)
            }

            #[inline]
            fn container_mut(&mut self) -> $crate::ContainerMut<'_> {
                $crate::ContainerMut::Bean(self)
            }

            $crate::__accessible_plumbing!();

            fn render(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::write!(
                    f,
                    "{} {{ .. }}",
                    $crate::TypeIdent::of::<$owner>().short_name()
                )
            }
        }

        impl $crate::Typed for $owner {
            fn type_spec() -> $crate::TypeSpec {
                $crate::define_properties!(@spec $owner, $($construct)?)
            }
        }

        impl $crate::PropertySource for $owner {
            fn type_properties() -> $crate::TypeProperties {
                let mut properties: ::std::vec::Vec<$crate::DeclaredProperty> =
                    ::std::vec::Vec::new();
                $crate::define_properties!(@fields $owner, properties, $($body)*);
                let mut fragments: ::std::vec::Vec<$crate::DescriptorFragment> =
                    ::std::vec::Vec::new();
                fragments.push($crate::DescriptorFragment::Own { properties });
                $crate::define_properties!(@bases $owner, fragments, $($ext)*);
                $crate::TypeProperties {
                    ty: $crate::TypeIdent::of::<$owner>(),
                    fragments,
                }
            }
        }

        $crate::__submit_provider!($owner);
    };

    // ---- public head forms
    ($name:ident $(< $($arg:ty),+ $(,)? >)? { $($body:tt)* }) => {
        $crate::define_properties!(@define $name $(< $($arg),+ >)?, [], [], { $($body)* });
    };
    ($name:ident $(< $($arg:ty),+ $(,)? >)? default { $($body:tt)* }) => {
        $crate::define_properties!(@define $name $(< $($arg),+ >)?, [default], [], { $($body)* });
    };
    ($name:ident $(< $($arg:ty),+ $(,)? >)? extends($field:ident : $base:ty) { $($body:tt)* }) => {
        $crate::define_properties!(
            @define $name $(< $($arg),+ >)?, [], [$field: $base], { $($body)* }
        );
    };
    ($name:ident $(< $($arg:ty),+ $(,)? >)? default extends($field:ident : $base:ty) {
        $($body:tt)*
    }) => {
        $crate::define_properties!(
            @define $name $(< $($arg),+ >)?, [default], [$field: $base], { $($body)* }
        );
    };
}

/// Implements [`Accessible`](crate::Accessible) and
/// [`Typed`](crate::Typed) for a C-like enum as a scalar with text
/// parsing.
///
/// The parser accepts a bare variant name or the qualified
/// `TypeName.Variant` form, with surrounding whitespace trimmed. The
/// enum must be `Clone + Send + Sync + 'static`.
///
/// # Examples
///
/// ```
/// use propex_model::Typed;
///
/// #[derive(Debug, Clone, Copy, PartialEq)]
/// enum Status {
///     Active,
///     Suspended,
/// }
///
/// propex_model::scalar_variants! {
///     Status { Active, Suspended }
/// }
///
/// let spec = Status::type_spec();
/// let parsed = spec.parse_text("Status.Suspended").unwrap();
/// assert_eq!(parsed.downcast_ref::<Status>(), Some(&Status::Suspended));
/// ```
#[macro_export]
macro_rules! scalar_variants {
    ($name:ident { $($variant:ident),+ $(,)? }) => {
        impl $crate::Accessible for $name {
            #[inline]
            fn type_ident(&self) -> $crate::TypeIdent {
                $crate::TypeIdent::of::<$name>()
            }

            #[inline]
            fn container_ref(&self) -> $crate::ContainerRef<'_> {
                $crate::ContainerRef::Scalar(self)
            }

            #[inline]
            fn container_mut(&mut self) -> $crate::ContainerMut<'_> {
                $crate::ContainerMut::Scalar(self)
            }

            $crate::__accessible_plumbing!();

            fn render(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                let name = match self {
                    $($name::$variant => ::std::stringify!($variant),)+
                };
                f.write_str(name)
            }
        }

        impl $crate::Typed for $name {
            fn type_spec() -> $crate::TypeSpec {
                $crate::TypeSpec::scalar::<$name>().with_parse(|text| {
                    let text = text.trim();
                    let text = text
                        .strip_prefix(::std::concat!(::std::stringify!($name), "."))
                        .unwrap_or(text);
                    match text {
                        $(
                            ::std::stringify!($variant) => ::std::option::Option::Some(
                                ::std::boxed::Box::new($name::$variant)
                                    as ::std::boxed::Box<dyn $crate::Accessible>,
                            ),
                        )+
                        _ => ::std::option::Option::None,
                    }
                })
            }
        }
    };
}

/// Startup-registration hook used by [`define_properties!`]; expands
/// to nothing without the `auto_register` feature.
#[cfg(feature = "auto_register")]
#[doc(hidden)]
#[macro_export]
macro_rules! __submit_provider {
    ($ty:ty) => {
        $crate::inventory::submit! {
            $crate::registry::ProviderRegistration::new::<$ty>()
        }
    };
}

#[cfg(not(feature = "auto_register"))]
#[doc(hidden)]
#[macro_export]
macro_rules! __submit_provider {
    ($ty:ty) => {};
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use crate::descriptor::PropertySource;
    use crate::{Accessible, ResolutionMode, Shape, Typed};

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Profile {
        handle: String,
        bio: Option<String>,
        badge: Option<Box<i32>>,
        views: u64,
    }

    crate::define_properties! {
        Profile default {
            handle: String => get set,
            bio: option(String) => get set,
            badge: option_boxed(i32) => get set,
            views: u64 => get,
        }
    }

    fn resolved() -> crate::DescriptorSet {
        crate::descriptor::resolve(Profile::type_properties(), ResolutionMode::Strict, &|_| None)
    }

    #[test]
    fn bean_shape_and_constructor() {
        let profile = Profile::default();
        assert_eq!(profile.shape(), Shape::Bean);

        let spec = Profile::type_spec();
        assert!(spec.can_construct());
        let fresh = spec.construct_default().unwrap();
        assert_eq!(fresh.downcast_ref::<Profile>(), Some(&Profile::default()));
    }

    #[test]
    fn plain_field_reads_and_writes() {
        let set = resolved();
        let mut profile = Profile::default();

        let handle = set.get("handle").unwrap();
        (handle.write().unwrap().set)(&mut profile, Box::new("ada".to_string())).unwrap();
        let seen = (handle.read().unwrap().get)(&profile).unwrap();
        assert_eq!(seen.downcast_ref::<String>().map(String::as_str), Some("ada"));
    }

    #[test]
    fn option_fields_are_nullable_slots() {
        let set = resolved();
        let mut profile = Profile::default();

        let bio = set.get("bio").unwrap();
        assert!(bio.read_type().unwrap().is_nullable());
        assert!((bio.read().unwrap().get)(&profile).is_none());

        (bio.write().unwrap().set)(&mut profile, Box::new("hi".to_string())).unwrap();
        assert_eq!(profile.bio.as_deref(), Some("hi"));

        let badge = set.get("badge").unwrap();
        (badge.write().unwrap().set)(&mut profile, Box::new(3_i32)).unwrap();
        assert_eq!(profile.badge.as_deref(), Some(&3));
        let seen = (badge.read().unwrap().get)(&profile).unwrap();
        assert_eq!(seen.downcast_ref::<i32>(), Some(&3));
    }

    #[test]
    fn read_only_field_has_no_writer() {
        let set = resolved();
        let views = set.get("views").unwrap();
        assert!(views.read().is_some());
        assert!(views.write().is_none());
    }

    #[test]
    fn mismatched_write_hands_the_value_back() {
        let set = resolved();
        let mut profile = Profile::default();
        let handle = set.get("handle").unwrap();
        let back = (handle.write().unwrap().set)(&mut profile, Box::new(5_i32)).unwrap_err();
        assert!(back.is::<i32>());
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Tier {
        Free,
        Pro,
    }

    crate::scalar_variants! {
        Tier { Free, Pro }
    }

    #[test]
    fn variant_enum_parses_both_spellings() {
        let spec = Tier::type_spec();
        let bare = spec.parse_text(" Pro ").unwrap();
        assert_eq!(bare.downcast_ref::<Tier>(), Some(&Tier::Pro));

        let qualified = spec.parse_text("Tier.Free").unwrap();
        assert_eq!(qualified.downcast_ref::<Tier>(), Some(&Tier::Free));

        assert!(spec.parse_text("Enterprise").is_none());
    }

    #[test]
    fn variant_enum_renders_variant_name() {
        let value: &dyn Accessible = &Tier::Pro;
        assert_eq!(format!("{}", value.rendered()), "Pro");
    }
}
