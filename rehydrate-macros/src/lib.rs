// These lints are triggered by darling's generated code for
// `#[darling(default)]`.
#![allow(clippy::option_if_let_else)]
#![allow(clippy::needless_continue)]

use darling::{FromDeriveInput, FromField, FromMeta, ast::Data, util::PathList};
use heck::{ToKebabCase, ToUpperCamelCase};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{ToTokens, quote, quote_spanned};
use syn::{DeriveInput, Ident, Path, parse_macro_input, spanned::Spanned};

#[allow(clippy::doc_markdown, reason = "false positive")]
/// Build a PascalCase enum variant name from a type path.
fn path_to_pascal_ident(path: &Path) -> Ident {
    let combined = path
        .segments
        .iter()
        .map(|s| s.ident.to_string())
        .collect::<Vec<_>>()
        .join("_");
    let pascal = combined.to_upper_camel_case();
    let span = path
        .segments
        .last()
        .map_or_else(proc_macro2::Span::call_site, |segment| segment.ident.span());
    Ident::new(&pascal, span)
}

/// Parse `key = Type` meta items into a `syn::Type`.
fn parse_name_value_type(item: &syn::Meta) -> darling::Result<syn::Type> {
    let error = || darling::Error::unsupported_shape("expected `key = Type`");
    let syn::Meta::NameValue(nv) = item else {
        return Err(error());
    };
    syn::parse2(nv.value.to_token_stream()).map_err(|_| error())
}

/// Returns the kind override or the default kebab-case name from the ident.
fn default_kind(ident: &Ident, kind: Option<String>) -> String {
    kind.unwrap_or_else(|| ident.to_string().to_kebab_case())
}

/// Wrapper for `syn::Path` that parses from `key = Type` syntax.
#[derive(Debug, Clone)]
struct TypePath(Path);

impl FromMeta for TypePath {
    fn from_meta(item: &syn::Meta) -> darling::Result<Self> {
        let ty = parse_name_value_type(item)?;
        match ty {
            syn::Type::Path(type_path) if type_path.qself.is_none() => Ok(Self(type_path.path)),
            _ => Err(darling::Error::unsupported_shape("expected `key = Type`")),
        }
    }
}

/// A field of an aggregate struct, with its `#[aggregate(...)]` markers.
#[derive(Debug, FromField)]
#[darling(attributes(aggregate))]
struct AggregateField {
    ident: Option<Ident>,
    ty: syn::Type,
    /// Holds the aggregate identifier; its type becomes `Aggregate::Id`.
    #[darling(default)]
    id: bool,
    /// Holds the `EventRecorder`.
    #[darling(default)]
    recorder: bool,
}

/// Configuration for the `#[aggregate(...)]` attribute.
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(aggregate), supports(struct_named))]
struct AggregateArgs {
    ident: Ident,
    vis: syn::Visibility,
    data: Data<(), AggregateField>,
    error: TypePath,
    events: PathList,
    #[darling(default)]
    kind: Option<String>,
    #[darling(default)]
    event_enum: Option<String>,
    #[darling(default)]
    derives: Option<PathList>,
    /// Event types that act as creation events for this aggregate.
    ///
    /// When specified, `fn create` dispatches to `Create<E>::create` for each
    /// listed event type and rejects all others. When absent, falls back to
    /// `Default::default()` + `apply` (requires `Self: Default`).
    #[darling(default)]
    create: PathList,
}

/// Configuration for the `#[identifier(...)]` attribute.
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(identifier), supports(struct_newtype))]
struct IdentifierArgs {
    ident: Ident,
    vis: syn::Visibility,
    #[darling(default)]
    kind: Option<String>,
}

/// Captures the event type path and its generated enum variant identifier.
struct EventSpec<'a> {
    path: &'a Path,
    variant: Ident,
}

impl<'a> EventSpec<'a> {
    /// Build an event spec from a type path.
    fn new(path: &'a Path) -> Self {
        Self {
            path,
            variant: path_to_pascal_ident(path),
        }
    }
}

/// Parse derive input with darling and render errors as tokens.
fn parse_or_error<T, F>(input: &DeriveInput, f: F) -> TokenStream2
where
    T: FromDeriveInput,
    F: FnOnce(T) -> TokenStream2,
{
    match T::from_derive_input(input) {
        Ok(args) => f(args),
        Err(err) => err.write_errors(),
    }
}

/// Find the single field carrying a marker, or explain what is wrong.
fn marked_field<'a>(
    fields: &'a [AggregateField],
    input: &DeriveInput,
    marker: &str,
    is_marked: impl Fn(&AggregateField) -> bool,
) -> Result<&'a AggregateField, TokenStream2> {
    let mut marked = fields.iter().filter(|field| is_marked(field));
    match (marked.next(), marked.next()) {
        (Some(field), None) => Ok(field),
        (None, _) => Err(darling::Error::custom(format!(
            "one field must be marked `#[aggregate({marker})]`"
        ))
        .with_span(&input.ident)
        .write_errors()),
        (Some(_), Some(second)) => {
            let error = darling::Error::custom(format!(
                "only one field may be marked `#[aggregate({marker})]`"
            ));
            Err(match &second.ident {
                Some(ident) => error.with_span(ident),
                None => error.with_span(&input.ident),
            }
            .write_errors())
        }
    }
}

/// Derives the `Aggregate` trait for a struct.
///
/// This macro generates:
/// - A closed event enum containing all aggregate event types
/// - `EventKind` trait implementation for runtime kind dispatch
/// - `AggregateEvent` trait implementation for event decoding
/// - `Serialize` for the enum, delegating to the wrapped event
/// - `From<E>` implementations for each event type
/// - `Aggregate` trait implementation whose `apply` dispatches to `Apply<E>`
///   with an exhaustive match, so a missing handler fails to compile
///
/// # Attributes
///
/// ## Required
/// - `error = Type` - Error type returned by behavior methods
/// - `events(Type1, Type2, ...)` - Event types
/// - `#[aggregate(id)]` on the identifier field
/// - `#[aggregate(recorder)]` on the `EventRecorder<{Struct}Event>` field
///
/// ## Optional
/// - `create(Type1, ...)` - Events that start the aggregate's life, each
///   handled by a `Create<E>` impl (default: `Default` + `apply`)
/// - `kind = "name"` - Aggregate type identifier (default: kebab-case struct
///   name)
/// - `event_enum = "Name"` - Override generated event enum name (default:
///   `{Struct}Event`)
/// - `derives(Trait1, Trait2, ...)` - Additional derives for the generated
///   event enum. Always includes `Clone`. Common additions: `Debug`,
///   `PartialEq`, `Eq`
///
/// # Example
///
/// ```ignore
/// #[derive(Aggregate)]
/// #[aggregate(
///     error = BasketError,
///     events(BasketPickedUp, ProductAdded),
///     create(BasketPickedUp),
///     derives(Debug, PartialEq)
/// )]
/// pub struct Basket {
///     #[aggregate(id)]
///     id: BasketId,
///     #[aggregate(recorder)]
///     recorder: EventRecorder<BasketEvent>,
///     products: Vec<String>,
/// }
/// ```
#[proc_macro_derive(Aggregate, attributes(aggregate))]
pub fn derive_aggregate(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    derive_aggregate_impl(&input).into()
}

/// Internal entry point that returns tokens for the aggregate derive.
fn derive_aggregate_impl(input: &DeriveInput) -> TokenStream2 {
    parse_or_error::<AggregateArgs, _>(input, |args| generate_aggregate_impl(args, input))
}

/// Generate the aggregate derive implementation tokens.
#[allow(clippy::too_many_lines)]
fn generate_aggregate_impl(args: AggregateArgs, input: &DeriveInput) -> TokenStream2 {
    let event_specs: Vec<EventSpec<'_>> = args.events.iter().map(EventSpec::new).collect();

    if event_specs.is_empty() {
        return darling::Error::custom("events(...) must contain at least one event type")
            .with_span(&input.ident)
            .write_errors();
    }

    let fields = match &args.data {
        Data::Struct(fields) => &fields.fields,
        Data::Enum(_) => unreachable!("darling only accepts named structs"),
    };
    let id_field = match marked_field(fields, input, "id", |field| field.id) {
        Ok(field) => field,
        Err(errors) => return errors,
    };
    let recorder_field = match marked_field(fields, input, "recorder", |field| field.recorder) {
        Ok(field) => field,
        Err(errors) => return errors,
    };
    let id_ident = &id_field.ident;
    let id_type = &id_field.ty;
    let recorder_ident = &recorder_field.ident;

    let event_keys: Vec<String> = event_specs
        .iter()
        .map(|spec| spec.path.to_token_stream().to_string())
        .collect();
    if let Some(unknown) = args
        .create
        .iter()
        .find(|path| !event_keys.contains(&path.to_token_stream().to_string()))
    {
        return darling::Error::custom("creation events must also be listed in events(...)")
            .with_span(unknown)
            .write_errors();
    }

    let struct_name = &args.ident;
    let struct_vis = &args.vis;
    let error_type = &args.error.0;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let kind = default_kind(struct_name, args.kind);

    let event_enum_name = args.event_enum.map_or_else(
        || Ident::new(&format!("{struct_name}Event"), struct_name.span()),
        |name| Ident::new(&name, struct_name.span()),
    );

    let event_types: Vec<&Path> = event_specs.iter().map(|spec| spec.path).collect();
    let variant_names: Vec<&Ident> = event_specs.iter().map(|spec| &spec.variant).collect();

    // Build derives list - always include Clone, add user-specified traits
    let user_derives = args.derives.unwrap_or_default();
    let derives = quote! { #[derive(Clone, #(#user_derives),*)] };

    // Generate fn create: dispatch to Create<E> impls for each listed
    // creation event type, or fall back to Default + apply when none are
    // specified.
    let create_specs: Vec<EventSpec<'_>> = args.create.iter().map(EventSpec::new).collect();
    let create_fn = if create_specs.is_empty() {
        quote! {
            fn create(
                event: &Self::Event,
            ) -> ::core::result::Result<Self, ::rehydrate::aggregate::UnhandledEventError> {
                let mut this = <Self as ::core::default::Default>::default();
                <Self as ::rehydrate::Aggregate>::apply(&mut this, event);
                ::core::result::Result::Ok(this)
            }
        }
    } else {
        let create_variant_names = create_specs.iter().map(|s| &s.variant);
        // Spanned to the listed path so a missing `Create<E>` impl is
        // reported there.
        let create_calls = create_specs.iter().map(|spec| {
            let path = spec.path;
            quote_spanned! {path.span()=> <Self as ::rehydrate::Create<#path>>::create(e) }
        });
        quote! {
            fn create(
                event: &Self::Event,
            ) -> ::core::result::Result<Self, ::rehydrate::aggregate::UnhandledEventError> {
                #[allow(unreachable_patterns)]
                match event {
                    #(#event_enum_name::#create_variant_names(e) => ::core::result::Result::Ok(
                        #create_calls
                    ),)*
                    _ => ::core::result::Result::Err(
                        ::rehydrate::aggregate::UnhandledEventError::NotACreationEvent {
                            aggregate_kind: #kind,
                            event_kind: ::rehydrate::event::EventKind::kind(event),
                        },
                    ),
                }
            }
        }
    };

    // Spanned to the listed path so a missing `Apply<E>` impl is reported
    // there.
    let apply_calls = event_specs.iter().map(|spec| {
        let path = spec.path;
        quote_spanned! {path.span()=> <Self as ::rehydrate::Apply<#path>>::apply(self, e) }
    });

    quote! {
        #[doc = concat!("Event type for the [`", stringify!(#struct_name), "`] aggregate.")]
        #derives
        #struct_vis enum #event_enum_name {
            #(
                #[doc = concat!("[`", stringify!(#event_types), "`]")]
                #variant_names(#event_types)
            ),*
        }

        impl ::rehydrate::event::EventKind for #event_enum_name {
            fn kind(&self) -> &'static str {
                match self {
                    #(Self::#variant_names(_) => <#event_types as ::rehydrate::DomainEvent>::KIND),*
                }
            }
        }

        impl ::serde::Serialize for #event_enum_name {
            fn serialize<S>(&self, serializer: S) -> ::core::result::Result<S::Ok, S::Error>
            where
                S: ::serde::Serializer,
            {
                match self {
                    #(Self::#variant_names(inner) => ::serde::Serialize::serialize(inner, serializer)),*
                }
            }
        }

        impl ::rehydrate::event::AggregateEvent for #event_enum_name {
            const EVENT_KINDS: &'static [&'static str] =
                &[#(<#event_types as ::rehydrate::DomainEvent>::KIND),*];

            fn decode(
                kind: &str,
                payload: ::rehydrate::serde_json::Value,
            ) -> ::core::result::Result<Self, ::rehydrate::event::EventDecodeError> {
                #(
                    if kind == <#event_types as ::rehydrate::DomainEvent>::KIND {
                        return ::rehydrate::event::decode_payload::<#event_types>(payload)
                            .map(Self::#variant_names);
                    }
                )*
                ::core::result::Result::Err(::rehydrate::event::EventDecodeError::UnknownKind {
                    kind: ::std::string::ToString::to_string(kind),
                    expected: Self::EVENT_KINDS,
                })
            }
        }

        #(
            impl ::core::convert::From<#event_types> for #event_enum_name {
                fn from(event: #event_types) -> Self {
                    Self::#variant_names(event)
                }
            }
        )*

        impl #impl_generics ::rehydrate::Aggregate for #struct_name #ty_generics #where_clause {
            const KIND: &'static str = #kind;
            type Id = #id_type;
            type Event = #event_enum_name;
            type Error = #error_type;

            fn aggregate_id(&self) -> &Self::Id {
                &self.#id_ident
            }

            fn recorder(&self) -> &::rehydrate::EventRecorder<Self::Event> {
                &self.#recorder_ident
            }

            fn recorder_mut(&mut self) -> &mut ::rehydrate::EventRecorder<Self::Event> {
                &mut self.#recorder_ident
            }

            #create_fn

            fn apply(&mut self, event: &Self::Event) {
                match event {
                    #(#event_enum_name::#variant_names(e) => {
                        #apply_calls;
                    }),*
                }
            }
        }
    }
}

/// Derives the `Identifier` trait for a `String` newtype.
///
/// Also generates `Display`, `AsRef<str>`, `FromStr`, `TryFrom<String>`,
/// `TryFrom<&str>`, `From<Self> for String` and an inherent `generate()`
/// returning a fresh time-ordered identifier. Parsing rejects empty strings.
///
/// The type must also implement `Clone`, `Debug`, `PartialEq`, `Eq` and
/// `Hash`.
///
/// # Attributes
///
/// ## Optional
/// - `kind = "name"` - Identifier type key used by the aggregate factory
///   mapping (default: kebab-case struct name)
///
/// # Example
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq, Hash, Identifier)]
/// pub struct BasketId(String);
///
/// let id = BasketId::generate();
/// let parsed: BasketId = "b-1".parse()?;
/// ```
#[proc_macro_derive(Identifier, attributes(identifier))]
pub fn derive_identifier(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    derive_identifier_impl(&input).into()
}

/// Internal entry point that returns tokens for the identifier derive.
fn derive_identifier_impl(input: &DeriveInput) -> TokenStream2 {
    parse_or_error::<IdentifierArgs, _>(input, generate_identifier_impl)
}

/// Generate the identifier derive implementation tokens.
fn generate_identifier_impl(args: IdentifierArgs) -> TokenStream2 {
    let name = &args.ident;
    let vis = &args.vis;
    let kind = default_kind(name, args.kind);

    quote! {
        impl ::rehydrate::Identifier for #name {
            const TYPE: &'static str = #kind;

            fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl #name {
            /// Fresh identifier for a new aggregate instance.
            #[must_use]
            #vis fn generate() -> Self {
                Self(::rehydrate::id::generate_string())
            }
        }

        impl ::core::fmt::Display for #name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl ::core::convert::AsRef<str> for #name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl ::core::convert::TryFrom<::std::string::String> for #name {
            type Error = ::rehydrate::id::IdentifierError;

            fn try_from(raw: ::std::string::String) -> ::core::result::Result<Self, Self::Error> {
                ::rehydrate::id::validate(#kind, raw).map(Self)
            }
        }

        impl ::core::convert::TryFrom<&str> for #name {
            type Error = ::rehydrate::id::IdentifierError;

            fn try_from(raw: &str) -> ::core::result::Result<Self, Self::Error> {
                ::rehydrate::id::validate(#kind, ::std::string::ToString::to_string(raw)).map(Self)
            }
        }

        impl ::core::str::FromStr for #name {
            type Err = ::rehydrate::id::IdentifierError;

            fn from_str(raw: &str) -> ::core::result::Result<Self, Self::Err> {
                <Self as ::core::convert::TryFrom<&str>>::try_from(raw)
            }
        }

        impl ::core::convert::From<#name> for ::std::string::String {
            fn from(id: #name) -> Self {
                id.0
            }
        }
    }
}
