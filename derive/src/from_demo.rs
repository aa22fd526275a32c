use std::collections::BTreeMap;

use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{
    Attribute, Data, DeriveInput, Error, ExprClosure, Field, Fields, Ident, LitInt, Pat, Result,
    Token, Type,
    parse::{Parse, ParseStream},
    spanned::Spanned,
};

pub(crate) fn expand_from_demo(input: &DeriveInput) -> Result<TokenStream> {
    let Data::Struct(data) = &input.data else {
        Err(Error::new(
            input.span(),
            "`FromDemo` may only be derived on structs.",
        ))?
    };

    let Fields::Named(fields) = &data.fields else {
        Err(Error::new(
            input.span(),
            "`FromDemo` may only be derived on structs with named fields.",
        ))?
    };

    let fields = fields
        .named
        .iter()
        .map(FieldMetadata::parse)
        .map(Result::transpose)
        .flatten() // Skip fields without an attribute.
        .collect::<Result<Vec<_>>>()?;

    let mut header: Option<(Ident, Container)> = None;
    let mut frame: Option<(Ident, Container)> = None;
    let mut messages: BTreeMap<u32, (Ident, Handler)> = BTreeMap::new();

    for field in fields {
        match field.role {
            Role::Header(container) => {
                if header.replace((field.name, container)).is_some() {
                    Err(Error::new(field.span, "Only one field may be marked `header`."))?
                }
            }
            Role::Frame(container) => {
                if frame.replace((field.name, container)).is_some() {
                    Err(Error::new(field.span, "Only one field may be marked `frame`."))?
                }
            }
            Role::Message { tag, handler } => {
                let value = tag.base10_parse::<u32>()?;

                if messages.insert(value, (field.name, handler)).is_some() {
                    Err(Error::new(tag.span(), "Message tags must be unique."))?
                }
            }
        }
    }

    let header_method = header.map(|(name, container)| {
        let assignment = container.store(&name, quote! { ::core::clone::Clone::clone(header) });

        quote! {
            fn add_header(&mut self, header: &::vdem::avec::schema::FileHeader) {
                #assignment;
            }
        }
    });

    let frame_method = frame.map(|(name, container)| {
        let assignment = container.store(&name, quote! { *frame });

        quote! {
            fn add_frame(&mut self, frame: &::vdem::sans::frame::FrameInfo) {
                #assignment;
            }
        }
    });

    let message_method = (!messages.is_empty()).then(|| {
        let cases = messages.into_iter().map(|(tag, (name, handler))| {
            let assignment = match handler {
                Handler::Store(container) => {
                    container.store(&name, quote! { message.payload.to_vec() })
                }
                Handler::Closure(field_type, handler) => {
                    let body = handler.body;
                    let mut inputs = handler.inputs.iter();
                    let acc = inputs.next();
                    let val = inputs.next();

                    quote! {
                        (|#acc: &mut #field_type, #val| { #body })(&mut self.#name, &*message.payload)
                    }
                }
            };

            quote! { #tag => { #assignment; } }
        });

        quote! {
            fn add_message(&mut self, message: &::vdem::sans::message::SubMessage<'_>) {
                match message.tag {
                    #(#cases)*
                    _ => {}
                }
            }
        }
    });

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {
        impl #impl_generics ::vdem::avec::FromDemo for #name #ty_generics #where_clause {
            #header_method
            #frame_method
            #message_method
        }
    };

    Ok(expanded.into())
}

#[derive(Debug)]
struct FieldMetadata {
    name: Ident,
    role: Role,
    span: Span,
}

#[derive(Debug)]
enum Role {
    Header(Container),
    Frame(Container),
    Message { tag: LitInt, handler: Handler },
}

#[derive(Debug)]
enum Handler {
    Store(Container),
    Closure(Type, ExprClosure),
}

/// How a field without a handler stores received values.
#[derive(Debug, Clone, Copy)]
enum Container {
    /// Keep the latest value.
    Option,
    /// Keep every value.
    Vec,
}

impl Container {
    fn of(field: &Field) -> Result<Self> {
        let Type::Path(path) = &field.ty else {
            Err(Error::new_spanned(
                &field.ty,
                "Field must have an `Option<T>` or `Vec<T>` type.",
            ))?
        };

        let Some(segment) = path.path.segments.last() else {
            Err(Error::new_spanned(
                &path.path.segments,
                "Field must have an `Option<T>` or `Vec<T>` type.",
            ))?
        };

        if segment.ident == "Option" {
            Ok(Self::Option)
        } else if segment.ident == "Vec" {
            Ok(Self::Vec)
        } else {
            Err(Error::new_spanned(
                &segment.ident,
                "Field must have an `Option<T>` or `Vec<T>` type.",
            ))
        }
    }

    fn store(self, name: &Ident, value: proc_macro2::TokenStream) -> proc_macro2::TokenStream {
        match self {
            Self::Option => quote! { self.#name = ::core::option::Option::Some(#value) },
            Self::Vec => quote! { self.#name.push(#value) },
        }
    }
}

impl FieldMetadata {
    fn parse(field: &Field) -> Result<Option<Self>> {
        let Some(name) = field.ident.clone() else {
            Err(Error::new_spanned(field, "Field must be named."))?
        };

        let mut attrs = field.attrs.iter().filter(|a| is_role(a));

        let Some(attr) = attrs.next() else {
            return Ok(None);
        };

        if let Some(extra) = attrs.next() {
            Err(Error::new_spanned(
                extra,
                "Field may only have one of `header`, `frame` or `message`.",
            ))?
        }

        let span = attr.span();

        let role = if attr.path().is_ident("header") {
            attr.meta.require_path_only()?;
            Role::Header(Container::of(field)?)
        } else if attr.path().is_ident("frame") {
            attr.meta.require_path_only()?;
            Role::Frame(Container::of(field)?)
        } else {
            let MessageAttribute { tag, handler } = attr.meta.require_list()?.parse_args()?;

            let handler = match handler {
                Some(handler) => {
                    let Some(parameter) = handler.inputs.iter().nth(1) else {
                        Err(Error::new_spanned(
                            &handler,
                            "Handler closure must have two parameters.",
                        ))?
                    };

                    let Pat::Type(_) = parameter else {
                        Err(Error::new_spanned(
                            parameter,
                            "Handler closure's second parameter must be annotated as `&[u8]`.",
                        ))?
                    };

                    if handler.inputs.len() != 2 {
                        Err(Error::new_spanned(
                            &handler.inputs,
                            "Handler closure must have two parameters.",
                        ))?
                    }

                    Handler::Closure(field.ty.clone(), handler)
                }
                None => Handler::Store(Container::of(field)?),
            };

            Role::Message { tag, handler }
        };

        Ok(Some(Self { name, role, span }))
    }
}

fn is_role(attr: &Attribute) -> bool {
    ["header", "frame", "message"]
        .iter()
        .any(|name| attr.path().is_ident(name))
}

#[derive(Debug)]
struct MessageAttribute {
    tag: LitInt,
    handler: Option<ExprClosure>,
}

impl Parse for MessageAttribute {
    fn parse(input: ParseStream) -> Result<Self> {
        let tag = input.parse::<LitInt>()?;

        let handler = if !input.is_empty() {
            input.parse::<Token![,]>()?;
            Some(input.parse::<ExprClosure>()?)
        } else {
            None
        };

        Ok(Self { tag, handler })
    }
}
