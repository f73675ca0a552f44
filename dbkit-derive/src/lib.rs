use quote::quote;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Key {
    Index,
    Name,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Delegate {
    FromValue,
    FromColumns,
}

struct Input<'a> {
    name: &'a syn::Ident,
    generics: &'a syn::Generics,
    tuple_struct: bool,
    fields: Vec<FieldInfo>,
}

impl<'a> Input<'a> {
    fn parse(ast: &'a syn::DeriveInput, derive: &str) -> syn::Result<Self> {
        let fields = match &ast.data {
            syn::Data::Enum(_) => {
                return Err(syn::Error::new_spanned(
                    &ast.ident,
                    format!("Cannot derive {derive} on enum!"),
                ))
            }
            syn::Data::Union(_) => {
                return Err(syn::Error::new_spanned(
                    &ast.ident,
                    format!("Cannot derive {derive} on union!"),
                ))
            }
            syn::Data::Struct(s) => &s.fields,
        };
        let tuple_struct = match fields {
            syn::Fields::Unit | syn::Fields::Unnamed(_) => true,
            syn::Fields::Named(_) => false,
        };
        let fields = match fields {
            syn::Fields::Unit => vec![],
            syn::Fields::Named(syn::FieldsNamed { named: fields, .. })
            | syn::Fields::Unnamed(syn::FieldsUnnamed {
                unnamed: fields, ..
            }) => fields.iter().collect(),
        };
        let fields = FieldInfo::from_fields(&fields)?;

        Ok(Input {
            name: &ast.ident,
            generics: &ast.generics,
            tuple_struct,
            fields,
        })
    }
}

/// Derive macro available if dbkit is built with `features = ["derive"]`.
///
/// Named fields load by column name and tuple fields by position,
/// unless the struct says otherwise with `#[dbkit(by_index)]` or
/// `#[dbkit(by_name)]`.
#[proc_macro_derive(FromRow, attributes(dbkit))]
pub fn derive_from_row(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let ast: syn::DeriveInput = match syn::parse(input) {
        Ok(ast) => ast,
        Err(error) => return error.to_compile_error().into(),
    };
    match from_row(&ast) {
        Ok(body) => body.into(),
        Err(error) => error.to_compile_error().into(),
    }
}

fn from_row(ast: &syn::DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let input = Input::parse(ast, "FromRow")?;

    let mut key = None;

    if let Some(attr) = ast.attrs.iter().find(|attr| attr.path().is_ident("dbkit")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("by_index") {
                key = Some(Key::Index);
                return Ok(());
            }

            if meta.path.is_ident("by_name") {
                key = Some(Key::Name);
                return Ok(());
            }

            Err(meta.error("unknown meta path"))
        })?;
    }

    let key = FieldInfo::key_for(key, &input.fields)?;
    let key = key.unwrap_or(if input.tuple_struct {
        Key::Index
    } else {
        Key::Name
    });

    let from_columns_impl = impl_from_columns(key, &input);
    let from_row_impl = impl_from_row(key, &input);

    Ok(quote!(#from_row_impl #from_columns_impl))
}

/// Derive macro available if dbkit is built with `features = ["derive"]`.
#[proc_macro_derive(FromColumnsIndexed, attributes(dbkit))]
pub fn derive_from_columns_indexed(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    derive_from_columns(input, Key::Index, "FromColumnsIndexed")
}

/// Derive macro available if dbkit is built with `features = ["derive"]`.
#[proc_macro_derive(FromColumnsNamed, attributes(dbkit))]
pub fn derive_from_columns_named(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    derive_from_columns(input, Key::Name, "FromColumnsNamed")
}

fn derive_from_columns(
    input: proc_macro::TokenStream,
    key: Key,
    derive: &str,
) -> proc_macro::TokenStream {
    let ast: syn::DeriveInput = match syn::parse(input) {
        Ok(ast) => ast,
        Err(error) => return error.to_compile_error().into(),
    };
    let body = Input::parse(&ast, derive).and_then(|input| {
        FieldInfo::key_for(Some(key), &input.fields)?;
        Ok(impl_from_columns(key, &input))
    });
    match body {
        Ok(body) => body.into(),
        Err(error) => error.to_compile_error().into(),
    }
}

struct FieldInfo {
    ident: Option<syn::Ident>,
    ty: syn::Type,
    nested: bool,
    column: Option<syn::Lit>,
}

impl FieldInfo {
    fn from_fields(fields: &[&syn::Field]) -> syn::Result<Vec<FieldInfo>> {
        fields
            .iter()
            .map(|field| {
                let ident = field.ident.clone();
                let ty = field.ty.clone();
                let mut nested = false;
                let mut column = None;

                for attr in &field.attrs {
                    if attr.path().is_ident("dbkit") {
                        attr.parse_nested_meta(|meta| {
                            if meta.path.is_ident("nested") {
                                nested = true;
                                return Ok(());
                            }

                            if meta.path.is_ident("column") {
                                let value = meta.value()?;
                                let inner = value.parse()?;
                                column = Some(inner);
                                return Ok(());
                            }

                            Err(meta.error("unrecognized attr"))
                        })?;
                    }
                }

                Ok(FieldInfo {
                    ident,
                    ty,
                    nested,
                    column,
                })
            })
            .collect()
    }

    /// Which key the fields use.  Explicit columns must all agree with
    /// each other and with the expected key, if there is one.  Fields
    /// without one fall back to their name, or to the next index.
    fn key_for(expected: Option<Key>, fields: &[FieldInfo]) -> syn::Result<Option<Key>> {
        let key = fields
            .iter()
            .find_map(|field| field.column.as_ref())
            .map(|lit| match lit {
                syn::Lit::Int(_) => Ok(Key::Index),
                syn::Lit::Str(_) => Ok(Key::Name),
                _ => Err(syn::Error::new_spanned(lit, "invalid column key")),
            })
            .transpose()?;

        let key = expected.or(key);

        if let Some(key) = key {
            for field in fields {
                match (key, &field.column) {
                    (_, None)
                    | (Key::Index, Some(syn::Lit::Int(_)))
                    | (Key::Name, Some(syn::Lit::Str(_))) => {}
                    (Key::Index, Some(lit)) => {
                        return Err(syn::Error::new_spanned(lit, "expected column index"));
                    }
                    (Key::Name, Some(lit)) => {
                        return Err(syn::Error::new_spanned(lit, "expected column name"));
                    }
                }
            }
        }

        Ok(key)
    }
}

fn impl_from_row(key: Key, input: &Input) -> proc_macro2::TokenStream {
    let (trait_ty, column_ty) = match key {
        Key::Index => (quote!(FromColumnsIndexed), quote!(ColumnsIndexed)),
        Key::Name => (quote!(FromColumnsNamed), quote!(ColumnsNamed)),
    };
    let name = input.name;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    quote! {
        #[automatically_derived]
        impl #impl_generics ::dbkit::row::FromRow for #name #ty_generics #where_clause {
            fn from_row(
                row: &::dbkit::row::Row,
            ) -> ::std::result::Result<Self, ::dbkit::error::ColumnError> {
                <Self as ::dbkit::row::#trait_ty>::from_columns(
                    ::dbkit::row::#column_ty::new(row),
                )
            }
        }
    }
}

fn impl_from_columns(key: Key, input: &Input) -> proc_macro2::TokenStream {
    let mut num_const = 0;
    let mut plus_nesteds = vec![];
    let mut field_puts = vec![];
    for (index, field) in input.fields.iter().enumerate() {
        let ty = &field.ty;
        let delegate = if field.nested {
            Delegate::FromColumns
        } else {
            Delegate::FromValue
        };

        {
            let get_method = match delegate {
                Delegate::FromValue => quote!(get::<#ty>),
                Delegate::FromColumns => quote!(get_nested::<#ty>),
            };
            let key = match key {
                Key::Index => match &field.column {
                    Some(index) => {
                        quote!(#index)
                    }
                    None => {
                        let num_const = syn::LitInt::new(
                            &format!("{num_const}usize"),
                            proc_macro2::Span::call_site(),
                        );
                        quote!(#num_const #(#plus_nesteds)*)
                    }
                },
                Key::Name => match &field.column {
                    Some(name) => {
                        quote!(#name)
                    }
                    None => {
                        let name = field
                            .ident
                            .as_ref()
                            .map(ToString::to_string)
                            .unwrap_or_else(|| index.to_string());

                        let name = match delegate {
                            Delegate::FromValue => name,
                            Delegate::FromColumns => {
                                let mut s = name;
                                s.push('_');
                                s
                            }
                        };
                        quote!(#name)
                    }
                },
            };
            field_puts.push(match &field.ident {
                Some(field_name) => quote!(#field_name: columns.#get_method(#key)?),
                None => quote!(columns.#get_method(#key)?),
            });
        }

        if let Some(syn::Lit::Int(index)) = &field.column {
            if let Ok(index) = index.base10_parse::<usize>() {
                num_const = index;
                plus_nesteds.clear();
            }
        }

        match delegate {
            Delegate::FromValue => num_const += 1,
            Delegate::FromColumns => plus_nesteds
                .push(quote!(+ <#ty as ::dbkit::row::FromColumnsIndexed>::NUM_COLUMNS)),
        }
    }

    let name = input.name;
    let field_list = if !input.tuple_struct {
        quote!({#(#field_puts),*})
    } else if !field_puts.is_empty() {
        quote!((#(#field_puts),*))
    } else {
        quote!()
    };
    let num_const = syn::LitInt::new(&format!("{num_const}usize"), proc_macro2::Span::call_site());

    let (trait_ty, column_ty) = match key {
        Key::Index => (quote!(FromColumnsIndexed), quote!(ColumnsIndexed)),
        Key::Name => (quote!(FromColumnsNamed), quote!(ColumnsNamed)),
    };

    let num_columns = match key {
        Key::Index => quote!(const NUM_COLUMNS: usize = #num_const #(#plus_nesteds)*;),
        Key::Name => quote!(),
    };

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    quote! {
        #[automatically_derived]
        impl #impl_generics ::dbkit::row::#trait_ty for #name #ty_generics #where_clause {
            #num_columns

            fn from_columns(
                columns: ::dbkit::row::#column_ty<'_>,
            ) -> ::std::result::Result<Self, ::dbkit::error::ColumnError> {
                ::std::result::Result::Ok(#name #field_list)
            }
        }
    }
}
